//! # Defect studies
//!
//! A [`DefectStudy`] gathers the defect cells describing one set of defects in a host in several
//! charge states. Each cell is corrected on insertion, after which the study yields formation
//! energies as a function of the Fermi level and the charge transition levels.
//!
//! Studies are assembled with a [`DefectStudyBuilder`], which will not build until a host and
//! the defects are given.

mod cell;
mod levels;
mod material;
mod report;

pub use cell::{CellCorrections, CellParameters, DefectCellStudy};
pub use levels::{
    fermi_grid, lowest_line, lowest_lines, transition_levels_of, TransitionLevel,
};
pub use material::MaterialStudy;
pub use report::write_report;

use crate::constants::LATTICE_TOLERANCE;
use crate::corrections::{band_extrema_shift, MakovPayne};
use crate::defect::Defect;
use crate::error::StudyError;
use cell::StudyContext;
use defect_vasp::Calculation;
use serde::Deserialize;

/// Label of the gap derived from the host band edges
pub const CALCULATED_GAP: &str = "Calculated gap";

/// Which corrections enter the formation energies
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorrectionSet {
    pub potential_alignment: bool,
    pub moss_burstein: bool,
    pub phs: bool,
    pub vbm: bool,
    pub makov_payne: bool,
}

impl Default for CorrectionSet {
    fn default() -> Self {
        Self {
            potential_alignment: true,
            moss_burstein: true,
            phs: true,
            vbm: true,
            makov_payne: true,
        }
    }
}

impl CorrectionSet {
    /// Whether the band edges of a second host enter the corrections
    pub fn uses_band_edge_shift(&self) -> bool {
        self.phs || self.vbm
    }
}

pub struct DefectStudyBuilder<'a, RefHost, Defects> {
    host: RefHost,
    host_b: Option<&'a Calculation>,
    defects: Defects,
    corrections: CorrectionSet,
    makov_payne: Option<MakovPayne>,
    band_edge_inputs: (f64, f64),
    gaps: Vec<(String, f64)>,
    name: Option<String>,
}

impl<'a> DefectStudyBuilder<'a, (), ()> {
    pub fn new() -> Self {
        Self {
            host: (),
            host_b: None,
            defects: (),
            corrections: CorrectionSet::default(),
            makov_payne: None,
            band_edge_inputs: (0., 0.),
            gaps: Vec::new(),
            name: None,
        }
    }
}

impl<'a> Default for DefectStudyBuilder<'a, (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, RefHost, Defects> DefectStudyBuilder<'a, RefHost, Defects> {
    pub fn with_host(self, host: &'a Calculation) -> DefectStudyBuilder<'a, &'a Calculation, Defects> {
        DefectStudyBuilder {
            host,
            host_b: self.host_b,
            defects: self.defects,
            corrections: self.corrections,
            makov_payne: self.makov_payne,
            band_edge_inputs: self.band_edge_inputs,
            gaps: self.gaps,
            name: self.name,
        }
    }

    pub fn with_defects(self, defects: Vec<Defect>) -> DefectStudyBuilder<'a, RefHost, Vec<Defect>> {
        DefectStudyBuilder {
            host: self.host,
            host_b: self.host_b,
            defects,
            corrections: self.corrections,
            makov_payne: self.makov_payne,
            band_edge_inputs: self.band_edge_inputs,
            gaps: self.gaps,
            name: self.name,
        }
    }

    /// A second calculation of the host whose band edges correct those of the first
    pub fn with_host_b(mut self, host_b: &'a Calculation) -> Self {
        self.host_b = Some(host_b);
        self
    }

    pub fn with_corrections(mut self, corrections: CorrectionSet) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn with_makov_payne(mut self, parameters: MakovPayne) -> Self {
        self.makov_payne = Some(parameters);
        self
    }

    /// Shifts `(ΔE_V, ΔE_C)` added to those between the two hosts
    pub fn with_band_edge_inputs(mut self, de_vbm: f64, de_cbm: f64) -> Self {
        self.band_edge_inputs = (de_vbm, de_cbm);
        self
    }

    /// Named reference gaps, such as experimental values
    pub fn with_gaps(mut self, gaps: Vec<(String, f64)>) -> Self {
        self.gaps = gaps;
        self
    }

    /// Overrides the identifier of the study
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<'a> DefectStudyBuilder<'a, &'a Calculation, Vec<Defect>> {
    pub fn build(self) -> Result<DefectStudy<'a>, StudyError> {
        if self.defects.is_empty() {
            return Err(StudyError::NoDefects);
        }
        if self.corrections.makov_payne && self.makov_payne.is_none() {
            return Err(StudyError::MissingMakovPayne);
        }

        let host = self.host;
        let host_b = self.host_b.unwrap_or(host);
        let distinct_hosts = !std::ptr::eq(host, host_b)
            && !(host.outcar.is_some() && host.outcar == host_b.outcar);

        let (de_vbm, de_cbm) = if self.corrections.uses_band_edge_shift() {
            let (de_vbm, de_cbm) = band_extrema_shift(host, host_b);
            (
                de_vbm + self.band_edge_inputs.0,
                de_cbm + self.band_edge_inputs.1,
            )
        } else {
            (0., 0.)
        };

        let mut gaps = self.gaps;
        gaps.retain(|(label, _)| label != CALCULATED_GAP);
        gaps.push((CALCULATED_GAP.to_string(), host.gap() - de_vbm + de_cbm));

        let defect_ids = self
            .defects
            .iter()
            .map(Defect::id)
            .collect::<Vec<_>>()
            .join("_");
        let defects_title = self
            .defects
            .iter()
            .map(Defect::name)
            .collect::<Vec<_>>()
            .join(" & ");
        let reduced = host.composition.display_name(true);
        let (id, title) = if self.corrections.uses_band_edge_shift() && distinct_hosts {
            (
                format!(
                    "{}_corr_{}_{}",
                    host.id(),
                    host_b.functional.name(),
                    defect_ids
                ),
                format!(
                    "{} - {} corrected {} - {}",
                    reduced,
                    host.functional.title(),
                    host_b.functional.title(),
                    defects_title
                ),
            )
        } else {
            (
                format!("{}_{}", host.id(), defect_ids),
                format!("{} - {} - {}", reduced, host.functional.title(), defects_title),
            )
        };

        tracing::info!("Defect study {}: ΔE_V = {:.5} eV, ΔE_C = {:.5} eV", id, de_vbm, de_cbm);

        Ok(DefectStudy {
            id: self.name.unwrap_or(id),
            title,
            host,
            host_b,
            distinct_hosts,
            defects: self.defects,
            corrections: self.corrections,
            makov_payne: self.makov_payne,
            de_vbm,
            de_cbm,
            gaps,
            cells: Vec::new(),
        })
    }
}

/// A set of defects in a host, studied through defect cells in several charge states
#[derive(Clone, Debug)]
pub struct DefectStudy<'a> {
    id: String,
    title: String,
    host: &'a Calculation,
    host_b: &'a Calculation,
    distinct_hosts: bool,
    defects: Vec<Defect>,
    corrections: CorrectionSet,
    makov_payne: Option<MakovPayne>,
    de_vbm: f64,
    de_cbm: f64,
    gaps: Vec<(String, f64)>,
    cells: Vec<DefectCellStudy<'a>>,
}

impl<'a> DefectStudy<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn host(&self) -> &'a Calculation {
        self.host
    }

    /// The host providing the corrected band edges, the host itself when none was given
    pub fn host_b(&self) -> &'a Calculation {
        self.host_b
    }

    /// Whether a second, different, host calculation was given
    pub fn has_distinct_host_b(&self) -> bool {
        self.distinct_hosts
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn corrections(&self) -> &CorrectionSet {
        &self.corrections
    }

    pub fn makov_payne(&self) -> Option<&MakovPayne> {
        self.makov_payne.as_ref()
    }

    /// Shift of the valence band maximum applied to the corrections
    pub fn de_vbm(&self) -> f64 {
        self.de_vbm
    }

    /// Shift of the conduction band minimum applied to the corrections
    pub fn de_cbm(&self) -> f64 {
        self.de_cbm
    }

    /// Named gaps, the calculated gap last
    pub fn gaps(&self) -> &[(String, f64)] {
        &self.gaps
    }

    pub fn gap(&self, label: &str) -> Result<f64, StudyError> {
        self.gaps
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| *value)
            .ok_or_else(|| StudyError::UnknownGap(label.to_string()))
    }

    /// The largest of the gaps
    pub fn max_gap(&self) -> f64 {
        self.gaps
            .iter()
            .map(|(_, value)| *value)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Defect cells in insertion order
    pub fn cells(&self) -> &[DefectCellStudy<'a>] {
        &self.cells
    }

    /// Corrects `cell` and adds it to the study, replacing any cell with the same identifier
    #[tracing::instrument(name = "Defect cell", skip_all, fields(cell = %cell.id()))]
    pub fn add_defect_cell(
        &mut self,
        cell: &'a Calculation,
        parameters: CellParameters,
    ) -> Result<&DefectCellStudy<'a>, StudyError> {
        self.check_compatibility(cell)?;

        let context = StudyContext {
            host: self.host,
            defects: &self.defects,
            corrections: &self.corrections,
            makov_payne: self.makov_payne.as_ref(),
            de_vbm: self.de_vbm,
            de_cbm: self.de_cbm,
        };
        let study = DefectCellStudy::new(&context, cell, parameters)?;

        let id = study.id();
        let index = match self.cells.iter().position(|existing| existing.id() == id) {
            Some(index) => {
                tracing::warn!("Replacing the defect cell {}", id);
                self.cells[index] = study;
                index
            }
            None => {
                self.cells.push(study);
                self.cells.len() - 1
            }
        };
        Ok(&self.cells[index])
    }

    /// Removes the cell with identifier `id`, returning whether one was present
    pub fn remove_defect_cell(&mut self, id: &str) -> bool {
        let before = self.cells.len();
        self.cells.retain(|cell| cell.id() != id);
        before != self.cells.len()
    }

    fn check_compatibility(&self, cell: &Calculation) -> Result<(), StudyError> {
        if (self.host.lattice - cell.lattice).amax() > LATTICE_TOLERANCE {
            return Err(StudyError::LatticeMismatch { defect: cell.id() });
        }

        let host = &self.host.composition;
        let changes = self
            .defects
            .iter()
            .flat_map(Defect::population_change)
            .collect::<Vec<_>>();
        let mismatch = host
            .union_of_species(&cell.composition)
            .into_iter()
            .chain(changes.iter().map(|(species, _)| *species))
            .find(|species| {
                let change = changes
                    .iter()
                    .filter(|(changed, _)| changed == species)
                    .map(|(_, count)| count)
                    .sum::<i32>();
                host.count(species) as i64 != cell.composition.count(species) as i64 + change as i64
            });
        match mismatch {
            Some(species) => Err(StudyError::IncompatibleCell {
                defect: cell.id(),
                species: species.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Formation energy of `cell` at the Fermi level `fermi_energy` above the host VBM
    pub fn formation_energy(&self, cell: &DefectCellStudy<'_>, fermi_energy: f64) -> f64 {
        cell.formation_energy(fermi_energy)
    }

    /// Formation energy lines `(charge, intercept)` of the cells, in insertion order
    pub fn lines(&self) -> Vec<(f64, f64)> {
        self.cells.iter().map(DefectCellStudy::line).collect()
    }

    /// The cell with the lowest formation energy at `fermi_energy`, and that energy
    pub fn lowest_formation_energy(
        &self,
        fermi_energy: f64,
    ) -> Result<(&DefectCellStudy<'a>, f64), StudyError> {
        lowest_line(&self.lines(), fermi_energy)
            .map(|(index, energy)| (&self.cells[index], energy))
            .ok_or(StudyError::NoDefectCells)
    }

    /// The lowest formation energy and the charge of its cell at every point of `grid`
    pub fn lowest_formation_energies(&self, grid: &[f64]) -> Result<Vec<(f64, f64)>, StudyError> {
        if self.cells.is_empty() {
            return Err(StudyError::NoDefectCells);
        }
        let lines = self.lines();
        Ok(lowest_lines(&lines, grid)
            .into_iter()
            .flatten()
            .map(|(index, energy)| (lines[index].0, energy))
            .collect())
    }

    /// Charge transition levels found on `grid`
    pub fn transition_levels(&self, grid: &[f64]) -> Result<Vec<TransitionLevel>, StudyError> {
        if self.cells.is_empty() {
            return Err(StudyError::NoDefectCells);
        }
        Ok(transition_levels_of(&self.lines(), grid))
    }
}

#[cfg(test)]
mod test {
    use super::{CellParameters, CorrectionSet, DefectStudy, DefectStudyBuilder, CALCULATED_GAP};
    use crate::corrections::{Geometry, MakovPayne};
    use crate::defect::{Defect, DefectKind};
    use crate::error::StudyError;
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::{cd_vacancy, cds_host, cl_on_s};
    use utilities::FixtureFunctional;

    fn parse(text: String) -> Calculation {
        Calculation::parse(&text, None).unwrap()
    }

    fn cd_vacancy_label() -> Defect {
        Defect::new(
            DefectKind::Vacancy {
                atom: "Cd (1)".parse().unwrap(),
            },
            None,
        )
        .unwrap()
    }

    fn alignment_only() -> CorrectionSet {
        CorrectionSet {
            potential_alignment: true,
            moss_burstein: false,
            phs: false,
            vbm: false,
            makov_payne: false,
        }
    }

    fn parameters(radius: f64) -> CellParameters {
        CellParameters {
            spheres_radius: radius,
            electrons_in_cb: 0.,
            holes_in_vb: 0.,
        }
    }

    fn vacancy_study(host: &Calculation) -> DefectStudy<'_> {
        DefectStudyBuilder::new()
            .with_host(host)
            .with_defects(vec![cd_vacancy_label()])
            .with_corrections(alignment_only())
            .build()
            .unwrap()
    }

    #[test]
    fn a_study_needs_defects() {
        let host = parse(cds_host().render());
        let result = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![])
            .build();
        assert!(matches!(result, Err(StudyError::NoDefects)));
    }

    #[test]
    fn makov_payne_needs_parameters() {
        let host = parse(cds_host().render());
        let result = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![cd_vacancy_label()])
            .build();
        assert!(matches!(result, Err(StudyError::MissingMakovPayne)));
    }

    #[test]
    fn labels_of_a_single_host_study() {
        let host = parse(cds_host().render());
        let study = vacancy_study(&host);
        assert_eq!(study.id(), "Cd4S4_GGA_q0_Vac_Cd(1)");
        assert_eq!(study.title(), "CdS - GGA - V_{Cd}");
        assert_relative_eq!(study.de_vbm(), 0.);
        assert_relative_eq!(study.gap(CALCULATED_GAP).unwrap(), 2.);
        assert!(matches!(study.gap("Optical gap"), Err(StudyError::UnknownGap(_))));
    }

    #[test]
    fn second_host_shifts_the_band_edges() {
        let host = parse(cds_host().render());
        let host_b = parse(
            cds_host()
                .with_functional(FixtureFunctional::Hse)
                .with_band_edges(0.8, 3.5)
                .render(),
        );
        let study = DefectStudyBuilder::new()
            .with_host(&host)
            .with_host_b(&host_b)
            .with_defects(vec![cd_vacancy_label()])
            .with_corrections(CorrectionSet {
                makov_payne: false,
                ..CorrectionSet::default()
            })
            .with_band_edge_inputs(0.1, 0.)
            .with_gaps(vec![("Experimental gap".into(), 2.4)])
            .build()
            .unwrap();

        assert_eq!(study.id(), "Cd4S4_GGA_q0_corr_HSE_Vac_Cd(1)");
        assert_eq!(study.title(), "CdS - GGA corrected HSE - V_{Cd}");
        assert_relative_eq!(study.de_vbm(), -0.1, epsilon = 1e-10);
        assert_relative_eq!(study.de_cbm(), 0.5, epsilon = 1e-10);
        assert_eq!(study.gaps()[0].0, "Experimental gap");
        assert_relative_eq!(study.gap(CALCULATED_GAP).unwrap(), 2.6, epsilon = 1e-10);
        assert_relative_eq!(study.max_gap(), 2.6, epsilon = 1e-10);
    }

    #[test]
    fn formation_energies_and_transition() {
        let host = parse(cds_host().render());
        let neutral = parse(cd_vacancy(0., -95., 0.).render());
        let charged = parse(cd_vacancy(-2., -92., 0.1).render());
        let mut study = vacancy_study(&host);
        study.add_defect_cell(&neutral, parameters(3.5)).unwrap();
        let cell = study.add_defect_cell(&charged, parameters(3.5)).unwrap();

        assert_relative_eq!(cell.corrections().potential_alignment, -0.2, epsilon = 1e-8);
        assert_relative_eq!(cell.formation_energy_at_vbm(), 5.24, epsilon = 1e-6);
        assert_eq!(cell.title(), "CdS - V_{Cd}^{-2}");

        let (lowest, energy) = study.lowest_formation_energy(0.).unwrap();
        assert_relative_eq!(lowest.charge(), 0.);
        assert_relative_eq!(energy, 4.44, epsilon = 1e-6);

        let grid = super::fermi_grid(0., 2., 2001);
        let levels = study.transition_levels(grid.as_slice().unwrap()).unwrap();
        assert_eq!(levels.len(), 1);
        assert_relative_eq!(levels[0].fermi_energy, 0.4, epsilon = 2e-3);
        assert_relative_eq!(levels[0].old_charge, 0.);
        assert_relative_eq!(levels[0].new_charge, -2.);
    }

    #[test]
    fn cells_without_alignment_corrections_skip_the_alignment() {
        let host = parse(cds_host().render());
        let cell = parse(cd_vacancy(-2., -95., 0.).render());
        let defect = Defect::new(
            DefectKind::Vacancy {
                atom: "Cd (9)".parse().unwrap(),
            },
            None,
        )
        .unwrap();
        let mut study = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![defect])
            .with_corrections(CorrectionSet {
                potential_alignment: false,
                moss_burstein: false,
                phs: false,
                vbm: false,
                makov_payne: false,
            })
            .build()
            .unwrap();

        let cell = study.add_defect_cell(&cell, parameters(3.5)).unwrap();
        assert!(cell.alignment().is_none());
        assert_relative_eq!(cell.corrections().total(), 0.);
        assert_relative_eq!(cell.formation_energy_at_vbm(), 2.44, epsilon = 1e-6);
    }

    #[test]
    fn cells_with_the_same_identifier_are_replaced() {
        let host = parse(cds_host().render());
        let first = parse(cd_vacancy(0., -95., 0.).render());
        let second = parse(cd_vacancy(0., -94., 0.).render());
        let mut study = vacancy_study(&host);
        study.add_defect_cell(&first, parameters(3.5)).unwrap();
        study.add_defect_cell(&second, parameters(3.5)).unwrap();
        assert_eq!(study.cells().len(), 1);
        assert_relative_eq!(study.cells()[0].formation_energy_at_vbm(), 5.44, epsilon = 1e-6);
        assert!(study.remove_defect_cell(&second.id()));
        assert!(matches!(
            study.lowest_formation_energy(0.),
            Err(StudyError::NoDefectCells)
        ));
    }

    #[test]
    fn cells_must_match_the_host_and_defects() {
        let host = parse(cds_host().render());
        let substituted = parse(cl_on_s(0., -99.).render());
        let mut study = vacancy_study(&host);
        let result = study.add_defect_cell(&substituted, parameters(3.5));
        assert!(matches!(result, Err(StudyError::IncompatibleCell { .. })));

        let mut stretched = cd_vacancy(0., -95., 0.);
        stretched.lattice[0][0] += 0.01;
        let stretched = parse(stretched.render());
        let result = study.add_defect_cell(&stretched, parameters(3.5));
        assert!(matches!(result, Err(StudyError::LatticeMismatch { .. })));
    }

    #[test]
    fn makov_payne_enters_the_total() {
        let host = parse(cds_host().render());
        let charged = parse(cd_vacancy(-1., -93., 0.).render());
        let mut study = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![cd_vacancy_label()])
            .with_corrections(CorrectionSet {
                makov_payne: true,
                ..alignment_only()
            })
            .with_makov_payne(MakovPayne {
                geometry: Geometry::Sc,
                relative_permittivity: 10.,
                first_term: 2.,
            })
            .build()
            .unwrap();
        let cell = study.add_defect_cell(&charged, parameters(3.5)).unwrap();
        let expected = (1. - 0.369 * 0.9) * 2. / 10.;
        assert_relative_eq!(cell.corrections().makov_payne, expected, epsilon = 1e-10);
        assert_relative_eq!(cell.corrections().total(), expected, epsilon = 1e-8);
    }
}
