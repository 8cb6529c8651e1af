use super::{fermi_grid, DefectStudy, TransitionLevel};
use crate::error::StudyError;
use ndarray::Array1;

/// Several defect studies of one material, compared on a shared Fermi level grid
#[derive(Clone, Debug)]
pub struct MaterialStudy<'a> {
    name: String,
    studies: Vec<DefectStudy<'a>>,
}

impl<'a> MaterialStudy<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            studies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds `study`, replacing any study with the same identifier
    pub fn add(&mut self, study: DefectStudy<'a>) {
        match self
            .studies
            .iter()
            .position(|existing| existing.id() == study.id())
        {
            Some(index) => self.studies[index] = study,
            None => self.studies.push(study),
        }
    }

    pub fn studies(&self) -> &[DefectStudy<'a>] {
        &self.studies
    }

    /// The largest gap over every study
    pub fn max_gap(&self) -> Option<f64> {
        self.studies
            .iter()
            .map(DefectStudy::max_gap)
            .reduce(f64::max)
    }

    /// Fermi levels from `lower` to `margin` times the largest gap
    pub fn fermi_grid(&self, lower: f64, margin: f64, points: usize) -> Result<Array1<f64>, StudyError> {
        let gap = self.max_gap().ok_or(StudyError::NoStudies)?;
        Ok(fermi_grid(lower, gap * margin, points))
    }

    /// For each study with defect cells, its identifier and the lowest formation energy on `grid`
    pub fn lowest_formation_energies(
        &self,
        grid: &[f64],
    ) -> Result<Vec<(String, Vec<(f64, f64)>)>, StudyError> {
        self.populated()
            .map(|study| {
                Ok((
                    study.id().to_string(),
                    study.lowest_formation_energies(grid)?,
                ))
            })
            .collect()
    }

    /// For each study with defect cells, its identifier and its transition levels on `grid`
    pub fn transition_levels(
        &self,
        grid: &[f64],
    ) -> Result<Vec<(String, Vec<TransitionLevel>)>, StudyError> {
        self.populated()
            .map(|study| Ok((study.id().to_string(), study.transition_levels(grid)?)))
            .collect()
    }

    fn populated(&self) -> impl Iterator<Item = &DefectStudy<'a>> {
        self.studies.iter().filter(|study| !study.cells().is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::MaterialStudy;
    use crate::defect::{Defect, DefectKind};
    use crate::error::StudyError;
    use crate::study::{CellParameters, CorrectionSet, DefectStudyBuilder};
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::{cd_vacancy, cds_host, cl_on_s};

    #[test]
    fn studies_share_a_grid() {
        let host = Calculation::parse(&cds_host().render(), None).unwrap();
        let vacancy = Calculation::parse(&cd_vacancy(0., -95., 0.).render(), None).unwrap();
        let substitution = Calculation::parse(&cl_on_s(1., -99.).render(), None).unwrap();
        let corrections = CorrectionSet {
            makov_payne: false,
            ..CorrectionSet::default()
        };
        let parameters = CellParameters {
            spheres_radius: 3.5,
            electrons_in_cb: 0.,
            holes_in_vb: 0.,
        };

        let mut vacancies = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![Defect::new(
                DefectKind::Vacancy {
                    atom: "Cd (1)".parse().unwrap(),
                },
                None,
            )
            .unwrap()])
            .with_corrections(corrections)
            .build()
            .unwrap();
        vacancies.add_defect_cell(&vacancy, parameters).unwrap();

        let mut chlorine = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![Defect::new(
                DefectKind::Substitution {
                    removed: "S (2)".parse().unwrap(),
                    added: "Cl (1)".parse().unwrap(),
                },
                None,
            )
            .unwrap()])
            .with_corrections(corrections)
            .build()
            .unwrap();
        chlorine.add_defect_cell(&substitution, parameters).unwrap();

        let mut material = MaterialStudy::new("CdS");
        material.add(vacancies);
        material.add(chlorine);
        assert_eq!(material.studies().len(), 2);

        let grid = material.fermi_grid(0., 1.05, 11).unwrap();
        assert_relative_eq!(grid[10], 2.1, epsilon = 1e-12);

        let curves = material
            .lowest_formation_energies(grid.as_slice().unwrap())
            .unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].0, "Cd4S4_GGA_q0_Vac_Cd(1)");
        assert!(curves.iter().all(|(_, curve)| curve.len() == 11));
        assert_relative_eq!(curves[0].1[0].1, 4.44, epsilon = 1e-6);

        let levels = material.transition_levels(grid.as_slice().unwrap()).unwrap();
        assert!(levels.iter().all(|(_, levels)| levels.is_empty()));
    }

    #[test]
    fn an_empty_material_has_no_grid() {
        let material = MaterialStudy::new("CdS");
        assert!(matches!(
            material.fermi_grid(0., 1.05, 11),
            Err(StudyError::NoStudies)
        ));
    }
}
