use super::CorrectionSet;
use crate::corrections::{
    makov_payne, moss_burstein, phs, potential_alignment, vbm, MakovPayne, PotentialAlignment,
};
use crate::defect::Defect;
use crate::error::StudyError;
use defect_vasp::Calculation;

/// The individual corrections applied to one defect cell, in eV
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CellCorrections {
    /// `q ΔV`
    pub potential_alignment: f64,
    /// Moss-Burstein `(acceptor, donor)`
    pub moss_burstein: (f64, f64),
    /// Perturbed host states `(holes, electrons)`
    pub phs: (f64, f64),
    pub vbm: f64,
    pub makov_payne: f64,
}

impl CellCorrections {
    pub fn total(&self) -> f64 {
        self.potential_alignment
            + self.moss_burstein.0
            + self.moss_burstein.1
            + self.phs.0
            + self.phs.1
            + self.vbm
            + self.makov_payne
    }
}

/// How a defect cell enters its study
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellParameters {
    /// Radius in Å of the spheres excluded from the potential alignment
    pub spheres_radius: f64,
    /// Electrons occupying perturbed host states in the conduction band
    pub electrons_in_cb: f64,
    /// Holes occupying perturbed host states in the valence band
    pub holes_in_vb: f64,
}

/// A defect cell with its corrections and the formation energy at a vanishing Fermi level
#[derive(Clone, Debug)]
pub struct DefectCellStudy<'a> {
    cell: &'a Calculation,
    parameters: CellParameters,
    alignment: Option<PotentialAlignment>,
    corrections: CellCorrections,
    formation_energy_at_vbm: f64,
    title: String,
}

pub(super) struct StudyContext<'s, 'a> {
    pub(super) host: &'a Calculation,
    pub(super) defects: &'s [Defect],
    pub(super) corrections: &'s CorrectionSet,
    pub(super) makov_payne: Option<&'s MakovPayne>,
    pub(super) de_vbm: f64,
    pub(super) de_cbm: f64,
}

impl<'a> DefectCellStudy<'a> {
    pub(super) fn new(
        context: &StudyContext<'_, 'a>,
        cell: &'a Calculation,
        parameters: CellParameters,
    ) -> Result<Self, StudyError> {
        let host = context.host;
        let flags = context.corrections;
        let charge = cell.charge;
        let needs_alignment = flags.potential_alignment || flags.moss_burstein;

        let alignment = if needs_alignment {
            Some(potential_alignment(
                host,
                cell,
                context.defects,
                parameters.spheres_radius,
            )?)
        } else {
            None
        };
        let delta = match &alignment {
            Some(alignment) => alignment.value()?,
            None => 0.,
        };

        let mut corrections = CellCorrections::default();
        if flags.potential_alignment {
            corrections.potential_alignment = charge * delta;
        }
        if flags.moss_burstein {
            corrections.moss_burstein = moss_burstein(host, cell, delta);
        }
        if flags.phs {
            corrections.phs = phs(
                parameters.holes_in_vb,
                parameters.electrons_in_cb,
                context.de_vbm,
                context.de_cbm,
            );
        }
        if flags.vbm {
            corrections.vbm = vbm(charge, context.de_vbm);
        }
        if flags.makov_payne {
            let mp = context.makov_payne.ok_or(StudyError::MissingMakovPayne)?;
            corrections.makov_payne = makov_payne(charge, mp)?;
        }

        let reservoirs = context
            .defects
            .iter()
            .map(|defect| defect.n() as f64 * defect.chemical_potential())
            .sum::<f64>();
        let formation_energy_at_vbm =
            cell.energy - host.energy + reservoirs + charge * host.vbm + corrections.total();

        let title = format!(
            "{} - {}",
            host.composition.display_name(true),
            defects_title(context.defects, cell)
        );

        tracing::info!(
            "{}: total correction {:.5} eV, formation energy {:.5} eV",
            cell.id(),
            corrections.total(),
            formation_energy_at_vbm
        );

        Ok(Self {
            cell,
            parameters,
            alignment,
            corrections,
            formation_energy_at_vbm,
            title,
        })
    }

    /// The defect cell calculation
    pub fn cell(&self) -> &'a Calculation {
        self.cell
    }

    pub fn id(&self) -> String {
        self.cell.id()
    }

    /// Figure title, `CdIn_{2}S_{4} - V_{Cd}^{-2}`
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn charge(&self) -> f64 {
        self.cell.charge
    }

    pub fn parameters(&self) -> &CellParameters {
        &self.parameters
    }

    /// The potential alignment, absent for cells without core potentials
    pub fn alignment(&self) -> Option<&PotentialAlignment> {
        self.alignment.as_ref()
    }

    pub fn corrections(&self) -> &CellCorrections {
        &self.corrections
    }

    /// Formation energy with the Fermi level on the host VBM
    pub fn formation_energy_at_vbm(&self) -> f64 {
        self.formation_energy_at_vbm
    }

    /// Formation energy with the Fermi level `fermi_energy` above the host VBM
    pub fn formation_energy(&self, fermi_energy: f64) -> f64 {
        self.formation_energy_at_vbm + self.cell.charge * fermi_energy
    }

    /// The formation energy line `(charge, intercept)`
    pub fn line(&self) -> (f64, f64) {
        (self.cell.charge, self.formation_energy_at_vbm)
    }
}

/// `V_{Cd}^{-2}`, or `(V_{Cd} & Cd_i)^{0}` for several defects
fn defects_title(defects: &[Defect], cell: &Calculation) -> String {
    let charge = cell.rounded_charge();
    match defects {
        [defect] => format!("{}^{{{}}}", defect.name(), charge),
        _ => format!(
            "({})^{{{}}}",
            defects
                .iter()
                .map(Defect::name)
                .collect::<Vec<_>>()
                .join(" & "),
            charge
        ),
    }
}
