//! Point defect labels
//!
//! A [`Defect`] records which ions were removed from or added to the host, the chemical
//! potentials of the reservoirs they were exchanged with, and the bookkeeping derived from
//! those: the display name, the identifier used in file names, the exchange multiplicity `n`
//! entering the formation energy, and the change in population it makes to the host.

use crate::constants::fere;
use crate::error::DefectError;
use defect_vasp::{Atom, Calculation};
use nalgebra::Point3;

/// The kind of point defect, with the ions it involves
///
/// Vacancies are labelled by the ion removed from the host cell, interstitials by the ion as
/// it appears in the defect cell. A substitution removes `removed` from the host and places
/// `added`, labelled in the defect cell, on its site.
#[derive(Clone, Debug, PartialEq)]
pub enum DefectKind {
    /// An ion is missing
    Vacancy {
        /// Label of the removed ion in the host
        atom: Atom,
    },
    /// An extra ion sits between lattice sites
    Interstitial {
        /// Label of the added ion in the defect cell
        atom: Atom,
    },
    /// One ion is exchanged for another
    Substitution {
        /// Label of the removed ion in the host
        removed: Atom,
        /// Label of the added ion in the defect cell
        added: Atom,
    },
}

impl DefectKind {
    /// The kind as a word, `Vacancy`, `Interstitial` or `Substitutional`
    pub fn description(&self) -> &'static str {
        match self {
            DefectKind::Vacancy { .. } => "Vacancy",
            DefectKind::Interstitial { .. } => "Interstitial",
            DefectKind::Substitution { .. } => "Substitutional",
        }
    }

    /// The ions involved, removed before added
    pub fn atoms(&self) -> Vec<&Atom> {
        match self {
            DefectKind::Vacancy { atom } | DefectKind::Interstitial { atom } => vec![atom],
            DefectKind::Substitution { removed, added } => vec![removed, added],
        }
    }
}

/// A point defect and the chemical potentials of the species it exchanges
#[derive(Clone, Debug, PartialEq)]
pub struct Defect {
    kind: DefectKind,
    chemical_potentials: Vec<f64>,
}

impl Defect {
    /// Creates a defect, taking missing chemical potentials from the FERE table
    ///
    /// When given, `chemical_potentials` holds one value per ion of [`DefectKind::atoms`].
    pub fn new(kind: DefectKind, chemical_potentials: Option<Vec<f64>>) -> Result<Self, DefectError> {
        let atoms = kind.atoms();
        let chemical_potentials = match chemical_potentials {
            Some(potentials) => {
                if potentials.len() != atoms.len() {
                    return Err(DefectError::ChemicalPotentials {
                        kind: kind.description(),
                        expected: atoms.len(),
                        found: potentials.len(),
                    });
                }
                potentials
            }
            None => atoms
                .iter()
                .map(|atom| {
                    fere(&atom.species)
                        .ok_or_else(|| DefectError::UnknownChemicalPotential(atom.species.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Self {
            kind,
            chemical_potentials,
        })
    }

    /// The kind of defect
    pub fn kind(&self) -> &DefectKind {
        &self.kind
    }

    /// The chemical potential of each ion involved, in the order of [`DefectKind::atoms`]
    pub fn chemical_potentials(&self) -> &[f64] {
        &self.chemical_potentials
    }

    /// Display name with TeX subscripts, `V_{Cd}`, `Cd_i` or `In_{Cd}`
    pub fn name(&self) -> String {
        match &self.kind {
            DefectKind::Vacancy { atom } => format!("V_{{{}}}", atom.species),
            DefectKind::Interstitial { atom } => format!("{}_i", atom.species),
            DefectKind::Substitution { removed, added } => {
                format!("{}_{{{}}}", added.species, removed.species)
            }
        }
    }

    /// Identifier without whitespace, `Vac_Cd(3)`, `Inter_Cd(3)` or `Subs(Cd(3)_by_In(17))`
    pub fn id(&self) -> String {
        match &self.kind {
            DefectKind::Vacancy { atom } => format!("Vac_{}", atom.compact()),
            DefectKind::Interstitial { atom } => format!("Inter_{}", atom.compact()),
            DefectKind::Substitution { removed, added } => {
                format!("Subs({}_by_{})", removed.compact(), added.compact())
            }
        }
    }

    /// Number of ions given to the reservoir, `+1` for vacancies and substitutions, `-1` for interstitials
    pub fn n(&self) -> i32 {
        match self.kind {
            DefectKind::Vacancy { .. } | DefectKind::Substitution { .. } => 1,
            DefectKind::Interstitial { .. } => -1,
        }
    }

    /// The chemical potential multiplying [`Defect::n`] in the formation energy
    pub fn chemical_potential(&self) -> f64 {
        match self.kind {
            DefectKind::Substitution { .. } => {
                self.chemical_potentials[0] - self.chemical_potentials[1]
            }
            _ => self.chemical_potentials[0],
        }
    }

    /// How many more ions of each species the host holds than the defect cell
    pub fn population_change(&self) -> Vec<(&str, i32)> {
        match &self.kind {
            DefectKind::Vacancy { atom } => vec![(atom.species.as_str(), 1)],
            DefectKind::Interstitial { atom } => vec![(atom.species.as_str(), -1)],
            DefectKind::Substitution { removed, added } => vec![
                (removed.species.as_str(), 1),
                (added.species.as_str(), -1),
            ],
        }
    }

    /// Cartesian position of the defect
    ///
    /// Vacancies sit on the site of the removed host ion, interstitials and substitutions on
    /// the site of the added ion in the defect cell.
    pub fn position(
        &self,
        host: &Calculation,
        defect_cell: &Calculation,
    ) -> Result<Point3<f64>, DefectError> {
        let (cell, atom, label) = match &self.kind {
            DefectKind::Vacancy { atom } => (host, atom, "host"),
            DefectKind::Interstitial { atom } => (defect_cell, atom, "defect"),
            DefectKind::Substitution { added, .. } => (defect_cell, added, "defect"),
        };
        cell.position_of(atom)
            .ok_or_else(|| DefectError::AtomNotFound {
                atom: atom.clone(),
                cell: label,
            })
    }

    /// The ion of the host cell which has no counterpart in the defect cell
    pub(crate) fn removed_from_host(&self) -> Option<&Atom> {
        match &self.kind {
            DefectKind::Vacancy { atom } => Some(atom),
            DefectKind::Substitution { removed, .. } => Some(removed),
            DefectKind::Interstitial { .. } => None,
        }
    }

    /// The ion of the defect cell which has no counterpart in the host cell
    pub(crate) fn added_to_cell(&self) -> Option<&Atom> {
        match &self.kind {
            DefectKind::Interstitial { atom } => Some(atom),
            DefectKind::Substitution { added, .. } => Some(added),
            DefectKind::Vacancy { .. } => None,
        }
    }
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
