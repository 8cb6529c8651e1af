//! Density of states plots
//!
//! The total DOS and its projections are shifted onto the requested energy reference. Spin
//! polarised runs are drawn with the minority channel negated.

use super::export::write_columns;
use crate::error::PlotError;
use defect_vasp::{Atom, Calculation, Dos, ProjectedDos, SpinResolved};
use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use std::io::Write;

/// What the projected DOS is resolved on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// Summed over the ions of each species
    Species,
    /// Each ion separately
    Atoms,
}

/// Options of a DOS plot
#[derive(Clone, Debug, PartialEq)]
pub struct DosPlotParameters {
    /// Projection to draw, none for the total DOS alone
    pub projection: Option<Projection>,
    /// Sum the orbitals of each projection
    pub total_projected: bool,
    /// Species drawn in a species projection, all when `None`
    pub species: Option<Vec<String>>,
    /// Ions drawn in an atom projection, all when `None`
    pub atoms: Option<Vec<Atom>>,
    /// Measure energies from the Fermi level
    pub fermi_shift: bool,
    /// Further shift subtracted from every energy
    pub input_shift: f64,
    /// Draw both spin channels of polarised runs
    pub display_spin: bool,
    pub energy_range: (f64, f64),
    pub dos_range: (f64, f64),
}

impl DosPlotParameters {
    /// Defaults for `calculation`, drawing the species projection over the `EMIN`-`EMAX` window
    pub fn new(calculation: &Calculation) -> Result<Self, PlotError> {
        let dos = dos_of(calculation)?;
        let (emin, emax) = (calculation.tags.emin, calculation.tags.emax);
        let dos_range = if calculation.tags.ispin.channels() == 2 {
            (
                -dos.max_down().unwrap_or_default(),
                dos.max_up().unwrap_or_default(),
            )
        } else {
            (0., dos.max_total().unwrap_or_default())
        };
        Ok(Self {
            projection: dos.projected.as_ref().map(|_| Projection::Species),
            total_projected: false,
            species: None,
            atoms: None,
            fermi_shift: false,
            input_shift: 0.,
            display_spin: true,
            energy_range: (emin.min(emax), emin.max(emax)),
            dos_range,
        })
    }
}

/// One curve of a DOS plot, with its minority channel already negated
#[derive(Clone, Debug, PartialEq)]
pub struct DosCurve {
    pub label: String,
    pub values: Array1<f64>,
    pub down: Option<Array1<f64>>,
}

/// Plot-ready density of states of one calculation
#[derive(Clone, Debug)]
pub struct DosPlot {
    pub title: String,
    pub energies: Array1<f64>,
    pub total: DosCurve,
    pub projected: Vec<DosCurve>,
    pub fermi_energy: f64,
    pub vbm: f64,
    pub cbm: f64,
    pub energy_range: (f64, f64),
    pub dos_range: (f64, f64),
}

fn dos_of(calculation: &Calculation) -> Result<&Dos, PlotError> {
    calculation
        .dos
        .as_ref()
        .ok_or_else(|| PlotError::MissingDos(calculation.id()))
}

/// The rows of `values`, or their sum when `total`
fn groups(values: &Array2<f64>, total: bool) -> Vec<Array1<f64>> {
    if total {
        vec![values.sum_axis(Axis(0))]
    } else {
        values.outer_iter().map(|row| row.to_owned()).collect()
    }
}

fn curves(
    label: &str,
    resolved: &SpinResolved<Array2<f64>>,
    orbitals: &[String],
    total: bool,
    spin: bool,
) -> Vec<DosCurve> {
    let labels = if total {
        vec![label.to_string()]
    } else {
        orbitals
            .iter()
            .map(|orbital| format!("{} {}", label, orbital))
            .collect()
    };
    let (values, down) = match (spin, &resolved.up, &resolved.down) {
        (true, Some(up), Some(down)) => (
            groups(up, total),
            Some(groups(down, total).into_iter().map(|values| -values).collect::<Vec<_>>()),
        ),
        _ => (groups(&resolved.total, total), None),
    };
    labels
        .into_iter()
        .zip(values.into_iter())
        .enumerate()
        .map(|(index, (label, values))| DosCurve {
            label,
            values,
            down: down.as_ref().map(|down| down[index].clone()),
        })
        .collect()
}

impl DosPlot {
    pub fn new(calculation: &Calculation, parameters: &DosPlotParameters) -> Result<Self, PlotError> {
        let dos = dos_of(calculation)?;
        let spin = calculation.tags.ispin.channels() == 2 && parameters.display_spin;

        let shift = if parameters.fermi_shift {
            -calculation.fermi_energy - parameters.input_shift
        } else {
            -parameters.input_shift
        };

        let total = match (spin, &dos.total.up, &dos.total.down) {
            (true, Some(up), Some(down)) => DosCurve {
                label: "Total DOS".into(),
                values: up.clone(),
                down: Some(-down),
            },
            _ => DosCurve {
                label: "Total DOS".into(),
                values: dos.total.total.clone(),
                down: None,
            },
        };

        let projected = match parameters.projection {
            None => Vec::new(),
            Some(projection) => {
                let projected = dos
                    .projected
                    .as_ref()
                    .ok_or_else(|| PlotError::MissingProjections(calculation.id()))?;
                project(calculation, projected, projection, parameters, spin)?
            }
        };

        Ok(Self {
            title: calculation.title(),
            energies: &dos.energies + shift,
            total,
            projected,
            fermi_energy: calculation.fermi_energy + shift,
            vbm: calculation.vbm + shift,
            cbm: calculation.cbm + shift,
            energy_range: parameters.energy_range,
            dos_range: parameters.dos_range,
        })
    }

    /// Writes the energies, the total DOS and every projected curve as columns
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlotError> {
        let mut headers = vec!["energy".to_string()];
        let mut columns: Vec<&[f64]> = vec![self.energies.as_slice().unwrap_or(&[])];
        for curve in std::iter::once(&self.total).chain(self.projected.iter()) {
            match &curve.down {
                Some(down) => {
                    headers.push(format!("{} (up)", curve.label));
                    headers.push(format!("{} (down)", curve.label));
                    columns.push(curve.values.as_slice().unwrap_or(&[]));
                    columns.push(down.as_slice().unwrap_or(&[]));
                }
                None => {
                    headers.push(curve.label.clone());
                    columns.push(curve.values.as_slice().unwrap_or(&[]));
                }
            }
        }
        write_columns(writer, &headers, &columns)
    }
}

fn project(
    calculation: &Calculation,
    projected: &ProjectedDos,
    projection: Projection,
    parameters: &DosPlotParameters,
    spin: bool,
) -> Result<Vec<DosCurve>, PlotError> {
    let orbitals = &projected.orbitals;
    let total = parameters.total_projected;
    match projection {
        Projection::Species => {
            let species = calculation.composition.species().collect::<Vec<_>>();
            let selected = match &parameters.species {
                Some(selection) => selection
                    .iter()
                    .map(|name| {
                        species
                            .iter()
                            .position(|candidate| candidate == name)
                            .ok_or_else(|| PlotError::UnknownSelection(name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..species.len()).collect(),
            };
            Ok(selected
                .into_iter()
                .flat_map(|index| {
                    curves(species[index], &projected.per_species[index], orbitals, total, spin)
                })
                .collect())
        }
        Projection::Atoms => {
            let selected = match &parameters.atoms {
                Some(selection) => selection
                    .iter()
                    .map(|atom| {
                        calculation
                            .atom_index(atom)
                            .ok_or_else(|| PlotError::UnknownSelection(atom.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..calculation.number_of_atoms()).collect(),
            };
            Ok(selected
                .into_iter()
                .flat_map(|index| {
                    curves(
                        &calculation.atoms[index].to_string(),
                        &projected.per_atom[index],
                        orbitals,
                        total,
                        spin,
                    )
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DosPlot, DosPlotParameters, Projection};
    use crate::error::PlotError;
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::cds_host;

    fn with_dos(fixture: utilities::OutcarFixture) -> Calculation {
        Calculation::parse(&fixture.render(), Some(&fixture.render_doscar())).unwrap()
    }

    #[test]
    fn default_ranges() {
        let calculation = with_dos(cds_host());
        let parameters = DosPlotParameters::new(&calculation).unwrap();
        assert_eq!(parameters.energy_range, (-10., 10.));
        assert_eq!(parameters.dos_range, (0., 4.));
        assert_eq!(parameters.projection, Some(Projection::Species));
    }

    #[test]
    fn fermi_shift_moves_every_marker() {
        let calculation = with_dos(cds_host());
        let mut parameters = DosPlotParameters::new(&calculation).unwrap();
        parameters.fermi_shift = true;
        parameters.input_shift = 0.5;
        let plot = DosPlot::new(&calculation, &parameters).unwrap();
        assert_relative_eq!(plot.fermi_energy, -0.5);
        assert_relative_eq!(plot.vbm, calculation.vbm - 1.5);
        assert_relative_eq!(plot.energies[0], -10. - 1.5);
    }

    #[test]
    fn species_projection_by_orbital() {
        let calculation = with_dos(cds_host());
        let parameters = DosPlotParameters::new(&calculation).unwrap();
        let plot = DosPlot::new(&calculation, &parameters).unwrap();
        let labels = plot
            .projected
            .iter()
            .map(|curve| curve.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["Cd s", "Cd p", "Cd d", "S s", "S p", "S d"]);
        // Cd ions 1 to 4 each carry 0.01 * index on each of the 3 p components
        assert_relative_eq!(plot.projected[1].values[0], 3. * 0.1, epsilon = 1e-8);
    }

    #[test]
    fn selected_atoms_summed_over_orbitals() {
        let calculation = with_dos(cds_host());
        let mut parameters = DosPlotParameters::new(&calculation).unwrap();
        parameters.projection = Some(Projection::Atoms);
        parameters.total_projected = true;
        parameters.atoms = Some(vec!["S (1)".parse().unwrap()]);
        let plot = DosPlot::new(&calculation, &parameters).unwrap();
        assert_eq!(plot.projected.len(), 1);
        assert_eq!(plot.projected[0].label, "S (1)");
        // The fifth ion carries 0.05 on each of 9 components
        assert_relative_eq!(plot.projected[0].values[2], 0.45, epsilon = 1e-8);
    }

    #[test]
    fn unknown_species_are_rejected() {
        let calculation = with_dos(cds_host());
        let mut parameters = DosPlotParameters::new(&calculation).unwrap();
        parameters.species = Some(vec!["Te".into()]);
        assert!(matches!(
            DosPlot::new(&calculation, &parameters),
            Err(PlotError::UnknownSelection(_))
        ));
    }

    #[test]
    fn spin_down_is_negated() {
        let calculation = with_dos(cds_host().spin_polarised());
        let parameters = DosPlotParameters::new(&calculation).unwrap();
        assert_eq!(parameters.dos_range, (-8., 4.));
        let plot = DosPlot::new(&calculation, &parameters).unwrap();
        assert_relative_eq!(plot.total.down.as_ref().unwrap()[3], -6.);
        assert!(plot.projected.iter().all(|curve| curve.down.is_some()));

        let mut buffer = Vec::new();
        plot.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("energy,Total DOS (up),Total DOS (down),Cd s (up)"));
    }

    #[test]
    fn missing_doscar() {
        let calculation = Calculation::parse(&cds_host().render(), None).unwrap();
        assert!(matches!(
            DosPlotParameters::new(&calculation),
            Err(PlotError::MissingDos(_))
        ));
    }
}
