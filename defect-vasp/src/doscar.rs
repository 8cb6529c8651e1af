use crate::search::parse_row;
use crate::{Calculation, Result, Spin, VaspError};
use ndarray::{s, Array1, Array2};
use ndarray_stats::QuantileExt;

const HEADER_LINES: usize = 6;

/// A quantity resolved into spin channels
///
/// For unpolarised runs only `total` is present.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinResolved<T> {
    /// Sum over both channels
    pub total: T,
    /// Majority channel
    pub up: Option<T>,
    /// Minority channel
    pub down: Option<T>,
}

/// Orbital-projected density of states, each array shaped `(orbital groups, NEDOS)`
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedDos {
    /// Names of the orbital groups, `s p d` or `s p d f`
    pub orbitals: Vec<String>,
    /// One entry per ion, in atom order
    pub per_atom: Vec<SpinResolved<Array2<f64>>>,
    /// One entry per species, summed over its ions, in composition order
    pub per_species: Vec<SpinResolved<Array2<f64>>>,
}

/// The density of states written to a `DOSCAR`
#[derive(Clone, Debug, PartialEq)]
pub struct Dos {
    /// The energy grid in eV
    pub energies: Array1<f64>,
    /// The total density of states
    pub total: SpinResolved<Array1<f64>>,
    /// Projections, only written when `LORBIT = 11`
    pub projected: Option<ProjectedDos>,
}

fn max_excluding_first(values: &Array1<f64>) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    values.slice(s![1..]).max().ok().copied()
}

fn orbital_group_sizes(orbitals: usize) -> Result<&'static [usize]> {
    match orbitals {
        3 => Ok(&[1, 3, 5]),
        4 => Ok(&[1, 3, 5, 7]),
        other => Err(VaspError::Doscar(format!(
            "Projected DOS with {} orbital channels is not supported",
            other
        ))),
    }
}

impl Dos {
    /// Parses `text` using the layout described by `calculation`
    pub fn parse(text: &str, calculation: &Calculation) -> Result<Self> {
        let tags = &calculation.tags;
        let nedos = tags.nedos;
        let number_of_atoms = calculation.number_of_atoms();
        let mut lines = text.lines().collect::<Vec<_>>();
        while lines.last().map_or(false, |line| line.trim().is_empty()) {
            lines.pop();
        }

        let projected = tags.lorbit == 11;
        let expected = if projected {
            HEADER_LINES + nedos + number_of_atoms * (nedos + 1)
        } else {
            HEADER_LINES + nedos
        };
        if lines.len() < expected || (projected && lines.len() != expected) {
            return Err(VaspError::Doscar(
                "The DOSCAR file is inconsistent with the OUTCAR file".into(),
            ));
        }

        let channels = tags.ispin.channels();
        let total_rows = rows(&lines[HEADER_LINES..HEADER_LINES + nedos], 1 + channels)?;
        let energies = total_rows.column(0).to_owned();
        let total = match tags.ispin {
            Spin::Unpolarised => SpinResolved {
                total: total_rows.column(1).to_owned(),
                up: None,
                down: None,
            },
            Spin::Polarised => {
                let up = total_rows.column(1).to_owned();
                let down = total_rows.column(2).to_owned();
                SpinResolved {
                    total: &up + &down,
                    up: Some(up),
                    down: Some(down),
                }
            }
        };

        let projected = if projected {
            Some(parse_projected(&lines[HEADER_LINES + nedos..], calculation)?)
        } else {
            None
        };
        tracing::debug!("Read {} DOS points", energies.len());

        Ok(Self {
            energies,
            total,
            projected,
        })
    }

    /// Largest value of the total DOS, ignoring the first energy point
    pub fn max_total(&self) -> Option<f64> {
        max_excluding_first(&self.total.total)
    }

    /// Largest value of the majority channel, ignoring the first energy point
    pub fn max_up(&self) -> Option<f64> {
        self.total.up.as_ref().and_then(max_excluding_first)
    }

    /// Largest value of the minority channel, ignoring the first energy point
    pub fn max_down(&self) -> Option<f64> {
        self.total.down.as_ref().and_then(max_excluding_first)
    }
}

/// Parses `lines` into a `(rows, columns)` array, requiring at least `minimum` columns
fn rows(lines: &[&str], minimum: usize) -> Result<Array2<f64>> {
    let parsed = lines
        .iter()
        .map(|line| parse_row(line))
        .collect::<Result<Vec<_>>>()?;
    let columns = parsed.first().map_or(0, Vec::len);
    if columns < minimum || parsed.iter().any(|row| row.len() != columns) {
        return Err(VaspError::Doscar(format!(
            "Expected rows of at least {} equal columns in the DOSCAR",
            minimum
        )));
    }
    Array2::from_shape_vec(
        (parsed.len(), columns),
        parsed.into_iter().flatten().collect(),
    )
    .map_err(|e| VaspError::Doscar(e.to_string()))
}

fn parse_projected(lines: &[&str], calculation: &Calculation) -> Result<ProjectedDos> {
    let nedos = calculation.tags.nedos;
    let channels = calculation.tags.ispin.channels();
    let sizes = orbital_group_sizes(calculation.orbitals.len())?;
    let components = sizes.iter().sum::<usize>();

    let per_atom = lines
        .chunks(nedos + 1)
        .map(|block| {
            let data = rows(&block[1..], 1 + components * channels)?;
            let mut total = Array2::<f64>::zeros((sizes.len(), nedos));
            let mut up = Array2::<f64>::zeros((sizes.len(), nedos));
            let mut down = Array2::<f64>::zeros((sizes.len(), nedos));
            let mut offset = 0;
            for (group, size) in sizes.iter().enumerate() {
                for component in offset..offset + size {
                    for channel in 0..channels {
                        let column = data.column(1 + component * channels + channel);
                        let mut target = total.row_mut(group);
                        target += &column;
                        let mut target = match channel {
                            0 => up.row_mut(group),
                            _ => down.row_mut(group),
                        };
                        target += &column;
                    }
                }
                offset += size;
            }
            Ok(match calculation.tags.ispin {
                Spin::Unpolarised => SpinResolved {
                    total,
                    up: None,
                    down: None,
                },
                Spin::Polarised => SpinResolved {
                    total,
                    up: Some(up),
                    down: Some(down),
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut per_species = Vec::new();
    let mut start = 0;
    for (species, count) in calculation.composition.iter() {
        let summed = sum_over(&per_atom[start..start + count]).ok_or_else(|| {
            VaspError::Doscar(format!("No projected DOS found for {}", species))
        })?;
        per_species.push(summed);
        start += count;
    }

    Ok(ProjectedDos {
        orbitals: calculation.orbitals.clone(),
        per_atom,
        per_species,
    })
}

fn sum_over(atoms: &[SpinResolved<Array2<f64>>]) -> Option<SpinResolved<Array2<f64>>> {
    let (first, rest) = atoms.split_first()?;
    Some(rest.iter().fold(first.clone(), |mut sum, atom| {
        sum.total += &atom.total;
        if let (Some(up), Some(atom_up)) = (sum.up.as_mut(), atom.up.as_ref()) {
            *up += atom_up;
        }
        if let (Some(down), Some(atom_down)) = (sum.down.as_mut(), atom.down.as_ref()) {
            *down += atom_down;
        }
        sum
    }))
}

#[cfg(test)]
mod test {
    use super::Dos;
    use crate::{Calculation, VaspError};
    use approx::assert_relative_eq;
    use utilities::structures;

    #[test]
    fn total_and_projected_dos_are_read() {
        let fixture = structures::cds_host();
        let calculation =
            Calculation::parse(&fixture.render(), Some(&fixture.render_doscar())).unwrap();
        let dos = calculation.dos.as_ref().unwrap();

        assert_eq!(dos.energies.len(), 5);
        assert_relative_eq!(dos.energies[0], -10., epsilon = 1e-6);
        assert_relative_eq!(dos.total.total[3], 3., epsilon = 1e-6);
        assert_relative_eq!(dos.max_total().unwrap(), 4., epsilon = 1e-6);
        assert!(dos.max_up().is_none());

        let projected = dos.projected.as_ref().unwrap();
        assert_eq!(projected.per_atom.len(), 8);
        assert_eq!(projected.per_species.len(), 2);
        assert_eq!(projected.per_atom[0].total.dim(), (3, 5));
        // five d components of the second atom, each 0.02
        assert_relative_eq!(projected.per_atom[1].total[(2, 0)], 0.1, epsilon = 1e-6);
        // p channel summed over the four Cd ions: 3 * (0.01 + 0.02 + 0.03 + 0.04)
        assert_relative_eq!(projected.per_species[0].total[(1, 4)], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn spin_channels_are_split() {
        let fixture = structures::cds_host().spin_polarised();
        let calculation =
            Calculation::parse(&fixture.render(), Some(&fixture.render_doscar())).unwrap();
        let dos = calculation.dos.as_ref().unwrap();
        assert_relative_eq!(dos.total.total[2], 6., epsilon = 1e-6);
        assert_relative_eq!(dos.max_up().unwrap(), 4., epsilon = 1e-6);
        assert_relative_eq!(dos.max_down().unwrap(), 8., epsilon = 1e-6);

        let projected = dos.projected.as_ref().unwrap();
        let atom = &projected.per_atom[0];
        assert_relative_eq!(atom.total[(0, 0)], 0.02, epsilon = 1e-6);
        assert_relative_eq!(atom.up.as_ref().unwrap()[(0, 0)], 0.01, epsilon = 1e-6);
        assert_relative_eq!(atom.down.as_ref().unwrap()[(1, 0)], 0.03, epsilon = 1e-6);
    }

    #[test]
    fn truncated_doscar_is_rejected() {
        let fixture = structures::cds_host();
        let calculation = Calculation::parse(&fixture.render(), None).unwrap();
        let doscar = fixture.render_doscar();
        let truncated = doscar.lines().take(20).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            Dos::parse(&truncated, &calculation),
            Err(VaspError::Doscar(_))
        ));
    }

    #[test]
    fn without_projections_only_the_total_is_read() {
        let mut fixture = structures::cds_host();
        fixture.lorbit = 10;
        let calculation =
            Calculation::parse(&fixture.render(), Some(&fixture.render_doscar())).unwrap();
        let dos = calculation.dos.unwrap();
        assert!(dos.projected.is_none());
        assert_eq!(dos.total.total.len(), 5);
    }
}
