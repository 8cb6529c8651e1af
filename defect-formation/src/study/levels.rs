//! Lowest formation energies and charge transition levels
//!
//! Each defect cell contributes a line `E_for(E_F) = E_for(0) + q E_F`. The stable charge state
//! at a given Fermi level is the one with the lowest line, and a transition level is a Fermi
//! level at which the stable charge changes.

use ndarray::Array1;
use rayon::prelude::*;

/// A change of the stable charge state
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransitionLevel {
    /// Fermi level at which the new charge becomes stable
    pub fermi_energy: f64,
    /// Formation energy at the transition
    pub formation_energy: f64,
    /// Stable charge above the transition
    pub new_charge: f64,
    /// Stable charge below the transition
    pub old_charge: f64,
}

impl std::fmt::Display for TransitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:.0}/{:.0} : {:.5}eV",
            self.old_charge, self.new_charge, self.fermi_energy
        )
    }
}

/// `points` evenly spaced Fermi levels from `start` to `end` inclusive
pub fn fermi_grid(start: f64, end: f64, points: usize) -> Array1<f64> {
    Array1::linspace(start, end, points)
}

/// Index and value of the lowest line `(charge, intercept)` at `fermi_energy`
///
/// Ties are resolved in favour of the first line.
pub fn lowest_line(lines: &[(f64, f64)], fermi_energy: f64) -> Option<(usize, f64)> {
    lines
        .iter()
        .map(|(charge, intercept)| intercept + charge * fermi_energy)
        .enumerate()
        .fold(None, |lowest, (index, energy)| match lowest {
            Some((_, minimum)) if minimum <= energy => lowest,
            _ => Some((index, energy)),
        })
}

/// The lowest line index and value at every point of `grid`
pub fn lowest_lines(lines: &[(f64, f64)], grid: &[f64]) -> Vec<Option<(usize, f64)>> {
    grid.par_iter()
        .map(|&fermi_energy| lowest_line(lines, fermi_energy))
        .collect()
}

/// Transition levels of the lines `(charge, intercept)` sampled on `grid`
///
/// A level is recorded at the first grid point where the stable charge differs from the one at
/// the previous point.
pub fn transition_levels_of(lines: &[(f64, f64)], grid: &[f64]) -> Vec<TransitionLevel> {
    let lowest = lowest_lines(lines, grid)
        .into_iter()
        .flatten()
        .map(|(index, energy)| (lines[index].0, energy))
        .collect::<Vec<_>>();

    grid.iter()
        .zip(lowest.iter())
        .collect::<Vec<_>>()
        .windows(2)
        .filter(|pair| pair[0].1 .0 != pair[1].1 .0)
        .map(|pair| {
            let (&fermi_energy, &(new_charge, formation_energy)) = pair[1];
            TransitionLevel {
                fermi_energy,
                formation_energy,
                new_charge,
                old_charge: pair[0].1 .0,
            }
        })
        .collect()
}
