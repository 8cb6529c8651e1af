//! Formation energy plots and transition level diagrams of a defect study

use super::export::write_columns;
use crate::error::PlotError;
use crate::study::{fermi_grid, DefectStudy, TransitionLevel, CALCULATED_GAP};
use std::io::Write;

/// Distance between the outermost charge labels and the outermost levels
const LABEL_OFFSET: f64 = 0.06;

/// Fermi level window and sampling of a formation energy plot
#[derive(Clone, Debug, PartialEq)]
pub struct FormationPlotParameters {
    pub energy_range: (f64, f64),
    pub points: usize,
}

impl FormationPlotParameters {
    /// From the VBM to slightly beyond the largest gap of `study`
    pub fn new(study: &DefectStudy<'_>, margin: f64, points: usize) -> Self {
        Self {
            energy_range: (0., study.max_gap() * margin),
            points,
        }
    }
}

/// Formation energies of every charge state against the Fermi level
#[derive(Clone, Debug)]
pub struct FormationPlot {
    pub title: String,
    pub fermi_levels: Vec<f64>,
    /// Charge of each cell and its formation energies on `fermi_levels`
    pub lines: Vec<(f64, Vec<f64>)>,
    /// Lowest formation energy on `fermi_levels`
    pub lowest: Vec<f64>,
    /// Vertical markers at each named gap
    pub gaps: Vec<(String, f64)>,
    pub transition_levels: Vec<TransitionLevel>,
}

impl FormationPlot {
    pub fn new(study: &DefectStudy<'_>, parameters: &FormationPlotParameters) -> Result<Self, PlotError> {
        let (lower, upper) = parameters.energy_range;
        let upper = study.max_gap().max(upper);
        let grid = fermi_grid(lower, upper, parameters.points).to_vec();

        let lines = study
            .cells()
            .iter()
            .map(|cell| {
                let energies = grid
                    .iter()
                    .map(|&fermi_energy| cell.formation_energy(fermi_energy))
                    .collect();
                (cell.charge(), energies)
            })
            .collect();
        let lowest = study
            .lowest_formation_energies(&grid)?
            .into_iter()
            .map(|(_, energy)| energy)
            .collect();
        let transition_levels = study.transition_levels(&grid)?;

        Ok(Self {
            title: study.title().to_string(),
            fermi_levels: grid,
            lines,
            lowest,
            gaps: study.gaps().to_vec(),
            transition_levels,
        })
    }

    /// Writes the Fermi levels, one column per charge state and the lowest envelope
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlotError> {
        let mut headers = vec!["Fermi level".to_string()];
        headers.extend(self.lines.iter().map(|(charge, _)| format!("q = {}", charge)));
        headers.push("lowest".into());

        let mut columns: Vec<&[f64]> = vec![&self.fermi_levels];
        columns.extend(self.lines.iter().map(|(_, energies)| energies.as_slice()));
        columns.push(&self.lowest);
        write_columns(writer, &headers, &columns)
    }
}

/// Fermi level window, sampling and conduction band reference of a transition level diagram
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionDiagramParameters {
    pub energy_range: (f64, f64),
    pub points: usize,
    /// Label of the gap placing the CBM
    pub gap_choice: String,
}

impl TransitionDiagramParameters {
    pub fn new(study: &DefectStudy<'_>, lower: f64, margin: f64, points: usize) -> Self {
        Self {
            energy_range: (lower, study.max_gap() * margin),
            points,
            gap_choice: CALCULATED_GAP.to_string(),
        }
    }
}

/// Transition levels drawn inside the gap
#[derive(Clone, Debug)]
pub struct TransitionDiagram {
    pub title: String,
    /// Position of the CBM above the VBM
    pub gap: f64,
    pub levels: Vec<TransitionLevel>,
    /// Position and charge of each label of a stable charge region
    pub charge_labels: Vec<(f64, f64)>,
}

impl TransitionDiagram {
    pub fn new(study: &DefectStudy<'_>, parameters: &TransitionDiagramParameters) -> Result<Self, PlotError> {
        let gap = study.gap(&parameters.gap_choice)?;
        let (lower, upper) = parameters.energy_range;
        let grid = fermi_grid(lower, upper, parameters.points).to_vec();
        let levels = study.transition_levels(&grid)?;
        let charge_labels = charge_labels(&levels);

        Ok(Self {
            title: study.title().to_string(),
            gap,
            levels,
            charge_labels,
        })
    }

    /// Writes one row per transition level
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlotError> {
        let headers = ["old charge", "new charge", "Fermi level", "formation energy"]
            .iter()
            .map(|header| header.to_string())
            .collect::<Vec<_>>();
        let old = self.levels.iter().map(|level| level.old_charge).collect::<Vec<_>>();
        let new = self.levels.iter().map(|level| level.new_charge).collect::<Vec<_>>();
        let fermi = self.levels.iter().map(|level| level.fermi_energy).collect::<Vec<_>>();
        let energy = self
            .levels
            .iter()
            .map(|level| level.formation_energy)
            .collect::<Vec<_>>();
        write_columns(writer, &headers, &[&old, &new, &fermi, &energy])
    }
}

/// Labels the regions below, between and above `levels` with their stable charges
///
/// Charges are taken in decreasing order, matching the regions from the VBM upwards.
fn charge_labels(levels: &[TransitionLevel]) -> Vec<(f64, f64)> {
    let (first, last) = match (levels.first(), levels.last()) {
        (Some(first), Some(last)) => (first.fermi_energy, last.fermi_energy),
        _ => return Vec::new(),
    };

    let mut charges = levels
        .iter()
        .flat_map(|level| [level.new_charge, level.old_charge])
        .collect::<Vec<_>>();
    charges.sort_by(|a, b| b.total_cmp(a));
    charges.dedup();

    let positions = std::iter::once(first - LABEL_OFFSET)
        .chain(
            levels
                .windows(2)
                .map(|pair| (pair[0].fermi_energy + pair[1].fermi_energy) / 2.),
        )
        .chain(std::iter::once(last + LABEL_OFFSET));

    positions.zip(charges.into_iter()).collect()
}
