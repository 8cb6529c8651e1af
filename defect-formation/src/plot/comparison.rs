use super::dos::{DosPlot, DosPlotParameters};
use crate::error::PlotError;
use crate::study::DefectStudy;
use defect_vasp::Calculation;

/// Shared windows of a DOS comparison
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DosComparisonParameters {
    /// Energy window of every plot, each calculation's own `EMIN`-`EMAX` when `None`
    pub energy_range: Option<(f64, f64)>,
    /// DOS window of every plot
    pub dos_range: Option<(f64, f64)>,
    /// Shift each defect cell by its potential alignment
    pub align_potential: bool,
}

/// The DOS of the host beside the DOS of each defect cell of a study
#[derive(Clone, Debug)]
pub struct DosComparison {
    pub title: String,
    pub host: DosPlot,
    /// Charge and DOS of each defect cell, by increasing charge
    pub cells: Vec<(f64, DosPlot)>,
}

impl DosComparison {
    pub fn new(study: &DefectStudy<'_>, parameters: &DosComparisonParameters) -> Result<Self, PlotError> {
        let windowed = |calculation: &Calculation| -> Result<DosPlotParameters, PlotError> {
            let mut dos_parameters = DosPlotParameters::new(calculation)?;
            if let Some(range) = parameters.energy_range {
                dos_parameters.energy_range = range;
            }
            if let Some(range) = parameters.dos_range {
                dos_parameters.dos_range = range;
            }
            Ok(dos_parameters)
        };

        let host_parameters = windowed(study.host())?;
        let mut host = DosPlot::new(study.host(), &host_parameters)?;
        host.title = study.host().composition.display_name(true);

        let mut cells = study
            .cells()
            .iter()
            .map(|cell| {
                let mut dos_parameters = windowed(cell.cell())?;
                if parameters.align_potential {
                    dos_parameters.input_shift = cell
                        .alignment()
                        .and_then(|alignment| alignment.mean_outside)
                        .unwrap_or_default();
                }
                let mut plot = DosPlot::new(cell.cell(), &dos_parameters)?;
                plot.title = cell.title().to_string();
                Ok((cell.charge(), plot))
            })
            .collect::<Result<Vec<_>, PlotError>>()?;
        cells.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            title: format!("Comparison of the DOS of {}", study.id()),
            host,
            cells,
        })
    }
}
