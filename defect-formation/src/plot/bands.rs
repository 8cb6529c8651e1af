use super::export::write_columns;
use crate::error::PlotError;
use defect_vasp::Calculation;
use std::io::Write;

/// Options of a band diagram
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BandDiagramParameters {
    /// Measure energies from the valence band maximum
    pub vbm_shift: bool,
    /// Single out the valence band holding the VBM and the band above it
    pub highlight_band_edges: bool,
    /// Names of high symmetry points evenly spaced along the path
    pub kpoint_labels: Vec<String>,
}

/// Band energies along a k-point path
#[derive(Clone, Debug)]
pub struct BandDiagram {
    pub title: String,
    /// Cumulative distance along the path, repeated for the second spin channel
    pub path: Vec<f64>,
    /// One curve per band
    pub bands: Vec<Vec<f64>>,
    /// Indices into `bands` of the highlighted valence and conduction bands
    pub band_edges: Option<(usize, usize)>,
    /// Position and name of each high symmetry point
    pub ticks: Vec<(f64, String)>,
    pub vbm: f64,
}

impl BandDiagram {
    pub fn new(calculation: &Calculation, parameters: &BandDiagramParameters) -> Result<Self, PlotError> {
        if calculation.tags.icharg != 11 {
            return Err(PlotError::NotBandStructure(calculation.id()));
        }
        let shift = if parameters.vbm_shift {
            calculation.vbm
        } else {
            0.
        };
        let vbm = calculation.vbm - shift;

        let nbands = calculation
            .bands
            .iter()
            .map(|block| block.energies.len())
            .min()
            .unwrap_or(0);
        let bands = (0..nbands)
            .map(|band| {
                calculation
                    .bands
                    .iter()
                    .map(|block| block.energies[band] - shift)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let distances = calculation.kpoints.path_distances();
        let path = std::iter::repeat(distances.iter().copied())
            .take(calculation.tags.ispin.channels())
            .flatten()
            .collect::<Vec<_>>();

        let band_edges = if parameters.highlight_band_edges {
            bands
                .iter()
                .position(|band| {
                    band.iter().copied().fold(f64::NEG_INFINITY, f64::max) == vbm
                })
                .filter(|&index| index + 1 < bands.len())
                .map(|index| (index, index + 1))
        } else {
            None
        };

        let ticks = high_symmetry_ticks(&path, &parameters.kpoint_labels)?;

        Ok(Self {
            title: calculation.title(),
            path,
            bands,
            band_edges,
            ticks,
            vbm,
        })
    }

    /// Writes the path coordinate and one column per band
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlotError> {
        let mut headers = vec!["k".to_string()];
        headers.extend((1..=self.bands.len()).map(|band| format!("band {}", band)));
        let mut columns: Vec<&[f64]> = vec![&self.path];
        columns.extend(self.bands.iter().map(Vec::as_slice));
        write_columns(writer, &headers, &columns)
    }
}

/// The first point of each of `labels.len() - 1` equal segments of `path`, and its last point
fn high_symmetry_ticks(path: &[f64], labels: &[String]) -> Result<Vec<(f64, String)>, PlotError> {
    if labels.is_empty() {
        return Ok(Vec::new());
    }
    let segments = labels.len().saturating_sub(1).max(1);
    if path.is_empty() || path.len() % segments != 0 {
        return Err(PlotError::KPointLabels {
            points: path.len(),
            segments,
        });
    }
    let length = path.len() / segments;
    let mut positions = path.chunks(length).map(|chunk| chunk[0]).collect::<Vec<_>>();
    if labels.len() > 1 {
        positions.push(path[path.len() - 1]);
    }
    Ok(positions
        .into_iter()
        .zip(labels.iter().cloned())
        .collect())
}

#[cfg(test)]
mod test {
    use super::{BandDiagram, BandDiagramParameters};
    use crate::error::PlotError;
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::cds_host;

    fn band_structure(points: usize) -> Calculation {
        Calculation::parse(&cds_host().band_structure(points).render(), None).unwrap()
    }

    #[test]
    fn self_consistent_runs_are_rejected() {
        let calculation = Calculation::parse(&cds_host().render(), None).unwrap();
        assert!(matches!(
            BandDiagram::new(&calculation, &BandDiagramParameters::default()),
            Err(PlotError::NotBandStructure(_))
        ));
    }

    #[test]
    fn bands_follow_the_path() {
        let calculation = band_structure(5);
        let diagram = BandDiagram::new(
            &calculation,
            &BandDiagramParameters {
                vbm_shift: true,
                highlight_band_edges: true,
                kpoint_labels: vec![],
            },
        )
        .unwrap();
        assert_eq!(diagram.bands.len(), 4);
        assert_eq!(diagram.path.len(), 5);
        assert_relative_eq!(diagram.path[0], 0.);
        assert!(diagram.path.windows(2).all(|pair| pair[1] > pair[0]));
        assert_relative_eq!(diagram.vbm, 0.);
        assert_eq!(diagram.band_edges, Some((1, 2)));
        assert_relative_eq!(diagram.bands[1][0], 0.);
    }

    #[test]
    fn labels_split_the_path_evenly() {
        let calculation = band_structure(6);
        let parameters = BandDiagramParameters {
            kpoint_labels: vec!["G".into(), "X".into(), "M".into()],
            ..BandDiagramParameters::default()
        };
        let diagram = BandDiagram::new(&calculation, &parameters).unwrap();
        assert_eq!(diagram.ticks.len(), 3);
        assert_eq!(diagram.ticks[1].1, "X");
        assert_relative_eq!(diagram.ticks[1].0, diagram.path[3]);
        assert_relative_eq!(diagram.ticks[2].0, diagram.path[5]);

        let uneven = BandDiagramParameters {
            kpoint_labels: ["G", "X", "M", "R", "G"].iter().map(|s| s.to_string()).collect(),
            ..BandDiagramParameters::default()
        };
        assert!(matches!(
            BandDiagram::new(&calculation, &uneven),
            Err(PlotError::KPointLabels { points: 6, segments: 4 })
        ));
    }
}
