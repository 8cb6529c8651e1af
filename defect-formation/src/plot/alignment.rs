use super::export::write_columns;
use crate::corrections::{potential_alignment, scan_radii};
use crate::error::PlotError;
use crate::study::{DefectCellStudy, DefectStudy};
use std::io::Write;

/// Potential differences around the defects of one cell
#[derive(Clone, Debug)]
pub struct AlignmentPlot {
    pub title: String,
    /// Labels of the compared ions
    pub atoms: Vec<String>,
    /// Distance of each compared ion to the closest defect
    pub distances: Vec<f64>,
    /// Potential difference at each compared ion
    pub deltas: Vec<f64>,
    pub spheres_radius: f64,
    /// Radii of the scan
    pub radii: Vec<f64>,
    /// Mean difference outside spheres of each scanned radius, NaN when no ion remains
    pub means: Vec<f64>,
}

impl AlignmentPlot {
    pub fn new(
        study: &DefectStudy<'_>,
        cell: &DefectCellStudy<'_>,
        scan_points: usize,
    ) -> Result<Self, PlotError> {
        let spheres_radius = cell.parameters().spheres_radius;
        let alignment = match cell.alignment() {
            Some(alignment) => alignment.clone(),
            None => potential_alignment(study.host(), cell.cell(), study.defects(), spheres_radius)?,
        };

        let radii = scan_radii(cell.cell(), scan_points);
        let means = alignment
            .scan(&radii)
            .into_iter()
            .map(|mean| mean.unwrap_or(f64::NAN))
            .collect();

        Ok(Self {
            title: cell.title().to_string(),
            atoms: alignment.atoms.iter().map(|atom| atom.to_string()).collect(),
            distances: alignment.distances_to_closest_defect,
            deltas: alignment.deltas,
            spheres_radius,
            radii,
            means,
        })
    }

    /// Writes the ion distances and differences beside the radius scan
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PlotError> {
        let headers = ["distance", "potential difference", "radius", "mean outside"]
            .iter()
            .map(|header| header.to_string())
            .collect::<Vec<_>>();
        write_columns(
            writer,
            &headers,
            &[&self.distances, &self.deltas, &self.radii, &self.means],
        )
    }
}

#[cfg(test)]
mod test {
    use super::AlignmentPlot;
    use crate::defect::{Defect, DefectKind};
    use crate::study::{CellParameters, CorrectionSet, DefectStudyBuilder};
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::{cd_vacancy, cds_host};

    #[test]
    fn scan_reaches_the_lattice_size() {
        let host = Calculation::parse(&cds_host().render(), None).unwrap();
        let cell = Calculation::parse(&cd_vacancy(-2., -92., 0.1).render(), None).unwrap();
        let mut study = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![Defect::new(
                DefectKind::Vacancy {
                    atom: "Cd (1)".parse().unwrap(),
                },
                None,
            )
            .unwrap()])
            .with_corrections(CorrectionSet {
                makov_payne: false,
                ..CorrectionSet::default()
            })
            .build()
            .unwrap();
        study
            .add_defect_cell(
                &cell,
                CellParameters {
                    spheres_radius: 3.5,
                    electrons_in_cb: 0.,
                    holes_in_vb: 0.,
                },
            )
            .unwrap();

        let plot = AlignmentPlot::new(&study, &study.cells()[0], 7).unwrap();
        assert_eq!(plot.atoms.len(), 7);
        assert_eq!(plot.distances.len(), 7);
        assert!(plot.deltas.iter().all(|delta| (delta - 0.1).abs() < 1e-6));
        assert_eq!(plot.radii.len(), 7);
        assert_relative_eq!(plot.radii[0], 0.);
        assert_relative_eq!(plot.means[0], 0.1, epsilon = 1e-6);
        assert!(plot.means.last().unwrap().is_nan());

        let mut buffer = Vec::new();
        plot.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("distance,potential difference,radius,mean outside\n"));
    }
}
