use crate::{Result, VaspError};

/// Band energies and occupations at a single k-point, for a single spin channel
#[derive(Clone, Debug, PartialEq)]
pub struct BandOccupations {
    /// Eigenvalues in eV, ordered by band index
    pub energies: Vec<f64>,
    /// Occupation of each band
    pub occupations: Vec<f64>,
}

impl BandOccupations {
    /// Index of the highest band carrying any occupation
    pub fn highest_occupied(&self) -> Option<usize> {
        self.occupations.iter().rposition(|&occupation| occupation != 0.)
    }
}

/// The valence band maximum and conduction band minimum over every k-point
///
/// At each k-point the last band with non-zero occupation is located. The VBM is the
/// highest of those energies and the CBM the lowest energy of the band directly above.
pub fn band_extrema(bands: &[BandOccupations]) -> Result<(f64, f64)> {
    if bands.is_empty() {
        return Err(VaspError::Import("No band occupations were read".into()));
    }
    let mut vbm = f64::NEG_INFINITY;
    let mut cbm = f64::INFINITY;
    for (kpoint, block) in bands.iter().enumerate() {
        let highest = block.highest_occupied().ok_or_else(|| {
            VaspError::Import(format!("No occupied band found at k-point {}", kpoint + 1))
        })?;
        let above = block.energies.get(highest + 1).ok_or_else(|| {
            VaspError::Import(format!(
                "Every band is occupied at k-point {}, the conduction band is not available",
                kpoint + 1
            ))
        })?;
        vbm = vbm.max(block.energies[highest]);
        cbm = cbm.min(*above);
    }
    Ok((vbm, cbm))
}

#[cfg(test)]
mod test {
    use super::{band_extrema, BandOccupations};
    use approx::assert_relative_eq;

    fn block(energies: &[f64], occupations: &[f64]) -> BandOccupations {
        BandOccupations {
            energies: energies.to_vec(),
            occupations: occupations.to_vec(),
        }
    }

    #[test]
    fn extrema_are_taken_across_kpoints() {
        let bands = vec![
            block(&[-5., 1.0, 3.0], &[2., 2., 0.]),
            block(&[-4., 1.5, 2.5], &[2., 2., 0.]),
        ];
        let (vbm, cbm) = band_extrema(&bands).unwrap();
        assert_relative_eq!(vbm, 1.5);
        assert_relative_eq!(cbm, 2.5);
    }

    #[test]
    fn partial_occupation_counts_as_occupied() {
        let bands = vec![block(&[0., 1., 2., 3.], &[1., 1., 0.01, 0.])];
        let (vbm, cbm) = band_extrema(&bands).unwrap();
        assert_relative_eq!(vbm, 2.);
        assert_relative_eq!(cbm, 3.);
    }

    #[test]
    fn fully_occupied_blocks_are_rejected() {
        let bands = vec![block(&[0., 1.], &[2., 2.])];
        assert!(band_extrema(&bands).is_err());
        let empty = vec![block(&[0., 1.], &[0., 0.])];
        assert!(band_extrema(&empty).is_err());
    }
}
