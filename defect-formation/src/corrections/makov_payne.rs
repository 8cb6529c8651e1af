use crate::constants::{
    SHAPE_FACTOR_BCC, SHAPE_FACTOR_FCC, SHAPE_FACTOR_HCP, SHAPE_FACTOR_OTHER, SHAPE_FACTOR_SC,
};
use crate::error::CorrectionError;
use serde::Deserialize;
use std::str::FromStr;

/// Lattice geometry of the host, fixing the shape factor of the image charge interaction
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geometry {
    Sc,
    Fcc,
    Bcc,
    Hcp,
    Other,
}

impl Geometry {
    /// The shape factor `c_sh`
    pub fn shape_factor(&self) -> f64 {
        match self {
            Geometry::Sc => SHAPE_FACTOR_SC,
            Geometry::Fcc => SHAPE_FACTOR_FCC,
            Geometry::Bcc => SHAPE_FACTOR_BCC,
            Geometry::Hcp => SHAPE_FACTOR_HCP,
            Geometry::Other => SHAPE_FACTOR_OTHER,
        }
    }
}

impl FromStr for Geometry {
    type Err = CorrectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sc" => Ok(Geometry::Sc),
            "fcc" => Ok(Geometry::Fcc),
            "bcc" => Ok(Geometry::Bcc),
            "hcp" => Ok(Geometry::Hcp),
            "other" => Ok(Geometry::Other),
            _ => Err(CorrectionError::UnknownGeometry(s.to_string())),
        }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match self {
            Geometry::Sc => "sc",
            Geometry::Fcc => "fcc",
            Geometry::Bcc => "bcc",
            Geometry::Hcp => "hcp",
            Geometry::Other => "other",
        };
        write!(f, "{}", label)
    }
}

/// Parameters of the Makov-Payne correction
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct MakovPayne {
    pub geometry: Geometry,
    /// Relative permittivity of the host
    pub relative_permittivity: f64,
    /// Madelung energy `E_MP(1, 1)` of a unit point charge in the supercell, in eV
    pub first_term: f64,
}

/// Makov-Payne image charge correction for a cell of charge `charge`
pub fn makov_payne(charge: f64, parameters: &MakovPayne) -> Result<f64, CorrectionError> {
    let permittivity = parameters.relative_permittivity;
    if permittivity == 0. {
        return Err(CorrectionError::ZeroPermittivity);
    }
    let shape = parameters.geometry.shape_factor();
    Ok((1. + shape * (1. - 1. / permittivity)) * charge.powi(2) * parameters.first_term
        / permittivity)
}

#[cfg(test)]
mod test {
    use super::{makov_payne, Geometry, MakovPayne};
    use crate::error::CorrectionError;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn geometries_parse_case_insensitively() {
        assert_eq!("FCC".parse::<Geometry>().unwrap(), Geometry::Fcc);
        assert_eq!(" hcp ".parse::<Geometry>().unwrap(), Geometry::Hcp);
        assert!(matches!(
            "diamond".parse::<Geometry>(),
            Err(CorrectionError::UnknownGeometry(_))
        ));
    }

    #[test]
    fn correction_for_a_doubly_charged_defect() {
        let parameters = MakovPayne {
            geometry: Geometry::Fcc,
            relative_permittivity: 10.,
            first_term: 1.5,
        };
        let expected = (1. - 0.343 * 0.9) * 4. * 1.5 / 10.;
        assert_relative_eq!(makov_payne(2., &parameters).unwrap(), expected);
        assert_relative_eq!(makov_payne(0., &parameters).unwrap(), 0.);
    }

    #[test]
    fn zero_permittivity_is_rejected() {
        let parameters = MakovPayne {
            geometry: Geometry::Sc,
            relative_permittivity: 0.,
            first_term: 1.5,
        };
        assert!(matches!(
            makov_payne(1., &parameters),
            Err(CorrectionError::ZeroPermittivity)
        ));
    }

    proptest! {
        #[test]
        fn correction_is_even_in_the_charge(
            charge in -4.0f64..4.0,
            permittivity in 1.0f64..30.0,
            first_term in 0.1f64..5.0,
        ) {
            let parameters = MakovPayne {
                geometry: Geometry::Other,
                relative_permittivity: permittivity,
                first_term,
            };
            let positive = makov_payne(charge, &parameters).unwrap();
            let negative = makov_payne(-charge, &parameters).unwrap();
            prop_assert!((positive - negative).abs() < 1e-12);
            prop_assert!(positive >= 0.);
        }
    }
}
