//! Band edge corrections
//!
//! When the band edges of a second, more accurate, host calculation are available, the
//! formation energies computed with the first functional are corrected for the shift of the
//! valence band maximum and for perturbed host states (PHS) trapped in the shifted bands.

use defect_vasp::Calculation;

/// Shift of the band extrema `(ΔE_V, ΔE_C)` going from `host` to `host_b`
pub fn band_extrema_shift(host: &Calculation, host_b: &Calculation) -> (f64, f64) {
    (host_b.vbm - host.vbm, host_b.cbm - host.cbm)
}

/// Perturbed host state corrections `(holes, electrons)`
///
/// `holes_in_vb` holes trapped in the valence band and `electrons_in_cb` electrons in the
/// conduction band follow the band edges they sit in.
pub fn phs(holes_in_vb: f64, electrons_in_cb: f64, de_vbm: f64, de_cbm: f64) -> (f64, f64) {
    (-holes_in_vb * de_vbm, electrons_in_cb * de_cbm)
}

/// Correction of the electron reservoir for a cell of charge `charge` when the VBM moves by `de_vbm`
pub fn vbm(charge: f64, de_vbm: f64) -> f64 {
    charge * de_vbm
}

#[cfg(test)]
mod test {
    use super::{band_extrema_shift, phs, vbm};
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use proptest::prelude::*;
    use utilities::structures::cds_host;
    use utilities::FixtureFunctional;

    #[test]
    fn shift_between_two_hosts() {
        let host = Calculation::parse(&cds_host().render(), None).unwrap();
        let host_b = Calculation::parse(
            &cds_host()
                .with_functional(FixtureFunctional::Hse)
                .with_band_edges(0.6, 3.4)
                .render(),
            None,
        )
        .unwrap();
        let (de_vbm, de_cbm) = band_extrema_shift(&host, &host_b);
        assert_relative_eq!(de_vbm, -0.4, epsilon = 1e-10);
        assert_relative_eq!(de_cbm, 0.4, epsilon = 1e-10);
    }

    #[test]
    fn charged_cells_follow_the_valence_band() {
        assert_relative_eq!(vbm(-2., -0.4), 0.8);
        assert_relative_eq!(vbm(0., -0.4), 0.);
    }

    proptest! {
        #[test]
        fn trapped_carriers_follow_their_band(
            holes in 0.0f64..2.0,
            electrons in 0.0f64..2.0,
            de_vbm in -1.0f64..1.0,
            de_cbm in -1.0f64..1.0,
        ) {
            let (h, e) = phs(holes, electrons, de_vbm, de_cbm);
            prop_assert!((h + holes * de_vbm).abs() < 1e-12);
            prop_assert!((e - electrons * de_cbm).abs() < 1e-12);
            let (h0, e0) = phs(0., 0., de_vbm, de_cbm);
            prop_assert!(h0 == 0. && e0 == 0.);
        }
    }
}
