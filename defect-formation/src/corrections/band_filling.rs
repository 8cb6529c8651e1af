//! Moss-Burstein band filling
//!
//! Shallow defects in small supercells occupy dispersive host bands. The excess energy of
//! electrons sitting above the aligned conduction band minimum, and of holes below the
//! aligned valence band maximum, is removed.

use defect_vasp::{Calculation, Spin};

fn heaviside(x: f64) -> f64 {
    if x > 0. {
        1.
    } else if x == 0. {
        0.5
    } else {
        0.
    }
}

/// k-point weights of each band block of `calculation`, spin channels sharing the weight
fn block_weights(calculation: &Calculation) -> Vec<f64> {
    let spin = calculation.tags.ispin;
    let scale = match spin {
        Spin::Unpolarised => 1.,
        Spin::Polarised => 0.5,
    };
    std::iter::repeat(calculation.kpoints.weights.iter())
        .take(spin.channels())
        .flatten()
        .map(|weight| weight * scale)
        .collect()
}

/// The Moss-Burstein corrections `(acceptor, donor)` of `defect_cell`
///
/// The host band edges are shifted by the potential alignment `delta` before being compared with
/// the eigenvalues of the defect cell.
pub fn moss_burstein(host: &Calculation, defect_cell: &Calculation, delta: f64) -> (f64, f64) {
    let conduction_edge = host.cbm + delta;
    let valence_edge = host.vbm + delta;
    let max_occupation = defect_cell.tags.ispin.max_occupation();

    let (acceptor, donor) = defect_cell
        .bands
        .iter()
        .zip(block_weights(defect_cell))
        .map(|(block, weight)| {
            let (holes, electrons) = block
                .energies
                .iter()
                .zip(block.occupations.iter())
                .fold((0., 0.), |(holes, electrons), (&energy, &occupation)| {
                    (
                        holes
                            + (max_occupation - occupation)
                                * (valence_edge - energy)
                                * heaviside(valence_edge - energy),
                        electrons
                            + occupation
                                * (energy - conduction_edge)
                                * heaviside(energy - conduction_edge),
                    )
                });
            (weight * holes, weight * electrons)
        })
        .fold((0., 0.), |(a, d), (holes, electrons)| (a + holes, d + electrons));

    tracing::debug!(
        "Moss-Burstein corrections for {}: acceptor {:.5} eV, donor {:.5} eV",
        defect_cell.id(),
        -acceptor,
        -donor
    );
    (-acceptor, -donor)
}

#[cfg(test)]
mod test {
    use super::moss_burstein;
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use proptest::prelude::*;
    use utilities::structures::{cd_vacancy, cds_host};

    fn host() -> Calculation {
        Calculation::parse(&cds_host().render(), None).unwrap()
    }

    fn partially_filled() -> Calculation {
        let mut fixture = cd_vacancy(0., -95., 0.);
        fixture.bands = vec![
            vec![(-4., 2.), (0.8, 1.5), (3.2, 1.0), (5., 0.)],
            vec![(-4., 2.), (1.0, 2.), (3.4, 0.5), (5., 0.)],
        ];
        Calculation::parse(&fixture.render(), None).unwrap()
    }

    #[test]
    fn filled_host_like_bands_need_no_correction() {
        let host = host();
        let defect = Calculation::parse(&cd_vacancy(0., -95., 0.).render(), None).unwrap();
        let (acceptor, donor) = moss_burstein(&host, &defect, 0.);
        assert_relative_eq!(acceptor, 0.);
        assert_relative_eq!(donor, 0.);
    }

    #[test]
    fn partially_filled_bands_are_corrected() {
        let (acceptor, donor) = moss_burstein(&host(), &partially_filled(), 0.);
        assert_relative_eq!(acceptor, -0.025, epsilon = 1e-10);
        assert_relative_eq!(donor, -0.2, epsilon = 1e-10);
    }

    #[test]
    fn band_edges_follow_the_alignment() {
        let (acceptor, donor) = moss_burstein(&host(), &partially_filled(), 0.1);
        assert_relative_eq!(acceptor, -0.0375, epsilon = 1e-10);
        assert_relative_eq!(donor, -0.1375, epsilon = 1e-10);
    }

    #[test]
    fn spin_channels_share_the_weight() {
        let mut fixture = cd_vacancy(0., -95., 0.);
        fixture.bands = vec![
            vec![(-4., 2.), (1.0, 2.), (3.2, 1.0), (5., 0.)],
            vec![(-4., 2.), (1.0, 2.), (3.2, 1.0), (5., 0.)],
        ];
        let polarised = Calculation::parse(&fixture.clone().spin_polarised().render(), None).unwrap();
        // Each channel holds half an electron at 3.2 eV, weighted by half the k-point weight
        let (_, donor) = moss_burstein(&host(), &polarised, 0.);
        assert_relative_eq!(donor, -0.5 * 0.2 * 0.5 * 2., epsilon = 1e-10);
    }

    proptest! {
        #[test]
        fn corrections_never_raise_the_energy(delta in -1.0f64..1.0) {
            let (acceptor, donor) = moss_burstein(&host(), &partially_filled(), delta);
            prop_assert!(acceptor <= 0.);
            prop_assert!(donor <= 0.);
        }
    }
}
