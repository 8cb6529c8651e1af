use crate::OutcarFixture;
use rand::{thread_rng, Rng};

/// Edge of the cubic fixture cells in Angstrom
pub const SIDE: f64 = 6.0;
/// Valence band maximum of the fixture host
pub const HOST_VBM: f64 = 1.0;
/// Conduction band minimum of the fixture host
pub const HOST_CBM: f64 = 3.0;
/// Total energy of the fixture host
pub const HOST_ENERGY: f64 = -100.0;

/// Eight ion CdS host on a 2x2x2 grid
pub fn cds_host() -> OutcarFixture {
    OutcarFixture::cubic(&[("Cd", 4, 12.), ("S", 4, 6.)], SIDE)
        .with_energy(HOST_ENERGY)
        .with_band_edges(HOST_VBM, HOST_CBM)
}

/// The host with `Cd (1)` removed, carrying `charge`, with its potentials offset by `shift`
pub fn cd_vacancy(charge: f64, energy: f64, shift: f64) -> OutcarFixture {
    cds_host()
        .without_atom("Cd", 1)
        .with_charge(charge)
        .with_energy(energy)
        .with_potential_shift(shift)
}

/// The host with `S (2)` replaced by a Cl ion on the same site
pub fn cl_on_s(charge: f64, energy: f64) -> OutcarFixture {
    let host = cds_host();
    let site = host.positions[host.flat_index("S", 2)];
    host.without_atom("S", 2)
        .with_atom("Cl", 7., site, -45.)
        .with_charge(charge)
        .with_energy(energy)
}

/// Formation energy lines `(charge, intercept)` with random intercepts, for benchmarking
pub fn random_formation_lines(charges: &[f64]) -> Vec<(f64, f64)> {
    let mut rng = thread_rng();
    charges
        .iter()
        .map(|&charge| (charge, rng.gen_range(-2.0..2.0)))
        .collect()
}
