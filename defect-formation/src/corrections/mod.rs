//! # Corrections
//!
//! Finite-size and band-edge corrections to the formation energy of a charged defect cell.

mod alignment;
mod band_filling;
mod gap;
mod makov_payne;

pub use alignment::{
    potential_alignment, potential_alignment_scan, scan_radii, PotentialAlignment,
};
pub use band_filling::moss_burstein;
pub use gap::{band_extrema_shift, phs, vbm};
pub use makov_payne::{makov_payne, Geometry, MakovPayne};
