// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Defect formation energies and charge transition levels from VASP calculations
//!
//! # Overview
//! The formation energy of a point defect in charge state `q` is
//!
//! `E_for(E_F) = E_defect - E_host + Σ n μ + q (E_VBM + E_F) + E_corr`
//!
//! where `E_F` is the Fermi level measured from the host valence band maximum, `n μ` counts the
//! ions exchanged with their reservoirs and `E_corr` gathers the corrections for the finite size
//! of the supercell: potential alignment, Moss-Burstein band filling, perturbed host states, a
//! band edge shift when a second functional corrects the gap, and the Makov-Payne image charge
//! correction.
//!
//! The charge state with the lowest formation energy is stable, and the Fermi levels at which it
//! changes are the charge transition levels.
//!
//! # Usage
//! The binary reads a study file describing the host, the defects and the defect cells:
//!
//! ```toml
//! [host]
//! outcar = "host/OUTCAR"
//!
//! [makov_payne]
//! geometry = "fcc"
//! relative_permittivity = 9.4
//! first_term = 1.43
//!
//! [[defects]]
//! kind = "vacancy"
//! atom = "Cd (1)"
//!
//! [[cells]]
//! outcar = "vcd_q0/OUTCAR"
//! spheres_radius = 3.0
//! ```
//!
//! and is run as
//!
//! ```bash
//! defect-formation --log-level info study cds.toml
//! ```
//!
//! which writes a report, the formation energies, the transition levels and the potential
//! alignment of each cell to the output directory.

/// The command line application, tracing and display primitives
pub mod app;

/// Reference chemical potentials and lattice constants
pub mod constants;

/// Finite size corrections
pub mod corrections;

/// Point defects
pub mod defect;

/// Error handling
pub mod error;

/// Plot-ready data
pub mod plot;

/// Defect studies, formation energies and transition levels
pub mod study;
