// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Readers for the output of the Vienna Ab initio Simulation Package
//!
//! # Overview
//! This crate turns the `OUTCAR` and `DOSCAR` files written by a VASP run into a
//! [`Calculation`]: the INCAR tags which matter for post-processing, the composition
//! and charge of the cell, the relaxed geometry, the final total energy, the band
//! occupations at every k-point, the averaged electrostatic potential at each ion core
//! and, when a `DOSCAR` is supplied, the total and orbital-projected density of states.
//!
//! ```no_run
//! use defect_vasp::Calculation;
//!
//! let host = Calculation::from_files("host/OUTCAR", Some("host/DOSCAR")).unwrap();
//! println!("{}: gap {:.3} eV", host.id(), host.gap());
//! ```

#![warn(missing_docs)]

mod atoms;
mod bands;
mod doscar;
mod error;
mod functional;
mod outcar;
mod search;

pub use atoms::{gcd, Atom, Composition};
pub use bands::{band_extrema, BandOccupations};
pub use doscar::{Dos, ProjectedDos, SpinResolved};
pub use error::{Result, VaspError};
pub use functional::Functional;
pub use outcar::{Calculation, IncarTags, KPoints, Spin};
