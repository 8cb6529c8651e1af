// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Error
//! The error type for the binary

use miette::Diagnostic;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub(crate) enum AppError {
    #[error("No file matches the pattern `{0}`")]
    #[diagnostic(code(defect_formation::no_matches))]
    NoMatches(String),
    #[error("Failed to create the output directory {path}")]
    #[diagnostic(code(defect_formation::output_directory))]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    #[diagnostic(code(defect_formation::glob))]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    #[diagnostic(code(defect_formation::glob))]
    Glob(#[from] glob::GlobError),
}
