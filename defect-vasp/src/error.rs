use miette::Diagnostic;
use std::path::PathBuf;

/// Convenience alias for results produced while reading VASP files
pub type Result<T> = std::result::Result<T, VaspError>;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Failures raised while reading or cross-checking VASP output
pub enum VaspError {
    /// The file could not be read from disk
    #[error("IO Failure reading {path}: {source}")]
    #[diagnostic(code(defect_vasp::io_error))]
    Io {
        /// The file which failed to load
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
    /// The first line of the file does not carry the VASP version banner
    #[error("The given file appears to not be a valid OUTCAR file")]
    #[diagnostic(code(defect_vasp::invalid_outcar))]
    InvalidOutcar,
    /// A tag which is required could not be located
    #[error("`{0}` was not found in the OUTCAR")]
    #[diagnostic(code(defect_vasp::missing_tag))]
    MissingTag(String),
    /// A tag was found a different number of times than expected
    #[error("`{key}` was found {found} times, expected {expected}")]
    #[diagnostic(code(defect_vasp::occurrences))]
    Occurrences {
        /// The searched string
        key: String,
        /// How many lines contained it
        found: usize,
        /// How many lines should contain it
        expected: usize,
    },
    /// A value was located but could not be converted
    #[error("Failed to parse `{value}` following `{key}`")]
    #[diagnostic(code(defect_vasp::parse))]
    Parse {
        /// The tag preceding the value
        key: String,
        /// The raw text
        value: String,
    },
    /// The data retrieved from the OUTCAR is not self-consistent
    #[error("{0}")]
    #[diagnostic(code(defect_vasp::import))]
    Import(String),
    /// The DOSCAR does not match the OUTCAR it was paired with
    #[error("{0}")]
    #[diagnostic(code(defect_vasp::doscar))]
    Doscar(String),
}

impl VaspError {
    pub(crate) fn parse(key: &str, value: &str) -> Self {
        Self::Parse {
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }
}
