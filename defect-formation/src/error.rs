use defect_vasp::{Atom, VaspError};
use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while labelling a defect
pub enum DefectError {
    /// No chemical potential was given and the species is not tabulated
    #[error("No reference chemical potential is known for {0}, one must be given explicitly")]
    #[diagnostic(code(defect_formation::unknown_chemical_potential))]
    UnknownChemicalPotential(String),
    /// The number of chemical potentials does not match the atoms involved
    #[error("{kind} needs {expected} chemical potential(s), {found} were given")]
    #[diagnostic(code(defect_formation::chemical_potentials))]
    ChemicalPotentials {
        /// The kind of defect
        kind: &'static str,
        /// Number of atoms involved
        expected: usize,
        /// Number of potentials supplied
        found: usize,
    },
    /// The atom labelling the defect is absent from the cell it refers to
    #[error("{atom} was not found in the {cell} cell")]
    #[diagnostic(code(defect_formation::atom_not_found))]
    AtomNotFound {
        /// The missing label
        atom: Atom,
        /// Which cell was searched
        cell: &'static str,
    },
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while computing corrections to the formation energy
pub enum CorrectionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Defect(#[from] DefectError),
    /// A cell carries no averaged core potentials, as for GW runs
    #[error("{0} has no electrostatic potentials, the potential alignment cannot be computed")]
    #[diagnostic(code(defect_formation::missing_potentials))]
    MissingPotentials(String),
    /// Once the defect sites are removed the two cells do not hold the same ions
    #[error("The host cell has {host} comparable atoms but the defect cell has {defect}")]
    #[diagnostic(code(defect_formation::inconsistent_atoms))]
    InconsistentAtoms {
        /// Atoms left in the host cell
        host: usize,
        /// Atoms left in the defect cell
        defect: usize,
    },
    /// Every ion lies within the exclusion spheres
    #[error("No atom lies further than {0:.3} Å from the defects, reduce the spheres radius")]
    #[diagnostic(code(defect_formation::no_atoms_outside))]
    NoAtomsOutside(f64),
    /// The Makov-Payne correction divides by the permittivity
    #[error("The relative permittivity must be non-zero")]
    #[diagnostic(code(defect_formation::zero_permittivity))]
    ZeroPermittivity,
    /// A lattice geometry label was not recognised
    #[error("Unknown geometry `{0}`, expected one of sc, fcc, bcc, hcp or other")]
    #[diagnostic(code(defect_formation::geometry))]
    UnknownGeometry(String),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while assembling or evaluating a defect study
pub enum StudyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Vasp(#[from] VaspError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Correction(#[from] CorrectionError),
    /// A study needs at least one defect
    #[error("A defect study needs at least one defect")]
    #[diagnostic(code(defect_formation::no_defects))]
    NoDefects,
    /// The Makov-Payne correction was requested without its parameters
    #[error("The Makov-Payne correction is enabled but no geometry, permittivity or first term was given")]
    #[diagnostic(code(defect_formation::missing_makov_payne))]
    MissingMakovPayne,
    /// Host and defect cells must share their lattice
    #[error("The lattice of {defect} differs from the lattice of the host cell")]
    #[diagnostic(code(defect_formation::lattice_mismatch))]
    LatticeMismatch {
        /// Identifier of the defect cell
        defect: String,
    },
    /// The defect cell is not the host with the listed defects applied
    #[error("{defect} does not hold the host population changed by the listed defects: {species} differs")]
    #[diagnostic(code(defect_formation::incompatible_cell))]
    IncompatibleCell {
        /// Identifier of the defect cell
        defect: String,
        /// First species whose population does not match
        species: String,
    },
    /// Formation energies were requested before any defect cell was added
    #[error("The study contains no defect cell")]
    #[diagnostic(code(defect_formation::no_defect_cells))]
    NoDefectCells,
    /// A material comparison was evaluated before any study was added
    #[error("The material comparison contains no defect study")]
    #[diagnostic(code(defect_formation::no_studies))]
    NoStudies,
    /// A named gap was requested which the study does not hold
    #[error("No gap labelled `{0}`")]
    #[diagnostic(code(defect_formation::unknown_gap))]
    UnknownGap(String),
    #[error("IO Failure: {0}")]
    #[diagnostic(code(defect_formation::io_error))]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while preparing plot data
pub enum PlotError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Study(#[from] StudyError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Correction(#[from] CorrectionError),
    /// A DOS plot was requested for a run read without its `DOSCAR`
    #[error("{0} was read without a DOSCAR")]
    #[diagnostic(code(defect_formation::missing_dos))]
    MissingDos(String),
    /// The projected DOS was requested but the run did not write it
    #[error("{0} has no projected DOS, LORBIT must be 11")]
    #[diagnostic(code(defect_formation::missing_projections))]
    MissingProjections(String),
    /// Band diagrams need a non-self-consistent run along a k-path
    #[error("{0} is not a band structure calculation, ICHARG should be 11")]
    #[diagnostic(code(defect_formation::not_band_structure))]
    NotBandStructure(String),
    /// A selected species or atom is absent from the run
    #[error("{0} is not present in the calculation")]
    #[diagnostic(code(defect_formation::unknown_selection))]
    UnknownSelection(String),
    /// The named high symmetry points cannot split the k-path evenly
    #[error("{points} k-points cannot be split into {segments} equal segments")]
    #[diagnostic(code(defect_formation::kpoint_labels))]
    KPointLabels {
        /// Number of k-points on the path
        points: usize,
        /// Number of segments implied by the labels
        segments: usize,
    },
    #[error(transparent)]
    #[diagnostic(code(defect_formation::csv))]
    Csv(#[from] csv::Error),
}
