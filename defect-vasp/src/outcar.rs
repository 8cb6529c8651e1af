//! The `OUTCAR` reader
//!
//! Every quantity is located by the text VASP prints beside it. Tags VASP writes once per run
//! must be found exactly once, anything else is reported as a malformed file rather than
//! silently picking one of the candidates.

use crate::atoms::{Atom, Composition};
use crate::bands::{band_extrema, BandOccupations};
use crate::doscar::Dos;
use crate::functional::Functional;
use crate::search::{parse_row, Lines, Occurrence};
use crate::{Result, VaspError};
use itertools::Itertools;
use nalgebra::{Matrix3, Point3, Vector3};
use std::path::{Path, PathBuf};

const BANNER: &str = " vasp.";
const TOTAL_ENERGY: &str = "free energy    TOTEN  =";
const POSITIONS: &str = "position of ions in cartesian coordinates  (Angst):";
const POTENTIALS: &str = "average (electrostatic) potential at core";
const FRACTIONAL_KPOINTS: &str = "k-points in reciprocal lattice and weights";
const CARTESIAN_KPOINTS: &str = " k-points in units of 2pi/SCALE and weight:";

/// Whether the run was spin polarised (`ISPIN`)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Spin {
    /// `ISPIN = 1`
    Unpolarised,
    /// `ISPIN = 2`
    Polarised,
}

impl Spin {
    fn from_ispin(ispin: i32) -> Result<Self> {
        match ispin {
            1 => Ok(Spin::Unpolarised),
            2 => Ok(Spin::Polarised),
            other => Err(VaspError::parse("ISPIN  =", &other.to_string())),
        }
    }

    /// Number of spin channels
    pub fn channels(&self) -> usize {
        match self {
            Spin::Unpolarised => 1,
            Spin::Polarised => 2,
        }
    }

    /// The occupation of a filled band in a single channel
    pub fn max_occupation(&self) -> f64 {
        match self {
            Spin::Unpolarised => 2.,
            Spin::Polarised => 1.,
        }
    }

    /// The `ISPIN` value
    pub fn ispin(&self) -> usize {
        self.channels()
    }
}

/// The INCAR parameters relevant to post-processing, as echoed in the `OUTCAR`
#[derive(Clone, Debug, PartialEq)]
pub struct IncarTags {
    /// Number of points in the density of states
    pub nedos: usize,
    /// Plane wave cutoff in eV
    pub encut: f64,
    /// Electronic convergence criterion
    pub ediff: f64,
    /// Lower edge of the DOS energy window
    pub emin: f64,
    /// Upper edge of the DOS energy window
    pub emax: f64,
    /// Smearing method
    pub ismear: i32,
    /// Projection scheme, `11` writes the lm-decomposed projected DOS
    pub lorbit: i32,
    /// Symmetry treatment
    pub isym: i32,
    /// Restart flag
    pub istart: i32,
    /// Spin polarisation
    pub ispin: Spin,
    /// Charge density initialisation, `11` for non-self-consistent band structure runs
    pub icharg: i32,
}

impl IncarTags {
    fn read(lines: &Lines<'_>) -> Result<Self> {
        Ok(Self {
            nedos: lines.tag("NEDOS =", Some("number of ions"))?,
            encut: lines.tag("ENCUT  =", Some("eV"))?,
            ediff: lines.tag("EDIFF  =", Some("stopping"))?,
            emin: lines.tag("EMIN   =", Some(";"))?,
            emax: lines.tag("EMAX   =", Some("energy-range"))?,
            ismear: lines.tag("ISMEAR =", Some(";"))?,
            lorbit: lines.tag("LORBIT =", Some("0 simple, 1 ext"))?,
            isym: lines.tag("ISYM   =", Some("0-nonsym"))?,
            istart: lines.tag("ISTART =", Some("job"))?,
            ispin: Spin::from_ispin(lines.tag("ISPIN  =", Some("spin"))?)?,
            icharg: lines.tag("ICHARG =", Some("charge:"))?,
        })
    }
}

/// The k-point mesh, in fractional and cartesian reciprocal coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct KPoints {
    /// Coordinates in units of the reciprocal lattice vectors
    pub fractional: Vec<Vector3<f64>>,
    /// Coordinates in units of 2π/a
    pub cartesian: Vec<Vector3<f64>>,
    /// Integration weights
    pub weights: Vec<f64>,
}

impl KPoints {
    /// Number of k-points
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Cumulative distance along the path joining consecutive k-points, starting at zero
    pub fn path_distances(&self) -> Vec<f64> {
        std::iter::once(0.)
            .chain(
                self.cartesian
                    .iter()
                    .tuple_windows()
                    .scan(0., |travelled, (from, to)| {
                        *travelled += (to - from).norm();
                        Some(*travelled)
                    }),
            )
            .collect()
    }
}

/// Everything read from one VASP run
#[derive(Clone, Debug)]
pub struct Calculation {
    /// The `OUTCAR` this was read from, when read from disk
    pub outcar: Option<PathBuf>,
    /// The `DOSCAR` this was read from, when read from disk
    pub doscar: Option<PathBuf>,
    /// Exchange-correlation treatment
    pub functional: Functional,
    /// Echoed INCAR parameters
    pub tags: IncarTags,
    /// Ion counts per species
    pub composition: Composition,
    /// Valence (`ZVAL`) of each species, in composition order
    pub valences: Vec<f64>,
    /// Labels of every ion, in the order VASP lists them
    pub atoms: Vec<Atom>,
    /// Number of electrons (`NELECT`)
    pub electrons: f64,
    /// Net charge of the cell, `Σ n ZVAL - NELECT`
    pub charge: f64,
    /// Names of the orbital channels in the projected output, `s p d` or `s p d f`
    pub orbitals: Vec<String>,
    /// Number of electronic steps
    pub iterations: usize,
    /// Direct lattice, one lattice vector per row, in Angstrom
    pub lattice: Matrix3<f64>,
    /// Cartesian position of every ion, in atom order
    pub positions: Vec<Point3<f64>>,
    /// Final free energy in eV
    pub energy: f64,
    /// Fermi energy in eV
    pub fermi_energy: f64,
    /// The k-point mesh
    pub kpoints: KPoints,
    /// Number of bands (`NBANDS`)
    pub nbands: usize,
    /// Band energies and occupations, one block per k-point and spin channel
    pub bands: Vec<BandOccupations>,
    /// Valence band maximum in eV
    pub vbm: f64,
    /// Conduction band minimum in eV
    pub cbm: f64,
    /// Averaged electrostatic potential at each ion core, absent for GW runs
    pub potentials: Option<Vec<f64>>,
    /// Density of states, when a `DOSCAR` was supplied
    pub dos: Option<Dos>,
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| VaspError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Calculation {
    /// Reads an `OUTCAR` from disk
    pub fn from_outcar<P: AsRef<Path>>(outcar: P) -> Result<Self> {
        Self::from_files(outcar, None::<&Path>)
    }

    /// Reads an `OUTCAR` and, optionally, the `DOSCAR` written by the same run
    #[tracing::instrument(skip_all, fields(outcar = %outcar.as_ref().display()))]
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(outcar: P, doscar: Option<Q>) -> Result<Self> {
        let outcar_text = read_to_string(outcar.as_ref())?;
        let doscar_text = doscar
            .as_ref()
            .map(|path| read_to_string(path.as_ref()))
            .transpose()?;
        let mut calculation = Self::parse(&outcar_text, doscar_text.as_deref())?;
        calculation.outcar = Some(outcar.as_ref().to_path_buf());
        calculation.doscar = doscar.map(|path| path.as_ref().to_path_buf());
        tracing::info!("Loaded {}", calculation.id());
        Ok(calculation)
    }

    /// Parses the text of an `OUTCAR`, and optionally of the matching `DOSCAR`
    pub fn parse(outcar: &str, doscar: Option<&str>) -> Result<Self> {
        let lines = Lines::new(outcar);
        if !lines.first().map_or(false, |line| line.starts_with(BANNER)) {
            return Err(VaspError::InvalidOutcar);
        }

        let functional = Functional::detect(&lines)?;
        let tags = IncarTags::read(&lines)?;

        let number_of_atoms: usize = lines.tag("NIONS =", None)?;
        let counts = lines
            .extract("ions per type =", Occurrence::First, None)
            .ok_or_else(|| VaspError::MissingTag("ions per type =".into()))?
            .split_whitespace()
            .map(|count| {
                count
                    .parse::<usize>()
                    .map_err(|_| VaspError::parse("ions per type =", count))
            })
            .collect::<Result<Vec<_>>>()?;
        let species = lines
            .extract_all("VRHFIN =", Some(":"))
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let valences = parse_row(
            lines
                .extract("ZVAL   =", Occurrence::Last, None)
                .ok_or_else(|| VaspError::MissingTag("ZVAL   =".into()))?,
        )?;
        if number_of_atoms != counts.iter().sum::<usize>()
            || counts.len() != species.len()
            || counts.len() != valences.len()
        {
            return Err(VaspError::Import(
                "Numbers of atoms retrieved are not consistent".into(),
            ));
        }
        let composition = Composition::new(species, counts);
        let atoms = composition.atoms();

        let electrons: f64 = lines.tag("NELECT =", Some("total number"))?;
        let charge = composition
            .iter()
            .zip(&valences)
            .map(|((_, count), valence)| count as f64 * valence)
            .sum::<f64>()
            - electrons;
        let orbitals = lines
            .extract("# of ion", Occurrence::First, Some("tot"))
            .map(|names| names.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();

        let iterations = if functional.is_gw() {
            lines.tag("NELM    =", Some("number"))?
        } else {
            lines.count("Iteration")
        };

        let lattice = read_lattice(&lines)?;
        let positions = read_positions(&lines, number_of_atoms)?;
        let energy = read_energy(&lines, functional, iterations)?;
        let fermi_energy = read_fermi_energy(&lines, tags.ismear)?;

        let nkpts: usize = lines.tag("NKPTS =", Some("k-points in BZ"))?;
        let kpoints = read_kpoints(&lines, nkpts)?;
        let nbands: usize = lines.tag("NBANDS=", None)?;
        let bands = read_bands(&lines, functional, nkpts * tags.ispin.channels())?;
        let (vbm, cbm) = band_extrema(&bands)?;

        let potentials = if functional.is_gw() {
            None
        } else {
            Some(read_potentials(&lines, number_of_atoms)?)
        };

        let mut calculation = Self {
            outcar: None,
            doscar: None,
            functional,
            tags,
            composition,
            valences,
            atoms,
            electrons,
            charge,
            orbitals,
            iterations,
            lattice,
            positions,
            energy,
            fermi_energy,
            kpoints,
            nbands,
            bands,
            vbm,
            cbm,
            potentials,
            dos: None,
        };
        tracing::debug!(
            "Parsed {}: E = {:.5} eV, VBM = {:.5} eV, CBM = {:.5} eV",
            calculation.id(),
            calculation.energy,
            calculation.vbm,
            calculation.cbm
        );

        if let Some(doscar) = doscar {
            calculation.dos = Some(Dos::parse(doscar, &calculation)?);
        }
        Ok(calculation)
    }

    /// The charge rounded to the nearest integer, as used in labels
    pub fn rounded_charge(&self) -> i64 {
        self.charge.round() as i64
    }

    /// The full chemical formula, `Cd8In16S32`
    pub fn name(&self) -> String {
        self.composition.name(false)
    }

    /// The formula reduced by the common factor of the populations, `CdIn2S4`
    pub fn reduced_name(&self) -> String {
        self.composition.name(true)
    }

    /// The full formula with TeX subscripts
    pub fn display_name(&self) -> String {
        self.composition.display_name(false)
    }

    /// Unique label of the run, `Cd8In16S32_GGA_q0`
    pub fn id(&self) -> String {
        let formula = self
            .composition
            .iter()
            .map(|(species, count)| format!("{}{}", species, count))
            .collect::<String>();
        format!("{}_{}_q{}", formula, self.functional.name(), self.rounded_charge())
    }

    /// Figure title, `Cd_{8}In_{16}S_{32} GGA q=0`
    pub fn title(&self) -> String {
        format!(
            "{} {} q={:.0}",
            self.display_name(),
            self.functional.title(),
            self.charge
        )
    }

    /// The band gap, `CBM - VBM`
    pub fn gap(&self) -> f64 {
        self.cbm - self.vbm
    }

    /// Total number of ions
    pub fn number_of_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Index of `atom` in the ion list
    pub fn atom_index(&self, atom: &Atom) -> Option<usize> {
        self.atoms.iter().position(|candidate| candidate == atom)
    }

    /// Cartesian position of `atom`
    pub fn position_of(&self, atom: &Atom) -> Option<Point3<f64>> {
        self.atom_index(atom).map(|index| self.positions[index])
    }

    /// Averaged electrostatic potential at the core of `atom`
    pub fn potential_of(&self, atom: &Atom) -> Option<f64> {
        let index = self.atom_index(atom)?;
        self.potentials.as_ref().map(|potentials| potentials[index])
    }
}

fn vector(row: &str) -> Result<Vector3<f64>> {
    let values = parse_row(row)?;
    if values.len() < 3 {
        return Err(VaspError::Import(format!(
            "Expected three coordinates, found `{}`",
            row.trim()
        )));
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

fn read_lattice(lines: &Lines<'_>) -> Result<Matrix3<f64>> {
    let start = lines.find_last("direct lattice vectors")? + 1;
    let rows = lines
        .slice(start, 3)
        .ok_or_else(|| VaspError::Import("The lattice vectors are truncated".into()))?
        .iter()
        .map(|row| vector(row).map(|vector| vector.transpose()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Matrix3::from_rows(&rows))
}

fn read_positions(lines: &Lines<'_>, number_of_atoms: usize) -> Result<Vec<Point3<f64>>> {
    let start = lines.find_exactly(POSITIONS, 1)?[0] + 1;
    let rows = lines.block_from(start);
    if rows.len() != number_of_atoms {
        return Err(VaspError::Import(
            "The number of atoms positions is not consistent with the total number of atoms".into(),
        ));
    }
    rows.iter()
        .map(|row| vector(row).map(Point3::from))
        .collect()
}

fn read_energy(lines: &Lines<'_>, functional: Functional, iterations: usize) -> Result<f64> {
    if !functional.is_gw() {
        let found = lines.count(TOTAL_ENERGY);
        if found != iterations {
            return Err(VaspError::Occurrences {
                key: TOTAL_ENERGY.to_owned(),
                found,
                expected: iterations,
            });
        }
    }
    lines.value(TOTAL_ENERGY, Occurrence::Last, Some("eV"))
}

fn read_fermi_energy(lines: &Lines<'_>, ismear: i32) -> Result<f64> {
    if ismear == 0 {
        return lines.tag("E-fermi :", Some("XC(G=0)"));
    }
    match lines.extract(" BZINTS: Fermi energy:", Occurrence::Last, Some(";")) {
        Some(value) => value
            .parse()
            .map_err(|_| VaspError::parse(" BZINTS: Fermi energy:", value)),
        None => lines.value("E-fermi :", Occurrence::Last, Some("XC(G=0)")),
    }
}

fn read_kpoint_block(lines: &Lines<'_>, key: &str, nkpts: usize) -> Result<Vec<Vec<f64>>> {
    let start = lines.find_exactly(key, 1)?[0] + 1;
    let rows = lines
        .block_from(start)
        .iter()
        .map(|row| parse_row(row))
        .collect::<Result<Vec<_>>>()?;
    if rows.len() != nkpts || rows.iter().any(|row| row.len() < 4) {
        return Err(VaspError::Import(format!(
            "Number of k-points retrieved after `{}` and number of k-points are not consistent",
            key.trim()
        )));
    }
    Ok(rows)
}

fn read_kpoints(lines: &Lines<'_>, nkpts: usize) -> Result<KPoints> {
    let fractional_rows = read_kpoint_block(lines, FRACTIONAL_KPOINTS, nkpts)?;
    let cartesian_rows = read_kpoint_block(lines, CARTESIAN_KPOINTS, nkpts)?;
    let to_vector = |row: &Vec<f64>| Vector3::new(row[0], row[1], row[2]);
    Ok(KPoints {
        fractional: fractional_rows.iter().map(to_vector).collect(),
        cartesian: cartesian_rows.iter().map(to_vector).collect(),
        weights: fractional_rows.iter().map(|row| row[3]).collect(),
    })
}

fn read_bands(
    lines: &Lines<'_>,
    functional: Functional,
    blocks: usize,
) -> Result<Vec<BandOccupations>> {
    let (header, offset, column) = match functional {
        Functional::Gw0 => ("band No. old QP-enery  QP-energies", 2, 2),
        Functional::G0W0 => ("band No.  KS-energies  QP-energies", 2, 2),
        _ => ("band No.  band energies     occupation", 1, 1),
    };
    let starts = lines.find_all(header);
    if starts.len() < blocks {
        return Err(VaspError::Occurrences {
            key: header.to_owned(),
            found: starts.len(),
            expected: blocks,
        });
    }
    starts[starts.len() - blocks..]
        .iter()
        .map(|start| {
            let rows = lines.block_from(start + offset);
            let mut energies = Vec::with_capacity(rows.len());
            let mut occupations = Vec::with_capacity(rows.len());
            for row in rows {
                let values = parse_row(row)?;
                match (values.get(column), values.last()) {
                    (Some(&energy), Some(&occupation)) if values.len() > column + 1 => {
                        energies.push(energy);
                        occupations.push(occupation);
                    }
                    _ => {
                        return Err(VaspError::Import(format!(
                            "Band row `{}` is truncated",
                            row.trim()
                        )))
                    }
                }
            }
            Ok(BandOccupations {
                energies,
                occupations,
            })
        })
        .collect()
}

/// Splits entries where a negative potential runs into the atom index, `10-100.1234`
fn split_fused(token: &str) -> impl Iterator<Item = &str> {
    let split = token
        .char_indices()
        .skip(1)
        .find(|(_, character)| *character == '-')
        .map(|(index, _)| index);
    let (head, tail) = match split {
        Some(index) => (&token[..index], Some(&token[index..])),
        None => (token, None),
    };
    std::iter::once(head).chain(tail)
}

fn read_potentials(lines: &Lines<'_>, number_of_atoms: usize) -> Result<Vec<f64>> {
    let start = lines.find_last(POTENTIALS)? + 3;
    let values = lines
        .block_from(start)
        .iter()
        .flat_map(|row| row.split_whitespace())
        .flat_map(split_fused)
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| VaspError::parse(POTENTIALS, token))
        })
        .collect::<Result<Vec<_>>>()?;
    let potentials = values
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .map(|pair| pair[1])
        .collect::<Vec<_>>();
    if values.len() % 2 != 0 || potentials.len() != number_of_atoms {
        return Err(VaspError::Import(
            "Number of electrostatic potentials retrieved and number of atoms are not consistent"
                .into(),
        ));
    }
    Ok(potentials)
}
