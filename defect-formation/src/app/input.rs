//! Defect study input files
//!
//! A study file names the host calculation, an optional second host providing corrected band
//! edges, the defects and the defect cells, together with the correction settings. Paths are
//! resolved against the directory holding the file.

use crate::corrections::MakovPayne;
use crate::defect::{Defect, DefectKind};
use crate::study::{CellParameters, CorrectionSet, DefectStudy, DefectStudyBuilder};
use config::{Config, File, FileFormat};
use defect_vasp::{Atom, Calculation};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CalculationFiles {
    pub(crate) outcar: PathBuf,
    #[serde(default)]
    pub(crate) doscar: Option<PathBuf>,
}

impl CalculationFiles {
    fn resolve(&mut self, base: &Path) {
        self.outcar = base.join(&self.outcar);
        if let Some(doscar) = self.doscar.as_mut() {
            *doscar = base.join(&*doscar);
        }
    }

    pub(crate) fn read(&self) -> defect_vasp::Result<Calculation> {
        Calculation::from_files(&self.outcar, self.doscar.as_ref())
    }
}

#[derive(Copy, Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CorrectionsEntry {
    #[serde(flatten)]
    pub(crate) enabled: CorrectionSet,
    /// Extra shift of the VBM added to the one measured between the hosts
    pub(crate) de_vbm: f64,
    /// Extra shift of the CBM added to the one measured between the hosts
    pub(crate) de_cbm: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct GapEntry {
    pub(crate) label: String,
    pub(crate) value: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum DefectEntry {
    Vacancy {
        atom: String,
        #[serde(default)]
        chemical_potentials: Option<Vec<f64>>,
    },
    Interstitial {
        atom: String,
        #[serde(default)]
        chemical_potentials: Option<Vec<f64>>,
    },
    Substitution {
        removed: String,
        added: String,
        #[serde(default)]
        chemical_potentials: Option<Vec<f64>>,
    },
}

impl DefectEntry {
    pub(crate) fn to_defect(&self) -> color_eyre::Result<Defect> {
        let (kind, chemical_potentials) = match self {
            DefectEntry::Vacancy {
                atom,
                chemical_potentials,
            } => (
                DefectKind::Vacancy {
                    atom: atom.parse::<Atom>()?,
                },
                chemical_potentials,
            ),
            DefectEntry::Interstitial {
                atom,
                chemical_potentials,
            } => (
                DefectKind::Interstitial {
                    atom: atom.parse::<Atom>()?,
                },
                chemical_potentials,
            ),
            DefectEntry::Substitution {
                removed,
                added,
                chemical_potentials,
            } => (
                DefectKind::Substitution {
                    removed: removed.parse::<Atom>()?,
                    added: added.parse::<Atom>()?,
                },
                chemical_potentials,
            ),
        };
        Ok(Defect::new(kind, chemical_potentials.clone())?)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CellEntry {
    #[serde(flatten)]
    pub(crate) files: CalculationFiles,
    pub(crate) spheres_radius: f64,
    #[serde(default)]
    pub(crate) electrons_in_cb: f64,
    #[serde(default)]
    pub(crate) holes_in_vb: f64,
}

impl CellEntry {
    pub(crate) fn parameters(&self) -> CellParameters {
        CellParameters {
            spheres_radius: self.spheres_radius,
            electrons_in_cb: self.electrons_in_cb,
            holes_in_vb: self.holes_in_vb,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct StudyFile {
    #[serde(default)]
    pub(crate) name: Option<String>,
    pub(crate) host: CalculationFiles,
    #[serde(default)]
    pub(crate) host_b: Option<CalculationFiles>,
    #[serde(default)]
    pub(crate) corrections: CorrectionsEntry,
    #[serde(default)]
    pub(crate) makov_payne: Option<MakovPayne>,
    #[serde(default)]
    pub(crate) gaps: Vec<GapEntry>,
    pub(crate) defects: Vec<DefectEntry>,
    #[serde(default)]
    pub(crate) cells: Vec<CellEntry>,
}

impl StudyFile {
    pub(crate) fn load(path: &Path) -> color_eyre::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base)
    }

    /// Reads the TOML in `text`, resolving relative paths against `base`
    pub(crate) fn parse(text: &str, base: &Path) -> color_eyre::Result<Self> {
        let mut study: StudyFile = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        study.host.resolve(base);
        if let Some(host_b) = study.host_b.as_mut() {
            host_b.resolve(base);
        }
        for cell in study.cells.iter_mut() {
            cell.files.resolve(base);
        }
        Ok(study)
    }
}

/// The calculations named by a study file
pub(crate) struct StudyInputs {
    pub(crate) host: Calculation,
    pub(crate) host_b: Option<Calculation>,
    pub(crate) cells: Vec<(Calculation, CellParameters)>,
}

impl StudyInputs {
    #[tracing::instrument(name = "Reading calculations", skip_all)]
    pub(crate) fn read(file: &StudyFile) -> color_eyre::Result<Self> {
        let host = file.host.read()?;
        let host_b = file
            .host_b
            .as_ref()
            .map(CalculationFiles::read)
            .transpose()?;
        let cells = file
            .cells
            .iter()
            .map(|cell| Ok((cell.files.read()?, cell.parameters())))
            .collect::<color_eyre::Result<Vec<_>>>()?;
        tracing::info!("Read the host and {} defect cell(s)", cells.len());
        Ok(Self {
            host,
            host_b,
            cells,
        })
    }

    /// Builds the study of `file` and corrects every defect cell
    pub(crate) fn study(&self, file: &StudyFile) -> color_eyre::Result<DefectStudy<'_>> {
        let defects = file
            .defects
            .iter()
            .map(DefectEntry::to_defect)
            .collect::<color_eyre::Result<Vec<_>>>()?;

        let mut builder = DefectStudyBuilder::new()
            .with_host(&self.host)
            .with_defects(defects)
            .with_corrections(file.corrections.enabled)
            .with_band_edge_inputs(file.corrections.de_vbm, file.corrections.de_cbm)
            .with_gaps(
                file.gaps
                    .iter()
                    .map(|gap| (gap.label.clone(), gap.value))
                    .collect(),
            );
        if let Some(host_b) = self.host_b.as_ref() {
            builder = builder.with_host_b(host_b);
        }
        if let Some(makov_payne) = file.makov_payne {
            builder = builder.with_makov_payne(makov_payne);
        }
        if let Some(name) = file.name.as_ref() {
            builder = builder.with_name(name.clone());
        }

        let mut study = builder.build()?;
        for (cell, parameters) in self.cells.iter() {
            study.add_defect_cell(cell, *parameters)?;
        }
        Ok(study)
    }
}

#[cfg(test)]
mod test {
    use super::{DefectEntry, StudyFile};
    use crate::corrections::Geometry;
    use std::path::Path;

    const STUDY: &str = r#"
name = "vcd"

[host]
outcar = "host/OUTCAR"
doscar = "host/DOSCAR"

[corrections]
makov_payne = false
de_cbm = 0.2

[makov_payne]
geometry = "fcc"
relative_permittivity = 9.4
first_term = 1.43

[[gaps]]
label = "Experimental gap"
value = 2.4

[[defects]]
kind = "vacancy"
atom = "Cd (1)"

[[defects]]
kind = "substitution"
removed = "S (2)"
added = "Cl (1)"
chemical_potentials = [-4.0, -1.63]

[[cells]]
outcar = "vcd_q0/OUTCAR"
spheres_radius = 3.0

[[cells]]
outcar = "/data/vcd_q-2/OUTCAR"
spheres_radius = 3.5
holes_in_vb = 0.5
"#;

    #[test]
    fn study_files_resolve_against_their_directory() {
        let study = StudyFile::parse(STUDY, Path::new("/runs/cds")).unwrap();
        assert_eq!(study.name.as_deref(), Some("vcd"));
        assert_eq!(study.host.outcar, Path::new("/runs/cds/host/OUTCAR"));
        assert_eq!(
            study.host.doscar.as_deref(),
            Some(Path::new("/runs/cds/host/DOSCAR"))
        );
        assert!(study.host_b.is_none());
        assert_eq!(study.cells[0].files.outcar, Path::new("/runs/cds/vcd_q0/OUTCAR"));
        assert_eq!(study.cells[1].files.outcar, Path::new("/data/vcd_q-2/OUTCAR"));
        assert_eq!(study.cells[1].parameters().holes_in_vb, 0.5);
        assert_eq!(study.cells[0].parameters().electrons_in_cb, 0.);
    }

    #[test]
    fn corrections_default_to_enabled() {
        let study = StudyFile::parse(STUDY, Path::new("")).unwrap();
        let corrections = study.corrections;
        assert!(!corrections.enabled.makov_payne);
        assert!(corrections.enabled.potential_alignment && corrections.enabled.vbm);
        assert_eq!(corrections.de_vbm, 0.);
        assert_eq!(corrections.de_cbm, 0.2);
        assert_eq!(study.makov_payne.unwrap().geometry, Geometry::Fcc);
        assert_eq!(study.gaps[0].label, "Experimental gap");
    }

    #[test]
    fn defects_are_tagged_by_kind() {
        let study = StudyFile::parse(STUDY, Path::new("")).unwrap();
        assert!(matches!(study.defects[0], DefectEntry::Vacancy { .. }));
        let substitution = study.defects[1].to_defect().unwrap();
        assert_eq!(substitution.chemical_potentials(), [-4.0, -1.63]);
        assert_eq!(substitution.id(), "Subs(S(2)_by_Cl(1))");
    }
}
