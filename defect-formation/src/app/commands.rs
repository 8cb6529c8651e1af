use super::configuration::Configuration;
use super::error::AppError;
use super::input::{StudyFile, StudyInputs};
use super::styles::Styles;
use super::ProjectionArg;
use crate::plot::{
    AlignmentPlot, BandDiagram, BandDiagramParameters, DosComparison, DosComparisonParameters,
    DosPlot, DosPlotParameters, FormationPlot, FormationPlotParameters, Projection,
    TransitionDiagram, TransitionDiagramParameters,
};
use crate::study::{fermi_grid, write_report, DefectStudy, MaterialStudy};
use color_eyre::eyre::eyre;
use console::Term;
use defect_vasp::Calculation;
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

fn write_field(
    term: &Term,
    styles: &Styles,
    label: &str,
    value: impl std::fmt::Display,
) -> std::io::Result<()> {
    term.write_line(&format!(
        "  {:<22} {}",
        label.style(styles.label_style),
        value.style(styles.value_style)
    ))
}

fn summarise(calculation: &Calculation, term: &Term, styles: &Styles) -> std::io::Result<()> {
    term.write_line(&format!("{}", calculation.title().style(styles.heading_style)))?;
    write_field(term, styles, "ID", calculation.id())?;
    if let Some(outcar) = calculation.outcar.as_ref() {
        write_field(term, styles, "OUTCAR", outcar.display())?;
    }
    write_field(term, styles, "Functional", calculation.functional.name())?;
    write_field(term, styles, "Composition", calculation.name())?;
    write_field(term, styles, "Ions", calculation.number_of_atoms())?;
    write_field(term, styles, "Electrons", calculation.electrons)?;
    write_field(term, styles, "Charge", calculation.rounded_charge())?;
    write_field(term, styles, "Energy (eV)", format!("{:.5}", calculation.energy))?;
    write_field(term, styles, "Fermi level (eV)", format!("{:.5}", calculation.fermi_energy))?;
    write_field(term, styles, "VBM (eV)", format!("{:.5}", calculation.vbm))?;
    write_field(term, styles, "CBM (eV)", format!("{:.5}", calculation.cbm))?;
    write_field(term, styles, "Gap (eV)", format!("{:.5}", calculation.gap()))?;
    write_field(term, styles, "k-points", calculation.kpoints.len())?;
    write_field(term, styles, "Bands", calculation.nbands)?;
    write_field(term, styles, "ISPIN", calculation.tags.ispin.ispin())?;
    write_field(term, styles, "ICHARG", calculation.tags.icharg)?;
    write_field(term, styles, "LORBIT", calculation.tags.lorbit)?;
    write_field(
        term,
        styles,
        "Core potentials",
        if calculation.potentials.is_some() { "yes" } else { "no" },
    )?;
    write_field(
        term,
        styles,
        "DOS",
        match &calculation.dos {
            Some(dos) if dos.projected.is_some() => "total and projected",
            Some(_) => "total",
            None => "none",
        },
    )
}

/// Reads and summarises every OUTCAR matching `pattern`
pub(crate) fn inspect(
    pattern: &str,
    doscar: Option<&Path>,
    term: &Term,
    styles: &Styles,
) -> color_eyre::Result<()> {
    let outcars = glob::glob(pattern)
        .map_err(AppError::from)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::from)?;
    if outcars.is_empty() {
        return Err(AppError::NoMatches(pattern.to_string()).into());
    }

    for outcar in outcars {
        let doscar = doscar.map(Path::to_path_buf).or_else(|| {
            let sibling = outcar.with_file_name("DOSCAR");
            sibling.exists().then(|| sibling)
        });
        let calculation = Calculation::from_files(&outcar, doscar.as_ref())?;
        summarise(&calculation, term, styles)?;
        term.write_line("")?;
    }
    Ok(())
}

pub(crate) struct DosOptions {
    pub(crate) projection: Option<ProjectionArg>,
    pub(crate) select: Vec<String>,
    pub(crate) total_projected: bool,
    pub(crate) fermi_shift: bool,
    pub(crate) display_spin: bool,
}

/// Writes the DOS of one calculation to `dos.csv`
pub(crate) fn dos(
    outcar: &Path,
    doscar: &Path,
    options: DosOptions,
    output: &Path,
) -> color_eyre::Result<()> {
    let calculation = Calculation::from_files(outcar, Some(doscar))?;
    let mut parameters = DosPlotParameters::new(&calculation)?;
    parameters.total_projected = options.total_projected;
    parameters.fermi_shift = options.fermi_shift;
    parameters.display_spin = options.display_spin;
    if let Some(projection) = options.projection {
        parameters.projection = Some(match projection {
            ProjectionArg::Species => Projection::Species,
            ProjectionArg::Atoms => Projection::Atoms,
        });
    }
    if !options.select.is_empty() {
        match parameters.projection {
            Some(Projection::Atoms) => {
                parameters.atoms = Some(
                    options
                        .select
                        .iter()
                        .map(|label| label.parse())
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            _ => parameters.species = Some(options.select),
        }
    }

    let plot = DosPlot::new(&calculation, &parameters)?;
    let path = output.join("dos.csv");
    plot.write_csv(File::create(&path)?)?;
    tracing::info!("Wrote the DOS of {} to {}", calculation.id(), path.display());
    Ok(())
}

/// Writes the band diagram of a band structure run to `bands.csv`
pub(crate) fn bands(
    outcar: &Path,
    vbm_shift: bool,
    highlight: bool,
    kpoint_labels: Vec<String>,
    output: &Path,
    term: &Term,
    styles: &Styles,
) -> color_eyre::Result<()> {
    let calculation = Calculation::from_outcar(outcar)?;
    let diagram = BandDiagram::new(
        &calculation,
        &BandDiagramParameters {
            vbm_shift,
            highlight_band_edges: highlight,
            kpoint_labels,
        },
    )?;
    let path = output.join("bands.csv");
    diagram.write_csv(File::create(&path)?)?;
    tracing::info!("Wrote {} bands to {}", diagram.bands.len(), path.display());

    term.write_line(&format!("{}", diagram.title.style(styles.heading_style)))?;
    if let Some((valence, conduction)) = diagram.band_edges {
        write_field(term, styles, "VBM band", valence + 1)?;
        write_field(term, styles, "CBM band", conduction + 1)?;
    }
    for (position, label) in diagram.ticks.iter() {
        write_field(term, styles, label, format!("{:.5}", position))?;
    }
    Ok(())
}

fn create(output: &Path, name: &str) -> color_eyre::Result<File> {
    let path = output.join(name);
    tracing::debug!("Writing {}", path.display());
    Ok(File::create(path)?)
}

/// `<id>_dos_q<charge>.csv`, with the charge rounded as in the cell labels
fn dos_file_name(id: &str, charge: f64) -> String {
    format!("{}_dos_q{}.csv", id, charge.round() as i64)
}

/// Writes the report and plot data of one study
fn write_study(
    study: &DefectStudy<'_>,
    config: &Configuration,
    output: &Path,
) -> color_eyre::Result<()> {
    let id = study.id();
    let grid = &config.grid;

    let transition_parameters = TransitionDiagramParameters::new(
        study,
        grid.lower_transition_bound,
        grid.fermi_margin,
        grid.report_points,
    );
    let (lower, upper) = transition_parameters.energy_range;
    let report_grid = fermi_grid(lower, upper, grid.report_points).to_vec();
    let mut report = create(output, &format!("{}_report.txt", id))?;
    write_report(study, &report_grid, &mut report)?;

    if study.cells().is_empty() {
        tracing::warn!("{} has no defect cell, only the report is written", id);
        return Ok(());
    }

    let formation = FormationPlot::new(
        study,
        &FormationPlotParameters::new(study, grid.fermi_margin, grid.formation_points),
    )?;
    formation.write_csv(create(output, &format!("{}_formation.csv", id))?)?;

    let transitions = TransitionDiagram::new(
        study,
        &TransitionDiagramParameters {
            points: grid.transition_points,
            ..transition_parameters
        },
    )?;
    transitions.write_csv(create(output, &format!("{}_transitions.csv", id))?)?;

    for cell in study.cells() {
        match AlignmentPlot::new(study, cell, config.alignment.scan_points) {
            Ok(plot) => {
                plot.write_csv(create(output, &format!("{}_alignment_{}.csv", id, cell.id()))?)?
            }
            Err(error) => tracing::warn!("No potential alignment for {}: {}", cell.id(), error),
        }
    }

    let with_dos = std::iter::once(study.host())
        .chain(study.cells().iter().map(|cell| cell.cell()))
        .all(|calculation| calculation.dos.is_some());
    if with_dos {
        let comparison = DosComparison::new(
            study,
            &DosComparisonParameters {
                align_potential: study.corrections().potential_alignment,
                ..DosComparisonParameters::default()
            },
        )?;
        comparison
            .host
            .write_csv(create(output, &format!("{}_dos_host.csv", id))?)?;
        for (charge, plot) in comparison.cells.iter() {
            plot.write_csv(create(output, &dos_file_name(id, *charge))?)?;
        }
    }
    Ok(())
}

fn print_levels(
    study: &DefectStudy<'_>,
    config: &Configuration,
    term: &Term,
    styles: &Styles,
) -> color_eyre::Result<()> {
    term.write_line(&format!("{}", study.title().style(styles.heading_style)))?;
    for cell in study.cells() {
        write_field(
            term,
            styles,
            &cell.id(),
            format!(
                "E_for(E_F = 0) = {:.5} eV, corrections {:.5} eV",
                cell.formation_energy_at_vbm(),
                cell.corrections().total()
            ),
        )?;
    }
    if study.cells().is_empty() {
        return Ok(());
    }
    let grid = &config.grid;
    let parameters = TransitionDiagramParameters::new(
        study,
        grid.lower_transition_bound,
        grid.fermi_margin,
        grid.transition_points,
    );
    let (lower, upper) = parameters.energy_range;
    let grid = fermi_grid(lower, upper, parameters.points).to_vec();
    let levels = study.transition_levels(&grid)?;
    if levels.is_empty() {
        term.write_line("  No transition level in the gap")?;
    }
    for level in levels {
        term.write_line(&format!("  {}", level.style(styles.level_style)))?;
    }
    Ok(())
}

/// Runs every study file, comparing the studies when there are several
pub(crate) fn study(
    files: &[PathBuf],
    material: Option<String>,
    config: &Configuration,
    output: &Path,
    term: &Term,
    styles: &Styles,
) -> color_eyre::Result<()> {
    let inputs = files
        .iter()
        .map(|path| {
            let file = StudyFile::load(path)?;
            let inputs = StudyInputs::read(&file)?;
            Ok((file, inputs))
        })
        .collect::<color_eyre::Result<Vec<_>>>()?;

    let studies = inputs
        .iter()
        .map(|(file, inputs)| inputs.study(file))
        .collect::<color_eyre::Result<Vec<_>>>()?;

    for study in studies.iter() {
        write_study(study, config, output)?;
        print_levels(study, config, term, styles)?;
        term.write_line("")?;
    }

    if studies.len() > 1 {
        let name = match material {
            Some(name) => name,
            None => studies
                .first()
                .map(|study| study.host().reduced_name())
                .ok_or_else(|| eyre!("No study was read"))?,
        };
        let mut comparison = MaterialStudy::new(name);
        for study in studies {
            comparison.add(study);
        }
        write_material(&comparison, config, output)?;
    }
    Ok(())
}

/// Writes the lowest formation energy of each study on a shared grid
fn write_material(
    material: &MaterialStudy<'_>,
    config: &Configuration,
    output: &Path,
) -> color_eyre::Result<()> {
    let grid = material.fermi_grid(0., config.grid.fermi_margin, config.grid.formation_points)?;
    let grid = grid.to_vec();
    let curves = material.lowest_formation_energies(&grid)?;

    let file = create(output, &format!("{}_formation.csv", material.name()))?;
    let mut writer = csv::Writer::from_writer(file);
    let mut headers = vec!["Fermi level".to_string()];
    headers.extend(curves.iter().map(|(id, _)| id.clone()));
    writer.write_record(&headers)?;
    for (row, fermi_energy) in grid.iter().enumerate() {
        let mut record = vec![fermi_energy.to_string()];
        record.extend(curves.iter().map(|(_, curve)| {
            curve
                .get(row)
                .map(|(_, energy)| energy.to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    let mut summary = create(output, &format!("{}_transitions.txt", material.name()))?;
    for (id, levels) in material.transition_levels(&grid)? {
        writeln!(summary, "{}", id)?;
        for level in levels {
            writeln!(summary, "{}", level)?;
        }
    }
    tracing::info!("Compared {} studies of {}", material.studies().len(), material.name());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::dos_file_name;

    #[test]
    fn dos_files_are_named_by_the_rounded_charge() {
        assert_eq!(dos_file_name("CdS_vac", -1.9999998), "CdS_vac_dos_q-2.csv");
        assert_eq!(dos_file_name("CdS_vac", 1.0000004), "CdS_vac_dos_q1.csv");
        assert_eq!(dos_file_name("CdS_vac", 0.), "CdS_vac_dos_q0.csv");
    }
}
