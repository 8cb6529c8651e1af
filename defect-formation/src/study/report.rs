use super::DefectStudy;
use crate::error::StudyError;
use defect_vasp::Calculation;
use itertools::Itertools;
use std::io::Write;

fn write_host<W: Write>(
    writer: &mut W,
    heading: &str,
    host: &Calculation,
    with_energy: bool,
) -> std::io::Result<()> {
    writeln!(writer, "{}", heading)?;
    writeln!(writer, "ID: \t {} ", host.id())?;
    writeln!(writer, "Method: \t {} ", host.functional.name())?;
    if with_energy {
        writeln!(writer, "Energy: \t {:.5} eV ", host.energy)?;
    }
    writeln!(writer, "VBM: \t {:.5} eV ", host.vbm)?;
    writeln!(writer, "CBM: \t {:.5} eV ", host.cbm)?;
    writeln!(writer, "Gap: \t {:.5} eV ", host.gap())
}

/// Writes a plain text summary of `study`, with transition levels searched on `grid`
pub fn write_report<W: Write>(
    study: &DefectStudy<'_>,
    grid: &[f64],
    writer: &mut W,
) -> Result<(), StudyError> {
    writeln!(
        writer,
        "# {} ({})",
        study.title(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(writer)?;
    write_host(writer, "HOST CELL", study.host(), true)?;

    if study.has_distinct_host_b() {
        writeln!(writer)?;
        write_host(writer, "HOST CELL B", study.host_b(), false)?;
    }

    writeln!(writer, "\nGAP CORRECTION")?;
    writeln!(writer, "DE_V: {:.5} eV ", study.de_vbm())?;
    writeln!(writer, "DE_C: {:.5} eV ", study.de_cbm())?;

    writeln!(writer, "\nDEFECTS")?;
    writeln!(
        writer,
        "Name\tType\tatom(s)\tcoordinates\tchemical potential(s) (eV)\tn"
    )?;
    let reference_cell = study
        .cells()
        .first()
        .map(|cell| cell.cell())
        .unwrap_or_else(|| study.host());
    for defect in study.defects() {
        let coordinates = defect
            .position(study.host(), reference_cell)
            .map(|position| format!("[{:.5}, {:.5}, {:.5}]", position.x, position.y, position.z))
            .unwrap_or_else(|_| "-".to_string());
        let atoms = defect
            .kind()
            .atoms()
            .iter()
            .join("&");
        let potentials = defect
            .chemical_potentials()
            .iter()
            .map(|potential| format!("{:.5}", potential))
            .join(", ");
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t[{}]\t{}",
            defect.id(),
            defect.kind().description(),
            atoms,
            coordinates,
            potentials,
            defect.n()
        )?;
    }

    writeln!(writer, "\nDEFECT CELLS")?;
    writeln!(
        writer,
        "Name\tCharge\tEnergy\tVBM correction\tPHS correction (holes)\tPHS correction (electrons)\
         \tPotential alignment\tMoss-Burstein correction (holes)\tMoss-Burstein correction (electrons)\
         \tMakov-Payne correction\tTotal"
    )?;
    for cell in study.cells() {
        let corrections = cell.corrections();
        writeln!(
            writer,
            "{}\t{}\t {:.5}\t {:.5}\t {:.5}\t {:.5}\t {:.5}\t {:.5}\t {:.5}\t {:.5}\t {:.5}",
            cell.id(),
            cell.cell().rounded_charge(),
            cell.cell().energy,
            corrections.vbm,
            corrections.phs.0,
            corrections.phs.1,
            corrections.potential_alignment,
            corrections.moss_burstein.0,
            corrections.moss_burstein.1,
            corrections.makov_payne,
            corrections.total()
        )?;
    }

    writeln!(writer, "\nCORRECTIONS PARAMETERS")?;
    writeln!(writer, "Name\tNb of electrons\tSpheres radius")?;
    for cell in study.cells() {
        writeln!(
            writer,
            "{}\t{}\t {:.5}",
            cell.id(),
            cell.cell().electrons.round() as i64,
            cell.parameters().spheres_radius
        )?;
    }

    writeln!(writer, "\nTRANSITION LEVELS")?;
    if !study.cells().is_empty() {
        for level in study.transition_levels(grid)? {
            writeln!(writer, "{}", level)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::write_report;
    use crate::defect::{Defect, DefectKind};
    use crate::study::{fermi_grid, CellParameters, CorrectionSet, DefectStudyBuilder};
    use defect_vasp::Calculation;
    use utilities::structures::{cd_vacancy, cds_host};

    #[test]
    fn report_lists_every_section() {
        let host = Calculation::parse(&cds_host().render(), None).unwrap();
        let neutral = Calculation::parse(&cd_vacancy(0., -95., 0.).render(), None).unwrap();
        let charged = Calculation::parse(&cd_vacancy(-2., -92., 0.1).render(), None).unwrap();
        let mut study = DefectStudyBuilder::new()
            .with_host(&host)
            .with_defects(vec![Defect::new(
                DefectKind::Vacancy {
                    atom: "Cd (1)".parse().unwrap(),
                },
                None,
            )
            .unwrap()])
            .with_corrections(CorrectionSet {
                makov_payne: false,
                ..CorrectionSet::default()
            })
            .build()
            .unwrap();
        let parameters = CellParameters {
            spheres_radius: 3.5,
            electrons_in_cb: 0.,
            holes_in_vb: 0.,
        };
        study.add_defect_cell(&neutral, parameters).unwrap();
        study.add_defect_cell(&charged, parameters).unwrap();

        let grid = fermi_grid(-0.5, 2.1, 2601);
        let mut buffer = Vec::new();
        write_report(&study, grid.as_slice().unwrap(), &mut buffer).unwrap();
        let report = String::from_utf8(buffer).unwrap();

        for heading in [
            "HOST CELL\n",
            "GAP CORRECTION",
            "DEFECTS",
            "DEFECT CELLS",
            "CORRECTIONS PARAMETERS",
            "TRANSITION LEVELS",
        ] {
            assert!(report.contains(heading), "missing {}", heading);
        }
        assert!(!report.contains("HOST CELL B"));
        assert!(report.contains("Energy: \t -100.00000 eV"));
        assert!(report.contains("Vac_Cd(1)\tVacancy\tCd (1)\t[0.00000, 0.00000, 0.00000]\t[-0.56000]\t1"));
        assert!(report.contains("Cd3S4_GGA_q-2\t-2\t"));
        assert!(report.contains("Cd3S4_GGA_q-2\t62\t 3.50000"));
        assert!(report.lines().last().unwrap().starts_with("0/-2 : 0.4"));
    }
}
