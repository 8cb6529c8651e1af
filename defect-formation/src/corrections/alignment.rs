//! Potential alignment
//!
//! The averaged electrostatic potential at each ion core of the defect cell is compared with
//! the potential at the same ion in the host. Far from the defect the difference measures the
//! offset between the electrostatic references of the two calculations.

use crate::defect::Defect;
use crate::error::CorrectionError;
use defect_vasp::{Atom, Calculation};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

/// Core potential differences between a defect cell and its host
#[derive(Clone, Debug)]
pub struct PotentialAlignment {
    /// Labels in the defect cell of the compared ions
    pub atoms: Vec<Atom>,
    /// Positions in the defect cell of the compared ions
    pub positions: Vec<Point3<f64>>,
    /// Distance of each compared ion to the closest defect or periodic image of a defect
    pub distances_to_closest_defect: Vec<f64>,
    /// `V_defect - V_host` for each compared ion
    pub deltas: Vec<f64>,
    /// Radius of the exclusion spheres around the defects
    pub radius: f64,
    /// Mean of the differences over the ions outside every sphere
    pub mean_outside: Option<f64>,
}

impl PotentialAlignment {
    /// Mean potential difference over the ions further than `radius` from every defect
    pub fn mean_beyond(&self, radius: f64) -> Option<f64> {
        let (sum, count) = self
            .distances_to_closest_defect
            .iter()
            .zip(self.deltas.iter())
            .filter(|(distance, _)| **distance > radius)
            .fold((0., 0usize), |(sum, count), (_, delta)| (sum + delta, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// The alignment, failing if no ion lies outside the spheres
    pub fn value(&self) -> Result<f64, CorrectionError> {
        self.mean_outside
            .ok_or(CorrectionError::NoAtomsOutside(self.radius))
    }

    /// Mean potential difference for every radius in `radii`
    pub fn scan(&self, radii: &[f64]) -> Vec<Option<f64>> {
        radii
            .par_iter()
            .map(|&radius| self.mean_beyond(radius))
            .collect()
    }
}

/// Compares the core potentials of `defect_cell` with those of `host`
///
/// Ions involved in the defects are left out: the removed host ion of vacancies and
/// substitutions, and the added ion of interstitials and substitutions. The remaining ions are
/// paired in the order they appear in each cell.
#[tracing::instrument(name = "Potential alignment", skip_all, fields(cell = %defect_cell.id()))]
pub fn potential_alignment(
    host: &Calculation,
    defect_cell: &Calculation,
    defects: &[Defect],
    radius: f64,
) -> Result<PotentialAlignment, CorrectionError> {
    let host_potentials = host
        .potentials
        .as_ref()
        .ok_or_else(|| CorrectionError::MissingPotentials(host.id()))?;
    let defect_potentials = defect_cell
        .potentials
        .as_ref()
        .ok_or_else(|| CorrectionError::MissingPotentials(defect_cell.id()))?;

    let centres = defect_centres(host, defect_cell, defects)?;

    let removed = defects
        .iter()
        .filter_map(Defect::removed_from_host)
        .collect::<Vec<_>>();
    let added = defects
        .iter()
        .filter_map(Defect::added_to_cell)
        .collect::<Vec<_>>();

    let host_indices = (0..host.number_of_atoms())
        .filter(|&index| !removed.contains(&&host.atoms[index]))
        .collect::<Vec<_>>();
    let defect_indices = (0..defect_cell.number_of_atoms())
        .filter(|&index| !added.contains(&&defect_cell.atoms[index]))
        .collect::<Vec<_>>();

    if host_indices.len() != defect_indices.len() {
        return Err(CorrectionError::InconsistentAtoms {
            host: host_indices.len(),
            defect: defect_indices.len(),
        });
    }

    let deltas = host_indices
        .iter()
        .zip(defect_indices.iter())
        .map(|(&h, &d)| defect_potentials[d] - host_potentials[h])
        .collect::<Vec<_>>();
    let positions = defect_indices
        .iter()
        .map(|&index| defect_cell.positions[index])
        .collect::<Vec<_>>();
    let distances_to_closest_defect = positions
        .iter()
        .map(|position| {
            centres
                .iter()
                .map(|centre| (position - centre).norm())
                .fold(f64::INFINITY, f64::min)
        })
        .collect::<Vec<_>>();
    let atoms = defect_indices
        .iter()
        .map(|&index| defect_cell.atoms[index].clone())
        .collect();

    let mut alignment = PotentialAlignment {
        atoms,
        positions,
        distances_to_closest_defect,
        deltas,
        radius,
        mean_outside: None,
    };
    alignment.mean_outside = alignment.mean_beyond(radius);
    match alignment.mean_outside {
        Some(mean) => tracing::debug!("Mean potential difference outside {radius} Å: {mean:.5} eV"),
        None => tracing::warn!("No atom lies further than {radius} Å from the defects"),
    }
    Ok(alignment)
}

/// Mean potential difference outside spheres of each radius in `radii`
pub fn potential_alignment_scan(
    host: &Calculation,
    defect_cell: &Calculation,
    defects: &[Defect],
    radii: &[f64],
) -> Result<Vec<Option<f64>>, CorrectionError> {
    let alignment = potential_alignment(host, defect_cell, defects, 0.)?;
    Ok(alignment.scan(radii))
}

/// Evenly spaced radii from zero to the largest lattice component
pub fn scan_radii(calculation: &Calculation, points: usize) -> Vec<f64> {
    let largest = calculation.lattice.amax();
    ndarray::Array1::linspace(0., largest, points).to_vec()
}

/// Positions of the defects together with their images in the six neighbouring cells
fn defect_centres(
    host: &Calculation,
    defect_cell: &Calculation,
    defects: &[Defect],
) -> Result<Vec<Point3<f64>>, CorrectionError> {
    let offsets = std::iter::once(Vector3::zeros())
        .chain((0..3).flat_map(|axis| {
            let vector: Vector3<f64> = defect_cell.lattice.row(axis).transpose();
            [vector, -vector]
        }))
        .collect::<Vec<_>>();
    defects
        .iter()
        .map(|defect| defect.position(host, defect_cell))
        .map(|position| {
            let position = position?;
            Ok(offsets
                .iter()
                .map(|offset| position + *offset)
                .collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>, CorrectionError>>()
        .map(|centres| centres.into_iter().flatten().collect())
}

#[cfg(test)]
mod test {
    use super::{potential_alignment, potential_alignment_scan};
    use crate::defect::{Defect, DefectKind};
    use crate::error::CorrectionError;
    use approx::assert_relative_eq;
    use defect_vasp::Calculation;
    use utilities::structures::{cd_vacancy, cds_host, cl_on_s};
    use utilities::FixtureFunctional;

    fn calculation(text: String) -> Calculation {
        Calculation::parse(&text, None).unwrap()
    }

    fn cd_vacancy_label() -> Vec<Defect> {
        vec![Defect::new(
            DefectKind::Vacancy {
                atom: "Cd (1)".parse().unwrap(),
            },
            None,
        )
        .unwrap()]
    }

    #[test]
    fn uniform_shift_is_recovered() {
        let host = calculation(cds_host().render());
        let defect = calculation(cd_vacancy(0., -95., 0.25).render());
        let alignment = potential_alignment(&host, &defect, &cd_vacancy_label(), 3.5).unwrap();

        assert_eq!(alignment.deltas.len(), 7);
        alignment
            .deltas
            .iter()
            .for_each(|delta| assert_relative_eq!(*delta, 0.25, epsilon = 1e-10));
        assert_relative_eq!(alignment.mean_outside.unwrap(), 0.25, epsilon = 1e-10);
    }

    #[test]
    fn distances_account_for_periodic_images() {
        let host = calculation(cds_host().render());
        let defect = calculation(cd_vacancy(0., -95., 0.).render());
        let alignment = potential_alignment(&host, &defect, &cd_vacancy_label(), 0.).unwrap();

        let mut distances = alignment.distances_to_closest_defect.clone();
        distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected = [3., 3., 3., 18f64.sqrt(), 18f64.sqrt(), 18f64.sqrt(), 27f64.sqrt()];
        distances
            .iter()
            .zip(expected.iter())
            .for_each(|(found, expected)| assert_relative_eq!(*found, *expected, epsilon = 1e-6));
    }

    #[test]
    fn only_distant_ions_enter_the_mean() {
        let host = calculation(cds_host().render());
        let mut fixture = cd_vacancy(0., -95., 0.);
        // The ion on the far corner of the cell is the only one beyond 5 Å
        let corner = fixture.flat_index("S", 4);
        fixture.potentials[corner] += 1.;
        let defect = calculation(fixture.render());
        let alignment = potential_alignment(&host, &defect, &cd_vacancy_label(), 5.).unwrap();
        assert_relative_eq!(alignment.mean_outside.unwrap(), 1., epsilon = 1e-10);
        assert_relative_eq!(alignment.mean_beyond(0.).unwrap(), 1. / 7., epsilon = 1e-10);
    }

    #[test]
    fn substituted_ions_are_excluded_from_both_cells() {
        let host = calculation(cds_host().render());
        let defect = calculation(cl_on_s(0., -99.).render());
        let defects = vec![Defect::new(
            DefectKind::Substitution {
                removed: "S (2)".parse().unwrap(),
                added: "Cl (1)".parse().unwrap(),
            },
            None,
        )
        .unwrap()];
        let alignment = potential_alignment(&host, &defect, &defects, 0.).unwrap();
        assert_eq!(alignment.atoms.len(), 7);
        assert!(alignment.atoms.iter().all(|atom| atom.species != "Cl"));
    }

    #[test]
    fn mismatched_populations_are_rejected() {
        let host = calculation(cds_host().render());
        let defect = calculation(cd_vacancy(0., -95., 0.).render());
        let result = potential_alignment(&host, &defect, &[], 0.);
        assert!(matches!(
            result,
            Err(CorrectionError::InconsistentAtoms { host: 8, defect: 7 })
        ));
    }

    #[test]
    fn gw_cells_have_no_potentials() {
        let host = calculation(cds_host().with_functional(FixtureFunctional::G0W0).render());
        let defect = calculation(cd_vacancy(0., -95., 0.).render());
        let result = potential_alignment(&host, &defect, &cd_vacancy_label(), 0.);
        assert!(matches!(result, Err(CorrectionError::MissingPotentials(_))));
    }

    #[test]
    fn scan_empties_as_the_spheres_grow() {
        let host = calculation(cds_host().render());
        let defect = calculation(cd_vacancy(0., -95., 0.5).render());
        let scan =
            potential_alignment_scan(&host, &defect, &cd_vacancy_label(), &[0., 4., 6.]).unwrap();
        assert_relative_eq!(scan[0].unwrap(), 0.5, epsilon = 1e-10);
        assert_relative_eq!(scan[1].unwrap(), 0.5, epsilon = 1e-10);
        assert!(scan[2].is_none());
    }
}
