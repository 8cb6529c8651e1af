use crate::VaspError;
use itertools::Itertools;
use std::str::FromStr;

/// A single ion, labelled by its species and its 1-based rank among ions of that species
///
/// Labels print as `Cd (3)` and parse from either `Cd (3)` or `Cd(3)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    /// Chemical symbol
    pub species: String,
    /// Position in the species sub-list, starting from one
    pub index: usize,
}

impl Atom {
    /// Builds the label of the `index`-th ion of `species`
    pub fn new(species: impl Into<String>, index: usize) -> Self {
        Self {
            species: species.into(),
            index,
        }
    }

    /// The label without the separating whitespace, as used in identifiers
    pub fn compact(&self) -> String {
        format!("{}({})", self.species, self.index)
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.species, self.index)
    }
}

impl FromStr for Atom {
    type Err = VaspError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let invalid = || VaspError::parse("atom label", label);
        let (species, rest) = label.split_once('(').ok_or_else(invalid)?;
        let index = rest
            .trim()
            .strip_suffix(')')
            .ok_or_else(invalid)?
            .trim()
            .parse::<usize>()
            .map_err(|_| invalid())?;
        let species = species.trim();
        if species.is_empty() || index == 0 {
            return Err(invalid());
        }
        Ok(Self::new(species, index))
    }
}

/// The number of ions of each species, in the order VASP lists them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    species: Vec<(String, usize)>,
}

impl Composition {
    /// Pairs the species names with their populations
    pub fn new(species: Vec<String>, counts: Vec<usize>) -> Self {
        Self {
            species: species.into_iter().zip(counts).collect(),
        }
    }

    /// Species and populations in listing order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.species
            .iter()
            .map(|(species, count)| (species.as_str(), *count))
    }

    /// Population of `species`, zero when the species is absent
    pub fn count(&self, species: &str) -> usize {
        self.species
            .iter()
            .find(|(name, _)| name == species)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// The species names in listing order
    pub fn species(&self) -> impl Iterator<Item = &str> + '_ {
        self.species.iter().map(|(species, _)| species.as_str())
    }

    /// Total number of ions
    pub fn total(&self) -> usize {
        self.species.iter().map(|(_, count)| count).sum()
    }

    /// Every species name appearing in either composition, without repetition
    pub fn union_of_species<'a>(&'a self, other: &'a Composition) -> Vec<&'a str> {
        self.species().chain(other.species()).unique().collect()
    }

    /// One label per ion, `Cd (1)`, `Cd (2)`, ... in listing order
    pub fn atoms(&self) -> Vec<Atom> {
        self.species
            .iter()
            .flat_map(|(species, count)| (1..=*count).map(move |index| Atom::new(species, index)))
            .collect()
    }

    fn counts_for_naming(&self, reduced: bool) -> Vec<usize> {
        if self.species.len() <= 1 {
            return vec![1; self.species.len()];
        }
        let counts = self.species.iter().map(|(_, count)| *count).collect::<Vec<_>>();
        if reduced {
            let divisor = gcd(&counts).max(1);
            counts.into_iter().map(|count| count / divisor).collect()
        } else {
            counts
        }
    }

    /// Chemical formula, `Cd8In16S32` or `CdIn2S4` when `reduced`
    pub fn name(&self, reduced: bool) -> String {
        self.species
            .iter()
            .zip(self.counts_for_naming(reduced))
            .map(|((species, _), count)| match count {
                1 => species.clone(),
                n => format!("{}{}", species, n),
            })
            .collect()
    }

    /// Chemical formula with TeX subscripts, `CdIn_{2}S_{4}`
    pub fn display_name(&self, reduced: bool) -> String {
        self.species
            .iter()
            .zip(self.counts_for_naming(reduced))
            .map(|((species, _), count)| match count {
                1 => species.clone(),
                n => format!("{}_{{{}}}", species, n),
            })
            .collect()
    }
}

/// Greatest common divisor of a list of populations
pub fn gcd(values: &[usize]) -> usize {
    values.iter().fold(0, |acc, &value| euclid(acc, value))
}

fn euclid(a: usize, b: usize) -> usize {
    match b {
        0 => a,
        _ => euclid(b, a % b),
    }
}

#[cfg(test)]
mod test {
    use super::{gcd, Atom, Composition};
    use proptest::prelude::*;

    fn cd_in_s() -> Composition {
        Composition::new(
            vec!["Cd".into(), "In".into(), "S".into()],
            vec![8, 16, 32],
        )
    }

    #[test]
    fn formula_is_reduced_by_common_factor() {
        let composition = cd_in_s();
        assert_eq!(composition.name(false), "Cd8In16S32");
        assert_eq!(composition.name(true), "CdIn2S4");
        assert_eq!(composition.display_name(true), "CdIn_{2}S_{4}");
    }

    #[test]
    fn elemental_cells_are_named_without_count() {
        let composition = Composition::new(vec!["Si".into()], vec![64]);
        assert_eq!(composition.name(false), "Si");
        assert_eq!(composition.name(true), "Si");
    }

    #[test]
    fn atoms_are_labelled_per_species() {
        let composition = Composition::new(vec!["Cd".into(), "S".into()], vec![2, 1]);
        let labels = composition
            .atoms()
            .iter()
            .map(|atom| atom.to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Cd (1)", "Cd (2)", "S (1)"]);
    }

    #[test]
    fn labels_parse_with_and_without_whitespace() {
        assert_eq!("Cd (3)".parse::<Atom>().unwrap(), Atom::new("Cd", 3));
        assert_eq!("In(17)".parse::<Atom>().unwrap(), Atom::new("In", 17));
        assert!("Cd".parse::<Atom>().is_err());
        assert!("Cd (0)".parse::<Atom>().is_err());
    }

    #[test]
    fn absent_species_count_as_zero() {
        assert_eq!(cd_in_s().count("Cu"), 0);
        assert_eq!(cd_in_s().count("In"), 16);
        assert_eq!(cd_in_s().total(), 56);
    }

    proptest! {
        #[test]
        fn gcd_divides_every_value(values in prop::collection::vec(1usize..500, 1..6)) {
            let divisor = gcd(&values);
            prop_assert!(divisor >= 1);
            prop_assert!(values.iter().all(|value| value % divisor == 0));
        }

        #[test]
        fn atom_labels_round_trip(index in 1usize..1000) {
            let atom = Atom::new("Ga", index);
            prop_assert_eq!(atom.to_string().parse::<Atom>().unwrap(), atom);
        }
    }
}
