use crate::search::{Lines, Occurrence};
use crate::{Result, VaspError};

const GW_MARKER: &str = "Response functions by sum over occupied states:";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The exchange-correlation treatment used in a calculation
pub enum Functional {
    /// Local density approximation
    Lda,
    /// Generalised gradient approximation (PBE)
    Gga,
    /// Screened hybrid, HSE06
    Hse,
    /// Unscreened hybrid, PBE0
    Pbe0,
    /// Single shot GW on top of GGA
    G0W0,
    /// Partially self-consistent GW on top of GGA
    Gw0,
    /// Anything not recognised above
    Other,
}

impl Functional {
    /// Short name used in identifiers
    pub fn name(&self) -> &'static str {
        match self {
            Functional::Lda => "LDA",
            Functional::Gga => "GGA",
            Functional::Hse => "HSE",
            Functional::Pbe0 => "PBE0",
            Functional::G0W0 => "G0W0@GGA",
            Functional::Gw0 => "GW0@GGA",
            Functional::Other => "other",
        }
    }

    /// Name with subscripts, for figure titles
    pub fn title(&self) -> &'static str {
        match self {
            Functional::G0W0 => "G_0W_0@GGA",
            Functional::Gw0 => "GW_0@GGA",
            other => other.name(),
        }
    }

    /// Whether the calculation is a quasiparticle run
    pub fn is_gw(&self) -> bool {
        matches!(self, Functional::G0W0 | Functional::Gw0)
    }

    pub(crate) fn detect(lines: &Lines<'_>) -> Result<Self> {
        let lexch = lines.extract("LEXCH   =", Occurrence::First, Some("internal"));
        let lhfcalc = lines.extract("LHFCALC =", Occurrence::First, Some("Hartree"));
        let hfscreen: Option<f64> = lines.optional_tag("HFSCREEN=", Some("screening"))?;

        let mut functional = match (lexch, lhfcalc) {
            (Some("2"), Some("F")) => Functional::Lda,
            (Some("8" | "PE"), Some("F")) => Functional::Gga,
            (Some("8" | "PE"), Some("T")) => match hfscreen {
                Some(screening) if (screening - 0.2).abs() < 1e-6 => Functional::Hse,
                Some(screening) if screening.abs() < 1e-6 => Functional::Pbe0,
                _ => Functional::Other,
            },
            _ => Functional::Other,
        };

        match lines.count(GW_MARKER) {
            0 => {}
            2 => {
                let nelm: usize = lines.tag("NELM    =", Some("number"))?;
                functional = if nelm == 1 {
                    Functional::G0W0
                } else {
                    Functional::Gw0
                };
            }
            found => {
                return Err(VaspError::Occurrences {
                    key: GW_MARKER.to_owned(),
                    found,
                    expected: 2,
                })
            }
        }
        tracing::debug!("Detected functional {}", functional.name());
        Ok(functional)
    }
}

impl std::fmt::Display for Functional {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::Functional;
    use crate::search::Lines;

    fn detect(text: &str) -> Functional {
        Functional::detect(&Lines::new(text)).unwrap()
    }

    #[test]
    fn semi_local_functionals_are_recognised() {
        let lda = "   LEXCH   =     2    internal setting for exchange type\n   LHFCALC =     F    Hartree Fock is set to\n";
        assert_eq!(detect(lda), Functional::Lda);
        let gga = "   LEXCH   =     8    internal setting for exchange type\n   LHFCALC =     F    Hartree Fock is set to\n";
        assert_eq!(detect(gga), Functional::Gga);
    }

    #[test]
    fn hybrids_are_split_by_screening_length() {
        let hse = "   LEXCH   =     8    internal setting for exchange type\n   LHFCALC =     T    Hartree Fock is set to\n   HFSCREEN=  0.2000    screening length (either q_TF or 0.3 A-1)\n";
        assert_eq!(detect(hse), Functional::Hse);
        let pbe0 = hse.replace("0.2000", "0.0000");
        assert_eq!(detect(&pbe0), Functional::Pbe0);
    }

    #[test]
    fn gw_runs_take_precedence() {
        let text = "   LEXCH   =     8    internal setting for exchange type\n   LHFCALC =     F    Hartree Fock is set to\n   NELM    =      1    number of iterations\n Response functions by sum over occupied states:\n Response functions by sum over occupied states:\n";
        let functional = detect(text);
        assert_eq!(functional, Functional::G0W0);
        assert_eq!(functional.title(), "G_0W_0@GGA");
        assert!(functional.is_gw());
    }

    #[test]
    fn unknown_settings_fall_back_to_other() {
        assert_eq!(detect(" nothing to see\n"), Functional::Other);
    }
}
