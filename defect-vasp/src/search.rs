//! Line oriented lookups over the text of a VASP output file
//!
//! VASP writes most quantities as `KEY = value  trailing description`, so almost every
//! lookup is "find the line(s) containing a key and take the text up to a terminator".

use crate::{Result, VaspError};
use std::str::FromStr;

/// Which of the matching lines to read
#[derive(Copy, Clone, Debug)]
pub(crate) enum Occurrence {
    First,
    Last,
}

pub(crate) struct Lines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Lines<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
        }
    }

    pub(crate) fn first(&self) -> Option<&'a str> {
        self.lines.first().copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    /// Indices of every line containing `key`
    pub(crate) fn find_all(&self, key: &str) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(key))
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.lines.iter().filter(|line| line.contains(key)).count()
    }

    /// Indices of the lines containing `key`, erroring unless there are exactly `expected`
    pub(crate) fn find_exactly(&self, key: &str, expected: usize) -> Result<Vec<usize>> {
        let found = self.find_all(key);
        match found.len() {
            0 => Err(VaspError::MissingTag(key.to_owned())),
            n if n == expected => Ok(found),
            n => Err(VaspError::Occurrences {
                key: key.to_owned(),
                found: n,
                expected,
            }),
        }
    }

    pub(crate) fn find_last(&self, key: &str) -> Result<usize> {
        self.find_all(key)
            .pop()
            .ok_or_else(|| VaspError::MissingTag(key.to_owned()))
    }

    /// The trimmed text between `key` and `terminator` on the selected line containing `key`
    ///
    /// If the terminator is absent, or not given, the remainder of the line is returned.
    pub(crate) fn extract(
        &self,
        key: &str,
        occurrence: Occurrence,
        terminator: Option<&str>,
    ) -> Option<&'a str> {
        let mut matching = self.lines.iter().filter(|line| line.contains(key));
        let line = match occurrence {
            Occurrence::First => matching.next(),
            Occurrence::Last => matching.last(),
        }?;
        Some(between(line, key, terminator))
    }

    /// The text between `key` and `terminator` on every line containing `key`
    pub(crate) fn extract_all(&self, key: &str, terminator: Option<&str>) -> Vec<&'a str> {
        self.lines
            .iter()
            .filter(|line| line.contains(key))
            .map(|line| between(line, key, terminator))
            .collect()
    }

    /// Reads a tag which must appear on exactly one line
    pub(crate) fn tag<T: FromStr>(&self, key: &str, terminator: Option<&str>) -> Result<T> {
        let index = self.find_exactly(key, 1)?[0];
        let value = between(self.lines[index], key, terminator);
        value.parse().map_err(|_| VaspError::parse(key, value))
    }

    /// Reads a tag which may be absent; a tag found on several lines is an error
    pub(crate) fn optional_tag<T: FromStr>(
        &self,
        key: &str,
        terminator: Option<&str>,
    ) -> Result<Option<T>> {
        match self.count(key) {
            0 => Ok(None),
            _ => self.tag(key, terminator).map(Some),
        }
    }

    /// Reads the tag from the first or last line it appears on
    pub(crate) fn value<T: FromStr>(
        &self,
        key: &str,
        occurrence: Occurrence,
        terminator: Option<&str>,
    ) -> Result<T> {
        let value = self
            .extract(key, occurrence, terminator)
            .ok_or_else(|| VaspError::MissingTag(key.to_owned()))?;
        value.parse().map_err(|_| VaspError::parse(key, value))
    }

    /// The lines following `start` up to, and excluding, the first blank line
    pub(crate) fn block_from(&self, start: usize) -> &[&'a str] {
        let tail = self.lines.get(start..).unwrap_or_default();
        let end = tail
            .iter()
            .position(|line| line.trim().is_empty())
            .unwrap_or(tail.len());
        &tail[..end]
    }

    pub(crate) fn slice(&self, start: usize, len: usize) -> Option<&[&'a str]> {
        self.lines.get(start..start + len)
    }
}

fn between<'a>(line: &'a str, key: &str, terminator: Option<&str>) -> &'a str {
    let start = line.find(key).map(|index| index + key.len()).unwrap_or(0);
    let rest = &line[start..];
    let end = terminator
        .and_then(|terminator| rest.find(terminator))
        .unwrap_or(rest.len());
    rest[..end].trim()
}

/// Parses every whitespace separated number on a row
pub(crate) fn parse_row(row: &str) -> Result<Vec<f64>> {
    row.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| VaspError::parse(row.trim(), token))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{parse_row, Lines, Occurrence};

    const TEXT: &str = "   ISPIN  =      2    spin polarized calculation?\n   EMIN   =  -10.00;   EMAX   =   10.00  energy-range for DOS\n\n   ZVAL   =  12.00  6.00\n   ZVAL   =  2.00  6.00\n";

    #[test]
    fn tag_between_key_and_terminator_is_parsed() {
        let lines = Lines::new(TEXT);
        let ispin: usize = lines.tag("ISPIN  =", Some("spin")).unwrap();
        assert_eq!(ispin, 2);
        let emin: f64 = lines.tag("EMIN   =", Some(";")).unwrap();
        let emax: f64 = lines.tag("EMAX   =", Some("energy-range")).unwrap();
        assert_eq!((emin, emax), (-10., 10.));
    }

    #[test]
    fn repeated_tag_is_rejected_where_uniqueness_is_required() {
        let lines = Lines::new(TEXT);
        assert!(lines.tag::<String>("ZVAL   =", None).is_err());
        assert_eq!(
            lines.extract("ZVAL   =", Occurrence::Last, None),
            Some("2.00  6.00")
        );
    }

    #[test]
    fn missing_tag_is_none_when_optional() {
        let lines = Lines::new(TEXT);
        assert!(lines
            .optional_tag::<f64>("HFSCREEN=", Some("screening"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn block_stops_at_the_first_blank_line() {
        let lines = Lines::new(TEXT);
        assert_eq!(lines.block_from(0).len(), 2);
    }

    #[test]
    fn rows_with_text_fail_to_parse() {
        assert_eq!(parse_row(" 1.0  -2.5 ").unwrap(), vec![1.0, -2.5]);
        assert!(parse_row("1.0 abc").is_err());
    }
}
