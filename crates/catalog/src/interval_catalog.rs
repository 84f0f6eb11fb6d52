use std::collections::HashSet;

use crate::CatalogError;

/// A named distance between two pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    /// Short code, e.g. `3M` for a major third.
    pub code: &'static str,
    /// Name shown to the user when the answer is revealed.
    pub name: &'static str,
    pub semitones: u8,
}

impl Interval {
    pub const fn new(code: &'static str, name: &'static str, semitones: u8) -> Self {
        Self {
            code,
            name,
            semitones,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

const DEFAULT_INTERVALS: [Interval; 12] = [
    Interval::new("2m", "Minor 2nd", 1),
    Interval::new("2M", "Major 2nd", 2),
    Interval::new("3m", "Minor 3rd", 3),
    Interval::new("3M", "Major 3rd", 4),
    Interval::new("4P", "Perfect 4th", 5),
    Interval::new("4T", "Tritone", 6),
    Interval::new("5P", "Perfect 5th", 7),
    Interval::new("6m", "Minor 6th", 8),
    Interval::new("6M", "Major 6th", 9),
    Interval::new("7m", "Minor 7th", 10),
    Interval::new("7M", "Major 7th", 11),
    Interval::new("8P", "Octave", 12),
];

/// Ordered set of intervals the quiz can ask about, keyed by code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalCatalog {
    intervals: Vec<Interval>,
}

impl IntervalCatalog {
    /// Every interval from a minor second up to the octave.
    pub fn new() -> Self {
        Self {
            intervals: DEFAULT_INTERVALS.to_vec(),
        }
    }

    pub fn from_intervals(intervals: Vec<Interval>) -> Result<Self, CatalogError> {
        if intervals.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut codes = HashSet::new();
        for interval in &intervals {
            if interval.semitones == 0 {
                return Err(CatalogError::ZeroWidthInterval(interval.code.to_string()));
            }
            if !codes.insert(interval.code) {
                return Err(CatalogError::DuplicateInterval(interval.code.to_string()));
            }
        }

        Ok(Self { intervals })
    }

    /// Restrict the catalog to the given codes, keeping catalog order.
    pub fn subset<S: AsRef<str>>(&self, codes: &[S]) -> Result<Self, CatalogError> {
        for code in codes {
            if self.get(code.as_ref()).is_none() {
                return Err(CatalogError::UnknownInterval(code.as_ref().to_string()));
            }
        }

        let intervals = self
            .intervals
            .iter()
            .filter(|i| codes.iter().any(|c| c.as_ref() == i.code))
            .copied()
            .collect();
        Self::from_intervals(intervals)
    }

    pub fn get(&self, code: &str) -> Option<Interval> {
        self.intervals.iter().find(|i| i.code == code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.intervals.iter().map(|i| i.code).collect()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

impl Default for IntervalCatalog {
    fn default() -> Self {
        Self::new()
    }
}
