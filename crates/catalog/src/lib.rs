//! Static musical data for the aural ear trainer.
//!
//! Everything in this crate is compiled in: the chromatic scale the quiz draws
//! pitches from, and the catalog of named intervals it asks about.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod interval_catalog;
mod scale;

pub use interval_catalog::{Interval, IntervalCatalog};
pub use scale::{Pitch, Scale};

/// Order in which the two notes of an interval are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arpeggiation {
    /// Root first, then the upper note.
    #[default]
    Up,
    /// Upper note first, then the root.
    Down,
}

impl Arpeggiation {
    pub const ALL: [Arpeggiation; 2] = [Arpeggiation::Up, Arpeggiation::Down];

    pub fn is_descending(&self) -> bool {
        matches!(self, Self::Down)
    }
}

impl std::fmt::Display for Arpeggiation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Errors raised while building a scale or an interval catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("scale must contain at least one pitch")]
    EmptyScale,

    #[error("pitch {0} appears more than once in the scale")]
    DuplicatePitch(String),

    #[error("unknown interval code: {0}")]
    UnknownInterval(String),

    #[error("interval code {0} is defined more than once")]
    DuplicateInterval(String),

    #[error("interval {0} must span at least one semitone")]
    ZeroWidthInterval(String),

    #[error("interval catalog is empty")]
    EmptyCatalog,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arpeggiation_display() {
        assert_eq!(Arpeggiation::Up.to_string(), "up");
        assert_eq!(Arpeggiation::Down.to_string(), "down");
        assert!(Arpeggiation::Down.is_descending());
        assert!(!Arpeggiation::Up.is_descending());
    }

    #[test]
    fn test_arpeggiation_serde() {
        let json = serde_json::to_string(&Arpeggiation::ALL).unwrap();
        assert_eq!(json, r#"["up","down"]"#);

        let parsed: Vec<Arpeggiation> = serde_json::from_str(r#"["down"]"#).unwrap();
        assert_eq!(parsed, vec![Arpeggiation::Down]);
    }
}
