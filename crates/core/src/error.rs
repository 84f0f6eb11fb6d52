use aural_catalog::CatalogError;
use thiserror::Error;

/// Failures reported by an [`AudioBackend`](crate::AudioBackend).
///
/// `Acquire`, `Prepare` and `Play` abandon a single note for the current round.
/// `Stop` and `Release` are logged and swallowed by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("failed to acquire {note}: {reason}")]
    Acquire { note: String, reason: String },

    #[error("failed to prepare {note}: {reason}")]
    Prepare { note: String, reason: String },

    #[error("failed to play {note}: {reason}")]
    Play { note: String, reason: String },

    #[error("failed to stop {note}: {reason}")]
    Stop { note: String, reason: String },

    #[error("failed to release {note}: {reason}")]
    Release { note: String, reason: String },
}

/// Quiz setup that can never produce a valid round. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error(
        "interval {code} spans {semitones} semitones but the scale only has {scale_len} pitches"
    )]
    IntervalTooWide {
        code: String,
        semitones: u8,
        scale_len: usize,
    },

    #[error("at least one arpeggiation must be enabled")]
    NoArpeggiations,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
