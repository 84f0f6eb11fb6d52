use aural_catalog::{Arpeggiation, IntervalCatalog};
use serde::{Deserialize, Serialize};

use crate::quiz::{RoundVersion, UiState};
use crate::sequencer::RoundOutcome;

/// Intents sent from the UI to the trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerCommand {
    /// Tap on the main surface; meaning depends on the stage.
    Tap,
    NewRound,
    Reveal,
    Replay,
    Shutdown,
}

/// Updates sent from the trainer to the UI
#[derive(Debug, Clone)]
pub enum TrainerEvent {
    Initialized,
    ShutdownComplete,
    Error { message: String },

    StateChanged(UiState),
    RoundStarted { version: RoundVersion },
    PlaybackFinished { outcome: RoundOutcome },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Playback
    pub inter_note_delay_ms: u64,
    pub stop_fade_ms: u64,
    pub note_duration_ms: u64,
    pub volume: f32,

    // Quiz
    pub intervals: Vec<String>,
    pub arpeggiations: Vec<Arpeggiation>,
    pub seed: Option<u64>,

    // Logging backend
    pub prepare_latency_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inter_note_delay_ms: 1000,
            stop_fade_ms: 200,
            note_duration_ms: 2000,
            volume: 0.5,

            intervals: IntervalCatalog::new()
                .codes()
                .into_iter()
                .map(String::from)
                .collect(),
            arpeggiations: Arpeggiation::ALL.to_vec(),
            seed: None,

            prepare_latency_ms: 50,
        }
    }
}
