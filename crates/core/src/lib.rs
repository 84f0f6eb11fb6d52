pub use audio::{AudioBackend, LoggingBackend, NoteHandle, NoteResource, NoteState, PlayToken};
#[cfg(feature = "rodio")]
pub use audio::{RodioBackend, RodioSettings};
pub use config::{ConfigError, ConfigFile, ConfigManager, ConfigOption, ConfigSchema};
pub use error::{AudioError, ConfigurationError};
pub use messages::{Settings, TrainerCommand, TrainerEvent};
pub use quiz::{
    QuizGenerator, Round, RoundStateMachine, RoundVersion, Stage, TapAction, UiState,
};
pub use sequencer::{
    NoteOutcome, PlaybackId, PlaybackSequencer, RoundOutcome, DEFAULT_INTER_NOTE_DELAY,
};
pub use trainer::Trainer;

pub mod audio;
mod config;
mod error;
pub mod messages;
pub mod quiz;
mod sequencer;
mod trainer;
