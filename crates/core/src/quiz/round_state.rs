//! Splash → guess → reveal flow.
//!
//! Driven only by discrete events: user intents and playback completion. The
//! machine never touches timers or audio; it tells the caller what to do next.

use serde::Serialize;

use super::generator::{Round, RoundVersion};

/// Screen the trainer is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Transient while audio setup happens.
    #[default]
    Loading,
    /// "Tap to start".
    Splash,
    /// Interval is playing or has played; answer hidden.
    Guess,
    /// Answer shown.
    Reveal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Splash => write!(f, "splash"),
            Self::Guess => write!(f, "guess"),
            Self::Reveal => write!(f, "reveal"),
        }
    }
}

/// What the UI needs to render.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UiState {
    pub stage: Stage,
    /// Reveal and replay affordances are live.
    pub reveal_enabled: bool,
    /// Only present on the reveal screen.
    pub displayed_interval_name: Option<String>,
}

/// Meaning of a tap on the main surface in the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    NewRound,
    Reveal,
    Ignore,
}

#[derive(Debug, Default)]
pub struct RoundStateMachine {
    stage: Stage,
    reveal_enabled: bool,
    current: Option<Round>,
}

impl RoundStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Version of the round on screen, or 0 before the first round.
    pub fn current_version(&self) -> RoundVersion {
        self.current.as_ref().map(|r| r.version).unwrap_or(0)
    }

    /// Setup finished: Loading → Splash.
    pub fn ready(&mut self) -> bool {
        if self.stage != Stage::Loading {
            return false;
        }
        self.stage = Stage::Splash;
        true
    }

    pub fn can_start_round(&self) -> bool {
        self.stage != Stage::Loading
    }

    /// Enter Guess for a freshly generated round. Reveal stays disabled until
    /// that round's playback completes.
    pub fn begin_round(&mut self, round: Round) -> bool {
        if !self.can_start_round() {
            return false;
        }
        log::debug!("Round {} begins: {}", round.version, round.test_name());
        self.stage = Stage::Guess;
        self.reveal_enabled = false;
        self.current = Some(round);
        true
    }

    /// Guess → Reveal, only once the interval has been heard.
    pub fn request_reveal(&mut self) -> bool {
        if self.stage != Stage::Guess || !self.reveal_enabled {
            return false;
        }
        self.stage = Stage::Reveal;
        true
    }

    /// The round to play again, if replay is currently allowed. Stage is unchanged.
    pub fn request_replay(&self) -> Option<&Round> {
        match self.stage {
            Stage::Guess | Stage::Reveal if self.reveal_enabled => self.current.as_ref(),
            _ => None,
        }
    }

    /// Playback for `version` finished. Completions for other rounds are ignored.
    pub fn playback_complete(&mut self, version: RoundVersion) -> bool {
        match &self.current {
            Some(round) if round.version == version => {
                self.reveal_enabled = true;
                true
            }
            _ => {
                log::debug!("Ignoring completion for stale round {}", version);
                false
            }
        }
    }

    pub fn tap(&self) -> TapAction {
        match self.stage {
            Stage::Loading => TapAction::Ignore,
            Stage::Splash | Stage::Reveal => TapAction::NewRound,
            Stage::Guess => TapAction::Reveal,
        }
    }

    pub fn ui_state(&self) -> UiState {
        let displayed_interval_name = match (self.stage, &self.current) {
            (Stage::Reveal, Some(round)) => Some(round.interval.name.to_string()),
            _ => None,
        };

        UiState {
            stage: self.stage,
            reveal_enabled: self.reveal_enabled,
            displayed_interval_name,
        }
    }
}
