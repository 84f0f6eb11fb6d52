pub mod generator;
pub mod round_state;

pub use generator::{QuizGenerator, Round, RoundVersion};
pub use round_state::{RoundStateMachine, Stage, TapAction, UiState};
