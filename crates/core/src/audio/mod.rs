pub mod backend;
pub mod fade;
pub mod logging_backend;
pub mod note;
#[cfg(feature = "rodio")]
pub mod rodio_backend;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{AudioBackend, NoteHandle, PlayToken};
pub use logging_backend::LoggingBackend;
pub use note::{NoteResource, NoteState};
#[cfg(feature = "rodio")]
pub use rodio_backend::{RodioBackend, RodioSettings};
