use async_trait::async_trait;
use aural_catalog::Pitch;

use crate::error::AudioError;

/// Opaque reference to one loaded sound inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteHandle(pub u64);

/// Returned by a successful `play`; needed to stop that playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayToken(pub u64);

/// The audio device, as seen by the trainer.
///
/// Every call may take a variable amount of time and may fail. Calls for
/// distinct handles may be in flight concurrently. Nothing here can be
/// cancelled once issued.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Reserve a playable resource for `pitch`.
    async fn acquire(&self, pitch: Pitch) -> Result<NoteHandle, AudioError>;

    /// Load the sound so that `play` starts without delay.
    async fn prepare(&self, handle: NoteHandle) -> Result<(), AudioError>;

    async fn play(&self, handle: NoteHandle) -> Result<PlayToken, AudioError>;

    async fn stop(&self, token: PlayToken) -> Result<(), AudioError>;

    /// Free the resource. Must be called exactly once per acquired handle.
    async fn release(&self, handle: NoteHandle) -> Result<(), AudioError>;
}
