//! Lifecycle of a single loaded note.
//!
//! ```text
//! Unprepared --load--> Prepared --play--> Playing --stop--> Stopped --release--> Released
//! ```
//!
//! `release` consumes the resource, so the backend handle is freed at most once.
//! A resource dropped before release frees its handle in the background.

use std::sync::Arc;

use aural_catalog::Pitch;

use super::backend::{AudioBackend, NoteHandle, PlayToken};
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Unprepared,
    Prepared,
    Playing,
    Stopped,
    Released,
}

pub struct NoteResource {
    pitch: Pitch,
    handle: NoteHandle,
    token: Option<PlayToken>,
    state: NoteState,
    backend: Arc<dyn AudioBackend>,
}

impl NoteResource {
    /// Acquire and prepare a note for `pitch`.
    ///
    /// If preparation fails the freshly acquired handle is released before the
    /// error is returned.
    pub async fn load(backend: Arc<dyn AudioBackend>, pitch: Pitch) -> Result<Self, AudioError> {
        let handle = backend.acquire(pitch).await?;
        let mut note = Self {
            pitch,
            handle,
            token: None,
            state: NoteState::Unprepared,
            backend,
        };

        if let Err(e) = note.backend.prepare(handle).await {
            if let Err(release_err) = note.release().await {
                log::warn!("{}", release_err);
            }
            return Err(e);
        }

        note.state = NoteState::Prepared;
        log::debug!("Note {} prepared as {:?}", pitch, handle);
        Ok(note)
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    /// Prepared → Playing.
    pub async fn play(&mut self) -> Result<(), AudioError> {
        if self.state != NoteState::Prepared {
            return Err(AudioError::Play {
                note: self.pitch.to_string(),
                reason: format!("note is {:?}, not prepared", self.state),
            });
        }

        let token = self.backend.play(self.handle).await?;
        self.token = Some(token);
        self.state = NoteState::Playing;
        Ok(())
    }

    /// Playing → Stopped. Anything else is a no-op.
    pub async fn stop(&mut self) -> Result<(), AudioError> {
        if self.state != NoteState::Playing {
            return Ok(());
        }

        self.state = NoteState::Stopped;
        match self.token.take() {
            Some(token) => self.backend.stop(token).await,
            None => Ok(()),
        }
    }

    /// Stop if needed, then free the backend handle.
    ///
    /// The resource counts as released even when the backend reports an error;
    /// the call is never retried.
    pub async fn release(mut self) -> Result<(), AudioError> {
        if let Err(e) = self.stop().await {
            log::warn!("{}", e);
        }

        self.state = NoteState::Released;
        self.backend.release(self.handle).await
    }
}

impl std::fmt::Debug for NoteResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteResource")
            .field("pitch", &self.pitch)
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Drop for NoteResource {
    fn drop(&mut self) {
        if self.state == NoteState::Released {
            return;
        }

        log::warn!(
            "Note {} ({:?}) dropped while {:?}, releasing in background",
            self.pitch,
            self.handle,
            self.state
        );

        let backend = Arc::clone(&self.backend);
        let handle = self.handle;
        let token = if self.state == NoteState::Playing {
            self.token.take()
        } else {
            None
        };
        self.state = NoteState::Released;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Some(token) = token {
                        if let Err(e) = backend.stop(token).await {
                            log::warn!("{}", e);
                        }
                    }
                    if let Err(e) = backend.release(handle).await {
                        log::error!("{}", e);
                    }
                });
            }
            Err(_) => log::error!("No runtime to release {:?}; handle leaked", handle),
        }
    }
}
