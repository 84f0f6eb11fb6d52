//! Backend without an audio device.
//!
//! Useful headless and as the default CLI backend: every operation is logged,
//! and `prepare` waits a configurable time to behave like a real device loading
//! a sample.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use aural_catalog::Pitch;
use parking_lot::Mutex;

use super::backend::{AudioBackend, NoteHandle, PlayToken};
use crate::error::AudioError;

pub struct LoggingBackend {
    prepare_latency: Duration,
    next_id: AtomicU64,
    notes: Mutex<HashMap<NoteHandle, Pitch>>,
}

impl LoggingBackend {
    pub fn new(prepare_latency: Duration) -> Self {
        Self {
            prepare_latency,
            next_id: AtomicU64::new(1),
            notes: Mutex::new(HashMap::new()),
        }
    }

    /// Number of handles acquired and not yet released.
    pub fn open_handles(&self) -> usize {
        self.notes.lock().len()
    }

    fn lookup(&self, handle: NoteHandle) -> Option<Pitch> {
        self.notes.lock().get(&handle).copied()
    }
}

impl Default for LoggingBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl AudioBackend for LoggingBackend {
    fn name(&self) -> &str {
        "logging"
    }

    async fn acquire(&self, pitch: Pitch) -> Result<NoteHandle, AudioError> {
        let handle = NoteHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.notes.lock().insert(handle, pitch);
        log::debug!("Acquired {:?} for {}", handle, pitch);
        Ok(handle)
    }

    async fn prepare(&self, handle: NoteHandle) -> Result<(), AudioError> {
        let pitch = self.lookup(handle).ok_or_else(|| AudioError::Prepare {
            note: format!("{:?}", handle),
            reason: "handle not acquired".to_string(),
        })?;
        tokio::time::sleep(self.prepare_latency).await;
        log::debug!("Prepared {} ({:.1} Hz)", pitch, pitch.frequency());
        Ok(())
    }

    async fn play(&self, handle: NoteHandle) -> Result<PlayToken, AudioError> {
        let pitch = self.lookup(handle).ok_or_else(|| AudioError::Play {
            note: format!("{:?}", handle),
            reason: "handle not acquired".to_string(),
        })?;
        log::info!("♪ {}", pitch);
        Ok(PlayToken(handle.0))
    }

    async fn stop(&self, token: PlayToken) -> Result<(), AudioError> {
        match self.lookup(NoteHandle(token.0)) {
            Some(pitch) => {
                log::debug!("Stopped {}", pitch);
                Ok(())
            }
            None => Err(AudioError::Stop {
                note: format!("{:?}", token),
                reason: "no such playback".to_string(),
            }),
        }
    }

    async fn release(&self, handle: NoteHandle) -> Result<(), AudioError> {
        match self.notes.lock().remove(&handle) {
            Some(pitch) => {
                log::debug!("Released {:?} ({})", handle, pitch);
                Ok(())
            }
            None => Err(AudioError::Release {
                note: format!("{:?}", handle),
                reason: "handle not acquired or already released".to_string(),
            }),
        }
    }
}
