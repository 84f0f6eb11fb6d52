//! Scriptable in-memory backend for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aural_catalog::Pitch;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::backend::{AudioBackend, NoteHandle, PlayToken};
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Acquire,
    Prepare,
    Play,
    Stop,
    Release,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub pitch: &'static str,
    pub handle: Option<NoteHandle>,
    pub at: Instant,
}

#[derive(Debug)]
struct HandleInfo {
    pitch: Pitch,
    playing: bool,
    released: bool,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    handles: HashMap<NoteHandle, HandleInfo>,
    calls: Vec<Call>,
    latencies: HashMap<&'static str, Duration>,
    play_latencies: HashMap<&'static str, Duration>,
    // Play calls, stamped when they resolve rather than when issued.
    resolved_plays: Vec<Call>,
    failures: HashSet<(CallKind, &'static str)>,
    double_releases: usize,
}

pub struct MockBackend {
    state: Mutex<MockState>,
    default_latency: Duration,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_prepare_latency(Duration::ZERO)
    }

    pub fn with_prepare_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            default_latency: latency,
        })
    }

    pub fn set_latency(&self, pitch: &'static str, latency: Duration) {
        self.state.lock().latencies.insert(pitch, latency);
    }

    /// Delay between a `play` call for `pitch` and its result.
    pub fn set_play_latency(&self, pitch: &'static str, latency: Duration) {
        self.state.lock().play_latencies.insert(pitch, latency);
    }

    pub fn fail_on(&self, kind: CallKind, pitch: &'static str) {
        self.state.lock().failures.insert((kind, pitch));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.state.lock().calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Pitches passed to `play`, in call order.
    pub fn played(&self) -> Vec<&'static str> {
        self.calls_of(CallKind::Play)
            .iter()
            .map(|c| c.pitch)
            .collect()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    /// Successful plays, timed at the moment `play` returned.
    pub fn resolved_plays(&self) -> Vec<Call> {
        self.state.lock().resolved_plays.clone()
    }

    /// Pitches currently sounding.
    pub fn playing(&self) -> Vec<&'static str> {
        let state = self.state.lock();
        let mut playing: Vec<&'static str> = state
            .handles
            .values()
            .filter(|h| h.playing)
            .map(|h| h.pitch.name())
            .collect();
        playing.sort();
        playing
    }

    /// Handles successfully acquired.
    pub fn acquired(&self) -> usize {
        self.state.lock().handles.len()
    }

    pub fn unreleased(&self) -> usize {
        self.state
            .lock()
            .handles
            .values()
            .filter(|h| !h.released)
            .count()
    }

    pub fn double_releases(&self) -> usize {
        self.state.lock().double_releases
    }

    fn record(
        &self,
        kind: CallKind,
        pitch: &'static str,
        handle: Option<NoteHandle>,
    ) -> Result<(), String> {
        let mut state = self.state.lock();
        state.calls.push(Call {
            kind,
            pitch,
            handle,
            at: Instant::now(),
        });
        if state.failures.contains(&(kind, pitch)) {
            return Err(format!("injected {:?} failure", kind));
        }
        Ok(())
    }

    fn pitch_of(&self, handle: NoteHandle) -> Option<Pitch> {
        self.state.lock().handles.get(&handle).map(|h| h.pitch)
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn acquire(&self, pitch: Pitch) -> Result<NoteHandle, AudioError> {
        self.record(CallKind::Acquire, pitch.name(), None)
            .map_err(|reason| AudioError::Acquire {
                note: pitch.to_string(),
                reason,
            })?;

        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = NoteHandle(state.next_id);
        state.handles.insert(
            handle,
            HandleInfo {
                pitch,
                playing: false,
                released: false,
            },
        );
        Ok(handle)
    }

    async fn prepare(&self, handle: NoteHandle) -> Result<(), AudioError> {
        let pitch = self.pitch_of(handle).ok_or_else(|| AudioError::Prepare {
            note: format!("{:?}", handle),
            reason: "unknown handle".to_string(),
        })?;

        let latency = self
            .state
            .lock()
            .latencies
            .get(pitch.name())
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.record(CallKind::Prepare, pitch.name(), Some(handle))
            .map_err(|reason| AudioError::Prepare {
                note: pitch.to_string(),
                reason,
            })
    }

    async fn play(&self, handle: NoteHandle) -> Result<PlayToken, AudioError> {
        let pitch = self.pitch_of(handle).ok_or_else(|| AudioError::Play {
            note: format!("{:?}", handle),
            reason: "unknown handle".to_string(),
        })?;
        self.record(CallKind::Play, pitch.name(), Some(handle))
            .map_err(|reason| AudioError::Play {
                note: pitch.to_string(),
                reason,
            })?;

        let latency = self.state.lock().play_latencies.get(pitch.name()).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.handles.get_mut(&handle) {
            Some(info) if !info.released => {
                info.playing = true;
                state.resolved_plays.push(Call {
                    kind: CallKind::Play,
                    pitch: pitch.name(),
                    handle: Some(handle),
                    at: Instant::now(),
                });
                Ok(PlayToken(handle.0))
            }
            _ => Err(AudioError::Play {
                note: pitch.to_string(),
                reason: "handle already released".to_string(),
            }),
        }
    }

    async fn stop(&self, token: PlayToken) -> Result<(), AudioError> {
        let handle = NoteHandle(token.0);
        let pitch = self.pitch_of(handle).ok_or_else(|| AudioError::Stop {
            note: format!("{:?}", token),
            reason: "unknown token".to_string(),
        })?;

        // A failed stop still silences the note, as a real device would on teardown.
        if let Some(info) = self.state.lock().handles.get_mut(&handle) {
            info.playing = false;
        }
        self.record(CallKind::Stop, pitch.name(), Some(handle))
            .map_err(|reason| AudioError::Stop {
                note: pitch.to_string(),
                reason,
            })
    }

    async fn release(&self, handle: NoteHandle) -> Result<(), AudioError> {
        let pitch = self.pitch_of(handle).ok_or_else(|| AudioError::Release {
            note: format!("{:?}", handle),
            reason: "unknown handle".to_string(),
        })?;
        let result = self
            .record(CallKind::Release, pitch.name(), Some(handle))
            .map_err(|reason| AudioError::Release {
                note: pitch.to_string(),
                reason,
            });

        let mut state = self.state.lock();
        let already_released = match state.handles.get_mut(&handle) {
            Some(info) => {
                let was = info.released;
                info.released = true;
                info.playing = false;
                was
            }
            None => false,
        };
        if already_released {
            state.double_releases += 1;
            return Err(AudioError::Release {
                note: pitch.to_string(),
                reason: "double release".to_string(),
            });
        }
        result
    }
}
