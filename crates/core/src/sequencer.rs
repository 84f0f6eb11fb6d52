//! Two-note playback with supersession.
//!
//! Every call to [`PlaybackSequencer::play_round`] is stamped with a playback id.
//! Only the most recent stamp may make a note audible: each point where an
//! awaited backend result would produce sound re-checks the stamp first, and a
//! note that loses the check is released unplayed. Notes that did start are
//! kept in an arena keyed by playback id until the next stamp drains it.
//!
//! The shared state sits behind a short-held mutex that is never held across an
//! `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aural_catalog::Pitch;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::audio::{AudioBackend, NoteResource};
use crate::error::AudioError;
use crate::quiz::{Round, RoundVersion};

pub const DEFAULT_INTER_NOTE_DELAY: Duration = Duration::from_millis(1000);

/// Stamp issued to each `play_round` call.
pub type PlaybackId = u64;

/// What happened to one note of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteOutcome {
    Played,
    /// A newer playback started first; the note was released unplayed
    /// (or stopped immediately if it was already starting).
    Superseded,
    Failed(AudioError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub round_version: RoundVersion,
    pub playback: PlaybackId,
    /// In playback order.
    pub notes: [(Pitch, NoteOutcome); 2],
}

impl RoundOutcome {
    pub fn was_superseded(&self) -> bool {
        self.notes
            .iter()
            .any(|(_, outcome)| *outcome == NoteOutcome::Superseded)
    }

    pub fn played(&self) -> usize {
        self.notes
            .iter()
            .filter(|(_, outcome)| *outcome == NoteOutcome::Played)
            .count()
    }
}

struct SequencerState {
    current: PlaybackId,
    active: BTreeMap<PlaybackId, Vec<NoteResource>>,
    shut_down: bool,
}

impl SequencerState {
    fn is_current(&self, playback: PlaybackId) -> bool {
        !self.shut_down && self.current == playback
    }

    fn drain_active(&mut self) -> Vec<NoteResource> {
        std::mem::take(&mut self.active)
            .into_values()
            .flatten()
            .collect()
    }
}

struct Inner {
    backend: Arc<dyn AudioBackend>,
    inter_note_delay: Duration,
    state: Mutex<SequencerState>,
    /// Publishes each new stamp so sleepers can wake early.
    generation: watch::Sender<PlaybackId>,
}

/// Cheap to clone; clones share one timeline.
#[derive(Clone)]
pub struct PlaybackSequencer {
    inner: Arc<Inner>,
}

impl PlaybackSequencer {
    pub fn new(backend: Arc<dyn AudioBackend>, inter_note_delay: Duration) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                backend,
                inter_note_delay,
                state: Mutex::new(SequencerState {
                    current: 0,
                    active: BTreeMap::new(),
                    shut_down: false,
                }),
                generation,
            }),
        }
    }

    /// Latest stamp handed out.
    pub fn current_playback(&self) -> PlaybackId {
        self.inner.state.lock().current
    }

    /// Pitches of notes that started and have not been torn down yet.
    pub fn active_pitches(&self) -> Vec<Pitch> {
        self.inner
            .state
            .lock()
            .active
            .values()
            .flatten()
            .map(|note| note.pitch())
            .collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().shut_down
    }

    fn is_current(&self, playback: PlaybackId) -> bool {
        self.inner.state.lock().is_current(playback)
    }

    /// Play `round`, superseding whatever was playing before.
    ///
    /// Resolves once the second note's guarded play step has resolved, whether
    /// the notes actually sounded or not. Backend failures are logged and
    /// reported in the outcome, never returned as errors.
    pub async fn play_round(&self, round: &Round) -> RoundOutcome {
        let [first, second] = round.playback_order();

        let stamp = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                None
            } else {
                state.current += 1;
                let playback = state.current;
                self.inner.generation.send_replace(playback);
                // Subscribed after our own stamp, so only newer stamps wake us.
                let generation = self.inner.generation.subscribe();
                Some((playback, generation, state.drain_active()))
            }
        };

        let Some((playback, mut generation, stale)) = stamp else {
            log::warn!("Sequencer is shut down; round {} not played", round.version);
            return RoundOutcome {
                round_version: round.version,
                playback: 0,
                notes: [
                    (first, NoteOutcome::Superseded),
                    (second, NoteOutcome::Superseded),
                ],
            };
        };

        log::info!(
            "Playback {}: round {} {} from {}",
            playback,
            round.version,
            round.test_name(),
            round.root
        );

        // Old notes are torn down while the new ones load; nothing new plays
        // until both have finished.
        let backend = &self.inner.backend;
        let (first_note, second_note, ()) = tokio::join!(
            NoteResource::load(Arc::clone(backend), first),
            NoteResource::load(Arc::clone(backend), second),
            release_all(stale),
        );

        let first_outcome = self.guarded_play(playback, first, first_note).await;

        if self.is_current(playback) {
            tokio::select! {
                _ = tokio::time::sleep(self.inner.inter_note_delay) => {}
                _ = generation.changed() => {
                    log::debug!("Playback {} superseded during inter-note delay", playback);
                }
            }
        }

        let second_outcome = self.guarded_play(playback, second, second_note).await;

        RoundOutcome {
            round_version: round.version,
            playback,
            notes: [(first, first_outcome), (second, second_outcome)],
        }
    }

    async fn guarded_play(
        &self,
        playback: PlaybackId,
        pitch: Pitch,
        loaded: Result<NoteResource, AudioError>,
    ) -> NoteOutcome {
        let mut note = match loaded {
            Ok(note) => note,
            Err(e) => {
                log::warn!("Playback {}: skipping {}: {}", playback, pitch, e);
                return NoteOutcome::Failed(e);
            }
        };

        if !self.is_current(playback) {
            log::debug!("Playback {}: {} is stale, releasing unplayed", playback, pitch);
            discard(note).await;
            return NoteOutcome::Superseded;
        }

        if let Err(e) = note.play().await {
            log::warn!("Playback {}: {}", playback, e);
            discard(note).await;
            return NoteOutcome::Failed(e);
        }

        // `play` suspended; a newer round may have drained the arena meanwhile.
        let orphan = {
            let mut state = self.inner.state.lock();
            if state.is_current(playback) {
                state.active.entry(playback).or_default().push(note);
                None
            } else {
                Some(note)
            }
        };

        match orphan {
            None => NoteOutcome::Played,
            Some(note) => {
                log::debug!(
                    "Playback {}: {} superseded while starting, stopping",
                    playback,
                    pitch
                );
                discard(note).await;
                NoteOutcome::Superseded
            }
        }
    }

    /// Stop and release every active note and refuse further playback.
    ///
    /// Playbacks still in flight become stale and release their own notes.
    pub async fn shutdown(&self) {
        let notes = {
            let mut state = self.inner.state.lock();
            state.shut_down = true;
            state.current += 1;
            self.inner.generation.send_replace(state.current);
            state.drain_active()
        };

        log::info!("Sequencer shutting down, releasing {} active notes", notes.len());
        release_all(notes).await;
    }
}

async fn discard(note: NoteResource) {
    if let Err(e) = note.release().await {
        log::warn!("{}", e);
    }
}

/// Stop and release `notes` concurrently, waiting for all of them.
async fn release_all(notes: Vec<NoteResource>) {
    if notes.is_empty() {
        return;
    }

    let mut releases = JoinSet::new();
    for note in notes {
        releases.spawn(async move {
            let pitch = note.pitch();
            (pitch, note.release().await)
        });
    }

    while let Some(result) = releases.join_next().await {
        match result {
            Ok((_, Ok(()))) => {}
            Ok((pitch, Err(e))) => log::warn!("Teardown of {} failed: {}", pitch, e),
            Err(e) => log::error!("Teardown task failed: {}", e),
        }
    }
}
