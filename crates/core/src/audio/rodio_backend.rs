//! Synthesized playback through the default output device.
//!
//! Each note gets its own paused [`Sink`] holding a sine tone. Stopping fades
//! the sink out before clearing it so a cut-off note does not click.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;
use aural_catalog::Pitch;
use parking_lot::Mutex;
use rodio::mixer::Mixer;
use rodio::source::SineWave;
use rodio::{OutputStreamBuilder, Sink, Source};

use super::backend::{AudioBackend, NoteHandle, PlayToken};
use super::fade::{fade_out_volumes, FADE_STEP};
use crate::error::AudioError;
use crate::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RodioSettings {
    pub note_duration: Duration,
    pub stop_fade: Duration,
    pub volume: f32,
}

impl From<&Settings> for RodioSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            note_duration: Duration::from_millis(settings.note_duration_ms),
            stop_fade: Duration::from_millis(settings.stop_fade_ms),
            volume: settings.volume.clamp(0.0, 1.0),
        }
    }
}

struct RodioNote {
    pitch: Pitch,
    sink: Option<Arc<Sink>>,
}

pub struct RodioBackend {
    settings: RodioSettings,
    mixer: Mixer,
    next_id: AtomicU64,
    notes: Mutex<HashMap<NoteHandle, RodioNote>>,
    // Dropping this ends the thread that owns the output stream.
    _close: mpsc::Sender<()>,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new(settings: RodioSettings) -> Result<Self, anyhow::Error> {
        let (mixer_tx, mixer_rx) = mpsc::channel();
        let (close_tx, close_rx) = mpsc::channel::<()>();

        // The output stream is not Send on every platform, so it lives on its own thread.
        std::thread::Builder::new()
            .name("aural-audio".to_string())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    stream.log_on_drop(false);
                    let _ = mixer_tx.send(Ok(stream.mixer().clone()));
                    let _ = close_rx.recv();
                }
                Err(e) => {
                    let _ = mixer_tx.send(Err(e.to_string()));
                }
            })?;

        let mixer = mixer_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("Audio thread exited before opening a stream"))?
            .map_err(|e| anyhow::anyhow!("Failed to open audio output stream: {}", e))?;

        log::info!("Opened default audio output");

        Ok(Self {
            settings,
            mixer,
            next_id: AtomicU64::new(1),
            notes: Mutex::new(HashMap::new()),
            _close: close_tx,
        })
    }

    fn sink(&self, handle: NoteHandle) -> Option<(Pitch, Option<Arc<Sink>>)> {
        self.notes
            .lock()
            .get(&handle)
            .map(|note| (note.pitch, note.sink.clone()))
    }

    async fn fade_out(&self, sink: &Sink) {
        for volume in fade_out_volumes(sink.volume(), self.settings.stop_fade) {
            sink.set_volume(volume);
            tokio::time::sleep(FADE_STEP).await;
        }
        sink.stop();
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    fn name(&self) -> &str {
        "rodio"
    }

    async fn acquire(&self, pitch: Pitch) -> Result<NoteHandle, AudioError> {
        let handle = NoteHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.notes.lock().insert(handle, RodioNote { pitch, sink: None });
        Ok(handle)
    }

    async fn prepare(&self, handle: NoteHandle) -> Result<(), AudioError> {
        let (pitch, _) = self.sink(handle).ok_or_else(|| AudioError::Prepare {
            note: format!("{:?}", handle),
            reason: "unknown handle".to_string(),
        })?;

        let sink = Sink::connect_new(&self.mixer);
        sink.pause();
        sink.set_volume(self.settings.volume);
        sink.append(
            SineWave::new(pitch.frequency())
                .take_duration(self.settings.note_duration)
                .fade_in(Duration::from_millis(5))
                .amplify(0.5),
        );

        match self.notes.lock().get_mut(&handle) {
            Some(note) => {
                note.sink = Some(Arc::new(sink));
                Ok(())
            }
            None => Err(AudioError::Prepare {
                note: pitch.to_string(),
                reason: "released while preparing".to_string(),
            }),
        }
    }

    async fn play(&self, handle: NoteHandle) -> Result<PlayToken, AudioError> {
        match self.sink(handle) {
            Some((_, Some(sink))) => {
                sink.play();
                Ok(PlayToken(handle.0))
            }
            Some((pitch, None)) => Err(AudioError::Play {
                note: pitch.to_string(),
                reason: "not prepared".to_string(),
            }),
            None => Err(AudioError::Play {
                note: format!("{:?}", handle),
                reason: "unknown handle".to_string(),
            }),
        }
    }

    async fn stop(&self, token: PlayToken) -> Result<(), AudioError> {
        match self.sink(NoteHandle(token.0)) {
            Some((_, Some(sink))) => {
                self.fade_out(&sink).await;
                Ok(())
            }
            Some((_, None)) => Ok(()),
            None => Err(AudioError::Stop {
                note: format!("{:?}", token),
                reason: "unknown token".to_string(),
            }),
        }
    }

    async fn release(&self, handle: NoteHandle) -> Result<(), AudioError> {
        let note = self.notes.lock().remove(&handle);
        match note {
            Some(RodioNote { sink, .. }) => {
                if let Some(sink) = sink {
                    sink.stop();
                }
                Ok(())
            }
            None => Err(AudioError::Release {
                note: format!("{:?}", handle),
                reason: "unknown handle".to_string(),
            }),
        }
    }
}
