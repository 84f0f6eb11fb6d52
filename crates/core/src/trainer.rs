use std::sync::Arc;
use std::time::Duration;

use aural_catalog::{IntervalCatalog, Scale};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::audio::AudioBackend;
use crate::config::{ConfigError, ConfigManager};
use crate::error::ConfigurationError;
use crate::messages::{Settings, TrainerCommand, TrainerEvent};
use crate::quiz::{QuizGenerator, Round, RoundStateMachine, TapAction, UiState};
use crate::sequencer::{PlaybackSequencer, RoundOutcome};

/// Owns the quiz state and drives playback.
///
/// All UI intents arrive as [`TrainerCommand`]s; the trainer answers with
/// [`TrainerEvent`]s. Playback runs in spawned tasks so a new command is never
/// blocked behind a sounding round.
pub struct Trainer<R = StdRng> {
    settings: Settings,
    generator: QuizGenerator<R>,
    machine: RoundStateMachine,
    sequencer: PlaybackSequencer,
    playback_tasks: JoinSet<RoundOutcome>,
    is_running: bool,
}

impl Trainer<StdRng> {
    /// Trainer seeded from `settings.seed`, or from the OS when unset.
    pub fn from_settings(
        settings: Settings,
        backend: Arc<dyn AudioBackend>,
    ) -> Result<Self, anyhow::Error> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(settings, backend, rng)
    }
}

impl<R: Rng> Trainer<R> {
    pub fn new(
        settings: Settings,
        backend: Arc<dyn AudioBackend>,
        rng: R,
    ) -> Result<Self, anyhow::Error> {
        ConfigManager::validate_settings(&settings).map_err(ConfigError::ValidationError)?;

        let catalog = IntervalCatalog::new()
            .subset(&settings.intervals)
            .map_err(ConfigurationError::from)?;
        let generator =
            QuizGenerator::new(catalog, &settings.arpeggiations, Scale::chromatic(), rng)?;

        log::info!(
            "Trainer using {} backend with {} tests",
            backend.name(),
            generator.test_count()
        );

        let sequencer = PlaybackSequencer::new(
            backend,
            Duration::from_millis(settings.inter_note_delay_ms),
        );

        Ok(Self {
            settings,
            generator,
            machine: RoundStateMachine::new(),
            sequencer,
            playback_tasks: JoinSet::new(),
            is_running: false,
        })
    }

    /// Leave Loading. Rounds can be started afterwards.
    pub async fn initialize(&mut self) -> Result<(), anyhow::Error> {
        if self.is_running {
            return Ok(());
        }
        log::info!("Initializing trainer...");

        self.machine.ready();
        self.is_running = true;

        log::info!("Trainer ready");
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ui_state(&self) -> UiState {
        self.machine.ui_state()
    }

    /// Process a command from the UI
    pub async fn process_command(
        &mut self,
        command: TrainerCommand,
        event_tx: &mpsc::UnboundedSender<TrainerEvent>,
    ) -> Result<(), anyhow::Error> {
        use TrainerCommand::*;

        log::debug!("Processing command: {:?}", command);

        match command {
            Tap => match self.machine.tap() {
                TapAction::NewRound => self.start_new_round(event_tx),
                TapAction::Reveal => self.reveal(event_tx),
                TapAction::Ignore => log::debug!("Tap ignored while {}", self.machine.stage()),
            },
            NewRound => self.start_new_round(event_tx),
            Reveal => self.reveal(event_tx),
            Replay => {
                if let Some(round) = self.machine.request_replay().cloned() {
                    log::info!("Replaying round {}", round.version);
                    self.spawn_playback(round);
                } else {
                    log::debug!("Replay not available while {}", self.machine.stage());
                }
            }
            Shutdown => {
                log::info!("Processing Shutdown command");
                self.shutdown().await?;
                let _ = event_tx.send(TrainerEvent::ShutdownComplete);
            }
        }

        Ok(())
    }

    fn start_new_round(&mut self, event_tx: &mpsc::UnboundedSender<TrainerEvent>) {
        if !self.machine.can_start_round() {
            log::debug!("Cannot start a round while {}", self.machine.stage());
            return;
        }

        let round = self.generator.next_round(self.machine.current_version());
        let version = round.version;
        self.machine.begin_round(round.clone());

        let _ = event_tx.send(TrainerEvent::RoundStarted { version });
        let _ = event_tx.send(TrainerEvent::StateChanged(self.machine.ui_state()));

        self.spawn_playback(round);
    }

    fn reveal(&mut self, event_tx: &mpsc::UnboundedSender<TrainerEvent>) {
        if self.machine.request_reveal() {
            let _ = event_tx.send(TrainerEvent::StateChanged(self.machine.ui_state()));
        } else {
            log::debug!("Reveal not available yet");
        }
    }

    fn spawn_playback(&mut self, round: Round) {
        let sequencer = self.sequencer.clone();
        self.playback_tasks
            .spawn(async move { sequencer.play_round(&round).await });
    }

    fn handle_playback_finished(
        &mut self,
        outcome: RoundOutcome,
        event_tx: &mpsc::UnboundedSender<TrainerEvent>,
    ) {
        log::debug!(
            "Playback {} of round {} finished, {} notes played",
            outcome.playback,
            outcome.round_version,
            outcome.played()
        );

        let version = outcome.round_version;
        let _ = event_tx.send(TrainerEvent::PlaybackFinished { outcome });

        if self.machine.playback_complete(version) {
            let _ = event_tx.send(TrainerEvent::StateChanged(self.machine.ui_state()));
        }
    }

    /// Shutdown the trainer. Every note is released before this returns.
    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if !self.is_running {
            return Ok(());
        }
        log::info!("Shutting down trainer...");

        self.sequencer.shutdown().await;

        while let Some(result) = self.playback_tasks.join_next().await {
            if let Err(e) = result {
                log::error!("Playback task failed: {}", e);
            }
        }

        self.is_running = false;
        log::info!("Trainer shutdown complete");
        Ok(())
    }

    /// Run the trainer with channel-based communication
    pub async fn run_with_channels(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<TrainerCommand>,
        event_tx: mpsc::UnboundedSender<TrainerEvent>,
    ) -> Result<(), anyhow::Error> {
        log::info!("Trainer run_with_channels starting...");

        self.initialize().await?;
        let _ = event_tx.send(TrainerEvent::Initialized);
        let _ = event_tx.send(TrainerEvent::StateChanged(self.machine.ui_state()));

        loop {
            tokio::select! {
                // Process commands from UI
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        log::info!("Command channel closed");
                        self.shutdown().await?;
                        let _ = event_tx.send(TrainerEvent::ShutdownComplete);
                        break;
                    };

                    if let TrainerCommand::Shutdown = command {
                        log::info!("Received shutdown command");
                        self.shutdown().await?;
                        let _ = event_tx.send(TrainerEvent::ShutdownComplete);
                        break;
                    }

                    if let Err(e) = self.process_command(command, &event_tx).await {
                        log::error!("Command processing error: {}", e);
                        let _ = event_tx.send(TrainerEvent::Error {
                            message: format!("Command processing error: {}", e)
                        });
                    }
                }

                // Collect finished playbacks
                Some(result) = self.playback_tasks.join_next(), if !self.playback_tasks.is_empty() => {
                    match result {
                        Ok(outcome) => self.handle_playback_finished(outcome, &event_tx),
                        Err(e) => {
                            log::error!("Playback task failed: {}", e);
                            let _ = event_tx.send(TrainerEvent::Error {
                                message: format!("Playback task failed: {}", e)
                            });
                        }
                    }
                }
            }
        }

        log::info!("Trainer run_with_channels completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aural_catalog::Arpeggiation;

    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::quiz::Stage;

    fn settings() -> Settings {
        Settings {
            seed: Some(7),
            ..Settings::default()
        }
    }

    fn start(
        mock: &Arc<MockBackend>,
        settings: Settings,
    ) -> (
        mpsc::UnboundedSender<TrainerCommand>,
        mpsc::UnboundedReceiver<TrainerEvent>,
        tokio::task::JoinHandle<Result<(), anyhow::Error>>,
    ) {
        let trainer = Trainer::from_settings(settings, mock.clone()).unwrap();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(trainer.run_with_channels(command_rx, event_tx));
        (command_tx, event_rx, handle)
    }

    async fn next_state(events: &mut mpsc::UnboundedReceiver<TrainerEvent>) -> UiState {
        loop {
            match events.recv().await {
                Some(TrainerEvent::StateChanged(state)) => return state,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
    }

    async fn next_outcome(events: &mut mpsc::UnboundedReceiver<TrainerEvent>) -> RoundOutcome {
        loop {
            match events.recv().await {
                Some(TrainerEvent::PlaybackFinished { outcome }) => return outcome,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mock = MockBackend::new();

        let mut bad = settings();
        bad.intervals = vec!["3M".to_string(), "11P".to_string()];
        assert!(Trainer::from_settings(bad, mock.clone()).is_err());

        let mut bad = settings();
        bad.inter_note_delay_ms = 0;
        assert!(Trainer::from_settings(bad, mock.clone()).is_err());

        let mut bad = settings();
        bad.arpeggiations.clear();
        assert!(Trainer::from_settings(bad, mock).is_err());
    }

    #[test]
    fn test_settings_are_kept() {
        let mut narrow = settings();
        narrow.intervals = vec!["4P".to_string(), "5P".to_string()];
        narrow.inter_note_delay_ms = 600;

        let trainer = Trainer::from_settings(narrow.clone(), MockBackend::new()).unwrap();
        assert_eq!(trainer.settings(), &narrow);
        assert_eq!(trainer.ui_state().stage, Stage::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_ignored_while_loading() {
        let mock = MockBackend::new();
        let mut trainer = Trainer::from_settings(settings(), mock.clone()).unwrap();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        trainer
            .process_command(TrainerCommand::NewRound, &event_tx)
            .await
            .unwrap();
        assert_eq!(trainer.ui_state().stage, Stage::Loading);
        assert!(event_rx.try_recv().is_err());
        assert_eq!(mock.acquired(), 0);

        trainer.initialize().await.unwrap();
        assert_eq!(trainer.ui_state().stage, Stage::Splash);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_round_flow() {
        let mock = MockBackend::with_prepare_latency(Duration::from_millis(50));
        let (commands, mut events, handle) = start(&mock, settings());

        let splash = next_state(&mut events).await;
        assert_eq!(splash.stage, Stage::Splash);

        commands.send(TrainerCommand::Tap).unwrap();
        let guess = next_state(&mut events).await;
        assert_eq!(guess.stage, Stage::Guess);
        assert!(!guess.reveal_enabled);
        assert_eq!(guess.displayed_interval_name, None);

        // Reveal is refused until both notes have sounded.
        commands.send(TrainerCommand::Reveal).unwrap();

        let outcome = next_outcome(&mut events).await;
        assert_eq!(outcome.round_version, 1);
        assert_eq!(outcome.played(), 2);

        let ready = next_state(&mut events).await;
        assert_eq!(ready.stage, Stage::Guess);
        assert!(ready.reveal_enabled);

        commands.send(TrainerCommand::Tap).unwrap();
        let revealed = next_state(&mut events).await;
        assert_eq!(revealed.stage, Stage::Reveal);
        assert!(revealed.displayed_interval_name.is_some());

        commands.send(TrainerCommand::Shutdown).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(mock.played().len(), 2);
        assert_eq!(mock.unreleased(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_new_rounds_play_only_the_latest() {
        let mock = MockBackend::with_prepare_latency(Duration::from_millis(50));
        let (commands, mut events, handle) = start(&mock, settings());

        for _ in 0..5 {
            commands.send(TrainerCommand::NewRound).unwrap();
        }

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(next_outcome(&mut events).await);
        }

        let latest = outcomes
            .iter()
            .max_by_key(|outcome| outcome.playback)
            .unwrap();
        assert_eq!(latest.round_version, 5);
        assert_eq!(latest.played(), 2);
        for outcome in outcomes.iter().filter(|o| o.playback != latest.playback) {
            assert_eq!(outcome.played(), 0);
        }

        let played = mock.played();
        assert_eq!(played.len(), 2);
        assert_eq!(played[0], latest.notes[0].0.name());
        assert_eq!(played[1], latest.notes[1].0.name());

        commands.send(TrainerCommand::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(mock.acquired(), 10);
        assert_eq!(mock.unreleased(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_keeps_stage() {
        let mock = MockBackend::new();
        let mut only_up = settings();
        only_up.arpeggiations = vec![Arpeggiation::Up];
        let (commands, mut events, handle) = start(&mock, only_up);

        next_state(&mut events).await;
        commands.send(TrainerCommand::Replay).unwrap();
        commands.send(TrainerCommand::NewRound).unwrap();
        next_state(&mut events).await;
        next_outcome(&mut events).await;
        let ready = next_state(&mut events).await;
        assert!(ready.reveal_enabled);

        commands.send(TrainerCommand::Replay).unwrap();
        let replayed = next_outcome(&mut events).await;
        assert_eq!(replayed.round_version, 1);
        assert_eq!(replayed.played(), 2);

        let played = mock.played();
        assert_eq!(played.len(), 4);
        assert_eq!(played[0..2], played[2..4]);

        commands.send(TrainerCommand::Shutdown).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(mock.unreleased(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_playback_releases_everything() {
        let mock = MockBackend::new();
        let (commands, mut events, handle) = start(&mock, settings());

        commands.send(TrainerCommand::NewRound).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        commands.send(TrainerCommand::Shutdown).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(mock.played().len(), 1);
        assert_eq!(mock.unreleased(), 0);
        assert!(mock.playing().is_empty());

        let mut saw_shutdown = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TrainerEvent::ShutdownComplete) {
                saw_shutdown = true;
            }
        }
        assert!(saw_shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_command_channel_shuts_down() {
        let mock = MockBackend::new();
        let (commands, _events, handle) = start(&mock, settings());

        commands.send(TrainerCommand::NewRound).unwrap();
        drop(commands);
        handle.await.unwrap().unwrap();
        assert_eq!(mock.unreleased(), 0);
    }
}
