use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aural_catalog::Arpeggiation;
use aural_core::{
    AudioBackend, ConfigManager, LoggingBackend, Settings, Stage, Trainer, TrainerCommand,
    TrainerEvent, UiState,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Ear trainer that plays two notes and asks for the interval between them.
#[derive(Parser, Debug)]
#[command(name = "aural")]
#[command(about = "Aural interval trainer")]
struct Args {
    /// Config file (default: ~/.aural/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause between the two notes in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Comma separated interval codes to quiz, e.g. 3m,3M,5P
    #[arg(long, value_delimiter = ',')]
    intervals: Option<Vec<String>>,

    /// Only play intervals in one direction
    #[arg(long, value_parser = parse_arpeggiation)]
    direction: Option<Arpeggiation>,

    /// Seed for a reproducible sequence of rounds
    #[arg(long)]
    seed: Option<u64>,

    /// Log notes instead of playing them, even when built with audio support
    #[arg(long, default_value = "false")]
    silent: bool,

    /// Write the effective settings back to the config file
    #[arg(long, default_value = "false")]
    save: bool,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_arpeggiation(s: &str) -> Result<Arpeggiation, String> {
    match s {
        "up" => Ok(Arpeggiation::Up),
        "down" => Ok(Arpeggiation::Down),
        other => Err(format!("Invalid direction {}, expected up or down", other)),
    }
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(delay_ms) = args.delay_ms {
        settings.inter_note_delay_ms = delay_ms;
    }
    if let Some(intervals) = &args.intervals {
        settings.intervals = intervals.clone();
    }
    if let Some(direction) = args.direction {
        settings.arpeggiations = vec![direction];
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
}

#[cfg(feature = "audio")]
fn backend(settings: &Settings, silent: bool) -> Result<Arc<dyn AudioBackend>, anyhow::Error> {
    if silent {
        return Ok(logging_backend(settings));
    }
    let backend = aural_core::RodioBackend::new(aural_core::RodioSettings::from(settings))?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "audio"))]
fn backend(settings: &Settings, _silent: bool) -> Result<Arc<dyn AudioBackend>, anyhow::Error> {
    Ok(logging_backend(settings))
}

fn logging_backend(settings: &Settings) -> Arc<dyn AudioBackend> {
    Arc::new(LoggingBackend::new(Duration::from_millis(
        settings.prepare_latency_ms,
    )))
}

fn parse_command(line: &str) -> Option<TrainerCommand> {
    match line.trim() {
        "" | "t" | "tap" => Some(TrainerCommand::Tap),
        "n" | "new" => Some(TrainerCommand::NewRound),
        "s" | "show" => Some(TrainerCommand::Reveal),
        "r" | "replay" => Some(TrainerCommand::Replay),
        "q" | "quit" => Some(TrainerCommand::Shutdown),
        _ => None,
    }
}

fn render(state: &UiState) {
    match state.stage {
        Stage::Loading => println!("Loading..."),
        Stage::Splash => println!("Press Enter to hear your first interval."),
        Stage::Guess if state.reveal_enabled => {
            println!("What was that? Enter to reveal, r to replay.")
        }
        Stage::Guess => println!("Listen..."),
        Stage::Reveal => println!(
            "{}. Enter for the next one, r to replay.",
            state.displayed_interval_name.as_deref().unwrap_or("?")
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .init();

    let mut config = ConfigManager::new(args.config.clone());
    let mut settings = config.load()?;
    apply_overrides(&mut settings, &args);

    if args.save {
        config.update_settings(settings.clone())?;
        log::info!("Saved settings to {}", config.config_path().display());
    }

    let backend = backend(&settings, args.silent)?;
    let trainer = Trainer::from_settings(settings, backend)?;
    log::info!(
        "Quizzing {} with a {} ms gap",
        trainer.settings().intervals.join(", "),
        trainer.settings().inter_note_delay_ms
    );

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let trainer_handle = tokio::spawn(trainer.run_with_channels(command_rx, event_tx));

    // Keyboard input
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(command) => {
                        if command_tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => println!("Keys: Enter=tap n=new s=show r=replay q=quit"),
                },
                Ok(None) => {
                    let _ = command_tx.send(TrainerCommand::Shutdown);
                    break;
                }
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    let _ = command_tx.send(TrainerCommand::Shutdown);
                    break;
                }
            }
        }
    });

    while let Some(event) = event_rx.recv().await {
        match event {
            TrainerEvent::StateChanged(state) => render(&state),
            TrainerEvent::Error { message } => eprintln!("Error: {}", message),
            TrainerEvent::ShutdownComplete => break,
            TrainerEvent::Initialized
            | TrainerEvent::RoundStarted { .. }
            | TrainerEvent::PlaybackFinished { .. } => {}
        }
    }

    trainer_handle.await??;
    Ok(())
}
