//! musik Headless - drive the playback core from a terminal
use clap::Parser;
use crossbeam_channel::Receiver;
use musik_headless::{Command, HeadlessConfig, Player, Reply};
use musik_playback::PlaybackEvent;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "musik-headless")]
#[command(about = "Drive the musik playback core from stdin", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MUSIK_CONFIG")]
    config: Option<PathBuf>,

    /// Preferences file; the playback context is restored from and saved to it
    #[arg(short, long)]
    prefs: Option<PathBuf>,

    /// Number of synthetic library tracks
    #[arg(short, long)]
    tracks: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only replies and events
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "musik_headless=info,musik_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = HeadlessConfig::load(cli.config.as_deref())?;
    if let Some(tracks) = cli.tracks {
        config.library.tracks = tracks;
    }
    if cli.prefs.is_some() {
        config.preferences_path = cli.prefs;
    }

    let player = Player::start(&config)?;
    let events = player.service.subscribe();
    let printer = tokio::task::spawn_blocking(move || print_events(&events));

    tracing::info!("Ready, type 'help' for commands");
    run(&player).await?;

    // Dropping the service saves the playback context and closes the event stream
    drop(player);
    printer.await?;
    Ok(())
}

async fn run(player: &Player) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = line
            .parse::<Command>()
            .and_then(|command| player.execute(&command));

        match reply {
            Ok(Reply::Done) => {}
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Quit) => break,
            Err(e) => tracing::warn!("{}", e),
        }
    }

    Ok(())
}

fn print_events(events: &Receiver<PlaybackEvent>) {
    for event in events {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("Failed to encode event: {}", e),
        }
    }
}
