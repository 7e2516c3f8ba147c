#![deny(clippy::all)]

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use vaani_voice::audio::CpalMicrophone;
use vaani_voice::config::{load_config, Credentials};
use vaani_voice::overlay::{error_message, OverlayState, RecordingOverlay};
use vaani_voice::pipeline::VoicePipeline;

const HELP: &str = "Enter: start/stop recording   c: cancel   r: retry   q: quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the key may come from the environment
    dotenvy::dotenv().ok();

    // Initialize tracing for structured logging
    tracing_subscriber::fmt::init();

    let config = load_config().context("Failed to load embedded configuration")?;

    let creds = match Credentials::from_env() {
        Ok(creds) => creds,
        Err(e) => {
            warn!(error = %e, "No API key configured");
            println!("{}", error_message(e.kind(), "en"));
            return Ok(());
        }
    };

    let pipeline = VoicePipeline::from_config(&config, &creds, Arc::new(CpalMicrophone::new()))
        .context("Failed to set up voice pipeline")?;
    let mut events = pipeline.recorder().subscribe();
    let mut overlay = RecordingOverlay::new(pipeline);

    info!(
        max_duration_secs = config.recording.max_duration_secs,
        "Vaani voice assistant ready"
    );
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match line.trim() {
                    "" => overlay.tap().await,
                    "c" => overlay.close().await,
                    "r" => overlay.retry(),
                    "q" => {
                        overlay.close().await;
                        break;
                    }
                    _ => {
                        println!("{}", HELP);
                        continue;
                    }
                }
                render(overlay.state());
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if overlay.handle_event(event).await {
                            render(overlay.state());
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Dropped recorder events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

fn render(state: &OverlayState) {
    match state {
        OverlayState::Idle => println!("Ready. Press Enter to speak."),
        OverlayState::Recording {
            elapsed_seconds,
            remaining_seconds,
        } => println!(
            "Recording... {}s ({}s left). Press Enter to stop.",
            elapsed_seconds, remaining_seconds
        ),
        OverlayState::Processing => println!("Processing..."),
        OverlayState::Reply(turn) => {
            println!("You ({}): {}", turn.language, turn.user_text);
            println!("Vaani: {}", turn.assistant_text);
        }
        OverlayState::Failed { message, .. } => {
            println!("{}", message);
            println!("Press r to try again.");
        }
    }
}
