use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use plaza::client::HttpTransport;
use plaza::core::motion::MotionController;
use plaza::core::scene::Scene;
use plaza::core::session::SessionContext;
use plaza::core::zone::ZoneId;
use plaza::frontend::{spawn_input_thread, TerminalAudio, TerminalFrontend};
use plaza::storage::{ProfileStore, USERNAME_KEY};
use plaza::{Cli, ClientConfig, ClientEngine, Command, EngineHandle};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::try_from(Cli::parse())?;
    init_tracing(&config.log_file)?;
    info!(server = %config.server, "starting plaza client");

    let transport = Arc::new(HttpTransport::new(config.server.clone()).context("building http client")?);
    let profile = ProfileStore::open(&config.profile)?;
    let ctx = SessionContext::new(
        Scene::plaza(),
        MotionController::new(config.step),
        config.expiry,
        &profile.username(USERNAME_KEY),
    );

    let audio = TerminalAudio::new(config.ambient_sound.clone());
    let (engine, handle) = ClientEngine::new(ctx, config.schedule, transport, audio, profile);
    if let Some(path) = config.ambient_sound.clone() {
        load_ambience(path, handle.clone());
    }

    let terminal = ratatui::init();
    crossterm::execute!(io::stdout(), EnableMouseCapture)?;
    let input = spawn_input_thread(handle);

    let mut frontend = TerminalFrontend::new(terminal);
    let result = engine.run(&mut frontend).await;

    let _ = crossterm::execute!(io::stdout(), DisableMouseCapture);
    ratatui::restore();
    if input.join().is_err() {
        warn!("input thread panicked");
    }

    let ctx = result?;
    info!(
        user_id = ctx.user_id().unwrap_or("-"),
        username = ctx.chat().username(),
        "session ended"
    );
    Ok(())
}

fn init_tracing(log_file: &Path) -> Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plaza=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

/// Read the ambience asset in the background; the zone stays silent until
/// it is in memory.
fn load_ambience(path: PathBuf, handle: EngineHandle) {
    tokio::spawn(async move {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                info!(path = %path.display(), bytes = bytes.len(), "ambient sound loaded");
                handle.send(Command::AudioLoaded(ZoneId(0)));
            }
            Err(error) => warn!(path = %path.display(), %error, "ambient sound unavailable"),
        }
    });
}
