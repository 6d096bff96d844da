use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::Url;

use crate::core::motion::DEFAULT_STEP;
use crate::core::registry::ProxyExpiry;

/// Terminal client for the plaza: walk around, see who else is there, chat.
#[derive(Debug, Clone, Parser)]
#[command(name = "plaza", version)]
#[command(about = "Shared 3D plaza client for the terminal")]
pub struct Cli {
    /// Base URL of the plaza server
    #[arg(long, env = "PLAZA_SERVER", default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Milliseconds between position pushes
    #[arg(long, default_value_t = 2000)]
    pub push_interval_ms: u64,

    /// Milliseconds between position pulls
    #[arg(long, default_value_t = 2000)]
    pub pull_interval_ms: u64,

    /// Milliseconds between chat polls
    #[arg(long, default_value_t = 2000)]
    pub chat_interval_ms: u64,

    /// Distance covered by one arrow key press
    #[arg(long, default_value_t = DEFAULT_STEP)]
    pub step: f32,

    /// Drop a remote avatar after this many pulls without it (0 keeps it forever)
    #[arg(long, default_value_t = 5)]
    pub expire_after_misses: u32,

    /// Where the username is remembered between runs
    #[arg(long, default_value = "plaza-profile.json")]
    pub profile: PathBuf,

    /// Audio file played inside the relaxation zone
    #[arg(long)]
    pub ambient_sound: Option<PathBuf>,

    /// Log output goes here; the terminal belongs to the UI
    #[arg(long, default_value = "plaza.log")]
    pub log_file: PathBuf,
}

/// How often each background loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSchedule {
    pub push: Duration,
    pub pull: Duration,
    pub chat: Duration,
    pub frame: Duration,
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self {
            push: Duration::from_secs(2),
            pull: Duration::from_secs(2),
            chat: Duration::from_secs(2),
            frame: Duration::from_millis(33),
        }
    }
}

/// Validated client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: Url,
    pub schedule: SyncSchedule,
    pub step: f32,
    pub expiry: ProxyExpiry,
    pub profile: PathBuf,
    pub ambient_sound: Option<PathBuf>,
    pub log_file: PathBuf,
}

impl TryFrom<Cli> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> anyhow::Result<Self> {
        let server = Url::parse(&cli.server)
            .with_context(|| format!("invalid server url {:?}", cli.server))?;
        if !matches!(server.scheme(), "http" | "https") {
            bail!("server url must be http or https, got {}", server.scheme());
        }
        if !(cli.step.is_finite() && cli.step > 0.0) {
            bail!("step must be a positive number, got {}", cli.step);
        }

        let interval = |name: &str, ms: u64| -> anyhow::Result<Duration> {
            if ms == 0 {
                bail!("{name} interval must be greater than zero");
            }
            Ok(Duration::from_millis(ms))
        };
        let schedule = SyncSchedule {
            push: interval("push", cli.push_interval_ms)?,
            pull: interval("pull", cli.pull_interval_ms)?,
            chat: interval("chat", cli.chat_interval_ms)?,
            ..SyncSchedule::default()
        };

        let expiry = match cli.expire_after_misses {
            0 => ProxyExpiry::Never,
            n => ProxyExpiry::AfterMisses(n),
        };

        Ok(Self {
            server,
            schedule,
            step: cli.step,
            expiry,
            profile: cli.profile,
            ambient_sound: cli.ambient_sound,
            log_file: cli.log_file,
        })
    }
}
