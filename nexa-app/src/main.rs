//! Nexa console entry point.
//!
//! ## Runtime note
//!
//! The command loop runs on the main thread because network lookups use the
//! blocking reqwest client. A separate Tokio runtime exists only to drive
//! scheduled alarms; it never runs the loop itself.

mod console;
mod settings;
mod storage;
mod system;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use nexa_core::{Collaborators, HttpLookup, LoopExit, Scheduler, Session};
use settings::{default_settings_path, load_settings, save_settings};
use storage::ProfileDb;
use system::SystemActions;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "nexa", version, about = "Voice-command assistant (console host)")]
struct Cli {
    /// Settings file; defaults to the per-user data directory.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the configured user id.
    #[arg(long)]
    user: Option<String>,

    /// Seed for training and random picks.
    #[arg(long)]
    seed: Option<u64>,

    /// Also print every resolution as a JSON line.
    #[arg(long)]
    json: bool,

    /// Skip weather, news, joke, quote, stock and recipe lookups.
    #[arg(long)]
    offline: bool,

    /// Write the effective settings file and exit.
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nexa=info,nexa_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);

    if cli.init {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("writing {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings written");
        return Ok(());
    }

    settings.apply_env_overrides();
    if let Some(user) = cli.user.as_deref() {
        settings.user_id = user.to_string();
        settings.normalize();
    }

    let base = settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    info!(user = %settings.user_id, data = %base.display(), "Nexa starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("building scheduler runtime")?;

    let lookup = if cli.offline {
        None
    } else {
        let timeout = Duration::from_secs(settings.lookup_timeout_secs);
        match HttpLookup::new(settings.lookup_endpoints(), timeout) {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                warn!(error = %e, "network lookups disabled");
                None
            }
        }
    };

    let profile_db = ProfileDb::new(settings.profile_db_path(&base))
        .map_err(|e| anyhow!(e))
        .context("opening profile database")?;
    let profiles = profile_db
        .load()
        .map_err(|e| anyhow!(e))
        .context("loading profiles")?;
    info!(
        users = profiles.user_count(),
        entries = profiles.entry_count(),
        "profiles loaded"
    );

    let collaborators = Collaborators {
        actions: Arc::new(SystemActions::new(lookup)),
        sink: Arc::new(console::ConsoleSink::new(settings.tts_command.clone())),
        scheduler: Some(Scheduler::new(runtime.handle().clone())),
        profiles: Some(profiles),
    };
    let mut session = Session::open(settings.session_config(&base, cli.seed), collaborators)
        .context("opening session")?;

    let stdin = std::io::stdin();
    let interactive = std::io::IsTerminal::is_terminal(&stdin);
    let mut source = console::ConsoleSource::new(stdin.lock(), interactive);
    let user_id = settings.user_id.clone();
    let json = cli.json;

    let exit = session.run(&user_id, &mut source, |resolution| {
        if let Err(e) = profile_db.append(&user_id, &resolution.command, &resolution.response) {
            warn!(error = %e, "profile write failed");
        }
        if json {
            match serde_json::to_string(resolution) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "resolution not serializable"),
            }
        }
    });

    let stats = session.shutdown();
    runtime.shutdown_timeout(Duration::from_secs(1));

    match exit.context("command loop failed")? {
        LoopExit::Quit => info!(commands = stats.commands, "user quit"),
        LoopExit::EndOfInput => info!(commands = stats.commands, "input closed"),
    }
    if json {
        println!("{}", serde_json::to_string(&stats)?);
    }
    Ok(())
}
