mod bridge;
mod session;

use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use smartpanel_core::{Collaborators, PanelSettings, SettingsStore, SmartPanel, Timings};
use smartpanel_protocol::EngineMessage;

use crate::bridge::StdioBridge;

/// Keep the host's bottom panel maximized while no editor is open.
///
/// Speaks line-delimited JSON on stdin/stdout; logs go to stderr
/// (`RUST_LOG=smartpanel=debug` for decision traces).
#[derive(Debug, Parser)]
#[command(name = "smartpanel", version)]
struct Args {
    /// Read and persist settings in this JSON file.
    #[arg(long, value_name = "PATH", conflicts_with = "user_settings")]
    settings: Option<PathBuf>,

    /// Use the per-user settings file in the platform config directory.
    #[arg(long)]
    user_settings: bool,

    /// How long to wait for the host to answer a request.
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    request_timeout_ms: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    LocalSet::new().block_on(&runtime, run(args));
}

fn settings_store(args: &Args) -> SettingsStore {
    if let Some(path) = &args.settings {
        return SettingsStore::open(path);
    }
    if args.user_settings {
        match SettingsStore::open_default() {
            Ok(store) => return store,
            Err(e) => log::warn!("{}; falling back to in-memory settings", e),
        }
    }
    SettingsStore::in_memory(PanelSettings::default())
}

async fn run(args: Args) {
    let settings = Rc::new(settings_store(&args));
    if let Some(path) = settings.path() {
        log::info!("Using settings file {}", path.display());
    }

    let (tx, rx) = mpsc::unbounded_channel::<EngineMessage>();
    let writer = tokio::task::spawn_local(bridge::write_messages(tokio::io::stdout(), rx));

    let bridge = Rc::new(StdioBridge::new(
        tx,
        Duration::from_millis(args.request_timeout_ms),
    ));
    let engine = SmartPanel::new(
        Collaborators {
            host: bridge.clone(),
            observer: bridge.clone(),
            config: settings.clone(),
            notifier: bridge.clone(),
        },
        Timings::default(),
    );

    session::run_session(
        BufReader::new(tokio::io::stdin()),
        engine.clone(),
        bridge.clone(),
        settings,
    )
    .await;

    // Closing the last sender lets the writer flush and finish.
    drop(engine);
    drop(bridge);
    if tokio::time::timeout(Duration::from_secs(1), writer)
        .await
        .is_err()
    {
        log::warn!("Output did not drain before exit");
    }
}
