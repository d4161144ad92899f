// Blitz remote console entry point.
//
// Startup sequence:
// 1. Parse arguments and load config
// 2. Initialize tracing (log to file, stdout belongs to the console)
// 3. Create mpsc channels
// 4. Spawn the engine loop and the update printer
// 5. Connect to the startup host, if any
// 6. Read console input until `quit` or end of input
// 7. Cleanup on exit

mod console;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use blitz_core::config::{self, LoggingConfig};
use blitz_core::connection::WsTransport;
use blitz_core::dispatch::QuickAction;
use blitz_core::engine::{self, Engine};
use blitz_core::protocol::{UiUpdate, UserIntent};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::input::Input;

#[derive(Parser, Debug)]
#[command(name = "blitz-remote", about = "Console remote control for a Blitz host")]
struct Args {
    /// Path to configuration file (default: the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to connect to at startup; overrides `connection.default_host`
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse arguments and load config
    let args = Args::parse();
    let config =
        config::load_config(args.config.as_deref()).context("failed to load configuration")?;

    // 2. Initialize tracing
    let log_path = init_tracing(&config.logging)?;
    info!("Blitz remote starting up");
    info!(
        "Config loaded: history={}, {} quick actions",
        config.output.history,
        config.quick_actions.len()
    );

    // 3. Create mpsc channels
    let (events_tx, events_rx) = mpsc::channel(256);
    let (intents_tx, intents_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 4. Spawn the engine loop and the update printer
    let engine = Engine::new(Arc::new(WsTransport), events_tx, config.output.history);
    let engine_handle = tokio::spawn(async move {
        if let Err(e) = engine::run(events_rx, intents_rx, ui_tx, engine).await {
            error!("Engine loop error: {}", e);
        }
    });
    let printer_handle = tokio::spawn(print_updates(ui_rx));

    println!("blitz-remote: type `help` for commands (log: {})", log_path.display());

    // 5. Connect to the startup host, if any
    if let Some(host) = args.host.or(config.connection.default_host.clone()) {
        intents_tx
            .send(UserIntent::Connect(host))
            .await
            .context("engine stopped before startup connect")?;
    }

    // 6. Read console input
    if let Err(e) = read_console(&intents_tx, &config.quick_actions).await {
        error!("Console input error: {}", e);
    }

    // 7. Cleanup: closing the intent channel stops the engine loop, which in
    // turn closes the update channel and ends the printer.
    drop(intents_tx);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = engine_handle.await;
        let _ = printer_handle.await;
    })
    .await;

    info!("Blitz remote shut down cleanly");
    Ok(())
}

/// Forward console lines to the engine until `quit` or end of input.
async fn read_console(
    intents: &mpsc::Sender<UserIntent>,
    actions: &[QuickAction],
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match input::parse_line(&line, actions) {
            Input::Intent(UserIntent::Quit) => {
                let _ = intents.send(UserIntent::Quit).await;
                return Ok(());
            }
            Input::Intent(intent) => {
                if intents.send(intent).await.is_err() {
                    info!("Engine stopped, no longer reading input");
                    return Ok(());
                }
            }
            Input::ListActions => {
                for line in input::format_actions(actions) {
                    println!("{line}");
                }
            }
            Input::Help => println!("{}", input::HELP_TEXT),
            Input::Invalid(message) => println!("{message}"),
            Input::Nothing => {}
        }
    }

    info!("End of console input");
    Ok(())
}

async fn print_updates(mut ui_rx: mpsc::Receiver<UiUpdate>) {
    while let Some(update) = ui_rx.recv().await {
        for line in console::render(&update) {
            println!("{line}");
        }
    }
}

/// Initialize tracing to log to a file (stdout is used by the console).
///
/// Returns the log file path.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join(&logging.dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join("blitz-remote.log");
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", log_path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(log_path)
}
