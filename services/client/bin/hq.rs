//! Main Entrypoint for the HQ Terminal Client
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Choosing the remote service (HTTP API or offline fallback).
//! 3. Wiring the controller to the session gate, microphone and console view.
//! 4. Reading commands from stdin until `quit` or Ctrl+C.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use hq_client::{
    capture::Microphone,
    config::{Backend, Config},
    console::{Command, ConsoleView},
    controller::{Controller, ControllerSettings},
    http::HttpRemoteService,
};
use hq_core::{
    remote::{OfflineRemoteService, RemoteService},
    session::LocalSessionGate,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Http,
    Offline,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Http => Backend::Http,
            BackendArg::Offline => Backend::Offline,
        }
    }
}

#[derive(Parser)]
#[command(name = "hq", version)]
#[command(about = "Terminal client for the HQ training assistant")]
struct Cli {
    /// Remote backend; overrides HQ_BACKEND
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Start signed in as this user; overrides HQ_USERNAME
    #[arg(long, short = 'u')]
    username: Option<String>,
}

/// Runs one command to completion. Each command gets its own task so chat,
/// quiz and recording interleave.
async fn dispatch(controller: Controller, gate: Arc<LocalSessionGate>, command: Command) {
    match command {
        Command::Ask(text) => {
            controller.submit_text(&text).await;
        }
        Command::Record => controller.press_record().await,
        Command::Stop => {
            controller.release_record().await;
        }
        Command::Quiz => {
            controller.start_quiz().await;
        }
        Command::Answer(index) => {
            if controller.answer(index).await.is_none() {
                println!("No open question to answer.");
            }
        }
        Command::Leaderboard => {
            controller.refresh_leaderboard().await;
        }
        Command::Login(name) => {
            gate.sign_in(name);
            controller.sign_in().await;
        }
        Command::Logout => controller.sign_out().await,
        Command::Help => println!("{}", Command::HELP),
        Command::Quit => {}
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env_with_backend(cli.backend.map(Backend::from))
        .context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    // stdout belongs to the console view.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(backend = ?config.backend, "Configuration loaded. Initializing client...");

    // --- 3. Initialize Collaborators ---
    let remote: Arc<dyn RemoteService> = match config.backend {
        Backend::Http => {
            let endpoint = config
                .api_endpoint
                .as_deref()
                .context("HQ_API_ENDPOINT is required for the http backend")?;
            info!(endpoint, "Using HQ HTTP API.");
            Arc::new(
                HttpRemoteService::new(endpoint, config.request_timeout)
                    .context("Failed to build HTTP client")?,
            )
        }
        Backend::Offline => {
            warn!("Using offline HQ; scores are kept in memory only.");
            Arc::new(OfflineRemoteService::new())
        }
    };

    let gate = Arc::new(match cli.username.or(config.username.clone()) {
        Some(name) => LocalSessionGate::signed_in(name),
        None => LocalSessionGate::new(),
    });

    let controller = Controller::new(
        remote,
        gate.clone(),
        Arc::new(Microphone::new()),
        Arc::new(ConsoleView::new()),
        ControllerSettings {
            next_round_delay: config.next_round_delay,
        },
    );

    // --- 4. Run ---
    controller.load().await;
    println!("{}", Command::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        tokio::spawn(dispatch(controller.clone(), gate.clone(), command));
                    }
                    Ok(None) => {}
                    Err(usage) => println!("{usage}"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Received shutdown signal.");
                break;
            }
        }
    }

    controller.cancel_record().await;
    info!("Client shut down.");
    Ok(())
}
