//! osup - content delivery and atomic installation for OS updates
//!
//! Thin shell over the fetch and install crates: it loads configuration and
//! JSON inputs, runs one pipeline command, and turns the events it emits
//! into log records and terminal output.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use osup_config::Config;
use osup_events::{EventReceiver, EventSender};
use osup_fetch::PackFetcher;
use osup_install::{InstallContext, Installer};
use osup_store::ContentStore;
use osup_types::{FileRecord, Manifest, Subscription};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // Precedence: file (or defaults), then environment, then flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);
    config.validate(cli.command.fetches())?;

    init_tracing(cli.global.json, cli.global.debug, &config.logs_path());
    info!("Starting osup v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = osup_events::channel();
    let mut event_handler = EventHandler::new(cli.global.json);

    let output = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    OutputRenderer::new(cli.global.json).render(&output)?;

    if let Some(report) = output.install.filter(|r| !r.is_success()) {
        return Err(CliError::Deficit {
            deficit: report.deficit,
            expected: report.expected,
        });
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(&event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    events: EventSender,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Fetch {
            manifest,
            subscriptions,
            required,
        } => {
            let manifest: Manifest = load_json(&manifest.path).await?;
            let mut subscriptions: Vec<Subscription> = load_json(&subscriptions.path).await?;
            let report = fetch(&config, &manifest, &mut subscriptions, required, events).await?;
            Ok(CommandOutput {
                fetch: Some(report),
                install: None,
            })
        }

        Commands::Install {
            manifest,
            files,
            no_autofix,
        } => {
            let manifest: Manifest = load_json(&manifest.path).await?;
            let mut files: Vec<FileRecord> = load_json(&files.path).await?;
            let report = install(&config, &manifest, &mut files, no_autofix, events).await?;
            Ok(CommandOutput {
                fetch: None,
                install: Some(report),
            })
        }

        Commands::Update {
            manifest,
            subscriptions,
            files,
            required,
            no_autofix,
        } => {
            let manifest: Manifest = load_json(&manifest.path).await?;
            let mut subscriptions: Vec<Subscription> = load_json(&subscriptions.path).await?;
            let mut files: Vec<FileRecord> = load_json(&files.path).await?;

            let fetched =
                fetch(&config, &manifest, &mut subscriptions, required, events.clone()).await?;
            let installed = install(&config, &manifest, &mut files, no_autofix, events).await?;
            Ok(CommandOutput {
                fetch: Some(fetched),
                install: Some(installed),
            })
        }
    }
}

async fn fetch(
    config: &Config,
    manifest: &Manifest,
    subscriptions: &mut [Subscription],
    required: bool,
    events: EventSender,
) -> Result<osup_types::FetchReport, CliError> {
    let fetcher = PackFetcher::from_config(config)?
        .with_required(required)
        .with_event_sender(events);
    Ok(fetcher.fetch(subscriptions, manifest).await?)
}

async fn install(
    config: &Config,
    manifest: &Manifest,
    files: &mut [FileRecord],
    no_autofix: bool,
    events: EventSender,
) -> Result<osup_types::InstallReport, CliError> {
    let context = InstallContext::new()
        .with_no_autofix(no_autofix)
        .with_event_sender(events);
    let installer = Installer::new(
        &config.paths.install_root,
        ContentStore::new(&config.paths.state_dir),
        context,
    )
    .await?;
    Ok(installer.install_files(files, manifest).await?)
}

/// Read a JSON input file
async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::Input {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    serde_json::from_str(&contents).map_err(|e| CliError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(root) = &global.path {
        config.paths.install_root.clone_from(root);
    }
    if let Some(state) = &global.statedir {
        config.paths.state_dir.clone_from(state);
    }
    if let Some(url) = &global.url {
        config.network.content_url = Some(url.clone());
    }
    if let Some(max) = global.max_parallel_downloads {
        config.general.max_parallel_downloads = max;
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool, log_dir: &Path) {
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if debug_enabled {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }

        let log_file = log_dir.join(format!(
            "osup-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(filter("debug"))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => eprintln!("Warning: Failed to create log file: {e}"),
        }
    }

    if json_mode {
        // stdout is reserved for the JSON result
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn"))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn"))
            .init();
    }
}
