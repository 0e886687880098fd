// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Civiq - track public information requests over email.
//!
//! Binary entry point: configuration loading, logging setup and the
//! subcommands wrapping the background pipelines.

mod app;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use civiq_config::CiviqConfig;

use crate::app::App;

/// Civiq - track public information requests over email.
#[derive(Parser, Debug)]
#[command(name = "civiq", version, about, long_about = None)]
struct Cli {
    /// Explicit config file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the mail, escalation and notification loops until interrupted.
    Serve,
    /// Check mailboxes for responses once. With no names, checks all.
    Poll {
        /// Mailbox names from the configuration.
        mailboxes: Vec<String>,
    },
    /// Run one overdue escalation sweep.
    Sweep,
    /// Attempt delivery of awaiting notifications once.
    Notify,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            civiq_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    if let Err(e) = dispatch(cli.command, config).await {
        eprintln!("civiq: {e}");
        std::process::exit(1);
    }
}

async fn dispatch(
    command: Option<Commands>,
    config: CiviqConfig,
) -> Result<(), civiq_core::CiviqError> {
    match command {
        Some(Commands::Serve) => {
            let app = Arc::new(App::build(config).await?);
            serve::run(app).await
        }
        Some(Commands::Poll { mailboxes }) => {
            let app = App::build(config).await?;
            app.poll_mail(&mailboxes, Utc::now()).await;
            app.shutdown().await
        }
        Some(Commands::Sweep) => {
            let app = App::build(config).await?;
            app.sweep_overdue(Utc::now()).await;
            app.shutdown().await
        }
        Some(Commands::Notify) => {
            let app = App::build(config).await?;
            app.deliver_notifications().await;
            app.shutdown().await
        }
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| civiq_core::CiviqError::Internal(e.to_string()))?;
            println!("{rendered}");
            Ok(())
        }
        None => {
            println!("civiq: use --help for available commands");
            Ok(())
        }
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<CiviqConfig, Vec<civiq_config::ConfigError>> {
    match path {
        Some(path) => {
            let config = civiq_config::load_config_from_path(path).map_err(|e| {
                civiq_config::diagnostic::figment_to_config_errors(e, &[])
            })?;
            civiq_config::validation::validate_config(&config)?;
            Ok(config)
        }
        None => civiq_config::load_and_validate(),
    }
}

fn init_tracing(config: &CiviqConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
