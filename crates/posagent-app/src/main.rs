// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// posagent — field receipt print agent
//
// Entry point. Initialises logging, loads the configuration, runs the startup
// sequence, then hands control to the connection supervisor for good.

mod agent;
mod dispatch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use posagent_core::config::{AgentConfig, CONFIG_FILE_NAME};
use posagent_core::error::AgentError;
use posagent_core::hints::{Recovery, operator_hint};

use agent::Agent;

#[derive(Parser, Debug)]
#[command(name = "posagent")]
#[command(version, about = "Receipt print agent: queue in, paper out")]
struct Args {
    /// Configuration file (defaults to config.json next to the executable)
    #[arg(long, env = "POSAGENT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(default_config_path);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "posagent starting");

    let result = async {
        let config = AgentConfig::load(&config_path)?;
        Agent::start(config).await?.run().await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Log the error and print what the operator should check.
fn report_fatal(err: &AgentError) {
    let hint = operator_hint(err);
    if err.is_fatal_at_startup() {
        error!(error = %err, "startup failed");
    } else {
        error!(error = %err, recovery = ?hint.recovery, "agent stopped unexpectedly");
    }
    eprintln!("posagent: {err}");
    eprintln!("  {}", hint.summary);
    eprintln!("  {}", hint.check);
    if hint.recovery == Recovery::Automatic {
        eprintln!("  Restarting the agent is usually enough.");
    }
}
