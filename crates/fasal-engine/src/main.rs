//! # Fasal Engine
//!
//! Entry point for the Fasal farming simulation.
//!
//! Subcommands:
//! - `run`: tick every stored farm on a scaled clock until Ctrl-C
//! - `script <file|->`: execute JSON command lines against a manual clock
//! - `write-config <path>`: write the default server config
//! - `write-sim-config <path>`: write the default simulation config
//!
//! Global flags: `--config <path>`, `--json-logs`. `script --persist` uses the
//! save directory instead of an in-memory store.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod driver;
mod script;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fasal_gameplay::{
    EventBus, FarmEngine, FarmStore, JsonFileStore, ManualClock, MemoryStore, ScaledClock,
    SimConfig,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ServerConfig;
use crate::script::ScriptRunner;

/// Command-line arguments for the Fasal engine.
#[derive(Debug, Parser)]
#[command(name = "fasal", author, version, about, long_about = None)]
struct CliArgs {
    /// Server config file. Defaults to the platform config directory.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Tick every stored farm on a scaled clock until Ctrl-C.
    Run,
    /// Execute JSON command lines against a manual clock.
    Script {
        /// Script file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        path: String,
        /// Use the save directory instead of an in-memory store.
        #[arg(long)]
        persist: bool,
    },
    /// Write the default server config.
    WriteConfig {
        /// Destination file.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Write the default simulation config.
    WriteSimConfig {
        /// Destination file.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("fasal=info".parse()?);
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs)?;

    info!("Fasal starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => ServerConfig::load_from(path),
        None => ServerConfig::load(),
    };

    match args.command {
        CliCommand::Run => run_server(&config)?,
        CliCommand::Script { path, persist } => run_script(&config, &path, persist)?,
        CliCommand::WriteConfig { path } => config.save_to(path)?,
        CliCommand::WriteSimConfig { path } => config.sim_config().save_to(path)?,
    }

    info!("Fasal shutdown complete");
    Ok(())
}

fn run_server(config: &ServerConfig) -> Result<()> {
    let store = JsonFileStore::open(&config.save_dir)
        .with_context(|| format!("opening farm directory {}", config.save_dir.display()))?;
    let farms = store.owners()?.len();
    let engine = FarmEngine::new(config.sim_config(), store)
        .with_clock(Arc::new(ScaledClock::new(Utc::now(), config.time_scale)))
        .with_event_bus(EventBus::new(config.event_capacity));
    info!(
        "Serving {} farm(s) from {}",
        farms,
        config.save_dir.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {e}");
            }
        };
        driver::run(
            Arc::new(engine),
            Duration::from_millis(config.tick_interval_ms),
            config.tick_minutes,
            shutdown,
        )
        .await
    });
    Ok(())
}

fn run_script(config: &ServerConfig, path: &str, persist: bool) -> Result<()> {
    let sim = config.sim_config();
    let failures = if persist {
        let store = JsonFileStore::open(&config.save_dir)?;
        execute_script(sim, store, config, path)?
    } else {
        execute_script(sim, MemoryStore::new(), config, path)?
    };
    if failures > 0 {
        info!("{failures} command(s) failed");
    }
    Ok(())
}

fn execute_script<S: FarmStore>(
    sim: SimConfig,
    store: S,
    config: &ServerConfig,
    path: &str,
) -> Result<usize> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = FarmEngine::new(sim, store)
        .with_clock(clock.clone())
        .with_event_bus(EventBus::new(config.event_capacity));
    let runner = ScriptRunner::new(engine, clock);
    let stdout = io::stdout().lock();

    let failures = if path == "-" {
        runner.run(io::stdin().lock(), stdout)?
    } else {
        let file = File::open(path).with_context(|| format!("opening script {path}"))?;
        runner.run(BufReader::new(file), stdout)?
    };
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_script_flags() {
        let args = CliArgs::try_parse_from([
            "fasal", "--config", "x.toml", "script", "-", "--persist",
        ])
        .expect("parse");
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        assert!(!args.json_logs);
        match args.command {
            CliCommand::Script { path, persist } => {
                assert_eq!(path, "-");
                assert!(persist);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_names() {
        let args = CliArgs::try_parse_from(["fasal", "write-sim-config", "sim.toml", "--json-logs"])
            .expect("parse");
        assert!(args.json_logs);
        assert!(matches!(args.command, CliCommand::WriteSimConfig { .. }));
        assert!(matches!(
            CliArgs::try_parse_from(["fasal", "run"]).expect("parse").command,
            CliCommand::Run
        ));
    }

    #[test]
    fn test_config_flag_needs_value() {
        assert!(CliArgs::try_parse_from(["fasal", "--config"]).is_err());
        assert!(CliArgs::try_parse_from(["fasal"]).is_err());
    }
}
