// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gatekeeper diagnostic CLI.
//!
//! Dry-runs the decision engine against a host snapshot file. Nothing is
//! activated and no telemetry is delivered.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;

use gatekeeper::config::load_configuration;
use gatekeeper::inventory::{self, StaticProbe, SupportPolicy};
use gatekeeper::logging::{init_logging, LoggingConfig};
use gatekeeper::telemetry::{EventMetadata, TelemetryEvent};
use gatekeeper::{decide, AbortReason, InjectionDecision, DEFAULT_RULES, VERSION};

/// Injection Gatekeeper diagnostics.
#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(author, version, about = "Decide whether injected instrumentation may activate", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a host snapshot and show the decision and telemetry event
    Check {
        /// JSON host snapshot: `{"runtime": {...}, "modules": [...]}`
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Proceed despite overridable blocks
        #[arg(short, long)]
        force: bool,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,

        /// Evaluate end-of-life as of this date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List compatibility rules in evaluation order
    Rules,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_configuration();

    let mut logging = if cli.debug {
        LoggingConfig::development()
    } else {
        LoggingConfig::from_log_level(config.log_level)
    }
    .with_ansi(std::io::stderr().is_terminal());
    // RUST_LOG takes precedence over the configured level
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logging = logging.with_filter(filter);
    }
    let _guard = init_logging(&logging).ok();

    match cli.command {
        Commands::Check {
            snapshot,
            force,
            json,
            today,
        } => {
            let config = if force {
                config.with_force_override(true)
            } else {
                config
            };
            let probe = StaticProbe::from_json_file(&snapshot)
                .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
            let today = today.unwrap_or_else(|| chrono::Utc::now().date_naive());

            let inventory = inventory::snapshot(&probe);
            let runtime = inventory::resolve(&probe, &SupportPolicy::default(), today);
            let decision = decide(&inventory, &runtime, &config);
            let event = TelemetryEvent::from_decision(
                &decision,
                EventMetadata::for_runtime(&runtime, &config.tracer_version),
            );

            if json {
                let output = serde_json::json!({
                    "injection_enabled": config.injection_enabled,
                    "force_override": config.force_override,
                    "decision": decision,
                    "event": event,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!("{}", format!("Injection Gatekeeper {VERSION}").bright_blue().bold());
            if !config.injection_enabled {
                println!(
                    "{}",
                    "Injection is not enabled in this environment; evaluating anyway".yellow()
                );
            }
            println!(
                "Runtime: {} {} [{}]{}",
                runtime.name.bright_white(),
                runtime.version,
                runtime.sapi.as_deref().unwrap_or("sapi unknown"),
                if runtime.is_past_eol { " (end of life)".red().to_string() } else { String::new() }
            );
            println!("Modules: {}", inventory.modules().len());

            match &decision {
                InjectionDecision::Proceeded { overrides_applied } => {
                    println!("Decision: {}", "proceed".green().bold());
                    for reason in overrides_applied {
                        println!("  {} overridden: {}", "!".yellow(), reason);
                    }
                }
                InjectionDecision::AbortedSafe { reason } => {
                    println!("Decision: {} ({})", "abort".red().bold(), reason);
                    if matches!(reason, AbortReason::RiskyButOverridable { .. }) {
                        println!("{}", "Use --force or DD_INJECT_FORCE=true to override".dimmed());
                    }
                }
            }
            println!("\n{}", "Telemetry event:".dimmed());
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Commands::Rules => {
            for (i, rule) in DEFAULT_RULES.iter().enumerate() {
                println!("{:>2}. {}", i + 1, rule.id.bright_white());
            }
        }
    }

    Ok(())
}
