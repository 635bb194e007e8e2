//! CLI entry point for the WeChat exporter.
//!
//! # Usage
//!
//! ```bash
//! # Export the last 14 hours of the default conversation
//! wx-exporter
//!
//! # Export an explicit range of a named group
//! wx-exporter export --conversation "A旗舰船队" --start "2025-04-10 00:00"
//!
//! # Save the message list's element structure, loading older history too
//! wx-exporter dump-structure --conversation "A旗舰船队" --scroll
//!
//! # Print the resolved configuration
//! wx-exporter show-config --config wx-exporter.toml
//! ```
//!
//! Results are printed as JSON on stdout; diagnostics go to stderr (and, for
//! exports, to the run log).

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use wechat_exporter::config::{Config, Overrides};
use wechat_exporter::logging;
use wechat_exporter::timestamp::{Clock, SystemClock};
use wechat_exporter::{ChatExporter, Strictness};

#[derive(Parser)]
#[command(name = "wx-exporter")]
#[command(version)]
#[command(about = "Export WeChat desktop chat history through UI Automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Export the configured time window of a conversation (default)
    Export,
    /// Save the element structure of the conversation's message list
    DumpStructure {
        /// Capture again after each load-more step, up to max_attempts
        #[arg(long)]
        scroll: bool,
    },
    /// Print the resolved configuration as JSON
    ShowConfig,
}

#[derive(Args, Debug, Default)]
struct Settings {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Conversation (group or contact) to export
    #[arg(long, global = true)]
    conversation: Option<String>,

    /// Export the last N hours
    #[arg(long, global = true, value_name = "N")]
    hours: Option<u32>,

    /// Range start, "YYYY-MM-DD HH:MM[:SS]" (overrides --hours)
    #[arg(long, global = true)]
    start: Option<String>,

    /// Range end, "YYYY-MM-DD HH:MM[:SS]" (defaults to now)
    #[arg(long, global = true)]
    end: Option<String>,

    /// Maximum number of load-more attempts
    #[arg(long, global = true, value_name = "N")]
    max_attempts: Option<u32>,

    /// Directory for exported transcripts
    #[arg(long, global = true, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Directory for run logs
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Duplicate suppression: "global" or "adjacent"
    #[arg(long, global = true)]
    strictness: Option<Strictness>,
}

impl Settings {
    fn overrides(&self) -> Overrides {
        Overrides {
            conversation: self.conversation.clone(),
            hours: self.hours,
            start: self.start.clone(),
            end: self.end.clone(),
            max_attempts: self.max_attempts,
            export_dir: self.export_dir.clone(),
            log_dir: self.log_dir.clone(),
            strictness: self.strictness,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            log::error!("[WX-EXPORT] error serializing output: {}", e);
            1
        }
    }
}

fn handle_export(config: &Config) -> i32 {
    let clock = SystemClock;
    if let Some(path) = logging::init(&config.output.log_dir, clock.now()) {
        log::info!("[WX-EXPORT] logging to {}", path.display());
    }

    match ChatExporter::new(config).run(&clock) {
        Ok(summary) => {
            if let Some(warning) = &summary.warning {
                log::warn!("[WX-EXPORT] export finished with a warning: {}", warning);
            }
            log::info!(
                "[WX-EXPORT] exported {} lines to {}",
                summary.line_count,
                summary.path.display()
            );
            print_json(&summary)
        }
        Err(e) => {
            log::error!("[WX-EXPORT] export failed: {}", e);
            1
        }
    }
}

fn handle_dump_structure(config: &Config, scroll: bool) -> i32 {
    let clock = SystemClock;
    if let Some(path) = logging::init(&config.output.log_dir, clock.now()) {
        log::info!("[WX-EXPORT] logging to {}", path.display());
    }

    match ChatExporter::new(config).dump_structure(&clock, scroll) {
        Ok(summary) => {
            log::info!(
                "[WX-EXPORT] saved {} captures to {}",
                summary.captures,
                summary.path.display()
            );
            print_json(&summary)
        }
        Err(e) => {
            log::error!("[WX-EXPORT] structure dump failed: {}", e);
            1
        }
    }
}

fn handle_show_config(config: &Config) -> i32 {
    logging::init_stderr();
    print_json(config)
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::resolve(cli.settings.config.as_deref(), cli.settings.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[WX-EXPORT] {}", e);
            process::exit(1);
        }
    };

    let exit_code = match cli.command.unwrap_or(Command::Export) {
        Command::Export => handle_export(&config),
        Command::DumpStructure { scroll } => handle_dump_structure(&config, scroll),
        Command::ShowConfig => handle_show_config(&config),
    };

    log::debug!("[WX-EXPORT] exiting with code {}", exit_code);
    process::exit(exit_code);
}
