// CLI module - command-line argument parsing and handlers
//
// Provides subcommands:
// - upload <file>: submit a bank statement PDF and follow the import job
// - config --show/--reset/--path: configuration management

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{Config, VERSION};

/// finwatch - terminal client for a ledger service
#[derive(Parser)]
#[command(name = "finwatch")]
#[command(version = VERSION)]
#[command(about = "Terminal client for a ledger service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a bank statement PDF and wait for the import to finish
    Upload {
        /// Path to the statement (.pdf only)
        file: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Outcome of CLI dispatch: either a subcommand was fully handled here, or
/// the caller should continue (into the TUI or an upload flow).
pub enum CliAction {
    /// Handled in-process, exit now
    Done,
    /// Run the upload flow for this file
    Upload(PathBuf),
    /// No subcommand - run the TUI
    RunTui,
}

/// Parse arguments and handle config subcommands in-process. Upload is
/// returned to the caller since it needs the async runtime and transport.
pub fn handle_cli() -> CliAction {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Upload { file }) => CliAction::Upload(file),
        Some(Commands::Config { show, reset, path }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show();
            } else if reset {
                handle_config_reset();
            } else {
                println!("Usage: finwatch config [--show|--reset|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --reset   Reset config file to defaults");
                println!("  --path    Show config file path");
            }
            CliAction::Done
        }
        None => CliAction::RunTui,
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() {
    let config = Config::from_env();

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("api_url = {:?}", config.api_url);
    // Only disclose presence, never the value
    println!(
        "token = {}",
        if config.token.is_some() { "(set)" } else { "(not set)" }
    );
    println!("per_page = {}", config.per_page);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() {
    let Some(path) = Config::config_path() else {
        eprintln!("Error: Could not determine config path");
        std::process::exit(1);
    };

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush().unwrap();

        let mut input = String::new();
        std::io::stdin().read_line(&mut input).unwrap();

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return;
        }
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = std::fs::write(&path, Config::default().to_toml()) {
        eprintln!("Error writing config: {}", e);
        std::process::exit(1);
    }

    println!("Config reset to defaults: {}", path.display());
}
