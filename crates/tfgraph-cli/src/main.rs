//! `tfgraph` – interactive frame graph shell.
//!
//! 1. Loads `~/.tfgraph/config.toml` (defaults when absent) and applies
//!    `TFGRAPH_*` environment overrides.
//! 2. Imports the model description given as the first argument, or the
//!    configured `model_path`.
//! 3. Drops the user into a REPL for frame and chain queries (`/help`).
//! 4. Intercepts **Ctrl-C** and exits at the next prompt.

mod config;
mod repl;
mod session;
mod telemetry;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use session::Session;

fn main() {
    let _guard = telemetry::init_tracing("tfgraph");

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – exiting …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => config::from_env(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::from_env()
        }
    };

    let model = std::env::args()
        .nth(1)
        .or_else(|| cfg.model_path.clone())
        .map(PathBuf::from);
    let mut session = Session::new(cfg);
    match model {
        Some(path) => repl::cmd_load(&mut session, &path),
        None => println!(
            "  {}  Pass a model file or use {}.",
            "No model description loaded.".dimmed(),
            "/load <path>".bold()
        ),
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&mut session, shutdown);
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "tfgraph".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Coordinate frame graph explorer");
    println!();
}
