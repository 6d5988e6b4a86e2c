//! signaldesk - command-line dashboard for a trading-signal webhook service.
//!
//! Lists signals, stocks and pairs, posts webhook signals, and manages the
//! bearer-token session used by the authenticated endpoints.

mod app;
mod commands;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::Command;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(command: Command) -> Result<()> {
    if command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }
    let mut app = App::new()?;
    app.run(command).await
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match commands::parse(&args) {
        Ok(command) => {
            info!("signaldesk starting");
            run(command).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
