use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod models;
mod services;
mod utils;

use utils::ChartError;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries only the image
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wallet_chart=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    debug!("📈 Starting wallet-chart v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match commands::execute(&args, std::io::stdin().lock()) {
        Ok(output) => {
            println!("{}", output);
            info!("✅ Chart written to stdout");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &ChartError) {
    if e.is_invocation_error() {
        warn!("❌ Invalid invocation: {}", e);
    } else {
        error!("❌ Chart generation failed: {}", e);
    }

    eprintln!("Error: {}", e);
    if matches!(e, ChartError::Usage(_)) {
        eprintln!();
        eprintln!("{}", commands::USAGE);
    }
}
