mod cli;
mod commands;
mod error;
mod output;
mod settings;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;
use crate::error::CliError;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = Settings::load(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        cli.mode.as_deref(),
    )?;

    let mut gateway = commands::connect(&cli, &settings)?;
    let result = commands::run(&cli.command, &mut gateway).await;
    gateway.close();

    output::render(&result?, cli.pretty)
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
