//! hookrelay CLI entry point.

use clap::Parser;

use hookrelay::cli::Cli;
use hookrelay::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match hookrelay::cli::app::load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            hookrelay::cli::handle_error(&err, cli.json);
            std::process::exit(hookrelay::cli::commands::EXIT_FAILED);
        }
    };

    // Held until exit so the file writer flushes
    let logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let code = hookrelay::cli::run(cli, &config).await;
    drop(logger);
    std::process::exit(code);
}
