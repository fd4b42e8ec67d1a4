//! Rigdoc Control - command-line front end for the hybrid fault diagnoser.

use clap::Parser;
use rigdocctl::cli::Cli;
use rigdocctl::commands;
use rigdocctl::errors::EXIT_GENERAL_ERROR;
use tracing_subscriber::EnvFilter;

/// Log filter variable; `-v` overrides it with `debug`.
const LOG_ENV: &str = "RIGDOC_LOG";

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let code = match commands::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            EXIT_GENERAL_ERROR
        }
    };
    std::process::exit(code);
}
