use std::process::ExitCode;

use clap::Parser;
use spine_cli::{init_tracing, output, resolve_config, run, Cli, EXIT_ERROR};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            output::print_error(&format!("configuration error: {err:#}"));
            return ExitCode::from(EXIT_ERROR);
        }
    };
    init_tracing(&config.logging, cli.verbose);

    match run(cli, config).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            output::print_error(&format!("{err:#}"));
            ExitCode::from(EXIT_ERROR)
        }
    }
}
