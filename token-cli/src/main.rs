mod commands;

use std::process::ExitCode;

use auth::{SigningConfiguration, SigningSettings};
use error::ErrorResponse;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{parse_args, run, usage, Command, Outcome};

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only tokens and JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_cli=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{}", usage());
            return ExitCode::from(2);
        }
    };

    if command == Command::Help {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }

    // Load configuration
    let config = match SigningConfiguration::from_settings(&SigningSettings::from_env()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid signing configuration: {}", e);
            let response = ErrorResponse::from(&error::TokenError::from(e));
            println!(
                "{}",
                serde_json::to_string_pretty(&response).unwrap_or(response.message)
            );
            return ExitCode::FAILURE;
        }
    };

    match run(command, &config) {
        Outcome::Success(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Outcome::Failure(output) => {
            println!("{output}");
            ExitCode::FAILURE
        }
    }
}
