//! Command parsing and execution.

use auth::{issue, verify, Principal, SigningConfiguration};
use chrono::Utc;
use error::{ErrorResponse, TokenError};
use serde_json::Value;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Issue(Principal),
    Verify(String),
    Help,
}

/// Result of running a command: what to print and whether it succeeded.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

/// Parse the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "issue" => parse_issue(&args[1..]),
        "verify" => match &args[1..] {
            [token] => Ok(Command::Verify(token.clone())),
            _ => Err("verify expects exactly one token".to_string()),
        },
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn parse_issue(args: &[String]) -> Result<Command, String> {
    let mut subject = None;
    let mut principal = Principal::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--role" if i + 1 < args.len() => {
                principal.roles.insert(args[i + 1].clone());
                i += 2;
            }
            "--claim" if i + 1 < args.len() => {
                let (name, value) = args[i + 1]
                    .split_once('=')
                    .ok_or_else(|| format!("claim '{}' must be KEY=VALUE", args[i + 1]))?;
                // Bare words are strings; anything that parses as JSON keeps its type.
                let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
                principal.extra_claims.insert(name.to_string(), value);
                i += 2;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unexpected option '{flag}'"));
            }
            positional if subject.is_none() => {
                subject = Some(positional.to_string());
                i += 1;
            }
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }

    principal.subject = subject.ok_or_else(|| "issue expects a subject".to_string())?;
    Ok(Command::Issue(principal))
}

/// Execute a command against the loaded configuration.
pub fn run(command: Command, config: &SigningConfiguration) -> Outcome {
    match command {
        Command::Issue(principal) => match issue(&principal, config) {
            Ok(issued) => {
                tracing::info!(
                    subject = %principal.subject,
                    token_id = %issued.token_id,
                    expires_at = %issued.expires_at,
                    "Issued token"
                );
                Outcome::Success(issued.into_string())
            }
            Err(e) => failure(&TokenError::from(e)),
        },
        Command::Verify(token) => match verify(&token, config, Utc::now()) {
            Ok(verified) => match serde_json::to_string_pretty(&verified) {
                Ok(json) => Outcome::Success(json),
                Err(e) => Outcome::Failure(e.to_string()),
            },
            Err(rejection) => {
                tracing::warn!(reason = ?rejection.kind(), "Rejected token: {}", rejection);
                failure(&TokenError::from(rejection))
            }
        },
        Command::Help => Outcome::Success(usage().to_string()),
    }
}

fn failure(err: &TokenError) -> Outcome {
    let response = ErrorResponse::from(err);
    match serde_json::to_string_pretty(&response) {
        Ok(json) => Outcome::Failure(json),
        Err(_) => Outcome::Failure(response.message),
    }
}

pub fn usage() -> &'static str {
    "\
Usage:
  token issue <subject> [--role ROLE]... [--claim KEY=VALUE]...
  token verify <token>
  token help

Configuration is read from TOKEN_ISSUER, TOKEN_AUDIENCE, TOKEN_ALGORITHM,
TOKEN_SECRET, TOKEN_PRIVATE_KEY_PATH, TOKEN_PUBLIC_KEY_PATH,
TOKEN_LIFETIME_SECS, TOKEN_CLOCK_SKEW_SECS, TOKEN_NOT_BEFORE and
TOKEN_EXPIRES_AT."
}
