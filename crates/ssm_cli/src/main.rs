//! ssm CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Unresolved schema reference
//! - 4: Schema source error

use std::process::ExitCode;

use clap::Parser;
use ssm_core::SchemaError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod run;

use cli::Cli;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const REFERENCE_ERROR: u8 = 3;
    pub const SOURCE_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut filter = EnvFilter::from_default_env();
    for directive in [cli.log_directive(), "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    let json_layer = cli
        .log_json
        .then(|| fmt::layer().json().with_target(false).with_writer(std::io::stderr));
    let text_layer = (!cli.log_json)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let log_result = tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    match run::execute(cli).await {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(error) = e.chain().find_map(|cause| cause.downcast_ref::<SchemaError>()) {
        return match error {
            SchemaError::ReferenceNotFound(_) => ExitCodes::REFERENCE_ERROR,
            SchemaError::MalformedSource { .. }
            | SchemaError::CallableFailed { .. }
            | SchemaError::Json(_) => ExitCodes::SOURCE_ERROR,
            SchemaError::Configuration(_)
            | SchemaError::InvalidPattern(_)
            | SchemaError::Config(_) => ExitCodes::INVALID_ARGS,
            SchemaError::Io(_) => ExitCodes::GENERAL_ERROR,
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("option") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
