//! Script runner binary entry point
//!
//! Usage:
//!
//! ```text
//! bru-script run <script-file> <config-json>
//! bru-script vars <config-json>
//! ```
//!
//! The output record is written to stdout as a single JSON line. Logging goes
//! to stderr (default filter `warn`, override with `RUST_LOG`). The exit code
//! is 1 on invalid input or when any script failed; the record is still
//! printed once execution has started.

use bru_script::driver::{self, ScriptInput, ScriptOutput};
use bru_script::Error;
use log::error;
use std::process::ExitCode;

const USAGE: &str = "Usage: bru-script run <script-file> <config-json>\n       bru-script vars <config-json>";

/// Exit code used when interrupted by Ctrl+C.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    tokio::select! {
        code = run(&args) => code,
        _ = tokio::signal::ctrl_c() => {
            error!("Interrupted");
            ExitCode::from(INTERRUPTED)
        }
    }
}

async fn run(args: &[String]) -> ExitCode {
    let result = match args {
        [command, script_file, config] if command == "run" => run_script(script_file, config).await,
        [command, config] if command == "vars" => run_response_vars(config).await,
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    match result.and_then(|output| emit(&output).map(|_| output)) {
        Ok(output) if output.is_success() => ExitCode::SUCCESS,
        Ok(output) => {
            for failure in &output.failures {
                error!("{}", failure.message);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run_script(script_file: &str, config: &str) -> Result<ScriptOutput, Error> {
    let input = ScriptInput::from_json(config)?;
    let script = std::fs::read_to_string(script_file).map_err(|e| {
        Error::InputValidation(format!("cannot read script '{}': {}", script_file, e))
    })?;
    driver::run_script(input, &script).await
}

async fn run_response_vars(config: &str) -> Result<ScriptOutput, Error> {
    let input = ScriptInput::from_json(config)?;
    driver::run_response_vars(input).await
}

fn emit(output: &ScriptOutput) -> Result<(), Error> {
    println!("{}", output.to_json()?);
    Ok(())
}
