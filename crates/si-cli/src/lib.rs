use std::ffi::OsString;

use clap::Parser;
use si_core::InvokerError;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod error_map;
mod run_command;

pub(crate) use cli_args::{Cli, Mode, RunArgs};
pub(crate) use error_map::{
    emit_error, map_cli_config_invalid, map_cli_config_read, map_cli_input_invalid,
    map_cli_output_encode, map_cli_script_read,
};
#[cfg(test)]
pub(crate) use run_command::{load_engine_options, load_script, parse_input_bindings};

/// Environment variable holding the log filter, e.g. `SI_LOG=si_runtime=debug`.
pub const LOG_ENV: &str = "SI_LOG";

/// Installs the stderr log subscriber; stdout carries the result protocol.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, InvokerError> {
    match cli.command {
        Mode::Run(args) => run_command::run_command(args),
    }
}
