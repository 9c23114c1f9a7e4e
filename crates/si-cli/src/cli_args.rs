use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "si-cli")]
#[command(about = "Run Rhai scripts with input and output bindings")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(
        long = "script",
        conflicts_with = "script_file",
        required_unless_present = "script_file"
    )]
    pub(crate) script: Option<String>,
    #[arg(long = "script-file")]
    pub(crate) script_file: Option<String>,
    #[arg(long = "input", value_name = "NAME=JSON")]
    pub(crate) inputs: Vec<String>,
    #[arg(long = "output", value_name = "NAME")]
    pub(crate) outputs: Vec<String>,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
}
