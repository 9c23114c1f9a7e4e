fn main() {
    si_cli::init_logging();
    let exit_code = si_cli::run_cli_from_args(std::env::args_os());
    std::process::exit(exit_code);
}
