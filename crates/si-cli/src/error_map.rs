use si_core::InvokerError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> InvokerError {
    InvokerError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: InvokerError) -> i32 {
    tracing::debug!(code = %error.code, "run failed");
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    1
}

pub(crate) fn map_cli_script_read(error: std::io::Error) -> InvokerError {
    map_error("CLI_SCRIPT_READ", error)
}

pub(crate) fn map_cli_config_read(error: std::io::Error) -> InvokerError {
    map_error("CLI_CONFIG_READ", error)
}

pub(crate) fn map_cli_config_invalid(error: serde_json::Error) -> InvokerError {
    map_error("CLI_CONFIG_INVALID", error)
}

pub(crate) fn map_cli_input_invalid(name: &str, error: serde_json::Error) -> InvokerError {
    map_error("CLI_INPUT_INVALID", format!("input \"{}\": {}", name, error))
}

pub(crate) fn map_cli_output_encode(error: serde_json::Error) -> InvokerError {
    map_error("CLI_OUTPUT_ENCODE", error)
}
