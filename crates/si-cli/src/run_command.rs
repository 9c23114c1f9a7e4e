use std::fs;
use std::path::Path;

use si_api::{run_script, RunScriptOptions, RunScriptResult};
use si_core::{Bindings, InvokerError, ScriptValue};
use si_runtime::EngineFactoryOptions;

use crate::{
    map_cli_config_invalid, map_cli_config_read, map_cli_input_invalid, map_cli_output_encode,
    map_cli_script_read, RunArgs,
};

pub(super) fn run_command(args: RunArgs) -> Result<i32, InvokerError> {
    let script = load_script(args.script, args.script_file.as_deref())?;
    let inputs = parse_input_bindings(&args.inputs)?;
    let engine = match args.config.as_deref() {
        Some(path) => Some(load_engine_options(Path::new(path))?),
        None => None,
    };

    let result = run_script(RunScriptOptions {
        script,
        inputs,
        output_names: args.outputs,
        class_context: None,
        engine,
    })?;
    emit_result(&result)
}

pub(crate) fn load_script(
    inline: Option<String>,
    script_file: Option<&str>,
) -> Result<String, InvokerError> {
    match (inline, script_file) {
        (Some(script), _) => Ok(script),
        (None, Some(path)) => fs::read_to_string(path).map_err(map_cli_script_read),
        (None, None) => Err(InvokerError::new(
            "CLI_SCRIPT_MISSING",
            "Either --script or --script-file is required.",
        )),
    }
}

pub(crate) fn parse_input_bindings(raw: &[String]) -> Result<Bindings, InvokerError> {
    let mut bindings = Bindings::new();
    for entry in raw {
        let Some((name, json)) = entry.split_once('=') else {
            return Err(InvokerError::new(
                "CLI_INPUT_INVALID",
                format!("Expected NAME=JSON, got \"{}\".", entry),
            ));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(InvokerError::new(
                "CLI_INPUT_INVALID",
                format!("Input binding \"{}\" has an empty name.", entry),
            ));
        }
        let value: ScriptValue =
            serde_json::from_str(json).map_err(|error| map_cli_input_invalid(name, error))?;
        bindings.insert(name.to_string(), value);
    }
    Ok(bindings)
}

pub(crate) fn load_engine_options(path: &Path) -> Result<EngineFactoryOptions, InvokerError> {
    if !path.exists() {
        return Err(InvokerError::new(
            "CLI_CONFIG_NOT_FOUND",
            format!("Config file does not exist: {}", path.display()),
        ));
    }
    let raw = fs::read_to_string(path).map_err(map_cli_config_read)?;
    serde_json::from_str(&raw).map_err(map_cli_config_invalid)
}

pub(crate) fn emit_result(result: &RunScriptResult) -> Result<i32, InvokerError> {
    let value = serde_json::to_string(&result.value).map_err(map_cli_output_encode)?;
    let outputs = serde_json::to_string(&result.outputs).map_err(map_cli_output_encode)?;
    println!("RESULT:OK");
    println!("VALUE_JSON:{}", value);
    println!("OUTPUT_JSON:{}", outputs);
    Ok(0)
}
