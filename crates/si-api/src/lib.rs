use std::sync::Arc;

use si_core::{Bindings, ExecutionError, InvokerError, ScriptValue};
use si_runtime::{
    shared_bindings, ClassContext, EngineFactory, EngineFactoryOptions, ScriptCallable,
    ScriptInvoker, ScriptRunnable, SharedBindings,
};

#[derive(Clone, Default)]
pub struct RunScriptOptions {
    pub script: String,
    pub inputs: Bindings,
    pub output_names: Vec<String>,
    pub class_context: Option<ClassContext>,
    /// Runs on a dedicated factory instead of the process-wide one.
    pub engine: Option<EngineFactoryOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunScriptResult {
    pub value: ScriptValue,
    pub outputs: Bindings,
}

/// Configures the process-wide engine factory. Must precede the first run.
pub fn configure(options: EngineFactoryOptions) -> Result<(), InvokerError> {
    EngineFactory::init_global(options).map(|_| ())
}

pub fn run(
    script: &str,
    inputs: Option<&Bindings>,
    outputs: Option<&mut Bindings>,
    class_context: Option<&ClassContext>,
) -> Result<ScriptValue, ExecutionError> {
    let empty_inputs = Bindings::new();
    let mut empty_outputs = Bindings::new();
    ScriptInvoker::global().run(
        script,
        inputs.unwrap_or(&empty_inputs),
        outputs.unwrap_or(&mut empty_outputs),
        class_context,
    )
}

pub fn make_callable(
    script: impl Into<String>,
    inputs: Option<Bindings>,
    outputs: Option<SharedBindings>,
    class_context: Option<ClassContext>,
) -> ScriptCallable {
    ScriptInvoker::global().make_callable(
        script,
        inputs.unwrap_or_default(),
        outputs.unwrap_or_else(|| shared_bindings(Bindings::new())),
        class_context,
    )
}

/// Builds a fire-and-forget runnable. Failures are not reported; use
/// [`make_callable`] when the caller needs to see them.
pub fn make_runnable(
    script: impl Into<String>,
    inputs: Option<Bindings>,
    outputs: Option<SharedBindings>,
    class_context: Option<ClassContext>,
) -> ScriptRunnable {
    ScriptInvoker::global().make_runnable(
        script,
        inputs.unwrap_or_default(),
        outputs.unwrap_or_else(|| shared_bindings(Bindings::new())),
        class_context,
    )
}

pub fn run_script(options: RunScriptOptions) -> Result<RunScriptResult, InvokerError> {
    let invoker = match options.engine {
        Some(engine) => ScriptInvoker::new(Arc::new(EngineFactory::new(engine))),
        None => ScriptInvoker::global(),
    };
    let mut outputs = options
        .output_names
        .into_iter()
        .map(|name| (name, ScriptValue::Undefined))
        .collect::<Bindings>();
    let value = invoker.run(
        &options.script,
        &options.inputs,
        &mut outputs,
        options.class_context.as_ref(),
    )?;
    Ok(RunScriptResult { value, outputs })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use si_core::ScriptFailure;
    use si_runtime::{lock_bindings, HostResolver, Module};

    use super::*;

    fn bindings(entries: &[(&str, ScriptValue)]) -> Bindings {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn hello_world_returns_the_literal() {
        let value = run(r#""Hello, world""#, None, None, None).expect("run should pass");
        assert_eq!(value, ScriptValue::from("Hello, world"));
    }

    #[test]
    fn input_bindings_reach_host_calls() {
        let inputs = bindings(&[("you", ScriptValue::from("Fred"))]);
        let value =
            run(r#"format("Hello, %s", you)"#, Some(&inputs), None, None).expect("run should pass");
        assert_eq!(value, ScriptValue::from("Hello, Fred"));
    }

    #[test]
    fn output_bindings_are_filled() {
        let mut outputs = bindings(&[("helloworld", ScriptValue::Undefined)]);
        run(
            r#"let helloworld = "Hello, output bindings";"#,
            None,
            Some(&mut outputs),
            None,
        )
        .expect("run should pass");
        assert_eq!(
            outputs.get("helloworld"),
            Some(&ScriptValue::from("Hello, output bindings"))
        );
    }

    #[test]
    fn thrown_error_is_wrapped() {
        let error = run(r#"throw "foo";"#, None, None, None).expect_err("throw should fail");
        let ScriptFailure::Runtime { message, .. } = error.cause() else {
            panic!("expected runtime cause");
        };
        assert!(message.contains("foo"));
    }

    #[test]
    fn bytes_input_reaches_host_namespace() {
        let inputs = bindings(&[("body", ScriptValue::Bytes(b"Hello, world".to_vec()))]);
        let value = run("bytes::hex(body)", Some(&inputs), None, None).expect("run should pass");
        assert_eq!(value, ScriptValue::from("48656c6c6f2c20776f726c64"));
    }

    #[test]
    fn doing_something_twice_gives_the_same_answer() {
        let script = r#"number::parse("1.5")"#;
        run(script, None, None, None).expect("first run should pass");
        let value = run(script, None, None, None).expect("second run should pass");
        assert_eq!(value, ScriptValue::Float(1.5));
    }

    #[test]
    fn make_callable_runs_later() {
        let callable = make_callable(r#""Hello, world""#, None, None, None);
        assert_eq!(
            callable.call().expect("call should pass"),
            ScriptValue::from("Hello, world")
        );
    }

    #[test]
    fn make_runnable_fills_outputs_later() {
        let outputs = shared_bindings(bindings(&[("helloworld", ScriptValue::Undefined)]));
        let runnable = make_runnable(
            r#"let helloworld = "Hello, output bindings";"#,
            None,
            Some(Arc::clone(&outputs)),
            None,
        );
        runnable.run();
        assert_eq!(
            lock_bindings(&outputs).get("helloworld"),
            Some(&ScriptValue::from("Hello, output bindings"))
        );
    }

    #[test]
    fn make_runnable_has_no_error_channel() {
        let outputs = shared_bindings(bindings(&[("helloworld", ScriptValue::Undefined)]));
        let runnable = make_runnable(r#"throw "foo";"#, None, Some(Arc::clone(&outputs)), None);
        runnable.run();
        assert_eq!(
            lock_bindings(&outputs).get("helloworld"),
            Some(&ScriptValue::Undefined)
        );
    }

    #[test]
    fn run_script_collects_named_outputs() {
        let result = run_script(RunScriptOptions {
            script: "let doubled = n * 2; doubled + 1".to_string(),
            inputs: bindings(&[("n", ScriptValue::Int(20))]),
            output_names: vec!["doubled".to_string(), "missing".to_string()],
            ..RunScriptOptions::default()
        })
        .expect("run_script should pass");
        assert_eq!(result.value, ScriptValue::Int(41));
        assert_eq!(
            result.outputs,
            bindings(&[
                ("doubled", ScriptValue::Int(40)),
                ("missing", ScriptValue::Undefined),
            ])
        );
    }

    #[test]
    fn run_script_uses_dedicated_engine_options() {
        let error = run_script(RunScriptOptions {
            script: "let n = 0; loop { n += 1; }".to_string(),
            engine: Some(EngineFactoryOptions {
                max_operations: 50,
                ..EngineFactoryOptions::default()
            }),
            ..RunScriptOptions::default()
        })
        .expect_err("operation limit should stop the loop");
        assert_eq!(error.code, "INVOKER_RUNTIME");
    }

    #[test]
    fn run_script_passes_class_context() {
        struct WellResolver;

        impl HostResolver for WellResolver {
            fn namespaces(&self) -> Vec<(String, Module)> {
                let mut module = Module::new();
                module.set_native_fn("name", |row: i64, column: i64| {
                    Ok(format!("{}{:02}", (b'A' + row as u8) as char, column))
                });
                vec![("well".to_string(), module)]
            }
        }

        let result = run_script(RunScriptOptions {
            script: "well::name(1, 7)".to_string(),
            class_context: Some(Arc::new(WellResolver)),
            ..RunScriptOptions::default()
        })
        .expect("run_script should pass");
        assert_eq!(result.value, ScriptValue::from("B07"));
    }
}
