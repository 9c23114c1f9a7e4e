use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use si_core::{Bindings, ExecutionError, ScriptFailure, ScriptValue};

use crate::context::{unwrap_raw, ExecutionContext};
use crate::deferred::{ScriptCallable, ScriptRunnable, SharedBindings};
use crate::dispatcher::{ContextAction, Dispatcher, EngineFactory};
use crate::host::ClassContext;

/// Label attached to every compiled script in diagnostics.
pub const DIAGNOSTIC_LABEL: &str = "<script-invoker>";

/// Runs one script with input bindings and fills the requested outputs.
struct ScriptContextAction<'a> {
    script: &'a str,
    inputs: &'a Bindings,
    outputs: &'a mut Bindings,
    class_context: Option<&'a ClassContext>,
}

impl ScriptContextAction<'_> {
    fn execute(&mut self, context: &mut ExecutionContext) -> Result<ScriptValue, ScriptFailure> {
        if let Some(class_context) = self.class_context {
            context.set_class_context(Arc::clone(class_context));
        }
        let compiled = context.compile(self.script, DIAGNOSTIC_LABEL)?;
        let importer = context.importer();
        let mut scope = context.new_scope(Some(&importer));
        for (name, value) in self.inputs {
            context.bind(&mut scope, name, value);
        }
        let raw = context.execute(&compiled, &mut scope)?;
        let result = unwrap_raw(raw)?;

        // Read everything first so a failed lookup leaves every slot untouched.
        let mut captured = Vec::with_capacity(self.outputs.len());
        for name in self.outputs.keys() {
            captured.push((name.clone(), context.lookup(&scope, name)?));
        }
        for (name, value) in captured {
            self.outputs.insert(name, value);
        }
        Ok(result)
    }
}

impl ContextAction for ScriptContextAction<'_> {
    fn run(&mut self, context: &mut ExecutionContext) -> Result<ScriptValue, ScriptFailure> {
        match catch_unwind(AssertUnwindSafe(|| self.execute(context))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(ScriptFailure::Panic {
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

/// Entry point for running scripts through an injected dispatcher.
#[derive(Clone)]
pub struct ScriptInvoker {
    dispatcher: Arc<dyn Dispatcher>,
}

impl ScriptInvoker {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Invoker bound to the process-wide engine factory.
    pub fn global() -> Self {
        Self::new(EngineFactory::global())
    }

    /// Runs `script` and returns its final value.
    ///
    /// Every key of `outputs` is overwritten with the script's value for that
    /// name, or `Undefined` if the script never defined it. On failure the
    /// outputs are left as they were.
    pub fn run(
        &self,
        script: &str,
        inputs: &Bindings,
        outputs: &mut Bindings,
        class_context: Option<&ClassContext>,
    ) -> Result<ScriptValue, ExecutionError> {
        tracing::debug!(
            script_len = script.len(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            class_context = class_context.is_some(),
            "running script"
        );
        let mut action = ScriptContextAction {
            script,
            inputs,
            outputs,
            class_context,
        };
        match self.dispatcher.call(&mut action) {
            Ok(value) => {
                tracing::debug!(result_type = value.type_name(), "script finished");
                Ok(value)
            }
            Err(cause) => {
                tracing::debug!(code = cause.code(), "script failed");
                Err(ExecutionError::new(cause))
            }
        }
    }

    pub fn make_callable(
        &self,
        script: impl Into<String>,
        inputs: Bindings,
        outputs: SharedBindings,
        class_context: Option<ClassContext>,
    ) -> ScriptCallable {
        ScriptCallable::new(self.clone(), script.into(), inputs, outputs, class_context)
    }

    pub fn make_runnable(
        &self,
        script: impl Into<String>,
        inputs: Bindings,
        outputs: SharedBindings,
        class_context: Option<ClassContext>,
    ) -> ScriptRunnable {
        ScriptRunnable::new(self.clone(), script.into(), inputs, outputs, class_context)
    }
}
