//! Deferred forms of [`ScriptInvoker::run`].
//!
//! Both adapters capture the script, its inputs, a shared output map and the
//! optional class context, and run the synchronous contract each time they
//! are triggered. [`ScriptRunnable`] has no error channel: a failing script
//! is only visible through output slots that stay unset. Callers that need
//! the error use [`ScriptCallable`].

use std::sync::{Arc, Mutex, MutexGuard};

use si_core::{Bindings, ExecutionError, ScriptValue};

use crate::host::ClassContext;
use crate::invoker::ScriptInvoker;

/// Output map shared between the caller and a deferred adapter.
pub type SharedBindings = Arc<Mutex<Bindings>>;

pub fn shared_bindings(bindings: Bindings) -> SharedBindings {
    Arc::new(Mutex::new(bindings))
}

/// Locks shared outputs, recovering the map if a previous holder panicked.
pub fn lock_bindings(bindings: &SharedBindings) -> MutexGuard<'_, Bindings> {
    bindings
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
struct DeferredScript {
    invoker: ScriptInvoker,
    script: String,
    inputs: Bindings,
    outputs: SharedBindings,
    class_context: Option<ClassContext>,
}

impl DeferredScript {
    fn run(&self) -> Result<ScriptValue, ExecutionError> {
        let mut outputs = lock_bindings(&self.outputs);
        self.invoker.run(
            &self.script,
            &self.inputs,
            &mut outputs,
            self.class_context.as_ref(),
        )
    }
}

/// Zero-argument callable; errors reach whoever calls it.
#[derive(Clone)]
pub struct ScriptCallable {
    inner: DeferredScript,
}

impl ScriptCallable {
    pub(crate) fn new(
        invoker: ScriptInvoker,
        script: String,
        inputs: Bindings,
        outputs: SharedBindings,
        class_context: Option<ClassContext>,
    ) -> Self {
        Self {
            inner: DeferredScript {
                invoker,
                script,
                inputs,
                outputs,
                class_context,
            },
        }
    }

    pub fn call(&self) -> Result<ScriptValue, ExecutionError> {
        self.inner.run()
    }

    pub fn outputs(&self) -> &SharedBindings {
        &self.inner.outputs
    }
}

/// Fire-and-forget runnable; the result and any error are discarded.
#[derive(Clone)]
pub struct ScriptRunnable {
    inner: DeferredScript,
}

impl ScriptRunnable {
    pub(crate) fn new(
        invoker: ScriptInvoker,
        script: String,
        inputs: Bindings,
        outputs: SharedBindings,
        class_context: Option<ClassContext>,
    ) -> Self {
        Self {
            inner: DeferredScript {
                invoker,
                script,
                inputs,
                outputs,
                class_context,
            },
        }
    }

    pub fn run(&self) {
        if let Err(error) = self.inner.run() {
            tracing::warn!(code = error.code(), %error, "runnable script failed; error discarded");
        }
    }

    pub fn outputs(&self) -> &SharedBindings {
        &self.inner.outputs
    }
}
