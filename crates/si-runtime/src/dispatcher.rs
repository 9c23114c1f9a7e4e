use std::sync::{Arc, OnceLock};

use rhai::module_resolvers::StaticModuleResolver;
use rhai::Engine;
use serde::Deserialize;
use si_core::{InvokerError, ScriptFailure, ScriptValue};

use crate::context::ExecutionContext;

/// Work run inside a dispatched execution context.
///
/// Failures are returned, never unwound across the dispatch boundary.
pub trait ContextAction {
    fn run(&mut self, context: &mut ExecutionContext) -> Result<ScriptValue, ScriptFailure>;
}

/// Supplies an execution context to an action and hands back its result.
pub trait Dispatcher: Send + Sync {
    fn call(&self, action: &mut dyn ContextAction) -> Result<ScriptValue, ScriptFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineFactoryOptions {
    /// Zero disables the limit.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for EngineFactoryOptions {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 0,
            max_array_size: 0,
            max_map_size: 0,
        }
    }
}

/// Production dispatcher: one new Rhai engine per call.
#[derive(Debug, Clone, Default)]
pub struct EngineFactory {
    options: EngineFactoryOptions,
}

static GLOBAL_FACTORY: OnceLock<Arc<EngineFactory>> = OnceLock::new();

impl EngineFactory {
    pub fn new(options: EngineFactoryOptions) -> Self {
        Self { options }
    }

    /// The process-wide factory, created with default options on first use.
    pub fn global() -> Arc<EngineFactory> {
        Arc::clone(GLOBAL_FACTORY.get_or_init(|| Arc::new(EngineFactory::default())))
    }

    pub fn init_global(options: EngineFactoryOptions) -> Result<Arc<EngineFactory>, InvokerError> {
        let factory = Arc::new(EngineFactory::new(options));
        GLOBAL_FACTORY
            .set(Arc::clone(&factory))
            .map_err(|_| {
                InvokerError::new(
                    "FACTORY_ALREADY_INITIALIZED",
                    "The global engine factory was already initialized.",
                )
            })?;
        Ok(factory)
    }

    fn build_engine(&self) -> Engine {
        let options = &self.options;
        let mut engine = Engine::new();
        engine
            .set_max_operations(options.max_operations)
            .set_max_call_levels(options.max_call_levels)
            .set_max_expr_depths(options.max_expr_depth, options.max_expr_depth)
            .set_max_string_size(options.max_string_size)
            .set_max_array_size(options.max_array_size)
            .set_max_map_size(options.max_map_size)
            .set_module_resolver(StaticModuleResolver::new());
        engine
    }
}

impl Dispatcher for EngineFactory {
    fn call(&self, action: &mut dyn ContextAction) -> Result<ScriptValue, ScriptFailure> {
        let mut context = ExecutionContext::new(self.build_engine());
        action.run(&mut context)
    }
}
