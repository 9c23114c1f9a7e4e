mod context;
mod deferred;
mod dispatcher;
mod helpers;
mod host;
mod invoker;

pub use context::{unwrap_raw, ExecutionContext};
pub use deferred::{
    lock_bindings, shared_bindings, ScriptCallable, ScriptRunnable, SharedBindings,
};
pub use dispatcher::{ContextAction, Dispatcher, EngineFactory, EngineFactoryOptions};
pub use host::{ClassContext, HostHandle, HostResolver, Importer, StandardResolver};
pub use invoker::{ScriptInvoker, DIAGNOSTIC_LABEL};

pub use rhai::{Dynamic, Engine, Module, Scope, AST};
