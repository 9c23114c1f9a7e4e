pub mod error;
pub mod value;

pub use error::{ExecutionError, InvokerError, ScriptFailure};
pub use value::*;
