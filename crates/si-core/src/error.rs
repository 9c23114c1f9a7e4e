use thiserror::Error;

use crate::value::ScriptValue;

/// The underlying reason a script invocation failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptFailure {
    #[error("compile failed ({position}): {message}")]
    Compile { message: String, position: String },
    #[error("{message}")]
    Runtime {
        message: String,
        /// The value passed to `throw`, when the script raised one.
        thrown: Option<ScriptValue>,
    },
    #[error("value of type \"{type_name}\" cannot cross into the host{}", name_suffix(.name))]
    Conversion {
        name: Option<String>,
        type_name: String,
    },
    #[error("host code panicked: {message}")]
    Panic { message: String },
    #[error("dispatch failed: {message}")]
    Dispatch { message: String },
}

fn name_suffix(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" (variable \"{}\")", name),
        None => String::new(),
    }
}

impl ScriptFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compile { .. } => "INVOKER_COMPILE",
            Self::Runtime { .. } => "INVOKER_RUNTIME",
            Self::Conversion { .. } => "INVOKER_CONVERSION",
            Self::Panic { .. } => "INVOKER_PANIC",
            Self::Dispatch { .. } => "INVOKER_DISPATCH",
        }
    }
}

/// The single error kind a script invocation reports to its caller.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("script execution failed: {cause}")]
pub struct ExecutionError {
    #[source]
    cause: ScriptFailure,
}

impl ExecutionError {
    pub fn new(cause: ScriptFailure) -> Self {
        Self { cause }
    }

    pub fn cause(&self) -> &ScriptFailure {
        &self.cause
    }

    pub fn into_cause(self) -> ScriptFailure {
        self.cause
    }

    pub fn code(&self) -> &'static str {
        self.cause.code()
    }
}

impl From<ScriptFailure> for ExecutionError {
    fn from(cause: ScriptFailure) -> Self {
        Self::new(cause)
    }
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message}")]
pub struct InvokerError {
    pub code: String,
    pub message: String,
}

impl InvokerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for InvokerError {
    fn from(error: ExecutionError) -> Self {
        let code = error.code();
        Self::new(code, error.into_cause().to_string())
    }
}
