use std::sync::{Arc, OnceLock};

use regex::Regex;
use rhai::module_resolvers::StaticModuleResolver;
use rhai::{
    Array, Blob, Dynamic, Engine, EvalAltResult, ImmutableString, Module, Position, Shared,
    INT,
};
use si_core::ScriptValue;

use crate::helpers::rhai_bridge::{dynamic_to_text, script_value_to_dynamic};

/// A host value boxed for the engine. Results and outputs holding one are
/// unwrapped before the caller sees them.
#[derive(Debug, Clone, PartialEq)]
pub struct HostHandle {
    value: ScriptValue,
}

impl HostHandle {
    pub fn new(value: ScriptValue) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &ScriptValue {
        &self.value
    }

    pub fn into_value(self) -> ScriptValue {
        self.value
    }
}

pub(crate) fn register_host_handle(engine: &mut Engine) {
    engine
        .register_type_with_name::<HostHandle>("HostHandle")
        .register_get("value", |handle: &mut HostHandle| {
            script_value_to_dynamic(handle.value())
        })
        .register_fn("to_string", |handle: &mut HostHandle| {
            handle.value().to_string()
        });
}

/// Supplies the host namespaces a script may reach through the importer.
pub trait HostResolver: Send + Sync {
    /// Modules registered as `name::function(...)`.
    fn namespaces(&self) -> Vec<(String, Module)>;

    /// Functions callable without a namespace prefix.
    fn prelude(&self) -> Option<Module> {
        None
    }
}

/// Alternate resolver bound to a single invocation.
pub type ClassContext = Arc<dyn HostResolver>;

/// Layer beneath the script scope that exposes host namespaces.
pub struct Importer {
    resolver: ClassContext,
}

impl Importer {
    pub fn new(resolver: ClassContext) -> Self {
        Self { resolver }
    }

    /// Namespaces are reachable both as `name::f()` and through
    /// `import "name" as alias;`. No other import path resolves.
    pub(crate) fn install(&self, engine: &mut Engine) {
        if let Some(prelude) = self.resolver.prelude() {
            engine.register_global_module(prelude.into());
        }
        let mut imports = StaticModuleResolver::new();
        for (name, module) in self.resolver.namespaces() {
            let shared: Shared<Module> = module.into();
            imports.insert(name.as_str(), (*shared).clone());
            engine.register_static_module(name, shared);
        }
        engine.set_module_resolver(imports);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResolver;

impl HostResolver for StandardResolver {
    fn namespaces(&self) -> Vec<(String, Module)> {
        vec![
            ("text".to_string(), text_module()),
            ("number".to_string(), number_module()),
            ("bytes".to_string(), bytes_module()),
        ]
    }

    fn prelude(&self) -> Option<Module> {
        let mut module = Module::new();
        register_format(&mut module);
        Some(module)
    }
}

fn text_module() -> Module {
    let mut module = Module::new();
    register_format(&mut module);
    module.set_native_fn("join", |items: Array, separator: ImmutableString| {
        let parts = items.iter().map(dynamic_to_text).collect::<Vec<_>>();
        Ok(parts.join(separator.as_str()))
    });
    module
}

fn number_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("parse", |text: ImmutableString| {
        parse_number(text.as_str()).map(HostHandle::new)
    });
    module
}

fn bytes_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("from_text", |text: ImmutableString| {
        Ok(Blob::from(text.as_bytes()))
    });
    module.set_native_fn("hex", |bytes: Blob| {
        Ok(bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>())
    });
    module
}

fn register_format(module: &mut Module) {
    module.set_native_fn("format", |pattern: ImmutableString, a: Dynamic| {
        format_host(pattern.as_str(), &[a])
    });
    module.set_native_fn(
        "format",
        |pattern: ImmutableString, a: Dynamic, b: Dynamic| format_host(pattern.as_str(), &[a, b]),
    );
    module.set_native_fn(
        "format",
        |pattern: ImmutableString, a: Dynamic, b: Dynamic, c: Dynamic| {
            format_host(pattern.as_str(), &[a, b, c])
        },
    );
    module.set_native_fn(
        "format",
        |pattern: ImmutableString, a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
            format_host(pattern.as_str(), &[a, b, c, d])
        },
    );
}

fn host_error(message: String) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message),
        Position::NONE,
    ))
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%([sd%])").expect("placeholder regex must compile"))
}

/// printf-style substitution supporting `%s`, `%d` and `%%`.
pub(crate) fn format_host(pattern: &str, args: &[Dynamic]) -> Result<String, Box<EvalAltResult>> {
    let mut output = String::with_capacity(pattern.len());
    let mut last_index = 0usize;
    let mut next_arg = 0usize;
    for captures in placeholder_regex().captures_iter(pattern) {
        let Some(full) = captures.get(0) else {
            continue;
        };
        output.push_str(&pattern[last_index..full.start()]);
        last_index = full.end();
        match &captures[1] {
            "%" => output.push('%'),
            "d" => {
                let arg = args.get(next_arg).ok_or_else(|| missing_argument(next_arg))?;
                if !arg.is::<INT>() {
                    return Err(host_error(format!(
                        "format argument {} must be an integer for %d, found {}.",
                        next_arg + 1,
                        arg.type_name()
                    )));
                }
                output.push_str(&dynamic_to_text(arg));
                next_arg += 1;
            }
            _ => {
                let arg = args.get(next_arg).ok_or_else(|| missing_argument(next_arg))?;
                output.push_str(&dynamic_to_text(arg));
                next_arg += 1;
            }
        }
    }
    output.push_str(&pattern[last_index..]);
    Ok(output)
}

fn missing_argument(index: usize) -> Box<EvalAltResult> {
    host_error(format!(
        "format expects at least {} argument(s) for its placeholders.",
        index + 1
    ))
}

fn parse_number(text: &str) -> Result<ScriptValue, Box<EvalAltResult>> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(ScriptValue::Int(value));
    }
    trimmed
        .parse::<f64>()
        .map(ScriptValue::Float)
        .map_err(|_| host_error(format!("\"{}\" is not a number.", text)))
}
