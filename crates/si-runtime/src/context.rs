use std::sync::Arc;

use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use si_core::{ScriptFailure, ScriptValue};

use crate::helpers::rhai_bridge::{dynamic_to_script_value, script_value_to_dynamic};
use crate::host::{
    register_host_handle, ClassContext, HostHandle, Importer, StandardResolver,
};

/// One engine instance handed to a single dispatched action.
pub struct ExecutionContext {
    engine: Engine,
    class_context: Option<ClassContext>,
}

impl ExecutionContext {
    /// Wraps `engine`, registering the host handle type on it.
    pub fn new(mut engine: Engine) -> Self {
        register_host_handle(&mut engine);
        Self {
            engine,
            class_context: None,
        }
    }

    pub fn set_class_context(&mut self, class_context: ClassContext) {
        self.class_context = Some(class_context);
    }

    /// Importer backed by the bound class context, or the standard namespaces.
    pub fn importer(&self) -> Importer {
        match &self.class_context {
            Some(class_context) => Importer::new(Arc::clone(class_context)),
            None => Importer::new(Arc::new(StandardResolver)),
        }
    }

    pub fn compile(&self, source: &str, label: &str) -> Result<AST, ScriptFailure> {
        let mut ast = self
            .engine
            .compile(source)
            .map_err(|error| ScriptFailure::Compile {
                message: error.0.to_string(),
                position: error.1.to_string(),
            })?;
        ast.set_source(label);
        Ok(ast)
    }

    /// A fresh top-level scope, optionally layered over an importer.
    pub fn new_scope(&mut self, parent: Option<&Importer>) -> Scope<'static> {
        if let Some(importer) = parent {
            importer.install(&mut self.engine);
        }
        Scope::new()
    }

    /// Any name is accepted, even one the script has no syntax to reference.
    pub fn bind(&self, scope: &mut Scope<'static>, name: &str, value: &ScriptValue) {
        scope.push_dynamic(name.to_string(), script_value_to_dynamic(value));
    }

    /// Reads `name` from the scope; `Undefined` if the script never defined it.
    pub fn lookup(&self, scope: &Scope<'static>, name: &str) -> Result<ScriptValue, ScriptFailure> {
        let Some(raw) = scope.get_value::<Dynamic>(name) else {
            return Ok(ScriptValue::Undefined);
        };
        unwrap_raw(raw).map_err(|failure| match failure {
            ScriptFailure::Conversion { type_name, .. } => ScriptFailure::Conversion {
                name: Some(name.to_string()),
                type_name,
            },
            other => other,
        })
    }

    pub fn execute(&self, ast: &AST, scope: &mut Scope<'static>) -> Result<Dynamic, ScriptFailure> {
        self.engine
            .eval_ast_with_scope::<Dynamic>(scope, ast)
            .map_err(runtime_failure)
    }
}

/// Identity unless `raw` is a host handle, in which case its boxed value.
pub fn unwrap_raw(raw: Dynamic) -> Result<ScriptValue, ScriptFailure> {
    if raw.is::<HostHandle>() {
        return Ok(raw.cast::<HostHandle>().into_value());
    }
    dynamic_to_script_value(raw)
}

fn runtime_failure(error: Box<EvalAltResult>) -> ScriptFailure {
    ScriptFailure::Runtime {
        message: error.to_string(),
        thrown: thrown_value(&error),
    }
}

/// The value given to `throw`, looking through function and module frames.
fn thrown_value(error: &EvalAltResult) -> Option<ScriptValue> {
    match error {
        EvalAltResult::ErrorRuntime(value, _) => dynamic_to_script_value(value.clone()).ok(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => thrown_value(inner),
        _ => None,
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Engine::new())
    }

    #[test]
    fn compile_errors_carry_position() {
        let context = context();
        let error = context
            .compile("let x = ;", "<test>")
            .expect_err("syntax error");
        let ScriptFailure::Compile { position, .. } = error else {
            panic!("expected compile failure");
        };
        assert!(position.contains("line 1"));
    }

    #[test]
    fn bind_then_lookup_reads_back_values() {
        let mut context = context();
        let mut scope = context.new_scope(None);
        context.bind(&mut scope, "you", &ScriptValue::from("Fred"));
        assert_eq!(
            context.lookup(&scope, "you").expect("lookup"),
            ScriptValue::from("Fred")
        );
        assert_eq!(
            context.lookup(&scope, "missing").expect("lookup"),
            ScriptValue::Undefined
        );
    }

    #[test]
    fn bind_accepts_names_scripts_cannot_reference() {
        let mut context = context();
        let mut scope = context.new_scope(None);
        for name in ["a-b", "a b", "1st"] {
            context.bind(&mut scope, name, &ScriptValue::Int(1));
        }
        assert_eq!(
            context.lookup(&scope, "a-b").expect("lookup"),
            ScriptValue::Int(1)
        );
        let ast = context.compile("2", "<test>").expect("compile");
        let raw = context.execute(&ast, &mut scope).expect("execute");
        assert_eq!(unwrap_raw(raw).expect("value"), ScriptValue::Int(2));
    }

    #[test]
    fn lookup_names_the_variable_on_conversion_failure() {
        let mut context = context();
        let mut scope = context.new_scope(None);
        let ast = context
            .compile("let f = |x| x + 1;", "<test>")
            .expect("compile");
        context.execute(&ast, &mut scope).expect("execute");
        let error = context.lookup(&scope, "f").expect_err("closure");
        assert!(matches!(
            error,
            ScriptFailure::Conversion { name: Some(ref name), .. } if name == "f"
        ));
    }

    #[test]
    fn thrown_values_are_kept() {
        let mut context = context();
        let mut scope = context.new_scope(None);
        let ast = context.compile(r#"throw "foo";"#, "<test>").expect("compile");
        let error = context.execute(&ast, &mut scope).expect_err("throw");
        let ScriptFailure::Runtime { message, thrown } = error else {
            panic!("expected runtime failure");
        };
        assert!(message.contains("foo"));
        assert_eq!(thrown, Some(ScriptValue::from("foo")));
    }

    #[test]
    fn thrown_values_are_kept_through_function_calls() {
        let mut context = context();
        let mut scope = context.new_scope(None);
        let ast = context
            .compile(r#"fn f() { throw "foo"; } f()"#, "<test>")
            .expect("compile");
        let error = context.execute(&ast, &mut scope).expect_err("throw");
        let ScriptFailure::Runtime { thrown, .. } = error else {
            panic!("expected runtime failure");
        };
        assert_eq!(thrown, Some(ScriptValue::from("foo")));

        let ast = context
            .compile(r#"let g = |x| { throw x; }; g.call(7)"#, "<test>")
            .expect("compile");
        let error = context.execute(&ast, &mut scope).expect_err("throw");
        let ScriptFailure::Runtime { thrown, .. } = error else {
            panic!("expected runtime failure");
        };
        assert_eq!(thrown, Some(ScriptValue::Int(7)));
    }

    #[test]
    fn unwrap_raw_only_touches_host_handles() {
        assert_eq!(
            unwrap_raw(Dynamic::from(HostHandle::new(ScriptValue::Int(2)))).expect("handle"),
            ScriptValue::Int(2)
        );
        assert_eq!(
            unwrap_raw(Dynamic::from_int(2)).expect("plain"),
            ScriptValue::Int(2)
        );
    }

    #[test]
    fn class_context_switches_the_importer() {
        struct Empty;
        impl crate::host::HostResolver for Empty {
            fn namespaces(&self) -> Vec<(String, rhai::Module)> {
                Vec::new()
            }
        }

        let mut context = context();
        context.set_class_context(Arc::new(Empty));
        let importer = context.importer();
        let mut scope = context.new_scope(Some(&importer));
        let ast = context
            .compile(r#"text::join(["a"], ",")"#, "<test>")
            .expect("compile");
        assert!(context.execute(&ast, &mut scope).is_err());
    }
}
