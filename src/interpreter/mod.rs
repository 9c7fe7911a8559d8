/// Evaluates `$e` (a `JsResult`) inside a function returning `Completion`,
/// turning an error into a throw completion.
macro_rules! js_try {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return $crate::interpreter::Completion::Throw(e),
        }
    };
}

mod builtins;
mod environment;
mod eval;
mod exec;
mod function;
mod gc;
mod helpers;
mod object;
pub(crate) mod types;

use crate::EngineConfig;
use crate::ast::*;
use crate::types::{JsObject, JsString, JsValue, number_ops};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) use environment::Reference;
pub(crate) use helpers::*;
pub use types::{Completion, JsResult};
pub(crate) use types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    URIError,
}

impl ErrorKind {
    pub(crate) const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::URIError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::URIError => "URIError",
        }
    }
}

/// The realm's built-in objects the evaluator refers to directly.
#[derive(Debug, Default)]
pub(crate) struct Intrinsics {
    pub object_prototype: JsObject,
    pub function_prototype: JsObject,
    pub array_prototype: JsObject,
    pub string_prototype: JsObject,
    pub boolean_prototype: JsObject,
    pub number_prototype: JsObject,
    pub date_prototype: JsObject,
    pub regexp_prototype: JsObject,
    /// Indexed by `ErrorKind as usize`.
    pub error_prototypes: [JsObject; 7],
    pub throw_type_error: JsObject,
    pub eval_function: JsObject,
    pub global_object: JsObject,
}

#[derive(Debug, Clone)]
pub(crate) struct ExecutionContext {
    pub lexical_env: EnvRef,
    pub variable_env: EnvRef,
    pub this_value: JsValue,
    pub strict: bool,
}

pub struct Interpreter {
    objects: Vec<Option<Rc<RefCell<JsObjectData>>>>,
    free_list: Vec<usize>,
    gc_alloc_count: usize,
    pub(crate) realm: Intrinsics,
    global_env: EnvRef,
    contexts: Vec<ExecutionContext>,
    call_depth: usize,
    config: EngineConfig,
    /// Values held by statement-level Rust frames across a collection point.
    gc_temp_roots: Vec<JsValue>,
    /// The result (or thrown value) of the latest host evaluation.
    host_roots: FxHashSet<JsObject>,
    /// Values the embedder asked to keep across evaluations.
    kept_roots: FxHashSet<JsObject>,
}

impl Interpreter {
    pub fn new(config: EngineConfig) -> Self {
        let mut interp = Self {
            objects: Vec::new(),
            free_list: Vec::new(),
            gc_alloc_count: 0,
            realm: Intrinsics::default(),
            global_env: Environment::new_declarative(None),
            contexts: Vec::new(),
            call_depth: 0,
            config,
            gc_temp_roots: Vec::new(),
            host_roots: FxHashSet::default(),
            kept_roots: FxHashSet::default(),
        };
        interp.setup_globals();
        interp.gc_temp_roots.clear();
        interp
    }

    /// The record behind a handle. A dangling handle is an interpreter bug.
    pub(crate) fn obj(&self, o: JsObject) -> Rc<RefCell<JsObjectData>> {
        match self.objects.get(o.id as usize) {
            Some(Some(rc)) => rc.clone(),
            _ => panic!("dangling object handle {}", o.id),
        }
    }

    pub(crate) fn class_of(&self, o: JsObject) -> String {
        self.obj(o).borrow().class_name.clone()
    }

    pub(crate) fn is_class(&self, v: &JsValue, class: &str) -> bool {
        match v {
            JsValue::Object(o) => self.obj(*o).borrow().class_name == class,
            _ => false,
        }
    }

    pub(crate) fn global_env(&self) -> EnvRef {
        self.global_env.clone()
    }

    // ========================================================================
    // Execution contexts
    // ========================================================================

    pub(crate) fn ctx(&self) -> &ExecutionContext {
        match self.contexts.last() {
            Some(c) => c,
            None => panic!("no running execution context"),
        }
    }

    pub(crate) fn ctx_mut(&mut self) -> &mut ExecutionContext {
        match self.contexts.last_mut() {
            Some(c) => c,
            None => panic!("no running execution context"),
        }
    }

    pub(crate) fn lexical_env(&self) -> EnvRef {
        self.ctx().lexical_env.clone()
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.contexts.last().is_some_and(|c| c.strict)
    }

    /// Runs `f` with the running context's lexical environment replaced by
    /// `env`, restoring it on every exit path.
    pub(crate) fn with_lexical_env<T>(
        &mut self,
        env: EnvRef,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = std::mem::replace(&mut self.ctx_mut().lexical_env, env);
        let result = f(self);
        self.ctx_mut().lexical_env = saved;
        result
    }

    /// Counts a nested call; fails once `max_call_depth` calls are active.
    pub(crate) fn enter_call(&mut self) -> JsResult<()> {
        if self.call_depth >= self.config.max_call_depth {
            tracing::warn!(depth = self.call_depth, "call depth limit reached");
            return Err(self.create_error(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_call(&mut self) {
        self.call_depth -= 1;
    }

    // ========================================================================
    // Object creation
    // ========================================================================

    pub(crate) fn create_object_with(&mut self, class: &str, proto: Option<JsObject>) -> JsObject {
        self.alloc(JsObjectData::with_class(class, proto))
    }

    pub(crate) fn create_object(&mut self) -> JsObject {
        let proto = self.realm.object_prototype;
        self.create_object_with("Object", Some(proto))
    }

    pub(crate) fn create_array(&mut self, values: Vec<JsValue>) -> JsObject {
        let proto = self.realm.array_prototype;
        let mut data = JsObjectData::with_class("Array", Some(proto));
        let len = values.len();
        for (i, v) in values.into_iter().enumerate() {
            data.insert_value(i.to_string(), v);
        }
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(len as f64), true, false, false),
        );
        self.alloc(data)
    }

    /// A function object around `func` with the given `length`.
    pub(crate) fn create_function(&mut self, func: JsFunction, arity: usize) -> JsObject {
        let proto = self.realm.function_prototype;
        let mut data = JsObjectData::with_class("Function", Some(proto));
        data.callable = Some(func);
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(arity as f64), false, false, false),
        );
        self.alloc(data)
    }

    pub(crate) fn create_error(&mut self, kind: ErrorKind, message: &str) -> JsValue {
        let proto = self.realm.error_prototypes[kind as usize];
        let mut data = JsObjectData::with_class("Error", Some(proto));
        if !message.is_empty() {
            data.insert_builtin("message".to_string(), JsValue::string(message));
        }
        JsValue::Object(self.alloc(data))
    }

    pub(crate) fn type_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::TypeError, message)
    }

    pub(crate) fn range_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::RangeError, message)
    }

    pub(crate) fn reference_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::ReferenceError, message)
    }

    pub(crate) fn syntax_error(&mut self, message: &str) -> JsValue {
        self.create_error(ErrorKind::SyntaxError, message)
    }

    // ========================================================================
    // Programs
    // ========================================================================

    /// Runs global code in the global execution context.
    pub fn run(&mut self, program: &Program) -> Completion {
        let code = program.code.clone();
        let global = self.global_env.clone();
        self.contexts.push(ExecutionContext {
            lexical_env: global.clone(),
            variable_env: global.clone(),
            this_value: JsValue::Object(self.realm.global_object),
            strict: code.strict,
        });
        let result = match self.declaration_binding_instantiation(&code, None, &global, false) {
            Ok(()) => self.exec_statements(&code.body),
            Err(e) => Completion::Throw(e),
        };
        self.contexts.pop();
        self.gc_temp_roots.clear();
        result
    }

    /// Keeps `v` alive until the next host evaluation starts.
    pub(crate) fn pin_for_host(&mut self, v: &JsValue) {
        if let JsValue::Object(o) = v {
            self.host_roots.insert(*o);
        }
    }

    pub(crate) fn unpin_host_results(&mut self) {
        self.host_roots.clear();
    }

    pub(crate) fn keep_for_host(&mut self, v: &JsValue) {
        if let JsValue::Object(o) = v {
            self.kept_roots.insert(*o);
        }
    }

    pub(crate) fn release_for_host(&mut self, v: &JsValue) {
        if let JsValue::Object(o) = v {
            self.kept_roots.remove(o);
        }
    }

    /// Error name and message of a thrown value, read without running user code.
    pub(crate) fn describe_thrown(&self, v: &JsValue) -> (String, String) {
        let JsValue::Object(o) = v else {
            return (String::new(), self.display(v));
        };
        let read = |key: &str| -> Option<String> {
            let mut cur = Some(*o);
            while let Some(c) = cur {
                let data = self.obj(c);
                let data = data.borrow();
                if let Some(desc) = data.get_own_property(key) {
                    return match &desc.value {
                        Some(JsValue::String(s)) => Some(s.to_rust_string()),
                        _ => None,
                    };
                }
                cur = data.prototype;
            }
            None
        };
        match (read("name"), read("message")) {
            (Some(name), message) => (name, message.unwrap_or_default()),
            (None, _) => (String::new(), self.display(v)),
        }
    }

    /// Human-readable rendering of a value for the REPL and error reports. Never
    /// runs user code.
    pub fn display(&self, v: &JsValue) -> String {
        let mut seen = Vec::new();
        self.display_inner(v, &mut seen)
    }

    fn display_inner(&self, v: &JsValue, seen: &mut Vec<JsObject>) -> String {
        let JsValue::Object(o) = v else {
            return v.to_string();
        };
        if seen.contains(o) {
            return "[Circular]".to_string();
        }
        let data = self.obj(*o);
        let data = data.borrow();
        match data.class_name.as_str() {
            "Function" => match &data.callable {
                Some(JsFunction::User { def, .. }) => def.source_text.clone(),
                Some(JsFunction::Native { name, .. }) => {
                    format!("function {name}() {{ [native code] }}")
                }
                _ => "function () { [native code] }".to_string(),
            },
            "Array" => {
                let len = match data.get_property_value("length") {
                    Some(JsValue::Number(n)) => n as usize,
                    _ => 0,
                };
                seen.push(*o);
                let mut parts = Vec::new();
                for i in 0..len.min(100) {
                    parts.push(match data.get_property_value(&i.to_string()) {
                        Some(JsValue::String(s)) => format!("{:?}", s.to_rust_string()),
                        Some(JsValue::Undefined) | None => String::new(),
                        Some(item) => self.display_inner(&item, seen),
                    });
                }
                seen.pop();
                if len > 100 {
                    parts.push("...".to_string());
                }
                format!("[{}]", parts.join(", "))
            }
            "Error" => {
                drop(data);
                let (name, message) = self.describe_thrown(v);
                if message.is_empty() {
                    name
                } else if name.is_empty() {
                    message
                } else {
                    format!("{name}: {message}")
                }
            }
            "String" | "Number" | "Boolean" => match &data.primitive_value {
                Some(p) => format!("[{} {}]", data.class_name, p),
                None => format!("[object {}]", data.class_name),
            },
            "Date" => match &data.primitive_value {
                Some(JsValue::Number(t)) => builtins::date_to_display_string(*t),
                _ => "Invalid Date".to_string(),
            },
            "RegExp" => match &data.regexp {
                Some(re) => format!(
                    "/{}/{}",
                    String::from_utf16_lossy(re.source()),
                    re.flags()
                ),
                None => "/(?:)/".to_string(),
            },
            "Object" => {
                seen.push(*o);
                let parts: Vec<String> = data
                    .property_order
                    .iter()
                    .filter_map(|k| {
                        let desc = data.properties.get(k)?;
                        if !desc.enumerable() {
                            return None;
                        }
                        Some(match &desc.value {
                            Some(JsValue::String(s)) => {
                                format!("{k}: {:?}", s.to_rust_string())
                            }
                            Some(item) => format!("{k}: {}", self.display_inner(item, seen)),
                            None => format!("{k}: [Getter/Setter]"),
                        })
                    })
                    .collect();
                seen.pop();
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join(", "))
                }
            }
            class => format!("[object {class}]"),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::parser::parse_script;

    /// Runs `src` in a fresh interpreter; `Err` holds the thrown value rendered
    /// as `Name: message`.
    pub(crate) fn eval_in(interp: &mut Interpreter, src: &str) -> Result<JsValue, String> {
        let program = parse_script(src).map_err(|e| e.to_string())?;
        match interp.run(&program) {
            Completion::Normal(v) => Ok(v.unwrap_or(JsValue::Undefined)),
            Completion::Throw(e) => Err(interp.display(&e)),
            other => panic!("unexpected completion {other:?}"),
        }
    }

    pub(crate) fn eval(src: &str) -> Result<JsValue, String> {
        let mut interp = Interpreter::new(EngineConfig::default());
        eval_in(&mut interp, src)
    }

    /// The completion value converted to a Rust string the way `String(v)` would.
    pub(crate) fn eval_str(src: &str) -> String {
        let mut interp = Interpreter::new(EngineConfig::default());
        let v = match eval_in(&mut interp, src) {
            Ok(v) => v,
            Err(e) => panic!("{src:?} threw {e}"),
        };
        match interp.to_js_string(&v) {
            Ok(s) => s.to_rust_string(),
            Err(e) => panic!("String() threw {}", interp.display(&e)),
        }
    }

    /// The name of the error thrown by `src`.
    pub(crate) fn eval_err(src: &str) -> String {
        match eval(src) {
            Ok(v) => panic!("{src:?} completed with {v}"),
            Err(e) => e.split(':').next().unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn closures_capture_environments() {
        assert_eq!(
            eval_str("var x = 1; function f(){ return x; } x = 2; f();"),
            "2"
        );
    }

    #[test]
    fn equality_ladder() {
        assert_eq!(eval_str("'' == 0"), "true");
        assert_eq!(eval_str("null == undefined"), "true");
        assert_eq!(eval_str("null == 0"), "false");
        assert_eq!(eval_str("[] == ''"), "true");
    }

    #[test]
    fn deep_recursion_is_catchable() {
        assert_eq!(
            eval_str(
                "function r(n) { return r(n + 1); }\
                 try { r(0); 'no' } catch (e) { e instanceof RangeError }"
            ),
            "true"
        );
        // the interpreter is usable afterwards
        assert_eq!(eval_str("function r(n) { return n ? r(n - 1) : 'done'; } r(500)"), "done");
    }

    #[test]
    fn uncaught_errors_render_name_and_message() {
        assert_eq!(
            eval("null.x").unwrap_err(),
            "TypeError: Cannot read property 'x' of null"
        );
        assert_eq!(eval_err("undefinedVariable"), "ReferenceError");
    }

    #[test]
    fn display_values() {
        let mut interp = Interpreter::new(EngineConfig::default());
        let v = eval_in(&mut interp, "[1, 'a', [2], {b: 3}]").unwrap();
        assert_eq!(interp.display(&v), "[1, \"a\", [2], { b: 3 }]");
        let v = eval_in(&mut interp, "var o = {}; o.self = o; o").unwrap();
        assert_eq!(interp.display(&v), "{ self: [Circular] }");
    }
}
