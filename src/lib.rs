//! An ES5 interpreter: a tree-walking evaluator over a prototype-based object
//! model, with the standard built-in library and its own regular expression
//! engine.

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod regexp;
pub mod types;

use interpreter::{Completion, Interpreter};
use parser::ParseError;
pub use types::JsValue;

/// Knobs for a single interpreter instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Nested calls allowed before a RangeError is thrown.
    pub max_call_depth: usize,
    /// Allocations between automatic collections; 0 disables them.
    pub gc_threshold: usize,
    /// Installs the web-compatibility extras (`escape`, `substr`, `getYear`, ...).
    pub annex_b: bool,
    /// Installs a global `print` writing to stdout.
    pub print: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            gc_threshold: 4096,
            annex_b: true,
            print: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("Uncaught {}", render_uncaught(.name, .message))]
    Uncaught {
        name: String,
        message: String,
        /// The thrown value itself; valid until the next `eval`.
        value: JsValue,
    },
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn render_uncaught(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{name}: {message}"),
    }
}

/// A script engine owning one realm. Successive `eval` calls share globals.
pub struct Engine {
    interp: Interpreter,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        tracing::debug!(?config, "creating engine");
        Self {
            interp: Interpreter::new(config),
        }
    }

    /// Runs `source` as global code and returns its completion value.
    ///
    /// An object result stays valid until the next call to `eval`; use
    /// [`Engine::keep`] to hold it longer.
    pub fn eval(&mut self, source: &str) -> Result<JsValue, EngineError> {
        self.interp.unpin_host_results();
        let program = parser::parse_script(source).inspect_err(|e| {
            tracing::debug!(error = %e, "parse failed");
        })?;
        tracing::debug!(bytes = source.len(), "script start");
        let completion = self.interp.run(&program);
        tracing::debug!(live_objects = self.interp.live_objects(), "script finish");
        match completion {
            Completion::Throw(value) => {
                self.interp.pin_for_host(&value);
                let (name, message) = self.interp.describe_thrown(&value);
                tracing::warn!(%name, %message, "uncaught exception");
                Err(EngineError::Uncaught { name, message, value })
            }
            Completion::Normal(v) => {
                let v = v.unwrap_or(JsValue::Undefined);
                self.interp.pin_for_host(&v);
                Ok(v)
            }
            // global code cannot return, break or continue past its own body
            other => panic!("abrupt completion {other:?} escaped global code"),
        }
    }

    /// Renders a value the way the REPL prints it, without running user code.
    pub fn display(&self, v: &JsValue) -> String {
        self.interp.display(v)
    }

    /// Keeps `v` alive across later evaluations until [`Engine::release`].
    pub fn keep(&mut self, v: &JsValue) {
        self.interp.keep_for_host(v);
    }

    pub fn release(&mut self, v: &JsValue) {
        self.interp.release_for_host(v);
    }

    /// Runs a full collection now; returns the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.interp.collect_garbage()
    }

    pub fn live_objects(&self) -> usize {
        self.interp.live_objects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn eval_display(engine: &mut Engine, src: &str) -> String {
        match engine.eval(src) {
            Ok(v) => engine.display(&v),
            Err(e) => panic!("{src:?} failed: {e}"),
        }
    }

    #[test]
    fn globals_persist_between_evals() {
        let mut engine = Engine::new();
        engine.eval("var counter = 40; function bump() { return ++counter; }").unwrap();
        engine.eval("bump()").unwrap();
        assert_eq!(eval_display(&mut engine, "bump()"), "42");
    }

    #[test]
    fn syntax_errors_are_reported_before_running() {
        let mut engine = Engine::new();
        let err = engine.eval("var ran = true; var = 1;").unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)), "{err}");
        assert!(err.to_string().starts_with("SyntaxError"));
        assert_eq!(eval_display(&mut engine, "typeof ran"), "undefined");
    }

    #[test]
    fn uncaught_throws_carry_name_message_and_value() {
        let mut engine = Engine::new();
        match engine.eval("throw new RangeError('too far')") {
            Err(EngineError::Uncaught { name, message, .. }) => {
                assert_eq!((name.as_str(), message.as_str()), ("RangeError", "too far"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = engine.eval("throw 7").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught 7");
        let err = engine.eval("null.f()").unwrap_err();
        assert!(err.to_string().starts_with("Uncaught TypeError: "), "{err}");
    }

    #[test]
    fn config_switches_annex_b_and_call_depth() {
        let mut engine = Engine::with_config(EngineConfig {
            annex_b: false,
            max_call_depth: 50,
            ..EngineConfig::default()
        });
        assert_eq!(eval_display(&mut engine, "typeof escape + typeof ''.substr"), "undefinedundefined");
        assert_eq!(
            eval_display(&mut engine, "function f(n) { return n ? f(n - 1) : 0; } try { f(100) } catch (e) { e.name }"),
            "RangeError"
        );
        assert_eq!(eval_display(&mut engine, "f(40)"), "0");
    }

    #[test]
    fn latest_result_survives_collection() {
        let mut engine = Engine::with_config(EngineConfig {
            gc_threshold: 0,
            ..EngineConfig::default()
        });
        let v = engine.eval("var junk = []; for (var i = 0; i < 50; i++) junk.push({}); junk = null; ({label: 'latest'})").unwrap();
        assert!(engine.collect_garbage() >= 50);
        assert_eq!(engine.display(&v), "{ label: \"latest\" }");
    }

    #[test]
    fn kept_values_outlive_later_evals() {
        let mut engine = Engine::with_config(EngineConfig {
            gc_threshold: 0,
            ..EngineConfig::default()
        });
        let v = engine.eval("({label: 'kept'})").unwrap();
        engine.keep(&v);
        engine.eval("var junk = []; for (var i = 0; i < 50; i++) junk.push({}); junk = null;").unwrap();
        assert!(engine.collect_garbage() >= 50);
        assert_eq!(engine.display(&v), "{ label: \"kept\" }");
        engine.release(&v);
        engine.eval("0").unwrap();
        assert!(engine.collect_garbage() >= 1);
    }

    #[test]
    fn repeated_evals_do_not_accumulate_results() {
        let mut engine = Engine::new();
        engine.eval("0").unwrap();
        engine.collect_garbage();
        let baseline = engine.live_objects();
        for _ in 0..1000 {
            engine.eval("({inner: {}})").unwrap();
        }
        let _ = engine.eval("throw {thrown: {}}");
        engine.collect_garbage();
        assert!(engine.live_objects() <= baseline + 2, "{} live, baseline {baseline}", engine.live_objects());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn number_to_string_round_trips(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
            let mut engine = Engine::new();
            let src = format!("var s = String({x:e}); Number(s) === {x:e} && String(Number(s)) === s");
            prop_assert_eq!(eval_display(&mut engine, &src), "true");
        }

        #[test]
        fn array_length_tracks_highest_index(indices in prop::collection::vec(0u32..10_000, 1..20)) {
            let mut engine = Engine::new();
            let writes: String = indices.iter().map(|i| format!("a[{i}] = {i};")).collect();
            let max = indices.iter().max().copied().unwrap_or(0);
            let src = format!("var a = []; {writes} a.length === {} && a[a.length - 1] === {max}", max + 1);
            prop_assert_eq!(eval_display(&mut engine, &src), "true");
        }
    }
}
