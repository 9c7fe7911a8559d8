use super::*;
use crate::parser::parse_function_constructor;

impl Interpreter {
    pub(crate) fn setup_function(&mut self) {
        let proto = self.realm.function_prototype;
        let ctor = self.native_constructor("Function", 1, function_construct, function_construct, proto);
        self.define_methods(
            proto,
            &[
                ("toString", 0, function_proto_to_string),
                ("apply", 2, function_proto_apply),
                ("call", 1, function_proto_call),
                ("bind", 1, function_proto_bind),
            ],
        );
        self.define_global("Function", JsValue::Object(ctor));
    }

    /// Elements `0..length` of an array-like, read through `[[Get]]`.
    pub(crate) fn list_from_array_like(&mut self, o: JsObject) -> JsResult<Vec<JsValue>> {
        let len = self.length_of(o)?;
        let mut out = Vec::with_capacity(len.min(1 << 16) as usize);
        for i in 0..len {
            out.push(self.get(o, &i.to_string())?);
        }
        Ok(out)
    }

    fn function_source(&self, f: JsObject) -> String {
        match &self.obj(f).borrow().callable {
            Some(JsFunction::User { def, .. }) => def.source_text.clone(),
            Some(JsFunction::Native { name, .. }) => format!("function {name}() {{ [native code] }}"),
            _ => "function () { [native code] }".to_string(),
        }
    }
}

fn function_construct(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (params, body) = match args.split_last() {
        None => (String::new(), String::new()),
        Some((body, params)) => {
            let mut names = Vec::with_capacity(params.len());
            for p in params {
                names.push(interp.to_js_string(p)?.to_rust_string());
            }
            (names.join(","), interp.to_js_string(body)?.to_rust_string())
        }
    };
    let def = match parse_function_constructor(&params, &body) {
        Ok(def) => def,
        Err(e) => return Err(interp.syntax_error(&e.message)),
    };
    let scope = interp.global_env();
    Ok(JsValue::Object(interp.instantiate_function(def, scope)))
}

fn this_function(interp: &mut Interpreter, this: &JsValue, method: &str) -> JsResult<JsObject> {
    match this {
        JsValue::Object(f) if interp.obj(*f).borrow().is_callable() => Ok(*f),
        _ => Err(interp.type_error(&format!(
            "Function.prototype.{method} called on incompatible receiver"
        ))),
    }
}

fn function_proto_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let f = this_function(interp, this, "toString")?;
    Ok(JsValue::string(&interp.function_source(f)))
}

fn function_proto_apply(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    this_function(interp, this, "apply")?;
    let call_args = match arg(args, 1) {
        JsValue::Undefined | JsValue::Null => Vec::new(),
        JsValue::Object(list) => interp.list_from_array_like(list)?,
        _ => return Err(interp.type_error("CreateListFromArrayLike called on non-object")),
    };
    interp.call(this, arg(args, 0), &call_args)
}

fn function_proto_call(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    this_function(interp, this, "call")?;
    let rest = args.get(1..).unwrap_or_default();
    interp.call(this, arg(args, 0), rest)
}

fn function_proto_bind(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = this_function(interp, this, "bind")?;
    let bound_args = args.get(1..).unwrap_or_default().to_vec();
    let f = interp.create_bound_function(target, arg(args, 0), bound_args)?;
    Ok(JsValue::Object(f))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn function_constructor_builds_global_closures() {
        assert_eq!(eval_str("new Function('a', 'b', 'return a + b')(2, 3)"), "5");
        assert_eq!(eval_str("Function('a, b', 'return a * b')(2, 3)"), "6");
        assert_eq!(eval_str("Function()()"), "undefined");
        assert_eq!(
            eval_str("var x = 'global'; (function() { var x = 'local'; return Function('return x')(); })()"),
            "global"
        );
        assert_eq!(eval_err("Function('a', 'return +')"), "SyntaxError");
        assert_eq!(eval_err("Function('a', 'a', '\"use strict\";')"), "SyntaxError");
    }

    #[test]
    fn to_string_uses_source_text() {
        assert_eq!(eval_str("(function  add(a,b) { return a+b; }).toString()"), "function  add(a,b) { return a+b; }");
        assert_eq!(eval_str("Math.max.toString()"), "function max() { [native code] }");
        assert_eq!(eval_err("Function.prototype.toString.call({})"), "TypeError");
    }

    #[test]
    fn apply_and_call() {
        assert_eq!(eval_str("Math.max.apply(null, [1, 5, 3])"), "5");
        assert_eq!(eval_str("Math.max.apply(null, {length: 2, 0: 7, 1: 4})"), "7");
        assert_eq!(eval_str("(function() { return arguments.length; }).apply(null)"), "0");
        assert_eq!(eval_err("Math.max.apply(null, 1)"), "TypeError");
        assert_eq!(eval_str("(function(a) { return this.v + a; }).call({v: 1}, 2)"), "3");
        assert_eq!(eval_str("(function() { 'use strict'; return this; }).call(5)"), "5");
        assert_eq!(eval_str("typeof (function() { return this; }).call(5)"), "object");
    }

    #[test]
    fn bind_partially_applies() {
        assert_eq!(
            eval_str("function f(a, b, c) { return [this.n, a, b, c].join(); } var g = f.bind({n: 0}, 1); g(2, 3) + '|' + g.length"),
            "0,1,2,3|2"
        );
        assert_eq!(
            eval_str("function P(x) { this.x = x; } var B = P.bind(null, 4); var p = new B(); p.x + ':' + (p instanceof P)"),
            "4:true"
        );
        assert_eq!(eval_err("Function.prototype.bind.call(1)"), "TypeError");
        assert_eq!(eval_err("Math.max.bind(null).caller"), "TypeError");
    }

    #[test]
    fn function_prototype_is_callable() {
        assert_eq!(eval_str("Function.prototype()"), "undefined");
        assert_eq!(eval_str("Function.prototype.length"), "0");
        assert_eq!(eval_str("typeof Function.prototype"), "function");
    }
}
