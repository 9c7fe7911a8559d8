use super::*;

/// Native bodies per error kind, in `ErrorKind::ALL` order.
const ERROR_CONSTRUCTORS: [BuiltinFn; 7] = [
    |i, _, a| construct_error(i, ErrorKind::Error, a),
    |i, _, a| construct_error(i, ErrorKind::EvalError, a),
    |i, _, a| construct_error(i, ErrorKind::RangeError, a),
    |i, _, a| construct_error(i, ErrorKind::ReferenceError, a),
    |i, _, a| construct_error(i, ErrorKind::SyntaxError, a),
    |i, _, a| construct_error(i, ErrorKind::TypeError, a),
    |i, _, a| construct_error(i, ErrorKind::URIError, a),
];

impl Interpreter {
    pub(crate) fn setup_errors(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut base = object_proto;
        for (kind, body) in ErrorKind::ALL.into_iter().zip(ERROR_CONSTRUCTORS) {
            let parent = if kind == ErrorKind::Error { object_proto } else { base };
            let proto = self.create_object_with("Error", Some(parent));
            self.insert_builtin(proto, "name", JsValue::string(kind.name()));
            self.insert_builtin(proto, "message", JsValue::string(""));
            if kind == ErrorKind::Error {
                base = proto;
                self.define_methods(proto, &[("toString", 0, error_proto_to_string)]);
            }
            self.realm.error_prototypes[kind as usize] = proto;
            let ctor = self.native_constructor(kind.name(), 1, body, body, proto);
            self.define_global(kind.name(), JsValue::Object(ctor));
        }
    }
}

/// `Error(message)` and `new Error(message)` behave the same.
fn construct_error(interp: &mut Interpreter, kind: ErrorKind, args: &[JsValue]) -> JsResult<JsValue> {
    let proto = interp.realm.error_prototypes[kind as usize];
    let o = interp.create_object_with("Error", Some(proto));
    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_js_string(&message)?;
        interp.insert_builtin(o, "message", JsValue::String(message));
    }
    Ok(JsValue::Object(o))
}

fn error_proto_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let Some(o) = this.as_object() else {
        return Err(interp.type_error("Error.prototype.toString called on non-object"));
    };
    let name = match interp.get(o, "name")? {
        JsValue::Undefined => JsString::from_str("Error"),
        v => interp.to_js_string(&v)?,
    };
    let message = match interp.get(o, "message")? {
        JsValue::Undefined => JsString::default(),
        v => interp.to_js_string(&v)?,
    };
    if name.is_empty() {
        return Ok(JsValue::String(message));
    }
    if message.is_empty() {
        return Ok(JsValue::String(name));
    }
    Ok(JsValue::String(name.concat(&JsString::from_str(": ")).concat(&message)))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn constructors_with_and_without_new() {
        assert_eq!(eval_str("new Error('boom').message"), "boom");
        assert_eq!(eval_str("TypeError('x') instanceof TypeError"), "true");
        assert_eq!(eval_str("new RangeError() instanceof Error"), "true");
        assert_eq!(eval_str("new Error().hasOwnProperty('message')"), "false");
        assert_eq!(eval_str("new URIError(42).message === '42'"), "true");
        assert_eq!(eval_str("Object.prototype.toString.call(new SyntaxError)"), "[object Error]");
    }

    #[test]
    fn prototype_chain_and_names() {
        assert_eq!(eval_str("EvalError.prototype.name"), "EvalError");
        assert_eq!(
            eval_str("Object.getPrototypeOf(ReferenceError.prototype) === Error.prototype"),
            "true"
        );
        assert_eq!(eval_str("TypeError.prototype.constructor === TypeError"), "true");
        assert_eq!(eval_str("Error.length"), "1");
        assert_eq!(eval_str("Object.keys(new Error('m')).length"), "0");
    }

    #[test]
    fn to_string_joins_name_and_message() {
        assert_eq!(eval_str("String(new TypeError('bad'))"), "TypeError: bad");
        assert_eq!(eval_str("String(new Error())"), "Error");
        assert_eq!(eval_str("var e = new Error('m'); e.name = ''; e.toString()"), "m");
        assert_eq!(
            eval_str("Error.prototype.toString.call({name: undefined, message: 'q'})"),
            "Error: q"
        );
        assert_eq!(eval_err("Error.prototype.toString.call(1)"), "TypeError");
    }

    #[test]
    fn internal_errors_use_the_realm_prototypes() {
        assert_eq!(
            eval_str("try { null.x } catch (e) { (e instanceof TypeError) + ':' + e.name }"),
            "true:TypeError"
        );
        assert_eq!(eval_str("try { undefinedName } catch (e) { e.constructor === ReferenceError }"), "true");
    }
}
