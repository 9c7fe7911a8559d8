use super::*;
use crate::regexp::{Captures, Regex};

impl Interpreter {
    pub(crate) fn setup_regexp(&mut self) {
        let object_proto = self.realm.object_prototype;
        let proto = self.alloc(JsObjectData::with_class("RegExp", Some(object_proto)));
        self.realm.regexp_prototype = proto;
        if let Ok(empty) = Regex::new(&[], "") {
            self.init_regexp_object(proto, empty);
        }

        let ctor = self.native_constructor("RegExp", 2, regexp_call, regexp_construct, proto);
        self.define_methods(
            proto,
            &[
                ("exec", 1, regexp_proto_exec),
                ("test", 1, regexp_proto_test),
                ("toString", 0, regexp_proto_to_string),
            ],
        );
        self.define_global("RegExp", JsValue::Object(ctor));
    }

    fn init_regexp_object(&mut self, o: JsObject, re: Regex) {
        let flags = re.flags();
        let source = JsString::from_units(re.source().to_vec());
        let rc = self.obj(o);
        let mut data = rc.borrow_mut();
        data.insert_constant("source".to_string(), JsValue::String(source));
        data.insert_constant("global".to_string(), JsValue::Boolean(flags.global));
        data.insert_constant("ignoreCase".to_string(), JsValue::Boolean(flags.ignore_case));
        data.insert_constant("multiline".to_string(), JsValue::Boolean(flags.multiline));
        data.insert_property(
            "lastIndex".to_string(),
            PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
        );
        data.regexp = Some(Rc::new(re));
    }

    /// A new RegExp object; pattern or flag errors become a SyntaxError.
    pub(crate) fn create_regexp(&mut self, pattern: &[u16], flags: &str) -> JsResult<JsObject> {
        let re = match Regex::new(pattern, flags) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!(error = %e, "regexp compile failed");
                return Err(self.syntax_error(&e.to_string()));
            }
        };
        let proto = self.realm.regexp_prototype;
        let o = self.create_object_with("RegExp", Some(proto));
        self.init_regexp_object(o, re);
        Ok(o)
    }

    /// The compiled matcher behind a RegExp object.
    pub(crate) fn regexp_of(&self, v: &JsValue) -> Option<(JsObject, Rc<Regex>)> {
        let JsValue::Object(o) = v else {
            return None;
        };
        let re = self.obj(*o).borrow().regexp.clone()?;
        Some((*o, re))
    }

    fn this_regexp(&mut self, this: &JsValue, method: &str) -> JsResult<(JsObject, Rc<Regex>)> {
        match self.regexp_of(this) {
            Some(r) => Ok(r),
            None => Err(self.type_error(&format!(
                "RegExp.prototype.{method} called on incompatible receiver"
            ))),
        }
    }

    /// A RegExp object for `v`: itself when it already is one, else compiled
    /// from `ToString(v)` (`undefined` is the empty pattern).
    pub(crate) fn coerce_to_regexp(&mut self, v: &JsValue) -> JsResult<(JsObject, Rc<Regex>)> {
        if let Some(r) = self.regexp_of(v) {
            return Ok(r);
        }
        let pattern = match v {
            JsValue::Undefined => JsString::default(),
            v => self.to_js_string(v)?,
        };
        let o = self.create_regexp(&pattern.code_units, "")?;
        self.this_regexp(&JsValue::Object(o), "exec")
    }

    /// The array `exec` returns for a successful match.
    pub(crate) fn match_result(&mut self, caps: &Captures, input: &JsString) -> JsObject {
        let values = caps
            .iter()
            .map(|c| match c {
                Some((s, e)) => JsValue::String(input.slice_utf16(*s, *e)),
                None => JsValue::Undefined,
            })
            .collect();
        let a = self.create_array(values);
        let index = caps.first().and_then(|c| *c).map_or(0, |(s, _)| s);
        self.insert_property(
            a,
            "index",
            PropertyDescriptor::data_default(JsValue::Number(index as f64)),
        );
        self.insert_property(
            a,
            "input",
            PropertyDescriptor::data_default(JsValue::String(input.clone())),
        );
        a
    }

    /// `RegExp.prototype.exec` on an already converted input.
    pub(crate) fn regexp_exec(&mut self, r: JsObject, re: &Regex, s: &JsString) -> JsResult<Option<Captures>> {
        let last_index = self.get(r, "lastIndex")?;
        let last_index = self.to_integer_value(&last_index)?;
        let global = re.flags().global;
        let i = if global { last_index } else { 0.0 };
        let found = if i < 0.0 || i > s.len() as f64 {
            None
        } else {
            re.find_from(&s.code_units, i as usize)
        };
        let Some(caps) = found else {
            self.put(r, "lastIndex", JsValue::Number(0.0), true)?;
            return Ok(None);
        };
        if global {
            let end = caps.first().and_then(|c| *c).map_or(0, |(_, e)| e);
            self.put(r, "lastIndex", JsValue::Number(end as f64), true)?;
        }
        Ok(Some(caps))
    }
}

fn regexp_construct(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let pattern = arg(args, 0);
    let flags = arg(args, 1);
    let (units, flags) = if let Some((_, re)) = interp.regexp_of(&pattern) {
        if !flags.is_undefined() {
            return Err(interp.type_error("Cannot supply flags when constructing one RegExp from another"));
        }
        (re.pattern().to_vec(), re.flags().to_string())
    } else {
        let units = match pattern {
            JsValue::Undefined => Vec::new(),
            p => interp.to_js_string(&p)?.code_units,
        };
        let flags = match flags {
            JsValue::Undefined => String::new(),
            f => interp.to_js_string(&f)?.to_rust_string(),
        };
        (units, flags)
    };
    Ok(JsValue::Object(interp.create_regexp(&units, &flags)?))
}

fn regexp_call(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let pattern = arg(args, 0);
    if interp.regexp_of(&pattern).is_some() && arg(args, 1).is_undefined() {
        return Ok(pattern);
    }
    regexp_construct(interp, this, args)
}

fn regexp_proto_exec(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (r, re) = interp.this_regexp(this, "exec")?;
    let s = interp.to_js_string(&arg(args, 0))?;
    match interp.regexp_exec(r, &re, &s)? {
        Some(caps) => Ok(JsValue::Object(interp.match_result(&caps, &s))),
        None => Ok(JsValue::Null),
    }
}

fn regexp_proto_test(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (r, re) = interp.this_regexp(this, "test")?;
    let s = interp.to_js_string(&arg(args, 0))?;
    Ok(JsValue::Boolean(interp.regexp_exec(r, &re, &s)?.is_some()))
}

fn regexp_proto_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let (_, re) = interp.this_regexp(this, "toString")?;
    let mut units = vec![u16::from(b'/')];
    units.extend_from_slice(re.source());
    units.push(u16::from(b'/'));
    units.extend(re.flags().to_string().encode_utf16());
    Ok(JsValue::String(JsString::from_units(units)))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exec_builds_capture_arrays() {
        assert_eq!(
            eval_str("var m = /(a|ab)(c|bcd)(d*)/.exec('abcd'); m.join('|') + ':' + m.index + ':' + m.input"),
            "abcd|a|bcd|:0:abcd"
        );
        assert_eq!(eval_str("/(x)?y/.exec('y')[1]"), "undefined");
        assert_eq!(eval_str("/z/.exec('abc')"), "null");
        assert_eq!(eval_str("/b/.exec('abc').index"), "1");
    }

    #[test]
    fn global_exec_tracks_last_index() {
        assert_eq!(
            eval_str(
                "var re = /o/g, s = 'foo boo', out = [];\
                 while (re.exec(s)) out.push(re.lastIndex);\
                 out.join() + ':' + re.lastIndex"
            ),
            "2,3,6,7:0"
        );
        assert_eq!(eval_str("var re = /a/; re.lastIndex = 5; re.test('a') + ':' + re.lastIndex"), "true:5");
        assert_eq!(eval_str("var re = /a/g; re.lastIndex = 9; re.test('a') + ':' + re.lastIndex"), "false:0");
    }

    #[test]
    fn constructor_and_instance_properties() {
        assert_eq!(eval_str("new RegExp('a/b', 'gi').toString()"), "/a\\/b/gi");
        assert_eq!(eval_str("RegExp().source"), "(?:)");
        assert_eq!(eval_str("var r = /x/m; RegExp(r) === r"), "true");
        assert_eq!(eval_str("var r = /x/m; var c = new RegExp(r); c !== r && c.multiline"), "true");
        assert_eq!(eval_err("new RegExp(/x/, 'g')"), "TypeError");
        assert_eq!(eval_err("new RegExp('(')"), "SyntaxError");
        assert_eq!(eval_err("new RegExp('a', 'gg')"), "SyntaxError");
        assert_eq!(eval_str("var r = /x/g; r.global = false; r.global"), "true");
        assert_eq!(eval_str("Object.prototype.toString.call(RegExp.prototype)"), "[object RegExp]");
    }

    #[test]
    fn catastrophic_pattern_terminates() {
        assert_eq!(eval_str("/^(a+)+$/.test('aaaaaaaaaaaa!')"), "false");
    }

    #[test]
    fn exec_requires_a_regexp() {
        assert_eq!(eval_err("RegExp.prototype.exec.call({}, 'a')"), "TypeError");
    }
}
