use super::*;

impl Interpreter {
    pub(crate) fn setup_json(&mut self) {
        let object_proto = self.realm.object_prototype;
        let json = self.create_object_with("JSON", Some(object_proto));
        self.define_methods(json, &[("parse", 2, json_parse), ("stringify", 3, json_stringify)]);
        self.define_global("JSON", JsValue::Object(json));
    }
}

// ============================================================================
// JSON.parse
// ============================================================================

struct JsonParser<'a> {
    text: &'a [u16],
    pos: usize,
}

impl JsonParser<'_> {
    fn peek(&self) -> Option<u16> {
        self.text.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(0x09 | 0x0A | 0x0D | 0x20)) {
            self.pos += 1;
        }
    }

    fn error(&self, interp: &mut Interpreter) -> JsValue {
        let message = match self.peek() {
            Some(u) => format!(
                "Unexpected token {} in JSON at position {}",
                char::from_u32(u32::from(u)).unwrap_or(char::REPLACEMENT_CHARACTER),
                self.pos
            ),
            None => "Unexpected end of JSON input".to_string(),
        };
        interp.syntax_error(&message)
    }

    fn expect(&mut self, interp: &mut Interpreter, c: u8) -> JsResult<()> {
        if self.peek() == Some(u16::from(c)) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(interp))
        }
    }

    fn parse_text(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        let v = self.parse_value(interp)?;
        self.skip_whitespace();
        if self.pos != self.text.len() {
            return Err(self.error(interp));
        }
        Ok(v)
    }

    fn parse_value(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            self.skip_whitespace();
            match self.peek().and_then(|u| char::from_u32(u32::from(u))) {
                Some('{') => self.parse_object(interp),
                Some('[') => self.parse_array(interp),
                Some('"') => Ok(JsValue::String(self.parse_string(interp)?)),
                Some('-' | '0'..='9') => self.parse_number(interp),
                Some('t') => self.parse_literal(interp, "true", JsValue::Boolean(true)),
                Some('f') => self.parse_literal(interp, "false", JsValue::Boolean(false)),
                Some('n') => self.parse_literal(interp, "null", JsValue::Null),
                _ => Err(self.error(interp)),
            }
        })
    }

    fn parse_literal(&mut self, interp: &mut Interpreter, word: &str, value: JsValue) -> JsResult<JsValue> {
        for b in word.bytes() {
            self.expect(interp, b)?;
        }
        Ok(value)
    }

    fn parse_object(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        self.expect(interp, b'{')?;
        let o = interp.create_object();
        self.skip_whitespace();
        if self.peek() == Some(u16::from(b'}')) {
            self.pos += 1;
            return Ok(JsValue::Object(o));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(u16::from(b'"')) {
                return Err(self.error(interp));
            }
            let key = self.parse_string(interp)?.to_property_key();
            self.skip_whitespace();
            self.expect(interp, b':')?;
            let value = self.parse_value(interp)?;
            interp.define_own_property(o, &key, PropertyDescriptor::data_default(value), false)?;
            self.skip_whitespace();
            match self.peek() {
                Some(0x2C) => self.pos += 1,
                Some(0x7D) => {
                    self.pos += 1;
                    return Ok(JsValue::Object(o));
                }
                _ => return Err(self.error(interp)),
            }
        }
    }

    fn parse_array(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        self.expect(interp, b'[')?;
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(u16::from(b']')) {
            self.pos += 1;
            return Ok(JsValue::Object(interp.create_array(values)));
        }
        loop {
            values.push(self.parse_value(interp)?);
            self.skip_whitespace();
            match self.peek() {
                Some(0x2C) => self.pos += 1,
                Some(0x5D) => {
                    self.pos += 1;
                    return Ok(JsValue::Object(interp.create_array(values)));
                }
                _ => return Err(self.error(interp)),
            }
        }
    }

    fn parse_string(&mut self, interp: &mut Interpreter) -> JsResult<JsString> {
        self.expect(interp, b'"')?;
        let mut units = Vec::new();
        loop {
            let Some(u) = self.peek() else {
                return Err(self.error(interp));
            };
            match u {
                0x22 => {
                    self.pos += 1;
                    return Ok(JsString::from_units(units));
                }
                0x5C => {
                    self.pos += 1;
                    let escaped = match self.peek().and_then(|e| u8::try_from(e).ok()) {
                        Some(b'"') => 0x22,
                        Some(b'\\') => 0x5C,
                        Some(b'/') => 0x2F,
                        Some(b'b') => 0x08,
                        Some(b'f') => 0x0C,
                        Some(b'n') => 0x0A,
                        Some(b'r') => 0x0D,
                        Some(b't') => 0x09,
                        Some(b'u') => {
                            let hex = self.text.get(self.pos + 1..self.pos + 5);
                            let Some(code) = hex.and_then(|h| {
                                h.iter().try_fold(0u16, |acc, &d| {
                                    char::from_u32(u32::from(d))?.to_digit(16).map(|d| acc * 16 + d as u16)
                                })
                            }) else {
                                return Err(self.error(interp));
                            };
                            self.pos += 4;
                            code
                        }
                        _ => return Err(self.error(interp)),
                    };
                    self.pos += 1;
                    units.push(escaped);
                }
                0x00..=0x1F => return Err(self.error(interp)),
                _ => {
                    self.pos += 1;
                    units.push(u);
                }
            }
        }
    }

    fn parse_number(&mut self, interp: &mut Interpreter) -> JsResult<JsValue> {
        let start = self.pos;
        let is_digit = |u: Option<u16>| u.is_some_and(|u| (0x30..=0x39).contains(&u));
        if self.peek() == Some(u16::from(b'-')) {
            self.pos += 1;
        }
        match self.peek() {
            Some(0x30) => self.pos += 1,
            u if is_digit(u) => {
                while is_digit(self.peek()) {
                    self.pos += 1;
                }
            }
            _ => return Err(self.error(interp)),
        }
        if self.peek() == Some(u16::from(b'.')) {
            self.pos += 1;
            if !is_digit(self.peek()) {
                return Err(self.error(interp));
            }
            while is_digit(self.peek()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(0x65 | 0x45)) {
            self.pos += 1;
            if matches!(self.peek(), Some(0x2B | 0x2D)) {
                self.pos += 1;
            }
            if !is_digit(self.peek()) {
                return Err(self.error(interp));
            }
            while is_digit(self.peek()) {
                self.pos += 1;
            }
        }
        let literal = String::from_utf16_lossy(&self.text[start..self.pos]);
        Ok(JsValue::Number(literal.parse().unwrap_or(f64::NAN)))
    }
}

fn json_parse(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let text = interp.to_js_string(&arg(args, 0))?;
    let unfiltered = JsonParser { text: &text.code_units, pos: 0 }.parse_text(interp)?;
    let reviver = arg(args, 1);
    if !interp.is_callable(&reviver) {
        return Ok(unfiltered);
    }
    let root = interp.create_object();
    interp.define_own_property(root, "", PropertyDescriptor::data_default(unfiltered), false)?;
    internalize(interp, &reviver, root, "")
}

/// Post-order walk calling `reviver` on every property of the parsed value.
/// An `undefined` result deletes the property.
fn internalize(interp: &mut Interpreter, reviver: &JsValue, holder: JsObject, name: &str) -> JsResult<JsValue> {
    let val = interp.get(holder, name)?;
    if let JsValue::Object(o) = val {
        let keys: Vec<String> = if interp.class_of(o) == "Array" {
            (0..interp.length_of(o)?).map(|i| i.to_string()).collect()
        } else {
            interp.enumerable_own_keys(o)
        };
        for key in keys {
            let element = stacker::maybe_grow(64 * 1024, 1024 * 1024, || internalize(interp, reviver, o, &key))?;
            if element.is_undefined() {
                interp.delete(o, &key, false)?;
            } else {
                interp.define_own_property(o, &key, PropertyDescriptor::data_default(element), false)?;
            }
        }
    }
    interp.call(reviver, JsValue::Object(holder), &[JsValue::string(name), val])
}

// ============================================================================
// JSON.stringify
// ============================================================================

struct Stringifier {
    /// Objects currently being serialized, for cycle detection.
    stack: Vec<JsObject>,
    indent: Vec<u16>,
    gap: Vec<u16>,
    property_list: Option<Vec<String>>,
    replacer: Option<JsValue>,
}

fn quote(units: &[u16], out: &mut Vec<u16>) {
    out.push(u16::from(b'"'));
    for &u in units {
        let escape = match u {
            0x22 => Some(b'"'),
            0x5C => Some(b'\\'),
            0x08 => Some(b'b'),
            0x0C => Some(b'f'),
            0x0A => Some(b'n'),
            0x0D => Some(b'r'),
            0x09 => Some(b't'),
            _ => None,
        };
        match escape {
            Some(e) => out.extend([u16::from(b'\\'), u16::from(e)]),
            None if u < 0x20 => out.extend(format!("\\u{u:04x}").encode_utf16()),
            None => out.push(u),
        }
    }
    out.push(u16::from(b'"'));
}

impl Stringifier {
    /// Serializes `holder[key]`, or `None` when the value has no JSON form.
    fn serialize_property(&mut self, interp: &mut Interpreter, key: &str, holder: JsObject) -> JsResult<Option<Vec<u16>>> {
        let mut value = interp.get(holder, key)?;
        if let JsValue::Object(o) = value {
            let to_json = interp.get(o, "toJSON")?;
            if interp.is_callable(&to_json) {
                value = interp.call(&to_json, value.clone(), &[JsValue::string(key)])?;
            }
        }
        if let Some(replacer) = self.replacer.clone() {
            value = interp.call(&replacer, JsValue::Object(holder), &[JsValue::string(key), value])?;
        }
        if let JsValue::Object(o) = value {
            match interp.class_of(o).as_str() {
                "Number" => value = JsValue::Number(interp.to_number(&value)?),
                "String" => value = JsValue::String(interp.to_js_string(&value)?),
                "Boolean" => {
                    value = interp.obj(o).borrow().primitive_value.clone().unwrap_or(JsValue::Boolean(false))
                }
                _ => {}
            }
        }
        let units = match &value {
            JsValue::Null => "null".encode_utf16().collect(),
            JsValue::Boolean(b) => b.to_string().encode_utf16().collect(),
            JsValue::String(s) => {
                let mut out = Vec::with_capacity(s.len() + 2);
                quote(&s.code_units, &mut out);
                out
            }
            JsValue::Number(n) if n.is_finite() => number_ops::to_string(*n).encode_utf16().collect(),
            JsValue::Number(_) => "null".encode_utf16().collect(),
            JsValue::Object(o) if !interp.is_callable(&value) => {
                let o = *o;
                stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
                    if interp.class_of(o) == "Array" {
                        self.serialize_array(interp, o)
                    } else {
                        self.serialize_object(interp, o)
                    }
                })?
            }
            _ => return Ok(None),
        };
        Ok(Some(units))
    }

    fn enter(&mut self, interp: &mut Interpreter, o: JsObject) -> JsResult<Vec<u16>> {
        if self.stack.contains(&o) {
            return Err(interp.type_error("Converting circular structure to JSON"));
        }
        self.stack.push(o);
        let stepback = self.indent.clone();
        self.indent.extend_from_slice(&self.gap);
        Ok(stepback)
    }

    fn leave(&mut self, stepback: Vec<u16>) {
        self.stack.pop();
        self.indent = stepback;
    }

    /// Joins `partial` between `open` and `close`, one member per line when
    /// a gap is set.
    fn wrap(&self, partial: Vec<Vec<u16>>, open: u8, close: u8, stepback: &[u16]) -> Vec<u16> {
        let mut out = vec![u16::from(open)];
        if !partial.is_empty() {
            let pretty = !self.gap.is_empty();
            for (i, member) in partial.into_iter().enumerate() {
                if i > 0 {
                    out.push(u16::from(b','));
                }
                if pretty {
                    out.push(u16::from(b'\n'));
                    out.extend_from_slice(&self.indent);
                }
                out.extend(member);
            }
            if pretty {
                out.push(u16::from(b'\n'));
                out.extend_from_slice(stepback);
            }
        }
        out.push(u16::from(close));
        out
    }

    fn serialize_object(&mut self, interp: &mut Interpreter, o: JsObject) -> JsResult<Vec<u16>> {
        let stepback = self.enter(interp, o)?;
        let keys = match &self.property_list {
            Some(list) => list.clone(),
            None => interp.enumerable_own_keys(o),
        };
        let mut partial = Vec::new();
        for key in keys {
            if let Some(value) = self.serialize_property(interp, &key, o)? {
                let mut member = Vec::new();
                quote(&JsString::from_property_key(&key).code_units, &mut member);
                member.push(u16::from(b':'));
                if !self.gap.is_empty() {
                    member.push(u16::from(b' '));
                }
                member.extend(value);
                partial.push(member);
            }
        }
        let out = self.wrap(partial, b'{', b'}', &stepback);
        self.leave(stepback);
        Ok(out)
    }

    fn serialize_array(&mut self, interp: &mut Interpreter, o: JsObject) -> JsResult<Vec<u16>> {
        let stepback = self.enter(interp, o)?;
        let len = interp.length_of(o)?;
        let mut partial = Vec::with_capacity(len as usize);
        for i in 0..len {
            let element = self.serialize_property(interp, &i.to_string(), o)?;
            partial.push(element.unwrap_or_else(|| "null".encode_utf16().collect()));
        }
        let out = self.wrap(partial, b'[', b']', &stepback);
        self.leave(stepback);
        Ok(out)
    }
}

fn json_stringify(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let value = arg(args, 0);
    let replacer = arg(args, 1);
    let mut space = arg(args, 2);

    let mut replacer_fn = None;
    let mut property_list = None;
    if let JsValue::Object(r) = replacer {
        if interp.is_callable(&replacer) {
            replacer_fn = Some(replacer.clone());
        } else if interp.class_of(r) == "Array" {
            let mut list: Vec<String> = Vec::new();
            for i in 0..interp.length_of(r)? {
                let v = interp.get(r, &i.to_string())?;
                let item = match &v {
                    JsValue::String(s) => Some(s.to_property_key()),
                    JsValue::Number(_) => Some(interp.to_property_key(&v)?),
                    JsValue::Object(o) if matches!(interp.class_of(*o).as_str(), "String" | "Number") => {
                        Some(interp.to_property_key(&v)?)
                    }
                    _ => None,
                };
                if let Some(item) = item
                    && !list.contains(&item)
                {
                    list.push(item);
                }
            }
            property_list = Some(list);
        }
    }

    if let JsValue::Object(o) = space {
        match interp.class_of(o).as_str() {
            "Number" => space = JsValue::Number(interp.to_number(&space)?),
            "String" => space = JsValue::String(interp.to_js_string(&space)?),
            _ => {}
        }
    }
    let gap = match &space {
        JsValue::Number(n) => {
            let width = to_integer(*n).clamp(0.0, 10.0) as usize;
            vec![u16::from(b' '); width]
        }
        JsValue::String(s) => s.code_units.iter().take(10).copied().collect(),
        _ => Vec::new(),
    };

    let wrapper = interp.create_object();
    interp.define_own_property(wrapper, "", PropertyDescriptor::data_default(value), false)?;
    let mut stringifier = Stringifier {
        stack: Vec::new(),
        indent: Vec::new(),
        gap,
        property_list,
        replacer: replacer_fn,
    };
    Ok(match stringifier.serialize_property(interp, "", wrapper)? {
        Some(units) => JsValue::String(JsString::from_units(units)),
        None => JsValue::Undefined,
    })
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn parse_values_and_structure() {
        assert_eq!(eval_str("JSON.parse(' [1, -2.5e1, true, null, \"a\\\\u0041\"] ').join('|')"), "1|-25|true||aA");
        assert_eq!(eval_str("var o = JSON.parse('{\"b\":1,\"a\":{\"c\":[]}}'); Object.keys(o).join() + o.a.c.length"), "b,a0");
        assert_eq!(eval_str("JSON.parse('{\"a\":1,\"a\":2}').a"), "2");
        assert_eq!(eval_str("JSON.parse('\"\\\\ud83d\\\\ude00\"').length"), "2");
        assert_eq!(eval_str("JSON.parse('{\"__proto__\": 1}').hasOwnProperty('__proto__')"), "true");
    }

    #[test]
    fn parse_rejects_non_json() {
        for text in [
            "''", "'{a:1}'", "'[1,]'", "'01'", "'1.'", "'.5'", "'+1'", "\"'x'\"", "'[1] x'",
            "'\"\\\\x\"'", "'\"\\t\"'", "'tru'", "'{\"a\" 1}'", "'NaN'",
        ] {
            assert_eq!(eval_err(&format!("JSON.parse({text})")), "SyntaxError", "{text}");
        }
    }

    #[test]
    fn reviver_walks_post_order() {
        assert_eq!(
            eval_str(
                "var seen = [];\
                 JSON.parse('{\"a\":[1,2],\"b\":{\"c\":3}}', function (k, v) { seen.push(k); return v; });\
                 seen.join()"
            ),
            "0,1,a,c,b,"
        );
        assert_eq!(
            eval_str(
                "var o = JSON.parse('{\"a\":1,\"b\":2}', function (k, v) { return k === 'a' ? undefined : v; });\
                 o.hasOwnProperty('a') + ':' + o.b"
            ),
            "false:2"
        );
        assert_eq!(eval_str("JSON.parse('[1,2]', function (k, v) { return typeof v === 'number' ? v * 10 : v; }).join()"), "10,20");
    }

    #[test]
    fn stringify_values() {
        assert_eq!(eval_str("JSON.stringify({a: [1, 'x', null, true], b: undefined, c: function () {}})"), "{\"a\":[1,\"x\",null,true]}");
        assert_eq!(eval_str("JSON.stringify([undefined, function () {}, NaN, -Infinity])"), "[null,null,null,null]");
        assert_eq!(eval_str("JSON.stringify('\\u0001\"\\\\\\n')"), "\"\\u0001\\\"\\\\\\n\"");
        assert_eq!(eval_str("String(JSON.stringify(undefined))"), "undefined");
        assert_eq!(eval_str("JSON.stringify(new Number(3)) + JSON.stringify(new String('s')) + JSON.stringify(new Boolean(false))"), "3\"s\"false");
        assert_eq!(eval_str("JSON.stringify({toJSON: function (k) { return 'key:' + k; }})"), "\"key:\"");
        assert_eq!(eval_str("JSON.stringify(new Date(0))"), "\"1970-01-01T00:00:00.000Z\"");
    }

    #[test]
    fn stringify_replacer_and_space() {
        assert_eq!(
            eval_str("JSON.stringify({a: 1, b: 2, c: 3}, function (k, v) { return k === 'b' ? undefined : v; })"),
            "{\"a\":1,\"c\":3}"
        );
        assert_eq!(eval_str("JSON.stringify({a: 1, b: 2, 1: 3}, ['b', 1, 'b'])"), "{\"b\":2,\"1\":3}");
        assert_eq!(eval_str("JSON.stringify({a: [1]}, null, 2)"), "{\n  \"a\": [\n    1\n  ]\n}");
        assert_eq!(eval_str("JSON.stringify([1], null, 20)"), "[\n          1\n]");
        assert_eq!(eval_str("JSON.stringify([1], null, 'abcdefghijkl')"), "[\nabcdefghij1\n]");
        assert_eq!(eval_str("JSON.stringify({}, null, 2) + JSON.stringify([], null, 2)"), "{}[]");
    }

    #[test]
    fn stringify_detects_cycles() {
        assert_eq!(eval_err("var a = []; a.push(a); JSON.stringify(a)"), "TypeError");
        assert_eq!(eval_err("var o = {}; o.self = {o: o}; JSON.stringify(o)"), "TypeError");
        assert_eq!(eval_str("var x = {}; JSON.stringify([x, x])"), "[{},{}]");
    }

    fn json_value() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            Just("null".to_string()),
            any::<bool>().prop_map(|b| b.to_string()),
            (-1_000_000i64..1_000_000).prop_map(|n| n.to_string()),
            "[a-z ]{0,8}".prop_map(|s| format!("\"{s}\"")),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(|v| format!("[{}]", v.join(","))),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|members| {
                    let mut seen = std::collections::HashSet::new();
                    let body: Vec<String> = members
                        .into_iter()
                        .filter(|(k, _)| seen.insert(k.clone()))
                        .map(|(k, v)| format!("\"{k}\":{v}"))
                        .collect();
                    format!("{{{}}}", body.join(","))
                }),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn stringify_inverts_parse(text in json_value()) {
            let script = format!("JSON.stringify(JSON.parse('{text}'))");
            prop_assert_eq!(eval_str(&script), text);
        }
    }
}
