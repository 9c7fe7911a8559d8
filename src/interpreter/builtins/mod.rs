mod array;
mod date;
mod error;
mod function;
mod json;
mod math;
mod number;
mod object;
mod regexp;
mod string;

use super::*;

pub(crate) use date::date_to_display_string;

/// Body of a built-in function: `(interpreter, this, arguments)`.
pub(crate) type BuiltinFn = fn(&mut Interpreter, &JsValue, &[JsValue]) -> JsResult<JsValue>;

pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

impl Interpreter {
    pub(crate) fn native_function(&mut self, name: &str, arity: usize, f: BuiltinFn) -> JsObject {
        self.create_function(
            JsFunction::native(name, arity, move |interp, this, args| f(interp, this, args).into()),
            arity,
        )
    }

    /// Installs `methods` on `target` as writable, non-enumerable, configurable
    /// properties.
    pub(crate) fn define_methods(&mut self, target: JsObject, methods: &[(&str, usize, BuiltinFn)]) {
        for &(name, arity, f) in methods {
            let func = self.native_function(name, arity, f);
            self.insert_builtin(target, name, JsValue::Object(func));
        }
    }

    /// A constructor wired to `prototype` in both directions.
    pub(crate) fn native_constructor(
        &mut self,
        name: &str,
        arity: usize,
        call: BuiltinFn,
        construct: BuiltinFn,
        prototype: JsObject,
    ) -> JsObject {
        let f = self.create_function(
            JsFunction::native_constructor(
                name,
                arity,
                move |interp, this, args| call(interp, this, args).into(),
                move |interp, this, args| construct(interp, this, args).into(),
            ),
            arity,
        );
        self.insert_property(
            f,
            "prototype",
            PropertyDescriptor::data(JsValue::Object(prototype), false, false, false),
        );
        self.insert_builtin(prototype, "constructor", JsValue::Object(f));
        f
    }

    pub(crate) fn define_global(&mut self, name: &str, value: JsValue) {
        let global = self.realm.global_object;
        self.insert_builtin(global, name, value);
    }

    pub(crate) fn setup_globals(&mut self) {
        let object_prototype = self.alloc(JsObjectData::with_class("Object", None));
        self.realm.object_prototype = object_prototype;

        let mut function_prototype = JsObjectData::with_class("Function", Some(object_prototype));
        function_prototype.callable = Some(JsFunction::native("", 0, |_, _, _| {
            Completion::normal(JsValue::Undefined)
        }));
        function_prototype.insert_constant("length".to_string(), JsValue::Number(0.0));
        self.realm.function_prototype = self.alloc(function_prototype);

        let global = self.alloc(JsObjectData::with_class("global", Some(object_prototype)));
        self.realm.global_object = global;
        self.global_env = Environment::new_object(global, false, None);

        let thrower = self.native_function("", 0, |interp, _, _| {
            Err(interp.type_error(
                "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
            ))
        });
        self.obj(thrower).borrow_mut().extensible = false;
        self.realm.throw_type_error = thrower;

        self.setup_object();
        self.setup_function();
        self.setup_array();
        self.setup_string();
        self.setup_boolean();
        self.setup_number();
        self.setup_math();
        self.setup_date();
        self.setup_regexp();
        self.setup_errors();
        self.setup_json();
        self.setup_global_functions();
        tracing::debug!(objects = self.live_objects(), "realm initialised");
    }

    fn setup_global_functions(&mut self) {
        let global = self.realm.global_object;
        for (name, value) in [
            ("NaN", f64::NAN),
            ("Infinity", f64::INFINITY),
        ] {
            self.obj(global)
                .borrow_mut()
                .insert_constant(name.to_string(), JsValue::Number(value));
        }
        self.obj(global)
            .borrow_mut()
            .insert_constant("undefined".to_string(), JsValue::Undefined);

        let eval = self.native_function("eval", 1, |interp, _this, args| {
            interp.perform_eval(&arg(args, 0), false)
        });
        self.realm.eval_function = eval;
        self.define_global("eval", JsValue::Object(eval));

        self.define_methods(
            global,
            &[
                ("parseInt", 2, global_parse_int),
                ("parseFloat", 1, global_parse_float),
                ("isNaN", 1, global_is_nan),
                ("isFinite", 1, global_is_finite),
                ("encodeURI", 1, global_encode_uri),
                ("encodeURIComponent", 1, global_encode_uri_component),
                ("decodeURI", 1, global_decode_uri),
                ("decodeURIComponent", 1, global_decode_uri_component),
            ],
        );
        if self.config.annex_b {
            self.define_methods(
                global,
                &[("escape", 1, global_escape), ("unescape", 1, global_unescape)],
            );
        }
        if self.config.print {
            self.define_methods(global, &[("print", 1, global_print)]);
        }
    }
}

// ============================================================================
// Global functions
// ============================================================================

fn global_parse_int(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_js_string(&arg(args, 0))?.to_rust_string();
    let mut s = trim_js_start(&input);
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = interp.to_int32(&arg(args, 1))?;
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Ok(JsValue::Number(f64::NAN));
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }
    if strip_prefix && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        s = rest;
        radix = 16;
    }
    let radix = radix as u32;
    let end = s.find(|c: char| c.to_digit(radix).is_none()).unwrap_or(s.len());
    let digits = &s[..end];
    if digits.is_empty() {
        return Ok(JsValue::Number(f64::NAN));
    }
    let n = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits.chars().fold(0.0, |acc, c| {
            acc * f64::from(radix) + f64::from(c.to_digit(radix).unwrap_or(0))
        })
    };
    Ok(JsValue::Number(sign * n))
}

/// The longest prefix of `s` that is a StrDecimalLiteral, converted.
pub(crate) fn parse_float_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut sign = 1.0;
    if let Some(&c) = bytes.first()
        && (c == b'+' || c == b'-')
    {
        if c == b'-' {
            sign = -1.0;
        }
        i = 1;
    }
    if s[i..].starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |p| from + p)
    };
    let int_end = digits(i);
    let mut end = int_end;
    let mut has_digits = int_end > i;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits(end + 1);
        if frac_end > end + 1 || has_digits {
            has_digits |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !has_digits {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut j = end + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits(j);
        if exp_end > j {
            end = exp_end;
        }
    }
    let text = s[i..end].trim_end_matches('.');
    let text = if text.starts_with('.') {
        format!("0{text}")
    } else {
        text.replace(".e", ".0e").replace(".E", ".0E")
    };
    sign * text.parse::<f64>().unwrap_or(f64::NAN)
}

fn global_parse_float(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let input = interp.to_js_string(&arg(args, 0))?.to_rust_string();
    Ok(JsValue::Number(parse_float_prefix(trim_js_start(&input))))
}

fn global_is_nan(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

fn global_is_finite(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}

fn global_print(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for a in args {
        parts.push(interp.to_js_string(a)?.to_rust_string());
    }
    println!("{}", parts.join(" "));
    Ok(JsValue::Undefined)
}

// ============================================================================
// URI handling
// ============================================================================

const URI_RESERVED: &str = ";/?:@&=+$,";
const URI_MARK: &str = "-_.!~*'()";

fn is_uri_unescaped(c: u16) -> bool {
    c < 128 && {
        let ch = c as u8 as char;
        ch.is_ascii_alphanumeric() || URI_MARK.contains(ch)
    }
}

fn in_set(set: &str, c: u16) -> bool {
    c < 128 && set.contains(c as u8 as char)
}

fn uri_encode(interp: &mut Interpreter, units: &[u16], extra_unescaped: &str) -> JsResult<JsValue> {
    let mut out = String::with_capacity(units.len());
    let mut k = 0;
    while k < units.len() {
        let c = units[k];
        if is_uri_unescaped(c) || in_set(extra_unescaped, c) {
            out.push(c as u8 as char);
            k += 1;
            continue;
        }
        let cp = match c {
            0xDC00..=0xDFFF => return Err(interp.create_error(ErrorKind::URIError, "URI malformed")),
            0xD800..=0xDBFF => {
                let low = units.get(k + 1).copied().filter(|l| (0xDC00..=0xDFFF).contains(l));
                let Some(low) = low else {
                    return Err(interp.create_error(ErrorKind::URIError, "URI malformed"));
                };
                k += 1;
                (u32::from(c) - 0xD800) * 0x400 + (u32::from(low) - 0xDC00) + 0x10000
            }
            _ => u32::from(c),
        };
        let ch = char::from_u32(cp).unwrap_or('\u{FFFD}');
        let mut buf = [0u8; 4];
        for b in ch.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{b:02X}"));
        }
        k += 1;
    }
    Ok(JsValue::string(&out))
}

fn uri_decode(interp: &mut Interpreter, units: &[u16], reserved: &str) -> JsResult<JsValue> {
    let malformed = |interp: &mut Interpreter| interp.create_error(ErrorKind::URIError, "URI malformed");
    let hex_byte = |at: usize| -> Option<u8> {
        let hi = char::from_u32(u32::from(*units.get(at)?))?.to_digit(16)?;
        let lo = char::from_u32(u32::from(*units.get(at + 1)?))?.to_digit(16)?;
        Some((hi * 16 + lo) as u8)
    };
    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut k = 0;
    while k < units.len() {
        let c = units[k];
        if c != u16::from(b'%') {
            out.push(c);
            k += 1;
            continue;
        }
        let start = k;
        let Some(b) = hex_byte(k + 1) else {
            return Err(malformed(interp));
        };
        k += 2;
        if b & 0x80 == 0 {
            if in_set(reserved, u16::from(b)) {
                out.extend_from_slice(&units[start..=k]);
            } else {
                out.push(u16::from(b));
            }
            k += 1;
            continue;
        }
        let n = b.leading_ones() as usize;
        if n == 1 || n > 4 {
            return Err(malformed(interp));
        }
        let mut octets = vec![b];
        for _ in 1..n {
            k += 1;
            if units.get(k) != Some(&u16::from(b'%')) {
                return Err(malformed(interp));
            }
            let Some(cont) = hex_byte(k + 1) else {
                return Err(malformed(interp));
            };
            if cont & 0xC0 != 0x80 {
                return Err(malformed(interp));
            }
            octets.push(cont);
            k += 2;
        }
        let Ok(decoded) = std::str::from_utf8(&octets) else {
            return Err(malformed(interp));
        };
        let Some(ch) = decoded.chars().next() else {
            return Err(malformed(interp));
        };
        if (ch as u32) < 0x10000 && in_set(reserved, ch as u32 as u16) {
            out.extend_from_slice(&units[start..=k]);
        } else {
            let mut buf = [0u16; 2];
            out.extend_from_slice(ch.encode_utf16(&mut buf));
        }
        k += 1;
    }
    Ok(JsValue::String(JsString::from_units(out)))
}

fn global_encode_uri(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    uri_encode(interp, &s.code_units, ";/?:@&=+$,#")
}

fn global_encode_uri_component(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    uri_encode(interp, &s.code_units, "")
}

fn global_decode_uri(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    uri_decode(interp, &s.code_units, &format!("{URI_RESERVED}#"))
}

fn global_decode_uri_component(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    uri_decode(interp, &s.code_units, "")
}

fn global_escape(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    let mut out = String::with_capacity(s.len());
    for &c in &s.code_units {
        let plain = c < 128 && {
            let ch = c as u8 as char;
            ch.is_ascii_alphanumeric() || "@*_+-./".contains(ch)
        };
        if plain {
            out.push(c as u8 as char);
        } else if c < 256 {
            out.push_str(&format!("%{c:02X}"));
        } else {
            out.push_str(&format!("%u{c:04X}"));
        }
    }
    Ok(JsValue::string(&out))
}

fn global_unescape(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    let units = &s.code_units;
    let hex = |from: usize, count: usize| -> Option<u16> {
        let slice = units.get(from..from + count)?;
        let mut v = 0u16;
        for &u in slice {
            v = v * 16 + char::from_u32(u32::from(u))?.to_digit(16)? as u16;
        }
        Some(v)
    };
    let mut out = Vec::with_capacity(units.len());
    let mut k = 0;
    while k < units.len() {
        let c = units[k];
        if c == u16::from(b'%') {
            if units.get(k + 1) == Some(&u16::from(b'u'))
                && let Some(v) = hex(k + 2, 4)
            {
                out.push(v);
                k += 6;
                continue;
            }
            if let Some(v) = hex(k + 1, 2) {
                out.push(v);
                k += 3;
                continue;
            }
        }
        out.push(c);
        k += 1;
    }
    Ok(JsValue::String(JsString::from_units(out)))
}

#[cfg(test)]
mod tests {
    use super::parse_float_prefix;
    use crate::EngineConfig;
    use crate::interpreter::Interpreter;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_int_radix_rules() {
        assert_eq!(eval_str("parseInt('  42px')"), "42");
        assert_eq!(eval_str("parseInt('0x1f')"), "31");
        assert_eq!(eval_str("parseInt('0x1f', 16)"), "31");
        assert_eq!(eval_str("parseInt('0x1f', 10)"), "0");
        assert_eq!(eval_str("parseInt('-ff', 16)"), "-255");
        assert_eq!(eval_str("parseInt('12', 1)"), "NaN");
        assert_eq!(eval_str("parseInt('z', 36)"), "35");
        assert_eq!(eval_str("parseInt('')"), "NaN");
        assert_eq!(eval_str("parseInt('010')"), "10");
    }

    #[test]
    fn parse_float_prefixes() {
        assert_eq!(parse_float_prefix("3.14abc"), 3.14);
        assert_eq!(parse_float_prefix(".5"), 0.5);
        assert_eq!(parse_float_prefix("5."), 5.0);
        assert_eq!(parse_float_prefix("1e3x"), 1000.0);
        assert_eq!(parse_float_prefix("1e"), 1.0);
        assert_eq!(parse_float_prefix("-Infinityx"), f64::NEG_INFINITY);
        assert!(parse_float_prefix("x1").is_nan());
        assert!(parse_float_prefix(".").is_nan());
        assert!(parse_float_prefix("").is_nan());
    }

    #[test]
    fn uri_round_trips() {
        assert_eq!(eval_str("encodeURIComponent('a b&c/é')"), "a%20b%26c%2F%C3%A9");
        assert_eq!(eval_str("encodeURI('http://x.y/a b?q=1#f')"), "http://x.y/a%20b?q=1#f");
        assert_eq!(eval_str("decodeURIComponent('a%20b%26c%2F%C3%A9')"), "a b&c/é");
        assert_eq!(eval_str("decodeURI('%3B%20')"), "%3B ");
        assert_eq!(eval_str("encodeURIComponent('\\uD83D\\uDE00')"), "%F0%9F%98%80");
        assert_eq!(eval_err("decodeURIComponent('%')"), "URIError");
        assert_eq!(eval_err("decodeURIComponent('%C3%28')"), "URIError");
        assert_eq!(eval_err("encodeURIComponent('\\uDC00')"), "URIError");
        assert_eq!(eval_err("decodeURIComponent('%C0%80')"), "URIError");
    }

    #[test]
    fn annex_b_escape() {
        assert_eq!(eval_str("escape('a b\\u0100')"), "a%20b%u0100");
        assert_eq!(eval_str("unescape('a%20b%u0100%zz')"), "a b\u{100}%zz");
        let mut interp = Interpreter::new(EngineConfig {
            annex_b: false,
            ..EngineConfig::default()
        });
        assert_eq!(eval_in(&mut interp, "typeof escape").unwrap().to_string(), "undefined");
    }

    #[test]
    fn global_constants_are_read_only() {
        assert_eq!(eval_str("NaN = 1; typeof NaN === 'number' && NaN !== NaN"), "true");
        assert_eq!(eval_str("undefined = 1; undefined"), "undefined");
        assert_eq!(eval_err("'use strict'; Infinity = 1"), "TypeError");
        assert_eq!(eval_str("isNaN('abc') + ':' + isFinite('12')"), "true:true");
    }
}
