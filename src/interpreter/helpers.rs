use super::*;
use crate::lexer::Lexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PreferredType {
    Number,
    String,
}

pub(crate) fn strict_equals(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Object(a), JsValue::Object(b)) => a == b,
        _ => false,
    }
}

pub(crate) fn same_value(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => strict_equals(x, y),
    }
}

pub(crate) fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => !(n.is_nan() || *n == 0.0),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

/// ToInteger on an already converted number.
pub(crate) fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n.is_infinite() || n == 0.0 {
        n
    } else {
        n.trunc()
    }
}

/// Clamps a relative index argument (`start`, `end`) into `0..=len`.
pub(crate) fn relative_index(rel: f64, len: f64) -> f64 {
    if rel < 0.0 {
        (len + rel).max(0.0)
    } else {
        rel.min(len)
    }
}

fn is_js_space(c: char) -> bool {
    Lexer::is_whitespace(c) || Lexer::is_line_terminator(c)
}

pub(crate) fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_space)
}

pub(crate) fn trim_js_start(s: &str) -> &str {
    s.trim_start_matches(is_js_space)
}

/// ToNumber applied to a String (the StringNumericLiteral grammar).
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let text = s.to_rust_string();
    let t = trim_js(&text);
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        if hex.is_empty() {
            return f64::NAN;
        }
        let mut n = 0.0f64;
        for c in hex.chars() {
            match c.to_digit(16) {
                Some(d) => n = n * 16.0 + f64::from(d),
                None => return f64::NAN,
            }
        }
        return n;
    }
    let (sign, body) = match t.as_bytes()[0] {
        b'-' => (-1.0, &t[1..]),
        b'+' => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    match parse_decimal_literal(body) {
        Some(n) => sign * n,
        None => f64::NAN,
    }
}

/// An unsigned StrDecimalLiteral without `Infinity`; the whole input must match.
fn parse_decimal_literal(s: &str) -> Option<f64> {
    let (int, frac, exp) = split_decimal(s)?;
    if int.is_empty() && frac.is_empty() {
        return None;
    }
    let normalized = format!(
        "{}.{}e{}",
        if int.is_empty() { "0" } else { int },
        if frac.is_empty() { "0" } else { frac },
        exp.unwrap_or("0")
    );
    normalized.parse().ok()
}

/// Splits `digits [. digits] [e[+-]digits]`; `frac` still carries no dot.
fn split_decimal(s: &str) -> Option<(&str, &str, Option<&str>)> {
    let int_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let int = &s[..int_end];
    let mut rest = &s[int_end..];
    let mut frac = "";
    if let Some(after_dot) = rest.strip_prefix('.') {
        let frac_end = after_dot
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_dot.len());
        frac = &after_dot[..frac_end];
        rest = &after_dot[frac_end..];
    }
    let exp = match rest.strip_prefix(['e', 'E']) {
        Some(e) => {
            let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(e)
        }
        None if rest.is_empty() => None,
        None => return None,
    };
    Some((int, frac, exp))
}

impl Interpreter {
    pub(crate) fn to_primitive(&mut self, v: &JsValue, hint: Option<PreferredType>) -> JsResult<JsValue> {
        match v {
            JsValue::Object(o) => self.default_value(*o, hint),
            _ => Ok(v.clone()),
        }
    }

    pub(crate) fn to_number(&mut self, v: &JsValue) -> JsResult<f64> {
        Ok(match v {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(b) => f64::from(u8::from(*b)),
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s),
            JsValue::Object(_) => {
                let p = self.to_primitive(v, Some(PreferredType::Number))?;
                self.to_number(&p)?
            }
        })
    }

    pub(crate) fn to_integer_value(&mut self, v: &JsValue) -> JsResult<f64> {
        Ok(to_integer(self.to_number(v)?))
    }

    pub(crate) fn to_int32(&mut self, v: &JsValue) -> JsResult<i32> {
        Ok(number_ops::to_int32(self.to_number(v)?))
    }

    pub(crate) fn to_uint32(&mut self, v: &JsValue) -> JsResult<u32> {
        Ok(number_ops::to_uint32(self.to_number(v)?))
    }

    pub(crate) fn to_js_string(&mut self, v: &JsValue) -> JsResult<JsString> {
        Ok(match v {
            JsValue::String(s) => s.clone(),
            JsValue::Object(_) => {
                let p = self.to_primitive(v, Some(PreferredType::String))?;
                self.to_js_string(&p)?
            }
            other => JsString::from_str(&other.to_string()),
        })
    }

    /// ToString, then the lossless key encoding used by property maps.
    pub(crate) fn to_property_key(&mut self, v: &JsValue) -> JsResult<String> {
        match v {
            JsValue::Number(n) => Ok(number_ops::to_string(*n)),
            _ => Ok(self.to_js_string(v)?.to_property_key()),
        }
    }

    pub(crate) fn to_object(&mut self, v: &JsValue) -> JsResult<JsObject> {
        let (class, proto) = match v {
            JsValue::Object(o) => return Ok(*o),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.type_error(&format!("Cannot convert {v} to object")));
            }
            JsValue::Boolean(_) => ("Boolean", self.realm.boolean_prototype),
            JsValue::Number(_) => ("Number", self.realm.number_prototype),
            JsValue::String(_) => ("String", self.realm.string_prototype),
        };
        let mut data = JsObjectData::with_class(class, Some(proto));
        if let JsValue::String(s) = v {
            data.insert_constant(
                "length".to_string(),
                JsValue::Number(s.len() as f64),
            );
        }
        data.primitive_value = Some(v.clone());
        Ok(self.alloc(data))
    }

    pub(crate) fn check_object_coercible(&mut self, v: &JsValue) -> JsResult<()> {
        if v.is_nullish() {
            return Err(self.type_error(&format!("Cannot convert {v} to object")));
        }
        Ok(())
    }

    pub(crate) fn is_callable(&self, v: &JsValue) -> bool {
        match v {
            JsValue::Object(o) => self.obj(*o).borrow().is_callable(),
            _ => false,
        }
    }

    pub(crate) fn is_constructor(&self, v: &JsValue) -> bool {
        let JsValue::Object(o) = v else {
            return false;
        };
        let callable = self.obj(*o).borrow().callable.clone();
        match callable {
            Some(JsFunction::User { .. }) => true,
            Some(JsFunction::Native { construct, .. }) => construct.is_some(),
            Some(JsFunction::Bound { target, .. }) => self.is_constructor(&JsValue::Object(target)),
            None => false,
        }
    }

    pub(crate) fn type_of(&self, v: &JsValue) -> &'static str {
        match v {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) if self.is_callable(v) => "function",
            JsValue::Object(_) => "object",
        }
    }

    /// The abstract equality comparison (`==`).
    pub(crate) fn loose_equals(&mut self, x: &JsValue, y: &JsValue) -> JsResult<bool> {
        Ok(match (x, y) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
            (JsValue::Number(_), JsValue::String(s)) => strict_equals(x, &JsValue::Number(string_to_number(s))),
            (JsValue::String(s), JsValue::Number(_)) => strict_equals(&JsValue::Number(string_to_number(s)), y),
            (JsValue::Boolean(b), _) => {
                return self.loose_equals(&JsValue::Number(f64::from(u8::from(*b))), y);
            }
            (_, JsValue::Boolean(b)) => {
                return self.loose_equals(x, &JsValue::Number(f64::from(u8::from(*b))));
            }
            (JsValue::Number(_) | JsValue::String(_), JsValue::Object(_)) => {
                let py = self.to_primitive(y, None)?;
                return self.loose_equals(x, &py);
            }
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_)) => {
                let px = self.to_primitive(x, None)?;
                return self.loose_equals(&px, y);
            }
            _ => strict_equals(x, y),
        })
    }

    /// `x < y`; `None` when either side converts to NaN. `left_first` fixes the
    /// order in which the operands are converted.
    pub(crate) fn abstract_relational(
        &mut self,
        x: &JsValue,
        y: &JsValue,
        left_first: bool,
    ) -> JsResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, Some(PreferredType::Number))?;
            let py = self.to_primitive(y, Some(PreferredType::Number))?;
            (px, py)
        } else {
            let py = self.to_primitive(y, Some(PreferredType::Number))?;
            let px = self.to_primitive(x, Some(PreferredType::Number))?;
            (px, py)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
            return Ok(Some(a.code_units < b.code_units));
        }
        let nx = self.to_number(&px)?;
        let ny = self.to_number(&py)?;
        if nx.is_nan() || ny.is_nan() {
            return Ok(None);
        }
        Ok(Some(nx < ny))
    }

    /// `ToPropertyDescriptor`: reads the descriptor fields of an attributes object.
    pub(crate) fn to_property_descriptor(&mut self, v: &JsValue) -> JsResult<PropertyDescriptor> {
        let JsValue::Object(o) = v else {
            return Err(self.type_error(&format!("Property description must be an object: {v}")));
        };
        let o = *o;
        let mut desc = PropertyDescriptor::default();
        if self.has_property(o, "enumerable") {
            desc.enumerable = Some(to_boolean(&self.get(o, "enumerable")?));
        }
        if self.has_property(o, "configurable") {
            desc.configurable = Some(to_boolean(&self.get(o, "configurable")?));
        }
        if self.has_property(o, "value") {
            desc.value = Some(self.get(o, "value")?);
        }
        if self.has_property(o, "writable") {
            desc.writable = Some(to_boolean(&self.get(o, "writable")?));
        }
        if self.has_property(o, "get") {
            let g = self.get(o, "get")?;
            if !g.is_undefined() && !self.is_callable(&g) {
                return Err(self.type_error(&format!("Getter must be a function: {}", self.display(&g))));
            }
            desc.get = Some(g);
        }
        if self.has_property(o, "set") {
            let s = self.get(o, "set")?;
            if !s.is_undefined() && !self.is_callable(&s) {
                return Err(self.type_error(&format!("Setter must be a function: {}", self.display(&s))));
            }
            desc.set = Some(s);
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(self.type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// `FromPropertyDescriptor`: a fresh attributes object.
    pub(crate) fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let o = self.create_object();
        let rc = self.obj(o);
        let mut data = rc.borrow_mut();
        if desc.is_accessor_descriptor() {
            data.insert_value("get".into(), desc.get.clone().unwrap_or(JsValue::Undefined));
            data.insert_value("set".into(), desc.set.clone().unwrap_or(JsValue::Undefined));
        } else {
            data.insert_value("value".into(), desc.value.clone().unwrap_or(JsValue::Undefined));
            data.insert_value("writable".into(), JsValue::Boolean(desc.writable()));
        }
        data.insert_value("enumerable".into(), JsValue::Boolean(desc.enumerable()));
        data.insert_value("configurable".into(), JsValue::Boolean(desc.configurable()));
        JsValue::Object(o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    fn num(s: &str) -> f64 {
        string_to_number(&JsString::from_str(s))
    }

    #[test]
    fn string_numeric_literals() {
        assert_eq!(num(""), 0.0);
        assert_eq!(num("  \n\t "), 0.0);
        assert_eq!(num(" 12 "), 12.0);
        assert_eq!(num("0x1F"), 31.0);
        assert_eq!(num("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(num("1e3"), 1000.0);
        assert_eq!(num(".5"), 0.5);
        assert_eq!(num("5."), 5.0);
        assert_eq!(num("+.5e-1"), 0.05);
        assert!(num("1e").is_nan());
        assert!(num(".").is_nan());
        assert!(num("0x").is_nan());
        assert!(num("-0x10").is_nan());
        assert!(num("infinity").is_nan());
        assert!(num("12px").is_nan());
        assert!(num("1_000").is_nan());
    }

    #[test]
    fn to_integer_truncates_toward_zero() {
        assert_eq!(to_integer(-1.7), -1.0);
        assert_eq!(to_integer(f64::NAN), 0.0);
        assert_eq!(to_integer(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn same_value_distinguishes_zero_signs() {
        assert!(same_value(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
        assert!(!same_value(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(strict_equals(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
    }

    #[test]
    fn conversions_through_value_of() {
        assert_eq!(eval_str("({valueOf: function() { return 4; }}) * 2"), "8");
        assert_eq!(eval_str("'' + {toString: function() { return 'x'; }}"), "x");
        assert_eq!(eval_str("'' + [1, [2, 3]]"), "1,2,3");
        assert_eq!(eval_err("+{valueOf: null, toString: null}"), "TypeError");
    }

    #[test]
    fn relational_operand_order_and_nan() {
        assert_eq!(
            eval_str(
                "var log = ''; var a = {valueOf: function() { log += 'a'; return 1; }};\
                 var b = {valueOf: function() { log += 'b'; return 2; }}; a > b; log"
            ),
            "ab"
        );
        assert_eq!(eval_str("NaN <= NaN"), "false");
        assert_eq!(eval_str("'a' < 'b'"), "true");
        assert_eq!(eval_str("'10' < '9'"), "true");
        assert_eq!(eval_str("'10' < 9"), "false");
    }
}
