use std::fmt;

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObject),
}

// UTF-16 code unit string; length and indexing count code units
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn from_units(code_units: Vec<u16>) -> Self {
        Self { code_units }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut code_units = Vec::with_capacity(self.len() + other.len());
        code_units.extend_from_slice(&self.code_units);
        code_units.extend_from_slice(&other.code_units);
        JsString { code_units }
    }

    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return if from <= s_len { Some(from) } else { None };
        }
        if from + search_len > s_len {
            return None;
        }
        (from..=(s_len - search_len))
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    pub fn slice_utf16(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.code_units.len());
        let e = end.min(self.code_units.len());
        if s >= e {
            return JsString { code_units: vec![] };
        }
        JsString {
            code_units: self.code_units[s..e].to_vec(),
        }
    }

    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let s_len = self.code_units.len();
        let search_len = search.code_units.len();
        if search_len == 0 {
            return Some(from.min(s_len));
        }
        if search_len > s_len {
            return None;
        }
        let max_start = from.min(s_len - search_len);
        (0..=max_start)
            .rev()
            .find(|&i| self.code_units[i..i + search_len] == search.code_units[..])
    }

    /// Property keys are stored as Rust strings; lone surrogates survive the
    /// trip through `key_to_units`.
    pub fn to_property_key(&self) -> String {
        match String::from_utf16(&self.code_units) {
            Ok(s) => s,
            Err(_) => {
                let mut out = String::new();
                for &cu in &self.code_units {
                    if (0xD800..=0xDFFF).contains(&cu) {
                        out.push(char::from_u32(0xF0000 + cu as u32).unwrap_or('\u{FFFD}'));
                    } else if let Some(c) = char::from_u32(cu as u32) {
                        out.push(c);
                    }
                }
                out
            }
        }
    }

    pub fn from_property_key(key: &str) -> Self {
        let mut code_units = Vec::with_capacity(key.len());
        for c in key.chars() {
            let cp = c as u32;
            if (0xF0000 + 0xD800..=0xF0000 + 0xDFFF).contains(&cp) {
                code_units.push((cp - 0xF0000) as u16);
            } else {
                let mut buf = [0u16; 2];
                code_units.extend_from_slice(c.encode_utf16(&mut buf));
            }
        }
        Self { code_units }
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

/// Handle into the interpreter's object arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct JsObject {
    pub id: u64,
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JsValue::Boolean(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, JsValue::Number(n) if n.is_nan())
    }

    pub fn string(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }

    pub fn as_object(&self) -> Option<JsObject> {
        match self {
            JsValue::Object(o) => Some(*o),
            _ => None,
        }
    }
}

// Number type operations
pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        let n = to_int32(x);
        f64::from(!n)
    }

    pub fn remainder(x: f64, y: f64) -> f64 {
        // fmod semantics, sign follows the dividend
        x % y
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let lnum = to_int32(x);
        let shift = to_uint32(y) & 0x1F;
        f64::from(lnum.wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let lnum = to_int32(x);
        let shift = to_uint32(y) & 0x1F;
        f64::from(lnum.wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let lnum = to_uint32(x);
        let shift = to_uint32(y) & 0x1F;
        lnum.wrapping_shr(shift) as f64
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }

    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let int_val = x.trunc();
        let modulo = int_val.rem_euclid(4294967296.0);
        modulo as u32
    }

    pub fn to_uint16(x: f64) -> u16 {
        to_uint32(x) as u16
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_index_of() {
        let s = JsString::from_str("hello world");
        let search = JsString::from_str("world");
        assert_eq!(s.index_of(&search, 0), Some(6));
        assert_eq!(s.index_of(&search, 7), None);

        let empty = JsString::from_str("");
        assert_eq!(s.index_of(&empty, 5), Some(5));
    }

    #[test]
    fn js_string_last_index_of() {
        let s = JsString::from_str("abcabc");
        let search = JsString::from_str("abc");
        assert_eq!(s.last_index_of(&search, 5), Some(3));
        assert_eq!(s.last_index_of(&search, 2), Some(0));
    }

    #[test]
    fn lone_surrogates_survive_property_keys() {
        let s = JsString::from_units(vec![0x61, 0xD800, 0x62]);
        let key = s.to_property_key();
        assert_eq!(JsString::from_property_key(&key), s);
        let plain = JsString::from_str("caf\u{e9}\u{1F600}");
        assert_eq!(plain.to_property_key(), "caf\u{e9}\u{1F600}");
        assert_eq!(JsString::from_property_key(&plain.to_property_key()), plain);
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
        assert_eq!(number_ops::to_string(0.1), "0.1");
        assert_eq!(number_ops::to_string(123456789.0), "123456789");
    }

    #[test]
    fn number_same_value() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value(0.0, 0.0));
    }

    #[test]
    fn to_int32_wraps() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(f64::INFINITY), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(4294967296.0 + 5.0), 5);
        assert_eq!(number_ops::to_int32(2147483648.0), -2147483648);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
        assert_eq!(number_ops::to_uint16(65537.0), 1);
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(number_ops::bitwise_and(15.0, 9.0), 9.0);
        assert_eq!(number_ops::bitwise_or(15.0, 9.0), 15.0);
        assert_eq!(number_ops::bitwise_xor(15.0, 9.0), 6.0);
        assert_eq!(number_ops::bitwise_not(0.0), -1.0);
    }

    #[test]
    fn shift_ops() {
        assert_eq!(number_ops::left_shift(1.0, 4.0), 16.0);
        assert_eq!(number_ops::signed_right_shift(-16.0, 2.0), -4.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
        assert_eq!(number_ops::left_shift(1.0, 33.0), 2.0);
    }

    #[test]
    fn display_values() {
        assert_eq!(format!("{}", JsValue::Undefined), "undefined");
        assert_eq!(format!("{}", JsValue::Null), "null");
        assert_eq!(format!("{}", JsValue::Boolean(true)), "true");
        assert_eq!(format!("{}", JsValue::Number(42.0)), "42");
        assert_eq!(format!("{}", JsValue::string("hi")), "hi");
    }
}
