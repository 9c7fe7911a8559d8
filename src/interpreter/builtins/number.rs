use super::*;

/// Decimal digits of `|x|` with the position of the decimal point:
/// `|x| = 0.d1d2d3... * 10^point`.
struct Digits {
    digits: Vec<u8>,
    point: i32,
}

impl Digits {
    /// Every significant digit of the binary value.
    fn exact(x: f64) -> Self {
        Self::from_exponential(&format!("{:.800e}", x.abs()))
    }

    /// The shortest digits that round-trip.
    fn shortest(x: f64) -> Self {
        Self::from_exponential(&format!("{:e}", x.abs()))
    }

    fn from_exponential(text: &str) -> Self {
        let (mantissa, exp) = text.split_once('e').unwrap_or((text, "0"));
        let mut digits: Vec<u8> = mantissa
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        while digits.len() > 1 && digits.last() == Some(&0) {
            digits.pop();
        }
        Self {
            digits,
            point: exp.parse::<i32>().unwrap_or(0) + 1,
        }
    }

    /// Rounds half up so that `keep` leading digits remain; `keep <= 0`
    /// rounds to a power of ten or zero.
    fn round(&self, keep: i32) -> Self {
        if keep < 0 {
            return Self { digits: Vec::new(), point: self.point };
        }
        let keep_len = keep as usize;
        if keep_len >= self.digits.len() {
            let mut digits = self.digits.clone();
            digits.resize(keep_len, 0);
            return Self { digits, point: self.point };
        }
        let mut digits = self.digits[..keep_len].to_vec();
        let mut point = self.point;
        if self.digits[keep_len] >= 5 {
            let mut i = digits.len();
            loop {
                if i == 0 {
                    digits.insert(0, 1);
                    digits.truncate(keep_len.max(1));
                    point += 1;
                    break;
                }
                i -= 1;
                if digits[i] == 9 {
                    digits[i] = 0;
                } else {
                    digits[i] += 1;
                    break;
                }
            }
        }
        Self { digits, point }
    }

    fn digit(&self, i: i32) -> char {
        if i < 0 {
            return '0';
        }
        self.digits
            .get(i as usize)
            .map_or('0', |d| char::from(b'0' + d))
    }

    fn fixed(&self, fraction_digits: usize) -> String {
        let mut out = String::new();
        if self.point <= 0 || self.digits.is_empty() {
            out.push('0');
        } else {
            out.extend((0..self.point).map(|i| self.digit(i)));
        }
        if fraction_digits > 0 {
            out.push('.');
            out.extend((0..fraction_digits as i32).map(|j| self.digit(self.point + j)));
        }
        out
    }

    fn exponential(&self) -> String {
        let mut out = String::new();
        out.push(self.digit(0));
        if self.digits.len() > 1 {
            out.push('.');
            out.extend((1..self.digits.len() as i32).map(|i| self.digit(i)));
        }
        let e = self.point - 1;
        out.push_str(&format!("e{}{}", if e >= 0 { "+" } else { "-" }, e.abs()));
        out
    }
}

fn with_sign(negative: bool, s: String) -> String {
    if negative { format!("-{s}") } else { s }
}

pub(crate) fn format_fixed(x: f64, fraction_digits: usize) -> String {
    if x.abs() >= 1e21 {
        return number_ops::to_string(x);
    }
    let d = Digits::exact(x);
    let rounded = if x == 0.0 {
        Digits { digits: Vec::new(), point: 0 }
    } else {
        d.round(d.point + fraction_digits as i32)
    };
    with_sign(x < 0.0, rounded.fixed(fraction_digits))
}

pub(crate) fn format_exponential(x: f64, fraction_digits: Option<usize>) -> String {
    let d = match (x == 0.0, fraction_digits) {
        (true, f) => Digits { digits: vec![0; f.unwrap_or(0) + 1], point: 1 },
        (false, Some(f)) => Digits::exact(x).round(f as i32 + 1),
        (false, None) => Digits::shortest(x),
    };
    with_sign(x < 0.0, d.exponential())
}

pub(crate) fn format_precision(x: f64, precision: usize) -> String {
    let d = if x == 0.0 {
        Digits { digits: vec![0; precision], point: 1 }
    } else {
        Digits::exact(x).round(precision as i32)
    };
    let e = d.point - 1;
    let p = precision as i32;
    let body = if e < -6 || e >= p {
        d.exponential()
    } else if e == p - 1 {
        d.digits.iter().map(|&b| char::from(b'0' + b)).collect()
    } else if e >= 0 {
        let all: String = d.digits.iter().map(|&b| char::from(b'0' + b)).collect();
        format!("{}.{}", &all[..(e + 1) as usize], &all[(e + 1) as usize..])
    } else {
        let all: String = d.digits.iter().map(|&b| char::from(b'0' + b)).collect();
        format!("0.{}{}", "0".repeat((-(e + 1)) as usize), all)
    };
    with_sign(x < 0.0, body)
}

fn format_radix_integer(mut n: f64, radix: u32) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n >= 1.0 {
        let d = (n % f64::from(radix)) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        n = ((n - f64::from(d)) / f64::from(radix)).trunc();
    }
    digits.iter().rev().collect()
}

pub(crate) fn format_radix(x: f64, radix: u32) -> String {
    if !x.is_finite() {
        return number_ops::to_string(x);
    }
    let abs = x.abs();
    let int_part = abs.trunc();
    let mut result = format_radix_integer(int_part, radix);
    let mut frac = abs - int_part;
    if frac > 0.0 {
        result.push('.');
        for _ in 0..52 {
            frac *= f64::from(radix);
            let digit = frac.trunc() as u32;
            result.push(char::from_digit(digit, radix).unwrap_or('0'));
            frac -= f64::from(digit);
            if frac == 0.0 {
                break;
            }
        }
    }
    with_sign(x < 0.0, result)
}

impl Interpreter {
    pub(crate) fn setup_number(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut proto_data = JsObjectData::with_class("Number", Some(object_proto));
        proto_data.primitive_value = Some(JsValue::Number(0.0));
        let proto = self.alloc(proto_data);
        self.realm.number_prototype = proto;

        let ctor = self.native_constructor("Number", 1, number_call, number_construct, proto);
        {
            let rc = self.obj(ctor);
            let mut data = rc.borrow_mut();
            for (name, value) in [
                ("MAX_VALUE", f64::MAX),
                ("MIN_VALUE", 5e-324),
                ("NaN", f64::NAN),
                ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
                ("POSITIVE_INFINITY", f64::INFINITY),
            ] {
                data.insert_constant(name.to_string(), JsValue::Number(value));
            }
        }
        self.define_methods(
            proto,
            &[
                ("toString", 1, number_to_string),
                ("toLocaleString", 0, number_to_locale_string),
                ("valueOf", 0, number_value_of),
                ("toFixed", 1, number_to_fixed),
                ("toExponential", 1, number_to_exponential),
                ("toPrecision", 1, number_to_precision),
            ],
        );
        self.define_global("Number", JsValue::Object(ctor));
    }

    pub(crate) fn setup_boolean(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut proto_data = JsObjectData::with_class("Boolean", Some(object_proto));
        proto_data.primitive_value = Some(JsValue::Boolean(false));
        let proto = self.alloc(proto_data);
        self.realm.boolean_prototype = proto;

        let ctor = self.native_constructor("Boolean", 1, boolean_call, boolean_construct, proto);
        self.define_methods(
            proto,
            &[("toString", 0, boolean_to_string), ("valueOf", 0, boolean_value_of)],
        );
        self.define_global("Boolean", JsValue::Object(ctor));
    }

    /// The primitive behind `this` for `Number` and `Boolean` prototype methods.
    fn this_primitive(&mut self, this: &JsValue, class: &str) -> JsResult<JsValue> {
        let primitive = match (this, class) {
            (JsValue::Number(_), "Number") | (JsValue::Boolean(_), "Boolean") => Some(this.clone()),
            (JsValue::Object(o), _) => {
                let rc = self.obj(*o);
                let data = rc.borrow();
                if data.class_name == class { data.primitive_value.clone() } else { None }
            }
            _ => None,
        };
        match primitive {
            Some(v) => Ok(v),
            None => Err(self.type_error(&format!("{class}.prototype method called on incompatible receiver"))),
        }
    }

    fn this_number(&mut self, this: &JsValue) -> JsResult<f64> {
        match self.this_primitive(this, "Number")? {
            JsValue::Number(n) => Ok(n),
            _ => Ok(f64::NAN),
        }
    }
}

fn number_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match args.first() {
        None => Ok(JsValue::Number(0.0)),
        Some(v) => Ok(JsValue::Number(interp.to_number(v)?)),
    }
}

fn number_construct(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let n = number_call(interp, this, args)?;
    Ok(JsValue::Object(interp.to_object(&n)?))
}

fn number_to_string(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.this_number(this)?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        r => interp.to_integer_value(&r)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 {
        return Ok(JsValue::string(&number_ops::to_string(x)));
    }
    Ok(JsValue::string(&format_radix(x, radix as u32)))
}

fn number_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.this_number(this)?;
    Ok(JsValue::string(&number_ops::to_string(x)))
}

fn number_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Number(interp.this_number(this)?))
}

fn number_to_fixed(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.this_number(this)?;
    let f = interp.to_integer_value(&arg(args, 0))?;
    if !(0.0..=20.0).contains(&f) {
        return Err(interp.range_error("toFixed() digits argument must be between 0 and 20"));
    }
    if x.is_nan() {
        return Ok(JsValue::string("NaN"));
    }
    Ok(JsValue::string(&format_fixed(x, f as usize)))
}

fn number_to_exponential(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.this_number(this)?;
    let fraction_digits = arg(args, 0);
    let f = interp.to_integer_value(&fraction_digits)?;
    if !x.is_finite() {
        return Ok(JsValue::string(&number_ops::to_string(x)));
    }
    if !fraction_digits.is_undefined() && !(0.0..=20.0).contains(&f) {
        return Err(interp.range_error("toExponential() argument must be between 0 and 20"));
    }
    let f = if fraction_digits.is_undefined() { None } else { Some(f as usize) };
    Ok(JsValue::string(&format_exponential(x, f)))
}

fn number_to_precision(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.this_number(this)?;
    let precision = arg(args, 0);
    if precision.is_undefined() {
        return Ok(JsValue::string(&number_ops::to_string(x)));
    }
    let p = interp.to_integer_value(&precision)?;
    if !x.is_finite() {
        return Ok(JsValue::string(&number_ops::to_string(x)));
    }
    if !(1.0..=21.0).contains(&p) {
        return Err(interp.range_error("toPrecision() argument must be between 1 and 21"));
    }
    Ok(JsValue::string(&format_precision(x, p as usize)))
}

fn boolean_call(_interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(to_boolean(&arg(args, 0))))
}

fn boolean_construct(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let b = JsValue::Boolean(to_boolean(&arg(args, 0)));
    Ok(JsValue::Object(interp.to_object(&b)?))
}

fn boolean_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let b = interp.this_primitive(this, "Boolean")?;
    Ok(JsValue::string(&b.to_string()))
}

fn boolean_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    interp.this_primitive(this, "Boolean")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_rounds_half_up_on_exact_values() {
        assert_eq!(format_fixed(2.5, 0), "3");
        assert_eq!(format_fixed(1.005, 2), "1.00");
        assert_eq!(format_fixed(1.45, 1), "1.4");
        assert_eq!(format_fixed(0.000001, 2), "0.00");
        assert_eq!(format_fixed(0.5, 0), "1");
        assert_eq!(format_fixed(0.05, 1), "0.1");
        assert_eq!(format_fixed(123.456, 2), "123.46");
        assert_eq!(format_fixed(-1.5, 0), "-2");
        assert_eq!(format_fixed(99.99, 1), "100.0");
        assert_eq!(format_fixed(0.0, 3), "0.000");
        assert_eq!(format_fixed(1e21, 2), "1e+21");
        assert_eq!(format_fixed(1000000000000000128.0, 0), "1000000000000000128");
    }

    #[test]
    fn exponential_forms() {
        assert_eq!(format_exponential(123456.0, Some(2)), "1.23e+5");
        assert_eq!(format_exponential(123456.0, None), "1.23456e+5");
        assert_eq!(format_exponential(0.00015, Some(1)), "1.5e-4");
        assert_eq!(format_exponential(0.0, Some(2)), "0.00e+0");
        assert_eq!(format_exponential(0.0, None), "0e+0");
        assert_eq!(format_exponential(9.99, Some(1)), "1.0e+1");
        assert_eq!(format_exponential(-5.0, None), "-5e+0");
    }

    #[test]
    fn precision_forms() {
        assert_eq!(format_precision(123.456, 4), "123.5");
        assert_eq!(format_precision(0.000123, 2), "0.00012");
        assert_eq!(format_precision(123456.0, 2), "1.2e+5");
        assert_eq!(format_precision(1e-7, 1), "1e-7");
        assert_eq!(format_precision(0.0, 3), "0.00");
        assert_eq!(format_precision(99.0, 2), "99");
        assert_eq!(format_precision(99.5, 2), "1.0e+2");
    }

    #[test]
    fn radix_strings() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(-255.0, 2), "-11111111");
        assert_eq!(format_radix(0.5, 2), "0.1");
        assert_eq!(format_radix(0.0, 36), "0");
        assert_eq!(format_radix(35.0, 36), "z");
    }

    #[test]
    fn number_methods_from_script() {
        assert_eq!(eval_str("(255).toString(16)"), "ff");
        assert_eq!(eval_str("(3.14159).toFixed(2)"), "3.14");
        assert_eq!(eval_str("(1234.5678).toFixed()"), "1235");
        assert_eq!(eval_err("(1).toFixed(21)"), "RangeError");
        assert_eq!(eval_err("(1).toString(1)"), "RangeError");
        assert_eq!(eval_err("(1).toPrecision(0)"), "RangeError");
        assert_eq!(eval_str("NaN.toFixed(2) + Infinity.toExponential(30)"), "NaNInfinity");
        assert_eq!(eval_str("(12).toPrecision()"), "12");
        assert_eq!(eval_err("Number.prototype.valueOf.call('1')"), "TypeError");
        assert_eq!(eval_str("new Number(5) + 1"), "6");
        assert_eq!(eval_str("Number('  0x10 ') + Number()"), "16");
        assert_eq!(eval_str("Number.MAX_VALUE > 1e308 && Number.MIN_VALUE > 0"), "true");
    }

    #[test]
    fn boolean_wrappers() {
        assert_eq!(eval_str("Boolean('') + ':' + Boolean('x')"), "false:true");
        assert_eq!(eval_str("new Boolean(false) ? 'truthy' : 'falsy'"), "truthy");
        assert_eq!(eval_str("new Boolean(false).valueOf()"), "false");
        assert_eq!(eval_str("true.toString()"), "true");
        assert_eq!(eval_err("Boolean.prototype.toString.call(1)"), "TypeError");
    }
}
