use super::*;
use std::cell::Cell;

thread_local! {
    static RANDOM_STATE: Cell<u64> = const { Cell::new(0) };
}

/// xorshift64*, seeded from the clock on first use.
fn next_random() -> f64 {
    RANDOM_STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            let now = chrono::Utc::now();
            x = (now.timestamp() as u64).rotate_left(32) ^ u64::from(now.timestamp_subsec_nanos()) | 1;
        }
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        state.set(x);
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
        bits as f64 / (1u64 << 53) as f64
    })
}

fn js_round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if x > 0.0 && x < 0.5 {
        return 0.0;
    }
    if x < 0.0 && x >= -0.5 {
        return -0.0;
    }
    let f = x.floor();
    if x - f >= 0.5 { f + 1.0 } else { f }
}

fn js_pow(x: f64, y: f64) -> f64 {
    if y.is_nan() || (x.abs() == 1.0 && y.is_infinite()) {
        return f64::NAN;
    }
    x.powf(y)
}

const UNARY: &[(&str, fn(f64) -> f64)] = &[
    ("abs", f64::abs),
    ("acos", f64::acos),
    ("asin", f64::asin),
    ("atan", f64::atan),
    ("ceil", f64::ceil),
    ("cos", f64::cos),
    ("exp", f64::exp),
    ("floor", f64::floor),
    ("log", f64::ln),
    ("round", js_round),
    ("sin", f64::sin),
    ("sqrt", f64::sqrt),
    ("tan", f64::tan),
];

impl Interpreter {
    pub(crate) fn setup_math(&mut self) {
        let object_proto = self.realm.object_prototype;
        let math = self.create_object_with("Math", Some(object_proto));
        {
            let rc = self.obj(math);
            let mut m = rc.borrow_mut();
            for (name, value) in [
                ("E", std::f64::consts::E),
                ("LN10", std::f64::consts::LN_10),
                ("LN2", std::f64::consts::LN_2),
                ("LOG2E", std::f64::consts::LOG2_E),
                ("LOG10E", std::f64::consts::LOG10_E),
                ("PI", std::f64::consts::PI),
                ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
                ("SQRT2", std::f64::consts::SQRT_2),
            ] {
                m.insert_constant(name.to_string(), JsValue::Number(value));
            }
        }
        for &(name, op) in UNARY {
            let f = self.create_function(
                JsFunction::native(name, 1, move |interp, _this, args| {
                    interp.to_number(&arg(args, 0)).map(|x| JsValue::Number(op(x))).into()
                }),
                1,
            );
            self.insert_builtin(math, name, JsValue::Object(f));
        }
        self.define_methods(
            math,
            &[
                ("atan2", 2, math_atan2),
                ("max", 2, math_max),
                ("min", 2, math_min),
                ("pow", 2, math_pow),
                ("random", 0, math_random),
            ],
        );
        self.define_global("Math", JsValue::Object(math));
    }

    fn numbers(&mut self, args: &[JsValue]) -> JsResult<Vec<f64>> {
        args.iter().map(|a| self.to_number(a)).collect()
    }
}

fn math_atan2(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let y = interp.to_number(&arg(args, 0))?;
    let x = interp.to_number(&arg(args, 1))?;
    Ok(JsValue::Number(y.atan2(x)))
}

fn math_max(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut result = f64::NEG_INFINITY;
    for n in interp.numbers(args)? {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n > result || (n == 0.0 && result == 0.0 && n.is_sign_positive()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn math_min(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut result = f64::INFINITY;
    for n in interp.numbers(args)? {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn math_pow(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let x = interp.to_number(&arg(args, 0))?;
    let y = interp.to_number(&arg(args, 1))?;
    Ok(JsValue::Number(js_pow(x, y)))
}

fn math_random(_interp: &mut Interpreter, _this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Number(next_random()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rounding_edges() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(0.49999999999999994), 0.0);
        assert!(js_round(-0.2).is_sign_negative());
        assert_eq!(js_round(1e300), 1e300);
        assert!(js_round(f64::NAN).is_nan());
    }

    #[test]
    fn pow_differs_from_powf() {
        assert!(js_pow(1.0, f64::NAN).is_nan());
        assert!(js_pow(-1.0, f64::INFINITY).is_nan());
        assert_eq!(js_pow(f64::NAN, 0.0), 1.0);
        assert_eq!(js_pow(2.0, 10.0), 1024.0);
    }

    #[test]
    fn min_max_signed_zero_and_nan() {
        assert_eq!(eval_str("1 / Math.max(-0, 0)"), "Infinity");
        assert_eq!(eval_str("1 / Math.min(0, -0)"), "-Infinity");
        assert_eq!(eval_str("Math.max()"), "-Infinity");
        assert_eq!(eval_str("Math.min()"), "Infinity");
        assert_eq!(eval_str("Math.max(1, 'x', 3)"), "NaN");
        assert_eq!(eval_str("Math.min(4, '2', 3)"), "2");
    }

    #[test]
    fn unary_functions_and_constants() {
        assert_eq!(eval_str("Math.floor(-1.5) + ',' + Math.ceil(1.2) + ',' + Math.abs(-3)"), "-2,2,3");
        assert_eq!(eval_str("Math.sqrt(16) + Math.pow(2, 3)"), "12");
        assert_eq!(eval_str("Math.PI = 3; Math.PI > 3.14"), "true");
        assert_eq!(eval_str("Object.prototype.toString.call(Math)"), "[object Math]");
        assert_eq!(eval_str("Math.round.length + Math.max.length"), "3");
    }

    #[test]
    fn random_stays_in_unit_interval() {
        for _ in 0..1000 {
            let r = next_random();
            assert!((0.0..1.0).contains(&r));
        }
        assert_eq!(eval_str("var r = Math.random(); r >= 0 && r < 1"), "true");
    }
}
