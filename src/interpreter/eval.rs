use super::*;

const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expression) -> JsResult<JsValue> {
        let v = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.eval_expr_inner(expr))?;
        self.hold(&v);
        Ok(v)
    }

    fn eval_expr_inner(&mut self, expr: &Expression) -> JsResult<JsValue> {
        match expr {
            Expression::Literal(lit) => self.eval_literal(lit),
            Expression::Identifier(_) | Expression::Member(..) => {
                let r = self.eval_ref(expr)?;
                self.get_value(&r)
            }
            Expression::This => Ok(self.ctx().this_value.clone()),
            Expression::Array(elements) => self.eval_array_literal(elements),
            Expression::Object(props) => self.eval_object_literal(props),
            Expression::Function(def) => Ok(JsValue::Object(self.eval_function_expression(def))),
            Expression::Unary(op, arg) => {
                let v = self.eval_expr(arg)?;
                Ok(match op {
                    UnaryOp::Minus => JsValue::Number(number_ops::unary_minus(self.to_number(&v)?)),
                    UnaryOp::Plus => JsValue::Number(self.to_number(&v)?),
                    UnaryOp::Not => JsValue::Boolean(!to_boolean(&v)),
                    UnaryOp::BitNot => JsValue::Number(number_ops::bitwise_not(self.to_number(&v)?)),
                })
            }
            Expression::Binary(op, left, right) => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                self.apply_binary(*op, &l, &r)
            }
            Expression::Logical(op, left, right) => {
                let l = self.eval_expr(left)?;
                match (op, to_boolean(&l)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(l),
                    _ => self.eval_expr(right),
                }
            }
            Expression::Update(op, prefix, arg) => {
                let r = self.eval_ref(arg)?;
                let old = self.get_value(&r)?;
                let old = self.to_number(&old)?;
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_value(&r, JsValue::Number(new))?;
                Ok(JsValue::Number(if *prefix { new } else { old }))
            }
            Expression::Assign(op, target, value) => {
                let r = self.eval_ref(target)?;
                let v = match op.binary_op() {
                    None => self.eval_expr(value)?,
                    Some(bin) => {
                        let lv = self.get_value(&r)?;
                        let rv = self.eval_expr(value)?;
                        self.apply_binary(bin, &lv, &rv)?
                    }
                };
                self.put_value(&r, v.clone())?;
                Ok(v)
            }
            Expression::Conditional(test, consequent, alternate) => {
                let t = self.eval_expr(test)?;
                if to_boolean(&t) {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args),
            Expression::New(callee, args) => {
                let ctor = self.eval_expr(callee)?;
                let args = self.eval_arguments(args)?;
                if !self.is_constructor(&ctor) {
                    let what = describe_callee(callee);
                    return Err(self.type_error(&format!("{what} is not a constructor")));
                }
                self.construct(&ctor, &args)
            }
            Expression::Typeof(arg) => {
                let v = if arg.is_reference() {
                    let r = self.eval_ref(arg)?;
                    if matches!(r, Reference::Unresolvable { .. }) {
                        JsValue::Undefined
                    } else {
                        self.get_value(&r)?
                    }
                } else {
                    self.eval_expr(arg)?
                };
                Ok(JsValue::string(self.type_of(&v)))
            }
            Expression::Void(arg) => {
                self.eval_expr(arg)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(arg) => self.eval_delete(arg),
            Expression::Sequence(exprs) => {
                let mut last = JsValue::Undefined;
                for e in exprs {
                    last = self.eval_expr(e)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluates an expression that must produce a Reference.
    pub(crate) fn eval_ref(&mut self, expr: &Expression) -> JsResult<Reference> {
        match expr {
            Expression::Identifier(name) => Ok(self.resolve_identifier(name)),
            Expression::Member(object, property) => {
                let base = self.eval_expr(object)?;
                let key = match property {
                    MemberProperty::Dot(name) => {
                        self.check_member_base(&base, name)?;
                        name.clone()
                    }
                    MemberProperty::Computed(e) => {
                        let key = self.eval_expr(e)?;
                        if base.is_nullish() {
                            let shown = if key.is_object() { "[object]".to_string() } else { key.to_string() };
                            self.check_member_base(&base, &shown)?;
                        }
                        self.to_property_key(&key)?
                    }
                };
                Ok(Reference::Property {
                    base,
                    name: key,
                    strict: self.is_strict(),
                })
            }
            _ => {
                self.eval_expr(expr)?;
                Err(self.reference_error("Invalid left-hand side in assignment"))
            }
        }
    }

    fn check_member_base(&mut self, base: &JsValue, key: &str) -> JsResult<()> {
        if base.is_nullish() {
            return Err(self.type_error(&format!("Cannot read property '{key}' of {base}")));
        }
        Ok(())
    }

    fn eval_literal(&mut self, lit: &Literal) -> JsResult<JsValue> {
        Ok(match lit {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(s.clone()),
            Literal::RegExp(pattern, flags) => {
                let pattern = JsString::from_str(pattern);
                JsValue::Object(self.create_regexp(&pattern.code_units, flags)?)
            }
        })
    }

    fn eval_array_literal(&mut self, elements: &[Option<Expression>]) -> JsResult<JsValue> {
        let array = self.create_array(Vec::new());
        for (i, element) in elements.iter().enumerate() {
            if let Some(e) = element {
                let v = self.eval_expr(e)?;
                self.insert_property(array, &i.to_string(), PropertyDescriptor::data_default(v));
            }
        }
        self.insert_property(
            array,
            "length",
            PropertyDescriptor::data(JsValue::Number(elements.len() as f64), true, false, false),
        );
        Ok(JsValue::Object(array))
    }

    fn eval_object_literal(&mut self, props: &[Property]) -> JsResult<JsValue> {
        let o = self.create_object();
        for prop in props {
            let desc = match prop.kind {
                PropertyKind::Init => PropertyDescriptor::data_default(self.eval_expr(&prop.value)?),
                PropertyKind::Get | PropertyKind::Set => {
                    let f = self.eval_expr(&prop.value)?;
                    let mut desc = PropertyDescriptor {
                        enumerable: Some(true),
                        configurable: Some(true),
                        ..Default::default()
                    };
                    if prop.kind == PropertyKind::Get {
                        desc.get = Some(f);
                    } else {
                        desc.set = Some(f);
                    }
                    desc
                }
            };
            self.define_own_property(o, &prop.key, desc, false)?;
        }
        Ok(JsValue::Object(o))
    }

    fn eval_function_expression(&mut self, def: &Rc<FunctionDef>) -> JsObject {
        let scope = self.lexical_env();
        let Some(name) = &def.name else {
            return self.instantiate_function(def.clone(), scope);
        };
        let func_env = Environment::new_declarative(Some(scope));
        func_env.borrow_mut().create_immutable_binding(name);
        let closure = self.instantiate_function(def.clone(), func_env.clone());
        func_env
            .borrow_mut()
            .initialize_immutable_binding(name, JsValue::Object(closure));
        closure
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> JsResult<Vec<JsValue>> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    fn eval_call(&mut self, callee: &Expression, args: &[Expression]) -> JsResult<JsValue> {
        let (func, this, eval_candidate) = if callee.is_reference() {
            let r = self.eval_ref(callee)?;
            let func = self.get_value(&r)?;
            match r {
                Reference::Property { base, .. } => (func, base, false),
                Reference::Environment { env, name, .. } => {
                    let this = self.implicit_this_value(&env);
                    (func, this, name == "eval")
                }
                Reference::Unresolvable { .. } => (func, JsValue::Undefined, false),
            }
        } else {
            (self.eval_expr(callee)?, JsValue::Undefined, false)
        };
        let args = self.eval_arguments(args)?;
        if !self.is_callable(&func) {
            let what = describe_callee(callee);
            return Err(self.type_error(&format!("{what} is not a function")));
        }
        if eval_candidate && func.as_object() == Some(self.realm.eval_function) {
            let x = args.into_iter().next().unwrap_or(JsValue::Undefined);
            return self.perform_eval(&x, true);
        }
        self.call(&func, this, &args)
    }

    fn eval_delete(&mut self, arg: &Expression) -> JsResult<JsValue> {
        if !arg.is_reference() {
            self.eval_expr(arg)?;
            return Ok(JsValue::Boolean(true));
        }
        let r = self.eval_ref(arg)?;
        let deleted = match r {
            Reference::Unresolvable { strict: true, name } => {
                return Err(self.syntax_error(&format!("Delete of an unqualified identifier '{name}' in strict mode")));
            }
            Reference::Unresolvable { .. } => true,
            Reference::Property { base, name, strict } => {
                let o = self.to_object(&base)?;
                self.delete(o, &name, strict)?
            }
            Reference::Environment { env, name, .. } => self.delete_binding(&env, &name)?,
        };
        Ok(JsValue::Boolean(deleted))
    }

    pub(crate) fn apply_binary(&mut self, op: BinaryOp, l: &JsValue, r: &JsValue) -> JsResult<JsValue> {
        let numeric = |interp: &mut Self, f: fn(f64, f64) -> f64| -> JsResult<JsValue> {
            let a = interp.to_number(l)?;
            let b = interp.to_number(r)?;
            Ok(JsValue::Number(f(a, b)))
        };
        Ok(match op {
            BinaryOp::Add => {
                let lp = self.to_primitive(l, None)?;
                let rp = self.to_primitive(r, None)?;
                if lp.is_string() || rp.is_string() {
                    let ls = self.to_js_string(&lp)?;
                    let rs = self.to_js_string(&rp)?;
                    JsValue::String(ls.concat(&rs))
                } else {
                    JsValue::Number(self.to_number(&lp)? + self.to_number(&rp)?)
                }
            }
            BinaryOp::Sub => return numeric(self, |a, b| a - b),
            BinaryOp::Mul => return numeric(self, |a, b| a * b),
            BinaryOp::Div => return numeric(self, |a, b| a / b),
            BinaryOp::Mod => return numeric(self, number_ops::remainder),
            BinaryOp::LShift => return numeric(self, number_ops::left_shift),
            BinaryOp::RShift => return numeric(self, number_ops::signed_right_shift),
            BinaryOp::URShift => return numeric(self, number_ops::unsigned_right_shift),
            BinaryOp::BitAnd => return numeric(self, number_ops::bitwise_and),
            BinaryOp::BitOr => return numeric(self, number_ops::bitwise_or),
            BinaryOp::BitXor => return numeric(self, number_ops::bitwise_xor),
            BinaryOp::Eq => JsValue::Boolean(self.loose_equals(l, r)?),
            BinaryOp::NotEq => JsValue::Boolean(!self.loose_equals(l, r)?),
            BinaryOp::StrictEq => JsValue::Boolean(strict_equals(l, r)),
            BinaryOp::StrictNotEq => JsValue::Boolean(!strict_equals(l, r)),
            BinaryOp::Lt => JsValue::Boolean(self.abstract_relational(l, r, true)? == Some(true)),
            BinaryOp::Gt => JsValue::Boolean(self.abstract_relational(r, l, false)? == Some(true)),
            BinaryOp::LtEq => JsValue::Boolean(self.abstract_relational(r, l, false)? == Some(false)),
            BinaryOp::GtEq => JsValue::Boolean(self.abstract_relational(l, r, true)? == Some(false)),
            BinaryOp::Instanceof => JsValue::Boolean(self.has_instance(r, l)?),
            BinaryOp::In => {
                let JsValue::Object(o) = r else {
                    let key = self.to_js_string(l)?;
                    return Err(self.type_error(&format!(
                        "Cannot use 'in' operator to search for '{key}' in {r}"
                    )));
                };
                let key = self.to_property_key(l)?;
                JsValue::Boolean(self.has_property(*o, &key))
            }
        })
    }
}

/// Source-ish text for a callee in error messages.
fn describe_callee(callee: &Expression) -> String {
    match callee {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member(object, MemberProperty::Dot(name)) => {
            format!("{}.{name}", describe_callee(object))
        }
        Expression::Member(object, MemberProperty::Computed(_)) => {
            format!("{}[...]", describe_callee(object))
        }
        Expression::Literal(Literal::Number(n)) => number_ops::to_string(*n),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
        assert_eq!(eval_str("'a' + 1 + 2"), "a12");
        assert_eq!(eval_str("1 + 2 + 'a'"), "3a");
        assert_eq!(eval_str("5 % -3"), "2");
        assert_eq!(eval_str("-5 % 3"), "-2");
        assert_eq!(eval_str("1 / 0"), "Infinity");
        assert_eq!(eval_str("-1 >>> 0"), "4294967295");
        assert_eq!(eval_str("1 << 33"), "2");
        assert_eq!(eval_str("0.1 + 0.2"), "0.30000000000000004");
    }

    #[test]
    fn update_and_compound_assignment() {
        assert_eq!(eval_str("var i = '1'; i++; i"), "2");
        assert_eq!(eval_str("var i = 1; var j = i++ + ++i; j + ':' + i"), "4:3");
        assert_eq!(eval_str("var o = {n: 2}; o.n *= 5; o.n"), "10");
        assert_eq!(eval_str("var s = 'a'; s += 'b'; s"), "ab");
    }

    #[test]
    fn member_evaluation_order() {
        assert_eq!(
            eval_str(
                "var log = ''; var o = {}; try { null[{toString: function() { log += 's'; return 'k'; }}]; }\
                 catch (e) { log += e instanceof TypeError; } log"
            ),
            "true"
        );
        assert_eq!(eval_err("var u; u.x"), "TypeError");
    }

    #[test]
    fn typeof_and_delete() {
        assert_eq!(eval_str("typeof nothingHere"), "undefined");
        assert_eq!(eval_str("typeof null"), "object");
        assert_eq!(eval_str("typeof function() {}"), "function");
        assert_eq!(eval_str("typeof /x/"), "object");
        assert_eq!(eval_str("var o = {a: 1}; delete o.a; 'a' in o"), "false");
        assert_eq!(eval_str("delete 1"), "true");
        assert_eq!(eval_str("delete Math.PI"), "false");
        assert_eq!(eval_err("'use strict'; delete Math.PI"), "TypeError");
    }

    #[test]
    fn call_errors_name_the_callee() {
        assert_eq!(
            eval("var o = {}; o.missing()").unwrap_err(),
            "TypeError: o.missing is not a function"
        );
        assert_eq!(eval("var x = 1; x()").unwrap_err(), "TypeError: x is not a function");
    }

    #[test]
    fn invalid_assignment_target_throws_at_runtime() {
        assert_eq!(eval_err("function f() {} f() = 1"), "ReferenceError");
    }

    #[test]
    fn in_and_instanceof() {
        assert_eq!(eval_str("'length' in []"), "true");
        assert_eq!(eval_str("0 in [1]"), "true");
        assert_eq!(eval_err("'a' in 'abc'"), "TypeError");
        assert_eq!(eval_str("[] instanceof Array"), "true");
        assert_eq!(eval_str("[] instanceof Object"), "true");
        assert_eq!(eval_str("1 instanceof Number"), "false");
        assert_eq!(eval_err("({}) instanceof {}"), "TypeError");
    }

    #[test]
    fn object_literal_accessors() {
        assert_eq!(
            eval_str("var o = { _v: 1, get v() { return this._v; }, set v(x) { this._v = x * 2; } }; o.v = 5; o.v"),
            "10"
        );
        assert_eq!(eval_str("var o = {a: 1, a: 2}; o.a"), "2");
    }

    #[test]
    fn regexp_literals_are_fresh_objects() {
        assert_eq!(eval_str("function f() { return /a/; } f() === f()"), "false");
    }
}
