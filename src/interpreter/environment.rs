use super::*;

/// The result of evaluating an identifier or property access.
#[derive(Debug, Clone)]
pub(crate) enum Reference {
    Environment {
        env: EnvRef,
        name: String,
        strict: bool,
    },
    Property {
        base: JsValue,
        name: String,
        strict: bool,
    },
    Unresolvable {
        name: String,
        strict: bool,
    },
}

impl Interpreter {
    pub(crate) fn resolve_identifier(&self, name: &str) -> Reference {
        let strict = self.is_strict();
        let mut cur = Some(self.lexical_env());
        while let Some(env) = cur {
            if self.has_binding(&env, name) {
                return Reference::Environment {
                    env,
                    name: name.to_string(),
                    strict,
                };
            }
            cur = env.borrow().parent.clone();
        }
        Reference::Unresolvable {
            name: name.to_string(),
            strict,
        }
    }

    pub(crate) fn get_value(&mut self, r: &Reference) -> JsResult<JsValue> {
        match r {
            Reference::Unresolvable { name, .. } => {
                Err(self.reference_error(&format!("{name} is not defined")))
            }
            Reference::Property { base, name, .. } => self.get_value_of(base, name),
            Reference::Environment { env, name, strict } => {
                self.get_binding_value(env, name, *strict)
            }
        }
    }

    pub(crate) fn put_value(&mut self, r: &Reference, value: JsValue) -> JsResult<()> {
        match r {
            Reference::Unresolvable { name, strict: true } => {
                Err(self.reference_error(&format!("{name} is not defined")))
            }
            Reference::Unresolvable { name, strict: false } => {
                let global = self.realm.global_object;
                self.put(global, name, value, false)
            }
            Reference::Property { base, name, strict } => {
                self.put_value_of(base, name, value, *strict)
            }
            Reference::Environment { env, name, strict } => {
                self.set_mutable_binding(env, name, value, *strict)
            }
        }
    }

    // ========================================================================
    // Environment records
    // ========================================================================

    pub(crate) fn has_binding(&self, env: &EnvRef, name: &str) -> bool {
        match &env.borrow().record {
            EnvironmentRecord::Declarative(bindings) => bindings.contains_key(name),
            EnvironmentRecord::Object { object, .. } => self.has_property(*object, name),
        }
    }

    pub(crate) fn create_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        deletable: bool,
    ) -> JsResult<()> {
        let object = match &mut env.borrow_mut().record {
            EnvironmentRecord::Declarative(bindings) => {
                let state = if deletable {
                    BindingState::MutableDeletable
                } else {
                    BindingState::MutableUndeletable
                };
                bindings.insert(
                    name.to_string(),
                    Binding {
                        value: JsValue::Undefined,
                        state,
                    },
                );
                return Ok(());
            }
            EnvironmentRecord::Object { object, .. } => *object,
        };
        let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, deletable);
        self.define_own_property(object, name, desc, true)?;
        Ok(())
    }

    pub(crate) fn set_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let object = match &mut env.borrow_mut().record {
            EnvironmentRecord::Declarative(bindings) => {
                match bindings.get_mut(name) {
                    Some(b)
                        if matches!(
                            b.state,
                            BindingState::MutableDeletable | BindingState::MutableUndeletable
                        ) =>
                    {
                        b.value = value;
                        return Ok(());
                    }
                    Some(_) if strict => {}
                    _ => return Ok(()),
                }
                None
            }
            EnvironmentRecord::Object { object, .. } => Some(*object),
        };
        match object {
            Some(o) => self.put(o, name, value, strict),
            None => Err(self.type_error(&format!("Assignment to constant variable '{name}'"))),
        }
    }

    pub(crate) fn get_binding_value(&mut self, env: &EnvRef, name: &str, strict: bool) -> JsResult<JsValue> {
        let object = match &env.borrow().record {
            EnvironmentRecord::Declarative(bindings) => match bindings.get(name) {
                Some(b) if b.state == BindingState::ImmutableUninitialized => {
                    if !strict {
                        return Ok(JsValue::Undefined);
                    }
                    None
                }
                Some(b) => return Ok(b.value.clone()),
                None => return Ok(JsValue::Undefined),
            },
            EnvironmentRecord::Object { object, .. } => Some(*object),
        };
        let Some(o) = object else {
            return Err(self.reference_error(&format!("{name} is not initialized")));
        };
        if !self.has_property(o, name) {
            if strict {
                return Err(self.reference_error(&format!("{name} is not defined")));
            }
            return Ok(JsValue::Undefined);
        }
        self.get(o, name)
    }

    pub(crate) fn delete_binding(&mut self, env: &EnvRef, name: &str) -> JsResult<bool> {
        let object = match &mut env.borrow_mut().record {
            EnvironmentRecord::Declarative(bindings) => {
                return Ok(match bindings.get(name) {
                    None => true,
                    Some(b) if b.state == BindingState::MutableDeletable => {
                        bindings.remove(name);
                        true
                    }
                    Some(_) => false,
                });
            }
            EnvironmentRecord::Object { object, .. } => *object,
        };
        self.delete(object, name, false)
    }

    /// The `this` value for a call through an environment reference.
    pub(crate) fn implicit_this_value(&self, env: &EnvRef) -> JsValue {
        match &env.borrow().record {
            EnvironmentRecord::Object {
                object,
                provide_this: true,
            } => JsValue::Object(*object),
            _ => JsValue::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn implicit_globals_in_sloppy_code() {
        assert_eq!(eval_str("function f() { leaked = 3; } f(); leaked"), "3");
        assert_eq!(eval_err("'use strict'; undeclared = 3"), "ReferenceError");
    }

    #[test]
    fn with_scopes_resolve_through_the_object() {
        assert_eq!(eval_str("var o = {x: 1}; with (o) { x = 2; } o.x"), "2");
        assert_eq!(
            eval_str("var o = {f: function() { return this === o; }}; with (o) { f(); }"),
            "true"
        );
        assert_eq!(eval_str("var x = 'outer'; with ({}) { x = 'set'; } x"), "set");
    }

    #[test]
    fn delete_respects_binding_kind() {
        assert_eq!(eval_str("var v = 1; delete v"), "false");
        assert_eq!(eval_str("g = 1; delete g"), "true");
        assert_eq!(eval_str("g = 1; delete g; typeof g"), "undefined");
        assert_eq!(eval_str("eval('var e = 1'); delete e"), "true");
        assert_eq!(eval_str("function f(a) { return delete a; } f(1)"), "false");
    }

    #[test]
    fn named_function_expression_binding_is_read_only() {
        assert_eq!(
            eval_str("var f = function g() { g = 1; return typeof g; }; f()"),
            "function"
        );
        assert_eq!(
            eval_err("var f = function g() { 'use strict'; g = 1; }; f()"),
            "TypeError"
        );
    }

    #[test]
    fn global_object_backs_global_bindings() {
        assert_eq!(eval_str("var q = 5; this.q"), "5");
        assert_eq!(eval_str("this.r = 6; r"), "6");
        assert_eq!(
            eval_str("var d = Object.getOwnPropertyDescriptor(this, 'q'); var q; d === undefined"),
            "false"
        );
    }
}
