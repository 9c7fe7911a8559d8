use super::*;
use crate::parser::parse_eval;

/// The callee-side inputs to declaration binding instantiation.
pub(crate) struct FunctionCall<'a> {
    pub function: JsObject,
    pub def: &'a FunctionDef,
    pub args: &'a [JsValue],
}

impl Interpreter {
    // ========================================================================
    // [[Call]] / [[Construct]]
    // ========================================================================

    pub(crate) fn call(&mut self, f: &JsValue, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let callable = match f {
            JsValue::Object(o) => self.obj(*o).borrow().callable.clone(),
            _ => None,
        };
        let (Some(func), JsValue::Object(fo)) = (callable, f) else {
            let shown = self.display(f);
            return Err(self.type_error(&format!("{shown} is not a function")));
        };
        self.enter_call()?;
        // the callee's temporaries are released on return; only the result is held again
        let mark = self.held_mark();
        let result = match func {
            JsFunction::User { def, scope, strict } => self.call_user(*fo, &def, scope, strict, this, args),
            JsFunction::Native { call, .. } => completion_to_result(call(self, &this, args)),
            JsFunction::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args;
                all.extend_from_slice(args);
                self.call(&JsValue::Object(target), bound_this, &all)
            }
        };
        self.leave_call();
        self.release_held(mark);
        let (Ok(v) | Err(v)) = &result;
        self.hold(v);
        result
    }

    pub(crate) fn construct(&mut self, f: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let callable = match f {
            JsValue::Object(o) => self.obj(*o).borrow().callable.clone(),
            _ => None,
        };
        let (Some(func), JsValue::Object(fo)) = (callable, f) else {
            let shown = self.display(f);
            return Err(self.type_error(&format!("{shown} is not a constructor")));
        };
        match func {
            JsFunction::User { .. } => {
                let proto = match self.get(*fo, "prototype")? {
                    JsValue::Object(p) => p,
                    _ => self.realm.object_prototype,
                };
                let obj = self.create_object_with("Object", Some(proto));
                let this = JsValue::Object(obj);
                let result = self.call(f, this.clone(), args)?;
                Ok(if result.is_object() { result } else { this })
            }
            JsFunction::Native {
                construct: Some(construct),
                ..
            } => {
                self.enter_call()?;
                let mark = self.held_mark();
                let result = completion_to_result(construct(self, &JsValue::Undefined, args));
                self.leave_call();
                self.release_held(mark);
                let (Ok(v) | Err(v)) = &result;
                self.hold(v);
                result
            }
            JsFunction::Native { name, .. } => {
                Err(self.type_error(&format!("{name} is not a constructor")))
            }
            JsFunction::Bound {
                target,
                args: bound_args,
                ..
            } => {
                let mut all = bound_args;
                all.extend_from_slice(args);
                self.construct(&JsValue::Object(target), &all)
            }
        }
    }

    fn call_user(
        &mut self,
        function: JsObject,
        def: &Rc<FunctionDef>,
        scope: EnvRef,
        strict: bool,
        this: JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let this_value = if strict {
            this
        } else {
            match this {
                JsValue::Undefined | JsValue::Null => JsValue::Object(self.realm.global_object),
                JsValue::Object(_) => this,
                primitive => JsValue::Object(self.to_object(&primitive)?),
            }
        };
        let env = Environment::new_declarative(Some(scope));
        self.contexts.push(ExecutionContext {
            lexical_env: env.clone(),
            variable_env: env.clone(),
            this_value,
            strict,
        });
        let call = FunctionCall {
            function,
            def,
            args,
        };
        let completion = match self.declaration_binding_instantiation(&def.code, Some(call), &env, false) {
            Ok(()) => self.exec_statements(&def.code.body),
            Err(e) => Completion::Throw(e),
        };
        self.contexts.pop();
        match completion {
            Completion::Return(v) => Ok(v),
            Completion::Throw(e) => Err(e),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// `[[HasInstance]]` for `instanceof`.
    pub(crate) fn has_instance(&mut self, f: &JsValue, v: &JsValue) -> JsResult<bool> {
        let callable = match f {
            JsValue::Object(o) => self.obj(*o).borrow().callable.clone(),
            _ => None,
        };
        let (Some(func), JsValue::Object(fo)) = (callable, f) else {
            return Err(self.type_error("Expecting a function in instanceof check"));
        };
        if let JsFunction::Bound { target, .. } = func {
            return self.has_instance(&JsValue::Object(target), v);
        }
        let JsValue::Object(mut o) = v.clone() else {
            return Ok(false);
        };
        let JsValue::Object(proto) = self.get(*fo, "prototype")? else {
            return Err(self.type_error("Function has non-object prototype in instanceof check"));
        };
        loop {
            let next = self.obj(o).borrow().prototype;
            match next {
                None => return Ok(false),
                Some(p) if p == proto => return Ok(true),
                Some(p) => o = p,
            }
        }
    }

    // ========================================================================
    // Function objects
    // ========================================================================

    /// Creates a function object for a declaration or expression closing over `scope`.
    pub(crate) fn instantiate_function(&mut self, def: Rc<FunctionDef>, scope: EnvRef) -> JsObject {
        let strict = def.code.strict;
        let arity = def.params.len();
        let f = self.create_function(JsFunction::User { def, scope, strict }, arity);
        let proto = self.create_object();
        self.obj(proto)
            .borrow_mut()
            .insert_builtin("constructor".to_string(), JsValue::Object(f));
        self.insert_property(
            f,
            "prototype",
            PropertyDescriptor::data(JsValue::Object(proto), true, false, false),
        );
        if strict {
            self.add_poison_pills(f, &["caller", "arguments"]);
        }
        f
    }

    /// Accessors that throw a TypeError on any access.
    pub(crate) fn add_poison_pills(&mut self, o: JsObject, names: &[&str]) {
        let thrower = JsValue::Object(self.realm.throw_type_error);
        for name in names {
            self.insert_property(
                o,
                name,
                PropertyDescriptor::accessor(thrower.clone(), thrower.clone(), false, false),
            );
        }
    }

    pub(crate) fn create_bound_function(
        &mut self,
        target: JsObject,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> JsResult<JsObject> {
        let arity = if self.class_of(target) == "Function" {
            let len = self.get(target, "length")?;
            let len = self.to_number(&len)?;
            (len - args.len() as f64).max(0.0) as usize
        } else {
            0
        };
        let f = self.create_function(JsFunction::Bound { target, this, args }, arity);
        self.add_poison_pills(f, &["caller", "arguments"]);
        Ok(f)
    }

    // ========================================================================
    // Declaration binding instantiation
    // ========================================================================

    /// Binds parameters, hoisted functions, `arguments` and vars of `code` in
    /// `env`. `configurable` is set for eval code.
    pub(crate) fn declaration_binding_instantiation(
        &mut self,
        code: &Code,
        call: Option<FunctionCall<'_>>,
        env: &EnvRef,
        configurable: bool,
    ) -> JsResult<()> {
        let strict = code.strict;
        if let Some(call) = &call {
            for (i, name) in call.def.params.iter().enumerate() {
                let v = call.args.get(i).cloned().unwrap_or(JsValue::Undefined);
                if !self.has_binding(env, name) {
                    self.create_mutable_binding(env, name, false)?;
                }
                self.set_mutable_binding(env, name, v, strict)?;
            }
        }
        let is_global = Rc::ptr_eq(env, &self.global_env);
        for def in &code.functions {
            let Some(name) = &def.name else { continue };
            let fo = self.instantiate_function(def.clone(), env.clone());
            if !self.has_binding(env, name) {
                self.create_mutable_binding(env, name, configurable)?;
            } else if is_global {
                let global = self.realm.global_object;
                match self.get_property(global, name) {
                    Some(existing) if existing.configurable() => {
                        let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, configurable);
                        self.define_own_property(global, name, desc, true)?;
                    }
                    Some(existing)
                        if existing.is_accessor_descriptor()
                            || !(existing.writable() && existing.enumerable()) =>
                    {
                        return Err(self.type_error(&format!("Cannot redefine global function {name}")));
                    }
                    _ => {}
                }
            }
            self.set_mutable_binding(env, name, JsValue::Object(fo), strict)?;
        }
        if let Some(call) = &call
            && !self.has_binding(env, "arguments")
        {
            let args_obj = self.create_arguments_object(call, env, strict);
            if strict {
                let mut record = env.borrow_mut();
                record.create_immutable_binding("arguments");
                record.initialize_immutable_binding("arguments", JsValue::Object(args_obj));
            } else {
                self.create_mutable_binding(env, "arguments", false)?;
                self.set_mutable_binding(env, "arguments", JsValue::Object(args_obj), false)?;
            }
        }
        for name in &code.var_names {
            if !self.has_binding(env, name) {
                self.create_mutable_binding(env, name, configurable)?;
                self.set_mutable_binding(env, name, JsValue::Undefined, strict)?;
            }
        }
        Ok(())
    }

    fn create_arguments_object(&mut self, call: &FunctionCall<'_>, env: &EnvRef, strict: bool) -> JsObject {
        let proto = self.realm.object_prototype;
        let mut data = JsObjectData::with_class("Arguments", Some(proto));
        data.insert_builtin(
            "length".to_string(),
            JsValue::Number(call.args.len() as f64),
        );
        for (i, v) in call.args.iter().enumerate() {
            data.insert_value(i.to_string(), v.clone());
        }
        if !strict {
            let mut map = FxHashMap::default();
            let mut mapped_names = FxHashSet::default();
            let params = &call.def.params;
            for index in (0..call.args.len().min(params.len())).rev() {
                let name = &params[index];
                if mapped_names.insert(name.clone()) {
                    map.insert(index.to_string(), (env.clone(), name.clone()));
                }
            }
            data.insert_builtin("callee".to_string(), JsValue::Object(call.function));
            if !map.is_empty() {
                data.parameter_map = Some(map);
            }
        }
        let o = self.alloc(data);
        if strict {
            self.add_poison_pills(o, &["caller", "callee"]);
        }
        o
    }

    // ========================================================================
    // eval
    // ========================================================================

    /// Runs `x` as eval code. Direct calls share the caller's environments and
    /// `this`; indirect ones run as global code.
    pub(crate) fn perform_eval(&mut self, x: &JsValue, direct: bool) -> JsResult<JsValue> {
        let JsValue::String(source) = x else {
            return Ok(x.clone());
        };
        let caller_strict = direct && self.is_strict();
        let program = match parse_eval(&source.to_rust_string(), caller_strict) {
            Ok(p) => p,
            Err(e) => return Err(self.syntax_error(&e.message)),
        };
        let code = program.code;
        let strict = code.strict;
        tracing::trace!(direct, strict, "eval");
        let mut ctx = if direct {
            self.ctx().clone()
        } else {
            ExecutionContext {
                lexical_env: self.global_env.clone(),
                variable_env: self.global_env.clone(),
                this_value: JsValue::Object(self.realm.global_object),
                strict: false,
            }
        };
        if strict {
            let env = Environment::new_declarative(Some(ctx.lexical_env.clone()));
            ctx.lexical_env = env.clone();
            ctx.variable_env = env;
        }
        ctx.strict = strict;
        let var_env = ctx.variable_env.clone();
        self.enter_call()?;
        self.contexts.push(ctx);
        let completion = match self.declaration_binding_instantiation(&code, None, &var_env, true) {
            Ok(()) => self.exec_statements(&code.body),
            Err(e) => Completion::Throw(e),
        };
        self.leave_call();
        self.contexts.pop();
        match completion {
            Completion::Normal(v) => Ok(v.unwrap_or(JsValue::Undefined)),
            Completion::Throw(e) => Err(e),
            _ => Ok(JsValue::Undefined),
        }
    }
}

pub(crate) fn completion_to_result(c: Completion) -> JsResult<JsValue> {
    match c {
        Completion::Normal(v) => Ok(v.unwrap_or(JsValue::Undefined)),
        Completion::Return(v) => Ok(v),
        Completion::Throw(e) => Err(e),
        Completion::Break(..) | Completion::Continue(..) => Ok(JsValue::Undefined),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn this_binding_modes() {
        assert_eq!(eval_str("function f() { return this; } f() === this"), "true");
        assert_eq!(eval_str("function f() { 'use strict'; return this; } f()"), "undefined");
        assert_eq!(eval_str("function f() { return typeof this; } f.call(1)"), "object");
        assert_eq!(
            eval_str("function f() { 'use strict'; return typeof this; } f.call(1)"),
            "number"
        );
    }

    #[test]
    fn constructors_and_prototypes() {
        assert_eq!(
            eval_str("function P(x) { this.x = x; } P.prototype.get = function() { return this.x; }; new P(3).get()"),
            "3"
        );
        assert_eq!(eval_str("function F() { return {y: 1}; } new F().y"), "1");
        assert_eq!(eval_str("function F() { return 1; } typeof new F()"), "object");
        assert_eq!(eval_str("function F() {} F.prototype = 3; Object.getPrototypeOf(new F()) === Object.prototype"), "true");
        assert_eq!(eval_str("function F() {} F.prototype.constructor === F"), "true");
        assert_eq!(eval_err("new Math.max()"), "TypeError");
        assert_eq!(eval_err("new 3"), "TypeError");
    }

    #[test]
    fn bound_functions() {
        assert_eq!(
            eval_str("function f(a, b) { return this.v + a + b; } var g = f.bind({v: 1}, 2); g(3)"),
            "6"
        );
        assert_eq!(eval_str("function f(a, b, c) {} f.bind(null, 1).length"), "2");
        assert_eq!(
            eval_str("function P(a, b) { this.s = a + b; } var B = P.bind(null, 1); var o = new B(2); o.s + ':' + (o instanceof P) + ':' + (o instanceof B)"),
            "3:true:true"
        );
        assert_eq!(eval_err("function f() {} f.bind(null).caller"), "TypeError");
    }

    #[test]
    fn strict_function_poison_pills() {
        assert_eq!(eval_err("function f() { 'use strict'; } f.caller"), "TypeError");
        assert_eq!(eval_err("function f() { 'use strict'; return arguments.callee; } f()"), "TypeError");
        assert_eq!(eval_str("function f() { return arguments.callee === f; } f()"), "true");
    }

    #[test]
    fn hoisting() {
        assert_eq!(eval_str("f(); function f() { return 1; } typeof f"), "function");
        assert_eq!(eval_str("var r = typeof v; var v = 1; r"), "undefined");
        assert_eq!(eval_str("function f() { return 1; } function f() { return 2; } f()"), "2");
        assert_eq!(eval_str("function f(a) { var a; return a; } f(5)"), "5");
        assert_eq!(eval_str("function f(a, a) { return a; } f(1, 2)"), "2");
        assert_eq!(eval_str("function f() { var arguments; return typeof arguments; } f()"), "object");
        assert_eq!(eval_str("function f(arguments) { return arguments; } f(3)"), "3");
    }

    #[test]
    fn direct_and_indirect_eval() {
        assert_eq!(eval_str("var x = 'g'; function f() { var x = 'l'; return eval('x'); } f()"), "l");
        assert_eq!(
            eval_str("var x = 'g'; function f() { var x = 'l'; var e = eval; return e('x'); } f()"),
            "g"
        );
        assert_eq!(eval_str("function f() { eval('var y = 2'); return y; } f()"), "2");
        assert_eq!(
            eval_str("function f() { 'use strict'; eval('var y = 2'); return typeof y; } f()"),
            "undefined"
        );
        assert_eq!(eval_str("eval('1; if (false) 2;')"), "1");
        assert_eq!(eval_str("eval(42)"), "42");
        assert_eq!(eval_err("eval('a b')"), "SyntaxError");
        assert_eq!(eval_str("(0, eval)('this') === this"), "true");
        assert_eq!(eval_str("var o = {}; function f() { return eval('this'); } f.call(o) === o"), "true");
    }

    #[test]
    fn eval_inherits_strictness_only_directly() {
        assert_eq!(eval_err("'use strict'; eval('with ({}) {}')"), "SyntaxError");
        assert_eq!(eval_str("'use strict'; var e = eval; e('with ({}) {}; 1')"), "1");
    }
}
