use super::*;

impl Interpreter {
    pub(crate) fn setup_object(&mut self) {
        let proto = self.realm.object_prototype;
        let ctor = self.native_constructor("Object", 1, object_call, object_construct, proto);
        self.define_methods(
            ctor,
            &[
                ("getPrototypeOf", 1, object_get_prototype_of),
                ("getOwnPropertyDescriptor", 2, object_get_own_property_descriptor),
                ("getOwnPropertyNames", 1, object_get_own_property_names),
                ("create", 2, object_create),
                ("defineProperty", 3, object_define_property),
                ("defineProperties", 2, object_define_properties),
                ("seal", 1, object_seal),
                ("freeze", 1, object_freeze),
                ("preventExtensions", 1, object_prevent_extensions),
                ("isSealed", 1, object_is_sealed),
                ("isFrozen", 1, object_is_frozen),
                ("isExtensible", 1, object_is_extensible),
                ("keys", 1, object_keys),
            ],
        );
        self.define_methods(
            proto,
            &[
                ("toString", 0, object_proto_to_string),
                ("toLocaleString", 0, object_proto_to_locale_string),
                ("valueOf", 0, object_proto_value_of),
                ("hasOwnProperty", 1, object_proto_has_own_property),
                ("isPrototypeOf", 1, object_proto_is_prototype_of),
                ("propertyIsEnumerable", 1, object_proto_property_is_enumerable),
            ],
        );
        self.define_global("Object", JsValue::Object(ctor));
    }

    /// The object argument of an `Object.*` static, or a TypeError naming the
    /// method.
    fn object_arg(&mut self, v: &JsValue, method: &str) -> JsResult<JsObject> {
        match v {
            JsValue::Object(o) => Ok(*o),
            _ => Err(self.type_error(&format!("Object.{method} called on non-object"))),
        }
    }

    fn define_properties(&mut self, o: JsObject, props: &JsValue) -> JsResult<()> {
        let props = self.to_object(props)?;
        let mut descriptors = Vec::new();
        for key in self.enumerable_own_keys(props) {
            let desc_obj = self.get(props, &key)?;
            descriptors.push((key, self.to_property_descriptor(&desc_obj)?));
        }
        for (key, desc) in descriptors {
            self.define_own_property(o, &key, desc, true)?;
        }
        Ok(())
    }

    /// Shared body of `seal` and `freeze`.
    fn lock_down(&mut self, o: JsObject, freeze: bool) -> JsResult<()> {
        for key in self.own_property_keys(o) {
            let Some(mut desc) = self.get_own_property(o, &key) else {
                continue;
            };
            if freeze && desc.is_data_descriptor() {
                desc.writable = Some(false);
            }
            desc.configurable = Some(false);
            self.define_own_property(o, &key, desc, true)?;
        }
        self.obj(o).borrow_mut().extensible = false;
        Ok(())
    }

    fn test_locked(&self, o: JsObject, frozen: bool) -> bool {
        let all_locked = self.own_property_keys(o).iter().all(|key| {
            self.get_own_property(o, key).is_none_or(|desc| {
                !desc.configurable() && !(frozen && desc.is_data_descriptor() && desc.writable())
            })
        });
        all_locked && !self.obj(o).borrow().extensible
    }
}

fn object_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match arg(args, 0) {
        JsValue::Undefined | JsValue::Null => Ok(JsValue::Object(interp.create_object())),
        v => Ok(JsValue::Object(interp.to_object(&v)?)),
    }
}

fn object_construct(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match arg(args, 0) {
        v @ JsValue::Object(_) => Ok(v),
        _ => object_call(interp, this, args),
    }
}

fn object_get_prototype_of(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "getPrototypeOf")?;
    Ok(interp
        .obj(o)
        .borrow()
        .prototype
        .map_or(JsValue::Null, JsValue::Object))
}

fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: &JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "getOwnPropertyDescriptor")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    match interp.get_own_property(o, &key) {
        Some(desc) => Ok(interp.from_property_descriptor(&desc)),
        None => Ok(JsValue::Undefined),
    }
}

fn object_get_own_property_names(
    interp: &mut Interpreter,
    _this: &JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "getOwnPropertyNames")?;
    let names = interp
        .own_property_keys(o)
        .into_iter()
        .map(|k| JsValue::String(JsString::from_property_key(&k)))
        .collect();
    Ok(JsValue::Object(interp.create_array(names)))
}

fn object_create(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let proto = match arg(args, 0) {
        JsValue::Object(p) => Some(p),
        JsValue::Null => None,
        _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
    };
    let o = interp.create_object_with("Object", proto);
    let props = arg(args, 1);
    if !props.is_undefined() {
        interp.define_properties(o, &props)?;
    }
    Ok(JsValue::Object(o))
}

fn object_define_property(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let o = interp.object_arg(&target, "defineProperty")?;
    let key = interp.to_property_key(&arg(args, 1))?;
    let desc = interp.to_property_descriptor(&arg(args, 2))?;
    interp.define_own_property(o, &key, desc, true)?;
    Ok(target)
}

fn object_define_properties(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let o = interp.object_arg(&target, "defineProperties")?;
    interp.define_properties(o, &arg(args, 1))?;
    Ok(target)
}

fn object_seal(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let o = interp.object_arg(&target, "seal")?;
    interp.lock_down(o, false)?;
    Ok(target)
}

fn object_freeze(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let o = interp.object_arg(&target, "freeze")?;
    interp.lock_down(o, true)?;
    Ok(target)
}

fn object_prevent_extensions(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = arg(args, 0);
    let o = interp.object_arg(&target, "preventExtensions")?;
    interp.obj(o).borrow_mut().extensible = false;
    Ok(target)
}

fn object_is_sealed(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "isSealed")?;
    Ok(JsValue::Boolean(interp.test_locked(o, false)))
}

fn object_is_frozen(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "isFrozen")?;
    Ok(JsValue::Boolean(interp.test_locked(o, true)))
}

fn object_is_extensible(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "isExtensible")?;
    Ok(JsValue::Boolean(interp.obj(o).borrow().extensible))
}

fn object_keys(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.object_arg(&arg(args, 0), "keys")?;
    let keys = interp
        .enumerable_own_keys(o)
        .into_iter()
        .map(|k| JsValue::String(JsString::from_property_key(&k)))
        .collect();
    Ok(JsValue::Object(interp.create_array(keys)))
}

fn object_proto_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let class = match this {
        JsValue::Undefined => "Undefined".to_string(),
        JsValue::Null => "Null".to_string(),
        v => {
            let o = interp.to_object(v)?;
            interp.class_of(o)
        }
    };
    Ok(JsValue::string(&format!("[object {class}]")))
}

fn object_proto_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let to_string = interp.get(o, "toString")?;
    if !interp.is_callable(&to_string) {
        return Err(interp.type_error("toString is not a function"));
    }
    interp.call(&to_string, this.clone(), &[])
}

fn object_proto_value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Object(interp.to_object(this)?))
}

fn object_proto_has_own_property(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let o = interp.to_object(this)?;
    Ok(JsValue::Boolean(interp.get_own_property(o, &key).is_some()))
}

fn object_proto_is_prototype_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let JsValue::Object(mut v) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    let o = interp.to_object(this)?;
    loop {
        let proto = interp.obj(v).borrow().prototype;
        match proto {
            None => return Ok(JsValue::Boolean(false)),
            Some(p) if p == o => return Ok(JsValue::Boolean(true)),
            Some(p) => v = p,
        }
    }
}

fn object_proto_property_is_enumerable(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let o = interp.to_object(this)?;
    Ok(JsValue::Boolean(
        interp.get_own_property(o, &key).is_some_and(|d| d.enumerable()),
    ))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn constructor_wraps_and_passes_through() {
        assert_eq!(eval_str("var o = {}; Object(o) === o && new Object(o) === o"), "true");
        assert_eq!(eval_str("typeof Object('s') + ':' + (Object(1) instanceof Number)"), "object:true");
        assert_eq!(eval_str("Object.getPrototypeOf(Object(null)) === Object.prototype"), "true");
    }

    #[test]
    fn create_with_descriptors() {
        assert_eq!(
            eval_str(
                "var p = {greet: function() { return 'hi ' + this.n; }};\
                 var o = Object.create(p, {n: {value: 'bob', enumerable: true}});\
                 o.greet() + ':' + Object.keys(o).join(',') + ':' + (Object.getPrototypeOf(o) === p)"
            ),
            "hi bob:n:true"
        );
        assert_eq!(eval_str("Object.getPrototypeOf(Object.create(null))"), "null");
        assert_eq!(eval_err("Object.create(1)"), "TypeError");
    }

    #[test]
    fn seal_and_freeze() {
        assert_eq!(
            eval_str(
                "var o = Object.seal({a: 1}); o.a = 2; o.b = 3; delete o.a;\
                 o.a + ':' + o.b + ':' + Object.isSealed(o) + ':' + Object.isFrozen(o)"
            ),
            "2:undefined:true:false"
        );
        assert_eq!(
            eval_str("var f = Object.freeze({a: 1}); f.a = 9; f.a + ':' + Object.isFrozen(f)"),
            "1:true"
        );
        assert_eq!(eval_err("'use strict'; var f = Object.freeze({a: 1}); f.a = 2"), "TypeError");
        assert_eq!(
            eval_str("var e = Object.preventExtensions({}); e.x = 1; Object.isExtensible(e) + ':' + e.x"),
            "false:undefined"
        );
        assert_eq!(eval_str("Object.isFrozen(Object.preventExtensions({}))"), "true");
    }

    #[test]
    fn property_name_listing() {
        assert_eq!(eval_err("Object.getOwnPropertyNames('ab')"), "TypeError");
        assert_eq!(
            eval_str("Object.getOwnPropertyNames(new String('ab')).join(',')"),
            "0,1,length"
        );
        assert_eq!(eval_str("Object.keys([5, 6]).join(',')"), "0,1");
        assert_eq!(
            eval_str("Object.getOwnPropertyNames([1]).join(',')"),
            "0,length"
        );
        assert_eq!(eval_err("Object.keys(1)"), "TypeError");
    }

    #[test]
    fn prototype_methods() {
        assert_eq!(eval_str("Object.prototype.toString.call([])"), "[object Array]");
        assert_eq!(eval_str("Object.prototype.toString.call(null)"), "[object Null]");
        assert_eq!(eval_str("Object.prototype.toString.call(undefined)"), "[object Undefined]");
        assert_eq!(
            eval_str("(function() { return Object.prototype.toString.call(arguments); })()"),
            "[object Arguments]"
        );
        assert_eq!(eval_str("({a: 1}).hasOwnProperty('a') && !({}).hasOwnProperty('toString')"), "true");
        assert_eq!(eval_str("Object.prototype.isPrototypeOf([])"), "true");
        assert_eq!(eval_str("[].propertyIsEnumerable('length')"), "false");
        assert_eq!(eval_str("({toString: function() { return 'x'; }}).toLocaleString()"), "x");
    }

    #[test]
    fn define_properties_validates_before_defining() {
        assert_eq!(
            eval_str(
                "var o = {}; try { Object.defineProperties(o, {a: {value: 1}, b: {get: 5}}); } catch (e) {}\
                 o.hasOwnProperty('a')"
            ),
            "false"
        );
    }
}
