use super::*;

/// A canonical array index: the string form of a uint32 below 2^32 - 1.
pub(crate) fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || key.len() > 10 || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = key.parse().ok()?;
    if n < u64::from(u32::MAX) { Some(n as u32) } else { None }
}

impl Interpreter {
    // ========================================================================
    // [[GetOwnProperty]] / [[GetProperty]] / [[Get]]
    // ========================================================================

    pub(crate) fn get_own_property(&self, o: JsObject, key: &str) -> Option<PropertyDescriptor> {
        let rc = self.obj(o);
        let data = rc.borrow();
        if let Some(desc) = data.get_own_property(key) {
            let mut desc = desc.clone();
            if let Some(map) = &data.parameter_map
                && let Some((env, name)) = map.get(key)
            {
                desc.value = Some(read_declarative(env, name));
            }
            return Some(desc);
        }
        if data.class_name == "String"
            && let Some(JsValue::String(s)) = &data.primitive_value
            && let Some(index) = array_index(key)
            && (index as usize) < s.len()
        {
            let unit = JsString::from_units(vec![s.code_units[index as usize]]);
            return Some(PropertyDescriptor::data(JsValue::String(unit), false, true, false));
        }
        None
    }

    pub(crate) fn get_property(&self, o: JsObject, key: &str) -> Option<PropertyDescriptor> {
        let mut cur = Some(o);
        while let Some(c) = cur {
            if let Some(desc) = self.get_own_property(c, key) {
                return Some(desc);
            }
            cur = self.obj(c).borrow().prototype;
        }
        None
    }

    pub(crate) fn get(&mut self, o: JsObject, key: &str) -> JsResult<JsValue> {
        let value = self.get_with_receiver(o, key, &JsValue::Object(o))?;
        if key == "caller"
            && let JsValue::Object(f) = &value
            && self.obj(*f).borrow().callable.as_ref().is_some_and(JsFunction::is_strict)
            && self.obj(o).borrow().is_callable()
        {
            return Err(self.type_error("'caller' may not be read from a strict function"));
        }
        Ok(value)
    }

    /// `[[Get]]` with accessors invoked on `receiver`; a primitive base keeps
    /// itself as the getter's `this`.
    pub(crate) fn get_with_receiver(
        &mut self,
        o: JsObject,
        key: &str,
        receiver: &JsValue,
    ) -> JsResult<JsValue> {
        match self.get_property(o, key) {
            None => Ok(JsValue::Undefined),
            Some(desc) if desc.is_accessor_descriptor() => match desc.get {
                Some(getter @ JsValue::Object(_)) => self.call(&getter, receiver.clone(), &[]),
                _ => Ok(JsValue::Undefined),
            },
            Some(desc) => {
                let v = desc.value.unwrap_or(JsValue::Undefined);
                self.hold(&v);
                Ok(v)
            }
        }
    }

    /// Property read on any value: `base[key]`.
    pub(crate) fn get_value_of(&mut self, base: &JsValue, key: &str) -> JsResult<JsValue> {
        match base {
            JsValue::Object(o) => self.get(*o, key),
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Some(index) = array_index(key)
                    && (index as usize) < s.len()
                {
                    let unit = JsString::from_units(vec![s.code_units[index as usize]]);
                    return Ok(JsValue::String(unit));
                }
                let proto = self.realm.string_prototype;
                self.get_with_receiver(proto, key, base)
            }
            JsValue::Number(_) => {
                let proto = self.realm.number_prototype;
                self.get_with_receiver(proto, key, base)
            }
            JsValue::Boolean(_) => {
                let proto = self.realm.boolean_prototype;
                self.get_with_receiver(proto, key, base)
            }
            JsValue::Undefined | JsValue::Null => Err(self.type_error(&format!(
                "Cannot read property '{key}' of {base}"
            ))),
        }
    }

    // ========================================================================
    // [[CanPut]] / [[Put]]
    // ========================================================================

    pub(crate) fn can_put(&self, o: JsObject, key: &str) -> bool {
        if let Some(desc) = self.get_own_property(o, key) {
            return if desc.is_accessor_descriptor() {
                matches!(desc.set, Some(JsValue::Object(_)))
            } else {
                desc.writable()
            };
        }
        let (proto, extensible) = {
            let rc = self.obj(o);
            let data = rc.borrow();
            (data.prototype, data.extensible)
        };
        let Some(proto) = proto else {
            return extensible;
        };
        match self.get_property(proto, key) {
            None => extensible,
            Some(inherited) if inherited.is_accessor_descriptor() => {
                matches!(inherited.set, Some(JsValue::Object(_)))
            }
            Some(inherited) => extensible && inherited.writable(),
        }
    }

    pub(crate) fn put(&mut self, o: JsObject, key: &str, value: JsValue, throw: bool) -> JsResult<()> {
        if !self.can_put(o, key) {
            if throw {
                return Err(self.type_error(&format!(
                    "Cannot assign to read only property '{key}'"
                )));
            }
            return Ok(());
        }
        if self
            .get_own_property(o, key)
            .is_some_and(|d| d.is_data_descriptor())
        {
            let desc = PropertyDescriptor {
                value: Some(value),
                ..Default::default()
            };
            self.define_own_property(o, key, desc, throw)?;
            return Ok(());
        }
        match self.get_property(o, key) {
            Some(desc) if desc.is_accessor_descriptor() => {
                if let Some(setter @ JsValue::Object(_)) = desc.set {
                    self.call(&setter, JsValue::Object(o), &[value])?;
                }
                Ok(())
            }
            _ => {
                self.define_own_property(o, key, PropertyDescriptor::data_default(value), throw)?;
                Ok(())
            }
        }
    }

    /// Assignment to a property of a primitive base. Only inherited setters
    /// have an observable effect.
    pub(crate) fn put_on_primitive(
        &mut self,
        base: &JsValue,
        key: &str,
        value: JsValue,
        throw: bool,
    ) -> JsResult<()> {
        let o = self.to_object(base)?;
        let rejected = if !self.can_put(o, key) {
            true
        } else if self.get_own_property(o, key).is_some_and(|d| d.is_data_descriptor()) {
            true
        } else {
            match self.get_property(o, key) {
                Some(desc) if desc.is_accessor_descriptor() => {
                    if let Some(setter @ JsValue::Object(_)) = desc.set {
                        self.call(&setter, base.clone(), &[value])?;
                    }
                    return Ok(());
                }
                _ => true,
            }
        };
        if rejected && throw {
            return Err(self.type_error(&format!(
                "Cannot create property '{key}' on {}",
                self.type_of(base)
            )));
        }
        Ok(())
    }

    pub(crate) fn put_value_of(
        &mut self,
        base: &JsValue,
        key: &str,
        value: JsValue,
        throw: bool,
    ) -> JsResult<()> {
        match base {
            JsValue::Object(o) => self.put(*o, key, value, throw),
            JsValue::Undefined | JsValue::Null => Err(self.type_error(&format!(
                "Cannot set property '{key}' of {base}"
            ))),
            _ => self.put_on_primitive(base, key, value, throw),
        }
    }

    pub(crate) fn has_property(&self, o: JsObject, key: &str) -> bool {
        self.get_property(o, key).is_some()
    }

    // ========================================================================
    // [[Delete]]
    // ========================================================================

    pub(crate) fn delete(&mut self, o: JsObject, key: &str, throw: bool) -> JsResult<bool> {
        let Some(desc) = self.get_own_property(o, key) else {
            return Ok(true);
        };
        if desc.configurable() {
            let rc = self.obj(o);
            let mut data = rc.borrow_mut();
            data.remove_property(key);
            if let Some(map) = &mut data.parameter_map {
                map.remove(key);
            }
            return Ok(true);
        }
        if throw {
            return Err(self.type_error(&format!("Cannot delete property '{key}'")));
        }
        Ok(false)
    }

    // ========================================================================
    // [[DefaultValue]]
    // ========================================================================

    pub(crate) fn default_value(&mut self, o: JsObject, hint: Option<PreferredType>) -> JsResult<JsValue> {
        let hint = hint.unwrap_or_else(|| {
            if self.class_of(o) == "Date" {
                PreferredType::String
            } else {
                PreferredType::Number
            }
        });
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get(o, name)?;
            if self.is_callable(&method) {
                let v = self.call(&method, JsValue::Object(o), &[])?;
                if !v.is_object() {
                    return Ok(v);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    // ========================================================================
    // [[DefineOwnProperty]]
    // ========================================================================

    pub(crate) fn define_own_property(
        &mut self,
        o: JsObject,
        key: &str,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let (is_array, mapped) = {
            let rc = self.obj(o);
            let data = rc.borrow();
            (
                data.class_name == "Array",
                data.parameter_map.as_ref().is_some_and(|m| m.contains_key(key)),
            )
        };
        if is_array {
            self.array_define_own_property(o, key, desc, throw)
        } else if mapped {
            self.arguments_define_own_property(o, key, desc, throw)
        } else {
            self.ordinary_define_own_property(o, key, desc, throw)
        }
    }

    fn reject(&mut self, throw: bool, key: &str) -> JsResult<bool> {
        if throw {
            return Err(self.type_error(&format!("Cannot redefine property: {key}")));
        }
        Ok(false)
    }

    pub(crate) fn ordinary_define_own_property(
        &mut self,
        o: JsObject,
        key: &str,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let current = self.get_own_property(o, key);
        let Some(current) = current else {
            if !self.obj(o).borrow().extensible {
                if throw {
                    return Err(self.type_error(&format!(
                        "Cannot add property {key}, object is not extensible"
                    )));
                }
                return Ok(false);
            }
            self.obj(o)
                .borrow_mut()
                .insert_property(key.to_string(), desc.completed());
            return Ok(true);
        };
        if desc.is_empty() || describes_same(&current, &desc) {
            return Ok(true);
        }
        if !current.configurable() {
            if desc.configurable() {
                return self.reject(throw, key);
            }
            if desc.enumerable.is_some_and(|e| e != current.enumerable()) {
                return self.reject(throw, key);
            }
        }
        if desc.is_generic_descriptor() {
            // attribute-only change
        } else if current.is_data_descriptor() != desc.is_data_descriptor() {
            if !current.configurable() {
                return self.reject(throw, key);
            }
        } else if current.is_data_descriptor() {
            if !current.configurable() && !current.writable() {
                if desc.writable() {
                    return self.reject(throw, key);
                }
                if let Some(v) = &desc.value
                    && !same_value(v, current.value.as_ref().unwrap_or(&JsValue::Undefined))
                {
                    return self.reject(throw, key);
                }
            }
        } else if !current.configurable() {
            let differs = |given: &Option<JsValue>, stored: &Option<JsValue>| match given {
                Some(g) => !same_value(g, stored.as_ref().unwrap_or(&JsValue::Undefined)),
                None => false,
            };
            if differs(&desc.set, &current.set) || differs(&desc.get, &current.get) {
                return self.reject(throw, key);
            }
        }
        self.obj(o)
            .borrow_mut()
            .insert_property(key.to_string(), current.merged(&desc));
        Ok(true)
    }

    fn array_define_own_property(
        &mut self,
        o: JsObject,
        key: &str,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let Some(old_len_desc) = self.get_own_property(o, "length") else {
            return self.ordinary_define_own_property(o, key, desc, throw);
        };
        let old_len = match &old_len_desc.value {
            Some(JsValue::Number(n)) => *n as u32,
            _ => 0,
        };
        if key == "length" {
            let Some(value) = &desc.value else {
                return self.ordinary_define_own_property(o, key, desc, throw);
            };
            let number = self.to_number(value)?;
            let new_len = number_ops::to_uint32(number);
            if f64::from(new_len) != number {
                return Err(self.range_error("Invalid array length"));
            }
            let mut new_len_desc = desc.clone();
            new_len_desc.value = Some(JsValue::Number(f64::from(new_len)));
            if new_len >= old_len {
                return self.ordinary_define_own_property(o, key, new_len_desc, throw);
            }
            if !old_len_desc.writable() {
                return self.reject(throw, key);
            }
            let new_writable = desc.writable != Some(false);
            if !new_writable {
                new_len_desc.writable = Some(true);
            }
            if !self.ordinary_define_own_property(o, key, new_len_desc.clone(), throw)? {
                return Ok(false);
            }
            let mut doomed: Vec<u32> = self
                .obj(o)
                .borrow()
                .property_order
                .iter()
                .filter_map(|k| array_index(k))
                .filter(|&i| i >= new_len)
                .collect();
            doomed.sort_unstable_by(|a, b| b.cmp(a));
            for index in doomed {
                if !self.delete(o, &index.to_string(), false)? {
                    new_len_desc.value = Some(JsValue::Number(f64::from(index) + 1.0));
                    if !new_writable {
                        new_len_desc.writable = Some(false);
                    }
                    self.ordinary_define_own_property(o, key, new_len_desc, false)?;
                    return self.reject(throw, key);
                }
            }
            if !new_writable {
                let freeze = PropertyDescriptor {
                    writable: Some(false),
                    ..Default::default()
                };
                self.ordinary_define_own_property(o, key, freeze, false)?;
            }
            return Ok(true);
        }
        if let Some(index) = array_index(key) {
            if index >= old_len && !old_len_desc.writable() {
                return self.reject(throw, key);
            }
            if !self.ordinary_define_own_property(o, key, desc, false)? {
                return self.reject(throw, key);
            }
            if index >= old_len {
                let grow = PropertyDescriptor {
                    value: Some(JsValue::Number(f64::from(index) + 1.0)),
                    ..Default::default()
                };
                self.ordinary_define_own_property(o, "length", grow, false)?;
            }
            return Ok(true);
        }
        self.ordinary_define_own_property(o, key, desc, throw)
    }

    fn arguments_define_own_property(
        &mut self,
        o: JsObject,
        key: &str,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        if !self.ordinary_define_own_property(o, key, desc.clone(), false)? {
            return self.reject(throw, key);
        }
        let rc = self.obj(o);
        let mut data = rc.borrow_mut();
        let Some(map) = &mut data.parameter_map else {
            return Ok(true);
        };
        if desc.is_accessor_descriptor() {
            map.remove(key);
        } else {
            if let Some(v) = &desc.value
                && let Some((env, name)) = map.get(key)
            {
                write_declarative(env, name, v.clone());
            }
            if desc.writable == Some(false) {
                map.remove(key);
            }
        }
        Ok(true)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Own property names: String index keys first, then insertion order.
    pub(crate) fn own_property_keys(&self, o: JsObject) -> Vec<String> {
        let rc = self.obj(o);
        let data = rc.borrow();
        let mut keys = Vec::new();
        if data.class_name == "String"
            && let Some(JsValue::String(s)) = &data.primitive_value
        {
            keys.extend((0..s.len()).map(|i| i.to_string()));
        }
        keys.extend(data.property_order.iter().cloned());
        keys
    }

    pub(crate) fn enumerable_own_keys(&self, o: JsObject) -> Vec<String> {
        self.own_property_keys(o)
            .into_iter()
            .filter(|k| self.get_own_property(o, k).is_some_and(|d| d.enumerable()))
            .collect()
    }

    /// The names a `for-in` visits: enumerable properties along the prototype
    /// chain, each name once, shadowed names skipped.
    pub(crate) fn for_in_keys(&self, o: JsObject) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut keys = Vec::new();
        let mut cur = Some(o);
        while let Some(c) = cur {
            for key in self.own_property_keys(c) {
                let enumerable = self.get_own_property(c, &key).is_some_and(|d| d.enumerable());
                if seen.insert(key.clone()) && enumerable {
                    keys.push(key);
                }
            }
            cur = self.obj(c).borrow().prototype;
        }
        keys
    }

    /// Installs a built-in data property without going through `[[DefineOwnProperty]]`.
    pub(crate) fn insert_builtin(&self, o: JsObject, key: &str, value: JsValue) {
        self.obj(o).borrow_mut().insert_builtin(key.to_string(), value);
    }

    pub(crate) fn insert_property(&self, o: JsObject, key: &str, desc: PropertyDescriptor) {
        self.obj(o).borrow_mut().insert_property(key.to_string(), desc);
    }

    /// `length` read through `[[Get]]` and converted with ToUint32.
    pub(crate) fn length_of(&mut self, o: JsObject) -> JsResult<u32> {
        let len = self.get(o, "length")?;
        Ok(number_ops::to_uint32(self.to_number(&len)?))
    }
}

/// True when every field present in `desc` already holds the same value in
/// `current`.
fn describes_same(current: &PropertyDescriptor, desc: &PropertyDescriptor) -> bool {
    let same = |given: &Option<JsValue>, stored: &Option<JsValue>| match (given, stored) {
        (None, _) => true,
        (Some(g), Some(s)) => same_value(g, s),
        (Some(_), None) => false,
    };
    same(&desc.value, &current.value)
        && same(&desc.get, &current.get)
        && same(&desc.set, &current.set)
        && desc.writable.is_none_or(|w| current.writable == Some(w))
        && desc.enumerable.is_none_or(|e| current.enumerable == Some(e))
        && desc.configurable.is_none_or(|c| current.configurable == Some(c))
}

pub(crate) fn read_declarative(env: &EnvRef, name: &str) -> JsValue {
    match &env.borrow().record {
        EnvironmentRecord::Declarative(bindings) => bindings
            .get(name)
            .map(|b| b.value.clone())
            .unwrap_or(JsValue::Undefined),
        EnvironmentRecord::Object { .. } => JsValue::Undefined,
    }
}

fn write_declarative(env: &EnvRef, name: &str, value: JsValue) {
    if let EnvironmentRecord::Declarative(bindings) = &mut env.borrow_mut().record
        && let Some(b) = bindings.get_mut(name)
    {
        b.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::array_index;
    use pretty_assertions::assert_eq;

    #[test]
    fn array_index_is_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("4294967294"), Some(4294967294));
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
    }

    #[test]
    fn array_length_tracks_indices() {
        assert_eq!(eval_str("var a = []; a[4] = 1; a.length"), "5");
        assert_eq!(eval_str("var a = [1,2,3,4]; a.length = 1; a.join()"), "1");
        assert_eq!(eval_str("var a = [1,2,3]; a.length = 5; a.length + ':' + (3 in a)"), "5:false");
        assert_eq!(eval_err("var a = []; a.length = -1"), "RangeError");
        assert_eq!(eval_err("[].length = 1.5"), "RangeError");
    }

    #[test]
    fn length_shrink_stops_at_non_configurable_element() {
        assert_eq!(
            eval_str(
                "var a = [0,1,2,3]; Object.defineProperty(a, '1', {value: 1, configurable: false});\
                 a.length = 0; a.length"
            ),
            "2"
        );
        assert_eq!(
            eval_err(
                "'use strict'; var a = [0,1,2]; Object.defineProperty(a, '1', {configurable: false});\
                 a.length = 0"
            ),
            "TypeError"
        );
        assert_eq!(
            eval_str(
                "var a = [0,1,2]; Object.defineProperty(a, '1', {value: 1});\
                 a.length = 0; a.length"
            ),
            "0"
        );
    }

    #[test]
    fn non_writable_length_blocks_growth() {
        assert_eq!(
            eval_str(
                "var a = [1]; Object.defineProperty(a, 'length', {writable: false});\
                 a[5] = 2; a.length + ':' + a[5]"
            ),
            "1:undefined"
        );
        assert_eq!(eval_err("'use strict'; var a = Object.freeze([1]); a.push(2)"), "TypeError");
    }

    #[test]
    fn define_property_validation() {
        assert_eq!(
            eval_err(
                "var o = {}; Object.defineProperty(o, 'x', {value: 1});\
                 Object.defineProperty(o, 'x', {value: 2})"
            ),
            "TypeError"
        );
        assert_eq!(
            eval_str(
                "var o = {}; Object.defineProperty(o, 'x', {value: NaN});\
                 Object.defineProperty(o, 'x', {value: NaN}); 'ok'"
            ),
            "ok"
        );
        assert_eq!(
            eval_err(
                "var o = {}; Object.defineProperty(o, 'x', {value: 0});\
                 Object.defineProperty(o, 'x', {value: -0})"
            ),
            "TypeError"
        );
        assert_eq!(
            eval_str(
                "var o = {}; Object.defineProperty(o, 'x', {get: function(){return 1}, configurable: true});\
                 Object.defineProperty(o, 'x', {value: 2}); o.x + ':' + Object.getOwnPropertyDescriptor(o, 'x').writable"
            ),
            "2:false"
        );
    }

    #[test]
    fn accessors_and_read_only_writes() {
        assert_eq!(
            eval_str("var o = { get x() { return this.y * 2; }, y: 4 }; o.x"),
            "8"
        );
        assert_eq!(
            eval_str("var p = {}; Object.defineProperty(p, 'x', {value: 1}); var c = Object.create(p); c.x = 2; c.x"),
            "1"
        );
        assert_eq!(
            eval_err("'use strict'; var o = Object.defineProperty({}, 'x', {value: 1}); o.x = 2"),
            "TypeError"
        );
        assert_eq!(
            eval_str("var log = ''; var o = { set v(x) { log += x; } }; o.v = 'a'; o.v = 'b'; log"),
            "ab"
        );
    }

    #[test]
    fn string_objects_expose_indices() {
        assert_eq!(eval_str("var s = new String('ab'); s[1] + s.length"), "b2");
        assert_eq!(eval_str("Object.getOwnPropertyNames(new String('ab')).join()"), "0,1,length");
        assert_eq!(eval_str("'abc'[2]"), "c");
        assert_eq!(eval_str("var s = new String('ab'); delete s[0]"), "false");
    }

    #[test]
    fn arguments_alias_parameters() {
        assert_eq!(eval_str("function f(a) { arguments[0] = 9; return a; } f(1)"), "9");
        assert_eq!(eval_str("function f(a) { a = 9; return arguments[0]; } f(1)"), "9");
        assert_eq!(
            eval_str("function f(a) { 'use strict'; a = 9; return arguments[0]; } f(1)"),
            "1"
        );
        assert_eq!(
            eval_str("function f(a) { delete arguments[0]; arguments[0] = 2; return a; } f(1)"),
            "1"
        );
        assert_eq!(eval_str("function f(a) { return arguments.length; } f()"), "0");
        assert_eq!(
            eval_str("function f(a) { arguments[0] = 3; return a; } f()"),
            "undefined"
        );
    }

    #[test]
    fn for_in_skips_shadowed_and_non_enumerable() {
        assert_eq!(
            eval_str(
                "var p = {a: 1, b: 2}; var o = Object.create(p);\
                 Object.defineProperty(o, 'a', {value: 3, enumerable: false}); o.c = 4;\
                 var ks = []; for (var k in o) ks.push(k); ks.join()"
            ),
            "c,b"
        );
    }

    #[test]
    fn primitive_receivers() {
        assert_eq!(
            eval_str(
                "Object.defineProperty(Number.prototype, 'me', {get: function() { return typeof this; }});\
                 (5).me"
            ),
            "object"
        );
        assert_eq!(
            eval_str(
                "Object.defineProperty(Number.prototype, 'me', {get: function() { 'use strict'; return typeof this; }});\
                 (5).me"
            ),
            "number"
        );
        assert_eq!(eval_str("var s = 'abc'; s.x = 1; s.x"), "undefined");
        assert_eq!(eval_err("'use strict'; 'abc'.x = 1"), "TypeError");
    }
}
