use super::*;
use std::cmp::Ordering;

impl Interpreter {
    pub(crate) fn setup_array(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut proto_data = JsObjectData::with_class("Array", Some(object_proto));
        proto_data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
        );
        let proto = self.alloc(proto_data);
        self.realm.array_prototype = proto;

        let ctor = self.native_constructor("Array", 1, array_construct, array_construct, proto);
        self.define_methods(ctor, &[("isArray", 1, array_is_array)]);
        self.define_methods(
            proto,
            &[
                ("toString", 0, array_to_string),
                ("toLocaleString", 0, array_to_locale_string),
                ("concat", 1, array_concat),
                ("join", 1, array_join),
                ("pop", 0, array_pop),
                ("push", 1, array_push),
                ("reverse", 0, array_reverse),
                ("shift", 0, array_shift),
                ("slice", 2, array_slice),
                ("sort", 1, array_sort),
                ("splice", 2, array_splice),
                ("unshift", 1, array_unshift),
                ("indexOf", 1, array_index_of),
                ("lastIndexOf", 1, array_last_index_of),
                ("every", 1, array_every),
                ("some", 1, array_some),
                ("forEach", 1, array_for_each),
                ("map", 1, array_map),
                ("filter", 1, array_filter),
                ("reduce", 1, array_reduce),
                ("reduceRight", 1, array_reduce_right),
            ],
        );
        self.define_global("Array", JsValue::Object(ctor));
    }

    fn create_array_with_length(&mut self, len: u32) -> JsObject {
        let a = self.create_array(Vec::new());
        self.insert_property(
            a,
            "length",
            PropertyDescriptor::data(JsValue::Number(f64::from(len)), true, false, false),
        );
        a
    }

    fn set_length(&mut self, o: JsObject, len: f64) -> JsResult<()> {
        self.put(o, "length", JsValue::Number(len), true)
    }

    /// Defines `value` at `index` as an ordinary enumerable data property.
    fn create_data_property(&mut self, o: JsObject, index: u32, value: JsValue) -> JsResult<()> {
        self.define_own_property(o, &index.to_string(), PropertyDescriptor::data_default(value), false)?;
        Ok(())
    }

    fn callback_arg(&mut self, v: &JsValue) -> JsResult<JsValue> {
        if self.is_callable(v) {
            Ok(v.clone())
        } else {
            let shown = self.display(v);
            Err(self.type_error(&format!("{shown} is not a function")))
        }
    }

    /// Default sort order: ToString of both sides compared by code units.
    fn sort_compare(&mut self, cmp: &JsValue, x: &JsValue, y: &JsValue) -> JsResult<Ordering> {
        if cmp.is_undefined() {
            let xs = self.to_js_string(x)?;
            let ys = self.to_js_string(y)?;
            return Ok(xs.cmp(&ys));
        }
        let v = self.call(cmp, JsValue::Undefined, &[x.clone(), y.clone()])?;
        let n = self.to_number(&v)?;
        Ok(if n < 0.0 {
            Ordering::Less
        } else if n > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        })
    }

    /// Stable sort by partitioning around the first element into lower, same
    /// and higher buckets, each keeping input order.
    fn bucket_sort(&mut self, items: Vec<JsValue>, cmp: &JsValue) -> JsResult<Vec<JsValue>> {
        if items.len() < 2 {
            return Ok(items);
        }
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let mut iter = items.into_iter();
            let Some(pivot) = iter.next() else {
                return Ok(Vec::new());
            };
            let mut lower = Vec::new();
            let mut same = vec![pivot.clone()];
            let mut higher = Vec::new();
            for item in iter {
                match self.sort_compare(cmp, &item, &pivot)? {
                    Ordering::Less => lower.push(item),
                    Ordering::Equal => same.push(item),
                    Ordering::Greater => higher.push(item),
                }
            }
            let mut out = self.bucket_sort(lower, cmp)?;
            out.append(&mut same);
            out.append(&mut self.bucket_sort(higher, cmp)?);
            Ok(out)
        })
    }

    /// Shared loop of `every`, `some`, `forEach`, `map` and `filter`: calls
    /// `callback(value, index, O)` for every present element.
    fn for_each_present(
        &mut self,
        this: &JsValue,
        args: &[JsValue],
        mut visit: impl FnMut(&mut Self, u32, JsValue, JsValue) -> JsResult<bool>,
    ) -> JsResult<()> {
        let o = self.to_object(this)?;
        let len = self.length_of(o)?;
        let callback = self.callback_arg(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        for k in 0..len {
            let key = k.to_string();
            if !self.has_property(o, &key) {
                continue;
            }
            let value = self.get(o, &key)?;
            let result = self.call(
                &callback,
                this_arg.clone(),
                &[value.clone(), JsValue::Number(f64::from(k)), JsValue::Object(o)],
            )?;
            if !visit(self, k, value, result)? {
                break;
            }
        }
        Ok(())
    }

    fn reduce_with(&mut self, this: &JsValue, args: &[JsValue], from_right: bool) -> JsResult<JsValue> {
        let o = self.to_object(this)?;
        let len = self.length_of(o)?;
        let callback = self.callback_arg(&arg(args, 0))?;
        let mut indices: Box<dyn Iterator<Item = u32>> = if from_right {
            Box::new((0..len).rev())
        } else {
            Box::new(0..len)
        };
        let mut accumulator = if args.len() >= 2 {
            args[1].clone()
        } else {
            let mut found = None;
            for k in indices.by_ref() {
                let key = k.to_string();
                if self.has_property(o, &key) {
                    found = Some(self.get(o, &key)?);
                    break;
                }
            }
            match found {
                Some(v) => v,
                None => return Err(self.type_error("Reduce of empty array with no initial value")),
            }
        };
        for k in indices {
            let key = k.to_string();
            if self.has_property(o, &key) {
                let value = self.get(o, &key)?;
                accumulator = self.call(
                    &callback,
                    JsValue::Undefined,
                    &[accumulator, value, JsValue::Number(f64::from(k)), JsValue::Object(o)],
                )?;
            }
        }
        Ok(accumulator)
    }
}

fn array_construct(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    if let [JsValue::Number(n)] = args {
        let len = number_ops::to_uint32(*n);
        if f64::from(len) != *n {
            return Err(interp.range_error("Invalid array length"));
        }
        return Ok(JsValue::Object(interp.create_array_with_length(len)));
    }
    Ok(JsValue::Object(interp.create_array(args.to_vec())))
}

fn array_is_array(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.is_class(&arg(args, 0), "Array")))
}

fn array_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let join = interp.get(o, "join")?;
    if interp.is_callable(&join) {
        return interp.call(&join, JsValue::Object(o), &[]);
    }
    let class = interp.class_of(o);
    Ok(JsValue::string(&format!("[object {class}]")))
}

fn array_to_locale_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let mut parts = Vec::with_capacity(len as usize);
    for k in 0..len {
        let element = interp.get(o, &k.to_string())?;
        if element.is_nullish() {
            parts.push(JsString::default());
            continue;
        }
        let element_obj = interp.to_object(&element)?;
        let f = interp.get(element_obj, "toLocaleString")?;
        if !interp.is_callable(&f) {
            return Err(interp.type_error("toLocaleString is not a function"));
        }
        let s = interp.call(&f, JsValue::Object(element_obj), &[])?;
        parts.push(interp.to_js_string(&s)?);
    }
    Ok(JsValue::String(join_units(&parts, &JsString::from_str(","))))
}

fn join_units(parts: &[JsString], sep: &JsString) -> JsString {
    let mut units = Vec::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            units.extend_from_slice(&sep.code_units);
        }
        units.extend_from_slice(&p.code_units);
    }
    JsString::from_units(units)
}

fn array_concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let a = interp.create_array(Vec::new());
    let mut n: u32 = 0;
    let items = std::iter::once(JsValue::Object(o)).chain(args.iter().cloned());
    for item in items {
        match item {
            JsValue::Object(e) if interp.class_of(e) == "Array" => {
                let len = interp.length_of(e)?;
                for k in 0..len {
                    let key = k.to_string();
                    if interp.has_property(e, &key) {
                        let v = interp.get(e, &key)?;
                        interp.create_data_property(a, n, v)?;
                    }
                    n += 1;
                }
            }
            other => {
                interp.create_data_property(a, n, other)?;
                n += 1;
            }
        }
    }
    interp.set_length(a, f64::from(n))?;
    Ok(JsValue::Object(a))
}

fn array_join(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let sep = match arg(args, 0) {
        JsValue::Undefined => JsString::from_str(","),
        s => interp.to_js_string(&s)?,
    };
    let mut parts = Vec::with_capacity(len.min(1 << 16) as usize);
    for k in 0..len {
        let element = interp.get(o, &k.to_string())?;
        parts.push(if element.is_nullish() {
            JsString::default()
        } else {
            interp.to_js_string(&element)?
        });
    }
    Ok(JsValue::String(join_units(&parts, &sep)))
}

fn array_pop(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    if len == 0 {
        interp.set_length(o, 0.0)?;
        return Ok(JsValue::Undefined);
    }
    let key = (len - 1).to_string();
    let element = interp.get(o, &key)?;
    interp.delete(o, &key, true)?;
    interp.set_length(o, f64::from(len - 1))?;
    Ok(element)
}

fn array_push(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let mut n = f64::from(interp.length_of(o)?);
    for item in args {
        interp.put(o, &number_ops::to_string(n), item.clone(), true)?;
        n += 1.0;
    }
    interp.set_length(o, n)?;
    Ok(JsValue::Number(n))
}

fn array_reverse(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let middle = len / 2;
    let mut lower = 0;
    while lower != middle {
        let upper = len - lower - 1;
        let (lower_key, upper_key) = (lower.to_string(), upper.to_string());
        let lower_value = interp.get(o, &lower_key)?;
        let upper_value = interp.get(o, &upper_key)?;
        let lower_exists = interp.has_property(o, &lower_key);
        let upper_exists = interp.has_property(o, &upper_key);
        match (lower_exists, upper_exists) {
            (true, true) => {
                interp.put(o, &lower_key, upper_value, true)?;
                interp.put(o, &upper_key, lower_value, true)?;
            }
            (false, true) => {
                interp.put(o, &lower_key, upper_value, true)?;
                interp.delete(o, &upper_key, true)?;
            }
            (true, false) => {
                interp.delete(o, &lower_key, true)?;
                interp.put(o, &upper_key, lower_value, true)?;
            }
            (false, false) => {}
        }
        lower += 1;
    }
    Ok(JsValue::Object(o))
}

fn array_shift(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    if len == 0 {
        interp.set_length(o, 0.0)?;
        return Ok(JsValue::Undefined);
    }
    let first = interp.get(o, "0")?;
    for k in 1..len {
        let (from, to) = (k.to_string(), (k - 1).to_string());
        if interp.has_property(o, &from) {
            let v = interp.get(o, &from)?;
            interp.put(o, &to, v, true)?;
        } else {
            interp.delete(o, &to, true)?;
        }
    }
    interp.delete(o, &(len - 1).to_string(), true)?;
    interp.set_length(o, f64::from(len - 1))?;
    Ok(first)
}

fn array_slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = f64::from(interp.length_of(o)?);
    let start = relative_index(interp.to_integer_value(&arg(args, 0))?, len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        e => relative_index(interp.to_integer_value(&e)?, len),
    };
    let a = interp.create_array(Vec::new());
    let mut n = 0;
    let mut k = start as u32;
    while f64::from(k) < end {
        let key = k.to_string();
        if interp.has_property(o, &key) {
            let v = interp.get(o, &key)?;
            interp.create_data_property(a, n, v)?;
        }
        k += 1;
        n += 1;
    }
    interp.set_length(a, f64::from(n))?;
    Ok(JsValue::Object(a))
}

fn array_sort(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let cmp = arg(args, 0);
    if !cmp.is_undefined() && !interp.is_callable(&cmp) {
        return Err(interp.type_error("The comparison function must be either a function or undefined"));
    }
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let mut defined = Vec::new();
    let mut undefined_count = 0;
    for k in 0..len {
        let key = k.to_string();
        if !interp.has_property(o, &key) {
            continue;
        }
        match interp.get(o, &key)? {
            JsValue::Undefined => undefined_count += 1,
            v => defined.push(v),
        }
    }
    let sorted = interp.bucket_sort(defined, &cmp)?;
    let present = sorted.len() as u32 + undefined_count;
    let tail = std::iter::repeat_n(JsValue::Undefined, undefined_count as usize);
    for (i, v) in sorted.into_iter().chain(tail).enumerate() {
        interp.put(o, &i.to_string(), v, true)?;
    }
    for k in present..len {
        interp.delete(o, &k.to_string(), true)?;
    }
    Ok(JsValue::Object(o))
}

fn array_splice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let start = relative_index(interp.to_integer_value(&arg(args, 0))?, f64::from(len)) as u32;
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => {
            let dc = interp.to_integer_value(&args[1])?;
            dc.max(0.0).min(f64::from(len - start)) as u32
        }
    };
    let items = args.get(2..).unwrap_or_default();
    let item_count = items.len() as u32;

    let removed = interp.create_array(Vec::new());
    for k in 0..delete_count {
        let from = (start + k).to_string();
        if interp.has_property(o, &from) {
            let v = interp.get(o, &from)?;
            interp.create_data_property(removed, k, v)?;
        }
    }
    interp.set_length(removed, f64::from(delete_count))?;

    let move_element = |interp: &mut Interpreter, from: u32, to: u32| -> JsResult<()> {
        let (from, to) = (from.to_string(), to.to_string());
        if interp.has_property(o, &from) {
            let v = interp.get(o, &from)?;
            interp.put(o, &to, v, true)
        } else {
            interp.delete(o, &to, true).map(|_| ())
        }
    };
    if item_count < delete_count {
        for k in start..len - delete_count {
            move_element(interp, k + delete_count, k + item_count)?;
        }
        let mut k = len;
        while k > len - delete_count + item_count {
            interp.delete(o, &(k - 1).to_string(), true)?;
            k -= 1;
        }
    } else if item_count > delete_count {
        let mut k = len - delete_count;
        while k > start {
            move_element(interp, k + delete_count - 1, k + item_count - 1)?;
            k -= 1;
        }
    }
    for (i, item) in items.iter().enumerate() {
        interp.put(o, &(start + i as u32).to_string(), item.clone(), true)?;
    }
    interp.set_length(o, f64::from(len - delete_count) + f64::from(item_count))?;
    Ok(JsValue::Object(removed))
}

fn array_unshift(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let arg_count = args.len() as u32;
    let mut k = len;
    while k > 0 {
        let from = (k - 1).to_string();
        let to = number_ops::to_string(f64::from(k) + f64::from(arg_count) - 1.0);
        if interp.has_property(o, &from) {
            let v = interp.get(o, &from)?;
            interp.put(o, &to, v, true)?;
        } else {
            interp.delete(o, &to, true)?;
        }
        k -= 1;
    }
    for (j, item) in args.iter().enumerate() {
        interp.put(o, &j.to_string(), item.clone(), true)?;
    }
    let new_len = f64::from(len) + f64::from(arg_count);
    interp.set_length(o, new_len)?;
    Ok(JsValue::Number(new_len))
}

fn array_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = f64::from(interp.length_of(o)?);
    if len == 0.0 {
        return Ok(JsValue::Number(-1.0));
    }
    let n = if args.len() > 1 { interp.to_integer_value(&args[1])? } else { 0.0 };
    if n >= len {
        return Ok(JsValue::Number(-1.0));
    }
    let search = arg(args, 0);
    let mut k = if n >= 0.0 { n } else { (len + n).max(0.0) };
    while k < len {
        let key = number_ops::to_string(k);
        if interp.has_property(o, &key) && strict_equals(&interp.get(o, &key)?, &search) {
            return Ok(JsValue::Number(k));
        }
        k += 1.0;
    }
    Ok(JsValue::Number(-1.0))
}

fn array_last_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = f64::from(interp.length_of(o)?);
    if len == 0.0 {
        return Ok(JsValue::Number(-1.0));
    }
    let n = if args.len() > 1 { interp.to_integer_value(&args[1])? } else { len - 1.0 };
    let search = arg(args, 0);
    let mut k = if n >= 0.0 { n.min(len - 1.0) } else { len + n };
    while k >= 0.0 {
        let key = number_ops::to_string(k);
        if interp.has_property(o, &key) && strict_equals(&interp.get(o, &key)?, &search) {
            return Ok(JsValue::Number(k));
        }
        k -= 1.0;
    }
    Ok(JsValue::Number(-1.0))
}

fn array_every(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut all = true;
    interp.for_each_present(this, args, |_, _, _, result| {
        all = to_boolean(&result);
        Ok(all)
    })?;
    Ok(JsValue::Boolean(all))
}

fn array_some(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut any = false;
    interp.for_each_present(this, args, |_, _, _, result| {
        any = to_boolean(&result);
        Ok(!any)
    })?;
    Ok(JsValue::Boolean(any))
}

fn array_for_each(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    interp.for_each_present(this, args, |_, _, _, _| Ok(true))?;
    Ok(JsValue::Undefined)
}

fn array_map(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let len = interp.length_of(o)?;
    let a = interp.create_array_with_length(len);
    interp.for_each_present(&JsValue::Object(o), args, |interp, k, _, result| {
        interp.create_data_property(a, k, result)?;
        Ok(true)
    })?;
    Ok(JsValue::Object(a))
}

fn array_filter(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let a = interp.create_array(Vec::new());
    let mut to = 0;
    interp.for_each_present(this, args, |interp, _, value, result| {
        if to_boolean(&result) {
            interp.create_data_property(a, to, value)?;
            to += 1;
        }
        Ok(true)
    })?;
    Ok(JsValue::Object(a))
}

fn array_reduce(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    interp.reduce_with(this, args, false)
}

fn array_reduce_right(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    interp.reduce_with(this, args, true)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn constructor_forms() {
        assert_eq!(eval_str("new Array(3).length"), "3");
        assert_eq!(eval_str("Array(1, 2).join('-')"), "1-2");
        assert_eq!(eval_str("new Array('3').length"), "1");
        assert_eq!(eval_err("new Array(-1)"), "RangeError");
        assert_eq!(eval_err("new Array(1.5)"), "RangeError");
        assert_eq!(eval_str("Array.isArray([]) && !Array.isArray({length: 0})"), "true");
        assert_eq!(eval_str("Array.prototype.length"), "0");
    }

    #[test]
    fn join_and_to_string() {
        assert_eq!(eval_str("[1, null, undefined, 'a'].join()"), "1,,,a");
        assert_eq!(eval_str("[1, [2, 3]].toString()"), "1,2,3");
        assert_eq!(eval_str("Array.prototype.join.call({length: 2, 0: 'x', 1: 'y'}, '')"), "xy");
        assert_eq!(eval_str("[1, 2].toLocaleString()"), "1,2");
    }

    #[test]
    fn stack_and_queue_methods() {
        assert_eq!(eval_str("var a = [1, 2]; a.push(3, 4) + ':' + a.join()"), "4:1,2,3,4");
        assert_eq!(eval_str("var a = [1, 2]; a.pop() + ':' + a.length"), "2:1");
        assert_eq!(eval_str("var a = [1, 2, 3]; a.shift() + ':' + a.join()"), "1:2,3");
        assert_eq!(eval_str("var a = [3]; a.unshift(1, 2) + ':' + a.join()"), "3:1,2,3");
        assert_eq!(eval_str("var o = {length: 0}; Array.prototype.push.call(o, 'v'); o.length + o[0]"), "1v");
        assert_eq!(eval_str("[].pop()"), "undefined");
    }

    #[test]
    fn reverse_keeps_holes() {
        assert_eq!(eval_str("var a = [1, , 3, 4]; a.reverse(); a.join() + ':' + (1 in a) + ':' + (2 in a)"), "4,3,,1:true:false");
    }

    #[test]
    fn slice_and_concat() {
        assert_eq!(eval_str("[1, 2, 3, 4].slice(1, -1).join()"), "2,3");
        assert_eq!(eval_str("[1, 2, 3].slice(-2).join()"), "2,3");
        assert_eq!(eval_str("[1, 2].concat(3, [4, [5]]).length"), "5");
        assert_eq!(eval_str("[1, , 3].concat([, 5]).length"), "5");
    }

    #[test]
    fn splice_forms() {
        assert_eq!(eval_str("var a = [1, 2, 3, 4, 5]; a.splice(1, 2).join() + '|' + a.join()"), "2,3|1,4,5");
        assert_eq!(eval_str("var a = [1, 2, 3]; a.splice(1, 0, 'x', 'y'); a.join()"), "1,x,y,2,3");
        assert_eq!(eval_str("var a = [1, 2, 3]; a.splice(1, 1, 'x', 'y'); a.join()"), "1,x,y,3");
        assert_eq!(eval_str("var a = [1, 2, 3, 4]; a.splice(-2); a.join()"), "1,2");
        assert_eq!(eval_str("var a = [1, 2, 3]; a.splice(0, 3, 9); a.join() + ':' + a.length"), "9:1");
    }

    #[test]
    fn sort_order() {
        assert_eq!(eval_str("[3, 1, 2].sort().join()"), "1,2,3");
        assert_eq!(eval_str("[10, 9, 1].sort().join()"), "1,10,9");
        assert_eq!(
            eval_str("['b', 'a', 'c'].sort(function(x, y) { return x < y ? 1 : x > y ? -1 : 0; }).join()"),
            "c,b,a"
        );
        assert_eq!(
            eval_str("var a = [3, undefined, , 1]; a.sort(); a.length + ':' + a[0] + a[1] + a[2] + ':' + (3 in a)"),
            "4:13undefined:false"
        );
        assert_eq!(eval_err("[2, 1].sort(1)"), "TypeError");
    }

    #[test]
    fn sort_is_stable() {
        assert_eq!(
            eval_str(
                "var a = [{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}, {k: 0, v: 'd'}];\
                 a.sort(function(x, y) { return x.k - y.k; });\
                 a.map(function(e) { return e.v; }).join('')"
            ),
            "bdac"
        );
    }

    #[test]
    fn search_methods() {
        assert_eq!(eval_str("[1, 2, 1].indexOf(1, 1)"), "2");
        assert_eq!(eval_str("[NaN].indexOf(NaN)"), "-1");
        assert_eq!(eval_str("[1, 2, 1].lastIndexOf(1)"), "2");
        assert_eq!(eval_str("[1, 2, 1].lastIndexOf(1, -2)"), "0");
        assert_eq!(eval_str("[1, 2, 3].indexOf(3, -1)"), "2");
    }

    #[test]
    fn iteration_methods() {
        assert_eq!(eval_str("[1, 2, 3].map(function(x) { return x * 2; }).join()"), "2,4,6");
        assert_eq!(eval_str("[1, 2, 3, 4].filter(function(x) { return x % 2; }).join()"), "1,3");
        assert_eq!(eval_str("[1, 2].every(function(x) { return x > 0; })"), "true");
        assert_eq!(eval_str("[1, 2].some(function(x) { return x > 1; })"), "true");
        assert_eq!(eval_str("[].every(function() { return false; })"), "true");
        assert_eq!(
            eval_str("var s = 0; [1, , 3].forEach(function(x, i) { s += x * 10 + i; }); s"),
            "42"
        );
        assert_eq!(eval_str("[1, , 3].map(function(x) { return x; }).length"), "3");
        assert_eq!(eval_str("[1, 2].map(function() { return this.m; }, {m: 7}).join()"), "7,7");
        assert_eq!(eval_err("[1].forEach(3)"), "TypeError");
    }

    #[test]
    fn reductions() {
        assert_eq!(eval_str("[1, 2, 3].reduce(function(a, b) { return a + b; })"), "6");
        assert_eq!(eval_str("['a', 'b', 'c'].reduceRight(function(a, b) { return a + b; })"), "cba");
        assert_eq!(eval_str("[].reduce(function(a, b) { return a + b; }, 'init')"), "init");
        assert_eq!(eval_err("[].reduce(function(a, b) { return a + b; })"), "TypeError");
        assert_eq!(eval_str("[, 5].reduce(function(a, b) { return a + b; })"), "5");
    }
}
