use super::*;
use crate::lexer::Lexer;
use crate::regexp::Regex;

fn is_trimmable(unit: u16) -> bool {
    char::from_u32(u32::from(unit)).is_some_and(|c| Lexer::is_whitespace(c) || Lexer::is_line_terminator(c))
}

/// Case mapping over code units; unpaired surrogates pass through.
fn map_case(s: &JsString, upper: bool) -> JsString {
    let mut out = Vec::with_capacity(s.len());
    for decoded in char::decode_utf16(s.code_units.iter().copied()) {
        match decoded {
            Ok(c) => {
                let mut buf = [0u16; 2];
                if upper {
                    for m in c.to_uppercase() {
                        out.extend_from_slice(m.encode_utf16(&mut buf));
                    }
                } else {
                    for m in c.to_lowercase() {
                        out.extend_from_slice(m.encode_utf16(&mut buf));
                    }
                }
            }
            Err(e) => out.push(e.unpaired_surrogate()),
        }
    }
    JsString::from_units(out)
}

/// What `split` matches at each position.
enum Separator {
    Text(JsString),
    Pattern(Rc<Regex>),
}

impl Separator {
    /// The end of a separator match starting exactly at `q`, plus captures.
    fn match_at(&self, s: &JsString, q: usize) -> Option<(usize, Vec<JsValue>)> {
        match self {
            Separator::Text(r) => {
                let end = q + r.len();
                (end <= s.len() && s.code_units[q..end] == r.code_units[..]).then(|| (end, Vec::new()))
            }
            Separator::Pattern(re) => {
                let caps = re.match_at(&s.code_units, q)?;
                let end = caps.first().and_then(|c| *c).map_or(q, |(_, e)| e);
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|c| match c {
                        Some((a, b)) => JsValue::String(s.slice_utf16(*a, *b)),
                        None => JsValue::Undefined,
                    })
                    .collect();
                Some((end, groups))
            }
        }
    }
}

/// Expands `$$`, `$&`, `` $` ``, `$'`, `$n` and `$nn` in a replacement template.
fn expand_replacement(
    template: &JsString,
    subject: &JsString,
    position: usize,
    matched: &JsString,
    captures: &[JsValue],
) -> Vec<u16> {
    let t = &template.code_units;
    let dollar = u16::from(b'$');
    let digit = |i: usize| -> Option<usize> {
        t.get(i)
            .and_then(|&u| char::from_u32(u32::from(u)))
            .and_then(|c| c.to_digit(10))
            .map(|d| d as usize)
    };
    let capture_units = |n: usize| -> Vec<u16> {
        match captures.get(n - 1) {
            Some(JsValue::String(s)) => s.code_units.clone(),
            _ => Vec::new(),
        }
    };
    let m = captures.len();
    let mut out = Vec::with_capacity(t.len());
    let mut i = 0;
    while i < t.len() {
        if t[i] != dollar || i + 1 >= t.len() {
            out.push(t[i]);
            i += 1;
            continue;
        }
        let next = t[i + 1];
        match next {
            0x24 => {
                out.push(dollar);
                i += 2;
            }
            0x26 => {
                out.extend_from_slice(&matched.code_units);
                i += 2;
            }
            0x60 => {
                out.extend_from_slice(&subject.code_units[..position]);
                i += 2;
            }
            0x27 => {
                let after = (position + matched.len()).min(subject.len());
                out.extend_from_slice(&subject.code_units[after..]);
                i += 2;
            }
            _ => match digit(i + 1) {
                Some(d1) => {
                    let two = digit(i + 2).map(|d2| d1 * 10 + d2);
                    if let Some(nn) = two.filter(|&nn| nn >= 1 && nn <= m) {
                        out.extend(capture_units(nn));
                        i += 3;
                    } else if d1 >= 1 && d1 <= m {
                        out.extend(capture_units(d1));
                        i += 2;
                    } else {
                        out.push(dollar);
                        i += 1;
                    }
                }
                None => {
                    out.push(dollar);
                    i += 1;
                }
            },
        }
    }
    out
}

impl Interpreter {
    pub(crate) fn setup_string(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut proto_data = JsObjectData::with_class("String", Some(object_proto));
        proto_data.primitive_value = Some(JsValue::String(JsString::default()));
        proto_data.insert_constant("length".to_string(), JsValue::Number(0.0));
        let proto = self.alloc(proto_data);
        self.realm.string_prototype = proto;

        let ctor = self.native_constructor("String", 1, string_call, string_construct, proto);
        self.define_methods(ctor, &[("fromCharCode", 1, string_from_char_code)]);
        self.define_methods(
            proto,
            &[
                ("toString", 0, string_to_string),
                ("valueOf", 0, string_to_string),
                ("charAt", 1, string_char_at),
                ("charCodeAt", 1, string_char_code_at),
                ("concat", 1, string_concat),
                ("indexOf", 1, string_index_of),
                ("lastIndexOf", 1, string_last_index_of),
                ("localeCompare", 1, string_locale_compare),
                ("match", 1, string_match),
                ("replace", 2, string_replace),
                ("search", 1, string_search),
                ("slice", 2, string_slice),
                ("split", 2, string_split),
                ("substring", 2, string_substring),
                ("toLowerCase", 0, string_to_lower_case),
                ("toLocaleLowerCase", 0, string_to_lower_case),
                ("toUpperCase", 0, string_to_upper_case),
                ("toLocaleUpperCase", 0, string_to_upper_case),
                ("trim", 0, string_trim),
            ],
        );
        if self.config.annex_b {
            self.define_methods(proto, &[("substr", 2, string_substr)]);
        }
        self.define_global("String", JsValue::Object(ctor));
    }

    /// `ToString(CheckObjectCoercible(this))`, the receiver of generic String methods.
    fn this_string(&mut self, this: &JsValue) -> JsResult<JsString> {
        self.check_object_coercible(this)?;
        self.to_js_string(this)
    }

    fn replace_with(
        &mut self,
        replace_value: &JsValue,
        template: Option<&JsString>,
        subject: &JsString,
        position: usize,
        matched: &JsString,
        captures: &[JsValue],
    ) -> JsResult<Vec<u16>> {
        if let Some(template) = template {
            return Ok(expand_replacement(template, subject, position, matched, captures));
        }
        let mut call_args = Vec::with_capacity(captures.len() + 3);
        call_args.push(JsValue::String(matched.clone()));
        call_args.extend_from_slice(captures);
        call_args.push(JsValue::Number(position as f64));
        call_args.push(JsValue::String(subject.clone()));
        let v = self.call(replace_value, JsValue::Undefined, &call_args)?;
        Ok(self.to_js_string(&v)?.code_units)
    }
}

fn capture_values(caps: &crate::regexp::Captures, s: &JsString) -> Vec<JsValue> {
    caps.iter()
        .skip(1)
        .map(|c| match c {
            Some((a, b)) => JsValue::String(s.slice_utf16(*a, *b)),
            None => JsValue::Undefined,
        })
        .collect()
}

fn string_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match args.first() {
        None => Ok(JsValue::String(JsString::default())),
        Some(v) => Ok(JsValue::String(interp.to_js_string(v)?)),
    }
}

fn string_construct(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = string_call(interp, this, args)?;
    Ok(JsValue::Object(interp.to_object(&s)?))
}

fn string_from_char_code(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut units = Vec::with_capacity(args.len());
    for a in args {
        units.push(number_ops::to_uint16(interp.to_number(a)?));
    }
    Ok(JsValue::String(JsString::from_units(units)))
}

fn string_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    match this {
        JsValue::String(_) => Ok(this.clone()),
        JsValue::Object(o) if interp.class_of(*o) == "String" => Ok(interp
            .obj(*o)
            .borrow()
            .primitive_value
            .clone()
            .unwrap_or(JsValue::String(JsString::default()))),
        _ => Err(interp.type_error("String.prototype.toString requires that 'this' be a String")),
    }
}

fn string_char_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let pos = interp.to_integer_value(&arg(args, 0))?;
    if pos < 0.0 || pos >= s.len() as f64 {
        return Ok(JsValue::String(JsString::default()));
    }
    Ok(JsValue::String(JsString::from_units(vec![s.code_units[pos as usize]])))
}

fn string_char_code_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let pos = interp.to_integer_value(&arg(args, 0))?;
    if pos < 0.0 || pos >= s.len() as f64 {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(f64::from(s.code_units[pos as usize])))
}

fn string_concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let mut s = interp.this_string(this)?;
    for a in args {
        let next = interp.to_js_string(a)?;
        s = s.concat(&next);
    }
    Ok(JsValue::String(s))
}

fn string_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let pos = interp.to_integer_value(&arg(args, 1))?;
    let start = pos.max(0.0).min(s.len() as f64) as usize;
    Ok(JsValue::Number(s.index_of(&search, start).map_or(-1.0, |i| i as f64)))
}

fn string_last_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let num_pos = interp.to_number(&arg(args, 1))?;
    let pos = if num_pos.is_nan() { f64::INFINITY } else { to_integer(num_pos) };
    let start = pos.max(0.0).min(s.len() as f64) as usize;
    Ok(JsValue::Number(s.last_index_of(&search, start).map_or(-1.0, |i| i as f64)))
}

fn string_locale_compare(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let that = interp.to_js_string(&arg(args, 0))?;
    let order = s.to_rust_string().cmp(&that.to_rust_string());
    Ok(JsValue::Number(order as i32 as f64))
}

fn string_match(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let (rx, re) = interp.coerce_to_regexp(&arg(args, 0))?;
    if !re.flags().global {
        return match interp.regexp_exec(rx, &re, &s)? {
            Some(caps) => Ok(JsValue::Object(interp.match_result(&caps, &s))),
            None => Ok(JsValue::Null),
        };
    }
    interp.put(rx, "lastIndex", JsValue::Number(0.0), true)?;
    let mut previous_last_index = 0.0;
    let mut matches = Vec::new();
    while let Some(caps) = interp.regexp_exec(rx, &re, &s)? {
        let this_index = interp.get(rx, "lastIndex")?;
        let this_index = interp.to_integer_value(&this_index)?;
        if this_index == previous_last_index {
            interp.put(rx, "lastIndex", JsValue::Number(this_index + 1.0), true)?;
            previous_last_index = this_index + 1.0;
        } else {
            previous_last_index = this_index;
        }
        let (a, b) = caps.first().and_then(|c| *c).unwrap_or((0, 0));
        matches.push(JsValue::String(s.slice_utf16(a, b)));
    }
    if matches.is_empty() {
        return Ok(JsValue::Null);
    }
    Ok(JsValue::Object(interp.create_array(matches)))
}

fn string_replace(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let search_value = arg(args, 0);
    let replace_value = arg(args, 1);
    let regexp = interp.regexp_of(&search_value);
    let search_text = match regexp {
        Some(_) => None,
        None => Some(interp.to_js_string(&search_value)?),
    };
    let template = if interp.is_callable(&replace_value) {
        None
    } else {
        Some(interp.to_js_string(&replace_value)?)
    };

    let mut out = Vec::with_capacity(s.len());
    let mut last_end = 0;
    match (regexp, search_text) {
        (Some((rx, re)), _) => {
            let global = re.flags().global;
            if global {
                interp.put(rx, "lastIndex", JsValue::Number(0.0), true)?;
            }
            let mut from = 0;
            while from <= s.len() {
                let Some(caps) = re.find_from(&s.code_units, from) else {
                    break;
                };
                let (start, end) = caps.first().and_then(|c| *c).unwrap_or((from, from));
                let matched = s.slice_utf16(start, end);
                let captures = capture_values(&caps, &s);
                out.extend_from_slice(&s.code_units[last_end..start]);
                let replacement =
                    interp.replace_with(&replace_value, template.as_ref(), &s, start, &matched, &captures)?;
                out.extend(replacement);
                last_end = end;
                if !global {
                    break;
                }
                from = if end == start { end + 1 } else { end };
            }
            if global {
                interp.put(rx, "lastIndex", JsValue::Number(0.0), true)?;
            }
        }
        (None, Some(search)) => {
            if let Some(start) = s.index_of(&search, 0) {
                let end = start + search.len();
                out.extend_from_slice(&s.code_units[..start]);
                let replacement =
                    interp.replace_with(&replace_value, template.as_ref(), &s, start, &search, &[])?;
                out.extend(replacement);
                last_end = end;
            }
        }
        (None, None) => {}
    }
    out.extend_from_slice(&s.code_units[last_end..]);
    Ok(JsValue::String(JsString::from_units(out)))
}

fn string_search(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let (_, re) = interp.coerce_to_regexp(&arg(args, 0))?;
    let index = re
        .find_from(&s.code_units, 0)
        .and_then(|caps| caps.first().and_then(|c| *c))
        .map_or(-1.0, |(start, _)| start as f64);
    Ok(JsValue::Number(index))
}

fn string_slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let len = s.len() as f64;
    let from = relative_index(interp.to_integer_value(&arg(args, 0))?, len);
    let to = match arg(args, 1) {
        JsValue::Undefined => len,
        e => relative_index(interp.to_integer_value(&e)?, len),
    };
    Ok(JsValue::String(s.slice_utf16(from as usize, to.max(from) as usize)))
}

fn string_split(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let separator = arg(args, 0);
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX,
        l => interp.to_uint32(&l)?,
    } as usize;
    let sep = match interp.regexp_of(&separator) {
        Some((_, re)) => Some(Separator::Pattern(re)),
        None if separator.is_undefined() => None,
        None => Some(Separator::Text(interp.to_js_string(&separator)?)),
    };
    if limit == 0 {
        return Ok(JsValue::Object(interp.create_array(Vec::new())));
    }
    let Some(sep) = sep else {
        return Ok(JsValue::Object(interp.create_array(vec![JsValue::String(s)])));
    };
    if s.is_empty() {
        let parts = if sep.match_at(&s, 0).is_some() {
            Vec::new()
        } else {
            vec![JsValue::String(s)]
        };
        return Ok(JsValue::Object(interp.create_array(parts)));
    }

    let mut parts = Vec::new();
    let mut p = 0;
    let mut q = 0;
    while q < s.len() {
        match sep.match_at(&s, q) {
            Some((e, _)) if e == p => q += 1,
            None => q += 1,
            Some((e, captures)) => {
                parts.push(JsValue::String(s.slice_utf16(p, q)));
                if parts.len() == limit {
                    return Ok(JsValue::Object(interp.create_array(parts)));
                }
                p = e;
                for c in captures {
                    parts.push(c);
                    if parts.len() == limit {
                        return Ok(JsValue::Object(interp.create_array(parts)));
                    }
                }
                q = p;
            }
        }
    }
    parts.push(JsValue::String(s.slice_utf16(p, s.len())));
    Ok(JsValue::Object(interp.create_array(parts)))
}

fn string_substring(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let len = s.len() as f64;
    let start = interp.to_integer_value(&arg(args, 0))?.max(0.0).min(len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        e => interp.to_integer_value(&e)?.max(0.0).min(len),
    };
    let (from, to) = (start.min(end), start.max(end));
    Ok(JsValue::String(s.slice_utf16(from as usize, to as usize)))
}

fn string_substr(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(this)?;
    let len = s.len() as f64;
    let start = relative_index(interp.to_integer_value(&arg(args, 0))?, len);
    let length = match arg(args, 1) {
        JsValue::Undefined => f64::INFINITY,
        l => interp.to_integer_value(&l)?,
    };
    let count = length.max(0.0).min(len - start);
    if count <= 0.0 {
        return Ok(JsValue::String(JsString::default()));
    }
    Ok(JsValue::String(s.slice_utf16(start as usize, (start + count) as usize)))
}

fn string_to_lower_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    Ok(JsValue::String(map_case(&s, false)))
}

fn string_to_upper_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    Ok(JsValue::String(map_case(&s, true)))
}

fn string_trim(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.this_string(this)?;
    let units = &s.code_units;
    let start = units.iter().position(|&u| !is_trimmable(u)).unwrap_or(units.len());
    let end = units.iter().rposition(|&u| !is_trimmable(u)).map_or(start, |i| i + 1);
    Ok(JsValue::String(s.slice_utf16(start, end)))
}

#[cfg(test)]
mod tests {
    use crate::EngineConfig;
    use crate::interpreter::Interpreter;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrappers_and_conversion() {
        assert_eq!(eval_str("String(12) + String()"), "12");
        assert_eq!(eval_str("typeof new String('a')"), "object");
        assert_eq!(eval_str("new String('abc').length"), "3");
        assert_eq!(eval_str("String.fromCharCode(72, 105, 65601)"), "HiA");
        assert_eq!(eval_err("String.prototype.toString.call({})"), "TypeError");
        assert_eq!(eval_str("String.prototype.valueOf.call(new String('w'))"), "w");
    }

    #[test]
    fn character_access() {
        assert_eq!(eval_str("'abc'.charAt(1) + 'abc'.charAt(5) + '|'"), "b|");
        assert_eq!(eval_str("'abc'.charCodeAt(0)"), "97");
        assert_eq!(eval_str("'abc'.charCodeAt(-1)"), "NaN");
        assert_eq!(eval_str("'abc'[2]"), "c");
        assert_eq!(eval_err("String.prototype.charAt.call(null, 0)"), "TypeError");
    }

    #[test]
    fn searching() {
        assert_eq!(eval_str("'hello'.indexOf('l')"), "2");
        assert_eq!(eval_str("'hello'.indexOf('l', 3)"), "3");
        assert_eq!(eval_str("'hello'.indexOf('')"), "0");
        assert_eq!(eval_str("'hello'.lastIndexOf('l')"), "3");
        assert_eq!(eval_str("'hello'.lastIndexOf('l', 2)"), "2");
        assert_eq!(eval_str("'hello'.lastIndexOf('z')"), "-1");
        assert_eq!(eval_str("'abc'.search(/c/)"), "2");
        assert_eq!(eval_str("'abc'.search('z')"), "-1");
        assert_eq!(eval_str("'a'.localeCompare('b') + ',' + 'b'.localeCompare('a') + ',' + 'a'.localeCompare('a')"), "-1,1,0");
    }

    #[test]
    fn extraction() {
        assert_eq!(eval_str("'abcdef'.slice(1, -2)"), "bcd");
        assert_eq!(eval_str("'abcdef'.slice(-2)"), "ef");
        assert_eq!(eval_str("'abcdef'.substring(4, 1)"), "bcd");
        assert_eq!(eval_str("'abcdef'.substring(-3, 2)"), "ab");
        assert_eq!(eval_str("'abcdef'.substr(-3, 2)"), "de");
        assert_eq!(eval_str("'abcdef'.substr(2)"), "cdef");
        assert_eq!(eval_str("'ab'.concat(1, null)"), "ab1null");
    }

    #[test]
    fn substr_is_annex_b() {
        let mut interp = Interpreter::new(EngineConfig {
            annex_b: false,
            ..EngineConfig::default()
        });
        assert_eq!(eval_in(&mut interp, "typeof ''.substr").unwrap().to_string(), "undefined");
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(eval_str("'MiXeD'.toLowerCase() + 'MiXeD'.toUpperCase()"), "mixedMIXED");
        assert_eq!(eval_str("'straße'.toUpperCase()"), "STRASSE");
        assert_eq!(eval_str("'\\u00a0 \\t x y \\n\\ufeff'.trim()"), "x y");
        assert_eq!(eval_str("'   '.trim().length"), "0");
    }

    #[test]
    fn match_forms() {
        assert_eq!(eval_str("'a1b22c333'.match(/\\d+/g).join()"), "1,22,333");
        assert_eq!(eval_str("'abc'.match(/(b)(c)/).join()"), "bc,b,c");
        assert_eq!(eval_str("'abc'.match(/z/g)"), "null");
        assert_eq!(eval_str("'aaa'.match(/x*/g).length"), "4");
        assert_eq!(eval_str("'a.c'.match('.').index"), "0");
    }

    #[test]
    fn replace_forms() {
        assert_eq!(eval_str("'aaa'.replace('a', 'b')"), "baa");
        assert_eq!(eval_str("'aaa'.replace(/a/g, 'b')"), "bbb");
        assert_eq!(eval_str("'john smith'.replace(/(\\w+)\\s(\\w+)/, '$2, $1')"), "smith, john");
        assert_eq!(eval_str("'abc'.replace('b', '[$&|$`|$\\'|$$]')"), "a[b|a|c|$]c");
        assert_eq!(eval_str("'abc'.replace(/(b)/, '$01$2$10')"), "ab$2b0c");
        assert_eq!(
            eval_str("'a-b-c'.replace(/-(\\w)/g, function(m, c, pos) { return c.toUpperCase() + pos; })"),
            "aB1C3"
        );
        assert_eq!(eval_str("'abc'.replace(/x*/g, '-')"), "-a-b-c-");
        assert_eq!(eval_str("var r = /a/g; r.lastIndex = 3; 'aa'.replace(r, 'b') + r.lastIndex"), "bb0");
    }

    #[test]
    fn split_forms() {
        assert_eq!(eval_str("'a,b,,c'.split(',').length"), "4");
        assert_eq!(eval_str("'abc'.split('').join('|')"), "a|b|c");
        assert_eq!(eval_str("'abc'.split().length"), "1");
        assert_eq!(eval_str("''.split(',').length"), "1");
        assert_eq!(eval_str("''.split('').length"), "0");
        assert_eq!(eval_str("'a,b,c'.split(',', 2).join('|')"), "a|b");
        assert_eq!(eval_str("'a1b2c'.split(/(\\d)/).join('|')"), "a|1|b|2|c");
        assert_eq!(eval_str("'abc'.split(/x*/).join('|')"), "a|b|c");
        assert_eq!(eval_str("'ab'.split(/(?:)/).length"), "2");
        assert_eq!(eval_str("'A<B>bold</B>and<CODE>coded</CODE>'.split(/<(\\/)?([^<>]+)>/).length"), "13");
    }
}
