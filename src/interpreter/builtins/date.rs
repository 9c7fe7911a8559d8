use super::*;
use chrono::{Local, TimeZone, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// === Calendar arithmetic on time values (ms since the epoch, UTC) ===

fn day(t: f64) -> f64 {
    (t / MS_PER_DAY).floor()
}

fn time_within_day(t: f64) -> f64 {
    t.rem_euclid(MS_PER_DAY)
}

fn days_in_year(y: f64) -> f64 {
    let y = y as i64;
    if y % 4 != 0 || (y % 100 == 0 && y % 400 != 0) {
        365.0
    } else {
        366.0
    }
}

fn day_from_year(y: f64) -> f64 {
    365.0 * (y - 1970.0) + ((y - 1969.0) / 4.0).floor() - ((y - 1901.0) / 100.0).floor()
        + ((y - 1601.0) / 400.0).floor()
}

fn time_from_year(y: f64) -> f64 {
    day_from_year(y) * MS_PER_DAY
}

fn year_from_time(t: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    // the two estimates swap order for times before the epoch
    let by_long_years = t / MS_PER_DAY / 366.0 + 1970.0;
    let by_short_years = t / MS_PER_DAY / 365.0 + 1970.0;
    let mut lo = by_long_years.min(by_short_years).floor() as i64 - 1;
    let mut hi = by_long_years.max(by_short_years).ceil() as i64 + 2;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if time_from_year(mid as f64) <= t {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    (lo - 1) as f64
}

fn in_leap_year(t: f64) -> bool {
    days_in_year(year_from_time(t)) == 366.0
}

fn day_within_year(t: f64) -> f64 {
    day(t) - day_from_year(year_from_time(t))
}

/// Day-of-year at which each month starts in a common year.
const MONTH_STARTS: [i32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

fn month_start(m: usize, leap: bool) -> i32 {
    MONTH_STARTS[m] + i32::from(leap && m >= 2)
}

fn month_from_time(t: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    let d = day_within_year(t) as i32;
    let leap = in_leap_year(t);
    (1..12).take_while(|&m| d >= month_start(m, leap)).count() as f64
}

fn date_from_time(t: f64) -> f64 {
    if !t.is_finite() {
        return f64::NAN;
    }
    let d = day_within_year(t) as i32;
    let m = month_from_time(t) as usize;
    f64::from(d - month_start(m, in_leap_year(t)) + 1)
}

fn week_day(t: f64) -> f64 {
    (day(t) + 4.0).rem_euclid(7.0)
}

fn hour_from_time(t: f64) -> f64 {
    (t / MS_PER_HOUR).floor().rem_euclid(24.0)
}

fn min_from_time(t: f64) -> f64 {
    (t / MS_PER_MINUTE).floor().rem_euclid(60.0)
}

fn sec_from_time(t: f64) -> f64 {
    (t / 1000.0).floor().rem_euclid(60.0)
}

fn ms_from_time(t: f64) -> f64 {
    t.rem_euclid(1000.0)
}

fn make_time(hour: f64, min: f64, sec: f64, ms: f64) -> f64 {
    if !(hour.is_finite() && min.is_finite() && sec.is_finite() && ms.is_finite()) {
        return f64::NAN;
    }
    hour.trunc() * MS_PER_HOUR + min.trunc() * MS_PER_MINUTE + sec.trunc() * 1000.0 + ms.trunc()
}

fn make_day(year: f64, month: f64, date: f64) -> f64 {
    if !(year.is_finite() && month.is_finite() && date.is_finite()) {
        return f64::NAN;
    }
    let ym = year.trunc() + (month.trunc() / 12.0).floor();
    if ym.abs() > 400_000.0 {
        return f64::NAN;
    }
    let mn = month.trunc().rem_euclid(12.0) as usize;
    let leap = days_in_year(ym) == 366.0;
    day_from_year(ym) + f64::from(month_start(mn, leap)) + date.trunc() - 1.0
}

fn make_date(day: f64, time: f64) -> f64 {
    if !(day.is_finite() && time.is_finite()) {
        return f64::NAN;
    }
    day * MS_PER_DAY + time
}

fn time_clip(time: f64) -> f64 {
    if !time.is_finite() || time.abs() > 8.64e15 {
        return f64::NAN;
    }
    // + 0.0 turns -0 into +0
    time.trunc() + 0.0
}

/// Local offset from UTC in ms at the UTC instant `t`, daylight saving included.
fn local_offset(t: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    match Utc.timestamp_millis_opt(t as i64).single() {
        Some(dt) => f64::from(Local.offset_from_utc_datetime(&dt.naive_utc()).local_minus_utc()) * 1000.0,
        None => 0.0,
    }
}

fn local_time(t: f64) -> f64 {
    t + local_offset(t)
}

fn utc_time(t: f64) -> f64 {
    t - local_offset(t - local_offset(t))
}

fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

// === Formatting ===

fn format_year(y: f64) -> String {
    if y < 0.0 {
        format!("-{:06}", -y as i64)
    } else {
        format!("{:04}", y as i64)
    }
}

fn format_offset(offset_ms: f64) -> String {
    let minutes = (offset_ms / MS_PER_MINUTE) as i64;
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.abs();
    format!("GMT{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

fn format_clock(t: f64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        hour_from_time(t) as i32,
        min_from_time(t) as i32,
        sec_from_time(t) as i32
    )
}

fn format_date_part(t: f64) -> String {
    format!(
        "{} {} {:02} {}",
        DAY_NAMES[week_day(t) as usize],
        MONTH_NAMES[month_from_time(t) as usize],
        date_from_time(t) as i32,
        format_year(year_from_time(t))
    )
}

/// `Date.prototype.toString` output for the time value `t`.
pub(crate) fn date_to_display_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".to_string();
    }
    let lt = local_time(t);
    format!("{} {} {}", format_date_part(lt), format_clock(lt), format_offset(lt - t))
}

fn date_to_date_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".to_string();
    }
    format_date_part(local_time(t))
}

fn date_to_time_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".to_string();
    }
    let lt = local_time(t);
    format!("{} {}", format_clock(lt), format_offset(lt - t))
}

fn date_to_utc_string(t: f64) -> String {
    if t.is_nan() {
        return "Invalid Date".to_string();
    }
    format!(
        "{}, {:02} {} {} {} GMT",
        DAY_NAMES[week_day(t) as usize],
        date_from_time(t) as i32,
        MONTH_NAMES[month_from_time(t) as usize],
        format_year(year_from_time(t)),
        format_clock(t)
    )
}

fn date_to_iso_string(t: f64) -> String {
    let y = year_from_time(t);
    let year = if (0.0..=9999.0).contains(&y) {
        format!("{:04}", y as i64)
    } else if y < 0.0 {
        format!("-{:06}", -y as i64)
    } else {
        format!("+{:06}", y as i64)
    };
    format!(
        "{year}-{:02}-{:02}T{}.{:03}Z",
        month_from_time(t) as i32 + 1,
        date_from_time(t) as i32,
        format_clock(t),
        ms_from_time(t) as i32
    )
}

// === Parsing ===

struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn digits(&mut self, n: usize) -> Option<f64> {
        let mut x = 0.0;
        for _ in 0..n {
            let c = self.peek().filter(u8::is_ascii_digit)?;
            x = x * 10.0 + f64::from(c - b'0');
            self.pos += 1;
        }
        Some(x)
    }

    fn at_end(&self) -> bool {
        self.pos == self.s.len()
    }
}

/// The ISO subset `Date.prototype.toISOString` produces, with optional fields.
/// A missing offset means UTC.
fn parse_iso(s: &str) -> Option<f64> {
    let mut c = Cursor { s: s.as_bytes(), pos: 0 };
    let year = if c.eat(b'+') {
        c.digits(6)?
    } else if c.eat(b'-') {
        -c.digits(6)?
    } else {
        c.digits(4)?
    };
    let (mut month, mut date) = (1.0, 1.0);
    if c.eat(b'-') {
        month = c.digits(2)?;
        if c.eat(b'-') {
            date = c.digits(2)?;
        }
    }
    if !(1.0..=12.0).contains(&month) || !(1.0..=31.0).contains(&date) {
        return None;
    }
    let (mut h, mut min, mut sec, mut ms) = (0.0, 0.0, 0.0, 0.0);
    if c.eat(b'T') || c.eat(b' ') {
        h = c.digits(2)?;
        if !c.eat(b':') {
            return None;
        }
        min = c.digits(2)?;
        if c.eat(b':') {
            sec = c.digits(2)?;
            if c.eat(b'.') {
                let start = c.pos;
                let mut scale = 100.0;
                while let Some(d) = c.peek().filter(u8::is_ascii_digit) {
                    ms += f64::from(d - b'0') * scale;
                    scale /= 10.0;
                    c.pos += 1;
                }
                if c.pos == start {
                    return None;
                }
                ms = ms.floor();
            }
        }
        let midnight = h == 24.0 && min == 0.0 && sec == 0.0 && ms == 0.0;
        if (h > 23.0 && !midnight) || min > 59.0 || sec > 59.0 {
            return None;
        }
    }
    let mut offset = 0.0;
    if c.eat(b'Z') {
        // UTC
    } else if let Some(sign @ (b'+' | b'-')) = c.peek() {
        c.pos += 1;
        let oh = c.digits(2)?;
        if !c.eat(b':') {
            return None;
        }
        let om = c.digits(2)?;
        offset = (oh * 60.0 + om) * MS_PER_MINUTE;
        if sign == b'-' {
            offset = -offset;
        }
    } else if c.eat(b' ') {
        let rest = &s[c.pos..];
        if rest != "UTC" && rest != "GMT" {
            return None;
        }
        c.pos = s.len();
    }
    if !c.at_end() {
        return None;
    }
    let t = make_date(make_day(year, month - 1.0, date), make_time(h, min, sec, ms));
    Some(time_clip(t - offset))
}

/// The `toString`, `toDateString` and `toUTCString` layouts. Without a zone
/// the fields are local time.
fn parse_display(s: &str) -> Option<f64> {
    let s = s.split('(').next().unwrap_or(s);
    let (mut year, mut month, mut date) = (None, None, None);
    let (mut h, mut min, mut sec) = (0.0, 0.0, 0.0);
    let mut offset: Option<f64> = None;
    for token in s.split([' ', ',']).filter(|t| !t.is_empty()) {
        let lower = token.to_ascii_lowercase();
        if let Some(m) = MONTH_NAMES.iter().position(|n| lower.starts_with(&n.to_ascii_lowercase())) {
            month = Some(m as f64);
        } else if DAY_NAMES.iter().any(|n| lower.starts_with(&n.to_ascii_lowercase())) {
            // weekday names carry no information
        } else if token.contains(':') {
            let mut parts = token.split(':').map(|p| p.parse::<u32>().ok());
            h = f64::from(parts.next().flatten()?);
            min = f64::from(parts.next().flatten()?);
            if let Some(p) = parts.next() {
                sec = f64::from(p?);
            }
            if parts.next().is_some() || h > 24.0 || min > 59.0 || sec > 59.0 {
                return None;
            }
        } else if let Some(zone) = ["gmt", "utc", "z"].iter().find_map(|z| lower.strip_prefix(z)) {
            offset = Some(if zone.is_empty() { 0.0 } else { parse_numeric_offset(zone)? });
        } else if token.starts_with(['+', '-']) && token.len() == 5 {
            offset = Some(parse_numeric_offset(token)?);
        } else if token.bytes().all(|b| b.is_ascii_digit()) || token.starts_with('-') {
            let n: f64 = token.parse().ok()?;
            if date.is_none() && token.len() <= 2 {
                date = Some(n);
            } else if year.is_none() {
                year = Some(n);
            } else {
                return None;
            }
        } else {
            return None;
        }
    }
    let t = make_date(make_day(year?, month?, date?), make_time(h, min, sec, 0.0));
    Some(time_clip(match offset {
        Some(o) => t - o,
        None => utc_time(t),
    }))
}

/// `+hhmm` or `-hhmm` in ms.
fn parse_numeric_offset(s: &str) -> Option<f64> {
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1.0, &s[1..]),
        b'-' => (-1.0, &s[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hh: f64 = digits[..2].parse().ok()?;
    let mm: f64 = digits[2..].parse().ok()?;
    Some(sign * (hh * 60.0 + mm) * MS_PER_MINUTE)
}

fn parse_date(s: &str) -> f64 {
    let s = s.trim();
    parse_iso(s).or_else(|| parse_display(s)).unwrap_or(f64::NAN)
}

// === Fields ===

/// Date and time components, in the order setters consume their arguments
/// from the last one named.
#[derive(Clone, Copy)]
enum Field {
    Ms,
    Sec,
    Min,
    Hour,
    Date,
    Month,
    Year,
}

fn decompose(t: f64) -> [f64; 7] {
    [
        ms_from_time(t),
        sec_from_time(t),
        min_from_time(t),
        hour_from_time(t),
        date_from_time(t),
        month_from_time(t),
        year_from_time(t),
    ]
}

fn compose(c: &[f64; 7]) -> f64 {
    make_date(make_day(c[6], c[5], c[4]), make_time(c[3], c[2], c[1], c[0]))
}

const GETTERS: &[(&str, bool, fn(f64) -> f64)] = &[
    ("getFullYear", true, year_from_time),
    ("getUTCFullYear", false, year_from_time),
    ("getMonth", true, month_from_time),
    ("getUTCMonth", false, month_from_time),
    ("getDate", true, date_from_time),
    ("getUTCDate", false, date_from_time),
    ("getDay", true, week_day),
    ("getUTCDay", false, week_day),
    ("getHours", true, hour_from_time),
    ("getUTCHours", false, hour_from_time),
    ("getMinutes", true, min_from_time),
    ("getUTCMinutes", false, min_from_time),
    ("getSeconds", true, sec_from_time),
    ("getUTCSeconds", false, sec_from_time),
    ("getMilliseconds", true, ms_from_time),
    ("getUTCMilliseconds", false, ms_from_time),
];

const SETTERS: &[(&str, usize, bool, Field)] = &[
    ("setMilliseconds", 1, true, Field::Ms),
    ("setUTCMilliseconds", 1, false, Field::Ms),
    ("setSeconds", 2, true, Field::Sec),
    ("setUTCSeconds", 2, false, Field::Sec),
    ("setMinutes", 3, true, Field::Min),
    ("setUTCMinutes", 3, false, Field::Min),
    ("setHours", 4, true, Field::Hour),
    ("setUTCHours", 4, false, Field::Hour),
    ("setDate", 1, true, Field::Date),
    ("setUTCDate", 1, false, Field::Date),
    ("setMonth", 2, true, Field::Month),
    ("setUTCMonth", 2, false, Field::Month),
    ("setFullYear", 3, true, Field::Year),
    ("setUTCFullYear", 3, false, Field::Year),
];

impl Interpreter {
    pub(crate) fn setup_date(&mut self) {
        let object_proto = self.realm.object_prototype;
        let mut proto = JsObjectData::with_class("Date", Some(object_proto));
        proto.primitive_value = Some(JsValue::Number(f64::NAN));
        let proto = self.alloc(proto);
        self.realm.date_prototype = proto;

        let ctor = self.native_constructor("Date", 7, date_call, date_construct, proto);
        self.define_methods(
            ctor,
            &[("parse", 1, date_parse), ("UTC", 7, date_utc), ("now", 0, date_now)],
        );

        for &(name, local, field) in GETTERS {
            let f = self.create_function(
                JsFunction::native(name, 0, move |interp, this, _args| {
                    let t = js_try!(interp.this_time_value(this));
                    let t = if local { local_time(t) } else { t };
                    Completion::normal(JsValue::Number(if t.is_nan() { t } else { field(t) }))
                }),
                0,
            );
            self.insert_builtin(proto, name, JsValue::Object(f));
        }
        for &(name, arity, local, field) in SETTERS {
            let f = self.create_function(
                JsFunction::native(name, arity, move |interp, this, args| {
                    interp.set_date_fields(this, args, local, field).map(JsValue::Number).into()
                }),
                arity,
            );
            self.insert_builtin(proto, name, JsValue::Object(f));
        }

        self.define_methods(
            proto,
            &[
                ("toString", 0, date_proto_to_string),
                ("toDateString", 0, date_proto_to_date_string),
                ("toTimeString", 0, date_proto_to_time_string),
                ("toLocaleString", 0, date_proto_to_string),
                ("toLocaleDateString", 0, date_proto_to_date_string),
                ("toLocaleTimeString", 0, date_proto_to_time_string),
                ("toUTCString", 0, date_proto_to_utc_string),
                ("toISOString", 0, date_proto_to_iso_string),
                ("toJSON", 1, date_proto_to_json),
                ("valueOf", 0, date_proto_get_time),
                ("getTime", 0, date_proto_get_time),
                ("setTime", 1, date_proto_set_time),
                ("getTimezoneOffset", 0, date_proto_get_timezone_offset),
            ],
        );
        if self.config.annex_b {
            self.define_methods(
                proto,
                &[
                    ("getYear", 0, date_proto_get_year),
                    ("setYear", 1, date_proto_set_year),
                ],
            );
            // the same function object as toUTCString
            let to_utc = self.get(proto, "toUTCString").unwrap_or(JsValue::Undefined);
            self.insert_builtin(proto, "toGMTString", to_utc);
        }
        self.define_global("Date", JsValue::Object(ctor));
    }

    fn this_time_value(&mut self, this: &JsValue) -> JsResult<f64> {
        if let JsValue::Object(o) = this {
            let data = self.obj(*o);
            let data = data.borrow();
            if data.class_name == "Date"
                && let Some(JsValue::Number(t)) = data.primitive_value
            {
                return Ok(t);
            }
        }
        Err(self.type_error("this is not a Date object"))
    }

    fn set_time_value(&mut self, this: &JsValue, t: f64) {
        if let JsValue::Object(o) = this {
            self.obj(*o).borrow_mut().primitive_value = Some(JsValue::Number(t));
        }
    }

    /// Shared body of the `set*` methods: arguments replace `field` and the
    /// fields below it within the same date or time group.
    fn set_date_fields(&mut self, this: &JsValue, args: &[JsValue], local: bool, field: Field) -> JsResult<f64> {
        let t = self.this_time_value(this)?;
        let t = match (field, t.is_nan()) {
            (Field::Year, true) => 0.0,
            _ if local => local_time(t),
            _ => t,
        };
        let top = field as usize;
        let count = if top <= Field::Hour as usize { top + 1 } else { top - Field::Hour as usize };
        let mut fields = decompose(t);
        for k in 0..count {
            if k == 0 || k < args.len() {
                fields[top - k] = self.to_number(&arg(args, k))?;
            }
        }
        let new = compose(&fields);
        let v = time_clip(if local { utc_time(new) } else { new });
        self.set_time_value(this, v);
        Ok(v)
    }

    /// Year, month, day, hours, minutes, seconds, ms from constructor-style
    /// arguments; two-digit years count from 1900.
    fn time_from_components(&mut self, args: &[JsValue]) -> JsResult<f64> {
        let mut c = [f64::NAN, f64::NAN, 1.0, 0.0, 0.0, 0.0, 0.0];
        for (i, slot) in c.iter_mut().enumerate() {
            if i < 2 || i < args.len() {
                *slot = self.to_number(&arg(args, i))?;
            }
        }
        let mut year = c[0];
        if !year.is_nan() && (0.0..=99.0).contains(&to_integer(year)) {
            year = 1900.0 + to_integer(year);
        }
        Ok(make_date(make_day(year, c[1], c[2]), make_time(c[3], c[4], c[5], c[6])))
    }
}

fn date_call(_interp: &mut Interpreter, _this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::string(&date_to_display_string(now_ms())))
}

fn date_construct(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let t = match args.len() {
        0 => now_ms(),
        1 if interp.is_class(&args[0], "Date") => interp.this_time_value(&args[0])?,
        1 => match interp.to_primitive(&args[0], None)? {
            JsValue::String(s) => parse_date(&s.to_rust_string()),
            v => time_clip(interp.to_number(&v)?),
        },
        _ => time_clip(utc_time(interp.time_from_components(args)?)),
    };
    let proto = interp.realm.date_prototype;
    let mut data = JsObjectData::with_class("Date", Some(proto));
    data.primitive_value = Some(JsValue::Number(t));
    Ok(JsValue::Object(interp.alloc(data)))
}

fn date_parse(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let s = interp.to_js_string(&arg(args, 0))?;
    Ok(JsValue::Number(parse_date(&s.to_rust_string())))
}

fn date_utc(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Number(time_clip(interp.time_from_components(args)?)))
}

fn date_now(_interp: &mut Interpreter, _this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Number(now_ms()))
}

fn date_proto_to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    Ok(JsValue::string(&date_to_display_string(t)))
}

fn date_proto_to_date_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    Ok(JsValue::string(&date_to_date_string(t)))
}

fn date_proto_to_time_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    Ok(JsValue::string(&date_to_time_string(t)))
}

fn date_proto_to_utc_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    Ok(JsValue::string(&date_to_utc_string(t)))
}

fn date_proto_to_iso_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    if t.is_nan() {
        return Err(interp.range_error("Invalid time value"));
    }
    Ok(JsValue::string(&date_to_iso_string(t)))
}

fn date_proto_to_json(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = interp.to_object(this)?;
    let tv = interp.to_primitive(&JsValue::Object(o), Some(PreferredType::Number))?;
    if let JsValue::Number(n) = tv
        && !n.is_finite()
    {
        return Ok(JsValue::Null);
    }
    let to_iso = interp.get(o, "toISOString")?;
    if !interp.is_callable(&to_iso) {
        return Err(interp.type_error("toISOString is not a function"));
    }
    interp.call(&to_iso, JsValue::Object(o), &[])
}

fn date_proto_get_time(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Number(interp.this_time_value(this)?))
}

fn date_proto_set_time(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    interp.this_time_value(this)?;
    let t = time_clip(interp.to_number(&arg(args, 0))?);
    interp.set_time_value(this, t);
    Ok(JsValue::Number(t))
}

fn date_proto_get_timezone_offset(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    if t.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number((t - local_time(t)) / MS_PER_MINUTE))
}

fn date_proto_get_year(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    if t.is_nan() {
        return Ok(JsValue::Number(f64::NAN));
    }
    Ok(JsValue::Number(year_from_time(local_time(t)) - 1900.0))
}

fn date_proto_set_year(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let t = interp.this_time_value(this)?;
    let t = if t.is_nan() { 0.0 } else { local_time(t) };
    let y = interp.to_number(&arg(args, 0))?;
    if y.is_nan() {
        interp.set_time_value(this, f64::NAN);
        return Ok(JsValue::Number(f64::NAN));
    }
    let yi = to_integer(y);
    let year = if (0.0..=99.0).contains(&yi) { yi + 1900.0 } else { y };
    let d = make_day(year, month_from_time(t), date_from_time(t));
    let v = time_clip(utc_time(make_date(d, time_within_day(t))));
    interp.set_time_value(this, v);
    Ok(JsValue::Number(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn calendar_arithmetic() {
        assert_eq!(year_from_time(0.0), 1970.0);
        assert_eq!(year_from_time(-1.0), 1969.0);
        assert_eq!(make_day(2000.0, 1.0, 29.0), 11016.0);
        assert_eq!(date_from_time(make_date(11016.0, 0.0)), 29.0);
        assert_eq!(month_from_time(make_date(11016.0, 0.0)), 1.0);
        assert_eq!(make_day(2000.0, 12.0, 1.0), make_day(2001.0, 0.0, 1.0));
        assert_eq!(week_day(0.0), 4.0);
        assert!(time_clip(8.64e15 + 1.0).is_nan());
        assert!(time_clip(-0.0).is_sign_positive());
    }

    #[test]
    fn years_before_the_common_era_decode() {
        for y in [-271_821.0, -1.0, 0.0, 1.0, 500.0, 699.0, 1600.0, 275_760.0] {
            assert_eq!(year_from_time(time_from_year(y)), y);
            assert_eq!(year_from_time(time_from_year(y) - 1.0), y - 1.0);
        }
        assert_eq!(
            eval_str(
                "var d = new Date(0); d.setUTCFullYear(500);\
                 [d.getUTCFullYear(), d.getUTCMonth(), d.getUTCDate()].join()"
            ),
            "500,0,1"
        );
        assert_eq!(
            eval_str("new Date(Date.UTC(0, 1, 29)).toISOString()"),
            "1900-03-01T00:00:00.000Z"
        );
        assert_eq!(
            eval_str("var d = new Date(0); d.setUTCFullYear(0, 1, 29); d.toISOString()"),
            "0000-02-29T00:00:00.000Z"
        );
        assert_eq!(eval_str("new Date(-8.64e15).toISOString()"), "-271821-04-20T00:00:00.000Z");
    }

    #[test]
    fn utc_construction_and_iso_output() {
        assert_eq!(eval_str("Date.UTC(2000, 0, 1)"), "946684800000");
        assert_eq!(eval_str("Date.UTC(99, 0)"), "915148800000");
        assert_eq!(
            eval_str("new Date(Date.UTC(2020, 1, 29, 12, 30, 15, 250)).toISOString()"),
            "2020-02-29T12:30:15.250Z"
        );
        assert_eq!(eval_str("new Date(-1).toISOString()"), "1969-12-31T23:59:59.999Z");
        assert_eq!(eval_str("new Date(Date.UTC(-1, 0)).toISOString()"), "-000001-01-01T00:00:00.000Z");
        assert_eq!(eval_str("new Date(0).toUTCString()"), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn parse_accepts_iso_and_output_formats() {
        assert_eq!(eval_str("Date.parse('2000-01-01')"), "946684800000");
        assert_eq!(eval_str("Date.parse('2000-01-01T00:00:00+01:00')"), "946681200000");
        assert_eq!(eval_str("Date.parse('2020-02-29T12:30:15.250Z')"), "1582979415250");
        assert_eq!(eval_str("Date.parse('Sat, 01 Jan 2000 00:00:00 GMT')"), "946684800000");
        assert_eq!(eval_str("Date.parse('Sat Jan 01 2000 01:00:00 GMT+0100')"), "946684800000");
        assert_eq!(eval_str("Date.parse('2000-13-01')"), "NaN");
        assert_eq!(eval_str("Date.parse('not a date')"), "NaN");
        assert_eq!(
            eval_str("var d = new Date(2021, 5, 15, 10, 20, 30); Date.parse(d.toString()) === d.getTime()"),
            "true"
        );
        assert_eq!(eval_str("new Date('1970-01-01T00:00:01Z').getTime()"), "1000");
    }

    #[test]
    fn local_fields_round_trip() {
        assert_eq!(
            eval_str(
                "var d = new Date(2021, 5, 15, 10, 20, 30, 40);\
                 [d.getFullYear(), d.getMonth(), d.getDate(), d.getHours(), d.getMinutes(),\
                  d.getSeconds(), d.getMilliseconds()].join()"
            ),
            "2021,5,15,10,20,30,40"
        );
        assert_eq!(
            eval_str(
                "var d = new Date(2021, 0, 31, 8);\
                 d.getTime() - d.getTimezoneOffset() * 60000 ===\
                 Date.UTC(d.getFullYear(), d.getMonth(), d.getDate(), d.getHours())"
            ),
            "true"
        );
    }

    #[test]
    fn setters_recompose_fields() {
        assert_eq!(
            eval_str("var d = new Date(0); d.setUTCFullYear(2001, 1, 3); d.toISOString()"),
            "2001-02-03T00:00:00.000Z"
        );
        assert_eq!(
            eval_str("var d = new Date(0); d.setUTCHours(25, 1); d.toISOString()"),
            "1970-01-02T01:01:00.000Z"
        );
        assert_eq!(eval_str("var d = new Date(0); d.setUTCMonth(12); d.getUTCFullYear()"), "1971");
        assert_eq!(eval_str("var d = new Date(0); d.setUTCSeconds(); d.getTime()"), "NaN");
        assert_eq!(eval_str("var d = new Date(NaN); d.setUTCFullYear(2000); d.getTime()"), "946684800000");
        assert_eq!(eval_str("var d = new Date(NaN); d.setUTCDate(1)"), "NaN");
        assert_eq!(eval_str("var d = new Date(5); d.setTime(8.64e15 + 1); d.getTime()"), "NaN");
        assert_eq!(eval_str("var d = new Date(2000, 0, 1); d.setDate(32); d.getMonth()"), "1");
    }

    #[test]
    fn invalid_dates_and_receivers() {
        assert_eq!(eval_str("String(new Date(NaN))"), "Invalid Date");
        assert_eq!(eval_err("new Date(NaN).toISOString()"), "RangeError");
        assert_eq!(eval_str("new Date(NaN).toJSON()"), "null");
        assert_eq!(eval_str("new Date(0).toJSON()"), "1970-01-01T00:00:00.000Z");
        assert_eq!(eval_str("new Date(NaN).getMonth()"), "NaN");
        assert_eq!(eval_str("Date.prototype.getTime()"), "NaN");
        assert_eq!(eval_err("Date.prototype.getTime.call({})"), "TypeError");
    }

    #[test]
    fn constructor_forms() {
        assert_eq!(eval_str("typeof Date()"), "string");
        assert_eq!(eval_str("typeof (new Date(5) + 1)"), "string");
        assert_eq!(eval_str("new Date(5) - 1"), "4");
        assert_eq!(eval_str("new Date(new Date(7)).getTime()"), "7");
        assert_eq!(eval_str("Date.length + ':' + Date.UTC.length"), "7:7");
        assert_eq!(eval_str("var t = Date.now(); t > 1e12 && t === Math.floor(t)"), "true");
        assert_eq!(eval_str("Object.prototype.toString.call(new Date)"), "[object Date]");
    }

    #[test]
    fn annex_b_year_methods() {
        assert_eq!(eval_str("new Date(2000, 0).getYear()"), "100");
        assert_eq!(eval_str("var d = new Date(2000, 5, 1); d.setYear(95); d.getFullYear()"), "1995");
        assert_eq!(eval_str("Date.prototype.toGMTString === Date.prototype.toUTCString"), "true");
    }
}
