//! Operators: arithmetic, comparison, subscripts and `%` formatting

use crate::script::interpreter::{ExceptionKind, ScriptError};
use crate::script::parser::ast::{BinaryOp, CompareOp};
use crate::script::value::{quote_str, Number, Value};

/// Upper bound on the length of strings and lists built by `*`
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Upper bound on `%` format widths and precisions
const MAX_FORMAT_FIELD: usize = 1 << 16;

pub fn binary(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, ScriptError> {
    if let (Some(a), Some(b)) = (lhs.number(), rhs.number()) {
        return arithmetic(op, a, b);
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Markup(a), Value::Markup(b)) => Ok(Value::markup(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => {
            Ok(Value::str(format!("{}{}", a, b)))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.read().clone();
            items.extend(b.read().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(_) | Value::Markup(_) | Value::List(_) | Value::Tuple(_), count)
            if as_count(count).is_some() =>
        {
            repeat(lhs, as_count(count).unwrap_or(0))
        }
        (BinaryOp::Mul, count, Value::Str(_) | Value::Markup(_) | Value::List(_) | Value::Tuple(_))
            if as_count(count).is_some() =>
        {
            repeat(rhs, as_count(count).unwrap_or(0))
        }
        (BinaryOp::Mod, Value::Str(format) | Value::Markup(format), args) => {
            format_percent(format, args).map(Value::from)
        }
        _ => Err(ScriptError::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn as_count(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn repeat(
    value: &Value,
    count: i64,
) -> Result<Value, ScriptError> {
    let count = count.max(0) as usize;
    let too_long = |len: usize| {
        len.checked_mul(count)
            .map_or(true, |total| total > MAX_REPEAT_LEN)
    };
    match value {
        Value::Str(s) | Value::Markup(s) => {
            if too_long(s.len()) {
                return Err(ScriptError::new(ExceptionKind::OverflowError, "repeated string is too long"));
            }
            let text = s.repeat(count);
            Ok(match value {
                Value::Markup(_) => Value::markup(text),
                _ => Value::str(text),
            })
        }
        Value::List(items) => {
            let items = items.read();
            if too_long(items.len()) {
                return Err(ScriptError::new(ExceptionKind::OverflowError, "repeated list is too long"));
            }
            Ok(Value::list(items.iter().cloned().cycle().take(items.len() * count).collect()))
        }
        Value::Tuple(items) => {
            if too_long(items.len()) {
                return Err(ScriptError::new(ExceptionKind::OverflowError, "repeated tuple is too long"));
            }
            Ok(Value::tuple(items.iter().cloned().cycle().take(items.len() * count).collect()))
        }
        other => Err(ScriptError::type_error(format!(
            "can't multiply sequence of type '{}'",
            other.type_name()
        ))),
    }
}

fn arithmetic(
    op: BinaryOp,
    a: Number,
    b: Number,
) -> Result<Value, ScriptError> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(ScriptError::overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(ScriptError::overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(ScriptError::overflow),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(ScriptError::zero_division("division by zero"));
                }
                Ok(Value::Float(a as f64 / b as f64))
            }
            BinaryOp::FloorDiv => {
                if b == 0 {
                    return Err(ScriptError::zero_division("integer division or modulo by zero"));
                }
                let quotient = a.checked_div(b).ok_or_else(ScriptError::overflow)?;
                let remainder = a.wrapping_rem(b);
                if remainder != 0 && ((remainder < 0) != (b < 0)) {
                    Ok(Value::Int(quotient - 1))
                } else {
                    Ok(Value::Int(quotient))
                }
            }
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(ScriptError::zero_division("integer modulo by zero"));
                }
                let remainder = a.wrapping_rem(b);
                if remainder != 0 && ((remainder < 0) != (b < 0)) {
                    Ok(Value::Int(remainder + b))
                } else {
                    Ok(Value::Int(remainder))
                }
            }
        },
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division("float division by zero"));
                    }
                    a / b
                }
                BinaryOp::FloorDiv => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division("float floor division by zero"));
                    }
                    (a / b).floor()
                }
                BinaryOp::Mod => {
                    if b == 0.0 {
                        return Err(ScriptError::zero_division("float modulo by zero"));
                    }
                    let remainder = a % b;
                    if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                        remainder + b
                    } else {
                        remainder
                    }
                }
            };
            Ok(Value::Float(result))
        }
    }
}

pub fn compare(
    op: CompareOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, ScriptError> {
    use std::cmp::Ordering::*;
    Ok(match op {
        CompareOp::Eq => lhs.equals(rhs),
        CompareOp::Ne => !lhs.equals(rhs),
        CompareOp::Lt => lhs.compare(rhs, "<")? == Less,
        CompareOp::Le => lhs.compare(rhs, "<=")? != Greater,
        CompareOp::Gt => lhs.compare(rhs, ">")? == Greater,
        CompareOp::Ge => lhs.compare(rhs, ">=")? != Less,
        CompareOp::In => rhs.contains(lhs)?,
        CompareOp::NotIn => !rhs.contains(lhs)?,
        CompareOp::Is => lhs.identical(rhs),
        CompareOp::IsNot => !lhs.identical(rhs),
    })
}

/// Resolve a possibly negative index against `len`
fn normalize_index(
    index: i64,
    len: usize,
) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn integer_index(
    container: &Value,
    index: &Value,
) -> Result<i64, ScriptError> {
    as_count(index).ok_or_else(|| {
        ScriptError::type_error(format!(
            "{} indices must be integers, not {}",
            container.type_name(),
            index.type_name()
        ))
    })
}

/// `object[index]`
pub fn subscript(
    object: &Value,
    index: &Value,
) -> Result<Value, ScriptError> {
    match object {
        Value::List(items) => {
            let items = items.read();
            let i = integer_index(object, index)?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| ScriptError::new(ExceptionKind::IndexError, "list index out of range"))
        }
        Value::Tuple(items) => {
            let i = integer_index(object, index)?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| ScriptError::new(ExceptionKind::IndexError, "tuple index out of range"))
        }
        Value::Range(range) => {
            let i = integer_index(object, index)? as i128;
            let len = range.len() as i128;
            let i = if i < 0 { i + len } else { i };
            if (0..len).contains(&i) {
                Ok(Value::Int(range.item(i as u64)))
            } else {
                Err(ScriptError::new(ExceptionKind::IndexError, "range object index out of range"))
            }
        }
        Value::Str(s) | Value::Markup(s) => {
            let i = integer_index(object, index)?;
            let count = s.chars().count();
            normalize_index(i, count)
                .and_then(|i| s.chars().nth(i))
                .map(|c| same_text_kind(object, c.to_string()))
                .ok_or_else(|| ScriptError::new(ExceptionKind::IndexError, "string index out of range"))
        }
        Value::Dict(entries) => {
            let key = dict_key(index)?;
            entries
                .read()
                .get(key)
                .cloned()
                .ok_or_else(|| ScriptError::new(ExceptionKind::KeyError, quote_str(key)))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn same_text_kind(
    original: &Value,
    text: String,
) -> Value {
    match original {
        Value::Markup(_) => Value::markup(text),
        _ => Value::str(text),
    }
}

/// Keys of dicts are always strings
pub fn dict_key(key: &Value) -> Result<&str, ScriptError> {
    key.as_text()
        .ok_or_else(|| ScriptError::type_error(format!("dict keys must be str, not {}", key.type_name())))
}

fn slice_index(value: Option<&Value>) -> Result<Option<i64>, ScriptError> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(v) => as_count(v)
            .map(Some)
            .ok_or_else(|| ScriptError::type_error("slice indices must be integers or None")),
    }
}

fn slice_bounds(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
) -> (usize, usize) {
    let len = len as i64;
    let clamp = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };
    let start = start.map(clamp).unwrap_or(0);
    let end = end.map(clamp).unwrap_or(len).max(start);
    (start as usize, end as usize)
}

/// `object[start:end]`
pub fn slice(
    object: &Value,
    start: Option<&Value>,
    end: Option<&Value>,
) -> Result<Value, ScriptError> {
    let (start, end) = (slice_index(start)?, slice_index(end)?);
    match object {
        Value::List(items) => {
            let items = items.read();
            let (s, e) = slice_bounds(items.len(), start, end);
            Ok(Value::list(items[s..e].to_vec()))
        }
        Value::Tuple(items) => {
            let (s, e) = slice_bounds(items.len(), start, end);
            Ok(Value::tuple(items[s..e].to_vec()))
        }
        Value::Str(text) | Value::Markup(text) => {
            let (s, e) = slice_bounds(text.chars().count(), start, end);
            let sliced: String = text.chars().skip(s).take(e - s).collect();
            Ok(same_text_kind(object, sliced))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `object[index] = value`
pub fn set_item(
    object: &Value,
    index: &Value,
    value: Value,
) -> Result<(), ScriptError> {
    match object {
        Value::List(items) => {
            let i = integer_index(object, index)?;
            let mut items = items.write();
            let len = items.len();
            let slot = normalize_index(i, len)
                .ok_or_else(|| ScriptError::new(ExceptionKind::IndexError, "list assignment index out of range"))?;
            items[slot] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = dict_key(index)?.to_string();
            entries.write().insert(key, value);
            Ok(())
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// printf-style `format % args` supporting `s r d i f` with flags, width and precision
pub fn format_percent(
    format: &str,
    args: &Value,
) -> Result<String, ScriptError> {
    let values = match args {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut values = values.into_iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left_align = false;
        let mut zero_pad = false;
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left_align = true,
                '0' => zero_pad = true,
                _ => break,
            }
            chars.next();
        }
        let width = format_field(&mut chars, "width")?;
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            precision = Some(format_field(&mut chars, "precision")?);
        }

        let conversion = chars
            .next()
            .ok_or_else(|| ScriptError::value_error("incomplete format"))?;
        let value = values
            .next()
            .ok_or_else(|| ScriptError::type_error("not enough arguments for format string"))?;

        let (text, numeric) = match conversion {
            's' => {
                let text = value.to_display();
                match precision {
                    Some(p) => (text.chars().take(p).collect(), false),
                    None => (text, false),
                }
            }
            'r' => (value.repr(), false),
            'd' | 'i' => match value.number() {
                Some(Number::Int(i)) => (i.to_string(), true),
                Some(Number::Float(f)) => (float_to_int(f)?.to_string(), true),
                None => {
                    return Err(ScriptError::type_error(format!(
                        "%{} format: a real number is required, not {}",
                        conversion,
                        value.type_name()
                    )))
                }
            },
            'f' | 'F' => match value.number() {
                Some(n) => (format!("{:.*}", precision.unwrap_or(6), n.as_f64()), true),
                None => {
                    return Err(ScriptError::type_error(format!(
                        "must be real number, not {}",
                        value.type_name()
                    )))
                }
            },
            other => {
                return Err(ScriptError::value_error(format!(
                    "unsupported format character '{}'",
                    other
                )))
            }
        };

        out.push_str(&pad(&text, width, left_align, zero_pad && numeric));
    }

    if values.next().is_some() {
        return Err(ScriptError::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}

/// Digits of a width or precision, at most `MAX_FORMAT_FIELD`
fn format_field(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    what: &str,
) -> Result<usize, ScriptError> {
    let mut value = 0usize;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit as usize))
            .filter(|v| *v <= MAX_FORMAT_FIELD)
            .ok_or_else(|| ScriptError::value_error(format!("{} too big", what)))?;
        chars.next();
    }
    Ok(value)
}

/// Truncate a float towards zero, failing when it does not fit an int
pub fn float_to_int(f: f64) -> Result<i64, ScriptError> {
    let truncated = f.trunc();
    if !f.is_finite() || truncated >= i64::MAX as f64 || truncated < i64::MIN as f64 {
        return Err(ScriptError::new(
            ExceptionKind::OverflowError,
            format!("cannot convert float {} to integer", crate::script::value::format_float(f)),
        ));
    }
    Ok(truncated as i64)
}

fn pad(
    text: &str,
    width: usize,
    left_align: bool,
    zero_pad: bool,
) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let fill = width - len;
    if left_align {
        format!("{}{}", text, " ".repeat(fill))
    } else if zero_pad {
        match text.strip_prefix('-') {
            Some(digits) => format!("-{}{}", "0".repeat(fill), digits),
            None => format!("{}{}", "0".repeat(fill), text),
        }
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}
