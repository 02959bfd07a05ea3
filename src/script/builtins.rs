//! Builtin functions, exception classes and methods of str, list and dict

use std::cmp::Ordering;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::script::interpreter::{CallContext, ExceptionKind, ScriptError};
use crate::script::interpreter::ops::{binary, dict_key, float_to_int};
use crate::script::parser::ast::BinaryOp;
use crate::script::value::{Args, Function, Number, Range, Value};

type Builtin = fn(&mut CallContext<'_>, Args) -> Result<Value, ScriptError>;

static BUILTINS: Lazy<IndexMap<&'static str, Value>> = Lazy::new(|| {
    let functions: [(&'static str, Builtin); 15] = [
        ("len", builtin_len),
        ("str", builtin_str),
        ("repr", builtin_repr),
        ("int", builtin_int),
        ("float", builtin_float),
        ("bool", builtin_bool),
        ("range", builtin_range),
        ("enumerate", builtin_enumerate),
        ("list", builtin_list),
        ("sorted", builtin_sorted),
        ("min", builtin_min),
        ("max", builtin_max),
        ("sum", builtin_sum),
        ("abs", builtin_abs),
        ("markup", builtin_markup),
    ];

    let mut table = IndexMap::new();
    for (name, func) in functions {
        table.insert(name, Value::Function(Function::new(name, func)));
    }
    for kind in ExceptionKind::ALL {
        table.insert(kind.name(), Value::ExceptionType(kind));
    }
    table
});

/// Resolve a builtin by name
pub fn lookup(name: &str) -> Option<Value> {
    BUILTINS.get(name).cloned()
}

/// Names of all builtins, in registration order
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

fn builtin_len(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("len", 1, 1, &[])?;
    let len = match &args.positional[0] {
        Value::Str(s) | Value::Markup(s) => s.chars().count(),
        Value::List(items) => items.read().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(entries) => entries.read().len(),
        Value::Range(range) => {
            return i64::try_from(range.len())
                .map(Value::Int)
                .map_err(|_| ScriptError::new(ExceptionKind::OverflowError, "range length does not fit an int"))
        }
        other => {
            return Err(ScriptError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_str(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("str", 0, 1, &[])?;
    Ok(match args.get(0) {
        Some(value) => Value::from(value.to_display()),
        None => Value::from(""),
    })
}

fn builtin_repr(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("repr", 1, 1, &[])?;
    Ok(Value::from(args.positional[0].repr()))
}

fn builtin_int(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("int", 0, 1, &[])?;
    match args.arg(0) {
        Value::None if args.is_empty() => Ok(Value::Int(0)),
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Float(f) => float_to_int(f).map(Value::Int),
        Value::Str(s) | Value::Markup(s) => {
            let text = s.trim().replace('_', "");
            text.parse::<i64>().map(Value::Int).map_err(|_| {
                ScriptError::value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    Value::str(s.clone()).repr()
                ))
            })
        }
        other => Err(ScriptError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_float(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("float", 0, 1, &[])?;
    let value = args.arg(0);
    if let Some(n) = value.number() {
        return Ok(Value::Float(n.as_f64()));
    }
    match &value {
        Value::None if args.is_empty() => Ok(Value::Float(0.0)),
        Value::Str(s) | Value::Markup(s) => {
            let text = s.trim().to_ascii_lowercase();
            let parsed = match text.as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => other.parse::<f64>(),
            };
            parsed.map(Value::Float).map_err(|_| {
                ScriptError::value_error(format!("could not convert string to float: {}", value.repr()))
            })
        }
        other => Err(ScriptError::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn builtin_bool(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("bool", 0, 1, &[])?;
    Ok(Value::Bool(args.arg(0).is_truthy()))
}

fn integer_arg(
    func: &str,
    value: &Value,
) -> Result<i64, ScriptError> {
    match value.number() {
        Some(Number::Int(i)) => Ok(i),
        _ => Err(ScriptError::type_error(format!(
            "'{}' object cannot be interpreted as an integer in {}()",
            value.type_name(),
            func
        ))),
    }
}

fn builtin_range(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("range", 1, 3, &[])?;
    let numbers = args
        .positional
        .iter()
        .map(|v| integer_arg("range", v))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match numbers.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!("argument count checked above"),
    };
    if step == 0 {
        return Err(ScriptError::value_error("range() arg 3 must not be zero"));
    }

    Ok(Value::Range(Range::new(start, stop, step)))
}

fn builtin_enumerate(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("enumerate", 1, 2, &["start"])?;
    let start = match args.keyword("start").or(args.get(1)) {
        Some(value) => integer_arg("enumerate", value)?,
        None => 0,
    };
    let items = args.positional[0]
        .iterate()?
        .into_iter()
        .zip(start..)
        .map(|(item, i)| Value::tuple(vec![Value::Int(i), item]))
        .collect();
    Ok(Value::list(items))
}

fn builtin_list(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("list", 0, 1, &[])?;
    match args.get(0) {
        Some(value) => Ok(Value::list(value.iterate()?)),
        None => Ok(Value::list(Vec::new())),
    }
}

/// Stable sort that surfaces comparison failures
fn sort_values(items: &mut [Value]) -> Result<(), ScriptError> {
    let mut failure = None;
    items.sort_by(|a, b| match a.compare(b, "<") {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn builtin_sorted(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("sorted", 1, 1, &["reverse"])?;
    let mut items = args.positional[0].iterate()?;
    sort_values(&mut items)?;
    if args.keyword("reverse").is_some_and(Value::is_truthy) {
        items.reverse();
    }
    Ok(Value::list(items))
}

fn extremum(
    name: &str,
    args: Args,
    wanted: Ordering,
) -> Result<Value, ScriptError> {
    args.check(name, 1, usize::MAX, &["default"])?;
    let candidates = if args.len() == 1 {
        args.positional[0].iterate()?
    } else {
        args.positional.clone()
    };
    let mut best: Option<Value> = None;
    for candidate in candidates {
        best = Some(match best {
            Some(current) if candidate.compare(&current, "<")? != wanted => current,
            _ => candidate,
        });
    }
    match (best, args.keyword("default")) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(ScriptError::value_error(format!(
            "{}() arg is an empty sequence",
            name
        ))),
    }
}

fn builtin_min(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    extremum("min", args, Ordering::Less)
}

fn builtin_max(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    extremum("max", args, Ordering::Greater)
}

fn builtin_sum(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("sum", 1, 2, &["start"])?;
    let mut total = args
        .keyword("start")
        .or(args.get(1))
        .cloned()
        .unwrap_or(Value::Int(0));
    if total.as_text().is_some() {
        return Err(ScriptError::type_error("sum() can't sum strings"));
    }
    for item in args.positional[0].iterate()? {
        total = binary(BinaryOp::Add, &total, &item)?;
    }
    Ok(total)
}

fn builtin_abs(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("abs", 1, 1, &[])?;
    match args.positional[0].number() {
        Some(Number::Int(i)) => i.checked_abs().map(Value::Int).ok_or_else(ScriptError::overflow),
        Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
        None => Err(ScriptError::type_error(format!(
            "bad operand type for abs(): '{}'",
            args.positional[0].type_name()
        ))),
    }
}

fn builtin_markup(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("markup", 1, 1, &[])?;
    Ok(match &args.positional[0] {
        Value::Markup(text) => Value::Markup(text.clone()),
        other => Value::markup(other.to_display()),
    })
}

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "startswith", "endswith",
    "title",
];
const LIST_METHODS: &[&str] = &["append", "extend", "pop", "index"];
const DICT_METHODS: &[&str] = &["get", "keys", "values", "items"];

/// `object.name`
///
/// Methods are returned bound to their receiver. Reading an attribute of a
/// dict that is not one of its methods reads the key, which is how `h.capture`
/// resolves.
pub fn get_attribute(
    object: &Value,
    name: &str,
) -> Result<Value, ScriptError> {
    let methods: &[&str] = match object {
        Value::Str(_) | Value::Markup(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        _ => &[],
    };
    if methods.contains(&name) {
        let receiver = object.clone();
        let method = name.to_string();
        return Ok(Value::function(name, move |_ctx, args| {
            call_method(&receiver, &method, args)
        }));
    }
    if let Value::Dict(entries) = object {
        if let Some(value) = entries.read().get(name) {
            return Ok(value.clone());
        }
    }
    Err(ScriptError::new(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", object.type_name(), name),
    ))
}

fn text_arg<'a>(
    method: &str,
    value: &'a Value,
) -> Result<&'a str, ScriptError> {
    value.as_text().ok_or_else(|| {
        ScriptError::type_error(format!(
            "{}() argument must be str, not {}",
            method,
            value.type_name()
        ))
    })
}

fn call_method(
    receiver: &Value,
    method: &str,
    args: Args,
) -> Result<Value, ScriptError> {
    match receiver {
        Value::Str(text) | Value::Markup(text) => {
            let result = str_method(text, method, &args)?;
            // Case changes and whitespace trimming keep markup safe
            Ok(match (receiver, result) {
                (Value::Markup(_), Value::Str(s))
                    if matches!(method, "strip" | "lstrip" | "rstrip" | "upper" | "lower" | "title") =>
                {
                    Value::Markup(s)
                }
                (_, result) => result,
            })
        }
        Value::List(_) => list_method(receiver, method, args),
        Value::Dict(_) => dict_method(receiver, method, args),
        other => Err(ScriptError::new(
            ExceptionKind::AttributeError,
            format!("'{}' object has no attribute '{}'", other.type_name(), method),
        )),
    }
}

fn str_method(
    text: &str,
    method: &str,
    args: &Args,
) -> Result<Value, ScriptError> {
    let strip_chars = |args: &Args| -> Result<Option<Vec<char>>, ScriptError> {
        args.check(method, 0, 1, &[])?;
        match args.get(0) {
            None | Some(Value::None) => Ok(None),
            Some(value) => Ok(Some(text_arg(method, value)?.chars().collect())),
        }
    };

    let value = match method {
        "upper" => {
            args.check(method, 0, 0, &[])?;
            Value::from(text.to_uppercase())
        }
        "lower" => {
            args.check(method, 0, 0, &[])?;
            Value::from(text.to_lowercase())
        }
        "title" => {
            args.check(method, 0, 0, &[])?;
            Value::from(title_case(text))
        }
        "strip" => match strip_chars(args)? {
            Some(chars) => Value::from(text.trim_matches(chars.as_slice())),
            None => Value::from(text.trim()),
        },
        "lstrip" => match strip_chars(args)? {
            Some(chars) => Value::from(text.trim_start_matches(chars.as_slice())),
            None => Value::from(text.trim_start()),
        },
        "rstrip" => match strip_chars(args)? {
            Some(chars) => Value::from(text.trim_end_matches(chars.as_slice())),
            None => Value::from(text.trim_end()),
        },
        "split" => {
            args.check(method, 0, 1, &[])?;
            let parts: Vec<Value> = match args.get(0) {
                None | Some(Value::None) => text.split_whitespace().map(Value::from).collect(),
                Some(sep) => {
                    let sep = text_arg(method, sep)?;
                    if sep.is_empty() {
                        return Err(ScriptError::value_error("empty separator"));
                    }
                    text.split(sep).map(Value::from).collect()
                }
            };
            Value::list(parts)
        }
        "join" => {
            args.check(method, 1, 1, &[])?;
            let parts = args.positional[0]
                .iterate()?
                .iter()
                .map(|item| text_arg(method, item).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Value::from(parts.join(text))
        }
        "replace" => {
            args.check(method, 2, 2, &[])?;
            let from = text_arg(method, &args.positional[0])?;
            let to = text_arg(method, &args.positional[1])?;
            Value::from(text.replace(from, to))
        }
        "startswith" | "endswith" => {
            args.check(method, 1, 1, &[])?;
            let candidates = match &args.positional[0] {
                Value::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            };
            let mut found = false;
            for candidate in &candidates {
                let affix = text_arg(method, candidate)?;
                found |= if method == "startswith" {
                    text.starts_with(affix)
                } else {
                    text.ends_with(affix)
                };
            }
            Value::Bool(found)
        }
        other => {
            return Err(ScriptError::new(
                ExceptionKind::AttributeError,
                format!("'str' object has no attribute '{}'", other),
            ))
        }
    };
    Ok(value)
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

fn list_method(
    receiver: &Value,
    method: &str,
    args: Args,
) -> Result<Value, ScriptError> {
    let Value::List(items) = receiver else {
        return Err(ScriptError::type_error("list method called on non-list"));
    };
    match method {
        "append" => {
            args.check(method, 1, 1, &[])?;
            items.write().push(args.arg(0));
            Ok(Value::None)
        }
        "extend" => {
            args.check(method, 1, 1, &[])?;
            let extra = args.positional[0].iterate()?;
            items.write().extend(extra);
            Ok(Value::None)
        }
        "pop" => {
            args.check(method, 0, 1, &[])?;
            let mut items = items.write();
            if items.is_empty() {
                return Err(ScriptError::new(ExceptionKind::IndexError, "pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match args.get(0) {
                Some(value) => integer_arg("pop", value)?,
                None => len - 1,
            };
            let index = if index < 0 { index + len } else { index };
            if !(0..len).contains(&index) {
                return Err(ScriptError::new(ExceptionKind::IndexError, "pop index out of range"));
            }
            Ok(items.remove(index as usize))
        }
        "index" => {
            args.check(method, 1, 1, &[])?;
            let needle = &args.positional[0];
            items
                .read()
                .iter()
                .position(|item| item.equals(needle))
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| ScriptError::value_error(format!("{} is not in list", needle.repr())))
        }
        other => Err(ScriptError::new(
            ExceptionKind::AttributeError,
            format!("'list' object has no attribute '{}'", other),
        )),
    }
}

fn dict_method(
    receiver: &Value,
    method: &str,
    args: Args,
) -> Result<Value, ScriptError> {
    let Value::Dict(entries) = receiver else {
        return Err(ScriptError::type_error("dict method called on non-dict"));
    };
    match method {
        "get" => {
            args.check(method, 1, 2, &[])?;
            let key = dict_key(&args.positional[0])?;
            Ok(entries.read().get(key).cloned().unwrap_or_else(|| args.arg(1)))
        }
        "keys" => {
            args.check(method, 0, 0, &[])?;
            Ok(Value::list(entries.read().keys().map(|k| Value::from(k.as_str())).collect()))
        }
        "values" => {
            args.check(method, 0, 0, &[])?;
            Ok(Value::list(entries.read().values().cloned().collect()))
        }
        "items" => {
            args.check(method, 0, 0, &[])?;
            Ok(Value::list(
                entries
                    .read()
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![Value::from(k.as_str()), v.clone()]))
                    .collect(),
            ))
        }
        other => Err(ScriptError::new(
            ExceptionKind::AttributeError,
            format!("'dict' object has no attribute '{}'", other),
        )),
    }
}
