//! Callables every render namespace provides
//!
//! `__buffer_append` and `__filter` are what generated programs call;
//! `capture`, `concat`, `captured` and `htmlquote` are for template authors
//! and are also reachable as attributes of `h`.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::runtime::Filter;
use crate::script::{Args, CallContext, ExceptionKind, ScriptError, Value};
use crate::template::codegen::APPEND_FN;

type Helper = fn(&mut CallContext<'_>, Args) -> Result<Value, ScriptError>;

static HELPERS: Lazy<IndexMap<&'static str, Value>> = Lazy::new(|| {
    let helpers: [(&'static str, Helper); 5] = [
        (APPEND_FN, buffer_append),
        ("capture", capture),
        ("concat", concat),
        ("captured", captured),
        ("htmlquote", htmlquote),
    ];
    helpers
        .into_iter()
        .map(|(name, func)| (name, Value::function(name, func)))
        .collect()
});

/// Author-facing helper names, in the order `h` lists them
const AUTHOR_HELPERS: [&str; 4] = ["capture", "concat", "captured", "htmlquote"];

/// Resolve a helper; `h` is built fresh so renders never share it
pub fn lookup(name: &str) -> Option<Value> {
    if name == "h" {
        let entries = AUTHOR_HELPERS
            .iter()
            .filter_map(|&helper| HELPERS.get(helper).map(|v| (helper.to_string(), v.clone())))
            .collect::<IndexMap<_, _>>();
        return Some(Value::dict(entries));
    }
    HELPERS.get(name).cloned()
}

fn buffer_append(
    ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check(APPEND_FN, 1, 1, &[])?;
    ctx.env.append(args.arg(0).to_display());
    Ok(Value::None)
}

/// The `__filter` callable for a namespace
///
/// Markup passes through untouched. Without a filter every other value is
/// converted to text; with one, the filtered text comes back as markup.
pub fn filter_function(filter: Option<Filter>) -> Value {
    Value::function("__filter", move |_ctx, args| {
        args.check("__filter", 1, 1, &[])?;
        let value = args.arg(0);
        if let Value::Markup(_) = value {
            return Ok(value);
        }
        Ok(match &filter {
            Some(filter) => Value::markup(filter(&value.to_display())),
            None => Value::from(value.to_display()),
        })
    })
}

fn capture(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("capture", 1, 1, &[])?;
    match args.arg(0) {
        Value::Str(name) => Ok(Value::Capture(name)),
        other => Err(ScriptError::type_error(format!(
            "capture() name must be str, not {}",
            other.type_name()
        ))),
    }
}

fn concat(
    ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("concat", 1, 1, &[])?;
    ctx.env.append(args.arg(0).to_display());
    Ok(Value::None)
}

fn captured(
    ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("captured", 1, 1, &[])?;
    let name = args.arg(0).to_display();
    ctx.env
        .lookup(&name)
        .ok_or_else(|| ScriptError::new(ExceptionKind::KeyError, Value::from(name).repr()))
}

fn htmlquote(
    _ctx: &mut CallContext<'_>,
    args: Args,
) -> Result<Value, ScriptError> {
    args.check("htmlquote", 1, 1, &[])?;
    Ok(Value::markup(escape_html(&args.arg(0).to_display())))
}

const HTML_ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('\'', "&#39;"),
    ('"', "&quot;"),
];

/// Escape `& < > ' "` as HTML entities
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match HTML_ENTITIES.iter().find(|(ch, _)| *ch == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_html`]; other entities are left alone
pub fn unescape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        match HTML_ENTITIES.iter().find(|(_, entity)| rest.starts_with(entity)) {
            Some((c, entity)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
