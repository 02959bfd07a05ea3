//! Runtime values of the script language
//!
//! Values are cheap to clone: strings are `Arc<str>`, lists and dicts are
//! shared behind `Arc<RwLock<..>>` so that `xs.append(1)` is visible through
//! every alias, as template authors expect. Everything is `Send + Sync`, which
//! lets renderer globals be shared across threads.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::script::interpreter::{CallContext, ExceptionKind, ScriptError};

pub type ListRef = Arc<RwLock<Vec<Value>>>;
pub type DictRef = Arc<RwLock<IndexMap<String, Value>>>;

/// Signature of every callable exposed to scripts
pub type NativeFn = dyn Fn(&mut CallContext<'_>, Args) -> Result<Value, ScriptError> + Send + Sync;

/// Native callable
#[derive(Clone)]
pub struct Function {
    pub name: Arc<str>,
    func: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(
        name: impl Into<Arc<str>>,
        func: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>, Args) -> Result<Value, ScriptError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(
        &self,
        ctx: &mut CallContext<'_>,
        args: Args,
    ) -> Result<Value, ScriptError> {
        (self.func)(ctx, args)
    }

    fn same(
        &self,
        other: &Function,
    ) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Function {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

/// Raised exception instance
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: String,
}

impl From<&ScriptError> for Exception {
    fn from(err: &ScriptError) -> Self {
        Exception {
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// Arguments of a native call
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl Args {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Check the positional count and reject unknown keywords
    pub fn check(
        &self,
        name: &str,
        min: usize,
        max: usize,
        keywords: &[&str],
    ) -> Result<(), ScriptError> {
        let given = self.positional.len();
        if given < min || given > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else if given < min {
                format!("at least {}", min)
            } else {
                format!("at most {}", max)
            };
            let noun = if expected.ends_with(" 1") { "argument" } else { "arguments" };
            return Err(ScriptError::type_error(format!(
                "{}() takes {} {} ({} given)",
                name, expected, noun, given
            )));
        }
        if let Some((unknown, _)) = self.keywords.iter().find(|(k, _)| !keywords.contains(&k.as_str())) {
            return Err(ScriptError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                name, unknown
            )));
        }
        Ok(())
    }

    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Positional argument `index`, or `Value::None`
    pub fn arg(
        &self,
        index: usize,
    ) -> Value {
        self.positional.get(index).cloned().unwrap_or(Value::None)
    }

    pub fn keyword(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Longest range that may be turned into a list
pub const MAX_RANGE_ITEMS: u64 = 1 << 24;

/// `range(start, stop, step)`; produced lazily, never stored as a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    /// `step` must be non-zero
    pub fn new(
        start: i64,
        stop: i64,
        step: i64,
    ) -> Self {
        Self { start, stop, step }
    }

    pub fn len(&self) -> u64 {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let len = if step > 0 && start < stop {
            (stop - start - 1) / step + 1
        } else if step < 0 && start > stop {
            (start - stop - 1) / -step + 1
        } else {
            0
        };
        len as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item `index`, which must be below `len()`
    pub fn item(
        &self,
        index: u64,
    ) -> i64 {
        (self.start as i128 + index as i128 * self.step as i128) as i64
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let range = *self;
        (0..range.len()).map(move |i| range.item(i))
    }

    pub fn contains(
        &self,
        value: i64,
    ) -> bool {
        let (start, step, value) = (self.start as i128, self.step as i128, value as i128);
        let in_bounds = if step > 0 {
            start <= value && value < self.stop as i128
        } else {
            (self.stop as i128) < value && value <= start
        };
        in_bounds && (value - start) % step == 0
    }
}

/// A value of the script language
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Text that has already passed through the escaping filter
    Markup(Arc<str>),
    List(ListRef),
    Tuple(Arc<[Value]>),
    Dict(DictRef),
    Function(Function),
    ExceptionType(ExceptionKind),
    Exception(Arc<Exception>),
    /// Context value returned by `capture(name)`
    Capture(Arc<str>),
    Range(Range),
}

/// Numeric view used by arithmetic and comparisons; `bool` counts as an int
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl Value {
    pub fn str(text: impl Into<Arc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn markup(text: impl Into<Arc<str>>) -> Self {
        Value::Markup(text.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn dict(entries: IndexMap<String, Value>) -> Self {
        Value::Dict(Arc::new(RwLock::new(entries)))
    }

    pub fn function<F>(
        name: &str,
        func: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>, Args) -> Result<Value, ScriptError> + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, func))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Markup(_) => "Markup",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Function(_) => "builtin_function_or_method",
            Value::ExceptionType(_) => "type",
            Value::Exception(exc) => exc.kind.name(),
            Value::Capture(_) => "capture",
            Value::Range(_) => "range",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) | Value::Markup(s) => !s.is_empty(),
            Value::List(items) => !items.read().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.read().is_empty(),
            Value::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    pub fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Text of a `str` or `Markup` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Markup(s) => Some(s),
            _ => None,
        }
    }

    /// `str(value)`
    pub fn to_display(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) | Value::Markup(s) => s.to_string(),
            Value::Exception(exc) => exc.message.clone(),
            _ => self.repr(),
        }
    }

    /// `repr(value)`
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote_str(s),
            Value::Markup(s) => format!("Markup({})", quote_str(s)),
            Value::List(items) => {
                let items = items.read();
                format!("[{}]", join_repr(items.iter()))
            }
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items.iter())),
            Value::Dict(entries) => {
                let entries = entries.read();
                let body = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote_str(k), v.repr()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{}}}", body)
            }
            Value::Function(func) => format!("{:?}", func),
            Value::ExceptionType(kind) => format!("<class '{}'>", kind.name()),
            Value::Exception(exc) => format!("{}({})", exc.kind.name(), quote_str(&exc.message)),
            Value::Capture(name) => format!("<capture {}>", quote_str(name)),
            Value::Range(range) if range.step == 1 => format!("range({}, {})", range.start, range.stop),
            Value::Range(range) => format!("range({}, {}, {})", range.start, range.stop, range.step),
            other => other.to_display(),
        }
    }

    /// `==`
    pub fn equals(
        &self,
        other: &Value,
    ) -> bool {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return match (a, b) {
                (Number::Int(a), Number::Int(b)) => a == b,
                (a, b) => a.as_f64() == b.as_f64(),
            };
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b) || sequences_equal(&a.read(), &b.read())
            }
            (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b),
            (Value::Dict(a), Value::Dict(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.read(), b.read());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|other| v.equals(other)))
            }
            (Value::Function(a), Value::Function(b)) => a.same(b),
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            (Value::Capture(a), Value::Capture(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => {
                let len = a.len();
                len == b.len() && (len == 0 || (a.start == b.start && (len == 1 || a.step == b.step)))
            }
            _ => false,
        }
    }

    /// `is`: identity for containers, equality for immutable scalars
    pub fn identical(
        &self,
        other: &Value,
    ) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
            _ => self.type_name() == other.type_name() && self.equals(other),
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`, `sorted`, `min` and `max`
    pub fn compare(
        &self,
        other: &Value,
        op: &str,
    ) -> Result<Ordering, ScriptError> {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return match (a, b) {
                (Number::Int(a), Number::Int(b)) => Ok(a.cmp(&b)),
                (a, b) => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .ok_or_else(|| ScriptError::value_error("cannot order NaN")),
            };
        }
        match (self, other) {
            (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.read().clone(), b.read().clone());
                compare_sequences(&a, &b, op)
            }
            (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b, op),
            _ => Err(ScriptError::type_error(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op,
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Membership test for `in`
    pub fn contains(
        &self,
        item: &Value,
    ) -> Result<bool, ScriptError> {
        match self {
            Value::Str(haystack) | Value::Markup(haystack) => match item.as_text() {
                Some(needle) => Ok(haystack.contains(needle)),
                None => Err(ScriptError::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    item.type_name()
                ))),
            },
            Value::List(items) => Ok(items.read().iter().any(|v| v.equals(item))),
            Value::Tuple(items) => Ok(items.iter().any(|v| v.equals(item))),
            Value::Dict(entries) => Ok(item
                .as_text()
                .is_some_and(|key| entries.read().contains_key(key))),
            Value::Range(range) => Ok(match item.number() {
                Some(Number::Int(i)) => range.contains(i),
                Some(Number::Float(f)) => {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 && range.contains(f as i64)
                }
                None => false,
            }),
            other => Err(ScriptError::type_error(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Snapshot of the items a `for` loop visits
    pub fn iterate(&self) -> Result<Vec<Value>, ScriptError> {
        match self {
            Value::Range(range) => {
                if range.len() > MAX_RANGE_ITEMS {
                    return Err(ScriptError::new(
                        ExceptionKind::OverflowError,
                        format!("{} is too long to materialize", self.repr()),
                    ));
                }
                Ok(range.iter().map(Value::Int).collect())
            }
            Value::Str(s) | Value::Markup(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::List(items) => Ok(items.read().clone()),
            Value::Tuple(items) => Ok(items.to_vec()),
            Value::Dict(entries) => Ok(entries.read().keys().map(|k| Value::str(k.as_str())).collect()),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

fn sequences_equal(
    a: &[Value],
    b: &[Value],
) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

fn compare_sequences(
    a: &[Value],
    b: &[Value],
    op: &str,
) -> Result<Ordering, ScriptError> {
    for (x, y) in a.iter().zip(b) {
        if !x.equals(y) {
            return x.compare(y, op);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

fn join_repr<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// Quote a string the way `repr` does
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Shortest round-tripping float text, always showing a fraction or exponent
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", f);
        // Rust writes `1e20` and `1.5e-7`; always show the exponent sign
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{:0>2}", mantissa, exp),
            Some((mantissa, exp)) => format!("{}e-{:0>2}", mantissa, &exp[1..]),
            None => text,
        };
    }
    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::dict(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::list(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(entries) => {
                Value::dict(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_repr() {
        assert_eq!(Value::from("it's").repr(), "\"it's\"");
        assert_eq!(Value::from("a\nb").repr(), "'a\\nb'");
        let list = Value::list(vec![Value::Int(1), Value::from("x"), Value::None]);
        assert_eq!(list.repr(), "[1, 'x', None]");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(Value::Bool(true).to_display(), "True");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::ExceptionType(ExceptionKind::Exception).is_truthy());
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(Value::Bool(true).equals(&Value::Int(1)));
        assert!(Value::from("a").equals(&Value::markup("a")));
        assert!(!Value::from("1").equals(&Value::Int(1)));
    }

    #[test]
    fn test_shared_list_mutation() {
        let list = Value::list(vec![]);
        let alias = list.clone();
        if let Value::List(items) = &alias {
            items.write().push(Value::Int(3));
        }
        assert_eq!(list.repr(), "[3]");
        assert!(list.identical(&alias));
        assert!(!list.identical(&Value::list(vec![Value::Int(3)])));
    }

    #[test]
    fn test_compare_mixed_types_fails() {
        let err = Value::Int(1).compare(&Value::from("a"), "<").unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
        assert!(err.message.contains("'int' and 'str'"));
    }

    #[test]
    fn test_range_is_lazy() {
        let huge = Range::new(0, 1_000_000_000_000, 1);
        assert_eq!(huge.len(), 1_000_000_000_000);
        assert_eq!(huge.iter().take(3).collect::<Vec<_>>(), vec![0, 1, 2]);
        let value = Value::Range(huge);
        assert!(value.contains(&Value::Int(999_999_999_999)).unwrap());
        assert!(!value.contains(&Value::Int(-1)).unwrap());
        assert_eq!(value.iterate().unwrap_err().kind, ExceptionKind::OverflowError);

        let down = Range::new(5, 0, -2);
        assert_eq!(down.iter().collect::<Vec<_>>(), vec![5, 3, 1]);
        assert!(Value::Range(down).contains(&Value::Int(3)).unwrap());
        assert!(!Value::Range(down).contains(&Value::Int(2)).unwrap());
        assert_eq!(Value::Range(down).repr(), "range(5, 0, -2)");
        assert_eq!(Range::new(i64::MIN, i64::MAX, 1).len(), u64::MAX);
        assert!(Range::new(3, 3, 1).is_empty());
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value = serde_json::json!({"name": "x", "n": [1, 2.5, null]});
        let value = Value::from(json);
        assert_eq!(value.repr(), "{'name': 'x', 'n': [1, 2.5, None]}");
    }
}
