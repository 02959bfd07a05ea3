//! Script runtime errors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Built-in exception classes
///
/// `Exception` is the root. `LookupError` and `ArithmeticError` group the
/// subscript and numeric failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    Exception,
    ValueError,
    TypeError,
    KeyError,
    IndexError,
    NameError,
    ZeroDivisionError,
    RuntimeError,
    OverflowError,
    AttributeError,
    LookupError,
    ArithmeticError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 12] = [
        ExceptionKind::Exception,
        ExceptionKind::ValueError,
        ExceptionKind::TypeError,
        ExceptionKind::KeyError,
        ExceptionKind::IndexError,
        ExceptionKind::NameError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::RuntimeError,
        ExceptionKind::OverflowError,
        ExceptionKind::AttributeError,
        ExceptionKind::LookupError,
        ExceptionKind::ArithmeticError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::ArithmeticError => "ArithmeticError",
        }
    }

    pub fn parent(&self) -> Option<ExceptionKind> {
        match self {
            ExceptionKind::Exception => None,
            ExceptionKind::KeyError | ExceptionKind::IndexError => Some(ExceptionKind::LookupError),
            ExceptionKind::ZeroDivisionError | ExceptionKind::OverflowError => {
                Some(ExceptionKind::ArithmeticError)
            }
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// Whether an `except self` clause catches `other`
    pub fn catches(
        &self,
        other: ExceptionKind,
    ) -> bool {
        let mut current = Some(other);
        while let Some(kind) = current {
            if kind == *self {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception raised while executing a program
///
/// `line` is the generated-program line of the innermost statement that was
/// executing; 0 until the executor attaches it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ScriptError {
    pub kind: ExceptionKind,
    pub message: String,
    pub line: usize,
}

impl ScriptError {
    pub fn new(
        kind: ExceptionKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ValueError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(
            ExceptionKind::NameError,
            format!("name '{}' is not defined", name),
        )
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ZeroDivisionError, message)
    }

    pub fn overflow() -> Self {
        Self::new(ExceptionKind::OverflowError, "integer overflow")
    }

    /// Attach a line unless one is already set
    pub fn at_line(
        mut self,
        line: usize,
    ) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ExceptionKind::Exception.catches(ExceptionKind::KeyError));
        assert!(ExceptionKind::LookupError.catches(ExceptionKind::IndexError));
        assert!(ExceptionKind::ArithmeticError.catches(ExceptionKind::ZeroDivisionError));
        assert!(!ExceptionKind::LookupError.catches(ExceptionKind::ValueError));
        assert!(!ExceptionKind::KeyError.catches(ExceptionKind::LookupError));
    }

    #[test]
    fn test_line_is_attached_once() {
        let err = ScriptError::name_error("x").at_line(4).at_line(9);
        assert_eq!(err.line, 4);
        assert_eq!(err.to_string(), "NameError: name 'x' is not defined");
    }
}
