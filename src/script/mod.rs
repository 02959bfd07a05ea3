//! The script language generated programs are written in
//!
//! A small indentation-structured language: [`lexer`] produces layout-aware
//! tokens, [`parser`] builds the statement tree and [`interpreter`] walks it
//! against an [`interpreter::Environment`].

pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use interpreter::{CallContext, Environment, ExceptionKind, Interpreter, ScriptError};
pub use parser::{parse, Block, ParseError};
pub use value::{Args, Value};
