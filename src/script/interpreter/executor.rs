//! Statement and expression evaluation

use std::sync::Arc;

use crate::script::builtins;
use crate::script::interpreter::ops;
use crate::script::interpreter::{CallContext, Environment, ExceptionKind, ScriptError};
use crate::script::parser::ast::*;
use crate::script::value::{Args, Exception, Value};

/// How a block finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Executes a parsed program against an environment
pub struct Interpreter<'e> {
    env: &'e mut dyn Environment,
    /// Exceptions currently being handled, innermost last (for bare `raise`)
    handling: Vec<ScriptError>,
}

impl<'e> Interpreter<'e> {
    pub fn new(env: &'e mut dyn Environment) -> Self {
        Self {
            env,
            handling: Vec::new(),
        }
    }

    /// Run every statement of `program`
    pub fn run(
        &mut self,
        program: &[Stmt],
    ) -> Result<(), ScriptError> {
        self.exec_block(program).map(|_| ())
    }

    /// Evaluate a standalone expression
    pub fn eval(
        &mut self,
        expr: &Expr,
    ) -> Result<Value, ScriptError> {
        self.eval_expr(expr)
    }

    fn exec_block(
        &mut self,
        block: &[Stmt],
    ) -> Result<Flow, ScriptError> {
        for stmt in block {
            let flow = self.exec_stmt(stmt).map_err(|err| err.at_line(stmt.line))?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
    ) -> Result<Flow, ScriptError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = match target {
                    Target::Name(name) => self.lookup(name)?,
                    Target::Index { object, index } => {
                        let object = self.eval_expr(object)?;
                        let index = self.eval_expr(index)?;
                        ops::subscript(&object, &index)?
                    }
                    Target::Unpack(_) => {
                        return Err(ScriptError::type_error(
                            "illegal expression for augmented assignment",
                        ))
                    }
                };
                let rhs = self.eval_expr(value)?;
                let updated = ops::binary(*op, &current, &rhs)?;
                self.assign(target, updated)?;
            }
            StmtKind::If { branches, orelse } => {
                for (condition, body) in branches {
                    if self.eval_expr(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                if let Some(body) = orelse {
                    return self.exec_block(body);
                }
            }
            StmtKind::For { target, iter, body } => match self.eval_expr(iter)? {
                // Ranges are stepped through, never built as a list
                Value::Range(range) => self.exec_for(target, body, range.iter().map(Value::Int))?,
                iterable => self.exec_for(target, body, iterable.iterate()?.into_iter())?,
            },
            StmtKind::While { condition, body } => {
                while self.eval_expr(condition)?.is_truthy() {
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            StmtKind::Try {
                body,
                handlers,
                finally,
            } => return self.exec_try(body, handlers, finally.as_deref()),
            StmtKind::Raise(expr) => return Err(self.raise(expr.as_ref())?),
            StmtKind::With {
                context,
                name,
                body,
            } => return self.exec_with(context, name.as_deref(), body),
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn exec_for(
        &mut self,
        target: &Target,
        body: &[Stmt],
        items: impl Iterator<Item = Value>,
    ) -> Result<(), ScriptError> {
        for item in items {
            self.assign(target, item)?;
            if self.exec_block(body)? == Flow::Break {
                break;
            }
        }
        Ok(())
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        finally: Option<&[Stmt]>,
    ) -> Result<Flow, ScriptError> {
        let mut outcome = self.exec_block(body);
        if let Err(err) = outcome {
            outcome = self.handle(err, handlers);
        }
        if let Some(finally) = finally {
            // A failure or jump inside `finally` replaces the pending outcome
            match self.exec_block(finally) {
                Ok(Flow::Normal) => {}
                other => return other,
            }
        }
        outcome
    }

    fn handle(
        &mut self,
        err: ScriptError,
        handlers: &[ExceptHandler],
    ) -> Result<Flow, ScriptError> {
        for handler in handlers {
            let matches = match &handler.matcher {
                None => true,
                Some(matcher) => {
                    let matcher = self.eval_expr(matcher).map_err(|e| e.at_line(handler.line))?;
                    exception_matches(&matcher, err.kind).map_err(|e| e.at_line(handler.line))?
                }
            };
            if !matches {
                continue;
            }
            tracing::trace!(kind = %err.kind, line = err.line, "exception handled");
            if let Some(name) = &handler.name {
                self.env.assign(name, Value::Exception(Arc::new(Exception::from(&err))));
            }
            self.handling.push(err);
            let result = self.exec_block(&handler.body);
            self.handling.pop();
            return result;
        }
        Err(err)
    }

    fn raise(
        &mut self,
        expr: Option<&Expr>,
    ) -> Result<ScriptError, ScriptError> {
        let Some(expr) = expr else {
            return Ok(self.handling.last().cloned().unwrap_or_else(|| {
                ScriptError::new(ExceptionKind::RuntimeError, "No active exception to reraise")
            }));
        };
        match self.eval_expr(expr)? {
            Value::ExceptionType(kind) => Ok(ScriptError::new(kind, "")),
            Value::Exception(exc) => Ok(ScriptError::new(exc.kind, exc.message.clone())),
            other => Err(ScriptError::type_error(format!(
                "exceptions must derive from Exception, not '{}'",
                other.type_name()
            ))),
        }
    }

    /// `with capture(name): ...` diverts everything the body appends into `name`
    fn exec_with(
        &mut self,
        context: &Expr,
        alias: Option<&str>,
        body: &[Stmt],
    ) -> Result<Flow, ScriptError> {
        let context = self.eval_expr(context)?;
        let Value::Capture(target) = &context else {
            return Err(ScriptError::type_error(format!(
                "'{}' object does not support the context manager protocol",
                context.type_name()
            )));
        };
        if let Some(alias) = alias {
            self.env.assign(alias, context.clone());
        }

        let mark = self.env.mark();
        let flow = self.exec_block(body)?;
        let captured = self.env.take_since(mark);
        tracing::trace!(name = %target, bytes = captured.len(), "capture closed");
        self.env.assign(target, Value::markup(captured));
        Ok(flow)
    }

    fn assign(
        &mut self,
        target: &Target,
        value: Value,
    ) -> Result<(), ScriptError> {
        match target {
            Target::Name(name) => {
                self.env.assign(name, value);
                Ok(())
            }
            Target::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                ops::set_item(&object, &index, value)
            }
            Target::Unpack(names) => {
                let items = value.iterate()?;
                if items.len() != names.len() {
                    let message = if items.len() > names.len() {
                        format!("too many values to unpack (expected {})", names.len())
                    } else {
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            names.len(),
                            items.len()
                        )
                    };
                    return Err(ScriptError::value_error(message));
                }
                for (name, item) in names.iter().zip(items) {
                    self.env.assign(name, item);
                }
                Ok(())
            }
        }
    }

    fn lookup(
        &self,
        name: &str,
    ) -> Result<Value, ScriptError> {
        self.env
            .lookup(name)
            .or_else(|| builtins::lookup(name))
            .ok_or_else(|| ScriptError::name_error(name))
    }

    fn eval_expr(
        &mut self,
        expr: &Expr,
    ) -> Result<Value, ScriptError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::from(s.as_str()),
            }),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Dict(entries) => {
                let mut map = indexmap::IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval_expr(key)?;
                    let key = ops::dict_key(&key)?.to_string();
                    let value = self.eval_expr(value)?;
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }
            Expr::Attribute { object, name } => {
                let object = self.eval_expr(object)?;
                builtins::get_attribute(&object, name)
            }
            Expr::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                ops::subscript(&object, &index)
            }
            Expr::Slice { object, start, end } => {
                let object = self.eval_expr(object)?;
                let start = start.as_deref().map(|e| self.eval_expr(e)).transpose()?;
                let end = end.as_deref().map(|e| self.eval_expr(e)).transpose()?;
                ops::slice(&object, start.as_ref(), end.as_ref())
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval_expr(func)?;
                let positional = self.eval_all(args)?;
                let mut keywords = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    keywords.push((name.clone(), self.eval_expr(value)?));
                }
                self.call(&callee, Args {
                    positional,
                    keywords,
                })
            }
            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                unary(*op, &value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                ops::binary(*op, &lhs, &rhs)
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                ops::compare(*op, &lhs, &rhs).map(Value::Bool)
            }
            Expr::And(lhs, rhs) => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.is_truthy() {
                    self.eval_expr(rhs)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.eval_expr(lhs)?;
                if lhs.is_truthy() {
                    Ok(lhs)
                } else {
                    self.eval_expr(rhs)
                }
            }
            Expr::Not(operand) => Ok(Value::Bool(!self.eval_expr(operand)?.is_truthy())),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(otherwise)
                }
            }
        }
    }

    fn eval_all(
        &mut self,
        exprs: &[Expr],
    ) -> Result<Vec<Value>, ScriptError> {
        exprs.iter().map(|e| self.eval_expr(e)).collect()
    }

    fn call(
        &mut self,
        callee: &Value,
        args: Args,
    ) -> Result<Value, ScriptError> {
        match callee {
            Value::Function(func) => {
                let mut ctx = CallContext::new(&mut *self.env);
                func.call(&mut ctx, args)
            }
            Value::ExceptionType(kind) => {
                args.check(kind.name(), 0, 1, &[])?;
                let message = args.get(0).map(Value::to_display).unwrap_or_default();
                Ok(Value::Exception(Arc::new(Exception {
                    kind: *kind,
                    message,
                })))
            }
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }
}

fn unary(
    op: UnaryOp,
    value: &Value,
) -> Result<Value, ScriptError> {
    use crate::script::value::Number;
    match (op, value.number()) {
        (UnaryOp::Neg, Some(Number::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(ScriptError::overflow),
        (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Number::Float(f))) => Ok(Value::Float(f)),
        (_, None) => Err(ScriptError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            value.type_name()
        ))),
    }
}

/// Whether `matcher` (a class or tuple of classes) catches `kind`
fn exception_matches(
    matcher: &Value,
    kind: ExceptionKind,
) -> Result<bool, ScriptError> {
    match matcher {
        Value::ExceptionType(class) => Ok(class.catches(kind)),
        Value::Tuple(items) => {
            for item in items.iter() {
                if exception_matches(item, kind)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => Err(ScriptError::type_error(format!(
            "catching '{}' objects is not allowed; expected an exception class",
            other.type_name()
        ))),
    }
}
