//! Property storage with macro-parameter scoping, plus `${...}` and `$(...)`
//! substitution on top of it.
//!
//! Global properties are stored raw and evaluated lazily on first use, so a
//! property may reference one defined later in the document as long as it is
//! defined before being used. Macro parameters live in a stack of scopes that
//! shadow the globals.

use super::eval::{self, Evaluator};
use super::lexer::{Lexer, TokenType};
use crate::error::XacroError;
use core::cell::RefCell;
use pyisheval::Value;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Properties {
    global: RefCell<HashMap<String, String>>,
    scopes: RefCell<Vec<HashMap<String, String>>>,
    /// Values of `xacro:arg` (command line overrides win over defaults)
    args: RefCell<HashMap<String, String>>,
    overrides: HashMap<String, String>,
    /// Names currently being resolved, for cycle detection
    resolving: RefCell<Vec<String>>,
    evaluator: Evaluator,
}

impl Properties {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// Define a property in the innermost scope (or globally outside macros).
    pub fn add_raw_property(
        &self,
        name: String,
        value: String,
    ) {
        let mut scopes = self.scopes.borrow_mut();
        match scopes.last_mut() {
            Some(scope) => {
                scope.insert(name, value);
            }
            None => {
                self.global.borrow_mut().insert(name, value);
            }
        }
    }

    pub fn has_property(
        &self,
        name: &str,
    ) -> bool {
        self.scopes
            .borrow()
            .iter()
            .any(|scope| scope.contains_key(name))
            || self.global.borrow().contains_key(name)
    }

    pub fn push_scope(
        &self,
        scope: HashMap<String, String>,
    ) {
        self.scopes.borrow_mut().push(scope);
    }

    pub fn pop_scope(&self) {
        self.scopes.borrow_mut().pop();
    }

    pub fn add_to_current_scope(
        &self,
        name: String,
        value: String,
    ) {
        if let Some(scope) = self.scopes.borrow_mut().last_mut() {
            scope.insert(name, value);
        }
    }

    /// Raw value of `name` as seen from the current scope.
    pub fn lookup_raw(
        &self,
        name: &str,
    ) -> Option<String> {
        self.scopes
            .borrow()
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
            .or_else(|| self.global.borrow().get(name).cloned())
    }

    /// Declare an argument; an override from the caller takes precedence
    /// over the declared default.
    pub fn declare_arg(
        &self,
        name: &str,
        default: Option<String>,
    ) {
        let value = self.overrides.get(name).cloned().or(default);
        let mut args = self.args.borrow_mut();
        match value {
            Some(value) => {
                args.insert(name.to_string(), value);
            }
            None => {
                args.remove(name);
            }
        }
    }

    fn resolve_arg(
        &self,
        name: &str,
    ) -> Result<String, XacroError> {
        self.args
            .borrow()
            .get(name)
            .cloned()
            .or_else(|| self.overrides.get(name).cloned())
            .ok_or_else(|| XacroError::UndefinedArgument(name.to_string()))
    }

    /// Evaluate a property to a value, substituting nested expressions.
    fn resolve_value(
        &self,
        name: &str,
    ) -> Result<Option<Value>, XacroError> {
        let Some(raw) = self.lookup_raw(name) else {
            return Ok(None);
        };
        if !raw.contains('$') {
            return Ok(Some(eval::literal_value(&raw)));
        }

        if self.resolving.borrow().iter().any(|n| n == name) {
            return Err(XacroError::PropertyNotFound(format!(
                "circular definition of property '{}'",
                name
            )));
        }
        self.resolving.borrow_mut().push(name.to_string());
        let resolved = self.eval_single_or_text(&raw);
        self.resolving.borrow_mut().pop();
        resolved.map(Some)
    }

    /// A value consisting of exactly one `${expr}` keeps its type; anything
    /// else is substituted as text.
    fn eval_single_or_text(
        &self,
        raw: &str,
    ) -> Result<Value, XacroError> {
        let tokens: Vec<_> = Lexer::new(raw).collect();
        if let [(TokenType::Expr, expr)] = tokens.as_slice() {
            return self.eval_expr(expr);
        }
        Ok(eval::literal_value(&self.substitute_all(raw)?))
    }

    fn eval_expr(
        &self,
        expr: &str,
    ) -> Result<Value, XacroError> {
        // $(arg ...) may appear inside an expression
        let expr = if expr.contains("$(") {
            self.substitute_all(expr)?
        } else {
            expr.to_string()
        };

        // Only the properties the expression names are resolved
        let mut context = HashMap::new();
        for name in eval::referenced_names(&expr) {
            if context.contains_key(name) {
                continue;
            }
            if let Some(value) = self.resolve_value(name)? {
                context.insert(name.to_string(), value);
            }
        }

        self.evaluator
            .evaluate(&expr, context)
            .map_err(|source| XacroError::EvalError {
                expr: expr.clone(),
                source,
            })
    }

    fn resolve_extension(
        &self,
        command: &str,
    ) -> Result<String, XacroError> {
        let mut parts = command.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match (verb, rest.as_slice()) {
            ("arg", [name]) => self.resolve_arg(name),
            ("env", [name]) => std::env::var(name)
                .map_err(|_| XacroError::UndefinedArgument(format!("environment variable {}", name))),
            ("optenv", [name, default @ ..]) => {
                Ok(std::env::var(name).unwrap_or_else(|_| default.join(" ")))
            }
            _ => Err(XacroError::UnknownExtension(command.to_string())),
        }
    }

    /// Resolve every `${...}` and `$(...)` in `text`.
    pub fn substitute_all(
        &self,
        text: &str,
    ) -> Result<String, XacroError> {
        if !text.contains('$') {
            return Ok(text.to_string());
        }

        let mut out = String::with_capacity(text.len());
        for (token_type, value) in Lexer::new(text) {
            match token_type {
                TokenType::Text | TokenType::Escaped => out.push_str(&value),
                TokenType::Expr => out.push_str(&eval::format_value(&self.eval_expr(&value)?)),
                TokenType::Extension => out.push_str(&self.resolve_extension(&value)?),
            }
        }
        Ok(out)
    }

    /// Evaluate the condition of `xacro:if` / `xacro:unless`.
    pub fn eval_boolean(
        &self,
        text: &str,
    ) -> Result<bool, XacroError> {
        let tokens: Vec<_> = Lexer::new(text).collect();
        let to_xacro = |source| XacroError::EvalError {
            expr: text.to_string(),
            source,
        };

        if let [(TokenType::Expr, expr)] = tokens.as_slice() {
            let value = self.eval_expr(expr)?;
            return eval::value_truthiness(&value, text).map_err(to_xacro);
        }
        let evaluated = self.substitute_all(text)?;
        eval::string_truthiness(&evaluated, text).map_err(to_xacro)
    }
}
