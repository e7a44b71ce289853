//! `${...}` evaluation on top of `pyisheval`.
//!
//! The interpreter carries the math constants and helper functions. Property
//! values are handed in per call as a context map, so scoping and lazy
//! resolution stay in [`super::scope`].

use core::fmt;
use pyisheval::{Interpreter, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Constants loaded into every interpreter.
pub const BUILTIN_CONSTANTS: &[(&str, f64)] = &[
    ("pi", core::f64::consts::PI),
    ("e", core::f64::consts::E),
    ("tau", core::f64::consts::TAU),
    ("M_PI", core::f64::consts::PI),
];

type NativeFn = fn(&[f64]) -> Result<f64, pyisheval::EvalError>;

/// Math functions `pyisheval` does not ship with.
const NATIVE_FUNCTIONS: &[(&str, NativeFn)] = &[
    ("tan", builtin_tan),
    ("asin", builtin_asin),
    ("acos", builtin_acos),
    ("exp", builtin_exp),
    ("log", builtin_log),
];

fn unary(
    name: &str,
    args: &[f64],
    f: fn(f64) -> f64,
) -> Result<f64, pyisheval::EvalError> {
    match args {
        [x] => Ok(f(*x)),
        _ => Err(pyisheval::EvalError::ArgError(name.to_string())),
    }
}

fn builtin_tan(args: &[f64]) -> Result<f64, pyisheval::EvalError> {
    unary("tan", args, f64::tan)
}

fn builtin_asin(args: &[f64]) -> Result<f64, pyisheval::EvalError> {
    unary("asin", args, f64::asin)
}

fn builtin_acos(args: &[f64]) -> Result<f64, pyisheval::EvalError> {
    unary("acos", args, f64::acos)
}

fn builtin_exp(args: &[f64]) -> Result<f64, pyisheval::EvalError> {
    unary("exp", args, f64::exp)
}

fn builtin_log(args: &[f64]) -> Result<f64, pyisheval::EvalError> {
    unary("log", args, f64::ln)
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    PyishEval(#[from] pyisheval::EvalError),

    #[error("condition '{condition}' evaluated to '{evaluated}', which is not a boolean")]
    InvalidBoolean { condition: String, evaluated: String },
}

/// A `pyisheval` interpreter preloaded with the xacro math environment.
pub struct Evaluator {
    interp: Interpreter,
}

impl Evaluator {
    pub fn new() -> Self {
        let mut interp = Interpreter::new();

        for (name, value) in BUILTIN_CONSTANTS {
            if let Err(e) = interp.eval(&format!("{} = {}", name, value)) {
                log::warn!("Could not initialize built-in constant '{}': {}", name, e);
            }
        }
        for definition in [
            "radians = lambda x: x * pi / 180",
            "degrees = lambda x: x * 180 / pi",
        ] {
            if let Err(e) = interp.eval(definition) {
                log::warn!("Could not define built-in function '{}': {}", definition, e);
            }
        }

        Self { interp }
    }

    /// Evaluate one expression with `properties` in scope.
    ///
    /// Properties shadow the built-in names.
    pub fn evaluate(
        &self,
        expr: &str,
        properties: HashMap<String, Value>,
    ) -> Result<Value, EvalError> {
        let mut context: HashMap<String, Value> = NATIVE_FUNCTIONS
            .iter()
            .map(|&(name, func)| {
                (
                    name.to_string(),
                    Value::Builtin {
                        name: name.to_string(),
                        func,
                    },
                )
            })
            .collect();
        // pyisheval cannot parse these as literals
        context.insert("inf".to_string(), Value::Number(f64::INFINITY));
        context.insert("nan".to_string(), Value::Number(f64::NAN));
        context.extend(properties);

        Ok(self.interp.eval_with_context(expr.trim(), &context)?)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}

/// Identifiers referenced by `expr`. String literals and number literals
/// (including exponents such as `1e3`) are skipped.
pub fn referenced_names(expr: &str) -> impl Iterator<Item = &str> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| {
        Regex::new(r#"'[^']*'|"[^"]*"|[0-9][0-9.]*(?:[eE][+-]?[0-9]+)?|[A-Za-z_][A-Za-z0-9_]*"#)
            .expect("valid token regex")
    });
    token
        .find_iter(expr)
        .map(|m| m.as_str())
        .filter(|t| t.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
}

/// Type a raw property string: quoted text is a string, finite numeric
/// literals are numbers, `true`/`false` in any case are `1`/`0`.
pub fn literal_value(raw: &str) -> Value {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("valid number regex")
    });

    let value = raw.trim();
    if let Some(unquoted) = value.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Value::StringLit(unquoted.to_string());
    }
    if number.is_match(value) {
        if let Ok(n) = value.parse::<f64>() {
            if n.is_finite() {
                return Value::Number(n);
            }
        }
    }
    if value.eq_ignore_ascii_case("true") {
        Value::Number(1.0)
    } else if value.eq_ignore_ascii_case("false") {
        Value::Number(0.0)
    } else {
        Value::StringLit(raw.to_string())
    }
}

/// Text form of a value as substituted into the document.
///
/// Whole numbers print without a fractional part. Python's `str()` switches
/// to scientific notation at 1e16, which `to_string` approximates.
pub fn format_value(value: &Value) -> String {
    const PYTHON_SCIENTIFIC_THRESHOLD: f64 = 1e16;

    match value {
        Value::Number(n) if n.is_nan() => "nan".to_string(),
        Value::Number(n) if n.is_infinite() => {
            (if *n > 0.0 { "inf" } else { "-inf" }).to_string()
        }
        Value::Number(n) if n.fract() == 0.0 && n.abs() < PYTHON_SCIENTIFIC_THRESHOLD => {
            format!("{:.0}", n)
        }
        Value::Number(n) => n.to_string(),
        Value::StringLit(s) | Value::Var(s) => s.clone(),
        other => other.to_string(),
    }
}

/// String truthiness used by `xacro:if` / `xacro:unless`.
///
/// Accepts `true`/`True`/`false`/`False` and numbers; anything else is an
/// error.
pub fn string_truthiness(
    s: &str,
    condition: &str,
) -> Result<bool, EvalError> {
    let trimmed = s.trim();
    match trimmed {
        "true" | "True" => return Ok(true),
        "false" | "False" => return Ok(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(i != 0);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Ok(f != 0.0);
    }
    Err(EvalError::InvalidBoolean {
        condition: condition.to_string(),
        evaluated: s.to_string(),
    })
}

/// Truthiness of a typed `${...}` result.
pub fn value_truthiness(
    value: &Value,
    condition: &str,
) -> Result<bool, EvalError> {
    match value {
        Value::Number(n) => Ok(*n != 0.0),
        Value::None => Ok(false),
        Value::StringLit(s) => string_truthiness(s, condition),
        other => Err(EvalError::InvalidBoolean {
            condition: condition.to_string(),
            evaluated: other.to_string(),
        }),
    }
}
