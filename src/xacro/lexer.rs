//! Splits attribute values and text into literal text, `${...}` expressions
//! and `$(...)` substitution commands.

use regex::Regex;
use std::sync::OnceLock;

static DOLLAR_DOLLAR_REGEX: OnceLock<Regex> = OnceLock::new();
static EXPR_REGEX: OnceLock<Regex> = OnceLock::new();
static EXTENSION_REGEX: OnceLock<Regex> = OnceLock::new();
static TEXT_REGEX: OnceLock<Regex> = OnceLock::new();

fn dollar_dollar_regex() -> &'static Regex {
    DOLLAR_DOLLAR_REGEX.get_or_init(|| Regex::new(r"^\$\$+(\{|\()").expect("valid regex"))
}

fn expr_regex() -> &'static Regex {
    EXPR_REGEX.get_or_init(|| Regex::new(r"^\$\{[^\}]*\}").expect("valid regex"))
}

fn extension_regex() -> &'static Regex {
    EXTENSION_REGEX.get_or_init(|| Regex::new(r"^\$\([^\)]*\)").expect("valid regex"))
}

fn text_regex() -> &'static Regex {
    TEXT_REGEX.get_or_init(|| Regex::new(r"^([^$]+|\$[^{($]+|\$$)").expect("valid regex"))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenType {
    /// `$${` or `$$(`: an escaped delimiter, emitted literally without one `$`
    Escaped,
    /// `${expr}`
    Expr,
    /// `$(command args)`
    Extension,
    Text,
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn rules() -> [(TokenType, &'static Regex); 4] {
        [
            (TokenType::Escaped, dollar_dollar_regex()),
            (TokenType::Expr, expr_regex()),
            (TokenType::Extension, extension_regex()),
            (TokenType::Text, text_regex()),
        ]
    }
}

impl Iterator for Lexer<'_> {
    type Item = (TokenType, String);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.input[self.position..];
        if rest.is_empty() {
            return None;
        }

        for (token_type, regex) in Self::rules() {
            if let Some(m) = regex.find(rest) {
                self.position += m.end();
                let m = m.as_str();
                let value = match token_type {
                    TokenType::Escaped => &m[1..],
                    TokenType::Expr | TokenType::Extension => &m[2..m.len() - 1],
                    TokenType::Text => m,
                };
                return Some((token_type, value.to_string()));
            }
        }

        // Unterminated `${` or `$(`: pass the remainder through untouched
        self.position = self.input.len();
        Some((TokenType::Text, rest.to_string()))
    }
}
