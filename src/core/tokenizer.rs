//! Argument tokenizer.
//!
//! Splits the text after a command name into [`Arg`]s. Spaces separate
//! tokens, `"`-delimited spans form a single token, and each token remembers
//! how many spaces preceded it so the original text can be rebuilt for
//! join-remaining parameters.

use crate::core::value::Value;
use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::trace;

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Literal pattern
    Regex::new(r"^[+-]?[0-9]+$").unwrap()
});

static DECIMAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // Literal pattern
    Regex::new(r"^[+-]?(([0-9]+(\.[0-9]*)?)|(\.[0-9]+))$").unwrap()
});

/// One parsed argument token.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// Token text without surrounding quotes
    pub text: String,
    /// Token text as written, quotes included
    pub raw: String,
    /// Number of spaces that preceded the token
    pub leading_spaces: usize,
    /// Whether the token was a `"`-delimited span
    pub quoted: bool,
    /// Best-effort typed value; starts out as the text itself
    pub value: Value,
}

impl Arg {
    fn new(text: String, leading_spaces: usize, quoted: bool) -> Self {
        let raw = if quoted {
            format!("\"{text}\"")
        } else {
            text.clone()
        };

        Self {
            value: Value::Text(text.clone()),
            text,
            raw,
            leading_spaces,
            quoted,
        }
    }
}

/// Tokens of one argument string plus the spaces after the last token.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tokens {
    /// Tokens in input order
    pub args: Vec<Arg>,
    /// Spaces after the last token, or the whole input when it is blank
    pub trailing_spaces: usize,
}

impl Tokens {
    /// Rebuilds the text the tokens came from, spacing and quotes included.
    #[must_use]
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();
        for arg in &self.args {
            out.push_str(&" ".repeat(arg.leading_spaces));
            out.push_str(&arg.raw);
        }
        out.push_str(&" ".repeat(self.trailing_spaces));
        out
    }
}

/// Splits `input` into tokens.
///
/// `""` is an empty quoted token. An unterminated trailing quote is not an
/// error: the quote and everything after it are glued onto the previous
/// unquoted token (dropping the spaces in between), or become their own
/// unquoted token when there is no such token.
#[must_use]
pub fn tokenize(input: &str) -> Tokens {
    let mut results: Vec<Arg> = Vec::new();
    let mut current = String::new();
    let mut leading_spaces = 0;
    let mut quoted = false;

    for c in input.chars() {
        match c {
            ' ' if !quoted => {
                push_current(&mut results, &mut current, &mut leading_spaces);
                leading_spaces += 1;
            }
            '"' if quoted => {
                results.push(Arg::new(std::mem::take(&mut current), leading_spaces, true));
                leading_spaces = 0;
                quoted = false;
            }
            '"' => {
                push_current(&mut results, &mut current, &mut leading_spaces);
                quoted = true;
            }
            _ => current.push(c),
        }
    }

    if quoted {
        let dangling = format!("\"{current}");
        match results.last_mut() {
            Some(last) if !last.quoted => {
                last.text.push_str(&dangling);
                last.raw = last.text.clone();
                last.value = Value::Text(last.text.clone());
            }
            _ => results.push(Arg::new(dangling, leading_spaces, false)),
        }
        leading_spaces = 0;
    } else {
        push_current(&mut results, &mut current, &mut leading_spaces);
    }

    Tokens {
        args: results,
        trailing_spaces: leading_spaces,
    }
}

fn push_current(results: &mut Vec<Arg>, current: &mut String, leading_spaces: &mut usize) {
    if current.is_empty() {
        return;
    }
    results.push(Arg::new(std::mem::take(current), *leading_spaces, false));
    *leading_spaces = 0;
}

/// Promotes tokens that look numeric.
///
/// Integers become [`Value::BigInt`], decimals become [`Value::BigDecimal`];
/// everything else keeps its text. Matching is done on the raw text, so a
/// quoted `"5"` stays text and re-running this pass changes nothing.
#[must_use]
pub fn convert_initial(args: Vec<Arg>) -> Vec<Arg> {
    args.into_iter()
        .map(|mut arg| {
            arg.value = infer_value(&arg.raw).unwrap_or_else(|| Value::Text(arg.text.clone()));
            arg
        })
        .collect()
}

/// Tokenizes and applies [`convert_initial`] in one go.
#[must_use]
pub fn parse_arguments(input: &str) -> Vec<Arg> {
    convert_initial(tokenize(input).args)
}

fn infer_value(raw: &str) -> Option<Value> {
    if INTEGER_PATTERN.is_match(raw) {
        match BigInt::from_str(raw) {
            Ok(n) => return Some(Value::BigInt(n)),
            Err(e) => trace!("`{}` matched the integer grammar but did not parse: {}", raw, e),
        }
    } else if DECIMAL_PATTERN.is_match(raw) {
        match BigDecimal::from_str(raw) {
            Ok(n) => return Some(Value::BigDecimal(n)),
            Err(e) => trace!("`{}` matched the decimal grammar but did not parse: {}", raw, e),
        }
    }

    None
}

/// Joins tokens into one string for a join-remaining parameter. The first
/// token's leading spaces and any trailing spaces are not part of the result.
#[must_use]
pub fn join_remaining(args: &[Arg]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(&" ".repeat(arg.leading_spaces));
        }
        out.push_str(&arg.raw);
    }
    out
}
