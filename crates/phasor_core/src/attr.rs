//! Dynamic-attribute evaluation.
//!
//! Diagram attributes (show-dots, colors, speeds, ...) are either literals
//! or formula strings referencing the scope namespaces. Literals pass
//! through unchanged; quoted strings and raw color syntax bypass the
//! formula path entirely; anything else is parsed and tree-walked against
//! the scope. Evaluation failure returns the original string unchanged and
//! logs a warning, so a bad attribute never takes the diagram down.

use crate::formula::{self, BinOp, Expr, FormulaError, UnOp};
use crate::scope::{Scope, ScopeValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A raw attribute as it appears in a diagram definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for Attr {
    fn default() -> Self {
        Attr::Null
    }
}

impl From<bool> for Attr {
    fn from(value: bool) -> Self {
        Attr::Bool(value)
    }
}

impl From<f64> for Attr {
    fn from(value: f64) -> Self {
        Attr::Number(value)
    }
}

impl From<&str> for Attr {
    fn from(value: &str) -> Self {
        Attr::Text(value.to_string())
    }
}

/// The result of evaluating an attribute against a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view; `default` covers null, text and failed evaluations.
    pub fn as_f64(&self, default: f64) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => default,
        }
    }

    /// Boolean view; numbers count as true when non-zero.
    pub fn as_bool(&self, default: bool) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            _ => default,
        }
    }

    /// Color view; anything non-textual falls back to `default`.
    pub fn as_color(&self, default: &str) -> String {
        match self {
            Value::Text(t) => t.clone(),
            _ => default.to_string(),
        }
    }
}

/// Evaluates a dynamic attribute against the current scope.
///
/// Null, booleans and numbers are returned unchanged. Strings either
/// bypass evaluation (quoted literals, raw color syntax) or are treated as
/// formulas over the scope namespaces. A formula that fails to parse or
/// evaluate comes back as the original text, with a warning surfaced.
pub fn evaluate(attr: &Attr, scope: &Scope) -> Value {
    match attr {
        Attr::Null => Value::Null,
        Attr::Bool(b) => Value::Bool(*b),
        Attr::Number(n) => Value::Number(*n),
        Attr::Text(raw) => evaluate_text(raw, scope),
    }
}

fn evaluate_text(raw: &str, scope: &Scope) -> Value {
    let trimmed = raw.trim();
    if let Some(inner) = strip_quotes(trimmed) {
        return Value::Text(inner.to_string());
    }
    if is_color_literal(trimmed) {
        return Value::Text(trimmed.to_string());
    }
    match formula::parse(trimmed).and_then(|expr| eval_expr(&expr, scope)) {
        Ok(value) => value,
        Err(err) => {
            warn!(expr = raw, error = %err, "attribute expression failed, keeping literal");
            Value::Text(raw.to_string())
        }
    }
}

/// Raw color syntax is never evaluated as a formula.
fn is_color_literal(s: &str) -> bool {
    s.starts_with('#') || s.starts_with("rgb") || s.starts_with("hsl")
}

fn strip_quotes(s: &str) -> Option<&str> {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"'))
            || (s.starts_with('\'') && s.ends_with('\'')))
    {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

fn eval_expr(expr: &Expr, scope: &Scope) -> Result<Value, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Ident(name) => match scope.lookup(name) {
            Some(ScopeValue::Number(n)) => Ok(Value::Number(*n)),
            Some(ScopeValue::Text(t)) => Ok(Value::Text(t.clone())),
            None => Err(FormulaError::UnknownIdentifier(name.clone())),
        },
        Expr::Binary(left, op, right) => match op {
            BinOp::And => Ok(Value::Bool(
                eval_truthy(left, scope)? && eval_truthy(right, scope)?,
            )),
            BinOp::Or => Ok(Value::Bool(
                eval_truthy(left, scope)? || eval_truthy(right, scope)?,
            )),
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
                let a = eval_number(left, scope)?;
                let b = eval_number(right, scope)?;
                Ok(Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Gt => a > b,
                    BinOp::Le => a <= b,
                    BinOp::Ge => a >= b,
                    BinOp::Eq => a == b,
                    _ => a != b,
                }))
            }
            _ => {
                let a = eval_number(left, scope)?;
                let b = eval_number(right, scope)?;
                Ok(Value::Number(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    _ => a.powf(b),
                }))
            }
        },
        Expr::Unary(op, operand) => match op {
            UnOp::Neg => Ok(Value::Number(-eval_number(operand, scope)?)),
            UnOp::Not => Ok(Value::Bool(!eval_truthy(operand, scope)?)),
        },
        Expr::Call(func, arg) => Ok(Value::Number(func.apply(eval_number(arg, scope)?))),
    }
}

fn eval_number(expr: &Expr, scope: &Scope) -> Result<f64, FormulaError> {
    match eval_expr(expr, scope)? {
        Value::Number(n) => Ok(n),
        Value::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
        Value::Text(t) => Err(FormulaError::NotNumeric(t)),
        Value::Null => Err(FormulaError::NotNumeric("null".to_string())),
    }
}

fn eval_truthy(expr: &Expr, scope: &Scope) -> Result<bool, FormulaError> {
    match eval_expr(expr, scope)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n != 0.0),
        Value::Text(t) => Err(FormulaError::NotNumeric(t)),
        Value::Null => Err(FormulaError::NotNumeric("null".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scope() -> Scope {
        Scope::new()
            .with_param("a", 2.0)
            .with_param("b", 3.0)
            .with_calc("half", 0.5)
            .with_color("accent", "#ff8800")
    }

    #[test]
    fn literals_pass_through() {
        let s = scope();
        assert_eq!(evaluate(&Attr::Null, &s), Value::Null);
        assert_eq!(evaluate(&Attr::Bool(true), &s), Value::Bool(true));
        assert_eq!(evaluate(&Attr::Number(4.5), &s), Value::Number(4.5));
    }

    #[test]
    fn color_syntax_bypasses_evaluation() {
        let s = scope();
        assert_eq!(
            evaluate(&Attr::from("#ff0000"), &s),
            Value::Text("#ff0000".to_string())
        );
        assert_eq!(
            evaluate(&Attr::from("rgb(10, 20, 30)"), &s),
            Value::Text("rgb(10, 20, 30)".to_string())
        );
        assert_eq!(
            evaluate(&Attr::from("hsl(120, 50%, 50%)"), &s),
            Value::Text("hsl(120, 50%, 50%)".to_string())
        );
    }

    #[test]
    fn quoted_strings_are_stripped_not_evaluated() {
        let s = scope();
        assert_eq!(
            evaluate(&Attr::from("'a+b'"), &s),
            Value::Text("a+b".to_string())
        );
        assert_eq!(
            evaluate(&Attr::from("\"red\""), &s),
            Value::Text("red".to_string())
        );
    }

    #[test]
    fn formulas_see_all_three_namespaces() {
        let s = scope();
        match evaluate(&Attr::from("a+b"), &s) {
            Value::Number(n) => assert_relative_eq!(n, 5.0),
            other => panic!("expected number, got {other:?}"),
        }
        match evaluate(&Attr::from("a * half"), &s) {
            Value::Number(n) => assert_relative_eq!(n, 1.0),
            other => panic!("expected number, got {other:?}"),
        }
        // A color name used alone resolves to its text value.
        assert_eq!(
            evaluate(&Attr::from("accent"), &s),
            Value::Text("#ff8800".to_string())
        );
    }

    #[test]
    fn comparison_formulas_yield_bools() {
        let s = scope();
        assert_eq!(evaluate(&Attr::from("a < b"), &s), Value::Bool(true));
        assert_eq!(evaluate(&Attr::from("a >= b"), &s), Value::Bool(false));
        assert_eq!(
            evaluate(&Attr::from("a > 0 && b > 0"), &s),
            Value::Bool(true)
        );
    }

    #[test]
    fn failed_evaluation_returns_original_text() {
        let s = scope();
        assert_eq!(
            evaluate(&Attr::from("nope + 1"), &s),
            Value::Text("nope + 1".to_string())
        );
        // Arithmetic on a text value fails, falling back to the literal.
        assert_eq!(
            evaluate(&Attr::from("accent + 1"), &s),
            Value::Text("accent + 1".to_string())
        );
        assert_eq!(
            evaluate(&Attr::from("1 +"), &s),
            Value::Text("1 +".to_string())
        );
    }

    #[test]
    fn value_views_apply_defaults() {
        assert_relative_eq!(Value::Number(2.0).as_f64(9.0), 2.0);
        assert_relative_eq!(Value::Null.as_f64(9.0), 9.0);
        assert_relative_eq!(Value::Text("x".to_string()).as_f64(9.0), 9.0);
        assert!(Value::Number(1.0).as_bool(false));
        assert!(!Value::Number(0.0).as_bool(true));
        assert!(Value::Null.as_bool(true));
        assert_eq!(Value::Text("#123456".to_string()).as_color("#000"), "#123456");
        assert_eq!(Value::Number(1.0).as_color("#000"), "#000");
    }
}
