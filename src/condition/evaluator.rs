//! Condition evaluator
//!
//! Every node answers two questions about a state: whether it can be reduced
//! to a boolean at all (`can_bool_evaluate`), and what that boolean is
//! (`bool_evaluate`). Callers probe the first before asking the second. When
//! `can_bool_evaluate` holds, `bool_evaluate` always returns `Ok`.

use crate::condition::ast::{ExpressionNode, Function, Literal, Precedence};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use thiserror::Error;

/// Simple `$(Name)` / `@(Name)` references inside quoted strings
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<kind>[$@])\(\s*(?P<name>[A-Za-z_][A-Za-z0-9_\-]*)\s*\)")
        .expect("reference pattern is valid")
});

/// Named-property lookup used during evaluation
///
/// `None` means the name is not known to the state, which makes every node
/// referencing it unevaluable.
pub trait ConditionEvaluationState {
    fn property(&self, name: &str) -> Option<String>;

    fn item(&self, _name: &str) -> Option<Vec<String>> {
        None
    }

    /// Whether a path exists, if the state can tell
    fn path_exists(&self, _path: &str) -> Option<bool> {
        None
    }
}

impl ConditionEvaluationState for HashMap<String, String> {
    fn property(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A state that knows nothing; every reference is unevaluable
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyState;

impl ConditionEvaluationState for EmptyState {
    fn property(&self, _name: &str) -> Option<String> {
        None
    }
}

/// `bool_evaluate` called on a node that cannot be evaluated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Condition \"{0}\" cannot be evaluated with the available state")]
    NotEvaluable(String),

    #[error("\"{0}\" is not a boolean value")]
    NotBoolean(String),

    #[error("Relational comparison needs numbers: \"{0}\"")]
    NotNumeric(String),
}

/// A parsed condition together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionExpression {
    text: String,
    root: ExpressionNode,
}

impl ConditionExpression {
    pub(crate) fn new(text: &str, root: ExpressionNode) -> Self {
        Self {
            text: text.to_string(),
            root,
        }
    }

    /// The condition string as written
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &ExpressionNode {
        &self.root
    }

    pub fn can_bool_evaluate(&self, state: &dyn ConditionEvaluationState) -> bool {
        self.root.can_bool_evaluate(state)
    }

    pub fn bool_evaluate(&self, state: &dyn ConditionEvaluationState) -> Result<bool, EvaluationError> {
        self.root.bool_evaluate(state)
    }

    /// `Some(result)` when the condition is evaluable, `None` otherwise
    pub fn evaluate(&self, state: &dyn ConditionEvaluationState) -> Option<bool> {
        self.root.try_bool_evaluate(state)
    }

    pub fn unexpanded_value(&self) -> String {
        self.root.unexpanded_value()
    }

    pub fn expanded_value(&self, state: &dyn ConditionEvaluationState) -> String {
        self.root.expanded_value(state)
    }
}

impl ExpressionNode {
    /// Whether `bool_evaluate` can produce a value for `state`
    pub fn can_bool_evaluate(&self, state: &dyn ConditionEvaluationState) -> bool {
        self.eval(state).is_some()
    }

    /// Reduce the node to a boolean
    pub fn bool_evaluate(&self, state: &dyn ConditionEvaluationState) -> Result<bool, EvaluationError> {
        match self {
            ExpressionNode::Not(child) => Ok(!child.bool_evaluate(state)?),
            ExpressionNode::Equal(left, right) => {
                let (l, r) = self.operands(left, right, state)?;
                Ok(values_equal(&l, &r))
            }
            ExpressionNode::NotEqual(left, right) => {
                let (l, r) = self.operands(left, right, state)?;
                Ok(!values_equal(&l, &r))
            }
            ExpressionNode::Compare(op, left, right) => {
                let (l, r) = self.operands(left, right, state)?;
                match (parse_number(&l), parse_number(&r)) {
                    (Some(l), Some(r)) => Ok(op.apply(l, r)),
                    _ => Err(EvaluationError::NotNumeric(self.expanded_value(state))),
                }
            }
            ExpressionNode::Literal(_)
            | ExpressionNode::PropertyReference(_)
            | ExpressionNode::ItemReference(_) => {
                let value = self.value(state).ok_or_else(|| self.not_evaluable())?;
                parse_bool(&value).ok_or(EvaluationError::NotBoolean(value))
            }
            ExpressionNode::And(..) | ExpressionNode::Or(..) | ExpressionNode::FunctionCall(..) => {
                self.eval(state).ok_or_else(|| self.not_evaluable())
            }
        }
    }

    /// Three-valued evaluation: `None` when the node is not evaluable
    pub fn try_bool_evaluate(&self, state: &dyn ConditionEvaluationState) -> Option<bool> {
        self.eval(state)
    }

    /// Single pass over the tree; each child is evaluated once
    fn eval(&self, state: &dyn ConditionEvaluationState) -> Option<bool> {
        match self {
            ExpressionNode::Not(child) => child.eval(state).map(|b| !b),
            ExpressionNode::And(left, right) => match (left.eval(state), right.eval(state)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            ExpressionNode::Or(left, right) => match (left.eval(state), right.eval(state)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            ExpressionNode::Equal(left, right) => {
                Some(values_equal(&left.value(state)?, &right.value(state)?))
            }
            ExpressionNode::NotEqual(left, right) => {
                Some(!values_equal(&left.value(state)?, &right.value(state)?))
            }
            ExpressionNode::Compare(op, left, right) => {
                let l = parse_number(&left.value(state)?)?;
                let r = parse_number(&right.value(state)?)?;
                Some(op.apply(l, r))
            }
            ExpressionNode::FunctionCall(Function::Exists, args) => {
                let path = argument(args, state)?;
                let path = path.trim();
                if path.is_empty() {
                    Some(false)
                } else {
                    state.path_exists(path)
                }
            }
            ExpressionNode::FunctionCall(Function::HasTrailingSlash, args) => {
                let path = argument(args, state)?;
                Some(path.ends_with('/') || path.ends_with('\\'))
            }
            ExpressionNode::Literal(_)
            | ExpressionNode::PropertyReference(_)
            | ExpressionNode::ItemReference(_) => parse_bool(&self.value(state)?),
        }
    }

    /// Source form of the node, reproducible without a state
    pub fn unexpanded_value(&self) -> String {
        self.render(None)
    }

    /// The node with every resolvable reference replaced by its value
    pub fn expanded_value(&self, state: &dyn ConditionEvaluationState) -> String {
        self.render(Some(state))
    }

    fn not_evaluable(&self) -> EvaluationError {
        EvaluationError::NotEvaluable(self.unexpanded_value())
    }

    fn operands(
        &self,
        left: &ExpressionNode,
        right: &ExpressionNode,
        state: &dyn ConditionEvaluationState,
    ) -> Result<(String, String), EvaluationError> {
        match (left.value(state), right.value(state)) {
            (Some(l), Some(r)) => Ok((l, r)),
            _ => Err(self.not_evaluable()),
        }
    }

    /// Scalar value of an operand
    fn value(&self, state: &dyn ConditionEvaluationState) -> Option<String> {
        match self {
            ExpressionNode::Literal(Literal { text, quoted: true }) => expand_text(text, state),
            ExpressionNode::Literal(Literal { text, quoted: false }) => Some(text.clone()),
            ExpressionNode::PropertyReference(name) => state.property(name),
            ExpressionNode::ItemReference(name) => state.item(name).map(|items| items.join(";")),
            _ => self
                .eval(state)
                .map(|b| if b { "true" } else { "false" }.to_string()),
        }
    }

    fn render(&self, state: Option<&dyn ConditionEvaluationState>) -> String {
        match self {
            ExpressionNode::Or(l, r) => format!(
                "{} or {}",
                l.render_child(Precedence::Or, state),
                r.render_child(Precedence::And, state)
            ),
            ExpressionNode::And(l, r) => format!(
                "{} and {}",
                l.render_child(Precedence::And, state),
                r.render_child(Precedence::Relational, state)
            ),
            ExpressionNode::Not(child) => {
                format!("!{}", child.render_child(Precedence::Factor, state))
            }
            ExpressionNode::Equal(l, r) => self.render_relation("==", l, r, state),
            ExpressionNode::NotEqual(l, r) => self.render_relation("!=", l, r, state),
            ExpressionNode::Compare(op, l, r) => self.render_relation(op.symbol(), l, r, state),
            ExpressionNode::FunctionCall(function, args) => {
                let args: Vec<String> = args
                    .iter()
                    .map(|arg| arg.render_child(Precedence::Factor, state))
                    .collect();
                format!("{}({})", function.name(), args.join(", "))
            }
            ExpressionNode::Literal(Literal { text, quoted: true }) => {
                let text = state
                    .and_then(|s| expand_text(text, s))
                    .unwrap_or_else(|| text.clone());
                format!("'{}'", text)
            }
            ExpressionNode::Literal(Literal { text, .. }) => text.clone(),
            ExpressionNode::PropertyReference(name) => state
                .and_then(|s| s.property(name))
                .unwrap_or_else(|| format!("$({})", name)),
            ExpressionNode::ItemReference(name) => state
                .and_then(|s| s.item(name))
                .map(|items| items.join(";"))
                .unwrap_or_else(|| format!("@({})", name)),
        }
    }

    fn render_relation(
        &self,
        symbol: &str,
        left: &ExpressionNode,
        right: &ExpressionNode,
        state: Option<&dyn ConditionEvaluationState>,
    ) -> String {
        format!(
            "{} {} {}",
            left.render_child(Precedence::Factor, state),
            symbol,
            right.render_child(Precedence::Factor, state)
        )
    }

    fn render_child(&self, min: Precedence, state: Option<&dyn ConditionEvaluationState>) -> String {
        let text = self.render(state);
        if self.precedence() < min {
            format!("({})", text)
        } else {
            text
        }
    }
}

fn argument(args: &[ExpressionNode], state: &dyn ConditionEvaluationState) -> Option<String> {
    args.first().and_then(|arg| arg.value(state))
}

/// Substitute references inside a quoted string
///
/// Returns `None` if any reference is unknown to the state or is not a
/// simple name.
pub(crate) fn expand_text(text: &str, state: &dyn ConditionEvaluationState) -> Option<String> {
    let remainder = REFERENCE.replace_all(text, "");
    if remainder.contains("$(") || remainder.contains("@(") {
        return None;
    }

    let mut missing = false;
    let expanded = REFERENCE.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps["name"];
        let value = if &caps["kind"] == "$" {
            state.property(name)
        } else {
            state.item(name).map(|items| items.join(";"))
        };
        value.unwrap_or_else(|| {
            missing = true;
            String::new()
        })
    });

    if missing {
        None
    } else {
        Some(expanded.into_owned())
    }
}

/// Boolean spelling accepted in conditions
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    let (negated, word) = match value.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, value),
    };

    let result = if ["true", "on", "yes"].iter().any(|w| word.eq_ignore_ascii_case(w)) {
        true
    } else if ["false", "off", "no"].iter().any(|w| word.eq_ignore_ascii_case(w)) {
        false
    } else {
        return None;
    };

    Some(result != negated)
}

/// Decimal or `0x` hexadecimal number
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let number = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()? as f64
    } else {
        if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        digits.parse::<f64>().ok()?
    };

    Some(if negative { -number } else { number })
}

fn values_equal(left: &str, right: &str) -> bool {
    if let (Some(l), Some(r)) = (parse_number(left), parse_number(right)) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (parse_bool(left), parse_bool(right)) {
        return l == r;
    }
    left.eq_ignore_ascii_case(right)
}
