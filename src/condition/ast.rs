//! Abstract Syntax Tree for condition expressions

use std::fmt;

/// AST node for condition expressions
///
/// The variant set is fixed by the condition grammar; every consumer matches
/// on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// `left and right`
    And(Box<ExpressionNode>, Box<ExpressionNode>),
    /// `left or right`
    Or(Box<ExpressionNode>, Box<ExpressionNode>),
    /// `!child`
    Not(Box<ExpressionNode>),
    /// `left == right`
    Equal(Box<ExpressionNode>, Box<ExpressionNode>),
    /// `left != right`
    NotEqual(Box<ExpressionNode>, Box<ExpressionNode>),
    /// Relational comparison over numbers
    Compare(CompareOp, Box<ExpressionNode>, Box<ExpressionNode>),
    /// `Exists('path')`, `HasTrailingSlash('path')`
    FunctionCall(Function, Vec<ExpressionNode>),
    /// Quoted string, number or bare word
    Literal(Literal),
    /// `$(Name)`
    PropertyReference(String),
    /// `@(Name)`
    ItemReference(String),
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Less than (<)
    Less,
    /// Less than or equal (<=)
    LessEqual,
    /// Greater than (>)
    Greater,
    /// Greater than or equal (>=)
    GreaterEqual,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        }
    }

    pub(crate) fn apply(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Less => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterEqual => left >= right,
        }
    }
}

/// Built-in condition functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Exists,
    HasTrailingSlash,
}

impl Function {
    /// Resolve a function name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("Exists") {
            Some(Function::Exists)
        } else if name.eq_ignore_ascii_case("HasTrailingSlash") {
            Some(Function::HasTrailingSlash)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Exists => "Exists",
            Function::HasTrailingSlash => "HasTrailingSlash",
        }
    }

    pub fn arity(self) -> usize {
        1
    }
}

/// Literal operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// Text between the quotes, or the bare token
    pub text: String,
    /// Quoted literals may embed `$(..)` and `@(..)` references
    pub quoted: bool,
}

impl Literal {
    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }
}

/// Binding strength used when rendering children
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Or = 1,
    And = 2,
    Relational = 3,
    Factor = 4,
}

impl ExpressionNode {
    pub(crate) fn precedence(&self) -> Precedence {
        match self {
            ExpressionNode::Or(..) => Precedence::Or,
            ExpressionNode::And(..) => Precedence::And,
            ExpressionNode::Equal(..) | ExpressionNode::NotEqual(..) | ExpressionNode::Compare(..) => {
                Precedence::Relational
            }
            ExpressionNode::Not(_)
            | ExpressionNode::FunctionCall(..)
            | ExpressionNode::Literal(_)
            | ExpressionNode::PropertyReference(_)
            | ExpressionNode::ItemReference(_) => Precedence::Factor,
        }
    }
}

/// Debug form: `(not $(A))`, `(and x y)`
impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::And(l, r) => write!(f, "(and {} {})", l, r),
            ExpressionNode::Or(l, r) => write!(f, "(or {} {})", l, r),
            ExpressionNode::Not(child) => write!(f, "(not {})", child),
            ExpressionNode::Equal(l, r) => write!(f, "(== {} {})", l, r),
            ExpressionNode::NotEqual(l, r) => write!(f, "(!= {} {})", l, r),
            ExpressionNode::Compare(op, l, r) => write!(f, "({} {} {})", op.symbol(), l, r),
            ExpressionNode::FunctionCall(func, args) => {
                write!(f, "({}", func.name())?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            ExpressionNode::Literal(lit) if lit.quoted => write!(f, "'{}'", lit.text),
            ExpressionNode::Literal(lit) => write!(f, "{}", lit.text),
            ExpressionNode::PropertyReference(name) => write!(f, "$({})", name),
            ExpressionNode::ItemReference(name) => write!(f, "@({})", name),
        }
    }
}
