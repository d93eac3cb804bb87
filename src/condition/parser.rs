//! Condition string parser

use crate::condition::ast::{CompareOp, ExpressionNode, Function, Literal};
use crate::condition::evaluator::ConditionExpression;
use thiserror::Error;

/// A condition string that does not follow the condition grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position} in \"{condition}\"")]
pub struct ParseError {
    pub condition: String,
    pub position: usize,
    pub message: String,
}

/// Parse a condition string into an expression tree
pub fn parse(condition: &str) -> Result<ConditionExpression, ParseError> {
    if condition.trim().is_empty() {
        return Err(ParseError {
            condition: condition.to_string(),
            position: 0,
            message: "Empty condition".to_string(),
        });
    }

    let tokens = tokenize(condition)?;
    let mut parser = Parser {
        condition,
        tokens: &tokens,
        pos: 0,
    };

    let root = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error_at(token.offset, format!("Unexpected {}", token.kind.describe())));
    }

    Ok(ConditionExpression::new(condition, root))
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LeftParen,
    RightParen,
    Comma,
    Not,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    String(String),
    Number(String),
    Property(String),
    Item(String),
    Word(String),
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::LeftParen => "'('".to_string(),
            TokenKind::RightParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Not => "'!'".to_string(),
            TokenKind::Equal => "'=='".to_string(),
            TokenKind::NotEqual => "'!='".to_string(),
            TokenKind::Less => "'<'".to_string(),
            TokenKind::LessEqual => "'<='".to_string(),
            TokenKind::Greater => "'>'".to_string(),
            TokenKind::GreaterEqual => "'>='".to_string(),
            TokenKind::And => "'and'".to_string(),
            TokenKind::Or => "'or'".to_string(),
            TokenKind::String(s) => format!("string '{}'", s),
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Property(p) => format!("property $({})", p),
            TokenKind::Item(i) => format!("item @({})", i),
            TokenKind::Word(w) => format!("'{}'", w),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn error(condition: &str, position: usize, message: impl Into<String>) -> ParseError {
    ParseError {
        condition: condition.to_string(),
        position,
        message: message.into(),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn tokenize(condition: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = condition.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            '=' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    TokenKind::Equal
                } else {
                    return Err(error(condition, offset, "Expected '=='"));
                }
            }
            '<' | '>' => {
                let or_equal = matches!(chars.peek(), Some((_, '=')));
                if or_equal {
                    chars.next();
                }
                match (c, or_equal) {
                    ('<', false) => TokenKind::Less,
                    ('<', true) => TokenKind::LessEqual,
                    ('>', false) => TokenKind::Greater,
                    _ => TokenKind::GreaterEqual,
                }
            }
            '\'' => {
                let mut text = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '\'' {
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(error(condition, offset, "Unterminated string"));
                }
                check_embedded_references(condition, offset + 1, &text)?;
                TokenKind::String(text)
            }
            '$' | '@' => {
                if !matches!(chars.next(), Some((_, '('))) {
                    return Err(error(condition, offset, format!("Expected '(' after '{}'", c)));
                }
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ')' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(error(condition, offset, "Unterminated reference"));
                }
                let name = name.trim().to_string();
                if !is_reference_name(&name) {
                    return Err(error(
                        condition,
                        offset,
                        format!("Unsupported reference '{}({})'", c, name),
                    ));
                }
                if c == '$' {
                    TokenKind::Property(name)
                } else {
                    TokenKind::Item(name)
                }
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => {
                let mut text = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '.' {
                        text.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if super::evaluator::parse_number(&text).is_none() {
                    return Err(error(condition, offset, format!("Malformed number '{}'", text)));
                }
                TokenKind::Number(text)
            }
            c if is_name_start(c) => {
                let mut text = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if is_name_char(next) || next == '.' {
                        text.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if text.eq_ignore_ascii_case("and") {
                    TokenKind::And
                } else if text.eq_ignore_ascii_case("or") {
                    TokenKind::Or
                } else {
                    TokenKind::Word(text)
                }
            }
            other => {
                return Err(error(condition, offset, format!("Unexpected character '{}'", other)))
            }
        };

        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

fn is_reference_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if is_name_start(c)) && chars.all(is_name_char)
}

/// Every `$(` / `@(` inside a quoted string must be closed
fn check_embedded_references(condition: &str, base: usize, text: &str) -> Result<(), ParseError> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if (bytes[i] == b'$' || bytes[i] == b'@') && bytes[i + 1] == b'(' {
            match text[i + 2..].find(')') {
                Some(close) => i += close + 3,
                None => return Err(error(condition, base + i, "Unterminated reference in string")),
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}

enum Relation {
    Equal,
    NotEqual,
    Compare(CompareOp),
}

struct Parser<'a> {
    condition: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> ParseError {
        error(self.condition, position, message)
    }

    fn unexpected_end(&self, expected: &str) -> ParseError {
        self.error_at(self.condition.len(), format!("Unexpected end of condition, expected {}", expected))
    }

    fn parse_expr(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = ExpressionNode::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExpressionNode, ParseError> {
        let mut left = self.parse_relational()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_relational()?;
            left = ExpressionNode::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<ExpressionNode, ParseError> {
        let left = self.parse_factor()?;

        let relation = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Equal) => Relation::Equal,
            Some(TokenKind::NotEqual) => Relation::NotEqual,
            Some(TokenKind::Less) => Relation::Compare(CompareOp::Less),
            Some(TokenKind::LessEqual) => Relation::Compare(CompareOp::LessEqual),
            Some(TokenKind::Greater) => Relation::Compare(CompareOp::Greater),
            Some(TokenKind::GreaterEqual) => Relation::Compare(CompareOp::GreaterEqual),
            _ => return Ok(left),
        };
        self.pos += 1;

        let (left, right) = (Box::new(left), Box::new(self.parse_factor()?));
        Ok(match relation {
            Relation::Equal => ExpressionNode::Equal(left, right),
            Relation::NotEqual => ExpressionNode::NotEqual(left, right),
            Relation::Compare(op) => ExpressionNode::Compare(op, left, right),
        })
    }

    fn parse_factor(&mut self) -> Result<ExpressionNode, ParseError> {
        let token = self.advance().ok_or_else(|| self.unexpected_end("an operand"))?;

        match &token.kind {
            TokenKind::LeftParen => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(self.error_at(
                        other.offset,
                        format!("Expected ')' but found {}", other.kind.describe()),
                    )),
                    None => Err(self.error_at(token.offset, "Unbalanced parentheses")),
                }
            }
            TokenKind::Not => Ok(ExpressionNode::Not(Box::new(self.parse_factor()?))),
            TokenKind::Word(name) if self.peek().map(|t| &t.kind) == Some(&TokenKind::LeftParen) => {
                self.pos += 1;
                self.parse_call(name, token.offset)
            }
            TokenKind::Word(word) => Ok(ExpressionNode::Literal(Literal::bare(word.clone()))),
            TokenKind::Number(number) => Ok(ExpressionNode::Literal(Literal::bare(number.clone()))),
            TokenKind::String(text) => Ok(ExpressionNode::Literal(Literal::quoted(text.clone()))),
            TokenKind::Property(name) => Ok(ExpressionNode::PropertyReference(name.clone())),
            TokenKind::Item(name) => Ok(ExpressionNode::ItemReference(name.clone())),
            other => Err(self.error_at(
                token.offset,
                format!("Expected an operand but found {}", other.describe()),
            )),
        }
    }

    fn parse_call(&mut self, name: &str, offset: usize) -> Result<ExpressionNode, ParseError> {
        let function = Function::from_name(name)
            .ok_or_else(|| self.error_at(offset, format!("Unknown function '{}'", name)))?;

        let mut args = Vec::new();
        if !self.eat(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_factor()?);
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::Comma,
                        ..
                    }) => continue,
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => break,
                    Some(other) => {
                        return Err(self.error_at(
                            other.offset,
                            format!("Expected ',' or ')' but found {}", other.kind.describe()),
                        ))
                    }
                    None => return Err(self.unexpected_end("')'")),
                }
            }
        }

        if args.len() != function.arity() {
            return Err(self.error_at(
                offset,
                format!(
                    "{} expects {} argument(s), found {}",
                    function.name(),
                    function.arity(),
                    args.len()
                ),
            ));
        }

        Ok(ExpressionNode::FunctionCall(function, args))
    }
}
