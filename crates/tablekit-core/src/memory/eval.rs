//! Condition and update evaluation for the in-memory executor.
//!
//! Expressions are tokenized and evaluated directly against an item by a
//! recursive-descent parser; no AST is kept. Only top-level attribute paths are
//! supported. Keywords and function names match case-insensitively.
//!
//! Supported condition grammar:
//!
//! ```text
//! condition  := or
//! or         := and ( OR and )*
//! and        := not ( AND not )*
//! not        := NOT not | primary
//! primary    := '(' condition ')' | function | comparison
//! comparison := operand ( cmp operand | BETWEEN operand AND operand )
//! function   := attribute_exists(path) | attribute_not_exists(path)
//!             | begins_with(operand, operand) | contains(operand, operand)
//! ```

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use tablekit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues};
use tablekit_model::{AttributeValue, Item, StoreError};

use crate::expression::{Section, UpdateClauses};

/// Errors produced while evaluating an expression.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An unexpected token was encountered.
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// A `#name` placeholder has no binding.
    #[error("unresolved expression attribute name: #{0}")]
    UnresolvedName(String),
    /// A `:value` placeholder has no binding.
    #[error("unresolved expression attribute value: :{0}")]
    UnresolvedValue(String),
    /// Operand types do not fit the operation.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Valid syntax this evaluator does not implement.
    #[error("unsupported expression: {0}")]
    Unsupported(String),
}

impl From<EvalError> for StoreError {
    fn from(err: EvalError) -> Self {
        StoreError::validation(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    NameRef(String),
    ValueRef(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Comma,
    LParen,
    RParen,
    Dot,
    LBracket,
    RBracket,
    And,
    Or,
    Not,
    Between,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, EvalError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }
        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        let single = match ch {
            '=' => Some(Token::Eq),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '.' => Some(Token::Dot),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = single {
            self.chars.next();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.chars.next();
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Ok(Token::Le)
                } else if self.chars.peek() == Some(&'>') {
                    self.chars.next();
                    Ok(Token::Ne)
                } else {
                    Ok(Token::Lt)
                }
            }
            '>' => {
                self.chars.next();
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            '#' => {
                self.chars.next();
                Ok(Token::NameRef(self.read_placeholder("#")?))
            }
            ':' => {
                self.chars.next();
                Ok(Token::ValueRef(self.read_placeholder(":")?))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.read_word();
                Ok(match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "BETWEEN" => Token::Between,
                    _ => Token::Identifier(word),
                })
            }
            c if c.is_ascii_digit() => Err(EvalError::Unsupported(
                "numeric literals and list indexes".to_owned(),
            )),
            other => Err(EvalError::UnexpectedToken {
                expected: "valid token".to_owned(),
                found: format!("'{other}'"),
            }),
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn read_placeholder(&mut self, sigil: &str) -> Result<String, EvalError> {
        let name = self.read_word();
        if name.is_empty() {
            return Err(EvalError::UnexpectedToken {
                expected: format!("placeholder name after '{sigil}'"),
                found: "nothing".to_owned(),
            });
        }
        Ok(name)
    }
}

/// The item and substitution maps an expression is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// The item as stored; an empty item when nothing is stored.
    pub item: &'a Item,
    /// `#name` bindings.
    pub names: &'a ExpressionAttributeNames,
    /// `:value` bindings.
    pub values: &'a ExpressionAttributeValues,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    scope: Scope<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &str, scope: Scope<'a>) -> Result<Self, EvalError> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
            scope,
        })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_function(&self) -> Option<String> {
        match (self.peek(), self.tokens.get(self.pos + 1)) {
            (Token::Identifier(name), Some(Token::LParen)) => Some(name.to_ascii_lowercase()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        let found = self.advance();
        if &found == expected {
            Ok(())
        } else {
            Err(EvalError::UnexpectedToken {
                expected: format!("{expected:?}"),
                found: format!("{found:?}"),
            })
        }
    }

    fn expect_end(&mut self) -> Result<(), EvalError> {
        self.expect(&Token::Eof)
    }

    fn parse_or(&mut self) -> Result<bool, EvalError> {
        let mut result = self.parse_and()?;
        while self.peek() == &Token::Or {
            self.advance();
            let rhs = self.parse_and()?;
            result = result || rhs;
        }
        Ok(result)
    }

    fn parse_and(&mut self) -> Result<bool, EvalError> {
        let mut result = self.parse_not()?;
        while self.peek() == &Token::And {
            self.advance();
            let rhs = self.parse_not()?;
            result = result && rhs;
        }
        Ok(result)
    }

    fn parse_not(&mut self) -> Result<bool, EvalError> {
        if self.peek() == &Token::Not {
            self.advance();
            return Ok(!self.parse_not()?);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<bool, EvalError> {
        if self.peek() == &Token::LParen {
            self.advance();
            let result = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(result);
        }
        if let Some(function) = self.peek_function() {
            return self.parse_function(&function);
        }
        self.parse_comparison()
    }

    fn parse_function(&mut self, function: &str) -> Result<bool, EvalError> {
        self.advance();
        self.expect(&Token::LParen)?;
        let result = match function {
            "attribute_exists" => {
                let path = self.parse_path()?;
                self.scope.item.contains_key(&path)
            }
            "attribute_not_exists" => {
                let path = self.parse_path()?;
                !self.scope.item.contains_key(&path)
            }
            "begins_with" => {
                let target = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let prefix = self.parse_operand()?;
                match (target, prefix) {
                    (Some(AttributeValue::S(s)), Some(AttributeValue::S(p))) => s.starts_with(&p),
                    (Some(AttributeValue::B(b)), Some(AttributeValue::B(p))) => b.starts_with(&p),
                    _ => false,
                }
            }
            "contains" => {
                let target = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let needle = self.parse_operand()?;
                match (target, needle) {
                    (Some(AttributeValue::S(s)), Some(AttributeValue::S(n))) => s.contains(&n),
                    (Some(AttributeValue::Ss(set)), Some(AttributeValue::S(n))) => set.contains(&n),
                    (Some(AttributeValue::Ns(set)), Some(AttributeValue::N(n))) => {
                        set.iter().any(|m| numbers_equal(m, &n))
                    }
                    (Some(AttributeValue::L(list)), Some(n)) => {
                        list.iter().any(|v| values_equal(v, &n))
                    }
                    _ => false,
                }
            }
            other => return Err(EvalError::Unsupported(format!("function {other}"))),
        };
        self.expect(&Token::RParen)?;
        Ok(result)
    }

    fn parse_comparison(&mut self) -> Result<bool, EvalError> {
        let left = self.parse_operand()?;
        let op = self.advance();
        if op == Token::Between {
            let low = self.parse_operand()?;
            self.expect(&Token::And)?;
            let high = self.parse_operand()?;
            return Ok(compare(&Token::Ge, left.as_ref(), low.as_ref())
                && compare(&Token::Le, left.as_ref(), high.as_ref()));
        }
        if !matches!(
            op,
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge
        ) {
            return Err(EvalError::UnexpectedToken {
                expected: "comparison operator".to_owned(),
                found: format!("{op:?}"),
            });
        }
        let right = self.parse_operand()?;
        Ok(compare(&op, left.as_ref(), right.as_ref()))
    }

    /// A top-level attribute name.
    fn parse_path(&mut self) -> Result<String, EvalError> {
        let name = match self.advance() {
            Token::NameRef(token) => self
                .scope
                .names
                .get(&format!("#{token}"))
                .cloned()
                .ok_or(EvalError::UnresolvedName(token))?,
            Token::Identifier(name) => name,
            other => {
                return Err(EvalError::UnexpectedToken {
                    expected: "attribute path".to_owned(),
                    found: format!("{other:?}"),
                });
            }
        };
        if matches!(self.peek(), Token::Dot | Token::LBracket) {
            return Err(EvalError::Unsupported("nested attribute paths".to_owned()));
        }
        Ok(name)
    }

    /// A value placeholder or the current value of an attribute.
    fn parse_operand(&mut self) -> Result<Option<AttributeValue>, EvalError> {
        if let Token::ValueRef(token) = self.peek().clone() {
            self.advance();
            return self
                .scope
                .values
                .get(&format!(":{token}"))
                .cloned()
                .map(Some)
                .ok_or(EvalError::UnresolvedValue(token));
        }
        let path = self.parse_path()?;
        Ok(self.scope.item.get(&path).cloned())
    }

    /// Right-hand side of a `SET` action.
    fn parse_set_value(&mut self) -> Result<AttributeValue, EvalError> {
        let left = self.parse_set_operand()?;
        match self.peek() {
            Token::Plus => {
                self.advance();
                let right = self.parse_set_operand()?;
                arithmetic(&left, &right, false)
            }
            Token::Minus => {
                self.advance();
                let right = self.parse_set_operand()?;
                arithmetic(&left, &right, true)
            }
            _ => Ok(left),
        }
    }

    fn parse_set_operand(&mut self) -> Result<AttributeValue, EvalError> {
        match self.peek_function().as_deref() {
            Some("if_not_exists") => {
                self.advance();
                self.expect(&Token::LParen)?;
                let path = self.parse_path()?;
                self.expect(&Token::Comma)?;
                let fallback = self.parse_set_operand()?;
                self.expect(&Token::RParen)?;
                Ok(self.scope.item.get(&path).cloned().unwrap_or(fallback))
            }
            Some("list_append") => {
                self.advance();
                self.expect(&Token::LParen)?;
                let first = self.parse_set_operand()?;
                self.expect(&Token::Comma)?;
                let second = self.parse_set_operand()?;
                self.expect(&Token::RParen)?;
                match (first, second) {
                    (AttributeValue::L(mut a), AttributeValue::L(b)) => {
                        a.extend(b);
                        Ok(AttributeValue::L(a))
                    }
                    _ => Err(EvalError::TypeMismatch(
                        "list_append requires two lists".to_owned(),
                    )),
                }
            }
            Some(other) => Err(EvalError::Unsupported(format!("function {other}"))),
            None => self.parse_operand()?.ok_or_else(|| {
                EvalError::TypeMismatch(
                    "the provided expression refers to an attribute that does not exist".to_owned(),
                )
            }),
        }
    }
}

/// Evaluate a condition. An empty expression holds.
pub fn evaluate_condition(expression: &str, scope: Scope<'_>) -> Result<bool, EvalError> {
    if expression.trim().is_empty() {
        return Ok(true);
    }
    let mut parser = Parser::new(expression, scope)?;
    let result = parser.parse_or()?;
    parser.expect_end()?;
    Ok(result)
}

/// Apply an update expression to `item` in place.
///
/// Every right-hand side is evaluated against the item as it was before the
/// update, then the actions are applied.
pub fn apply_update(
    expression: &str,
    item: &mut Item,
    names: &ExpressionAttributeNames,
    values: &ExpressionAttributeValues,
) -> Result<(), EvalError> {
    let clauses = UpdateClauses::parse(expression);
    if clauses.is_empty() {
        return Err(EvalError::Unsupported("empty update expression".to_owned()));
    }

    let snapshot = item.clone();
    let scope = Scope {
        item: &snapshot,
        names,
        values,
    };

    let mut writes: Vec<(String, Option<AttributeValue>)> = Vec::new();
    for action in clauses.items(Section::Set) {
        let mut parser = Parser::new(action, scope)?;
        let path = parser.parse_path()?;
        parser.expect(&Token::Eq)?;
        let value = parser.parse_set_value()?;
        parser.expect_end()?;
        writes.push((path, Some(value)));
    }
    for action in clauses.items(Section::Remove) {
        let mut parser = Parser::new(action, scope)?;
        let path = parser.parse_path()?;
        parser.expect_end()?;
        writes.push((path, None));
    }
    for action in clauses.items(Section::Add) {
        let mut parser = Parser::new(action, scope)?;
        let path = parser.parse_path()?;
        let operand = parser.parse_operand()?;
        parser.expect_end()?;
        let operand = operand.ok_or_else(|| {
            EvalError::TypeMismatch("ADD requires a value operand".to_owned())
        })?;
        let value = add(snapshot.get(&path), operand)?;
        writes.push((path, Some(value)));
    }
    for action in clauses.items(Section::Delete) {
        let mut parser = Parser::new(action, scope)?;
        let path = parser.parse_path()?;
        let operand = parser.parse_operand()?;
        parser.expect_end()?;
        let operand = operand.ok_or_else(|| {
            EvalError::TypeMismatch("DELETE requires a set operand".to_owned())
        })?;
        if let Some(existing) = snapshot.get(&path) {
            writes.push((path, subtract(existing, &operand)?));
        }
    }

    for (path, value) in writes {
        match value {
            Some(value) => item.insert(path, value),
            None => item.remove(&path),
        };
    }
    Ok(())
}

fn numbers_equal(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn values_equal(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a, b) {
        (AttributeValue::N(x), AttributeValue::N(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

/// Ordering of two scalar values of the same type.
pub(crate) fn scalar_order(a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
    match (a, b) {
        (AttributeValue::S(x), AttributeValue::S(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (AttributeValue::N(x), AttributeValue::N(y)) => {
            x.parse::<f64>().ok()?.partial_cmp(&y.parse::<f64>().ok()?)
        }
        (AttributeValue::B(x), AttributeValue::B(y)) => Some(x.as_ref().cmp(y.as_ref())),
        _ => None,
    }
}

/// A comparison with a missing operand is false.
fn compare(op: &Token, left: Option<&AttributeValue>, right: Option<&AttributeValue>) -> bool {
    let (Some(left), Some(right)) = (left, right) else {
        return false;
    };
    match op {
        Token::Eq => values_equal(left, right),
        Token::Ne => !values_equal(left, right),
        _ => scalar_order(left, right).is_some_and(|ord| match op {
            Token::Lt => ord == Ordering::Less,
            Token::Le => ord != Ordering::Greater,
            Token::Gt => ord == Ordering::Greater,
            Token::Ge => ord != Ordering::Less,
            _ => false,
        }),
    }
}

fn arithmetic(
    left: &AttributeValue,
    right: &AttributeValue,
    subtract: bool,
) -> Result<AttributeValue, EvalError> {
    let (AttributeValue::N(a), AttributeValue::N(b)) = (left, right) else {
        return Err(EvalError::TypeMismatch(
            "arithmetic requires number operands".to_owned(),
        ));
    };
    if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
        let result = if subtract {
            x.checked_sub(y)
        } else {
            x.checked_add(y)
        };
        if let Some(n) = result {
            return Ok(AttributeValue::number(n));
        }
    }
    let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) else {
        return Err(EvalError::TypeMismatch(format!("invalid numbers {a} and {b}")));
    };
    Ok(AttributeValue::number(if subtract { x - y } else { x + y }))
}

fn union<T: Clone + PartialEq>(existing: &[T], added: Vec<T>) -> Vec<T> {
    let mut merged = existing.to_vec();
    for value in added {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    merged
}

fn add(existing: Option<&AttributeValue>, operand: AttributeValue) -> Result<AttributeValue, EvalError> {
    match (existing, operand) {
        (None, operand) => Ok(operand),
        (Some(current @ AttributeValue::N(_)), operand @ AttributeValue::N(_)) => {
            arithmetic(current, &operand, false)
        }
        (Some(AttributeValue::Ss(current)), AttributeValue::Ss(added)) => {
            Ok(AttributeValue::Ss(union(current, added)))
        }
        (Some(AttributeValue::Ns(current)), AttributeValue::Ns(added)) => {
            Ok(AttributeValue::Ns(union(current, added)))
        }
        (Some(AttributeValue::Bs(current)), AttributeValue::Bs(added)) => {
            Ok(AttributeValue::Bs(union(current, added)))
        }
        (Some(current), operand) => Err(EvalError::TypeMismatch(format!(
            "cannot ADD {} to {}",
            operand.type_descriptor(),
            current.type_descriptor()
        ))),
    }
}

/// Remove the operand's members from a set; `None` when the set empties.
fn subtract(
    existing: &AttributeValue,
    operand: &AttributeValue,
) -> Result<Option<AttributeValue>, EvalError> {
    let remaining = match (existing, operand) {
        (AttributeValue::Ss(current), AttributeValue::Ss(removed)) => {
            let kept: Vec<_> = current.iter().filter(|v| !removed.contains(v)).cloned().collect();
            (!kept.is_empty()).then_some(AttributeValue::Ss(kept))
        }
        (AttributeValue::Ns(current), AttributeValue::Ns(removed)) => {
            let kept: Vec<_> = current
                .iter()
                .filter(|v| !removed.iter().any(|r| numbers_equal(v, r)))
                .cloned()
                .collect();
            (!kept.is_empty()).then_some(AttributeValue::Ns(kept))
        }
        (AttributeValue::Bs(current), AttributeValue::Bs(removed)) => {
            let kept: Vec<_> = current.iter().filter(|v| !removed.contains(v)).cloned().collect();
            (!kept.is_empty()).then_some(AttributeValue::Bs(kept))
        }
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "cannot DELETE {} from {}",
                operand.type_descriptor(),
                existing.type_descriptor()
            )));
        }
    };
    Ok(remaining)
}
