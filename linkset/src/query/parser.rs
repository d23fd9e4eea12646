//! Parser for textual filter expressions
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "!" unary | "(" expr ")" | "true" | "false" | leaf
//! leaf    := pointer "pr" | pointer op value
//! op      := "eq" | "co" | "sw" | "gt" | "ge" | "lt" | "le"
//! value   := string | number | "true" | "false" | "null"
//! ```
//!
//! Strings use JSON double-quote syntax; single quotes are accepted too.

use super::filter::{ComparisonOperator, QueryFilter};
use super::pointer::JsonPointer;
use serde_json::Value;

/// Error raised for a malformed filter expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid filter expression at offset {position}: {message}")]
pub struct FilterParseError {
    /// Byte offset into the expression
    pub position: usize,
    pub message: String,
}

impl FilterParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LeftParen,
    RightParen,
    Bang,
    Word(String),
    Quoted(String),
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, FilterParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((start, Token::LeftParen));
            }
            ')' => {
                chars.next();
                tokens.push((start, Token::RightParen));
            }
            '!' => {
                chars.next();
                tokens.push((start, Token::Bang));
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut raw = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, '\'')) => raw.push('\''),
                            Some((_, escaped)) => {
                                raw.push('\\');
                                raw.push(escaped);
                            }
                            None => raw.push('\\'),
                        },
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        '"' => raw.push_str("\\\""),
                        c => raw.push(c),
                    }
                }
                if !closed {
                    return Err(FilterParseError::new(start, "unterminated string literal"));
                }
                let value: String = serde_json::from_str(&format!("\"{}\"", raw))
                    .map_err(|e| FilterParseError::new(start, format!("invalid string: {}", e)))?;
                tokens.push((start, Token::Quoted(value)));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push((start, Token::Word(word)));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    index: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map(|(position, _)| *position)
            .unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(_, token)| token.clone());
        self.index += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn parse_or(&mut self) -> Result<QueryFilter<JsonPointer>, FilterParseError> {
        let mut filters = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.next();
            filters.push(self.parse_and()?);
        }
        Ok(collapse(filters, QueryFilter::Or))
    }

    fn parse_and(&mut self) -> Result<QueryFilter<JsonPointer>, FilterParseError> {
        let mut filters = vec![self.parse_unary()?];
        while self.peek_keyword("and") {
            self.next();
            filters.push(self.parse_unary()?);
        }
        Ok(collapse(filters, QueryFilter::And))
    }

    fn parse_unary(&mut self) -> Result<QueryFilter<JsonPointer>, FilterParseError> {
        let position = self.position();
        match self.next() {
            Some(Token::Bang) => Ok(QueryFilter::not(self.parse_unary()?)),
            Some(Token::LeftParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RightParen) => Ok(inner),
                    _ => Err(FilterParseError::new(self.position(), "expected ')'")),
                }
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("true") => {
                Ok(QueryFilter::Boolean(true))
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("false") => {
                Ok(QueryFilter::Boolean(false))
            }
            Some(Token::Word(word)) => self.parse_leaf(JsonPointer::new(&word)),
            Some(token) => Err(FilterParseError::new(
                position,
                format!("unexpected token {:?}", token),
            )),
            None => Err(FilterParseError::new(position, "unexpected end of expression")),
        }
    }

    fn parse_leaf(&mut self, field: JsonPointer) -> Result<QueryFilter<JsonPointer>, FilterParseError> {
        let position = self.position();
        let operator = match self.next() {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("pr") => {
                return Ok(QueryFilter::present(field));
            }
            Some(Token::Word(word)) => ComparisonOperator::from_keyword(&word).ok_or_else(|| {
                FilterParseError::new(position, format!("unknown operator '{}'", word))
            })?,
            _ => return Err(FilterParseError::new(position, "expected operator")),
        };

        let position = self.position();
        let value = match self.next() {
            Some(Token::Quoted(text)) => Value::String(text),
            Some(Token::Word(word)) => parse_literal(&word)
                .ok_or_else(|| FilterParseError::new(position, format!("invalid value '{}'", word)))?,
            _ => return Err(FilterParseError::new(position, "expected value")),
        };

        Ok(QueryFilter::comparison(field, operator, value))
    }
}

fn parse_literal(word: &str) -> Option<Value> {
    match word {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => match serde_json::from_str::<Value>(word) {
            Ok(number @ Value::Number(_)) => Some(number),
            _ => None,
        },
    }
}

fn collapse(
    mut filters: Vec<QueryFilter<JsonPointer>>,
    combine: fn(Vec<QueryFilter<JsonPointer>>) -> QueryFilter<JsonPointer>,
) -> QueryFilter<JsonPointer> {
    if filters.len() == 1 {
        filters.remove(0)
    } else {
        combine(filters)
    }
}

impl QueryFilter<JsonPointer> {
    /// Parse a filter expression such as
    /// `/_ref eq "managed/role/1" and /_refProperties/grantType pr`
    pub fn parse(expression: &str) -> Result<Self, FilterParseError> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Err(FilterParseError::new(0, "empty filter expression"));
        }

        let mut parser = Parser {
            tokens,
            index: 0,
            end: expression.len(),
        };
        let filter = parser.parse_or()?;
        if parser.peek().is_some() {
            return Err(FilterParseError::new(
                parser.position(),
                "unexpected trailing input",
            ));
        }
        Ok(filter)
    }
}
