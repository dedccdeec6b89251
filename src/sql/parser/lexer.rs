//! SQL Lexer - Tokenizes SQL input text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::error::{Error, Result};

/// Represents a single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name, possibly `table.column`
    Ident(String),
    /// Quoted literal, kept exactly as written including its quotes
    String(String),
    /// Numeric literal (integer or floating-point)
    Number(String),
    /// Comparison operator made of `=`, `<`, `>` and `!` characters
    Operator(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Asterisk,
    Minus,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Token::Keyword(keyword) => keyword.to_str(),
            Token::Ident(ident) => ident,
            Token::String(v) => v,
            Token::Number(n) => n,
            Token::Operator(op) => op,
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Asterisk => "*",
            Token::Minus => "-",
        })
    }
}

/// SQL reserved keywords
#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    // Statement keywords
    Select,
    Insert,
    Delete,
    // Clause keywords
    Distinct,
    From,
    Into,
    Values,
    Where,
    And,
    Or,
    Like,
    Group,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    // Join keywords
    Inner,
    Left,
    Right,
    Join,
    On,
}

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "SELECT" => Keyword::Select,
            "INSERT" => Keyword::Insert,
            "DELETE" => Keyword::Delete,
            "DISTINCT" => Keyword::Distinct,
            "FROM" => Keyword::From,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "WHERE" => Keyword::Where,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "LIKE" => Keyword::Like,
            "GROUP" => Keyword::Group,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "INNER" => Keyword::Inner,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "JOIN" => Keyword::Join,
            "ON" => Keyword::On,
            _ => return None,
        })
    }

    /// Returns the uppercase string representation of the keyword
    pub fn to_str(&self) -> &str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Insert => "INSERT",
            Keyword::Delete => "DELETE",
            Keyword::Distinct => "DISTINCT",
            Keyword::From => "FROM",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Where => "WHERE",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Like => "LIKE",
            Keyword::Group => "GROUP",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Limit => "LIMIT",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Join => "JOIN",
            Keyword::On => "ON",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self
                .iter
                .peek()
                .map(|c| Err(Error::Parse(format!("[Lexer] Unexpected character {}", c)))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
        }
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Peeks and consumes if the character maps to a token (for single-char tokens)
    fn next_if_token<F: Fn(char) -> Option<Token>>(&mut self, predicate: F) -> Option<Token> {
        let token = self.iter.peek().and_then(|c| predicate(*c))?;
        self.iter.next();
        Some(token)
    }

    /// Removes whitespace from the input stream
    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        match self.iter.peek().copied() {
            Some(quote) if quote == '\'' || quote == '"' => self.scan_string(quote),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some('.') if self.digit_after(1) => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || c == '_' => Ok(self.scan_ident()),
            Some(c) if is_operator_char(c) => Ok(self.scan_operator()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans a quoted literal, keeping the quotes so later stages see the
    /// literal as written
    fn scan_string(&mut self, quote: char) -> Result<Option<Token>> {
        self.iter.next();
        let mut val = String::from(quote);

        loop {
            match self.iter.next() {
                Some(c) if c == quote => break,
                Some(c) => val.push(c),
                None => return Err(Error::Parse("[Lexer] Unexpected end of string".into())),
            }
        }
        val.push(quote);
        Ok(Some(Token::String(val)))
    }

    /// Whether the character `skip` positions ahead is a digit
    fn digit_after(&self, skip: usize) -> bool {
        self.iter.clone().nth(skip).is_some_and(|c| c.is_ascii_digit())
    }

    /// Scans a numeric literal: `12`, `1.5`, `.5`, `1.`, `1e3`, `2.5E-2`
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit()).unwrap_or_default();
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        // an exponent needs digits, otherwise `e` starts the next token
        let signed = matches!(self.iter.clone().nth(1), Some('+' | '-'));
        if matches!(self.iter.peek().copied(), Some('e' | 'E')) && self.digit_after(if signed { 2 } else { 1 }) {
            val.extend(self.iter.next());
            if signed {
                val.extend(self.iter.next());
            }
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        if val.is_empty() { None } else { Some(Token::Number(val)) }
    }

    /// Scans an identifier or keyword; identifiers keep their case
    fn scan_ident(&mut self) -> Option<Token> {
        let mut val = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            val.push(c);
        }
        Some(Keyword::from_str(&val).map_or(Token::Ident(val), Token::Keyword))
    }

    /// Scans a run of comparison characters as one operator
    fn scan_operator(&mut self) -> Option<Token> {
        self.next_while(is_operator_char).map(Token::Operator)
    }

    /// Scans a single-character symbol token
    fn scan_symbol(&mut self) -> Option<Token> {
        self.next_if_token(|c| match c {
            '*' => Some(Token::Asterisk),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '-' => Some(Token::Minus),
            _ => None,
        })
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '=' | '<' | '>' | '!')
}
