// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Extraction of link table declarations from a C/C++ source file.
//!
//! Grammar of a declaration (whitespace and comments are insignificant):
//!
//! ```text
//! declaration := TYPE IDENT dims '=' '{' body '}' ';'
//! dims        := ( '[' NUMBER ']' )+
//! body        := element ( ',' element )* ','?
//! element     := '{' body '}' | entry
//! entry       := NUMBER | IDENT ( '[' NUMBER ']' )*
//! ```
//!
//! Only declarations whose type, name and dimensions match the [`TableSpec`]
//! of a layout are extracted, the rest of the file is skipped.
use std::iter::Peekable;
use std::str::CharIndices;

use crate::label::{Token, parse_number};
use crate::layout::TableSpec;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexemeKind {
    Ident(String),
    Number(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub line: usize,
}

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, '\n')) = next {
            self.line += 1;
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    /// Consume characters while `pred` holds and return the consumed slice.
    fn take_while(&mut self, start: usize, pred: impl Fn(char) -> bool) -> &'a str {
        let mut end = self.source.len();
        while let Some(&(idx, c)) = self.chars.peek() {
            if !pred(c) {
                end = idx;
                break;
            }
            self.bump();
        }
        &self.source[start..end]
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Skip a block comment. An unterminated comment only swallows the rest
    /// of its own line.
    fn skip_block_comment(&mut self, start_line: usize) {
        let resume = (self.chars.clone(), self.line);
        let mut prev = '\0';
        while let Some((_, c)) = self.bump() {
            if prev == '*' && c == '/' {
                return;
            }
            prev = c;
        }
        orsc_log::warn!("Unterminated block comment at line {}", start_line);
        (self.chars, self.line) = resume;
        self.skip_line_comment();
    }

    /// Skip a string or character literal. Literals end at the line end at
    /// the latest.
    fn skip_quoted(&mut self, quote: char, start_line: usize) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                orsc_log::debug!("Unterminated {} literal at line {}", quote, start_line);
                return;
            }
            self.bump();
            match c {
                '\\' if self.peek_char() != Some('\n') => {
                    self.bump();
                }
                c if c == quote => return,
                _ => {}
            }
        }
    }

    fn next_lexeme(&mut self) -> Option<Lexeme> {
        while let Some((start, c)) = self.bump() {
            let line = self.line;
            let kind = match c {
                c if c.is_whitespace() => continue,
                '/' if self.peek_char() == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_char() == Some('*') => {
                    self.bump();
                    self.skip_block_comment(line);
                    continue;
                }
                '"' | '\'' => {
                    self.skip_quoted(c, line);
                    continue;
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let text = self.take_while(start + c.len_utf8(), |c| {
                        c.is_ascii_alphanumeric() || c == '_'
                    });
                    LexemeKind::Ident(format!("{c}{text}"))
                }
                c if c.is_ascii_digit() => {
                    let text = self.take_while(start + c.len_utf8(), |c| {
                        c.is_ascii_alphanumeric() || c == '.'
                    });
                    LexemeKind::Number(format!("{c}{text}"))
                }
                c => LexemeKind::Punct(c),
            };
            return Some(Lexeme { kind, line });
        }
        None
    }
}

/// Split C/C++ source text into identifiers, numbers and punctuation.
///
/// Comments and string or character literals are dropped. Lexing never
/// fails: unterminated literals and comments are cut at the end of their line.
pub fn tokenize(source: &str) -> Vec<Lexeme> {
    let mut lexer = Lexer::new(source);
    let mut out = vec![];
    while let Some(lexeme) = lexer.next_lexeme() {
        out.push(lexeme);
    }
    out
}

/// A link table extracted from source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTable {
    pub name: String,
    /// Line of the declaration.
    pub line: usize,
    pub rows: Vec<Vec<Token>>,
}

impl LinkTable {
    /// All entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &Token> {
        self.rows.iter().flatten()
    }

    /// Number of rows and the width of the widest row.
    pub fn shape(&self) -> (usize, usize) {
        let cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), cols)
    }

    fn has_shape(&self, rows: usize, cols: usize) -> bool {
        self.rows.len() == rows && self.rows.iter().all(|row| row.len() == cols)
    }
}

enum Element {
    Entry(Token),
    List(Vec<Element>),
}

fn flatten_into(elements: Vec<Element>, out: &mut Vec<Token>) {
    for element in elements {
        match element {
            Element::Entry(token) => out.push(token),
            Element::List(inner) => flatten_into(inner, out),
        }
    }
}

struct Parser<'a> {
    lexemes: &'a [Lexeme],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.lexemes.last())
            .map_or(0, |lexeme| lexeme.line)
    }

    fn is_punct(&self, expected: char) -> bool {
        matches!(self.peek(), Some(Lexeme { kind: LexemeKind::Punct(c), .. }) if *c == expected)
    }

    fn eat_punct(&mut self, expected: char) -> bool {
        if self.is_punct(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, expected: char) -> Result<()> {
        if self.eat_punct(expected) {
            Ok(())
        } else {
            Err(Error::parse(
                self.line(),
                format!("expected '{expected}', found {}", self.describe()),
            ))
        }
    }

    fn describe(&self) -> String {
        match self.peek().map(|lexeme| &lexeme.kind) {
            Some(LexemeKind::Ident(text)) | Some(LexemeKind::Number(text)) => format!("'{text}'"),
            Some(LexemeKind::Punct(c)) => format!("'{c}'"),
            None => "end of file".to_string(),
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Lexeme {
                kind: LexemeKind::Ident(text),
                ..
            }) => {
                self.pos += 1;
                Some(text.as_str())
            }
            _ => None,
        }
    }

    fn index(&mut self) -> Result<usize> {
        let line = self.line();
        match self.peek().map(|lexeme| &lexeme.kind) {
            Some(LexemeKind::Number(text)) => {
                self.pos += 1;
                parse_number(text)
                    .and_then(|value| usize::try_from(value).ok())
                    .ok_or_else(|| Error::parse(line, format!("invalid index '{text}'")))
            }
            _ => Err(Error::parse(
                line,
                format!("expected index, found {}", self.describe()),
            )),
        }
    }

    /// Try to read `TYPE NAME [N]...[M] = {` at the current position.
    ///
    /// On success the position is left on the opening brace.
    fn header(&mut self) -> Option<(&'a str, &'a str, Vec<usize>)> {
        let element_type = self.ident()?;
        let name = self.ident()?;
        let mut dims = vec![];
        while self.eat_punct('[') {
            dims.push(self.index().ok()?);
            if !self.eat_punct(']') {
                return None;
            }
        }
        if dims.is_empty() || !self.eat_punct('=') || !self.is_punct('{') {
            return None;
        }
        Some((element_type, name, dims))
    }

    fn entry(&mut self) -> Result<Token> {
        let line = self.line();
        match self.peek().map(|lexeme| &lexeme.kind) {
            Some(LexemeKind::Number(text)) => {
                self.pos += 1;
                parse_number(text)
                    .map(Token::Literal)
                    .ok_or_else(|| Error::parse(line, format!("invalid constant '{text}'")))
            }
            Some(LexemeKind::Ident(name)) => {
                self.pos += 1;
                let mut indices = vec![];
                while self.eat_punct('[') {
                    indices.push(self.index()?);
                    self.expect_punct(']')?;
                }
                Ok(Token::Field {
                    name: name.clone(),
                    indices,
                })
            }
            _ => Err(Error::parse(
                line,
                format!("expected table entry, found {}", self.describe()),
            )),
        }
    }

    fn brace_list(&mut self) -> Result<Vec<Element>> {
        self.expect_punct('{')?;
        let mut elements = vec![];
        loop {
            if self.eat_punct('}') {
                break;
            }
            if self.is_punct('{') {
                elements.push(Element::List(self.brace_list()?));
            } else {
                elements.push(Element::Entry(self.entry()?));
            }
            if !self.eat_punct(',') {
                self.expect_punct('}')?;
                break;
            }
        }
        Ok(elements)
    }

    /// Parse an initializer into rows.
    ///
    /// Every nested brace list at the top level is one row. Entries outside
    /// of nested lists are collected into rows of their own.
    fn body(&mut self) -> Result<Vec<Vec<Token>>> {
        let mut rows = vec![];
        let mut loose = vec![];
        for element in self.brace_list()? {
            match element {
                Element::Entry(token) => loose.push(token),
                Element::List(inner) => {
                    if !loose.is_empty() {
                        rows.push(std::mem::take(&mut loose));
                    }
                    let mut row = vec![];
                    flatten_into(inner, &mut row);
                    rows.push(row);
                }
            }
        }
        if !loose.is_empty() {
            rows.push(loose);
        }
        self.expect_punct(';')?;
        Ok(rows)
    }

    /// Move past the next `};`, or to the end if there is none.
    fn skip_declaration(&mut self) {
        while self.pos < self.lexemes.len() {
            let close = self.eat_punct('}');
            if close && self.eat_punct(';') {
                return;
            }
            if !close {
                self.pos += 1;
            }
        }
    }
}

/// Extract every table declaration matching `spec`, in file order.
///
/// A matching declaration with a malformed initializer is logged and skipped,
/// its labels are then absent from the result.
pub fn parse_tables(source: &str, spec: &TableSpec) -> Vec<LinkTable> {
    let lexemes = tokenize(source);
    let mut parser = Parser {
        lexemes: &lexemes,
        pos: 0,
    };
    let mut tables = vec![];
    while parser.pos < lexemes.len() {
        let start = parser.pos;
        let line = lexemes[start].line;
        match parser.header() {
            Some((element_type, name, dims)) if spec.matches(element_type, name, &dims) => {
                let rows = match parser.body() {
                    Ok(rows) => rows,
                    Err(err) => {
                        orsc_log::warn!("Skipping table '{}' at line {}: {}", name, line, err);
                        parser.skip_declaration();
                        continue;
                    }
                };
                let table = LinkTable {
                    name: name.to_string(),
                    line,
                    rows,
                };
                if !table.has_shape(spec.rows, spec.cols) {
                    let (rows, cols) = table.shape();
                    orsc_log::warn!(
                        "Table '{}' at line {} is {}x{}, declared as {}x{}",
                        table.name,
                        line,
                        rows,
                        cols,
                        spec.rows,
                        spec.cols
                    );
                }
                orsc_log::debug!(
                    "Found table '{}' at line {} with {} entries",
                    table.name,
                    line,
                    table.entries().count()
                );
                tables.push(table);
            }
            _ => parser.pos = start + 1,
        }
    }
    tables
}
