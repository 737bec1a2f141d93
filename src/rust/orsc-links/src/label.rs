// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::{Error, Result};

/// A single entry of a link table.
///
/// Entries are either numeric constants (unused slots) or references to a
/// named bit, possibly indexed, e.g. `RC[3][1][9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(u64),
    Field { name: String, indices: Vec<usize> },
}

impl Token {
    pub fn field(name: impl Into<String>, indices: &[usize]) -> Self {
        Token::Field {
            name: name.into(),
            indices: indices.to_vec(),
        }
    }

    /// Canonical label of the entry: the source text without whitespace,
    /// with numeric constants written in decimal.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(value) => write!(f, "{value}"),
            Token::Field { name, indices } => {
                write!(f, "{name}")?;
                for index in indices {
                    write!(f, "[{index}]")?;
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_number(text: &str) -> Option<u64> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    // C integer suffixes
    text.trim_end_matches(['u', 'U', 'l', 'L']).parse().ok()
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_number(s)
                .map(Token::Literal)
                .ok_or_else(|| Error::new(&format!("invalid numeric label '{s}'")));
        }
        let (name, mut rest) = match s.find('[') {
            Some(pos) => s.split_at(pos),
            None => (s, ""),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::new(&format!("invalid label '{s}'")));
        }
        let mut indices = vec![];
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .filter(|_| rest.starts_with('['))
                .ok_or_else(|| Error::new(&format!("unbalanced index in label '{s}'")))?;
            let index = rest[1..close]
                .trim()
                .parse()
                .map_err(|_| Error::new(&format!("invalid index in label '{s}'")))?;
            indices.push(index);
            rest = &rest[close + 1..];
        }
        Ok(Token::Field {
            name: name.to_string(),
            indices,
        })
    }
}
