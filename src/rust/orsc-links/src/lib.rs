// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Bitfield tables of the oRSC optical links.
//!
//! A generated source file declares one `uint8_t` table per link whose entries
//! name the RCT bits carried in each slot. This crate knows the expected
//! content of those tables, parses them back out of the source and checks
//! them, and packs the bits of one crate into link words.

pub mod bits;
pub mod check;
pub mod label;
pub mod layout;
pub mod table;

pub use bits::{CrateBits, CrateEvent, EmCandidate, Region};
pub use check::{
    ActualCounts, Finding, Report, check_file, check_source, check_tables, compare, tally,
};
pub use label::Token;
pub use layout::{ExpectedCounts, LinkLayout, TableSpec, expected_counts};
pub use table::{LinkTable, parse_tables};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{field} index {value} out of range (limit {limit})")]
    OutOfRange {
        field: &'static str,
        value: usize,
        limit: usize,
    },

    #[error("label '{0}' has no bit in this layout")]
    UnknownLabel(String),

    #[error("table '{name}' has shape {rows}x{cols}, cannot pack into 32-bit link words")]
    TableShape {
        name: String,
        rows: usize,
        cols: usize,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new(msg: &str) -> Self {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
