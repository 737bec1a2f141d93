// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Comparison of the labels found in link tables against the expected counts.
//!
//! Only the number of occurrences of each label is checked, not where in the
//! tables a label sits.
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;

use crate::Result;
use crate::label::Token;
use crate::layout::{ExpectedCounts, LinkLayout, expected_counts};
use crate::table::{LinkTable, parse_tables};

/// Label → observed occurrence count, in order of first appearance.
pub type ActualCounts = IndexMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// The label does not occur at all.
    Missing { label: String },
    /// The label occurs, but not as often as required.
    Mismatch { label: String, actual: usize },
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Missing { label } => write!(f, "Missing: {label}"),
            Finding::Mismatch { label, actual } => write!(f, "Mismatch: {label} {actual}"),
        }
    }
}

/// Result of checking a set of link tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    findings: Vec<Finding>,
}

impl Report {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// The report as printed, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        if self.is_clean() {
            return vec!["No Errors Found".to_string()];
        }
        self.findings.iter().map(ToString::to_string).collect()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn tally<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> ActualCounts {
    let mut out = ActualCounts::new();
    for token in tokens {
        *out.entry(token.label()).or_default() += 1;
    }
    out
}

/// Compare counts label by label, in the order of `expected`.
///
/// Labels that only appear in `actual` are not reported.
pub fn compare(expected: &ExpectedCounts, actual: &ActualCounts) -> Report {
    let mut findings = vec![];
    for (label, &required) in expected {
        match actual.get(label) {
            None => findings.push(Finding::Missing {
                label: label.clone(),
            }),
            Some(&found) if found != required => {
                orsc_log::diagnostic!("{}: expected {}, found {}", label, required, found);
                findings.push(Finding::Mismatch {
                    label: label.clone(),
                    actual: found,
                });
            }
            Some(_) => {}
        }
    }
    for (label, count) in actual {
        if !expected.contains_key(label) {
            orsc_log::diagnostic!("Ignoring unexpected label {} ({} times)", label, count);
        }
    }
    Report { findings }
}

/// Check already extracted tables against the counts of `layout`.
pub fn check_tables(tables: &[LinkTable], layout: LinkLayout) -> Report {
    let actual = tally(tables.iter().flat_map(LinkTable::entries));
    let expected = expected_counts(layout);
    for (label, count) in &actual {
        orsc_log::diagnostic!("{}: {}", label, count);
    }
    let report = compare(&expected, &actual);
    orsc_log::info!(
        "Checked {} labels from {} table(s) against layout '{}': {} finding(s)",
        expected.len(),
        tables.len(),
        layout,
        report.findings().len()
    );
    report
}

/// Extract the tables of `layout` from source text and check them.
///
/// Never fails: a source without any matching table, or with a malformed
/// one, reports the labels of the lost tables as missing or mismatched.
pub fn check_source(source: &str, layout: LinkLayout) -> Report {
    let tables = parse_tables(source, &layout.table_spec());
    if tables.is_empty() {
        orsc_log::warn!("No link tables found for layout '{}'", layout);
    }
    check_tables(&tables, layout)
}

pub fn check_file(path: impl AsRef<Path>, layout: LinkLayout) -> Result<Report> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read link table source '{}'", path.display()))?;
    Ok(check_source(&source, layout))
}
