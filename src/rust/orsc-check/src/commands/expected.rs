// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use orsc_links::{ExpectedCounts, LinkLayout, expected_counts};

#[derive(Parser)]
pub struct ExpectedCmd {
    /// Labelling scheme of the tables (orsc, crate)
    #[arg(long, default_value_t = LinkLayout::Orsc)]
    pub layout: LinkLayout,
}

fn format_counts(counts: &ExpectedCounts) -> String {
    counts
        .iter()
        .map(|(label, count)| format!("{label} {count}\n"))
        .collect()
}

impl ExpectedCmd {
    pub fn run(&self) -> anyhow::Result<()> {
        print!("{}", format_counts(&expected_counts(self.layout)));
        Ok(())
    }
}
