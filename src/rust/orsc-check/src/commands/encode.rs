// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use orsc_links::{CrateBits, CrateEvent, LinkLayout, parse_tables};

#[derive(Parser)]
pub struct EncodeCmd {
    /// Source file declaring the link tables
    pub path: PathBuf,

    /// JSON file with the BC0 flags, regions and EM candidates of one crate
    #[arg(short, long)]
    pub events: PathBuf,

    /// Labelling scheme of the tables (orsc, crate)
    #[arg(long, default_value_t = LinkLayout::Orsc)]
    pub layout: LinkLayout,
}

fn format_words(name: &str, words: &[u32]) -> String {
    let words: Vec<_> = words.iter().map(|word| format!("0x{word:08x}")).collect();
    format!("{name}: {}", words.join(" "))
}

impl EncodeCmd {
    pub fn run(&self) -> anyhow::Result<()> {
        let source = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read '{}'", self.path.display()))?;
        let tables = parse_tables(&source, &self.layout.table_spec());
        if tables.is_empty() {
            bail!(
                "No link tables for layout '{}' in '{}'",
                self.layout,
                self.path.display()
            );
        }

        let event = std::fs::read_to_string(&self.events)
            .with_context(|| format!("Failed to read '{}'", self.events.display()))?;
        let event: CrateEvent = serde_json::from_str(&event)
            .with_context(|| format!("Invalid event file '{}'", self.events.display()))?;
        orsc_log::info!(
            "Encoding {} region(s) and {} EM candidate(s)",
            event.regions.len(),
            event.em_candidates.len()
        );

        let bits = CrateBits::from_event(self.layout, &event)?;
        for (name, words) in bits.encode(&tables)? {
            println!("{}", format_words(&name, &words));
        }
        Ok(())
    }
}
