// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::Parser;
use orsc_links::{LinkLayout, Report, check_file};

#[derive(Parser)]
pub struct CheckCmd {
    /// Source file declaring the link tables, e.g. src/OrscLinks.cc
    pub path: PathBuf,

    /// Labelling scheme of the tables (orsc, crate)
    #[arg(long, default_value_t = LinkLayout::Orsc)]
    pub layout: LinkLayout,
}

impl CheckCmd {
    fn report(&self) -> anyhow::Result<Report> {
        orsc_log::info!("Checking {} ({})", self.path.display(), self.layout);
        Ok(check_file(&self.path, self.layout)?)
    }

    /// Print the check report.
    ///
    /// Findings are part of the report and do not fail the command, only an
    /// unreadable file does.
    pub fn run(&self) -> anyhow::Result<()> {
        print!("{}", self.report()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../orsc-links/tests/data/OrscLinks.cc"
    );

    #[test]
    fn test_findings_do_not_fail_the_command() {
        let cmd = CheckCmd {
            path: PathBuf::from(FIXTURE),
            layout: LinkLayout::Crate,
        };
        let report = cmd.report().unwrap();
        assert!(!report.is_clean());
        let text = report.to_string();
        assert!(text.contains("Mismatch: 0 18\n"), "{text}");
        assert!(text.contains("Missing: RCEt[0][0][0]\n"));
        assert!(!text.contains("No Errors Found"));
        assert!(cmd.run().is_ok());
    }

    #[test]
    fn test_clean_report() {
        let cmd = CheckCmd {
            path: PathBuf::from(FIXTURE),
            layout: LinkLayout::Orsc,
        };
        assert_eq!(cmd.report().unwrap().to_string(), "No Errors Found\n");
        assert!(cmd.run().is_ok());
    }

    #[test]
    fn test_unreadable_file_fails() {
        let cmd = CheckCmd {
            path: PathBuf::from("does/not/exist.cc"),
            layout: LinkLayout::Orsc,
        };
        assert!(cmd.run().is_err());
    }
}
