// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::process::exit;

use clap::{Parser, Subcommand};

mod commands;
use commands::check::CheckCmd;
use commands::encode::EncodeCmd;
use commands::expected::ExpectedCmd;

/// Check and encode the oRSC optical link bitfield tables.
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count the bit labels of the link tables in a source file
    Check(CheckCmd),
    /// Print the required count of every bit label
    Expected(ExpectedCmd),
    /// Pack the bits of one crate into link words
    Encode(EncodeCmd),
}

fn main() {
    let cli = Cli::parse();
    orsc_log::init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Check(args) => args.run(),
        Commands::Expected(args) => args.run(),
        Commands::Encode(args) => args.run(),
    };

    if let Err(e) = result {
        orsc_log::error!("{:#}", e);
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use orsc_links::LinkLayout;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["orsc-check", "check", "src/OrscLinks.cc"]).unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.path.to_str(), Some("src/OrscLinks.cc"));
                assert_eq!(args.layout, LinkLayout::Orsc);
            }
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn test_parse_layout_and_verbosity() {
        let cli = Cli::try_parse_from([
            "orsc-check",
            "encode",
            "links.cc",
            "--events",
            "event.json",
            "--layout",
            "crate",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.layout, LinkLayout::Crate);
                assert_eq!(args.events.to_str(), Some("event.json"));
            }
            _ => panic!("expected encode command"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        assert!(
            Cli::try_parse_from(["orsc-check", "expected", "--layout", "gct"]).is_err()
        );
        assert!(Cli::try_parse_from(["orsc-check", "check"]).is_err());
    }
}
