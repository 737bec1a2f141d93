// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Link table layouts and the number of times each bit label must appear.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::{Error, Result};

/// Number of regional calorimeter cards per crate.
pub const RC_CARDS: usize = 7;
/// Regions per card.
pub const RC_REGIONS: usize = 2;
/// Transverse energy bits of a region.
pub const RC_ET_BITS: usize = 10;
/// Electron/photon candidates per isolation class.
pub const EM_CANDIDATES: usize = 4;
/// Rank bits of an electron/photon candidate.
pub const EM_RANK_BITS: usize = 6;
/// Card bits of an electron/photon candidate position.
pub const EM_CARD_BITS: usize = 3;
/// Forward calorimeter regions per crate.
pub const HF_REGIONS: usize = 8;
/// Transverse energy bits of a forward region.
pub const HF_ET_BITS: usize = 8;

/// Label → required occurrence count, in generation order.
pub type ExpectedCounts = IndexMap<String, usize>;

/// The labelling scheme and table set of a generated link source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkLayout {
    /// Two links per crate, as declared by `OrscLinks::populate_link_tables`.
    #[default]
    Orsc,
    /// Three links per crate with separate region flags and forward regions.
    Crate,
}

/// What a table declaration of a layout looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub element_type: &'static str,
    pub names: &'static [&'static str],
    pub rows: usize,
    pub cols: usize,
}

impl TableSpec {
    pub fn matches(&self, element_type: &str, name: &str, dims: &[usize]) -> bool {
        element_type == self.element_type
            && self.names.iter().any(|n| *n == name)
            && dims == [self.rows, self.cols]
    }

    /// Total number of slots over all tables.
    pub fn capacity(&self) -> usize {
        self.names.len() * self.rows * self.cols
    }
}

impl LinkLayout {
    pub fn table_spec(&self) -> TableSpec {
        match self {
            LinkLayout::Orsc => TableSpec {
                element_type: "uint8_t",
                names: &["L1", "L2"],
                rows: 16,
                cols: 8,
            },
            LinkLayout::Crate => TableSpec {
                element_type: "uint8_t",
                names: &["L1", "L2", "L3"],
                rows: 16,
                cols: 8,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkLayout::Orsc => "orsc",
            LinkLayout::Crate => "crate",
        }
    }
}

impl Display for LinkLayout {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "orsc" => Ok(LinkLayout::Orsc),
            "crate" => Ok(LinkLayout::Crate),
            other => Err(Error::new(&format!(
                "unknown link layout '{other}', expected 'orsc' or 'crate'"
            ))),
        }
    }
}

/// Generate the bit labels of `layout` and the number of times each must
/// occur over all link tables.
pub fn expected_counts(layout: LinkLayout) -> ExpectedCounts {
    match layout {
        LinkLayout::Orsc => orsc_counts(),
        LinkLayout::Crate => crate_counts(),
    }
}

fn orsc_counts() -> ExpectedCounts {
    let mut out = ExpectedCounts::new();
    out.insert("0".to_string(), 18);
    out.insert("ElecBC0".to_string(), 2);
    out.insert("JetBC0".to_string(), 2);

    for card in 0..RC_CARDS {
        for region in 0..RC_REGIONS {
            out.insert(format!("RCEtId[{card}][{region}]"), 1);
            for bit in 0..RC_ET_BITS {
                out.insert(format!("RC[{card}][{region}][{bit}]"), 1);
            }
        }
    }

    for index in 0..EM_CANDIDATES {
        out.insert(format!("IEReg[{index}]"), 1);
        out.insert(format!("NEReg[{index}]"), 1);
        for bit in 0..EM_CARD_BITS {
            out.insert(format!("IECard[{index}][{bit}]"), 1);
            out.insert(format!("NECard[{index}][{bit}]"), 1);
        }
        for bit in 0..EM_RANK_BITS {
            out.insert(format!("IE[{index}][{bit}]"), 1);
            out.insert(format!("NE[{index}][{bit}]"), 1);
        }
    }
    out
}

fn crate_counts() -> ExpectedCounts {
    let mut out = ExpectedCounts::new();
    out.insert("0".to_string(), 44);
    out.insert("ElecBC0".to_string(), 3);
    out.insert("JetBC0".to_string(), 3);

    for card in 0..RC_CARDS {
        for region in 0..RC_REGIONS {
            out.insert(format!("RCOf[{card}][{region}]"), 1);
            out.insert(format!("RCTau[{card}][{region}]"), 1);
            out.insert(format!("RCHad[{card}][{region}]"), 1);
            for bit in 0..RC_ET_BITS {
                out.insert(format!("RCEt[{card}][{region}][{bit}]"), 1);
            }
        }
    }

    for region in 0..HF_REGIONS {
        out.insert(format!("HFFg[{region}]"), 1);
        for bit in 0..HF_ET_BITS {
            out.insert(format!("HFEt[{region}][{bit}]"), 1);
        }
    }

    // Position bit 0 is the region, the card follows.
    for index in 0..EM_CANDIDATES {
        for bit in 0..EM_RANK_BITS {
            out.insert(format!("IEEt[{index}][{bit}]"), 1);
            out.insert(format!("NEEt[{index}][{bit}]"), 1);
        }
        for bit in 0..=EM_CARD_BITS {
            out.insert(format!("IEPos[{index}][{bit}]"), 1);
            out.insert(format!("NEPos[{index}][{bit}]"), 1);
        }
    }
    out
}
