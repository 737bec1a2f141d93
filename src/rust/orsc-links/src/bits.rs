// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Trigger bits of one RCT crate and their packing into optical link words.
//!
//! Regions and electron/photon candidates are split into single bits stored
//! under the labels of a [`LinkLayout`]. A [`LinkTable`] then says which bit
//! goes into which slot of a link.
use indexmap::IndexMap;
use serde::Deserialize;

use crate::label::Token;
use crate::layout::{
    EM_CANDIDATES, EM_CARD_BITS, EM_RANK_BITS, HF_ET_BITS, HF_REGIONS, LinkLayout, RC_CARDS,
    RC_ET_BITS, RC_REGIONS, expected_counts,
};
use crate::table::LinkTable;
use crate::{Error, Result};

/// Slots per link row.
const ROW_BITS: usize = 8;
/// Rows packed into one 32-bit link word.
const ROWS_PER_WORD: usize = 4;

/// A calorimeter region as delivered by the RCT emulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Region {
    pub card: usize,
    /// Region index within the card, or the forward region index if `hf`.
    pub region: usize,
    pub et: u32,
    pub overflow: bool,
    pub tau_veto: bool,
    pub mip: bool,
    pub fine_grain: bool,
    pub hf: bool,
}

/// An electron/photon candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmCandidate {
    pub index: usize,
    pub card: usize,
    pub region: usize,
    pub rank: u32,
    pub isolated: bool,
}

/// Everything one crate contributes to its links for a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrateEvent {
    pub elec_bc0: bool,
    pub jet_bc0: bool,
    pub regions: Vec<Region>,
    pub em_candidates: Vec<EmCandidate>,
}

fn check_range(field: &'static str, value: usize, limit: usize) -> Result<()> {
    if value >= limit {
        return Err(Error::OutOfRange {
            field,
            value,
            limit,
        });
    }
    Ok(())
}

fn bit_of(value: u32, bit: usize) -> bool {
    (value >> bit) & 0x1 == 1
}

/// The bits of one crate, keyed by label.
#[derive(Debug, Clone)]
pub struct CrateBits {
    layout: LinkLayout,
    bits: IndexMap<String, bool>,
}

impl CrateBits {
    /// All labels of `layout`, cleared.
    pub fn new(layout: LinkLayout) -> Self {
        let bits = expected_counts(layout)
            .into_keys()
            .filter(|label| !label.starts_with(|c: char| c.is_ascii_digit()))
            .map(|label| (label, false))
            .collect();
        CrateBits { layout, bits }
    }

    pub fn from_event(layout: LinkLayout, event: &CrateEvent) -> Result<Self> {
        let mut out = CrateBits::new(layout);
        out.set_bc0(event.elec_bc0, event.jet_bc0);
        for region in &event.regions {
            out.add_region(region)?;
        }
        for cand in &event.em_candidates {
            out.add_em(cand)?;
        }
        Ok(out)
    }

    pub fn layout(&self) -> LinkLayout {
        self.layout
    }

    /// Labels are fixed by the layout, setting an unknown one is a no-op.
    fn set(&mut self, label: String, value: bool) {
        match self.bits.get_mut(&label) {
            Some(slot) => *slot = value,
            None => orsc_log::warn!("Label {} is not part of layout '{}'", label, self.layout),
        }
    }

    pub fn get(&self, label: &str) -> Option<bool> {
        self.bits.get(label).copied()
    }

    pub fn set_bc0(&mut self, elec: bool, jet: bool) {
        self.set("ElecBC0".to_string(), elec);
        self.set("JetBC0".to_string(), jet);
    }

    pub fn add_region(&mut self, reg: &Region) -> Result<()> {
        match (self.layout, reg.hf) {
            (LinkLayout::Orsc, true) => {
                orsc_log::debug!(
                    "Forward region {} has no slot in the oRSC layout, skipped",
                    reg.region
                );
            }
            (LinkLayout::Orsc, false) => {
                check_range("region card", reg.card, RC_CARDS)?;
                check_range("region", reg.region, RC_REGIONS)?;
                let (card, region) = (reg.card, reg.region);
                // An overflowing region saturates all energy bits.
                for bit in 0..RC_ET_BITS {
                    let value = reg.overflow || bit_of(reg.et, bit);
                    self.set(format!("RC[{card}][{region}][{bit}]"), value);
                }
                self.set(format!("RCEtId[{card}][{region}]"), !reg.mip && !reg.tau_veto);
            }
            (LinkLayout::Crate, true) => {
                check_range("forward region", reg.region, HF_REGIONS)?;
                let region = reg.region;
                self.set(format!("HFFg[{region}]"), reg.fine_grain);
                for bit in 0..HF_ET_BITS {
                    self.set(format!("HFEt[{region}][{bit}]"), bit_of(reg.et, bit));
                }
            }
            (LinkLayout::Crate, false) => {
                check_range("region card", reg.card, RC_CARDS)?;
                check_range("region", reg.region, RC_REGIONS)?;
                let (card, region) = (reg.card, reg.region);
                for bit in 0..RC_ET_BITS {
                    self.set(format!("RCEt[{card}][{region}][{bit}]"), bit_of(reg.et, bit));
                }
                self.set(format!("RCOf[{card}][{region}]"), reg.overflow);
                self.set(format!("RCTau[{card}][{region}]"), reg.tau_veto);
                self.set(format!("RCHad[{card}][{region}]"), reg.mip);
            }
        }
        Ok(())
    }

    /// Store rank and position of a candidate.
    ///
    /// Isolated candidates go to the `NE` labels, the others to `IE`.
    pub fn add_em(&mut self, cand: &EmCandidate) -> Result<()> {
        check_range("candidate index", cand.index, EM_CANDIDATES)?;
        check_range("candidate card", cand.card, RC_CARDS)?;
        check_range("candidate region", cand.region, RC_REGIONS)?;
        let family = if cand.isolated { "NE" } else { "IE" };
        let index = cand.index;
        let card = cand.card as u32;
        let region = cand.region == 1;

        match self.layout {
            LinkLayout::Orsc => {
                for bit in 0..EM_RANK_BITS {
                    self.set(format!("{family}[{index}][{bit}]"), bit_of(cand.rank, bit));
                }
                for bit in 0..EM_CARD_BITS {
                    self.set(format!("{family}Card[{index}][{bit}]"), bit_of(card, bit));
                }
                self.set(format!("{family}Reg[{index}]"), region);
            }
            LinkLayout::Crate => {
                for bit in 0..EM_RANK_BITS {
                    self.set(format!("{family}Et[{index}][{bit}]"), bit_of(cand.rank, bit));
                }
                self.set(format!("{family}Pos[{index}][0]"), region);
                for bit in 0..EM_CARD_BITS {
                    self.set(
                        format!("{family}Pos[{index}][{}]", bit + 1),
                        bit_of(card, bit),
                    );
                }
            }
        }
        Ok(())
    }

    /// Value of a table entry: the lowest bit of a constant, or the stored bit
    /// of a label.
    pub fn resolve(&self, token: &Token) -> Result<bool> {
        match token {
            Token::Literal(value) => Ok(value & 0x1 == 1),
            Token::Field { .. } => {
                let label = token.label();
                self.get(&label).ok_or(Error::UnknownLabel(label))
            }
        }
    }

    /// Pack a link table into 32-bit words, first slot in the most
    /// significant bit. Every four rows of eight slots make one word.
    pub fn link_words(&self, table: &LinkTable) -> Result<Vec<u32>> {
        let (rows, cols) = table.shape();
        let rectangular = table.rows.iter().all(|row| row.len() == ROW_BITS);
        if rows == 0 || rows % ROWS_PER_WORD != 0 || cols != ROW_BITS || !rectangular {
            return Err(Error::TableShape {
                name: table.name.clone(),
                rows,
                cols,
            });
        }

        let mut words = Vec::with_capacity(rows / ROWS_PER_WORD);
        for chunk in table.rows.chunks(ROWS_PER_WORD) {
            let mut word = 0u32;
            for token in chunk.iter().flatten() {
                word = (word << 1) | u32::from(self.resolve(token)?);
            }
            words.push(word);
        }
        Ok(words)
    }

    /// Pack every table, keeping the table order.
    pub fn encode(&self, tables: &[LinkTable]) -> Result<Vec<(String, Vec<u32>)>> {
        tables
            .iter()
            .map(|table| Ok((table.name.clone(), self.link_words(table)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_tables;

    fn fixture_tables() -> Vec<LinkTable> {
        parse_tables(
            include_str!("../tests/data/OrscLinks.cc"),
            &LinkLayout::Orsc.table_spec(),
        )
    }

    #[test]
    fn test_set_ignores_unknown_labels() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let len = bits.bits.len();
        bits.set("HFFg[0]".to_string(), true);
        bits.set("RC[0][0][0]".to_string(), true);
        assert_eq!(bits.bits.len(), len);
        assert_eq!(bits.get("HFFg[0]"), None);
        assert_eq!(bits.get("RC[0][0][0]"), Some(true));
    }

    #[test]
    fn test_new_is_cleared() {
        let bits = CrateBits::new(LinkLayout::Orsc);
        assert_eq!(bits.get("RC[6][1][9]"), Some(false));
        assert_eq!(bits.get("JetBC0"), Some(false));
        assert_eq!(bits.get("0"), None);
        assert_eq!(bits.get("HFFg[0]"), None);
    }

    #[test]
    fn test_region_energy_bits() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let reg = Region {
            card: 3,
            region: 1,
            et: 0b10_0000_0101,
            ..Default::default()
        };
        bits.add_region(&reg).unwrap();
        let et: Vec<_> = (0..RC_ET_BITS)
            .map(|bit| bits.get(&format!("RC[3][1][{bit}]")).unwrap())
            .collect();
        assert_eq!(
            et,
            vec![true, false, true, false, false, false, false, false, false, true]
        );
        assert_eq!(bits.get("RCEtId[3][1]"), Some(true));
    }

    #[test]
    fn test_region_overflow_saturates() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let reg = Region {
            card: 0,
            region: 0,
            et: 0,
            overflow: true,
            mip: true,
            ..Default::default()
        };
        bits.add_region(&reg).unwrap();
        assert!((0..RC_ET_BITS).all(|bit| bits.get(&format!("RC[0][0][{bit}]")) == Some(true)));
        assert_eq!(bits.get("RCEtId[0][0]"), Some(false));
    }

    #[test]
    fn test_region_out_of_range() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let err = bits
            .add_region(&Region {
                card: 7,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OutOfRange {
                value: 7,
                limit: 7,
                ..
            }
        ));
        let mut bits = CrateBits::new(LinkLayout::Crate);
        let reg = Region {
            region: 8,
            hf: true,
            ..Default::default()
        };
        assert!(bits.add_region(&reg).is_err());
    }

    #[test]
    fn test_em_candidate_families() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let iso = EmCandidate {
            index: 2,
            card: 5,
            region: 1,
            rank: 0b100001,
            isolated: true,
        };
        bits.add_em(&iso).unwrap();
        assert_eq!(bits.get("NE[2][0]"), Some(true));
        assert_eq!(bits.get("NE[2][5]"), Some(true));
        assert_eq!(bits.get("NE[2][1]"), Some(false));
        assert_eq!(bits.get("NECard[2][0]"), Some(true));
        assert_eq!(bits.get("NECard[2][1]"), Some(false));
        assert_eq!(bits.get("NECard[2][2]"), Some(true));
        assert_eq!(bits.get("NEReg[2]"), Some(true));
        assert_eq!(bits.get("IE[2][0]"), Some(false));

        let mut bits = CrateBits::new(LinkLayout::Crate);
        bits.add_em(&EmCandidate { isolated: false, ..iso }).unwrap();
        assert_eq!(bits.get("IEEt[2][5]"), Some(true));
        assert_eq!(bits.get("IEPos[2][0]"), Some(true));
        assert_eq!(bits.get("IEPos[2][1]"), Some(true));
        assert_eq!(bits.get("IEPos[2][2]"), Some(false));
        assert_eq!(bits.get("IEPos[2][3]"), Some(true));
        assert_eq!(bits.get("NEEt[2][5]"), Some(false));
    }

    #[test]
    fn test_crate_layout_regions() {
        let mut bits = CrateBits::new(LinkLayout::Crate);
        bits.add_region(&Region {
            region: 4,
            et: 0x81,
            fine_grain: true,
            hf: true,
            ..Default::default()
        })
        .unwrap();
        bits.add_region(&Region {
            card: 6,
            region: 1,
            et: 0x3ff,
            overflow: true,
            tau_veto: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(bits.get("HFFg[4]"), Some(true));
        assert_eq!(bits.get("HFEt[4][0]"), Some(true));
        assert_eq!(bits.get("HFEt[4][6]"), Some(false));
        assert_eq!(bits.get("HFEt[4][7]"), Some(true));
        assert_eq!(bits.get("RCEt[6][1][9]"), Some(true));
        assert_eq!(bits.get("RCOf[6][1]"), Some(true));
        assert_eq!(bits.get("RCTau[6][1]"), Some(true));
        assert_eq!(bits.get("RCHad[6][1]"), Some(false));
    }

    #[test]
    fn test_orsc_skips_forward_regions() {
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        let reg = Region {
            region: 5,
            et: 0xff,
            hf: true,
            ..Default::default()
        };
        bits.add_region(&reg).unwrap();
        assert!(bits.bits.values().all(|&bit| !bit));
    }

    #[test]
    fn test_link_words_bit_positions() {
        let tables = fixture_tables();
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        assert_eq!(bits.link_words(&tables[0]).unwrap(), vec![0, 0, 0, 0]);

        // ElecBC0 sits in the first slot of row 1 of both links.
        bits.set_bc0(true, false);
        let words = bits.encode(&tables).unwrap();
        assert_eq!(words[0], ("L1".to_string(), vec![0x0080_0000, 0, 0, 0]));
        assert_eq!(words[1], ("L2".to_string(), vec![0x0080_0000, 0, 0, 0]));

        // RCEtId[0][0] is the last slot of link 1.
        let mut bits = CrateBits::new(LinkLayout::Orsc);
        bits.add_region(&Region::default()).unwrap();
        let words = bits.link_words(&tables[0]).unwrap();
        assert_eq!(words[3], 0x0000_0001);
    }

    #[test]
    fn test_link_words_from_event() {
        let event: CrateEvent = serde_json::from_str(
            r#"{
                "jet_bc0": true,
                "regions": [{"card": 1, "region": 0, "et": 3, "mip": true}],
                "em_candidates": [{"index": 0, "rank": 63}]
            }"#,
        )
        .unwrap();
        let bits = CrateBits::from_event(LinkLayout::Orsc, &event).unwrap();
        let words = bits.link_words(&fixture_tables()[0]).unwrap();
        // row 1: JetBC0, row 2: IE[0][5..0], row 3: RC[1][0][1], RC[1][0][0]
        assert_eq!(words[0], 0x0040_3fc0);
        assert_eq!(words[1..], [0, 0, 0]);
    }

    #[test]
    fn test_link_words_errors() {
        let bits = CrateBits::new(LinkLayout::Orsc);
        let unknown = LinkTable {
            name: "L1".into(),
            line: 1,
            rows: vec![vec![Token::field("Spare", &[0]); 8]; 4],
        };
        assert!(matches!(
            bits.link_words(&unknown),
            Err(Error::UnknownLabel(label)) if label == "Spare[0]"
        ));

        let short = LinkTable {
            name: "L1".into(),
            line: 1,
            rows: vec![vec![Token::Literal(0); 8]; 3],
        };
        assert!(matches!(
            bits.link_words(&short),
            Err(Error::TableShape { rows: 3, cols: 8, .. })
        ));
    }
}
