use crate::time::half_day::Slot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One row of a ranking snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub rank: u32,
    pub name: String,
    pub price: i64,
    pub shop_name: String,
    pub item_code: String,
    pub item_url: String,
    pub review_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub category: String,
    pub slot: Slot,
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("duplicate item code {item_code}")]
    DuplicateItemCode { item_code: String },
    #[error("duplicate rank {rank}")]
    DuplicateRank { rank: u32 },
    #[error("rank {rank} outside 1..={len}")]
    RankOutOfRange { rank: u32, len: usize },
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item codes are unique and ranks are exactly `1..=len`.
    pub fn validate(&self) -> Result<(), StructuralError> {
        let len = self.items.len();
        let mut codes = HashSet::with_capacity(len);
        let mut ranks = vec![false; len];

        for item in &self.items {
            if !codes.insert(item.item_code.as_str()) {
                return Err(StructuralError::DuplicateItemCode {
                    item_code: item.item_code.clone(),
                });
            }

            let idx = (item.rank as usize).wrapping_sub(1);
            let Some(seen) = ranks.get_mut(idx) else {
                return Err(StructuralError::RankOutOfRange {
                    rank: item.rank,
                    len,
                });
            };
            if std::mem::replace(seen, true) {
                return Err(StructuralError::DuplicateRank { rank: item.rank });
            }
        }

        // `len` distinct ranks inside 1..=len leaves no gaps.
        Ok(())
    }
}
