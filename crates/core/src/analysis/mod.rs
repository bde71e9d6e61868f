use crate::domain::comparison::{ComparisonRow, PreviousRank, Reason};
use crate::domain::snapshot::{ItemRecord, Snapshot, StructuralError};
use crate::time::half_day::Slot;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_RANK_CHANGE_THRESHOLD: i64 = 5;
pub const DEFAULT_REVIEW_INCREASE_THRESHOLD: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub rank_change: i64,
    pub review_increase: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rank_change: DEFAULT_RANK_CHANGE_THRESHOLD,
            review_increase: DEFAULT_REVIEW_INCREASE_THRESHOLD,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{category} snapshot for {slot} is malformed: {source}")]
    Malformed {
        category: String,
        slot: Slot,
        #[source]
        source: StructuralError,
    },
    #[error("cannot compare different categories: {current} vs {previous}")]
    CategoryMismatch { current: String, previous: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub category: String,
    pub current: Slot,
    pub previous: Slot,
    pub rows: Vec<ComparisonRow>,
    pub summary: String,
}

/// Aligns `current` against `previous` by item code and keeps the rows that moved past either
/// threshold, ordered by (score desc, rank delta desc) with ties left in current-rank order.
pub fn analyze(
    current: &Snapshot,
    previous: &Snapshot,
    thresholds: Thresholds,
) -> Result<Analysis, AnalysisError> {
    if current.category != previous.category {
        return Err(AnalysisError::CategoryMismatch {
            current: current.category.clone(),
            previous: previous.category.clone(),
        });
    }
    for snapshot in [current, previous] {
        snapshot
            .validate()
            .map_err(|source| AnalysisError::Malformed {
                category: snapshot.category.clone(),
                slot: snapshot.slot,
                source,
            })?;
    }

    let previous_by_code: HashMap<&str, &ItemRecord> = previous
        .items
        .iter()
        .map(|item| (item.item_code.as_str(), item))
        .collect();
    let off_ranking_rank = previous.len() as i64 + 1;

    let mut aligned: Vec<&ItemRecord> = current.items.iter().collect();
    aligned.sort_by_key(|item| item.rank);

    let mut rows: Vec<ComparisonRow> = aligned
        .into_iter()
        .filter_map(|item| {
            let before = previous_by_code.get(item.item_code.as_str()).copied();
            let previous_rank = before.map_or(off_ranking_rank, |b| i64::from(b.rank));
            let previous_review_count = before.map_or(0, |b| b.review_count);

            let rank_delta = previous_rank - i64::from(item.rank);
            let review_delta = item.review_count as i64 - previous_review_count as i64;

            let reason = Reason::classify(
                rank_delta >= thresholds.rank_change,
                review_delta >= thresholds.review_increase,
            )?;

            Some(ComparisonRow {
                item_code: item.item_code.clone(),
                name: item.name.clone(),
                price: item.price,
                shop_name: item.shop_name.clone(),
                item_url: item.item_url.clone(),
                current_rank: item.rank,
                previous_rank: before.map_or(PreviousRank::OffRanking, |b| {
                    PreviousRank::Ranked(b.rank)
                }),
                current_review_count: item.review_count,
                previous_review_count,
                rank_delta,
                review_delta,
                reason,
                score: reason.score(),
            })
        })
        .collect();

    // Stable: equal keys keep alignment order.
    rows.sort_by_key(|row| (Reverse(row.score), Reverse(row.rank_delta)));

    let summary = if rows.is_empty() {
        format!(
            "No notable movement in {} between {} and {}",
            current.category, previous.slot, current.slot
        )
    } else {
        format!(
            "Compared {}: {} -> {}",
            current.category, previous.slot, current.slot
        )
    };

    tracing::debug!(
        category = %current.category,
        current = %current.slot,
        previous = %previous.slot,
        current_len = current.len(),
        previous_len = previous.len(),
        hot_items = rows.len(),
        "hot item analysis complete"
    );

    Ok(Analysis {
        category: current.category.clone(),
        current: current.slot,
        previous: previous.slot,
        rows,
        summary,
    })
}
