use crate::analysis::{analyze, Analysis, AnalysisError, Thresholds};
use crate::store::{SnapshotError, SnapshotStore};
use crate::time::half_day::{resolve_slots, Slot, SlotPair};
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HotItemsError {
    #[error("no comparison available for {category}: {slot} snapshot is missing")]
    MissingSnapshot { category: String, slot: Slot },
    #[error(transparent)]
    Store(SnapshotError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

impl From<SnapshotError> for HotItemsError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::NotFound { category, slot } => Self::MissingSnapshot { category, slot },
            other => Self::Store(other),
        }
    }
}

impl HotItemsError {
    /// Text shown to a person in place of results.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingSnapshot { category, slot } => {
                format!("No comparison data available for {category} ({slot}) yet.")
            }
            Self::Store(err) => format!("Could not read ranking data: {err}"),
            Self::Analysis(err) => format!("An error occurred during analysis: {err}"),
        }
    }

    /// Expected outcomes that need no alerting.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::MissingSnapshot { .. })
    }
}

/// Compares the half-day slot containing `now` against the slot before it.
pub fn hot_items(
    store: &dyn SnapshotStore,
    category: &str,
    now: NaiveDateTime,
    thresholds: Thresholds,
) -> Result<Analysis, HotItemsError> {
    hot_items_for_slots(store, category, resolve_slots(now), thresholds)
}

pub fn hot_items_for_slots(
    store: &dyn SnapshotStore,
    category: &str,
    slots: SlotPair,
    thresholds: Thresholds,
) -> Result<Analysis, HotItemsError> {
    let current = store.load(category, slots.current)?;
    let previous = store.load(category, slots.previous)?;

    let analysis = analyze(&current, &previous, thresholds)?;
    tracing::info!(
        category,
        current = %slots.current,
        previous = %slots.previous,
        hot_items = analysis.rows.len(),
        "hot items computed"
    );
    Ok(analysis)
}
