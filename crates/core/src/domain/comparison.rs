use serde::{Serialize, Serializer};

/// Why an item was flagged. Both conditions are evaluated independently and combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    RankAndReviewSurge,
    RankSurge,
    ReviewSurge,
}

impl Reason {
    pub fn classify(rank_met: bool, review_met: bool) -> Option<Self> {
        match (rank_met, review_met) {
            (true, true) => Some(Self::RankAndReviewSurge),
            (true, false) => Some(Self::RankSurge),
            (false, true) => Some(Self::ReviewSurge),
            (false, false) => None,
        }
    }

    /// Ordering weight; higher sorts first.
    pub fn score(self) -> u8 {
        match self {
            Self::RankAndReviewSurge => 3,
            Self::RankSurge => 2,
            Self::ReviewSurge => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RankAndReviewSurge => "rank-and-review-surge",
            Self::RankSurge => "rank-surge",
            Self::ReviewSurge => "review-surge",
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Rank in the previous snapshot, or the off-ranking marker when the item was not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousRank {
    Ranked(u32),
    OffRanking,
}

pub const OFF_RANKING_MARKER: &str = "off-ranking";

impl Serialize for PreviousRank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ranked(rank) => serializer.serialize_u32(*rank),
            Self::OffRanking => serializer.serialize_str(OFF_RANKING_MARKER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub item_code: String,
    pub name: String,
    pub price: i64,
    pub shop_name: String,
    pub item_url: String,
    pub current_rank: u32,
    pub previous_rank: PreviousRank,
    pub current_review_count: u64,
    pub previous_review_count: u64,
    /// previous − current, with an absent item counted at `len(previous) + 1`.
    pub rank_delta: i64,
    pub review_delta: i64,
    pub reason: Reason,
    pub score: u8,
}
