use anyhow::Context;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Slots follow the ranking source's wall clock (JST), not the host's local time zone.
// Override with HOTRANK_UTC_OFFSET_HOURS.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

const NOON_HOUR: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Half {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl Half {
    pub fn of_hour(hour: u32) -> Self {
        if hour < NOON_HOUR {
            Self::Am
        } else {
            Self::Pm
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Half {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Self::Am),
            "PM" => Ok(Self::Pm),
            other => anyhow::bail!("invalid half-of-day '{other}', expected AM or PM"),
        }
    }
}

/// One half-day capture instant: the key a snapshot is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub half: Half,
}

impl Slot {
    pub fn new(date: NaiveDate, half: Half) -> Self {
        Self { date, half }
    }

    pub fn containing(now: NaiveDateTime) -> Self {
        Self {
            date: now.date(),
            half: Half::of_hour(now.hour()),
        }
    }

    /// The chronologically closest prior slot.
    pub fn previous(self) -> Self {
        match self.half {
            Half::Pm => Self::new(self.date, Half::Am),
            Half::Am => Self::new(self.date - Duration::days(1), Half::Pm),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.half)
    }
}

/// Parses `YYYY-MM-DD-AM` / `YYYY-MM-DD-PM` (a space works as the separator too).
impl FromStr for Slot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        anyhow::ensure!(
            s.is_ascii() && s.len() == 13,
            "invalid slot '{s}', expected YYYY-MM-DD-AM or YYYY-MM-DD-PM"
        );
        let (date, half) = s.split_at(10);
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid slot date in '{s}'"))?;
        let half = half
            .strip_prefix(['-', ' '])
            .with_context(|| format!("invalid slot separator in '{s}'"))?
            .parse()?;
        Ok(Self { date, half })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPair {
    pub current: Slot,
    pub previous: Slot,
}

impl SlotPair {
    pub fn ending_at(current: Slot) -> Self {
        Self {
            current,
            previous: current.previous(),
        }
    }
}

/// Current half-day slot for `now` and the slot immediately before it.
pub fn resolve_slots(now: NaiveDateTime) -> SlotPair {
    SlotPair::ending_at(Slot::containing(now))
}

pub fn utc_offset_hours(hours: i32) -> anyhow::Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("invalid UTC offset: {hours} hours"))
}

/// Wall-clock time at `offset` that slot resolution runs on.
pub fn local_now(now_utc: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    now_utc.with_timezone(&offset).naive_local()
}
