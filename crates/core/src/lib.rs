pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod service;
pub mod store;
pub mod time;

pub mod config {
    use crate::analysis::Thresholds;
    use crate::domain::category::CategoryCatalog;
    use crate::time::half_day::{utc_offset_hours, DEFAULT_UTC_OFFSET_HOURS};
    use anyhow::Context;
    use chrono::FixedOffset;
    use std::path::PathBuf;
    use std::str::FromStr;

    const DEFAULT_DATA_DIR: &str = "/data";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_dir: PathBuf,
        pub rakuten_app_id: Option<String>,
        pub sentry_dsn: Option<String>,
        pub categories: CategoryCatalog,
        pub thresholds: Thresholds,
        /// Wall clock used to decide the current half-day slot.
        pub utc_offset: FixedOffset,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let categories = match std::env::var("HOTRANK_CATEGORIES") {
                Ok(s) if !s.trim().is_empty() => {
                    CategoryCatalog::parse(&s).context("invalid HOTRANK_CATEGORIES")?
                }
                _ => CategoryCatalog::default(),
            };

            let defaults = Thresholds::default();
            let thresholds = Thresholds {
                rank_change: parse_env("HOTRANK_RANK_CHANGE_THRESHOLD")?
                    .unwrap_or(defaults.rank_change),
                review_increase: parse_env("HOTRANK_REVIEW_INCREASE_THRESHOLD")?
                    .unwrap_or(defaults.review_increase),
            };

            let utc_offset = utc_offset_hours(
                parse_env("HOTRANK_UTC_OFFSET_HOURS")?.unwrap_or(DEFAULT_UTC_OFFSET_HOURS),
            )
            .context("invalid HOTRANK_UTC_OFFSET_HOURS")?;

            Ok(Self {
                data_dir: std::env::var("HOTRANK_DATA_DIR")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                rakuten_app_id: std::env::var("RAKUTEN_APP_ID").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                categories,
                thresholds,
                utc_offset,
            })
        }

        pub fn require_rakuten_app_id(&self) -> anyhow::Result<&str> {
            self.rakuten_app_id
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("RAKUTEN_APP_ID is required")
        }
    }

    pub(crate) fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        parse_var(key, std::env::var(key).ok().as_deref())
    }

    /// Unset or blank is `None`; anything else must parse.
    pub(crate) fn parse_var<T>(key: &str, value: Option<&str>) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match value {
            Some(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("invalid {key}: {s}")),
            _ => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn blank_or_missing_values_fall_back() {
            assert_eq!(parse_var::<i64>("K", None).unwrap(), None);
            assert_eq!(parse_var::<i64>("K", Some("  ")).unwrap(), None);
            assert_eq!(parse_var::<i64>("K", Some(" 7 ")).unwrap(), Some(7));
        }

        #[test]
        fn typos_are_errors_naming_the_key() {
            let err = parse_var::<u32>("RAKUTEN_PAGES", Some("1O")).unwrap_err();
            assert!(err.to_string().contains("RAKUTEN_PAGES"));
        }
    }
}
