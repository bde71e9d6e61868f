use crate::config::Settings;
use crate::ingest::types::{ItemSearchResponse, RankedItem};
use anyhow::{Context, Result};
use std::time::Duration;

const ITEM_SEARCH_URL: &str = "https://app.rakuten.co.jp/services/api/IchibaItem/Search/20220601";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_SORT: &str = "+reviewCount";
pub const HITS_PER_PAGE: u32 = 30;

#[async_trait::async_trait]
pub trait RankingProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// One 1-based page of a genre's ranking. An empty page means the ranking is exhausted.
    async fn fetch_page(&self, genre_id: &str, page: u32) -> Result<Vec<RankedItem>>;
}

#[derive(Debug, Clone)]
pub struct RakutenClient {
    http: reqwest::Client,
    base_url: String,
    application_id: String,
    sort: String,
    retries: u32,
}

impl RakutenClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let application_id = settings.require_rakuten_app_id()?.to_string();

        let timeout_secs = std::env::var("RAKUTEN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("RAKUTEN_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let sort = std::env::var("RAKUTEN_SORT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SORT.to_string());

        let base_url = std::env::var("RAKUTEN_ITEM_SEARCH_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| ITEM_SEARCH_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build rakuten http client")?;

        Ok(Self {
            http,
            base_url,
            application_id,
            sort,
            retries,
        })
    }

    fn query(&self, genre_id: &str, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("applicationId", self.application_id.clone()),
            ("format", "json".to_string()),
            ("genreId", genre_id.to_string()),
            ("sort", self.sort.clone()),
            ("page", page.to_string()),
            ("hits", HITS_PER_PAGE.to_string()),
        ]
    }

    async fn fetch_once(&self, genre_id: &str, page: u32) -> Result<Vec<RankedItem>> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&self.query(genre_id, page))
            .send()
            .await
            .context("rakuten request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read rakuten response")?;

        if !status.is_success() {
            anyhow::bail!("rakuten HTTP {status}: {text}");
        }

        parse_page(&text)
    }
}

#[async_trait::async_trait]
impl RankingProvider for RakutenClient {
    fn provider_name(&self) -> &'static str {
        "rakuten_item_search"
    }

    async fn fetch_page(&self, genre_id: &str, page: u32) -> Result<Vec<RankedItem>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(genre_id, page).await {
                Ok(items) => return Ok(items),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(genre_id, page, attempt, ?backoff, error = %err, "rakuten fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

pub fn parse_page(text: &str) -> Result<Vec<RankedItem>> {
    let parsed = serde_json::from_str::<ItemSearchResponse>(text)
        .with_context(|| format!("failed to parse rakuten item search response: {text}"))?;
    Ok(parsed.items.into_iter().map(|e| e.item).collect())
}
