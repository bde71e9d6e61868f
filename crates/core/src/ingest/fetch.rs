use crate::config::parse_var;
use crate::domain::category::Category;
use crate::domain::snapshot::{ItemRecord, Snapshot};
use crate::ingest::provider::RankingProvider;
use crate::time::half_day::Slot;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Upper bound on pages requested per category.
    pub pages: u32,

    /// Pause between consecutive page requests.
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            pages: 10,
            page_delay: Duration::from_secs(1),
        }
    }
}

impl FetchOptions {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let pages = parse_var("RAKUTEN_PAGES", lookup("RAKUTEN_PAGES").as_deref())?
            .unwrap_or(defaults.pages);
        let page_delay = parse_var::<u64>(
            "RAKUTEN_PAGE_DELAY_MS",
            lookup("RAKUTEN_PAGE_DELAY_MS").as_deref(),
        )?
        .map(Duration::from_millis)
        .unwrap_or(defaults.page_delay);

        Ok(Self { pages, page_delay })
    }
}

/// Pages through a category's ranking and numbers items by arrival order.
///
/// Stops at the first empty page. A page that still fails after the provider's own retries
/// ends pagination and keeps what was collected so far. Returns `None` when nothing arrived.
pub async fn fetch_snapshot(
    provider: &dyn RankingProvider,
    category: &Category,
    slot: Slot,
    opts: &FetchOptions,
) -> anyhow::Result<Option<Snapshot>> {
    anyhow::ensure!(opts.pages >= 1, "RAKUTEN_PAGES must be >= 1");

    let mut items: Vec<ItemRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates: usize = 0;

    for page in 1..=opts.pages {
        if page != 1 && !opts.page_delay.is_zero() {
            tokio::time::sleep(opts.page_delay).await;
        }

        let batch = match provider.fetch_page(&category.genre_id, page).await {
            Ok(batch) => batch,
            Err(err) => {
                tracing::warn!(
                    category = %category.name,
                    page,
                    error = %err,
                    "ranking page fetch failed; stopping pagination"
                );
                break;
            }
        };

        if batch.is_empty() {
            tracing::info!(category = %category.name, page, "empty ranking page; stopping");
            break;
        }

        for ranked in batch {
            // Rankings can shift between page requests and repeat an item.
            if !seen.insert(ranked.item_code.clone()) {
                duplicates += 1;
                continue;
            }
            items.push(ItemRecord {
                rank: items.len() as u32 + 1,
                name: ranked.item_name,
                price: ranked.item_price,
                shop_name: ranked.shop_name,
                item_code: ranked.item_code,
                item_url: ranked.item_url,
                review_count: ranked.review_count,
            });
        }

        tracing::info!(
            category = %category.name,
            page,
            pages = opts.pages,
            items = items.len(),
            "ranking fetch progress"
        );
    }

    if duplicates > 0 {
        tracing::warn!(category = %category.name, duplicates, "dropped repeated item codes");
    }

    if items.is_empty() {
        return Ok(None);
    }

    Ok(Some(Snapshot {
        category: category.name.clone(),
        slot,
        items,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::RankedItem;
    use crate::time::half_day::Half;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct FakeProvider {
        pages: Vec<anyhow::Result<Vec<RankedItem>>>,
        requested: Mutex<Vec<(String, u32)>>,
    }

    impl FakeProvider {
        fn new(pages: Vec<anyhow::Result<Vec<RankedItem>>>) -> Self {
            Self {
                pages,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RankingProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_page(&self, genre_id: &str, page: u32) -> anyhow::Result<Vec<RankedItem>> {
            self.requested
                .lock()
                .unwrap()
                .push((genre_id.to_string(), page));
            match self.pages.get(page as usize - 1) {
                Some(Ok(items)) => Ok(items.clone()),
                Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
                None => Ok(Vec::new()),
            }
        }
    }

    fn ranked(code: &str, reviews: u64) -> RankedItem {
        RankedItem {
            item_code: code.to_string(),
            item_name: format!("name {code}"),
            item_price: 500,
            shop_name: "shop".to_string(),
            item_url: format!("https://example.test/{code}"),
            review_count: reviews,
        }
    }

    fn category() -> Category {
        Category {
            name: "sweets".to_string(),
            genre_id: "100283".to_string(),
        }
    }

    fn slot() -> Slot {
        Slot::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), Half::Am)
    }

    fn opts(pages: u32) -> FetchOptions {
        FetchOptions {
            pages,
            page_delay: Duration::ZERO,
        }
    }

    #[test]
    fn options_read_pages_and_delay() {
        let out = FetchOptions::from_lookup(|key| match key {
            "RAKUTEN_PAGES" => Some("3".to_string()),
            "RAKUTEN_PAGE_DELAY_MS" => Some("250".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(out.pages, 3);
        assert_eq!(out.page_delay, Duration::from_millis(250));

        let defaults = FetchOptions::from_lookup(|_| None).unwrap();
        assert_eq!(defaults.pages, 10);
        assert_eq!(defaults.page_delay, Duration::from_secs(1));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let err = FetchOptions::from_lookup(|key| {
            (key == "RAKUTEN_PAGES").then(|| "ten".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("RAKUTEN_PAGES"));

        let err = FetchOptions::from_lookup(|key| {
            (key == "RAKUTEN_PAGE_DELAY_MS").then(|| "1s".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("RAKUTEN_PAGE_DELAY_MS"));
    }

    #[tokio::test]
    async fn ranks_by_arrival_order_across_pages() {
        let provider = FakeProvider::new(vec![
            Ok(vec![ranked("a", 10), ranked("b", 9)]),
            Ok(vec![ranked("c", 8)]),
        ]);

        let snapshot = fetch_snapshot(&provider, &category(), slot(), &opts(10))
            .await
            .unwrap()
            .unwrap();

        let ranks: Vec<_> = snapshot
            .items
            .iter()
            .map(|i| (i.item_code.as_str(), i.rank))
            .collect();
        assert_eq!(ranks, [("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(snapshot.validate(), Ok(()));

        // Third page came back empty and ended pagination.
        let requested = provider.requested.lock().unwrap().clone();
        assert_eq!(requested.len(), 3);
        assert!(requested.iter().all(|(g, _)| g == "100283"));
    }

    #[tokio::test]
    async fn respects_page_limit() {
        let provider = FakeProvider::new(vec![
            Ok(vec![ranked("a", 1)]),
            Ok(vec![ranked("b", 1)]),
            Ok(vec![ranked("c", 1)]),
        ]);

        let snapshot = fetch_snapshot(&provider, &category(), slot(), &opts(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(provider.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_pages() {
        let provider = FakeProvider::new(vec![
            Ok(vec![ranked("a", 1)]),
            Err(anyhow::anyhow!("HTTP 429")),
            Ok(vec![ranked("c", 1)]),
        ]);

        let snapshot = fetch_snapshot(&provider, &category(), slot(), &opts(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn repeated_codes_do_not_consume_a_rank() {
        let provider = FakeProvider::new(vec![
            Ok(vec![ranked("a", 1), ranked("b", 1)]),
            Ok(vec![ranked("b", 1), ranked("c", 1)]),
        ]);

        let snapshot = fetch_snapshot(&provider, &category(), slot(), &opts(10))
            .await
            .unwrap()
            .unwrap();
        let codes: Vec<_> = snapshot.items.iter().map(|i| i.item_code.as_str()).collect();
        assert_eq!(codes, ["a", "b", "c"]);
        assert_eq!(snapshot.items[2].rank, 3);
    }

    #[tokio::test]
    async fn nothing_fetched_yields_no_snapshot() {
        let provider = FakeProvider::new(vec![]);
        let out = fetch_snapshot(&provider, &category(), slot(), &opts(10))
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
