use anyhow::Context;
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use hotrank_core::config::Settings;
use hotrank_core::domain::category::Category;
use hotrank_core::ingest::fetch::{fetch_snapshot, FetchOptions};
use hotrank_core::ingest::provider::{RakutenClient, RankingProvider};
use hotrank_core::service::hot_items_for_slots;
use hotrank_core::store::{FileSnapshotStore, SnapshotStore};
use hotrank_core::time::half_day::{local_now, Slot, SlotPair};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "hotrank_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the ranking of each category and save it as a half-day snapshot.
    Fetch {
        /// Category name to fetch (repeatable). Defaults to every configured category.
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Slot to store under (YYYY-MM-DD-AM|PM). Defaults to the current half-day.
        #[arg(long)]
        slot: Option<String>,

        /// Fetch but do not write snapshot files.
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare a slot with the one before it and print the hot items as JSON.
    Analyze {
        /// Defaults to the first configured category.
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        slot: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let store = FileSnapshotStore::new(&settings.data_dir);

    match args.command {
        Command::Fetch {
            categories,
            slot,
            dry_run,
        } => {
            let slot = resolve_slot(slot.as_deref(), settings.utc_offset)?;
            let categories = select_categories(&settings, &categories)?;
            run_fetch(&settings, &store, &categories, slot, dry_run).await
        }
        Command::Analyze { category, slot } => {
            let slot = resolve_slot(slot.as_deref(), settings.utc_offset)?;
            let category = match category {
                Some(name) => select_categories(&settings, &[name])?.remove(0),
                None => settings.categories.default_category().clone(),
            };
            run_analyze(&settings, &store, &category, slot)
        }
    }
}

async fn run_fetch(
    settings: &Settings,
    store: &FileSnapshotStore,
    categories: &[Category],
    slot: Slot,
    dry_run: bool,
) -> anyhow::Result<()> {
    let provider = RakutenClient::from_settings(settings)?;
    let opts = FetchOptions::from_env()?;

    tracing::info!(
        %slot,
        provider = provider.provider_name(),
        categories = categories.len(),
        pages = opts.pages,
        dry_run,
        "ranking fetch started"
    );

    let mut failed: Vec<&str> = Vec::new();
    for category in categories {
        let snapshot = match fetch_snapshot(&provider, category, slot, &opts).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::warn!(category = %category.name, %slot, "no ranking data fetched; skipping");
                failed.push(&category.name);
                continue;
            }
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(category = %category.name, error = %err, "ranking fetch failed");
                failed.push(&category.name);
                continue;
            }
        };

        if dry_run {
            tracing::info!(
                category = %category.name,
                %slot,
                items = snapshot.len(),
                dry_run = true,
                "snapshot not written (dry-run)"
            );
            continue;
        }

        if let Err(err) = store.save(&snapshot) {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(category = %category.name, error = %err, "saving snapshot failed");
            failed.push(&category.name);
        }
    }

    anyhow::ensure!(
        failed.is_empty(),
        "ranking fetch incomplete for {} of {} categories: {}",
        failed.len(),
        categories.len(),
        failed.join(", ")
    );
    Ok(())
}

fn run_analyze(
    settings: &Settings,
    store: &FileSnapshotStore,
    category: &Category,
    slot: Slot,
) -> anyhow::Result<()> {
    let slots = SlotPair::ending_at(slot);
    match hot_items_for_slots(store, &category.name, slots, settings.thresholds) {
        Ok(analysis) => {
            let out = serde_json::to_string_pretty(&analysis)?;
            println!("{out}");
            Ok(())
        }
        Err(err) if err.is_expected() => {
            tracing::warn!(error = %err, "no comparison available");
            eprintln!("{}", err.user_message());
            Ok(())
        }
        Err(err) => {
            let message = err.user_message();
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            Err(err.context(message))
        }
    }
}

fn resolve_slot(slot_arg: Option<&str>, utc_offset: FixedOffset) -> anyhow::Result<Slot> {
    if let Some(s) = slot_arg {
        return s.parse();
    }
    Ok(Slot::containing(local_now(chrono::Utc::now(), utc_offset)))
}

fn select_categories(settings: &Settings, names: &[String]) -> anyhow::Result<Vec<Category>> {
    if names.is_empty() {
        return Ok(settings.categories.iter().cloned().collect());
    }

    names
        .iter()
        .map(|name| {
            settings
                .categories
                .get(name)
                .cloned()
                .with_context(|| format!("unknown category: {name}"))
        })
        .collect()
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hotrank_core::analysis::Thresholds;
    use hotrank_core::domain::category::CategoryCatalog;
    use hotrank_core::domain::snapshot::{ItemRecord, Snapshot};
    use hotrank_core::time::half_day::{utc_offset_hours, Half};

    fn settings(data_dir: &std::path::Path) -> Settings {
        Settings {
            data_dir: data_dir.to_path_buf(),
            rakuten_app_id: None,
            sentry_dsn: None,
            categories: CategoryCatalog::parse("sweets=100283,drinks=551167").unwrap(),
            thresholds: Thresholds::default(),
            utc_offset: utc_offset_hours(9).unwrap(),
        }
    }

    fn pm() -> Slot {
        Slot::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), Half::Pm)
    }

    fn item(code: &str, rank: u32) -> ItemRecord {
        ItemRecord {
            rank,
            name: code.to_string(),
            price: 100,
            shop_name: "shop".to_string(),
            item_code: code.to_string(),
            item_url: format!("https://example.test/{code}"),
            review_count: 10,
        }
    }

    #[test]
    fn no_category_selects_the_whole_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        let all = select_categories(&settings, &[]).unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["sweets", "drinks"]);

        let one = select_categories(&settings, &["drinks".to_string()]).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].genre_id, "551167");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        let err = select_categories(&settings, &["sweets".to_string(), "books".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("unknown category: books"));
    }

    #[test]
    fn explicit_slot_argument_is_parsed() {
        let offset = utc_offset_hours(9).unwrap();
        let slot = resolve_slot(Some("2026-01-05-am"), offset).unwrap();
        assert_eq!(
            slot,
            Slot::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), Half::Am)
        );
        assert!(resolve_slot(Some("2026-01-05"), offset).is_err());
        assert!(resolve_slot(None, offset).is_ok());
    }

    #[test]
    fn analyze_prints_results_when_both_snapshots_exist() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = FileSnapshotStore::new(dir.path());
        for (slot, items) in [
            (pm().previous(), vec![item("a", 1)]),
            (pm(), vec![item("b", 1), item("a", 2)]),
        ] {
            store
                .save(&Snapshot {
                    category: "sweets".to_string(),
                    slot,
                    items,
                })
                .unwrap();
        }

        let category = settings.categories.default_category().clone();
        run_analyze(&settings, &store, &category, pm()).unwrap();
    }

    #[test]
    fn analyze_succeeds_with_a_message_when_a_snapshot_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = FileSnapshotStore::new(dir.path());
        store
            .save(&Snapshot {
                category: "sweets".to_string(),
                slot: pm(),
                items: vec![item("a", 1)],
            })
            .unwrap();

        let category = settings.categories.default_category().clone();
        assert!(run_analyze(&settings, &store, &category, pm()).is_ok());
    }

    #[test]
    fn analyze_fails_on_malformed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = FileSnapshotStore::new(dir.path());
        store
            .save(&Snapshot {
                category: "sweets".to_string(),
                slot: pm().previous(),
                items: vec![item("a", 1)],
            })
            .unwrap();
        std::fs::write(
            store.path_for("sweets", pm()),
            "rank,name,price,shop_name,item_code,item_url,review_count\n\
             1,a,100,shop,a,https://example.test/a,1\n\
             2,a,100,shop,a,https://example.test/a,1\n",
        )
        .unwrap();

        let category = settings.categories.default_category().clone();
        let err = run_analyze(&settings, &store, &category, pm()).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate item code a"));
    }
}
