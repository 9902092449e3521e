use csv_indexed_reader::{AppConfig, CacheStore, IndexedReader, PageRequest, RedbCacheStore};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: csv-indexed-reader <file> [page] [limit] | <file> --count";

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default(Some("config.toml"));

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(
            format!("csv_indexed_reader={}", config.logging.level).parse()?,
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let file = args.get(1).ok_or_else(|| anyhow::anyhow!(USAGE))?;

    let store = if config.reader.use_cache {
        match RedbCacheStore::new(&config.cache.db_path) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "Index cache unavailable, continuing without it");
                None
            }
        }
    } else {
        None
    };

    let mut reader = IndexedReader::open_with_store(
        file,
        &config.reader,
        store.as_ref().map(|s| s as &dyn CacheStore),
    )?;

    if args.get(2).map(String::as_str) == Some("--count") {
        println!("{}", reader.row_count());
        return Ok(());
    }

    let mut request = PageRequest::default();
    if let Some(page) = args.get(2) {
        request.page = page.parse()?;
    }
    if let Some(limit) = args.get(3) {
        request.limit = limit.parse()?;
    }

    let page = reader.page(&request);
    for row in &page.rows {
        let mut map = serde_json::Map::new();
        for (column, value) in row {
            map.insert(column.clone(), serde_json::Value::String(value.clone()));
        }
        println!("{}", serde_json::Value::Object(map));
    }

    println!(
        "{}",
        serde_json::json!({
            "total_records": page.total_records,
            "total_pages": page.total_pages,
            "current_page": page.current_page,
            "limit": page.limit,
            "record_from": page.record_from,
            "record_to": page.record_to,
            "records_on_page": page.records_on_page(),
            "header_count": reader.header_count(),
        })
    );

    Ok(())
}
