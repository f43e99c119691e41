use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;

use tvcue_core::catalog::HttpCatalog;
use tvcue_core::config::Config;
use tvcue_core::registry::FileRegistry;
use tvcue_core::schedule::AiringDetector;

pub async fn main(
    config: Arc<Config>,
    date: Option<NaiveDate>,
    registry: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = registry
        .or_else(|| config.registry.path.clone())
        .ok_or_else(|| anyhow::anyhow!("No tracked registry specified"))?;
    let detector = AiringDetector::new(
        HttpCatalog::new(&config.catalog)?,
        FileRegistry::new(path),
        config.catalog.endpoints(),
        &config.schedule.country,
    );
    let count = match date {
        Some(date) => detector.count(date).await,
        None => detector.airing_today().await,
    };
    println!("{count}");
    Ok(())
}
