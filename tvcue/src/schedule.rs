use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use tvcue_core::catalog::CatalogApi;
use tvcue_core::catalog::Endpoints;
use tvcue_core::catalog::HttpCatalog;
use tvcue_core::config::Config;
use tvcue_core::models::Episode;
use tvcue_core::query::Query;
use tvcue_core::query::QueryStatus;
use tvcue_core::schedule::AiringBucket;
use tvcue_core::schedule::fetch_episodes;
use tvcue_core::schedule::group;
use tvcue_core::schedule::merge;

pub async fn main(
    config: Arc<Config>,
    date: Option<NaiveDate>,
    country: Option<String>,
) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let country = country.unwrap_or_else(|| config.schedule.country.clone());
    let catalog = Arc::new(HttpCatalog::new(&config.catalog)?);
    let bucket = view(catalog, &config.catalog.endpoints(), &country, date).await?;
    println!("{}", serde_json::to_string_pretty(&bucket)?);
    Ok(())
}

// The regional schedule is the primary source and its failure is reported.
// The web-wide schedule is secondary and is left out when unavailable.
async fn view<C>(
    catalog: Arc<C>,
    endpoints: &Endpoints,
    country: &str,
    date: NaiveDate,
) -> anyhow::Result<AiringBucket>
where
    C: CatalogApi + 'static,
{
    let regional = endpoints.schedule(country, date);
    let web = endpoints.web_schedule(date);

    let query = Query::<_, Vec<Episode>>::new(catalog.clone());
    let mut rx = query.watch();
    query.subscribe(Some(&regional), true);

    let settled = async {
        rx.wait_for(|state| state.status != QueryStatus::Loading)
            .await
            .map(|state| state.clone())
    };
    let (state, secondary) = tokio::join!(
        settled,
        fetch_episodes(&catalog, &web, CancellationToken::new()),
    );
    let state = state?;

    if let Some(err) = state.error {
        anyhow::bail!("Failed to fetch the schedule of {country} on {date}: {err}");
    }
    let primary = state.data.map(Arc::unwrap_or_clone).unwrap_or_default();
    tracing::debug!(%date, %country, episodes = primary.len(), "Fetched");
    Ok(group(merge([Ok(primary), secondary])))
}
