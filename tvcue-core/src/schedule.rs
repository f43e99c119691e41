use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use serde::Serializer;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogApi;
use crate::catalog::Endpoints;
use crate::error::Error;
use crate::models::Episode;
use crate::models::ShowId;
use crate::registry::TrackedRegistry;
use crate::registry::tracked_ids;

/// Groups of episodes keyed by airtime, in ascending order with
/// [`TimeLabel::Tba`] last.
pub type AiringBucket = IndexMap<TimeLabel, Vec<Episode>>;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TimeLabel {
    At(String),
    Tba,
}

impl TimeLabel {
    pub fn of(episode: &Episode) -> Self {
        match episode.airtime {
            Some(ref airtime) => TimeLabel::At(airtime.clone()),
            None => TimeLabel::Tba,
        }
    }
}

impl Ord for TimeLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TimeLabel::At(a), TimeLabel::At(b)) => a.cmp(b),
            (TimeLabel::At(_), TimeLabel::Tba) => Ordering::Less,
            (TimeLabel::Tba, TimeLabel::At(_)) => Ordering::Greater,
            (TimeLabel::Tba, TimeLabel::Tba) => Ordering::Equal,
        }
    }
}

impl PartialOrd for TimeLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLabel::At(airtime) => write!(f, "{}", airtime),
            TimeLabel::Tba => write!(f, "TBA"),
        }
    }
}

impl Serialize for TimeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Partitions episodes by airtime.
///
/// Every episode lands in exactly one bucket and keeps its relative input
/// order there.
pub fn group<I>(episodes: I) -> AiringBucket
where
    I: IntoIterator<Item = Episode>,
{
    let mut bucket = AiringBucket::new();
    for episode in episodes {
        bucket
            .entry(TimeLabel::of(&episode))
            .or_default()
            .push(episode);
    }
    bucket.sort_keys();
    bucket
}

/// Concatenates the available sources.  Failed sources are treated as empty.
pub fn merge<I>(sources: I) -> Vec<Episode>
where
    I: IntoIterator<Item = Result<Vec<Episode>, Error>>,
{
    sources
        .into_iter()
        .filter_map(|source| match source {
            Ok(episodes) => Some(episodes),
            Err(err) => {
                tracing::debug!(%err, "Schedule source unavailable, ignored");
                None
            }
        })
        .flatten()
        .collect()
}

/// Number of tracked shows which appear in `episodes`.
pub fn count_airing(tracked: &HashSet<ShowId>, episodes: &[Episode]) -> usize {
    episodes
        .iter()
        .map(|episode| episode.show.id)
        .collect::<HashSet<_>>()
        .intersection(tracked)
        .count()
}

/// Counts tracked shows airing in the sources.
///
/// `sources` is not called when no show has a watched episode, so that no
/// schedule is fetched in vain.
pub async fn airing_count<R, F, Fut>(registry: &R, sources: F) -> usize
where
    R: TrackedRegistry + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Vec<Result<Vec<Episode>, Error>>>,
{
    let tracked = tracked_ids(registry);
    if tracked.is_empty() {
        return 0;
    }
    let episodes = merge(sources().await);
    count_airing(&tracked, &episodes)
}

/// Detects tracked shows airing on a day.
///
/// This runs in the background of the primary views and never fails.
pub struct AiringDetector<C, R> {
    catalog: C,
    registry: R,
    endpoints: Endpoints,
    country: String,
}

impl<C, R> AiringDetector<C, R>
where
    C: CatalogApi,
    R: TrackedRegistry,
{
    pub fn new(catalog: C, registry: R, endpoints: Endpoints, country: &str) -> Self {
        AiringDetector {
            catalog,
            registry,
            endpoints,
            country: country.to_string(),
        }
    }

    pub async fn count(&self, date: NaiveDate) -> usize {
        let count = airing_count(&self.registry, move || self.fetch_sources(date)).await;
        tracing::debug!(%date, count, "Airing");
        count
    }

    pub async fn airing_today(&self) -> usize {
        self.count(chrono::Local::now().date_naive()).await
    }

    /// Fetches the regional schedule and the web-wide schedule concurrently.
    pub async fn fetch_sources(&self, date: NaiveDate) -> Vec<Result<Vec<Episode>, Error>> {
        let regional = self.endpoints.schedule(&self.country, date);
        let web = self.endpoints.web_schedule(date);
        let (regional, web) = futures::join!(
            self.fetch_episodes(&regional),
            self.fetch_episodes(&web)
        );
        vec![regional, web]
    }

    async fn fetch_episodes(&self, key: &str) -> Result<Vec<Episode>, Error> {
        // Not tied to any view, so nothing cancels it.
        fetch_episodes(&self.catalog, key, CancellationToken::new()).await
    }
}

/// Fetches a list of episodes outside a [`Query`](crate::query::Query).
pub async fn fetch_episodes<C>(
    catalog: &C,
    key: &str,
    token: CancellationToken,
) -> Result<Vec<Episode>, Error>
where
    C: CatalogApi + ?Sized,
{
    let value = catalog.fetch(key, token).await?;
    serde_json::from_value(value).map_err(Error::MalformedResponse)
}
