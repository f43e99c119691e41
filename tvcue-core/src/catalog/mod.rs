#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::CatalogConfig;
use crate::error::Error;
use crate::models::ShowId;

/// A client of the remote media catalog.
///
/// Implementations must observe `token` while the request is in flight and
/// return [`Error::Cancelled`] once it fires.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch(&self, key: &str, token: CancellationToken) -> Result<Value, Error>;
}

#[async_trait]
impl<C> CatalogApi for std::sync::Arc<C>
where
    C: CatalogApi + ?Sized,
{
    async fn fetch(&self, key: &str, token: CancellationToken) -> Result<Value, Error> {
        (**self).fetch(key, token).await
    }
}

pub struct HttpCatalog {
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        Ok(HttpCatalog {
            client: builder.build()?,
        })
    }

    async fn get_json(&self, url: Url) -> Result<Value, Error> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        serde_json::from_slice(&bytes).map_err(Error::MalformedResponse)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn fetch(&self, key: &str, token: CancellationToken) -> Result<Value, Error> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let url = Url::parse(key)?;
        tracing::trace!(%url, "Fetching");
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            result = self.get_json(url) => result,
        }
    }
}

/// Builds resource identifiers for the catalog endpoints.
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Self {
        Endpoints { base }
    }

    pub fn search_shows(&self, query: &str) -> String {
        let mut url = self.url(&["search", "shows"]);
        url.query_pairs_mut().append_pair("q", query);
        url.into()
    }

    pub fn show(&self, id: ShowId) -> String {
        self.url(&["shows", &id.value().to_string()]).into()
    }

    pub fn show_episodes(&self, id: ShowId) -> String {
        self.url(&["shows", &id.value().to_string(), "episodes"]).into()
    }

    /// Episodes airing on `date` in the region identified by `country`.
    pub fn schedule(&self, country: &str, date: NaiveDate) -> String {
        let mut url = self.url(&["schedule"]);
        url.query_pairs_mut()
            .append_pair("country", country)
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        url.into()
    }

    /// Episodes released on `date` by web channels, regardless of region.
    pub fn web_schedule(&self, date: NaiveDate) -> String {
        let mut url = self.url(&["schedule", "web"]);
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        url.into()
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn endpoints(base: &str) -> Endpoints {
        Endpoints::new(base.parse().unwrap())
    }

    #[test]
    fn test_endpoints() {
        let endpoints = endpoints("https://api.tvmaze.com");
        assert_eq!(
            endpoints.search_shows("the office"),
            "https://api.tvmaze.com/search/shows?q=the+office"
        );
        assert_eq!(endpoints.show(1.into()), "https://api.tvmaze.com/shows/1");
        assert_eq!(
            endpoints.show_episodes(1.into()),
            "https://api.tvmaze.com/shows/1/episodes"
        );
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            endpoints.schedule("US", date),
            "https://api.tvmaze.com/schedule?country=US&date=2024-03-09"
        );
        assert_eq!(
            endpoints.web_schedule(date),
            "https://api.tvmaze.com/schedule/web?date=2024-03-09"
        );
    }

    #[test]
    fn test_endpoints_base_with_path() {
        let endpoints = endpoints("http://localhost:8080/mirror/");
        assert_eq!(
            endpoints.show(42.into()),
            "http://localhost:8080/mirror/shows/42"
        );
    }

    #[tokio::test]
    async fn test_http_catalog_cancelled_before_request() {
        let catalog = HttpCatalog::new(&Default::default()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let result = catalog.fetch("http://127.0.0.1:1/", token).await;
        assert_matches!(result, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn test_http_catalog_invalid_identifier() {
        let catalog = HttpCatalog::new(&Default::default()).unwrap();
        let result = catalog.fetch("not a url", CancellationToken::new()).await;
        assert_matches!(result, Err(Error::InvalidIdentifier(_)));
    }
}
