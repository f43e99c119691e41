use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogApi;
use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Idle => "idle",
            QueryStatus::Loading => "loading",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

#[derive(Debug)]
pub struct QueryState<T> {
    /// The last successfully fetched payload.  Kept while refreshing and
    /// after a failure.
    pub data: Option<Arc<T>>,
    pub status: QueryStatus,
    pub error: Option<Arc<Error>>,
}

// Derive would require `T: Clone`.
impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        QueryState {
            data: self.data.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState {
            data: None,
            status: QueryStatus::Idle,
            error: None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceRequest {
    pub identifier: Option<String>,
    pub enabled: bool,
}

impl ResourceRequest {
    pub fn new(identifier: Option<&str>, enabled: bool) -> Self {
        ResourceRequest {
            identifier: identifier.map(str::to_string),
            enabled,
        }
    }

    fn active_identifier(&self) -> Option<&str> {
        if self.enabled {
            self.identifier.as_deref()
        } else {
            None
        }
    }
}

/// Fetches the resource of the current request and publishes its state.
///
/// Each change of the request, and each `refetch()`, starts a new
/// generation.  Results of older generations are discarded without touching
/// the state.  Dropping the query cancels the in-flight fetch.
pub struct Query<C, T> {
    inner: Arc<Inner<C, T>>,
}

struct Inner<C, T> {
    catalog: C,
    state: watch::Sender<QueryState<T>>,
    current: Mutex<Current>,
    root_token: CancellationToken,
}

#[derive(Default)]
struct Current {
    generation: u64,
    request: ResourceRequest,
    token: Option<CancellationToken>,
}

impl<C, T> Query<C, T>
where
    C: CatalogApi + 'static,
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(catalog: C) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Query {
            inner: Arc::new(Inner {
                catalog,
                state,
                current: Default::default(),
                root_token: CancellationToken::new(),
            }),
        }
    }

    /// Applies a request and returns the resulting state.
    ///
    /// A fetch is issued only when the request differs from the current one.
    pub fn subscribe(&self, identifier: Option<&str>, enabled: bool) -> QueryState<T> {
        let request = ResourceRequest::new(identifier, enabled);
        let current = self.inner.lock();
        if current.generation > 0 && current.request == request {
            drop(current);
            return self.state();
        }
        Inner::issue(&self.inner, current, request);
        self.state()
    }

    /// Issues the current request again.
    pub fn refetch(&self) {
        let current = self.inner.lock();
        let request = current.request.clone();
        Inner::issue(&self.inner, current, request);
    }

    pub fn state(&self) -> QueryState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<QueryState<T>> {
        self.inner.state.subscribe()
    }

    pub fn request(&self) -> ResourceRequest {
        self.inner.lock().request.clone()
    }
}

impl<C, T> Drop for Query<C, T> {
    fn drop(&mut self) {
        self.inner.root_token.cancel();
        tracing::debug!("Detached");
    }
}

impl<C, T> Inner<C, T> {
    fn lock(&self) -> MutexGuard<'_, Current> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C, T> Inner<C, T>
where
    C: CatalogApi + 'static,
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn issue(this: &Arc<Self>, mut current: MutexGuard<'_, Current>, request: ResourceRequest) {
        if let Some(token) = current.token.take() {
            token.cancel();
        }
        current.generation += 1;
        current.request = request;
        let generation = current.generation;

        let identifier = match current.request.active_identifier() {
            Some(identifier) => identifier.to_string(),
            None => {
                tracing::debug!(query.generation = generation, "Idle");
                this.state.send_modify(|state| {
                    state.status = QueryStatus::Idle;
                    state.error = None;
                });
                return;
            }
        };

        let token = this.root_token.child_token();
        current.token = Some(token.clone());
        this.state.send_modify(|state| {
            state.status = QueryStatus::Loading;
            state.error = None;
        });
        drop(current);

        tracing::debug!(query.generation = generation, query.identifier = %identifier, "Fetching");
        let inner = this.clone();
        tokio::spawn(async move {
            let result = inner.catalog.fetch(&identifier, token).await;
            inner.complete(generation, result);
        });
    }

    fn complete(&self, generation: u64, result: Result<Value, Error>) {
        let result = result.and_then(|value| {
            serde_json::from_value::<T>(value).map_err(Error::MalformedResponse)
        });

        let mut current = self.lock();
        if current.generation != generation || self.root_token.is_cancelled() {
            tracing::debug!(
                query.generation = generation,
                query.current = current.generation,
                "Superseded, discarded"
            );
            return;
        }
        current.token = None;

        match result {
            Ok(data) => {
                tracing::debug!(query.generation = generation, "Fetched");
                self.state.send_modify(|state| {
                    state.data = Some(Arc::new(data));
                    state.status = QueryStatus::Success;
                    state.error = None;
                });
            }
            Err(err) if err.is_cancellation() => {
                tracing::debug!(query.generation = generation, "Cancelled");
            }
            Err(err) => {
                tracing::warn!(%err, query.generation = generation, "Failed to fetch");
                self.state.send_modify(|state| {
                    state.status = QueryStatus::Error;
                    state.error = Some(Arc::new(err));
                });
            }
        }
    }
}
