use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::catalog::CatalogApi;
use crate::catalog::Endpoints;
use crate::config::SearchConfig;
use crate::debounce::DebounceGate;
use crate::lease::Lease;
use crate::lease::Leases;
use crate::models::SearchHit;
use crate::query::Query;
use crate::query::QueryState;
use crate::query::QueryStatus;

pub type SearchState = QueryState<Vec<SearchHit>>;

/// Search suggestions for text typed by a user.
///
/// Input is debounced before it turns into a search request, so that only
/// the text the user paused on is searched.
pub struct SearchSession<C> {
    gate: DebounceGate<(u64, String)>,
    query: Arc<Query<C, Vec<SearchHit>>>,
    // Sequence number of the last input, and of the last one applied to the
    // query.
    inputs: AtomicU64,
    applied: watch::Receiver<u64>,
    worker: JoinHandle<()>,
    _lease: Lease,
}

impl<C> SearchSession<C>
where
    C: CatalogApi + 'static,
{
    pub const LEASE_NAME: &'static str = "search";

    pub fn new(catalog: C, endpoints: Endpoints, config: &SearchConfig, leases: &Leases) -> Self {
        let (gate, receiver) = DebounceGate::new(config.debounce);
        let query = Arc::new(Query::new(catalog));
        let (applied_sender, applied) = watch::channel(0);
        let worker = tokio::spawn(run(
            receiver,
            Arc::downgrade(&query),
            applied_sender,
            endpoints,
            config.min_chars,
        ));
        SearchSession {
            gate,
            query,
            inputs: AtomicU64::new(0),
            applied,
            worker,
            _lease: leases.acquire(Self::LEASE_NAME),
        }
    }

    pub fn input(&self, text: &str) {
        let seq = self.inputs.fetch_add(1, Ordering::SeqCst) + 1;
        self.gate.update((seq, text.to_string()));
    }

    pub fn refetch(&self) {
        self.query.refetch();
    }

    pub fn state(&self) -> SearchState {
        self.query.state()
    }

    pub fn watch(&self) -> watch::Receiver<SearchState> {
        self.query.watch()
    }

    /// Waits until the last input has been applied and its fetch, if any,
    /// has finished.
    pub async fn settled(&self) -> SearchState {
        let seq = self.inputs.load(Ordering::SeqCst);
        let mut applied = self.applied.clone();
        if applied.wait_for(|applied| *applied >= seq).await.is_err() {
            return self.state();
        }
        let mut rx = self.watch();
        let state = match rx.wait_for(|state| state.status != QueryStatus::Loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }
}

impl<C> Drop for SearchSession<C> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run<C>(
    mut receiver: mpsc::UnboundedReceiver<(u64, String)>,
    query: Weak<Query<C, Vec<SearchHit>>>,
    applied: watch::Sender<u64>,
    endpoints: Endpoints,
    min_chars: usize,
) where
    C: CatalogApi + 'static,
{
    while let Some((seq, text)) = receiver.recv().await {
        let query = match query.upgrade() {
            Some(query) => query,
            None => break,
        };
        let text = text.trim();
        tracing::debug!(search.text = text, "Input settled");
        if text.is_empty() {
            query.subscribe(None, false);
        } else {
            let identifier = endpoints.search_shows(text);
            let enabled = text.chars().count() >= min_chars;
            query.subscribe(Some(&identifier), enabled);
        }
        applied.send_replace(seq);
    }
}
