use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use crate::models::EpisodeId;
use crate::models::ShowId;

pub type TrackedEntries = HashMap<ShowId, Vec<EpisodeId>>;

/// Read access to the shows a user follows.
///
/// The registry is owned and mutated elsewhere.  Each call to `entries()`
/// returns a point-in-time snapshot.
pub trait TrackedRegistry: Send + Sync {
    fn entries(&self) -> TrackedEntries;
}

impl<R> TrackedRegistry for Arc<R>
where
    R: TrackedRegistry + ?Sized,
{
    fn entries(&self) -> TrackedEntries {
        (**self).entries()
    }
}

/// Shows which have at least one watched episode.
pub fn tracked_ids<R: TrackedRegistry + ?Sized>(registry: &R) -> HashSet<ShowId> {
    registry
        .entries()
        .into_iter()
        .filter(|(_, episodes)| !episodes.is_empty())
        .map(|(show_id, _)| show_id)
        .collect()
}

/// An in-memory registry shared with its owner.
#[derive(Clone, Default)]
pub struct SharedRegistry(Arc<RwLock<TrackedEntries>>);

impl SharedRegistry {
    pub fn new(entries: TrackedEntries) -> Self {
        SharedRegistry(Arc::new(RwLock::new(entries)))
    }

    pub fn track(&self, show_id: ShowId) {
        self.write().entry(show_id).or_default();
    }

    pub fn untrack(&self, show_id: ShowId) {
        self.write().remove(&show_id);
    }

    pub fn mark_watched(&self, show_id: ShowId, episode_id: EpisodeId) {
        let mut entries = self.write();
        let episodes = entries.entry(show_id).or_default();
        if !episodes.contains(&episode_id) {
            episodes.push(episode_id);
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, TrackedEntries> {
        // A poisoned lock still holds consistent data; every write is a
        // single map operation.
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TrackedRegistry for SharedRegistry {
    fn entries(&self) -> TrackedEntries {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// A registry persisted by another program as a JSON object which maps show
/// IDs to lists of watched episode IDs.
///
/// The file is read on every call.  A missing or broken file reads as an
/// empty registry.
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileRegistry { path: path.into() }
    }
}

impl TrackedRegistry for FileRegistry {
    fn entries(&self) -> TrackedEntries {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(%err, path = %self.path.display(), "Failed to read registry");
                return Default::default();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(%err, path = %self.path.display(), "Failed to parse registry");
                Default::default()
            }
        }
    }
}
