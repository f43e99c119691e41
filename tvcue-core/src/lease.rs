use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Named resources held by scoped leases.
///
/// A resource is held while at least one [`Lease`] for it is alive.
#[derive(Clone, Default)]
pub struct Leases(Arc<Mutex<HashMap<String, usize>>>);

impl Leases {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn acquire(&self, name: &str) -> Lease {
        let mut holders = self.lock();
        let count = holders.entry(name.to_string()).or_default();
        *count += 1;
        tracing::debug!(lease.name = name, lease.holders = *count, "Acquired");
        Lease {
            leases: self.clone(),
            name: name.to_string(),
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.holders(name) > 0
    }

    pub fn holders(&self, name: &str) -> usize {
        self.lock().get(name).copied().unwrap_or_default()
    }

    fn release(&self, name: &str) {
        let mut holders = self.lock();
        if let Some(count) = holders.get_mut(name) {
            *count -= 1;
            tracing::debug!(lease.name = name, lease.holders = *count, "Released");
            if *count == 0 {
                holders.remove(name);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the resource when dropped.
pub struct Lease {
    leases: Leases,
    name: String,
}

impl Lease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.leases.release(&self.name);
    }
}
