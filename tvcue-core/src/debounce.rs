use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Delays a rapidly-changing value until it stays unchanged for `delay`.
///
/// Only the last value of a burst of updates is emitted.  Dropping the gate
/// cancels the pending timer and nothing is emitted after that.
pub struct DebounceGate<V> {
    delay: Duration,
    timer: Arc<Mutex<Timer>>,
    sender: mpsc::UnboundedSender<V>,
}

#[derive(Default)]
struct Timer {
    token: Option<CancellationToken>,
}

impl<V> DebounceGate<V>
where
    V: Send + 'static,
{
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<V>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let gate = DebounceGate {
            delay,
            timer: Default::default(),
            sender,
        };
        (gate, receiver)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Re-arms the timer with `value`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn update(&self, value: V) {
        let mut timer = lock(&self.timer);
        if let Some(token) = timer.token.take() {
            token.cancel();
        }

        let deadline = Instant::now() + self.delay;
        let token = CancellationToken::new();
        timer.token = Some(token.clone());
        drop(timer);

        let timer = self.timer.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep_until(deadline) => (),
            }
            // Let updates made at the same instant preempt the emission.
            tokio::task::yield_now().await;
            let mut timer = lock(&timer);
            if token.is_cancelled() {
                return;
            }
            timer.token = None;
            tracing::trace!("Emit");
            // The receiver may have gone.
            let _ = sender.send(value);
        });
    }

    /// Drops the pending value, if any, without emitting it.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.timer).token.take() {
            token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.timer).token.is_some()
    }
}

impl<V> Drop for DebounceGate<V> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.timer).token.take() {
            token.cancel();
            tracing::debug!(gate.delay = ?self.delay, "Pending value discarded");
        }
    }
}

// The guarded data is a single Option, which is consistent even after a
// panic in another thread.
fn lock(timer: &Mutex<Timer>) -> MutexGuard<'_, Timer> {
    timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::sleep;

    const D: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_last_value_once() {
        let start = Instant::now();
        let (gate, mut rx) = DebounceGate::new(D);

        gate.update(0);
        sleep(Duration::from_millis(50)).await;
        gate.update(50);
        sleep(Duration::from_millis(50)).await;
        gate.update(100);
        sleep(Duration::from_millis(300)).await;
        gate.update(400);

        assert_eq!(rx.recv().await, Some(400));
        assert_eq!(start.elapsed(), Duration::from_millis(700));

        sleep(Duration::from_secs(10)).await;
        assert_matches!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts() {
        let start = Instant::now();
        let (gate, mut rx) = DebounceGate::new(D);

        gate.update("a");
        assert!(gate.is_pending());
        assert_eq!(rx.recv().await, Some("a"));
        assert_eq!(start.elapsed(), D);
        assert!(!gate.is_pending());

        gate.update("b");
        gate.update("c");
        assert_eq!(rx.recv().await, Some("c"));
        assert_eq!(start.elapsed(), D * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (gate, mut rx) = DebounceGate::new(D);
        gate.update(1);
        gate.cancel();
        assert!(!gate.is_pending());
        sleep(D * 2).await;
        assert_matches!(rx.try_recv(), Err(TryRecvError::Empty));

        gate.update(2);
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_emission_after_drop() {
        let (gate, mut rx) = DebounceGate::new(D);
        gate.update(1);
        sleep(Duration::from_millis(100)).await;
        drop(gate);
        // The channel closes once the sender held by the gate is gone and the
        // cancelled timer task has finished.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_count_bounded_by_updates() {
        let (gate, mut rx) = DebounceGate::new(D);
        let mut emitted = 0;
        for i in 0..20 {
            gate.update(i);
            sleep(Duration::from_millis(if i % 5 == 4 { 400 } else { 10 })).await;
            while let Ok(_) = rx.try_recv() {
                emitted += 1;
            }
        }
        sleep(D).await;
        while let Ok(_) = rx.try_recv() {
            emitted += 1;
        }
        // One emission per burst of five updates.
        assert_eq!(emitted, 4);
    }
}
