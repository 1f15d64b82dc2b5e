//! One-shot, cancellable delayed callbacks (§4.4, §5) used for the
//! disconnect grace period and the post-game room TTL.
//!
//! Timer callbacks execute as ordinary room events: they re-acquire the
//! room's lock like any message handler, so they never race a concurrent
//! move or offer against the same room.

use std::time::Duration;

use tokio::task::JoinHandle;

/// A single armed timer. Dropping the handle does not cancel the task —
/// call [`TimerHandle::cancel`] explicitly, or arm a new timer over it via
/// [`rearm`].
pub struct TimerHandle(JoinHandle<()>);

impl TimerHandle {
    pub fn cancel(self) {
        self.0.abort();
    }
}

/// Spawn `callback` to run after `delay`, returning a handle that can cancel
/// it before it fires.
pub fn arm<F>(delay: Duration, callback: F) -> TimerHandle
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    TimerHandle(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        callback.await;
    }))
}

/// Cancel `slot`'s existing timer, if any, and arm a new one in its place.
pub fn rearm<F>(slot: &mut Option<TimerHandle>, delay: Duration, callback: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Some(previous) = slot.take() {
        previous.cancel();
    }
    *slot = Some(arm(delay, callback));
}

/// Cancel `slot`'s timer, if any, leaving it empty.
pub fn disarm(slot: &mut Option<TimerHandle>) {
    if let Some(previous) = slot.take() {
        previous.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let mut slot = None;
        let flag = fired.clone();
        rearm(&mut slot, Duration::from_millis(20), async move {
            flag.store(true, Ordering::SeqCst);
        });
        disarm(&mut slot);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn uncancelled_timer_fires() {
        let fired = Arc::new(AtomicBool::new(false));
        let mut slot = None;
        let flag = fired.clone();
        rearm(&mut slot, Duration::from_millis(5), async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
