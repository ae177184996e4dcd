//! One-shot cancellable silence timer.
//!
//! Each armed timer owns a thread parked on a single `recv_timeout` call.
//! That call is the linearization point for the cancel/fire race: a cancel
//! message that arrives before the deadline means the callback never runs;
//! once the deadline wins, the callback runs to completion and any later
//! cancel lands in a channel nobody reads.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// A single pending "close the segment after N seconds of silence" action.
///
/// At most one instance is live per detector; the detector's `Option` slot
/// enforces that. Dropping the timer without calling [`cancel`](Self::cancel)
/// also cancels it (the worker sees the channel disconnect).
pub(crate) struct SilenceTimer {
    cancel_tx: Sender<()>,
}

impl SilenceTimer {
    /// Schedule `on_fire` to run once after `duration` unless cancelled first.
    pub(crate) fn arm<F>(duration: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        thread::spawn(move || match cancel_rx.recv_timeout(duration) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => on_fire(),
        });
        Self { cancel_tx }
    }

    /// Cancel the pending action. Idempotent; a no-op if the timer has
    /// already fired.
    pub(crate) fn cancel(&self) {
        let _ = self.cancel_tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_once_after_the_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _timer = SilenceTimer::arm(Duration::from_millis(20), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(120));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn does_not_fire_before_the_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _timer = SilenceTimer::arm(Duration::from_millis(200), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(40));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_before_deadline_suppresses_the_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let timer = SilenceTimer::arm(Duration::from_millis(100), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        thread::sleep(Duration::from_millis(200));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_after_fire_is_a_no_op() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let timer = SilenceTimer::arm(Duration::from_millis(10), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(80));
        timer.cancel();
        timer.cancel();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_timer_cancels_it() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        {
            let _timer = SilenceTimer::arm(Duration::from_millis(60), move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        thread::sleep(Duration::from_millis(150));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
