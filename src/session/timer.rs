// src/session/timer.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A single owned countdown scoped to one quiz session.
///
/// Ticks once per second, publishes the remaining time, and signals
/// expiry exactly once when the count reaches zero. The ticking task
/// exits after signalling, so expiry can never fire twice regardless of
/// scheduling jitter. `stop` cancels the countdown; a stopped timer
/// never signals.
pub struct CountdownTimer {
    remaining: watch::Receiver<u64>,
    expired: Arc<Notify>,
    ticker: JoinHandle<()>,
}

impl CountdownTimer {
    /// Starts a countdown from `seconds`.
    pub fn start(seconds: u64) -> Self {
        let (tx, remaining) = watch::channel(seconds);
        let expired = Arc::new(Notify::new());
        let notifier = expired.clone();

        let ticker = tokio::spawn(async move {
            let mut left = seconds;
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            tick.tick().await;

            while left > 0 {
                tick.tick().await;
                left -= 1;
                // Receiver still alive as long as the timer exists.
                let _ = tx.send(left);
            }

            // Stores a permit, so a waiter that subscribes later still
            // observes the expiry.
            notifier.notify_one();
        });

        Self {
            remaining,
            expired,
            ticker,
        }
    }

    /// Seconds left on the countdown.
    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// Resolves when the countdown reaches zero. At most one waiter is
    /// woken, exactly once.
    pub fn expired(&self) -> Arc<Notify> {
        self.expired.clone()
    }

    /// Cancels the countdown. No further ticks, no late expiry.
    pub fn stop(&self) {
        self.ticker.abort();
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_expires_once() {
        let timer = CountdownTimer::start(3);
        assert_eq!(timer.remaining(), 3);

        let fired = Arc::new(AtomicUsize::new(0));
        let observed = fired.clone();
        let expired = timer.expired();
        let waiter = tokio::spawn(async move {
            expired.notified().await;
            observed.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        waiter.await.unwrap();

        assert_eq!(timer.remaining(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Give the runtime room for a hypothetical second wake-up.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_the_countdown() {
        let timer = CountdownTimer::start(2);
        timer.stop();

        let expired = timer.expired();
        let late = tokio::time::timeout(Duration::from_secs(10), expired.notified()).await;

        assert!(late.is_err(), "stopped timer must not signal expiry");
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_subscribing_after_expiry_still_wakes() {
        let timer = CountdownTimer::start(1);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let expired = timer.expired();
        tokio::time::timeout(Duration::from_secs(1), expired.notified())
            .await
            .expect("permit from notify_one should be stored");
    }
}
