//! Outbound Request Queue with Rate Limiting
//!
//! All provider traffic funnels through a single FIFO queue drained by one
//! background task, which is what makes the rate limit global: concurrent
//! callers cannot race past the per-window budget because only the drain
//! task issues requests.
//!
//! ## Behavior
//!
//! - Fixed 60s window; when the budget is spent the drain task sleeps
//!   until the window resets
//! - A short politeness delay separates consecutive requests even when
//!   the budget has room
//! - Strict FIFO: requests are issued in submission order
//! - A submitter that gives up (drops its reply handle) has its job
//!   skipped rather than run for nobody

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace, warn};

use super::provider::Completion;
use crate::config::RateLimitSettings;
use crate::constants::rate_limit as rl_constants;
use crate::types::{Result, TripError};

/// Shared queue handle for concurrent submitters
pub type SharedQueue = Arc<RequestQueue>;

struct Pending {
    job: BoxFuture<'static, Result<Completion>>,
    reply: oneshot::Sender<Result<Completion>>,
}

/// FIFO provider-request queue with a fixed-window rate limit
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Pending>,
}

impl RequestQueue {
    /// Create the queue and spawn its drain task
    pub fn new(settings: RateLimitSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_loop(rx, settings));
        Self { tx }
    }

    pub fn shared(settings: RateLimitSettings) -> SharedQueue {
        Arc::new(Self::new(settings))
    }

    /// Enqueue a provider call and wait for its turn and result.
    ///
    /// Returns `TripError::QueueClosed` if the drain task is gone.
    pub async fn submit<F>(&self, job: F) -> Result<Completion>
    where
        F: std::future::Future<Output = Result<Completion>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Pending {
                job: Box::pin(job),
                reply: reply_tx,
            })
            .map_err(|_| TripError::QueueClosed)?;

        reply_rx.await.map_err(|_| TripError::QueueClosed)?
    }
}

async fn drain_loop(mut rx: mpsc::UnboundedReceiver<Pending>, settings: RateLimitSettings) {
    let window = Duration::from_secs(rl_constants::WINDOW_SECS);
    let politeness = settings.politeness_delay();
    let mut window_start = Instant::now();
    let mut issued: u32 = 0;

    while let Some(pending) = rx.recv().await {
        // Submitter already gave up; don't spend budget on it
        if pending.reply.is_closed() {
            trace!("Dropping abandoned queued request");
            continue;
        }

        if window_start.elapsed() >= window {
            window_start = Instant::now();
            issued = 0;
        }

        if issued >= settings.requests_per_minute {
            let wait = window.saturating_sub(window_start.elapsed());
            if !wait.is_zero() {
                warn!(
                    wait_ms = wait.as_millis(),
                    limit = settings.requests_per_minute,
                    "Rate limit window exhausted, holding queue"
                );
                sleep(wait).await;
            }
            window_start = Instant::now();
            issued = 0;
        }

        issued += 1;
        debug!(
            issued,
            limit = settings.requests_per_minute,
            "Dispatching queued provider request"
        );

        let result = pending.job.await;
        // Submitter may have gone away mid-flight; nothing to do then
        let _ = pending.reply.send(result);

        if !politeness.is_zero() {
            sleep(politeness).await;
        }
    }

    debug!("Request queue drain task shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::Completion;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn settings(rpm: u32) -> RateLimitSettings {
        RateLimitSettings {
            requests_per_minute: rpm,
            politeness_delay_ms: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_complete_in_submission_order() {
        let queue = RequestQueue::shared(settings(100));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5u32 {
            let queue = Arc::clone(&queue);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                queue
                    .submit(async move {
                        order.lock().unwrap().push(i);
                        Ok(Completion::text_only(format!("{}", i)))
                    })
                    .await
            }));
            // Give each submit a chance to enqueue before the next
            tokio::task::yield_now().await;
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_budget_delays_excess_requests() {
        let queue = RequestQueue::shared(settings(2));
        let start = Instant::now();

        for _ in 0..2 {
            queue
                .submit(async { Ok(Completion::text_only("ok")) })
                .await
                .unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));

        // Third request must wait out the 60s window
        queue
            .submit(async { Ok(Completion::text_only("late")) })
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_pass_through() {
        let queue = RequestQueue::new(settings(10));
        let result = queue
            .submit(async {
                Err(TripError::Provider(crate::types::ProviderError::new(
                    crate::types::ProviderErrorKind::ServiceUnavailable,
                    "down",
                )))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_is_skipped() {
        let queue = RequestQueue::shared(settings(10));
        let ran = Arc::new(AtomicU32::new(0));

        // First job holds the queue long enough for the second submitter
        // to give up
        let slow = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .submit(async {
                        sleep(Duration::from_secs(5)).await;
                        Ok(Completion::text_only("slow"))
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let abandoned = {
            let queue = Arc::clone(&queue);
            let ran = Arc::clone(&ran);
            tokio::spawn(async move {
                queue
                    .submit(async move {
                        ran.fetch_add(1, Ordering::SeqCst);
                        Ok(Completion::text_only("never"))
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        abandoned.abort();

        slow.await.unwrap().unwrap();
        // Let the drain task process (and skip) the abandoned entry
        sleep(Duration::from_secs(1)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
