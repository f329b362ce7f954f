//! Long-poll fetch loop.
//!
//! One dedicated task per running bot repeatedly issues blocking
//! `getUpdates` requests carrying the current cursor. A non-empty batch
//! advances the cursor to `max(update_id) + 1`, which acknowledges the batch
//! to the service, and is handed to the dispatch sink without waiting for
//! any handler. Transient failures (network, decode, service `ok: false`) are
//! logged and retried after a fixed delay; the loop only ever terminates on
//! cancellation.
//!
//! Both suspension points (the in-flight request and the retry delay) are
//! raced against the cancellation token, so shutdown never waits out a full
//! long-poll window.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use ferrogram_core::Update;

use crate::api::UpdateSource;

/// Server-side wait passed in every `getUpdates` request.
pub const POLL_TIMEOUT_SECS: u64 = 60;

/// Fixed delay before retrying after a transient fetch failure.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// The next-fetch cursor.
///
/// Owned exclusively by the poll loop, so no synchronization is needed.
/// In-memory only: losing it on restart is fine because the service retains
/// updates until an advanced offset acknowledges them.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetTracker {
    next: i64,
}

impl OffsetTracker {
    /// Starts at offset zero ("everything not yet acknowledged").
    pub fn new() -> Self {
        Self::default()
    }

    /// The offset to send with the next retrieval request.
    pub fn current(&self) -> i64 {
        self.next
    }

    /// Acknowledges everything up to and including `last_seen_id`.
    ///
    /// Called exactly once per successfully decoded non-empty batch, with
    /// the highest `update_id` observed in it. Never rolls back.
    pub fn advance(&mut self, last_seen_id: i64) {
        self.next = last_seen_id + 1;
    }
}

/// The long-poll fetch loop.
pub struct Poller {
    source: Arc<dyn UpdateSource>,
    offset: OffsetTracker,
    retry_delay: Duration,
    cancel: CancellationToken,
}

impl Poller {
    /// Creates a poller over `source`, stopping when `cancel` fires.
    pub fn new(source: Arc<dyn UpdateSource>, cancel: CancellationToken) -> Self {
        Self {
            source,
            offset: OffsetTracker::new(),
            retry_delay: RETRY_DELAY,
            cancel,
        }
    }

    /// Overrides the transient-failure retry delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Runs the fetch loop until cancellation.
    ///
    /// `on_batch` receives every non-empty batch after the cursor has been
    /// advanced; it must not block (the dispatcher's spawn-per-update entry
    /// point qualifies).
    ///
    /// Resolves to unit rather than a cancellation cause: cancellation is
    /// the only way the loop ends, and the caller holds the token that
    /// triggered it, so there is nothing to report that the caller does not
    /// already know.
    pub async fn run<F>(mut self, on_batch: F)
    where
        F: Fn(Vec<Update>),
    {
        debug!("fetching updates");
        loop {
            let fetched = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("poll loop cancelled");
                    return;
                }
                result = self.source.get_updates(self.offset.current(), POLL_TIMEOUT_SECS) => result,
            };

            let batch = match fetched {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "update fetch failed");
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => {
                            debug!("poll loop cancelled during backoff");
                            return;
                        }
                        () = sleep(self.retry_delay) => {}
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }
            if let Some(last_seen) = batch.iter().map(|u| u.update_id).max() {
                self.offset.advance(last_seen);
            }
            on_batch(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrogram_core::{ApiError, ApiResult};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Plays back a fixed list of responses, then hangs like a real long
    /// poll with no traffic. Records the offset of every request.
    struct ScriptedSource {
        responses: Mutex<VecDeque<ApiResult<Vec<Update>>>>,
        offsets: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<ApiResult<Vec<Update>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                offsets: Mutex::new(Vec::new()),
            })
        }

        fn offsets(&self) -> Vec<i64> {
            self.offsets.lock().unwrap().clone()
        }

        fn request_count(&self) -> usize {
            self.offsets.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn get_updates(&self, offset: i64, _timeout_secs: u64) -> ApiResult<Vec<Update>> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(response) => response,
                None => std::future::pending().await,
            }
        }
    }

    fn bare_update(update_id: i64) -> Update {
        Update {
            update_id,
            payload: None,
        }
    }

    #[tokio::test]
    async fn offset_advances_past_highest_update_id() {
        let source = ScriptedSource::new(vec![
            Ok(vec![bare_update(10), bare_update(11)]),
            Ok(vec![]),
        ]);
        let cancel = CancellationToken::new();
        let poller = Poller::new(source.clone(), cancel.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(poller.run(move |batch| {
            let _ = tx.send(batch);
        }));

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 2);

        // Let the loop issue the empty-batch request and the hanging one.
        while source.request_count() < 3 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        handle.await.unwrap();

        // First request at 0; after max id 11 the cursor is 12; the empty
        // batch leaves it unchanged.
        assert_eq!(source.offsets(), vec![0, 12, 12]);
    }

    #[tokio::test]
    async fn transient_error_is_retried_without_advancing() {
        let source = ScriptedSource::new(vec![
            Err(ApiError::Http("connection reset".to_string())),
            Ok(vec![bare_update(5)]),
        ]);
        let cancel = CancellationToken::new();
        let poller =
            Poller::new(source.clone(), cancel.clone()).with_retry_delay(Duration::from_millis(1));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(poller.run(move |batch| {
            let _ = tx.send(batch);
        }));

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch[0].update_id, 5);
        cancel.cancel();
        handle.await.unwrap();

        let offsets = source.offsets();
        // The failed request did not move the cursor.
        assert_eq!(&offsets[..2], &[0, 0]);
    }

    #[tokio::test]
    async fn no_requests_after_cancellation() {
        let source = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();
        let poller = Poller::new(source.clone(), cancel.clone());
        let handle = tokio::spawn(poller.run(|_| {}));

        while source.request_count() < 1 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop must observe cancellation promptly")
            .unwrap();
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn cancellation_cuts_the_backoff_short() {
        let source = ScriptedSource::new(vec![Err(ApiError::Http("boom".to_string()))]);
        let cancel = CancellationToken::new();
        // An hour-long backoff: only the cancellation race lets this finish.
        let poller =
            Poller::new(source.clone(), cancel.clone()).with_retry_delay(Duration::from_secs(3600));
        let handle = tokio::spawn(poller.run(|_| {}));

        while source.request_count() < 1 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        timeout(Duration::from_secs(5), handle)
            .await
            .expect("backoff must race cancellation")
            .unwrap();
    }

    #[test]
    fn offset_tracker_contract() {
        let mut offset = OffsetTracker::new();
        assert_eq!(offset.current(), 0);
        offset.advance(11);
        assert_eq!(offset.current(), 12);
        offset.advance(41);
        assert_eq!(offset.current(), 42);
    }
}
