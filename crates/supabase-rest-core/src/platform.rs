//! Async helpers shared by the auth and query crates: background tasks and
//! bounding a request by a timeout and a cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RestError;

// ── Spawn ────────────────────────────────────────────────────────────────────

/// Spawn a future as a background task.
pub fn spawn<F>(future: F) -> SpawnHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    SpawnHandle {
        handle: tokio::spawn(future),
    }
}

/// Handle to a spawned background task, allowing cancellation.
#[derive(Debug)]
pub struct SpawnHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SpawnHandle {
    /// Abort the spawned task.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Request limits ───────────────────────────────────────────────────────────

/// Per-call bounds on a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Fill an unset timeout from a default.
    pub fn or_timeout(mut self, default: Option<Duration>) -> Self {
        if self.timeout.is_none() {
            self.timeout = default;
        }
        self
    }
}

/// Run `future` until it finishes, the timeout elapses, or the token fires.
pub async fn bounded<F, T>(options: &RequestOptions, future: F) -> Result<T, RestError>
where
    F: Future<Output = Result<T, RestError>>,
{
    let timed = async {
        match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, future).await {
                Ok(result) => result,
                Err(_) => Err(RestError::Timeout(limit)),
            },
            None => future.await,
        }
    };

    match &options.cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(RestError::Cancelled),
            result = timed => result,
        },
        None => timed.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_elapses() {
        let options = RequestOptions {
            timeout: Some(Duration::from_millis(10)),
            cancel: None,
        };
        let result: Result<(), _> = bounded(&options, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RestError::Timeout(_))));
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let options = RequestOptions {
            timeout: None,
            cancel: Some(token),
        };
        let result: Result<(), _> = bounded(&options, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RestError::Cancelled)));
    }

    #[tokio::test]
    async fn passes_through_result() {
        let options = RequestOptions::default().or_timeout(Some(Duration::from_secs(1)));
        assert_eq!(options.timeout, Some(Duration::from_secs(1)));
        let value = bounded(&options, async { Ok::<_, RestError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
