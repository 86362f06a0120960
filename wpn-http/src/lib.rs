//! Minimal HTTP page fetcher with ordered concurrent fan-out.
//!
//! - [`PageFetcher::fetch_one`]: one GET, returning the raw markup or a
//!   typed [`FetchError`]
//! - [`PageFetcher::fetch_many`]: bounded concurrent fan-out whose result
//!   order always matches the input order, tolerant of per-item failures
//! - [`PageSource`]: the trait seam consumed by the scrape layer, so tests
//!   can substitute in-memory markup for the network
//!
//! No retries live in this layer; retry policy, if any, belongs to the
//! caller.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), wpn_http::FetchError> {
//! let fetcher = wpn_http::PageFetcher::new("https://www.whatsplayingnow.com")?;
//! let markup = fetcher.fetch_one("/channels").await?;
//! # let _ = markup; Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! completion, and errors (target `http`), correlated by a monotonic
//! request id.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
pub use reqwest::StatusCode;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_request_id() -> u64 {
    REQUEST_SEQ.fetch_add(1, Ordering::Relaxed)
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("server returned status {0}")]
    Status(StatusCode),
}

// ==============================
// Trait seam
// ==============================

/// Source of raw page markup, keyed by site-relative path.
///
/// [`PageFetcher`] is the production implementation; tests provide stubs
/// that serve canned markup with injected latencies and failures.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, path: &str) -> Result<String, FetchError>;

    /// Fetch every path, preserving input order in the result. One item's
    /// failure never aborts the batch.
    async fn get_many(&self, paths: &[String]) -> Vec<Result<String, FetchError>>;
}

// ==============================
// Fan-out
// ==============================

/// Run `f` over `items` with at most `limit` futures in flight, correlating
/// each result back to its input slot so the output order equals the input
/// order regardless of completion order.
///
/// With a `deadline`, slots that have not resolved by then complete as
/// `Err(FetchError::Timeout)` instead of blocking the batch.
pub async fn fan_out<T, U, F, Fut>(
    items: Vec<T>,
    limit: usize,
    deadline: Option<Duration>,
    f: F,
) -> Vec<Result<U, FetchError>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<U, FetchError>>,
{
    let deadline_at = deadline.map(|d| Instant::now() + d);

    let mut slots: Vec<Option<Result<U, FetchError>>> = Vec::with_capacity(items.len());
    slots.resize_with(items.len(), || None);

    let indexed = items.into_iter().enumerate().map(|(idx, item)| {
        let fut = f(item);
        async move {
            let res = match deadline_at {
                Some(at) => match tokio::time::timeout_at(at, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(FetchError::Timeout),
                },
                None => fut.await,
            };
            (idx, res)
        }
    });

    let mut stream = futures::stream::iter(indexed).buffer_unordered(limit.max(1));
    while let Some((idx, res)) = stream.next().await {
        // Write-once per slot; joined before return.
        slots[idx] = Some(res);
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(FetchError::Network("request dropped".to_string())))
        })
        .collect()
}

// ==============================
// Fetcher
// ==============================

#[derive(Clone)]
pub struct PageFetcher {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_in_flight: usize,
}

impl PageFetcher {
    /// Construct a fetcher anchored to a base URL.
    ///
    /// ```no_run
    /// use wpn_http::{PageFetcher, FetchError};
    /// use std::time::Duration;
    ///
    /// let fetcher = PageFetcher::new("https://www.whatsplayingnow.com")?;
    /// assert_eq!(fetcher.default_timeout, Duration::from_secs(10));
    /// assert_eq!(fetcher.max_in_flight, 8);
    /// # Ok::<(), FetchError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base).map_err(|e| FetchError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| FetchError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(10),
            max_in_flight: 8,
        })
    }

    /// Override the default timeout returned by [`PageFetcher::new`].
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Override how many requests a batch keeps in flight at once.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    /// GET one page and return its body as text.
    pub async fn fetch_one(&self, path: &str) -> Result<String, FetchError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| FetchError::Url(e.to_string()))?;

        let req_id = next_request_id();
        tracing::debug!(
            target: "http",
            req_id,
            host_path = %format!("{}{}", url.domain().unwrap_or("-"), url.path()),
            timeout_ms = self.default_timeout.as_millis() as u64,
            "http.request.start"
        );

        let t0 = std::time::Instant::now();
        let resp = match self
            .inner
            .get(url)
            .timeout(self.default_timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => return Err(self.classify_send_error(req_id, err)),
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(
                target: "http",
                req_id,
                %status,
                duration_ms = t0.elapsed().as_millis() as u64,
                "http.error"
            );
            return Err(FetchError::Status(status));
        }

        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => return Err(self.classify_send_error(req_id, err)),
        };

        tracing::debug!(
            target: "http",
            req_id,
            %status,
            duration_ms = t0.elapsed().as_millis() as u64,
            body_len = body.len(),
            "http.response"
        );
        Ok(body)
    }

    /// Fetch every path concurrently, bounded by `max_in_flight`, results in
    /// input order.
    pub async fn fetch_many(&self, paths: &[String]) -> Vec<Result<String, FetchError>> {
        self.fetch_many_inner(paths, None).await
    }

    /// Like [`PageFetcher::fetch_many`] with a whole-batch deadline:
    /// requests still pending at the deadline are abandoned and reported as
    /// [`FetchError::Timeout`].
    pub async fn fetch_many_with_deadline(
        &self,
        paths: &[String],
        deadline: Duration,
    ) -> Vec<Result<String, FetchError>> {
        self.fetch_many_inner(paths, Some(deadline)).await
    }

    async fn fetch_many_inner(
        &self,
        paths: &[String],
        deadline: Option<Duration>,
    ) -> Vec<Result<String, FetchError>> {
        let batch = paths.len();
        let t0 = std::time::Instant::now();
        let results = fan_out(paths.to_vec(), self.max_in_flight, deadline, |path| async move {
            self.fetch_one(&path).await
        })
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::debug!(
            target: "http",
            batch,
            failed,
            duration_ms = t0.elapsed().as_millis() as u64,
            "http.batch.done"
        );
        results
    }

    fn classify_send_error(&self, req_id: u64, err: reqwest::Error) -> FetchError {
        let mapped = if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        };
        tracing::warn!(
            target: "http",
            req_id,
            error = %mapped,
            "http.network_error"
        );
        mapped
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn get(&self, path: &str) -> Result<String, FetchError> {
        self.fetch_one(path).await
    }

    async fn get_many(&self, paths: &[String]) -> Vec<Result<String, FetchError>> {
        self.fetch_many(paths).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Output order must match input order for any permutation of latencies.
    #[tokio::test(start_paused = true)]
    async fn fan_out_preserves_input_order() {
        let delays = vec![(0usize, 300u64), (1, 0), (2, 120), (3, 40)];
        let results = fan_out(delays, 8, None, |(idx, delay_ms)| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<_, FetchError>(format!("page-{idx}"))
        })
        .await;

        let pages: Vec<String> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(pages, ["page-0", "page-1", "page-2", "page-3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_deadline_reports_timeout_per_slot() {
        let delays = vec![(0usize, 10u64), (1, 60_000), (2, 20)];
        let results = fan_out(
            delays,
            8,
            Some(Duration::from_millis(500)),
            |(idx, delay_ms)| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok::<_, FetchError>(idx)
            },
        )
        .await;

        assert!(matches!(results[0], Ok(0)));
        assert!(matches!(results[1], Err(FetchError::Timeout)));
        assert!(matches!(results[2], Ok(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_isolates_item_failures() {
        let items = vec![0usize, 1, 2];
        let results = fan_out(items, 2, None, |idx| async move {
            if idx == 1 {
                Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok(idx)
            }
        })
        .await;

        assert!(matches!(results[0], Ok(0)));
        assert!(matches!(results[1], Err(FetchError::Status(_))));
        assert!(matches!(results[2], Ok(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_bounds_in_flight_requests() {
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..16).collect();

        let results = fan_out(items, 3, None, |idx| {
            let live = live.clone();
            let peak = peak.clone();
            async move {
                let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                live.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, FetchError>(idx)
            }
        })
        .await;

        assert_eq!(results.len(), 16);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn error_display_is_stable() {
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
        assert_eq!(
            FetchError::Status(StatusCode::NOT_FOUND).to_string(),
            "server returned status 404 Not Found"
        );
    }
}
