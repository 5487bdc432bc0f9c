//! Transfer progress accounting.
//!
//! Progress updates are rate limited by a [`ProgressTicker`]: an update
//! fires when enough bytes have accumulated since the last one, or when
//! enough time has passed, whichever comes first. Both thresholds reset
//! together, so one crossing yields exactly one update.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::Stream;

/// A snapshot of transfer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes transferred so far.
    pub transferred: u64,
    /// Total bytes expected, when known.
    pub total: Option<u64>,
}

impl Progress {
    /// Create a progress snapshot.
    pub fn new(transferred: u64, total: Option<u64>) -> Self {
        Self { transferred, total }
    }

    /// Fraction of the transfer completed, in `0.0..=1.0`.
    ///
    /// Returns `None` when the total is unknown, which no valid fraction
    /// can be mistaken for.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.transferred as f64 / total as f64).min(1.0))
    }

    /// Whether the transfer has reached its known total.
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.transferred >= total)
    }
}

/// Decides when a progress update is due.
#[derive(Debug)]
pub struct ProgressTicker {
    bytes_per_update: u64,
    max_update_interval: Duration,
    bytes_since_update: u64,
    last_update: Instant,
}

impl ProgressTicker {
    /// Create a ticker with the given thresholds.
    pub fn new(bytes_per_update: u64, max_update_interval: Duration) -> Self {
        Self {
            bytes_per_update,
            max_update_interval,
            bytes_since_update: 0,
            last_update: Instant::now(),
        }
    }

    /// Record transferred bytes; returns true when an update is due.
    ///
    /// Both the byte counter and the clock reset when this returns true.
    pub fn record(&mut self, bytes: u64) -> bool {
        self.bytes_since_update += bytes;
        if self.bytes_since_update >= self.bytes_per_update
            || self.last_update.elapsed() >= self.max_update_interval
        {
            self.reset();
            return true;
        }
        false
    }

    /// Bytes recorded since the last update fired.
    pub fn pending_bytes(&self) -> u64 {
        self.bytes_since_update
    }

    fn reset(&mut self) {
        self.bytes_since_update = 0;
        self.last_update = Instant::now();
    }
}

/// A byte stream that reports progress as it is consumed.
///
/// Chunks pass through unmodified. The callback runs on the polling task
/// whenever the ticker fires, and once more at end of stream if bytes
/// arrived since the last update.
pub struct ProgressStream<S, F> {
    inner: S,
    ticker: ProgressTicker,
    transferred: u64,
    total: Option<u64>,
    callback: F,
    finished: bool,
}

impl<S, F> ProgressStream<S, F>
where
    F: FnMut(Progress),
{
    /// Wrap a stream, reporting against an optional known total.
    pub fn new(inner: S, total: Option<u64>, ticker: ProgressTicker, callback: F) -> Self {
        Self {
            inner,
            ticker,
            transferred: 0,
            total,
            callback,
            finished: false,
        }
    }

    /// Bytes seen so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn progress(&self) -> Progress {
        Progress::new(self.transferred, self.total)
    }
}

impl<S, E, F> Stream for ProgressStream<S, F>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    F: FnMut(Progress) + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.transferred += chunk.len() as u64;
                if this.ticker.record(chunk.len() as u64) {
                    let progress = this.progress();
                    (this.callback)(progress);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                if !this.finished {
                    this.finished = true;
                    // Final update covering any tail below the threshold.
                    if this.ticker.pending_bytes() > 0 || this.transferred == 0 {
                        let progress = this.progress();
                        (this.callback)(progress);
                    }
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
