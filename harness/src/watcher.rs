//! Timeout-bounded marker detection on line-oriented streams
//!
//! Each `watch` call runs its scan on a background task so a pending
//! line read never stalls the orchestrating flow. The caller waits for
//! the task at a join/timeout boundary; the only data crossing it is
//! the result plus the line reader handed back for the next call.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Terminal state of a single watch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The marker appeared in a line before the budget ran out.
    Matched,
    /// The budget elapsed without a match; the stream may still be open.
    TimedOut,
    /// The stream ended before a match was found.
    StreamClosed,
}

/// Immutable record of one watch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchResult {
    pub outcome: WatchOutcome,
    /// Text following the first occurrence of the marker on the
    /// matching line. Present iff the outcome is `Matched`.
    pub remainder: Option<String>,
}

impl WatchResult {
    fn matched(remainder: String) -> Self {
        Self {
            outcome: WatchOutcome::Matched,
            remainder: Some(remainder),
        }
    }

    fn timed_out() -> Self {
        Self {
            outcome: WatchOutcome::TimedOut,
            remainder: None,
        }
    }

    fn stream_closed() -> Self {
        Self {
            outcome: WatchOutcome::StreamClosed,
            remainder: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.outcome == WatchOutcome::Matched
    }
}

type LineReader<R> = Lines<BufReader<R>>;

/// Scans a line-oriented stream for marker substrings.
///
/// Sequential `watch` calls resume from the stream's current read
/// position; `&mut self` guarantees at most one active scan per stream.
pub struct OutputWatcher<R> {
    reader: Option<LineReader<R>>,
}

impl<R> OutputWatcher<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(stream: R) -> Self {
        Self {
            reader: Some(BufReader::new(stream).lines()),
        }
    }

    /// Scan for `marker`, waiting at most `budget`.
    ///
    /// Cancellation after the budget elapses is cooperative: the scan
    /// task observes it at its next await point and hands the reader
    /// back. A match that raced the deadline still counts. Once the
    /// stream has closed, every further call reports `StreamClosed`
    /// immediately.
    pub async fn watch(&mut self, marker: &str, budget: Duration) -> WatchResult {
        let Some(lines) = self.reader.take() else {
            return WatchResult::stream_closed();
        };

        let stop = CancellationToken::new();
        let mut task = tokio::spawn(scan(lines, marker.to_string(), stop.clone()));

        let (result, reader) = match timeout(budget, &mut task).await {
            Ok(Ok(done)) => done,
            Ok(Err(join_err)) => {
                tracing::error!("❌ Watch task failed: {}", join_err);
                (WatchResult::stream_closed(), None)
            }
            Err(_elapsed) => {
                stop.cancel();
                match task.await {
                    Ok((result, reader)) if result.is_match() => (result, reader),
                    Ok((_, reader)) => (WatchResult::timed_out(), reader),
                    Err(join_err) => {
                        tracing::error!("❌ Watch task failed after cancel: {}", join_err);
                        (WatchResult::timed_out(), None)
                    }
                }
            }
        };

        self.reader = reader;
        result
    }
}

/// Reads one line at a time until the marker matches, the stream ends
/// or the stop token fires. Returns the reader so the next watch call
/// picks up from the current position.
async fn scan<R>(
    mut lines: LineReader<R>,
    marker: String,
    stop: CancellationToken,
) -> (WatchResult, Option<LineReader<R>>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let read = tokio::select! {
            biased;
            _ = stop.cancelled() => return (WatchResult::timed_out(), Some(lines)),
            read = lines.next_line() => read,
        };

        match read {
            Ok(Some(line)) => {
                if let Some(at) = line.find(&marker) {
                    let remainder = line[at + marker.len()..].to_string();
                    return (WatchResult::matched(remainder), Some(lines));
                }
            }
            Ok(None) => return (WatchResult::stream_closed(), None),
            Err(e) => {
                tracing::debug!("Stream read error treated as close: {}", e);
                return (WatchResult::stream_closed(), None);
            }
        }
    }
}
