//! Progress tracking for inbound upload bodies.

use crate::models::ProgressEvent;
use crate::services::notifier::NotifyError;
use bytes::Bytes;
use futures::Stream;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Default time between progress samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Receives computed progress events. Errors are logged by the stream and dropped.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) -> Result<(), NotifyError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    /// Upstream reached end-of-input.
    Drained,
    /// Upstream ended with an error (client abort, transport failure).
    Failed,
}

/// Transfer accounting for a single in-flight upload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: Uuid,
    declared_length: Option<u64>,
    transferred: u64,
    percentage: Option<u8>,
    state: SessionState,
}

impl UploadSession {
    pub fn new(declared_length: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            declared_length,
            transferred: 0,
            percentage: None,
            state: SessionState::Streaming,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn declared_length(&self) -> Option<u64> {
        self.declared_length
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last computed percentage, if any sample was taken.
    pub fn percentage(&self) -> Option<u8> {
        self.percentage
    }

    fn record(&mut self, n: usize) {
        self.transferred = self.transferred.saturating_add(n as u64);
    }

    /// Recomputes the percentage. `None` when the declared length is unknown or zero.
    ///
    /// The result is clamped to 100 and never drops below an earlier sample, even if
    /// the client under-declared its length.
    fn sample(&mut self) -> Option<u8> {
        let total = self.declared_length.filter(|t| *t > 0)?;
        let raw = (self.transferred as u128 * 100 / total as u128).min(100) as u8;
        let pct = self.percentage.map_or(raw, |prev| prev.max(raw));
        self.percentage = Some(pct);
        Some(pct)
    }
}

/// Pass-through wrapper around a byte stream that reports upload progress.
///
/// Sampling ticks are evaluated as chunks arrive rather than by a background timer, so
/// there is nothing left running once the body ends or is dropped.
pub struct ProgressStream<S> {
    inner: S,
    session: UploadSession,
    interval: Duration,
    last_tick: Instant,
    sampled_bytes: u64,
    sink: ProgressSink,
    done: bool,
}

impl<S> ProgressStream<S> {
    pub fn new(
        inner: S,
        declared_length: Option<u64>,
        interval: Duration,
        sink: ProgressSink,
    ) -> Self {
        Self {
            inner,
            session: UploadSession::new(declared_length),
            interval,
            last_tick: Instant::now(),
            sampled_bytes: 0,
            sink,
            done: false,
        }
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    fn tick(&mut self) {
        self.last_tick = Instant::now();
        if self.session.transferred() == self.sampled_bytes {
            return;
        }
        self.sampled_bytes = self.session.transferred();

        let Some(pct) = self.session.sample() else {
            return;
        };
        if let Err(e) = (self.sink)(ProgressEvent::new(pct)) {
            tracing::warn!(
                session = %self.session.id(),
                "Dropping progress event {}%: {}",
                pct,
                e
            );
        }
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.session.record(chunk.len());
                if self.last_tick.elapsed() >= self.interval {
                    self.tick();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.session.state = SessionState::Failed;
                self.done = true;
                tracing::warn!(
                    session = %self.session.id(),
                    transferred = self.session.transferred(),
                    "Upload body aborted: {}",
                    e
                );
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                // Final sample so a complete upload always reports its last bytes.
                self.tick();
                self.session.state = SessionState::Drained;
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
