use crate::models::ProgressEvent;
use futures::Stream;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("observer fell behind and skipped {0} events")]
    Lagged(u64),

    #[error("notification channel closed")]
    Closed,
}

/// Fans progress events out to every connected observer.
///
/// Delivery is at-most-once: an observer only sees events published while it is
/// subscribed, and a slow observer skips what overflowed its buffer.
#[derive(Debug, Clone)]
pub struct ProgressHub {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes to current observers and returns how many were reached.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        // An error here only means nobody is listening.
        self.tx.send(event).unwrap_or(0)
    }

    /// Registers a new observer. Dropping it deregisters.
    pub fn subscribe(&self) -> Observer {
        tracing::debug!("Observer connected ({} total)", self.observer_count() + 1);
        Observer {
            rx: self.tx.subscribe(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct Observer {
    rx: broadcast::Receiver<ProgressEvent>,
}

impl Observer {
    pub async fn recv(&mut self) -> Result<ProgressEvent, NotifyError> {
        self.rx.recv().await.map_err(|e| match e {
            RecvError::Lagged(n) => NotifyError::Lagged(n),
            RecvError::Closed => NotifyError::Closed,
        })
    }

    /// Turns the observer into an endless event stream, skipping over lag.
    pub fn into_stream(mut self) -> impl Stream<Item = ProgressEvent> {
        async_stream::stream! {
            loop {
                match self.recv().await {
                    Ok(event) => yield event,
                    Err(NotifyError::Lagged(n)) => {
                        tracing::warn!("Progress observer lagged, skipped {} events", n);
                    }
                    Err(NotifyError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_publish_without_observers_is_not_an_error() {
        let hub = ProgressHub::new(8);
        assert_eq!(hub.publish(ProgressEvent::new(10)), 0);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let hub = ProgressHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        for pct in [10, 60, 100] {
            assert_eq!(hub.publish(ProgressEvent::new(pct)), 2);
        }

        for observer in [&mut first, &mut second] {
            for pct in [10, 60, 100] {
                assert_eq!(observer.recv().await.unwrap().progress, pct);
            }
        }
    }

    #[tokio::test]
    async fn test_late_observer_misses_earlier_events() {
        let hub = ProgressHub::new(8);
        hub.publish(ProgressEvent::new(30));

        let mut late = hub.subscribe();
        hub.publish(ProgressEvent::new(70));
        assert_eq!(late.recv().await.unwrap().progress, 70);
    }

    #[tokio::test]
    async fn test_disconnect_deregisters() {
        let hub = ProgressHub::new(8);
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.observer_count(), 2);

        drop(a);
        assert_eq!(hub.observer_count(), 1);
        drop(b);
        assert_eq!(hub.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_observer_skips_ahead() {
        let hub = ProgressHub::new(2);
        let observer = hub.subscribe();
        for pct in [10, 20, 30, 40, 50] {
            hub.publish(ProgressEvent::new(pct));
        }

        let events: Vec<u8> = observer
            .into_stream()
            .take(2)
            .map(|e| e.progress)
            .collect()
            .await;
        assert_eq!(events, vec![40, 50]);
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_dropped() {
        let hub = ProgressHub::new(4);
        let observer = hub.subscribe();
        hub.publish(ProgressEvent::new(5));
        drop(hub);

        let events: Vec<ProgressEvent> = observer.into_stream().collect().await;
        assert_eq!(events, vec![ProgressEvent::new(5)]);
    }
}
