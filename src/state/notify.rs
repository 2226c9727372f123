use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::dto::notice::SessionNotice;

/// Broadcast hub fanning session notices out to every UI subscriber.
pub struct NoticeHub {
    sender: broadcast::Sender<SessionNotice>,
}

impl NoticeHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.sender.subscribe()
    }

    /// Send a notice to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, notice: SessionNotice) {
        let _ = self.sender.send(notice);
    }

    /// Subscribe and expose the notices as a stream that skips over lagged messages.
    ///
    /// A forwarder task pumps the broadcast receiver into a small bounded channel and stops
    /// once the stream is dropped.
    pub fn stream(&self) -> impl Stream<Item = SessionNotice> + Send + 'static {
        let mut receiver = self.subscribe();
        let (tx, rx) = mpsc::channel::<SessionNotice>(8);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    recv_result = receiver.recv() => {
                        match recv_result {
                            Ok(notice) => {
                                if tx.send(notice).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Closed) => break,
                            Err(RecvError::Lagged(skipped)) => {
                                debug!(skipped, "notice subscriber lagging; skipping notices");
                                continue;
                            }
                        }
                    }
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn stream_receives_notices_broadcast_after_subscribing() {
        let hub = NoticeHub::new(4);
        let mut stream = Box::pin(hub.stream());

        hub.broadcast(SessionNotice::TimerTick { time_remaining: 9 });
        hub.broadcast(SessionNotice::StorageDegraded);

        assert_eq!(
            stream.next().await,
            Some(SessionNotice::TimerTick { time_remaining: 9 })
        );
        assert_eq!(stream.next().await, Some(SessionNotice::StorageDegraded));
    }
}
