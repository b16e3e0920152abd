use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::events::{LiveEvent, LiveNotice};

/// Broadcast notice stream type used by host observers.
pub type NoticeStream = broadcast::Receiver<LiveNotice>;

/// Errors returned by live channel operations.
#[derive(Debug, Error)]
pub enum LiveChannelError {
    /// The event receiver side is closed.
    #[error("event channel is closed")]
    EventChannelClosed,
}

/// Event/notice channel pair shared by producers, the dispatcher, and observers.
///
/// Events flow through a single ordered queue; dropping the receiver ends
/// the subscription.
#[derive(Clone, Debug)]
pub struct LiveChannels {
    event_tx: mpsc::Sender<LiveEvent>,
    notice_tx: broadcast::Sender<LiveNotice>,
}

impl LiveChannels {
    /// Create a new channel set and return it with the event receiver.
    pub fn new(event_buffer: usize, notice_buffer: usize) -> (Self, mpsc::Receiver<LiveEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let (notice_tx, _) = broadcast::channel(notice_buffer.max(1));

        (
            Self {
                event_tx,
                notice_tx,
            },
            event_rx,
        )
    }

    /// Clone the event sender.
    pub fn event_sender(&self) -> mpsc::Sender<LiveEvent> {
        self.event_tx.clone()
    }

    /// Clone the notice sender.
    pub fn notice_sender(&self) -> broadcast::Sender<LiveNotice> {
        self.notice_tx.clone()
    }

    /// Subscribe to emitted notices.
    pub fn subscribe(&self) -> NoticeStream {
        self.notice_tx.subscribe()
    }

    /// Queue one inbound event.
    pub async fn send_event(&self, event: LiveEvent) -> Result<(), LiveChannelError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| LiveChannelError::EventChannelClosed)
    }

    /// Emit a notice to all subscribers.
    ///
    /// Emission is best-effort; lagged subscribers are handled by `broadcast`.
    pub fn emit(&self, notice: LiveNotice) {
        let _ = self.notice_tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReconnectStatus;

    #[tokio::test]
    async fn delivers_events_in_order() {
        let (channels, mut rx) = LiveChannels::new(8, 8);
        channels
            .send_event(LiveEvent::ConnectionClosed)
            .await
            .expect("event send should work");
        channels
            .send_event(LiveEvent::Connected)
            .await
            .expect("event send should work");

        assert_eq!(rx.recv().await, Some(LiveEvent::ConnectionClosed));
        assert_eq!(rx.recv().await, Some(LiveEvent::Connected));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (channels, rx) = LiveChannels::new(1, 1);
        drop(rx);
        let err = channels
            .send_event(LiveEvent::ChannelNameUpdated)
            .await
            .expect_err("closed receiver must fail");
        assert!(matches!(err, LiveChannelError::EventChannelClosed));
    }

    #[tokio::test]
    async fn fans_out_notices_to_subscribers() {
        let (channels, _) = LiveChannels::new(4, 16);
        let mut a = channels.subscribe();
        let mut b = channels.subscribe();

        channels.emit(LiveNotice::ReconnectStateChanged(ReconnectStatus::Connected));

        let notice_a = a.recv().await.expect("subscriber a should receive notice");
        let notice_b = b.recv().await.expect("subscriber b should receive notice");
        assert_eq!(notice_a, notice_b);
    }

    #[test]
    fn events_serialize_with_variant_names() {
        let json = serde_json::to_string(&LiveEvent::UserBlocked {
            user_id: "bob".into(),
            is_blocked: true,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"UserBlocked":{"user_id":"bob","is_blocked":true}}"#);
    }
}
