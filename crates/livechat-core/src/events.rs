use serde::{Deserialize, Serialize};

use crate::{
    coordinator::{MessageRouting, PushRouting},
    types::{AppState, DeliveryStatus, IncomingMessage, ReconnectStatus, TypingStatus},
};

/// Closed set of inbound events from the real-time channel and host
/// notification sources, processed strictly in delivery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LiveEvent {
    /// Real-time channel connected.
    Connected,
    /// Real-time channel connection closed unexpectedly.
    ConnectionClosed,
    /// New message for any thread.
    MessageReceived(IncomingMessage),
    /// Delivery/read state of one message changed.
    DeliveryStatusChanged {
        message_key: String,
        peer_id: String,
        status: DeliveryStatus,
    },
    /// Delivery/read state of all messages to a contact changed.
    ContactStatusChanged {
        peer_id: String,
        status: DeliveryStatus,
    },
    /// A user started or stopped typing.
    TypingStatusChanged {
        peer_id: String,
        status: TypingStatus,
    },
    /// A user was blocked or unblocked.
    UserBlocked { user_id: String, is_blocked: bool },
    /// Profile or presence details of a user changed.
    UserDetailUpdated { user_id: String },
    /// A group was renamed.
    ChannelNameUpdated,
    /// Push notification delivered by the host.
    PushReceived {
        payload: String,
        alert: Option<String>,
        app_state: AppState,
    },
    /// User asked to reconnect after automatic retries stopped.
    ManualReconnect,
}

/// Observable outcomes broadcast to host observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LiveNotice {
    /// A message was routed.
    MessageRouted(MessageRouting),
    /// A push notification was routed.
    PushRouted(PushRouting),
    /// Reconnect supervision changed state.
    ReconnectStateChanged(ReconnectStatus),
    /// An event was dropped; the next list refresh recovers it.
    EventDropped { code: String, message: String },
}
