//! Core live-update contract shared between the runtime and host UI layers.
//!
//! This crate defines the conversation identity model, message routing,
//! reconnect backoff and supervision state machine, push normalization, the
//! conversation list model, and typed event channels.

/// Typed inbound event and outbound notice channels.
pub mod channel;
/// In-memory conversation list model.
pub mod conversation_list;
/// Routing of live events to the open conversation, banners, or the list.
pub mod coordinator;
/// Stable error types.
pub mod error;
/// Inbound events and outbound notices.
pub mod events;
/// Push payload normalization.
pub mod normalization;
/// Randomized backoff used by reconnect supervision.
pub mod retry;
/// Reconnect supervision state machine.
pub mod state_machine;
/// Shared data model.
pub mod types;

pub use channel::{LiveChannelError, LiveChannels, NoticeStream};
pub use conversation_list::{ConversationList, ConversationSummary, ListMergeError, ListOp};
pub use coordinator::{
    BlockUpdate, CoordinatorConfig, DetailUpdate, LiveUpdateCoordinator, MessageRouting,
    PushRouting, RoutingDecision,
};
pub use error::{LiveError, LiveErrorCategory};
pub use events::{LiveEvent, LiveNotice};
pub use normalization::{
    PushRoute, normalize_push, parse_alert_body, parse_push_payload, route_push,
};
pub use retry::ReconnectBackoff;
pub use state_machine::{
    ReconnectAction, ReconnectState, ReconnectStateMachine, RetryGuard, RetryTicket,
};
pub use types::{
    ActiveConversation, AppState, ConversationKey, ConversationSession, ConversationTarget,
    DeliveryStatus, IncomingMessage, ReconnectStatus, TypingStatus,
};
