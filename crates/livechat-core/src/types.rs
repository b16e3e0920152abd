use serde::{Deserialize, Serialize};

/// Identity of a conversation thread.
///
/// A one-to-one thread is addressed by `peer_id`, a group thread by
/// `group_id`. `conversation_id` names a conversation proxy and, when set,
/// takes precedence for addressing a specific thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    /// One-to-one peer user ID.
    pub peer_id: Option<String>,
    /// Group (channel) ID.
    pub group_id: Option<i64>,
    /// Conversation proxy ID.
    pub conversation_id: Option<i64>,
}

/// Resolved addressing target for a conversation key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConversationTarget {
    /// Explicit conversation proxy thread.
    Proxy(i64),
    /// Group thread.
    Group(i64),
    /// One-to-one thread.
    Peer(String),
}

impl ConversationKey {
    /// Key for a one-to-one thread.
    pub fn peer(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: Some(peer_id.into()),
            ..Self::default()
        }
    }

    /// Key for a group thread.
    pub fn group(group_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    /// Attach a conversation proxy ID.
    pub fn with_conversation(mut self, conversation_id: i64) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// `true` when a peer or group ID is present, i.e. a message can be routed.
    pub fn is_routable(&self) -> bool {
        self.peer_id.is_some() || self.group_id.is_some()
    }

    /// `true` when any identity field is present.
    pub fn is_addressable(&self) -> bool {
        self.is_routable() || self.conversation_id.is_some()
    }

    /// Addressing target, proxy first, then group, then peer.
    pub fn target(&self) -> Option<ConversationTarget> {
        if let Some(conversation_id) = self.conversation_id {
            return Some(ConversationTarget::Proxy(conversation_id));
        }
        if let Some(group_id) = self.group_id {
            return Some(ConversationTarget::Group(group_id));
        }
        self.peer_id.clone().map(ConversationTarget::Peer)
    }

    /// Key identifying the thread itself: group threads drop the sender.
    pub fn thread_key(&self) -> ConversationKey {
        match self.group_id {
            Some(group_id) => ConversationKey {
                peer_id: None,
                group_id: Some(group_id),
                conversation_id: self.conversation_id,
            },
            None => self.clone(),
        }
    }

    /// Whether two keys name the same thread for routing purposes.
    ///
    /// Group IDs win when either side is a group; otherwise peers are compared.
    pub fn same_thread(&self, other: &ConversationKey) -> bool {
        match (self.group_id, other.group_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.peer_id.is_some() && self.peer_id == other.peer_id,
            _ => false,
        }
    }
}

/// Message notification delivered by the real-time channel or push system.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Thread the message belongs to.
    pub key: ConversationKey,
    /// Display-ready body when available.
    pub body: Option<String>,
    /// Whether the authenticated local user sent this message.
    pub sent_by_self: bool,
    /// Stable message key when available.
    pub message_key: Option<String>,
}

impl IncomingMessage {
    /// Build a message received from another user.
    pub fn received(key: ConversationKey, body: impl Into<String>) -> Self {
        Self {
            key,
            body: Some(body.into()),
            sent_by_self: false,
            message_key: None,
        }
    }

    /// Mark the message as sent by the local user.
    pub fn from_self(mut self) -> Self {
        self.sent_by_self = true;
        self
    }
}

/// The conversation currently visible to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveConversation {
    /// Identity of the visible thread.
    pub key: ConversationKey,
}

impl ActiveConversation {
    pub fn new(key: ConversationKey) -> Self {
        Self { key }
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.key.peer_id.as_deref()
    }

    pub fn group_id(&self) -> Option<i64> {
        self.key.group_id
    }

    /// An active conversation only counts as open when it names a peer or group.
    pub fn is_open(&self) -> bool {
        self.key.is_routable()
    }
}

/// Explicit session handle owned by the host UI layer.
///
/// Holds the visible conversation and a launch request that the host has not
/// presented yet (from a tapped banner or a push opened from background).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSession {
    active: Option<ActiveConversation>,
    pending_launch: Option<ConversationKey>,
}

impl ConversationSession {
    /// The visible conversation, if one is open.
    pub fn active(&self) -> Option<&ActiveConversation> {
        self.active.as_ref().filter(|active| active.is_open())
    }

    /// Record that the host opened a conversation.
    pub fn open(&mut self, key: ConversationKey) {
        self.active = Some(ActiveConversation::new(key));
    }

    /// Record that the host closed the visible conversation.
    pub fn close(&mut self) {
        self.active = None;
    }

    /// Switch to `key` and queue a launch for the host to present.
    pub fn switch_to(&mut self, key: ConversationKey) {
        self.active = Some(ActiveConversation::new(key.clone()));
        self.pending_launch = Some(key);
    }

    /// Take the queued launch request, if any.
    pub fn take_pending_launch(&mut self) -> Option<ConversationKey> {
        self.pending_launch.take()
    }
}

/// Delivery state of an outgoing message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Not yet acknowledged by the server.
    Pending,
    /// Accepted by the server.
    Sent,
    /// Delivered to the recipient device.
    Delivered,
    /// Read by the recipient.
    Read,
}

/// Typing indicator state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypingStatus {
    Started,
    Stopped,
}

/// Application state a push notification was delivered in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppState {
    /// App is in the foreground.
    Active,
    /// App is being opened from the notification.
    Inactive,
    /// App stays in the background.
    Background,
}

/// Observable reconnect state reported to hosts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReconnectStatus {
    /// Real-time channel is connected.
    Connected,
    /// Channel is down and no retry is pending.
    Disconnected { retry_count: u32 },
    /// A retry attempt is scheduled.
    RetryScheduled { retry_count: u32, delay_ms: u64 },
    /// Automatic retries are exhausted; a manual reconnect is required.
    RetryExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_prefers_proxy_then_group_then_peer() {
        let key = ConversationKey::peer("bob").with_conversation(7);
        assert_eq!(key.target(), Some(ConversationTarget::Proxy(7)));

        let key = ConversationKey {
            peer_id: Some("bob".into()),
            group_id: Some(42),
            conversation_id: None,
        };
        assert_eq!(key.target(), Some(ConversationTarget::Group(42)));

        assert_eq!(
            ConversationKey::peer("bob").target(),
            Some(ConversationTarget::Peer("bob".into()))
        );
        assert_eq!(ConversationKey::default().target(), None);
    }

    #[test]
    fn thread_key_drops_group_sender() {
        let from_alice = ConversationKey {
            peer_id: Some("alice".into()),
            group_id: Some(1),
            conversation_id: None,
        };
        assert_eq!(from_alice.thread_key(), ConversationKey::group(1));

        let one_to_one = ConversationKey::peer("bob").with_conversation(9);
        assert_eq!(one_to_one.thread_key(), one_to_one);
    }

    #[test]
    fn proxy_only_key_is_addressable_but_not_routable() {
        let key = ConversationKey::default().with_conversation(3);
        assert!(key.is_addressable());
        assert!(!key.is_routable());
    }

    #[test]
    fn same_thread_does_not_match_group_against_peer() {
        let group = ConversationKey {
            peer_id: Some("bob".into()),
            group_id: Some(1),
            conversation_id: None,
        };
        assert!(!group.same_thread(&ConversationKey::peer("bob")));
        assert!(group.same_thread(&ConversationKey::group(1)));
        assert!(!ConversationKey::default().same_thread(&ConversationKey::default()));
    }

    #[test]
    fn session_switch_queues_single_launch() {
        let mut session = ConversationSession::default();
        session.switch_to(ConversationKey::group(9));

        assert_eq!(session.active().map(|a| a.group_id()), Some(Some(9)));
        assert_eq!(
            session.take_pending_launch(),
            Some(ConversationKey::group(9))
        );
        assert_eq!(session.take_pending_launch(), None);
    }

    #[test]
    fn session_hides_active_without_identity() {
        let mut session = ConversationSession::default();
        session.open(ConversationKey::default());
        assert!(session.active().is_none());

        session.open(ConversationKey::peer("alice"));
        assert_eq!(session.active().and_then(|a| a.peer_id()), Some("alice"));

        session.close();
        assert!(session.active().is_none());
    }
}
