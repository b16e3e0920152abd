//! Routing of live events to the open conversation, the banner presenter, or
//! the conversation list.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::LiveError,
    normalization::PushRoute,
    types::{
        ActiveConversation, ConversationKey, DeliveryStatus, IncomingMessage, TypingStatus,
    },
};

/// How an incoming message should be applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Append to the visible conversation in place.
    UpdateActiveConversation,
    /// Present a banner; tapping it opens `target`.
    ShowBanner { target: ConversationKey },
    /// Nothing beyond the list refresh.
    NoOp,
}

/// Decision plus the list-refresh signal that accompanies it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRouting {
    pub decision: RoutingDecision,
    /// Set whenever the message was not routed to the active conversation.
    pub refresh_list: bool,
}

impl MessageRouting {
    fn active() -> Self {
        Self {
            decision: RoutingDecision::UpdateActiveConversation,
            refresh_list: false,
        }
    }

    fn elsewhere(decision: RoutingDecision) -> Self {
        Self {
            decision,
            refresh_list: true,
        }
    }
}

/// Result of a block/unblock notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUpdate {
    /// User whose status must be written to the user-status cache.
    pub user_id: String,
    pub is_blocked: bool,
    /// The visible conversation is with this user and must re-check block state.
    pub recheck_active: bool,
}

/// Result of a user profile/presence change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailUpdate {
    pub user_id: String,
    pub refresh_list: bool,
    /// The visible conversation is with this user.
    pub refresh_active: bool,
}

/// Push notification outcome after routing against the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushRouting {
    /// Foreground push: add to the conversation list summary.
    AppendToList(IncomingMessage),
    /// Push opened from background: switch the session to this thread.
    LaunchConversation(ConversationKey),
    /// The thread is already visible; nothing to launch.
    AlreadyActive,
    /// Nothing to do.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Present in-app banners for messages to other threads.
    pub in_app_banners: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            in_app_banners: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiveUpdateCoordinator {
    config: CoordinatorConfig,
}

impl LiveUpdateCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    pub fn on_message_received(
        &self,
        event: &IncomingMessage,
        active: Option<&ActiveConversation>,
    ) -> MessageRouting {
        if !event.key.is_routable() {
            let err = LiveError::malformed("message has neither peer nor group id");
            warn!(error = %err, "dropping message event");
            return MessageRouting::elsewhere(RoutingDecision::NoOp);
        }

        if let Some(active) = active.filter(|active| active.is_open())
            && is_for_active_thread(event, active)
        {
            debug!(target_key = ?event.key, "message routed to active conversation");
            return MessageRouting::active();
        }

        if event.sent_by_self {
            return MessageRouting::elsewhere(RoutingDecision::NoOp);
        }

        if !self.config.in_app_banners {
            debug!(target_key = ?event.key, "in-app banners disabled");
            return MessageRouting::elsewhere(RoutingDecision::NoOp);
        }

        MessageRouting::elsewhere(RoutingDecision::ShowBanner {
            target: event.key.clone(),
        })
    }

    /// Best-effort: the status lands on the open conversation, or nowhere.
    pub fn on_delivery_status_changed<'a>(
        &self,
        message_key: &str,
        peer_id: &str,
        status: DeliveryStatus,
        active: Option<&'a ActiveConversation>,
    ) -> Option<&'a ActiveConversation> {
        let target = active.filter(|active| active.is_open());
        if target.is_none() {
            debug!(
                message_key,
                peer_id,
                ?status,
                "delivery status ignored, no open conversation"
            );
        }
        target
    }

    /// Bulk status for every message sent to `peer_id`.
    pub fn on_contact_status_changed<'a>(
        &self,
        peer_id: &str,
        status: DeliveryStatus,
        active: Option<&'a ActiveConversation>,
    ) -> Option<&'a ActiveConversation> {
        let target = active.filter(|active| active.is_open());
        if target.is_none() {
            debug!(peer_id, ?status, "contact status ignored, no open conversation");
        }
        target
    }

    /// Group threads accept typing events from any member.
    pub fn on_typing_status_changed<'a>(
        &self,
        peer_id: &str,
        status: TypingStatus,
        active: Option<&'a ActiveConversation>,
    ) -> Option<&'a ActiveConversation> {
        let active = active.filter(|active| active.is_open())?;
        if active.peer_id() == Some(peer_id) || active.group_id().is_some() {
            return Some(active);
        }
        debug!(peer_id, ?status, "typing status for another thread ignored");
        None
    }

    pub fn on_user_blocked(
        &self,
        user_id: &str,
        is_blocked: bool,
        active: Option<&ActiveConversation>,
    ) -> BlockUpdate {
        BlockUpdate {
            user_id: user_id.to_owned(),
            is_blocked,
            recheck_active: is_active_peer(user_id, active),
        }
    }

    pub fn on_user_detail_updated(
        &self,
        user_id: &str,
        active: Option<&ActiveConversation>,
    ) -> DetailUpdate {
        DetailUpdate {
            user_id: user_id.to_owned(),
            refresh_list: true,
            refresh_active: is_active_peer(user_id, active),
        }
    }

    /// After the channel reconnects, the open thread needs its own
    /// subscription restored.
    pub fn on_connected<'a>(
        &self,
        active: Option<&'a ActiveConversation>,
    ) -> Option<&'a ActiveConversation> {
        active.filter(|active| active.is_open())
    }

    pub fn on_push(&self, route: PushRoute, active: Option<&ActiveConversation>) -> PushRouting {
        match route {
            PushRoute::Foreground(message) => PushRouting::AppendToList(message),
            PushRoute::Launch(key) => {
                if let Some(active) = active.filter(|active| active.is_open())
                    && active.key.same_thread(&key)
                    && (key.conversation_id.is_none()
                        || key.conversation_id == active.key.conversation_id)
                {
                    return PushRouting::AlreadyActive;
                }
                PushRouting::LaunchConversation(key)
            }
            PushRoute::Ignore => PushRouting::Ignore,
        }
    }
}

fn is_for_active_thread(event: &IncomingMessage, active: &ActiveConversation) -> bool {
    match event.key.group_id {
        Some(group_id) => active.group_id() == Some(group_id),
        None => active.group_id().is_none() && event.key.peer_id.as_deref() == active.peer_id(),
    }
}

fn is_active_peer(user_id: &str, active: Option<&ActiveConversation>) -> bool {
    active
        .filter(|active| active.is_open() && active.group_id().is_none())
        .and_then(ActiveConversation::peer_id)
        == Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> LiveUpdateCoordinator {
        LiveUpdateCoordinator::default()
    }

    fn from_bob() -> IncomingMessage {
        IncomingMessage::received(ConversationKey::peer("bob"), "hi")
    }

    #[test]
    fn message_without_identity_is_dropped_with_refresh() {
        let active = ActiveConversation::new(ConversationKey::peer("bob"));
        for sent_by_self in [false, true] {
            let event = IncomingMessage {
                sent_by_self,
                ..IncomingMessage::default()
            };
            let routing = coordinator().on_message_received(&event, Some(&active));
            assert_eq!(routing.decision, RoutingDecision::NoOp);
            assert!(routing.refresh_list);
        }
    }

    #[test]
    fn proxy_only_message_is_not_routable() {
        let event = IncomingMessage::received(ConversationKey::default().with_conversation(5), "x");
        let routing = coordinator().on_message_received(&event, None);
        assert_eq!(routing.decision, RoutingDecision::NoOp);
    }

    #[test]
    fn group_message_updates_matching_active_group() {
        let active = ActiveConversation::new(ConversationKey::group(42));
        let event = IncomingMessage::received(ConversationKey::group(42), "hello");
        let routing = coordinator().on_message_received(&event, Some(&active));
        assert_eq!(routing.decision, RoutingDecision::UpdateActiveConversation);
        assert!(!routing.refresh_list);
    }

    #[test]
    fn group_message_does_not_match_peer_thread_with_same_sender() {
        let active = ActiveConversation::new(ConversationKey::peer("bob"));
        let event = IncomingMessage::received(
            ConversationKey {
                peer_id: Some("bob".into()),
                group_id: Some(42),
                conversation_id: None,
            },
            "group hello",
        );
        let routing = coordinator().on_message_received(&event, Some(&active));
        assert!(matches!(routing.decision, RoutingDecision::ShowBanner { .. }));
    }

    #[test]
    fn banner_targets_sender_when_nothing_is_open() {
        let routing = coordinator().on_message_received(&from_bob(), None);
        assert_eq!(
            routing.decision,
            RoutingDecision::ShowBanner {
                target: ConversationKey::peer("bob")
            }
        );
        assert!(routing.refresh_list);
    }

    #[test]
    fn self_sent_message_to_inactive_thread_never_banners() {
        let active = ActiveConversation::new(ConversationKey::peer("carol"));
        let event = from_bob().from_self();
        for active in [None, Some(&active)] {
            let routing = coordinator().on_message_received(&event, active);
            assert_eq!(routing.decision, RoutingDecision::NoOp);
            assert!(routing.refresh_list);
        }
    }

    #[test]
    fn self_sent_message_to_active_thread_updates_it() {
        let active = ActiveConversation::new(ConversationKey::peer("bob"));
        let routing = coordinator().on_message_received(&from_bob().from_self(), Some(&active));
        assert_eq!(routing.decision, RoutingDecision::UpdateActiveConversation);
    }

    #[test]
    fn banner_suppressed_only_when_disabled() {
        let disabled = LiveUpdateCoordinator::new(CoordinatorConfig {
            in_app_banners: false,
        });
        let routing = disabled.on_message_received(&from_bob(), None);
        assert_eq!(routing.decision, RoutingDecision::NoOp);
        assert!(routing.refresh_list);

        let carol = ActiveConversation::new(ConversationKey::peer("carol"));
        assert_eq!(
            coordinator().on_message_received(&from_bob(), Some(&carol)).decision,
            RoutingDecision::ShowBanner {
                target: ConversationKey::peer("bob")
            }
        );
    }

    #[test]
    fn delivery_status_needs_open_conversation() {
        let active = ActiveConversation::new(ConversationKey::peer("bob"));
        let c = coordinator();
        assert!(c
            .on_delivery_status_changed("m1", "bob", DeliveryStatus::Read, None)
            .is_none());
        assert_eq!(
            c.on_delivery_status_changed("m1", "bob", DeliveryStatus::Read, Some(&active)),
            Some(&active)
        );
        assert_eq!(
            c.on_contact_status_changed("bob", DeliveryStatus::Delivered, Some(&active)),
            Some(&active)
        );
    }

    #[test]
    fn typing_applies_to_matching_peer_or_any_group_member() {
        let c = coordinator();
        let peer = ActiveConversation::new(ConversationKey::peer("bob"));
        let group = ActiveConversation::new(ConversationKey::group(3));

        assert!(c.on_typing_status_changed("bob", TypingStatus::Started, Some(&peer)).is_some());
        assert!(c.on_typing_status_changed("eve", TypingStatus::Started, Some(&peer)).is_none());
        assert!(c.on_typing_status_changed("eve", TypingStatus::Started, Some(&group)).is_some());
        assert!(c.on_typing_status_changed("bob", TypingStatus::Stopped, None).is_none());
    }

    #[test]
    fn block_rechecks_only_matching_one_to_one_thread() {
        let c = coordinator();
        let peer = ActiveConversation::new(ConversationKey::peer("bob"));
        let group = ActiveConversation::new(ConversationKey::group(3));

        let update = c.on_user_blocked("bob", true, Some(&peer));
        assert!(update.recheck_active);
        assert!(update.is_blocked);
        assert!(!c.on_user_blocked("bob", true, Some(&group)).recheck_active);
        assert!(!c.on_user_blocked("zed", false, None).recheck_active);
    }

    #[test]
    fn detail_update_always_refreshes_list() {
        let update = coordinator().on_user_detail_updated("bob", None);
        assert!(update.refresh_list);
        assert!(!update.refresh_active);
    }

    #[test]
    fn push_launch_skips_already_visible_thread() {
        let c = coordinator();
        let active = ActiveConversation::new(ConversationKey::group(8));
        assert_eq!(
            c.on_push(PushRoute::Launch(ConversationKey::group(8)), Some(&active)),
            PushRouting::AlreadyActive
        );
        assert_eq!(
            c.on_push(PushRoute::Launch(ConversationKey::peer("bob")), Some(&active)),
            PushRouting::LaunchConversation(ConversationKey::peer("bob"))
        );
    }
}
