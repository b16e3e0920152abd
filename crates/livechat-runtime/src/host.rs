//! Contracts for the host UI layer and the shared conversation session.

use std::sync::{
    Arc, Mutex, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use livechat_core::{
    ActiveConversation, ConversationKey, ConversationList, ConversationSession,
    ConversationSummary, DeliveryStatus, IncomingMessage, ListMergeError, ListOp, RoutingDecision,
    TypingStatus,
};
use tracing::warn;

/// Conversation list collaborator.
pub trait ConversationListView: Send + Sync {
    /// Fold a routed message into the list.
    fn apply_routing_decision(&self, message: &IncomingMessage, decision: &RoutingDecision);

    /// Re-read list summaries from the message store.
    fn refresh_summaries(&self);

    /// Add a message received as a foreground push.
    fn append_message(&self, message: &IncomingMessage);
}

/// View-model of the visible conversation.
pub trait ActiveConversationView: Send + Sync {
    fn apply_message(&self, active: &ActiveConversation, message: &IncomingMessage);

    fn apply_delivery_status(
        &self,
        active: &ActiveConversation,
        message_key: &str,
        peer_id: &str,
        status: DeliveryStatus,
    );

    fn apply_contact_status(
        &self,
        active: &ActiveConversation,
        peer_id: &str,
        status: DeliveryStatus,
    );

    fn apply_typing_status(
        &self,
        active: &ActiveConversation,
        peer_id: &str,
        status: TypingStatus,
    );

    fn recheck_block_state(&self, active: &ActiveConversation);

    fn refresh_details(&self, active: &ActiveConversation, user_id: &str);

    /// Restore the thread-level subscription after the channel reconnects.
    fn resubscribe_thread(&self, active: &ActiveConversation);
}

/// In-app notification banner.
pub trait BannerPresenter: Send + Sync {
    fn show_banner(&self, message: &IncomingMessage, on_tap: BannerTap);
}

/// Shared handle to the conversation session.
///
/// The host writes the visible conversation; the dispatcher reads it and
/// only switches it on an explicit launch request.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<ConversationSession>>,
}

impl SessionHandle {
    /// Snapshot of the visible conversation.
    pub fn active(&self) -> Option<ActiveConversation> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active()
            .cloned()
    }

    pub fn open(&self, key: ConversationKey) {
        self.write().open(key);
    }

    pub fn close(&self) {
        self.write().close();
    }

    pub fn switch_to(&self, key: ConversationKey) {
        self.write().switch_to(key);
    }

    /// Take the launch queued by a banner tap or a push opened from background.
    pub fn take_pending_launch(&self) -> Option<ConversationKey> {
        self.write().take_pending_launch()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ConversationSession> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Callback target handed to the banner presenter.
#[derive(Debug, Clone)]
pub struct BannerTap {
    target: ConversationKey,
    session: SessionHandle,
}

impl BannerTap {
    pub fn new(target: ConversationKey, session: SessionHandle) -> Self {
        Self { target, session }
    }

    pub fn target(&self) -> &ConversationKey {
        &self.target
    }

    /// The user tapped the banner: switch to its thread.
    pub fn tap(self) -> ConversationKey {
        self.session.switch_to(self.target.clone());
        self.target
    }
}

/// `ConversationListView` backed by the in-memory `ConversationList`.
#[derive(Debug)]
pub struct ListModelView {
    list: Mutex<ConversationList>,
    refreshes: AtomicU64,
}

impl ListModelView {
    pub fn new(max_items: usize) -> Self {
        Self {
            list: Mutex::new(ConversationList::new(max_items)),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<ConversationSummary> {
        self.lock().items().to_vec()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Apply host-side operations (renames, removals, initial load).
    pub fn apply_ops(&self, ops: &[ListOp]) -> Result<(), ListMergeError> {
        self.lock().apply_ops(ops)
    }

    /// Clear the unread badge once the host shows the thread.
    pub fn mark_read(&self, key: &ConversationKey) -> bool {
        self.lock().mark_read(key)
    }

    /// Rows matching the search bar query.
    pub fn search(&self, query: &str) -> Vec<ConversationSummary> {
        self.lock().search(query).into_iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConversationList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_message(&self, message: &IncomingMessage, is_active: bool) {
        if let Err(err) = self.lock().apply_ops(&[ListOp::ApplyMessage {
            message: message.clone(),
            is_active,
        }]) {
            warn!(error = %err, "failed to fold message into conversation list");
        }
    }
}

impl ConversationListView for ListModelView {
    fn apply_routing_decision(&self, message: &IncomingMessage, decision: &RoutingDecision) {
        if !message.key.is_routable() {
            return;
        }
        self.apply_message(
            message,
            matches!(decision, RoutingDecision::UpdateActiveConversation),
        );
    }

    fn refresh_summaries(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn append_message(&self, message: &IncomingMessage) {
        self.apply_message(message, false);
    }
}
