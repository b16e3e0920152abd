use std::sync::Arc;

use livechat_core::{
    IncomingMessage, LiveChannels, LiveError, LiveEvent, LiveNotice, LiveUpdateCoordinator,
    PushRouting, RoutingDecision, normalize_push,
};
use livechat_platform::UserStatusCache;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    host::{ActiveConversationView, BannerPresenter, BannerTap, ConversationListView, SessionHandle},
    supervisor::ReconnectSupervisor,
};

/// Applies inbound events, in order, to the host collaborators.
pub struct LiveDispatcher {
    coordinator: LiveUpdateCoordinator,
    channels: LiveChannels,
    session: SessionHandle,
    supervisor: ReconnectSupervisor,
    users: Arc<dyn UserStatusCache>,
    list: Arc<dyn ConversationListView>,
    conversation: Arc<dyn ActiveConversationView>,
    banners: Arc<dyn BannerPresenter>,
}

impl LiveDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        coordinator: LiveUpdateCoordinator,
        channels: LiveChannels,
        session: SessionHandle,
        supervisor: ReconnectSupervisor,
        users: Arc<dyn UserStatusCache>,
        list: Arc<dyn ConversationListView>,
        conversation: Arc<dyn ActiveConversationView>,
        banners: Arc<dyn BannerPresenter>,
    ) -> Self {
        Self {
            coordinator,
            channels,
            session,
            supervisor,
            users,
            list,
            conversation,
            banners,
        }
    }

    pub async fn run(self, mut events: mpsc::Receiver<LiveEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("live event channel closed, dispatcher stopping");
    }

    pub async fn handle_event(&self, event: LiveEvent) {
        let active = self.session.active();
        let active = active.as_ref();

        match event {
            LiveEvent::Connected => {
                self.supervisor.connected().await;
                if let Some(active) = self.coordinator.on_connected(active) {
                    self.conversation.resubscribe_thread(active);
                }
            }
            LiveEvent::ConnectionClosed => {
                self.supervisor.connection_closed().await;
            }
            LiveEvent::ManualReconnect => {
                self.supervisor.manual_reconnect().await;
            }
            LiveEvent::MessageReceived(message) => self.route_message(message),
            LiveEvent::DeliveryStatusChanged {
                message_key,
                peer_id,
                status,
            } => {
                if let Some(active) = self.coordinator.on_delivery_status_changed(
                    &message_key,
                    &peer_id,
                    status,
                    active,
                ) {
                    self.conversation
                        .apply_delivery_status(active, &message_key, &peer_id, status);
                }
            }
            LiveEvent::ContactStatusChanged { peer_id, status } => {
                if let Some(active) =
                    self.coordinator
                        .on_contact_status_changed(&peer_id, status, active)
                {
                    self.conversation.apply_contact_status(active, &peer_id, status);
                }
            }
            LiveEvent::TypingStatusChanged { peer_id, status } => {
                if let Some(active) =
                    self.coordinator
                        .on_typing_status_changed(&peer_id, status, active)
                {
                    self.conversation.apply_typing_status(active, &peer_id, status);
                }
            }
            LiveEvent::UserBlocked {
                user_id,
                is_blocked,
            } => {
                let update = self.coordinator.on_user_blocked(&user_id, is_blocked, active);
                if let Err(err) = self.users.set_blocked(&update.user_id, update.is_blocked) {
                    warn!(user_id = %update.user_id, error = %err, "failed to record block state");
                }
                if update.recheck_active
                    && let Some(active) = active
                {
                    self.conversation.recheck_block_state(active);
                }
            }
            LiveEvent::UserDetailUpdated { user_id } => {
                let update = self.coordinator.on_user_detail_updated(&user_id, active);
                if let Err(err) = self.users.touch(&update.user_id) {
                    warn!(
                        user_id = %update.user_id,
                        error = %err,
                        "failed to record user detail update"
                    );
                }
                if update.refresh_list {
                    self.list.refresh_summaries();
                }
                if update.refresh_active
                    && let Some(active) = active
                {
                    self.conversation.refresh_details(active, &update.user_id);
                }
            }
            LiveEvent::ChannelNameUpdated => self.list.refresh_summaries(),
            LiveEvent::PushReceived {
                payload,
                alert,
                app_state,
            } => match normalize_push(&payload, alert.as_deref(), app_state) {
                Ok(route) => {
                    let routing = self.coordinator.on_push(route, active);
                    match &routing {
                        PushRouting::AppendToList(message) => self.list.append_message(message),
                        PushRouting::LaunchConversation(key) => self.session.switch_to(key.clone()),
                        PushRouting::AlreadyActive | PushRouting::Ignore => {}
                    }
                    self.channels.emit(LiveNotice::PushRouted(routing));
                }
                Err(err) => self.drop_event(err),
            },
        }
    }

    fn route_message(&self, message: IncomingMessage) {
        if !message.key.is_routable() {
            // The coordinator logs the drop; observers still get a notice.
            self.emit_dropped(LiveError::malformed("message has neither peer nor group id"));
        }

        let active = self.session.active();
        let routing = self
            .coordinator
            .on_message_received(&message, active.as_ref());

        match &routing.decision {
            RoutingDecision::UpdateActiveConversation => {
                if let Some(active) = &active {
                    self.conversation.apply_message(active, &message);
                }
            }
            RoutingDecision::ShowBanner { target } => {
                let tap = BannerTap::new(target.clone(), self.session.clone());
                self.banners.show_banner(&message, tap);
            }
            RoutingDecision::NoOp => {}
        }

        self.list.apply_routing_decision(&message, &routing.decision);
        if routing.refresh_list {
            self.list.refresh_summaries();
        }
        self.channels.emit(LiveNotice::MessageRouted(routing));
    }

    fn drop_event(&self, err: LiveError) {
        warn!(error = %err, "dropping live event");
        self.emit_dropped(err);
    }

    fn emit_dropped(&self, err: LiveError) {
        self.channels.emit(LiveNotice::EventDropped {
            code: err.code,
            message: err.message,
        });
    }
}
