//! Replays a scripted live-update session against in-memory collaborators
//! and prints every notice as a JSON line.

mod config;
mod logging;

use std::{sync::Arc, time::Duration};

use config::SmokeConfig;
use livechat_core::{
    ActiveConversation, AppState, ConversationKey, DeliveryStatus, IncomingMessage, LiveEvent,
    TypingStatus,
};
use livechat_platform::{
    InMemoryUserStatusCache, RecordingChannel, StaticLifecycleProbe, StaticNetworkProbe,
};
use livechat_runtime::{
    ActiveConversationView, BannerPresenter, BannerTap, Collaborators, ListModelView,
    spawn_runtime,
};
use tracing::{error, info};

const DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

struct LoggingConversationView;

impl ActiveConversationView for LoggingConversationView {
    fn apply_message(&self, active: &ActiveConversation, message: &IncomingMessage) {
        info!(thread = ?active.key, body = ?message.body, "message applied in place");
    }

    fn apply_delivery_status(
        &self,
        active: &ActiveConversation,
        message_key: &str,
        peer_id: &str,
        status: DeliveryStatus,
    ) {
        info!(thread = ?active.key, message_key, peer_id, ?status, "delivery status applied");
    }

    fn apply_contact_status(
        &self,
        active: &ActiveConversation,
        peer_id: &str,
        status: DeliveryStatus,
    ) {
        info!(thread = ?active.key, peer_id, ?status, "contact status applied");
    }

    fn apply_typing_status(
        &self,
        active: &ActiveConversation,
        peer_id: &str,
        status: TypingStatus,
    ) {
        info!(thread = ?active.key, peer_id, ?status, "typing indicator applied");
    }

    fn recheck_block_state(&self, active: &ActiveConversation) {
        info!(thread = ?active.key, "block state rechecked");
    }

    fn refresh_details(&self, active: &ActiveConversation, user_id: &str) {
        info!(thread = ?active.key, user_id, "details refreshed");
    }

    fn resubscribe_thread(&self, active: &ActiveConversation) {
        info!(thread = ?active.key, "thread subscription restored");
    }
}

/// Taps every banner it is shown.
struct AutoTapBanners;

impl BannerPresenter for AutoTapBanners {
    fn show_banner(&self, message: &IncomingMessage, on_tap: BannerTap) {
        info!(target_thread = ?on_tap.target(), body = ?message.body, "banner shown");
        let key = on_tap.tap();
        info!(thread = ?key, "banner tapped");
    }
}

fn script() -> Vec<LiveEvent> {
    vec![
        LiveEvent::Connected,
        LiveEvent::MessageReceived(IncomingMessage::received(
            ConversationKey::group(7),
            "standup in five",
        )),
        LiveEvent::MessageReceived(IncomingMessage::received(
            ConversationKey::peer("bob"),
            "lunch?",
        )),
        LiveEvent::MessageReceived(
            IncomingMessage::received(ConversationKey::peer("alice"), "sent elsewhere").from_self(),
        ),
        LiveEvent::TypingStatusChanged {
            peer_id: "carol".into(),
            status: TypingStatus::Started,
        },
        LiveEvent::DeliveryStatusChanged {
            message_key: "m-1".into(),
            peer_id: "carol".into(),
            status: DeliveryStatus::Delivered,
        },
        LiveEvent::UserBlocked {
            user_id: "mallory".into(),
            is_blocked: true,
        },
        LiveEvent::UserDetailUpdated {
            user_id: "carol".into(),
        },
        LiveEvent::ChannelNameUpdated,
        LiveEvent::PushReceived {
            payload: "AL_GROUP:9:x".into(),
            alert: Some("dave:build is green".into()),
            app_state: AppState::Active,
        },
        LiveEvent::PushReceived {
            payload: "erin:31".into(),
            alert: Some("erin:ping".into()),
            app_state: AppState::Inactive,
        },
        LiveEvent::PushReceived {
            payload: "erin:not-an-id".into(),
            alert: None,
            app_state: AppState::Inactive,
        },
        LiveEvent::MessageReceived(IncomingMessage::default()),
        LiveEvent::ConnectionClosed,
        LiveEvent::ConnectionClosed,
        LiveEvent::ManualReconnect,
        LiveEvent::Connected,
    ]
}

#[tokio::main]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    info!(?config, "starting live-update smoke run");

    let channel = RecordingChannel::default();
    let users = InMemoryUserStatusCache::default();
    let list = Arc::new(ListModelView::new(config.list_max_items));

    let handle = spawn_runtime(
        config.runtime_config(),
        Collaborators {
            channel: Arc::new(channel.clone()),
            network: Arc::new(StaticNetworkProbe::default()),
            lifecycle: Arc::new(StaticLifecycleProbe::default()),
            users: Arc::new(users),
            list: list.clone(),
            conversation: Arc::new(LoggingConversationView),
            banners: Arc::new(AutoTapBanners),
        },
    );
    let mut notices = handle.subscribe();
    handle.session().open(ConversationKey::group(7));

    for event in script() {
        if let Err(err) = handle.send(event).await {
            eprintln!("Failed to enqueue event: {err}");
            std::process::exit(1);
        }
        if let Some(key) = handle.session().take_pending_launch() {
            let cleared = list.mark_read(&key);
            info!(thread = ?key, cleared, "host navigated to conversation");
        }
    }

    while let Ok(Ok(notice)) = tokio::time::timeout(DRAIN_TIMEOUT, notices.recv()).await {
        match serde_json::to_string(&notice) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(error = %err, "failed to encode notice"),
        }
    }

    for row in list.search("standup") {
        info!(thread = ?row.key, unread = row.unread_count, "search hit");
    }

    println!(
        "reconnect status: {:?}, subscribe calls: {}, list rows: {}, list refreshes: {}",
        handle.reconnect_status().await,
        channel.subscribe_calls(),
        list.snapshot().len(),
        list.refresh_count(),
    );
}
