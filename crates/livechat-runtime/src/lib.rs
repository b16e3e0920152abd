//! Async runtime wiring the live-update coordinator and reconnect supervision
//! to host collaborators.

pub mod dispatcher;
pub mod host;
pub mod supervisor;

use std::sync::Arc;

use livechat_core::{
    CoordinatorConfig, LiveChannelError, LiveChannels, LiveEvent, LiveUpdateCoordinator,
    NoticeStream, ReconnectBackoff, ReconnectStatus,
};
use livechat_platform::{LifecycleProbe, NetworkProbe, RealtimeChannel, UserStatusCache};

pub use dispatcher::LiveDispatcher;
pub use host::{
    ActiveConversationView, BannerPresenter, BannerTap, ConversationListView, ListModelView,
    SessionHandle,
};
pub use supervisor::ReconnectSupervisor;

const DEFAULT_EVENT_BUFFER: usize = 128;
const DEFAULT_NOTICE_BUFFER: usize = 512;

#[derive(Debug, Clone)]
pub struct LiveRuntimeConfig {
    pub coordinator: CoordinatorConfig,
    pub backoff: ReconnectBackoff,
    pub event_buffer: usize,
    pub notice_buffer: usize,
}

impl Default for LiveRuntimeConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            backoff: ReconnectBackoff::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            notice_buffer: DEFAULT_NOTICE_BUFFER,
        }
    }
}

/// Host and platform collaborators consumed by the runtime.
#[derive(Clone)]
pub struct Collaborators {
    pub channel: Arc<dyn RealtimeChannel>,
    pub network: Arc<dyn NetworkProbe>,
    pub lifecycle: Arc<dyn LifecycleProbe>,
    pub users: Arc<dyn UserStatusCache>,
    pub list: Arc<dyn ConversationListView>,
    pub conversation: Arc<dyn ActiveConversationView>,
    pub banners: Arc<dyn BannerPresenter>,
}

#[derive(Clone)]
pub struct LiveRuntimeHandle {
    channels: LiveChannels,
    session: SessionHandle,
    supervisor: ReconnectSupervisor,
}

impl LiveRuntimeHandle {
    pub async fn send(&self, event: LiveEvent) -> Result<(), LiveChannelError> {
        self.channels.send_event(event).await
    }

    pub fn subscribe(&self) -> NoticeStream {
        self.channels.subscribe()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn reconnect_status(&self) -> ReconnectStatus {
        self.supervisor.status().await
    }
}

/// Spawn the dispatcher on the current tokio runtime.
pub fn spawn_runtime(config: LiveRuntimeConfig, collaborators: Collaborators) -> LiveRuntimeHandle {
    let (channels, event_rx) = LiveChannels::new(config.event_buffer, config.notice_buffer);
    let session = SessionHandle::default();
    let supervisor = ReconnectSupervisor::new(
        config.backoff,
        collaborators.channel,
        collaborators.network,
        collaborators.lifecycle,
        channels.notice_sender(),
    );

    let dispatcher = LiveDispatcher::new(
        LiveUpdateCoordinator::new(config.coordinator),
        channels.clone(),
        session.clone(),
        supervisor.clone(),
        collaborators.users,
        collaborators.list,
        collaborators.conversation,
        collaborators.banners,
    );
    tokio::spawn(async move {
        dispatcher.run(event_rx).await;
    });

    LiveRuntimeHandle {
        channels,
        session,
        supervisor,
    }
}
