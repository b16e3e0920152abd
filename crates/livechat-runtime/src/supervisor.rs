//! Reconnect supervision on top of `ReconnectStateMachine`.

use std::{collections::HashMap, sync::Arc};

use livechat_core::{
    LiveNotice, ReconnectAction, ReconnectBackoff, ReconnectState, ReconnectStateMachine,
    ReconnectStatus, RetryGuard, RetryTicket,
};
use livechat_platform::{LifecycleProbe, NetworkProbe, RealtimeChannel};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::{Mutex, broadcast},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct SupervisorState {
    machine: ReconnectStateMachine,
    rng: StdRng,
    timers: HashMap<RetryTicket, CancellationToken>,
}

/// Single writer for reconnect state and its timers.
///
/// Every transition, timer arm/cancel, and `subscribe()` call happens while
/// holding the state lock.
#[derive(Clone)]
pub struct ReconnectSupervisor {
    state: Arc<Mutex<SupervisorState>>,
    channel: Arc<dyn RealtimeChannel>,
    network: Arc<dyn NetworkProbe>,
    lifecycle: Arc<dyn LifecycleProbe>,
    notices: broadcast::Sender<LiveNotice>,
}

impl ReconnectSupervisor {
    pub fn new(
        backoff: ReconnectBackoff,
        channel: Arc<dyn RealtimeChannel>,
        network: Arc<dyn NetworkProbe>,
        lifecycle: Arc<dyn LifecycleProbe>,
        notices: broadcast::Sender<LiveNotice>,
    ) -> Self {
        Self::with_rng(
            backoff,
            StdRng::from_entropy(),
            channel,
            network,
            lifecycle,
            notices,
        )
    }

    pub fn with_rng(
        backoff: ReconnectBackoff,
        rng: StdRng,
        channel: Arc<dyn RealtimeChannel>,
        network: Arc<dyn NetworkProbe>,
        lifecycle: Arc<dyn LifecycleProbe>,
        notices: broadcast::Sender<LiveNotice>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SupervisorState {
                machine: ReconnectStateMachine::new(backoff),
                rng,
                timers: HashMap::new(),
            })),
            channel,
            network,
            lifecycle,
            notices,
        }
    }

    /// Sample `can_attempt_retry` inputs from the probes.
    pub fn guard(&self) -> RetryGuard {
        RetryGuard::new(self.network.is_reachable(), self.lifecycle.is_foregrounded())
    }

    pub async fn status(&self) -> ReconnectStatus {
        self.state.lock().await.machine.status()
    }

    pub async fn connection_closed(&self) -> ReconnectStatus {
        let mut state = self.state.lock().await;
        let guard = self.guard();
        let SupervisorState { machine, rng, .. } = &mut *state;
        let actions = machine.on_connection_closed(guard, Instant::now(), rng);
        self.perform(&mut state, actions);
        self.publish(&state)
    }

    pub async fn connected(&self) -> ReconnectStatus {
        let mut state = self.state.lock().await;
        let actions = state.machine.on_connected();
        self.perform(&mut state, actions);
        info!("real-time channel connected");
        self.publish(&state)
    }

    /// Clear the retry count and try one subscribe right away.
    ///
    /// A no-op while the channel is connected.
    pub async fn manual_reconnect(&self) -> ReconnectStatus {
        let mut state = self.state.lock().await;
        if state.machine.state() == ReconnectState::Connected {
            debug!("manual reconnect ignored, channel already connected");
            return state.machine.status();
        }
        let actions = state.machine.reset();
        self.perform(&mut state, actions);
        if self.guard().can_attempt_retry() {
            self.resubscribe(0);
        } else {
            debug!("manual reconnect withheld, channel unavailable");
        }
        self.publish(&state)
    }

    fn perform(&self, state: &mut SupervisorState, actions: Vec<ReconnectAction>) {
        for action in actions {
            match action {
                ReconnectAction::Schedule {
                    ticket,
                    attempt,
                    delay,
                    fire_at,
                } => {
                    debug!(attempt, delay_secs = delay.as_secs(), "arming reconnect timer");
                    let token = CancellationToken::new();
                    state.timers.insert(ticket, token.clone());
                    self.spawn_timer(ticket, fire_at, token);
                }
                ReconnectAction::Cancel { ticket } => {
                    if let Some(token) = state.timers.remove(&ticket) {
                        token.cancel();
                    }
                }
                ReconnectAction::Resubscribe { attempt } => self.resubscribe(attempt),
                ReconnectAction::Withheld => {
                    debug!("reconnect withheld, channel unavailable");
                }
                ReconnectAction::Exhausted => {
                    warn!(
                        max_retry = state.machine.backoff().max_retry(),
                        "automatic reconnect stopped"
                    );
                }
            }
        }
    }

    fn spawn_timer(&self, ticket: RetryTicket, fire_at: Instant, token: CancellationToken) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(fire_at) => supervisor.timer_fired(ticket).await,
            }
        });
    }

    async fn timer_fired(&self, ticket: RetryTicket) {
        let mut state = self.state.lock().await;
        state.timers.remove(&ticket);
        let actions = state.machine.on_timer_fired(ticket, self.guard());
        if actions.is_empty() {
            return;
        }
        self.perform(&mut state, actions);
        self.publish(&state);
    }

    fn resubscribe(&self, attempt: u32) {
        info!(attempt, "re-subscribing to real-time channel");
        if let Err(err) = self.channel.subscribe() {
            warn!(attempt, error = %err, "re-subscribe failed");
        }
    }

    fn publish(&self, state: &SupervisorState) -> ReconnectStatus {
        let status = state.machine.status();
        let _ = self.notices.send(LiveNotice::ReconnectStateChanged(status));
        status
    }
}
