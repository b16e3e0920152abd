use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{retry::ReconnectBackoff, types::ReconnectStatus};

/// Inputs to `can_attempt_retry`, sampled from the host probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryGuard {
    pub network_reachable: bool,
    pub app_foregrounded: bool,
}

impl RetryGuard {
    pub fn new(network_reachable: bool, app_foregrounded: bool) -> Self {
        Self {
            network_reachable,
            app_foregrounded,
        }
    }

    /// Network reachable and app not backgrounded.
    pub fn can_attempt_retry(&self) -> bool {
        self.network_reachable && self.app_foregrounded
    }
}

/// Identifies one scheduled retry timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Connected,
    Disconnected {
        retry_count: u32,
    },
    RetryScheduled {
        retry_count: u32,
        delay: Duration,
        fire_at: Instant,
        ticket: RetryTicket,
    },
    RetryExhausted,
}

/// Side effects the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Arm a timer that reports back through `on_timer_fired(ticket, ..)`.
    Schedule {
        ticket: RetryTicket,
        attempt: u32,
        delay: Duration,
        fire_at: Instant,
    },
    /// Cancel a previously armed timer.
    Cancel { ticket: RetryTicket },
    /// Call `subscribe()` on the real-time channel.
    Resubscribe { attempt: u32 },
    /// Guard failed; nothing scheduled.
    Withheld,
    /// Retry ceiling reached; automatic retries stop.
    Exhausted,
}

/// Client-side supervision of the real-time channel connection.
#[derive(Debug, Clone)]
pub struct ReconnectStateMachine {
    state: ReconnectState,
    backoff: ReconnectBackoff,
    next_ticket: u64,
}

impl Default for ReconnectStateMachine {
    fn default() -> Self {
        Self::new(ReconnectBackoff::default())
    }
}

impl ReconnectStateMachine {
    pub fn new(backoff: ReconnectBackoff) -> Self {
        Self {
            state: ReconnectState::Disconnected { retry_count: 0 },
            backoff,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn backoff(&self) -> &ReconnectBackoff {
        &self.backoff
    }

    pub fn retry_count(&self) -> u32 {
        match self.state {
            ReconnectState::Connected => 0,
            ReconnectState::Disconnected { retry_count }
            | ReconnectState::RetryScheduled { retry_count, .. } => retry_count,
            ReconnectState::RetryExhausted => self.backoff.max_retry(),
        }
    }

    pub fn status(&self) -> ReconnectStatus {
        match self.state {
            ReconnectState::Connected => ReconnectStatus::Connected,
            ReconnectState::Disconnected { retry_count } => {
                ReconnectStatus::Disconnected { retry_count }
            }
            ReconnectState::RetryScheduled {
                retry_count, delay, ..
            } => ReconnectStatus::RetryScheduled {
                retry_count,
                delay_ms: delay.as_millis() as u64,
            },
            ReconnectState::RetryExhausted => ReconnectStatus::RetryExhausted,
        }
    }

    /// The real-time channel reported that the connection closed.
    ///
    /// A close that arrives while a retry is already scheduled is absorbed
    /// by that retry, so every counted attempt reaches `subscribe()`.
    pub fn on_connection_closed<R: Rng + ?Sized>(
        &mut self,
        guard: RetryGuard,
        now: Instant,
        rng: &mut R,
    ) -> Vec<ReconnectAction> {
        let mut actions = Vec::new();
        let retry_count = match self.state {
            ReconnectState::Connected => 0,
            ReconnectState::Disconnected { retry_count } => retry_count,
            ReconnectState::RetryScheduled { retry_count, .. } => {
                debug!(retry_count, "close while a retry is pending, keeping its timer");
                return actions;
            }
            ReconnectState::RetryExhausted => return actions,
        };
        self.state = ReconnectState::Disconnected { retry_count };

        if retry_count >= self.backoff.max_retry() {
            info!(retry_count, "reconnect attempts exhausted");
            self.state = ReconnectState::RetryExhausted;
            actions.push(ReconnectAction::Exhausted);
            return actions;
        }

        if !guard.can_attempt_retry() {
            debug!(
                retry_count,
                network_reachable = guard.network_reachable,
                app_foregrounded = guard.app_foregrounded,
                "reconnect withheld"
            );
            actions.push(ReconnectAction::Withheld);
            return actions;
        }

        let attempt = retry_count + 1;
        let delay = self.backoff.delay_for_attempt(attempt, rng);
        let fire_at = now + delay;
        let ticket = self.issue_ticket();
        self.state = ReconnectState::RetryScheduled {
            retry_count: attempt,
            delay,
            fire_at,
            ticket,
        };
        info!(attempt, delay_secs = delay.as_secs(), "reconnect scheduled");
        actions.push(ReconnectAction::Schedule {
            ticket,
            attempt,
            delay,
            fire_at,
        });
        actions
    }

    /// A timer armed by `Schedule` elapsed.
    ///
    /// Stale tickets (cancelled or fired after reconnection)
    /// produce no actions.
    pub fn on_timer_fired(
        &mut self,
        ticket: RetryTicket,
        guard: RetryGuard,
    ) -> Vec<ReconnectAction> {
        let ReconnectState::RetryScheduled {
            retry_count,
            ticket: current,
            ..
        } = self.state
        else {
            return Vec::new();
        };
        if current != ticket {
            return Vec::new();
        }

        self.state = ReconnectState::Disconnected { retry_count };
        if !guard.can_attempt_retry() {
            debug!(retry_count, "retry timer fired while channel unavailable");
            return vec![ReconnectAction::Withheld];
        }
        vec![ReconnectAction::Resubscribe {
            attempt: retry_count,
        }]
    }

    /// The channel reported a successful connection; resets the retry count.
    pub fn on_connected(&mut self) -> Vec<ReconnectAction> {
        let actions = self.pending_cancel();
        self.state = ReconnectState::Connected;
        actions
    }

    /// Manual reconnect trigger: clears the retry count so scheduling resumes.
    pub fn reset(&mut self) -> Vec<ReconnectAction> {
        if self.state == ReconnectState::Connected {
            return Vec::new();
        }
        let actions = self.pending_cancel();
        self.state = ReconnectState::Disconnected { retry_count: 0 };
        actions
    }

    fn pending_cancel(&self) -> Vec<ReconnectAction> {
        match self.state {
            ReconnectState::RetryScheduled { ticket, .. } => {
                vec![ReconnectAction::Cancel { ticket }]
            }
            _ => Vec::new(),
        }
    }

    fn issue_ticket(&mut self) -> RetryTicket {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        RetryTicket(self.next_ticket)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const OK: RetryGuard = RetryGuard {
        network_reachable: true,
        app_foregrounded: true,
    };

    fn scheduled(actions: &[ReconnectAction]) -> (RetryTicket, u32, Duration) {
        actions
            .iter()
            .find_map(|action| match action {
                ReconnectAction::Schedule {
                    ticket,
                    attempt,
                    delay,
                    ..
                } => Some((*ticket, *attempt, *delay)),
                _ => None,
            })
            .expect("a retry should be scheduled")
    }

    #[test]
    fn schedules_widening_windows_then_exhausts() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(11);
        let now = Instant::now();

        let (ticket, attempt, delay) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!((attempt, delay), (1, Duration::ZERO));
        assert_eq!(
            sm.on_timer_fired(ticket, OK),
            vec![ReconnectAction::Resubscribe { attempt: 1 }]
        );

        let (ticket, attempt, delay) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!(attempt, 2);
        assert!((60..=600).contains(&delay.as_secs()));
        sm.on_timer_fired(ticket, OK);

        let (ticket, attempt, delay) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!(attempt, 3);
        assert!((660..=1200).contains(&delay.as_secs()));
        sm.on_timer_fired(ticket, OK);

        assert_eq!(
            sm.on_connection_closed(OK, now, &mut rng),
            vec![ReconnectAction::Exhausted]
        );
        assert_eq!(sm.state(), ReconnectState::RetryExhausted);
        assert!(sm.on_connection_closed(OK, now, &mut rng).is_empty());
        assert_eq!(sm.retry_count(), 3);
    }

    #[test]
    fn connected_from_live_channel_resets_to_zero_on_next_close() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(5);
        let now = Instant::now();

        let (ticket, ..) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        sm.on_timer_fired(ticket, OK);
        sm.on_connected();
        assert_eq!(sm.status(), ReconnectStatus::Connected);

        let (_, attempt, delay) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!((attempt, delay), (1, Duration::ZERO));
    }

    #[test]
    fn withholds_when_guard_fails_and_keeps_count() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(2);
        let offline = RetryGuard::new(false, true);

        assert_eq!(
            sm.on_connection_closed(offline, Instant::now(), &mut rng),
            vec![ReconnectAction::Withheld]
        );
        assert_eq!(sm.state(), ReconnectState::Disconnected { retry_count: 0 });
    }

    #[test]
    fn timer_fire_rechecks_guard() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(2);
        let (ticket, ..) = scheduled(&sm.on_connection_closed(OK, Instant::now(), &mut rng));

        let backgrounded = RetryGuard::new(true, false);
        assert_eq!(
            sm.on_timer_fired(ticket, backgrounded),
            vec![ReconnectAction::Withheld]
        );
        assert_eq!(sm.state(), ReconnectState::Disconnected { retry_count: 1 });
        assert!(sm.on_timer_fired(ticket, OK).is_empty());
    }

    #[test]
    fn connected_cancels_pending_timer_and_ignores_stale_fire() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(9);
        let (ticket, ..) = scheduled(&sm.on_connection_closed(OK, Instant::now(), &mut rng));

        assert_eq!(sm.on_connected(), vec![ReconnectAction::Cancel { ticket }]);
        assert!(sm.on_timer_fired(ticket, OK).is_empty());
        assert_eq!(sm.state(), ReconnectState::Connected);
    }

    #[test]
    fn close_burst_keeps_pending_attempt() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(4);
        let now = Instant::now();
        let (first, attempt, delay) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!((attempt, delay), (1, Duration::ZERO));

        for _ in 0..3 {
            assert!(sm.on_connection_closed(OK, now, &mut rng).is_empty());
        }
        assert_eq!(sm.retry_count(), 1);
        assert_eq!(
            sm.on_timer_fired(first, OK),
            vec![ReconnectAction::Resubscribe { attempt: 1 }]
        );

        let (_, attempt, _) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!(attempt, 2);
    }

    #[test]
    fn reset_resumes_scheduling_after_exhaustion() {
        let mut sm = ReconnectStateMachine::new(ReconnectBackoff::default().with_max_retry(1));
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();

        let (ticket, ..) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        sm.on_timer_fired(ticket, OK);
        assert_eq!(
            sm.on_connection_closed(OK, now, &mut rng),
            vec![ReconnectAction::Exhausted]
        );

        assert!(sm.reset().is_empty());
        let (_, attempt, _) = scheduled(&sm.on_connection_closed(OK, now, &mut rng));
        assert_eq!(attempt, 1);
    }

    #[test]
    fn retry_count_never_exceeds_ceiling() {
        let mut sm = ReconnectStateMachine::default();
        let mut rng = StdRng::seed_from_u64(21);
        let now = Instant::now();
        let mut pending = None;
        for round in 0..20 {
            let actions = sm.on_connection_closed(OK, now, &mut rng);
            if let Some(ReconnectAction::Schedule { ticket, .. }) = actions.last() {
                pending = Some(*ticket);
            }
            if round % 3 == 2
                && let Some(ticket) = pending.take()
            {
                sm.on_timer_fired(ticket, OK);
            }
            assert!(sm.retry_count() <= sm.backoff().max_retry());
        }
        assert_eq!(sm.state(), ReconnectState::RetryExhausted);
    }
}
