use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ReconnectStatus;

/// Broad error category used for logging and host-side handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LiveErrorCategory {
    /// Event is missing required identity fields; dropped.
    MalformedEvent,
    /// Retry guard failed (no network or app backgrounded); deferred.
    ChannelUnavailable,
    /// Automatic reconnect attempts are used up.
    RetryExhausted,
    /// Invalid configuration value.
    Config,
    /// Collaborator failure or broken invariant.
    Internal,
}

/// Stable error payload. Never propagated out of coordinator operations;
/// it is logged or carried in a `LiveNotice`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct LiveError {
    /// High-level error category.
    pub category: LiveErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl LiveError {
    pub fn new(
        category: LiveErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Event dropped because it carries no usable identity.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(LiveErrorCategory::MalformedEvent, "malformed_event", message)
    }

    /// Reconnect withheld by the retry guard.
    pub fn channel_unavailable(network_reachable: bool, app_foregrounded: bool) -> Self {
        Self::new(
            LiveErrorCategory::ChannelUnavailable,
            "channel_unavailable",
            format!(
                "retry withheld (network_reachable={network_reachable}, app_foregrounded={app_foregrounded})"
            ),
        )
    }

    /// Reconnect attempts exhausted.
    pub fn retry_exhausted(max_retry: u32) -> Self {
        Self::new(
            LiveErrorCategory::RetryExhausted,
            "retry_exhausted",
            format!("gave up after {max_retry} reconnect attempts"),
        )
    }

    /// Whether a host can recover from this error without user action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category,
            LiveErrorCategory::MalformedEvent | LiveErrorCategory::ChannelUnavailable
        )
    }

    /// Map a reconnect status to the error it implies, if any.
    pub fn for_status(status: ReconnectStatus, max_retry: u32) -> Option<Self> {
        match status {
            ReconnectStatus::RetryExhausted => Some(Self::retry_exhausted(max_retry)),
            _ => None,
        }
    }
}
