//! Host probes, the real-time channel subscription contract, and the
//! user-status cache, with in-memory implementations.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("user not found")]
    NotFound,
    #[error("channel unavailable: {0}")]
    Unavailable(String),
    #[error("platform backend failure: {0}")]
    Backend(String),
}

/// Network reachability. Synchronous and side-effect free.
pub trait NetworkProbe: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Application lifecycle. Synchronous and side-effect free.
pub trait LifecycleProbe: Send + Sync {
    fn is_foregrounded(&self) -> bool;
}

/// Subscription control of the real-time channel. Both calls are idempotent.
pub trait RealtimeChannel: Send + Sync {
    fn subscribe(&self) -> Result<(), PlatformError>;

    fn unsubscribe(&self) -> Result<(), PlatformError>;
}

/// Per-user status shared with the UI layer.
pub trait UserStatusCache: Send + Sync {
    fn set_blocked(&self, user_id: &str, is_blocked: bool) -> Result<(), PlatformError>;

    fn is_blocked(&self, user_id: &str) -> Result<bool, PlatformError>;

    /// Record that a user's details changed.
    fn touch(&self, user_id: &str) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone)]
pub struct StaticNetworkProbe {
    reachable: Arc<AtomicBool>,
}

impl StaticNetworkProbe {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: Arc::new(AtomicBool::new(reachable)),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl Default for StaticNetworkProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkProbe for StaticNetworkProbe {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct StaticLifecycleProbe {
    foregrounded: Arc<AtomicBool>,
}

impl StaticLifecycleProbe {
    pub fn new(foregrounded: bool) -> Self {
        Self {
            foregrounded: Arc::new(AtomicBool::new(foregrounded)),
        }
    }

    pub fn set_foregrounded(&self, foregrounded: bool) {
        self.foregrounded.store(foregrounded, Ordering::SeqCst);
    }
}

impl Default for StaticLifecycleProbe {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LifecycleProbe for StaticLifecycleProbe {
    fn is_foregrounded(&self) -> bool {
        self.foregrounded.load(Ordering::SeqCst)
    }
}

/// Channel stand-in that records subscription calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    subscribed: Arc<AtomicBool>,
    subscribe_calls: Arc<AtomicU64>,
    unsubscribe_calls: Arc<AtomicU64>,
}

impl RecordingChannel {
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> u64 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> u64 {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

impl RealtimeChannel for RecordingChannel {
    fn subscribe(&self) -> Result<(), PlatformError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.subscribed.store(true, Ordering::SeqCst);
        debug!("real-time channel subscribe");
        Ok(())
    }

    fn unsubscribe(&self) -> Result<(), PlatformError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.subscribed.store(false, Ordering::SeqCst);
        debug!("real-time channel unsubscribe");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UserStatus {
    is_blocked: bool,
    detail_revision: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryUserStatusCache {
    data: Arc<RwLock<HashMap<String, UserStatus>>>,
}

impl InMemoryUserStatusCache {
    /// Number of detail updates recorded for a user.
    pub fn detail_revision(&self, user_id: &str) -> Result<u64, PlatformError> {
        let data = self
            .data
            .read()
            .map_err(|_| PlatformError::Backend("poisoned lock".to_owned()))?;
        data.get(user_id)
            .map(|status| status.detail_revision)
            .ok_or(PlatformError::NotFound)
    }
}

impl UserStatusCache for InMemoryUserStatusCache {
    fn set_blocked(&self, user_id: &str, is_blocked: bool) -> Result<(), PlatformError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| PlatformError::Backend("poisoned lock".to_owned()))?;
        data.entry(user_id.to_owned()).or_default().is_blocked = is_blocked;
        Ok(())
    }

    fn is_blocked(&self, user_id: &str) -> Result<bool, PlatformError> {
        let data = self
            .data
            .read()
            .map_err(|_| PlatformError::Backend("poisoned lock".to_owned()))?;
        Ok(data.get(user_id).is_some_and(|status| status.is_blocked))
    }

    fn touch(&self, user_id: &str) -> Result<(), PlatformError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| PlatformError::Backend("poisoned lock".to_owned()))?;
        let status = data.entry(user_id.to_owned()).or_default();
        status.detail_revision = status.detail_revision.saturating_add(1);
        Ok(())
    }
}
