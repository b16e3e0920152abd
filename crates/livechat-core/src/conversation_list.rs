use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ConversationKey, IncomingMessage};

/// Errors that can occur while applying list operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListMergeError {
    /// An operation referenced a conversation that is not in the list.
    #[error("conversation {0:?} was not found")]
    MissingConversation(ConversationKey),
}

/// One row of the conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    pub key: ConversationKey,
    /// Best-effort display name for the thread.
    pub display_name: Option<String>,
    /// Body of the latest message.
    pub latest_body: Option<String>,
    pub unread_count: u64,
}

impl ConversationSummary {
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            display_name: None,
            latest_body: None,
            unread_count: 0,
        }
    }
}

/// Incremental list operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ListOp {
    /// Insert or replace a row, moving it to the top.
    Upsert(ConversationSummary),
    /// Fold a live message into its row, creating the row when missing.
    ApplyMessage {
        message: IncomingMessage,
        /// The thread is visible, so the message is already read.
        is_active: bool,
    },
    /// Change the display name of an existing row.
    Rename {
        key: ConversationKey,
        display_name: String,
    },
    /// Remove an existing row.
    Remove { key: ConversationKey },
    /// Clear all rows.
    Clear,
}

/// In-memory conversation list, newest first, with bounded retention.
///
/// Rows are keyed by `ConversationKey::thread_key`, so every member of a
/// group shares one row.
#[derive(Debug, Clone)]
pub struct ConversationList {
    items: Vec<ConversationSummary>,
    max_items: usize,
}

impl ConversationList {
    /// Create a list with a row cap (`max_items >= 1`).
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Vec::new(),
            max_items: max_items.max(1),
        }
    }

    /// Rows in display order.
    pub fn items(&self) -> &[ConversationSummary] {
        &self.items
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&ConversationSummary> {
        let key = key.thread_key();
        self.items.iter().find(|it| it.key == key)
    }

    /// Apply list operations in order.
    pub fn apply_ops(&mut self, ops: &[ListOp]) -> Result<(), ListMergeError> {
        for op in ops {
            match op {
                ListOp::Upsert(summary) => {
                    let key = summary.key.thread_key();
                    self.take(&key);
                    self.items.insert(
                        0,
                        ConversationSummary {
                            key,
                            ..summary.clone()
                        },
                    );
                }
                ListOp::ApplyMessage { message, is_active } => {
                    let key = message.key.thread_key();
                    let mut summary = self
                        .take(&key)
                        .unwrap_or_else(|| ConversationSummary::new(key));
                    if message.body.is_some() {
                        summary.latest_body = message.body.clone();
                    }
                    if !message.sent_by_self && !is_active {
                        summary.unread_count = summary.unread_count.saturating_add(1);
                    }
                    self.items.insert(0, summary);
                }
                ListOp::Rename { key, display_name } => {
                    let item = self
                        .position(key)
                        .map(|idx| &mut self.items[idx])
                        .ok_or_else(|| ListMergeError::MissingConversation(key.clone()))?;
                    item.display_name = Some(display_name.clone());
                }
                ListOp::Remove { key } => {
                    self.take(key)
                        .ok_or_else(|| ListMergeError::MissingConversation(key.clone()))?;
                }
                ListOp::Clear => self.items.clear(),
            }
            self.trim_to_max();
        }

        Ok(())
    }

    /// Reset the unread counter of a row. Returns `false` for unknown keys.
    pub fn mark_read(&mut self, key: &ConversationKey) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.items[idx].unread_count = 0;
                true
            }
            None => false,
        }
    }

    /// Rows whose display name or latest body contains `query`, ignoring case.
    ///
    /// An empty query matches every row.
    pub fn search(&self, query: &str) -> Vec<&ConversationSummary> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|it| {
                [it.display_name.as_deref(), it.latest_body.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&needle))
            })
            .collect()
    }

    fn position(&self, key: &ConversationKey) -> Option<usize> {
        let key = key.thread_key();
        self.items.iter().position(|it| it.key == key)
    }

    fn take(&mut self, key: &ConversationKey) -> Option<ConversationSummary> {
        let idx = self.position(key)?;
        Some(self.items.remove(idx))
    }

    fn trim_to_max(&mut self) {
        if self.items.len() > self.max_items {
            self.items.truncate(self.max_items);
        }
    }
}
