//! History store shared by all in-flight events

use super::store::{ChannelKey, Transcript, Turn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory mapping from channel to transcript.
///
/// Every channel has its own async mutex, so events for the same channel
/// are serialized while different channels never wait on each other. The
/// outer map lock is only taken to find or create an entry and is never
/// held across an await point.
#[derive(Debug)]
pub struct HistoryStore {
    /// Maximum turns per channel
    limit: usize,
    /// Transcripts keyed by channel
    channels: RwLock<HashMap<ChannelKey, Arc<Mutex<Transcript>>>>,
}

impl HistoryStore {
    /// Create an empty store keeping at most `limit` turns per channel
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Maximum turns kept per channel
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Get or lazily create the transcript cell for a channel
    fn entry(&self, key: &ChannelKey) -> Arc<Mutex<Transcript>> {
        if let Some(existing) = self.channels.read().get(key) {
            return existing.clone();
        }

        let mut channels = self.channels.write();
        channels
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Transcript::new(self.limit))))
            .clone()
    }

    /// Take exclusive access to one channel's transcript.
    ///
    /// Creates the transcript if it does not exist yet. Other events for the
    /// same channel wait until the returned guard is dropped.
    pub async fn lock(&self, key: &ChannelKey) -> ChannelHistory {
        let cell = self.entry(key);
        ChannelHistory {
            key: key.clone(),
            transcript: cell.lock_owned().await,
        }
    }

    /// Append a turn to a channel's transcript
    pub async fn append(&self, key: &ChannelKey, turn: Turn) {
        self.lock(key).await.push(turn);
    }

    /// Point-in-time copy of a channel's transcript.
    ///
    /// A channel that was never written reads as an empty transcript and is
    /// not created by the read.
    pub async fn read(&self, key: &ChannelKey) -> Vec<Turn> {
        let cell = self.channels.read().get(key).cloned();
        match cell {
            Some(cell) => cell.lock().await.to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of turns currently stored for a channel
    pub async fn len(&self, key: &ChannelKey) -> usize {
        let cell = self.channels.read().get(key).cloned();
        match cell {
            Some(cell) => cell.lock().await.len(),
            None => 0,
        }
    }

    /// Number of channels with a transcript
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(super::DEFAULT_HISTORY_LIMIT)
    }
}

/// Exclusive handle on one channel's transcript
pub struct ChannelHistory {
    key: ChannelKey,
    transcript: OwnedMutexGuard<Transcript>,
}

impl ChannelHistory {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Append a turn, evicting the oldest one when full
    pub fn push(&mut self, turn: Turn) {
        self.transcript.push(turn);
    }

    /// Copy of the transcript in arrival order
    pub fn snapshot(&self) -> Vec<Turn> {
        self.transcript.to_vec()
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}
