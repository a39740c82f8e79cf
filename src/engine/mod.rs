// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contract between the presenter and the transfer engine.
//!
//! The presenter never owns transfer logic. It reads fresh snapshots of
//! engine state every frame, pushes single mutations back, and listens to
//! one event feed. Peers are referred to by an opaque [`PeerKey`] so that
//! identity never depends on transient fields like the address.

pub mod sim;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use tokio::sync::mpsc;

/// Stable identity of a peer inside the engine. Two structurally identical
/// peers (same address, id not yet known) still get distinct keys.
pub type PeerKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to a live event feed. The id is what `unsubscribe` wants back.
pub struct EventSubscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<EngineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PeerJoined(PeerKey),
    PeerLeft(PeerKey),
    TrackerFailed(String),
    TrackerSucceeded,
}

/// Per-frame aggregate state of the download.
#[derive(Debug, Clone, Default)]
pub struct DownloadStats {
    pub name: String,
    pub hash: Vec<u8>,
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub bytes_up: u64,
    pub rate_up: u64,
    pub rate_down: u64,
    pub chunks_done: u32,
    pub chunks_total: u32,
    pub chunk_size: u32,
    pub is_open: bool,
    pub peers_connected: u32,
    pub peers_not_connected: u32,
    pub peers_min: u32,
    pub peers_max: u32,
    pub uploads_max: u32,
    pub tracker_busy: bool,
    pub tracker_timeout: Duration,
}

/// Live view of one peer, re-queried at render time. Rates and choke
/// state are never cached by the presenter.
#[derive(Debug, Clone, Default)]
pub struct PeerSnapshot {
    pub key: PeerKey,
    pub address: String,
    pub port: u16,
    pub id: Vec<u8>,
    pub rate_up: u64,
    pub rate_down: u64,
    pub rate_peer: u64,
    pub remote_choked: bool,
    pub remote_interested: bool,
    pub local_choked: bool,
    pub local_interested: bool,
    pub choke_delayed: bool,
    pub outgoing_queue: usize,
    pub incoming_queue: usize,
    pub first_queued_piece: Option<u32>,
    pub chunks_done: u32,
    pub snubbed: bool,
    pub transferred_up: u64,
    pub transferred_down: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilePriority {
    Stopped,
    #[default]
    Normal,
    High,
}

impl FilePriority {
    /// Operator-facing priority cycle: skip a stopped file to the front,
    /// park a normal one, demote a high one back to normal.
    pub fn cycle(self) -> Self {
        match self {
            FilePriority::Stopped => FilePriority::High,
            FilePriority::Normal => FilePriority::Stopped,
            FilePriority::High => FilePriority::Normal,
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(FilePriority::Stopped),
            1 => Some(FilePriority::Normal),
            2 => Some(FilePriority::High),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            FilePriority::Stopped => 0,
            FilePriority::Normal => 1,
            FilePriority::High => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    /// Raw engine priority value; decode with [`FilePriority::from_raw`].
    /// Unknown values must still render (as a bug marker), not crash.
    pub priority: u8,
    pub chunk_begin: u32,
    pub chunk_end: u32,
    pub completed: u32,
}

impl FileEntry {
    /// Percent of this file's chunk span that is complete. A file that
    /// spans zero chunks counts as fully complete.
    pub fn completion_pct(&self) -> u32 {
        let span = self.chunk_end.saturating_sub(self.chunk_begin);
        if span == 0 {
            100
        } else {
            self.completed * 100 / span
        }
    }
}

/// Query, mutation, and event surface the presenter consumes.
///
/// Queries are infallible; validity is a separate flag and the session
/// checks it before touching anything else. Mutations are fire-and-forget
/// from the presenter's point of view, the engine enforces its own ranges.
pub trait Engine {
    fn is_valid(&self) -> bool;
    fn stats(&self) -> DownloadStats;
    fn peers(&self) -> Vec<PeerSnapshot>;
    fn peer(&self, key: PeerKey) -> Option<PeerSnapshot>;
    fn local_bitfield(&self) -> Vec<u8>;
    fn peer_bitfield(&self, key: PeerKey) -> Option<Vec<u8>>;
    /// Per-chunk replica counts across all known peers.
    fn seen_map(&self) -> Vec<u8>;
    fn files(&self) -> Vec<FileEntry>;
    /// Global throttle ceiling in bytes per second.
    fn throttle_rate(&self) -> u64;

    fn set_tracker_timeout(&self, timeout: Duration);
    /// `None` disables further "want more peers" tracker requests.
    fn set_want_count(&self, count: Option<u32>);
    fn set_peers_min(&self, min: u32);
    fn set_peers_max(&self, max: u32);
    fn set_uploads_max(&self, max: u32);
    fn set_file_priority(&self, index: usize, priority: FilePriority);
    /// Ask the engine to recompute chunk scheduling after priority edits.
    fn update_priorities(&self);
    fn set_peer_snubbed(&self, key: PeerKey, snubbed: bool);

    fn subscribe(&self) -> EventSubscription;
    fn unsubscribe(&self, id: SubscriptionId);
}
