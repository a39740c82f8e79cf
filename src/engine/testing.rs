// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Scripted engine for unit tests: queries read from a plain state struct,
//! mutations are recorded instead of applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::engine::{
    DownloadStats, Engine, EventSubscription, FileEntry, FilePriority, PeerKey,
    PeerSnapshot, SubscriptionId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationCall {
    SetTrackerTimeout(Duration),
    SetWantCount(Option<u32>),
    SetPeersMin(u32),
    SetPeersMax(u32),
    SetUploadsMax(u32),
    SetFilePriority(usize, FilePriority),
    UpdatePriorities,
    SetPeerSnubbed(PeerKey, bool),
}

pub struct MockState {
    pub valid: bool,
    pub stats: DownloadStats,
    pub peers: Vec<PeerSnapshot>,
    pub files: Vec<FileEntry>,
    pub seen: Vec<u8>,
    pub local_bitfield: Vec<u8>,
    pub peer_bitfields: HashMap<PeerKey, Vec<u8>>,
    pub calls: Vec<MutationCall>,
    pub unsubscribed: Vec<SubscriptionId>,
    next_subscriber: u64,
}

#[derive(Clone)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn with_peers(count: usize) -> Self {
        let peers = (0..count)
            .map(|i| PeerSnapshot {
                key: i as PeerKey + 1,
                address: format!("10.0.0.{}", i + 1),
                port: 6881 + i as u16,
                id: format!("-SW1000-peer{:08}", i).into_bytes(),
                ..Default::default()
            })
            .collect();

        let files = (0..3)
            .map(|i| FileEntry {
                path: format!("payload/file-{i}.bin"),
                size: 4 << 20,
                priority: FilePriority::Normal.as_raw(),
                chunk_begin: i * 16,
                chunk_end: (i + 1) * 16,
                completed: 0,
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(MockState {
                valid: true,
                stats: DownloadStats {
                    name: "fixture".to_string(),
                    hash: vec![0xAB; 20],
                    chunks_total: 48,
                    chunk_size: 1 << 18,
                    is_open: true,
                    peers_connected: count as u32,
                    peers_min: 40,
                    peers_max: 100,
                    uploads_max: 8,
                    ..Default::default()
                },
                peers,
                files,
                seen: vec![0; 48],
                local_bitfield: vec![0; 6],
                peer_bitfields: HashMap::new(),
                calls: Vec::new(),
                unsubscribed: Vec::new(),
                next_subscriber: 1,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub fn count_want_disables(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MutationCall::SetWantCount(None)))
            .count()
    }

    fn record(&self, call: MutationCall) {
        self.state().calls.push(call);
    }
}

impl Engine for MockEngine {
    fn is_valid(&self) -> bool {
        self.state().valid
    }

    fn stats(&self) -> DownloadStats {
        self.state().stats.clone()
    }

    fn peers(&self) -> Vec<PeerSnapshot> {
        self.state().peers.clone()
    }

    fn peer(&self, key: PeerKey) -> Option<PeerSnapshot> {
        self.state().peers.iter().find(|p| p.key == key).cloned()
    }

    fn local_bitfield(&self) -> Vec<u8> {
        self.state().local_bitfield.clone()
    }

    fn peer_bitfield(&self, key: PeerKey) -> Option<Vec<u8>> {
        self.state().peer_bitfields.get(&key).cloned()
    }

    fn seen_map(&self) -> Vec<u8> {
        self.state().seen.clone()
    }

    fn files(&self) -> Vec<FileEntry> {
        self.state().files.clone()
    }

    fn throttle_rate(&self) -> u64 {
        500_000
    }

    fn set_tracker_timeout(&self, timeout: Duration) {
        self.record(MutationCall::SetTrackerTimeout(timeout));
    }

    fn set_want_count(&self, count: Option<u32>) {
        self.record(MutationCall::SetWantCount(count));
    }

    fn set_peers_min(&self, min: u32) {
        self.record(MutationCall::SetPeersMin(min));
    }

    fn set_peers_max(&self, max: u32) {
        self.record(MutationCall::SetPeersMax(max));
    }

    fn set_uploads_max(&self, max: u32) {
        self.record(MutationCall::SetUploadsMax(max));
    }

    fn set_file_priority(&self, index: usize, priority: FilePriority) {
        self.record(MutationCall::SetFilePriority(index, priority));
    }

    fn update_priorities(&self) {
        self.record(MutationCall::UpdatePriorities);
    }

    fn set_peer_snubbed(&self, key: PeerKey, snubbed: bool) {
        self.record(MutationCall::SetPeerSnubbed(key, snubbed));
    }

    fn subscribe(&self) -> EventSubscription {
        let mut state = self.state();
        let id = SubscriptionId(state.next_subscriber);
        state.next_subscriber += 1;
        let (_tx, receiver) = mpsc::unbounded_channel();
        EventSubscription { id, receiver }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state().unsubscribed.push(id);
    }
}
