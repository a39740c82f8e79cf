// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Simulated engine backend.
//!
//! Fabricates a download in progress so the monitor can be driven without
//! a live transfer stack: peers churn, chunks complete, the tracker
//! announces on a timer. Implements the whole [`Engine`] contract; holds
//! no sockets and touches no disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;

use crate::engine::{
    DownloadStats, Engine, EngineEvent, EventSubscription, FileEntry, FilePriority, PeerKey,
    PeerSnapshot, SubscriptionId,
};

const TRACKER_INTERVAL: Duration = Duration::from_secs(30);
const THROTTLE_RATE: u64 = 512_000;
const ACTIVITY_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub name: String,
    pub chunks_total: u32,
    pub chunk_size: u32,
    pub file_count: usize,
    pub seed_peers: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "debian-13.1.0-amd64-netinst.iso".to_string(),
            chunks_total: 512,
            chunk_size: 256 * 1024,
            file_count: 6,
            seed_peers: 12,
        }
    }
}

struct SimPeer {
    key: PeerKey,
    address: String,
    port: u16,
    id: Vec<u8>,
    bitfield: Vec<u8>,
    rate_up: u64,
    rate_down: u64,
    rate_peer: u64,
    remote_choked: bool,
    remote_interested: bool,
    local_choked: bool,
    local_interested: bool,
    choke_delayed: bool,
    outgoing_queue: usize,
    incoming_queue: usize,
    first_queued_piece: Option<u32>,
    snubbed: bool,
    transferred_up: u64,
    transferred_down: u64,
}

struct SimFile {
    path: String,
    size: u64,
    priority: u8,
    chunk_begin: u32,
    chunk_end: u32,
    completed: u32,
}

struct SimState {
    valid: bool,
    name: String,
    hash: Vec<u8>,
    chunks_total: u32,
    chunk_size: u32,
    local_bitfield: Vec<u8>,
    files: Vec<SimFile>,
    peers: Vec<SimPeer>,
    next_peer_key: PeerKey,
    peers_not_connected: u32,
    peers_min: u32,
    peers_max: u32,
    uploads_max: u32,
    want_count: Option<u32>,
    tracker_deadline: Instant,
    tracker_busy: bool,
    bytes_up: u64,
    rate_up: u64,
    rate_down: u64,
    subscribers: HashMap<SubscriptionId, mpsc::UnboundedSender<EngineEvent>>,
    next_subscriber: u64,
}

#[derive(Clone)]
pub struct SimEngine {
    state: Arc<Mutex<SimState>>,
}

fn bit_is_set(bitfield: &[u8], chunk: u32) -> bool {
    let byte = (chunk / 8) as usize;
    byte < bitfield.len() && bitfield[byte] & (0x80 >> (chunk % 8)) != 0
}

fn set_bit(bitfield: &mut [u8], chunk: u32) {
    let byte = (chunk / 8) as usize;
    if byte < bitfield.len() {
        bitfield[byte] |= 0x80 >> (chunk % 8);
    }
}

fn count_bits(bitfield: &[u8], chunks_total: u32) -> u32 {
    (0..chunks_total).filter(|&c| bit_is_set(bitfield, c)).count() as u32
}

impl SimState {
    fn new(config: &SimConfig) -> Self {
        let mut rng = rand::rng();
        let bitfield_len = config.chunks_total.div_ceil(8) as usize;

        // Contiguous chunk ranges, one per file, sized by the chunk span.
        let mut files = Vec::new();
        let per_file = (config.chunks_total / config.file_count.max(1) as u32).max(1);
        let mut begin = 0;
        for i in 0..config.file_count {
            let end = if i + 1 == config.file_count {
                config.chunks_total
            } else {
                (begin + per_file).min(config.chunks_total)
            };
            files.push(SimFile {
                path: format!("{}/part-{:02}.bin", config.name, i),
                size: u64::from(end - begin) * u64::from(config.chunk_size),
                priority: FilePriority::Normal.as_raw(),
                chunk_begin: begin,
                chunk_end: end,
                completed: 0,
            });
            begin = end;
        }

        let hash: Vec<u8> = (0..20).map(|_| rng.random()).collect();

        let mut state = Self {
            valid: true,
            name: config.name.clone(),
            hash,
            chunks_total: config.chunks_total,
            chunk_size: config.chunk_size,
            local_bitfield: vec![0; bitfield_len],
            files,
            peers: Vec::new(),
            next_peer_key: 1,
            peers_not_connected: 30,
            peers_min: 40,
            peers_max: 100,
            uploads_max: 8,
            want_count: Some(100),
            tracker_deadline: Instant::now() + TRACKER_INTERVAL,
            tracker_busy: false,
            bytes_up: 0,
            rate_up: 0,
            rate_down: 0,
            subscribers: HashMap::new(),
            next_subscriber: 1,
        };
        for _ in 0..config.seed_peers {
            state.spawn_peer(&mut rng);
        }
        state
    }

    fn spawn_peer(&mut self, rng: &mut impl Rng) -> PeerKey {
        let key = self.next_peer_key;
        self.next_peer_key += 1;

        let mut bitfield = vec![0u8; self.local_bitfield.len()];
        let owned = rng.random_range(0..=self.chunks_total);
        for _ in 0..owned {
            set_bit(&mut bitfield, rng.random_range(0..self.chunks_total));
        }

        let mut id = b"-SW1000-".to_vec();
        id.extend((0..12).map(|_| rng.random_range(b'0'..=b'9')));

        self.peers.push(SimPeer {
            key,
            address: format!(
                "{}.{}.{}.{}",
                rng.random_range(11..200u8),
                rng.random_range(0..255u8),
                rng.random_range(0..255u8),
                rng.random_range(1..255u8)
            ),
            port: rng.random_range(6881..7000),
            id,
            bitfield,
            rate_up: rng.random_range(0..80_000),
            rate_down: rng.random_range(0..200_000),
            rate_peer: rng.random_range(0..150_000),
            remote_choked: rng.random_bool(0.4),
            remote_interested: rng.random_bool(0.7),
            local_choked: rng.random_bool(0.5),
            local_interested: rng.random_bool(0.8),
            choke_delayed: rng.random_bool(0.1),
            outgoing_queue: rng.random_range(0..8),
            incoming_queue: rng.random_range(0..5),
            first_queued_piece: None,
            snubbed: false,
            transferred_up: 0,
            transferred_down: 0,
        });
        key
    }

    fn snapshot_peer(&self, peer: &SimPeer) -> PeerSnapshot {
        PeerSnapshot {
            key: peer.key,
            address: peer.address.clone(),
            port: peer.port,
            id: peer.id.clone(),
            rate_up: peer.rate_up,
            rate_down: peer.rate_down,
            rate_peer: peer.rate_peer,
            remote_choked: peer.remote_choked,
            remote_interested: peer.remote_interested,
            local_choked: peer.local_choked,
            local_interested: peer.local_interested,
            choke_delayed: peer.choke_delayed,
            outgoing_queue: peer.outgoing_queue,
            incoming_queue: peer.incoming_queue,
            first_queued_piece: peer.first_queued_piece,
            chunks_done: count_bits(&peer.bitfield, self.chunks_total),
            snubbed: peer.snubbed,
            transferred_up: peer.transferred_up,
            transferred_down: peer.transferred_down,
        }
    }

    fn broadcast(&mut self, event: EngineEvent) {
        self.subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

impl SimEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(&config))),
        }
    }

    /// Drives the fabricated transfer: peer churn, chunk completion,
    /// tracker announces. Runs until the engine is dropped.
    pub fn spawn_activity(&self) {
        let state = Arc::downgrade(&self.state);
        tokio::spawn(async move {
            let mut interval = time::interval(ACTIVITY_TICK);
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else { break };
                let mut s = state.lock().expect("sim state poisoned");
                let mut rng = rand::rng();
                Self::advance(&mut s, &mut rng);
            }
        });
    }

    fn advance(s: &mut SimState, rng: &mut impl Rng) {
        // Download progress.
        let missing: Vec<u32> = (0..s.chunks_total)
            .filter(|&c| !bit_is_set(&s.local_bitfield, c))
            .collect();
        if let Some(&chunk) = missing.choose(rng) {
            if rng.random_bool(0.6) {
                set_bit(&mut s.local_bitfield, chunk);
                for file in &mut s.files {
                    if (file.chunk_begin..file.chunk_end).contains(&chunk) {
                        file.completed += 1;
                    }
                }
            }
            s.rate_down = rng.random_range(100_000..900_000);
        } else {
            s.rate_down = 0;
        }
        s.rate_up = rng.random_range(20_000..200_000);
        s.bytes_up += s.rate_up / 2;

        // Peer churn and per-peer activity.
        if rng.random_bool(0.15) && s.want_count.is_some() && (s.peers.len() as u32) < s.peers_max
        {
            let key = s.spawn_peer(rng);
            debug!(key, "sim peer joined");
            s.broadcast(EngineEvent::PeerJoined(key));
        }
        if rng.random_bool(0.08) && !s.peers.is_empty() {
            let idx = rng.random_range(0..s.peers.len());
            let key = s.peers.remove(idx).key;
            debug!(key, "sim peer left");
            s.broadcast(EngineEvent::PeerLeft(key));
        }
        let chunks_total = s.chunks_total;
        for peer in &mut s.peers {
            if rng.random_bool(0.3) {
                set_bit(&mut peer.bitfield, rng.random_range(0..chunks_total));
            }
            peer.rate_up = rng.random_range(0..80_000);
            peer.rate_down = rng.random_range(0..200_000);
            peer.transferred_up += peer.rate_up / 2;
            peer.transferred_down += peer.rate_down / 2;
            peer.incoming_queue = rng.random_range(0..5);
            peer.outgoing_queue = rng.random_range(0..8);
            peer.first_queued_piece = (peer.incoming_queue > 0)
                .then(|| rng.random_range(0..chunks_total));
            if rng.random_bool(0.05) {
                peer.local_choked = !peer.local_choked;
            }
        }

        // Tracker cycle: go busy at the deadline, report on the next tick.
        if s.tracker_busy {
            s.tracker_busy = false;
            s.tracker_deadline = Instant::now() + TRACKER_INTERVAL;
            if rng.random_bool(0.2) {
                s.broadcast(EngineEvent::TrackerFailed(
                    "Connection timed out".to_string(),
                ));
            } else {
                s.peers_not_connected = rng.random_range(10..60);
                s.broadcast(EngineEvent::TrackerSucceeded);
            }
        } else if Instant::now() >= s.tracker_deadline {
            s.tracker_busy = true;
        }
    }
}

impl Engine for SimEngine {
    fn is_valid(&self) -> bool {
        self.state.lock().expect("sim state poisoned").valid
    }

    fn stats(&self) -> DownloadStats {
        let s = self.state.lock().expect("sim state poisoned");
        let chunks_done = count_bits(&s.local_bitfield, s.chunks_total);
        DownloadStats {
            name: s.name.clone(),
            hash: s.hash.clone(),
            bytes_done: u64::from(chunks_done) * u64::from(s.chunk_size),
            bytes_total: u64::from(s.chunks_total) * u64::from(s.chunk_size),
            bytes_up: s.bytes_up,
            rate_up: s.rate_up,
            rate_down: s.rate_down,
            chunks_done,
            chunks_total: s.chunks_total,
            chunk_size: s.chunk_size,
            is_open: s.valid,
            peers_connected: s.peers.len() as u32,
            peers_not_connected: s.peers_not_connected,
            peers_min: s.peers_min,
            peers_max: s.peers_max,
            uploads_max: s.uploads_max,
            tracker_busy: s.tracker_busy,
            tracker_timeout: s.tracker_deadline.saturating_duration_since(Instant::now()),
        }
    }

    fn peers(&self) -> Vec<PeerSnapshot> {
        let s = self.state.lock().expect("sim state poisoned");
        s.peers.iter().map(|p| s.snapshot_peer(p)).collect()
    }

    fn peer(&self, key: PeerKey) -> Option<PeerSnapshot> {
        let s = self.state.lock().expect("sim state poisoned");
        s.peers
            .iter()
            .find(|p| p.key == key)
            .map(|p| s.snapshot_peer(p))
    }

    fn local_bitfield(&self) -> Vec<u8> {
        self.state
            .lock()
            .expect("sim state poisoned")
            .local_bitfield
            .clone()
    }

    fn peer_bitfield(&self, key: PeerKey) -> Option<Vec<u8>> {
        let s = self.state.lock().expect("sim state poisoned");
        s.peers
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.bitfield.clone())
    }

    fn seen_map(&self) -> Vec<u8> {
        let s = self.state.lock().expect("sim state poisoned");
        (0..s.chunks_total)
            .map(|c| {
                s.peers
                    .iter()
                    .filter(|p| bit_is_set(&p.bitfield, c))
                    .count()
                    .min(u8::MAX as usize) as u8
            })
            .collect()
    }

    fn files(&self) -> Vec<FileEntry> {
        let s = self.state.lock().expect("sim state poisoned");
        s.files
            .iter()
            .map(|f| FileEntry {
                path: f.path.clone(),
                size: f.size,
                priority: f.priority,
                chunk_begin: f.chunk_begin,
                chunk_end: f.chunk_end,
                completed: f.completed,
            })
            .collect()
    }

    fn throttle_rate(&self) -> u64 {
        THROTTLE_RATE
    }

    fn set_tracker_timeout(&self, timeout: Duration) {
        let mut s = self.state.lock().expect("sim state poisoned");
        s.tracker_deadline = Instant::now() + timeout;
        debug!(?timeout, "sim tracker timeout set");
    }

    fn set_want_count(&self, count: Option<u32>) {
        let mut s = self.state.lock().expect("sim state poisoned");
        s.want_count = count;
        debug!(?count, "sim want count set");
    }

    fn set_peers_min(&self, min: u32) {
        self.state.lock().expect("sim state poisoned").peers_min = min;
    }

    fn set_peers_max(&self, max: u32) {
        self.state.lock().expect("sim state poisoned").peers_max = max;
    }

    fn set_uploads_max(&self, max: u32) {
        self.state.lock().expect("sim state poisoned").uploads_max = max;
    }

    fn set_file_priority(&self, index: usize, priority: FilePriority) {
        let mut s = self.state.lock().expect("sim state poisoned");
        if let Some(file) = s.files.get_mut(index) {
            file.priority = priority.as_raw();
        }
    }

    fn update_priorities(&self) {
        debug!("sim priority recompute requested");
    }

    fn set_peer_snubbed(&self, key: PeerKey, snubbed: bool) {
        let mut s = self.state.lock().expect("sim state poisoned");
        if let Some(peer) = s.peers.iter_mut().find(|p| p.key == key) {
            peer.snubbed = snubbed;
        }
    }

    fn subscribe(&self) -> EventSubscription {
        let mut s = self.state.lock().expect("sim state poisoned");
        let id = SubscriptionId(s.next_subscriber);
        s.next_subscriber += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        s.subscribers.insert(id, tx);
        EventSubscription { id, receiver: rx }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut s = self.state.lock().expect("sim state poisoned");
        s.subscribers.remove(&id);
    }
}
