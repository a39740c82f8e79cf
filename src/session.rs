// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-download presenter state.
//!
//! [`DownloadSession`] keeps the only mutable state the monitor owns: a
//! mirror of the engine's peer set (so the selection cursor stays stable
//! while the authoritative set changes underneath), the display mode, the
//! file selection, and the last tracker message. Everything else is
//! re-queried from the engine at render time.
//!
//! Engine events and keystrokes are applied on the same task, drained
//! between frames, so a render never observes a half-applied removal.

use strum_macros::{Display, EnumIter};
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{Engine, EngineEvent, EventSubscription, FilePriority, PeerKey, SubscriptionId};
use crate::errors::MonitorError;

/// Status token shown after a successful tracker exchange.
pub const TRACKER_OK: &str = "^_^";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Peers,
    Stats,
    Seen,
    LocalBitmap,
    PeerBitmap,
    Files,
}

pub struct DownloadSession<E: Engine> {
    engine: E,
    /// Peer keys in event arrival order: append on join, splice on leave.
    peers: Vec<PeerKey>,
    /// `None` is the at-end position: no peer selected.
    cursor: Option<usize>,
    mode: DisplayMode,
    file_cursor: usize,
    status: String,
    subscription: Option<SubscriptionId>,
}

impl<E: Engine> DownloadSession<E> {
    /// Subscribes to the engine's event feed and seeds the peer mirror.
    ///
    /// Fails with `InvariantViolation` if the seed enumeration contains a
    /// peer without a network address; the subscription is released and
    /// further peer requests disabled before the error is returned.
    pub fn new(
        engine: E,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EngineEvent>), MonitorError> {
        if !engine.is_valid() {
            return Err(MonitorError::Detached);
        }

        let EventSubscription { id, receiver } = engine.subscribe();
        let seed = engine.peers();

        let mut session = Self {
            peers: seed.iter().map(|p| p.key).collect(),
            cursor: if seed.is_empty() { None } else { Some(0) },
            engine,
            mode: DisplayMode::default(),
            file_cursor: 0,
            status: String::new(),
            subscription: Some(id),
        };

        if seed.iter().any(|p| p.address.is_empty()) {
            session.close();
            return Err(MonitorError::InvariantViolation(
                "peer enumeration contained a peer without an address",
            ));
        }

        Ok((session, receiver))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn peer_keys(&self) -> &[PeerKey] {
        &self.peers
    }

    pub fn cursor_index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn cursor_key(&self) -> Option<PeerKey> {
        self.cursor.map(|i| self.peers[i])
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn file_cursor(&self) -> usize {
        self.file_cursor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Fails fast once the engine handle has gone away.
    pub fn guard(&self) -> Result<(), MonitorError> {
        if self.engine.is_valid() {
            Ok(())
        } else {
            Err(MonitorError::Detached)
        }
    }

    /// Applies one engine notification to the mirror.
    ///
    /// A disconnect for a peer the engine never reported as connected is a
    /// broken contract and surfaces as `InvariantViolation`.
    pub fn on_event(&mut self, event: EngineEvent) -> Result<(), MonitorError> {
        match event {
            EngineEvent::PeerJoined(key) => {
                self.peers.push(key);
            }
            EngineEvent::PeerLeft(key) => {
                let index = self.peers.iter().position(|&k| k == key).ok_or(
                    MonitorError::InvariantViolation(
                        "disconnect reported for a peer that was never connected",
                    ),
                )?;
                self.peers.remove(index);
                // Removal and cursor adjustment happen together: the cursor
                // slides onto the next element, or to at-end off the tail.
                self.cursor = match self.cursor {
                    Some(c) if c > index => Some(c - 1),
                    Some(c) if c == index && index < self.peers.len() => Some(index),
                    Some(c) if c == index => None,
                    other => other,
                };
            }
            EngineEvent::TrackerFailed(reason) => {
                debug!(%reason, "tracker failed");
                self.status = reason;
            }
            EngineEvent::TrackerSucceeded => {
                self.status = TRACKER_OK.to_string();
                self.engine.set_want_count(None);
            }
        }
        Ok(())
    }

    pub fn cursor_up(&mut self) {
        match self.cursor {
            Some(0) => {}
            Some(c) => self.cursor = Some(c - 1),
            // From at-end, up lands on the last element.
            None if !self.peers.is_empty() => self.cursor = Some(self.peers.len() - 1),
            None => {}
        }
    }

    pub fn cursor_down(&mut self) {
        if let Some(c) = self.cursor {
            if c + 1 < self.peers.len() {
                self.cursor = Some(c + 1);
            }
        }
    }

    pub fn file_cursor_up(&mut self) {
        self.file_cursor = self.file_cursor.saturating_sub(1);
    }

    pub fn file_cursor_down(&mut self) {
        let count = self.engine.files().len();
        if self.file_cursor + 1 < count {
            self.file_cursor += 1;
        }
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        debug!(%mode, "display mode switched");
        self.mode = mode;
    }

    /// Per-frame legality check, run before rendering: the peer bitmap
    /// needs a selected peer, otherwise fall back to the peer table.
    pub fn ensure_mode(&mut self) {
        if self.mode == DisplayMode::PeerBitmap && self.cursor.is_none() {
            self.mode = DisplayMode::Peers;
        }
    }

    /// Flips the selected peer's snub flag. The flag lives in the engine's
    /// peer record; this is a pass-through mutation.
    pub fn toggle_snub(&mut self) {
        if let Some(key) = self.cursor_key() {
            if let Some(peer) = self.engine.peer(key) {
                self.engine.set_peer_snubbed(key, !peer.snubbed);
            }
        }
    }

    /// Cycles the selected file's priority and asks the engine to
    /// recompute scheduling. An unrecognized stored value resets to Normal.
    pub fn cycle_file_priority(&mut self) {
        let files = self.engine.files();
        if let Some(entry) = files.get(self.file_cursor) {
            let next = FilePriority::from_raw(entry.priority)
                .map_or(FilePriority::Normal, FilePriority::cycle);
            self.engine.set_file_priority(self.file_cursor, next);
            self.engine.update_priorities();
        }
    }

    /// Releases the event subscription and tells the engine to stop
    /// requesting more peers. Runs at most once; safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.engine.unsubscribe(id);
            self.engine.set_want_count(None);
        }
    }
}

impl<E: Engine> Drop for DownloadSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}
