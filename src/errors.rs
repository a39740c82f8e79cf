// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// The engine handle behind this session is no longer valid. Every
    /// further session operation fails with this.
    #[error("download handle is no longer valid")]
    Detached,

    /// The engine broke its contract with the presenter, or the peer
    /// mirror got out of sync. Fatal to the session.
    #[error("presenter invariant violated: {0}")]
    InvariantViolation(&'static str),

    #[error("terminal I/O failed")]
    Io(#[from] std::io::Error),
}
