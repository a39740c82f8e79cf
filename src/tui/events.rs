// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keystroke dispatch, in two explicit stages: the current mode gets the
//! first look (cursor movement, snub toggle, priority cycle), then the
//! global handler runs for everything the mode did not consume (mode
//! switches, limit adjustments, exit).

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::config::Settings;
use crate::engine::Engine;
use crate::errors::MonitorError;
use crate::session::{DisplayMode, DownloadSession};

/// Handles one keystroke. Returns `false` when the operator asked to
/// leave this view.
pub fn handle_key<E: Engine>(
    key: KeyEvent,
    session: &mut DownloadSession<E>,
    settings: &Settings,
) -> Result<bool, MonitorError> {
    session.guard()?;
    if key.kind != KeyEventKind::Press {
        return Ok(true);
    }
    if handle_mode_key(key.code, session) {
        return Ok(true);
    }
    Ok(handle_global_key(key.code, session, settings))
}

/// Mode-specific stage. Returns true if the key was consumed.
fn handle_mode_key<E: Engine>(code: KeyCode, session: &mut DownloadSession<E>) -> bool {
    match session.mode() {
        DisplayMode::Peers | DisplayMode::Stats | DisplayMode::PeerBitmap => match code {
            KeyCode::Up => {
                session.cursor_up();
                true
            }
            KeyCode::Down => {
                session.cursor_down();
                true
            }
            KeyCode::Char('*') => {
                session.toggle_snub();
                true
            }
            _ => false,
        },
        DisplayMode::Files => match code {
            KeyCode::Up => {
                session.file_cursor_up();
                true
            }
            KeyCode::Down => {
                session.file_cursor_down();
                true
            }
            KeyCode::Char(' ') => {
                session.cycle_file_priority();
                true
            }
            _ => false,
        },
        DisplayMode::Seen | DisplayMode::LocalBitmap => false,
    }
}

/// Global stage: always reached for keys the mode did not take.
fn handle_global_key<E: Engine>(
    code: KeyCode,
    session: &mut DownloadSession<E>,
    settings: &Settings,
) -> bool {
    let KeyCode::Char(c) = code else {
        // A fixed "leave this view" key, handed back to the caller.
        return code != KeyCode::Left;
    };

    let engine = session.engine();
    match c.to_ascii_lowercase() {
        't' => {
            engine.set_tracker_timeout(settings.tracker_rearm());
            engine.set_want_count(Some(settings.tracker_want_count));
        }
        '1' => {
            let stats = engine.stats();
            engine.set_peers_min(stats.peers_min.saturating_sub(settings.peer_limit_step));
        }
        '2' => {
            let stats = engine.stats();
            engine.set_peers_min(stats.peers_min + settings.peer_limit_step);
        }
        '3' => {
            let stats = engine.stats();
            engine.set_peers_max(stats.peers_max.saturating_sub(settings.peer_limit_step));
        }
        '4' => {
            let stats = engine.stats();
            engine.set_peers_max(stats.peers_max + settings.peer_limit_step);
        }
        '5' => {
            let stats = engine.stats();
            engine.set_uploads_max(stats.uploads_max.saturating_sub(settings.upload_slot_step));
        }
        '6' => {
            let stats = engine.stats();
            engine.set_uploads_max(stats.uploads_max + settings.upload_slot_step);
        }
        'p' => session.set_mode(DisplayMode::Peers),
        'u' => session.set_mode(DisplayMode::Stats),
        'o' => session.set_mode(DisplayMode::Seen),
        'b' => session.set_mode(DisplayMode::LocalBitmap),
        'n' => session.set_mode(DisplayMode::PeerBitmap),
        'i' => session.set_mode(DisplayMode::Files),
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{MockEngine, MutationCall};
    use crate::engine::FilePriority;
    use std::time::Duration;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, ratatui::crossterm::event::KeyModifiers::NONE)
    }

    fn fixture(peer_count: usize) -> (DownloadSession<MockEngine>, MockEngine, Settings) {
        let engine = MockEngine::with_peers(peer_count);
        let (session, _rx) = DownloadSession::new(engine.clone()).expect("session");
        (session, engine, Settings::default())
    }

    fn send<E: Engine>(
        code: KeyCode,
        session: &mut DownloadSession<E>,
        settings: &Settings,
    ) -> bool {
        handle_key(press(code), session, settings).expect("dispatch")
    }

    #[test]
    fn left_key_exits_the_view() {
        let (mut session, _engine, settings) = fixture(1);
        assert!(!send(KeyCode::Left, &mut session, &settings));
        assert!(send(KeyCode::Right, &mut session, &settings));
    }

    #[test]
    fn mode_switch_keys_work_from_any_mode() {
        let (mut session, _engine, settings) = fixture(2);

        send(KeyCode::Char('u'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::Stats);

        send(KeyCode::Char('O'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::Seen);

        send(KeyCode::Char('b'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::LocalBitmap);

        send(KeyCode::Char('n'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::PeerBitmap);

        send(KeyCode::Char('i'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::Files);

        send(KeyCode::Char('p'), &mut session, &settings);
        assert_eq!(session.mode(), DisplayMode::Peers);
    }

    #[test]
    fn navigation_moves_the_peer_cursor_in_peer_modes() {
        let (mut session, _engine, settings) = fixture(3);

        send(KeyCode::Down, &mut session, &settings);
        assert_eq!(session.cursor_index(), Some(1));

        send(KeyCode::Char('u'), &mut session, &settings);
        send(KeyCode::Down, &mut session, &settings);
        assert_eq!(session.cursor_index(), Some(2));

        send(KeyCode::Up, &mut session, &settings);
        assert_eq!(session.cursor_index(), Some(1));
    }

    #[test]
    fn navigation_moves_the_file_cursor_in_files_mode() {
        let (mut session, _engine, settings) = fixture(3);
        send(KeyCode::Char('i'), &mut session, &settings);

        send(KeyCode::Down, &mut session, &settings);
        assert_eq!(session.file_cursor(), 1);
        // The peer cursor stays put.
        assert_eq!(session.cursor_index(), Some(0));

        for _ in 0..5 {
            send(KeyCode::Down, &mut session, &settings);
        }
        assert_eq!(session.file_cursor(), 2);

        send(KeyCode::Up, &mut session, &settings);
        assert_eq!(session.file_cursor(), 1);
    }

    #[test]
    fn snub_key_flips_the_selected_peer() {
        let (mut session, engine, settings) = fixture(2);
        send(KeyCode::Char('*'), &mut session, &settings);
        assert_eq!(
            engine.state().calls,
            vec![MutationCall::SetPeerSnubbed(1, true)]
        );
    }

    #[test]
    fn space_cycles_priority_only_in_files_mode() {
        let (mut session, engine, settings) = fixture(1);

        send(KeyCode::Char(' '), &mut session, &settings);
        assert!(engine.state().calls.is_empty());

        send(KeyCode::Char('i'), &mut session, &settings);
        send(KeyCode::Char(' '), &mut session, &settings);
        assert_eq!(
            engine.state().calls,
            vec![
                MutationCall::SetFilePriority(0, FilePriority::Stopped),
                MutationCall::UpdatePriorities,
            ]
        );
    }

    #[test]
    fn limit_keys_step_engine_limits() {
        let (mut session, engine, settings) = fixture(1);

        send(KeyCode::Char('1'), &mut session, &settings);
        send(KeyCode::Char('2'), &mut session, &settings);
        send(KeyCode::Char('3'), &mut session, &settings);
        send(KeyCode::Char('4'), &mut session, &settings);
        send(KeyCode::Char('5'), &mut session, &settings);
        send(KeyCode::Char('6'), &mut session, &settings);

        // MockEngine stats: min 40, max 100, uploads 8; steps 5 and 1.
        assert_eq!(
            engine.state().calls,
            vec![
                MutationCall::SetPeersMin(35),
                MutationCall::SetPeersMin(45),
                MutationCall::SetPeersMax(95),
                MutationCall::SetPeersMax(105),
                MutationCall::SetUploadsMax(7),
                MutationCall::SetUploadsMax(9),
            ]
        );
    }

    #[test]
    fn tracker_key_rearms_timeout_and_want_count() {
        let (mut session, engine, settings) = fixture(1);
        send(KeyCode::Char('T'), &mut session, &settings);
        assert_eq!(
            engine.state().calls,
            vec![
                MutationCall::SetTrackerTimeout(Duration::from_secs(5)),
                MutationCall::SetWantCount(Some(100)),
            ]
        );
    }

    #[test]
    fn release_events_are_ignored() {
        let (mut session, _engine, settings) = fixture(2);
        let mut key = press(KeyCode::Down);
        key.kind = KeyEventKind::Release;
        handle_key(key, &mut session, &settings).expect("dispatch");
        assert_eq!(session.cursor_index(), Some(0));
    }

    #[test]
    fn dispatch_fails_fast_on_detached_engine() {
        let (mut session, engine, settings) = fixture(1);
        engine.state().valid = false;
        assert!(matches!(
            handle_key(press(KeyCode::Down), &mut session, &settings),
            Err(MonitorError::Detached)
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (mut session, engine, settings) = fixture(1);
        assert!(send(KeyCode::Char('z'), &mut session, &settings));
        assert!(send(KeyCode::Esc, &mut session, &settings));
        assert!(engine.state().calls.is_empty());
        assert_eq!(session.mode(), DisplayMode::Peers);
    }
}
