// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Render modes. Every function here is a pure projection of engine
//! queries, the peer mirror, and a layout window onto the frame; the only
//! state change per frame is the mode-legality check at the top of
//! [`draw`].

use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Row, Table};

use crate::engine::{DownloadStats, Engine, FilePriority};
use crate::session::{DisplayMode, DownloadSession};
use crate::theme;
use crate::tui::formatters::{
    escape_bytes, fit_width, format_kib, format_mib, hex_glyph, peer_flags, replica_glyph,
    truncate,
};
use crate::tui::layout::{centered_window, expand_window, wrap_rows};

/// Below this the frame degenerates to an empty screen.
pub const MIN_WIDTH: u16 = 15;
pub const MIN_HEIGHT: u16 = 5;

const FILE_PATH_WIDTH: usize = 50;
const FOOTER_ROWS: u16 = 3;

pub fn draw<E: Engine>(f: &mut Frame, session: &mut DownloadSession<E>) {
    let area = f.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        return;
    }

    session.ensure_mode();
    let stats = session.engine().stats();

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(FOOTER_ROWS),
    ])
    .split(area);

    draw_title(f, &stats, chunks[0]);

    match session.mode() {
        DisplayMode::Peers => draw_peers(f, session, &stats, chunks[1]),
        DisplayMode::Stats => draw_stats(f, session, &stats, chunks[1]),
        DisplayMode::Seen => draw_seen(f, session, chunks[1]),
        DisplayMode::LocalBitmap => {
            draw_bitfield(f, "Local", session.engine().local_bitfield(), chunks[1]);
        }
        DisplayMode::PeerBitmap => draw_peer_bitfield(f, session, chunks[1]),
        DisplayMode::Files => draw_files(f, session, chunks[1]),
    }

    draw_footer(f, session, &stats, chunks[2]);
}

fn draw_title(f: &mut Frame, stats: &DownloadStats, area: Rect) {
    let title = Paragraph::new(format!("*** {} ***", stats.name))
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme::MAUVE).bold());
    f.render_widget(title, area);
}

fn draw_peers<E: Engine>(
    f: &mut Frame,
    session: &DownloadSession<E>,
    stats: &DownloadStats,
    area: Rect,
) {
    let keys = session.peer_keys();
    let height = area.height.saturating_sub(1) as usize;
    let window = expand_window(keys.len(), height, session.cursor_index());

    let header = Row::new(vec![
        "", "DNS", "UP", "DOWN", "PEER", "RE/LO", "QS", "DONE", "REQ", "SNUB",
    ])
    .style(Style::default().fg(theme::YELLOW));

    let rows: Vec<Row> = keys[window.clone()]
        .iter()
        .enumerate()
        .filter_map(|(offset, &key)| {
            let index = window.start + offset;
            // A peer can vanish from the engine before its leave event is
            // drained; the row is simply omitted for that frame.
            let peer = session.engine().peer(key)?;
            let selected = session.cursor_index() == Some(index);

            let done_pct = if stats.chunks_total > 0 {
                peer.chunks_done * 100 / stats.chunks_total
            } else {
                0
            };
            let style = if selected {
                Style::default().fg(theme::TEXT).bg(theme::SURFACE0)
            } else {
                Style::default().fg(theme::TEXT)
            };

            Some(
                Row::new(vec![
                    if selected { "*" } else { " " }.to_string(),
                    peer.address.clone(),
                    format_kib(peer.rate_up),
                    format_kib(peer.rate_down),
                    format_kib(peer.rate_peer),
                    peer_flags(&peer),
                    format!("{}/{}", peer.outgoing_queue, peer.incoming_queue),
                    format!("{:3}", done_pct),
                    peer
                        .first_queued_piece
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                    if peer.snubbed { "*" } else { "" }.to_string(),
                ])
                .style(style),
            )
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(4),
    ];
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    f.render_widget(table, area);
}

fn draw_stats<E: Engine>(
    f: &mut Frame,
    session: &DownloadSession<E>,
    stats: &DownloadStats,
    area: Rect,
) {
    if area.height < 15 || area.width < 30 {
        return;
    }

    let mut lines = vec![
        Line::from(format!("Hash: {}", escape_bytes(&stats.hash))),
        Line::from(format!(
            "Chunks: {} / {} * {}",
            stats.chunks_done, stats.chunks_total, stats.chunk_size
        )),
        Line::default(),
    ];

    if let Some(peer) = session.cursor_key().and_then(|k| session.engine().peer(k)) {
        lines.push(Line::from(format!("DNS: {}:{}", peer.address, peer.port)));
        lines.push(Line::from(format!("Id: {}", escape_bytes(&peer.id))));
        lines.push(Line::from(format!(
            "Snubbed: {}",
            if peer.snubbed { "Yes" } else { "No" }
        )));
        lines.push(Line::from(format!("Done: {}", peer.chunks_done)));
        lines.push(Line::from(format!(
            "Rate: {}/{} KiB Total: {}/{} MiB",
            format_kib(peer.rate_up),
            format_kib(peer.rate_down),
            format_mib(peer.transferred_up),
            format_mib(peer.transferred_down),
        )));
    }

    let paragraph = Paragraph::new(lines).style(Style::default().fg(theme::TEXT));
    f.render_widget(paragraph, area);
}

fn draw_seen<E: Engine>(f: &mut Frame, session: &DownloadSession<E>, area: Rect) {
    let seen = session.engine().seen_map();
    let width = area.width.saturating_sub(1) as usize;
    let rows = area.height.saturating_sub(1) as usize;

    let mut lines = vec![Line::styled(
        "Seen bitfields",
        Style::default().fg(theme::SKY),
    )];
    for range in wrap_rows(seen.len(), width, rows) {
        let row: String = seen[range].iter().map(|&c| replica_glyph(c)).collect();
        lines.push(Line::styled(row, Style::default().fg(theme::TEXT)));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_peer_bitfield<E: Engine>(f: &mut Frame, session: &DownloadSession<E>, area: Rect) {
    // ensure_mode guarantees a cursor; the peer itself may already be gone
    // from the engine, which degrades to an empty bitmap.
    let Some(key) = session.cursor_key() else {
        return;
    };
    let label = session
        .engine()
        .peer(key)
        .map(|p| p.address)
        .unwrap_or_default();
    let data = session.engine().peer_bitfield(key).unwrap_or_default();
    draw_bitfield(f, &label, data, area);
}

fn draw_bitfield(f: &mut Frame, label: &str, data: Vec<u8>, area: Rect) {
    // Two glyphs per byte, so a row holds half the terminal width.
    let bytes_per_row = (area.width / 2).saturating_sub(1) as usize;
    let rows = area.height.saturating_sub(1) as usize;

    let mut lines = vec![Line::styled(
        format!("Bitfield: {label}"),
        Style::default().fg(theme::SKY),
    )];
    for range in wrap_rows(data.len(), bytes_per_row, rows) {
        let mut row = String::with_capacity(range.len() * 2);
        for &b in &data[range] {
            row.push(hex_glyph(b >> 4));
            row.push(hex_glyph(b & 0xF));
        }
        lines.push(Line::styled(row, Style::default().fg(theme::TEXT)));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn priority_label(raw: u8) -> &'static str {
    match FilePriority::from_raw(raw) {
        Some(FilePriority::Stopped) => "off",
        Some(FilePriority::Normal) => "   ",
        Some(FilePriority::High) => "hig",
        None => "BUG",
    }
}

fn draw_files<E: Engine>(f: &mut Frame, session: &DownloadSession<E>, area: Rect) {
    let files = session.engine().files();
    let height = area.height.saturating_sub(1) as usize;
    let window = centered_window(files.len(), height, session.file_cursor());

    let header =
        Row::new(vec!["", "File", "Size", "Pri", "Cmpl"]).style(Style::default().fg(theme::YELLOW));

    let rows: Vec<Row> = files[window.clone()]
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let index = window.start + offset;
            let selected = index == session.file_cursor();
            let style = if selected {
                Style::default().fg(theme::TEXT).bg(theme::SURFACE0)
            } else {
                Style::default().fg(theme::TEXT)
            };
            Row::new(vec![
                if selected { "*" } else { " " }.to_string(),
                fit_width(&entry.path, FILE_PATH_WIDTH),
                format!("{:5.1}", entry.size as f64 / f64::from(1 << 20)),
                priority_label(entry.priority).to_string(),
                format!("{:3}", entry.completion_pct()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Length(FILE_PATH_WIDTH as u16),
        Constraint::Length(7),
        Constraint::Length(3),
        Constraint::Length(4),
    ];
    let table = Table::new(rows, widths).header(header).column_spacing(2);
    f.render_widget(table, area);
}

fn draw_footer<E: Engine>(
    f: &mut Frame,
    session: &DownloadSession<E>,
    stats: &DownloadStats,
    area: Rect,
) {
    let transfer = if stats.chunks_done != stats.chunks_total || !stats.is_open {
        format!(
            "Torrent: {} / {} MiB Rate: {}/{} KiB Uploaded: {} MiB",
            format_mib(stats.bytes_done),
            format_mib(stats.bytes_total),
            format_kib(stats.rate_up),
            format_kib(stats.rate_down),
            format_mib(stats.bytes_up),
        )
    } else {
        format!(
            "Torrent: Done {} MiB Rate: {}/{} KiB Uploaded: {} MiB",
            format_mib(stats.bytes_total),
            format_kib(stats.rate_up),
            format_kib(stats.rate_down),
            format_mib(stats.bytes_up),
        )
    };

    let peers = format!(
        "Peers: {}({}) Min/Max: {}/{} Uploads: {} Throttle: {} KiB",
        stats.peers_connected,
        stats.peers_not_connected,
        stats.peers_min,
        stats.peers_max,
        stats.uploads_max,
        session.engine().throttle_rate() / 1000,
    );

    let message = truncate(session.status(), (area.width as usize).saturating_sub(16));
    let tracker = Line::from(vec![
        Span::raw("Tracker: ["),
        Span::styled(
            if stats.tracker_busy { "C" } else { " " },
            Style::default().fg(theme::GREEN),
        ),
        Span::raw(format!(":{}] ", stats.tracker_timeout.as_secs())),
        Span::styled(message, Style::default().fg(theme::SUBTEXT1)),
    ]);

    let lines = vec![
        Line::styled(transfer, Style::default().fg(theme::TEXT)),
        Line::styled(peers, Style::default().fg(theme::SUBTEXT1)),
        tracker,
    ];
    f.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MockEngine;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(session: &mut DownloadSession<MockEngine>, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|f| draw(f, session)).expect("draw");

        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    text.push_str(cell.symbol());
                }
            }
            text.push('\n');
        }
        text
    }

    fn fixture_session(peer_count: usize) -> (DownloadSession<MockEngine>, MockEngine) {
        let engine = MockEngine::with_peers(peer_count);
        let (session, _rx) = DownloadSession::new(engine.clone()).expect("session");
        (session, engine)
    }

    #[test]
    fn peers_mode_shows_header_title_and_footer() {
        let (mut session, _engine) = fixture_session(3);
        let text = render(&mut session, 80, 24);

        assert!(text.contains("*** fixture ***"));
        assert!(text.contains("DNS"));
        assert!(text.contains("SNUB"));
        assert!(text.contains("* 10.0.0.1"));
        assert!(text.contains("Torrent:"));
        assert!(text.contains("Peers: 3"));
        assert!(text.contains("Tracker: ["));
    }

    #[test]
    fn tiny_terminal_renders_nothing() {
        let (mut session, _engine) = fixture_session(3);
        let text = render(&mut session, 14, 4);
        assert!(text.chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn files_mode_lists_entries_with_priorities() {
        let (mut session, engine) = fixture_session(1);
        engine.state().files[1].priority = 99;
        session.set_mode(DisplayMode::Files);

        let text = render(&mut session, 90, 24);
        assert!(text.contains("payload/file-0.bin"));
        assert!(text.contains("BUG"));
        assert!(text.contains("Cmpl"));
    }

    #[test]
    fn zero_chunk_file_reports_full_completion() {
        let (mut session, engine) = fixture_session(1);
        {
            let mut state = engine.state();
            state.files[0].chunk_begin = 8;
            state.files[0].chunk_end = 8;
        }
        session.set_mode(DisplayMode::Files);

        let text = render(&mut session, 90, 24);
        assert!(text.contains("100"));
    }

    #[test]
    fn peer_bitmap_without_selection_falls_back_to_peer_table() {
        let (mut session, _engine) = fixture_session(0);
        session.set_mode(DisplayMode::PeerBitmap);

        let text = render(&mut session, 80, 24);
        assert_eq!(session.mode(), DisplayMode::Peers);
        assert!(text.contains("DNS"));
        assert!(!text.contains("Bitfield:"));
    }

    #[test]
    fn local_bitmap_renders_hex_pairs() {
        let (mut session, engine) = fixture_session(1);
        engine.state().local_bitfield = vec![0xF0, 0x0A];
        session.set_mode(DisplayMode::LocalBitmap);

        let text = render(&mut session, 80, 24);
        assert!(text.contains("Bitfield: Local"));
        assert!(text.contains("F00A"));
    }

    #[test]
    fn seen_mode_renders_replica_glyphs() {
        let (mut session, engine) = fixture_session(1);
        engine.state().seen = vec![0, 5, 12, 200];
        session.set_mode(DisplayMode::Seen);

        let text = render(&mut session, 80, 24);
        assert!(text.contains("Seen bitfields"));
        assert!(text.contains("05CX"));
    }

    #[test]
    fn stats_mode_needs_room() {
        let (mut session, _engine) = fixture_session(1);
        session.set_mode(DisplayMode::Stats);

        let text = render(&mut session, 80, 10);
        assert!(!text.contains("Hash:"));

        let text = render(&mut session, 80, 30);
        assert!(text.contains("Hash:"));
        assert!(text.contains("DNS: 10.0.0.1:6881"));
    }

    #[test]
    fn footer_switches_phrasing_when_complete() {
        let (mut session, engine) = fixture_session(1);
        {
            let mut state = engine.state();
            state.stats.chunks_done = state.stats.chunks_total;
            state.stats.bytes_done = state.stats.bytes_total;
        }
        let text = render(&mut session, 80, 24);
        assert!(text.contains("Torrent: Done"));
    }
}
