// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::engine::PeerSnapshot;

/// Percent-escapes arbitrary bytes for display. Alphanumerics and `-` pass
/// through, everything else becomes `%XY` with uppercase hex nibbles.
pub fn escape_bytes(src: &[u8]) -> String {
    let mut out = String::with_capacity(src.len());
    for &b in src {
        if b.is_ascii_alphanumeric() || b == b'-' {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(hex_glyph(b >> 4));
            out.push(hex_glyph(b & 0xF));
        }
    }
    out
}

pub fn hex_glyph(nibble: u8) -> char {
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'A' + nibble - 10) as char
    }
}

/// One glyph per chunk replica count: `0`-`9`, `A`-`F`, then `X` for
/// anything sixteen or above.
pub fn replica_glyph(count: u8) -> char {
    match count {
        0..=15 => hex_glyph(count),
        _ => 'X',
    }
}

pub fn format_mib(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / f64::from(1 << 20))
}

pub fn format_kib(bytes_per_second: u64) -> String {
    format!("{:5.1}", bytes_per_second as f64 / 1024.0)
}

/// Choke/interest flags, remote pair then local, with the choke-delay
/// marker trailing: `c`hoked/`u`nchoked, `i`nterested/`n`ot.
pub fn peer_flags(peer: &PeerSnapshot) -> String {
    format!(
        "{}{}/{}{}{}",
        if peer.remote_choked { 'c' } else { 'u' },
        if peer.remote_interested { 'i' } else { 'n' },
        if peer.local_choked { 'c' } else { 'u' },
        if peer.local_interested { 'i' } else { 'n' },
        if peer.choke_delayed { 'd' } else { ' ' },
    )
}

/// Truncates or pads to exactly `width` characters.
pub fn fit_width(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    while out.chars().count() < width {
        out.push(' ');
    }
    out
}

/// Truncates the tail if `s` exceeds `max`; never pads.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_passes_safe_characters_through() {
        assert_eq!(escape_bytes(b"abc-XYZ-019"), "abc-XYZ-019");
    }

    #[test]
    fn escape_encodes_everything_else_as_uppercase_hex() {
        assert_eq!(escape_bytes(b" "), "%20");
        assert_eq!(escape_bytes(&[0x00, 0xFF]), "%00%FF");
        assert_eq!(escape_bytes(b"a_b"), "a%5Fb");
    }

    #[test]
    fn replica_glyphs_saturate_at_x() {
        assert_eq!(replica_glyph(0), '0');
        assert_eq!(replica_glyph(9), '9');
        assert_eq!(replica_glyph(10), 'A');
        assert_eq!(replica_glyph(15), 'F');
        assert_eq!(replica_glyph(16), 'X');
        assert_eq!(replica_glyph(200), 'X');
    }

    #[test]
    fn fit_width_pads_and_truncates() {
        assert_eq!(fit_width("ab", 4), "ab  ");
        assert_eq!(fit_width("abcdef", 4), "abcd");
        assert_eq!(fit_width("", 0), "");
    }

    #[test]
    fn peer_flags_cover_both_ends() {
        let peer = PeerSnapshot {
            remote_choked: true,
            remote_interested: false,
            local_choked: false,
            local_interested: true,
            choke_delayed: true,
            ..Default::default()
        };
        assert_eq!(peer_flags(&peer), "cn/uid");
    }
}
