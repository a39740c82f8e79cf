// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pure windowing math for lists and bitmaps larger than the terminal.

use std::ops::Range;

/// Window for the file table: aim the window start at `cursor - height/2`,
/// clamped so the window never runs past either boundary.
pub fn centered_window(count: usize, height: usize, cursor: usize) -> Range<usize> {
    if height == 0 || count == 0 {
        return 0..0;
    }
    if count <= height {
        return 0..count;
    }
    let start = cursor.saturating_sub(height / 2).min(count - height);
    start..start + height
}

/// Window for the peer table: grow outward from the cursor, trying
/// backward before forward on every iteration, until `height` slots are
/// spent or both boundaries are hit. The forward step can overshoot by one
/// on the last iteration; the overshoot is dropped.
///
/// With the cursor at-end the window is simply the head of the list.
pub fn expand_window(count: usize, height: usize, cursor: Option<usize>) -> Range<usize> {
    if count <= height {
        return 0..count;
    }
    let Some(cursor) = cursor else {
        return 0..height;
    };

    let mut lo = cursor.min(count);
    let mut hi = lo;
    let mut used = 0;
    while used < height {
        let mut moved = false;
        if lo > 0 {
            lo -= 1;
            used += 1;
            moved = true;
        }
        if hi < count {
            hi += 1;
            used += 1;
            moved = true;
        }
        if !moved {
            break;
        }
    }

    lo..hi.min(lo + height)
}

/// Wraps a flat sequence onto rows of `row_width` units, truncating
/// silently once `max_rows` are filled.
pub fn wrap_rows(len: usize, row_width: usize, max_rows: usize) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    if row_width == 0 {
        return rows;
    }
    let mut start = 0;
    while start < len && rows.len() < max_rows {
        let end = (start + row_width).min(len);
        rows.push(start..end);
        start = end;
    }
    rows
}
