//! Cell-width helpers shared by the compositor and the caret layer.
//!
//! Horizontal geometry is measured in **cells**: most characters take one cell, wide East Asian
//! characters and emoji take two (UAX #11 via `unicode-width`), and `'\t'` advances to the next
//! tab stop. Pixel x coordinates are `cells * char_width`.

use unicode_width::UnicodeWidthChar;

/// Cell width of a single character (tabs excluded).
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Cell width of `ch` when it starts at `cell_offset` within its line.
pub fn cell_width_at(ch: char, cell_offset: usize, tab_size: usize) -> usize {
    if ch == '\t' {
        let tab_size = tab_size.max(1);
        tab_size - cell_offset % tab_size
    } else {
        char_width(ch)
    }
}

/// Cell offset of character `column` from the start of `line`.
///
/// Columns past the end of the line are clamped to the line width.
pub fn visual_x_for_column(line: &str, column: usize, tab_size: usize) -> usize {
    line.chars().take(column).fold(0usize, |x, ch| {
        x.saturating_add(cell_width_at(ch, x, tab_size))
    })
}

/// Total cell width of `line`.
pub fn line_width(line: &str, tab_size: usize) -> usize {
    visual_x_for_column(line, usize::MAX, tab_size)
}
