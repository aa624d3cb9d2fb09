//! Column helpers operating on a single line.
//!
//! Positions are byte offsets; these helpers keep them on `char` boundaries
//! and translate them to display columns. Display width is the only place the
//! engine cares about terminal cells (margin wrap, `^D`/`^T` indentation).

use unicode_width::UnicodeWidthChar;

/// Previous char boundary (0 if already at or below the first boundary).
pub fn prev_boundary(line: &str, byte: usize) -> usize {
    if byte == 0 {
        return 0;
    }
    let mut b = byte.min(line.len()) - 1;
    while b > 0 && !line.is_char_boundary(b) {
        b -= 1;
    }
    b
}

/// Next char boundary (`line.len()` if at or beyond the end).
pub fn next_boundary(line: &str, byte: usize) -> usize {
    if byte >= line.len() {
        return line.len();
    }
    let mut b = byte + 1;
    while b < line.len() && !line.is_char_boundary(b) {
        b += 1;
    }
    b
}

/// Byte offset of the last character, 0 on an empty line.
pub fn last_column(line: &str) -> usize {
    prev_boundary(line, line.len())
}

/// Cells occupied by `c` when it starts at display column `col`.
pub fn char_cells(c: char, col: usize, tabstop: usize) -> usize {
    match c {
        '\t' => {
            let ts = tabstop.max(1);
            ts - col % ts
        }
        // Control characters display as `^X`.
        c if (c as u32) < 0x20 || c == '\x7f' => 2,
        c => c.width().unwrap_or(1),
    }
}

/// Display column reached after the characters in `chars`.
pub fn display_width<I: IntoIterator<Item = char>>(chars: I, tabstop: usize) -> usize {
    chars
        .into_iter()
        .fold(0, |col, c| col + char_cells(c, col, tabstop))
}
