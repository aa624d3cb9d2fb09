//! A pending input line and the whitespace arithmetic done on it.
//!
//! The buffer of a [`TextLine`] is split by the input cursor `cno` (a char
//! index kept by the assembler) into three runs:
//!
//! ```text
//! [0, cno)                 entered text
//! [cno, cno + owrite)      characters the next input overwrites
//! [cno + owrite, len)      characters pushed right by the next input
//! ```
//!
//! so `cno + owrite + insert == len` holds between events. `ai` counts the
//! autoindent characters at the start of the line and `offset` the
//! characters before the insertion point that input may not erase.

use crate::InputError;
use core_text::LineNo;
use core_text::column::{char_cells, display_width};

pub(crate) fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub(crate) fn in_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Columns from `col` to the next multiple of `width`.
fn col_off(col: usize, width: usize) -> usize {
    let w = width.max(1);
    w - col % w
}

/// Tabs then spaces that advance from display column `from` to `to`.
fn fill(from: usize, to: usize, tabstop: usize) -> (usize, usize) {
    let mut col = from;
    let mut tabs = 0;
    while col + col_off(col, tabstop) <= to {
        col += col_off(col, tabstop);
        tabs += 1;
    }
    (tabs, to.saturating_sub(col))
}

#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub lno: LineNo,
    pub(crate) buf: Vec<char>,
    pub(crate) ai: usize,
    pub(crate) offset: usize,
    pub(crate) owrite: usize,
    pub(crate) insert: usize,
    /// Cursor and trailing text at the moment the line was broken.
    pub(crate) saved: Option<(usize, Vec<char>)>,
    /// Blanks dropped after a line break in replace mode.
    pub(crate) r_erase: usize,
}

/// Text split off by a margin wrap, waiting for the new line.
#[derive(Debug, Clone)]
pub(crate) struct Carry {
    pub chars: Vec<char>,
    /// Leading characters of `chars` that were entered text.
    pub typed: usize,
    pub owrite: usize,
    pub insert: usize,
}

impl TextLine {
    pub fn new(lno: LineNo, buf: Vec<char>) -> Self {
        Self {
            lno,
            buf,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.buf.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn autoindent(&self) -> usize {
        self.ai
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset of char index `cno`.
    pub fn byte_offset(&self, cno: usize) -> usize {
        self.buf.iter().take(cno).map(|c| c.len_utf8()).sum()
    }

    pub(crate) fn reserve(&mut self, n: usize) -> Result<(), InputError> {
        self.buf.try_reserve(n).map_err(|_| InputError::Allocation)
    }

    /// Enter `c` at `cno`, consuming an overwrite character if any.
    pub(crate) fn put_char(&mut self, cno: &mut usize, c: char) -> Result<(), InputError> {
        if self.owrite > 0 {
            self.owrite -= 1;
            self.buf[*cno] = c;
        } else {
            self.reserve(1)?;
            self.buf.insert(*cno, c);
        }
        *cno += 1;
        Ok(())
    }

    /// Discard the overwrite run, closing the gap to the insert run.
    pub(crate) fn drop_overwrite(&mut self, cno: usize) {
        if self.owrite > 0 {
            self.buf.drain(cno..cno + self.owrite);
            self.owrite = 0;
        }
    }

    /// Prepend the leading blanks of `src` as autoindent.
    pub(crate) fn auto_indent(&mut self, src: &[char]) -> Result<(), InputError> {
        let n = src.iter().take_while(|c| is_blank(**c)).count();
        if n == 0 {
            return Ok(());
        }
        self.reserve(n)?;
        self.buf.splice(0..0, src[..n].iter().copied());
        self.ai = n;
        Ok(())
    }

    /// Collapse autoindent-only lines and rewrite leading blanks into the
    /// fewest tabs and spaces. `cursor` is adjusted when it is on this line.
    pub(crate) fn ai_resolve(&mut self, cursor: Option<&mut usize>, tabstop: usize) {
        if self.buf.is_empty() || self.offset != 0 || self.ai == 0 {
            return;
        }
        if self.buf.len() <= self.ai {
            self.buf.clear();
            self.ai = 0;
            if let Some(c) = cursor {
                *c = 0;
            }
            return;
        }

        let (mut scol, mut spaces, mut tab_after_space, mut old) = (0, 0, false, 0);
        for &c in self.buf.iter().take_while(|c| is_blank(**c)) {
            if c == '\t' {
                tab_after_space |= spaces > 0;
                scol += col_off(scol, tabstop);
            } else {
                spaces += 1;
                scol += 1;
            }
            old += 1;
        }
        if spaces == 0 || (!tab_after_space && spaces < tabstop) {
            return;
        }
        let (tabs, spaces) = fill(0, scol, tabstop);
        let new = tabs + spaces;
        if new == old {
            return;
        }
        let ws = std::iter::repeat_n('\t', tabs).chain(std::iter::repeat_n(' ', spaces));
        self.buf.splice(0..old, ws);
        if let Some(c) = cursor {
            *c = c.saturating_sub(old - new);
        }
    }

    /// `^T` (indent) or `^D` (outdent) to the next shiftwidth stop.
    pub(crate) fn dent(
        &mut self,
        cno: &mut usize,
        indent: bool,
        tabstop: usize,
        shiftwidth: usize,
    ) -> Result<(), InputError> {
        let sw = shiftwidth.max(1);
        let current = display_width(self.buf[..*cno].iter().copied(), tabstop);
        let target = if indent {
            current + col_off(current, sw)
        } else {
            let t = current.saturating_sub(1);
            t - t % sw
        };
        let ai_reset = !indent || *cno == self.ai + self.offset;

        // Preceding blanks (autoindent included) become overwrite characters.
        while *cno > self.offset && is_blank(self.buf[*cno - 1]) {
            *cno -= 1;
            self.owrite += 1;
        }
        let current = display_width(self.buf[..*cno].iter().copied(), tabstop);
        let (tabs, spaces) = fill(current, target, tabstop);
        if ai_reset {
            self.ai = tabs + spaces;
        }
        for c in std::iter::repeat_n('\t', tabs).chain(std::iter::repeat_n(' ', spaces)) {
            self.put_char(cno, c)?;
        }
        Ok(())
    }

    /// Display column at which the character before `cno` starts.
    pub(crate) fn column_before(&self, cno: usize, tabstop: usize) -> usize {
        let mut col = 0;
        for &c in &self.buf[..cno.saturating_sub(1)] {
            col += char_cells(c, col, tabstop);
        }
        col
    }

    /// Break the line at the blank nearest before `cno`. Returns `None` when
    /// no blank lies between the cursor and the autoindent or offset.
    pub(crate) fn margin_break(&mut self, cno: &mut usize) -> Option<Carry> {
        if *cno == 0 {
            return None;
        }
        let mut off = *cno - 1;
        let mut len = 0;
        loop {
            if is_blank(self.buf[off]) {
                break;
            }
            if off == self.ai || off == self.offset || off == 0 {
                return None;
            }
            off -= 1;
            len += 1;
        }

        let carry = Carry {
            chars: self.buf.split_off(off + 1),
            typed: len,
            owrite: self.owrite,
            insert: self.insert,
        };
        *cno -= len;
        self.owrite = 0;
        self.insert = 0;

        // Trailing blanks stay behind.
        while *cno > 0 && is_blank(self.buf[*cno - 1]) {
            let p = *cno - 1;
            self.buf.pop();
            *cno -= 1;
            if p == self.ai || p == self.offset {
                break;
            }
        }
        Some(carry)
    }
}
