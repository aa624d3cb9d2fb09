//! Per-file mark table.
//!
//! Marks are kept in a `Vec` sorted by key. The table is small (tens of
//! entries at most) so a sorted vector beats any map; `binary_search`
//! yields either the exact entry or the slot a new key belongs in.
//!
//! Invariants:
//! - Keys are unique and ascending.
//! - `'` and `` ` `` name the same absolute mark; it is seeded at (1,0).
//! - Structural edits shift mark lines; content edits never touch marks.
//!   Columns are validated only when a mark is read.
//! - A mark on a deleted line is flagged, not removed, so undo can restore it
//!   with an automatic set.

use crate::EditError;
use bitflags::bitflags;
use core_text::{LineNo, LineOp, LineStore, Position};
use tracing::trace;

/// Absolute mark, set by large cursor movements.
pub const ABSMARK1: char = '\'';
/// Alias of [`ABSMARK1`].
pub const ABSMARK2: char = '`';

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MarkFlags: u8 {
        /// The mark's line was deleted.
        const DELETED = 0b01;
        /// Set by an explicit user command rather than by undo.
        const USERSET = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub key: char,
    pub pos: Position,
    pub flags: MarkFlags,
}

#[derive(Debug, Clone)]
pub struct MarkTable {
    marks: Vec<Mark>,
}

impl Default for MarkTable {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(key: char) -> char {
    if key == ABSMARK2 { ABSMARK1 } else { key }
}

impl MarkTable {
    pub fn new() -> Self {
        Self {
            marks: vec![Mark {
                key: ABSMARK1,
                pos: Position::origin(),
                flags: MarkFlags::empty(),
            }],
        }
    }

    fn find(&self, key: char) -> Result<usize, usize> {
        self.marks.binary_search_by(|m| m.key.cmp(&key))
    }

    /// Set `key` to `pos`. Returns `false` when an automatic set was refused
    /// because the mark is a live user-set mark.
    pub fn set(&mut self, key: char, pos: Position, user_set: bool) -> bool {
        let key = canonical(key);
        let flags = if user_set {
            MarkFlags::USERSET
        } else {
            MarkFlags::empty()
        };
        match self.find(key) {
            Ok(i) => {
                let m = &mut self.marks[i];
                if !user_set
                    && !m.flags.contains(MarkFlags::DELETED)
                    && m.flags.contains(MarkFlags::USERSET)
                {
                    trace!(target: "state.marks", %key, %pos, "mark_set_refused");
                    return false;
                }
                m.pos = pos;
                m.flags = flags;
            }
            Err(i) => self.marks.insert(i, Mark { key, pos, flags }),
        }
        trace!(target: "state.marks", %key, %pos, user_set, "mark_set");
        true
    }

    /// Raw entry for `key`, without validation.
    pub fn entry(&self, key: char) -> Option<&Mark> {
        self.find(canonical(key)).ok().map(|i| &self.marks[i])
    }

    /// Resolve `key` against the current contents of `store`.
    pub fn get(&self, key: char, store: &mut LineStore) -> Result<Position, EditError> {
        let key = canonical(key);
        let mark = self.entry(key).ok_or(EditError::MarkNotSet(key))?;
        if mark.flags.contains(MarkFlags::DELETED) {
            return Err(EditError::MarkDeleted(key));
        }
        // (1,0) is valid even in an empty file.
        if mark.pos == Position::origin() {
            return Ok(mark.pos);
        }
        let gone = match store.fetch_line(mark.pos.lno)? {
            None => true,
            Some(line) => {
                let len = line.len();
                mark.pos.cno > len
                    || (mark.pos.cno == len && len != 0)
                    || !line.is_char_boundary(mark.pos.cno)
            }
        };
        if gone {
            return Err(EditError::MarkPositionGone(key));
        }
        Ok(mark.pos)
    }

    /// Adjust marks for a structural change at `lno`. Returns the marks newly
    /// flagged deleted, for the mutation log.
    pub fn line_op(&mut self, op: LineOp, lno: LineNo) -> Vec<Mark> {
        let mut deleted = Vec::new();
        match op {
            LineOp::Append | LineOp::Reset => {}
            LineOp::Insert => {
                for m in self.marks.iter_mut().filter(|m| m.pos.lno >= lno) {
                    m.pos.lno += 1;
                }
            }
            LineOp::Delete => {
                for m in self.marks.iter_mut() {
                    if m.pos.lno == lno {
                        if m.flags.contains(MarkFlags::DELETED) {
                            continue;
                        }
                        m.flags.insert(MarkFlags::DELETED);
                        deleted.push(*m);
                    } else if m.pos.lno > lno {
                        m.pos.lno -= 1;
                    }
                }
            }
        }
        if !deleted.is_empty() {
            trace!(target: "state.marks", lno, count = deleted.len(), "marks_deleted");
        }
        deleted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.marks.iter()
    }

    /// Drop every mark and reseed the absolute mark.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
