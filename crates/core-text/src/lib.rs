//! Line-oriented file storage for the editing engine.
//!
//! A file is a dense sequence of lines numbered from 1. Every higher layer
//! (marks, cut buffers, search, text input) addresses text through
//! [`LineStore`] by `(line, column)` pairs; none of them see the backing
//! representation.

mod backend;
pub mod column;
mod error;
mod store;

pub use backend::{LineBackend, RopeBackend};
pub use error::{BackendError, ErrorKind, StoreOp, TextError};
pub use store::LineStore;

use std::fmt;

/// 1-based line number. `0` is only meaningful as "before line 1".
pub type LineNo = usize;

/// A position inside a file: 1-based line and byte offset within that line.
///
/// Field order gives the derived `Ord` its (line, column) ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub lno: LineNo,
    pub cno: usize,
}

impl Position {
    pub const fn new(lno: LineNo, cno: usize) -> Self {
        Self { lno, cno }
    }

    /// Line 1, column 0: the default of the absolute mark.
    pub const fn origin() -> Self {
        Self { lno: 1, cno: 0 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lno, self.cno)
    }
}

/// Structural change reported by the store to interested tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    /// Line added after the given line.
    Append,
    /// Line removed.
    Delete,
    /// Line added before the given line.
    Insert,
    /// Line contents replaced.
    Reset,
}

impl fmt::Display for LineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LineOp::Append => "append",
            LineOp::Delete => "delete",
            LineOp::Insert => "insert",
            LineOp::Reset => "reset",
        };
        f.write_str(s)
    }
}
