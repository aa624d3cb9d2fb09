//! Regular-expression search over a line store.
//!
//! One [`SearchState`] lives in each screen. It remembers the last pattern
//! (as typed, so option changes can recompile it), the compiled `Regex`, the
//! last search direction and the replacement text that `~` expands to.
//!
//! A search runs `parse → (reuse | compile) → scan`:
//! - [`SearchState::f_search`] scans forward from one character past the
//!   cursor, wrapping to line 1 when `wrapscan` is set;
//! - [`SearchState::b_search`] scans backward and, on each line, walks the
//!   matcher rightwards so the hit is the last match before the cursor.
//!
//! The scans poll the screen's interrupt flag once per line. Messages are
//! queued only when the caller passes [`SearchFlags::MSG`].

pub mod delta;
pub mod motion;
pub mod pattern;
mod search;

pub use delta::{apply_delta, parse_delta};
pub use motion::{MotionRange, Operator, correct_backward, correct_forward};
pub use pattern::{escape_vi, tag_pattern};
pub use search::SearchState;

use bitflags::bitflags;
use core_text::{ErrorKind, Position, TextError};
use std::fmt;
use thiserror::Error;

bitflags! {
    /// Modifiers for a single search call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SearchFlags: u16 {
        /// A hit may sit on the end-of-line position (motion targets).
        const EOL = 1 << 0;
        /// Start at line 1 column 0 instead of after the cursor.
        const FILE = 1 << 1;
        /// Queue user messages for failures and wraps.
        const MSG = 1 << 2;
        /// The pattern argument starts with a delimiter to be parsed.
        const PARSE = 1 << 3;
        /// Remember the pattern and direction for `n`/`N`.
        const SET = 1 << 4;
        /// The pattern is a ctags search command.
        const TAG = 1 << 5;
        /// The search carried a line offset; the motion is line-wise.
        const DELTA = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        })
    }
}

/// A successful search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub pos: Position,
    /// The scan passed the end (or start) of the file.
    pub wrapped: bool,
    /// Text after the closing delimiter, for offsets such as `+2`.
    pub rest: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("File empty; nothing to search")]
    EmptyFile,
    #[error("Reached end-of-file without finding the pattern")]
    Eof,
    #[error("Reached top-of-file without finding the pattern")]
    Sof,
    #[error("Pattern not found")]
    NotFound,
    #[error("No previous search pattern")]
    NoPrevious,
    #[error("RE error: {0}")]
    Pattern(String),
    #[error("Interrupted")]
    Interrupted,
    #[error("Search offset before line 1")]
    OffsetBeforeStart,
    #[error("Search offset past end-of-file")]
    OffsetPastEnd,
    #[error("Characters after search string and/or line offset")]
    TrailingText,
    #[error(transparent)]
    Text(#[from] TextError),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::EmptyFile
            | SearchError::Eof
            | SearchError::Sof
            | SearchError::NotFound
            | SearchError::NoPrevious => ErrorKind::NotFound,
            SearchError::Pattern(_) | SearchError::TrailingText => ErrorKind::Pattern,
            SearchError::Interrupted => ErrorKind::Interrupted,
            SearchError::OffsetBeforeStart | SearchError::OffsetPastEnd => ErrorKind::OutOfRange,
            SearchError::Text(e) => e.kind(),
        }
    }
}
