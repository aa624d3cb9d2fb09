//! Error taxonomy shared by every layer of the editing engine.
//!
//! Each crate defines its own `thiserror` enum; all of them fold into the
//! coarse [`ErrorKind`] so command callers can decide how to report a failure
//! without matching on crate-specific variants.

use crate::LineNo;
use std::fmt;
use thiserror::Error;

/// Coarse classification of engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Line, mark, buffer or pattern absent.
    NotFound,
    /// Position beyond the current line length or address beyond the file.
    OutOfRange,
    /// Backing store failure. The in-memory view may disagree with storage.
    Io,
    /// Buffer growth failed.
    Allocation,
    /// Regular expression compile or execution failure.
    Pattern,
    /// User cancel observed at line granularity. Not a true error.
    Interrupted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::Io => "i/o error",
            ErrorKind::Allocation => "allocation failure",
            ErrorKind::Pattern => "pattern error",
            ErrorKind::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Failure reported by a [`crate::LineBackend`] implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Storage(String),
}

/// Line store operation that failed, kept for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Append,
    Insert,
    Set,
    Delete,
    Count,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreOp::Get => "get",
            StoreOp::Append => "append",
            StoreOp::Insert => "insert",
            StoreOp::Set => "set",
            StoreOp::Delete => "delete",
            StoreOp::Count => "count",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum TextError {
    #[error("{lno}: unable to retrieve line")]
    NotFound { lno: LineNo },
    #[error("{lno}: line number out of range")]
    OutOfRange { lno: LineNo },
    #[error("{lno}: unable to {op} line: {source}")]
    Io {
        op: StoreOp,
        lno: LineNo,
        #[source]
        source: BackendError,
    },
}

impl TextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TextError::NotFound { .. } => ErrorKind::NotFound,
            TextError::OutOfRange { .. } => ErrorKind::OutOfRange,
            TextError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Line number the failure refers to.
    pub fn lno(&self) -> LineNo {
        match self {
            TextError::NotFound { lno }
            | TextError::OutOfRange { lno }
            | TextError::Io { lno, .. } => *lno,
        }
    }
}
