use core_text::{ErrorKind, Position, TextError};
use thiserror::Error;

/// Failures of mark, cut buffer and file operations.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error("Mark {0}: not set")]
    MarkNotSet(char),
    #[error("Mark {0}: the line was deleted")]
    MarkDeleted(char),
    #[error("Mark {0}: cursor position no longer exists")]
    MarkPositionGone(char),
    #[error("Invalid buffer name {0:?}")]
    InvalidBuffer(char),
    #[error("{}", empty_buffer_message(*.0))]
    BufferEmpty(char),
    #[error("{0}: position out of range")]
    OutOfRange(Position),
    #[error("Unable to allocate memory")]
    Allocation,
    #[error("Interrupted")]
    Interrupted,
    /// Put stopped after writing `lines` lines; they are not rolled back.
    #[error("put stopped after {lines} lines: {source}")]
    PartialPut {
        lines: usize,
        #[source]
        source: Box<EditError>,
    },
}

fn empty_buffer_message(name: char) -> String {
    if name == crate::DEFAULT_BUFFER {
        "The default buffer is empty".to_string()
    } else {
        format!("Buffer {name} is empty")
    }
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::Text(e) => e.kind(),
            EditError::MarkNotSet(_) | EditError::BufferEmpty(_) | EditError::InvalidBuffer(_) => {
                ErrorKind::NotFound
            }
            EditError::MarkDeleted(_) => ErrorKind::NotFound,
            EditError::MarkPositionGone(_) | EditError::OutOfRange(_) => ErrorKind::OutOfRange,
            EditError::Allocation => ErrorKind::Allocation,
            EditError::Interrupted => ErrorKind::Interrupted,
            EditError::PartialPut { source, .. } => source.kind(),
        }
    }
}

impl From<std::collections::TryReserveError> for EditError {
    fn from(_: std::collections::TryReserveError) -> Self {
        EditError::Allocation
    }
}
