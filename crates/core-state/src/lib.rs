//! Editing state layered over the line store: marks, cut buffers and the
//! per-file mutation log.
//!
//! Layering:
//! - [`file::EditFile`] owns a `LineStore` plus its [`marks::MarkTable`] and
//!   keeps them consistent on every structural edit.
//! - [`registers::Registers`] is editor-wide; `cut` reads an `EditFile`,
//!   `put` writes one. Neither holds a reference between calls.
//! - [`status::Status`] collects what an operation reports besides its
//!   result (messages, the `put`/`yank` report, the interrupt flag, redraw).
//!
//! All fallible operations return [`EditError`], whose `kind()` folds into
//! the engine-wide `core_text::ErrorKind`.

mod error;
pub mod file;
pub mod marks;
pub mod registers;
pub mod status;

pub use error::EditError;
pub use file::{EditFile, Mutation, SharedFile};
pub use marks::{ABSMARK1, ABSMARK2, Mark, MarkFlags, MarkTable};
pub use registers::{CutBuffer, CutFlags, DEFAULT_BUFFER, PutOutcome, Registers};
pub use status::{InterruptFlag, Message, MessageQueue, MsgKind, Report, Status};
