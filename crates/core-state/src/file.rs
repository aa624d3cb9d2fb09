//! An open file: line store, mark table and mutation log kept in step.
//!
//! Every structural mutation goes through [`EditFile`], which performs the
//! store operation, then adjusts the marks, then records a [`Mutation`]. The
//! recovery journal and undo are consumers of that log; they walk it with
//! [`EditFile::for_each_mutation`] or take it with
//! [`EditFile::take_mutations`].
//!
//! Several screens may show the same file. They share it through
//! [`SharedFile`]; the command loop serializes access so a `RefCell` borrow
//! is never contended.

use crate::EditError;
use crate::marks::{Mark, MarkTable};
use core_text::{LineNo, LineOp, LineStore, Position};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, trace};

/// One logged change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Line `lno` was created by appending after `lno - 1`.
    LineAppend { lno: LineNo, text: String },
    /// Line `lno` was created by inserting before the old line `lno`.
    LineInsert { lno: LineNo, text: String },
    LineReset {
        lno: LineNo,
        old: String,
        new: String,
    },
    LineDelete { lno: LineNo, text: String },
    /// A mark was flagged deleted along with its line.
    MarkDeleted { key: char, pos: Position },
}

pub type SharedFile = Rc<RefCell<EditFile>>;

#[derive(Debug)]
pub struct EditFile {
    pub name: String,
    store: LineStore,
    marks: MarkTable,
    log: Vec<Mutation>,
    logging: bool,
    modified: bool,
}

impl EditFile {
    pub fn new(name: impl Into<String>, store: LineStore) -> Self {
        Self {
            name: name.into(),
            store,
            marks: MarkTable::new(),
            log: Vec::new(),
            logging: true,
            modified: false,
        }
    }

    pub fn from_lines<S: AsRef<str>>(name: impl Into<String>, lines: &[S]) -> Self {
        Self::new(name, LineStore::from_lines(lines))
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let store = LineStore::open(path)?;
        let name = path.display().to_string();
        Ok(Self::new(name, store))
    }

    pub fn write(&mut self, path: &Path) -> anyhow::Result<()> {
        self.store.write_to(path)?;
        self.modified = false;
        Ok(())
    }

    pub fn into_shared(self) -> SharedFile {
        Rc::new(RefCell::new(self))
    }

    pub fn marks(&self) -> &MarkTable {
        &self.marks
    }

    pub fn marks_mut(&mut self) -> &mut MarkTable {
        &mut self.marks
    }

    /// Resolve a mark against the current file contents.
    pub fn mark_get(&mut self, key: char) -> Result<Position, EditError> {
        self.marks.get(key, &mut self.store)
    }

    pub fn mark_set(&mut self, key: char, pos: Position, user_set: bool) -> bool {
        self.marks.set(key, pos, user_set)
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Turn mutation logging on or off (off while replaying a log).
    pub fn set_logging(&mut self, on: bool) {
        self.logging = on;
    }

    pub fn for_each_mutation<F: FnMut(&Mutation)>(&self, f: F) {
        self.log.iter().for_each(f);
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    // Read side: thin forwards to the store.

    pub fn get_line(&mut self, lno: LineNo) -> Result<&str, EditError> {
        Ok(self.store.get_line(lno)?)
    }

    pub fn fetch_line(&mut self, lno: LineNo) -> Result<Option<&str>, EditError> {
        Ok(self.store.fetch_line(lno)?)
    }

    pub fn line_owned(&mut self, lno: LineNo) -> Result<String, EditError> {
        Ok(self.store.line_owned(lno)?)
    }

    pub fn line_len(&mut self, lno: LineNo) -> Result<usize, EditError> {
        Ok(self.store.line_len(lno)?)
    }

    pub fn line_exists(&mut self, lno: LineNo) -> Result<bool, EditError> {
        Ok(self.store.line_exists(lno)?)
    }

    pub fn last_line(&mut self) -> Result<LineNo, EditError> {
        Ok(self.store.last_line()?)
    }

    pub fn contents(&mut self) -> Result<Vec<String>, EditError> {
        Ok(self.store.contents()?)
    }

    /// Direct store access for read-only scanners that need the store type.
    pub fn store_mut(&mut self) -> &mut LineStore {
        &mut self.store
    }

    // Write side: store, then marks, then log.

    /// Insert `text` after line `lno` (0 inserts before line 1).
    pub fn append_line(&mut self, lno: LineNo, text: &str) -> Result<(), EditError> {
        self.store.append_line(lno, text)?;
        self.marks.line_op(LineOp::Insert, lno + 1);
        self.record(Mutation::LineAppend {
            lno: lno + 1,
            text: text.to_owned(),
        });
        Ok(())
    }

    /// Insert `text` before line `lno`.
    pub fn insert_line(&mut self, lno: LineNo, text: &str) -> Result<(), EditError> {
        self.store.insert_line(lno, text)?;
        self.marks.line_op(LineOp::Insert, lno);
        self.record(Mutation::LineInsert {
            lno,
            text: text.to_owned(),
        });
        Ok(())
    }

    pub fn set_line(&mut self, lno: LineNo, text: &str) -> Result<(), EditError> {
        let old = if self.logging {
            self.store.line_owned(lno)?
        } else {
            String::new()
        };
        self.store.set_line(lno, text)?;
        self.marks.line_op(LineOp::Reset, lno);
        self.record(Mutation::LineReset {
            lno,
            old,
            new: text.to_owned(),
        });
        Ok(())
    }

    pub fn delete_line(&mut self, lno: LineNo) -> Result<(), EditError> {
        let text = if self.logging {
            self.store.line_owned(lno)?
        } else {
            String::new()
        };
        self.store.delete_line(lno)?;
        let deleted: Vec<Mark> = self.marks.line_op(LineOp::Delete, lno);
        self.record(Mutation::LineDelete { lno, text });
        for m in deleted {
            self.record(Mutation::MarkDeleted {
                key: m.key,
                pos: m.pos,
            });
        }
        Ok(())
    }

    fn record(&mut self, m: Mutation) {
        self.modified = true;
        if !self.logging {
            return;
        }
        trace!(target: "state.log", ?m, "mutation");
        self.log.push(m);
    }
}

impl Drop for EditFile {
    fn drop(&mut self) {
        debug!(target: "state.file", name = %self.name, logged = self.log.len(), "file_closed");
    }
}
