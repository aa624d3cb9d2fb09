//! Record-oriented storage seam behind the line store.
//!
//! The store never talks to storage directly; it goes through [`LineBackend`]
//! so a journaling or on-disk engine can replace the default rope. Backends
//! address lines by 1-based number and know nothing about caching or marks.
//!
//! Invariants for implementors:
//! - `count()` equals the number of lines `fetch` can return.
//! - `fetch(n)` for `n == 0` or `n > count()` is `Ok(None)` and has no side effect.
//! - `insert(n, ..)` accepts `1..=count() + 1` and shifts later lines down.

use crate::{BackendError, LineNo};
use ropey::Rope;
use std::io;

pub trait LineBackend {
    /// Fetch line `lno` without its terminator.
    fn fetch(&self, lno: LineNo) -> Result<Option<String>, BackendError>;
    /// Insert `text` so that it becomes line `lno`.
    fn insert(&mut self, lno: LineNo, text: &str) -> Result<(), BackendError>;
    /// Replace the contents of line `lno`.
    fn store(&mut self, lno: LineNo, text: &str) -> Result<(), BackendError>;
    /// Remove line `lno`.
    fn remove(&mut self, lno: LineNo) -> Result<(), BackendError>;
    /// Number of stored lines.
    fn count(&self) -> Result<LineNo, BackendError>;
}

/// Default backend: one rope, every line terminated by `\n`.
///
/// ropey is built with only LF line breaks so carriage returns and form feeds
/// stay ordinary line content.
#[derive(Debug, Clone, Default)]
pub struct RopeBackend {
    rope: Rope,
}

impl RopeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from file text. A missing final newline is supplied.
    pub fn from_text(text: &str) -> Self {
        let mut rope = Rope::from_str(text);
        if !text.is_empty() && !text.ends_with('\n') {
            rope.insert_char(rope.len_chars(), '\n');
        }
        Self { rope }
    }

    pub fn from_reader<R: io::Read>(reader: R) -> io::Result<Self> {
        let mut rope = Rope::from_reader(reader)?;
        let len = rope.len_chars();
        if len > 0 && rope.char(len - 1) != '\n' {
            rope.insert_char(len, '\n');
        }
        Ok(Self { rope })
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> io::Result<()> {
        self.rope.write_to(writer)
    }

    fn lines(&self) -> LineNo {
        self.rope.len_lines() - 1
    }

    fn line_start(&self, lno: LineNo) -> Result<usize, BackendError> {
        self.rope
            .try_line_to_char(lno - 1)
            .map_err(|e| BackendError::Storage(e.to_string()))
    }

    fn check_exists(&self, lno: LineNo) -> Result<(), BackendError> {
        if lno == 0 || lno > self.lines() {
            return Err(BackendError::Storage(format!("no such record {lno}")));
        }
        Ok(())
    }
}

fn reject_newline(text: &str) -> Result<(), BackendError> {
    if text.contains('\n') {
        return Err(BackendError::Storage("embedded line terminator".into()));
    }
    Ok(())
}

impl LineBackend for RopeBackend {
    fn fetch(&self, lno: LineNo) -> Result<Option<String>, BackendError> {
        if lno == 0 || lno > self.lines() {
            return Ok(None);
        }
        let mut s = self.rope.line(lno - 1).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        Ok(Some(s))
    }

    fn insert(&mut self, lno: LineNo, text: &str) -> Result<(), BackendError> {
        reject_newline(text)?;
        if lno == 0 || lno > self.lines() + 1 {
            return Err(BackendError::Storage(format!("no such record {lno}")));
        }
        let at = self.line_start(lno)?;
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.rope.insert(at, &line);
        Ok(())
    }

    fn store(&mut self, lno: LineNo, text: &str) -> Result<(), BackendError> {
        reject_newline(text)?;
        self.check_exists(lno)?;
        let start = self.line_start(lno)?;
        // Keep the terminator, replace only the content.
        let end = self.line_start(lno + 1)? - 1;
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        Ok(())
    }

    fn remove(&mut self, lno: LineNo) -> Result<(), BackendError> {
        self.check_exists(lno)?;
        let start = self.line_start(lno)?;
        let end = self.line_start(lno + 1)?;
        self.rope.remove(start..end);
        Ok(())
    }

    fn count(&self) -> Result<LineNo, BackendError> {
        Ok(self.lines())
    }
}
