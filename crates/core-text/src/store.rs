//! Line store: 1-based random access to the lines of one file.
//!
//! Invariants:
//! - Lines are numbered `1..=last_line()` with no gaps.
//! - The cached line count, once computed, always matches the backend.
//! - A failed lookup leaves both caches untouched, so scanning past the end
//!   of the file (wrapscan, put at EOF) is idempotent.
//! - The reference returned by [`LineStore::get_line`] lives until the next
//!   `&mut self` call; the borrow checker enforces the historic rule that a
//!   fetched line is invalidated by the next store operation.

use crate::{BackendError, LineBackend, LineNo, RopeBackend, StoreOp, TextError};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, trace};

pub struct LineStore {
    backend: Box<dyn LineBackend>,
    /// Most recently fetched line.
    cache: Option<(LineNo, String)>,
    /// Cached line count; `None` until first asked for.
    nlines: Option<LineNo>,
}

impl std::fmt::Debug for LineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStore")
            .field("cached_line", &self.cache.as_ref().map(|(n, _)| *n))
            .field("nlines", &self.nlines)
            .finish_non_exhaustive()
    }
}

impl Default for LineStore {
    fn default() -> Self {
        Self::with_backend(Box::new(RopeBackend::new()))
    }
}

fn io_err(op: StoreOp, lno: LineNo) -> impl FnOnce(BackendError) -> TextError {
    move |source| TextError::Io { op, lno, source }
}

impl LineStore {
    pub fn with_backend(backend: Box<dyn LineBackend>) -> Self {
        Self {
            backend,
            cache: None,
            nlines: None,
        }
    }

    /// Build a store over in-memory file text.
    pub fn from_text(text: &str) -> Self {
        Self::with_backend(Box::new(RopeBackend::from_text(text)))
    }

    /// Build a store from a slice of lines (no terminators).
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        Self::from_text(&text)
    }

    /// Read a file from disk into the default backend.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let backend = RopeBackend::from_reader(BufReader::new(file))
            .with_context(|| format!("read {}", path.display()))?;
        debug!(target: "text.store", file = %path.display(), "store_open");
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Write every line, newline terminated, to `path`.
    pub fn write_to(&mut self, path: &Path) -> Result<()> {
        use std::io::Write;
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(file);
        let last = self.last_line()?;
        for lno in 1..=last {
            let line = self.get_line(lno)?;
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        debug!(target: "text.store", file = %path.display(), lines = last, "store_write");
        Ok(())
    }

    /// Fetch line `lno`; a missing line is `NotFound`.
    pub fn get_line(&mut self, lno: LineNo) -> Result<&str, TextError> {
        match self.fetch_line(lno)? {
            Some(_) => {}
            None => return Err(TextError::NotFound { lno }),
        }
        match &self.cache {
            Some((_, text)) => Ok(text.as_str()),
            None => Err(TextError::NotFound { lno }),
        }
    }

    /// Fetch line `lno`, reporting a missing line as `None` instead of an error.
    pub fn fetch_line(&mut self, lno: LineNo) -> Result<Option<&str>, TextError> {
        let hit = matches!(&self.cache, Some((n, _)) if *n == lno);
        if !hit {
            if lno == 0 {
                return Ok(None);
            }
            if let Some(n) = self.nlines
                && lno > n
            {
                return Ok(None);
            }
            match self.backend.fetch(lno).map_err(io_err(StoreOp::Get, lno))? {
                Some(text) => self.cache = Some((lno, text)),
                None => return Ok(None),
            }
        }
        Ok(self.cache.as_ref().map(|(_, text)| text.as_str()))
    }

    /// Owned copy of line `lno`.
    pub fn line_owned(&mut self, lno: LineNo) -> Result<String, TextError> {
        self.get_line(lno).map(str::to_owned)
    }

    /// Byte length of line `lno`.
    pub fn line_len(&mut self, lno: LineNo) -> Result<usize, TextError> {
        self.get_line(lno).map(str::len)
    }

    pub fn line_exists(&mut self, lno: LineNo) -> Result<bool, TextError> {
        Ok(lno >= 1 && lno <= self.last_line()?)
    }

    /// Number of lines; 0 for an empty file.
    pub fn last_line(&mut self) -> Result<LineNo, TextError> {
        if let Some(n) = self.nlines {
            return Ok(n);
        }
        let n = self.backend.count().map_err(io_err(StoreOp::Count, 0))?;
        self.nlines = Some(n);
        Ok(n)
    }

    /// Insert `text` after line `lno`; `lno == 0` inserts before line 1.
    pub fn append_line(&mut self, lno: LineNo, text: &str) -> Result<(), TextError> {
        let last = self.last_line()?;
        if lno > last {
            return Err(TextError::OutOfRange { lno });
        }
        self.backend
            .insert(lno + 1, text)
            .map_err(io_err(StoreOp::Append, lno))?;
        self.shifted(lno + 1, 1);
        trace!(target: "text.store", lno, len = text.len(), "line_append");
        Ok(())
    }

    /// Insert `text` before line `lno`.
    pub fn insert_line(&mut self, lno: LineNo, text: &str) -> Result<(), TextError> {
        let last = self.last_line()?;
        if lno == 0 || lno > last + 1 {
            return Err(TextError::OutOfRange { lno });
        }
        self.backend
            .insert(lno, text)
            .map_err(io_err(StoreOp::Insert, lno))?;
        self.shifted(lno, 1);
        trace!(target: "text.store", lno, len = text.len(), "line_insert");
        Ok(())
    }

    /// Replace the contents of line `lno`.
    pub fn set_line(&mut self, lno: LineNo, text: &str) -> Result<(), TextError> {
        if !self.line_exists(lno)? {
            return Err(TextError::NotFound { lno });
        }
        if let Err(source) = self.backend.store(lno, text) {
            self.cache = None;
            return Err(TextError::Io {
                op: StoreOp::Set,
                lno,
                source,
            });
        }
        if let Some((n, cached)) = &mut self.cache
            && *n == lno
        {
            cached.clear();
            cached.push_str(text);
        }
        trace!(target: "text.store", lno, len = text.len(), "line_set");
        Ok(())
    }

    /// Remove line `lno`.
    pub fn delete_line(&mut self, lno: LineNo) -> Result<(), TextError> {
        if !self.line_exists(lno)? {
            return Err(TextError::NotFound { lno });
        }
        if let Err(source) = self.backend.remove(lno) {
            self.cache = None;
            self.nlines = None;
            return Err(TextError::Io {
                op: StoreOp::Delete,
                lno,
                source,
            });
        }
        self.shifted(lno, -1);
        trace!(target: "text.store", lno, "line_delete");
        Ok(())
    }

    /// Copy of every line, for callers that need a snapshot.
    pub fn contents(&mut self) -> Result<Vec<String>, TextError> {
        let last = self.last_line()?;
        (1..=last).map(|lno| self.line_owned(lno)).collect()
    }

    /// Maintain the caches after a structural change at `lno`.
    fn shifted(&mut self, lno: LineNo, delta: isize) {
        if let Some(n) = self.nlines.as_mut() {
            *n = n.saturating_add_signed(delta);
        }
        if matches!(&self.cache, Some((n, _)) if *n >= lno) {
            self.cache = None;
        }
    }
}
