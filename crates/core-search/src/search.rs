use crate::pattern::{self, Dialect, Parsed};
use crate::{Direction, SearchError, SearchFlags, SearchHit};
use core_config::Options;
use core_state::{MsgKind, Status};
use core_text::column::{last_column, next_boundary};
use core_text::{LineStore, Position};
use regex::{Regex, RegexBuilder};
use tracing::{debug, trace, warn};

/// How the saved pattern text must be translated when recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Vi,
    Tag,
}

#[derive(Debug, Clone)]
struct Saved {
    text: String,
    syntax: Syntax,
}

/// Per-screen search memory.
#[derive(Debug, Default, Clone)]
pub struct SearchState {
    saved: Option<Saved>,
    compiled: Option<Regex>,
    replacement: Option<String>,
    recompile: bool,
    direction: Option<Direction>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A previous pattern exists for `n`/`N` and empty patterns.
    pub fn have_search(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn pattern(&self) -> Option<&str> {
        self.saved.as_ref().map(|s| s.text.as_str())
    }

    /// Record the replacement of the last substitution; `~` expands to it.
    pub fn set_replacement(&mut self, text: impl Into<String>) {
        self.replacement = Some(text.into());
        self.recompile = true;
    }

    /// An option affecting compilation (`magic`, `extended`, `ignorecase`)
    /// changed; the saved pattern is recompiled before its next use.
    pub fn options_changed(&mut self) {
        self.recompile = true;
    }

    pub fn needs_recompile(&self) -> bool {
        self.recompile
    }

    /// Search memory for a screen split off this one: the pattern and
    /// replacement carry over, a remembered direction restarts as forward.
    pub fn inherit(&self) -> Self {
        Self {
            direction: self.direction.map(|_| Direction::Forward),
            ..self.clone()
        }
    }

    fn compile(&self, text: &str, syntax: Syntax, opts: &Options) -> Result<Regex, SearchError> {
        let (dialect, icase) = match syntax {
            Syntax::Vi => (
                Dialect {
                    extended: opts.extended,
                    magic: opts.magic,
                    tilde: Some(self.replacement.as_deref().unwrap_or("")),
                },
                opts.ignorecase,
            ),
            Syntax::Tag => (
                Dialect {
                    extended: false,
                    magic: true,
                    tilde: None,
                },
                false,
            ),
        };
        let translated = pattern::translate(text, &dialect)?;
        let re = RegexBuilder::new(&translated)
            .case_insensitive(icase)
            .build()
            .map_err(|e| SearchError::Pattern(e.to_string()))?;
        trace!(target: "search", pattern = text, regex = %translated, "compiled");
        Ok(re)
    }

    fn previous(&mut self, opts: &Options) -> Result<Regex, SearchError> {
        let Some(saved) = self.saved.clone() else {
            return Err(SearchError::NoPrevious);
        };
        if self.recompile || self.compiled.is_none() {
            let re = self.compile(&saved.text, saved.syntax, opts)?;
            self.compiled = Some(re);
            self.recompile = false;
        }
        self.compiled.clone().ok_or(SearchError::NoPrevious)
    }

    /// Resolve the pattern argument to a compiled expression and the text
    /// following it. A failed compile leaves the saved state untouched.
    fn setup(
        &mut self,
        input: Option<&str>,
        dir: Direction,
        flags: SearchFlags,
        opts: &Options,
    ) -> Result<(Regex, String), SearchError> {
        let (text, syntax, rest) = if flags.contains(SearchFlags::TAG) {
            match input {
                Some(tag) => (Some(pattern::tag_pattern(tag)), Syntax::Tag, String::new()),
                None => (None, Syntax::Tag, String::new()),
            }
        } else if flags.contains(SearchFlags::PARSE) {
            match pattern::parse_delimited(input) {
                Parsed::Reuse { rest } => (None, Syntax::Vi, rest),
                Parsed::New { pattern, rest } => (Some(pattern), Syntax::Vi, rest),
            }
        } else {
            (
                input.filter(|p| !p.is_empty()).map(str::to_owned),
                Syntax::Vi,
                String::new(),
            )
        };

        let re = match text {
            None => self.previous(opts)?,
            Some(text) => {
                let cached = self
                    .saved
                    .as_ref()
                    .filter(|saved| !self.recompile && saved.text == text && saved.syntax == syntax)
                    .and(self.compiled.clone());
                let re = match cached {
                    Some(re) => re,
                    None => self.compile(&text, syntax, opts)?,
                };
                if flags.contains(SearchFlags::SET) {
                    self.saved = Some(Saved { text, syntax });
                    self.compiled = Some(re.clone());
                    self.recompile = false;
                }
                re
            }
        };
        if flags.contains(SearchFlags::SET) {
            self.direction = Some(dir);
        }
        Ok((re, rest))
    }

    /// Search forward from `from`.
    pub fn f_search(
        &mut self,
        store: &mut LineStore,
        from: Position,
        input: Option<&str>,
        flags: SearchFlags,
        opts: &Options,
        status: &mut Status,
    ) -> Result<SearchHit, SearchError> {
        let res = self.forward(store, from, input, flags, opts, status);
        finish(res, flags, opts, status)
    }

    /// Search backward from `from`.
    pub fn b_search(
        &mut self,
        store: &mut LineStore,
        from: Position,
        input: Option<&str>,
        flags: SearchFlags,
        opts: &Options,
        status: &mut Status,
    ) -> Result<SearchHit, SearchError> {
        let res = self.backward(store, from, input, flags, opts, status);
        finish(res, flags, opts, status)
    }

    fn forward(
        &mut self,
        store: &mut LineStore,
        from: Position,
        input: Option<&str>,
        flags: SearchFlags,
        opts: &Options,
        status: &Status,
    ) -> Result<SearchHit, SearchError> {
        let last = store.last_line()?;
        if last == 0 {
            return Err(SearchError::EmptyFile);
        }
        let (re, rest) = self.setup(input, Direction::Forward, flags, opts)?;

        let (mut lno, mut coff, mut wrapped) = if flags.contains(SearchFlags::FILE) {
            (1, 0, false)
        } else {
            let line = store.get_line(from.lno)?;
            let next = next_boundary(line, from.cno);
            if next >= line.len() {
                if from.lno == last {
                    if !opts.wrapscan {
                        return Err(SearchError::Eof);
                    }
                    (1, 0, true)
                } else {
                    (from.lno + 1, 0, false)
                }
            } else {
                (from.lno, next, false)
            }
        };

        loop {
            if status.interrupted() {
                return Err(SearchError::Interrupted);
            }
            if wrapped && lno > from.lno {
                return Err(SearchError::NotFound);
            }
            let Some(line) = store.fetch_line(lno)? else {
                if wrapped {
                    return Err(SearchError::NotFound);
                }
                if !opts.wrapscan {
                    return Err(SearchError::Eof);
                }
                (lno, coff, wrapped) = (1, 0, true);
                continue;
            };
            if !line.is_empty() && coff >= line.len() {
                (lno, coff) = (lno + 1, 0);
                continue;
            }
            if let Some(m) = re.find_at(line, coff) {
                let mut cno = m.start();
                if !flags.contains(SearchFlags::EOL) && cno >= line.len() {
                    cno = last_column(line);
                }
                return Ok(SearchHit {
                    pos: Position::new(lno, cno),
                    wrapped,
                    rest,
                });
            }
            (lno, coff) = (lno + 1, 0);
        }
    }

    fn backward(
        &mut self,
        store: &mut LineStore,
        from: Position,
        input: Option<&str>,
        flags: SearchFlags,
        opts: &Options,
        status: &Status,
    ) -> Result<SearchHit, SearchError> {
        let last = store.last_line()?;
        if last == 0 {
            return Err(SearchError::EmptyFile);
        }
        let (re, rest) = self.setup(input, Direction::Backward, flags, opts)?;

        let (mut lno, mut wrapped) = if from.cno == 0 {
            if from.lno <= 1 {
                if !opts.wrapscan {
                    return Err(SearchError::Sof);
                }
                (last, true)
            } else {
                (from.lno - 1, false)
            }
        } else {
            (from.lno, false)
        };
        // Matches on the first line scanned must start before this column.
        let mut coff = if wrapped { 0 } else { from.cno };

        loop {
            if status.interrupted() {
                return Err(SearchError::Interrupted);
            }
            if (wrapped && lno < from.lno) || lno == 0 {
                if wrapped {
                    return Err(SearchError::NotFound);
                }
                if !opts.wrapscan {
                    return Err(SearchError::Sof);
                }
                (lno, coff, wrapped) = (last, 0, true);
                continue;
            }
            let line = store.get_line(lno)?;
            let first = re
                .find_at(line, 0)
                .map(|m| m.start())
                .filter(|&start| coff == 0 || start < coff);
            let Some(mut start) = first else {
                (lno, coff) = (lno - 1, 0);
                continue;
            };

            loop {
                let next = next_boundary(line, start);
                if next >= line.len() {
                    break;
                }
                match re.find_at(line, next) {
                    Some(m) if coff == 0 || m.start() < coff => start = m.start(),
                    _ => break,
                }
            }

            if !flags.contains(SearchFlags::EOL) && start >= line.len() {
                start = last_column(line);
            }
            return Ok(SearchHit {
                pos: Position::new(lno, start),
                wrapped,
                rest,
            });
        }
    }
}

/// Log the outcome and queue the user-visible message when asked to.
fn finish(
    res: Result<SearchHit, SearchError>,
    flags: SearchFlags,
    opts: &Options,
    status: &mut Status,
) -> Result<SearchHit, SearchError> {
    let msg = flags.contains(SearchFlags::MSG);
    match &res {
        Ok(hit) => {
            debug!(target: "search", pos = %hit.pos, wrapped = hit.wrapped, "hit");
            if hit.wrapped && opts.warn && msg {
                status.msg(MsgKind::Info, "Search wrapped");
            }
        }
        Err(e @ SearchError::Pattern(_)) => {
            warn!(target: "search", error = %e, "compile_failed");
            if msg {
                status.msg(MsgKind::Error, e.to_string());
            }
        }
        Err(e @ (SearchError::NoPrevious | SearchError::Text(_))) => {
            debug!(target: "search", error = %e, "failed");
            if msg {
                status.msg(MsgKind::Error, e.to_string());
            }
        }
        Err(SearchError::Interrupted) => {
            debug!(target: "search", "interrupted");
        }
        Err(e) => {
            debug!(target: "search", error = %e, "miss");
            if msg {
                status.msg(MsgKind::Info, e.to_string());
            }
        }
    }
    res
}
