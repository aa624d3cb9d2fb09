//! Text input: turning a stream of input characters into lines of a file.
//!
//! A [`TextInput`] is created by [`TextInput::setup`] when a command enters
//! input mode and is fed one [`InputEvent`] at a time through
//! [`TextInput::event`]. Entered lines accumulate in a chain of pending
//! [`TextLine`]s; nothing reaches the file until input ends, when (with
//! [`TxtFlags::RESOLVE`]) the first line replaces the line being edited and
//! the rest are appended after it.
//!
//! Everything the assembler needs from its surroundings arrives in an
//! [`InputEnv`]: the file, the options, the abbreviation table and the
//! screen status that collects messages.

mod assembler;
pub mod line;

pub use assembler::TextInput;
pub use line::TextLine;

use bitflags::bitflags;
use core_config::{Options, WordErase};
use core_events::{InputChar, KeyBindings};
use core_state::{EditError, EditFile, Status};
use core_text::{ErrorKind, LineNo, Position};
use std::collections::HashMap;
use thiserror::Error;

/// Abbreviation expansion stops after this many consecutive expanded
/// characters.
pub const MAX_ABBREVIATION_EXPANSION: usize = 256;

bitflags! {
    /// Behaviour of one text input session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxtFlags: u32 {
        /// Leading blanks before the cursor count as autoindent (`cc`, `S`).
        const AICHARS = 1 << 0;
        const AUTOINDENT = 1 << 1;
        /// Reject unquoted control characters other than tab and form feed.
        const BEAUTIFY = 1 << 2;
        /// Erasing past the start ends input.
        const BS = 1 << 3;
        /// `^T` indents.
        const CNTRLT = 1 << 4;
        /// Carriage return ends input instead of breaking the line.
        const CR = 1 << 5;
        /// Mark the end of the changed text with `$`.
        const EMARK = 1 << 6;
        /// Escape ends input.
        const ESCAPE = 1 << 7;
        /// Input overwrites up to the end mark before inserting.
        const OVERWRITE = 1 << 8;
        /// The line starts with a prompt character.
        const PROMPT = 1 << 9;
        /// Keep the input for repeating it later.
        const RECORD = 1 << 10;
        /// Replace mode (`R`).
        const REPLACE = 1 << 11;
        /// Replay previously recorded input.
        const REPLAY = 1 << 12;
        /// Write the entered lines into the file when input ends.
        const RESOLVE = 1 << 13;
        const WRAPMARGIN = 1 << 14;
        /// Each repetition of a counted command starts a new line (`o`, `O`).
        const ADDNEWLINE = 1 << 15;
        const ALTWERASE = 1 << 16;
        const TTYWERASE = 1 << 17;
    }
}

impl TxtFlags {
    /// Flags implied by the current option values.
    pub fn from_options(opts: &Options) -> Self {
        let mut f = TxtFlags::empty();
        f.set(TxtFlags::AUTOINDENT, opts.autoindent);
        f.set(TxtFlags::BEAUTIFY, opts.beautify);
        f.set(TxtFlags::WRAPMARGIN, opts.margin() != 0);
        match opts.werase {
            WordErase::Historic => {}
            WordErase::Alt => f |= TxtFlags::ALTWERASE,
            WordErase::Tty => f |= TxtFlags::TTYWERASE,
        }
        f
    }
}

/// How input ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Term {
    #[default]
    Ok,
    /// Escape with nothing entered.
    Esc,
    /// Carriage return on an empty prompt line.
    Cr,
    /// Erased back over the prompt.
    Bs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Continue,
    Done { cursor: Position, term: Term },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input buffer allocation failed")]
    Allocation,
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl InputError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InputError::Allocation => ErrorKind::Allocation,
            InputError::Edit(e) => e.kind(),
        }
    }
}

/// Abbreviations consulted when a word ends.
pub trait AbbrevTable {
    fn expand(&self, word: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct Abbreviations {
    map: HashMap<String, String>,
}

impl Abbreviations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: impl Into<String>, expansion: impl Into<String>) {
        self.map.insert(word.into(), expansion.into());
    }

    pub fn remove(&mut self, word: &str) -> bool {
        self.map.remove(word).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl AbbrevTable for Abbreviations {
    fn expand(&self, word: &str) -> Option<&str> {
        self.map.get(word).map(String::as_str)
    }
}

/// What the assembler reads and writes besides its own state.
pub struct InputEnv<'a> {
    pub file: &'a mut EditFile,
    pub options: &'a Options,
    pub abbrevs: &'a dyn AbbrevTable,
    pub status: &'a mut Status,
}

/// Parameters of [`TextInput::setup`].
#[derive(Debug, Clone)]
pub struct TxtSetup<'a> {
    pub flags: TxtFlags,
    /// Where input starts; `cno` is a byte offset into `line`.
    pub cursor: Position,
    /// Last character of the text being changed (overwrite and end mark).
    pub to: Position,
    /// Current contents of the line being edited, if any.
    pub line: Option<&'a str>,
    pub prompt: Option<char>,
    /// Line whose indentation seeds autoindent.
    pub ai_line: Option<LineNo>,
    /// Repeat count of the command; input is replayed until it is reached.
    pub count: Option<usize>,
    pub keys: KeyBindings,
    /// Input recorded by an earlier session, for `REPLAY` or a leading NUL.
    pub previous: Vec<InputChar>,
}

impl<'a> TxtSetup<'a> {
    pub fn new(flags: TxtFlags, cursor: Position) -> Self {
        Self {
            flags,
            cursor,
            to: cursor,
            line: None,
            prompt: None,
            ai_line: None,
            count: None,
            keys: KeyBindings::default(),
            previous: Vec::new(),
        }
    }

    pub fn line(mut self, line: &'a str) -> Self {
        self.line = Some(line);
        self
    }
}
