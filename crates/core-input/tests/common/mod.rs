#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_config::Options;
use core_events::InputEvent;
use core_input::{Abbreviations, InputEnv, InputStatus, TextInput, TxtFlags, TxtSetup};
use core_state::{EditFile, Status};
use core_text::Position;

pub const INSERT: TxtFlags = TxtFlags::ESCAPE.union(TxtFlags::RESOLVE);

pub fn pos(lno: usize, cno: usize) -> Position {
    Position::new(lno, cno)
}

/// A file plus everything text input reads besides it.
pub struct Session {
    pub file: EditFile,
    pub opts: Options,
    pub abbrevs: Abbreviations,
    pub status: Status,
}

impl Session {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            file: EditFile::from_lines("test", lines),
            opts: Options::default(),
            abbrevs: Abbreviations::new(),
            status: Status::new(),
        }
    }

    pub fn env(&mut self) -> InputEnv<'_> {
        InputEnv {
            file: &mut self.file,
            options: &self.opts,
            abbrevs: &self.abbrevs,
            status: &mut self.status,
        }
    }

    pub fn start(&mut self, setup: TxtSetup<'_>) -> TextInput {
        TextInput::setup(&mut self.env(), setup).expect("setup")
    }

    /// Feed every character of `keys`; returns the last status.
    pub fn feed(&mut self, ti: &mut TextInput, keys: &str) -> InputStatus {
        let mut last = InputStatus::Continue;
        for ev in InputEvent::from_str_chars(keys) {
            last = ti.event(&mut self.env(), ev).expect("event");
        }
        last
    }

    pub fn lines(&mut self) -> Vec<String> {
        self.file.contents().expect("contents")
    }

    /// Start an insert at `cursor` on the current text of that line.
    pub fn insert_at(&mut self, flags: TxtFlags, cursor: Position) -> TextInput {
        let line = self
            .file
            .fetch_line(cursor.lno)
            .expect("fetch")
            .map(str::to_owned);
        let mut setup = TxtSetup::new(flags, cursor);
        setup.line = line.as_deref();
        self.start(setup)
    }
}
