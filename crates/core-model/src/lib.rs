//! The editing session: screens over shared files plus editor-wide state.
//!
//! An [`Editor`] owns what every screen sees the same way (cut buffers,
//! options, abbreviations, key bindings) and the list of [`Screen`]s. A
//! screen owns what is local to one view: cursor, search memory, pending
//! input and status. Screens opened with [`Editor::split`] share their file
//! through a `SharedFile`, so an edit made in one is visible in the other,
//! marks included.
//!
//! Invariants (hold after every public call):
//! * screens are never removed, so `ScreenId(i)` indexes `screens`;
//! * a screen has at most one pending input (text or search prompt);
//!   starting another abandons the first;
//! * no `SharedFile` borrow outlives the call that took it.

mod screen;

pub use screen::Screen;

use core_config::Options;
use core_events::{InputEvent, KeyBindings};
use core_input::{
    AbbrevTable, Abbreviations, InputEnv, InputError, InputStatus, Term, TextInput, TxtFlags,
    TxtSetup,
};
use core_search::{
    Direction, MotionRange, Operator, SearchError, SearchFlags, apply_delta, correct_backward,
    correct_forward, escape_vi, parse_delta,
};
use core_state::{
    ABSMARK1, CutFlags, EditError, EditFile, MsgKind, PutOutcome, Registers, Status,
};
use core_text::column::{last_column, next_boundary};
use core_text::{ErrorKind, LineNo, Position};
use screen::Pending;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Stable identifier for a [`Screen`].
pub struct ScreenId(pub usize);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No screen {0}")]
    NoScreen(ScreenId),
    #[error("No text input in progress")]
    NoInput,
    #[error("No previous input to repeat")]
    NothingToRepeat,
    #[error("Cursor not in a word")]
    NoWord,
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Input(#[from] InputError),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::NoScreen(_)
            | ModelError::NoInput
            | ModelError::NothingToRepeat
            | ModelError::NoWord => ErrorKind::NotFound,
            ModelError::Edit(e) => e.kind(),
            ModelError::Search(e) => e.kind(),
            ModelError::Input(e) => e.kind(),
        }
    }
}

/// How a text input command places what it collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    /// Before the cursor (`i`).
    Insert,
    /// After the cursor character (`a`).
    Append,
    /// On a new line below or above the cursor line (`o`, `O`).
    Open { above: bool },
    /// Over the text from the cursor through `to` on the same line (`c`).
    Change { to: Position },
    /// Over the rest of the line, restoring what is erased (`R`).
    Replace,
}

/// Where a search left the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMove {
    pub pos: Position,
    pub wrapped: bool,
    /// A line offset followed the pattern.
    pub line_mode: bool,
}

/// Flags of a search typed at a prompt.
const TYPED: SearchFlags = SearchFlags::MSG
    .union(SearchFlags::PARSE)
    .union(SearchFlags::SET);

#[derive(Debug, Default)]
pub struct Editor {
    registers: Registers,
    options: Options,
    abbrevs: Abbreviations,
    keys: KeyBindings,
    screens: Vec<Screen>,
}

impl Editor {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn abbreviations_mut(&mut self) -> &mut Abbreviations {
        &mut self.abbrevs
    }

    pub fn set_keys(&mut self, keys: KeyBindings) {
        self.keys = keys;
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screen(&self, id: ScreenId) -> Result<&Screen, ModelError> {
        self.screens.get(id.0).ok_or(ModelError::NoScreen(id))
    }

    pub fn screen_mut(&mut self, id: ScreenId) -> Result<&mut Screen, ModelError> {
        screen_in(&mut self.screens, id)
    }

    /// Show `file` in a new screen.
    pub fn open(&mut self, file: EditFile) -> ScreenId {
        let id = ScreenId(self.screens.len());
        debug!(target: "model", screen = %id, file = %file.name, "open");
        self.screens.push(Screen::new(id, file.into_shared()));
        id
    }

    /// A new screen on the file of `id`.
    pub fn split(&mut self, id: ScreenId) -> Result<ScreenId, ModelError> {
        let new = ScreenId(self.screens.len());
        let scr = self.screen(id)?.split(new);
        debug!(target: "model", from = %id, screen = %new, "split");
        self.screens.push(scr);
        Ok(new)
    }

    /// Replace the options. Saved search patterns are recompiled on their
    /// next use, since `magic`, `extended` or `ignorecase` may differ.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
        for scr in &mut self.screens {
            scr.search.options_changed();
        }
        debug!(target: "model", screens = self.screens.len(), "options_changed");
    }

    pub fn cut(
        &mut self,
        id: ScreenId,
        buffer: Option<char>,
        from: Position,
        to: Position,
        flags: CutFlags,
    ) -> Result<(), ModelError> {
        let scr = screen_in(&mut self.screens, id)?;
        let mut file = scr.file.borrow_mut();
        self.registers
            .cut(&mut file, buffer, from, to, flags, &mut scr.status)?;
        Ok(())
    }

    /// Put `buffer` at the cursor and move the cursor as the put directs.
    pub fn put(
        &mut self,
        id: ScreenId,
        buffer: Option<char>,
        append: bool,
    ) -> Result<PutOutcome, ModelError> {
        let scr = screen_in(&mut self.screens, id)?;
        let out = {
            let mut file = scr.file.borrow_mut();
            self.registers
                .put(&mut file, buffer, scr.cursor, append, &mut scr.status)?
        };
        scr.cursor = out.cursor;
        Ok(out)
    }

    pub fn mark_set(
        &mut self,
        id: ScreenId,
        key: char,
        pos: Position,
        user_set: bool,
    ) -> Result<bool, ModelError> {
        let scr = self.screen(id)?;
        Ok(scr.file_mut().mark_set(key, pos, user_set))
    }

    pub fn mark_get(&mut self, id: ScreenId, key: char) -> Result<Position, ModelError> {
        let scr = self.screen(id)?;
        let pos = scr.file_mut().mark_get(key)?;
        Ok(pos)
    }

    /// Search for `input`, a pattern with its leading delimiter and an
    /// optional line offset (`/abc/+1`), and move the cursor to the hit.
    pub fn search(
        &mut self,
        id: ScreenId,
        dir: Direction,
        input: &str,
    ) -> Result<SearchMove, ModelError> {
        let options = &self.options;
        let scr = screen_in(&mut self.screens, id)?;
        search_to(scr, options, dir, Some(input), TYPED)
    }

    /// `n` (same direction) and `N` (`reverse`).
    pub fn search_repeat(&mut self, id: ScreenId, reverse: bool) -> Result<SearchMove, ModelError> {
        let options = &self.options;
        let scr = screen_in(&mut self.screens, id)?;
        let Some(dir) = scr.search.direction() else {
            let e = SearchError::NoPrevious;
            scr.status.msg(MsgKind::Error, e.to_string());
            return Err(e.into());
        };
        let dir = if reverse { dir.reverse() } else { dir };
        search_to(scr, options, dir, None, SearchFlags::MSG)
    }

    /// Search forward for the whole word under the cursor.
    pub fn search_word(&mut self, id: ScreenId) -> Result<SearchMove, ModelError> {
        let options = &self.options;
        let scr = screen_in(&mut self.screens, id)?;
        let word = {
            let mut file = scr.file.borrow_mut();
            word_at(file.get_line(scr.cursor.lno)?, scr.cursor.cno)
        };
        let Some(word) = word else {
            scr.status.msg(MsgKind::Error, ModelError::NoWord.to_string());
            return Err(ModelError::NoWord);
        };
        let pattern = format!("\\<{}\\>", escape_vi(&word));
        search_to(scr, options, Direction::Forward, Some(&pattern), SearchFlags::MSG)
    }

    /// Jump to the line a ctags search command (`/^int main$/`) names.
    pub fn tag_search(&mut self, id: ScreenId, tag: &str) -> Result<SearchMove, ModelError> {
        let options = &self.options;
        let scr = screen_in(&mut self.screens, id)?;
        let flags = SearchFlags::MSG | SearchFlags::TAG | SearchFlags::FILE;
        search_to(scr, options, Direction::Forward, Some(tag), flags)
    }

    /// The range an operator such as `d/pat` acts on. The cursor does not
    /// move; `MotionRange::cursor` says where the command leaves it.
    pub fn search_motion(
        &mut self,
        id: ScreenId,
        op: Operator,
        dir: Direction,
        input: Option<&str>,
    ) -> Result<MotionRange, ModelError> {
        let options = &self.options;
        let scr = screen_in(&mut self.screens, id)?;
        let start = scr.cursor;
        let found = locate(scr, options, dir, input, TYPED | SearchFlags::EOL)?;
        let mut file = scr.file.borrow_mut();
        let store = file.store_mut();
        // A wrapped search can land on the far side of the cursor.
        let range = if found.pos > start {
            correct_forward(store, start, found.pos, found.line_mode)?
        } else {
            correct_backward(store, op, start, found.pos, found.line_mode)?
        };
        debug!(target: "model", screen = %id, ?op, start = %range.start, stop = %range.stop, line_mode = range.line_mode, "search_motion");
        Ok(range)
    }

    /// Start a text input command. `count` repeats the input when it ends.
    pub fn begin_input(
        &mut self,
        id: ScreenId,
        cmd: InputCommand,
        count: Option<usize>,
    ) -> Result<InputStatus, ModelError> {
        self.start_input(id, cmd, count, false)
    }

    /// Run `cmd` again with the input of the last text command (`.`).
    pub fn repeat_input(
        &mut self,
        id: ScreenId,
        cmd: InputCommand,
        count: Option<usize>,
    ) -> Result<InputStatus, ModelError> {
        self.start_input(id, cmd, count, true)
    }

    fn start_input(
        &mut self,
        id: ScreenId,
        cmd: InputCommand,
        count: Option<usize>,
        replay: bool,
    ) -> Result<InputStatus, ModelError> {
        let (options, abbrevs, keys) = (&self.options, &self.abbrevs, self.keys);
        let scr = screen_in(&mut self.screens, id)?;
        if replay && scr.last_input.is_empty() {
            scr.status
                .msg(MsgKind::Error, ModelError::NothingToRepeat.to_string());
            return Err(ModelError::NothingToRepeat);
        }
        abandon(scr);

        let mut flags = TxtFlags::from_options(options)
            | TxtFlags::ESCAPE
            | TxtFlags::RESOLVE
            | TxtFlags::CNTRLT;
        flags |= if replay {
            TxtFlags::REPLAY
        } else {
            TxtFlags::RECORD
        };

        let shared = Rc::clone(&scr.file);
        let (ti, res) = {
            let mut file = shared.borrow_mut();
            let (at, to, ai_line, extra) = place(&mut file, scr.cursor, cmd)?;
            let line = file.fetch_line(at.lno)?.map(str::to_owned);
            let mut setup = TxtSetup::new(flags | extra, at);
            setup.to = to;
            setup.line = line.as_deref();
            setup.ai_line = ai_line;
            setup.count = count;
            setup.keys = keys;
            setup.previous = scr.last_input.clone();
            debug!(target: "model", screen = %id, ?cmd, %at, replay, "input_begin");

            let mut env = InputEnv {
                file: &mut file,
                options,
                abbrevs,
                status: &mut scr.status,
            };
            let mut ti = TextInput::setup(&mut env, setup)?;
            let res = if replay {
                ti.replay(&mut env)
            } else {
                Ok(InputStatus::Continue)
            };
            (ti, res)
        };
        settle(scr, ti, res)
    }

    /// Open a `/` or `?` prompt. When it ends the typed pattern is searched
    /// for; erasing the prompt or escaping an empty one cancels.
    pub fn begin_search_prompt(
        &mut self,
        id: ScreenId,
        dir: Direction,
    ) -> Result<InputStatus, ModelError> {
        let (options, abbrevs, keys) = (&self.options, &self.abbrevs, self.keys);
        let scr = screen_in(&mut self.screens, id)?;
        abandon(scr);

        let flags = TxtFlags::BS | TxtFlags::CR | TxtFlags::ESCAPE | TxtFlags::PROMPT;
        let mut setup = TxtSetup::new(flags, Position::new(scr.cursor.lno, 0));
        setup.prompt = Some(match dir {
            Direction::Forward => '/',
            Direction::Backward => '?',
        });
        setup.keys = keys;
        let input = {
            let shared = Rc::clone(&scr.file);
            let mut file = shared.borrow_mut();
            let mut env = InputEnv {
                file: &mut file,
                options,
                abbrevs,
                status: &mut scr.status,
            };
            TextInput::setup(&mut env, setup)?
        };
        scr.pending = Some(Pending::Search { input, dir });
        Ok(InputStatus::Continue)
    }

    /// Feed one event to the pending input of `id`.
    pub fn input_event(
        &mut self,
        id: ScreenId,
        ev: InputEvent,
    ) -> Result<InputStatus, ModelError> {
        let (options, abbrevs) = (&self.options, &self.abbrevs);
        let scr = screen_in(&mut self.screens, id)?;
        let Some(pending) = scr.pending.take() else {
            return Err(ModelError::NoInput);
        };
        match pending {
            Pending::Text(mut ti) => {
                let res = feed(scr, options, abbrevs, &mut ti, ev);
                settle(scr, ti, res)
            }
            Pending::Search { mut input, dir } => {
                match feed(scr, options, abbrevs, &mut input, ev)? {
                    InputStatus::Continue => {
                        scr.pending = Some(Pending::Search { input, dir });
                        Ok(InputStatus::Continue)
                    }
                    InputStatus::Done {
                        term: term @ (Term::Bs | Term::Esc),
                        ..
                    } => {
                        debug!(target: "model", screen = %id, ?term, "search_prompt_cancelled");
                        Ok(InputStatus::Done {
                            cursor: scr.cursor,
                            term,
                        })
                    }
                    InputStatus::Done { term, .. } => {
                        let text = input.text();
                        let mv = search_to(scr, options, dir, Some(&text), TYPED)?;
                        Ok(InputStatus::Done {
                            cursor: mv.pos,
                            term,
                        })
                    }
                }
            }
        }
    }
}

fn screen_in(screens: &mut [Screen], id: ScreenId) -> Result<&mut Screen, ModelError> {
    screens.get_mut(id.0).ok_or(ModelError::NoScreen(id))
}

fn abandon(scr: &mut Screen) {
    if scr.pending.take().is_some() {
        warn!(target: "model", screen = %scr.id(), "input_abandoned");
    }
}

fn feed(
    scr: &mut Screen,
    options: &Options,
    abbrevs: &dyn AbbrevTable,
    ti: &mut TextInput,
    ev: InputEvent,
) -> Result<InputStatus, InputError> {
    let shared = Rc::clone(&scr.file);
    let mut file = shared.borrow_mut();
    let mut env = InputEnv {
        file: &mut file,
        options,
        abbrevs,
        status: &mut scr.status,
    };
    ti.event(&mut env, ev)
}

/// Store a text input back in its screen, or finish it.
fn settle(
    scr: &mut Screen,
    mut ti: TextInput,
    res: Result<InputStatus, InputError>,
) -> Result<InputStatus, ModelError> {
    match res {
        Ok(InputStatus::Continue) => {
            scr.pending = Some(Pending::Text(ti));
            Ok(InputStatus::Continue)
        }
        Ok(done @ InputStatus::Done { cursor, term }) => {
            scr.cursor = cursor;
            let rec = ti.take_recording();
            if !rec.is_empty() {
                scr.last_input = rec;
            }
            debug!(target: "model", screen = %scr.id(), %cursor, ?term, "input_end");
            Ok(done)
        }
        Err(e) => {
            scr.cursor = ti.cursor();
            Err(e.into())
        }
    }
}

/// Where an input command starts, what it may overwrite and the line its
/// autoindent copies. Open commands add their empty line here.
fn place(
    file: &mut EditFile,
    cursor: Position,
    cmd: InputCommand,
) -> Result<(Position, Position, Option<LineNo>, TxtFlags), ModelError> {
    if file.last_line()? == 0 {
        let flags = match cmd {
            InputCommand::Open { .. } => TxtFlags::ADDNEWLINE,
            _ => TxtFlags::empty(),
        };
        let at = Position::origin();
        return Ok((at, at, None, flags));
    }
    let lno = cursor.lno;
    let placed = match cmd {
        InputCommand::Insert => (cursor, cursor, None, TxtFlags::empty()),
        InputCommand::Append => {
            let line = file.get_line(lno)?;
            let cno = if line.is_empty() {
                0
            } else {
                next_boundary(line, cursor.cno)
            };
            let at = Position::new(lno, cno);
            (at, at, None, TxtFlags::empty())
        }
        InputCommand::Open { above: false } => {
            file.append_line(lno, "")?;
            let at = Position::new(lno + 1, 0);
            (at, at, Some(lno), TxtFlags::ADDNEWLINE)
        }
        InputCommand::Open { above: true } => {
            file.insert_line(lno, "")?;
            let at = Position::new(lno, 0);
            (at, at, Some(lno + 1), TxtFlags::ADDNEWLINE)
        }
        InputCommand::Change { to } => {
            if to.lno != lno || to.cno < cursor.cno {
                return Err(EditError::OutOfRange(to).into());
            }
            (cursor, to, None, TxtFlags::OVERWRITE | TxtFlags::EMARK)
        }
        InputCommand::Replace => {
            let line = file.get_line(lno)?;
            let to = Position::new(lno, last_column(line).max(cursor.cno));
            (cursor, to, None, TxtFlags::OVERWRITE | TxtFlags::REPLACE)
        }
    };
    Ok(placed)
}

/// Search from the cursor and apply any line offset.
fn locate(
    scr: &mut Screen,
    options: &Options,
    dir: Direction,
    input: Option<&str>,
    flags: SearchFlags,
) -> Result<SearchMove, ModelError> {
    let shared = Rc::clone(&scr.file);
    let mut file = shared.borrow_mut();
    let store = file.store_mut();
    let from = scr.cursor;
    let hit = match dir {
        Direction::Forward => {
            scr.search
                .f_search(store, from, input, flags, options, &mut scr.status)?
        }
        Direction::Backward => {
            scr.search
                .b_search(store, from, input, flags, options, &mut scr.status)?
        }
    };
    let offset = if flags.contains(SearchFlags::PARSE) {
        parse_delta(&hit.rest).and_then(|d| d.map(|d| apply_delta(store, hit.pos, d)).transpose())
    } else {
        Ok(None)
    };
    let moved = match offset {
        Ok(p) => p,
        Err(e) => {
            report(&mut scr.status, flags, &e);
            return Err(e.into());
        }
    };
    Ok(SearchMove {
        pos: moved.unwrap_or(hit.pos),
        wrapped: hit.wrapped,
        line_mode: moved.is_some(),
    })
}

fn report(status: &mut Status, flags: SearchFlags, e: &SearchError) {
    warn!(target: "model", error = %e, "search_offset");
    if flags.contains(SearchFlags::MSG) {
        status.msg(MsgKind::Error, e.to_string());
    }
}

/// A search used as a cursor movement; the absolute mark remembers where
/// the cursor was.
fn search_to(
    scr: &mut Screen,
    options: &Options,
    dir: Direction,
    input: Option<&str>,
    flags: SearchFlags,
) -> Result<SearchMove, ModelError> {
    let from = scr.cursor;
    let mv = locate(scr, options, dir, input, flags)?;
    scr.file_mut().mark_set(ABSMARK1, from, true);
    scr.cursor = mv.pos;
    debug!(target: "model", screen = %scr.id(), %dir, %from, to = %mv.pos, wrapped = mv.wrapped, "search_moved");
    Ok(mv)
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The word containing byte `cno` of `line`.
fn word_at(line: &str, cno: usize) -> Option<String> {
    line.get(cno..)?.chars().next().filter(|&c| is_word(c))?;
    let start = line[..cno]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word(c))
        .last()
        .map_or(cno, |(i, _)| i);
    let end = line[cno..]
        .char_indices()
        .find(|&(_, c)| !is_word(c))
        .map_or(line.len(), |(i, _)| cno + i);
    Some(line[start..end].to_owned())
}
