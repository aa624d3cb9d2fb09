//! One screen: a view onto a shared file with its own cursor, search memory
//! and status.

use crate::ScreenId;
use core_events::InputChar;
use core_input::TextInput;
use core_search::{Direction, SearchState};
use core_state::{EditFile, SharedFile, Status};
use core_text::Position;
use std::cell::{Ref, RefMut};
use std::rc::Rc;

/// Input collected but not yet finished.
#[derive(Debug)]
pub(crate) enum Pending {
    Text(TextInput),
    /// A `/` or `?` prompt; the pattern is searched for when it ends.
    Search { input: TextInput, dir: Direction },
}

#[derive(Debug)]
pub struct Screen {
    id: ScreenId,
    pub(crate) file: SharedFile,
    pub cursor: Position,
    pub(crate) search: SearchState,
    pub(crate) pending: Option<Pending>,
    /// Input of the last text command, for `.` and a leading NUL.
    pub(crate) last_input: Vec<InputChar>,
    pub status: Status,
}

impl Screen {
    pub(crate) fn new(id: ScreenId, file: SharedFile) -> Self {
        Self {
            id,
            file,
            cursor: Position::origin(),
            search: SearchState::new(),
            pending: None,
            last_input: Vec::new(),
            status: Status::new(),
        }
    }

    /// A second screen on the same file. Cursor and search memory carry
    /// over; messages, input and the interrupt flag do not.
    pub(crate) fn split(&self, id: ScreenId) -> Self {
        Self {
            id,
            file: Rc::clone(&self.file),
            cursor: self.cursor,
            search: self.search.inherit(),
            pending: None,
            last_input: Vec::new(),
            status: Status::new(),
        }
    }

    pub fn id(&self) -> ScreenId {
        self.id
    }

    pub fn shared_file(&self) -> SharedFile {
        Rc::clone(&self.file)
    }

    pub fn file(&self) -> Ref<'_, EditFile> {
        self.file.borrow()
    }

    pub fn file_mut(&self) -> RefMut<'_, EditFile> {
        self.file.borrow_mut()
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Text input or a search prompt is in progress.
    pub fn in_input(&self) -> bool {
        self.pending.is_some()
    }

    /// Current text of the input line, prompt included.
    pub fn input_text(&self) -> Option<String> {
        match self.pending.as_ref()? {
            Pending::Text(ti) | Pending::Search { input: ti, .. } => Some(ti.text()),
        }
    }

    pub fn last_input(&self) -> &[InputChar] {
        &self.last_input
    }

    /// Shares the file with `other`.
    pub fn same_file(&self, other: &Screen) -> bool {
        Rc::ptr_eq(&self.file, &other.file)
    }
}
