use core_config::Options;
use core_events::InputEvent;
use core_input::{InputStatus, Term};
use core_model::{Editor, InputCommand, ModelError, ScreenId};
use core_search::{Direction, Operator, SearchError};
use core_state::{CutFlags, EditFile, Report};
use core_text::{ErrorKind, Position};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

fn editor(lines: &[&str]) -> (Editor, ScreenId) {
    let mut ed = Editor::new(Options::default());
    let id = ed.open(EditFile::from_lines("test", lines));
    (ed, id)
}

fn feed(ed: &mut Editor, id: ScreenId, keys: &str) -> InputStatus {
    let mut last = InputStatus::Continue;
    for ev in InputEvent::from_str_chars(keys) {
        last = ed.input_event(id, ev).expect("event");
    }
    last
}

fn contents(ed: &Editor, id: ScreenId) -> Vec<String> {
    ed.screen(id).unwrap().file_mut().contents().unwrap()
}

fn cursor(ed: &Editor, id: ScreenId) -> Position {
    ed.screen(id).unwrap().cursor
}

fn pos(lno: usize, cno: usize) -> Position {
    Position::new(lno, cno)
}

#[test]
fn split_screens_share_text_and_marks() {
    let (mut ed, a) = editor(&["one", "two"]);
    let b = ed.split(a).unwrap();
    assert!(ed.screen(a).unwrap().same_file(ed.screen(b).unwrap()));
    ed.mark_set(b, 'x', pos(2, 1), true).unwrap();

    ed.begin_input(a, InputCommand::Open { above: true }, None)
        .unwrap();
    feed(&mut ed, a, "zero\x1b");
    assert_eq!(contents(&ed, b), vec!["zero", "one", "two"]);
    assert_eq!(cursor(&ed, a), pos(1, 3));
    // The mark followed its line down.
    assert_eq!(ed.mark_get(b, 'x').unwrap(), pos(3, 1));
    assert_eq!(cursor(&ed, b), pos(1, 0));
}

#[test]
fn insert_into_empty_file() {
    let (mut ed, id) = editor(&[]);
    ed.begin_input(id, InputCommand::Insert, None).unwrap();
    let st = feed(&mut ed, id, "hi\x1b");
    assert_eq!(
        st,
        InputStatus::Done {
            cursor: pos(1, 1),
            term: Term::Ok
        }
    );
    assert_eq!(contents(&ed, id), vec!["hi"]);
    assert!(!ed.screen(id).unwrap().in_input());
}

#[test]
fn counted_open_adds_each_copy_on_its_own_line() {
    let (mut ed, id) = editor(&["top", "bottom"]);
    ed.begin_input(id, InputCommand::Open { above: false }, Some(3))
        .unwrap();
    feed(&mut ed, id, "x\x1b");
    assert_eq!(contents(&ed, id), vec!["top", "x", "x", "x", "bottom"]);
    assert_eq!(cursor(&ed, id), pos(4, 0));
}

#[test]
fn dot_repeats_the_last_insert() {
    let (mut ed, id) = editor(&["ab"]);
    ed.begin_input(id, InputCommand::Insert, None).unwrap();
    feed(&mut ed, id, "xy\x1b");
    assert_eq!(contents(&ed, id), vec!["xyab"]);
    assert_eq!(cursor(&ed, id), pos(1, 1));

    let st = ed.repeat_input(id, InputCommand::Insert, None).unwrap();
    assert!(matches!(st, InputStatus::Done { .. }));
    assert_eq!(contents(&ed, id), vec!["xxyyab"]);
    assert_eq!(cursor(&ed, id), pos(1, 2));
}

#[test]
fn dot_without_previous_input() {
    let (mut ed, id) = editor(&["ab"]);
    let err = ed
        .repeat_input(id, InputCommand::Insert, None)
        .unwrap_err();
    assert!(matches!(err, ModelError::NothingToRepeat));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(
        ed.screen(id)
            .unwrap()
            .status
            .messages
            .contains("No previous input to repeat")
    );
}

#[test]
fn events_need_pending_input() {
    let (mut ed, id) = editor(&["ab"]);
    let err = ed.input_event(id, InputEvent::Interrupt).unwrap_err();
    assert!(matches!(err, ModelError::NoInput));
    assert!(matches!(
        ed.input_event(ScreenId(7), InputEvent::Interrupt),
        Err(ModelError::NoScreen(ScreenId(7)))
    ));
}

#[test]
fn replace_restores_what_was_erased() {
    let (mut ed, id) = editor(&["abcdef"]);
    ed.screen_mut(id).unwrap().cursor = pos(1, 1);
    ed.begin_input(id, InputCommand::Replace, None).unwrap();
    feed(&mut ed, id, "XY\x08\x1b");
    assert_eq!(contents(&ed, id), vec!["aXcdef"]);
}

#[test]
fn change_overwrites_through_its_end() {
    let (mut ed, id) = editor(&["hello world"]);
    ed.begin_input(id, InputCommand::Change { to: pos(1, 4) }, None)
        .unwrap();
    assert_eq!(
        ed.screen(id).unwrap().input_text().as_deref(),
        Some("hell$ world")
    );
    feed(&mut ed, id, "bye\x1b");
    assert_eq!(contents(&ed, id), vec!["bye world"]);
}

#[test]
fn abbreviations_apply_to_screen_input() {
    let (mut ed, id) = editor(&[]);
    ed.abbreviations_mut().insert("teh", "the");
    ed.begin_input(id, InputCommand::Insert, None).unwrap();
    feed(&mut ed, id, "teh cat\x1b");
    assert_eq!(contents(&ed, id), vec!["the cat"]);
}

#[test]
fn yank_and_put_lines() {
    let (mut ed, id) = editor(&["one", "two"]);
    ed.cut(id, None, pos(1, 0), pos(1, 0), CutFlags::LINE_MODE)
        .unwrap();
    ed.screen_mut(id).unwrap().cursor = pos(2, 0);
    let out = ed.put(id, None, true).unwrap();
    assert_eq!(out.lines, 1);
    assert_eq!(contents(&ed, id), vec!["one", "two", "one"]);
    assert_eq!(cursor(&ed, id), pos(3, 0));
    assert_eq!(ed.screen(id).unwrap().status.report, Some(Report::new("put", 1)));
}

#[test]
fn registers_are_shared_between_files() {
    let mut ed = Editor::new(Options::default());
    let a = ed.open(EditFile::from_lines("a", &["from a"]));
    let b = ed.open(EditFile::from_lines("b", &["in b"]));
    ed.cut(a, Some('q'), pos(1, 0), pos(1, 0), CutFlags::LINE_MODE)
        .unwrap();
    ed.put(b, Some('q'), false).unwrap();
    assert_eq!(contents(&ed, b), vec!["from a", "in b"]);
    assert!(!ed.screen(a).unwrap().same_file(ed.screen(b).unwrap()));
    let err = ed.put(b, Some('z'), false).unwrap_err();
    assert_eq!(err.to_string(), "Buffer z is empty");
}

#[test]
fn search_prompt_collects_then_searches() {
    let (mut ed, id) = editor(&["alpha", "beta", "gamma beta"]);
    let st = ed.begin_search_prompt(id, Direction::Forward).unwrap();
    assert_eq!(st, InputStatus::Continue);
    assert_eq!(ed.screen(id).unwrap().input_text().as_deref(), Some("/"));

    let st = feed(&mut ed, id, "beta\r");
    assert_eq!(
        st,
        InputStatus::Done {
            cursor: pos(2, 0),
            term: Term::Ok
        }
    );
    assert_eq!(cursor(&ed, id), pos(2, 0));
    // The jump remembered where it came from.
    assert_eq!(ed.mark_get(id, '`').unwrap(), pos(1, 0));

    assert_eq!(ed.search_repeat(id, false).unwrap().pos, pos(3, 6));
    assert_eq!(ed.search_repeat(id, true).unwrap().pos, pos(2, 0));
}

#[test]
fn empty_prompt_reuses_last_pattern() {
    let (mut ed, id) = editor(&["alpha", "beta", "gamma beta"]);
    ed.search(id, Direction::Forward, "/beta").unwrap();
    ed.begin_search_prompt(id, Direction::Forward).unwrap();
    let st = feed(&mut ed, id, "\r");
    assert_eq!(
        st,
        InputStatus::Done {
            cursor: pos(3, 6),
            term: Term::Cr
        }
    );
}

#[test]
fn erasing_the_prompt_cancels() {
    let (mut ed, id) = editor(&["alpha", "beta"]);
    ed.begin_search_prompt(id, Direction::Backward).unwrap();
    assert_eq!(ed.screen(id).unwrap().input_text().as_deref(), Some("?"));
    let st = feed(&mut ed, id, "\x08");
    assert_eq!(
        st,
        InputStatus::Done {
            cursor: pos(1, 0),
            term: Term::Bs
        }
    );
    assert!(!ed.screen(id).unwrap().in_input());
    assert!(!ed.screen(id).unwrap().search_state().have_search());
}

#[test]
fn search_offset_moves_by_lines() {
    let (mut ed, id) = editor(&["alpha", "beta", "gamma beta"]);
    let mv = ed.search(id, Direction::Forward, "/beta/+1").unwrap();
    assert_eq!(mv.pos, pos(3, 0));
    assert!(mv.line_mode);
    assert_eq!(cursor(&ed, id), pos(3, 0));

    let err = ed.search(id, Direction::Forward, "/beta/x").unwrap_err();
    assert!(matches!(err, ModelError::Search(SearchError::TrailingText)));
    assert_eq!(cursor(&ed, id), pos(3, 0));
    assert!(
        ed.screen(id)
            .unwrap()
            .status
            .messages
            .contains("Characters after search string and/or line offset")
    );
}

#[test]
fn split_screen_inherits_search_forward() {
    let (mut ed, a) = editor(&["x1", "x2", "x3"]);
    ed.screen_mut(a).unwrap().cursor = pos(3, 0);
    assert_eq!(ed.search(a, Direction::Backward, "?x").unwrap().pos, pos(2, 0));
    let b = ed.split(a).unwrap();
    assert_eq!(cursor(&ed, b), pos(2, 0));
    assert_eq!(ed.search_repeat(b, false).unwrap().pos, pos(3, 0));
    assert_eq!(ed.search_repeat(a, false).unwrap().pos, pos(1, 0));
}

#[test]
fn option_change_recompiles_saved_pattern() {
    let (mut ed, id) = editor(&["Foo", "foo"]);
    let err = ed.search(id, Direction::Forward, "/FOO").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    ed.set_options(Options {
        ignorecase: true,
        ..Options::default()
    });
    assert!(ed.screen(id).unwrap().search_state().needs_recompile());
    assert_eq!(ed.search_repeat(id, false).unwrap().pos, pos(2, 0));
}

#[test]
fn repeat_needs_a_previous_search() {
    let (mut ed, id) = editor(&["abc"]);
    let err = ed.search_repeat(id, false).unwrap_err();
    assert!(matches!(err, ModelError::Search(SearchError::NoPrevious)));
    assert!(
        ed.screen(id)
            .unwrap()
            .status
            .messages
            .contains("No previous search pattern")
    );
}

#[test]
fn word_search_matches_whole_words() {
    let (mut ed, id) = editor(&["foo food", "a foo"]);
    ed.screen_mut(id).unwrap().cursor = pos(1, 1);
    assert_eq!(ed.search_word(id).unwrap().pos, pos(2, 2));

    ed.screen_mut(id).unwrap().cursor = pos(2, 1);
    assert!(matches!(ed.search_word(id), Err(ModelError::NoWord)));
}

#[test]
fn tag_search_finds_definition() {
    let (mut ed, id) = editor(&["int x;", "int main(void)", "{", "}"]);
    ed.screen_mut(id).unwrap().cursor = pos(3, 0);
    let mv = ed.tag_search(id, "/^int main(void)$/").unwrap();
    assert_eq!(mv.pos, pos(2, 0));
    assert!(!mv.wrapped);
}

#[test]
fn search_motions_exclude_the_match() {
    let (mut ed, id) = editor(&["abc def", "ghi"]);
    let r = ed
        .search_motion(id, Operator::Yank, Direction::Forward, Some("/def"))
        .unwrap();
    assert_eq!((r.start, r.stop, r.line_mode), (pos(1, 0), pos(1, 3), false));
    assert_eq!(cursor(&ed, id), pos(1, 0));

    let (mut ed, id) = editor(&["a", "b", "c"]);
    let r = ed
        .search_motion(id, Operator::Delete, Direction::Forward, Some("/c"))
        .unwrap();
    assert_eq!((r.start, r.stop, r.line_mode), (pos(1, 0), pos(2, 0), true));
}

#[derive(Clone)]
struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl Write for LockedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}

#[test]
fn abandoned_input_is_logged() {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_writer(BufferWriter { inner: buf.clone() })
        .finish();
    let (mut ed, id) = editor(&["abc"]);
    tracing::subscriber::with_default(subscriber, || {
        ed.begin_input(id, InputCommand::Insert, None).unwrap();
        ed.begin_search_prompt(id, Direction::Forward).unwrap();
    });
    let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    assert!(out.contains("WARN model:"));
    assert!(out.contains("input_abandoned"));
    // Nothing was written for the abandoned insert.
    assert_eq!(contents(&ed, id), vec!["abc"]);
}
