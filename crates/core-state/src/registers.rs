//! Cut buffers and the cut/put primitives.
//!
//! There are 64 buffer slots, one for each ASCII character from space to
//! underscore. Lower-case letters fold onto their upper-case slot; naming a
//! buffer with an upper-case letter appends to it instead of replacing it.
//! `"` is the default buffer and `1`..`9` hold the history of deletes.
//!
//! A buffer is an ordered list of text segments plus a mode:
//! - line mode: each segment is one whole line;
//! - character mode: the first segment joins the text before the put point,
//!   the last joins the text after it, and any segments in between become
//!   whole lines. A character-mode cut that crosses a line boundary always
//!   ends with a (possibly empty) last segment so that put restores the
//!   line break.
//!
//! Invariants:
//! - `CutBuffer::len` is the sum of segment lengths.
//! - A failed cut leaves the target buffer exactly as it was.
//! - A failed put leaves already written lines in the file and reports how
//!   many there were.

use crate::file::EditFile;
use crate::status::{MsgKind, Report, Status};
use crate::EditError;
use bitflags::bitflags;
use core_text::column::{next_boundary, prev_boundary};
use core_text::{LineNo, Position};
use tracing::{debug, trace, warn};

/// Name of the default (unnamed) buffer.
pub const DEFAULT_BUFFER: char = '"';

const SLOTS: usize = 64;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CutFlags: u8 {
        /// Copy whole lines.
        const LINE_MODE = 0b01;
        /// A delete: rotate the numbered buffers and store into `1`.
        const NUMERIC = 0b10;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CutBuffer {
    segments: Vec<String>,
    line_mode: bool,
    len: usize,
}

impl CutBuffer {
    fn new(segments: Vec<String>, line_mode: bool) -> Self {
        let len = segments.iter().map(String::len).sum();
        Self {
            segments,
            line_mode,
            len,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_line_mode(&self) -> bool {
        self.line_mode
    }

    /// Total bytes across all segments.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Buffer contents joined with newlines, line-mode text newline terminated.
    pub fn text(&self) -> String {
        let mut s = self.segments.join("\n");
        if self.line_mode && !self.segments.is_empty() {
            s.push('\n');
        }
        s
    }
}

/// Resolved buffer slot and whether the name requests append mode.
fn slot(name: char) -> Result<(usize, bool), EditError> {
    let append = name.is_ascii_uppercase();
    let folded = name.to_ascii_uppercase();
    match folded {
        ' '..='_' => Ok((folded as usize - ' ' as usize, append)),
        _ => Err(EditError::InvalidBuffer(name)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// Where the cursor goes: first put line in line mode, last inserted
    /// character in character mode.
    pub cursor: Position,
    /// Lines added to the file.
    pub lines: usize,
}

#[derive(Debug, Clone)]
pub struct Registers {
    slots: Vec<Option<CutBuffer>>,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        Self {
            slots: vec![None; SLOTS],
        }
    }

    /// Contents of buffer `name` (case folded), if any.
    pub fn get(&self, name: char) -> Option<&CutBuffer> {
        let (idx, _) = slot(name).ok()?;
        self.slots[idx].as_ref().filter(|b| !b.is_empty())
    }

    /// Non-empty buffers in slot order.
    pub fn snapshot(&self) -> Vec<(char, &CutBuffer)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let b = b.as_ref().filter(|b| !b.is_empty())?;
                Some(((b' ' + i as u8) as char, b))
            })
            .collect()
    }

    /// Copy `from..=to` of `file` into buffer `name` (default buffer if `None`).
    pub fn cut(
        &mut self,
        file: &mut EditFile,
        name: Option<char>,
        from: Position,
        to: Position,
        flags: CutFlags,
        status: &mut Status,
    ) -> Result<(), EditError> {
        let name = name.unwrap_or(DEFAULT_BUFFER);
        let (idx, append) = slot(name)?;
        let line_mode = flags.contains(CutFlags::LINE_MODE);
        if from > to {
            return Err(EditError::OutOfRange(from));
        }

        let segments = match collect(file, from, to, line_mode, status) {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "state.cut", buffer = %name, %from, %to, error = %e, "cut_failed");
                return Err(e);
            }
        };

        let stored = if append {
            let prev = self.slots[idx].take().unwrap_or_default();
            if !prev.is_empty() && prev.line_mode != line_mode {
                status.msg(
                    MsgKind::Display,
                    format!("Buffer {name} changed to line mode"),
                );
            }
            let mode = (prev.line_mode && !prev.is_empty()) || line_mode;
            let mut all = prev.segments;
            all.try_reserve(segments.len())?;
            all.extend(segments);
            CutBuffer::new(all, mode)
        } else {
            CutBuffer::new(segments, line_mode)
        };
        debug!(
            target: "state.cut",
            buffer = %name,
            append,
            line_mode = stored.line_mode,
            segments = stored.segments.len(),
            bytes = stored.len,
            "cut"
        );

        if flags.contains(CutFlags::NUMERIC) {
            self.rotate_numbered(stored.clone());
        }
        if name != DEFAULT_BUFFER {
            self.slots[slot(DEFAULT_BUFFER)?.0] = Some(stored.clone());
        }
        self.slots[idx] = Some(stored);
        Ok(())
    }

    fn rotate_numbered(&mut self, newest: CutBuffer) {
        let one = '1' as usize - ' ' as usize;
        // "9" falls off, "1".."8" move up one.
        for i in (one..one + 8).rev() {
            self.slots[i + 1] = self.slots[i].take();
        }
        self.slots[one] = Some(newest);
        trace!(target: "state.cut", "numbered_rotated");
    }

    /// Insert buffer `name` into `file` at `at`. `append` puts after the
    /// cursor (after the line in line mode) instead of before it.
    pub fn put(
        &self,
        file: &mut EditFile,
        name: Option<char>,
        at: Position,
        append: bool,
        status: &mut Status,
    ) -> Result<PutOutcome, EditError> {
        let name = name.unwrap_or(DEFAULT_BUFFER);
        let (idx, _) = slot(name)?;
        let buf = match &self.slots[idx] {
            Some(b) if !b.is_empty() => b,
            _ => return Err(EditError::BufferEmpty(name)),
        };
        let result = if buf.line_mode {
            put_lines(file, buf, at, append, status)
        } else {
            put_chars(file, buf, at, append, status)
        };
        match &result {
            Ok(out) => {
                status.report = Some(Report::new("put", out.lines));
                debug!(target: "state.cut", buffer = %name, cursor = %out.cursor, lines = out.lines, "put");
            }
            Err(EditError::PartialPut { lines, source }) => {
                status.report = Some(Report::new("put", *lines));
                warn!(target: "state.cut", buffer = %name, lines, error = %source, "put_partial");
            }
            Err(e) => warn!(target: "state.cut", buffer = %name, error = %e, "put_failed"),
        }
        result
    }
}

/// Copy `[start, end)` of `line`, failing if it is not a valid span.
fn copy_span(line: &str, start: usize, end: usize, lno: LineNo) -> Result<String, EditError> {
    let span = line
        .get(start..end)
        .ok_or(EditError::OutOfRange(Position::new(lno, end)))?;
    let mut out = String::new();
    out.try_reserve_exact(span.len())?;
    out.push_str(span);
    Ok(out)
}

fn collect(
    file: &mut EditFile,
    from: Position,
    to: Position,
    line_mode: bool,
    status: &Status,
) -> Result<Vec<String>, EditError> {
    let mut segs: Vec<String> = Vec::new();
    segs.try_reserve(to.lno - from.lno + 1)?;
    for lno in from.lno..=to.lno {
        if status.interrupted() {
            return Err(EditError::Interrupted);
        }
        let line = file.get_line(lno)?;
        let (start, end) = if line_mode {
            (0, line.len())
        } else if from.lno == to.lno {
            (from.cno, to.cno)
        } else if lno == from.lno {
            (from.cno, line.len())
        } else if lno == to.lno {
            (0, to.cno)
        } else {
            (0, line.len())
        };
        segs.push(copy_span(line, start, end, lno)?);
    }
    Ok(segs)
}

fn partial(lines: usize, e: EditError) -> EditError {
    if lines == 0 {
        e
    } else {
        EditError::PartialPut {
            lines,
            source: Box::new(e),
        }
    }
}

fn put_lines(
    file: &mut EditFile,
    buf: &CutBuffer,
    at: Position,
    append: bool,
    status: &Status,
) -> Result<PutOutcome, EditError> {
    let last = file.last_line()?;
    let base = if append { at.lno } else { at.lno.saturating_sub(1) }.min(last);
    for (i, seg) in buf.segments.iter().enumerate() {
        if status.interrupted() {
            return Err(partial(i, EditError::Interrupted));
        }
        file.append_line(base + i, seg).map_err(|e| partial(i, e))?;
    }
    Ok(PutOutcome {
        cursor: Position::new(base + 1, 0),
        lines: buf.segments.len(),
    })
}

fn put_chars(
    file: &mut EditFile,
    buf: &CutBuffer,
    at: Position,
    append: bool,
    status: &Status,
) -> Result<PutOutcome, EditError> {
    let empty_file = file.last_line()? == 0;
    let lno = if empty_file { 1 } else { at.lno };
    let line = if empty_file {
        String::new()
    } else {
        file.line_owned(lno)?
    };
    if at.cno > line.len() || !line.is_char_boundary(at.cno) {
        return Err(EditError::OutOfRange(at));
    }
    let split = if line.is_empty() {
        0
    } else if append {
        next_boundary(&line, at.cno)
    } else {
        at.cno
    };
    let (prefix, suffix) = line.split_at(split);
    let segs = &buf.segments;
    let first = &segs[0];

    let mut head = String::new();
    head.try_reserve(prefix.len() + first.len() + suffix.len())?;
    head.push_str(prefix);
    head.push_str(first);

    if segs.len() == 1 {
        let cursor_end = head.len();
        head.push_str(suffix);
        write_first(file, empty_file, lno, &head)?;
        let cno = if first.is_empty() {
            split.min(column_max(&head))
        } else {
            prev_boundary(&head, cursor_end)
        };
        return Ok(PutOutcome {
            cursor: Position::new(lno, cno),
            lines: 0,
        });
    }

    write_first(file, empty_file, lno, &head)?;
    // The rewritten first line counts toward a partial put.
    let mut written = 0;
    for seg in &segs[1..segs.len() - 1] {
        if status.interrupted() {
            return Err(partial(written + 1, EditError::Interrupted));
        }
        file.append_line(lno + written, seg)
            .map_err(|e| partial(written + 1, e))?;
        written += 1;
    }
    let last = &segs[segs.len() - 1];
    let mut tail = String::new();
    tail.try_reserve(last.len() + suffix.len())
        .map_err(|e| partial(written + 1, e.into()))?;
    tail.push_str(last);
    tail.push_str(suffix);
    file.append_line(lno + written, &tail)
        .map_err(|e| partial(written + 1, e))?;
    written += 1;
    let cno = if last.is_empty() {
        0
    } else {
        prev_boundary(&tail, last.len())
    };
    Ok(PutOutcome {
        cursor: Position::new(lno + written, cno),
        lines: written,
    })
}

fn write_first(
    file: &mut EditFile,
    empty_file: bool,
    lno: LineNo,
    text: &str,
) -> Result<(), EditError> {
    if empty_file {
        file.append_line(0, text)
    } else {
        file.set_line(lno, text)
    }
}

fn column_max(s: &str) -> usize {
    prev_boundary(s, s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file(lines: &[&str]) -> EditFile {
        EditFile::from_lines("t", lines)
    }

    fn lines(f: &mut EditFile) -> Vec<String> {
        f.contents().unwrap()
    }

    #[test]
    fn slot_mapping() {
        assert_eq!(slot('a').unwrap(), slot('A').map(|(i, _)| (i, false)).unwrap());
        assert!(slot('A').unwrap().1);
        assert!(!slot('1').unwrap().1);
        assert!(matches!(slot('`'), Err(EditError::InvalidBuffer('`'))));
        assert!(matches!(slot('~'), Err(EditError::InvalidBuffer('~'))));
    }

    #[test]
    fn line_mode_cut_then_put_before() {
        let mut f = file(&["one", "two", "three"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            Some('a'),
            Position::new(2, 0),
            Position::new(3, 0),
            CutFlags::LINE_MODE,
            &mut st,
        )
        .unwrap();
        let out = r
            .put(&mut f, Some('a'), Position::new(1, 0), false, &mut st)
            .unwrap();
        assert_eq!(lines(&mut f), vec!["two", "three", "one", "two", "three"]);
        assert_eq!(out.cursor, Position::new(1, 0));
        assert_eq!(out.lines, 2);
        assert_eq!(st.report, Some(Report::new("put", 2)));
    }

    #[test]
    fn single_line_char_cut_and_put_after_cursor() {
        let mut f = file(&["hello world"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            None,
            Position::new(1, 0),
            Position::new(1, 5),
            CutFlags::empty(),
            &mut st,
        )
        .unwrap();
        assert_eq!(r.get(DEFAULT_BUFFER).unwrap().segments(), ["hello"]);
        let out = r
            .put(&mut f, None, Position::new(1, 10), true, &mut st)
            .unwrap();
        assert_eq!(lines(&mut f), vec!["hello worldhello"]);
        assert_eq!(out.cursor, Position::new(1, 15));
        assert_eq!(out.lines, 0);
    }

    #[test]
    fn multi_line_char_cut_round_trips() {
        let mut f = file(&["abcdef", "ghij", "klmnop"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            Some('x'),
            Position::new(1, 2),
            Position::new(3, 3),
            CutFlags::empty(),
            &mut st,
        )
        .unwrap();
        assert_eq!(
            r.get('x').unwrap().segments(),
            ["cdef", "ghij", "klm"]
        );
        let mut g = file(&["0123"]);
        let out = r
            .put(&mut g, Some('x'), Position::new(1, 2), false, &mut st)
            .unwrap();
        assert_eq!(lines(&mut g), vec!["01cdef", "ghij", "klm23"]);
        assert_eq!(out.cursor, Position::new(3, 2));
        assert_eq!(out.lines, 2);
    }

    #[test]
    fn char_cut_ending_at_column_zero_keeps_line_break() {
        let mut f = file(&["abc", "def"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            None,
            Position::new(1, 1),
            Position::new(2, 0),
            CutFlags::empty(),
            &mut st,
        )
        .unwrap();
        assert_eq!(r.get('"').unwrap().segments(), ["bc", ""]);
        let mut g = file(&["XY"]);
        r.put(&mut g, None, Position::new(1, 0), true, &mut st)
            .unwrap();
        assert_eq!(lines(&mut g), vec!["Xbc", "Y"]);
    }

    #[test]
    fn lowercase_replaces_uppercase_appends() {
        let mut f = file(&["a", "b"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        let l1 = Position::new(1, 0);
        let l2 = Position::new(2, 0);
        r.cut(&mut f, Some('q'), l1, l1, CutFlags::LINE_MODE, &mut st).unwrap();
        r.cut(&mut f, Some('q'), l2, l2, CutFlags::LINE_MODE, &mut st).unwrap();
        assert_eq!(r.get('q').unwrap().segments(), ["b"]);
        r.cut(&mut f, Some('Q'), l1, l1, CutFlags::LINE_MODE, &mut st).unwrap();
        assert_eq!(r.get('q').unwrap().segments(), ["b", "a"]);
        assert!(st.messages.is_empty());
    }

    #[test]
    fn append_mode_mismatch_reported_but_appended() {
        let mut f = file(&["abc", "def"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        let l1 = Position::new(1, 0);
        r.cut(&mut f, Some('k'), l1, l1, CutFlags::LINE_MODE, &mut st).unwrap();
        r.cut(
            &mut f,
            Some('K'),
            Position::new(2, 0),
            Position::new(2, 2),
            CutFlags::empty(),
            &mut st,
        )
        .unwrap();
        let b = r.get('k').unwrap();
        assert!(b.is_line_mode());
        assert_eq!(b.segments(), ["abc", "de"]);
        assert_eq!(b.len(), 5);
        assert!(st.messages.contains("Buffer K changed to line mode"));
    }

    #[test]
    fn failed_cut_preserves_buffer() {
        let mut f = file(&["abc"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        let l1 = Position::new(1, 0);
        r.cut(&mut f, Some('z'), l1, l1, CutFlags::LINE_MODE, &mut st).unwrap();
        let err = r
            .cut(
                &mut f,
                Some('z'),
                l1,
                Position::new(4, 0),
                CutFlags::LINE_MODE,
                &mut st,
            )
            .unwrap_err();
        assert_eq!(err.kind(), core_text::ErrorKind::NotFound);
        assert_eq!(r.get('z').unwrap().segments(), ["abc"]);
    }

    #[test]
    fn numbered_buffers_rotate() {
        let mut f = file(&["1", "2", "3"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        for lno in 1..=3 {
            let p = Position::new(lno, 0);
            r.cut(
                &mut f,
                None,
                p,
                p,
                CutFlags::LINE_MODE | CutFlags::NUMERIC,
                &mut st,
            )
            .unwrap();
        }
        assert_eq!(r.get('1').unwrap().segments(), ["3"]);
        assert_eq!(r.get('2').unwrap().segments(), ["2"]);
        assert_eq!(r.get('3').unwrap().segments(), ["1"]);
        assert!(r.get('4').is_none());
    }

    #[test]
    fn put_empty_buffer_fails() {
        let mut f = file(&["a"]);
        let r = Registers::new();
        let mut st = Status::new();
        let err = r
            .put(&mut f, None, Position::new(1, 0), true, &mut st)
            .unwrap_err();
        assert_eq!(err.to_string(), "The default buffer is empty");
        let err = r
            .put(&mut f, Some('c'), Position::new(1, 0), true, &mut st)
            .unwrap_err();
        assert_eq!(err.to_string(), "Buffer c is empty");
    }

    #[test]
    fn put_into_empty_file() {
        let mut src = file(&["x", "y"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut src,
            None,
            Position::new(1, 0),
            Position::new(2, 0),
            CutFlags::LINE_MODE,
            &mut st,
        )
        .unwrap();
        let mut empty = EditFile::from_lines::<&str>("e", &[]);
        r.put(&mut empty, None, Position::new(1, 0), true, &mut st)
            .unwrap();
        assert_eq!(lines(&mut empty), vec!["x", "y"]);
    }

    #[test]
    fn interrupted_put_reports_partial_lines() {
        let mut f = file(&["a", "b", "c"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            None,
            Position::new(1, 0),
            Position::new(3, 0),
            CutFlags::LINE_MODE,
            &mut st,
        )
        .unwrap();
        st.interrupt.interrupt();
        let err = r
            .put(&mut f, None, Position::new(3, 0), true, &mut st)
            .unwrap_err();
        assert_eq!(err.kind(), core_text::ErrorKind::Interrupted);
        assert_eq!(lines(&mut f), vec!["a", "b", "c"]);
    }

    #[test]
    fn interrupted_char_put_counts_first_line() {
        let mut f = file(&["abc", "def", "ghi"]);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(
            &mut f,
            None,
            Position::new(1, 1),
            Position::new(3, 1),
            CutFlags::empty(),
            &mut st,
        )
        .unwrap();
        st.interrupt.interrupt();
        let err = r
            .put(&mut f, None, Position::new(1, 0), false, &mut st)
            .unwrap_err();
        assert!(matches!(err, EditError::PartialPut { lines: 1, .. }), "{err:?}");
        assert_eq!(err.kind(), core_text::ErrorKind::Interrupted);
        assert_eq!(st.report, Some(Report::new("put", 1)));
        assert_eq!(lines(&mut f), vec!["bc", "def", "ghi"]);
    }
}
