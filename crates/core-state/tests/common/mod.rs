#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_state::{CutFlags, EditFile, Registers, Status};
use core_text::Position;

pub fn file(lines: &[&str]) -> EditFile {
    EditFile::from_lines("test", lines)
}

pub fn lines(f: &mut EditFile) -> Vec<String> {
    f.contents().expect("contents")
}

pub fn pos(lno: usize, cno: usize) -> Position {
    Position::new(lno, cno)
}

/// Line-mode cut of `a..=b` into `name`.
pub fn cut_lines(r: &mut Registers, f: &mut EditFile, name: char, a: usize, b: usize) {
    let mut st = Status::new();
    r.cut(f, Some(name), pos(a, 0), pos(b, 0), CutFlags::LINE_MODE, &mut st)
        .expect("cut");
}
