//! Adjusting a search hit into the range an operator (`d/pat`, `y?pat`)
//! acts on.
//!
//! A search motion is exclusive: the character at the far end is not part of
//! the range. When the far end is column 0 of a later line, the range instead
//! ends at the last character of the previous line, and if the near end is
//! also at column 0 the whole motion becomes line-wise.

use crate::SearchError;
use core_text::column::{last_column, prev_boundary};
use core_text::{LineStore, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Change,
    Delete,
    Yank,
}

/// Inclusive range for an operator plus the cursor after the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRange {
    pub start: Position,
    pub stop: Position,
    pub line_mode: bool,
    pub cursor: Position,
}

/// The search moved forward from `start` to `stop`.
pub fn correct_forward(
    store: &mut LineStore,
    start: Position,
    mut stop: Position,
    delta: bool,
) -> Result<MotionRange, SearchError> {
    let mut line_mode = delta;
    if start.lno < stop.lno && stop.cno == 0 {
        stop.lno -= 1;
        stop.cno = last_column(store.get_line(stop.lno)?);
        if start.cno == 0 {
            line_mode = true;
        }
    } else {
        stop.cno = prev_boundary(store.get_line(stop.lno)?, stop.cno);
    }
    Ok(MotionRange {
        start,
        stop,
        line_mode,
        cursor: start,
    })
}

/// The search moved backward from `start` to `stop`; the returned range is
/// ordered (`stop` first).
pub fn correct_backward(
    store: &mut LineStore,
    op: Operator,
    mut start: Position,
    stop: Position,
    delta: bool,
) -> Result<MotionRange, SearchError> {
    // Delete leaves the cursor where the text went; yank does too, but only
    // when the motion crossed lines.
    let cursor = match op {
        Operator::Delete => stop,
        Operator::Yank if start.lno != stop.lno => stop,
        _ => start,
    };
    let mut line_mode = delta;
    if start.lno > stop.lno && start.cno == 0 {
        start.lno -= 1;
        start.cno = last_column(store.get_line(start.lno)?);
        if stop.cno == 0 {
            line_mode = true;
        }
    } else {
        start.cno = prev_boundary(store.get_line(start.lno)?, start.cno);
    }
    Ok(MotionRange {
        start: stop,
        stop: start,
        line_mode,
        cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> LineStore {
        LineStore::from_lines(&["alpha", "beta", "gamma"])
    }

    #[test]
    fn forward_within_line_excludes_target() {
        let mut s = store();
        let r = correct_forward(&mut s, Position::new(1, 0), Position::new(1, 3), false).unwrap();
        assert_eq!(r.stop, Position::new(1, 2));
        assert!(!r.line_mode);
        assert_eq!(r.cursor, Position::new(1, 0));
    }

    #[test]
    fn forward_to_column_zero_becomes_line_mode() {
        let mut s = store();
        let r = correct_forward(&mut s, Position::new(1, 0), Position::new(3, 0), false).unwrap();
        assert_eq!(r.stop, Position::new(2, 3));
        assert!(r.line_mode);
        let r = correct_forward(&mut s, Position::new(1, 2), Position::new(3, 0), false).unwrap();
        assert_eq!(r.stop, Position::new(2, 3));
        assert!(!r.line_mode);
    }

    #[test]
    fn backward_orders_range_and_places_cursor() {
        let mut s = store();
        let r = correct_backward(
            &mut s,
            Operator::Delete,
            Position::new(2, 2),
            Position::new(1, 1),
            false,
        )
        .unwrap();
        assert_eq!(r.start, Position::new(1, 1));
        assert_eq!(r.stop, Position::new(2, 1));
        assert_eq!(r.cursor, Position::new(1, 1));

        let r = correct_backward(
            &mut s,
            Operator::Yank,
            Position::new(1, 4),
            Position::new(1, 1),
            false,
        )
        .unwrap();
        assert_eq!(r.cursor, Position::new(1, 4));
    }

    #[test]
    fn backward_from_column_zero() {
        let mut s = store();
        let r = correct_backward(
            &mut s,
            Operator::Change,
            Position::new(3, 0),
            Position::new(1, 0),
            false,
        )
        .unwrap();
        assert_eq!(r.stop, Position::new(2, 3));
        assert!(r.line_mode);
    }

    #[test]
    fn delta_forces_line_mode() {
        let mut s = store();
        let r = correct_forward(&mut s, Position::new(1, 2), Position::new(1, 4), true).unwrap();
        assert!(r.line_mode);
    }
}
