//! Line offsets after a search pattern: `/pat/+2`, `?pat?-`.

use crate::SearchError;
use core_text::{LineStore, Position};

/// Parse the text following the closing delimiter. A lone `+` or `-` means
/// one line; a bare number is a forward offset. Blank text has no offset.
pub fn parse_delta(rest: &str) -> Result<Option<i64>, SearchError> {
    let s = rest.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let (sign, digits) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    if digits.is_empty() {
        return Ok(Some(sign));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SearchError::TrailingText);
    }
    // Too many digits to count lines with: off whichever end it points at.
    let n: i64 = digits.parse().map_err(|_| {
        if sign < 0 {
            SearchError::OffsetBeforeStart
        } else {
            SearchError::OffsetPastEnd
        }
    })?;
    Ok(Some(sign * n))
}

/// Move `pos` by `delta` lines. The result is line-wise, so it lands on
/// column 0.
pub fn apply_delta(
    store: &mut LineStore,
    pos: Position,
    delta: i64,
) -> Result<Position, SearchError> {
    let last = store.last_line()?;
    let target = i64::try_from(pos.lno)
        .ok()
        .and_then(|lno| lno.checked_add(delta));
    let target = match target {
        Some(t) if t < 1 => return Err(SearchError::OffsetBeforeStart),
        Some(t) => usize::try_from(t).map_err(|_| SearchError::OffsetPastEnd)?,
        None if delta < 0 => return Err(SearchError::OffsetBeforeStart),
        None => return Err(SearchError::OffsetPastEnd),
    };
    if target > last {
        return Err(SearchError::OffsetPastEnd);
    }
    Ok(Position::new(target, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signs_and_counts() {
        assert_eq!(parse_delta("").unwrap(), None);
        assert_eq!(parse_delta("+").unwrap(), Some(1));
        assert_eq!(parse_delta("-").unwrap(), Some(-1));
        assert_eq!(parse_delta("+3").unwrap(), Some(3));
        assert_eq!(parse_delta("-12").unwrap(), Some(-12));
        assert_eq!(parse_delta("2").unwrap(), Some(2));
        assert!(matches!(parse_delta("+x"), Err(SearchError::TrailingText)));
    }

    #[test]
    fn offsets_must_stay_in_file() {
        let mut s = LineStore::from_lines(&["a", "b", "c"]);
        let p = Position::new(2, 1);
        assert_eq!(apply_delta(&mut s, p, 1).unwrap(), Position::new(3, 0));
        assert_eq!(apply_delta(&mut s, p, -1).unwrap(), Position::new(1, 0));
        assert!(matches!(apply_delta(&mut s, p, -2), Err(SearchError::OffsetBeforeStart)));
        assert!(matches!(apply_delta(&mut s, p, 2), Err(SearchError::OffsetPastEnd)));
    }

    #[test]
    fn huge_offsets_do_not_overflow() {
        let mut s = LineStore::from_lines(&["a", "b"]);
        let p = Position::new(2, 0);
        let up = parse_delta("+9223372036854775807").unwrap().unwrap();
        assert!(matches!(apply_delta(&mut s, p, up), Err(SearchError::OffsetPastEnd)));
        let down = parse_delta("-9223372036854775807").unwrap().unwrap();
        assert!(matches!(apply_delta(&mut s, p, down), Err(SearchError::OffsetBeforeStart)));
        assert!(matches!(apply_delta(&mut s, p, i64::MIN), Err(SearchError::OffsetBeforeStart)));
        assert!(matches!(parse_delta("+99999999999999999999"), Err(SearchError::OffsetPastEnd)));
        assert!(matches!(parse_delta("-99999999999999999999"), Err(SearchError::OffsetBeforeStart)));
    }
}
