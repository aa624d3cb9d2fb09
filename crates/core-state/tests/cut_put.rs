mod common;
use common::*;

use core_state::{CutFlags, Registers, Status};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn duplicate_line_after_first() {
    let mut f = file(&["abc", "def", "ghi"]);
    let mut r = Registers::new();
    cut_lines(&mut r, &mut f, 'a', 2, 2);
    let mut st = Status::new();
    let out = r.put(&mut f, Some('a'), pos(1, 0), true, &mut st).unwrap();
    assert_eq!(lines(&mut f), vec!["abc", "def", "def", "ghi"]);
    assert_eq!(out.cursor, pos(2, 0));
    assert_eq!(st.report.unwrap().to_string(), "1 line put");
}

#[test]
fn put_shifts_marks_below() {
    let mut f = file(&["abc", "def", "ghi"]);
    f.mark_set('m', pos(3, 1), true);
    let mut r = Registers::new();
    cut_lines(&mut r, &mut f, 'a', 1, 2);
    let mut st = Status::new();
    r.put(&mut f, Some('a'), pos(1, 0), true, &mut st).unwrap();
    assert_eq!(f.mark_get('m').unwrap(), pos(5, 1));
}

#[test]
fn named_cut_also_fills_default_buffer() {
    let mut f = file(&["abc"]);
    let mut r = Registers::new();
    cut_lines(&mut r, &mut f, 'h', 1, 1);
    let mut st = Status::new();
    r.put(&mut f, None, pos(1, 0), false, &mut st).unwrap();
    assert_eq!(lines(&mut f), vec!["abc", "abc"]);
}

#[test]
fn multibyte_split_point_respected() {
    let mut f = file(&["añb"]);
    let mut r = Registers::new();
    let mut st = Status::new();
    r.cut(&mut f, Some('u'), pos(1, 1), pos(1, 3), CutFlags::empty(), &mut st)
        .unwrap();
    assert_eq!(r.get('u').unwrap().segments(), ["ñ"]);
    // Put after the multibyte character.
    let out = r.put(&mut f, Some('u'), pos(1, 1), true, &mut st).unwrap();
    assert_eq!(lines(&mut f), vec!["aññb"]);
    assert_eq!(out.cursor, pos(1, 3));
    // A column inside a character is out of range.
    assert!(r.put(&mut f, Some('u'), pos(1, 2), true, &mut st).is_err());
}

proptest! {
    // Cutting [a, b] in line mode and putting it back after a-1 doubles the
    // range in place and leaves everything else alone.
    #[test]
    fn line_cut_put_round_trip(
        content in proptest::collection::vec("[a-z]{0,5}", 1..12),
        a in 1usize..12,
        span in 0usize..12,
    ) {
        let n = content.len();
        let a = a.min(n);
        let b = (a + span).min(n);
        let refs: Vec<&str> = content.iter().map(String::as_str).collect();
        let mut f = file(&refs);
        let mut r = Registers::new();
        cut_lines(&mut r, &mut f, 'x', a, b);
        let mut st = Status::new();
        let out = r.put(&mut f, Some('x'), pos(a, 0), false, &mut st).unwrap();
        prop_assert_eq!(out.cursor, pos(a, 0));
        prop_assert_eq!(out.lines, b - a + 1);
        let got = lines(&mut f);
        let mut want: Vec<String> = content[..a - 1].to_vec();
        want.extend_from_slice(&content[a - 1..b]);
        want.extend_from_slice(&content[a - 1..]);
        prop_assert_eq!(got, want);
    }

    // A character-mode cut put back at its own start reproduces the file
    // with the cut text duplicated.
    #[test]
    fn char_cut_put_round_trip(
        content in proptest::collection::vec("[a-z]{1,6}", 1..6),
        a in 1usize..6,
        span in 0usize..6,
        c1 in 0usize..6,
        c2 in 0usize..6,
    ) {
        let n = content.len();
        let a = a.min(n);
        let b = (a + span).min(n);
        let from_c = c1.min(content[a - 1].len());
        let to_c = if a == b { c2.min(content[b - 1].len()).max(from_c) } else { c2.min(content[b - 1].len()) };
        let refs: Vec<&str> = content.iter().map(String::as_str).collect();
        let mut f = file(&refs);
        let mut r = Registers::new();
        let mut st = Status::new();
        r.cut(&mut f, Some('y'), pos(a, from_c), pos(b, to_c), CutFlags::empty(), &mut st).unwrap();
        if r.get('y').is_none() {
            return Ok(());
        }
        r.put(&mut f, Some('y'), pos(a, from_c), false, &mut st).unwrap();
        let joined_before = content.join("\n");
        let start = content[..a - 1].iter().map(|l| l.len() + 1).sum::<usize>() + from_c;
        let end = content[..b - 1].iter().map(|l| l.len() + 1).sum::<usize>() + to_c;
        let mut want = String::new();
        want.push_str(&joined_before[..start]);
        want.push_str(&joined_before[start..end]);
        want.push_str(&joined_before[start..]);
        prop_assert_eq!(lines(&mut f).join("\n"), want);
    }
}
