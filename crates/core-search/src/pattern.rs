//! Pattern text handling: delimiter parsing, tag conversion, and translation
//! of vi regular expressions into `regex` crate syntax.
//!
//! vi patterns are POSIX basic (or, with `extended`, extended) regular
//! expressions with three vi additions:
//! - `\<` and `\>` match the start and end of a word;
//! - `~` stands for the replacement text of the last substitution;
//! - with `nomagic`, `.`, `[` and `*` are literal unless escaped.
//!
//! Translation is a single left-to-right pass. Back-references have no
//! equivalent in the `regex` crate and are rejected.

use crate::SearchError;

/// Result of splitting a delimited search argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Reuse the previous pattern; `rest` follows the delimiter(s).
    Reuse { rest: String },
    /// A new pattern and whatever followed its closing delimiter.
    New { pattern: String, rest: String },
}

/// Split `/pattern/rest`. The first character is the delimiter. Only a
/// backslash escaping the delimiter is removed; all other escapes are kept
/// for the regular expression.
pub fn parse_delimited(input: Option<&str>) -> Parsed {
    let Some(input) = input else {
        return Parsed::Reuse {
            rest: String::new(),
        };
    };
    let mut chars = input.chars();
    let Some(delim) = chars.next() else {
        return Parsed::Reuse {
            rest: String::new(),
        };
    };
    let body = chars.as_str();
    if body.is_empty() {
        return Parsed::Reuse {
            rest: String::new(),
        };
    }
    if let Some(rest) = body.strip_prefix(delim) {
        return Parsed::Reuse { rest: rest.into() };
    }

    let mut pattern = String::with_capacity(body.len());
    let mut it = body.char_indices().peekable();
    let mut rest_at = body.len();
    while let Some((i, c)) = it.next() {
        if c == delim {
            rest_at = i + c.len_utf8();
            break;
        }
        if c == '\\' && matches!(it.peek(), Some((_, n)) if *n == delim) {
            continue;
        }
        pattern.push(c);
    }
    Parsed::New {
        pattern,
        rest: body[rest_at..].into(),
    }
}

/// Convert a ctags search command into a vi pattern: strip the delimiters,
/// keep a leading `^` and trailing `$` as anchors, escape every other
/// `^.[]$*`, and drop the backslashes ctags puts before `/` and `?`.
pub fn tag_pattern(tag: &str) -> String {
    let mut p = tag;
    if let Some(rest) = p.strip_suffix(['/', '?']) {
        p = rest;
    }
    let last_dollar = match p.strip_suffix('$') {
        Some(rest) => {
            p = rest;
            true
        }
        None => false,
    };
    if let Some(rest) = p.strip_prefix(['/', '?']) {
        p = rest;
    }

    let mut out = String::with_capacity(p.len() * 2);
    let mut chars = p.chars().peekable();
    if p.starts_with('^') {
        out.push('^');
        chars.next();
    }
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('/' | '?')) {
            continue;
        }
        if "^.[]$*".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    if last_dollar {
        out.push('$');
    }
    out
}

/// Escape `s` so that it matches itself as a magic vi pattern.
pub fn escape_vi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.[*^$~".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Syntax options in force while translating.
#[derive(Debug, Clone, Copy)]
pub struct Dialect<'a> {
    pub extended: bool,
    pub magic: bool,
    /// Replacement text for `~`; `None` makes `~` an ordinary character.
    pub tilde: Option<&'a str>,
}

fn unbalanced() -> SearchError {
    SearchError::Pattern("brackets ([ ]) not balanced".into())
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_literal(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '&' | '~' | '-' | '^') {
        out.push('\\');
    }
    out.push(c);
}

/// Copy a bracket expression starting just after `[`. Returns the index
/// after the closing `]`.
fn bracket(chars: &[char], mut i: usize, out: &mut String) -> Result<usize, SearchError> {
    out.push('[');
    if chars.get(i) == Some(&'^') {
        out.push('^');
        i += 1;
    }
    let mut first = true;
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unbalanced());
        };
        match c {
            ']' if !first => {
                out.push(']');
                return Ok(i + 1);
            }
            '[' if matches!(chars.get(i + 1), Some(':' | '.' | '=')) => {
                let kind = chars[i + 1];
                let start = i + 2;
                let mut j = start;
                while j + 1 < chars.len() && !(chars[j] == kind && chars[j + 1] == ']') {
                    j += 1;
                }
                if j + 1 >= chars.len() {
                    return Err(unbalanced());
                }
                if kind == ':' {
                    out.push_str("[:");
                    out.extend(&chars[start..j]);
                    out.push_str(":]");
                } else {
                    // Collating elements and equivalence classes: single characters only.
                    for &ch in &chars[start..j] {
                        push_class_literal(out, ch);
                    }
                }
                i = j + 2;
            }
            '-' if first || chars.get(i + 1) == Some(&']') => {
                out.push_str(r"\-");
                i += 1;
            }
            '-' => {
                out.push('-');
                i += 1;
            }
            c => {
                push_class_literal(out, c);
                i += 1;
            }
        }
        first = false;
    }
}

/// Copy an interval expression starting just after `{` (or `\{`). Returns
/// `None` when the text is not an interval, which extended syntax treats as
/// a literal brace.
fn interval(chars: &[char], i: usize, extended: bool, out: &mut String) -> Option<usize> {
    let mut j = i;
    let mut body = String::new();
    loop {
        let c = *chars.get(j)?;
        if extended && c == '}' {
            j += 1;
            break;
        }
        if !extended && c == '\\' && chars.get(j + 1) == Some(&'}') {
            j += 2;
            break;
        }
        if !(c.is_ascii_digit() || c == ',') {
            return None;
        }
        body.push(c);
        j += 1;
    }
    let valid = !body.is_empty()
        && body.matches(',').count() <= 1
        && !body.starts_with(',')
        && body.split(',').next().is_some_and(|m| !m.is_empty());
    if !valid {
        return None;
    }
    out.push('{');
    out.push_str(&body);
    out.push('}');
    Some(j)
}

/// `$` ends the expression here (basic syntax only anchors at the end).
fn at_end(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        None => true,
        Some('\\') => matches!(chars.get(i + 1), Some(')' | '|')),
        _ => false,
    }
}

/// Translate a vi pattern into `regex` crate syntax.
pub fn translate(pattern: &str, d: &Dialect<'_>) -> Result<String, SearchError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    let mut at_start = true;
    while i < chars.len() {
        let (c, escaped) = if chars[i] == '\\' {
            let Some(&n) = chars.get(i + 1) else {
                return Err(SearchError::Pattern("trailing backslash (\\)".into()));
            };
            i += 2;
            (n, true)
        } else {
            i += 1;
            (chars[i - 1], false)
        };
        let was_start = at_start;
        at_start = false;
        match c {
            '<' if escaped => out.push_str(r"\b{start}"),
            '>' if escaped => out.push_str(r"\b{end}"),
            '~' => match d.tilde {
                Some(repl) if escaped != d.magic => {
                    for rc in repl.chars() {
                        push_literal(&mut out, rc);
                    }
                }
                _ => push_literal(&mut out, '~'),
            },
            '.' if escaped != d.magic => out.push('.'),
            '[' if escaped != d.magic => i = bracket(&chars, i, &mut out)?,
            '*' if escaped != d.magic => {
                if was_start {
                    push_literal(&mut out, '*');
                } else {
                    out.push('*');
                }
            }
            '^' if !escaped && (d.extended || was_start) => {
                out.push('^');
                at_start = true;
            }
            '$' if !escaped && (d.extended || at_end(&chars, i)) => out.push('$'),
            '(' | '|' if escaped != d.extended => {
                out.push(c);
                at_start = true;
            }
            ')' | '+' | '?' if escaped != d.extended => out.push(c),
            '{' if escaped != d.extended => match interval(&chars, i, d.extended, &mut out) {
                Some(next) => i = next,
                None if d.extended => push_literal(&mut out, '{'),
                None => {
                    return Err(SearchError::Pattern(
                        "invalid repetition count(s)".into(),
                    ));
                }
            },
            '1'..='9' if escaped => {
                return Err(SearchError::Pattern(
                    "back-references are not supported".into(),
                ));
            }
            c => push_literal(&mut out, c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: Dialect<'static> = Dialect {
        extended: false,
        magic: true,
        tilde: Some("REP"),
    };

    fn basic(p: &str) -> String {
        translate(p, &BASIC).unwrap()
    }

    fn matches(p: &str, d: &Dialect<'_>, hay: &str) -> bool {
        regex::Regex::new(&translate(p, d).unwrap())
            .unwrap()
            .is_match(hay)
    }

    #[test]
    fn delimiter_parsing() {
        assert_eq!(
            parse_delimited(Some("/abc/+2")),
            Parsed::New {
                pattern: "abc".into(),
                rest: "+2".into()
            }
        );
        assert_eq!(
            parse_delimited(Some(r"/a\/b\.c")),
            Parsed::New {
                pattern: r"a/b\.c".into(),
                rest: "".into()
            }
        );
        assert_eq!(parse_delimited(Some("/")), Parsed::Reuse { rest: "".into() });
        assert_eq!(parse_delimited(Some("??-")), Parsed::Reuse { rest: "-".into() });
        assert_eq!(parse_delimited(None), Parsed::Reuse { rest: "".into() });
    }

    #[test]
    fn tag_conversion_keeps_anchors() {
        assert_eq!(tag_pattern("/^int main(void)$/"), r"^int main(void)$");
        assert_eq!(tag_pattern("/^a.b[1]*$/"), r"^a\.b\[1\]\*$");
        assert_eq!(tag_pattern(r"?x\/y^?"), r"x/y\^");
        assert_eq!(tag_pattern("/a$b/"), r"a\$b");
    }

    #[test]
    fn basic_groups_and_literals() {
        assert_eq!(basic(r"\(ab\)*"), "(ab)*");
        assert_eq!(basic("(a|b)+?"), r"\(a\|b\)\+\?");
        assert_eq!(basic(r"a\{2,3\}"), "a{2,3}");
        assert_eq!(basic("a{2}"), r"a\{2\}");
    }

    #[test]
    fn anchors_only_at_edges_in_basic() {
        assert_eq!(basic("^a^b$c$"), r"^a\^b\$c$");
        assert_eq!(basic(r"\(^a$\)"), "(^a$)");
        assert_eq!(basic("*a"), r"\*a");
        assert_eq!(basic("^*a"), r"^\*a");
    }

    #[test]
    fn extended_operators() {
        let ere = Dialect {
            extended: true,
            ..BASIC
        };
        assert!(matches("(ab|cd)+$", &ere, "xxcdab"));
        assert!(!matches("(ab|cd)+$", &ere, "abx"));
        assert!(matches(r"a\+b", &ere, "a+b"));
        assert!(matches("a{x", &ere, "a{x"));
    }

    #[test]
    fn word_boundaries() {
        assert!(matches(r"\<the\>", &BASIC, "in the end"));
        assert!(!matches(r"\<the\>", &BASIC, "other"));
    }

    #[test]
    fn tilde_and_magic() {
        assert_eq!(basic("a~b"), "aREPb");
        assert_eq!(basic(r"a\~b"), r"a\~b");
        let nomagic = Dialect {
            magic: false,
            ..BASIC
        };
        assert_eq!(translate("a.b*[", &nomagic).unwrap(), r"a\.b\*\[");
        assert_eq!(translate(r"a\.b\*", &nomagic).unwrap(), "a.b*");
        assert_eq!(translate(r"\~~", &nomagic).unwrap(), r"REP\~");
        let no_repl = Dialect {
            tilde: None,
            ..BASIC
        };
        assert_eq!(translate("~", &no_repl).unwrap(), r"\~");
    }

    #[test]
    fn replacement_text_is_literal() {
        let d = Dialect {
            tilde: Some("a.c"),
            ..BASIC
        };
        assert!(matches("~", &d, "a.c"));
        assert!(!matches("~", &d, "abc"));
    }

    #[test]
    fn bracket_expressions() {
        assert_eq!(basic("[]a]"), r"[\]a]");
        assert_eq!(basic("[^-a]"), r"[^\-a]");
        assert_eq!(basic("[a-z]"), "[a-z]");
        assert_eq!(basic(r"[\]"), r"[\\]");
        assert_eq!(basic("[[:digit:]x]"), "[[:digit:]x]");
        assert!(matches("[[:upper:]][.-.]", &BASIC, "Q-"));
        assert!(matches!(
            translate("[abc", &BASIC),
            Err(SearchError::Pattern(_))
        ));
    }

    #[test]
    fn rejects_back_references_and_trailing_escape() {
        assert!(translate(r"\(a\)\1", &BASIC).is_err());
        assert!(translate("abc\\", &BASIC).is_err());
    }

    #[test]
    fn escape_vi_round_trips_literally() {
        let s = r"a.b*c[d]^$~\";
        assert!(matches(&escape_vi(s), &BASIC, s));
    }
}
