//! The input state machine.
//!
//! Events are handled one at a time. Characters produced by an abbreviation
//! are queued and handled before [`TextInput::event`] returns, and so is
//! replayed input (`.` and counted inserts), so a caller only ever sees
//! `Continue` or the final `Done`.

use crate::line::{Carry, TextLine, in_word, is_blank};
use crate::{
    InputEnv, InputError, InputStatus, MAX_ABBREVIATION_EXPANSION, Term, TxtFlags, TxtSetup,
};
use core_events::{CharFlags, InputChar, InputEvent, KeyBindings, KeyClass};
use core_state::MsgKind;
use core_text::Position;
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

type Flow = Result<Option<InputStatus>, InputError>;

/// Word state used to decide when a word has just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abbrev {
    NotSet,
    InWord,
    NotWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    NotSet,
    /// Backslash entered; it quotes the next character.
    BNext,
    BThis,
    /// `^V` entered; its placeholder is on screen.
    VNext,
    VThis,
}

/// `^` and `0` typed in the autoindent area, waiting for `^D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carat {
    NotSet,
    CaratSet,
    ZeroSet,
    /// `^^D` ran; the next line reuses the saved indent.
    NoChange,
}

#[derive(Debug)]
pub struct TextInput {
    flags: TxtFlags,
    done: Vec<TextLine>,
    cur: TextLine,
    /// Input cursor, a char index into `cur`.
    cno: usize,
    /// The line as it was before input started, for `R` cleanup.
    orig: Vec<char>,
    margin: usize,
    abb: Abbrev,
    abcnt: usize,
    quote: Quote,
    carat: Carat,
    ait: Vec<char>,
    wm_skip: bool,
    carry: Option<Carry>,
    keys: KeyBindings,
    rep: Vec<InputChar>,
    rcol: usize,
    count: Option<usize>,
    replay_test: bool,
    term: Term,
    finished: Option<InputStatus>,
}

fn char_index(line: &str, byte: usize) -> usize {
    line.char_indices().take_while(|(b, _)| *b < byte).count()
}

impl TextInput {
    pub fn setup(env: &mut InputEnv<'_>, s: TxtSetup<'_>) -> Result<Self, InputError> {
        let mut flags = s.flags;
        let line = s.line.unwrap_or("");
        let orig: Vec<char> = line.chars().collect();
        let len = orig.len();
        let mut cno = char_index(line, s.cursor.cno);
        let to = char_index(line, s.to.cno);

        let mut cur = TextLine::new(s.cursor.lno, Vec::new());
        cur.reserve(len + 32)?;
        cur.buf.extend_from_slice(&orig);
        if len > 0 {
            if flags.contains(TxtFlags::OVERWRITE) {
                cur.owrite = (to.saturating_sub(cno) + 1).min(len - cno);
                cur.insert = len - cno - cur.owrite;
            } else {
                cur.insert = len - cno;
            }
            if flags.contains(TxtFlags::EMARK) && to < len {
                cur.buf[to] = '$';
            }
        }

        match s.ai_line {
            Some(ai_line) if flags.contains(TxtFlags::AUTOINDENT) => {
                // Line 0 comes from an append before the first line.
                if ai_line != 0 {
                    let src: Vec<char> = env.file.get_line(ai_line)?.chars().collect();
                    cur.auto_indent(&src)?;
                }
                cno = cur.ai;
                cur.insert = cur.len() - cno - cur.owrite;
            }
            _ if flags.contains(TxtFlags::AICHARS) => {
                cur.offset = 0;
                cur.ai = cno;
            }
            _ => cur.offset = cno,
        }

        if flags.contains(TxtFlags::PROMPT)
            && let Some(p) = s.prompt
        {
            cur.reserve(1)?;
            cur.buf.insert(cno, p);
            cno += 1;
            cur.offset += 1;
        }

        let margin = if flags.contains(TxtFlags::WRAPMARGIN) {
            env.options.margin()
        } else {
            0
        };
        let replaying = flags.contains(TxtFlags::REPLAY);
        if replaying {
            flags.remove(TxtFlags::RECORD);
        }
        trace!(target: "input.txt", lno = cur.lno, cno, ?flags, margin, "setup");

        Ok(Self {
            flags,
            done: Vec::new(),
            cur,
            cno,
            orig,
            margin,
            abb: if replaying { Abbrev::NotSet } else { Abbrev::InWord },
            abcnt: 0,
            quote: Quote::NotSet,
            carat: Carat::NotSet,
            ait: Vec::new(),
            wm_skip: false,
            carry: None,
            keys: s.keys,
            rep: s.previous,
            rcol: 0,
            count: s.count.filter(|&n| n > 1),
            replay_test: !replaying,
            term: Term::Ok,
            finished: None,
        })
    }

    /// Run previously recorded input (`.`). Does nothing unless the session
    /// was set up with [`TxtFlags::REPLAY`].
    pub fn replay(&mut self, env: &mut InputEnv<'_>) -> Result<InputStatus, InputError> {
        if !self.flags.contains(TxtFlags::REPLAY) {
            return Ok(self.finished.unwrap_or(InputStatus::Continue));
        }
        self.run(env, None)
    }

    /// Handle one input event.
    ///
    /// On error the input is abandoned: nothing more is written to the file,
    /// [`TextInput::cursor`] names the nearest line that still exists and a
    /// redraw is requested.
    pub fn event(
        &mut self,
        env: &mut InputEnv<'_>,
        ev: InputEvent,
    ) -> Result<InputStatus, InputError> {
        self.run(env, Some(ev))
    }

    fn run(
        &mut self,
        env: &mut InputEnv<'_>,
        ev: Option<InputEvent>,
    ) -> Result<InputStatus, InputError> {
        if let Some(done) = self.finished {
            return Ok(done);
        }
        match self.drive(env, ev) {
            Ok(st) => {
                if let InputStatus::Done { .. } = st {
                    self.finished = Some(st);
                }
                Ok(st)
            }
            Err(e) => {
                self.abort(env, &e);
                Err(e)
            }
        }
    }

    fn drive(
        &mut self,
        env: &mut InputEnv<'_>,
        ev: Option<InputEvent>,
    ) -> Result<InputStatus, InputError> {
        let mut queue: VecDeque<InputEvent> = ev.into_iter().collect();
        let mut rcount = 0;
        loop {
            let (ev, replayed) = if self.flags.contains(TxtFlags::REPLAY) {
                match self.rep.get(self.rcol) {
                    Some(&c) => {
                        self.rcol += 1;
                        (InputEvent::Char(c), true)
                    }
                    // Recorded input always ends in an escape; if it does
                    // not, end input as an interrupt would.
                    None => (InputEvent::Interrupt, true),
                }
            } else if let Some(ev) = queue.pop_front() {
                (ev, false)
            } else {
                return Ok(InputStatus::Continue);
            };
            if let Some(done) = self.step(env, ev, replayed, &mut queue, &mut rcount)? {
                return Ok(done);
            }
        }
    }

    fn step(
        &mut self,
        env: &mut InputEnv<'_>,
        ev: InputEvent,
        replayed: bool,
        queue: &mut VecDeque<InputEvent>,
        rcount: &mut usize,
    ) -> Flow {
        let c = match ev {
            InputEvent::Interrupt => return self.escape(env, None, queue),
            InputEvent::Char(c) => c,
        };

        if !replayed {
            // A leading NUL repeats the previous input.
            if std::mem::take(&mut self.replay_test) && c.ch == '\0' && !c.is_quoted() {
                if self.rep.is_empty() {
                    return Ok(Some(self.finish_here()));
                }
                self.start_replay();
                return Ok(None);
            }

            if c.flags.contains(CharFlags::ABBREVIATED) {
                self.abcnt += 1;
                if self.abcnt > MAX_ABBREVIATION_EXPANSION {
                    let before = queue.len();
                    queue.retain(|e| {
                        !matches!(e, InputEvent::Char(q) if q.flags.contains(CharFlags::ABBREVIATED))
                    });
                    if queue.len() != before {
                        warn!(target: "input.txt", dropped = before - queue.len(), "abbreviation_limit");
                        env.status.msg(
                            MsgKind::Error,
                            "Abbreviation exceeded expansion limit: characters discarded",
                        );
                    }
                    self.abcnt = 0;
                    return Ok(None);
                }
            } else {
                self.abcnt = 0;
            }

            if self.flags.contains(TxtFlags::RECORD) {
                self.rep.truncate(self.rcol);
                self.rep.push(c);
                self.rcol += 1;
            }
        }

        if std::mem::take(&mut self.wm_skip) && c.ch == ' ' {
            return Ok(None);
        }
        self.cur.reserve(1)?;

        if c.is_quoted() {
            return self.insert_checked(env, c.ch, queue);
        }
        let class = self.keys.classify(c);
        if self.quote != Quote::NotSet {
            let replace = match self.quote {
                Quote::VThis => class != KeyClass::Nl,
                Quote::BThis => matches!(class, KeyClass::Erase | KeyClass::Kill),
                _ => false,
            };
            if replace {
                // Overwrite the placeholder with the quoted character.
                self.cno -= 1;
                self.cur.owrite += 1;
                self.quote = Quote::NotSet;
                return self.insert_literal(env, c.ch, queue);
            }
            if self.quote == Quote::VThis {
                // ^V^J is a plain newline.
                self.cno -= 1;
                self.cur.buf.remove(self.cno);
            }
            self.quote = Quote::NotSet;
        }

        match class {
            KeyClass::Cr | KeyClass::Nl => self.carriage_return(env, Some(c.ch), queue),
            KeyClass::Escape => {
                if !self.flags.contains(TxtFlags::ESCAPE) {
                    return self.insert_plain(env, c.ch, class, queue);
                }
                if let Some(n) = self.count {
                    *rcount += 1;
                    if *rcount != n {
                        self.start_replay();
                        if self.flags.contains(TxtFlags::ADDNEWLINE) {
                            return self.carriage_return(env, Some(c.ch), queue);
                        }
                        return Ok(None);
                    }
                }
                if self.cno <= self.cur.offset {
                    self.term = Term::Esc;
                }
                self.escape(env, Some(c.ch), queue)
            }
            KeyClass::Carat | KeyClass::Zero => {
                if self.cno <= self.cur.ai && self.flags.contains(TxtFlags::AUTOINDENT) {
                    self.carat = if class == KeyClass::Carat {
                        Carat::CaratSet
                    } else {
                        Carat::ZeroSet
                    };
                }
                self.insert_plain(env, c.ch, class, queue)
            }
            KeyClass::CntrlD => self.outdent(env, c.ch, class, queue),
            KeyClass::Erase => self.erase(env),
            KeyClass::WordErase => self.word_erase(env),
            KeyClass::Kill => self.kill(env),
            KeyClass::CntrlT => {
                if !self.flags.contains(TxtFlags::CNTRLT) {
                    return self.insert_plain(env, c.ch, class, queue);
                }
                let o = env.options;
                self.cur.dent(&mut self.cno, true, o.tabstop, o.shiftwidth)?;
                Ok(None)
            }
            KeyClass::Backslash => {
                self.quote = Quote::BNext;
                self.insert_checked(env, c.ch, queue)
            }
            KeyClass::LiteralNext => {
                self.quote = Quote::VNext;
                self.insert_literal(env, '^', queue)
            }
            KeyClass::Ordinary | KeyClass::Tab | KeyClass::FormFeed => {
                self.insert_plain(env, c.ch, class, queue)
            }
        }
    }

    fn insert_plain(
        &mut self,
        env: &mut InputEnv<'_>,
        ch: char,
        class: KeyClass,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        if self.flags.contains(TxtFlags::BEAUTIFY)
            && ch.is_ascii_control()
            && !matches!(class, KeyClass::Tab | KeyClass::FormFeed)
        {
            env.status.msg(MsgKind::Bell, "Illegal character; quote to enter");
            return Ok(None);
        }
        self.insert_checked(env, ch, queue)
    }

    /// Insert `ch`, first expanding an abbreviation if `ch` ends a word.
    fn insert_checked(
        &mut self,
        env: &mut InputEnv<'_>,
        ch: char,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        if !in_word(ch)
            && self.abb == Abbrev::InWord
            && !self.flags.contains(TxtFlags::REPLAY)
            && let Some(len) = self.abbreviate(env, ch, queue)?
        {
            self.unrecord(len);
            return Ok(None);
        }
        if self.abb != Abbrev::NotSet {
            self.abb = if in_word(ch) {
                Abbrev::InWord
            } else {
                Abbrev::NotWord
            };
        }
        self.insert_literal(env, ch, queue)
    }

    fn insert_literal(
        &mut self,
        env: &mut InputEnv<'_>,
        ch: char,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        self.cur.put_char(&mut self.cno, ch)?;

        if self.margin != 0 {
            let tcol = self.cur.column_before(self.cno, env.options.tabstop);
            if tcol >= self.margin
                && let Some(carry) = self.cur.margin_break(&mut self.cno)
            {
                trace!(target: "input.txt", lno = self.cur.lno, tcol, "margin_wrap");
                self.wm_skip = is_blank(ch);
                self.carry = Some(carry);
                if self.flags.contains(TxtFlags::CR) {
                    return self.carriage_return(env, None, queue);
                }
                return self.line_break();
            }
        }

        self.quote = match self.quote {
            Quote::BNext => Quote::BThis,
            Quote::VNext => Quote::VThis,
            q => q,
        };
        Ok(None)
    }

    /// Expand the word before the cursor if it is an abbreviation. The
    /// expansion and `trigger` are queued as abbreviated input and the word
    /// is removed; returns its length.
    fn abbreviate(
        &mut self,
        env: &InputEnv<'_>,
        trigger: char,
        queue: &mut VecDeque<InputEvent>,
    ) -> Result<Option<usize>, InputError> {
        let offset = self.cur.offset;
        if self.cno <= offset {
            return Ok(None);
        }
        let buf = &self.cur.buf;
        let mut off = self.cno - 1;
        let mut len = 1;
        // The class of the character before the last one decides where the
        // word starts, as it always has.
        if off != offset && !is_blank(buf[off - 1]) {
            let word = in_word(buf[off - 1]);
            loop {
                off -= 1;
                len += 1;
                if off == offset {
                    break;
                }
                let p = buf[off - 1];
                if (word && !in_word(p)) || (!word && (in_word(p) || is_blank(p))) {
                    break;
                }
            }
        }

        let word: String = buf[off..self.cno].iter().collect();
        let Some(expansion) = env.abbrevs.expand(&word) else {
            return Ok(None);
        };
        debug!(target: "input.txt", %word, %expansion, "abbreviation");

        queue.push_front(InputEvent::Char(InputChar::with_flags(
            trigger,
            CharFlags::ABBREVIATED,
        )));
        for ch in expansion.chars().rev() {
            queue.push_front(InputEvent::Char(InputChar::with_flags(
                ch,
                CharFlags::ABBREVIATED,
            )));
        }
        self.cno -= len;
        self.cur.buf.drain(self.cno..self.cno + len);
        Ok(Some(len))
    }

    /// Drop a replaced word and its trigger from the recording; the
    /// expansion is recorded as it arrives.
    fn unrecord(&mut self, len: usize) {
        if self.flags.contains(TxtFlags::RECORD) {
            self.rcol = self.rcol.saturating_sub(len + 1);
        }
    }

    /// Abbreviation check when a line or the input ends. Returns whether an
    /// expansion was queued.
    fn end_word(
        &mut self,
        env: &InputEnv<'_>,
        trigger: Option<char>,
        queue: &mut VecDeque<InputEvent>,
    ) -> Result<bool, InputError> {
        if self.abb == Abbrev::InWord
            && !self.flags.contains(TxtFlags::REPLAY)
            && let Some(trigger) = trigger
            && let Some(len) = self.abbreviate(env, trigger, queue)?
        {
            self.unrecord(len);
            return Ok(true);
        }
        if self.abb != Abbrev::NotSet {
            self.abb = Abbrev::NotWord;
        }
        Ok(false)
    }

    fn carriage_return(
        &mut self,
        env: &mut InputEnv<'_>,
        trigger: Option<char>,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        if self.flags.contains(TxtFlags::CR) {
            if self.cno <= self.cur.offset {
                self.term = Term::Cr;
            }
            return self.escape(env, trigger, queue);
        }
        if self.end_word(env, trigger, queue)? {
            return Ok(None);
        }
        self.line_break()
    }

    /// Split the current line at the cursor and continue on a new one.
    fn line_break(&mut self) -> Flow {
        let tail = self.cur.buf.split_off(self.cno);
        let (mut owrite, mut insert) = (self.cur.owrite, self.cur.insert);
        self.cur.saved = Some((self.cno, tail.clone()));

        // Blanks after the break are dropped. `R` moves what is left of the
        // overwrite text to the new line and counts the blanks it ate.
        self.cur.r_erase = 0;
        let mut p = 0;
        if self.flags.contains(TxtFlags::REPLACE) && owrite != 0 {
            while owrite > 0 && is_blank(tail[p]) {
                p += 1;
                owrite -= 1;
                self.cur.r_erase += 1;
            }
            if owrite == 0 {
                while insert > 0 && is_blank(tail[p]) {
                    p += 1;
                    insert -= 1;
                    self.cur.r_erase += 1;
                }
            }
        } else {
            p = owrite;
            while insert > 0 && is_blank(tail[p]) {
                p += 1;
                insert -= 1;
            }
            owrite = 0;
        }

        let mut next = TextLine::new(self.cur.lno + 1, Vec::new());
        next.reserve(insert + owrite + 32)?;
        next.buf.extend_from_slice(&tail[p..p + owrite + insert]);
        next.owrite = owrite;
        next.insert = insert;

        // 0^D leaves the indent of the next line alone, ^^D restores the
        // one it removed.
        if self.flags.contains(TxtFlags::AUTOINDENT) {
            if self.carat == Carat::NoChange {
                let ait = std::mem::take(&mut self.ait);
                next.auto_indent(&ait)?;
            } else {
                next.auto_indent(&self.cur.buf)?;
            }
            self.carat = Carat::NotSet;
        }

        let mut cno = next.ai;
        if let Some(carry) = self.carry.take() {
            next.reserve(carry.chars.len())?;
            next.buf.splice(cno..cno, carry.chars);
            cno += carry.typed;
            next.owrite = carry.owrite;
            next.insert = carry.insert;
        }

        let prev = std::mem::replace(&mut self.cur, next);
        self.done.push(prev);
        self.cno = cno;
        trace!(target: "input.txt", lno = self.cur.lno, cno, "line_break");
        Ok(None)
    }

    fn escape(
        &mut self,
        env: &mut InputEnv<'_>,
        trigger: Option<char>,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        if self.end_word(env, trigger, queue)? {
            return Ok(None);
        }
        if self.flags.contains(TxtFlags::REPLACE) {
            self.replace_cleanup();
        }
        self.cur.drop_overwrite(self.cno);
        if self.flags.contains(TxtFlags::RESOLVE) {
            self.resolve(env)?;
        }
        if self.cno != 0 {
            self.cno -= 1;
        }
        let done = self.finish_here();
        debug!(
            target: "input.txt",
            lines = self.done.len() + 1,
            term = ?self.term,
            "input_done"
        );
        Ok(Some(done))
    }

    /// Leave input mode at the current cursor.
    fn finish_here(&mut self) -> InputStatus {
        if self.flags.contains(TxtFlags::RECORD) {
            self.rep.truncate(self.rcol);
        }
        InputStatus::Done {
            cursor: Position::new(self.cur.lno, self.cur.byte_offset(self.cno)),
            term: self.term,
        }
    }

    /// Restore original characters that `R` overwrote and the user then
    /// erased.
    fn replace_cleanup(&mut self) {
        if self.cur.owrite == 0 {
            return;
        }
        let entered: usize = self
            .done
            .iter()
            .map(|t| t.len() + t.r_erase)
            .sum::<usize>()
            + self.cno;
        if entered < self.orig.len() {
            let n = self.cur.owrite.min(self.orig.len() - entered);
            let ow = self.cur.owrite;
            self.cur
                .buf
                .splice(self.cno..self.cno + ow, self.orig[entered..entered + n].iter().copied());
            self.cur.owrite = 0;
            self.cur.insert += n;
        }
    }

    /// Write the pending lines into the file: the first replaces the line
    /// input started on, the rest are appended after it.
    fn resolve(&mut self, env: &mut InputEnv<'_>) -> Result<(), InputError> {
        let ts = env.options.tabstop;
        let ai = self.flags.contains(TxtFlags::AUTOINDENT);
        let last = self.done.len();
        for i in 0..=last {
            let line = if i == last {
                if ai {
                    self.cur.ai_resolve(Some(&mut self.cno), ts);
                }
                &self.cur
            } else {
                if ai {
                    self.done[i].ai_resolve(None, ts);
                }
                &self.done[i]
            };
            let text = line.text();
            if i == 0 && env.file.line_exists(line.lno)? {
                env.file.set_line(line.lno, &text)?;
            } else {
                env.file.append_line(line.lno.saturating_sub(1), &text)?;
            }
        }
        Ok(())
    }

    fn erase(&mut self, env: &mut InputEnv<'_>) -> Flow {
        if self.cno <= self.cur.offset && self.flags.contains(TxtFlags::BS) {
            self.term = Term::Bs;
            return Ok(Some(self.finish_here()));
        }
        if self.cno == 0 {
            self.backup(env)?;
            return Ok(None);
        }
        if self.cno <= self.cur.offset {
            no_more(env);
            return Ok(None);
        }
        self.cno -= 1;
        self.cur.owrite += 1;
        if self.cno < self.cur.ai {
            self.cur.ai -= 1;
        }
        Ok(None)
    }

    /// Where word erase and kill stop: the end of the autoindent first, the
    /// offset after that.
    fn erase_floor(&mut self) -> usize {
        if self.cur.ai > 0 && self.cno > self.cur.ai {
            self.cur.ai
        } else {
            self.cur.ai = 0;
            self.cur.offset
        }
    }

    fn back_one(&mut self) {
        self.cno -= 1;
        self.cur.owrite += 1;
    }

    fn prev_char(&self) -> Option<char> {
        self.cno.checked_sub(1).map(|i| self.cur.buf[i])
    }

    fn word_erase(&mut self, env: &mut InputEnv<'_>) -> Flow {
        if self.cno == 0 {
            self.backup(env)?;
        }
        if self.cno <= self.cur.offset {
            no_more(env);
            return Ok(None);
        }
        let max = self.erase_floor();
        while self.cno > max && self.prev_char().is_some_and(is_blank) {
            self.back_one();
        }
        if self.cno == max {
            return Ok(None);
        }

        // Historic vi splits `/a/b/c` into six words, the tty driver into
        // one, and altwerase into three.
        if self.flags.contains(TxtFlags::TTYWERASE) {
            while self.cno > max {
                self.back_one();
                if self.prev_char().is_some_and(is_blank) {
                    break;
                }
            }
            return Ok(None);
        }
        if self.flags.contains(TxtFlags::ALTWERASE) {
            self.back_one();
            if self.prev_char().is_some_and(is_blank) {
                return Ok(None);
            }
        }
        if self.cno > max {
            let word = self.prev_char().is_some_and(in_word);
            while self.cno > max {
                self.back_one();
                match self.prev_char() {
                    Some(p) if in_word(p) == word && !is_blank(p) => {}
                    _ => break,
                }
            }
        }
        Ok(None)
    }

    fn kill(&mut self, env: &mut InputEnv<'_>) -> Flow {
        if self.cno == 0 {
            self.backup(env)?;
        }
        if self.cno <= self.cur.offset {
            no_more(env);
            return Ok(None);
        }
        let max = self.erase_floor();
        self.cur.owrite += self.cno - max;
        self.cno = max;
        Ok(None)
    }

    /// `^D`, `0^D` and `^^D`.
    fn outdent(
        &mut self,
        env: &mut InputEnv<'_>,
        ch: char,
        class: KeyClass,
        queue: &mut VecDeque<InputEvent>,
    ) -> Flow {
        if !self.flags.contains(TxtFlags::AUTOINDENT) {
            return self.insert_plain(env, ch, class, queue);
        }
        if self.cno == 0 {
            return Ok(None);
        }
        let ai_end = self.cur.ai + self.cur.offset;
        match self.carat {
            Carat::CaratSet | Carat::ZeroSet => {
                // The `^` or `0` must directly follow the indent.
                if self.cno > ai_end + 1 {
                    return self.insert_plain(env, ch, class, queue);
                }
                if self.carat == Carat::CaratSet {
                    self.ait = self.cur.buf[..self.cur.ai].to_vec();
                    self.carat = Carat::NoChange;
                } else {
                    self.carat = Carat::NotSet;
                }
                self.cur.buf[self.cno - 1] = ' ';
                self.cur.owrite += self.cno - self.cur.offset;
                self.cur.ai = 0;
                self.cno = self.cur.offset;
            }
            Carat::NotSet | Carat::NoChange => {
                if self.cno > ai_end {
                    return self.insert_plain(env, ch, class, queue);
                }
                let o = env.options;
                self.cur.dent(&mut self.cno, false, o.tabstop, o.shiftwidth)?;
            }
        }
        Ok(None)
    }

    /// Erasing from column 0 reopens the previous pending line.
    fn backup(&mut self, env: &mut InputEnv<'_>) -> Result<(), InputError> {
        let Some(mut prev) = self.done.pop() else {
            env.status
                .msg(MsgKind::Bell, "Already at the beginning of the insert");
            return Ok(());
        };
        if let Some((cno, tail)) = prev.saved.take() {
            prev.reserve(tail.len())?;
            prev.buf.extend(tail);
            self.cno = cno;
        }
        trace!(target: "input.txt", lno = prev.lno, cno = self.cno, "backup");
        self.cur = prev;
        Ok(())
    }

    fn start_replay(&mut self) {
        self.rcol = 0;
        self.abb = Abbrev::NotSet;
        self.flags.remove(TxtFlags::RECORD);
        self.flags.insert(TxtFlags::REPLAY);
    }

    /// Give up after a failure: park the cursor on the nearest line at or
    /// before the start of input that still exists.
    fn abort(&mut self, env: &mut InputEnv<'_>, err: &InputError) {
        let mut lno = self.done.first().map_or(self.cur.lno, |t| t.lno);
        while lno > 0 && !env.file.line_exists(lno).unwrap_or(false) {
            lno -= 1;
        }
        let cursor = Position::new(lno.max(1), 0);
        env.status.redraw = true;
        warn!(target: "input.txt", error = %err, %cursor, "input_aborted");
        self.finished = Some(InputStatus::Done {
            cursor,
            term: self.term,
        });
    }

    /// Pending lines in order, the current one last.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.done.iter().chain(std::iter::once(&self.cur))
    }

    /// Text of the current line, including any prompt.
    pub fn text(&self) -> String {
        self.cur.text()
    }

    pub fn cursor(&self) -> Position {
        match self.finished {
            Some(InputStatus::Done { cursor, .. }) => cursor,
            _ => Position::new(self.cur.lno, self.cur.byte_offset(self.cno)),
        }
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn is_done(&self) -> bool {
        self.finished.is_some()
    }

    /// The recorded input, for replaying with `.`.
    pub fn take_recording(&mut self) -> Vec<InputChar> {
        std::mem::take(&mut self.rep)
    }
}

fn no_more(env: &mut InputEnv<'_>) {
    env.status.msg(MsgKind::Bell, "No more characters to erase");
}
