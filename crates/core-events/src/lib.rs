//! Input events consumed by the text input assembler.
//!
//! The keystroke reader and mapping layer live outside the engine; what
//! reaches the engine is a stream of [`InputEvent`]s, each character carrying
//! flags that record how it was produced (quoted by `^V`, re-injected by an
//! abbreviation, exempt from mapping). Classification of a character into a
//! [`KeyClass`] depends on the user's erase/kill bindings, so it goes through
//! [`KeyBindings`] rather than a fixed table.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// How an input character was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharFlags: u8 {
        /// Taken literally; never classified as a special key.
        const QUOTED = 0b0001;
        /// Part of an abbreviation expansion; never re-expanded.
        const ABBREVIATED = 0b0010;
        /// Not subject to input mapping.
        const NOMAP = 0b0100;
    }
}

/// One character of input plus its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputChar {
    pub ch: char,
    pub flags: CharFlags,
}

impl InputChar {
    pub const fn new(ch: char) -> Self {
        Self {
            ch,
            flags: CharFlags::empty(),
        }
    }

    pub const fn with_flags(ch: char, flags: CharFlags) -> Self {
        Self { ch, flags }
    }

    pub fn is_quoted(&self) -> bool {
        self.flags.contains(CharFlags::QUOTED)
    }
}

impl From<char> for InputChar {
    fn from(ch: char) -> Self {
        Self::new(ch)
    }
}

/// Event delivered to the input assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Char(InputChar),
    /// User cancel (the interrupt character); ends input like escape.
    Interrupt,
}

impl InputEvent {
    /// Convert a literal string into character events, for tests and replay.
    pub fn from_str_chars(s: &str) -> Vec<InputEvent> {
        s.chars().map(|c| InputEvent::Char(c.into())).collect()
    }
}

/// Role a character plays during text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Ordinary,
    Cr,
    Nl,
    Escape,
    /// Erase one character.
    Erase,
    /// Erase one word.
    WordErase,
    /// Erase to the start of input.
    Kill,
    /// Quote the next character.
    LiteralNext,
    /// `^D`: shift left.
    CntrlD,
    /// `^T`: shift right.
    CntrlT,
    /// `^`, meaningful only before `^D`.
    Carat,
    /// `0`, meaningful only before `^D`.
    Zero,
    Backslash,
    Tab,
    FormFeed,
}

impl fmt::Display for KeyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Terminal editing characters in effect for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub erase: char,
    pub werase: char,
    pub kill: char,
    pub lnext: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            erase: '\x08',
            werase: '\x17',
            kill: '\x15',
            lnext: '\x16',
        }
    }
}

impl KeyBindings {
    /// Classify `c` for text input. Quoted characters are always ordinary.
    pub fn classify(&self, c: InputChar) -> KeyClass {
        if c.is_quoted() {
            return KeyClass::Ordinary;
        }
        match c.ch {
            ch if ch == self.erase => KeyClass::Erase,
            ch if ch == self.werase => KeyClass::WordErase,
            ch if ch == self.kill => KeyClass::Kill,
            ch if ch == self.lnext => KeyClass::LiteralNext,
            // DEL erases as well as the configured erase character.
            '\x7f' => KeyClass::Erase,
            '\r' => KeyClass::Cr,
            '\n' => KeyClass::Nl,
            '\x1b' => KeyClass::Escape,
            '\x04' => KeyClass::CntrlD,
            '\x14' => KeyClass::CntrlT,
            '^' => KeyClass::Carat,
            '0' => KeyClass::Zero,
            '\\' => KeyClass::Backslash,
            '\t' => KeyClass::Tab,
            '\x0c' => KeyClass::FormFeed,
            _ => KeyClass::Ordinary,
        }
    }
}
