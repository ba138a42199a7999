//! Typed input keys and the macro key-stream codec.
//!
//! A [`Key`] is either a printable character or one of the named special
//! keys the editor understands. Macro registers hold `Vec<Key>` sequences;
//! when those sequences are persisted (session file, messages) the named
//! specials are written with backslash escapes:
//!
//! | escape | key |
//! |--------|-----|
//! | `\b` | backspace |
//! | `\e` | escape |
//! | `\r` | enter |
//! | `\t` | tab |
//! | `\u` | up |
//! | `\d` | down |
//! | `\l` | left |
//! | `\i` | right |
//! | `\\` | literal backslash |
//!
//! Any other non-printable input is rejected when parsing; encoding falls
//! back to `~` so a stream is always writable.

use smallvec::SmallVec;
use thiserror::Error;

/// One input key: a printable character or a named special.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    /// Control-modified character (not representable in the macro codec;
    /// encodes as the `~` fallback).
    Ctrl(char),
    Escape,
    Enter,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// The printable character, when this key carries one.
    pub fn as_char(self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_printable(self) -> bool {
        matches!(self, Key::Char(c) if !c.is_control())
    }
}

/// Pending key sequences are short; keep them inline.
pub type KeySeq = SmallVec<[Key; 8]>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyCodecError {
    #[error("unknown escape '\\{0}'")]
    UnknownEscape(char),
    #[error("trailing backslash")]
    TrailingBackslash,
    #[error("non-printable character {0:?}")]
    NonPrintable(char),
}

/// Serialize a key stream with the backslash escapes above. Unencodable
/// keys degrade to `~`.
pub fn encode_keys(keys: &[Key]) -> String {
    let mut out = String::with_capacity(keys.len());
    for key in keys {
        match key {
            Key::Char('\\') => out.push_str("\\\\"),
            Key::Char(c) if !c.is_control() => out.push(*c),
            Key::Char(_) | Key::Ctrl(_) => out.push('~'),
            Key::Backspace => out.push_str("\\b"),
            Key::Escape => out.push_str("\\e"),
            Key::Enter => out.push_str("\\r"),
            Key::Tab => out.push_str("\\t"),
            Key::Up => out.push_str("\\u"),
            Key::Down => out.push_str("\\d"),
            Key::Left => out.push_str("\\l"),
            Key::Right => out.push_str("\\i"),
        }
    }
    out
}

/// Parse a serialized key stream. Only printable characters and the named
/// escapes are accepted.
pub fn decode_keys(s: &str) -> Result<Vec<Key>, KeyCodecError> {
    let mut keys = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch.is_control() {
            return Err(KeyCodecError::NonPrintable(ch));
        }
        if ch != '\\' {
            keys.push(Key::Char(ch));
            continue;
        }
        let escaped = chars.next().ok_or(KeyCodecError::TrailingBackslash)?;
        keys.push(match escaped {
            'b' => Key::Backspace,
            'e' => Key::Escape,
            'r' => Key::Enter,
            't' => Key::Tab,
            'u' => Key::Up,
            'd' => Key::Down,
            'l' => Key::Left,
            'i' => Key::Right,
            '\\' => Key::Char('\\'),
            other => return Err(KeyCodecError::UnknownEscape(other)),
        });
    }
    Ok(keys)
}
