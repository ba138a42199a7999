//! Per-buffer editing state: the commit log, registers, search and
//! find-char state, and the modal mode set.
//!
//! Layering: this crate owns the durable state the pipeline mutates. The
//! pipeline itself (parser, range resolver, executor) lives in
//! `core-actions` and threads these types through each key.

use core_text::{Direction, Point};
use regex::Regex;

pub mod commit;
pub mod record;
pub mod registers;

pub use commit::{Commit, CommitChain, CommitKind, CommitLog};
pub use record::{MacroCommit, MacroRecord};
pub use registers::{Macros, Marks, Yank, YankMode, Yanks};

/// Modal editing mode. Transitions are explicit executor outputs; no mode
/// is ever entered implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    VisualRange,
    VisualLine,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::VisualRange => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
        };
        write!(f, "{name}")
    }
}

/// Which find-char motion ran last; `;` repeats it and `,` reverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindCharKind {
    /// `f`: onto the next occurrence.
    Next,
    /// `F`: onto the previous occurrence.
    Prev,
    /// `t`: up to (one short of) the next occurrence.
    ToNext,
    /// `T`: up to the previous occurrence.
    ToPrev,
}

impl FindCharKind {
    pub fn reversed(self) -> Self {
        match self {
            FindCharKind::Next => FindCharKind::Prev,
            FindCharKind::Prev => FindCharKind::Next,
            FindCharKind::ToNext => FindCharKind::ToPrev,
            FindCharKind::ToPrev => FindCharKind::ToNext,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindCharState {
    pub kind: FindCharKind,
    pub ch: char,
}

/// The stored search pattern. An invalid pattern is an explicit state, not
/// a null: `n`/`N` report it and refuse to move.
#[derive(Debug, Default)]
pub enum SearchRegex {
    #[default]
    Unset,
    Valid(Regex),
    Invalid,
}

#[derive(Debug, Default)]
pub struct SearchState {
    pub direction: Direction,
    pub regex: SearchRegex,
    /// Where the current search began (restored on cancel).
    pub start: Point,
}

impl SearchState {
    /// Compile and store a pattern; an unparsable pattern leaves the state
    /// explicitly invalid. Returns whether the pattern compiled.
    pub fn compile(&mut self, pattern: &str) -> bool {
        match Regex::new(pattern) {
            Ok(regex) => {
                self.regex = SearchRegex::Valid(regex);
                true
            }
            Err(error) => {
                tracing::debug!(target: "state.search", %error, "invalid_search_pattern");
                self.regex = SearchRegex::Invalid;
                false
            }
        }
    }

    pub fn valid(&self) -> Option<&Regex> {
        match &self.regex {
            SearchRegex::Valid(regex) => Some(regex),
            _ => None,
        }
    }
}

/// State tracked per buffer: its commit log, its marks, and the column
/// vertical motions try to keep.
#[derive(Debug, Default)]
pub struct BufferState {
    pub commits: CommitLog,
    pub marks: Marks,
    pub cursor_save_column: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_char_reversal_is_an_involution() {
        for kind in [
            FindCharKind::Next,
            FindCharKind::Prev,
            FindCharKind::ToNext,
            FindCharKind::ToPrev,
        ] {
            assert_eq!(kind.reversed().reversed(), kind);
        }
    }

    #[test]
    fn search_compile_marks_invalid_state() {
        let mut search = SearchState::default();
        assert!(search.compile("al.ha"));
        assert!(search.valid().is_some());
        assert!(!search.compile("al(ha"));
        assert!(search.valid().is_none());
        assert!(matches!(search.regex, SearchRegex::Invalid));
    }
}
