//! Register tables: marks, yanks, and macros.
//!
//! Three independent mappings from a single character to a value, all with
//! upsert-on-write semantics. Marks live with their buffer; yanks and
//! macros live as long as the process. Register `"` is the default yank
//! target, `0` shadows the most recent full yank, and `/` holds the latest
//! search pattern.

use std::collections::HashMap;

use core_keymap::Key;
use core_text::Point;
use tracing::trace;

/// Default yank register.
pub const UNNAMED_REG: char = '"';
/// Shadow register written by every full yank.
pub const ZERO_REG: char = '0';
/// Search pattern register.
pub const SEARCH_REG: char = '/';

/// How yanked text was captured; linewise yanks paste as whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YankMode {
    #[default]
    Normal,
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Yank {
    pub text: String,
    pub mode: YankMode,
}

/// Process-wide yank registers.
#[derive(Debug, Default)]
pub struct Yanks {
    table: HashMap<char, Yank>,
}

impl Yanks {
    pub fn get(&self, reg: char) -> Option<&Yank> {
        self.table.get(&reg)
    }

    /// Upsert `reg`; the previous entry for `reg` is replaced.
    pub fn set(&mut self, reg: char, text: impl Into<String>, mode: YankMode) {
        let text = text.into();
        trace!(target: "state.registers", reg = %reg, len = text.len(), ?mode, "yank");
        self.table.insert(reg, Yank { text, mode });
    }
}

/// Per-buffer mark registers.
#[derive(Debug, Default)]
pub struct Marks {
    table: HashMap<char, Point>,
}

impl Marks {
    pub fn get(&self, reg: char) -> Option<Point> {
        self.table.get(&reg).copied()
    }

    pub fn set(&mut self, reg: char, location: Point) {
        trace!(target: "state.registers", reg = %reg, %location, "mark");
        self.table.insert(reg, location);
    }
}

/// Process-wide macro registers.
#[derive(Debug, Default)]
pub struct Macros {
    table: HashMap<char, Vec<Key>>,
}

impl Macros {
    pub fn get(&self, reg: char) -> Option<&[Key]> {
        self.table.get(&reg).map(Vec::as_slice)
    }

    pub fn set(&mut self, reg: char, keys: Vec<Key>) {
        trace!(target: "state.registers", reg = %reg, keys = keys.len(), "macro");
        self.table.insert(reg, keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yank_upsert_replaces() {
        let mut yanks = Yanks::default();
        yanks.set('a', "first", YankMode::Normal);
        yanks.set('a', "second", YankMode::Line);
        let yank = yanks.get('a').unwrap();
        assert_eq!(yank.text, "second");
        assert_eq!(yank.mode, YankMode::Line);
        assert!(yanks.get('b').is_none());
    }

    #[test]
    fn marks_store_points_per_register() {
        let mut marks = Marks::default();
        marks.set('m', Point::new(3, 7));
        marks.set('m', Point::new(0, 1));
        assert_eq!(marks.get('m'), Some(Point::new(0, 1)));
        assert_eq!(marks.get('x'), None);
    }

    #[test]
    fn macros_hold_key_streams() {
        let mut macros = Macros::default();
        macros.set('q', vec![Key::Char('x'), Key::Escape]);
        assert_eq!(macros.get('q').unwrap().len(), 2);
    }
}
