//! Line-oriented text buffer and point primitives.
//!
//! A `Buffer` is an ordered sequence of lines; newlines are implicit
//! separators and never stored. Columns are char offsets, not byte offsets,
//! so multi-byte characters occupy exactly one column slot. Every mutating
//! primitive validates its indices and leaves the buffer untouched on
//! failure; readonly buffers reject all mutation with
//! [`BufferError::Readonly`]. A buffer with zero lines is the legal empty
//! document.
//!
//! Coordinates are signed (`i64`) so motion arithmetic may momentarily run
//! negative before clamping; absence is expressed with `Option`, never with
//! sentinel points.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

pub mod motion;

pub use motion::Direction;

/// A `(x, y)` position inside a buffer: `y` is the line index, `x` the char
/// offset within that line. `x == line_len` is the insert slot one past the
/// last character (and reads as the implicit newline when a next line
/// exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub const fn origin() -> Self {
        Self { x: 0, y: 0 }
    }

    /// True when `self` comes strictly after `other` in reading order.
    pub fn after(&self, other: &Point) -> bool {
        self.y > other.y || (self.y == other.y && self.x > other.x)
    }

    /// Order two points into (first, last) by reading order.
    pub fn sorted(a: Point, b: Point) -> (Point, Point) {
        if a.after(&b) { (b, a) } else { (a, b) }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Buffer lifecycle status. `NewFile` marks a buffer whose path does not
/// exist on disk yet; `Readonly` rejects every mutating primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferStatus {
    #[default]
    Clean,
    Modified,
    NewFile,
    Readonly,
}

/// Language tag driving the comment string and (externally) syntax styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    Plain,
    C,
    Rust,
    Python,
    Config,
}

impl FileType {
    /// Detect a file type from the path extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c" | "h" | "cpp" | "cc" | "hpp") => FileType::C,
            Some("rs") => FileType::Rust,
            Some("py") => FileType::Python,
            Some("toml" | "cfg" | "ini" | "conf") => FileType::Config,
            _ => FileType::Plain,
        }
    }

    /// The line comment prefix for this file type, if it has one.
    pub fn comment_string(self) -> Option<&'static str> {
        match self {
            FileType::C | FileType::Rust => Some("//"),
            FileType::Python | FileType::Config => Some("#"),
            FileType::Plain => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("buffer is readonly")]
    Readonly,
    #[error("point {0} is outside the buffer")]
    OutOfRange(Point),
    #[error("'{0}' is not a regular file")]
    NotRegularFile(PathBuf),
    #[error("buffer has no file name")]
    NoFileName,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An ordered sequence of text lines plus editing metadata.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    lines: Vec<String>,
    /// Display name (file path with the working directory prefix trimmed).
    pub name: String,
    /// On-disk path, when the buffer is backed by a file.
    pub filename: Option<PathBuf>,
    pub status: BufferStatus,
    pub file_type: FileType,
    /// Cursor saved while the buffer is not shown in the active view.
    pub cursor: Point,
    /// Transient decoration span, cleared by the next edit.
    pub highlight: Option<(Point, Point)>,
    /// Single transient visual anchor.
    pub mark: Option<Point>,
}

impl Buffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a buffer from in-memory content. A trailing newline does not
    /// produce a final empty line.
    pub fn from_str(name: impl Into<String>, content: &str) -> Self {
        let mut buffer = Self::new(name);
        if !content.is_empty() {
            let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
            if content.ends_with('\n') {
                lines.pop();
            }
            buffer.lines = lines;
        }
        buffer
    }

    /// Load a file into a new buffer. Missing paths produce an empty
    /// `NewFile` buffer; directories are refused.
    pub fn load(path: &Path) -> Result<Self, BufferError> {
        let name = display_name(path);
        if !path.exists() {
            trace!(target: "text.buffer", ?path, "load_new_file");
            let mut buffer = Self::new(name);
            buffer.filename = Some(path.to_path_buf());
            buffer.file_type = FileType::from_path(path);
            buffer.status = BufferStatus::NewFile;
            return Ok(buffer);
        }
        if !path.is_file() {
            return Err(BufferError::NotRegularFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut buffer = Self::from_str(name, &content);
        buffer.filename = Some(path.to_path_buf());
        buffer.file_type = FileType::from_path(path);
        trace!(target: "text.buffer", ?path, lines = buffer.lines.len(), "load");
        Ok(buffer)
    }

    /// Write the buffer back to its file, newline-terminating every line.
    pub fn save(&mut self) -> Result<(), BufferError> {
        let path = self.filename.clone().ok_or(BufferError::NoFileName)?;
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(&path, content)?;
        self.status = BufferStatus::Clean;
        trace!(target: "text.buffer", ?path, lines = self.lines.len(), "save");
        Ok(())
    }

    pub fn line_count(&self) -> i64 {
        self.lines.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, y: i64) -> Option<&str> {
        usize::try_from(y)
            .ok()
            .and_then(|y| self.lines.get(y))
            .map(String::as_str)
    }

    /// Char length of line `y`, or `None` when the line does not exist.
    pub fn line_len(&self, y: i64) -> Option<i64> {
        self.line(y).map(|l| l.chars().count() as i64)
    }

    /// True when `p` addresses a real character (not the insert slot).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && self.line_len(p.y).is_some_and(|len| p.x < len)
    }

    /// True when `p` is a valid insertion slot (`x` may be one past the end).
    pub fn insertable(&self, p: Point) -> bool {
        (self.lines.is_empty() && p == Point::origin())
            || (p.x >= 0 && self.line_len(p.y).is_some_and(|len| p.x <= len))
    }

    /// The character at `p`. The insert slot of a non-final line reads as
    /// the implicit newline separator.
    pub fn get(&self, p: Point) -> Option<char> {
        let line = self.line(p.y)?;
        let x = usize::try_from(p.x).ok()?;
        match line.chars().nth(x) {
            Some(ch) => Some(ch),
            None if p.x == line.chars().count() as i64 && p.y + 1 < self.line_count() => Some('\n'),
            None => None,
        }
    }

    fn writable(&self) -> Result<(), BufferError> {
        if self.status == BufferStatus::Readonly {
            return Err(BufferError::Readonly);
        }
        Ok(())
    }

    /// Every successful mutation dirties the buffer and drops the transient
    /// decoration.
    fn touch(&mut self) {
        if self.status == BufferStatus::Clean || self.status == BufferStatus::NewFile {
            self.status = BufferStatus::Modified;
        }
        self.highlight = None;
    }

    /// Replace the character at `p` in place.
    pub fn set(&mut self, p: Point, ch: char) -> Result<(), BufferError> {
        self.writable()?;
        if !self.contains(p) {
            return Err(BufferError::OutOfRange(p));
        }
        let line = &mut self.lines[p.y as usize];
        let start = byte_of(line, p.x as usize).ok_or(BufferError::OutOfRange(p))?;
        let end = byte_of(line, p.x as usize + 1).unwrap_or(line.len());
        line.replace_range(start..end, &ch.to_string());
        self.touch();
        Ok(())
    }

    /// Insert one character at `p`. A `'\n'` splits the line at `p`.
    pub fn insert_char(&mut self, p: Point, ch: char) -> Result<(), BufferError> {
        self.writable()?;
        if self.lines.is_empty() && p == Point::origin() {
            self.lines.push(String::new());
        }
        if !self.insertable(p) {
            return Err(BufferError::OutOfRange(p));
        }
        let y = p.y as usize;
        if ch == '\n' {
            let split = byte_of(&self.lines[y], p.x as usize).unwrap_or(self.lines[y].len());
            let tail = self.lines[y].split_off(split);
            self.lines.insert(y + 1, tail);
        } else {
            let at = byte_of(&self.lines[y], p.x as usize).unwrap_or(self.lines[y].len());
            self.lines[y].insert(at, ch);
        }
        self.touch();
        Ok(())
    }

    /// Remove the character at `p`. Removing the implicit newline (the
    /// insert slot of a non-final line) joins the next line.
    pub fn remove_char(&mut self, p: Point) -> Result<(), BufferError> {
        self.writable()?;
        if self.contains(p) {
            let line = &mut self.lines[p.y as usize];
            let start = byte_of(line, p.x as usize).unwrap_or(line.len());
            let end = byte_of(line, p.x as usize + 1).unwrap_or(line.len());
            line.replace_range(start..end, "");
            self.touch();
            return Ok(());
        }
        if p.x >= 0 && self.line_len(p.y) == Some(p.x) && p.y + 1 < self.line_count() {
            let next = self.lines.remove(p.y as usize + 1);
            self.lines[p.y as usize].push_str(&next);
            self.touch();
            return Ok(());
        }
        Err(BufferError::OutOfRange(p))
    }

    /// Insert a string at `p`; embedded newlines split lines.
    pub fn insert_string(&mut self, p: Point, s: &str) -> Result<(), BufferError> {
        self.writable()?;
        if s.is_empty() {
            return if self.insertable(p) {
                Ok(())
            } else {
                Err(BufferError::OutOfRange(p))
            };
        }
        if self.lines.is_empty() && p == Point::origin() {
            self.lines.push(String::new());
        }
        if !self.insertable(p) {
            return Err(BufferError::OutOfRange(p));
        }
        let y = p.y as usize;
        let split = byte_of(&self.lines[y], p.x as usize).unwrap_or(self.lines[y].len());
        let tail = self.lines[y].split_off(split);
        let mut fragments = s.split('\n');
        if let Some(first) = fragments.next() {
            self.lines[y].push_str(first);
        }
        let mut at = y;
        for fragment in fragments {
            at += 1;
            self.lines.insert(at, fragment.to_string());
        }
        self.lines[at].push_str(&tail);
        self.touch();
        Ok(())
    }

    /// Remove `n` logical characters starting at `p`, where each implicit
    /// newline counts as one character. Fails without mutating when fewer
    /// than `n` characters exist after `p`.
    pub fn remove_string(&mut self, p: Point, n: i64) -> Result<(), BufferError> {
        self.writable()?;
        if n < 0 || !(self.contains(p) || self.insertable(p)) {
            return Err(BufferError::OutOfRange(p));
        }
        let available =
            motion::absolute_index(self, motion::end_of_buffer(self)) - motion::absolute_index(self, p);
        if n > available {
            return Err(BufferError::OutOfRange(p));
        }
        let mut remaining = n;
        while remaining > 0 {
            let len = self.line_len(p.y).unwrap_or(0);
            let within = (len - p.x).min(remaining);
            if within > 0 {
                let line = &mut self.lines[p.y as usize];
                let start = byte_of(line, p.x as usize).unwrap_or(line.len());
                let end = byte_of(line, (p.x + within) as usize).unwrap_or(line.len());
                line.replace_range(start..end, "");
                remaining -= within;
            } else {
                // consume the implicit newline by joining the next line
                let next = self.lines.remove(p.y as usize + 1);
                self.lines[p.y as usize].push_str(&next);
                remaining -= 1;
            }
        }
        self.touch();
        Ok(())
    }

    /// Duplicate the text from `start` to `end` inclusive; the implicit
    /// newline of a non-final line is included when the range covers it.
    /// Ranges reaching past the end of the buffer are clamped.
    pub fn dupe(&self, start: Point, end: Point) -> Option<String> {
        if start.after(&end) || !(self.contains(start) || self.insertable(start)) {
            return None;
        }
        let mut out = String::new();
        let mut p = start;
        while !p.after(&end) {
            let Some(ch) = self.get(p) else { break };
            out.push(ch);
            let prev = p;
            motion::advance(self, &mut p, 1);
            if p == prev {
                break;
            }
        }
        Some(out)
    }

    /// Duplicate one full line (without its implicit newline).
    pub fn dupe_line(&self, y: i64) -> Option<String> {
        self.line(y).map(str::to_string)
    }

    /// Concatenate line `y + 1` onto line `y`.
    pub fn join_line(&mut self, y: i64) -> Result<(), BufferError> {
        self.writable()?;
        if y < 0 || y + 1 >= self.line_count() {
            return Err(BufferError::OutOfRange(Point::new(0, y)));
        }
        let next = self.lines.remove(y as usize + 1);
        self.lines[y as usize].push_str(&next);
        self.touch();
        Ok(())
    }

    /// Append a line at the end of the buffer (bulk construction; also the
    /// write path of terminal buffers).
    pub fn append_line(&mut self, line: impl Into<String>) -> Result<(), BufferError> {
        self.writable()?;
        self.lines.push(line.into());
        self.touch();
        Ok(())
    }

    /// Drop every line, returning to the empty document.
    pub fn clear_lines(&mut self) -> Result<(), BufferError> {
        self.writable()?;
        self.lines.clear();
        self.touch();
        Ok(())
    }

    /// Replace the content with `n` empty lines.
    pub fn alloc_lines(&mut self, n: i64) -> Result<(), BufferError> {
        self.writable()?;
        if n < 0 {
            return Err(BufferError::OutOfRange(Point::new(0, n)));
        }
        self.lines = vec![String::new(); n as usize];
        self.touch();
        Ok(())
    }

    /// All lines, for rendering and serialization.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Byte offset of char index `x` within `line`; `x == char count` maps to
/// the byte length.
fn byte_of(line: &str, x: usize) -> Option<usize> {
    let mut count = 0usize;
    for (idx, _) in line.char_indices() {
        if count == x {
            return Some(idx);
        }
        count += 1;
    }
    (x == count).then_some(line.len())
}

/// Display name for a path: the working directory prefix is trimmed.
pub fn display_name(path: &Path) -> String {
    if let Ok(cwd) = std::env::current_dir()
        && let Ok(stripped) = path.strip_prefix(&cwd)
    {
        return stripped.display().to_string();
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_drops_trailing_newline_line() {
        let b = Buffer::from_str("t", "one\ntwo\n");
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0), Some("one"));
        assert_eq!(b.line(1), Some("two"));
    }

    #[test]
    fn empty_document_is_legal() {
        let b = Buffer::new("t");
        assert_eq!(b.line_count(), 0);
        assert!(b.line(0).is_none());
        assert!(!b.contains(Point::origin()));
    }

    #[test]
    fn get_reads_implicit_newline() {
        let b = Buffer::from_str("t", "ab\ncd");
        assert_eq!(b.get(Point::new(2, 0)), Some('\n'));
        assert_eq!(b.get(Point::new(2, 1)), None);
        assert_eq!(b.get(Point::new(1, 1)), Some('d'));
    }

    #[test]
    fn insert_char_splits_on_newline() {
        let mut b = Buffer::from_str("t", "abcd");
        b.insert_char(Point::new(2, 0), '\n').unwrap();
        assert_eq!(b.line(0), Some("ab"));
        assert_eq!(b.line(1), Some("cd"));
        assert_eq!(b.status, BufferStatus::Modified);
    }

    #[test]
    fn insert_char_into_empty_document() {
        let mut b = Buffer::new("t");
        b.insert_char(Point::origin(), 'x').unwrap();
        assert_eq!(b.line(0), Some("x"));
    }

    #[test]
    fn remove_char_at_line_end_joins() {
        let mut b = Buffer::from_str("t", "ab\ncd");
        b.remove_char(Point::new(2, 0)).unwrap();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0), Some("abcd"));
    }

    #[test]
    fn remove_at_origin_of_empty_buffer_fails_without_panicking() {
        let mut b = Buffer::new("t");
        assert!(b.remove_char(Point::origin()).is_err());
        assert_eq!(b.line_count(), 0);
    }

    #[test]
    fn readonly_rejects_all_mutation() {
        let mut b = Buffer::from_str("t", "abc");
        b.status = BufferStatus::Readonly;
        assert!(matches!(
            b.insert_char(Point::origin(), 'x'),
            Err(BufferError::Readonly)
        ));
        assert!(matches!(
            b.remove_string(Point::origin(), 1),
            Err(BufferError::Readonly)
        ));
        assert_eq!(b.line(0), Some("abc"));
    }

    #[test]
    fn insert_string_multiline() {
        let mut b = Buffer::from_str("t", "HELLO");
        b.insert_string(Point::new(2, 0), "x\ny").unwrap();
        assert_eq!(b.line(0), Some("HEx"));
        assert_eq!(b.line(1), Some("yLLO"));
    }

    #[test]
    fn remove_string_across_newline() {
        let mut b = Buffer::from_str("t", "abc\ndef");
        b.remove_string(Point::new(2, 0), 3).unwrap();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0), Some("abef"));
    }

    #[test]
    fn remove_string_past_end_fails_atomically() {
        let mut b = Buffer::from_str("t", "abc");
        assert!(b.remove_string(Point::new(1, 0), 5).is_err());
        assert_eq!(b.line(0), Some("abc"));
    }

    #[test]
    fn dupe_inclusive_with_newline() {
        let b = Buffer::from_str("t", "one\ntwo");
        assert_eq!(
            b.dupe(Point::new(0, 0), Point::new(3, 0)),
            Some("one\n".into())
        );
        assert_eq!(
            b.dupe(Point::new(1, 0), Point::new(0, 1)),
            Some("ne\nt".into())
        );
    }

    #[test]
    fn set_replaces_in_place() {
        let mut b = Buffer::from_str("t", "abc");
        b.set(Point::new(1, 0), 'X').unwrap();
        assert_eq!(b.line(0), Some("aXc"));
        assert!(b.set(Point::new(3, 0), 'X').is_err());
    }

    #[test]
    fn edits_clear_transient_highlight() {
        let mut b = Buffer::from_str("t", "abc");
        b.highlight = Some((Point::origin(), Point::new(2, 0)));
        b.insert_char(Point::origin(), 'z').unwrap();
        assert!(b.highlight.is_none());
    }

    #[test]
    fn save_then_load_round_trips_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut b = Buffer::from_str("t", "alpha\nbeta\ngamma");
        b.filename = Some(path.clone());
        b.save().unwrap();
        let reloaded = Buffer::load(&path).unwrap();
        assert_eq!(reloaded.lines(), b.lines());
        assert_eq!(b.status, BufferStatus::Clean);
    }

    #[test]
    fn load_missing_file_is_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let b = Buffer::load(&dir.path().join("absent.rs")).unwrap();
        assert_eq!(b.status, BufferStatus::NewFile);
        assert_eq!(b.file_type, FileType::Rust);
        assert!(b.is_empty());
    }

    #[test]
    fn load_directory_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Buffer::load(dir.path()),
            Err(BufferError::NotRegularFile(_))
        ));
    }

    #[test]
    fn file_type_comment_strings() {
        assert_eq!(FileType::C.comment_string(), Some("//"));
        assert_eq!(FileType::Python.comment_string(), Some("#"));
        assert_eq!(FileType::Plain.comment_string(), None);
    }

    #[test]
    fn unicode_columns_are_char_offsets() {
        let mut b = Buffer::from_str("t", "h\u{e9}llo");
        b.set(Point::new(1, 0), 'e').unwrap();
        assert_eq!(b.line(0), Some("hello"));
        b.insert_char(Point::new(5, 0), '!').unwrap();
        assert_eq!(b.line(0), Some("hello!"));
    }
}
