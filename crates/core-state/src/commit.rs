//! Append-only commit log: reversible edit records with undo/redo chaining.
//!
//! The log is a vector plus a tail index; the doubly-linked chain of older
//! designs is gone. Writing a commit truncates the forward history, appends,
//! and advances the tail. Each commit carries a [`CommitChain`] flag: `undo`
//! reverses the tail commit and keeps reversing predecessors while their
//! flag says `KeepGoing`, so a run of commits ending in `Stop` undoes as a
//! single user-visible step. `redo` is the forward mirror.
//!
//! The chain discipline itself (who writes `KeepGoing`, who terminates with
//! `Stop`) belongs to the action executor.

use core_text::{Buffer, BufferError, Point};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitChain {
    KeepGoing,
    #[default]
    Stop,
}

/// The reversible payload of one atomic edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitKind {
    InsertChar { ch: char },
    RemoveChar { ch: char },
    InsertString { s: String },
    RemoveString { s: String },
    ChangeChar { new: char, old: char },
    ChangeString { new: String, old: String },
}

/// One atomic, reversible edit: what happened at `at`, plus the cursor on
/// both sides so undo/redo restore it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub kind: CommitKind,
    pub at: Point,
    pub cursor_before: Point,
    pub cursor_after: Point,
    pub chain: CommitChain,
}

fn logical_len(s: &str) -> i64 {
    s.chars().count() as i64
}

impl Commit {
    /// Re-apply this commit to the buffer (redo direction).
    fn apply(&self, buffer: &mut Buffer) -> Result<(), BufferError> {
        match &self.kind {
            CommitKind::InsertChar { ch } => buffer.insert_char(self.at, *ch),
            CommitKind::RemoveChar { .. } => buffer.remove_char(self.at),
            CommitKind::InsertString { s } => buffer.insert_string(self.at, s),
            CommitKind::RemoveString { s } => buffer.remove_string(self.at, logical_len(s)),
            CommitKind::ChangeChar { new, .. } => buffer.set(self.at, *new),
            CommitKind::ChangeString { new, old } => {
                buffer.remove_string(self.at, logical_len(old))?;
                buffer.insert_string(self.at, new)
            }
        }
    }

    /// Apply the inverse of this commit (undo direction).
    fn revert(&self, buffer: &mut Buffer) -> Result<(), BufferError> {
        match &self.kind {
            CommitKind::InsertChar { .. } => buffer.remove_char(self.at),
            CommitKind::RemoveChar { ch } => buffer.insert_char(self.at, *ch),
            CommitKind::InsertString { s } => buffer.remove_string(self.at, logical_len(s)),
            CommitKind::RemoveString { s } => buffer.insert_string(self.at, s),
            CommitKind::ChangeChar { old, .. } => buffer.set(self.at, *old),
            CommitKind::ChangeString { new, old } => {
                buffer.remove_string(self.at, logical_len(new))?;
                buffer.insert_string(self.at, old)
            }
        }
    }
}

/// Per-buffer append-only history with a tail cursor.
#[derive(Debug, Default)]
pub struct CommitLog {
    commits: Vec<Commit>,
    /// Number of applied commits; `commits[..tail]` is the undo history,
    /// `commits[tail..]` the redo branch.
    tail: usize,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Append a commit, discarding any redo branch.
    pub fn push(&mut self, commit: Commit) {
        self.commits.truncate(self.tail);
        trace!(
            target: "state.commit",
            tail = self.tail,
            kind = ?commit.kind,
            chain = ?commit.chain,
            "push"
        );
        self.commits.push(commit);
        self.tail += 1;
    }

    pub fn push_insert_char(
        &mut self,
        at: Point,
        before: Point,
        after: Point,
        ch: char,
        chain: CommitChain,
    ) {
        self.push(Commit {
            kind: CommitKind::InsertChar { ch },
            at,
            cursor_before: before,
            cursor_after: after,
            chain,
        });
    }

    pub fn push_remove_char(
        &mut self,
        at: Point,
        before: Point,
        after: Point,
        ch: char,
        chain: CommitChain,
    ) {
        self.push(Commit {
            kind: CommitKind::RemoveChar { ch },
            at,
            cursor_before: before,
            cursor_after: after,
            chain,
        });
    }

    pub fn push_insert_string(
        &mut self,
        at: Point,
        before: Point,
        after: Point,
        s: impl Into<String>,
        chain: CommitChain,
    ) {
        self.push(Commit {
            kind: CommitKind::InsertString { s: s.into() },
            at,
            cursor_before: before,
            cursor_after: after,
            chain,
        });
    }

    pub fn push_remove_string(
        &mut self,
        at: Point,
        before: Point,
        after: Point,
        s: impl Into<String>,
        chain: CommitChain,
    ) {
        self.push(Commit {
            kind: CommitKind::RemoveString { s: s.into() },
            at,
            cursor_before: before,
            cursor_after: after,
            chain,
        });
    }

    pub fn push_change_char(
        &mut self,
        at: Point,
        before: Point,
        after: Point,
        new: char,
        old: char,
        chain: CommitChain,
    ) {
        self.push(Commit {
            kind: CommitKind::ChangeChar { new, old },
            at,
            cursor_before: before,
            cursor_after: after,
            chain,
        });
    }

    /// Overwrite the chain flag of the tail commit (how Escape terminates an
    /// insert run).
    pub fn set_tail_chain(&mut self, chain: CommitChain) {
        if self.tail > 0 {
            self.commits[self.tail - 1].chain = chain;
        }
    }

    /// Rewrite chain flags so everything from `from_tail` onward undoes as
    /// one step (macro recording collapse).
    pub fn rewrite_chain_from(&mut self, from_tail: usize) {
        if self.tail == 0 || from_tail >= self.tail {
            return;
        }
        for commit in &mut self.commits[from_tail..self.tail - 1] {
            commit.chain = CommitChain::KeepGoing;
        }
        self.commits[self.tail - 1].chain = CommitChain::Stop;
        trace!(target: "state.commit", from_tail, tail = self.tail, "rewrite_chain");
    }

    /// Undo one chain. Returns whether anything was undone; the cursor
    /// lands on the `cursor_before` of the earliest commit reverted.
    pub fn undo(&mut self, buffer: &mut Buffer, cursor: &mut Point) -> Result<bool, BufferError> {
        if self.tail == 0 {
            return Ok(false);
        }
        loop {
            let commit = &self.commits[self.tail - 1];
            commit.revert(buffer)?;
            *cursor = commit.cursor_before;
            self.tail -= 1;
            trace!(target: "state.commit", tail = self.tail, "undo_step");
            if self.tail == 0 || self.commits[self.tail - 1].chain == CommitChain::Stop {
                break;
            }
        }
        Ok(true)
    }

    /// Redo one chain. Returns whether anything was redone; the cursor
    /// lands on the `cursor_after` of the last commit re-applied.
    pub fn redo(&mut self, buffer: &mut Buffer, cursor: &mut Point) -> Result<bool, BufferError> {
        if self.tail == self.commits.len() {
            return Ok(false);
        }
        loop {
            let commit = &self.commits[self.tail];
            commit.apply(buffer)?;
            *cursor = commit.cursor_after;
            self.tail += 1;
            trace!(target: "state.commit", tail = self.tail, "redo_step");
            if self.tail == self.commits.len()
                || self.commits[self.tail - 1].chain == CommitChain::Stop
            {
                break;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    #[test]
    fn undo_of_one_commit_is_identity() {
        let mut buffer = Buffer::from_str("t", "hello");
        let mut log = CommitLog::new();
        let mut cursor = Point::origin();
        buffer.insert_char(Point::new(5, 0), '!').unwrap();
        log.push_insert_char(
            Point::new(5, 0),
            Point::new(4, 0),
            Point::new(5, 0),
            '!',
            CommitChain::Stop,
        );
        assert!(log.undo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some("hello"));
        assert_eq!(cursor, Point::new(4, 0));
    }

    #[test]
    fn chained_commits_undo_as_one_step() {
        let mut buffer = Buffer::from_str("t", "");
        let mut log = CommitLog::new();
        let mut cursor = Point::origin();
        for (i, ch) in "abc".chars().enumerate() {
            let at = Point::new(i as i64, 0);
            buffer.insert_char(at, ch).unwrap();
            log.push_insert_char(
                at,
                at,
                Point::new(i as i64 + 1, 0),
                ch,
                CommitChain::KeepGoing,
            );
        }
        log.set_tail_chain(CommitChain::Stop);
        assert_eq!(buffer.line(0), Some("abc"));
        assert!(log.undo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some(""));
        assert_eq!(cursor, Point::origin());
        assert!(log.redo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some("abc"));
        assert_eq!(cursor, Point::new(3, 0));
    }

    #[test]
    fn push_truncates_redo_branch() {
        let mut buffer = Buffer::from_str("t", "x");
        let mut log = CommitLog::new();
        let mut cursor = Point::origin();
        buffer.insert_char(Point::new(1, 0), 'y').unwrap();
        log.push_insert_char(
            Point::new(1, 0),
            Point::new(0, 0),
            Point::new(1, 0),
            'y',
            CommitChain::Stop,
        );
        log.undo(&mut buffer, &mut cursor).unwrap();
        assert_eq!(log.len(), 1);
        buffer.insert_char(Point::new(1, 0), 'z').unwrap();
        log.push_insert_char(
            Point::new(1, 0),
            Point::new(0, 0),
            Point::new(1, 0),
            'z',
            CommitChain::Stop,
        );
        assert_eq!(log.len(), 1);
        assert!(!log.redo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some("xz"));
    }

    #[test]
    fn remove_string_commit_round_trips() {
        let mut buffer = Buffer::from_str("t", "one\ntwo\nthree");
        let mut log = CommitLog::new();
        let mut cursor = Point::new(0, 1);
        // delete "two\n"
        buffer.remove_string(Point::new(0, 1), 4).unwrap();
        log.push_remove_string(
            Point::new(0, 1),
            Point::new(0, 1),
            Point::new(0, 1),
            "two\n",
            CommitChain::Stop,
        );
        assert_eq!(buffer.line_count(), 2);
        log.undo(&mut buffer, &mut cursor).unwrap();
        assert_eq!(buffer.lines(), ["one", "two", "three"]);
        log.redo(&mut buffer, &mut cursor).unwrap();
        assert_eq!(buffer.lines(), ["one", "three"]);
    }

    #[test]
    fn rewrite_chain_collapses_history_span() {
        let mut buffer = Buffer::from_str("t", "");
        let mut log = CommitLog::new();
        let mut cursor = Point::origin();
        for (i, ch) in "abcd".chars().enumerate() {
            let at = Point::new(i as i64, 0);
            buffer.insert_char(at, ch).unwrap();
            log.push_insert_char(at, at, Point::new(i as i64 + 1, 0), ch, CommitChain::Stop);
        }
        // collapse the last three commits into one undo step
        log.rewrite_chain_from(1);
        assert!(log.undo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some("a"));
        assert!(log.undo(&mut buffer, &mut cursor).unwrap());
        assert_eq!(buffer.line(0), Some(""));
    }
}
