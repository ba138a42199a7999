//! Macro recording state.
//!
//! While a register is being recorded, every user key is mirrored into a
//! record stream, and each completed action contributes a [`MacroCommit`]
//! node holding a copy of the keys that produced it. Motion nodes carry
//! `chain = true`: they fuse with the following mutating action, so an
//! undo during recording strips trailing motions plus exactly one mutation
//! from the record, keeping the eventual macro consistent with the buffer.

use core_keymap::Key;
use tracing::trace;

/// One completed action inside a recording: the keys that produced it and
/// whether it chains onto the next node.
#[derive(Debug, Clone)]
pub struct MacroCommit {
    pub keys: Vec<Key>,
    pub chain: bool,
}

/// An in-progress macro recording for one register.
#[derive(Debug)]
pub struct MacroRecord {
    pub register: char,
    /// Commit-log tail at the moment recording started; on stop the chain
    /// flags from here are rewritten so the whole recording undoes at once.
    pub start_commit_tail: usize,
    keys: Vec<Key>,
    commits: Vec<MacroCommit>,
    /// Number of commit nodes currently represented in `keys`; nodes past
    /// this index are the redo branch of an in-recording undo.
    cursor: usize,
    pending: Vec<Key>,
}

impl MacroRecord {
    pub fn start(register: char, start_commit_tail: usize) -> Self {
        trace!(target: "state.record", reg = %register, start_commit_tail, "record_start");
        Self {
            register,
            start_commit_tail,
            keys: Vec::new(),
            commits: Vec::new(),
            cursor: 0,
            pending: Vec::new(),
        }
    }

    /// Mirror one user key into the record stream and the pending node.
    pub fn push_key(&mut self, key: Key) {
        self.commits.truncate(self.cursor);
        self.keys.push(key);
        self.pending.push(key);
    }

    /// Seal the pending keys into a commit node. `chain` marks nodes that
    /// fuse with the next one (motions, which write no buffer commits).
    pub fn finish_action(&mut self, chain: bool) {
        self.commits.truncate(self.cursor);
        let keys = std::mem::take(&mut self.pending);
        trace!(target: "state.record", keys = keys.len(), chain, "record_commit");
        self.commits.push(MacroCommit { keys, chain });
        self.cursor = self.commits.len();
    }

    /// Strip the record back across one undo: trailing motion nodes plus
    /// one mutating node. Returns false when there is nothing left to
    /// strip, meaning the recording should stop entirely.
    pub fn undo_step(&mut self) -> bool {
        self.pending.clear();
        if self.cursor == 0 {
            return false;
        }
        loop {
            self.cursor -= 1;
            let node = &self.commits[self.cursor];
            let new_len = self.keys.len().saturating_sub(node.keys.len());
            self.keys.truncate(new_len);
            let stop = !node.chain || self.cursor == 0;
            if stop {
                break;
            }
        }
        true
    }

    /// Re-append the keys of the next retained node after a redo.
    pub fn redo_step(&mut self) {
        self.pending.clear();
        while self.cursor < self.commits.len() {
            let node = self.commits[self.cursor].clone();
            self.keys.extend(node.keys.iter().copied());
            self.cursor += 1;
            if !node.chain {
                break;
            }
        }
    }

    /// The recorded key stream (macro body).
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Consume the recording into its macro body.
    pub fn finish(self) -> Vec<Key> {
        self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<Key> {
        s.chars().map(Key::Char).collect()
    }

    #[test]
    fn records_keys_per_action() {
        let mut record = MacroRecord::start('a', 0);
        for key in chars("dw") {
            record.push_key(key);
        }
        record.finish_action(false);
        assert_eq!(record.keys(), chars("dw").as_slice());
    }

    #[test]
    fn undo_strips_trailing_motions_and_one_mutation() {
        let mut record = MacroRecord::start('a', 0);
        record.push_key(Key::Char('x'));
        record.finish_action(false); // mutation
        record.push_key(Key::Char('j'));
        record.finish_action(true); // motion
        record.push_key(Key::Char('x'));
        record.finish_action(false); // mutation
        assert_eq!(record.keys().len(), 3);
        // one undo drops the final mutation only
        assert!(record.undo_step());
        assert_eq!(record.keys(), chars("xj").as_slice());
        // next undo drops the motion and the first mutation
        assert!(record.undo_step());
        assert!(record.keys().is_empty());
        assert!(!record.undo_step());
    }

    #[test]
    fn redo_restores_retained_nodes() {
        let mut record = MacroRecord::start('a', 0);
        record.push_key(Key::Char('x'));
        record.finish_action(false);
        record.undo_step();
        assert!(record.keys().is_empty());
        record.redo_step();
        assert_eq!(record.keys(), chars("x").as_slice());
    }

    #[test]
    fn new_action_discards_redo_branch() {
        let mut record = MacroRecord::start('a', 0);
        record.push_key(Key::Char('x'));
        record.finish_action(false);
        record.undo_step();
        record.push_key(Key::Char('r'));
        record.push_key(Key::Char('y'));
        record.finish_action(false);
        assert_eq!(record.keys(), chars("ry").as_slice());
        record.redo_step(); // nothing retained
        assert_eq!(record.keys(), chars("ry").as_slice());
    }
}
