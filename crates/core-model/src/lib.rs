//! Editor model: the owning buffer collection, views, the message stream,
//! and the display-side collaborator contracts.
//!
//! Buffers live in exactly one place, the [`Buffers`] collection; everything
//! else refers to them through [`BufferId`]. Each buffer record bundles the
//! text with its editing state (commit log, marks, preferred column), so
//! there is no owner/payload cycle and no shared mutation. Views observe a
//! buffer by id and keep their own cursor and scroll offset.

use core_actions::VimState;
use core_state::BufferState;
use core_text::{Buffer, BufferError, Point};
use std::path::Path;
use tracing::{debug, info};

/// Stable handle to a buffer in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

/// A buffer plus the editing state that lives and dies with it.
#[derive(Debug, Default)]
pub struct BufferRecord {
    pub buffer: Buffer,
    pub state: BufferState,
}

/// The owning collection. Never empty: deleting the last buffer installs a
/// fresh scratch buffer in its place.
#[derive(Debug)]
pub struct Buffers {
    records: Vec<(BufferId, BufferRecord)>,
    next_id: usize,
}

impl Default for Buffers {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffers {
    /// Start with a single unnamed scratch buffer.
    pub fn new() -> Self {
        let mut buffers = Self {
            records: Vec::new(),
            next_id: 0,
        };
        buffers.add(Buffer::new("[scratch]"));
        buffers
    }

    pub fn add(&mut self, buffer: Buffer) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        debug!(target: "model.buffers", ?id, name = %buffer.name, "add");
        self.records.push((
            id,
            BufferRecord {
                buffer,
                state: BufferState::default(),
            },
        ));
        id
    }

    /// Load a file into a new buffer and return its id.
    pub fn open(&mut self, path: &Path) -> Result<BufferId, BufferError> {
        let buffer = Buffer::load(path)?;
        Ok(self.add(buffer))
    }

    pub fn get(&self, id: BufferId) -> Option<&BufferRecord> {
        self.records.iter().find(|(i, _)| *i == id).map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut BufferRecord> {
        self.records
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, r)| r)
    }

    /// Remove a buffer. The collection is never left empty: removing the
    /// last buffer installs a fresh scratch buffer and returns its id.
    pub fn remove(&mut self, id: BufferId) -> Option<BufferId> {
        let index = self.records.iter().position(|(i, _)| *i == id)?;
        self.records.remove(index);
        info!(target: "model.buffers", ?id, "remove");
        if self.records.is_empty() {
            return Some(self.add(Buffer::new("[scratch]")));
        }
        Some(self.records[index.min(self.records.len() - 1)].0)
    }

    pub fn ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.records.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BufferId, &BufferRecord)> {
        self.records.iter().map(|(id, r)| (*id, r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a buffer by its display name.
    pub fn find_by_name(&self, name: &str) -> Option<BufferId> {
        self.records
            .iter()
            .find(|(_, r)| r.buffer.name == name)
            .map(|(id, _)| *id)
    }
}

/// One window onto a buffer: cursor plus scroll offset. The cursor here is
/// authoritative while the view is active; it is written back to the
/// buffer record when focus moves away.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub buffer: BufferId,
    pub cursor: Point,
    pub scroll: Point,
}

impl View {
    pub fn new(buffer: BufferId) -> Self {
        Self {
            buffer,
            cursor: Point::origin(),
            scroll: Point::origin(),
        }
    }

    /// Keep the cursor inside the `width` x `height` window by scrolling.
    pub fn follow_cursor(&mut self, width: i64, height: i64) {
        if height > 0 {
            if self.cursor.y < self.scroll.y {
                self.scroll.y = self.cursor.y;
            } else if self.cursor.y >= self.scroll.y + height {
                self.scroll.y = self.cursor.y - height + 1;
            }
        }
        if width > 0 {
            if self.cursor.x < self.scroll.x {
                self.scroll.x = self.cursor.x;
            } else if self.cursor.x >= self.scroll.x + width {
                self.scroll.x = self.cursor.x - width + 1;
            }
        }
    }
}

/// The user-visible message stream (status line history).
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<String>,
}

impl MessageLog {
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "model.messages", %message, "push");
        self.entries.push(message);
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// One styled span on a line, produced by a colorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleSpan {
    /// Char column the span starts at.
    pub start: i64,
    /// Char column one past the end.
    pub end: i64,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Normal,
    Keyword,
    Comment,
    String,
    Highlight,
}

/// Display-side collaborator: consulted per visible line, purely for
/// styling. Implementations must not mutate anything.
pub trait SyntaxColorizer {
    fn colorize(&self, buffer: &Buffer, line: i64, range: (i64, i64)) -> Vec<StyleSpan>;
}

/// The do-nothing colorizer used until a language-aware one is wired in.
#[derive(Debug, Default)]
pub struct PlainColorizer;

impl SyntaxColorizer for PlainColorizer {
    fn colorize(&self, _buffer: &Buffer, _line: i64, range: (i64, i64)) -> Vec<StyleSpan> {
        vec![StyleSpan {
            start: range.0,
            end: range.1,
            style: SpanStyle::Normal,
        }]
    }
}

/// Everything the event loop threads through one iteration: buffers, the
/// active view, modal state, and the message stream. Replaces the
/// process-wide globals of older designs.
pub struct EditorContext {
    pub buffers: Buffers,
    pub view: View,
    pub vim: VimState,
    pub messages: MessageLog,
}

impl EditorContext {
    pub fn new() -> Self {
        let buffers = Buffers::new();
        let first = buffers
            .ids()
            .next()
            .unwrap_or(BufferId(0));
        Self {
            buffers,
            view: View::new(first),
            vim: VimState::new(),
            messages: MessageLog::default(),
        }
    }

    /// Switch the active view to another buffer, saving and restoring the
    /// per-buffer cursor.
    pub fn focus(&mut self, id: BufferId) {
        if self.buffers.get(id).is_none() {
            return;
        }
        if let Some(record) = self.buffers.get_mut(self.view.buffer) {
            record.buffer.cursor = self.view.cursor;
        }
        let cursor = self
            .buffers
            .get(id)
            .map(|r| r.buffer.cursor)
            .unwrap_or(Point::origin());
        self.view = View::new(id);
        self.view.cursor = cursor;
    }

    /// Surface the pipeline's latest status message into the message log.
    pub fn drain_message(&mut self) {
        if let Some(message) = self.vim.last_message.take() {
            self.messages.push(message);
        }
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new()
    }
}
