//! The modal editing pipeline: key -> action -> range -> mutation -> commit.
//!
//! One key at a time flows through [`key_handler::handle_key`]. In Normal
//! and the visual modes the pending key buffer is re-parsed by
//! [`parser::parse_action`] into an [`Action`]; the range resolver computes
//! the affected text region; the executor mutates the buffer, writes
//! commits with the chain discipline of the commit log, updates registers,
//! and emits the next mode. Insert mode bypasses the grammar and edits
//! directly, chaining its commits so one undo reverses the whole insert
//! run. The macro recorder mirrors the key stream alongside.

use core_keymap::{Key, KeySeq};
use core_state::{
    FindCharState, MacroRecord, Macros, Mode, SearchState, Yanks,
};
use core_text::{Direction, Point};

pub mod executor;
pub mod key_handler;
pub mod parser;
pub mod range;

pub use key_handler::{KeyOutcome, handle_key};
pub use parser::{Parse, ParseContext, parse_action};
pub use range::{ActionRange, resolve_range};

/// The motion part of an action: what region of text it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionKind {
    /// No movement; the action targets the cursor position itself.
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
    /// `w` / `W`: start of the next word.
    WordLittle,
    WordBig,
    /// `b` / `B`: beginning of the current or previous word.
    WordBeginningLittle,
    WordBeginningBig,
    /// `e` / `E`: end of the current or next word.
    WordEndLittle,
    WordEndBig,
    /// The whole cursor line (`dd`, `yy`, `>>`, ...).
    Line,
    LineUp,
    LineDown,
    /// Soft beginning through hard end of the line (`cc`, `S`).
    LineSoft,
    FindForward(char),
    FindBackward(char),
    UntilForward(char),
    UntilBackward(char),
    /// `;`: repeat the last find-char motion.
    RepeatFind,
    /// `,`: repeat the last find-char motion, reversed.
    ReverseFind,
    BeginningOfFile,
    BeginningOfLineHard,
    BeginningOfLineSoft,
    /// `A` target: one past the last character.
    EndOfLinePassed,
    EndOfLineHard,
    EndOfLineSoft,
    EndOfFile,
    InsidePair(char),
    InsideWordLittle,
    InsideWordBig,
    AroundPair(char),
    AroundWordLittle,
    AroundWordBig,
    /// Captured visual selection: distance from cursor to anchor.
    VisualRange { length: i64, start_after: bool },
    VisualLine { lines: i64, start_after: bool },
    VisualSwapWithCursor,
    /// `*` / `#`: search for the word under the cursor.
    SearchWord(Direction),
    /// `n`: repeat the stored search in its stored direction.
    RepeatSearch,
    /// `N`: repeat the stored search against its stored direction.
    ReverseSearch,
    MatchingPair,
    NextBlankLine,
    PrevBlankLine,
    GotoMark(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    pub kind: MotionKind,
    pub multiplier: i64,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            kind: MotionKind::None,
            multiplier: 1,
        }
    }
}

/// The verb part of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeKind {
    /// Pure movement (or a bare mode switch).
    #[default]
    Motion,
    Delete,
    ChangeChar(char),
    PasteBefore,
    PasteAfter,
    Yank,
    Indent,
    Unindent,
    Comment,
    Uncomment,
    FlipCase,
    JoinLine,
    OpenAbove,
    OpenBelow,
    SetMark(char),
    /// `q`: toggle recording. Carries the register when starting; `None`
    /// stops the recording in progress.
    RecordMacro(Option<char>),
    PlayMacro(char),
}

/// A fully parsed editing intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub multiplier: i64,
    pub motion: Motion,
    pub change: ChangeKind,
    /// Mode the executor switches to after applying the action.
    pub end_mode: Mode,
    /// Whether a delete also writes the yank registers.
    pub yank: bool,
    /// Explicit yank register from a `"x` prefix.
    pub reg: Option<char>,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            multiplier: 1,
            motion: Motion::default(),
            change: ChangeKind::Motion,
            end_mode: Mode::Normal,
            yank: false,
            reg: None,
        }
    }
}

/// Interactive `/` or `?` pattern entry in progress.
#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub line: String,
    pub direction: Direction,
}

/// Tunables the executor needs; sourced from configuration.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// The tab-equivalent inserted by indent and the Tab key.
    pub tab_string: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            tab_string: "     ".into(),
        }
    }
}

/// Process-wide modal state threaded through every key.
#[derive(Debug, Default)]
pub struct VimState {
    pub mode: Mode,
    /// Fixed endpoint of the visual selection opposite the cursor.
    pub visual_start: Point,
    /// Cursor position when Insert was entered, for coalesced undo.
    pub insert_start: Option<Point>,
    /// Key prefix awaiting more input.
    pub pending: KeySeq,
    /// Last completed action, replayed by `.`.
    pub last_action: Option<Action>,
    /// Keys typed during the last insert session (without the Escape).
    pub last_insert_keys: Vec<Key>,
    /// Active macro recording, if any.
    pub recording: Option<MacroRecord>,
    /// Register currently being played back, if any.
    pub playing_macro: Option<char>,
    pub find_char: Option<FindCharState>,
    pub search: SearchState,
    pub search_entry: Option<SearchEntry>,
    pub yanks: Yanks,
    pub macros: Macros,
    /// Most recent user-facing status message.
    pub last_message: Option<String>,
}

impl VimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(target: "actions.message", %text, "message");
        self.last_message = Some(text);
    }

    /// Register currently being recorded to, if any.
    pub fn recording_register(&self) -> Option<char> {
        self.recording.as_ref().map(|r| r.register)
    }
}
