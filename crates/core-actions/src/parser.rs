//! Resumable command parser: pending keys -> Action.
//!
//! The grammar, in order: optional action multiplier (a leading lone `0` is
//! the hard-beginning-of-line motion instead), optional `"x` register
//! selector, a change verb (possibly with an immediate operand such as
//! `r<ch>` or `m<ch>`), optional motion multiplier, and a motion. Visual
//! modes pre-load the selection as the motion; most verbs leave it in
//! place, while a few override it (`J`, `;`, `o`).
//!
//! The parser is a pure function over the supplied key slice: it owns no
//! buffer or mode state beyond what arrives in the [`ParseContext`]. Every
//! proper prefix of a sequence that parses to `Complete` answers
//! `Continue` (or `Invalid`); no prefix ever answers `Complete`.

use core_keymap::Key;
use core_state::Mode;
use core_text::{Buffer, Direction, Point, motion as text_motion};

use crate::{Action, ChangeKind, MotionKind};

/// Everything the grammar needs from the surrounding state, per call.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub mode: Mode,
    pub buffer: &'a Buffer,
    pub cursor: Point,
    pub visual_start: Point,
    /// Whether a macro recording is active (`q` completes bare then).
    pub recording: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parse {
    /// Syntactically rejected; the caller clears the pending keys.
    Invalid,
    /// A legal prefix; wait for more keys.
    Continue,
    /// A full action is ready.
    Complete(Action),
}

const MULTIPLIER_CAP: i64 = 999_999;

fn read_number(keys: &[Key], from: usize) -> (i64, usize) {
    let mut value = 0i64;
    let mut read = 0;
    while let Some(Key::Char(c)) = keys.get(from + read) {
        let Some(digit) = c.to_digit(10) else { break };
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit))
            .min(MULTIPLIER_CAP);
        read += 1;
    }
    (value, read)
}

fn printable(key: Key) -> Option<char> {
    match key {
        Key::Char(c) if !c.is_control() => Some(c),
        _ => None,
    }
}

/// Parse the pending key buffer into an action.
pub fn parse_action(keys: &[Key], ctx: &ParseContext) -> Parse {
    let mut action = Action::default();
    let mut visual_mode = false;
    let mut get_motion = true;
    let mut i = 0usize;

    // action multiplier; a lone leading 0 is the hard-BOL motion
    let (multiplier, digits) = read_number(keys, i);
    if digits > 0 {
        if multiplier == 0 {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::BeginningOfLineHard;
            action.end_mode = ctx.mode;
            return Parse::Complete(action);
        }
        action.multiplier = multiplier;
        i += digits;
    }

    // visual selections pre-load the motion; verbs below may override it
    match ctx.mode {
        Mode::VisualRange => {
            visual_mode = true;
            get_motion = false;
            let (first, last) = Point::sorted(ctx.visual_start, ctx.cursor);
            let length = text_motion::length_between(ctx.buffer, first, last) - 1;
            action.motion.kind = MotionKind::VisualRange {
                length,
                start_after: ctx.visual_start.after(&ctx.cursor),
            };
        }
        Mode::VisualLine => {
            visual_mode = true;
            get_motion = false;
            action.motion.kind = MotionKind::VisualLine {
                lines: ctx.visual_start.y - ctx.cursor.y,
                start_after: ctx.visual_start.after(&ctx.cursor),
            };
        }
        _ => {}
    }

    // optional yank register selector
    if keys.get(i) == Some(&Key::Char('"')) {
        i += 1;
        match keys.get(i) {
            None => return Parse::Continue,
            Some(&key) => match printable(key) {
                Some(c) if c != '?' => {
                    action.reg = Some(c);
                    i += 1;
                }
                _ => return Parse::Invalid,
            },
        }
    }

    // the change verb; remembers its key for two-key forms (dd, cc, gg, ...)
    let change_char = keys.get(i).and_then(|k| k.as_char());
    let mut motion_from = i + 1;
    match change_char {
        Some('d') => {
            action.change = ChangeKind::Delete;
            action.yank = true;
        }
        Some('D') => {
            action.change = ChangeKind::Delete;
            action.motion.kind = MotionKind::EndOfLineHard;
            action.yank = true;
            get_motion = false;
        }
        Some('c') => {
            action.change = ChangeKind::Delete;
            action.end_mode = Mode::Insert;
            action.yank = true;
        }
        Some('C') => {
            action.change = ChangeKind::Delete;
            action.motion.kind = MotionKind::EndOfLineHard;
            action.end_mode = Mode::Insert;
            action.yank = true;
            get_motion = false;
        }
        Some('a') if ctx.mode != Mode::VisualRange => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::Right;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('A') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::EndOfLinePassed;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('s') => {
            action.change = ChangeKind::Delete;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('S') => {
            action.change = ChangeKind::Delete;
            action.motion.kind = MotionKind::LineSoft;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('i') if ctx.mode != Mode::VisualRange => {
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('v') => {
            action.end_mode = Mode::VisualRange;
            get_motion = false;
        }
        Some('V') => {
            action.end_mode = Mode::VisualLine;
            get_motion = false;
        }
        Some('I') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::BeginningOfLineSoft;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('x') => {
            action.change = ChangeKind::Delete;
            get_motion = false;
        }
        Some('r') => {
            let Some(&key) = keys.get(i + 1) else {
                return Parse::Continue;
            };
            let Some(ch) = printable(key) else {
                return Parse::Invalid;
            };
            action.change = ChangeKind::ChangeChar(ch);
            get_motion = false;
        }
        Some('g') => match keys.get(i + 1).and_then(|k| k.as_char()) {
            Some('c') => {
                action.change = ChangeKind::Comment;
            }
            Some('u') => {
                action.change = ChangeKind::Uncomment;
            }
            None => return Parse::Continue,
            Some(_) => {
                action.change = ChangeKind::Motion;
                action.end_mode = ctx.mode;
                if visual_mode {
                    get_motion = true;
                }
            }
        },
        Some('p') => {
            action.change = ChangeKind::PasteAfter;
            get_motion = false;
        }
        Some('P') => {
            action.change = ChangeKind::PasteBefore;
            get_motion = false;
        }
        Some('y') => {
            action.change = ChangeKind::Yank;
        }
        Some('Y') => {
            action.change = ChangeKind::Yank;
            action.motion.kind = MotionKind::EndOfLineHard;
            get_motion = false;
        }
        Some('>') => {
            action.change = ChangeKind::Indent;
        }
        Some('<') => {
            action.change = ChangeKind::Unindent;
        }
        Some('~') => {
            action.change = ChangeKind::FlipCase;
        }
        Some(';') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::RepeatFind;
            get_motion = false;
        }
        Some(',') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::ReverseFind;
            get_motion = false;
        }
        Some('J') => {
            action.change = ChangeKind::JoinLine;
            action.motion.kind = MotionKind::EndOfLineHard;
            get_motion = false;
        }
        Some('O') if visual_mode => {
            action.motion.kind = MotionKind::VisualSwapWithCursor;
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('o') if visual_mode => {
            action.motion.kind = MotionKind::VisualSwapWithCursor;
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('O') => {
            action.change = ChangeKind::OpenAbove;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('o') => {
            action.change = ChangeKind::OpenBelow;
            action.end_mode = Mode::Insert;
            get_motion = false;
        }
        Some('q') => {
            if ctx.recording {
                action.change = ChangeKind::RecordMacro(None);
            } else {
                let Some(&key) = keys.get(i + 1) else {
                    return Parse::Continue;
                };
                let Some(reg) = printable(key) else {
                    return Parse::Invalid;
                };
                action.change = ChangeKind::RecordMacro(Some(reg));
            }
            get_motion = false;
        }
        Some('@') => {
            let Some(&key) = keys.get(i + 1) else {
                return Parse::Continue;
            };
            let Some(reg) = printable(key) else {
                return Parse::Invalid;
            };
            action.change = ChangeKind::PlayMacro(reg);
            get_motion = false;
        }
        Some('%') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::MatchingPair;
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('*') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::SearchWord(Direction::Down);
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('#') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::SearchWord(Direction::Up);
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('n') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::RepeatSearch;
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('N') => {
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::ReverseSearch;
            action.end_mode = ctx.mode;
            get_motion = false;
        }
        Some('m') => {
            let Some(&key) = keys.get(i + 1) else {
                return Parse::Continue;
            };
            let Some(reg) = printable(key) else {
                return Parse::Invalid;
            };
            action.change = ChangeKind::SetMark(reg);
            get_motion = false;
        }
        Some('\'') => {
            let Some(&key) = keys.get(i + 1) else {
                return Parse::Continue;
            };
            let Some(reg) = printable(key) else {
                return Parse::Invalid;
            };
            action.change = ChangeKind::Motion;
            action.motion.kind = MotionKind::GotoMark(reg);
            get_motion = false;
        }
        _ => {
            // anything else (plain motions, arrow keys) re-reads this key
            // as the motion
            action.change = ChangeKind::Motion;
            action.end_mode = ctx.mode;
            motion_from = i;
            if visual_mode {
                get_motion = true;
            }
        }
    }

    if get_motion {
        let mut m = motion_from;
        let (multiplier, digits) = read_number(keys, m);
        if digits > 0 {
            if multiplier == 0 {
                // all zeroes: re-read the final 0 as the BOL motion
                action.motion.multiplier = 1;
                m += digits - 1;
            } else {
                action.motion.multiplier = multiplier;
                m += digits;
            }
        }

        let Some(&motion_key) = keys.get(m) else {
            return Parse::Continue;
        };
        action.motion.kind = match motion_key {
            Key::Left => MotionKind::Left,
            Key::Right => MotionKind::Right,
            Key::Up if action.change == ChangeKind::Motion => MotionKind::Up,
            Key::Up => MotionKind::LineUp,
            Key::Down if action.change == ChangeKind::Motion => MotionKind::Down,
            Key::Down => MotionKind::LineDown,
            Key::Char(c) => match c {
                'h' => MotionKind::Left,
                'l' => MotionKind::Right,
                'j' if action.change == ChangeKind::Motion => MotionKind::Down,
                'j' => MotionKind::LineDown,
                'k' if action.change == ChangeKind::Motion => MotionKind::Up,
                'k' => MotionKind::LineUp,
                'w' => MotionKind::WordLittle,
                'W' => MotionKind::WordBig,
                'b' => MotionKind::WordBeginningLittle,
                'B' => MotionKind::WordBeginningBig,
                'e' => MotionKind::WordEndLittle,
                'E' => MotionKind::WordEndBig,
                '$' => MotionKind::EndOfLineHard,
                '^' => MotionKind::BeginningOfLineSoft,
                '0' => MotionKind::BeginningOfLineHard,
                'G' => MotionKind::EndOfFile,
                '}' => MotionKind::NextBlankLine,
                '{' => MotionKind::PrevBlankLine,
                'f' | 'F' | 't' | 'T' => {
                    let Some(&key) = keys.get(m + 1) else {
                        return Parse::Continue;
                    };
                    let Some(target) = printable(key) else {
                        return Parse::Invalid;
                    };
                    match c {
                        'f' => MotionKind::FindForward(target),
                        'F' => MotionKind::FindBackward(target),
                        't' => MotionKind::UntilForward(target),
                        _ => MotionKind::UntilBackward(target),
                    }
                }
                'i' | 'a' => {
                    let Some(&key) = keys.get(m + 1) else {
                        return Parse::Continue;
                    };
                    let inside = c == 'i';
                    match key.as_char() {
                        Some('w') if inside => MotionKind::InsideWordLittle,
                        Some('w') => MotionKind::AroundWordLittle,
                        Some('W') if inside => MotionKind::InsideWordBig,
                        Some('W') => MotionKind::AroundWordBig,
                        Some(pair @ ('"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}')) => {
                            if inside {
                                MotionKind::InsidePair(pair)
                            } else {
                                MotionKind::AroundPair(pair)
                            }
                        }
                        _ => return Parse::Invalid,
                    }
                }
                '\'' => {
                    let Some(&key) = keys.get(m + 1) else {
                        return Parse::Continue;
                    };
                    let Some(reg) = printable(key) else {
                        return Parse::Invalid;
                    };
                    MotionKind::GotoMark(reg)
                }
                'g' if change_char == Some('g') => MotionKind::BeginningOfFile,
                'u' if change_char == Some('g') => MotionKind::Line,
                'c' if change_char == Some('c') => MotionKind::LineSoft,
                'c' if change_char == Some('g') => MotionKind::Line,
                'd' if change_char == Some('d') => MotionKind::Line,
                'y' if change_char == Some('y') => MotionKind::Line,
                '<' if change_char == Some('<') => MotionKind::Line,
                '>' if change_char == Some('>') => MotionKind::Line,
                '~' if change_char == Some('~') => MotionKind::Line,
                _ => return Parse::Invalid,
            },
            _ => return Parse::Invalid,
        };
    }

    Parse::Complete(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn keys(s: &str) -> Vec<Key> {
        s.chars().map(Key::Char).collect()
    }

    fn ctx(buffer: &Buffer) -> ParseContext<'_> {
        ParseContext {
            mode: Mode::Normal,
            buffer,
            cursor: Point::origin(),
            visual_start: Point::origin(),
            recording: false,
        }
    }

    fn complete(s: &str) -> Action {
        let buffer = Buffer::from_str("t", "alpha beta\ngamma\n");
        match parse_action(&keys(s), &ctx(&buffer)) {
            Parse::Complete(action) => action,
            other => panic!("expected Complete for {s:?}, got {other:?}"),
        }
    }

    fn outcome(s: &str) -> Parse {
        let buffer = Buffer::from_str("t", "alpha beta\ngamma\n");
        parse_action(&keys(s), &ctx(&buffer))
    }

    #[test]
    fn plain_motion_word() {
        let action = complete("w");
        assert_eq!(action.change, ChangeKind::Motion);
        assert_eq!(action.motion.kind, MotionKind::WordLittle);
        assert_eq!(action.multiplier, 1);
    }

    #[test]
    fn operator_with_motion_dw() {
        let action = complete("dw");
        assert_eq!(action.change, ChangeKind::Delete);
        assert!(action.yank);
        assert_eq!(action.motion.kind, MotionKind::WordLittle);
    }

    #[test]
    fn multipliers_multiply_2d3w() {
        let action = complete("2d3w");
        assert_eq!(action.multiplier, 2);
        assert_eq!(action.motion.multiplier, 3);
        assert_eq!(action.motion.kind, MotionKind::WordLittle);
    }

    #[test]
    fn double_verbs_are_linewise() {
        assert_eq!(complete("dd").motion.kind, MotionKind::Line);
        assert_eq!(complete("yy").motion.kind, MotionKind::Line);
        assert_eq!(complete("cc").motion.kind, MotionKind::LineSoft);
        assert_eq!(complete(">>").motion.kind, MotionKind::Line);
        assert_eq!(complete("<<").motion.kind, MotionKind::Line);
    }

    #[test]
    fn change_word_enters_insert() {
        let action = complete("cw");
        assert_eq!(action.change, ChangeKind::Delete);
        assert_eq!(action.end_mode, Mode::Insert);
        assert_eq!(action.motion.kind, MotionKind::WordLittle);
    }

    #[test]
    fn leading_zero_is_hard_bol() {
        let action = complete("0");
        assert_eq!(action.motion.kind, MotionKind::BeginningOfLineHard);
        // but a zero inside a count is a digit
        let action = complete("10l");
        assert_eq!(action.multiplier, 10);
        assert_eq!(action.motion.kind, MotionKind::Right);
    }

    #[test]
    fn zero_after_operator_is_motion() {
        let action = complete("d0");
        assert_eq!(action.change, ChangeKind::Delete);
        assert_eq!(action.motion.kind, MotionKind::BeginningOfLineHard);
    }

    #[test]
    fn register_selector() {
        let action = complete("\"ayy");
        assert_eq!(action.reg, Some('a'));
        assert_eq!(action.change, ChangeKind::Yank);
        assert_eq!(action.motion.kind, MotionKind::Line);
        assert_eq!(outcome("\""), Parse::Continue);
    }

    #[test]
    fn find_char_needs_operand() {
        assert_eq!(outcome("f"), Parse::Continue);
        let action = complete("fx");
        assert_eq!(action.motion.kind, MotionKind::FindForward('x'));
        let action = complete("dta");
        assert_eq!(action.change, ChangeKind::Delete);
        assert_eq!(action.motion.kind, MotionKind::UntilForward('a'));
    }

    #[test]
    fn text_objects() {
        assert_eq!(complete("diw").motion.kind, MotionKind::InsideWordLittle);
        assert_eq!(complete("da\"").motion.kind, MotionKind::AroundPair('"'));
        assert_eq!(complete("ci(").motion.kind, MotionKind::InsidePair('('));
        assert_eq!(outcome("di"), Parse::Continue);
        assert_eq!(outcome("diz"), Parse::Invalid);
    }

    #[test]
    fn g_prefixed_forms() {
        assert_eq!(complete("gg").motion.kind, MotionKind::BeginningOfFile);
        let action = complete("gc");
        assert_eq!(action.change, ChangeKind::Comment);
        assert_eq!(action.motion.kind, MotionKind::Line);
        let action = complete("gu");
        assert_eq!(action.change, ChangeKind::Uncomment);
        assert_eq!(action.motion.kind, MotionKind::Line);
        assert_eq!(outcome("g"), Parse::Continue);
    }

    #[test]
    fn shortcuts_infer_motions() {
        assert_eq!(complete("D").motion.kind, MotionKind::EndOfLineHard);
        assert_eq!(complete("C").end_mode, Mode::Insert);
        assert_eq!(complete("S").motion.kind, MotionKind::LineSoft);
        assert_eq!(complete("A").motion.kind, MotionKind::EndOfLinePassed);
        assert_eq!(complete("I").motion.kind, MotionKind::BeginningOfLineSoft);
        assert_eq!(complete("Y").change, ChangeKind::Yank);
        let x = complete("x");
        assert_eq!(x.change, ChangeKind::Delete);
        assert_eq!(x.motion.kind, MotionKind::None);
    }

    #[test]
    fn replace_and_marks_take_operands() {
        assert_eq!(outcome("r"), Parse::Continue);
        assert_eq!(complete("rZ").change, ChangeKind::ChangeChar('Z'));
        assert_eq!(complete("ma").change, ChangeKind::SetMark('a'));
        assert_eq!(complete("'a").motion.kind, MotionKind::GotoMark('a'));
    }

    #[test]
    fn macro_verbs() {
        assert_eq!(outcome("q"), Parse::Continue);
        assert_eq!(
            complete("qa").change,
            ChangeKind::RecordMacro(Some('a'))
        );
        assert_eq!(complete("@b").change, ChangeKind::PlayMacro('b'));
        let buffer = Buffer::from_str("t", "x");
        let mut context = ctx(&buffer);
        context.recording = true;
        assert_eq!(
            parse_action(&keys("q"), &context),
            Parse::Complete(Action {
                change: ChangeKind::RecordMacro(None),
                ..Action::default()
            })
        );
    }

    #[test]
    fn search_motions() {
        assert_eq!(
            complete("*").motion.kind,
            MotionKind::SearchWord(Direction::Down)
        );
        assert_eq!(
            complete("#").motion.kind,
            MotionKind::SearchWord(Direction::Up)
        );
        assert_eq!(complete("n").motion.kind, MotionKind::RepeatSearch);
        assert_eq!(complete("N").motion.kind, MotionKind::ReverseSearch);
    }

    #[test]
    fn unknown_sequences_are_invalid() {
        assert_eq!(outcome("dz"), Parse::Invalid);
        assert_eq!(outcome("Z"), Parse::Invalid);
        assert_eq!(outcome("d!"), Parse::Invalid);
    }

    #[test]
    fn escape_key_is_invalid_input() {
        let buffer = Buffer::from_str("t", "x");
        assert_eq!(
            parse_action(&[Key::Escape], &ctx(&buffer)),
            Parse::Invalid
        );
    }

    #[test]
    fn arrow_keys_are_motions() {
        let buffer = Buffer::from_str("t", "x");
        match parse_action(&[Key::Left], &ctx(&buffer)) {
            Parse::Complete(action) => assert_eq!(action.motion.kind, MotionKind::Left),
            other => panic!("expected Complete, got {other:?}"),
        }
        match parse_action(&[Key::Char('d'), Key::Down], &ctx(&buffer)) {
            Parse::Complete(action) => assert_eq!(action.motion.kind, MotionKind::LineDown),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn visual_mode_preloads_selection() {
        let buffer = Buffer::from_str("t", "abcdef");
        let context = ParseContext {
            mode: Mode::VisualRange,
            buffer: &buffer,
            cursor: Point::new(3, 0),
            visual_start: Point::new(1, 0),
            recording: false,
        };
        match parse_action(&keys("d"), &context) {
            Parse::Complete(action) => {
                assert_eq!(action.change, ChangeKind::Delete);
                assert_eq!(
                    action.motion.kind,
                    MotionKind::VisualRange {
                        length: 2,
                        start_after: false
                    }
                );
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn visual_swap_uses_o() {
        let buffer = Buffer::from_str("t", "abcdef");
        let context = ParseContext {
            mode: Mode::VisualLine,
            buffer: &buffer,
            cursor: Point::origin(),
            visual_start: Point::origin(),
            recording: false,
        };
        match parse_action(&keys("o"), &context) {
            Parse::Complete(action) => {
                assert_eq!(action.motion.kind, MotionKind::VisualSwapWithCursor);
                assert_eq!(action.end_mode, Mode::VisualLine);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn prefix_determinism_for_samples() {
        for sample in ["dw", "2d3w", "\"ayy", "cc", "fx", "diw", "qa", "rZ", "gg"] {
            let buffer = Buffer::from_str("t", "alpha beta");
            let context = ctx(&buffer);
            let all: Vec<Key> = keys(sample);
            assert!(matches!(
                parse_action(&all, &context),
                Parse::Complete(_)
            ));
            for prefix_len in 0..all.len() {
                let prefix = &all[..prefix_len];
                assert!(
                    !matches!(parse_action(prefix, &context), Parse::Complete(_)),
                    "prefix {prefix_len} of {sample:?} completed early"
                );
            }
        }
    }
}
