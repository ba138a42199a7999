//! Range resolver: Action + buffer + cursor + modal state -> text region.
//!
//! Produces the inclusive `(start, end)` region an action operates on, plus
//! the yank mode (linewise operators and visual-line selections snap to
//! whole lines). Backward motions under `d`/`y`/`~` are trimmed so the
//! character under the cursor stays out of the range; `w`/`W` under an
//! operator neither includes the next word's first character nor crosses
//! into the next line.
//!
//! Resolution also owns the stateful motion side effects: find-char motions
//! refresh the repeat state, `*`/`#` write the search register, and a
//! search miss is reported and degrades the range to cursor-only.

use core_state::{BufferState, FindCharKind, FindCharState, Mode, YankMode, registers::SEARCH_REG};
use core_text::{Buffer, Direction, Point, motion};

use crate::{Action, ChangeKind, MotionKind, VimState};

/// The resolved region of one action, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRange {
    pub start: Point,
    pub end: Point,
    pub yank_mode: YankMode,
}

impl ActionRange {
    pub fn sorted(&self) -> (Point, Point) {
        Point::sorted(self.start, self.end)
    }
}

const MULTIPLIER_CAP: i64 = 999_999;

/// Compute the region `action` affects. `None` means the action cannot
/// apply (failed text object, search miss, missing operand); the caller
/// reports failure and mutates nothing.
pub fn resolve_range(
    action: &Action,
    buffer: &Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
) -> Option<ActionRange> {
    let mut range = ActionRange {
        start: *cursor,
        end: *cursor,
        yank_mode: YankMode::Normal,
    };

    match action.motion.kind {
        MotionKind::VisualRange { length, start_after } => {
            let mut anchor = *cursor;
            let delta = if start_after { length } else { -length };
            motion::advance(buffer, &mut anchor, delta);
            range.start = *cursor;
            range.end = anchor;
        }
        MotionKind::VisualLine { lines, .. } => {
            if buffer.is_empty() {
                return None;
            }
            let mut anchor = *cursor;
            anchor.y += lines;
            let (first, last) = Point::sorted(*cursor, anchor);
            range.start = first;
            range.end = last;
            range.start.x = 0;
            let line = range.end.y.min(buffer.line_count() - 1);
            range.end.y = line;
            range.end.x = buffer.line_len(line)?;
            range.yank_mode = YankMode::Line;
        }
        _ if !buffer.is_empty() => {
            let multiplier = (action.multiplier * action.motion.multiplier).min(MULTIPLIER_CAP);
            for _ in 0..multiplier {
                if !apply_motion(action, buffer, cursor, state, buffer_state, &mut range)? {
                    break;
                }
            }
            trim_operator_range(action, buffer, &mut range)?;
        }
        _ => {}
    }

    Some(range)
}

/// One iteration of the motion. `Ok(false)` stops the multiplier loop
/// early; `None` fails the whole action.
#[allow(clippy::too_many_lines)]
fn apply_motion(
    action: &Action,
    buffer: &Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    range: &mut ActionRange,
) -> Option<bool> {
    match action.motion.kind {
        MotionKind::None | MotionKind::VisualRange { .. } | MotionKind::VisualLine { .. } => {}
        MotionKind::Left => {
            range.end.x = (range.end.x - 1).max(0);
        }
        MotionKind::Right => {
            let len = buffer.line_len(range.end.y).unwrap_or(0);
            range.end.x = (range.end.x + 1).min(len);
        }
        MotionKind::Up => {
            range.end.y = (range.end.y - 1).max(0);
        }
        MotionKind::Down => {
            range.end.y = (range.end.y + 1).min(buffer.line_count() - 1).max(0);
        }
        MotionKind::WordLittle => {
            range.end = motion::next_word(buffer, range.end, true);
        }
        MotionKind::WordBig => {
            range.end = motion::next_word(buffer, range.end, false);
        }
        MotionKind::WordBeginningLittle => {
            range.end = motion::word_beginning(buffer, range.end, true);
        }
        MotionKind::WordBeginningBig => {
            range.end = motion::word_beginning(buffer, range.end, false);
        }
        MotionKind::WordEndLittle => {
            range.end = motion::word_end(buffer, range.end, true);
        }
        MotionKind::WordEndBig => {
            range.end = motion::word_end(buffer, range.end, false);
        }
        MotionKind::Line => {
            range.start.x = 0;
            range.end.y = range.end.y.min(buffer.line_count() - 1);
            range.end.x = buffer.line_len(range.end.y)?;
            range.yank_mode = YankMode::Line;
        }
        MotionKind::LineUp => {
            range.start.x = 0;
            range.start.y = (range.start.y - 1).max(0);
            range.end.y = range.end.y.min(buffer.line_count() - 1);
            range.end.x = buffer.line_len(range.end.y)?;
            range.yank_mode = YankMode::Line;
        }
        MotionKind::LineDown => {
            range.start.x = 0;
            range.end.y = (range.end.y + 1).min(buffer.line_count() - 1).max(0);
            range.end.x = buffer.line_len(range.end.y)?;
            range.yank_mode = YankMode::Line;
        }
        MotionKind::LineSoft => {
            range.start = motion::soft_line_beginning(buffer, range.start.y);
            range.end = motion::hard_line_end(buffer, range.end.y);
        }
        MotionKind::FindForward(ch) => {
            find_char(buffer, range, FindCharKind::Next, ch, Some(state));
        }
        MotionKind::FindBackward(ch) => {
            find_char(buffer, range, FindCharKind::Prev, ch, Some(state));
        }
        MotionKind::UntilForward(ch) => {
            find_char(buffer, range, FindCharKind::ToNext, ch, Some(state));
        }
        MotionKind::UntilBackward(ch) => {
            find_char(buffer, range, FindCharKind::ToPrev, ch, Some(state));
        }
        MotionKind::RepeatFind => {
            if let Some(fc) = state.find_char {
                find_char(buffer, range, fc.kind, fc.ch, None);
            }
        }
        MotionKind::ReverseFind => {
            if let Some(fc) = state.find_char {
                find_char(buffer, range, fc.kind.reversed(), fc.ch, None);
            }
        }
        MotionKind::BeginningOfFile => {
            range.end = motion::beginning_of_file();
        }
        MotionKind::BeginningOfLineHard => {
            range.end.x = 0;
        }
        MotionKind::BeginningOfLineSoft => {
            range.end = motion::soft_line_beginning(buffer, range.end.y);
        }
        MotionKind::EndOfLinePassed => {
            range.end.x = buffer.line_len(range.end.y)?;
        }
        MotionKind::EndOfLineHard => {
            range.end = motion::hard_line_end(buffer, range.end.y);
        }
        MotionKind::EndOfLineSoft => {
            range.end = motion::soft_line_end(buffer, range.end.y);
        }
        MotionKind::EndOfFile => {
            range.end = motion::end_of_file(buffer);
        }
        MotionKind::InsidePair(pair) => {
            resolve_inside_pair(buffer, range, pair)?;
        }
        MotionKind::InsideWordLittle => {
            let (start, end) = motion::word_at_location(buffer, *cursor)?;
            range.start = start;
            range.end = end;
        }
        MotionKind::InsideWordBig => {
            let ch = buffer.get(range.start)?;
            let pred: fn(char) -> bool = if motion::is_blank(ch) {
                motion::is_blank
            } else {
                is_punct_or_word
            };
            motion::homogeneous_adjacents(buffer, &mut range.start, &mut range.end, pred);
        }
        MotionKind::AroundPair(pair) => {
            resolve_around_pair(buffer, range, pair)?;
        }
        MotionKind::AroundWordLittle => {
            resolve_around_word_little(buffer, range)?;
        }
        MotionKind::AroundWordBig => {
            resolve_around_word_big(buffer, range)?;
        }
        MotionKind::VisualSwapWithCursor => {
            std::mem::swap(cursor, &mut state.visual_start);
            range.start = *cursor;
            range.end = *cursor;
        }
        MotionKind::MatchingPair => {
            if let Some(matched) = motion::matching_pair(buffer, range.end) {
                range.end = matched;
            }
        }
        MotionKind::NextBlankLine => {
            range.end = motion::next_blank_line(buffer, range.end);
        }
        MotionKind::PrevBlankLine => {
            range.end = motion::prev_blank_line(buffer, range.end);
        }
        MotionKind::SearchWord(direction) => {
            let (word_start, word_end) = motion::word_at_location(buffer, *cursor)?;
            let word = buffer.dupe(word_start, word_end)?;
            let pattern = format!("\\b{}\\b", regex::escape(&word));
            state.yanks.set(SEARCH_REG, pattern.clone(), YankMode::Normal);
            state.search.compile(&pattern);
            // explicit searches own the stored direction
            state.search.direction = direction;
            search(buffer, range, state, direction)?;
        }
        MotionKind::RepeatSearch => {
            let direction = state.search.direction;
            search(buffer, range, state, direction)?;
        }
        MotionKind::ReverseSearch => {
            // one step against the stored direction; the stored state
            // itself stays put, like `,` for find-char
            let direction = state.search.direction.reversed();
            search(buffer, range, state, direction)?;
        }
        MotionKind::GotoMark(reg) => {
            if let Some(location) = buffer_state.marks.get(reg) {
                range.end = motion::soft_line_beginning(buffer, location.y);
            }
        }
    }
    Some(true)
}

fn is_punct_or_word(ch: char) -> bool {
    motion::is_punct(ch) || motion::is_word_char(ch)
}

/// Shared find-char resolution. Explicit invocations refresh the repeat
/// state; `;`/`,` replays leave it untouched.
fn find_char(
    buffer: &Buffer,
    range: &mut ActionRange,
    kind: FindCharKind,
    ch: char,
    remember: Option<&mut VimState>,
) {
    let hit = match kind {
        FindCharKind::Next => motion::find_char_forward(buffer, range.end, ch),
        FindCharKind::Prev => motion::find_char_backward(buffer, range.end, ch),
        FindCharKind::ToNext => {
            motion::find_char_forward(buffer, range.end, ch).map(|p| Point::new(p.x - 1, p.y))
        }
        FindCharKind::ToPrev => motion::find_char_backward(buffer, range.end, ch).map(|p| {
            let len = buffer.line_len(p.y).unwrap_or(0);
            Point::new((p.x + 1).min(len), p.y)
        }),
    };
    if let Some(hit) = hit {
        range.end = hit;
        if let Some(state) = remember {
            state.find_char = Some(FindCharState { kind, ch });
        }
    }
}

/// Step the range to the nearest stored-pattern match in `direction`.
/// Callers decide whether `direction` also becomes the stored one.
fn search(
    buffer: &Buffer,
    range: &mut ActionRange,
    state: &mut VimState,
    direction: Direction,
) -> Option<()> {
    if state.search.valid().is_none() {
        state.message("no search pattern");
        return None;
    }
    let mut from = range.end;
    match direction {
        Direction::Up => from = motion::word_beginning(buffer, from, true),
        Direction::Down => from.x += 1,
    }
    let hit = state
        .search
        .valid()
        .and_then(|regex| motion::regex_search(buffer, from, regex, direction));
    match hit {
        Some(hit) => {
            range.end = hit;
            Some(())
        }
        None => {
            let pattern = state
                .yanks
                .get(SEARCH_REG)
                .map(|y| y.text.clone())
                .unwrap_or_default();
            state.message(format!("failed to find match for '{pattern}'"));
            None
        }
    }
}

fn resolve_inside_pair(buffer: &Buffer, range: &mut ActionRange, pair: char) -> Option<()> {
    match pair {
        '"' | '\'' => {
            if !motion::homogeneous_adjacents(buffer, &mut range.start, &mut range.end, |c| {
                c != pair
            }) {
                return None;
            }
            // no opening quote to the left
            if range.start.x == 0 {
                return None;
            }
        }
        _ => {
            let (open, close) = bracket_pair(pair)?;
            let (open_at, close_at) = motion::enclosing_pair(buffer, range.start, open, close)?;
            range.start = open_at;
            range.end = close_at;
            motion::advance(buffer, &mut range.start, 1);
            motion::advance(buffer, &mut range.end, -1);
        }
    }
    // empty interior
    if range.start == range.end || range.start.after(&range.end) {
        return None;
    }
    Some(())
}

fn resolve_around_pair(buffer: &Buffer, range: &mut ActionRange, pair: char) -> Option<()> {
    match pair {
        '"' | '\'' => {
            if !motion::homogeneous_adjacents(buffer, &mut range.start, &mut range.end, |c| {
                c != pair
            }) {
                return None;
            }
            if range.start.x == 0 {
                return None;
            }
            motion::advance(buffer, &mut range.start, -1);
            motion::advance(buffer, &mut range.end, 1);
        }
        _ => {
            let (open, close) = bracket_pair(pair)?;
            let (open_at, close_at) = motion::enclosing_pair(buffer, range.start, open, close)?;
            range.start = open_at;
            range.end = close_at;
        }
    }
    if range.start == range.end {
        return None;
    }
    Some(())
}

fn bracket_pair(pair: char) -> Option<(char, char)> {
    match pair {
        '(' | ')' => Some(('(', ')')),
        '[' | ']' => Some(('[', ']')),
        '{' | '}' => Some(('{', '}')),
        _ => None,
    }
}

/// Expand `end` right while `pred` holds on the same line; returns the
/// character that stopped the expansion, when one was read.
fn slurp_right(buffer: &Buffer, end: &mut Point, pred: fn(char) -> bool) -> Option<char> {
    let mut stopper = None;
    loop {
        let probe = Point::new(end.x + 1, end.y);
        match buffer.get(probe) {
            Some(c) if pred(c) && c != '\n' => end.x += 1,
            Some(c) => {
                stopper = Some(c);
                break;
            }
            None => break,
        }
    }
    stopper
}

fn slurp_left(buffer: &Buffer, start: &mut Point, pred: fn(char) -> bool) -> Option<char> {
    let mut stopper = None;
    loop {
        if start.x == 0 {
            break;
        }
        let probe = Point::new(start.x - 1, start.y);
        match buffer.get(probe) {
            Some(c) if pred(c) => start.x -= 1,
            Some(c) => {
                stopper = Some(c);
                break;
            }
            None => break,
        }
    }
    stopper
}

/// `aw`: the word under the cursor plus its adjacent whitespace (trailing
/// preferred, leading when there is none).
fn resolve_around_word_little(buffer: &Buffer, range: &mut ActionRange) -> Option<()> {
    let ch = buffer.get(range.start)?;
    if motion::is_word_char(ch) {
        let stop = slurp_right(buffer, &mut range.end, motion::is_word_char);
        slurp_left(buffer, &mut range.start, motion::is_word_char);
        match stop {
            Some(c) if motion::is_blank(c) => {
                slurp_right(buffer, &mut range.end, motion::is_blank);
            }
            Some(c) if motion::is_punct(c) => {
                slurp_left(buffer, &mut range.start, motion::is_blank);
            }
            _ => {}
        }
    } else if motion::is_punct(ch) {
        let stop = slurp_right(buffer, &mut range.end, motion::is_punct);
        slurp_left(buffer, &mut range.start, motion::is_punct);
        if let Some(c) = stop
            && motion::is_blank(c)
        {
            slurp_right(buffer, &mut range.end, motion::is_blank);
        }
    } else {
        let stop = slurp_right(buffer, &mut range.end, motion::is_blank);
        match stop {
            Some(c) if motion::is_punct(c) => {
                slurp_right(buffer, &mut range.end, motion::is_punct);
                slurp_left(buffer, &mut range.start, motion::is_blank);
            }
            Some(c) if motion::is_word_char(c) => {
                slurp_right(buffer, &mut range.end, motion::is_word_char);
                slurp_left(buffer, &mut range.start, motion::is_blank);
            }
            _ => {
                let left = slurp_left(buffer, &mut range.start, motion::is_blank);
                match left {
                    Some(c) if motion::is_punct(c) => {
                        slurp_left(buffer, &mut range.start, motion::is_punct);
                    }
                    Some(c) if motion::is_word_char(c) => {
                        slurp_left(buffer, &mut range.start, motion::is_word_char);
                    }
                    _ => {}
                }
            }
        }
    }
    Some(())
}

/// `aW`: the whitespace-bounded token plus adjacent whitespace.
fn resolve_around_word_big(buffer: &Buffer, range: &mut ActionRange) -> Option<()> {
    let ch = buffer.get(range.start)?;
    if is_punct_or_word(ch) {
        let stop = slurp_right(buffer, &mut range.end, is_punct_or_word);
        slurp_left(buffer, &mut range.start, is_punct_or_word);
        if let Some(c) = stop
            && motion::is_blank(c)
        {
            slurp_right(buffer, &mut range.end, motion::is_blank);
        }
    } else {
        let stop = slurp_right(buffer, &mut range.end, motion::is_blank);
        if stop.is_some_and(is_punct_or_word) {
            slurp_right(buffer, &mut range.end, is_punct_or_word);
            slurp_left(buffer, &mut range.start, motion::is_blank);
        } else {
            slurp_left(buffer, &mut range.start, motion::is_blank);
            slurp_left(buffer, &mut range.start, is_punct_or_word);
        }
    }
    Some(())
}

/// Operator edge policy: backward ranges never include the cursor's
/// character; `w`/`W` operands stop short of the next word and the next
/// line; `l` covers the character under the cursor.
fn trim_operator_range(action: &Action, buffer: &Buffer, range: &mut ActionRange) -> Option<()> {
    if !matches!(
        action.change,
        ChangeKind::Delete | ChangeKind::Yank | ChangeKind::FlipCase
    ) {
        return Some(());
    }
    if range.start.after(&range.end) {
        if range.start.x > 0 {
            range.start.x -= 1;
        }
    } else if matches!(
        action.motion.kind,
        MotionKind::WordLittle | MotionKind::WordBig
    ) {
        if range.end.y != range.start.y {
            range.end.y = range.start.y;
            range.end.x = (buffer.line_len(range.start.y).unwrap_or(0) - 1).max(0);
        } else if range.end.x > 0 {
            range.end.x -= 1;
        }
        // a change stops at the end of the word, sparing the whitespace
        // the delete would take
        if action.end_mode == Mode::Insert {
            while range.end.after(&range.start)
                && buffer
                    .get(range.end)
                    .is_some_and(|c| motion::is_blank(c) || c == '\n')
            {
                motion::advance(buffer, &mut range.end, -1);
            }
        }
    } else if action.motion.kind == MotionKind::Left {
        if range.end == range.start {
            return None;
        }
    } else if action.motion.kind == MotionKind::Right && range.end.x > 0 {
        range.end.x -= 1;
    }

    // charwise operators need a character to operate on
    if range.yank_mode == YankMode::Normal
        && range.start.y == range.end.y
        && buffer.line_len(range.start.y) == Some(0)
    {
        return None;
    }
    Some(())
}
