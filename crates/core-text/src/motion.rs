//! Motion primitives over a [`Buffer`].
//!
//! Every function here is a pure query: it computes points but never
//! mutates text. Word motions distinguish little words (identifier chars)
//! from big words (whitespace-bounded); pair motions respect nesting;
//! find-char motions never leave the cursor line; regex search wraps around
//! the buffer.

use regex::Regex;

use crate::{Buffer, Point};

/// Search direction for regex motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Down,
    Up,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }
}

/// Identifier characters: alphanumerics plus underscore.
pub fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Printable, non-word, non-blank characters.
pub fn is_punct(ch: char) -> bool {
    !ch.is_whitespace() && !is_word_char(ch)
}

pub fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn classify(ch: char, little: bool) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Space
    } else if !little || is_word_char(ch) {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

fn class_at(buffer: &Buffer, p: Point, little: bool) -> Option<CharClass> {
    buffer.get(p).map(|ch| classify(ch, little))
}

/// Clamp a point onto an existing character (normal-mode rule: the cursor
/// sits on the last character, never past it). Empty documents clamp to the
/// origin.
pub fn clamp(buffer: &Buffer, p: &mut Point) {
    if buffer.is_empty() {
        *p = Point::origin();
        return;
    }
    p.y = p.y.clamp(0, buffer.line_count() - 1);
    let len = buffer.line_len(p.y).unwrap_or(0);
    p.x = p.x.clamp(0, (len - 1).max(0));
}

/// One logical position forward (`x == line_len` is the newline slot of a
/// non-final line) or backward. Stops at the buffer bounds.
fn step_forward(buffer: &Buffer, p: &mut Point) -> bool {
    let len = buffer.line_len(p.y).unwrap_or(0);
    if p.x < len {
        p.x += 1;
        return true;
    }
    if p.y + 1 < buffer.line_count() {
        p.y += 1;
        p.x = 0;
        return true;
    }
    false
}

fn step_backward(buffer: &Buffer, p: &mut Point) -> bool {
    if p.x > 0 {
        p.x -= 1;
        return true;
    }
    if p.y > 0 {
        p.y -= 1;
        p.x = buffer.line_len(p.y).unwrap_or(0);
        return true;
    }
    false
}

/// Move `p` by `delta` logical characters, newline slots included.
pub fn advance(buffer: &Buffer, p: &mut Point, delta: i64) {
    if delta >= 0 {
        for _ in 0..delta {
            if !step_forward(buffer, p) {
                break;
            }
        }
    } else {
        for _ in 0..delta.abs() {
            if !step_backward(buffer, p) {
                break;
            }
        }
    }
}

/// Absolute logical index of `p`: each line contributes its length plus one
/// for the separating newline.
pub fn absolute_index(buffer: &Buffer, p: Point) -> i64 {
    let mut total = 0;
    for y in 0..p.y.clamp(0, buffer.line_count()) {
        total += buffer.line_len(y).unwrap_or(0) + 1;
    }
    total + p.x.clamp(0, buffer.line_len(p.y).unwrap_or(0))
}

/// The insert slot one past the final character of the buffer.
pub fn end_of_buffer(buffer: &Buffer) -> Point {
    if buffer.is_empty() {
        return Point::origin();
    }
    let y = buffer.line_count() - 1;
    Point::new(buffer.line_len(y).unwrap_or(0), y)
}

/// Inclusive logical length of the range from `start` to `end`.
pub fn length_between(buffer: &Buffer, start: Point, end: Point) -> i64 {
    absolute_index(buffer, end) - absolute_index(buffer, start) + 1
}

/// Start of the next word (`w` / `W`). Empty lines count as words.
pub fn next_word(buffer: &Buffer, start: Point, little: bool) -> Point {
    let mut p = start;
    let Some(start_class) = class_at(buffer, p, little) else {
        return p;
    };
    if start_class != CharClass::Space {
        while class_at(buffer, p, little) == Some(start_class) {
            if !step_forward(buffer, &mut p) {
                return p;
            }
        }
    }
    while class_at(buffer, p, little) == Some(CharClass::Space) {
        if p.x == 0 && buffer.line_len(p.y) == Some(0) {
            break; // an empty line is a word stop
        }
        if !step_forward(buffer, &mut p) {
            break;
        }
    }
    p
}

/// Beginning of the current/previous word (`b` / `B`).
pub fn word_beginning(buffer: &Buffer, start: Point, little: bool) -> Point {
    let mut p = start;
    if !step_backward(buffer, &mut p) {
        return p;
    }
    while class_at(buffer, p, little) == Some(CharClass::Space) {
        if !step_backward(buffer, &mut p) {
            return p;
        }
    }
    let Some(class) = class_at(buffer, p, little) else {
        return p;
    };
    loop {
        let mut prev = p;
        if !step_backward(buffer, &mut prev) {
            return p;
        }
        if class_at(buffer, prev, little) == Some(class) {
            p = prev;
        } else {
            return p;
        }
    }
}

/// End of the current/next word (`e` / `E`).
pub fn word_end(buffer: &Buffer, start: Point, little: bool) -> Point {
    let mut p = start;
    if !step_forward(buffer, &mut p) {
        return start;
    }
    while matches!(class_at(buffer, p, little), Some(CharClass::Space) | None) {
        if !step_forward(buffer, &mut p) {
            return p;
        }
    }
    let Some(class) = class_at(buffer, p, little) else {
        return p;
    };
    loop {
        let mut next = p;
        if !step_forward(buffer, &mut next) {
            return p;
        }
        if class_at(buffer, next, little) == Some(class) {
            p = next;
        } else {
            return p;
        }
    }
}

/// First non-blank column of line `y` (the soft beginning). An all-blank
/// line answers its end, so the blanks count as leading.
pub fn soft_line_beginning(buffer: &Buffer, y: i64) -> Point {
    let x = buffer
        .line(y)
        .map(|line| {
            line.chars()
                .position(|c| !is_blank(c))
                .unwrap_or_else(|| line.chars().count()) as i64
        })
        .unwrap_or(0);
    Point::new(x, y)
}

/// Last non-blank column of line `y`.
pub fn soft_line_end(buffer: &Buffer, y: i64) -> Point {
    let x = buffer
        .line(y)
        .map(|line| {
            let mut last = 0;
            for (i, c) in line.chars().enumerate() {
                if !is_blank(c) {
                    last = i as i64;
                }
            }
            last
        })
        .unwrap_or(0);
    Point::new(x, y)
}

/// Last character column of line `y` (hard end; 0 for an empty line).
pub fn hard_line_end(buffer: &Buffer, y: i64) -> Point {
    let len = buffer.line_len(y).unwrap_or(0);
    Point::new((len - 1).max(0), y)
}

pub fn beginning_of_file() -> Point {
    Point::origin()
}

/// First column of the last line.
pub fn end_of_file(buffer: &Buffer) -> Point {
    Point::new(0, (buffer.line_count() - 1).max(0))
}

fn pair_complement(ch: char) -> Option<(char, char, bool)> {
    match ch {
        '(' => Some(('(', ')', true)),
        ')' => Some(('(', ')', false)),
        '[' => Some(('[', ']', true)),
        ']' => Some(('[', ']', false)),
        '{' => Some(('{', '}', true)),
        '}' => Some(('{', '}', false)),
        _ => None,
    }
}

/// Match of the pair character under `p`, honoring nesting.
pub fn matching_pair(buffer: &Buffer, p: Point) -> Option<Point> {
    let ch = buffer.get(p)?;
    let (open, close, forward) = pair_complement(ch)?;
    if forward {
        scan_for_close(buffer, p, open, close, true)
    } else {
        scan_for_open(buffer, p, open, close, true)
    }
}

/// Scan forward for the close delimiter of the pair enclosing `p`. When
/// `from_delimiter` the scan starts on an open delimiter at `p` itself.
fn scan_for_close(
    buffer: &Buffer,
    p: Point,
    open: char,
    close: char,
    from_delimiter: bool,
) -> Option<Point> {
    let mut depth = if from_delimiter { 0 } else { 1 };
    let mut cur = p;
    loop {
        if !step_forward(buffer, &mut cur) {
            return None;
        }
        match buffer.get(cur) {
            Some(c) if c == open => depth += 1,
            Some(c) if c == close => {
                if depth == 0 || (!from_delimiter && depth == 1) {
                    return Some(cur);
                }
                depth -= 1;
            }
            Some(_) => {}
            None => return None,
        }
    }
}

fn scan_for_open(
    buffer: &Buffer,
    p: Point,
    open: char,
    close: char,
    from_delimiter: bool,
) -> Option<Point> {
    let mut depth = if from_delimiter { 0 } else { 1 };
    let mut cur = p;
    loop {
        if !step_backward(buffer, &mut cur) {
            return None;
        }
        match buffer.get(cur) {
            Some(c) if c == close => depth += 1,
            Some(c) if c == open => {
                if depth == 0 || (!from_delimiter && depth == 1) {
                    return Some(cur);
                }
                depth -= 1;
            }
            Some(_) => {}
            None => return None,
        }
    }
}

/// The delimiters of the innermost `open`/`close` pair surrounding `p`.
/// When the cursor sits on a delimiter that pair is used.
pub fn enclosing_pair(buffer: &Buffer, p: Point, open: char, close: char) -> Option<(Point, Point)> {
    match buffer.get(p)? {
        c if c == open => {
            let end = scan_for_close(buffer, p, open, close, true)?;
            Some((p, end))
        }
        c if c == close => {
            let start = scan_for_open(buffer, p, open, close, true)?;
            Some((start, p))
        }
        _ => {
            let start = scan_for_open(buffer, p, open, close, false)?;
            let end = scan_for_close(buffer, p, open, close, false)?;
            Some((start, end))
        }
    }
}

/// Next occurrence of `ch` strictly after the cursor on the same line.
pub fn find_char_forward(buffer: &Buffer, p: Point, ch: char) -> Option<Point> {
    let line = buffer.line(p.y)?;
    for (i, c) in line.chars().enumerate() {
        if (i as i64) > p.x && c == ch {
            return Some(Point::new(i as i64, p.y));
        }
    }
    None
}

/// Previous occurrence of `ch` strictly before the cursor on the same line.
pub fn find_char_backward(buffer: &Buffer, p: Point, ch: char) -> Option<Point> {
    let line = buffer.line(p.y)?;
    let mut found = None;
    for (i, c) in line.chars().enumerate() {
        if (i as i64) < p.x && c == ch {
            found = Some(Point::new(i as i64, p.y));
        }
    }
    found
}

/// Next blank line below `p` (or the last line).
pub fn next_blank_line(buffer: &Buffer, p: Point) -> Point {
    let last = (buffer.line_count() - 1).max(0);
    let mut y = (p.y + 1).min(last);
    while y < last && buffer.line_len(y).unwrap_or(0) != 0 {
        y += 1;
    }
    Point::new(p.x, y)
}

/// Previous blank line above `p` (or the first line).
pub fn prev_blank_line(buffer: &Buffer, p: Point) -> Point {
    let mut y = (p.y - 1).max(0);
    while y > 0 && buffer.line_len(y).unwrap_or(0) != 0 {
        y -= 1;
    }
    Point::new(p.x, y)
}

/// Extend `start` left and `end` right over same-line characters satisfying
/// `pred`. Fails when the character under `start` does not satisfy `pred`.
pub fn homogeneous_adjacents(
    buffer: &Buffer,
    start: &mut Point,
    end: &mut Point,
    pred: impl Fn(char) -> bool,
) -> bool {
    let Some(ch) = buffer.get(*start) else {
        return false;
    };
    if !pred(ch) {
        return false;
    }
    while start.x > 0 {
        let left = Point::new(start.x - 1, start.y);
        match buffer.get(left) {
            Some(c) if pred(c) => start.x -= 1,
            _ => break,
        }
    }
    let len = buffer.line_len(end.y).unwrap_or(0);
    while end.x + 1 < len {
        let right = Point::new(end.x + 1, end.y);
        match buffer.get(right) {
            Some(c) if pred(c) => end.x += 1,
            _ => break,
        }
    }
    true
}

/// The same-class little-word run containing `p` (inclusive bounds).
pub fn word_at_location(buffer: &Buffer, p: Point) -> Option<(Point, Point)> {
    let ch = buffer.get(p)?;
    if ch == '\n' {
        return None;
    }
    let class = classify(ch, true);
    let mut start = p;
    let mut end = p;
    homogeneous_adjacents(buffer, &mut start, &mut end, |c| classify(c, true) == class);
    Some((start, end))
}

/// Indentation (in columns) a line opened adjacent to `y` should get: the
/// leading blanks of line `y`, plus one tab stop when the line opens a
/// block.
pub fn indentation_for_line(buffer: &Buffer, y: i64, tab_width: i64) -> i64 {
    let Some(line) = buffer.line(y) else {
        return 0;
    };
    let mut indent = 0;
    for ch in line.chars() {
        if is_blank(ch) {
            indent += 1;
        } else {
            break;
        }
    }
    let trimmed = line.trim_end();
    if trimmed.ends_with('{') || trimmed.ends_with('(') {
        indent += tab_width;
    }
    indent
}

fn match_columns(line: &str, regex: &Regex) -> Vec<i64> {
    regex
        .find_iter(line)
        .map(|m| line[..m.start()].chars().count() as i64)
        .collect()
}

/// Find the nearest regex match from `start` in `direction`, wrapping
/// around the buffer. The match on `start` itself counts when searching
/// down.
pub fn regex_search(
    buffer: &Buffer,
    start: Point,
    regex: &Regex,
    direction: Direction,
) -> Option<Point> {
    let count = buffer.line_count();
    if count == 0 {
        return None;
    }
    match direction {
        Direction::Down => {
            // cursor line from start.x, following lines, then wrap
            for offset in 0..=count {
                let y = (start.y + offset).rem_euclid(count);
                let line = buffer.line(y)?;
                let columns = match_columns(line, regex);
                for x in columns {
                    if offset == 0 && x < start.x {
                        continue;
                    }
                    if offset == count && x >= start.x {
                        continue;
                    }
                    return Some(Point::new(x, y));
                }
            }
            None
        }
        Direction::Up => {
            for offset in 0..=count {
                let y = (start.y - offset).rem_euclid(count);
                let line = buffer.line(y)?;
                let columns = match_columns(line, regex);
                for x in columns.into_iter().rev() {
                    if offset == 0 && x >= start.x {
                        continue;
                    }
                    if offset == count && x < start.x {
                        continue;
                    }
                    return Some(Point::new(x, y));
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(content: &str) -> Buffer {
        Buffer::from_str("t", content)
    }

    #[test]
    fn clamp_keeps_cursor_on_text() {
        let b = buf("abc\n\nxy");
        let mut p = Point::new(9, 0);
        clamp(&b, &mut p);
        assert_eq!(p, Point::new(2, 0));
        let mut p = Point::new(3, 1);
        clamp(&b, &mut p);
        assert_eq!(p, Point::new(0, 1));
        let mut p = Point::new(-2, 5);
        clamp(&b, &mut p);
        assert_eq!(p, Point::new(0, 2));
    }

    #[test]
    fn advance_crosses_newlines_both_ways() {
        let b = buf("ab\ncd");
        let mut p = Point::new(1, 0);
        advance(&b, &mut p, 2);
        assert_eq!(p, Point::new(0, 1));
        advance(&b, &mut p, -2);
        assert_eq!(p, Point::new(1, 0));
    }

    #[test]
    fn length_between_counts_newlines() {
        let b = buf("one\ntwo");
        assert_eq!(length_between(&b, Point::new(0, 0), Point::new(3, 0)), 4);
        assert_eq!(length_between(&b, Point::new(0, 1), Point::new(2, 1)), 3);
    }

    #[test]
    fn next_word_little_and_big() {
        let b = buf("foo_bar baz.qux");
        assert_eq!(next_word(&b, Point::origin(), true), Point::new(8, 0));
        assert_eq!(next_word(&b, Point::new(8, 0), true), Point::new(11, 0));
        assert_eq!(next_word(&b, Point::new(8, 0), false), Point::new(15, 0));
    }

    #[test]
    fn next_word_stops_at_empty_line() {
        let b = buf("foo\n\nbar");
        assert_eq!(next_word(&b, Point::origin(), true), Point::new(0, 1));
    }

    #[test]
    fn word_beginning_skips_space_runs() {
        let b = buf("foo  bar");
        assert_eq!(word_beginning(&b, Point::new(5, 0), true), Point::origin());
        assert_eq!(word_beginning(&b, Point::new(7, 0), true), Point::new(5, 0));
    }

    #[test]
    fn word_end_lands_on_last_char() {
        let b = buf("foo bar");
        assert_eq!(word_end(&b, Point::origin(), true), Point::new(2, 0));
        assert_eq!(word_end(&b, Point::new(2, 0), true), Point::new(6, 0));
    }

    #[test]
    fn soft_bounds() {
        let b = buf("   hi   ");
        assert_eq!(soft_line_beginning(&b, 0), Point::new(3, 0));
        assert_eq!(soft_line_end(&b, 0), Point::new(4, 0));
    }

    #[test]
    fn matching_pair_nested() {
        let b = buf("a(b(c)d)e");
        assert_eq!(matching_pair(&b, Point::new(1, 0)), Some(Point::new(7, 0)));
        assert_eq!(matching_pair(&b, Point::new(5, 0)), Some(Point::new(3, 0)));
        assert_eq!(matching_pair(&b, Point::new(0, 0)), None);
    }

    #[test]
    fn enclosing_pair_from_inside() {
        let b = buf("f(a, (b))");
        let (start, end) = enclosing_pair(&b, Point::new(3, 0), '(', ')').unwrap();
        assert_eq!(start, Point::new(1, 0));
        assert_eq!(end, Point::new(8, 0));
        let (start, end) = enclosing_pair(&b, Point::new(6, 0), '(', ')').unwrap();
        assert_eq!(start, Point::new(5, 0));
        assert_eq!(end, Point::new(7, 0));
    }

    #[test]
    fn find_char_is_same_line_only() {
        let b = buf("abcabc\nabc");
        assert_eq!(
            find_char_forward(&b, Point::origin(), 'c'),
            Some(Point::new(2, 0))
        );
        assert_eq!(
            find_char_forward(&b, Point::new(2, 0), 'c'),
            Some(Point::new(5, 0))
        );
        assert_eq!(find_char_forward(&b, Point::new(5, 0), 'c'), None);
        assert_eq!(
            find_char_backward(&b, Point::new(5, 0), 'a'),
            Some(Point::new(3, 0))
        );
    }

    #[test]
    fn blank_line_motions() {
        let b = buf("a\nb\n\nc\nd");
        assert_eq!(next_blank_line(&b, Point::origin()).y, 2);
        assert_eq!(prev_blank_line(&b, Point::new(0, 4)).y, 2);
    }

    #[test]
    fn homogeneous_adjacents_inside_quotes() {
        let b = buf("say \"hi there\" now");
        let mut start = Point::new(6, 0);
        let mut end = Point::new(6, 0);
        assert!(homogeneous_adjacents(&b, &mut start, &mut end, |c| c != '"'));
        assert_eq!(start, Point::new(5, 0));
        assert_eq!(end, Point::new(12, 0));
    }

    #[test]
    fn word_at_location_spans_identifier() {
        let b = buf("let foo_bar = 1");
        let (start, end) = word_at_location(&b, Point::new(6, 0)).unwrap();
        assert_eq!(start, Point::new(4, 0));
        assert_eq!(end, Point::new(10, 0));
    }

    #[test]
    fn indentation_follows_leading_blanks_and_openers() {
        let b = buf("    foo {");
        assert_eq!(indentation_for_line(&b, 0, 5), 9);
        let b = buf("  bar");
        assert_eq!(indentation_for_line(&b, 0, 5), 2);
    }

    #[test]
    fn regex_search_down_up_and_wrap() {
        let b = buf("alpha beta alpha");
        let re = Regex::new("alpha").unwrap();
        assert_eq!(
            regex_search(&b, Point::origin(), &re, Direction::Down),
            Some(Point::origin())
        );
        assert_eq!(
            regex_search(&b, Point::new(1, 0), &re, Direction::Down),
            Some(Point::new(11, 0))
        );
        // wraps past the end
        assert_eq!(
            regex_search(&b, Point::new(12, 0), &re, Direction::Down),
            Some(Point::new(0, 0))
        );
        assert_eq!(
            regex_search(&b, Point::new(11, 0), &re, Direction::Up),
            Some(Point::new(0, 0))
        );
    }
}
