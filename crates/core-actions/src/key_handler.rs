//! Top-level key dispatch.
//!
//! Runs to completion per key, owning the buffer, commit log, modal state
//! and registers for the duration. Insert mode edits directly with
//! `KeepGoing` commits; Normal and the visual modes accumulate pending
//! keys and re-parse them each keystroke. Undo/redo, repeat (`.`) and the
//! search entry line sit in front of the grammar and only fire on an empty
//! pending buffer.

use core_keymap::Key;
use core_state::{BufferState, CommitChain, Mode, YankMode, registers::SEARCH_REG};
use core_text::{Buffer, BufferStatus, Direction, Point, motion};
use tracing::trace;

use crate::{
    Action, ChangeKind, EditorOptions, MotionKind, SearchEntry, VimState,
    executor::apply_action,
    parser::{Parse, ParseContext, parse_action},
};

/// Outcome of feeding one key through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key meant nothing; pending input was cleared.
    Unhandled,
    /// The key was consumed (insert edit, legal prefix, mode switch, ...).
    Handled,
    ActionSuccess,
    ActionFailure,
}

/// Feed one key through the pipeline. `repeating` marks replays driven by
/// `.`, which must not overwrite the recorded insert session.
pub fn handle_key(
    key: Key,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
    repeating: bool,
) -> KeyOutcome {
    trace!(target: "actions.key", ?key, mode = %state.mode, "key");
    if state.search_entry.is_some() {
        return handle_search_entry_key(key, buffer, cursor, state, buffer_state);
    }
    match state.mode {
        Mode::Insert => handle_insert_key(key, buffer, cursor, state, buffer_state, options, repeating),
        Mode::VisualRange | Mode::VisualLine => match key {
            Key::Escape => {
                state.mode = Mode::Normal;
                state.pending.clear();
                record_intercept(state, key);
                KeyOutcome::Handled
            }
            Key::Char('v') => {
                state.mode = if state.mode == Mode::VisualRange {
                    Mode::Normal
                } else {
                    Mode::VisualRange
                };
                state.pending.clear();
                record_intercept(state, key);
                KeyOutcome::Handled
            }
            Key::Char('V') => {
                state.mode = if state.mode == Mode::VisualLine {
                    Mode::Normal
                } else {
                    Mode::VisualLine
                };
                state.pending.clear();
                record_intercept(state, key);
                KeyOutcome::Handled
            }
            _ => handle_command_key(key, buffer, cursor, state, buffer_state, options, repeating),
        },
        Mode::Normal => handle_command_key(key, buffer, cursor, state, buffer_state, options, repeating),
    }
}

/// Mirror a mode-switch key intercepted outside the grammar into the
/// recording, as its own chained node. Keys arriving from a playback are
/// not mirrored; the `@x` keys that started it already were.
fn record_intercept(state: &mut VimState, key: Key) {
    if state.playing_macro.is_some() {
        return;
    }
    if let Some(record) = state.recording.as_mut() {
        record.push_key(key);
        record.finish_action(true);
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_insert_key(
    key: Key,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
    repeating: bool,
) -> KeyOutcome {
    let was_recording = state.recording_register();
    let insert_at = *cursor;
    let undo_cursor = state.insert_start.take().unwrap_or(insert_at);

    match key {
        Key::Char(c) if !c.is_control() => {
            if buffer.insert_char(insert_at, c).is_ok() {
                state.pending.push(key);
                cursor.x += 1;
                buffer_state.commits.push_insert_char(
                    insert_at,
                    undo_cursor,
                    *cursor,
                    c,
                    CommitChain::KeepGoing,
                );
            }
        }
        Key::Escape => {
            if !repeating {
                state.last_insert_keys = state.pending.iter().copied().collect();
            }
            state.pending.clear();
            remove_line_if_all_whitespace(buffer, cursor.y, *cursor, buffer_state);
            state.mode = Mode::Normal;
            cursor.x = (cursor.x - 1).max(0);
            motion::clamp(buffer, cursor);
            buffer_state.cursor_save_column = cursor.x;
            if state.playing_macro.is_none() {
                buffer_state.commits.set_tail_chain(CommitChain::Stop);
            }
        }
        Key::Enter => {
            let save = *cursor;
            let tab_width = options.tab_string.chars().count() as i64;
            let indent = motion::indentation_for_line(buffer, cursor.y, tab_width);
            if buffer.insert_char(insert_at, '\n').is_ok() {
                cursor.y += 1;
                cursor.x = 0;
                buffer_state.commits.push_insert_char(
                    insert_at,
                    undo_cursor,
                    *cursor,
                    '\n',
                    CommitChain::KeepGoing,
                );
                state.pending.push(key);
                if indent > 0 {
                    let text = " ".repeat(indent as usize);
                    if buffer.insert_string(*cursor, &text).is_ok() {
                        let pre = *cursor;
                        cursor.x += indent;
                        buffer_state.commits.push_insert_string(
                            pre,
                            pre,
                            *cursor,
                            text,
                            CommitChain::KeepGoing,
                        );
                    }
                }
                remove_line_if_all_whitespace(buffer, save.y, *cursor, buffer_state);
            }
        }
        Key::Backspace => {
            let mut before = Point::new(cursor.x - 1, cursor.y);
            if before.x < 0 {
                if before.y == 0 {
                    // nothing before (0, 0)
                    mirror_insert_key(state, was_recording, key, false);
                    return KeyOutcome::Handled;
                }
                before = Point::new(buffer.line_len(cursor.y - 1).unwrap_or(0), cursor.y - 1);
            }
            if let Some(ch) = buffer.get(before)
                && buffer.remove_char(before).is_ok()
            {
                buffer_state.commits.push_remove_char(
                    before,
                    *cursor,
                    before,
                    ch,
                    CommitChain::KeepGoing,
                );
                *cursor = before;
                state.pending.push(key);
            }
        }
        Key::Tab => {
            if buffer.insert_string(insert_at, &options.tab_string).is_ok() {
                let width = options.tab_string.chars().count() as i64;
                cursor.x += width;
                buffer_state.commits.push_insert_string(
                    insert_at,
                    undo_cursor,
                    *cursor,
                    options.tab_string.clone(),
                    CommitChain::KeepGoing,
                );
                state.pending.push(key);
            }
        }
        Key::Up | Key::Down => {
            cursor.y += if key == Key::Down { 1 } else { -1 };
            cursor.y = cursor.y.clamp(0, (buffer.line_count() - 1).max(0));
            cursor.x = cursor.x.min(buffer.line_len(cursor.y).unwrap_or(0));
            end_insert_run(state, buffer_state, repeating);
        }
        Key::Left | Key::Right => {
            cursor.x += if key == Key::Right { 1 } else { -1 };
            cursor.x = cursor.x.clamp(0, buffer.line_len(cursor.y).unwrap_or(0));
            end_insert_run(state, buffer_state, repeating);
        }
        _ => return KeyOutcome::Unhandled,
    }

    let left_insert = state.mode == Mode::Normal;
    mirror_insert_key(state, was_recording, key, left_insert);
    KeyOutcome::Handled
}

/// An arrow key inside insert mode breaks undo coalescing and flushes the
/// insert session keys.
fn end_insert_run(state: &mut VimState, buffer_state: &mut BufferState, repeating: bool) {
    if state.playing_macro.is_none() {
        buffer_state.commits.set_tail_chain(CommitChain::Stop);
    }
    if !repeating {
        state.last_insert_keys = state.pending.iter().copied().collect();
    }
    state.pending.clear();
}

fn mirror_insert_key(state: &mut VimState, was_recording: Option<char>, key: Key, finish: bool) {
    if state.playing_macro.is_some() {
        return;
    }
    if was_recording.is_some() && was_recording == state.recording_register()
        && let Some(record) = state.recording.as_mut()
    {
        record.push_key(key);
        if finish {
            record.finish_action(false);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_command_key(
    key: Key,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
    repeating: bool,
) -> KeyOutcome {
    let was_recording = state.recording_register();

    // keys outside the modal grammar fire only on an empty prefix
    if state.mode == Mode::Normal && state.pending.is_empty() {
        match key {
            Key::Char('u') => return handle_undo(buffer, cursor, state, buffer_state),
            Key::Ctrl('r') => return handle_redo(buffer, cursor, state, buffer_state),
            Key::Char('.') if !repeating => {
                return handle_repeat(buffer, cursor, state, buffer_state, options);
            }
            Key::Char('/') => {
                state.search_entry = Some(SearchEntry {
                    line: String::new(),
                    direction: Direction::Down,
                });
                record_intercept_key(state, key);
                return KeyOutcome::Handled;
            }
            Key::Char('?') => {
                state.search_entry = Some(SearchEntry {
                    line: String::new(),
                    direction: Direction::Up,
                });
                record_intercept_key(state, key);
                return KeyOutcome::Handled;
            }
            _ => {}
        }
    }

    state.pending.push(key);
    let pending: Vec<Key> = state.pending.iter().copied().collect();
    let ctx = ParseContext {
        mode: state.mode,
        buffer,
        cursor: *cursor,
        visual_start: state.visual_start,
        recording: state.recording.is_some(),
    };
    match parse_action(&pending, &ctx) {
        Parse::Invalid => {
            state.pending.clear();
            KeyOutcome::Unhandled
        }
        Parse::Continue => {
            record_intercept_key(state, key);
            KeyOutcome::Handled
        }
        Parse::Complete(action) => {
            let original_mode = state.mode;
            let success = apply_action(&action, buffer, cursor, state, buffer_state, options);

            // mode transitions are explicit executor outputs; entering one
            // has its own side effects
            if state.mode != original_mode {
                match state.mode {
                    Mode::Insert => {
                        if buffer.status == BufferStatus::Readonly {
                            state.mode = Mode::Normal;
                            state.message("buffer is readonly");
                        }
                    }
                    Mode::VisualRange | Mode::VisualLine => {
                        state.visual_start = *cursor;
                    }
                    Mode::Normal => {}
                }
            }

            if action.change != ChangeKind::Motion || action.end_mode == Mode::Insert {
                if state.playing_macro.is_none() && success {
                    state.last_action = Some(action);
                    // stopping a recording repeats as "play that register"
                    if state.recording.is_none()
                        && matches!(action.change, ChangeKind::RecordMacro(_))
                        && let Some(reg) = was_recording
                    {
                        state.last_action = Some(Action {
                            change: ChangeKind::PlayMacro(reg),
                            ..action
                        });
                    }
                }
                // a repeated visual action replays the same span anchored
                // at the cursor
                if let Some(last) = state.last_action.as_mut()
                    && !matches!(last.change, ChangeKind::Indent | ChangeKind::Unindent)
                {
                    match last.motion.kind {
                        MotionKind::VisualRange { length, .. } => {
                            last.motion.kind = MotionKind::VisualRange {
                                length: length.abs(),
                                start_after: true,
                            };
                        }
                        MotionKind::VisualLine { lines, .. } => {
                            last.motion.kind = MotionKind::VisualLine {
                                lines: lines.abs(),
                                start_after: true,
                            };
                        }
                        _ => {}
                    }
                }
            }

            if state.playing_macro.is_none()
                && was_recording.is_some()
                && was_recording == state.recording_register()
            {
                let finish = state.mode != Mode::Insert;
                let chained = action.change == ChangeKind::Motion;
                if let Some(record) = state.recording.as_mut() {
                    record.push_key(key);
                    if finish {
                        record.finish_action(chained);
                    }
                }
            }

            state.pending.clear();
            if success {
                KeyOutcome::ActionSuccess
            } else {
                KeyOutcome::ActionFailure
            }
        }
    }
}

/// Mirror a key that extended (but did not complete) a command, or an
/// interactive-entry key, into the recording.
fn record_intercept_key(state: &mut VimState, key: Key) {
    if state.playing_macro.is_some() {
        return;
    }
    if let Some(record) = state.recording.as_mut() {
        record.push_key(key);
    }
}

fn handle_undo(
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
) -> KeyOutcome {
    match buffer_state.commits.undo(buffer, cursor) {
        Ok(true) => {
            motion::clamp(buffer, cursor);
            // keep the recording consistent with the reverted buffer
            if state.recording.is_some() {
                let kept = state.recording.as_mut().is_some_and(|r| r.undo_step());
                if !kept {
                    state.recording = None;
                }
            }
        }
        Ok(false) => {}
        Err(error) => state.message(format!("undo failed: {error}")),
    }
    KeyOutcome::Handled
}

fn handle_redo(
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
) -> KeyOutcome {
    match buffer_state.commits.redo(buffer, cursor) {
        Ok(true) => {
            motion::clamp(buffer, cursor);
            if let Some(record) = state.recording.as_mut() {
                record.redo_step();
            }
        }
        Ok(false) => {}
        Err(error) => state.message(format!("redo failed: {error}")),
    }
    KeyOutcome::Handled
}

/// `.`: replay the last completed action; when it entered insert, replay
/// the recorded insert session too, coalesced into one undo chain.
fn handle_repeat(
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
) -> KeyOutcome {
    let Some(last) = state.last_action else {
        return KeyOutcome::Handled;
    };
    let success = apply_action(&last, buffer, cursor, state, buffer_state, options);
    if state.mode == Mode::Insert
        && !state.last_insert_keys.is_empty()
        && !matches!(last.change, ChangeKind::PlayMacro(_))
    {
        for key in state.last_insert_keys.clone() {
            handle_key(key, buffer, cursor, state, buffer_state, options, true);
        }
        if state.mode == Mode::Insert {
            handle_key(Key::Escape, buffer, cursor, state, buffer_state, options, true);
        }
    }
    if success {
        KeyOutcome::ActionSuccess
    } else {
        KeyOutcome::ActionFailure
    }
}

fn handle_search_entry_key(
    key: Key,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
) -> KeyOutcome {
    record_intercept_key(state, key);
    match key {
        Key::Char(c) if !c.is_control() => {
            if let Some(entry) = state.search_entry.as_mut() {
                entry.line.push(c);
            }
        }
        Key::Backspace => {
            if let Some(entry) = state.search_entry.as_mut() {
                entry.line.pop();
            }
        }
        Key::Escape => {
            state.search_entry = None;
            finish_recorded_entry(state);
        }
        Key::Enter => {
            let Some(entry) = state.search_entry.take() else {
                return KeyOutcome::Unhandled;
            };
            finish_recorded_entry(state);
            if entry.line.is_empty() {
                return KeyOutcome::Handled;
            }
            state
                .yanks
                .set(SEARCH_REG, entry.line.clone(), YankMode::Normal);
            state.search.direction = entry.direction;
            state.search.start = *cursor;
            if state.search.compile(&entry.line) {
                let hit = state
                    .search
                    .valid()
                    .and_then(|regex| motion::regex_search(buffer, *cursor, regex, entry.direction));
                match hit {
                    Some(hit) => {
                        *cursor = hit;
                        buffer_state.cursor_save_column = cursor.x;
                    }
                    None => state.message(format!("failed to find match for '{}'", entry.line)),
                }
            } else {
                state.message(format!("invalid regex '{}'", entry.line));
            }
        }
        _ => {}
    }
    KeyOutcome::Handled
}

/// Seal the search-entry keys into one chained recording node.
fn finish_recorded_entry(state: &mut VimState) {
    if state.playing_macro.is_some() {
        return;
    }
    if let Some(record) = state.recording.as_mut() {
        record.finish_action(true);
    }
}

fn remove_line_if_all_whitespace(
    buffer: &mut Buffer,
    y: i64,
    cursor_before: Point,
    buffer_state: &mut BufferState,
) {
    let all_whitespace = buffer
        .line(y)
        .is_some_and(|line| !line.is_empty() && line.chars().all(char::is_whitespace));
    if !all_whitespace {
        return;
    }
    let at = Point::new(0, y);
    let Some(removed) = buffer.dupe_line(y) else {
        return;
    };
    if buffer
        .remove_string(at, removed.chars().count() as i64)
        .is_ok()
    {
        buffer_state.commits.push_remove_string(
            at,
            cursor_before,
            at,
            removed,
            CommitChain::KeepGoing,
        );
    }
}
