//! Action executor: resolve the range, mutate the buffer, write commits,
//! update registers, emit the next mode.
//!
//! Commits are appended only after a mutation succeeds, so a failing action
//! can never corrupt the log. While a macro is playing back every commit
//! chains `KeepGoing`; the playback loop terminates the chain, so one undo
//! reverses a whole macro. Composite operations (linewise change, paste,
//! join, indents over a range) chain their internal commits the same way
//! and terminate with the ambient chain flag.

use core_keymap::Key;
use core_state::{
    BufferState, CommitChain, MacroRecord, Mode, YankMode,
    registers::{UNNAMED_REG, ZERO_REG},
};
use core_text::{Buffer, Point, motion};
use tracing::debug;

use crate::{
    Action, ChangeKind, EditorOptions, MotionKind, VimState, key_handler,
    key_handler::KeyOutcome, range::resolve_range,
};

/// Apply one parsed action. Returns false when the action could not apply;
/// the buffer and commit log are untouched in that case.
pub fn apply_action(
    action: &Action,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
) -> bool {
    let chain = if state.playing_macro.is_some() {
        CommitChain::KeepGoing
    } else {
        CommitChain::Stop
    };

    let Some(range) = resolve_range(action, buffer, cursor, state, buffer_state) else {
        debug!(target: "actions.apply", change = ?action.change, "range_unresolved");
        return false;
    };
    let (sorted_start, sorted_end) = range.sorted();
    let was_visual = matches!(state.mode, Mode::VisualRange | Mode::VisualLine);

    match action.change {
        ChangeKind::Motion => {
            if action.end_mode == Mode::Insert {
                state.insert_start = Some(*cursor);
            }
            *cursor = range.end;
            if matches!(action.motion.kind, MotionKind::Up | MotionKind::Down) {
                cursor.x = buffer_state.cursor_save_column;
            }
            if state.mode == Mode::VisualRange {
                // keep the anchor outside the motion's span so the
                // selection always covers what the motion reached
                let anchor = state.visual_start;
                if anchor.after(cursor) && sorted_end.after(&anchor) {
                    state.visual_start = sorted_end;
                } else if cursor.after(&anchor) && anchor.after(&sorted_start) {
                    state.visual_start = sorted_start;
                }
            }
        }
        ChangeKind::Delete => {
            if !apply_delete(action, &range, buffer, cursor, state, buffer_state, chain) {
                return false;
            }
        }
        ChangeKind::PasteBefore | ChangeKind::PasteAfter => {
            if !apply_paste(action, &range, buffer, cursor, state, buffer_state, chain) {
                return false;
            }
        }
        ChangeKind::ChangeChar(new) => {
            let Some(old) = buffer.get(sorted_start) else {
                return false;
            };
            if buffer.set(sorted_start, new).is_err() {
                return false;
            }
            buffer_state
                .commits
                .push_change_char(sorted_start, *cursor, sorted_start, new, old, chain);
        }
        ChangeKind::Yank => {
            let Some(mut text) = buffer.dupe(sorted_start, sorted_end) else {
                return false;
            };
            if range.yank_mode == YankMode::Line && text.ends_with('\n') {
                text.pop();
            }
            state.yanks.set(ZERO_REG, text.clone(), range.yank_mode);
            state
                .yanks
                .set(action.reg.unwrap_or(UNNAMED_REG), text, range.yank_mode);
        }
        ChangeKind::Indent => {
            if linewise_target(action.motion.kind) {
                for y in sorted_start.y..=sorted_end.y {
                    if buffer.line_len(y).unwrap_or(0) == 0 {
                        continue;
                    }
                    let loc = Point::new(0, y);
                    if buffer.insert_string(loc, &options.tab_string).is_err() {
                        return false;
                    }
                    buffer_state.commits.push_insert_string(
                        loc,
                        *cursor,
                        *cursor,
                        options.tab_string.clone(),
                        CommitChain::KeepGoing,
                    );
                }
                buffer_state.commits.set_tail_chain(chain);
            }
        }
        ChangeKind::Unindent => {
            if linewise_target(action.motion.kind) {
                let tab_len = options.tab_string.chars().count();
                for y in sorted_start.y..=sorted_end.y {
                    let removed: String = buffer
                        .line(y)
                        .map(|line| {
                            line.chars()
                                .take(tab_len)
                                .take_while(|c| motion::is_blank(*c))
                                .collect()
                        })
                        .unwrap_or_default();
                    if removed.is_empty() {
                        continue;
                    }
                    let loc = Point::new(0, y);
                    if buffer.remove_string(loc, removed.chars().count() as i64).is_err() {
                        return false;
                    }
                    buffer_state.commits.push_remove_string(
                        loc,
                        *cursor,
                        *cursor,
                        removed,
                        CommitChain::KeepGoing,
                    );
                }
                buffer_state.commits.set_tail_chain(chain);
            }
        }
        ChangeKind::Comment => {
            if let Some(prefix) = buffer.file_type.comment_string() {
                let prefix = prefix.to_string();
                for y in sorted_start.y..=sorted_end.y {
                    if buffer.line_len(y).unwrap_or(0) == 0 {
                        continue;
                    }
                    let soft = motion::soft_line_beginning(buffer, y);
                    if buffer.insert_string(soft, &prefix).is_err() {
                        return false;
                    }
                    buffer_state.commits.push_insert_string(
                        soft,
                        *cursor,
                        *cursor,
                        prefix.clone(),
                        CommitChain::KeepGoing,
                    );
                }
                buffer_state.commits.set_tail_chain(chain);
            }
        }
        ChangeKind::Uncomment => {
            if let Some(prefix) = buffer.file_type.comment_string() {
                let prefix = prefix.to_string();
                let prefix_len = prefix.chars().count();
                for y in sorted_start.y..=sorted_end.y {
                    let soft = motion::soft_line_beginning(buffer, y);
                    let commented = buffer.line(y).is_some_and(|line| {
                        line.chars().skip(soft.x as usize).collect::<String>().starts_with(&prefix)
                    });
                    if !commented {
                        continue;
                    }
                    if buffer.remove_string(soft, prefix_len as i64).is_err() {
                        return false;
                    }
                    buffer_state.commits.push_remove_string(
                        soft,
                        *cursor,
                        *cursor,
                        prefix.clone(),
                        CommitChain::KeepGoing,
                    );
                }
                buffer_state.commits.set_tail_chain(chain);
            }
        }
        ChangeKind::FlipCase => {
            let mut itr = sorted_start;
            loop {
                if itr.after(&sorted_end) {
                    break;
                }
                let Some(ch) = buffer.get(itr) else { break };
                if ch.is_alphabetic() {
                    let new = if ch.is_uppercase() {
                        ch.to_lowercase().next().unwrap_or(ch)
                    } else {
                        ch.to_uppercase().next().unwrap_or(ch)
                    };
                    if buffer.set(itr, new).is_err() {
                        return false;
                    }
                    buffer_state
                        .commits
                        .push_change_char(itr, itr, itr, new, ch, CommitChain::KeepGoing);
                }
                let prev = itr;
                motion::advance(buffer, &mut itr, 1);
                if itr == prev {
                    break;
                }
            }
            buffer_state.commits.set_tail_chain(chain);
        }
        ChangeKind::JoinLine => {
            if sorted_start.y < buffer.line_count() - 1 {
                let y = sorted_start.y;
                let join_loc = Point::new(buffer.line_len(y).unwrap_or(0), y);
                let soft = motion::soft_line_beginning(buffer, y + 1);
                let absorbed: String = buffer
                    .line(y + 1)
                    .map(|line| line.chars().take(soft.x as usize).collect())
                    .unwrap_or_default();
                let removed = format!("\n{absorbed}");
                if buffer
                    .remove_string(join_loc, removed.chars().count() as i64)
                    .is_err()
                {
                    return false;
                }
                buffer_state.commits.push_remove_string(
                    join_loc,
                    *cursor,
                    join_loc,
                    removed,
                    CommitChain::KeepGoing,
                );
                *cursor = join_loc;
                if buffer.insert_string(join_loc, " ").is_ok() {
                    buffer_state
                        .commits
                        .push_insert_string(join_loc, *cursor, join_loc, " ", chain);
                }
            }
        }
        ChangeKind::OpenAbove => {
            let y = cursor.y;
            let begin = Point::new(0, y);
            let indent = motion::indentation_for_line(buffer, y, options.tab_string.chars().count() as i64);
            let text = format!("{}\n", " ".repeat(indent as usize));
            if buffer.insert_string(begin, &text).is_err() {
                return false;
            }
            *cursor = Point::new(indent, y);
            buffer_state
                .commits
                .push_insert_string(begin, *cursor, *cursor, text, CommitChain::KeepGoing);
        }
        ChangeKind::OpenBelow => {
            let y = cursor.y;
            let eol = Point::new(buffer.line_len(y).unwrap_or(0), y);
            let indent = motion::indentation_for_line(buffer, y, options.tab_string.chars().count() as i64);
            let text = format!("\n{}", " ".repeat(indent as usize));
            if buffer.insert_string(eol, &text).is_err() {
                return false;
            }
            let save = *cursor;
            *cursor = Point::new(indent, y + 1);
            buffer_state
                .commits
                .push_insert_string(eol, save, *cursor, text, CommitChain::KeepGoing);
        }
        ChangeKind::SetMark(reg) => {
            buffer_state.marks.set(reg, *cursor);
        }
        ChangeKind::RecordMacro(_) => {
            if let Some(record) = state.recording.take() {
                let register = record.register;
                let start_tail = record.start_commit_tail;
                let keys = record.finish();
                if !keys.is_empty() {
                    state.macros.set(register, keys);
                }
                // the whole recorded span undoes as one step
                buffer_state.commits.rewrite_chain_from(start_tail);
            } else if let ChangeKind::RecordMacro(Some(reg)) = action.change {
                state.recording = Some(MacroRecord::start(reg, buffer_state.commits.tail()));
            }
        }
        ChangeKind::PlayMacro(reg) => {
            play_macro(reg, action.multiplier, buffer, cursor, state, buffer_state, options);
        }
    }

    // leaving a visual mode through a range operator parks the cursor at
    // the start of the operated range
    if was_visual
        && matches!(
            action.change,
            ChangeKind::Yank
                | ChangeKind::Indent
                | ChangeKind::Unindent
                | ChangeKind::Comment
                | ChangeKind::Uncomment
                | ChangeKind::FlipCase
        )
    {
        *cursor = sorted_start;
    }

    state.mode = action.end_mode;

    if action.end_mode == Mode::Insert {
        let len = buffer.line_len(cursor.y).unwrap_or(0);
        if cursor.x > len {
            cursor.x = len;
        }
        // chain the mutation into the upcoming insert run
        if action.change != ChangeKind::Motion {
            buffer_state.commits.set_tail_chain(CommitChain::KeepGoing);
        }
    } else {
        let before_clamp = *cursor;
        motion::clamp(buffer, cursor);
        if before_clamp == *cursor {
            buffer_state.cursor_save_column = cursor.x;
        }
    }

    true
}

fn linewise_target(kind: MotionKind) -> bool {
    matches!(
        kind,
        MotionKind::Line
            | MotionKind::LineUp
            | MotionKind::LineDown
            | MotionKind::VisualRange { .. }
            | MotionKind::VisualLine { .. }
    )
}

#[allow(clippy::too_many_arguments)]
fn apply_delete(
    action: &Action,
    range: &crate::range::ActionRange,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    chain: CommitChain,
) -> bool {
    let (sorted_start, sorted_end) = range.sorted();
    *cursor = sorted_start;

    // a linewise range reaching the final line consumes the newline before
    // it rather than a (nonexistent) trailing one
    let at_eof = range.yank_mode == YankMode::Line && sorted_end.y >= buffer.line_count() - 1;
    let at = if at_eof && sorted_start.y > 0 {
        let y = sorted_start.y - 1;
        Point::new(buffer.line_len(y).unwrap_or(0), y)
    } else {
        sorted_start
    };
    let Some(removed) = buffer.dupe(at, sorted_end) else {
        return false;
    };
    if removed.is_empty() {
        return false;
    }
    if buffer
        .remove_string(at, removed.chars().count() as i64)
        .is_err()
    {
        return false;
    }

    if action.yank {
        let mut text = removed.clone();
        if range.yank_mode == YankMode::Line {
            if text.ends_with('\n') {
                text.pop();
            } else if text.starts_with('\n') {
                text.remove(0);
            }
        }
        state
            .yanks
            .set(action.reg.unwrap_or(UNNAMED_REG), text, range.yank_mode);
    }

    buffer_state
        .commits
        .push_remove_string(at, sorted_start, at, removed, chain);
    true
}

#[allow(clippy::too_many_arguments)]
fn apply_paste(
    action: &Action,
    range: &crate::range::ActionRange,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    chain: CommitChain,
) -> bool {
    let (sorted_start, _) = range.sorted();
    let Some(yank) = state.yanks.get(action.reg.unwrap_or(UNNAMED_REG)).cloned() else {
        return false;
    };
    let before = action.change == ChangeKind::PasteBefore;
    match yank.mode {
        YankMode::Normal => {
            if before {
                if buffer.insert_string(sorted_start, &yank.text).is_err() {
                    return false;
                }
                buffer_state.commits.push_insert_string(
                    sorted_start,
                    sorted_start,
                    sorted_start,
                    yank.text,
                    chain,
                );
            } else {
                let mut insert_cursor = *cursor;
                let mut advance_len = yank.text.chars().count() as i64;
                if buffer.line_len(cursor.y).unwrap_or(0) == 0 {
                    // an empty line has no "after": paste inline at x = 0
                    advance_len -= 1;
                } else {
                    insert_cursor.x += 1;
                }
                if buffer.insert_string(insert_cursor, &yank.text).is_err() {
                    return false;
                }
                buffer_state.commits.push_insert_string(
                    insert_cursor,
                    sorted_start,
                    sorted_start,
                    yank.text,
                    chain,
                );
                motion::advance(buffer, cursor, advance_len);
            }
        }
        YankMode::Line => {
            if before {
                let insert_loc = Point::new(0, cursor.y);
                let text = format!("{}\n", yank.text);
                if buffer.insert_string(insert_loc, &text).is_err() {
                    return false;
                }
                buffer_state
                    .commits
                    .push_insert_string(insert_loc, *cursor, insert_loc, text, chain);
            } else {
                let insert_loc = Point::new(buffer.line_len(cursor.y).unwrap_or(0), cursor.y);
                let cursor_loc = Point::new(0, cursor.y + 1);
                let text = format!("\n{}", yank.text);
                if buffer.insert_string(insert_loc, &text).is_err() {
                    return false;
                }
                buffer_state
                    .commits
                    .push_insert_string(insert_loc, *cursor, cursor_loc, text, chain);
                *cursor = cursor_loc;
            }
        }
    }
    true
}

fn play_macro(
    reg: char,
    multiplier: i64,
    buffer: &mut Buffer,
    cursor: &mut Point,
    state: &mut VimState,
    buffer_state: &mut BufferState,
    options: &EditorOptions,
) {
    if state.playing_macro == Some(reg) {
        state.message(format!(
            "attempted to play macro in register '{reg}' inside itself"
        ));
        return;
    }
    let Some(keys) = state.macros.get(reg).map(<[Key]>::to_vec) else {
        state.message(format!("no macro defined in register '{reg}'"));
        return;
    };
    let saved_pending = std::mem::take(&mut state.pending);
    let saved_playing = state.playing_macro;
    state.playing_macro = Some(reg);
    let mut aborted = false;
    for _ in 0..multiplier.max(1) {
        for key in &keys {
            match key_handler::handle_key(*key, buffer, cursor, state, buffer_state, options, false)
            {
                // an unhandled or failing key ends the whole playback,
                // remaining repeats included
                KeyOutcome::Unhandled | KeyOutcome::ActionFailure => {
                    aborted = true;
                    break;
                }
                _ => {}
            }
        }
        state.pending.clear();
        buffer_state.commits.set_tail_chain(CommitChain::Stop);
        if aborted {
            break;
        }
    }
    state.playing_macro = saved_playing;
    state.pending = saved_pending;
}
