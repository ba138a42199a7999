//! Minimal frame drawer: visible buffer lines, a status line, and the
//! hardware cursor. Styling comes from the colorizer contract; this module
//! knows nothing about languages.

use std::io::Write;

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

use core_model::{EditorContext, SpanStyle, SyntaxColorizer};
use core_text::BufferStatus;

pub fn draw_frame(
    ctx: &mut EditorContext,
    colorizer: &dyn SyntaxColorizer,
    command_line: Option<&str>,
    size: (u16, u16),
    out: &mut impl Write,
) -> std::io::Result<()> {
    let width = i64::from(size.0);
    let height = i64::from(size.1);
    if width < 1 || height < 2 {
        return Ok(());
    }
    let text_rows = height - 1;
    ctx.view.follow_cursor(width, text_rows);
    let scroll = ctx.view.scroll;
    let cursor = ctx.view.cursor;

    let status = status_line(ctx, command_line, width as usize);

    let Some(record) = ctx.buffers.get(ctx.view.buffer) else {
        return Ok(());
    };
    let buffer = &record.buffer;

    for row in 0..text_rows {
        let y = scroll.y + row;
        queue!(out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
        let Some(line) = buffer.line(y) else {
            continue;
        };
        let visible_len = line
            .chars()
            .skip(scroll.x as usize)
            .take(width as usize)
            .count() as i64;
        if visible_len == 0 {
            continue;
        }
        for span in colorizer.colorize(buffer, y, (scroll.x, scroll.x + visible_len)) {
            let slice: String = line
                .chars()
                .skip(span.start.max(0) as usize)
                .take((span.end - span.start).max(0) as usize)
                .collect();
            match span_color(span.style) {
                Some(color) => {
                    queue!(out, SetForegroundColor(color), Print(slice), ResetColor)?;
                }
                None => queue!(out, Print(slice))?,
            }
        }
    }

    queue!(
        out,
        MoveTo(0, (height - 1) as u16),
        Clear(ClearType::CurrentLine),
        Print(status)
    )?;

    let cx = (cursor.x - scroll.x).clamp(0, width - 1) as u16;
    let cy = (cursor.y - scroll.y).clamp(0, text_rows - 1) as u16;
    queue!(out, MoveTo(cx, cy))?;
    out.flush()
}

fn span_color(style: SpanStyle) -> Option<Color> {
    match style {
        SpanStyle::Normal => None,
        SpanStyle::Keyword => Some(Color::Blue),
        SpanStyle::Comment => Some(Color::DarkGreen),
        SpanStyle::String => Some(Color::Yellow),
        SpanStyle::Highlight => Some(Color::Cyan),
    }
}

/// `MODE name [+]  y,x   <message | :command | /pattern>` fitted to the
/// terminal width.
fn status_line(ctx: &EditorContext, command_line: Option<&str>, width: usize) -> String {
    let (name, modified) = ctx
        .buffers
        .get(ctx.view.buffer)
        .map(|r| {
            (
                r.buffer.name.clone(),
                r.buffer.status == BufferStatus::Modified,
            )
        })
        .unwrap_or_default();
    let tail = if let Some(command) = command_line {
        format!(":{command}")
    } else if let Some(entry) = &ctx.vim.search_entry {
        format!("/{}", entry.line)
    } else {
        ctx.messages.latest().unwrap_or_default().to_string()
    };
    let mut status = format!(
        "{} {}{}  {},{}  {}",
        ctx.vim.mode,
        name,
        if modified { " [+]" } else { "" },
        ctx.view.cursor.y + 1,
        ctx.view.cursor.x + 1,
        tail
    );
    while status.width() > width {
        status.pop();
    }
    status
}
