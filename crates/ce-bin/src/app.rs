//! The application shell: terminal lifecycle, key conversion, command
//! line, and session restore/save around the core pipeline.

use std::io::stdout;
use std::path::PathBuf;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use tracing::{info, warn};

use core_actions::{EditorOptions, handle_key};
use core_config::{Config, Session};
use core_keymap::Key;
use core_model::{BufferId, EditorContext, PlainColorizer};
use core_state::{Mode, YankMode, registers::SEARCH_REG};
use core_text::BufferStatus;

use crate::command::ParsedCommand;
use crate::draw;

pub struct App {
    ctx: EditorContext,
    options: EditorOptions,
    colorizer: PlainColorizer,
    /// Active `:` command line, without the colon.
    command_line: Option<String>,
    session_path: Option<PathBuf>,
    quit: bool,
}

impl App {
    pub fn new(paths: &[PathBuf]) -> Result<Self> {
        let config = match Config::default_path() {
            Some(path) => Config::load(&path).unwrap_or_else(|error| {
                warn!(target: "config", %error, "config_load_failed_using_defaults");
                Config::default()
            }),
            None => Config::default(),
        };
        let options = EditorOptions {
            tab_string: config.tab_string,
        };

        let mut ctx = EditorContext::new();
        let mut first: Option<BufferId> = None;
        for path in paths {
            match ctx.buffers.open(path) {
                Ok(id) => first = first.or(Some(id)),
                Err(error) => ctx.messages.push(error.to_string()),
            }
        }
        if let Some(id) = first {
            ctx.focus(id);
        }

        let session_path = Session::default_path();
        if let Some(path) = &session_path {
            match Session::load(path) {
                Ok(session) => restore_session(&mut ctx, &session),
                Err(error) => warn!(target: "session", %error, "session_load_failed"),
            }
        }

        Ok(Self {
            ctx,
            options,
            colorizer: PlainColorizer,
            command_line: None,
            session_path,
            quit: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let _guard = TerminalGuard::enter()?;
        while !self.quit {
            self.draw()?;
            match event::read().context("reading terminal event")? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    self.handle_key_event(key);
                }
                Event::Resize(..) => {}
                _ => {}
            }
        }
        self.save_session();
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let (width, height) = terminal::size().context("querying terminal size")?;
        let mut out = stdout();
        draw::draw_frame(
            &mut self.ctx,
            &self.colorizer,
            self.command_line.as_deref(),
            (width, height),
            &mut out,
        )
        .context("drawing frame")?;
        Ok(())
    }

    fn handle_key_event(&mut self, event: KeyEvent) {
        if self.command_line.is_some() {
            self.handle_command_line_key(event);
            return;
        }
        if event.code == KeyCode::Char(':')
            && !event.modifiers.contains(KeyModifiers::CONTROL)
            && self.ctx.vim.mode == Mode::Normal
            && self.ctx.vim.pending.is_empty()
            && self.ctx.vim.search_entry.is_none()
        {
            self.command_line = Some(String::new());
            return;
        }
        let Some(key) = convert_key(event) else {
            return;
        };
        let Some(record) = self.ctx.buffers.get_mut(self.ctx.view.buffer) else {
            return;
        };
        handle_key(
            key,
            &mut record.buffer,
            &mut self.ctx.view.cursor,
            &mut self.ctx.vim,
            &mut record.state,
            &self.options,
            false,
        );
        self.ctx.drain_message();
    }

    fn handle_command_line_key(&mut self, event: KeyEvent) {
        let Some(line) = self.command_line.as_mut() else {
            return;
        };
        match event.code {
            KeyCode::Char(c) if !event.modifiers.contains(KeyModifiers::CONTROL) => line.push(c),
            KeyCode::Backspace => {
                if line.pop().is_none() {
                    self.command_line = None;
                }
            }
            KeyCode::Esc => self.command_line = None,
            KeyCode::Enter => {
                let line = self.command_line.take().unwrap_or_default();
                self.run_command(&line);
            }
            _ => {}
        }
    }

    fn run_command(&mut self, line: &str) {
        match ParsedCommand::parse(line) {
            ParsedCommand::Quit { force } => {
                let unsaved = self
                    .ctx
                    .buffers
                    .iter()
                    .any(|(_, r)| r.buffer.status == BufferStatus::Modified);
                if unsaved && !force {
                    self.ctx
                        .messages
                        .push("unsaved changes (:q! discards them)");
                } else {
                    self.quit = true;
                }
            }
            ParsedCommand::Write { path } => {
                let Some(record) = self.ctx.buffers.get_mut(self.ctx.view.buffer) else {
                    return;
                };
                if let Some(path) = path {
                    record.buffer.name = core_text::display_name(&path);
                    record.buffer.filename = Some(path);
                }
                match record.buffer.save() {
                    Ok(()) => {
                        let message = format!("'{}' written", record.buffer.name);
                        self.ctx.messages.push(message);
                    }
                    Err(error) => self.ctx.messages.push(error.to_string()),
                }
            }
            ParsedCommand::Edit { path } => match self.ctx.buffers.open(&path) {
                Ok(id) => self.ctx.focus(id),
                Err(error) => self.ctx.messages.push(error.to_string()),
            },
            ParsedCommand::Unknown(cmd) => {
                self.ctx.messages.push(format!("unknown command ':{cmd}'"));
            }
        }
    }

    /// Persist the search pattern and per-buffer cursor lines to `~/.ce`.
    fn save_session(&mut self) {
        let Some(path) = &self.session_path else {
            return;
        };
        // the active view owns the freshest cursor
        let active = self.ctx.view.buffer;
        if let Some(record) = self.ctx.buffers.get_mut(active) {
            record.buffer.cursor = self.ctx.view.cursor;
        }
        let session = Session {
            search_pattern: self
                .ctx
                .vim
                .yanks
                .get(SEARCH_REG)
                .map(|yank| yank.text.clone()),
            buffer_cursors: self
                .ctx
                .buffers
                .iter()
                .filter(|(_, r)| r.buffer.status != BufferStatus::Readonly)
                .map(|(_, r)| (r.buffer.name.clone(), r.buffer.cursor.y))
                .collect(),
        };
        if let Err(error) = session.save(path) {
            warn!(target: "session", %error, "session_save_failed");
        } else {
            info!(target: "session", buffers = session.buffer_cursors.len(), "session_saved");
        }
    }
}

fn restore_session(ctx: &mut EditorContext, session: &Session) {
    if let Some(pattern) = &session.search_pattern {
        ctx.vim
            .yanks
            .set(SEARCH_REG, pattern.clone(), YankMode::Normal);
        ctx.vim.search.compile(pattern);
    }
    let restores: Vec<(BufferId, i64)> = ctx
        .buffers
        .iter()
        .filter_map(|(id, r)| session.cursor_line_for(&r.buffer.name).map(|y| (id, y)))
        .collect();
    for (id, y) in restores {
        if let Some(record) = ctx.buffers.get_mut(id) {
            let clamped = y.clamp(0, (record.buffer.line_count() - 1).max(0));
            record.buffer.cursor.y = clamped;
            if id == ctx.view.buffer {
                ctx.view.cursor.y = clamped;
            }
        }
    }
}

/// Raw-mode + alternate-screen guard; restores the terminal on drop, so a
/// panic or early return never leaves the shell unusable.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Show)
            .context("entering alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Map a crossterm key event onto the editor's `Key` type. Keys the core
/// does not understand map to `None` and are dropped here.
fn convert_key(event: KeyEvent) -> Option<Key> {
    match event.code {
        KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Ctrl(c)),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Tab => Some(Key::Tab),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn convert_plain_and_ctrl_keys() {
        assert_eq!(convert_key(key(KeyCode::Char('x'))), Some(Key::Char('x')));
        assert_eq!(
            convert_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            Some(Key::Ctrl('r'))
        );
        assert_eq!(convert_key(key(KeyCode::Esc)), Some(Key::Escape));
        assert_eq!(convert_key(key(KeyCode::F(1))), None);
    }

    #[test]
    fn session_restore_clamps_cursor_lines() {
        let mut ctx = EditorContext::new();
        let id = ctx
            .buffers
            .add(core_text::Buffer::from_str("short.txt", "one\ntwo"));
        ctx.focus(id);
        let session = Session {
            search_pattern: Some("two".into()),
            buffer_cursors: vec![("short.txt".into(), 99)],
        };
        restore_session(&mut ctx, &session);
        assert_eq!(ctx.view.cursor.y, 1);
        assert!(ctx.vim.search.valid().is_some());
    }
}
