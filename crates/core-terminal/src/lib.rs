//! Embedded terminal contract.
//!
//! A [`Terminal`] owns a text buffer that only its reader thread mutates:
//! the thread drains the terminal's output transport, appends completed
//! lines under the buffer lock, and signals the drawer over a
//! crossbeam channel after every batch. The editor core never mutates a
//! terminal buffer directly; it talks to the terminal through `send_key`,
//! `resize`, and `current_directory`.
//!
//! The transport is abstract (`Read` + `Write`), so the real PTY plumbing
//! stays outside this crate; closing the transport ends the reader thread,
//! which is then joined on drop.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use core_keymap::Key;
use core_text::Buffer;
use tracing::{debug, warn};

/// Notification the drawer receives from a terminal's reader thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    /// New output was appended to the terminal buffer.
    Output,
    /// The transport reached end of stream; the terminal is dead.
    Exited,
}

pub struct Terminal {
    buffer: Arc<Mutex<Buffer>>,
    writer: Box<dyn Write + Send>,
    size: (u16, u16),
    cwd: PathBuf,
    alive: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Terminal {
    /// Spawn the reader thread over `output` and wire notifications into
    /// `notify`. `input` receives the bytes of keys sent to the terminal.
    pub fn spawn(
        output: impl Read + Send + 'static,
        input: impl Write + Send + 'static,
        cwd: PathBuf,
        size: (u16, u16),
        notify: Sender<TerminalEvent>,
    ) -> Self {
        let buffer = Arc::new(Mutex::new(Buffer::new("[terminal]")));
        let alive = Arc::new(AtomicBool::new(true));
        let reader = {
            let buffer = Arc::clone(&buffer);
            let alive = Arc::clone(&alive);
            std::thread::spawn(move || {
                reader_loop(output, &buffer, &notify);
                alive.store(false, Ordering::SeqCst);
                let _ = notify.send(TerminalEvent::Exited);
            })
        };
        Self {
            buffer,
            writer: Box::new(input),
            size,
            cwd,
            alive,
            reader: Some(reader),
        }
    }

    /// Encode a key into terminal input bytes and write it through.
    pub fn send_key(&mut self, key: Key) -> std::io::Result<()> {
        let mut bytes = [0u8; 4];
        let encoded: &[u8] = match key {
            Key::Char(c) => c.encode_utf8(&mut bytes).as_bytes(),
            Key::Ctrl(c) => {
                bytes[0] = (c.to_ascii_uppercase() as u8) & 0x1f;
                &bytes[..1]
            }
            Key::Enter => b"\r",
            Key::Tab => b"\t",
            Key::Backspace => b"\x7f",
            Key::Escape => b"\x1b",
            Key::Up => b"\x1b[A",
            Key::Down => b"\x1b[B",
            Key::Right => b"\x1b[C",
            Key::Left => b"\x1b[D",
        };
        self.writer.write_all(encoded)?;
        self.writer.flush()
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        debug!(target: "terminal", width, height, "resize");
        self.size = (width, height);
    }

    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn current_directory(&self) -> &Path {
        &self.cwd
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// The terminal's text buffer; lock before reading.
    pub fn buffer(&self) -> Arc<Mutex<Buffer>> {
        Arc::clone(&self.buffer)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        // the transport owner closes the stream, which ends the loop
        if let Some(handle) = self.reader.take()
            && handle.join().is_err()
        {
            warn!(target: "terminal", "reader thread panicked");
        }
    }
}

fn reader_loop(
    output: impl Read,
    buffer: &Arc<Mutex<Buffer>>,
    notify: &Sender<TerminalEvent>,
) {
    let mut lines = BufReader::new(output).lines();
    loop {
        match lines.next() {
            Some(Ok(line)) => {
                match buffer.lock() {
                    Ok(mut guard) => {
                        let _ = guard.append_line(line);
                    }
                    Err(_) => break,
                }
                if notify.send(TerminalEvent::Output).is_err() {
                    break;
                }
            }
            Some(Err(error)) => {
                warn!(target: "terminal", %error, "terminal_read_error");
                break;
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn reader_appends_lines_and_signals() {
        let (tx, rx) = unbounded();
        let output = std::io::Cursor::new(b"hello\nworld\n".to_vec());
        let terminal = Terminal::spawn(output, Vec::new(), PathBuf::from("/"), (80, 24), tx);
        // two output events then the exit
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(std::time::Duration::from_secs(5)) {
            let done = event == TerminalEvent::Exited;
            events.push(event);
            if done {
                break;
            }
        }
        assert_eq!(
            events,
            [
                TerminalEvent::Output,
                TerminalEvent::Output,
                TerminalEvent::Exited
            ]
        );
        let buffer = terminal.buffer();
        let guard = buffer.lock().unwrap();
        assert_eq!(guard.lines(), ["hello", "world"]);
        drop(guard);
        assert!(!terminal.is_alive());
    }

    #[test]
    fn send_key_encodes_specials() {
        let (tx, _rx) = unbounded();
        let output = std::io::Cursor::new(Vec::new());
        let mut terminal = Terminal::spawn(output, Vec::new(), PathBuf::from("/"), (80, 24), tx);
        terminal.send_key(Key::Char('l')).unwrap();
        terminal.send_key(Key::Enter).unwrap();
        terminal.send_key(Key::Ctrl('c')).unwrap();
        // writer is owned by the terminal; encoding is exercised above and
        // the transport cannot error on a Vec
    }

    #[test]
    fn resize_and_cwd_round_trip() {
        let (tx, _rx) = unbounded();
        let output = std::io::Cursor::new(Vec::new());
        let mut terminal =
            Terminal::spawn(output, Vec::new(), PathBuf::from("/tmp"), (80, 24), tx);
        terminal.resize(120, 40);
        assert_eq!(terminal.size(), (120, 40));
        assert_eq!(terminal.current_directory(), Path::new("/tmp"));
    }
}
