//! Editor configuration and session persistence.
//!
//! Configuration is an optional TOML file under the platform config
//! directory; a missing or empty file yields defaults. The session file
//! (`$HOME/.ce`) is a small line-oriented format restoring the last search
//! pattern and per-buffer cursor lines across runs:
//!
//! ```text
//! N                      line 1: number of search-pattern lines
//! <pattern line> x N     the last search pattern (may be multi-line)
//! <buffer-name> <line>   one entry per buffer, whitespace-separated
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// User-tunable editor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The tab-equivalent string used by indent and the Tab key.
    pub tab_string: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_string: "     ".into(),
        }
    }
}

impl Config {
    /// Platform config path (`~/.config/cerulean/config.toml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cerulean").join("config.toml"))
    }

    /// Load from `path`; a missing file is the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(target: "config", ?path, "config_missing_using_defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        debug!(target: "config", ?path, "config_loaded");
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed session line {0}: '{1}'")]
    Malformed(usize, String),
}

/// Restorable cross-run state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// The last search pattern, possibly spanning lines.
    pub search_pattern: Option<String>,
    /// `(buffer name, cursor line)` pairs.
    pub buffer_cursors: Vec<(String, i64)>,
}

impl Session {
    /// `$HOME/.ce`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ce"))
    }

    /// Load the session file; absent or empty means nothing to restore.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut lines = raw.lines().enumerate();
        let (_, header) = lines
            .next()
            .ok_or_else(|| SessionError::Malformed(1, String::new()))?;
        let pattern_lines: usize = header
            .trim()
            .parse()
            .map_err(|_| SessionError::Malformed(1, header.to_string()))?;
        let mut pattern = Vec::with_capacity(pattern_lines);
        for _ in 0..pattern_lines {
            match lines.next() {
                Some((_, line)) => pattern.push(line.to_string()),
                None => return Ok(Self::default()),
            }
        }
        let mut buffer_cursors = Vec::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let Some((name, cursor_line)) = line.rsplit_once(char::is_whitespace) else {
                return Err(SessionError::Malformed(index + 1, line.to_string()));
            };
            let cursor_line: i64 = cursor_line
                .parse()
                .map_err(|_| SessionError::Malformed(index + 1, line.to_string()))?;
            buffer_cursors.push((name.trim().to_string(), cursor_line));
        }
        debug!(
            target: "session",
            ?path,
            buffers = buffer_cursors.len(),
            has_pattern = !pattern.is_empty(),
            "session_loaded"
        );
        Ok(Self {
            search_pattern: (!pattern.is_empty()).then(|| pattern.join("\n")),
            buffer_cursors,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let mut out = String::new();
        match &self.search_pattern {
            Some(pattern) => {
                let count = pattern.lines().count().max(1);
                out.push_str(&format!("{count}\n{pattern}\n"));
            }
            None => out.push_str("0\n"),
        }
        for (name, cursor_line) in &self.buffer_cursors {
            out.push_str(&format!("{name} {cursor_line}\n"));
        }
        if let Err(error) = std::fs::write(path, &out) {
            warn!(target: "session", ?path, %error, "session_save_failed");
            return Err(error.into());
        }
        debug!(target: "session", ?path, "session_saved");
        Ok(())
    }

    /// The restored cursor line for a buffer name, if recorded.
    pub fn cursor_line_for(&self, name: &str) -> Option<i64> {
        self.buffer_cursors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, line)| *line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.tab_string, "     ");
    }

    #[test]
    fn config_parses_tab_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tab_string = \"  \"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.tab_string, "  ");
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tab_strnig = \"  \"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn session_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ce");
        let session = Session {
            search_pattern: Some("alpha".into()),
            buffer_cursors: vec![("src/main.rs".into(), 42), ("notes.txt".into(), 0)],
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), session);
    }

    #[test]
    fn session_multiline_pattern_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ce");
        let session = Session {
            search_pattern: Some("first\nsecond".into()),
            buffer_cursors: vec![("a".into(), 1)],
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), session);
    }

    #[test]
    fn absent_or_empty_session_restores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ce");
        assert_eq!(Session::load(&path).unwrap(), Session::default());
        std::fs::write(&path, "").unwrap();
        assert_eq!(Session::load(&path).unwrap(), Session::default());
    }

    #[test]
    fn session_without_pattern_keeps_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ce");
        std::fs::write(&path, "0\nmain.c 7\n").unwrap();
        let session = Session::load(&path).unwrap();
        assert_eq!(session.search_pattern, None);
        assert_eq!(session.cursor_line_for("main.c"), Some(7));
    }

    #[test]
    fn malformed_session_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ce");
        std::fs::write(&path, "0\nmain.c seven\n").unwrap();
        assert!(matches!(
            Session::load(&path),
            Err(SessionError::Malformed(2, _))
        ));
    }
}
