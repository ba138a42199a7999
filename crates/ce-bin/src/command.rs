//! Structured command line parsing.
//!
//! Converts the raw command buffer (everything typed after `:`) into a
//! [`ParsedCommand`]. Pure classification, no side effects; unknown
//! commands surface as `Unknown` and become status messages upstream.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Quit { force: bool },
    Write { path: Option<PathBuf> },
    Edit { path: PathBuf },
    Unknown(String),
}

impl ParsedCommand {
    pub fn parse(raw: &str) -> ParsedCommand {
        let body = raw.trim();
        if body.is_empty() {
            return ParsedCommand::Unknown(String::new());
        }
        let (head, tail) = split_head(body);
        match head {
            "q" => ParsedCommand::Quit { force: false },
            "q!" => ParsedCommand::Quit { force: true },
            "w" => ParsedCommand::Write {
                path: parse_path(tail),
            },
            "e" => match parse_path(tail) {
                Some(path) => ParsedCommand::Edit { path },
                None => ParsedCommand::Unknown(body.to_string()),
            },
            _ => ParsedCommand::Unknown(body.to_string()),
        }
    }
}

fn split_head(body: &str) -> (&str, &str) {
    match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (body, ""),
    }
}

fn parse_path(rest: &str) -> Option<PathBuf> {
    let trimmed = rest.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_and_force() {
        assert_eq!(
            ParsedCommand::parse("q"),
            ParsedCommand::Quit { force: false }
        );
        assert_eq!(
            ParsedCommand::parse("q!"),
            ParsedCommand::Quit { force: true }
        );
    }

    #[test]
    fn parse_write_with_and_without_path() {
        assert_eq!(ParsedCommand::parse("w"), ParsedCommand::Write { path: None });
        assert_eq!(
            ParsedCommand::parse("w   out.txt"),
            ParsedCommand::Write {
                path: Some(PathBuf::from("out.txt"))
            }
        );
    }

    #[test]
    fn parse_edit_requires_path() {
        assert_eq!(
            ParsedCommand::parse("e src/lib.rs"),
            ParsedCommand::Edit {
                path: PathBuf::from("src/lib.rs")
            }
        );
        assert_eq!(ParsedCommand::parse("e"), ParsedCommand::Unknown("e".into()));
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(
            ParsedCommand::parse("doesnotexist"),
            ParsedCommand::Unknown("doesnotexist".into())
        );
    }
}
