//! Command line parsing.
//!
//! Command lines are split on whitespace only. Quoting and escaping are not
//! interpreted: `"a b"` yields the two tokens `"a` and `b"`.

use crate::error::{ProcessError, Result};
use std::fmt;

/// A parsed, immutable command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// The original string, unchanged.
    raw: String,
    /// Whitespace-delimited tokens; `argv[0]` is the program.
    argv: Vec<String>,
}

impl CommandLine {
    /// Parse a command line.
    ///
    /// Fails with [`ProcessError::InvalidCommandLine`] when the input is empty
    /// or contains only whitespace.
    pub fn parse(input: impl Into<String>) -> Result<Self> {
        let raw = input.into();
        let argv: Vec<String> = raw.split_whitespace().map(str::to_string).collect();

        if argv.is_empty() {
            return Err(ProcessError::InvalidCommandLine {
                input: raw,
                reason: "no program given".to_string(),
            });
        }

        Ok(Self { raw, argv })
    }

    /// The executable path (first token).
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The full argument vector, including the program as argument 0.
    pub fn args(&self) -> &[String] {
        &self.argv
    }

    /// Arguments after the program.
    pub fn arguments(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The original command line.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for CommandLine {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_and_args() {
        let cmd = CommandLine::parse("ffmpeg -i input.ts -f null -").unwrap();

        assert_eq!(cmd.program(), "ffmpeg");
        assert_eq!(cmd.args(), ["ffmpeg", "-i", "input.ts", "-f", "null", "-"]);
        assert_eq!(cmd.arguments(), ["-i", "input.ts", "-f", "null", "-"]);
        assert_eq!(cmd.as_str(), "ffmpeg -i input.ts -f null -");
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let cmd = CommandLine::parse("  mpv\t--no-video \n stream.m3u8  ").unwrap();

        assert_eq!(cmd.program(), "mpv");
        assert_eq!(cmd.args(), ["mpv", "--no-video", "stream.m3u8"]);
        // The original text is kept verbatim
        assert_eq!(cmd.to_string(), "  mpv\t--no-video \n stream.m3u8  ");
    }

    #[test]
    fn test_parse_program_only() {
        let cmd: CommandLine = "true".parse().unwrap();
        assert_eq!(cmd.args(), ["true"]);
        assert!(cmd.arguments().is_empty());
    }

    #[test]
    fn test_parse_does_not_interpret_quotes() {
        let cmd = CommandLine::parse("echo \"a b\"").unwrap();
        assert_eq!(cmd.arguments(), ["\"a", "b\""]);
    }

    #[test]
    fn test_parse_empty_is_invalid() {
        for input in ["", "   ", "\t\n"] {
            let err = CommandLine::parse(input).unwrap_err();
            assert!(matches!(err, ProcessError::InvalidCommandLine { .. }));
        }
    }
}
