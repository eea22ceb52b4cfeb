//! Helpers for composing remote shell commands.
//!
//! Commands sent over SSH are interpreted by the remote login shell, so any
//! value that did not originate from this crate must be quoted before it is
//! spliced into a command line.

/// Quotes a value for use as a single POSIX shell word.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Builder for a remote command line.
///
/// Literal arguments are appended verbatim; untrusted ones go through
/// [`RemoteCommand::quoted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    line: String,
}

impl RemoteCommand {
    /// Starts a command line with a program name.
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            line: program.to_owned(),
        }
    }

    /// Appends a literal argument.
    #[must_use]
    pub fn arg(mut self, literal: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(literal);
        self
    }

    /// Appends an argument quoted as a single shell word.
    #[must_use]
    pub fn quoted(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(&shell_quote(value));
        self
    }

    /// Returns the finished command line.
    #[must_use]
    pub fn into_line(self) -> String {
        self.line
    }
}
