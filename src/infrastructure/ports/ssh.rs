//! SSH transport port used by the SSH connector.

use super::ConnectorResult;
use crate::infrastructure::domain::SshCredentials;
use async_trait::async_trait;

/// Address and credentials of an SSH endpoint.
#[derive(Debug)]
pub struct SshTarget {
    host: String,
    port: u16,
    credentials: SshCredentials,
}

impl SshTarget {
    /// Creates an SSH target.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, credentials: SshCredentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
        }
    }

    /// Returns the host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the login credentials.
    #[must_use]
    pub const fn credentials(&self) -> &SshCredentials {
        &self.credentials
    }
}

/// Output of a remote command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Exit status, when the server reported one.
    pub exit_status: Option<u32>,
}

impl CommandOutput {
    /// Returns whether the command exited with status zero.
    ///
    /// A missing exit status counts as success, matching servers that close
    /// the channel without reporting one.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.exit_status, None | Some(0))
    }
}

/// Opens authenticated SSH sessions.
#[async_trait]
pub trait SshClient: Send + Sync {
    /// Connects and authenticates against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`super::ConnectorError::Connection`] when the transport
    /// cannot be established and [`super::ConnectorError::Authentication`]
    /// when the server rejects the credentials.
    async fn open(&self, target: &SshTarget) -> ConnectorResult<Box<dyn SshSession>>;
}

/// Authenticated SSH session able to run commands.
#[async_trait]
pub trait SshSession: Send {
    /// Runs a command on a fresh channel and collects its output.
    async fn run(&mut self, command: &str) -> ConnectorResult<CommandOutput>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> ConnectorResult<()>;
}
