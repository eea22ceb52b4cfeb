//! Scripted SSH transport for tests and offline runs.

use crate::infrastructure::ports::{
    CommandOutput, ConnectorError, ConnectorResult, SshClient, SshSession, SshTarget,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const COMMAND_NOT_FOUND: u32 = 127;

/// SSH client that answers commands from a script.
///
/// Commands without a scripted reply exit with status 127 and no output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSshClient {
    state: Arc<RwLock<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: HashMap<String, CommandOutput>,
    unreachable: bool,
    rejected_users: Vec<String>,
    sessions_opened: usize,
    executed: Vec<String>,
    open_delay: Duration,
    command_delays: HashMap<String, Duration>,
}

fn lock_error(err: impl std::fmt::Display) -> ConnectorError {
    ConnectorError::connection(std::io::Error::other(err.to_string()))
}

impl ScriptedSshClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful reply for `command`.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn reply(&self, command: &str, stdout: &str) -> ConnectorResult<()> {
        self.reply_with_status(command, stdout, 0)
    }

    /// Scripts a reply with an explicit exit status.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn reply_with_status(
        &self,
        command: &str,
        stdout: &str,
        exit_status: u32,
    ) -> ConnectorResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.replies.insert(
            command.to_owned(),
            CommandOutput {
                stdout: stdout.to_owned(),
                exit_status: Some(exit_status),
            },
        );
        Ok(())
    }

    /// Makes every connection attempt fail.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn set_unreachable(&self, unreachable: bool) -> ConnectorResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.unreachable = unreachable;
        Ok(())
    }

    /// Makes authentication fail for `username`.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn reject_user(&self, username: &str) -> ConnectorResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.rejected_users.push(username.to_owned());
        Ok(())
    }

    /// Delays every connection attempt by `delay`.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn set_open_delay(&self, delay: Duration) -> ConnectorResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.open_delay = delay;
        Ok(())
    }

    /// Delays the reply to `command` by `delay`.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn delay_command(&self, command: &str, delay: Duration) -> ConnectorResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.command_delays.insert(command.to_owned(), delay);
        Ok(())
    }

    /// Returns how many sessions were opened.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn sessions_opened(&self) -> ConnectorResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.sessions_opened)
    }

    /// Returns every command run so far, in order.
    ///
    /// # Errors
    ///
    /// Returns connection errors when lock acquisition fails.
    pub fn executed_commands(&self) -> ConnectorResult<Vec<String>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.executed.clone())
    }
}

#[async_trait]
impl SshClient for ScriptedSshClient {
    async fn open(&self, target: &SshTarget) -> ConnectorResult<Box<dyn SshSession>> {
        let delay = self.state.read().map_err(lock_error)?.open_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.write().map_err(lock_error)?;
        if state.unreachable {
            return Err(ConnectorError::connection(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{}:{} refused the connection", target.host(), target.port()),
            )));
        }
        let username = target.credentials().username();
        if state.rejected_users.iter().any(|rejected| rejected == username) {
            return Err(ConnectorError::Authentication {
                username: username.to_owned(),
            });
        }
        state.sessions_opened += 1;
        Ok(Box::new(ScriptedSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedSession {
    state: Arc<RwLock<ScriptState>>,
}

#[async_trait]
impl SshSession for ScriptedSession {
    async fn run(&mut self, command: &str) -> ConnectorResult<CommandOutput> {
        let delay = self
            .state
            .read()
            .map_err(lock_error)?
            .command_delays
            .get(command)
            .copied();
        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }
        let mut state = self.state.write().map_err(lock_error)?;
        state.executed.push(command.to_owned());
        Ok(state
            .replies
            .get(command)
            .cloned()
            .unwrap_or(CommandOutput {
                stdout: String::new(),
                exit_status: Some(COMMAND_NOT_FOUND),
            }))
    }

    async fn close(self: Box<Self>) -> ConnectorResult<()> {
        Ok(())
    }
}
