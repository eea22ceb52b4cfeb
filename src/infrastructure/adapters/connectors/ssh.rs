//! SSH connector with one session per public operation.

use crate::infrastructure::{
    domain::{ConnectionType, ResourceSnapshot, SystemInfo},
    ports::{CommandOutput, Connector, ConnectorError, ConnectorResult, SshClient, SshTarget},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const HEALTH_COMMAND: &str = "echo \"health check\"";
const HEALTH_REPLY: &str = "health check";
const SYSTEM_INFO_COMMANDS: [&str; 4] = ["uname -a", "nproc", "free -m", "df -h /"];

/// Connector for hosts reachable over SSH.
#[derive(Clone)]
pub struct SshConnector {
    client: Arc<dyn SshClient>,
    target: Arc<SshTarget>,
}

impl std::fmt::Debug for SshConnector {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SshConnector")
            .field("host", &self.target.host())
            .field("port", &self.target.port())
            .finish_non_exhaustive()
    }
}

impl SshConnector {
    /// Creates a connector over an SSH transport.
    #[must_use]
    pub fn new(client: Arc<dyn SshClient>, target: SshTarget) -> Self {
        Self {
            client,
            target: Arc::new(target),
        }
    }

    /// Opens a session, runs `commands` in order and closes the session.
    ///
    /// Per-command failures are returned in place so callers can treat each
    /// result independently; only session setup failures abort.
    async fn run_in_session(
        &self,
        commands: &[&str],
    ) -> ConnectorResult<Vec<ConnectorResult<CommandOutput>>> {
        let mut session = self.client.open(&self.target).await?;
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            outputs.push(session.run(command).await);
        }
        if let Err(err) = session.close().await {
            debug!(host = self.target.host(), error = %err, "ssh session close failed");
        }
        Ok(outputs)
    }
}

#[async_trait]
impl Connector for SshConnector {
    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Ssh
    }

    async fn connect(&self) -> ConnectorResult<()> {
        self.run_in_session(&[]).await.map(|_| ())
    }

    async fn check_health(&self) -> bool {
        match self.execute_command(HEALTH_COMMAND).await {
            Ok(stdout) => stdout.trim() == HEALTH_REPLY,
            Err(err) => {
                debug!(host = self.target.host(), error = %err, "ssh health check failed");
                false
            }
        }
    }

    async fn system_info(&self) -> ConnectorResult<SystemInfo> {
        let outputs = self.run_in_session(&SYSTEM_INFO_COMMANDS).await?;
        let mut stdout = outputs.into_iter().map(|output| match output {
            Ok(result) if result.succeeded() => Some(result.stdout),
            Ok(_) => None,
            Err(err) => {
                debug!(error = %err, "ssh system info command failed");
                None
            }
        });
        let uname = stdout.next().flatten();
        let nproc = stdout.next().flatten();
        let free = stdout.next().flatten();
        let df = stdout.next().flatten();
        Ok(parse_system_info(
            uname.as_deref(),
            nproc.as_deref(),
            free.as_deref(),
            df.as_deref(),
        ))
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        Ok(())
    }

    async fn execute_command(&self, command: &str) -> ConnectorResult<String> {
        let output = self
            .run_in_session(&[command])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::protocol("ssh session returned no output"))??;
        match output.exit_status {
            Some(status) if status != 0 => Err(ConnectorError::Command {
                command: command.to_owned(),
                exit_status: status,
            }),
            _ => Ok(output.stdout),
        }
    }
}

/// Builds system information from raw command output.
///
/// Each field is parsed on its own; unparseable output leaves the field
/// unset.
fn parse_system_info(
    uname: Option<&str>,
    nproc: Option<&str>,
    free: Option<&str>,
    df: Option<&str>,
) -> SystemInfo {
    let mut uname_fields = uname.unwrap_or_default().split_whitespace();
    let os_type = uname_fields.next().map(str::to_owned);
    let os_version = uname_fields.nth(1).map(str::to_owned);

    let resources = ResourceSnapshot {
        cpu: nproc.and_then(|raw| raw.trim().parse().ok()),
        memory: free.and_then(parse_free_total_mb),
        disk: df.and_then(parse_df_size_mb),
    };

    SystemInfo {
        os_type,
        os_version,
        resources: (!resources.is_empty()).then_some(resources),
    }
}

/// Reads the total from the `Mem:` row of `free -m`.
fn parse_free_total_mb(output: &str) -> Option<u64> {
    output
        .lines()
        .find(|line| line.trim_start().starts_with("Mem:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|total| total.parse().ok())
}

/// Reads the size column of the first data row of `df -h`.
fn parse_df_size_mb(output: &str) -> Option<u64> {
    output
        .lines()
        .nth(1)
        .and_then(|row| row.split_whitespace().nth(1))
        .and_then(parse_human_size_mb)
}

/// Converts a `df -h` size such as `50G` or `1.8T` to megabytes.
fn parse_human_size_mb(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let number = trimmed.trim_end_matches(|ch: char| ch.is_ascii_alphabetic());
    let unit = trimmed.get(number.len()..)?.to_ascii_uppercase();

    let (integral, fraction) = number.split_once('.').unwrap_or((number, ""));
    let whole: u64 = integral.parse().ok()?;
    let fraction_value: u64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().ok()?
    };
    let scale = 10_u64.checked_pow(u32::try_from(fraction.len()).ok()?)?;
    let scaled = whole.checked_mul(scale)?.checked_add(fraction_value)?;

    let (multiplier, divisor): (u64, u64) = match unit.chars().next() {
        None | Some('M') => (1, 1),
        Some('K') => (1, 1024),
        Some('G') => (1024, 1),
        Some('T') => (1024 * 1024, 1),
        Some('P') => (1024 * 1024 * 1024, 1),
        Some('B') => (1, 1024 * 1024),
        Some(_) => return None,
    };
    scaled
        .checked_mul(multiplier)?
        .checked_div(scale.checked_mul(divisor)?)
}
