//! systemd unit discovery over SSH.

use crate::infrastructure::{
    adapters::connectors::SshConnector,
    domain::{DiscoveredService, ServiceStatus, ServiceType},
    ports::{Connector, DiscoveryResult, ServiceDiscoverer},
};
use crate::shell::RemoteCommand;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

const LIST_UNITS: &str = "systemctl list-units --type=service --no-pager --no-legend";
const SHOW_PROPERTIES: &str = "--property=ActiveState,MainPID,ExecStart";
const FAILED_UNIT_MARKER: &str = "●";

/// Discovers systemd service units on a host reachable over SSH.
#[derive(Debug, Clone)]
pub struct SystemdDiscoverer {
    connector: SshConnector,
}

impl SystemdDiscoverer {
    /// Creates a discoverer over an SSH connector.
    #[must_use]
    pub const fn new(connector: SshConnector) -> Self {
        Self { connector }
    }
}

/// One row of `systemctl list-units`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UnitRow {
    unit: String,
    load: String,
    active: String,
    sub: String,
    description: String,
}

impl UnitRow {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line
            .split_whitespace()
            .skip_while(|field| *field == FAILED_UNIT_MARKER);
        let unit = fields.next()?.to_owned();
        let load = fields.next()?.to_owned();
        let active = fields.next()?.to_owned();
        let sub = fields.next().unwrap_or_default().to_owned();
        let description = fields.collect::<Vec<_>>().join(" ");
        Some(Self {
            unit,
            load,
            active,
            sub,
            description,
        })
    }

    fn status(&self) -> ServiceStatus {
        match self.active.as_str() {
            "active" => ServiceStatus::Running,
            "inactive" | "failed" => ServiceStatus::Stopped,
            _ => ServiceStatus::Unknown,
        }
    }
}

fn show_command(unit: &str) -> String {
    RemoteCommand::new("systemctl")
        .arg("show")
        .quoted(unit)
        .arg(SHOW_PROPERTIES)
        .into_line()
}

fn normalize(row: UnitRow, details: String) -> DiscoveredService {
    let status = row.status();
    DiscoveredService {
        service_config: json!({
            "unit": row.unit,
            "load": row.load,
            "active": row.active,
            "sub": row.sub,
            "description": row.description,
            "details": details,
        }),
        name: row.unit,
        service_type: ServiceType::SystemdService,
        status,
        endpoints: Vec::new(),
        health_check_url: None,
    }
}

#[async_trait]
impl ServiceDiscoverer for SystemdDiscoverer {
    async fn try_discover(&self) -> DiscoveryResult<Vec<DiscoveredService>> {
        let listing = self.connector.execute_command(LIST_UNITS).await?;
        let rows: Vec<UnitRow> = listing.lines().filter_map(UnitRow::parse).collect();

        let mut services = Vec::with_capacity(rows.len());
        for row in rows {
            let details = match self.connector.execute_command(&show_command(&row.unit)).await {
                Ok(output) => output,
                Err(err) => {
                    debug!(unit = %row.unit, error = %err, "systemctl show failed");
                    String::new()
                }
            };
            services.push(normalize(row, details));
        }
        Ok(services)
    }
}
