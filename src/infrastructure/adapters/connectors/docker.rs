//! Docker Engine API connector.
//!
//! The Engine API is stateless HTTP, either over TCP (`reqwest`) or over the
//! local Unix socket (a raw `hyper` HTTP/1 handshake on a `UnixStream`).

use crate::infrastructure::{
    domain::{ConnectionType, DockerEndpoint, ResourceSnapshot, SystemInfo},
    ports::{Connector, ConnectorError, ConnectorResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Minimal Docker Engine API client shared by the connector and discoverer.
#[derive(Debug, Clone)]
pub struct DockerApiClient {
    transport: DockerTransport,
    timeout: Duration,
}

#[derive(Debug, Clone)]
enum DockerTransport {
    Tcp {
        http: reqwest::Client,
        base_url: String,
    },
    Unix {
        socket: PathBuf,
    },
}

impl DockerApiClient {
    /// Creates a client for an endpoint.
    ///
    /// TCP endpoints reuse `http`; Unix socket endpoints open one connection
    /// per request.
    #[must_use]
    pub fn new(endpoint: DockerEndpoint, http: reqwest::Client, timeout: Duration) -> Self {
        let transport = match endpoint {
            DockerEndpoint::UnixSocket(socket) => DockerTransport::Unix { socket },
            DockerEndpoint::Tcp { base_url } => DockerTransport::Tcp {
                http,
                base_url: base_url.trim_end_matches('/').to_owned(),
            },
        };
        Self { transport, timeout }
    }

    /// Returns a short description of the endpoint for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.transport {
            DockerTransport::Tcp { base_url, .. } => base_url.clone(),
            DockerTransport::Unix { socket } => format!("unix://{}", socket.display()),
        }
    }

    /// Issues a `GET` and returns the raw body of a 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Connection`] on transport failure,
    /// [`ConnectorError::Protocol`] on a non-2xx status and
    /// [`ConnectorError::Timeout`] when the request deadline elapses.
    pub async fn get(&self, path: &str) -> ConnectorResult<Bytes> {
        let request = async {
            match &self.transport {
                DockerTransport::Tcp { http, base_url } => tcp_get(http, base_url, path).await,
                DockerTransport::Unix { socket } => unix_get(socket, path).await,
            }
        };
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ConnectorError::Timeout(self.timeout))?
    }

    /// Issues a `GET` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`DockerApiClient::get`], and
    /// [`ConnectorError::Protocol`] when the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body)
            .map_err(|err| ConnectorError::protocol(format!("GET {path}: {err}")))
    }
}

async fn tcp_get(http: &reqwest::Client, base_url: &str, path: &str) -> ConnectorResult<Bytes> {
    let url = format!("{base_url}{path}");
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(ConnectorError::connection)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConnectorError::protocol(format!("GET {path} returned {status}")));
    }
    response.bytes().await.map_err(ConnectorError::connection)
}

async fn unix_get(socket: &Path, path: &str) -> ConnectorResult<Bytes> {
    let stream = tokio::net::UnixStream::connect(socket)
        .await
        .map_err(ConnectorError::connection)?;
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(ConnectorError::connection)?;

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!(error = %err, "docker socket connection closed with error");
        }
    });

    let request = http::Request::builder()
        .method(http::Method::GET)
        .uri(path)
        .header(http::header::HOST, "docker")
        .body(Empty::<Bytes>::new())
        .map_err(ConnectorError::connection)?;
    let response = sender
        .send_request(request)
        .await
        .map_err(ConnectorError::connection)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConnectorError::protocol(format!("GET {path} returned {status}")));
    }
    let collected = response
        .into_body()
        .collect()
        .await
        .map_err(ConnectorError::connection)?;
    Ok(collected.to_bytes())
}

#[derive(Debug, Deserialize)]
struct EngineInfo {
    #[serde(rename = "NCPU")]
    ncpu: Option<u32>,
    #[serde(rename = "MemTotal")]
    mem_total: Option<u64>,
    #[serde(rename = "OperatingSystem")]
    operating_system: Option<String>,
    #[serde(rename = "OSType")]
    os_type: Option<String>,
    #[serde(rename = "KernelVersion")]
    kernel_version: Option<String>,
}

impl EngineInfo {
    fn into_system_info(self) -> SystemInfo {
        let resources = ResourceSnapshot {
            cpu: self.ncpu,
            memory: self.mem_total.and_then(|bytes| bytes.checked_div(BYTES_PER_MB)),
            disk: None,
        };
        SystemInfo {
            os_type: self
                .operating_system
                .or(self.os_type)
                .filter(|value| !value.trim().is_empty()),
            os_version: self.kernel_version.filter(|value| !value.trim().is_empty()),
            resources: (!resources.is_empty()).then_some(resources),
        }
    }
}

/// Connector for hosts exposing the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerApiConnector {
    client: DockerApiClient,
}

impl DockerApiConnector {
    /// Creates a connector over an API client.
    #[must_use]
    pub const fn new(client: DockerApiClient) -> Self {
        Self { client }
    }

    /// Returns the underlying API client.
    #[must_use]
    pub const fn client(&self) -> &DockerApiClient {
        &self.client
    }
}

#[async_trait]
impl Connector for DockerApiConnector {
    fn connection_type(&self) -> ConnectionType {
        ConnectionType::DockerApi
    }

    async fn connect(&self) -> ConnectorResult<()> {
        self.client.get("/_ping").await.map(|_| ())
    }

    async fn check_health(&self) -> bool {
        match self.client.get("/_ping").await {
            Ok(_) => true,
            Err(err) => {
                debug!(endpoint = %self.client.describe(), error = %err, "docker ping failed");
                false
            }
        }
    }

    async fn system_info(&self) -> ConnectorResult<SystemInfo> {
        let info: EngineInfo = self.client.get_json("/info").await?;
        Ok(info.into_system_info())
    }

    async fn disconnect(&self) -> ConnectorResult<()> {
        Ok(())
    }
}
