//! Production SSH transport backed by `russh`.

use crate::infrastructure::{
    domain::{ConnectionType, InfrastructureDomainError, SshAuth},
    ports::{CommandOutput, ConnectorError, ConnectorResult, SshClient, SshSession, SshTarget},
};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::{PrivateKeyWithHashAlg, decode_secret_key};
use russh::{ChannelMsg, Disconnect};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// SSH client that opens real connections with `russh`.
#[derive(Debug, Clone)]
pub struct RusshClient {
    config: Arc<client::Config>,
    connect_timeout: Duration,
}

impl RusshClient {
    /// Creates a client with a connect deadline.
    ///
    /// Sessions idle for ten times the connect deadline are dropped.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        let config = client::Config {
            inactivity_timeout: Some(connect_timeout.saturating_mul(10)),
            ..client::Config::default()
        };
        Self {
            config: Arc::new(config),
            connect_timeout,
        }
    }
}

/// Accepts any server host key.
///
/// Host keys are not pinned yet; instances are registered by operators who
/// already trust the target.
struct AcceptingHandler {
    host: String,
}

impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        debug!(host = %self.host, "accepting ssh host key");
        Ok(true)
    }
}

#[async_trait]
impl SshClient for RusshClient {
    async fn open(&self, target: &SshTarget) -> ConnectorResult<Box<dyn SshSession>> {
        let handler = AcceptingHandler {
            host: target.host().to_owned(),
        };
        let connecting = client::connect(
            Arc::clone(&self.config),
            (target.host(), target.port()),
            handler,
        );
        let mut handle = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| ConnectorError::Timeout(self.connect_timeout))?
            .map_err(ConnectorError::connection)?;

        let credentials = target.credentials();
        let username = credentials.username();
        let accepted = match credentials.auth() {
            SshAuth::None => handle
                .authenticate_none(username)
                .await
                .map_err(ConnectorError::connection)?
                .success(),
            SshAuth::Password(password) => handle
                .authenticate_password(username, password.expose_secret())
                .await
                .map_err(ConnectorError::connection)?
                .success(),
            SshAuth::PrivateKey { key, passphrase } => {
                let decoded = decode_secret_key(
                    key.expose_secret(),
                    passphrase.as_ref().map(|secret| secret.expose_secret()),
                )
                .map_err(|err| {
                    ConnectorError::InvalidConfig(
                        InfrastructureDomainError::InvalidConnectionField {
                            connection_type: ConnectionType::Ssh,
                            key: "privateKey",
                            reason: err.to_string(),
                        },
                    )
                })?;
                let hash = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(ConnectorError::connection)?
                    .flatten();
                handle
                    .authenticate_publickey(
                        username,
                        PrivateKeyWithHashAlg::new(Arc::new(decoded), hash),
                    )
                    .await
                    .map_err(ConnectorError::connection)?
                    .success()
            }
        };

        if !accepted {
            return Err(ConnectorError::Authentication {
                username: username.to_owned(),
            });
        }
        Ok(Box::new(RusshSession { handle }))
    }
}

struct RusshSession {
    handle: Handle<AcceptingHandler>,
}

#[async_trait]
impl SshSession for RusshSession {
    async fn run(&mut self, command: &str) -> ConnectorResult<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(ConnectorError::connection)?;
        channel
            .exec(true, command)
            .await
            .map_err(ConnectorError::connection)?;

        let mut stdout = Vec::new();
        let mut exit_status = None;
        while let Some(message) = channel.wait().await {
            match message {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            exit_status,
        })
    }

    async fn close(self: Box<Self>) -> ConnectorResult<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(ConnectorError::connection)
    }
}
