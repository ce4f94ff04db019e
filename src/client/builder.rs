// ABOUTME: Session factory that connects over TCP and optionally binds in one step
// ABOUTME: Provides convenient constructors for transmitter, receiver and transceiver sessions

use crate::client::config::SessionConfig;
use crate::client::error::SmppResult;
use crate::client::session::Session;
use crate::client::types::BindCredentials;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Factory for TCP sessions
///
/// Connects, starts the session and binds with the given credentials.
/// For other transports (TLS, in-memory) use [`Session::new`] directly.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: SessionConfig,
}

impl ClientBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Connect without binding. The session starts out unbound.
    pub async fn connect<A: ToSocketAddrs>(&self, addr: A) -> SmppResult<Session> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        Ok(Session::new(stream, self.config.clone()))
    }

    /// Connect and bind with `credentials`; whatever bind type they carry.
    ///
    /// A rejected bind closes the connection before the error is returned.
    pub async fn bind<A: ToSocketAddrs>(
        &self,
        addr: A,
        credentials: &BindCredentials,
    ) -> SmppResult<Session> {
        let session = self.connect(addr).await?;
        if let Err(error) = session.bind(credentials).await {
            session.close().await?;
            return Err(error);
        }
        Ok(session)
    }
}

/// Convenience functions for quick session creation with default settings
impl ClientBuilder {
    /// Connect and bind as transmitter
    pub async fn transmitter<A: ToSocketAddrs>(
        addr: A,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> SmppResult<Session> {
        Self::default()
            .bind(addr, &BindCredentials::transmitter(system_id, password))
            .await
    }

    /// Connect and bind as receiver
    pub async fn receiver<A: ToSocketAddrs>(
        addr: A,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> SmppResult<Session> {
        Self::default()
            .bind(addr, &BindCredentials::receiver(system_id, password))
            .await
    }

    /// Connect and bind as transceiver
    pub async fn transceiver<A: ToSocketAddrs>(
        addr: A,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> SmppResult<Session> {
        Self::default()
            .bind(addr, &BindCredentials::transceiver(system_id, password))
            .await
    }
}
