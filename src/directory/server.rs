use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::info;

use crate::directory::registry::Registry;
use crate::directory::session::DirectorySession;
use crate::error::Result;

/// The central directory server: owns the registry and accepts unboundedly
/// many hosts, one concurrent session task per connection.
pub struct DirectoryServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    idle_limit: Option<Duration>,
}

impl DirectoryServer {
    /// Bind the listening socket. The registry starts empty and lives as
    /// long as the server.
    pub async fn bind(addr: impl ToSocketAddrs, idle_limit: Option<Duration>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            idle_limit,
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle on the shared registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept hosts until the listener fails. Each accepted connection gets
    /// its own session task; sessions already running are unaffected if the
    /// accept loop ends.
    pub async fn run(self) -> Result<()> {
        info!("directory server listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!(%peer, "host connected");
            let session =
                DirectorySession::new(stream, peer, Arc::clone(&self.registry), self.idle_limit);
            tokio::spawn(session.run());
        }
    }
}
