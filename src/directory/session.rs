use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::directory::advertise;
use crate::directory::registry::{ConnectionSpeed, FileEntry, Registry};
use crate::error::{Error, Result};
use crate::wire::{self, MessageStream};

/// Identity parsed from a session's registration message.
#[derive(Debug)]
struct RegisteredHost {
    username: String,
    transfer_address: String,
    speed: ConnectionSpeed,
}

/// Server-side state for one connected host: registration, the
/// advertisement batch, the search loop, and teardown.
pub(crate) struct DirectorySession {
    channel: MessageStream<TcpStream>,
    registry: Arc<Registry>,
    idle_limit: Option<Duration>,
    peer: SocketAddr,
    session_id: Uuid,
}

impl DirectorySession {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        registry: Arc<Registry>,
        idle_limit: Option<Duration>,
    ) -> Self {
        Self {
            channel: wire::framed(stream),
            registry,
            idle_limit,
            peer,
            session_id: Uuid::new_v4(),
        }
    }

    /// Drive the session to completion. Once a host has registered, its
    /// advertisements are purged exactly once, whichever path ends the
    /// session.
    pub(crate) async fn run(mut self) {
        let host = match self.read_registration().await {
            Ok(host) => host,
            Err(Error::Disconnected) => {
                info!(session = %self.session_id, peer = %self.peer, "host left before registering");
                return;
            }
            Err(err) => {
                warn!(session = %self.session_id, peer = %self.peer, error = %err, "registration rejected");
                return;
            }
        };

        info!(
            session = %self.session_id,
            peer = %self.peer,
            user = %host.username,
            address = %host.transfer_address,
            speed = %host.speed,
            "host registered"
        );

        let outcome = self.serve(&host).await;
        let purged = self.registry.purge_host(&host.transfer_address);

        match outcome {
            Ok(()) => info!(
                session = %self.session_id,
                user = %host.username,
                purged,
                "session ended by quit"
            ),
            Err(err) => warn!(
                session = %self.session_id,
                user = %host.username,
                purged,
                error = %err,
                "session aborted"
            ),
        }
    }

    async fn serve(&mut self, host: &RegisteredHost) -> Result<()> {
        self.read_advertisements(host).await?;
        self.search_loop().await
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        wire::recv_message_within(&mut self.channel, self.idle_limit)
            .await
            .map_err(Error::from)
    }

    async fn read_registration(&mut self) -> Result<RegisteredHost> {
        let message = self.next_message().await?.ok_or(Error::Disconnected)?;
        parse_registration(&message)
    }

    async fn read_advertisements(&mut self, host: &RegisteredHost) -> Result<()> {
        let message = self.next_message().await?.ok_or(Error::Disconnected)?;
        let (ads, rejected) = advertise::parse_lines(&message);

        for line in &rejected {
            warn!(session = %self.session_id, line = %line, "skipping malformed advertisement line");
        }

        let entries: Vec<FileEntry> = ads
            .into_iter()
            .map(|ad| FileEntry {
                owner: host.username.clone(),
                transfer_address: host.transfer_address.clone(),
                connection_speed: host.speed,
                file_name: ad.file_name,
                description: ad.description,
            })
            .collect();

        info!(
            session = %self.session_id,
            user = %host.username,
            count = entries.len(),
            "advertisements recorded"
        );
        self.registry.append(entries);
        Ok(())
    }

    async fn search_loop(&mut self) -> Result<()> {
        loop {
            let Some(message) = self.next_message().await? else {
                return Err(Error::Disconnected);
            };

            if message == "quit" {
                return Ok(());
            }

            let reply = self.registry.search_reply(&message);
            wire::send_message(&mut self.channel, reply).await?;
        }
    }
}

/// Parse `username hostname port speed`. Extra fields are ignored; fewer
/// than four is fatal to the session. Only the speed is interpreted; the
/// hostname and port are recorded verbatim as the transfer address.
fn parse_registration(message: &str) -> Result<RegisteredHost> {
    let mut fields = message.split_whitespace();
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(username), Some(hostname), Some(port), Some(speed)) => Ok(RegisteredHost {
            username: username.to_string(),
            transfer_address: format!("{hostname}:{port}"),
            speed: speed.parse()?,
        }),
        _ => Err(Error::Registration(format!(
            "expected 4 fields, got {}",
            message.split_whitespace().count()
        ))),
    }
}
