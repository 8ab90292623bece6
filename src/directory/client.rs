use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::info;

use crate::directory::advertise::{self, Advertisement};
use crate::directory::registry::{ConnectionSpeed, NO_MATCH_REPLY};
use crate::error::{Error, Result};
use crate::wire::{self, MessageStream};

/// The identity a host registers under: who it is, where its transfer
/// responder listens, and how fast its link is.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    pub username: String,
    pub hostname: String,
    pub port: u16,
    pub speed: ConnectionSpeed,
}

impl HostIdentity {
    /// Build a validated identity. Username and hostname must be non-empty
    /// and free of whitespace; whitespace would shift the fields of the
    /// registration message.
    pub fn new(
        username: impl Into<String>,
        hostname: impl Into<String>,
        port: u16,
        speed: ConnectionSpeed,
    ) -> Result<Self> {
        let username = username.into();
        let hostname = hostname.into();

        if username.is_empty() {
            return Err(Error::Identity("username must not be empty".to_string()));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(Error::Identity(format!(
                "username '{username}' must not contain whitespace"
            )));
        }
        if hostname.is_empty() {
            return Err(Error::Identity("hostname must not be empty".to_string()));
        }
        if hostname.chars().any(char::is_whitespace) {
            return Err(Error::Identity(format!(
                "hostname '{hostname}' must not contain whitespace"
            )));
        }

        Ok(Self {
            username,
            hostname,
            port,
            speed,
        })
    }

    /// Where this host's transfer responder can be reached.
    pub fn transfer_address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// The four-field registration message.
    pub fn registration_message(&self) -> String {
        format!(
            "{} {} {} {}",
            self.username, self.hostname, self.port, self.speed
        )
    }
}

/// Outcome of one keyword search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Formatted result lines, in registry order.
    Matches(Vec<String>),
    NoMatches,
}

/// Host-side handle on a directory session: registers once, then searches
/// until `quit`.
pub struct DirectoryClient {
    channel: MessageStream<TcpStream>,
}

impl DirectoryClient {
    /// Connect the control channel to the directory server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            channel: wire::framed(stream),
        })
    }

    /// Send the registration message and the advertisement batch. The
    /// advertisement message is sent even when the batch is empty; the
    /// server always waits for it.
    pub async fn register(
        &mut self,
        identity: &HostIdentity,
        advertisements: &[Advertisement],
    ) -> Result<()> {
        wire::send_message(&mut self.channel, identity.registration_message()).await?;
        wire::send_message(&mut self.channel, advertise::to_message(advertisements)).await?;
        info!(
            user = %identity.username,
            address = %identity.transfer_address(),
            count = advertisements.len(),
            "registered with directory server"
        );
        Ok(())
    }

    /// Search advertised descriptions for a keyword. Note the literal
    /// keyword `quit` is the session-ending message, not a search.
    pub async fn search(&mut self, keyword: &str) -> Result<SearchOutcome> {
        wire::send_message(&mut self.channel, keyword).await?;
        let reply = wire::recv_message(&mut self.channel)
            .await?
            .ok_or(Error::Disconnected)?;

        if reply == NO_MATCH_REPLY {
            return Ok(SearchOutcome::NoMatches);
        }
        Ok(SearchOutcome::Matches(
            reply.lines().map(String::from).collect(),
        ))
    }

    /// End the session. The server purges this host's advertisements on
    /// receipt.
    pub async fn quit(mut self) -> Result<()> {
        wire::send_message(&mut self.channel, "quit").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_formats_the_registration_message() {
        let identity =
            HostIdentity::new("alice", "10.0.0.5", 5001, ConnectionSpeed::Fast).unwrap();
        assert_eq!(identity.registration_message(), "alice 10.0.0.5 5001 fast");
        assert_eq!(identity.transfer_address(), "10.0.0.5:5001");
    }

    #[test]
    fn identity_rejects_empty_or_spaced_fields() {
        assert!(HostIdentity::new("", "host", 1, ConnectionSpeed::Slow).is_err());
        assert!(HostIdentity::new("two words", "host", 1, ConnectionSpeed::Slow).is_err());
        assert!(HostIdentity::new("alice", "", 1, ConnectionSpeed::Slow).is_err());
        assert!(HostIdentity::new("alice", "bad host", 1, ConnectionSpeed::Slow).is_err());
    }
}
