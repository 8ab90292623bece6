use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{self, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transfer::command::TransferCommand;
use crate::wire::{self, MessageStream};

/// The listening side of the peer transfer protocol. Accepts control
/// connections and executes LIST/STOR/RETR against the serve directory,
/// dialing back to each peer's announced data endpoint per command
/// (active mode).
pub struct TransferResponder {
    listener: TcpListener,
    serve_dir: PathBuf,
    idle_limit: Option<Duration>,
}

impl TransferResponder {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        serve_dir: impl Into<PathBuf>,
        idle_limit: Option<Duration>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            serve_dir: serve_dir.into(),
            idle_limit,
        })
    }

    /// The address actually bound, which is also the transfer address a
    /// host should advertise.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept peers until the listener fails, one session task per control
    /// connection.
    pub async fn run(self) -> Result<()> {
        info!(
            "transfer responder listening on {}, serving {}",
            self.local_addr()?,
            self.serve_dir.display()
        );

        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!(%peer, "transfer peer connected");
            let session =
                ResponderSession::new(stream, peer, self.serve_dir.clone(), self.idle_limit);
            tokio::spawn(async move {
                if let Err(err) = session.run().await {
                    warn!(%peer, error = %err, "transfer session aborted");
                }
            });
        }
    }
}

/// Per-connection control loop state.
struct ResponderSession {
    control: MessageStream<TcpStream>,
    peer: SocketAddr,
    serve_dir: PathBuf,
    idle_limit: Option<Duration>,
    session_id: Uuid,
}

impl ResponderSession {
    fn new(
        stream: TcpStream,
        peer: SocketAddr,
        serve_dir: PathBuf,
        idle_limit: Option<Duration>,
    ) -> Self {
        Self {
            control: wire::framed(stream),
            peer,
            serve_dir,
            idle_limit,
            session_id: Uuid::new_v4(),
        }
    }

    async fn run(mut self) -> Result<()> {
        // The first message must be the peer's data endpoint; no command is
        // processed before it arrives.
        let endpoint = self
            .next_message()
            .await?
            .ok_or(Error::Disconnected)?;
        if !endpoint.contains(':') {
            return Err(Error::DataEndpoint(endpoint));
        }
        info!(
            session = %self.session_id,
            peer = %self.peer,
            endpoint = %endpoint,
            "data endpoint announced"
        );

        loop {
            let Some(message) = self.next_message().await? else {
                return Err(Error::Disconnected);
            };

            match message.parse::<TransferCommand>() {
                Ok(TransferCommand::Quit) => {
                    info!(session = %self.session_id, peer = %self.peer, "session ended by QUIT");
                    return Ok(());
                }
                Ok(command) => self.execute(&endpoint, &command).await?,
                Err(err) => {
                    // Invalid commands are dropped without a reply. A
                    // conforming initiator validates before sending and
                    // never lands here.
                    warn!(
                        session = %self.session_id,
                        peer = %self.peer,
                        error = %err,
                        "dropping invalid command"
                    );
                }
            }
        }
    }

    async fn next_message(&mut self) -> Result<Option<String>> {
        wire::recv_message_within(&mut self.control, self.idle_limit)
            .await
            .map_err(Error::from)
    }

    /// Dial the data endpoint and run one command against it. The data
    /// connection closes when this returns, success or not; a dial or
    /// transfer failure aborts the whole session.
    async fn execute(&mut self, endpoint: &str, command: &TransferCommand) -> Result<()> {
        let mut data = TcpStream::connect(endpoint).await?;
        debug!(
            session = %self.session_id,
            %command,
            endpoint = %endpoint,
            "data channel connected"
        );

        match command {
            TransferCommand::List => self.send_listing(&mut data).await,
            TransferCommand::Stor(name) => self.receive_file(&mut data, name).await,
            TransferCommand::Retr(name) => self.send_file(&mut data, name).await,
            // QUIT never reaches the executor.
            TransferCommand::Quit => Ok(()),
        }
    }

    /// LIST: names in the serve directory, space-joined, as one message
    /// terminated by closing the data connection.
    async fn send_listing(&mut self, data: &mut TcpStream) -> Result<()> {
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.serve_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let listing = names.join(" ");
        data.write_all(listing.as_bytes()).await?;
        data.shutdown().await?;
        info!(session = %self.session_id, count = names.len(), "listing sent");
        Ok(())
    }

    /// STOR: create or truncate the named file and copy the data channel
    /// into it until the peer closes its end.
    async fn receive_file(&mut self, data: &mut TcpStream, name: &str) -> Result<()> {
        let path = self.serve_dir.join(name);
        let mut file = File::create(&path).await?;
        let bytes = io::copy(data, &mut file).await?;
        file.flush().await?;
        info!(
            session = %self.session_id,
            file = %path.display(),
            bytes,
            "file stored"
        );
        Ok(())
    }

    /// RETR: stream the named file out and half-close to signal the end of
    /// the bytes.
    async fn send_file(&mut self, data: &mut TcpStream, name: &str) -> Result<()> {
        let path = self.serve_dir.join(name);
        let mut file = File::open(&path).await?;
        let bytes = io::copy(&mut file, data).await?;
        data.shutdown().await?;
        info!(
            session = %self.session_id,
            file = %path.display(),
            bytes,
            "file sent"
        );
        Ok(())
    }
}
