use std::net::SocketAddr;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use crate::error::Result;
use crate::transfer::command::{self, TransferCommand};
use crate::wire::{self, MessageStream};

const CHUNK_SIZE: usize = 64 * 1024; // 64KB chunks

/// The commanding side of the peer transfer protocol. Holds the control
/// connection and a data listener the responder dials back to, one fresh
/// data connection per command.
pub struct TransferInitiator {
    control: MessageStream<TcpStream>,
    data_listener: TcpListener,
    local_dir: PathBuf,
}

impl TransferInitiator {
    /// Dial a peer responder's control port, bind a data listener on an
    /// ephemeral port, and announce it. The announced host is the local
    /// address of the control connection, which is the address the peer
    /// can actually reach us at.
    pub async fn connect(target: impl ToSocketAddrs, local_dir: impl Into<PathBuf>) -> Result<Self> {
        let stream = TcpStream::connect(target).await?;
        let local_ip = stream.local_addr()?.ip();
        let data_listener = TcpListener::bind((local_ip, 0)).await?;
        let endpoint = data_listener.local_addr()?;

        let mut control = wire::framed(stream);
        wire::send_message(&mut control, endpoint.to_string()).await?;
        info!(%endpoint, "data endpoint announced to peer");

        Ok(Self {
            control,
            data_listener,
            local_dir: local_dir.into(),
        })
    }

    /// The endpoint the responder will dial for each command's data
    /// connection.
    pub fn data_endpoint(&self) -> Result<SocketAddr> {
        Ok(self.data_listener.local_addr()?)
    }

    /// LIST: ask for the peer's serve-directory listing and return it as
    /// the space-joined string the responder sent.
    pub async fn list(&mut self) -> Result<String> {
        self.send_command(&TransferCommand::List).await?;
        let mut data = self.accept_data().await?;

        let mut listing = String::new();
        data.read_to_string(&mut listing).await?;
        info!(bytes = listing.len(), "listing received");
        Ok(listing)
    }

    /// STOR: stream a local file to the peer, which stores it under the
    /// same name. The local file is opened before the command goes out, so
    /// a missing file fails without touching the network.
    pub async fn stor(&mut self, name: &str) -> Result<u64> {
        command::validate_file_name(name)?;
        let path = self.local_dir.join(name);
        let mut file = File::open(&path).await?;
        let total = file.metadata().await?.len();

        self.send_command(&TransferCommand::Stor(name.to_string())).await?;
        let mut data = self.accept_data().await?;

        let pb = ProgressBar::new(total);
        pb.set_style(ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap());

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut sent = 0u64;
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            data.write_all(&buffer[..n]).await?;
            sent += n as u64;
            pb.inc(n as u64);
        }
        // Half-close tells the peer the byte stream is complete.
        data.shutdown().await?;
        pb.finish_and_clear();

        info!(file = %path.display(), bytes = sent, "file sent to peer");
        Ok(sent)
    }

    /// RETR: fetch the named file from the peer into the local directory,
    /// reading until the peer closes the data connection.
    pub async fn retr(&mut self, name: &str) -> Result<u64> {
        command::validate_file_name(name)?;
        self.send_command(&TransferCommand::Retr(name.to_string())).await?;
        let mut data = self.accept_data().await?;

        let path = self.local_dir.join(name);
        let mut file = File::create(&path).await?;

        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner()
            .template("{spinner} {bytes} ({bytes_per_sec})")
            .unwrap());

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut received = 0u64;
        loop {
            let n = data.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).await?;
            received += n as u64;
            pb.inc(n as u64);
        }
        file.flush().await?;
        pb.finish_and_clear();

        info!(file = %path.display(), bytes = received, "file received from peer");
        Ok(received)
    }

    /// QUIT: end the session and close the control connection.
    pub async fn quit(mut self) -> Result<()> {
        self.send_command(&TransferCommand::Quit).await?;
        Ok(())
    }

    async fn send_command(&mut self, command: &TransferCommand) -> Result<()> {
        wire::send_message(&mut self.control, command.to_string()).await?;
        Ok(())
    }

    /// Accept the one data connection the responder dials for the command
    /// in flight.
    async fn accept_data(&mut self) -> Result<TcpStream> {
        let (stream, peer) = self.data_listener.accept().await?;
        debug!(%peer, "data channel accepted");
        Ok(stream)
    }
}
