// Host process orchestration. A host advertises its shared files to the
// directory server, answers transfer requests from other peers in the
// background, and drives an interactive console in the foreground.

pub mod console;

use std::path::Path;

use tokio::io::BufReader;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::directory::advertise::{self, Advertisement};
use crate::directory::client::{DirectoryClient, HostIdentity};
use crate::directory::registry::ConnectionSpeed;
use crate::error::Result;
use crate::transfer::responder::TransferResponder;

// Re-exports for easier access from crate::host::{...}
pub use console::Console;

/// Run a full host: advertise the file list, serve transfers in the
/// background and hand the foreground to the interactive console.
///
/// Identity fields left as `None` are prompted for on the console.
/// Returns once the user quits or the console input ends.
pub async fn run_host(
    server_addr: &str,
    username: Option<String>,
    speed: Option<ConnectionSpeed>,
    config: &AppConfig,
) -> Result<()> {
    let mut console = Console::new(BufReader::new(tokio::io::stdin()));

    let username = match username {
        Some(name) => name,
        None => match console.prompt_username().await? {
            Some(name) => name,
            None => return Ok(()),
        },
    };
    let speed = match speed {
        Some(speed) => speed,
        None => match console.prompt_speed().await? {
            Some(speed) => speed,
            None => return Ok(()),
        },
    };

    let share_dir = config.share_dir_path();
    let advertisements = load_advertisements(&config.host.file_list).await;

    // The responder binds first so the directory registration can carry
    // the actual port, which matters when the configured port is 0.
    let responder = TransferResponder::bind(
        (config.host.advertised_host.as_str(), config.host.transfer_port),
        &share_dir,
        config.idle_timeout(),
    )
    .await?;
    let transfer_port = responder.local_addr()?.port();

    let identity = HostIdentity::new(
        username,
        config.host.advertised_host.clone(),
        transfer_port,
        speed,
    )?;
    info!(
        username = %identity.username,
        transfer_address = %identity.transfer_address(),
        "host ready to serve transfers"
    );

    tokio::spawn(async move {
        if let Err(err) = responder.run().await {
            error!(error = %err, "transfer responder stopped");
        }
    });

    let mut client = DirectoryClient::connect(server_addr).await?;
    client.register(&identity, &advertisements).await?;
    println!("Connection successful!");

    let outcome = console.run(&mut client, &share_dir).await;

    // Best effort: the server purges our entries on any disconnect, so a
    // failed quit only costs the explicit goodbye.
    if let Err(err) = client.quit().await {
        debug!(error = %err, "directory quit after console exit failed");
    }
    outcome
}

/// Read the advertisement file, logging rejects. A missing or unreadable
/// file downgrades to an empty advertisement so the host still registers.
async fn load_advertisements(file_list: &str) -> Vec<Advertisement> {
    let (advertisements, rejected) = match advertise::load_file_list(Path::new(file_list)).await {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file = %file_list, error = %err, "file list unavailable, advertising nothing");
            return Vec::new();
        }
    };
    for line in &rejected {
        warn!(line = %line, "skipping malformed advertisement line");
    }
    info!(count = advertisements.len(), file = %file_list, "loaded file advertisements");
    advertisements
}
