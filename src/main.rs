use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info};

// Added for tracing file logging
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use peerdex::config::AppConfig;
use peerdex::directory::{ConnectionSpeed, DirectoryServer};
use peerdex::host;
use peerdex::transfer::TransferInitiator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the directory server
    Serve {
        /// Optional bind address, host:port
        #[arg(short, long)]
        bind: Option<String>,

        /// Optional path to a JSON config file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Start an interactive host: advertise files, search, transfer
    Host {
        /// Directory server address, host:port
        #[arg(short, long)]
        server: Option<String>,

        /// Username to register under (prompted for when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Connection speed: slow, medium or fast (prompted for when omitted)
        #[arg(long)]
        speed: Option<String>,

        /// Directory the transfer responder serves files from
        #[arg(long)]
        share_dir: Option<String>,

        /// Optional path to a JSON config file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// List the files a peer is serving
    List {
        /// Peer transfer address, host:port
        #[arg(short, long)]
        peer: String,
    },
    /// Send a local file to a peer
    Send {
        /// Name of the file inside the local directory
        #[arg(short, long)]
        file: String,

        /// Peer transfer address, host:port
        #[arg(short, long)]
        peer: String,

        /// Local directory holding the file
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Fetch a file from a peer
    Fetch {
        /// Name of the file to retrieve
        #[arg(short, long)]
        file: String,

        /// Peer transfer address, host:port
        #[arg(short, long)]
        peer: String,

        /// Local directory the file lands in
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

// Function to initialize tracing and file logging
// Returns a WorkerGuard that must be kept alive for logs to be written
fn init_logging(log_file_prefix: &str) -> Result<WorkerGuard, Box<dyn Error>> {
    // Create a directory for logs if it doesn't exist
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", log_file_prefix);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false); // Don't use ANSI codes in files

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    // Use RUST_LOG env var, default to info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // This guard needs to stay in scope, otherwise logs stop writing.
    let _guard = init_logging("peerdex")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let mut config = AppConfig::load_or_default(config.as_deref());
            if let Some(bind) = bind {
                config.directory.bind_addr = bind;
            }
            config.validate()?;

            info!("Starting directory server on {}...", config.directory.bind_addr);
            let server =
                DirectoryServer::bind(config.directory.bind_addr.as_str(), config.idle_timeout())
                    .await?;
            server.run().await?;
        }
        Commands::Host {
            server,
            username,
            speed,
            share_dir,
            config,
        } => {
            let mut config = AppConfig::load_or_default(config.as_deref());
            if let Some(dir) = share_dir {
                config.host.share_dir = dir;
            }
            config.validate()?;

            // Parse the speed up front so a typo fails before any sockets open
            let speed = match speed {
                Some(raw) => match raw.parse::<ConnectionSpeed>() {
                    Ok(speed) => Some(speed),
                    Err(_) => {
                        error!("Invalid connection speed: {}", raw);
                        return Err("Invalid connection speed".into());
                    }
                },
                None => None,
            };

            let server_addr = server.unwrap_or_else(|| config.directory.bind_addr.clone());
            info!("Joining directory server at {}...", server_addr);
            host::run_host(&server_addr, username, speed, &config).await?;
        }
        Commands::List { peer } => {
            let mut initiator = TransferInitiator::connect(peer.as_str(), ".").await?;
            let listing = initiator.list().await?;
            initiator.quit().await?;

            if listing.is_empty() {
                println!("Peer is serving no files.");
            } else {
                println!("{listing}");
            }
        }
        Commands::Send { file, peer, dir } => {
            if !dir.join(&file).exists() {
                error!("File does not exist: {:?}", dir.join(&file));
                return Err("File not found".into());
            }

            let mut initiator = TransferInitiator::connect(peer.as_str(), dir).await?;
            let bytes = initiator.stor(&file).await?;
            initiator.quit().await?;
            println!("Sent {} ({} bytes) to {}", file, bytes, peer);
        }
        Commands::Fetch { file, peer, dir } => {
            let mut initiator = TransferInitiator::connect(peer.as_str(), dir).await?;
            let bytes = initiator.retr(&file).await?;
            initiator.quit().await?;
            println!("Retrieved {} ({} bytes) from {}", file, bytes, peer);
        }
    }

    Ok(())
}
