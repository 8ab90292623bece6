pub mod config;
pub mod directory;
pub mod error;
pub mod host;
pub mod transfer;
pub mod wire;

// Re-export key modules for easier access in integration tests
pub use directory::{
    Advertisement, ConnectionSpeed, DirectoryClient, DirectoryServer, FileEntry, HostIdentity,
    Registry, SearchOutcome,
};
pub use error::{Error, Result};

// Re-export for easy access in tests
pub use transfer::{TransferCommand, TransferInitiator, TransferResponder};
