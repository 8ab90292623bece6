pub mod advertise;
pub mod client;
pub mod registry;
pub mod server;
mod session;

// Re-exports for easier access from crate::directory::{...}
pub use advertise::Advertisement;
pub use client::{DirectoryClient, HostIdentity, SearchOutcome};
pub use registry::{ConnectionSpeed, FileEntry, Registry, NO_MATCH_REPLY};
pub use server::DirectoryServer;
