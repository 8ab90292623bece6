pub mod command;
pub mod initiator;
pub mod responder;

// Re-exports for easier access from crate::transfer::{...}
pub use command::{validate_file_name, TransferCommand};
pub use initiator::TransferInitiator;
pub use responder::TransferResponder;
