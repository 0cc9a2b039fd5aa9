//! Common types, route catalogue, and errors shared across the workload demo crates.

pub mod error;
pub mod protocol;

pub use error::ProtocolError;
pub use protocol::Route;
