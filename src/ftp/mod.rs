//! FTP transport layer.
//!
//! - `transport`: the narrow `RemoteFs` operation set and its suppaftp
//!   implementation with lazy connect/login
//! - `staging`: scoped local temp files for synthesized copies
//! - `mock` (test builds): an in-memory `RemoteFs` for exercising the
//!   storage and action layers without a server

pub mod staging;
pub mod transport;

#[cfg(test)]
pub mod mock;

pub use staging::StagingFile;
pub use transport::{FtpTransport, RemoteFs, TransportError};
