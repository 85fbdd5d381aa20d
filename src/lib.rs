//! Browse a remote FTP server as a virtual filesystem.
//!
//! FTP exposes almost nothing as structured data, so everything a
//! filesystem API takes for granted is reconstructed here: existence
//! from name-listing membership, permissions from parsed `ls -l` text,
//! directory-ness from a naming heuristic, and copy from a
//! download-then-upload through a local staging file. The [`storage`]
//! module holds that reconstruction, [`item`] compiles per-path
//! metadata snapshots, and [`api`] stacks the request-level actions
//! (list, seek, mkdir, rename, copy, move, streaming reads) with their
//! validation order on top.

pub mod api;
pub mod config;
pub mod error;
pub mod ftp;
pub mod image;
pub mod item;
pub mod listing;
pub mod path;
pub mod policy;
pub mod storage;

pub use api::actions::Api;
pub use config::Config;
pub use error::StorageError;
pub use ftp::{FtpTransport, RemoteFs};
pub use item::{ItemSnapshot, VirtualItem};
pub use storage::Storage;
