//! Error taxonomy for virtual-filesystem operations.
//!
//! Validation failures abort an action before any transport mutation;
//! transport faults surface with the underlying message attached. Every
//! variant maps to a stable response code for the API envelope.

use thiserror::Error;

use crate::ftp::transport::TransportError;

/// Why an access check failed. Distinguishes bits inferred from the
/// server listing from locally configured denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// The inferred permission triple lacks the required bit.
    Permissions,
    /// A registered authorization guard said no.
    Guard,
    /// The extension/pattern security policy hides the item.
    Restricted,
    /// The whole backend is configured read-only.
    ReadOnly,
}

impl std::fmt::Display for AccessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AccessReason::Permissions => "server permissions",
            AccessReason::Guard => "authorization callback",
            AccessReason::Restricted => "security policy",
            AccessReason::ReadOnly => "read-only mode",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file does not exist: {path}")]
    FileNotFound { path: String },

    #[error("directory does not exist: {path}")]
    DirectoryNotFound { path: String },

    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("invalid name: {name}")]
    InvalidName { name: String },

    #[error("access denied ({reason}): {path}")]
    AccessDenied { path: String, reason: AccessReason },

    #[error("file already exists: {path}")]
    FileAlreadyExists { path: String },

    #[error("directory already exists: {path}")]
    DirectoryAlreadyExists { path: String },

    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot open file list")]
    ListingUnavailable,

    /// Folder enumeration failed part-way: the listing itself or the
    /// metadata of one of its entries could not be fetched.
    #[error("unable to open directory: {path}")]
    DirectoryUnreadable { path: String },

    #[error("copy aborted: directory tree exceeds depth limit {0}")]
    CopyDepthExceeded(usize),
}

impl StorageError {
    /// Wording-aware not-found constructor.
    pub fn not_found(path: &str, is_directory: bool) -> Self {
        if is_directory {
            StorageError::DirectoryNotFound {
                path: path.to_string(),
            }
        } else {
            StorageError::FileNotFound {
                path: path.to_string(),
            }
        }
    }

    /// Wording-aware already-exists constructor.
    pub fn already_exists(path: &str, is_directory: bool) -> Self {
        if is_directory {
            StorageError::DirectoryAlreadyExists {
                path: path.to_string(),
            }
        } else {
            StorageError::FileAlreadyExists {
                path: path.to_string(),
            }
        }
    }

    pub fn access_denied(path: &str, reason: AccessReason) -> Self {
        StorageError::AccessDenied {
            path: path.to_string(),
            reason,
        }
    }

    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::FileNotFound { .. } => "FILE_DOES_NOT_EXIST",
            StorageError::DirectoryNotFound { .. } => "DIRECTORY_NOT_EXIST",
            StorageError::InvalidPath { .. } => "INVALID_PATH",
            StorageError::InvalidName { .. } => "FORBIDDEN_NAME",
            StorageError::AccessDenied { reason, .. } => match reason {
                AccessReason::Permissions => "NOT_ALLOWED_SYSTEM",
                _ => "NOT_ALLOWED",
            },
            StorageError::FileAlreadyExists { .. } => "FILE_ALREADY_EXISTS",
            StorageError::DirectoryAlreadyExists { .. } => "DIRECTORY_ALREADY_EXISTS",
            StorageError::OperationNotAllowed(_) => "NOT_ALLOWED",
            StorageError::Transport(_) => "ERROR_SERVER",
            StorageError::ListingUnavailable => "ERROR",
            StorageError::DirectoryUnreadable { .. } => "UNABLE_TO_OPEN_DIRECTORY",
            StorageError::CopyDepthExceeded(_) => "COPY_DEPTH_EXCEEDED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_picks_wording_by_kind() {
        let file = StorageError::not_found("/a/x.txt", false);
        assert_eq!(file.to_string(), "file does not exist: /a/x.txt");
        assert_eq!(file.code(), "FILE_DOES_NOT_EXIST");

        let dir = StorageError::not_found("/a/sub", true);
        assert_eq!(dir.to_string(), "directory does not exist: /a/sub");
        assert_eq!(dir.code(), "DIRECTORY_NOT_EXIST");
    }

    #[test]
    fn access_reason_shapes_message_and_code() {
        let system = StorageError::access_denied("/a", AccessReason::Permissions);
        assert_eq!(system.code(), "NOT_ALLOWED_SYSTEM");
        assert!(system.to_string().contains("server permissions"));

        let guard = StorageError::access_denied("/a", AccessReason::Guard);
        assert_eq!(guard.code(), "NOT_ALLOWED");
    }

    #[test]
    fn listing_failure_has_fixed_detail() {
        assert_eq!(
            StorageError::ListingUnavailable.to_string(),
            "cannot open file list"
        );
    }
}
