//! Per-request item façade: one user-supplied path materialized with
//! its resolved forms, inferred permissions, and existence.
//!
//! Construction does all the remote lookups up front; the checks and
//! the compiled snapshot then work from that immutable state. Items
//! are request-scoped — nothing here survives or is cached across
//! requests, because the remote tree can change between calls.

use serde::Serialize;

use crate::error::{AccessReason, StorageError};
use crate::ftp::transport::RemoteFs;
use crate::image;
use crate::listing::PermissionTriple;
use crate::path;
use crate::policy;
use crate::storage::{DirectoryClassifier, ItemKind, Storage};

/// Fully-resolved metadata for one path at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub path_relative: String,
    pub path_absolute: String,
    pub basename: String,
    pub is_directory: bool,
    pub is_exists: bool,
    pub is_root: bool,
    pub is_image: bool,
    pub is_readable: bool,
    pub is_writable: bool,
    pub is_executable: bool,
    pub time_modified: Option<String>,
    pub time_created: Option<String>,
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<ImageData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub is_thumbnail: bool,
    pub path_original: String,
    pub path_thumbnail: String,
    pub width: u32,
    pub height: u32,
}

/// One path's live view. Holds the borrowed storage handle plus the
/// state resolved at construction; everything after that is either a
/// pure check or a fresh lookup against that state.
pub struct VirtualItem<'a, R: RemoteFs> {
    storage: &'a Storage<R>,
    relative: String,
    absolute: String,
    kind: ItemKind,
    permissions: PermissionTriple,
    exists: bool,
    // Outer None: parent not yet resolved. Inner None: this is the root.
    parent: Option<Option<Box<VirtualItem<'a, R>>>>,
}

// Manual impl: the borrowed storage handle is opaque, so only the
// resolved state is printed.
impl<R: RemoteFs> std::fmt::Debug for VirtualItem<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualItem")
            .field("relative", &self.relative)
            .field("absolute", &self.absolute)
            .field("kind", &self.kind)
            .field("permissions", &self.permissions)
            .field("exists", &self.exists)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl<'a, R: RemoteFs> VirtualItem<'a, R> {
    /// Resolve a user-supplied path (relative or absolute) into an
    /// item. Structural validation happens first; the permission walk
    /// runs before the existence probe, so a path under an unlistable
    /// parent surfaces [`StorageError::ListingUnavailable`] rather
    /// than a not-found.
    pub async fn resolve(storage: &'a Storage<R>, requested: &str) -> Result<Self, StorageError> {
        let cleaned = path::clean(requested);
        if !path::is_traversal_safe(&cleaned) {
            return Err(StorageError::InvalidPath {
                path: requested.to_string(),
            });
        }
        let relative = storage.resolver().to_relative(&cleaned);
        let absolute = storage.resolver().to_absolute(&relative);
        let kind = storage.classify(&absolute);
        let permissions = storage.permission_triple(&absolute).await?;
        let exists = storage.exists(&absolute).await?;
        Ok(Self {
            storage,
            relative,
            absolute,
            kind,
            permissions,
            exists,
            parent: None,
        })
    }

    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    pub fn is_root(&self) -> bool {
        self.storage.resolver().is_root(&self.absolute)
    }

    pub fn is_image(&self) -> bool {
        !self.is_directory() && image::is_image_path(&self.storage.config().images, &self.relative)
    }

    pub fn permissions(&self) -> PermissionTriple {
        self.permissions
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Listing visibility: files must pass extension and pattern
    /// policy, directories only the pattern policy.
    pub fn is_unrestricted(&self) -> bool {
        let security = &self.storage.config().security;
        policy::is_unrestricted(
            &self.relative,
            self.is_directory(),
            &security.extensions,
            &security.patterns,
        )
    }

    // ── Pre-action checks ────────────────────────────────────────────────────

    /// Fails with the kind-appropriate not-found when the item is
    /// absent from its parent's listing.
    pub fn check_path(&self) -> Result<(), StorageError> {
        if !self.exists {
            return Err(StorageError::not_found(&self.relative, self.is_directory()));
        }
        Ok(())
    }

    pub fn check_read_permission(&self) -> Result<(), StorageError> {
        if !self.permissions.read {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::Permissions,
            ));
        }
        if !self.storage.guards().allows_read(&self.absolute) {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::Guard,
            ));
        }
        Ok(())
    }

    /// Single-item rendition of the policy filter: folder listings drop
    /// restricted entries silently, byte-serving actions fail loudly.
    pub fn check_restrictions(&self) -> Result<(), StorageError> {
        if !self.is_unrestricted() {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::Restricted,
            ));
        }
        Ok(())
    }

    /// Read-only mode wins over everything, then the inferred bit,
    /// then the registered guard.
    pub fn check_write_permission(&self) -> Result<(), StorageError> {
        if self.storage.config().security.read_only {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::ReadOnly,
            ));
        }
        if !self.permissions.write {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::Permissions,
            ));
        }
        if !self.storage.guards().allows_write(&self.absolute) {
            return Err(StorageError::access_denied(
                &self.relative,
                AccessReason::Guard,
            ));
        }
        Ok(())
    }

    /// Parent item, resolved lazily and cached. The root has none.
    pub async fn closest(&mut self) -> Result<Option<&VirtualItem<'a, R>>, StorageError> {
        if self.parent.is_none() {
            let resolved = if self.is_root() {
                None
            } else {
                let parent_relative = path::dirname(&self.relative);
                Some(Box::new(
                    VirtualItem::resolve(self.storage, &parent_relative).await?,
                ))
            };
            self.parent = Some(resolved);
        }
        Ok(self.parent.as_ref().and_then(|p| p.as_deref()))
    }

    // ── Snapshot ─────────────────────────────────────────────────────────────

    /// Assemble the full metadata record. Lookups that fail (size,
    /// modify time, image probe) degrade to absent fields; compilation
    /// itself never errors.
    pub async fn compile(&self) -> ItemSnapshot {
        let is_directory = self.is_directory();
        let is_image = self.is_image();
        let basename = path::basename(&self.relative).to_string();

        let time_modified = if is_directory {
            None
        } else {
            match self.storage.modify_time(&self.absolute).await {
                Ok(stamp) => Some(stamp.format("%Y-%m-%d").to_string()),
                Err(err) => {
                    log::debug!("no modify time for {}: {err}", self.absolute);
                    None
                }
            }
        };

        let size = if !is_directory && self.permissions.read {
            match self.storage.size(&self.absolute).await {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    log::debug!("no size for {}: {err}", self.absolute);
                    None
                }
            }
        } else {
            None
        };

        let image_data = if is_image {
            let (width, height) = if self.permissions.read && size.is_some_and(|n| n > 0) {
                image::probe_dimensions(self.storage, &self.absolute).await
            } else {
                (0, 0)
            };
            Some(ImageData {
                is_thumbnail: true,
                path_original: basename.clone(),
                path_thumbnail: image::thumbnail_path(
                    &self.storage.config().images,
                    &self.relative,
                ),
                width,
                height,
            })
        } else {
            None
        };

        let (path_relative, path_absolute) = if is_directory {
            (
                path::with_trailing_slash(&self.relative),
                path::with_trailing_slash(&self.absolute),
            )
        } else {
            (self.relative.clone(), self.absolute.clone())
        };

        ItemSnapshot {
            path_relative,
            path_absolute,
            basename,
            is_directory,
            is_exists: self.exists,
            is_root: self.is_root(),
            is_image,
            is_readable: self.permissions.read,
            is_writable: self.permissions.write,
            is_executable: self.permissions.execute,
            time_modified: time_modified.clone(),
            time_created: time_modified,
            size,
            image_data,
        }
    }
}
