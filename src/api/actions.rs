//! Request-level actions over the virtual filesystem.
//!
//! Every action resolves its paths into [`VirtualItem`]s up front and
//! runs the full validation ladder before the first transport
//! mutation. Mutations re-resolve the affected path afterwards so the
//! returned snapshot reflects the post-action state, not the state
//! captured during validation.

use tokio::io::AsyncWrite;

use crate::api::events::{ApiEvent, EventHook, EventHooks};
use crate::api::types::{
    InitiateAttributes, InitiateResource, ResourceKind, SharedConfig, SharedSecurity,
};
use crate::error::StorageError;
use crate::ftp::transport::RemoteFs;
use crate::image;
use crate::item::{ItemSnapshot, VirtualItem};
use crate::path;
use crate::storage::Storage;

pub struct Api<R: RemoteFs> {
    storage: Storage<R>,
    hooks: EventHooks,
}

impl<R: RemoteFs> Api<R> {
    pub fn new(storage: Storage<R>) -> Self {
        Self {
            storage,
            hooks: EventHooks::default(),
        }
    }

    pub fn storage(&self) -> &Storage<R> {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage<R> {
        &mut self.storage
    }

    pub fn on_event(&mut self, hook: EventHook) {
        self.hooks.register(hook);
    }

    /// End the transport session. Call once, after the last action.
    pub async fn close(&self) {
        self.storage.close().await;
    }

    // ── Read actions ─────────────────────────────────────────────────────────

    /// Handshake: the client-visible slice of the server configuration.
    pub fn initiate(&self) -> InitiateResource {
        let security = &self.storage.config().security;
        InitiateResource {
            id: "/".to_string(),
            kind: ResourceKind::Initiate,
            attributes: InitiateAttributes {
                config: SharedConfig {
                    security: SharedSecurity {
                        read_only: security.read_only,
                        extensions: security.extensions.clone(),
                    },
                },
            },
        }
    }

    pub async fn get_info(&self, path_str: &str) -> Result<ItemSnapshot, StorageError> {
        let item = VirtualItem::resolve(&self.storage, path_str).await?;
        item.check_path()?;
        item.check_read_permission()?;
        Ok(item.compile().await)
    }

    /// List one folder. Entries hidden by the security policy are
    /// dropped, not errored. A listing or metadata failure part-way
    /// through reports the folder as unreadable.
    pub async fn read_folder(&self, path_str: &str) -> Result<Vec<ItemSnapshot>, StorageError> {
        let folder = VirtualItem::resolve(&self.storage, path_str).await?;
        folder.check_path()?;
        folder.check_read_permission()?;
        if !folder.is_directory() {
            return Err(StorageError::DirectoryNotFound {
                path: folder.relative().to_string(),
            });
        }
        let (snapshots, entries) = match self.collect_children(&folder).await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("enumeration of {} failed: {err}", folder.relative());
                return Err(StorageError::DirectoryUnreadable {
                    path: folder.relative().to_string(),
                });
            }
        };
        self.hooks.emit(&ApiEvent::FolderRead {
            folder: folder.relative().to_string(),
            entries,
        });
        Ok(snapshots)
    }

    /// Depth-capped recursive search for basenames containing `query`
    /// (case-insensitive). Unreadable subtrees are skipped silently so
    /// one bad directory cannot kill the whole search.
    pub async fn seek_folder(
        &self,
        path_str: &str,
        query: &str,
    ) -> Result<Vec<ItemSnapshot>, StorageError> {
        let folder = VirtualItem::resolve(&self.storage, path_str).await?;
        folder.check_path()?;
        folder.check_read_permission()?;
        if !folder.is_directory() {
            return Err(StorageError::DirectoryNotFound {
                path: folder.relative().to_string(),
            });
        }

        let needle = query.to_lowercase();
        let depth_limit = self.storage.config().copy_max_depth;
        let mut snapshots = Vec::new();
        let mut matched = Vec::new();
        let mut stack = vec![(folder.relative().to_string(), 0usize)];
        while let Some((dir_relative, depth)) = stack.pop() {
            let dir_absolute = self.storage.resolver().to_absolute(&dir_relative);
            let names = match self.storage.list_names(&dir_absolute).await {
                Ok(names) => names,
                Err(err) => {
                    log::debug!("seek skips {dir_relative}: {err}");
                    continue;
                }
            };
            for raw in &names {
                let name = path::basename(&path::clean(raw)).to_string();
                if name.is_empty() || path::is_dot_segment(&name) {
                    continue;
                }
                let child_relative = path::join(&dir_relative, &name);
                let child_absolute = self.storage.resolver().to_absolute(&child_relative);
                let is_dir = match self.storage.probe_directory(&child_absolute).await {
                    Ok(flag) => flag,
                    Err(err) => {
                        log::debug!("seek skips {child_relative}: {err}");
                        continue;
                    }
                };
                if name.to_lowercase().contains(&needle) {
                    match VirtualItem::resolve(&self.storage, &child_relative).await {
                        Ok(item) if item.is_unrestricted() => {
                            matched.push(item.relative().to_string());
                            snapshots.push(item.compile().await);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::debug!("seek skips {child_relative}: {err}");
                        }
                    }
                }
                if is_dir {
                    if depth + 1 < depth_limit {
                        stack.push((child_relative, depth + 1));
                    } else {
                        log::debug!("seek stops below {child_relative}: depth limit");
                    }
                }
            }
        }

        self.hooks.emit(&ApiEvent::FolderSought {
            folder: folder.relative().to_string(),
            query: query.to_string(),
            matches: matched,
        });
        Ok(snapshots)
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Create a directory named `name` under `parent_path`.
    pub async fn add_folder(
        &self,
        parent_path: &str,
        name: &str,
    ) -> Result<ItemSnapshot, StorageError> {
        let parent = VirtualItem::resolve(&self.storage, parent_path).await?;
        parent.check_path()?;
        parent.check_write_permission()?;

        let trimmed = name.trim_matches('/');
        if trimmed.is_empty()
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || path::is_dot_segment(trimmed)
        {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }

        let target_relative = path::join(parent.relative(), trimmed);
        let target = VirtualItem::resolve(&self.storage, &target_relative).await?;
        if target.exists() && target.is_directory() {
            return Err(StorageError::already_exists(target.relative(), true));
        }

        self.storage.make_directory(target.absolute()).await?;

        let created = VirtualItem::resolve(&self.storage, &target_relative)
            .await?
            .compile()
            .await;
        self.hooks.emit(&ApiEvent::FolderCreated {
            folder: created.path_relative.clone(),
        });
        Ok(created)
    }

    /// Rename within the containing directory. A file's new name
    /// inherits the old extension when it does not bring its own.
    /// Returns the pre-mutation and post-mutation snapshots.
    pub async fn rename(
        &self,
        old_path: &str,
        new_name: &str,
    ) -> Result<(ItemSnapshot, ItemSnapshot), StorageError> {
        if new_name.trim().is_empty() || new_name.contains('/') || new_name.contains('\\') {
            return Err(StorageError::InvalidName {
                name: new_name.to_string(),
            });
        }
        let old = VirtualItem::resolve(&self.storage, old_path).await?;
        if old.is_root() {
            return Err(StorageError::OperationNotAllowed(
                "cannot rename the root directory".to_string(),
            ));
        }
        old.check_path()?;
        old.check_write_permission()?;

        let new_basename = if old.is_directory() || path::has_extension(new_name) {
            new_name.to_string()
        } else {
            match path::extension(old.relative()) {
                Some(ext) => format!("{new_name}.{ext}"),
                None => new_name.to_string(),
            }
        };
        let target_relative = path::join(&path::dirname(old.relative()), &new_basename);
        let target = VirtualItem::resolve(&self.storage, &target_relative).await?;
        if target.exists() {
            return Err(StorageError::already_exists(
                target.relative(),
                target.is_directory(),
            ));
        }

        let before = old.compile().await;
        let new_absolute = self.storage.rename(old.absolute(), &new_basename).await?;
        let after = VirtualItem::resolve(&self.storage, &new_absolute)
            .await?
            .compile()
            .await;
        self.hooks.emit(&ApiEvent::ItemRenamed {
            old: before.path_relative.clone(),
            new: after.path_relative.clone(),
        });
        Ok((before, after))
    }

    /// Duplicate an item into `target_path`. The copy is named
    /// `<stem>_copy_<unix-time>` with the source extension retained,
    /// so repeated copies into the same folder do not collide.
    pub async fn copy(
        &self,
        source_path: &str,
        target_path: &str,
    ) -> Result<(ItemSnapshot, ItemSnapshot), StorageError> {
        let source = VirtualItem::resolve(&self.storage, source_path).await?;
        let target = VirtualItem::resolve(&self.storage, target_path).await?;
        if !target.is_directory() {
            return Err(StorageError::DirectoryNotFound {
                path: target.relative().to_string(),
            });
        }
        if source.is_root() {
            return Err(StorageError::OperationNotAllowed(
                "cannot copy the root directory".to_string(),
            ));
        }
        source.check_path()?;
        source.check_read_permission()?;
        target.check_path()?;
        target.check_write_permission()?;

        let stamp = chrono::Utc::now().timestamp();
        let source_name = path::basename(source.relative());
        let copy_name = match path::extension(source_name) {
            Some(ext) => format!("{}_copy_{stamp}.{ext}", path::stem(source_name)),
            None => format!("{source_name}_copy_{stamp}"),
        };
        let target_relative = path::join(target.relative(), &copy_name);
        let fresh = VirtualItem::resolve(&self.storage, &target_relative).await?;
        if fresh.exists() {
            return Err(StorageError::already_exists(
                fresh.relative(),
                fresh.is_directory(),
            ));
        }

        let before = source.compile().await;
        self.storage
            .copy_item(source.absolute(), fresh.absolute(), source.is_directory())
            .await?;
        let after = VirtualItem::resolve(&self.storage, &target_relative)
            .await?
            .compile()
            .await;
        self.hooks.emit(&ApiEvent::ItemCopied {
            source: before.path_relative.clone(),
            new: after.path_relative.clone(),
        });
        Ok((before, after))
    }

    /// Move an item into `target_path`, keeping its basename.
    pub async fn move_item(
        &self,
        source_path: &str,
        target_path: &str,
    ) -> Result<(ItemSnapshot, ItemSnapshot), StorageError> {
        let source = VirtualItem::resolve(&self.storage, source_path).await?;
        let target = VirtualItem::resolve(&self.storage, target_path).await?;
        if !target.is_directory() {
            return Err(StorageError::DirectoryNotFound {
                path: target.relative().to_string(),
            });
        }
        if source.is_root() {
            return Err(StorageError::OperationNotAllowed(
                "cannot move the root directory".to_string(),
            ));
        }
        source.check_path()?;
        source.check_write_permission()?;
        target.check_path()?;
        target.check_write_permission()?;

        let target_relative = path::join(target.relative(), path::basename(source.relative()));
        let fresh = VirtualItem::resolve(&self.storage, &target_relative).await?;
        if fresh.exists() {
            return Err(StorageError::already_exists(
                fresh.relative(),
                fresh.is_directory(),
            ));
        }

        let before = source.compile().await;
        let new_absolute = self
            .storage
            .move_item(source.absolute(), target.absolute())
            .await?;
        let after = VirtualItem::resolve(&self.storage, &new_absolute)
            .await?
            .compile()
            .await;
        self.hooks.emit(&ApiEvent::ItemMoved {
            source: before.path_relative.clone(),
            new: after.path_relative.clone(),
        });
        Ok((before, after))
    }

    // ── Streaming reads ──────────────────────────────────────────────────────

    /// Stream one file's bytes into `sink`; returns the snapshot and
    /// the byte count.
    pub async fn read_file<W: AsyncWrite + Unpin + Send>(
        &self,
        path_str: &str,
        sink: &mut W,
    ) -> Result<(ItemSnapshot, u64), StorageError> {
        self.stream_item(path_str, sink).await
    }

    /// Same contract as [`Api::read_file`]; kept separate because
    /// download responses carry attachment semantics at the caller.
    pub async fn download<W: AsyncWrite + Unpin + Send>(
        &self,
        path_str: &str,
        sink: &mut W,
    ) -> Result<(ItemSnapshot, u64), StorageError> {
        self.stream_item(path_str, sink).await
    }

    /// Stream an image, or its conventional thumbnail location when
    /// `thumbnail` is set.
    pub async fn get_image<W: AsyncWrite + Unpin + Send>(
        &self,
        path_str: &str,
        thumbnail: bool,
        sink: &mut W,
    ) -> Result<(ItemSnapshot, u64), StorageError> {
        let requested = if thumbnail {
            let relative = self.storage.resolver().to_relative(&path::clean(path_str));
            image::thumbnail_path(&self.storage.config().images, &relative)
        } else {
            path_str.to_string()
        };
        self.stream_item(&requested, sink).await
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn stream_item<W: AsyncWrite + Unpin + Send>(
        &self,
        path_str: &str,
        sink: &mut W,
    ) -> Result<(ItemSnapshot, u64), StorageError> {
        let item = VirtualItem::resolve(&self.storage, path_str).await?;
        if item.is_directory() {
            return Err(StorageError::OperationNotAllowed(format!(
                "cannot stream a directory: {}",
                item.relative()
            )));
        }
        item.check_path()?;
        item.check_read_permission()?;
        item.check_restrictions()?;
        let snapshot = item.compile().await;
        let bytes = self.storage.stream_download(item.absolute(), sink).await?;
        Ok((snapshot, bytes))
    }

    async fn collect_children(
        &self,
        folder: &VirtualItem<'_, R>,
    ) -> Result<(Vec<ItemSnapshot>, Vec<String>), StorageError> {
        let names = self.storage.list_names(folder.absolute()).await?;
        let mut snapshots = Vec::new();
        let mut entries = Vec::new();
        for raw in &names {
            let name = path::basename(&path::clean(raw)).to_string();
            if name.is_empty() || path::is_dot_segment(&name) {
                continue;
            }
            let child =
                VirtualItem::resolve(&self.storage, &path::join(folder.relative(), &name)).await?;
            if child.is_unrestricted() {
                entries.push(child.relative().to_string());
                snapshots.push(child.compile().await);
            }
        }
        Ok((snapshots, entries))
    }
}
