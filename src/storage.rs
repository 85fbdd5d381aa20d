//! Root-anchored virtual filesystem over a `RemoteFs` transport.
//!
//! Reconstructs filesystem semantics the protocol does not provide:
//! existence via name-listing membership, permissions via parent-listing
//! parsing, directory-ness via a structural heuristic, and copy via
//! download+upload staging. One instance serves one request; the shared
//! transport handle is locked per call, and calls are sequential.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::StorageError;
use crate::ftp::staging::StagingFile;
use crate::ftp::transport::{RemoteFs, TransportError};
use crate::listing::{self, PermissionSource, PermissionTriple};
use crate::path::{self, PathResolver};
use crate::policy::{AccessGuard, AccessGuards};

/// Structural item classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

impl ItemKind {
    pub fn is_directory(self) -> bool {
        matches!(self, ItemKind::Directory)
    }
}

/// Decides file vs. directory for a path.
///
/// The production rule is structural — an extension in the last segment
/// means file — and is a documented heuristic, not a protocol fact: a
/// directory named `archive.bak` is misclassified. Tree-walking code
/// that needs ground truth probes the server instead (see
/// [`Storage::probe_directory`]).
pub trait DirectoryClassifier {
    fn classify(&self, absolute_path: &str) -> ItemKind;
}

/// The remote filesystem client: path algebra, reconstructed metadata,
/// and mutations, over one lazily connected transport.
pub struct Storage<R: RemoteFs> {
    resolver: PathResolver,
    config: Config,
    guards: AccessGuards,
    remote: Arc<Mutex<R>>,
}

impl<R: RemoteFs> Storage<R> {
    pub fn new(config: Config, remote: R) -> Self {
        Self {
            resolver: PathResolver::new(&config.root),
            config,
            guards: AccessGuards::default(),
            remote: Arc::new(Mutex::new(remote)),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn guards(&self) -> &AccessGuards {
        &self.guards
    }

    pub fn set_read_guard(&mut self, guard: AccessGuard) {
        self.guards.set_read(guard);
    }

    pub fn set_write_guard(&mut self, guard: AccessGuard) {
        self.guards.set_write(guard);
    }

    /// Shared transport handle (tests inspect the mock through this).
    pub fn remote(&self) -> &Arc<Mutex<R>> {
        &self.remote
    }

    // ── Listings and reconstructed metadata ──────────────────────────────────

    /// Flat name listing of a directory. Raw transport output: may
    /// contain `.`/`..`, bare names or full paths. Callers filter.
    pub async fn list_names(&self, dir_absolute: &str) -> Result<Vec<String>, StorageError> {
        let mut remote = self.remote.lock().await;
        let names = remote.list_names(dir_absolute).await?;
        log::debug!("nlst {dir_absolute}: {} entries", names.len());
        Ok(names)
    }

    /// Long-format listing lines, for permission inference only.
    pub async fn raw_list(&self, dir_absolute: &str) -> Result<Vec<String>, StorageError> {
        let mut remote = self.remote.lock().await;
        let lines = remote.raw_list(dir_absolute).await?;
        Ok(lines)
    }

    /// Whether `absolute` exists, by membership in its parent's name
    /// listing. The root always exists. Servers differ on NLST output
    /// form, so both the full path and the bare name count as a match.
    pub async fn exists(&self, absolute: &str) -> Result<bool, StorageError> {
        let absolute = path::clean(absolute);
        if self.resolver.is_root(&absolute) {
            return Ok(true);
        }
        let parent = path::dirname(&absolute);
        let names = self.list_names(&parent).await?;
        let target_name = path::basename(&absolute);
        Ok(names.iter().any(|raw| {
            let cleaned = path::clean(raw);
            cleaned == absolute || path::basename(&cleaned) == target_name
        }))
    }

    pub fn is_directory(&self, absolute: &str) -> bool {
        self.classify(absolute).is_directory()
    }

    /// Ground-truth directory check: ask the server to enter the path.
    pub async fn probe_directory(&self, absolute: &str) -> Result<bool, StorageError> {
        let mut remote = self.remote.lock().await;
        Ok(remote.probe_directory(absolute).await?)
    }

    /// Walk from the root to `absolute`, intersecting each node's own
    /// listing bits into the running triple. The root contributes
    /// all-true without a lookup; a node with no matching listing line
    /// contributes all-false. A parent listing that cannot be fetched
    /// fails the whole walk — never a silent all-false.
    pub async fn permission_triple(
        &self,
        absolute: &str,
    ) -> Result<PermissionTriple, StorageError> {
        let absolute = path::clean(absolute);
        if self.resolver.is_root(&absolute) {
            return Ok(PermissionTriple::ALL);
        }
        let relative = self.resolver.to_relative(&absolute);
        let mut triple = PermissionTriple::ALL;
        let mut prefix = String::new();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            let node = self.resolver.to_absolute(&prefix);
            let parent = path::dirname(&node);
            let lines = self.raw_list(&parent).await.map_err(|err| {
                log::warn!("permission walk: listing {parent} failed: {err}");
                StorageError::ListingUnavailable
            })?;
            let own = listing::find_permissions(&lines, segment)
                .unwrap_or(PermissionTriple::NONE);
            triple = triple.intersect(own);
        }
        Ok(triple)
    }

    pub async fn size(&self, absolute: &str) -> Result<u64, StorageError> {
        let mut remote = self.remote.lock().await;
        Ok(remote.size(absolute).await?)
    }

    pub async fn modify_time(
        &self,
        absolute: &str,
    ) -> Result<chrono::NaiveDateTime, StorageError> {
        let mut remote = self.remote.lock().await;
        Ok(remote.modify_time(absolute).await?)
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    pub async fn make_directory(&self, absolute: &str) -> Result<(), StorageError> {
        let mut remote = self.remote.lock().await;
        remote.make_directory(absolute).await?;
        log::info!("created directory {absolute}");
        Ok(())
    }

    /// Rename within the containing directory. The new basename must be
    /// a single segment.
    pub async fn rename(
        &self,
        absolute: &str,
        new_basename: &str,
    ) -> Result<String, StorageError> {
        if new_basename.is_empty()
            || new_basename.contains('/')
            || new_basename.contains('\\')
        {
            return Err(StorageError::InvalidName {
                name: new_basename.to_string(),
            });
        }
        let from = path::clean(absolute);
        let to = path::join(&path::dirname(&from), new_basename);
        let mut remote = self.remote.lock().await;
        remote.rename(&from, &to).await?;
        log::info!("renamed {from} -> {to}");
        Ok(to)
    }

    /// Move into another directory, keeping the basename.
    pub async fn move_item(
        &self,
        absolute: &str,
        dest_dir_absolute: &str,
    ) -> Result<String, StorageError> {
        let from = path::clean(absolute);
        let to = path::join(&path::clean(dest_dir_absolute), path::basename(&from));
        let mut remote = self.remote.lock().await;
        remote.rename(&from, &to).await?;
        log::info!("moved {from} -> {to}");
        Ok(to)
    }

    /// Synthesized file copy: download into a staging file, upload from
    /// it. The staging file is dropped — and removed — on every path.
    pub async fn copy_file(
        &self,
        source_absolute: &str,
        dest_absolute: &str,
    ) -> Result<(), StorageError> {
        let staging = StagingFile::allocate();
        {
            let mut sink = staging.create().await.map_err(TransportError::Staging)?;
            let mut remote = self.remote.lock().await;
            remote.retrieve_to(source_absolute, &mut sink).await?;
        }
        {
            let mut source = staging.open().await.map_err(TransportError::Staging)?;
            let mut remote = self.remote.lock().await;
            remote.store_from(dest_absolute, &mut source).await?;
        }
        log::info!("copied {source_absolute} -> {dest_absolute}");
        Ok(())
    }

    /// Synthesized folder copy over an explicit work-stack: create the
    /// destination, list the source, copy files, defer sub-directories
    /// (detected by probing, not by the naming heuristic). Stops on the
    /// first failure; already-copied entries stay.
    pub async fn copy_folder(
        &self,
        source_absolute: &str,
        dest_absolute: &str,
    ) -> Result<(), StorageError> {
        let limit = self.config.copy_max_depth;
        let mut stack = vec![(
            path::clean(source_absolute),
            path::clean(dest_absolute),
            0usize,
        )];
        while let Some((from, to, depth)) = stack.pop() {
            if depth >= limit {
                return Err(StorageError::CopyDepthExceeded(limit));
            }
            self.make_directory(&to).await?;
            let names = self.list_names(&from).await?;
            for raw in &names {
                let name = path::basename(&path::clean(raw)).to_string();
                if name.is_empty() || path::is_dot_segment(&name) {
                    continue;
                }
                let child_from = path::join(&from, &name);
                let child_to = path::join(&to, &name);
                if self.probe_directory(&child_from).await? {
                    stack.push((child_from, child_to, depth + 1));
                } else {
                    self.copy_file(&child_from, &child_to).await?;
                }
            }
        }
        Ok(())
    }

    /// Copy dispatch on the caller's view of the source kind.
    pub async fn copy_item(
        &self,
        source_absolute: &str,
        dest_absolute: &str,
        is_directory: bool,
    ) -> Result<(), StorageError> {
        if is_directory {
            self.copy_folder(source_absolute, dest_absolute).await
        } else {
            self.copy_file(source_absolute, dest_absolute).await
        }
    }

    // ── Downloads ────────────────────────────────────────────────────────────

    /// Stream one file's bytes into `sink`; returns the byte count.
    pub async fn stream_download<W: AsyncWrite + Unpin + Send>(
        &self,
        absolute: &str,
        sink: &mut W,
    ) -> Result<u64, StorageError> {
        let mut remote = self.remote.lock().await;
        Ok(remote.retrieve_to(absolute, sink).await?)
    }

    /// Bounded in-memory download, for metadata probes. Files larger
    /// than `limit` are refused up front.
    pub async fn fetch_bytes(&self, absolute: &str, limit: u64) -> Result<Vec<u8>, StorageError> {
        let size = self.size(absolute).await?;
        if size > limit {
            return Err(StorageError::OperationNotAllowed(format!(
                "file exceeds {limit}-byte probe limit: {absolute}"
            )));
        }
        let mut bytes = Vec::with_capacity(size as usize);
        let mut remote = self.remote.lock().await;
        remote.retrieve_to(absolute, &mut bytes).await?;
        Ok(bytes)
    }

    /// End the transport session. Errors are logged, not surfaced.
    pub async fn close(&self) {
        let mut remote = self.remote.lock().await;
        remote.close().await;
    }
}

impl<R: RemoteFs> DirectoryClassifier for Storage<R> {
    fn classify(&self, absolute_path: &str) -> ItemKind {
        if self.resolver.is_root(absolute_path) {
            return ItemKind::Directory;
        }
        if path::has_extension(absolute_path) {
            ItemKind::File
        } else {
            ItemKind::Directory
        }
    }
}

impl<R: RemoteFs> PermissionSource for Storage<R> {
    async fn triple(&self, absolute_path: &str) -> Result<PermissionTriple, StorageError> {
        self.permission_triple(absolute_path).await
    }
}
