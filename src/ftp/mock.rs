//! In-memory `RemoteFs` for tests.
//!
//! Holds a flat map of directories and file bytes, synthesizes plausible
//! listing lines, records every operation for call-order assertions, and
//! supports targeted failure injection per path.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use chrono::{NaiveDate, NaiveDateTime};
use suppaftp::FtpError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::transport::{RemoteFs, TransportError};
use crate::path;

/// Fixed modification time reported for every file.
pub fn fixed_mtime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 20)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

#[derive(Default)]
pub struct MockRemote {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Raw-listing override per directory; synthesized when absent.
    pub raw: BTreeMap<String, Vec<String>>,
    /// Every transport call, in order, e.g. `"mkdir /srv/files/new"`.
    pub calls: Vec<String>,
    pub fail_name_list: BTreeSet<String>,
    pub fail_raw_list: BTreeSet<String>,
    pub fail_upload: BTreeSet<String>,
    /// When set, NLST returns full paths instead of bare names.
    pub full_path_names: bool,
}

fn injected(op: &'static str, path: &str) -> TransportError {
    TransportError::command(op, path, FtpError::ConnectionError(io::Error::other("injected")))
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&mut self, dir: &str) -> &mut Self {
        self.dirs.insert(path::clean(dir));
        self
    }

    pub fn add_file(&mut self, file: &str, bytes: &[u8]) -> &mut Self {
        self.files.insert(path::clean(file), bytes.to_vec());
        self
    }

    pub fn set_raw(&mut self, dir: &str, lines: &[&str]) -> &mut Self {
        self.raw.insert(
            path::clean(dir),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn mutation_calls(&self) -> Vec<&String> {
        self.calls
            .iter()
            .filter(|c| {
                c.starts_with("mkdir") || c.starts_with("rename") || c.starts_with("stor")
            })
            .collect()
    }

    fn children(&self, dir: &str) -> Vec<String> {
        let dir = path::clean(dir);
        let mut names: Vec<String> = self
            .dirs
            .iter()
            .chain(self.files.keys())
            .filter(|p| *p != &dir && path::dirname(p) == dir)
            .map(|p| path::basename(p).to_string())
            .collect();
        names.sort();
        names
    }

    fn has_dir(&self, dir: &str) -> bool {
        self.dirs.contains(&path::clean(dir))
    }
}

impl RemoteFs for MockRemote {
    async fn list_names(&mut self, dir: &str) -> Result<Vec<String>, TransportError> {
        self.calls.push(format!("nlst {dir}"));
        let dir = path::clean(dir);
        if self.fail_name_list.contains(&dir) || !self.has_dir(&dir) {
            return Err(injected("nlst", &dir));
        }
        let mut names = vec![".".to_string(), "..".to_string()];
        for name in self.children(&dir) {
            if self.full_path_names {
                names.push(path::join(&dir, &name));
            } else {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn raw_list(&mut self, dir: &str) -> Result<Vec<String>, TransportError> {
        self.calls.push(format!("list {dir}"));
        let dir = path::clean(dir);
        if self.fail_raw_list.contains(&dir) || !self.has_dir(&dir) {
            return Err(injected("list", &dir));
        }
        if let Some(lines) = self.raw.get(&dir) {
            return Ok(lines.clone());
        }
        let mut lines = vec!["total 0".to_string()];
        for name in self.children(&dir) {
            let full = path::join(&dir, &name);
            if self.dirs.contains(&full) {
                lines.push(format!("drwxr-xr-x   2 u g     4096 Jan 01 00:00 {name}"));
            } else {
                let len = self.files.get(&full).map_or(0, Vec::len);
                lines.push(format!("-rw-r--r--   1 u g {len:>8} Jan 01 00:00 {name}"));
            }
        }
        Ok(lines)
    }

    async fn make_directory(&mut self, dir: &str) -> Result<(), TransportError> {
        self.calls.push(format!("mkdir {dir}"));
        let dir = path::clean(dir);
        if !self.has_dir(&path::dirname(&dir))
            || self.dirs.contains(&dir)
            || self.files.contains_key(&dir)
        {
            return Err(injected("mkdir", &dir));
        }
        self.dirs.insert(dir);
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        self.calls.push(format!("rename {from} -> {to}"));
        let from = path::clean(from);
        let to = path::clean(to);
        if !self.has_dir(&path::dirname(&to)) {
            return Err(injected("rename", &to));
        }
        if let Some(bytes) = self.files.remove(&from) {
            self.files.insert(to, bytes);
            return Ok(());
        }
        if self.dirs.remove(&from) {
            let prefix = format!("{from}/");
            let moved_dirs: Vec<String> = self
                .dirs
                .iter()
                .filter(|d| d.starts_with(&prefix))
                .cloned()
                .collect();
            for dir in moved_dirs {
                self.dirs.remove(&dir);
                self.dirs.insert(format!("{to}{}", &dir[from.len()..]));
            }
            let moved_files: Vec<String> = self
                .files
                .keys()
                .filter(|f| f.starts_with(&prefix))
                .cloned()
                .collect();
            for file in moved_files {
                if let Some(bytes) = self.files.remove(&file) {
                    self.files.insert(format!("{to}{}", &file[from.len()..]), bytes);
                }
            }
            self.dirs.insert(to);
            return Ok(());
        }
        Err(injected("rename", &from))
    }

    async fn size(&mut self, file: &str) -> Result<u64, TransportError> {
        self.calls.push(format!("size {file}"));
        let file = path::clean(file);
        self.files
            .get(&file)
            .map(|b| b.len() as u64)
            .ok_or_else(|| injected("size", &file))
    }

    async fn modify_time(&mut self, file: &str) -> Result<NaiveDateTime, TransportError> {
        self.calls.push(format!("mdtm {file}"));
        let file = path::clean(file);
        if self.files.contains_key(&file) {
            Ok(fixed_mtime())
        } else {
            Err(injected("mdtm", &file))
        }
    }

    async fn probe_directory(&mut self, dir: &str) -> Result<bool, TransportError> {
        self.calls.push(format!("cwd {dir}"));
        Ok(self.has_dir(dir))
    }

    async fn retrieve_to<W: AsyncWrite + Unpin + Send>(
        &mut self,
        file: &str,
        sink: &mut W,
    ) -> Result<u64, TransportError> {
        self.calls.push(format!("retr {file}"));
        let file = path::clean(file);
        let bytes = self
            .files
            .get(&file)
            .cloned()
            .ok_or_else(|| injected("retr", &file))?;
        sink.write_all(&bytes).await?;
        sink.flush().await?;
        Ok(bytes.len() as u64)
    }

    async fn store_from<R: AsyncRead + Unpin + Send>(
        &mut self,
        file: &str,
        source: &mut R,
    ) -> Result<u64, TransportError> {
        self.calls.push(format!("stor {file}"));
        let file = path::clean(file);
        if self.fail_upload.contains(&file) || !self.has_dir(&path::dirname(&file)) {
            return Err(injected("stor", &file));
        }
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes).await?;
        let written = bytes.len() as u64;
        self.files.insert(file, bytes);
        Ok(written)
    }

    async fn close(&mut self) {
        self.calls.push("quit".to_string());
    }
}
