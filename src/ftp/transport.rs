//! Remote filesystem transport over FTP.
//!
//! `RemoteFs` is the narrow operation set the storage layer consumes;
//! `FtpTransport` implements it over a lazily connected suppaftp stream.
//! Every operation takes absolute server paths — nothing here depends on
//! working-directory state left behind by an earlier call.

use chrono::NaiveDateTime;
use suppaftp::tokio::AsyncFtpStream;
use suppaftp::types::FileType;
use suppaftp::{FtpError, Mode};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::ConnectionConfig;

/// Transfer buffer size for streamed downloads.
const TRANSFER_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("connect to {addr} failed: {source}")]
    Connect { addr: String, source: FtpError },

    #[error("login as {username} failed: {source}")]
    Login { username: String, source: FtpError },

    #[error("{op} {path} failed: {source}")]
    Command {
        op: &'static str,
        path: String,
        source: FtpError,
    },

    #[error("staging i/o: {0}")]
    Staging(#[from] std::io::Error),
}

impl TransportError {
    pub(crate) fn command(op: &'static str, path: &str, source: FtpError) -> Self {
        TransportError::Command {
            op,
            path: path.to_string(),
            source,
        }
    }
}

/// The primitive calls the virtual filesystem is built from.
///
/// Implementations report transport-level faults only; path semantics
/// (existence, permissions, policy) live above this seam.
#[allow(async_fn_in_trait)]
pub trait RemoteFs {
    /// Flat name listing (NLST). May include `.`/`..` and may return
    /// either bare names or full paths depending on the server.
    async fn list_names(&mut self, dir: &str) -> Result<Vec<String>, TransportError>;

    /// Long-format listing lines (LIST), used for permission inference.
    async fn raw_list(&mut self, dir: &str) -> Result<Vec<String>, TransportError>;

    async fn make_directory(&mut self, path: &str) -> Result<(), TransportError>;

    /// Rename with explicit absolute from/to paths (RNFR/RNTO).
    async fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError>;

    async fn size(&mut self, path: &str) -> Result<u64, TransportError>;

    async fn modify_time(&mut self, path: &str) -> Result<NaiveDateTime, TransportError>;

    /// Whether `path` can be entered (CWD probe). `false` means the
    /// server refused the change, i.e. not a directory.
    async fn probe_directory(&mut self, path: &str) -> Result<bool, TransportError>;

    /// Stream one file's bytes into `sink`; returns the byte count.
    async fn retrieve_to<W: AsyncWrite + Unpin + Send>(
        &mut self,
        path: &str,
        sink: &mut W,
    ) -> Result<u64, TransportError>;

    /// Upload bytes from `source` to `path`; returns the byte count.
    async fn store_from<R: AsyncRead + Unpin + Send>(
        &mut self,
        path: &str,
        source: &mut R,
    ) -> Result<u64, TransportError>;

    /// Best-effort session teardown.
    async fn close(&mut self);
}

// ── suppaftp implementation ──────────────────────────────────────────────────

/// Lazily connected FTP session. The first operation dials and logs in;
/// the session is then reused until `close`.
pub struct FtpTransport {
    config: ConnectionConfig,
    stream: Option<AsyncFtpStream>,
}

impl FtpTransport {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(config: &ConnectionConfig) -> Result<AsyncFtpStream, TransportError> {
        let addr = config.addr();
        let mut stream = tokio::time::timeout(config.timeout(), AsyncFtpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout { addr: addr.clone() })?
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream.set_mode(Mode::Passive);
        tokio::time::timeout(
            config.timeout(),
            stream.login(&config.username, &config.password),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout { addr: addr.clone() })?
        .map_err(|source| TransportError::Login {
            username: config.username.clone(),
            source,
        })?;
        stream
            .transfer_type(FileType::Binary)
            .await
            .map_err(|source| TransportError::command("transfer-type", &addr, source))?;
        log::info!("connected to {} as {}", addr, config.username);
        Ok(stream)
    }

    /// Connect on first use, then hand out the live stream.
    async fn stream_mut(&mut self) -> Result<&mut AsyncFtpStream, TransportError> {
        if self.stream.is_none() {
            let stream = Self::connect(&self.config).await?;
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl RemoteFs for FtpTransport {
    async fn list_names(&mut self, dir: &str) -> Result<Vec<String>, TransportError> {
        let stream = self.stream_mut().await?;
        stream
            .nlst(Some(dir))
            .await
            .map_err(|source| TransportError::command("nlst", dir, source))
    }

    async fn raw_list(&mut self, dir: &str) -> Result<Vec<String>, TransportError> {
        let stream = self.stream_mut().await?;
        stream
            .list(Some(dir))
            .await
            .map_err(|source| TransportError::command("list", dir, source))
    }

    async fn make_directory(&mut self, path: &str) -> Result<(), TransportError> {
        let stream = self.stream_mut().await?;
        stream
            .mkdir(path)
            .await
            .map_err(|source| TransportError::command("mkdir", path, source))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        let stream = self.stream_mut().await?;
        stream
            .rename(from, to)
            .await
            .map_err(|source| TransportError::command("rename", from, source))
    }

    async fn size(&mut self, path: &str) -> Result<u64, TransportError> {
        let stream = self.stream_mut().await?;
        let size = stream
            .size(path)
            .await
            .map_err(|source| TransportError::command("size", path, source))?;
        Ok(size as u64)
    }

    async fn modify_time(&mut self, path: &str) -> Result<NaiveDateTime, TransportError> {
        let stream = self.stream_mut().await?;
        stream
            .mdtm(path)
            .await
            .map_err(|source| TransportError::command("mdtm", path, source))
    }

    async fn probe_directory(&mut self, path: &str) -> Result<bool, TransportError> {
        let stream = self.stream_mut().await?;
        match stream.cwd(path).await {
            Ok(()) => Ok(true),
            Err(FtpError::UnexpectedResponse(_)) => Ok(false),
            Err(source) => Err(TransportError::command("cwd", path, source)),
        }
    }

    async fn retrieve_to<W: AsyncWrite + Unpin + Send>(
        &mut self,
        path: &str,
        sink: &mut W,
    ) -> Result<u64, TransportError> {
        let stream = self.stream_mut().await?;
        let mut data = stream
            .retr_as_stream(path)
            .await
            .map_err(|source| TransportError::command("retr", path, source))?;

        let mut chunk = [0u8; TRANSFER_CHUNK];
        let mut transferred: u64 = 0;
        loop {
            let n = data.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&chunk[..n]).await?;
            transferred += n as u64;
        }
        sink.flush().await?;

        // The control connection is borrowed again only after the data
        // loop is done with it.
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .finalize_retr_stream(data)
            .await
            .map_err(|source| TransportError::command("retr", path, source))?;
        log::debug!("downloaded {path} ({transferred} bytes)");
        Ok(transferred)
    }

    async fn store_from<R: AsyncRead + Unpin + Send>(
        &mut self,
        path: &str,
        source: &mut R,
    ) -> Result<u64, TransportError> {
        let stream = self.stream_mut().await?;
        let written = stream
            .put_file(path, source)
            .await
            .map_err(|source| TransportError::command("stor", path, source))?;
        log::debug!("uploaded {path} ({written} bytes)");
        Ok(written)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.quit().await {
                log::debug!("quit failed: {err}");
            }
        }
    }
}
