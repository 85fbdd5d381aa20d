//! Image detection and dimension probing for listing metadata.
//!
//! Whether a path counts as an image is a pure extension check against
//! the configured set. Dimensions require the actual bytes, so probing
//! downloads the file (bounded) and sniffs the format from content —
//! the extension is not trusted for decoding.

use std::io::Cursor;

use image::ImageReader;

use crate::config::ImagesConfig;
use crate::ftp::transport::RemoteFs;
use crate::path;
use crate::storage::Storage;

/// Upper bound on bytes downloaded for a dimension probe.
pub const PROBE_BYTE_LIMIT: u64 = 16 * 1024 * 1024;

pub fn is_image_path(config: &ImagesConfig, path_str: &str) -> bool {
    match path::extension(path_str) {
        Some(ext) => config
            .extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Width and height of an in-memory image, or `None` when the bytes do
/// not decode as any supported format.
pub fn decode_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Probe a remote file's pixel dimensions. Any failure — oversized
/// file, transport error, undecodable bytes — degrades to `(0, 0)` so
/// the listing still renders.
pub async fn probe_dimensions<R: RemoteFs>(storage: &Storage<R>, absolute: &str) -> (u32, u32) {
    let bytes = match storage.fetch_bytes(absolute, PROBE_BYTE_LIMIT).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::debug!("dimension probe skipped for {absolute}: {err}");
            return (0, 0);
        }
    };
    match decode_dimensions(&bytes) {
        Some(dims) => dims,
        None => {
            log::debug!("bytes at {absolute} did not decode as an image");
            (0, 0)
        }
    }
}

/// Conventional thumbnail location: the item's relative path mirrored
/// underneath the thumbnail directory.
pub fn thumbnail_path(config: &ImagesConfig, relative: &str) -> String {
    path::clean(&format!("/{}{}", config.thumbnail_dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ftp::mock::MockRemote;

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        let canvas = image::RgbaImage::new(width, height);
        let mut buf = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn extension_check_ignores_case() {
        let config = ImagesConfig::default();
        assert!(is_image_path(&config, "/photos/cat.jpg"));
        assert!(is_image_path(&config, "/photos/CAT.JPG"));
        assert!(is_image_path(&config, "/photos/scan.WebP"));
        assert!(!is_image_path(&config, "/photos/notes.txt"));
        assert!(!is_image_path(&config, "/photos/album"));
    }

    #[test]
    fn dimensions_come_from_bytes_not_names() {
        let png = encoded_png(7, 3);
        assert_eq!(decode_dimensions(&png), Some((7, 3)));
        assert_eq!(decode_dimensions(b"definitely not an image"), None);
        assert_eq!(decode_dimensions(&[]), None);
    }

    #[test]
    fn thumbnail_mirrors_the_relative_path() {
        let config = ImagesConfig::default();
        assert_eq!(
            thumbnail_path(&config, "/photos/cat.jpg"),
            "/_thumbs/photos/cat.jpg"
        );
        assert_eq!(thumbnail_path(&config, "/cat.jpg"), "/_thumbs/cat.jpg");
    }

    #[tokio::test]
    async fn probe_decodes_remote_bytes() {
        let mut config = Config::default();
        config.root = "/srv/files".to_string();
        let mut mock = MockRemote::new();
        mock.add_dir("/srv/files");
        mock.add_file("/srv/files/cat.png", &encoded_png(5, 4));
        let storage = Storage::new(config, mock);
        assert_eq!(probe_dimensions(&storage, "/srv/files/cat.png").await, (5, 4));
    }

    #[tokio::test]
    async fn probe_degrades_to_zero_on_failure() {
        let mut config = Config::default();
        config.root = "/srv/files".to_string();
        let mut mock = MockRemote::new();
        mock.add_dir("/srv/files");
        mock.add_file("/srv/files/junk.png", b"not a png");
        let storage = Storage::new(config, mock);
        assert_eq!(probe_dimensions(&storage, "/srv/files/junk.png").await, (0, 0));
        assert_eq!(probe_dimensions(&storage, "/srv/files/missing.png").await, (0, 0));
    }
}
