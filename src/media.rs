//! Image staging for uploads: copy the picked file into the cache directory under a
//! fresh name whose extension matches its content type.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::data::ImageSource;
use crate::error::{CatalogError, CatalogResult};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_NAME_ATTEMPTS: usize = 16;

/// A copy of the user's image, ready to be attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
}

/// Copy `source` into `cache_dir` as `<millis>_<0..1000>.<ext>`.
#[instrument(skip(source, cache_dir), fields(source = %source.path.display()))]
pub async fn stage_image(source: &ImageSource, cache_dir: &Path) -> CatalogResult<StagedImage> {
    let bytes = tokio::fs::read(&source.path)
        .await
        .map_err(|e| CatalogError::Image(format!("read {}: {e}", source.path.display())))?;

    let content_type = resolve_content_type(source, &bytes);
    let ext = extension_for_content_type(&content_type);

    tokio::fs::create_dir_all(cache_dir)
        .await
        .map_err(|e| CatalogError::Image(format!("create {}: {e}", cache_dir.display())))?;
    let (path, file_name) = write_unique(cache_dir, &bytes, || {
        let stamp = Utc::now().timestamp_millis();
        let salt: u32 = rand::thread_rng().gen_range(0..1000);
        format!("{stamp}_{salt}.{ext}")
    })
    .await?;

    debug!(file = %path.display(), %content_type, size = bytes.len(), "staged image");
    Ok(StagedImage {
        path,
        file_name,
        content_type,
    })
}

/// Create a file under a name from `next_name` that nothing else holds yet.
/// Concurrent stagings in the same millisecond can draw the same name.
async fn write_unique(
    dir: &Path,
    bytes: &[u8],
    mut next_name: impl FnMut() -> String,
) -> CatalogResult<(PathBuf, String)> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let file_name = next_name();
        let path = dir.join(&file_name);
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(file = %path.display(), "staged name taken, drawing another");
                continue;
            }
            Err(e) => {
                return Err(CatalogError::Image(format!("create {}: {e}", path.display())))
            }
        };
        file.write_all(bytes)
            .await
            .map_err(|e| CatalogError::Image(format!("write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| CatalogError::Image(format!("write {}: {e}", path.display())))?;
        return Ok((path, file_name));
    }
    Err(CatalogError::Image(format!(
        "no free staging name in {} after {MAX_NAME_ATTEMPTS} attempts",
        dir.display()
    )))
}

/// Reported type first, then magic bytes, then the source path's extension.
fn resolve_content_type(source: &ImageSource, bytes: &[u8]) -> String {
    if let Some(reported) = source
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return reported.to_ascii_lowercase();
    }
    sniff_content_type(bytes)
        .or_else(|| {
            source
                .path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(content_type_for_extension)
        })
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// File extension for a MIME type; parameters such as `; charset=` are ignored.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/heic" => "heic",
        _ => "bin",
    }
}
