//! Input resolution: validate a path or an upload and expose a local file.
//!
//! Uploads are written to a [`NamedTempFile`] so the rest of the pipeline
//! only ever deals with paths. The temp file lives inside
//! [`ResolvedInput::Uploaded`] and is deleted when that value is dropped,
//! on success, on error and on panic alike. Every input is size-checked and
//! its signature sniffed before any decoder sees it, so callers get
//! `MalformedInput` / `InputTooLarge` rather than a decoder error.

use crate::error::RedactError;
use image::ImageFormat;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Bytes read from the head of a file when sniffing its format.
const SNIFF_LEN: usize = 64;

/// A validated image on local disk.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Caller-supplied path.
    Local { path: PathBuf, format: ImageFormat },
    /// In-memory upload spilled to a temp file that is removed on drop.
    Uploaded {
        path: PathBuf,
        format: ImageFormat,
        _temp_file: NamedTempFile,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Uploaded { path, .. } => path,
        }
    }

    /// Container format detected from the file signature.
    pub fn format(&self) -> ImageFormat {
        match self {
            ResolvedInput::Local { format, .. } | ResolvedInput::Uploaded { format, .. } => {
                *format
            }
        }
    }
}

/// Validate a local image path.
pub fn resolve_input(path: impl AsRef<Path>, max_bytes: u64) -> Result<ResolvedInput, RedactError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(RedactError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RedactError::PermissionDenied { path });
        }
        Err(_) => return Err(RedactError::FileNotFound { path }),
    };

    let size = file
        .metadata()
        .map_err(|e| RedactError::Internal(format!("stat {}: {e}", path.display())))?
        .len();
    check_size(&path.display().to_string(), size, max_bytes)?;

    let mut head = Vec::with_capacity(SNIFF_LEN);
    Read::by_ref(&mut file)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| RedactError::Internal(format!("read {}: {e}", path.display())))?;
    let format = sniff_format(&path.display().to_string(), &head)?;

    debug!("Resolved local image: {} ({:?}, {} bytes)", path.display(), format, size);
    Ok(ResolvedInput::Local { path, format })
}

/// Validate uploaded bytes and spill them to a temp file.
///
/// `content_type`, when present, must be an `image/*` MIME type. The
/// declared type is advisory only; the signature decides the format.
pub fn resolve_upload(
    bytes: &[u8],
    content_type: Option<&str>,
    max_bytes: u64,
) -> Result<ResolvedInput, RedactError> {
    const LABEL: &str = "<upload>";

    if let Some(ct) = content_type {
        if !ct.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(RedactError::MalformedInput {
                input: LABEL.into(),
                reason: format!("content type '{ct}' is not an image"),
            });
        }
    }
    check_size(LABEL, bytes.len() as u64, max_bytes)?;
    let format = sniff_format(LABEL, bytes)?;

    let suffix = format!(".{}", format.extensions_str().first().copied().unwrap_or("img"));
    let mut tmp = tempfile::Builder::new()
        .prefix("piiredact-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| RedactError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| RedactError::Internal(format!("tempfile write: {e}")))?;

    let path = tmp.path().to_path_buf();
    debug!("Upload spilled to {} ({:?}, {} bytes)", path.display(), format, bytes.len());
    Ok(ResolvedInput::Uploaded {
        path,
        format,
        _temp_file: tmp,
    })
}

/// Default artifact path: `<dir>/<stem>_masked.<ext>` next to the input.
pub fn masked_path(input: &Path, format: ImageFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .or_else(|| format.extensions_str().first().map(|e| e.to_string()))
        .unwrap_or_else(|| "img".to_string());
    input.with_file_name(format!("{stem}_masked.{ext}"))
}

fn check_size(input: &str, size: u64, limit: u64) -> Result<(), RedactError> {
    if size > limit {
        return Err(RedactError::InputTooLarge {
            input: input.to_string(),
            size,
            limit,
        });
    }
    if size == 0 {
        return Err(RedactError::MalformedInput {
            input: input.to_string(),
            reason: "file is empty".into(),
        });
    }
    Ok(())
}

fn sniff_format(input: &str, head: &[u8]) -> Result<ImageFormat, RedactError> {
    let format = image::guess_format(head).map_err(|_| RedactError::MalformedInput {
        input: input.to_string(),
        reason: "not a recognised image signature".into(),
    })?;
    if !format.reading_enabled() {
        return Err(RedactError::MalformedInput {
            input: input.to_string(),
            reason: format!("{format:?} images are not supported"),
        });
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.png", 1 << 20).unwrap_err();
        assert!(matches!(err, RedactError::FileNotFound { .. }));
    }

    #[test]
    fn local_png_resolves_with_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let resolved = resolve_input(&path, 1 << 20).unwrap();
        assert_eq!(resolved.path(), path);
        assert_eq!(resolved.format(), ImageFormat::Png);
    }

    #[test]
    fn text_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"just some text pretending").unwrap();
        let err = resolve_input(&path, 1 << 20).unwrap_err();
        assert!(matches!(err, RedactError::MalformedInput { .. }), "{err:?}");
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let err = resolve_input(&path, 10).unwrap_err();
        assert!(matches!(err, RedactError::InputTooLarge { limit: 10, .. }));
    }

    #[test]
    fn upload_requires_image_content_type() {
        let err = resolve_upload(&png_bytes(), Some("application/pdf"), 1 << 20).unwrap_err();
        assert!(matches!(err, RedactError::MalformedInput { .. }));
        assert!(resolve_upload(&png_bytes(), Some("image/png"), 1 << 20).is_ok());
        assert!(resolve_upload(&png_bytes(), None, 1 << 20).is_ok());
    }

    #[test]
    fn upload_temp_file_is_removed_on_drop() {
        let resolved = resolve_upload(&png_bytes(), Some("image/png"), 1 << 20).unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn empty_upload_is_malformed() {
        let err = resolve_upload(&[], None, 1 << 20).unwrap_err();
        assert!(matches!(err, RedactError::MalformedInput { .. }));
    }

    #[test]
    fn masked_path_keeps_directory_and_extension() {
        assert_eq!(
            masked_path(Path::new("/data/aadhaar front.jpeg"), ImageFormat::Jpeg),
            PathBuf::from("/data/aadhaar front_masked.jpeg")
        );
        assert_eq!(
            masked_path(Path::new("scan"), ImageFormat::Png),
            PathBuf::from("scan_masked.png")
        );
    }
}
