//! Raster codec: bytes ⇄ `DynamicImage`, keeping the container format.
//!
//! The redacted artifact is written in the same encoding the caller sent
//! (JPEG in, JPEG out; PNG in, PNG out) so downstream consumers never have
//! to negotiate formats. JPEG output uses quality 95: redaction boxes are
//! flat colour and survive any quality, but the surrounding document should
//! not pick up a second generation of visible artefacts.

use crate::error::RedactError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const JPEG_QUALITY: u8 = 95;

/// Decode raw bytes whose format was already sniffed by input resolution.
///
/// `source` is only used to label errors.
pub fn decode_image(bytes: &[u8], format: ImageFormat, source: &Path) -> Result<DynamicImage, RedactError> {
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| RedactError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;
    debug!(
        "Decoded {} as {:?} {}x{} ({:?})",
        source.display(),
        format,
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}

/// Encode `img` in `format`.
///
/// `dest` labels errors; nothing is written to disk here.
pub fn encode_image(img: &DynamicImage, format: ImageFormat, dest: &Path) -> Result<Vec<u8>, RedactError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            jpeg_compatible(img).write_with_encoder(encoder)
        }
        other => img.write_to(&mut Cursor::new(&mut buf), other),
    };
    result.map_err(|e| RedactError::Encode {
        path: dest.to_path_buf(),
        source: e,
    })?;
    debug!("Encoded {} → {} bytes ({:?})", dest.display(), buf.len(), format);
    Ok(buf)
}

/// JPEG carries 8-bit luma or RGB only; anything else is flattened.
fn jpeg_compatible(img: &DynamicImage) -> std::borrow::Cow<'_, DynamicImage> {
    use image::ColorType;
    use std::borrow::Cow;

    match img.color() {
        ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(img),
        ColorType::L16 | ColorType::La8 | ColorType::La16 => {
            Cow::Owned(DynamicImage::ImageLuma8(img.to_luma8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}
