use crate::errors::CaptureError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Shrink a still so its longest side is at most `max_dim`, re-encoding as
/// JPEG at `quality`. Stills already within bounds pass through untouched.
///
/// Downscaled stills have their EXIF orientation applied first, since the
/// re-encoded JPEG carries no EXIF.
pub fn prepare_still(still: &[u8], max_dim: u32, quality: u8) -> Result<Bytes, CaptureError> {
    let mut decoder = ImageReader::new(Cursor::new(still))
        .with_guessed_format()
        .map_err(|e| CaptureError::ImageError(format!("Failed to sniff still format: {}", e)))?
        .into_decoder()?;
    let (width, height) = decoder.dimensions();

    if width.max(height) <= max_dim {
        return Ok(Bytes::copy_from_slice(still));
    }

    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    let resized = image.resize(max_dim, max_dim, FilterType::Lanczos3).to_rgb8();

    let mut out = Vec::with_capacity(still.len() / 4);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode_image(&resized)?;

    log::debug!(
        "Downscaled still {}x{} -> {}x{} ({} -> {} bytes)",
        width,
        height,
        resized.width(),
        resized.height(),
        still.len(),
        out.len()
    );
    Ok(Bytes::from(out))
}
