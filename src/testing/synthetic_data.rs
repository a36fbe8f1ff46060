//! Synthetic sensor and camera data
//!
//! Motion patterns mirror what a handheld phone reports over a sample card:
//! flat and still, tilted, or shaking.

use crate::types::MotionSample;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

/// Phone lying flat and still over the card
pub fn level_samples(count: usize) -> Vec<MotionSample> {
    vec![MotionSample::level(); count]
}

/// Hand shake: alternates between two readings `2 * amplitude * sqrt(2)` apart
pub fn shaking_samples(count: usize, amplitude: f32) -> Vec<MotionSample> {
    (0..count)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            MotionSample::new(sign * amplitude, sign * amplitude, 1.0)
        })
        .collect()
}

/// Still device tilted about the x axis
pub fn tilted_sample(degrees: f32) -> MotionSample {
    let rad = degrees.to_radians();
    MotionSample::new(0.0, rad.sin(), rad.cos())
}

/// White card with a solid black square in each corner, JPEG encoded
pub fn synthetic_card_still(width: u32, height: u32) -> Bytes {
    let marker = (width.min(height) / 12).max(2);
    let inset = marker / 2;
    let in_marker = |v: u32, extent: u32| {
        (inset..inset + marker).contains(&v)
            || (extent.saturating_sub(inset + marker)..extent.saturating_sub(inset)).contains(&v)
    };

    let img = ImageBuffer::from_fn(width, height, |x, y| {
        if in_marker(x, width) && in_marker(y, height) {
            Rgb([10u8, 10, 10])
        } else {
            Rgb([235u8, 235, 230])
        }
    });

    let mut out = Vec::new();
    if let Err(e) = JpegEncoder::new_with_quality(&mut out, 85).encode_image(&img) {
        log::error!("Failed to encode synthetic still: {}", e);
    }
    Bytes::from(out)
}
