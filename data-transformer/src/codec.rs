//! Adapters between encoded images and pixel grids.

use crate::{common::*, sample::PixelGrid};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Decode an encoded image.
///
/// Grayscale images produce one channel, images with color and alpha four,
/// and everything else three.
pub fn decode(bytes: &[u8]) -> Result<PixelGrid> {
    let image = image::load_from_memory(bytes)?;
    let (height, width) = (image.height() as usize, image.width() as usize);
    let (channels, raw) = match image.color().channel_count() {
        1 | 2 => (1, image.into_luma8().into_raw()),
        4 => (4, image.into_rgba8().into_raw()),
        _ => (3, image.into_rgb8().into_raw()),
    };
    PixelGrid::from_u8(height, width, channels, &raw)
}

/// Encode a grid with 1, 3 or 4 channels. Values are rounded and saturated
/// to the 8-bit range.
pub fn encode(grid: &PixelGrid, format: ImageFormat) -> Result<Vec<u8>> {
    let (height, width) = (grid.height() as u32, grid.width() as u32);
    let raw: Vec<u8> = grid
        .data()
        .iter()
        .map(|&val| val.round().clamp(0.0, 255.0) as u8)
        .collect();

    let invalid = || {
        Error::InvalidArgument(format!(
            "cannot encode a {}x{}x{} image",
            height,
            width,
            grid.channels()
        ))
    };
    let image = match grid.channels() {
        1 => DynamicImage::ImageLuma8(
            GrayImage::from_raw(width, height, raw).ok_or_else(invalid)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw).ok_or_else(invalid)?),
        4 => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, raw).ok_or_else(invalid)?,
        ),
        _ => return Err(invalid()),
    };

    let mut bytes = vec![];
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(bytes)
}
