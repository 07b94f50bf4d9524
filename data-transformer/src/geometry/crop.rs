use super::PixelWindow;
use crate::{common::*, sample::PixelGrid};

/// Keep the pixels inside the window.
pub fn crop(grid: &PixelGrid, window: &PixelWindow) -> Result<PixelGrid> {
    ensure_kind!(
        window.height > 0 && window.width > 0,
        InvalidArgument,
        "the crop window must not be empty"
    );
    ensure_kind!(
        window.fits_in(grid.height(), grid.width()),
        OutOfRange,
        "crop window {:?} exceeds the {}x{} image",
        window,
        grid.height(),
        grid.width()
    );

    let data = grid
        .data()
        .slice(s![window.top..window.bottom(), window.left..window.right(), ..])
        .to_owned();
    Ok(PixelGrid::from_parts(data, grid.kind()))
}
