use crate::{common::*, sample::PixelGrid};

/// Flip the grid along the width axis.
pub fn mirror(grid: &PixelGrid) -> PixelGrid {
    let data = grid.data().slice(s![.., ..;-1, ..]).to_owned();
    PixelGrid::from_parts(data, grid.kind())
}
