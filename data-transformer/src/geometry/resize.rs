use super::{paste, PixelWindow};
use crate::{common::*, sample::PixelGrid};

/// The sampling used when the grid is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

/// How a fixed-size resize treats the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Stretch to the target size.
    #[derivative(Default)]
    Warp,
    /// Keep the aspect ratio and pad the margins.
    Letterbox,
}

/// Resize the grid with pixel-center alignment.
pub fn resize(
    grid: &PixelGrid,
    height: usize,
    width: usize,
    interpolation: Interpolation,
) -> Result<PixelGrid> {
    ensure_kind!(
        height > 0 && width > 0,
        InvalidArgument,
        "cannot resize to {}x{}",
        height,
        width
    );
    if grid.height() == height && grid.width() == width {
        return Ok(grid.clone());
    }

    let src = grid.data();
    let channels = grid.channels();

    let data = match interpolation {
        Interpolation::Nearest => {
            let rows = nearest_taps(grid.height(), height);
            let cols = nearest_taps(grid.width(), width);
            Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
                src[[rows[y], cols[x], c]]
            })
        }
        Interpolation::Bilinear => {
            let rows = linear_taps(grid.height(), height);
            let cols = linear_taps(grid.width(), width);
            Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
                let (y0, y1, fy) = rows[y];
                let (x0, x1, fx) = cols[x];
                let top = src[[y0, x0, c]] * (1.0 - fx) + src[[y0, x1, c]] * fx;
                let bottom = src[[y1, x0, c]] * (1.0 - fx) + src[[y1, x1, c]] * fx;
                top * (1.0 - fy) + bottom * fy
            })
        }
    };

    Ok(PixelGrid::from_parts(data, grid.kind()))
}

/// Resize into the target keeping the aspect ratio, centering the result
/// and filling the margins.
///
/// Returns the grid and the window the resized content occupies.
pub fn letterbox(
    grid: &PixelGrid,
    height: usize,
    width: usize,
    interpolation: Interpolation,
    fill: &[f32],
) -> Result<(PixelGrid, PixelWindow)> {
    let window = letterbox_window(grid.height(), grid.width(), height, width)?;
    let resized = resize(grid, window.height, window.width, interpolation)?;
    let output = paste(&resized, [height, width], &window, fill)?;
    Ok((output, window))
}

/// The placement of a letterboxed source inside the target.
pub fn letterbox_window(
    src_h: usize,
    src_w: usize,
    tgt_h: usize,
    tgt_w: usize,
) -> Result<PixelWindow> {
    ensure_kind!(
        src_h > 0 && src_w > 0 && tgt_h > 0 && tgt_w > 0,
        InvalidArgument,
        "cannot letterbox {}x{} into {}x{}",
        src_h,
        src_w,
        tgt_h,
        tgt_w
    );
    let to_hw = |h: usize, w: usize| HW::try_from_hw([r64(h as f64), r64(w as f64)]);
    let src_size = to_hw(src_h, src_w).map_err(|err| Error::InvalidArgument(err.to_string()))?;
    let tgt_size = to_hw(tgt_h, tgt_w).map_err(|err| Error::InvalidArgument(err.to_string()))?;
    let transform = Transform::from_sizes_letterbox(&src_size, &tgt_size);

    let scaled = |scale: R64, size: usize, bound: usize| {
        ((scale.raw() * size as f64).round() as usize).clamp(1, bound)
    };
    let new_h = scaled(transform.sy, src_h, tgt_h);
    let new_w = scaled(transform.sx, src_w, tgt_w);

    Ok(PixelWindow::new(
        (tgt_h - new_h) / 2,
        (tgt_w - new_w) / 2,
        new_h,
        new_w,
    ))
}

fn nearest_taps(src: usize, dst: usize) -> Vec<usize> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|index| {
            let pos = ((index as f64 + 0.5) * scale).floor() as usize;
            pos.min(src - 1)
        })
        .collect()
}

fn linear_taps(src: usize, dst: usize) -> Vec<(usize, usize, f32)> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|index| {
            let pos = ((index as f64 + 0.5) * scale - 0.5).max(0.0);
            let lo = (pos.floor() as usize).min(src - 1);
            let hi = (lo + 1).min(src - 1);
            let frac = if hi == lo { 0.0 } else { (pos - lo as f64) as f32 };
            (lo, hi, frac)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::ElementKind;
    use approx::assert_abs_diff_eq;

    #[test]
    fn resize_constant_grid_stays_constant() -> Result<()> {
        let grid = PixelGrid::filled(7, 5, &[3.0, 9.0], ElementKind::U8)?;
        let resized = resize(&grid, 4, 11, Interpolation::Bilinear)?;
        assert_eq!(resized.descriptor().height, 4);
        assert_eq!(resized.descriptor().width, 11);
        resized
            .data()
            .slice(s![.., .., 1])
            .iter()
            .for_each(|&val| assert_abs_diff_eq!(val, 9.0, epsilon = 1e-5));
        Ok(())
    }

    #[test]
    fn resize_upsamples_between_neighbors() -> Result<()> {
        let grid = PixelGrid::from_u8(1, 2, 1, &[0, 100])?;
        let resized = resize(&grid, 1, 4, Interpolation::Bilinear)?;
        let values: Vec<_> = resized.data().iter().copied().collect();
        assert_abs_diff_eq!(values[0], 0.0);
        assert_abs_diff_eq!(values[1], 25.0, epsilon = 1e-4);
        assert_abs_diff_eq!(values[2], 75.0, epsilon = 1e-4);
        assert_abs_diff_eq!(values[3], 100.0);
        Ok(())
    }

    #[test]
    fn resize_nearest_keeps_values() -> Result<()> {
        let grid = PixelGrid::from_u8(2, 2, 1, &[1, 2, 3, 4])?;
        let resized = resize(&grid, 4, 4, Interpolation::Nearest)?;
        assert!(resized
            .data()
            .iter()
            .all(|val| [1.0, 2.0, 3.0, 4.0].contains(val)));
        assert_eq!(resized.data()[[3, 0, 0]], 3.0);
        Ok(())
    }

    #[test]
    fn letterbox_centers_content() -> Result<()> {
        assert_eq!(letterbox_window(80, 80, 20, 40)?, PixelWindow::new(0, 10, 20, 20));

        let grid = PixelGrid::filled(80, 80, &[200.0], ElementKind::U8)?;
        let (output, window) = letterbox(&grid, 20, 40, Interpolation::Bilinear, &[0.0])?;
        assert_eq!(window, PixelWindow::new(0, 10, 20, 20));
        assert_eq!(output.data()[[10, 5, 0]], 0.0);
        assert_abs_diff_eq!(output.data()[[10, 20, 0]], 200.0, epsilon = 1e-4);
        Ok(())
    }
}
