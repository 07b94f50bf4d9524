use super::PixelWindow;
use crate::{
    common::*,
    sample::{NormalizedBox, PixelGrid},
};

/// The result of placing an image on a larger canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub grid: PixelGrid,
    /// Where the source landed, in canvas pixels.
    pub window: PixelWindow,
}

impl Expansion {
    /// Where the source landed, normalized by the canvas size.
    pub fn placement(&self) -> NormalizedBox {
        self.window
            .to_normalized(self.grid.height(), self.grid.width())
    }
}

/// Place the grid onto a canvas `ratio` times its size.
///
/// `anchor` holds the relative vertical and horizontal position of the
/// source within the free margin, each in `[0, 1]`.
pub fn expand(grid: &PixelGrid, ratio: f32, fill: &[f32], anchor: [f32; 2]) -> Result<Expansion> {
    ensure_kind!(
        ratio.is_finite() && ratio >= 1.0,
        InvalidArgument,
        "expansion ratio must be at least 1, but get {}",
        ratio
    );
    let [anchor_y, anchor_x] = anchor;
    ensure_kind!(
        (0.0..=1.0).contains(&anchor_y) && (0.0..=1.0).contains(&anchor_x),
        InvalidArgument,
        "anchor {:?} is outside the unit range",
        anchor
    );

    let (height, width) = (grid.height(), grid.width());
    let [canvas_h, canvas_w] = canvas_size(height, width, ratio);
    let top = ((anchor_y * (canvas_h - height) as f32).floor() as usize).min(canvas_h - height);
    let left = ((anchor_x * (canvas_w - width) as f32).floor() as usize).min(canvas_w - width);
    let window = PixelWindow::new(top, left, height, width);

    let grid = paste(grid, [canvas_h, canvas_w], &window, fill)?;
    Ok(Expansion { grid, window })
}

/// The canvas an image of the given size is expanded onto.
pub fn canvas_size(height: usize, width: usize, ratio: f32) -> [usize; 2] {
    [
        ((height as f32 * ratio).floor() as usize).max(height),
        ((width as f32 * ratio).floor() as usize).max(width),
    ]
}

/// Copy the grid into `window` of a new canvas filled with per-channel
/// values. A single fill value is broadcast to all channels.
pub fn paste(
    grid: &PixelGrid,
    canvas: [usize; 2],
    window: &PixelWindow,
    fill: &[f32],
) -> Result<PixelGrid> {
    let [canvas_h, canvas_w] = canvas;
    let channels = grid.channels();
    ensure_kind!(
        window.height == grid.height() && window.width == grid.width(),
        InvalidArgument,
        "window {:?} does not match the {}x{} source",
        window,
        grid.height(),
        grid.width()
    );
    ensure_kind!(
        window.fits_in(canvas_h, canvas_w),
        OutOfRange,
        "window {:?} exceeds the {}x{} canvas",
        window,
        canvas_h,
        canvas_w
    );

    let fill: Vec<f32> = match fill.len() {
        0 => vec![0.0; channels],
        1 => vec![fill[0]; channels],
        len if len == channels => fill.to_vec(),
        len => {
            return Err(Error::InvalidArgument(format!(
                "{} fill values cannot fill {} channels",
                len, channels
            )))
        }
    };

    let mut data = Array3::zeros((canvas_h, canvas_w, channels));
    data.axis_iter_mut(Axis(2))
        .zip(&fill)
        .for_each(|(mut channel, &value)| channel.fill(value));
    data.slice_mut(s![window.top..window.bottom(), window.left..window.right(), ..])
        .assign(grid.data());

    Ok(PixelGrid::from_parts(data, grid.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_places_source() -> Result<()> {
        let grid = PixelGrid::filled(10, 20, &[255.0, 128.0], crate::sample::ElementKind::U8)?;
        let expansion = expand(&grid, 2.0, &[1.0, 2.0], [0.5, 1.0])?;
        assert_eq!(expansion.grid.height(), 20);
        assert_eq!(expansion.grid.width(), 40);
        assert_eq!(expansion.window, PixelWindow::new(5, 20, 10, 20));
        assert_eq!(
            expansion.placement().tlbr(),
            [r64(0.25), r64(0.5), r64(0.75), r64(1.0)]
        );

        let data = expansion.grid.data();
        assert_eq!(data[[0, 0, 0]], 1.0);
        assert_eq!(data[[0, 0, 1]], 2.0);
        assert_eq!(data[[5, 20, 0]], 255.0);
        assert_eq!(data[[14, 39, 1]], 128.0);
        assert_eq!(data[[15, 39, 1]], 2.0);
        Ok(())
    }

    #[test]
    fn expand_rejects_shrinking() -> Result<()> {
        let grid = PixelGrid::filled(4, 4, &[0.0], crate::sample::ElementKind::U8)?;
        assert!(matches!(
            expand(&grid, 0.5, &[], [0.0, 0.0]),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn paste_checks_fill_length() -> Result<()> {
        let grid = PixelGrid::filled(2, 2, &[0.0, 0.0, 0.0], crate::sample::ElementKind::U8)?;
        assert!(paste(&grid, [4, 4], &PixelWindow::new(1, 1, 2, 2), &[1.0, 2.0]).is_err());
        assert!(paste(&grid, [4, 4], &PixelWindow::new(3, 1, 2, 2), &[1.0]).is_err());
        Ok(())
    }
}
