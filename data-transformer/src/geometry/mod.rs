//! Pure pixel operations and the records describing what they did.
//!
//! Nothing in this module keeps state, so the functions may be called from
//! any number of pipelines concurrently.

mod crop;
mod distort;
mod expand;
mod mirror;
mod resize;

pub use crop::*;
pub use distort::*;
pub use expand::*;
pub use mirror::*;
pub use resize::*;

use crate::{
    common::*,
    sample::{NormalizedBox, PixelGrid},
};

/// A region in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelWindow {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl PixelWindow {
    pub fn new(top: usize, left: usize, height: usize, width: usize) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    /// The window covering a whole frame.
    pub fn full(height: usize, width: usize) -> Self {
        Self::new(0, 0, height, width)
    }

    /// A window of the given size centered in the frame.
    pub fn centered(frame_h: usize, frame_w: usize, height: usize, width: usize) -> Result<Self> {
        ensure_kind!(
            height <= frame_h && width <= frame_w,
            OutOfRange,
            "a {}x{} window does not fit into a {}x{} image",
            height,
            width,
            frame_h,
            frame_w
        );
        Ok(Self::new(
            (frame_h - height) / 2,
            (frame_w - width) / 2,
            height,
            width,
        ))
    }

    /// Convert a normalized box to pixels, clamping it to the frame first.
    pub fn from_normalized(rect: &NormalizedBox, frame_h: usize, frame_w: usize) -> Result<Self> {
        let clipped = rect.clip_to(&NormalizedBox::unit());
        let to_pixels = |val: R64, size: usize| (val.raw() * size as f64).round() as usize;
        let top = to_pixels(clipped.t(), frame_h);
        let left = to_pixels(clipped.l(), frame_w);
        let bottom = to_pixels(clipped.b(), frame_h);
        let right = to_pixels(clipped.r(), frame_w);
        ensure_kind!(
            bottom > top && right > left,
            OutOfRange,
            "box {:?} covers no pixel of a {}x{} image",
            rect.tlbr(),
            frame_h,
            frame_w
        );
        Ok(Self::new(top, left, bottom - top, right - left))
    }

    /// The window in coordinates normalized by the frame size.
    pub fn to_normalized(&self, frame_h: usize, frame_w: usize) -> NormalizedBox {
        let fh = frame_h as f64;
        let fw = frame_w as f64;
        NormalizedBox::try_from_tlbr([
            r64(self.top as f64 / fh),
            r64(self.left as f64 / fw),
            r64(self.bottom() as f64 / fh),
            r64(self.right() as f64 / fw),
        ])
        .unwrap_or_else(|_| NormalizedBox::unit())
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn fits_in(&self, frame_h: usize, frame_w: usize) -> bool {
        self.bottom() <= frame_h && self.right() <= frame_w
    }

    pub fn hw(&self) -> [usize; 2] {
        [self.height, self.width]
    }
}

/// One geometric operation as it was applied to the pixels.
///
/// The same record drives the annotation adjustment and the replay onto
/// paired inputs, so pixel space and annotation space cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryOp {
    /// The window kept out of a frame of size `frame`.
    Crop { frame: [usize; 2], window: PixelWindow },
    /// The source placed at `window` on a canvas of size `canvas`.
    Expand {
        canvas: [usize; 2],
        window: PixelWindow,
    },
    /// Horizontal flip.
    Mirror,
    /// The source resized into `window` of an output of size `target`.
    /// The window covers the whole output unless the resize letterboxes.
    Resize {
        target: [usize; 2],
        window: PixelWindow,
    },
}

impl GeometryOp {
    /// The map from the normalized input frame to the normalized output
    /// frame.
    pub fn box_transform(&self) -> Transform<R64> {
        match *self {
            Self::Crop {
                frame: [frame_h, frame_w],
                window,
            } => Transform::project_into(&window.to_normalized(frame_h, frame_w)),
            Self::Expand {
                canvas: [canvas_h, canvas_w],
                window,
            } => Transform::place_at(&window.to_normalized(canvas_h, canvas_w)),
            Self::Mirror => Transform::flip_horizontal(r64(1.0)),
            Self::Resize {
                target: [target_h, target_w],
                window,
            } => Transform::place_at(&window.to_normalized(target_h, target_w)),
        }
    }

    /// The part of the input that remains visible, in normalized input
    /// coordinates, for operations that discard pixels.
    pub fn visible_window(&self) -> Option<NormalizedBox> {
        match *self {
            Self::Crop {
                frame: [frame_h, frame_w],
                window,
            } => Some(window.to_normalized(frame_h, frame_w)),
            _ => None,
        }
    }

    /// Apply the same operation to another grid of the input's size.
    pub fn replay(
        &self,
        grid: &PixelGrid,
        interpolation: Interpolation,
        fill: &[f32],
    ) -> Result<PixelGrid> {
        match *self {
            Self::Crop {
                frame: [frame_h, frame_w],
                window,
            } => {
                ensure_same_size(grid, frame_h, frame_w)?;
                crop(grid, &window)
            }
            Self::Expand { canvas, window } => {
                ensure_same_size(grid, window.height, window.width)?;
                paste(grid, canvas, &window, fill)
            }
            Self::Mirror => Ok(mirror(grid)),
            Self::Resize { target, window } => {
                let resized = resize(grid, window.height, window.width, interpolation)?;
                if window == PixelWindow::full(target[0], target[1]) {
                    Ok(resized)
                } else {
                    paste(&resized, target, &window, fill)
                }
            }
        }
    }
}

fn ensure_same_size(grid: &PixelGrid, height: usize, width: usize) -> Result<()> {
    if grid.height() != height || grid.width() != width {
        return Err(Error::ShapeMismatch {
            expect: vec![height, width],
            actual: vec![grid.height(), grid.width()],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_normalized_conversion() -> Result<()> {
        let window = PixelWindow::new(0, 0, 80, 80);
        let rect = window.to_normalized(100, 100);
        assert_eq!(rect.tlbr(), [r64(0.0), r64(0.0), r64(0.8), r64(0.8)]);
        assert_eq!(PixelWindow::from_normalized(&rect, 100, 100)?, window);
        Ok(())
    }

    #[test]
    fn window_from_normalized_clamps() -> anyhow::Result<()> {
        let rect = NormalizedBox::try_from_tlbr([r64(-0.5), r64(0.5), r64(0.5), r64(1.5)])?;
        assert_eq!(
            PixelWindow::from_normalized(&rect, 10, 20)?,
            PixelWindow::new(0, 10, 5, 10)
        );

        let outside = NormalizedBox::try_from_tlbr([r64(1.5), r64(0.0), r64(2.0), r64(1.0)])?;
        assert!(matches!(
            PixelWindow::from_normalized(&outside, 10, 20),
            Err(Error::OutOfRange(_))
        ));
        Ok(())
    }

    #[test]
    fn window_centered() -> Result<()> {
        assert_eq!(
            PixelWindow::centered(250, 300, 224, 224)?,
            PixelWindow::new(13, 38, 224, 224)
        );
        assert!(PixelWindow::centered(200, 300, 224, 224).is_err());
        Ok(())
    }
}
