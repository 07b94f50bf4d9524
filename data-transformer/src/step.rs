//! The transform steps a configuration resolves into.

use crate::{
    common::*,
    config::{DistortParams, ExpandParams, ResizeParams},
    geometry::{self, ColorDraw, GeometryOp, Interpolation, PixelWindow, ResizeMode},
    random::{Phase, RandomDraw, RandomStream, StepSlot},
    sample::PixelGrid,
    shape::{Bound, Extent},
};

/// One enabled transform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Resize the shorter side to a value in `lower..=upper`, keeping the
    /// aspect ratio.
    RandomResize { lower: usize, upper: usize },
    /// Square crop at a random position.
    RandomCrop { size: usize },
    /// Square crop at the center.
    CenterCrop { size: usize },
    /// Place the image on a larger canvas filled with the channel means.
    Expand(ExpandParams),
    /// The fixed square crop, positioned by the [RandomDraw].
    Crop { size: usize },
    /// Horizontal flip decided by the [RandomDraw].
    Mirror,
    /// Resize to a fixed size.
    Resize(ResizeParams),
    /// Photometric distortion.
    Distort(DistortParams),
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RandomResize { .. } => "random_resize",
            Self::RandomCrop { .. } => "random_crop",
            Self::CenterCrop { .. } => "center_crop",
            Self::Expand(_) => "expand",
            Self::Crop { .. } => "crop",
            Self::Mirror => "mirror",
            Self::Resize(_) => "resize",
            Self::Distort(_) => "distort",
        }
    }

    /// Whether the step consumes random values in the training phase.
    pub fn is_random(&self) -> bool {
        match *self {
            Self::RandomResize { lower, upper } => lower < upper,
            Self::CenterCrop { .. } | Self::Resize(_) => false,
            Self::RandomCrop { .. }
            | Self::Expand(_)
            | Self::Crop { .. }
            | Self::Mirror
            | Self::Distort(_) => true,
        }
    }

    /// Whether the step belongs to the fixed stage that follows the
    /// variable-sized chain and the expansion. A mean image is aligned
    /// with the image entering this stage.
    pub fn is_fixed_stage(&self) -> bool {
        matches!(
            self,
            Self::Crop { .. } | Self::Mirror | Self::Resize(_) | Self::Distort(_)
        )
    }

    /// The shape rule of the step.
    pub fn infer(&self, extent: Extent, phase: Phase) -> Result<Extent> {
        let output = match *self {
            Self::RandomResize { lower, upper } => {
                let random = phase == Phase::Train && lower < upper;
                match extent.exact_hw() {
                    Some([height, width]) if !random => {
                        let [height, width] = resize_shorter_side(height, width, (lower + upper) / 2);
                        Extent::exact(height, width)
                    }
                    Some([height, width]) => {
                        let [min_h, min_w] = resize_shorter_side(height, width, lower);
                        Extent::new(Bound::at_least(min_h), Bound::at_least(min_w))
                    }
                    None => Extent::new(Bound::at_least(lower), Bound::at_least(lower)),
                }
            }
            Self::RandomCrop { size } | Self::CenterCrop { size } | Self::Crop { size } => {
                ensure_kind!(
                    extent.height.min >= size && extent.width.min >= size,
                    InvalidShape,
                    "{} of size {} cannot be taken from an image of at least {}x{}",
                    self.kind(),
                    size,
                    extent.height.min,
                    extent.width.min
                );
                Extent::exact(size, size)
            }
            Self::Expand(params) => match phase {
                Phase::Train => expand_extent(extent, &params),
                Phase::Test => extent,
            },
            Self::Mirror | Self::Distort(_) => extent,
            Self::Resize(ResizeParams { height, width, .. }) => Extent::exact(height, width),
        };
        Ok(output)
    }

    /// Run the step on the grid, recording the geometry it applied.
    pub(crate) fn apply(&self, grid: PixelGrid, ctx: &mut StepContext) -> Result<PixelGrid> {
        let (height, width) = (grid.height(), grid.width());

        let output = match *self {
            Self::RandomResize { lower, upper } => {
                let side = match ctx.stream(StepSlot::RandomResize) {
                    Some(mut stream) if lower < upper => {
                        let span = u32::try_from(upper - lower + 1).map_err(|_| {
                            Error::InvalidArgument("random resize range is too large".into())
                        })?;
                        lower + stream.next_bounded(span)? as usize
                    }
                    _ => (lower + upper) / 2,
                };
                let [new_h, new_w] = resize_shorter_side(height, width, side);
                ctx.record(GeometryOp::Resize {
                    target: [new_h, new_w],
                    window: PixelWindow::full(new_h, new_w),
                });
                geometry::resize(&grid, new_h, new_w, Interpolation::Bilinear)?
            }
            Self::RandomCrop { size } => {
                let window = match ctx.stream(StepSlot::RandomCrop) {
                    Some(mut stream) => {
                        let [margin_h, margin_w] = crop_margins(height, width, size)?;
                        let top = stream.next_bounded(margin_h + 1)? as usize;
                        let left = stream.next_bounded(margin_w + 1)? as usize;
                        PixelWindow::new(top, left, size, size)
                    }
                    None => PixelWindow::centered(height, width, size, size)?,
                };
                ctx.crop(&grid, window)?
            }
            Self::CenterCrop { size } => {
                let window = PixelWindow::centered(height, width, size, size)?;
                ctx.crop(&grid, window)?
            }
            Self::Expand(ExpandParams {
                prob,
                min_ratio,
                max_ratio,
            }) => {
                let mut stream = match ctx.stream(StepSlot::Expand) {
                    Some(stream) => stream,
                    None => return Ok(grid),
                };
                let coin = stream.next_uniform(0.0, 1.0);
                let ratio = stream.next_uniform(min_ratio.raw() as f32, max_ratio.raw() as f32);
                let anchor = [stream.next_uniform(0.0, 1.0), stream.next_uniform(0.0, 1.0)];

                if coin >= prob.raw() as f32 || ratio <= 1.0 {
                    return Ok(grid);
                }
                let expansion = geometry::expand(&grid, ratio, ctx.mean_fill, anchor)?;
                if expansion.window == PixelWindow::full(expansion.grid.height(), expansion.grid.width()) {
                    return Ok(grid);
                }
                ctx.record(GeometryOp::Expand {
                    canvas: [expansion.grid.height(), expansion.grid.width()],
                    window: expansion.window,
                });
                expansion.grid
            }
            Self::Crop { size } => {
                let window = match ctx.draw {
                    Some(draw) => {
                        let [margin_h, margin_w] = crop_margins(height, width, size)?;
                        PixelWindow::new(
                            draw.offset_y(margin_h as usize),
                            draw.offset_x(margin_w as usize),
                            size,
                            size,
                        )
                    }
                    None => PixelWindow::centered(height, width, size, size)?,
                };
                ctx.crop(&grid, window)?
            }
            Self::Mirror => {
                let flip = ctx.draw.map(|draw| draw.mirror_bit()).unwrap_or(false);
                if !flip {
                    return Ok(grid);
                }
                ctx.mirrored = true;
                ctx.record(GeometryOp::Mirror);
                geometry::mirror(&grid)
            }
            Self::Resize(ResizeParams {
                height: target_h,
                width: target_w,
                mode,
                pad_value,
            }) => match mode {
                ResizeMode::Warp => {
                    ctx.record(GeometryOp::Resize {
                        target: [target_h, target_w],
                        window: PixelWindow::full(target_h, target_w),
                    });
                    geometry::resize(&grid, target_h, target_w, Interpolation::Bilinear)?
                }
                ResizeMode::Letterbox => {
                    let (output, window) = geometry::letterbox(
                        &grid,
                        target_h,
                        target_w,
                        Interpolation::Bilinear,
                        &[pad_value.raw() as f32],
                    )?;
                    ctx.record(GeometryOp::Resize {
                        target: [target_h, target_w],
                        window,
                    });
                    output
                }
            },
            Self::Distort(params) => {
                let mut stream = match ctx.stream(StepSlot::Distort) {
                    Some(stream) => stream,
                    None => return Ok(grid),
                };
                let draw = ColorDraw::sample(&params, grid.channels(), &mut stream);
                if draw.is_identity() {
                    return Ok(grid);
                }
                geometry::distort_color(&grid, &draw)?
            }
        };

        Ok(output)
    }
}

/// The per-invocation state the steps read and write.
pub(crate) struct StepContext<'a> {
    /// Seed of the sample's random streams, absent when the invocation
    /// draws nothing.
    pub seed: Option<u64>,
    /// Positions the fixed crop and decides the mirror.
    pub draw: Option<RandomDraw>,
    /// Per-channel fill of expansion margins.
    pub mean_fill: &'a [f32],
    pub mirrored: bool,
    pub ops: Vec<GeometryOp>,
}

impl<'a> StepContext<'a> {
    pub fn new(seed: Option<u64>, draw: Option<RandomDraw>, mean_fill: &'a [f32]) -> Self {
        Self {
            seed,
            draw,
            mean_fill,
            mirrored: false,
            ops: vec![],
        }
    }

    fn stream(&self, slot: StepSlot) -> Option<RandomStream> {
        self.seed.map(|seed| RandomStream::for_step(seed, slot))
    }

    fn record(&mut self, op: GeometryOp) {
        trace!("apply {:?}", op);
        self.ops.push(op);
    }

    fn crop(&mut self, grid: &PixelGrid, window: PixelWindow) -> Result<PixelGrid> {
        let output = geometry::crop(grid, &window)?;
        if window != PixelWindow::full(grid.height(), grid.width()) {
            self.record(GeometryOp::Crop {
                frame: [grid.height(), grid.width()],
                window,
            });
        }
        Ok(output)
    }
}

/// Free margins of a square crop, as the exclusive bounds of the offsets
/// minus one.
/// The extent after a training-time expansion. It stays exact when the
/// expansion never fires or always lands on the same canvas.
fn expand_extent(extent: Extent, params: &ExpandParams) -> Extent {
    let prob = params.prob.raw() as f32;
    let (min_ratio, max_ratio) = (params.min_ratio.raw() as f32, params.max_ratio.raw() as f32);
    if prob <= 0.0 || max_ratio <= 1.0 {
        return extent;
    }

    let widened = Extent::new(
        Bound::at_least(extent.height.min),
        Bound::at_least(extent.width.min),
    );
    if min_ratio < max_ratio {
        return widened;
    }
    match extent.exact_hw() {
        Some([height, width]) => {
            let [canvas_h, canvas_w] = geometry::canvas_size(height, width, min_ratio);
            if [canvas_h, canvas_w] == [height, width] {
                extent
            } else if prob >= 1.0 {
                Extent::exact(canvas_h, canvas_w)
            } else {
                widened
            }
        }
        None => widened,
    }
}

fn crop_margins(height: usize, width: usize, size: usize) -> Result<[u32; 2]> {
    ensure_kind!(
        size <= height && size <= width,
        OutOfRange,
        "a {}x{} crop does not fit into a {}x{} image",
        size,
        size,
        height,
        width
    );
    let margin = |len: usize| {
        u32::try_from(len - size)
            .map_err(|_| Error::InvalidArgument(format!("image side {} is too large", len)))
    };
    Ok([margin(height)?, margin(width)?])
}

/// Size after resizing the shorter side to `side` with the aspect ratio
/// kept.
pub(crate) fn resize_shorter_side(height: usize, width: usize, side: usize) -> [usize; 2] {
    let scaled = |len: usize, short: usize| {
        ((len as f64 * side as f64 / short as f64).round() as usize).max(1)
    };
    if height <= width {
        [side, scaled(width, height)]
    } else {
        [scaled(height, width), side]
    }
}
