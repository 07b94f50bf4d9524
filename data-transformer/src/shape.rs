//! Output shape inference.

use crate::{
    common::*,
    config::{MeanSource, TransformConfig},
    random::Phase,
    sample::SampleDescriptor,
    step::Step,
};

/// What is known about one spatial dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    /// The size, if it does not depend on randomness.
    pub exact: Option<usize>,
    /// The guaranteed lower bound of the size.
    pub min: usize,
}

impl Bound {
    pub fn exact(size: usize) -> Self {
        Self {
            exact: Some(size),
            min: size,
        }
    }

    pub fn at_least(min: usize) -> Self {
        Self { exact: None, min }
    }
}

impl From<Bound> for Dim {
    fn from(from: Bound) -> Self {
        from.exact.into()
    }
}

/// The spatial extent of an image between two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub height: Bound,
    pub width: Bound,
}

impl Extent {
    pub fn new(height: Bound, width: Bound) -> Self {
        Self { height, width }
    }

    pub fn exact(height: usize, width: usize) -> Self {
        Self::new(Bound::exact(height), Bound::exact(width))
    }

    /// Height and width, if both are known.
    pub fn exact_hw(&self) -> Option<[usize; 2]> {
        Some([self.height.exact?, self.width.exact?])
    }
}

/// Compute the `[1, C, H, W]` shape the pipeline produces for an image,
/// without touching pixel data.
///
/// A spatial dimension that depends on randomness and is not fixed by a
/// later step is [Dim::Infer].
pub fn infer_shape(
    descriptor: &SampleDescriptor,
    config: &TransformConfig,
    phase: Phase,
) -> Result<Shape> {
    let SampleDescriptor {
        height,
        width,
        channels,
    } = *descriptor;
    ensure_kind!(
        height > 0 && width > 0 && channels > 0,
        InvalidArgument,
        "image must not be empty, but get {}x{}x{}",
        height,
        width,
        channels
    );

    check_channels(config, channels)?;

    let steps = config.steps();
    let anchor = mean_anchor(steps);
    let mut extent = Extent::exact(height, width);

    for (index, step) in steps.iter().enumerate() {
        if index == anchor {
            check_mean_image(config, &extent)?;
        }
        extent = step.infer(extent, phase)?;
    }
    if anchor == steps.len() {
        check_mean_image(config, &extent)?;
    }

    Ok(Shape::from([
        Dim::Size(1),
        Dim::Size(channels),
        extent.height.into(),
        extent.width.into(),
    ]))
}

/// Compute the `[N, C, H, W]` shape of a batch. Every sample must infer the
/// same per-sample shape.
pub fn infer_batch_shape(
    descriptors: &[SampleDescriptor],
    config: &TransformConfig,
    phase: Phase,
) -> Result<Shape> {
    ensure_kind!(
        !descriptors.is_empty(),
        InvalidArgument,
        "the batch must not be empty"
    );

    let shapes: Vec<Shape> = descriptors
        .iter()
        .map(|descriptor| infer_shape(descriptor, config, phase))
        .collect::<Result<_>>()?;
    let first = &shapes[0];
    if let Some((index, shape)) = shapes.iter().enumerate().find(|(_, shape)| *shape != first) {
        return Err(Error::InvalidShape(format!(
            "sample {} infers shape {}, but sample 0 infers {}",
            index, shape, first
        )));
    }

    Ok(first.with_batch_size(descriptors.len()))
}

/// Index of the step before which the mean image is aligned, or the step
/// count if it is aligned with the final output.
pub(crate) fn mean_anchor(steps: &[Step]) -> usize {
    steps
        .iter()
        .position(Step::is_fixed_stage)
        .unwrap_or(steps.len())
}

fn check_channels(config: &TransformConfig, channels: usize) -> Result<()> {
    match config.mean() {
        MeanSource::None => {}
        MeanSource::Values(values) => {
            ensure_kind!(
                values.len() == 1 || values.len() == channels,
                InvalidConfiguration,
                "{} mean values do not match {} channels",
                values.len(),
                channels
            );
        }
        MeanSource::Image(image) => {
            ensure_kind!(
                image.channels() == channels,
                InvalidConfiguration,
                "the mean image has {} channels, but the image has {}",
                image.channels(),
                channels
            );
        }
    }

    let needs_rgb = config.steps().iter().any(|step| match step {
        Step::Distort(params) => params.saturation_prob > 0.0 || params.hue_prob > 0.0,
        _ => false,
    });
    ensure_kind!(
        !needs_rgb || channels == 3,
        InvalidConfiguration,
        "saturation and hue distortion require 3 channels, but the image has {}",
        channels
    );

    Ok(())
}

fn check_mean_image(config: &TransformConfig, extent: &Extent) -> Result<()> {
    let image = match config.mean() {
        MeanSource::Image(image) => image,
        _ => return Ok(()),
    };
    let [height, width] = extent.exact_hw().ok_or_else(|| {
        Error::InvalidConfiguration(format!(
            "the {}x{} mean image cannot be aligned with an image of random size \
             (at least {}x{})",
            image.height(),
            image.width(),
            extent.height.min,
            extent.width.min
        ))
    })?;
    ensure_kind!(
        image.height() == height && image.width() == width,
        InvalidConfiguration,
        "the {}x{} mean image does not match the {}x{} image it is aligned with",
        image.height(),
        image.width(),
        height,
        width
    );
    Ok(())
}
