//! Transform configuration.

use crate::{
    annotation::EmitConstraint,
    common::*,
    geometry::ResizeMode,
    random::Phase,
    sample::PixelGrid,
    step::Step,
};

/// The configuration as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(deny_unknown_fields)]
pub struct TransformConfigInit {
    /// Side of the fixed square crop. Zero disables it.
    #[serde(default)]
    pub crop_size: usize,
    #[serde(default)]
    pub mirror: bool,
    /// Per-channel means. One value is broadcast to all channels.
    #[serde(default)]
    pub mean_values: Vec<R64>,
    /// Full mean image, only settable programmatically.
    #[serde(skip)]
    pub mean_image: Option<PixelGrid>,
    #[serde(default = "defaults::scale")]
    #[derivative(Default(value = "defaults::scale()"))]
    pub scale: R64,
    #[serde(default)]
    pub random_resize: Option<RandomResizeParams>,
    #[serde(default)]
    pub random_crop: Option<usize>,
    #[serde(default)]
    pub center_crop: Option<usize>,
    #[serde(default)]
    pub expand: Option<ExpandParams>,
    #[serde(default)]
    pub resize: Option<ResizeParams>,
    #[serde(default)]
    pub distort: Option<DistortParams>,
    #[serde(default)]
    pub emit_constraint: Option<EmitConstraint>,
    /// Padding value of paired label maps.
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub label_fill: R64,
}

/// Resize the shorter side to a uniform integer in `lower..=upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomResizeParams {
    pub lower: usize,
    pub upper: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpandParams {
    #[serde(default = "defaults::one")]
    pub prob: R64,
    #[serde(default = "defaults::one")]
    pub min_ratio: R64,
    pub max_ratio: R64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeParams {
    pub height: usize,
    pub width: usize,
    #[serde(default)]
    pub mode: ResizeMode,
    /// Value of the letterbox margins.
    #[serde(default = "defaults::zero")]
    pub pad_value: R64,
}

/// Probabilities and ranges of the photometric distortion. Hue deltas are
/// in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(deny_unknown_fields)]
pub struct DistortParams {
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub brightness_prob: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub brightness_delta: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub contrast_prob: R64,
    #[serde(default = "defaults::one")]
    #[derivative(Default(value = "defaults::one()"))]
    pub contrast_lower: R64,
    #[serde(default = "defaults::one")]
    #[derivative(Default(value = "defaults::one()"))]
    pub contrast_upper: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub saturation_prob: R64,
    #[serde(default = "defaults::one")]
    #[derivative(Default(value = "defaults::one()"))]
    pub saturation_lower: R64,
    #[serde(default = "defaults::one")]
    #[derivative(Default(value = "defaults::one()"))]
    pub saturation_upper: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub hue_prob: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub hue_delta: R64,
    #[serde(default = "defaults::zero")]
    #[derivative(Default(value = "defaults::zero()"))]
    pub random_order_prob: R64,
}

impl TransformConfigInit {
    pub fn load<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    pub fn from_json5_str(text: &str) -> anyhow::Result<Self> {
        let config = json5::from_str(text)?;
        Ok(config)
    }

    pub fn with_mean_image(mut self, mean_image: PixelGrid) -> Self {
        self.mean_image = Some(mean_image);
        self
    }

    pub fn build(self) -> Result<TransformConfig> {
        let Self {
            crop_size,
            mirror,
            mean_values,
            mean_image,
            scale,
            random_resize,
            random_crop,
            center_crop,
            expand,
            resize,
            distort,
            emit_constraint,
            label_fill,
        } = self;

        let mean = match (mean_values.is_empty(), mean_image) {
            (true, None) => MeanSource::None,
            (false, None) => MeanSource::Values(mean_values.iter().map(|val| val.raw() as f32).collect()),
            (true, Some(image)) => {
                ensure_kind!(
                    expand.is_none(),
                    InvalidConfiguration,
                    "a mean image cannot be combined with expansion"
                );
                MeanSource::Image(image)
            }
            (false, Some(_)) => {
                return Err(Error::InvalidConfiguration(
                    "mean_values and a mean image cannot be specified at the same time".into(),
                ))
            }
        };

        ensure_kind!(
            crop_size == 0 || resize.is_none(),
            InvalidConfiguration,
            "crop_size and resize cannot be specified at the same time"
        );

        if let Some(RandomResizeParams { lower, upper }) = random_resize {
            ensure_kind!(
                lower > 0 && lower <= upper,
                InvalidConfiguration,
                "random_resize requires 0 < lower <= upper, but get lower={} upper={}",
                lower,
                upper
            );
        }
        ensure_kind!(
            random_crop != Some(0),
            InvalidConfiguration,
            "random_crop must be positive"
        );
        ensure_kind!(
            center_crop != Some(0),
            InvalidConfiguration,
            "center_crop must be positive"
        );

        if let Some(ExpandParams {
            prob,
            min_ratio,
            max_ratio,
        }) = expand
        {
            ensure_probability("expand.prob", prob)?;
            ensure_kind!(
                min_ratio >= 1.0 && min_ratio <= max_ratio,
                InvalidConfiguration,
                "expand requires 1 <= min_ratio <= max_ratio, but get min_ratio={} max_ratio={}",
                min_ratio,
                max_ratio
            );
        }

        if let Some(ResizeParams { height, width, .. }) = resize {
            ensure_kind!(
                height > 0 && width > 0,
                InvalidConfiguration,
                "resize size must be positive, but get {}x{}",
                height,
                width
            );
        }

        if let Some(params) = &distort {
            ensure_probability("distort.brightness_prob", params.brightness_prob)?;
            ensure_probability("distort.contrast_prob", params.contrast_prob)?;
            ensure_probability("distort.saturation_prob", params.saturation_prob)?;
            ensure_probability("distort.hue_prob", params.hue_prob)?;
            ensure_probability("distort.random_order_prob", params.random_order_prob)?;
            ensure_kind!(
                params.brightness_delta >= 0.0,
                InvalidConfiguration,
                "distort.brightness_delta must be non-negative"
            );
            ensure_kind!(
                params.contrast_lower >= 0.0 && params.contrast_lower <= params.contrast_upper,
                InvalidConfiguration,
                "distort requires 0 <= contrast_lower <= contrast_upper"
            );
            ensure_kind!(
                params.saturation_lower >= 0.0
                    && params.saturation_lower <= params.saturation_upper,
                InvalidConfiguration,
                "distort requires 0 <= saturation_lower <= saturation_upper"
            );
            ensure_kind!(
                params.hue_delta >= 0.0 && params.hue_delta <= 180.0,
                InvalidConfiguration,
                "distort.hue_delta must be in [0, 180] degrees"
            );
        }

        if let Some(EmitConstraint::MinOverlap { overlap }) = emit_constraint {
            ensure_probability("emit_constraint.overlap", overlap)?;
        }

        let steps: Vec<Step> = [
            random_resize.map(|RandomResizeParams { lower, upper }| Step::RandomResize {
                lower,
                upper,
            }),
            random_crop.map(|size| Step::RandomCrop { size }),
            center_crop.map(|size| Step::CenterCrop { size }),
            expand.map(Step::Expand),
            (crop_size > 0).then(|| Step::Crop { size: crop_size }),
            mirror.then(|| Step::Mirror),
            resize.map(Step::Resize),
            distort.map(Step::Distort),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(TransformConfig {
            crop_size,
            mirror,
            mean,
            scale: scale.raw() as f32,
            steps,
            emit_constraint,
            label_fill: label_fill.raw() as f32,
        })
    }
}

fn ensure_probability(name: &str, prob: R64) -> Result<()> {
    ensure_kind!(
        (0.0..=1.0).contains(&prob.raw()),
        InvalidConfiguration,
        "{} must be in [0, 1], but get {}",
        name,
        prob
    );
    Ok(())
}

/// What is subtracted from every pixel before scaling.
#[derive(Debug, Clone, PartialEq)]
pub enum MeanSource {
    None,
    Values(Vec<f32>),
    Image(PixelGrid),
}

impl MeanSource {
    /// Per-channel means for an image with the given channels, used to
    /// fill expansion margins.
    pub fn channel_values(&self, channels: usize) -> Vec<f32> {
        match self {
            Self::Values(values) if values.len() == 1 => vec![values[0]; channels],
            Self::Values(values) => values.clone(),
            Self::None | Self::Image(_) => vec![0.0; channels],
        }
    }
}

/// The validated, immutable configuration shared by all pipeline
/// instances.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct TransformConfig {
    #[getset(get_copy = "pub")]
    crop_size: usize,
    #[getset(get_copy = "pub")]
    mirror: bool,
    #[getset(get = "pub")]
    mean: MeanSource,
    #[getset(get_copy = "pub")]
    scale: f32,
    /// The steps in execution order.
    #[getset(get = "pub")]
    steps: Vec<Step>,
    #[getset(get_copy = "pub")]
    emit_constraint: Option<EmitConstraint>,
    #[getset(get_copy = "pub")]
    label_fill: f32,
}

impl TransformConfig {
    /// Whether an invocation in the phase consumes random values.
    pub fn needs_random(&self, phase: Phase) -> bool {
        phase == Phase::Train && self.steps.iter().any(Step::is_random)
    }
}

mod defaults {
    use super::*;

    pub fn zero() -> R64 {
        R64::new(0.0)
    }

    pub fn one() -> R64 {
        R64::new(1.0)
    }

    pub fn scale() -> R64 {
        R64::new(1.0)
    }
}
