//! Photometric distortion on images with values in `0..=255`.

use crate::{common::*, config::DistortParams, random::RandomStream, sample::PixelGrid};

const MAX_VALUE: f32 = 255.0;

/// The perturbations chosen for one invocation. `None` leaves the property
/// untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorDraw {
    /// Added to every value.
    pub brightness: Option<f32>,
    /// Multiplies every value.
    pub contrast: Option<f32>,
    /// Multiplies the HSV saturation.
    pub saturation: Option<f32>,
    /// Added to the HSV hue, in degrees.
    pub hue: Option<f32>,
    /// Apply the contrast after saturation and hue.
    pub contrast_last: bool,
    /// Output channel `i` takes input channel `channel_order[i]`.
    pub channel_order: Option<Vec<usize>>,
}

impl ColorDraw {
    /// Draw the perturbations.
    ///
    /// Every probability test and every value is drawn regardless of the
    /// outcome, so the stream advances the same way for any parameters.
    pub fn sample(params: &DistortParams, channels: usize, stream: &mut RandomStream) -> Self {
        let mut pick = |prob: R64, lo: R64, hi: R64| {
            let hit = stream.next_uniform(0.0, 1.0) < prob.raw() as f32;
            let value = stream.next_uniform(lo.raw() as f32, hi.raw() as f32);
            hit.then(|| value)
        };

        let brightness = pick(
            params.brightness_prob,
            -params.brightness_delta,
            params.brightness_delta,
        );
        let contrast = pick(
            params.contrast_prob,
            params.contrast_lower,
            params.contrast_upper,
        );
        let saturation = pick(
            params.saturation_prob,
            params.saturation_lower,
            params.saturation_upper,
        );
        let hue = pick(params.hue_prob, -params.hue_delta, params.hue_delta);

        let contrast_last = stream.next_uniform(0.0, 1.0) < 0.5;
        let channel_order = (stream.next_uniform(0.0, 1.0) < params.random_order_prob.raw() as f32)
            .then(|| {
                let mut order: Vec<usize> = (0..channels).collect();
                stream.shuffle(&mut order);
                order
            });

        Self {
            brightness,
            contrast,
            saturation,
            hue,
            contrast_last,
            channel_order,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.brightness.is_none()
            && self.contrast.is_none()
            && self.saturation.is_none()
            && self.hue.is_none()
            && self.channel_order.is_none()
    }
}

/// Apply the drawn perturbations.
///
/// Brightness comes first. Contrast follows, unless `contrast_last` moves
/// it after saturation and hue. Channel reordering comes last. Saturation
/// and hue treat the channels as RGB.
pub fn distort_color(grid: &PixelGrid, draw: &ColorDraw) -> Result<PixelGrid> {
    let channels = grid.channels();
    if draw.saturation.is_some() || draw.hue.is_some() {
        ensure_kind!(
            channels == 3,
            InvalidArgument,
            "saturation and hue distortion require 3 channels, but get {}",
            channels
        );
    }

    let mut data = grid.data().clone();

    if let Some(delta) = draw.brightness {
        data.mapv_inplace(|val| (val + delta).clamp(0.0, MAX_VALUE));
    }
    if !draw.contrast_last {
        apply_contrast(&mut data, draw.contrast);
    }
    if draw.saturation.is_some() || draw.hue.is_some() {
        let alpha = draw.saturation.unwrap_or(1.0);
        let delta = draw.hue.unwrap_or(0.0);
        data.lanes_mut(Axis(2)).into_iter().for_each(|mut pixel| {
            let (hue, sat, val) = rgb_to_hsv(
                pixel[0] / MAX_VALUE,
                pixel[1] / MAX_VALUE,
                pixel[2] / MAX_VALUE,
            );
            let sat = (sat * alpha).clamp(0.0, 1.0);
            let hue = (hue + delta).rem_euclid(360.0);
            let (r, g, b) = hsv_to_rgb(hue, sat, val);
            pixel[0] = r * MAX_VALUE;
            pixel[1] = g * MAX_VALUE;
            pixel[2] = b * MAX_VALUE;
        });
    }
    if draw.contrast_last {
        apply_contrast(&mut data, draw.contrast);
    }

    if let Some(order) = &draw.channel_order {
        ensure_kind!(
            order.len() == channels && order.iter().sorted().copied().eq(0..channels),
            InvalidArgument,
            "{:?} is not a permutation of {} channels",
            order,
            channels
        );
        let source = data.clone();
        order.iter().enumerate().for_each(|(to, &from)| {
            data.index_axis_mut(Axis(2), to)
                .assign(&source.index_axis(Axis(2), from));
        });
    }

    Ok(PixelGrid::from_parts(data, grid.kind()))
}

fn apply_contrast(data: &mut Array3<f32>, contrast: Option<f32>) {
    if let Some(alpha) = contrast {
        data.mapv_inplace(|val| (val * alpha).clamp(0.0, MAX_VALUE));
    }
}

/// Hue in degrees, saturation and value in `[0, 1]`.
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let hue = if chroma <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / chroma + 2.0)
    } else {
        60.0 * ((r - g) / chroma + 4.0)
    };
    let sat = if max <= 0.0 { 0.0 } else { chroma / max };

    (hue, sat, max)
}

fn hsv_to_rgb(hue: f32, sat: f32, val: f32) -> (f32, f32, f32) {
    let chroma = val * sat;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let offset = val - chroma;
    (r + offset, g + offset, b + offset)
}
