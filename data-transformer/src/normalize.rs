//! Mean subtraction and scaling into channel-major destinations.
//!
//! `output[c, y, x] = (input[y, x, c] - mean) * scale`

use crate::{
    common::*,
    sample::{ElementKind, PixelGrid},
};
use ndarray::Zip;

/// The mean subtracted from one transformed image.
#[derive(Debug, Clone, PartialEq)]
pub enum Mean {
    Zero,
    /// One value per channel.
    Channels(Vec<f32>),
    /// A mean image already aligned with the transformed image.
    Image(PixelGrid),
}

/// Write the normalized grid into a `[C, H, W]` destination.
pub fn normalize_into(
    grid: &PixelGrid,
    mean: &Mean,
    scale: f32,
    mut dest: ArrayViewMut3<f32>,
) -> Result<()> {
    let expect = [grid.channels(), grid.height(), grid.width()];
    if dest.shape() != expect {
        return Err(Error::ShapeMismatch {
            expect: expect.to_vec(),
            actual: dest.shape().to_vec(),
        });
    }
    let src = grid.data().view().permuted_axes([2, 0, 1]);

    match mean {
        Mean::Zero => {
            Zip::from(&mut dest)
                .and(&src)
                .for_each(|out, &val| *out = val * scale);
        }
        Mean::Channels(values) => {
            ensure_kind!(
                values.len() == grid.channels(),
                InvalidConfiguration,
                "{} mean values do not match {} channels",
                values.len(),
                grid.channels()
            );
            izip!(dest.outer_iter_mut(), src.outer_iter(), values).for_each(
                |(mut out, channel, &mean)| {
                    Zip::from(&mut out)
                        .and(&channel)
                        .for_each(|out, &val| *out = (val - mean) * scale);
                },
            );
        }
        Mean::Image(image) => {
            if image.descriptor() != grid.descriptor() {
                let to_vec = |grid: &PixelGrid| vec![grid.height(), grid.width(), grid.channels()];
                return Err(Error::ShapeMismatch {
                    expect: to_vec(grid),
                    actual: to_vec(image),
                });
            }
            let mean = image.data().view().permuted_axes([2, 0, 1]);
            Zip::from(&mut dest)
                .and(&src)
                .and(&mean)
                .for_each(|out, &val, &mean| *out = (val - mean) * scale);
        }
    }

    Ok(())
}

/// Undo [normalize_into] for per-channel means.
pub fn denormalize(
    chw: ArrayView3<f32>,
    means: &[f32],
    scale: f32,
    kind: ElementKind,
) -> Result<PixelGrid> {
    ensure_kind!(
        scale != 0.0,
        InvalidArgument,
        "cannot undo a scale of zero"
    );
    let channels = chw.dim().0;
    ensure_kind!(
        means.is_empty() || means.len() == channels,
        InvalidArgument,
        "{} mean values do not match {} channels",
        means.len(),
        channels
    );

    let mut hwc = chw.permuted_axes([1, 2, 0]).as_standard_layout().into_owned();
    hwc.axis_iter_mut(Axis(2))
        .enumerate()
        .for_each(|(index, mut channel)| {
            let mean = means.get(index).copied().unwrap_or(0.0);
            channel.mapv_inplace(|val| val / scale + mean);
        });
    PixelGrid::new(hwc, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_without_mean() -> Result<()> {
        let grid = PixelGrid::from_u8(2, 3, 2, &(0..12).collect::<Vec<u8>>())?;
        let mut dest = Array3::zeros((2, 2, 3));
        normalize_into(&grid, &Mean::Zero, 1.0, dest.view_mut())?;
        assert_eq!(dest, grid.to_chw());
        Ok(())
    }

    #[test]
    fn channel_means_and_scale() -> Result<()> {
        let grid = PixelGrid::filled(2, 2, &[10.0, 20.0], ElementKind::U8)?;
        let mut dest = Array3::zeros((2, 2, 2));
        normalize_into(
            &grid,
            &Mean::Channels(vec![4.0, 8.0]),
            0.5,
            dest.view_mut(),
        )?;
        assert!(dest.index_axis(Axis(0), 0).iter().all(|&val| val == 3.0));
        assert!(dest.index_axis(Axis(0), 1).iter().all(|&val| val == 6.0));

        let restored = denormalize(dest.view(), &[4.0, 8.0], 0.5, ElementKind::U8)?;
        restored
            .data()
            .iter()
            .zip(grid.data().iter())
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs));
        Ok(())
    }

    #[test]
    fn mean_image() -> Result<()> {
        let grid = PixelGrid::from_u8(1, 2, 1, &[5, 7])?;
        let mean = PixelGrid::from_u8(1, 2, 1, &[1, 2])?;
        let mut dest = Array3::zeros((1, 1, 2));
        normalize_into(&grid, &Mean::Image(mean), 1.0, dest.view_mut())?;
        assert_eq!(dest.iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0]);

        let wrong = PixelGrid::from_u8(2, 1, 1, &[1, 2])?;
        assert!(matches!(
            normalize_into(&grid, &Mean::Image(wrong), 1.0, dest.view_mut()),
            Err(Error::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn destination_shape_is_checked() -> Result<()> {
        let grid = PixelGrid::filled(2, 2, &[0.0], ElementKind::U8)?;
        let mut dest = Array3::zeros((1, 3, 2));
        assert!(matches!(
            normalize_into(&grid, &Mean::Zero, 1.0, dest.view_mut()),
            Err(Error::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn zero_scale_cannot_be_undone() {
        let chw = Array3::<f32>::zeros((1, 2, 2));
        assert!(matches!(
            denormalize(chw.view(), &[], 0.0, ElementKind::F32),
            Err(Error::InvalidArgument(_))
        ));
    }
}
