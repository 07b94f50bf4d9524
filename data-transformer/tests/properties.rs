use anyhow::Result;
use approx::assert_abs_diff_eq;
use data_transformer::{
    crop, infer_shape, mirror, AnnotationRecord, DistortParams, ElementKind, Error,
    ExpandParams, Phase, PixelGrid, PixelWindow, RandomDraw, RandomResizeParams, ResizeMode,
    ResizeParams, Sample, SampleDescriptor, Shape, TransformConfigInit, TransformPipeline,
};
use ndarray::{Array3, Axis};
use noisy_float::prelude::*;
use std::sync::Arc;

fn gradient(height: usize, width: usize, channels: usize) -> Result<PixelGrid> {
    let values: Vec<u8> = (0..height * width * channels)
        .map(|index| ((index * 7 + index / 5) % 256) as u8)
        .collect();
    Ok(PixelGrid::from_u8(height, width, channels, &values)?)
}

fn pipeline(init: TransformConfigInit, phase: Phase, seed: u64) -> Result<TransformPipeline> {
    Ok(TransformPipeline::new(Arc::new(init.build()?), phase, seed))
}

fn annotation(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> AnnotationRecord {
    AnnotationRecord {
        xmin,
        ymin,
        xmax,
        ymax,
        class: 1,
        difficult: false,
    }
}

fn distort() -> DistortParams {
    DistortParams {
        brightness_prob: r64(0.5),
        brightness_delta: r64(32.0),
        contrast_prob: r64(0.5),
        contrast_lower: r64(0.5),
        contrast_upper: r64(1.5),
        saturation_prob: r64(0.5),
        saturation_lower: r64(0.5),
        saturation_upper: r64(1.5),
        hue_prob: r64(0.5),
        hue_delta: r64(18.0),
        random_order_prob: r64(0.5),
    }
}

fn configs() -> Vec<TransformConfigInit> {
    vec![
        TransformConfigInit::default(),
        TransformConfigInit {
            crop_size: 16,
            mirror: true,
            ..Default::default()
        },
        TransformConfigInit {
            random_resize: Some(RandomResizeParams {
                lower: 12,
                upper: 40,
            }),
            ..Default::default()
        },
        TransformConfigInit {
            crop_size: 12,
            mirror: true,
            random_resize: Some(RandomResizeParams {
                lower: 16,
                upper: 40,
            }),
            random_crop: Some(14),
            ..Default::default()
        },
        TransformConfigInit {
            mean_values: vec![r64(104.0), r64(117.0), r64(123.0)],
            expand: Some(ExpandParams {
                prob: r64(0.5),
                min_ratio: r64(1.0),
                max_ratio: r64(3.0),
            }),
            resize: Some(ResizeParams {
                height: 20,
                width: 28,
                mode: ResizeMode::Letterbox,
                pad_value: r64(0.0),
            }),
            distort: Some(distort()),
            ..Default::default()
        },
        TransformConfigInit {
            center_crop: Some(20),
            distort: Some(distort()),
            ..Default::default()
        },
    ]
}

#[test]
fn inferred_shape_matches_output() -> Result<()> {
    let images = [gradient(24, 30, 3)?, gradient(31, 25, 3)?];

    for init in configs() {
        for phase in [Phase::Train, Phase::Test] {
            let mut pipeline = pipeline(init.clone(), phase, 7)?;

            for image in &images {
                let shape = infer_shape(&image.descriptor(), pipeline.config(), phase)?;
                for _ in 0..4 {
                    let output = pipeline.transform(&Sample::new(image.clone()))?;
                    let (n, c, h, w) = output.data.dim();
                    assert_eq!(output.record.shape, Shape::from([n, c, h, w]));
                    assert!(shape.is_compatible_with(&output.record.shape));
                    if shape.is_concrete() {
                        assert_eq!(shape, output.record.shape);
                    }
                }
            }
        }
    }

    Ok(())
}

#[test]
fn explicit_draw_is_reproducible() -> Result<()> {
    let init = TransformConfigInit {
        crop_size: 16,
        mirror: true,
        distort: Some(distort()),
        ..Default::default()
    };
    let sample = Sample::new(gradient(24, 30, 3)?);
    let draw = RandomDraw::new(1234, 5678, 3);

    let lhs = pipeline(init.clone(), Phase::Train, 3)?.transform_with(&sample, Some(draw))?;
    let rhs = pipeline(init, Phase::Train, 3)?.transform_with(&sample, Some(draw))?;
    assert_eq!(lhs, rhs);
    assert!(lhs.record.mirror);
    Ok(())
}

#[test]
fn mirror_is_an_involution() -> Result<()> {
    for (height, width, channels) in [(1, 1, 1), (3, 4, 3), (7, 2, 4)] {
        let grid = gradient(height, width, channels)?;
        assert_eq!(mirror(&mirror(&grid)), grid);
    }
    Ok(())
}

#[test]
fn contained_box_stays_visible() -> Result<()> {
    let init = TransformConfigInit {
        crop_size: 60,
        mirror: true,
        ..Default::default()
    };
    let sample = Sample::new(gradient(100, 100, 3)?)
        .with_annotations(vec![annotation(0.45, 0.45, 0.55, 0.55).to_annotation()?]);

    for seed in 0..8 {
        let output = pipeline(init.clone(), Phase::Train, seed)?.transform(&sample)?;
        assert_eq!(output.record.annotations.len(), 1);

        let record = AnnotationRecord::from(&output.record.annotations[0]);
        let cy = (record.ymin + record.ymax) / 2.0 * 60.0;
        let cx = (record.xmin + record.xmax) / 2.0 * 60.0;
        assert!((0.0..=60.0).contains(&cy));
        assert!((0.0..=60.0).contains(&cx));
        assert_abs_diff_eq!(record.xmax - record.xmin, 10.0 / 60.0, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn collapsed_boxes_are_dropped() -> Result<()> {
    let init = TransformConfigInit {
        crop_size: 80,
        ..Default::default()
    };
    let sample = Sample::new(gradient(100, 100, 3)?).with_annotations(vec![
        annotation(0.85, 0.85, 0.95, 0.95).to_annotation()?,
        annotation(0.8, 0.1, 0.9, 0.5).to_annotation()?,
        annotation(0.3, 0.3, 0.3, 0.6).to_annotation()?,
        annotation(0.1, 0.1, 0.5, 0.5).to_annotation()?,
    ]);
    let output = pipeline(init, Phase::Test, 0)?.transform_with(&sample, Some(RandomDraw::new(0, 0, 0)))?;
    assert_eq!(output.record.annotations.len(), 1);
    Ok(())
}

#[test]
fn annotation_follows_crop() -> Result<()> {
    let init = TransformConfigInit {
        crop_size: 80,
        mirror: true,
        ..Default::default()
    };
    let sample = Sample::new(gradient(100, 100, 3)?)
        .with_annotations(vec![annotation(0.1, 0.1, 0.5, 0.5).to_annotation()?]);
    let output = pipeline(init, Phase::Train, 0)?.transform_with(&sample, Some(RandomDraw::new(0, 0, 0)))?;

    assert!(!output.record.mirror);
    assert_eq!(output.record.annotations.len(), 1);
    let record = AnnotationRecord::from(&output.record.annotations[0]);
    assert_abs_diff_eq!(record.xmin, 0.125, epsilon = 1e-9);
    assert_abs_diff_eq!(record.ymin, 0.125, epsilon = 1e-9);
    assert_abs_diff_eq!(record.xmax, 0.625, epsilon = 1e-9);
    assert_abs_diff_eq!(record.ymax, 0.625, epsilon = 1e-9);
    assert_eq!(record.class, 1);

    let crop_box = AnnotationRecord::from(&data_transformer::Annotation {
        rect: output.record.crop_box,
        class: 0,
        difficult: false,
    });
    assert_abs_diff_eq!(crop_box.xmax, 0.8, epsilon = 1e-9);
    assert_abs_diff_eq!(crop_box.ymax, 0.8, epsilon = 1e-9);
    Ok(())
}

#[test]
fn fixed_crop_wins_over_random_resize() -> Result<()> {
    for (lower, upper) in [(32, 32), (40, 64), (100, 500)] {
        let config = TransformConfigInit {
            crop_size: 32,
            random_resize: Some(RandomResizeParams { lower, upper }),
            ..Default::default()
        }
        .build()?;

        for descriptor in [SampleDescriptor::new(50, 80, 3), SampleDescriptor::new(90, 33, 1)] {
            for phase in [Phase::Train, Phase::Test] {
                let shape = infer_shape(&descriptor, &config, phase)?;
                assert_eq!(shape, Shape::from([1, descriptor.channels, 32, 32]));
            }
        }
    }
    Ok(())
}

#[test]
fn disabled_transforms_are_identity() -> Result<()> {
    let image = gradient(5, 7, 3)?;
    let output = pipeline(TransformConfigInit::default(), Phase::Train, 0)?
        .transform(&Sample::new(image.clone()))?;
    assert_eq!(output.data.index_axis(Axis(0), 0), image.to_chw());

    let fractional = PixelGrid::new(
        Array3::from_shape_fn((4, 3, 2), |(y, x, c)| y as f32 * 0.25 - x as f32 + c as f32 / 3.0),
        ElementKind::F32,
    )?;
    let output = pipeline(
        TransformConfigInit {
            mean_values: vec![r64(0.0)],
            scale: r64(1.0),
            ..Default::default()
        },
        Phase::Test,
        0,
    )?
    .transform(&Sample::new(fractional.clone()))?;
    assert_eq!(output.data.index_axis(Axis(0), 0), fractional.to_chw());
    Ok(())
}

#[test]
fn mirrored_crop_end_to_end() -> Result<()> {
    let image = gradient(250, 300, 3)?;
    let init = TransformConfigInit {
        crop_size: 224,
        mirror: true,
        ..Default::default()
    };
    let output = pipeline(init, Phase::Train, 0)?
        .transform_with(&Sample::new(image.clone()), Some(RandomDraw::new(10, 5, 1)))?;

    assert_eq!(output.record.shape, Shape::from([1, 3, 224, 224]));
    let expect = mirror(&crop(&image, &PixelWindow::new(5, 10, 224, 224))?);
    assert_eq!(output.data.index_axis(Axis(0), 0), expect.to_chw());
    Ok(())
}

#[test]
fn crop_larger_than_image() -> Result<()> {
    let config = TransformConfigInit {
        crop_size: 224,
        mirror: true,
        ..Default::default()
    }
    .build()?;
    assert!(matches!(
        infer_shape(&SampleDescriptor::new(200, 300, 3), &config, Phase::Train),
        Err(Error::InvalidShape(_))
    ));
    Ok(())
}

#[test]
fn test_phase_ignores_seed() -> Result<()> {
    let init = TransformConfigInit {
        crop_size: 12,
        mirror: true,
        random_resize: Some(RandomResizeParams {
            lower: 16,
            upper: 40,
        }),
        random_crop: Some(14),
        expand: Some(ExpandParams {
            prob: r64(1.0),
            min_ratio: r64(1.0),
            max_ratio: r64(2.0),
        }),
        distort: Some(distort()),
        ..Default::default()
    };
    let sample = Sample::new(gradient(24, 30, 3)?);

    let mut lhs = pipeline(init.clone(), Phase::Test, 1)?;
    let mut rhs = pipeline(init, Phase::Test, 2)?;
    let first = lhs.transform(&sample)?;
    assert_eq!(first, lhs.transform(&sample)?);
    assert_eq!(first, rhs.transform(&sample)?);
    assert!(!first.record.mirror);
    assert!(!lhs.has_random_stream());
    Ok(())
}

#[test]
fn paired_label_map_shares_geometry() -> Result<()> {
    let image = gradient(10, 12, 3)?;
    let labels: Vec<u8> = (0..10 * 12).map(|index| (index % 5) as u8).collect();
    let label_map = PixelGrid::from_u8(10, 12, 1, &labels)?;
    let init = TransformConfigInit {
        crop_size: 8,
        mirror: true,
        label_fill: r64(255.0),
        ..Default::default()
    };

    let output = pipeline(init, Phase::Train, 4)?.transform_pair(
        &Sample::new(image.clone()),
        &label_map,
        Some(RandomDraw::new(1, 2, 1)),
    )?;
    let window = PixelWindow::new(2, 1, 8, 8);
    assert_eq!(
        output.image.index_axis(Axis(0), 0),
        mirror(&crop(&image, &window)?).to_chw()
    );
    assert_eq!(
        output.label_map.index_axis(Axis(0), 0),
        mirror(&crop(&label_map, &window)?).to_chw()
    );
    Ok(())
}

#[test]
fn letterbox_pads_label_map_with_fill() -> Result<()> {
    let image = gradient(4, 8, 3)?;
    let label_map = PixelGrid::from_u8(4, 8, 1, &[3; 32])?;
    let init = TransformConfigInit {
        resize: Some(ResizeParams {
            height: 8,
            width: 8,
            mode: ResizeMode::Letterbox,
            pad_value: r64(0.0),
        }),
        label_fill: r64(255.0),
        ..Default::default()
    };

    let output = pipeline(init, Phase::Test, 0)?.transform_pair(&Sample::new(image), &label_map, None)?;
    assert_eq!(output.label_map.dim(), (1, 1, 8, 8));
    assert_eq!(output.label_map[[0, 0, 0, 0]], 255.0);
    assert_eq!(output.label_map[[0, 0, 7, 7]], 255.0);
    assert_eq!(output.label_map[[0, 0, 4, 4]], 3.0);
    Ok(())
}

#[test]
fn mismatched_label_map_is_rejected() -> Result<()> {
    let mut pipeline = pipeline(TransformConfigInit::default(), Phase::Test, 0)?;
    let result = pipeline.transform_pair(
        &Sample::new(gradient(4, 4, 3)?),
        &PixelGrid::from_u8(4, 5, 1, &[0; 20])?,
        None,
    );
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    Ok(())
}
