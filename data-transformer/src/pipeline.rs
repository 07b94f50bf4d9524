//! The per-sample transform pipeline.

use crate::{
    annotation::AnnotationAdjuster,
    common::*,
    config::{MeanSource, TransformConfig},
    geometry::{GeometryOp, Interpolation},
    normalize::{self, Mean},
    random::{Phase, RandomDraw, RandomStream, StepSlot},
    sample::{Annotation, ElementKind, NormalizedBox, PixelGrid, Sample, SampleDescriptor},
    shape::{self, mean_anchor},
    step::StepContext,
};

/// The progress of the last invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Configured,
    ShapeResolved,
    Transformed,
    Done,
    Failed,
}

/// What one invocation did, besides producing the tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRecord {
    /// The concrete `[1, C, H, W]` shape of the output.
    pub shape: Shape,
    pub mirror: bool,
    /// The part of the input visible in the output, normalized by the
    /// input size.
    pub crop_box: NormalizedBox,
    /// The draw that positioned the fixed crop and decided the mirror.
    pub draw: Option<RandomDraw>,
    pub annotations: Vec<Annotation>,
    pub label: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    /// Tensor in `[1, C, H, W]` layout.
    pub data: Array4<f32>,
    pub record: TransformRecord,
}

/// An image and its label map transformed with the same geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutput {
    pub image: Array4<f32>,
    /// Label map in `[1, C, H, W]` layout, neither distorted nor normalized.
    pub label_map: Array4<f32>,
    pub record: TransformRecord,
}

/// The random inputs of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SampleRandomness {
    pub seed: Option<u64>,
    pub draw: Option<RandomDraw>,
}

/// A sample after the geometric and photometric steps, before it is
/// normalized into a destination.
#[derive(Debug, Clone)]
pub(crate) struct Executed {
    pub grid: PixelGrid,
    pub mean: Mean,
    pub ops: Vec<GeometryOp>,
    pub record: TransformRecord,
}

/// Turns samples into tensors following one configuration.
///
/// An instance owns its random stream and must not be shared by threads;
/// each worker creates its own from the shared configuration.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    config: Arc<TransformConfig>,
    phase: Phase,
    seed: u64,
    rng: Option<RandomStream>,
    adjuster: AnnotationAdjuster,
    state: PipelineState,
}

impl TransformPipeline {
    pub fn new(config: Arc<TransformConfig>, phase: Phase, seed: u64) -> Self {
        debug!(
            "create pipeline with steps [{}] in {:?} phase, random stream {}",
            config.steps().iter().map(|step| step.kind()).join(", "),
            phase,
            if config.needs_random(phase) {
                "enabled"
            } else {
                "disabled"
            }
        );
        let adjuster = AnnotationAdjuster::new(config.emit_constraint());

        Self {
            config,
            phase,
            seed,
            rng: None,
            adjuster,
            state: PipelineState::Configured,
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the random stream has been created.
    pub fn has_random_stream(&self) -> bool {
        self.rng.is_some()
    }

    /// Compute the output shape for an image of the given dimensions.
    pub fn infer_shape(&mut self, descriptor: &SampleDescriptor) -> Result<Shape> {
        self.transition(PipelineState::Configured);
        let result = shape::infer_shape(descriptor, &self.config, self.phase);
        match &result {
            Ok(_) => self.transition(PipelineState::ShapeResolved),
            Err(_) => self.transition(PipelineState::Failed),
        }
        result
    }

    /// Transform a sample into a newly allocated tensor.
    pub fn transform(&mut self, sample: &Sample) -> Result<TransformOutput> {
        self.transform_with(sample, None)
    }

    /// Transform a sample, taking the crop position and mirror from `draw`
    /// when given.
    pub fn transform_with(
        &mut self,
        sample: &Sample,
        draw: Option<RandomDraw>,
    ) -> Result<TransformOutput> {
        let randomness = self.next_randomness(draw);
        let result = self.resolve_and_run(sample, randomness).and_then(|executed| {
            let Executed {
                grid, mean, record, ..
            } = executed;
            let mut data = Array4::zeros((1, grid.channels(), grid.height(), grid.width()));
            normalize::normalize_into(
                &grid,
                &mean,
                self.config.scale(),
                data.index_axis_mut(Axis(0), 0),
            )?;
            Ok(TransformOutput { data, record })
        });
        self.finish(result)
    }

    /// Transform a sample into a caller-allocated `[1, C, H, W]`
    /// destination.
    ///
    /// The destination content is invalid if an error is returned.
    pub fn transform_into(
        &mut self,
        sample: &Sample,
        draw: Option<RandomDraw>,
        mut dest: ArrayViewMut4<f32>,
    ) -> Result<TransformRecord> {
        let randomness = self.next_randomness(draw);
        let result = self.resolve_and_run(sample, randomness).and_then(|executed| {
            let expect = executed.record.shape.to_sizes().unwrap_or_default();
            if dest.shape() != expect.as_slice() {
                return Err(Error::ShapeMismatch {
                    expect,
                    actual: dest.shape().to_vec(),
                });
            }
            self.write(&executed, dest.index_axis_mut(Axis(0), 0))?;
            Ok(executed.record)
        });
        self.finish(result)
    }

    /// Transform an image and its label map with the same geometry.
    ///
    /// The label map is resampled with nearest-neighbor interpolation and
    /// padded with the configured label fill. It is neither distorted nor
    /// normalized.
    pub fn transform_pair(
        &mut self,
        sample: &Sample,
        label_map: &PixelGrid,
        draw: Option<RandomDraw>,
    ) -> Result<PairOutput> {
        let randomness = self.next_randomness(draw);
        let result = (|| -> Result<PairOutput> {
            let image = &sample.image;
            if image.height() != label_map.height() || image.width() != label_map.width() {
                return Err(Error::ShapeMismatch {
                    expect: vec![image.height(), image.width()],
                    actual: vec![label_map.height(), label_map.width()],
                });
            }

            let executed = self.resolve_and_run(sample, randomness)?;
            let fill = [self.config.label_fill()];
            let label_grid = executed.ops.iter().try_fold(label_map.clone(), |grid, op| {
                op.replay(&grid, Interpolation::Nearest, &fill)
            })?;

            let grid = &executed.grid;
            let mut image = Array4::zeros((1, grid.channels(), grid.height(), grid.width()));
            self.write(&executed, image.index_axis_mut(Axis(0), 0))?;
            let label_map = label_grid.to_chw().insert_axis(Axis(0));

            Ok(PairOutput {
                image,
                label_map,
                record: executed.record,
            })
        })();
        self.finish(result)
    }

    /// Undo the mean subtraction and scaling of one `[C, H, W]` output.
    pub fn restore(&self, chw: ArrayView3<f32>) -> Result<PixelGrid> {
        let means = match self.config.mean() {
            MeanSource::Image(_) => {
                return Err(Error::InvalidConfiguration(
                    "outputs normalized by a mean image cannot be restored".into(),
                ))
            }
            MeanSource::None => vec![],
            values => values.channel_values(chw.dim().0),
        };
        normalize::denormalize(chw, &means, self.config.scale(), ElementKind::F32)
    }

    /// Draw the random inputs of the next sample.
    ///
    /// The stream is created on first use, and only if the configuration
    /// consumes randomness in this phase.
    pub(crate) fn next_randomness(&mut self, draw: Option<RandomDraw>) -> SampleRandomness {
        if !self.config.needs_random(self.phase) {
            return SampleRandomness { seed: None, draw };
        }

        let seed = self.init_rand().fork();
        let draw = draw.or_else(|| Some(RandomStream::for_step(seed, StepSlot::Draw).next_draw()));
        SampleRandomness {
            seed: Some(seed),
            draw,
        }
    }

    fn init_rand(&mut self) -> &mut RandomStream {
        let seed = self.seed;
        self.rng.get_or_insert_with(|| {
            debug!("initialize random stream with seed {}", seed);
            RandomStream::seeded_init(seed)
        })
    }

    fn resolve_and_run(&mut self, sample: &Sample, randomness: SampleRandomness) -> Result<Executed> {
        self.transition(PipelineState::Configured);
        let inferred = shape::infer_shape(&sample.descriptor(), &self.config, self.phase)?;
        self.transition(PipelineState::ShapeResolved);
        let executed = self.run(sample, randomness)?;
        ensure_kind!(
            inferred.is_compatible_with(&executed.record.shape),
            InvalidShape,
            "the output shape {} does not match the inferred shape {}",
            executed.record.shape,
            inferred
        );
        self.transition(PipelineState::Transformed);
        Ok(executed)
    }

    /// Apply the steps to one sample. The output shape must have been
    /// validated by shape inference.
    pub(crate) fn run(&self, sample: &Sample, randomness: SampleRandomness) -> Result<Executed> {
        let channels = sample.image.channels();
        let mean_fill = self.config.mean().channel_values(channels);
        let steps = self.config.steps();
        let anchor = mean_anchor(steps);

        let mut ctx = StepContext::new(randomness.seed, randomness.draw, &mean_fill);
        let mut mean_ops_begin = 0;
        let mut grid = sample.image.clone();

        for (index, step) in steps.iter().enumerate() {
            if index == anchor {
                mean_ops_begin = ctx.ops.len();
            }
            grid = step.apply(grid, &mut ctx)?;
        }
        if anchor == steps.len() {
            mean_ops_begin = ctx.ops.len();
        }

        let mean = match self.config.mean() {
            MeanSource::None => Mean::Zero,
            MeanSource::Values(_) => Mean::Channels(mean_fill.clone()),
            MeanSource::Image(image) => {
                let aligned = ctx.ops[mean_ops_begin..]
                    .iter()
                    .try_fold(image.clone(), |mean, op| {
                        op.replay(&mean, Interpolation::Bilinear, &[])
                    })?;
                Mean::Image(aligned)
            }
        };

        let transform = ctx
            .ops
            .iter()
            .fold(Transform::identity(), |acc, op| &op.box_transform() * &acc);
        let crop_box = (&transform.inverse() * &NormalizedBox::unit()).clip_to(&NormalizedBox::unit());

        let annotations = self.adjuster.replay(&sample.annotations, &ctx.ops);
        if !sample.annotations.is_empty() {
            debug!(
                "keep {} of {} annotations",
                annotations.len(),
                sample.annotations.len()
            );
        }

        let record = TransformRecord {
            shape: Shape::from([1, grid.channels(), grid.height(), grid.width()]),
            mirror: ctx.mirrored,
            crop_box,
            draw: randomness.draw,
            annotations,
            label: sample.label,
        };

        Ok(Executed {
            grid,
            mean,
            ops: ctx.ops,
            record,
        })
    }

    pub(crate) fn write(&self, executed: &Executed, dest: ArrayViewMut3<f32>) -> Result<()> {
        normalize::normalize_into(&executed.grid, &executed.mean, self.config.scale(), dest)
    }

    pub(crate) fn transition(&mut self, state: PipelineState) {
        trace!("pipeline state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub(crate) fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.transition(PipelineState::Done),
            Err(err) => {
                debug!("transform failed: {}", err);
                self.transition(PipelineState::Failed);
            }
        }
        result
    }
}
