//! Applying one pipeline across a batch.

use crate::{
    common::*,
    pipeline::{Executed, PipelineState, SampleRandomness, TransformPipeline, TransformRecord},
    random::RandomDraw,
    sample::{ElementKind, PixelGrid, Sample, SampleDescriptor},
    shape::infer_batch_shape,
};
use rayon::prelude::*;

/// Where the samples of a batch are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// One sample after another on the calling thread.
    #[derivative(Default)]
    Sequential,
    /// Samples spread over the rayon thread pool.
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    /// Tensor in `[N, C, H, W]` layout.
    pub data: Array4<f32>,
    pub records: Vec<TransformRecord>,
}

/// Drives a [TransformPipeline] over batches.
///
/// Every sample gets its own random draw unless a shared draw is given.
/// The per-sample seeds are taken from the pipeline's stream before any
/// sample runs, so both backends produce identical output, and a sample
/// transformed in a batch equals the same sample transformed alone by a
/// pipeline in the same stream position.
#[derive(Debug, Clone)]
pub struct BatchAdapter {
    pipeline: TransformPipeline,
    backend: Backend,
}

impl BatchAdapter {
    pub fn new(pipeline: TransformPipeline, backend: Backend) -> Self {
        Self { pipeline, backend }
    }

    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn into_pipeline(self) -> TransformPipeline {
        self.pipeline
    }

    /// Transform the samples into a newly allocated batch tensor.
    pub fn transform_batch(
        &mut self,
        samples: &[Sample],
        shared_draw: Option<RandomDraw>,
    ) -> Result<BatchOutput> {
        let result = self.resolve_batch(samples).and_then(|sizes| {
            let randomness = self.draw_randomness(samples.len(), shared_draw);
            let executed = self.run_all(samples, &randomness)?;
            let mut data = Array4::zeros((sizes[0], sizes[1], sizes[2], sizes[3]));
            self.write_all(&executed, data.view_mut())?;
            let records = executed.into_iter().map(|executed| executed.record).collect();
            Ok(BatchOutput { data, records })
        });
        self.pipeline.finish(result)
    }

    /// Transform the samples into a caller-allocated `[N, C, H, W]`
    /// destination.
    pub fn transform_batch_into(
        &mut self,
        samples: &[Sample],
        shared_draw: Option<RandomDraw>,
        dest: ArrayViewMut4<f32>,
    ) -> Result<Vec<TransformRecord>> {
        let result = self.resolve_batch(samples).and_then(|sizes| {
            if dest.shape() != sizes.as_slice() {
                return Err(Error::ShapeMismatch {
                    expect: sizes,
                    actual: dest.shape().to_vec(),
                });
            }
            let randomness = self.draw_randomness(samples.len(), shared_draw);
            let executed = self.run_all(samples, &randomness)?;
            self.write_all(&executed, dest)?;
            Ok(executed.into_iter().map(|executed| executed.record).collect())
        });
        self.pipeline.finish(result)
    }

    /// Transform a pre-stacked `[N, C, H, W]` tensor, treating each slice
    /// along the batch axis as one sample.
    pub fn transform_stacked(
        &mut self,
        input: ArrayView4<f32>,
        kind: ElementKind,
        shared_draw: Option<RandomDraw>,
    ) -> Result<BatchOutput> {
        let samples: Vec<Sample> = input
            .outer_iter()
            .map(|chw| Ok(Sample::new(PixelGrid::from_chw(chw, kind)?)))
            .collect::<Result<_>>()?;
        self.transform_batch(&samples, shared_draw)
    }

    fn resolve_batch(&mut self, samples: &[Sample]) -> Result<Vec<usize>> {
        self.pipeline.transition(PipelineState::Configured);
        let descriptors: Vec<SampleDescriptor> = samples.iter().map(Sample::descriptor).collect();
        let shape = infer_batch_shape(
            &descriptors,
            self.pipeline.config(),
            self.pipeline.phase(),
        )?;
        let sizes = shape.to_sizes().ok_or_else(|| {
            Error::InvalidShape(format!(
                "a batch requires a fixed output shape, but the configuration infers {}",
                shape
            ))
        })?;
        self.pipeline.transition(PipelineState::ShapeResolved);
        Ok(sizes)
    }

    fn draw_randomness(
        &mut self,
        len: usize,
        shared_draw: Option<RandomDraw>,
    ) -> Vec<SampleRandomness> {
        (0..len)
            .map(|_| self.pipeline.next_randomness(shared_draw))
            .collect()
    }

    fn run_all(
        &mut self,
        samples: &[Sample],
        randomness: &[SampleRandomness],
    ) -> Result<Vec<Executed>> {
        let pipeline = &self.pipeline;
        let executed: Vec<Executed> = match self.backend {
            Backend::Sequential => samples
                .iter()
                .zip(randomness)
                .map(|(sample, &randomness)| pipeline.run(sample, randomness))
                .collect::<Result<_>>()?,
            Backend::Parallel => samples
                .par_iter()
                .zip(randomness.par_iter())
                .map(|(sample, &randomness)| pipeline.run(sample, randomness))
                .collect::<Result<_>>()?,
        };
        self.pipeline.transition(PipelineState::Transformed);
        Ok(executed)
    }

    fn write_all(&self, executed: &[Executed], mut dest: ArrayViewMut4<f32>) -> Result<()> {
        let pipeline = &self.pipeline;
        match self.backend {
            Backend::Sequential => executed
                .iter()
                .zip(dest.outer_iter_mut())
                .try_for_each(|(executed, dest)| pipeline.write(executed, dest)),
            Backend::Parallel => executed
                .par_iter()
                .zip(dest.outer_iter_mut().into_par_iter())
                .try_for_each(|(executed, dest)| pipeline.write(executed, dest)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TransformConfigInit, random::Phase};

    fn samples(count: usize, height: usize, width: usize) -> Result<Vec<Sample>> {
        (0..count)
            .map(|index| {
                let values: Vec<u8> = (0..height * width * 3)
                    .map(|value| ((value * 13 + index * 31) % 256) as u8)
                    .collect();
                Ok(Sample::new(PixelGrid::from_u8(height, width, 3, &values)?).with_label(index as i32))
            })
            .collect()
    }

    fn adapter(backend: Backend) -> Result<BatchAdapter> {
        let config = TransformConfigInit {
            crop_size: 8,
            mirror: true,
            ..Default::default()
        }
        .build()?;
        let pipeline = TransformPipeline::new(Arc::new(config), Phase::Train, 17);
        Ok(BatchAdapter::new(pipeline, backend))
    }

    #[test]
    fn batch_layout() -> Result<()> {
        let mut adapter = adapter(Backend::Sequential)?;
        let output = adapter.transform_batch(&samples(4, 12, 10)?, None)?;
        assert_eq!(output.data.dim(), (4, 3, 8, 8));
        assert_eq!(output.records.len(), 4);
        assert_eq!(output.records[2].label, Some(2));
        assert_eq!(adapter.pipeline().state(), PipelineState::Done);
        Ok(())
    }

    #[test]
    fn backends_agree() -> Result<()> {
        let samples = samples(6, 12, 10)?;
        let sequential = adapter(Backend::Sequential)?.transform_batch(&samples, None)?;
        let parallel = adapter(Backend::Parallel)?.transform_batch(&samples, None)?;
        assert_eq!(sequential, parallel);
        Ok(())
    }

    #[test]
    fn shared_draw_applies_to_every_sample() -> Result<()> {
        let draw = RandomDraw::new(1, 2, 1);
        let output = adapter(Backend::Parallel)?.transform_batch(&samples(3, 12, 10)?, Some(draw))?;
        assert!(output
            .records
            .iter()
            .all(|record| record.draw == Some(draw) && record.mirror));
        Ok(())
    }

    #[test]
    fn destination_is_checked() -> Result<()> {
        let mut adapter = adapter(Backend::Sequential)?;
        let mut dest = Array4::zeros((2, 3, 8, 8));
        assert!(matches!(
            adapter.transform_batch_into(&samples(3, 12, 10)?, None, dest.view_mut()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert_eq!(adapter.pipeline().state(), PipelineState::Failed);
        Ok(())
    }

    #[test]
    fn stacked_input() -> Result<()> {
        let input = Array4::from_shape_fn((2, 3, 12, 10), |(n, c, y, x)| (n + c + y + x) as f32);
        let output = adapter(Backend::Sequential)?.transform_stacked(input.view(), ElementKind::F32, None)?;
        assert_eq!(output.data.dim(), (2, 3, 8, 8));
        Ok(())
    }

    #[test]
    fn random_shape_cannot_be_batched() -> Result<()> {
        let config = TransformConfigInit {
            random_resize: Some(crate::config::RandomResizeParams {
                lower: 8,
                upper: 16,
            }),
            ..Default::default()
        }
        .build()?;
        let pipeline = TransformPipeline::new(Arc::new(config), Phase::Train, 0);
        let mut adapter = BatchAdapter::new(pipeline, Backend::Sequential);
        assert!(matches!(
            adapter.transform_batch(&samples(2, 12, 10)?, None),
            Err(Error::InvalidShape(_))
        ));
        Ok(())
    }
}
