//! Seeded random streams and per-invocation draws.

use crate::common::*;

/// Whether stochastic transforms are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Train,
    Test,
}

/// The random values consumed by the fixed-size crop and the mirror of one
/// invocation.
///
/// Values span the full `u32` range and are reduced by their consumer, so
/// the same draw can be shared by inputs of different sizes, such as an
/// image and its label map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RandomDraw {
    pub x: u32,
    pub y: u32,
    pub mirror: u32,
}

impl RandomDraw {
    pub fn new(x: u32, y: u32, mirror: u32) -> Self {
        Self { x, y, mirror }
    }

    /// Horizontal crop offset given the free margin along the width.
    pub fn offset_x(&self, margin: usize) -> usize {
        self.x as usize % (margin + 1)
    }

    /// Vertical crop offset given the free margin along the height.
    pub fn offset_y(&self, margin: usize) -> usize {
        self.y as usize % (margin + 1)
    }

    pub fn mirror_bit(&self) -> bool {
        self.mirror % 2 == 1
    }
}

/// Identifies the sub-stream a step draws from.
///
/// Each step owns a slot, so whether one step is enabled never changes the
/// values another step observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum StepSlot {
    Draw = 0,
    RandomResize = 1,
    RandomCrop = 2,
    Expand = 3,
    Distort = 4,
}

/// A seeded generator owned by one pipeline instance.
///
/// It is not shared between threads. Concurrent workers each own a stream,
/// seeded for example by [derive_seed] from an experiment seed and the
/// worker index.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: ChaCha8Rng,
}

impl RandomStream {
    pub fn seeded_init(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub(crate) fn for_step(seed: u64, slot: StepSlot) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(slot as u64);
        Self { rng }
    }

    /// A uniform value over the full `u32` range.
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// A uniform value in `0..n`.
    pub fn next_bounded(&mut self, n: u32) -> Result<u32> {
        ensure_kind!(n > 0, InvalidArgument, "the upper bound must be positive");
        Ok(self.rng.gen_range(0..n))
    }

    /// A uniform real value in `lo..hi`, or `lo` if the range is empty.
    pub fn next_uniform(&mut self, lo: f32, hi: f32) -> f32 {
        if lo < hi {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    pub fn next_draw(&mut self) -> RandomDraw {
        RandomDraw {
            x: self.next_u32(),
            y: self.next_u32(),
            mirror: self.next_u32(),
        }
    }

    /// Produce the seed of an independent stream for one sample.
    pub fn fork(&mut self) -> u64 {
        self.rng.next_u64()
    }

    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.rng);
    }
}

/// Derive a worker seed from an experiment-wide seed.
pub fn derive_seed(base_seed: u64, worker_index: u64) -> u64 {
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
    rng.set_stream(worker_index);
    rng.next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_is_reproducible() {
        let mut lhs = RandomStream::seeded_init(7);
        let mut rhs = RandomStream::seeded_init(7);
        let lhs_values: Vec<_> = (0..16).map(|_| lhs.next_u32()).collect();
        let rhs_values: Vec<_> = (0..16).map(|_| rhs.next_u32()).collect();
        assert_eq!(lhs_values, rhs_values);
    }

    #[test]
    fn bounded_values_stay_in_range() -> Result<()> {
        let mut stream = RandomStream::seeded_init(1);
        for _ in 0..1000 {
            assert!(stream.next_bounded(5)? < 5);
        }
        assert!(matches!(
            stream.next_bounded(0),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn step_slots_are_independent() {
        let mut crop = RandomStream::for_step(3, StepSlot::RandomCrop);
        let mut expand = RandomStream::for_step(3, StepSlot::Expand);
        let mut crop_again = RandomStream::for_step(3, StepSlot::RandomCrop);
        let first = crop.next_u32();
        assert_eq!(first, crop_again.next_u32());
        assert_ne!(first, expand.next_u32());
    }

    #[test]
    fn draw_reduction() {
        let draw = RandomDraw::new(10, 5, 1);
        assert_eq!(draw.offset_x(76), 10);
        assert_eq!(draw.offset_y(26), 5);
        assert_eq!(draw.offset_x(4), 0);
        assert_eq!(draw.offset_x(0), 0);
        assert!(draw.mirror_bit());
        assert!(!RandomDraw::new(0, 0, 2).mirror_bit());
    }

    #[test]
    fn worker_seeds_differ() {
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_eq!(derive_seed(42, 3), derive_seed(42, 3));
    }
}
