//! Samples, pixel grids and annotations.

use crate::common::*;

/// A box in coordinates normalized to `[0, 1]` by the image size.
pub type NormalizedBox = TLBR<R64>;

/// A normalized box with its class id and difficult flag.
pub type Annotation = Label<NormalizedBox, i32>;

/// The element type the pixel values originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    U8,
    F32,
}

/// Image dimensions, enough to infer the output shape without pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleDescriptor {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl SampleDescriptor {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }
}

/// Pixel values in height × width × channel layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    data: Array3<f32>,
    kind: ElementKind,
}

impl PixelGrid {
    pub fn new(data: Array3<f32>, kind: ElementKind) -> Result<Self> {
        let (height, width, channels) = data.dim();
        ensure_kind!(
            height > 0 && width > 0 && channels > 0,
            InvalidArgument,
            "image must not be empty, but get {}x{}x{}",
            height,
            width,
            channels
        );
        Ok(Self { data, kind })
    }

    /// Build a grid from interleaved 8-bit values in row-major order.
    pub fn from_u8(height: usize, width: usize, channels: usize, values: &[u8]) -> Result<Self> {
        let values: Vec<f32> = values.iter().map(|&val| val as f32).collect();
        let data = Array3::from_shape_vec((height, width, channels), values).map_err(|err| {
            Error::InvalidArgument(format!(
                "{} values cannot form a {}x{}x{} image: {}",
                height * width * channels,
                height,
                width,
                channels,
                err
            ))
        })?;
        Self::new(data, ElementKind::U8)
    }

    /// Build a grid from one channel-major slice of a stacked tensor.
    pub fn from_chw(chw: ArrayView3<f32>, kind: ElementKind) -> Result<Self> {
        let data = chw.permuted_axes([1, 2, 0]).as_standard_layout().into_owned();
        Self::new(data, kind)
    }

    /// A grid with every pixel set to the per-channel values.
    pub fn filled(height: usize, width: usize, values: &[f32], kind: ElementKind) -> Result<Self> {
        let mut data = Array3::zeros((height, width, values.len()));
        data.axis_iter_mut(Axis(2))
            .zip(values)
            .for_each(|(mut channel, &value)| channel.fill(value));
        Self::new(data, kind)
    }

    pub(crate) fn from_parts(data: Array3<f32>, kind: ElementKind) -> Self {
        Self { data, kind }
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f32> {
        self.data
    }

    pub fn descriptor(&self) -> SampleDescriptor {
        SampleDescriptor::new(self.height(), self.width(), self.channels())
    }

    /// The values in channel × height × width layout.
    pub fn to_chw(&self) -> Array3<f32> {
        self.data
            .view()
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned()
    }
}

/// One unit of input: an image with an optional label and annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: PixelGrid,
    pub label: Option<i32>,
    pub annotations: Vec<Annotation>,
}

impl Sample {
    pub fn new(image: PixelGrid) -> Self {
        Self {
            image,
            label: None,
            annotations: vec![],
        }
    }

    pub fn with_label(mut self, label: i32) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn descriptor(&self) -> SampleDescriptor {
        self.image.descriptor()
    }
}
