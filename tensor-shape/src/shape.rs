use crate::{common::*, dim::Dim};

/// A tensor shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<Dim>);

impl Shape {
    /// Whether every dimension is a known size.
    pub fn is_concrete(&self) -> bool {
        self.0.iter().all(|dim| !dim.is_infer())
    }

    /// The sizes of all dimensions, if all of them are known.
    pub fn to_sizes(&self) -> Option<Vec<usize>> {
        self.0.iter().map(Dim::size).collect()
    }

    pub fn is_compatible_with(&self, other: &Shape) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(lhs, rhs)| lhs.is_compatible_with(rhs))
    }

    /// Replace the leading dimension.
    pub fn with_batch_size(&self, batch_size: usize) -> Shape {
        let mut dims = self.0.clone();
        if let Some(first) = dims.first_mut() {
            *first = Dim::Size(batch_size);
        }
        Shape(dims)
    }
}

impl<const SIZE: usize> From<[Dim; SIZE]> for Shape {
    fn from(from: [Dim; SIZE]) -> Self {
        Self(from.into())
    }
}

impl<const SIZE: usize> From<[usize; SIZE]> for Shape {
    fn from(from: [usize; SIZE]) -> Self {
        Self(from.iter().cloned().map(Dim::from).collect())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, dim) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", dim)?;
        }
        f.write_str("]")
    }
}
