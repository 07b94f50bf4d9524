use crate::common::*;

/// One tensor dimension, either a known size or a size only known after
/// the data is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Size(usize),
    Infer,
}

impl Dim {
    pub fn size(&self) -> Option<usize> {
        Option::<usize>::from(*self)
    }

    pub fn is_infer(&self) -> bool {
        matches!(self, Self::Infer)
    }

    pub fn is_compatible_with(&self, other: &Dim) -> bool {
        match (self, other) {
            (Self::Size(lhs), Self::Size(rhs)) => lhs == rhs,
            _ => true,
        }
    }
}

impl From<usize> for Dim {
    fn from(from: usize) -> Self {
        Self::Size(from)
    }
}

impl From<Option<usize>> for Dim {
    fn from(from: Option<usize>) -> Self {
        match from {
            Some(size) => Self::Size(size),
            None => Self::Infer,
        }
    }
}

impl From<Dim> for Option<usize> {
    fn from(from: Dim) -> Self {
        match from {
            Dim::Size(size) => Some(size),
            Dim::Infer => None,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "{}", size),
            Self::Infer => f.write_str("_"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_conversion() {
        assert_eq!(Dim::from(Some(3)), Dim::Size(3));
        assert_eq!(Dim::from(None), Dim::Infer);
        assert_eq!(Dim::Infer.size(), None);
        assert!(Dim::Size(2).is_compatible_with(&Dim::Infer));
        assert!(!Dim::Size(2).is_compatible_with(&Dim::Size(3)));
        assert_eq!(Dim::Infer.to_string(), "_");
    }
}
