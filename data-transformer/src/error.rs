//! Error kinds reported by the transformer.

/// The error type of this crate.
///
/// Every error is local and synchronous: it is returned from the call that
/// triggered it and nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Contradictory or unachievable configuration, detected when the
    /// configuration is built or when it meets a concrete sample.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The configuration cannot produce the requested output shape.
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A crop or box falls outside of the image.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A destination buffer does not match the shape the transform produces.
    #[error("shape mismatch: expect {expect:?}, but get {actual:?}")]
    ShapeMismatch {
        expect: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error(transparent)]
    Codec(#[from] image::ImageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Return early with the given error kind if the condition does not hold.
macro_rules! ensure_kind {
    ($cond:expr, $kind:ident, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::$kind(format!($($arg)+)));
        }
    };
}
pub(crate) use ensure_kind;
