pub use std::fmt;
