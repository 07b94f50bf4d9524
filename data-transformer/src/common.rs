pub use crate::error::{Error, Result};
pub use bbox::{prelude::*, Transform, HW, TLBR};
pub use derivative::Derivative;
pub use getset::{CopyGetters, Getters};
pub use itertools::{izip, Itertools as _};
pub use label::Label;
pub use log::{debug, trace};
pub use ndarray::{
    s, Array3, Array4, ArrayView3, ArrayView4, ArrayViewMut3, ArrayViewMut4, Axis,
};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use rand_chacha::ChaCha8Rng;
pub use serde::{Deserialize, Serialize};
pub use std::{path::Path, sync::Arc};
pub use tensor_shape::{Dim, Shape};
pub(crate) use crate::error::ensure_kind;
