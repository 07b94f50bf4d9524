//! Class-labeled bounding boxes.

use bbox::{Rect, Transform, TLBR};
use num_traits::Num;
use std::ops::Mul;

/// A bounding box with its class id and a difficult/ignore flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
    pub difficult: bool,
}

impl<R, C> Label<R, C>
where
    R: Rect,
{
    /// Replace the rectangle, keeping the class and the flag.
    pub fn with_rect<S>(&self, rect: S) -> Label<S, C>
    where
        S: Rect,
        C: Clone,
    {
        Label {
            rect,
            class: self.class.clone(),
            difficult: self.difficult,
        }
    }
}

impl<'a, T, C> Mul<&'a Label<TLBR<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Clone,
{
    type Output = Label<TLBR<T>, C>;

    fn mul(self, rhs: &'a Label<TLBR<T>, C>) -> Self::Output {
        rhs.with_rect(self * &rhs.rect)
    }
}
