use super::Rect;
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Num + Copy,
{
    /// The box spanning `[0, 1]` along both axes.
    pub fn unit() -> Self {
        Self {
            t: T::zero(),
            l: T::zero(),
            b: T::one(),
            r: T::one(),
        }
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Map the box through the transform.
    ///
    /// A negative scale swaps the sides, so the sides are reordered to
    /// keep `t <= b` and `l <= r`.
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        let order = |lhs: T, rhs: T| if lhs <= rhs { (lhs, rhs) } else { (rhs, lhs) };
        let (t, b) = order(
            self.t * transform.sy + transform.ty,
            self.b * transform.sy + transform.ty,
        );
        let (l, r) = order(
            self.l * transform.sx + transform.tx,
            self.r * transform.sx + transform.tx,
        );
        TLBR { t, l, b, r }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn cy(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let two = T::one() + T::one();
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");
        Ok(Self { t, l, b, r })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;

    #[test]
    fn tlbr_rejects_inverted_sides() {
        assert!(TLBR::try_from_tlbr([0.5, 0.0, 0.2, 1.0]).is_err());
        assert!(TLBR::try_from_tlbr([0.0, 0.5, 1.0, 0.2]).is_err());
    }

    #[test]
    fn tlbr_transform_reorders_flipped_sides() -> Result<()> {
        let rect = TLBR::try_from_tlbr([0.125, 0.125, 0.5, 0.25])?;
        let flipped = rect.transform(&Transform::flip_horizontal(1.0));
        assert_eq!(flipped.tlbr(), [0.125, 0.75, 0.5, 0.875]);
        Ok(())
    }
}
