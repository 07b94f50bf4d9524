use super::TLBR;
use crate::common::*;

/// The generic axis-aligned rectangle.
///
/// Coordinates follow the image convention: `t`/`b` run along the
/// height axis and `l`/`r` along the width axis.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd + Copy,
{
    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn area(&self) -> Self::Type {
        self.h() * self.w()
    }

    /// Whether the rectangle has no positive extent along either axis.
    fn is_empty(&self) -> bool {
        !(self.b() > self.t() && self.r() > self.l())
    }

    /// Whether the point lies inside the rectangle, borders included.
    fn contains_point(&self, y: Self::Type, x: Self::Type) -> bool {
        self.t() <= y && y <= self.b() && self.l() <= x && x <= self.r()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    fn intersect_with<R>(&self, other: &R) -> Option<TLBR<Self::Type>>
    where
        R: Rect<Type = Self::Type>,
    {
        let t = self.t().max(other.t());
        let l = self.l().max(other.l());
        let b = self.b().min(other.b());
        let r = self.r().min(other.r());
        (b > t && r > l).then(|| TLBR { t, l, b, r })
    }

    fn intersection_area_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        self.intersect_with(other)
            .map(|rect| rect.area())
            .unwrap_or_else(Self::Type::zero)
    }

    /// The fraction of this rectangle's area covered by the other one.
    fn coverage_by<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        let area = self.area();
        if area <= Self::Type::zero() {
            return Self::Type::zero();
        }
        self.intersection_area_with(other) / area
    }

    /// Clamp every side into the bounds. The result may have zero extent.
    fn clip_to<R>(&self, bounds: &R) -> TLBR<Self::Type>
    where
        R: Rect<Type = Self::Type>,
    {
        let clamp = |val: Self::Type, lo: Self::Type, up: Self::Type| val.max(lo).min(up);
        TLBR {
            t: clamp(self.t(), bounds.t(), bounds.b()),
            l: clamp(self.l(), bounds.l(), bounds.r()),
            b: clamp(self.b(), bounds.t(), bounds.b()),
            r: clamp(self.r(), bounds.l(), bounds.r()),
        }
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd + Copy,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}
