use super::{Rect, TLBR};
use crate::{common::*, HW};

/// Per-axis scale followed by a translation.
///
/// A point `(y, x)` maps to `(y * sy + ty, x * sx + tx)`. Composition
/// with `*` applies the right-hand side first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn identity() -> Self {
        Self {
            sy: T::one(),
            sx: T::one(),
            ty: T::zero(),
            tx: T::zero(),
        }
    }

    /// The transform mapping `src` onto `tgt`.
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// The transform re-expressing coordinates relative to `window`, so
    /// that the window itself becomes the unit box.
    pub fn project_into<R>(window: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let window = TLBR {
            t: window.t(),
            l: window.l(),
            b: window.b(),
            r: window.r(),
        };
        Self::from_rects(&window, &TLBR::unit())
    }

    /// The transform placing the unit box at `placement`.
    pub fn place_at<R>(placement: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let placement = TLBR {
            t: placement.t(),
            l: placement.l(),
            b: placement.b(),
            r: placement.r(),
        };
        Self::from_rects(&TLBR::unit(), &placement)
    }

    /// Mirror along the width axis of a frame with the given width.
    pub fn flip_horizontal(width: T) -> Self {
        Self {
            sy: T::one(),
            sx: T::zero() - T::one(),
            ty: T::zero(),
            tx: width,
        }
    }

    /// Fit the source into the target keeping the aspect ratio and
    /// centering it, leaving equal margins on the padded axis.
    pub fn from_sizes_letterbox(src_size: &HW<T>, tgt_size: &HW<T>) -> Self {
        let (new_h, new_w) = if tgt_size.h() * src_size.w() <= tgt_size.w() * src_size.h() {
            let new_h = tgt_size.h();
            let new_w = src_size.w() * tgt_size.h() / src_size.h();
            (new_h, new_w)
        } else {
            let new_h = src_size.h() * tgt_size.w() / src_size.w();
            let new_w = tgt_size.w();
            (new_h, new_w)
        };

        let two = T::one() + T::one();
        let off_y = (tgt_size.h() - new_h) / two;
        let off_x = (tgt_size.w() - new_w) / two;

        let src = TLBR {
            t: T::zero(),
            l: T::zero(),
            b: src_size.h(),
            r: src_size.w(),
        };
        let tgt = TLBR {
            t: off_y,
            l: off_x,
            b: off_y + new_h,
            r: off_x + new_w,
        };

        Self::from_rects(&src, &tgt)
    }
}

impl<T> Transform<T>
where
    T: Copy + Num + Neg<Output = T>,
{
    pub fn inverse(&self) -> Self {
        let sy = T::one() / self.sy;
        let sx = T::one() / self.sx;
        let ty = -self.ty / self.sy;
        let tx = -self.tx / self.sx;

        Self { sy, sx, ty, tx }
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}

impl<T> Mul<&Transform<T>> for &Transform<T>
where
    T: Copy + Num,
{
    type Output = Transform<T>;

    fn mul(self, rhs: &Transform<T>) -> Self::Output {
        Transform {
            sx: self.sx * rhs.sx,
            sy: self.sy * rhs.sy,
            tx: rhs.tx * self.sx + self.tx,
            ty: rhs.ty * self.sy + self.ty,
        }
    }
}
