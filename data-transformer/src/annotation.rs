//! Re-expressing box annotations under the applied geometry.

use crate::{
    common::*,
    geometry::GeometryOp,
    sample::{Annotation, NormalizedBox},
};

/// Normalized area at or below which a box counts as degenerate.
const MIN_AREA: f64 = f64::EPSILON;

/// Which boxes survive a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmitConstraint {
    /// Keep a box only if its center lies inside the crop window.
    Center,
    /// Keep a box only if at least `overlap` of its area lies inside the
    /// crop window.
    MinOverlap { overlap: R64 },
}

/// The serialized form of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub class: i32,
    #[serde(default)]
    pub difficult: bool,
}

impl AnnotationRecord {
    /// Convert into an annotation, clamping the coordinates to `[0, 1]`.
    pub fn to_annotation(&self) -> Result<Annotation> {
        let coords = [self.ymin, self.xmin, self.ymax, self.xmax];
        ensure_kind!(
            coords.iter().all(|val| val.is_finite()),
            OutOfRange,
            "annotation {:?} has non-finite coordinates",
            self
        );
        let [t, l, b, r] = coords.map(|val| r64(val.clamp(0.0, 1.0)));
        let rect = NormalizedBox::try_from_tlbr([t, l, b, r])
            .map_err(|err| Error::OutOfRange(format!("annotation {:?}: {}", self, err)))?;
        Ok(Label {
            rect,
            class: self.class,
            difficult: self.difficult,
        })
    }
}

impl From<&Annotation> for AnnotationRecord {
    fn from(from: &Annotation) -> Self {
        let [t, l, b, r] = from.rect.tlbr();
        Self {
            xmin: l.raw(),
            ymin: t.raw(),
            xmax: r.raw(),
            ymax: b.raw(),
            class: from.class,
            difficult: from.difficult,
        }
    }
}

/// Maps annotations through the geometric steps and drops the boxes that
/// degenerate or fail the emission constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationAdjuster {
    emit_constraint: Option<EmitConstraint>,
}

impl AnnotationAdjuster {
    pub fn new(emit_constraint: Option<EmitConstraint>) -> Self {
        Self { emit_constraint }
    }

    pub fn emit_constraint(&self) -> Option<EmitConstraint> {
        self.emit_constraint
    }

    /// Re-express annotations under a crop to `crop_box`, an optional
    /// mirror and a final resize, applied in that order.
    pub fn adjust(
        &self,
        annotations: &[Annotation],
        crop_box: &NormalizedBox,
        mirror: bool,
        resize: &Transform<R64>,
    ) -> Vec<Annotation> {
        let cropped = self.crop(annotations, crop_box);
        let mirrored = if mirror {
            self.mirror(&cropped)
        } else {
            cropped
        };
        self.resize(&mirrored, resize)
    }

    /// Replay recorded geometry on the annotations.
    pub fn replay(&self, annotations: &[Annotation], ops: &[GeometryOp]) -> Vec<Annotation> {
        ops.iter()
            .fold(annotations.to_vec(), |annotations, op| match op.visible_window() {
                Some(window) => self.crop(&annotations, &window),
                None => self.map(&annotations, &op.box_transform()),
            })
    }

    /// Keep the boxes visible in `window` and re-base them on it.
    pub fn crop(&self, annotations: &[Annotation], window: &NormalizedBox) -> Vec<Annotation> {
        let transform = Transform::project_into(window);
        annotations
            .iter()
            .filter(|ann| self.is_emitted(&ann.rect, window))
            .filter_map(|ann| project(ann, &transform))
            .collect()
    }

    /// Re-express the boxes on an expansion canvas where the source was
    /// placed at `placement`.
    pub fn place(&self, annotations: &[Annotation], placement: &NormalizedBox) -> Vec<Annotation> {
        self.map(annotations, &Transform::place_at(placement))
    }

    pub fn mirror(&self, annotations: &[Annotation]) -> Vec<Annotation> {
        self.map(annotations, &Transform::flip_horizontal(r64(1.0)))
    }

    pub fn resize(&self, annotations: &[Annotation], transform: &Transform<R64>) -> Vec<Annotation> {
        self.map(annotations, transform)
    }

    /// Whether the box may be emitted for the crop window.
    pub fn is_emitted(&self, rect: &NormalizedBox, window: &NormalizedBox) -> bool {
        match self.emit_constraint {
            None => true,
            Some(EmitConstraint::Center) => window.contains_point(rect.cy(), rect.cx()),
            Some(EmitConstraint::MinOverlap { overlap }) => rect.coverage_by(window) >= overlap,
        }
    }

    fn map(&self, annotations: &[Annotation], transform: &Transform<R64>) -> Vec<Annotation> {
        annotations
            .iter()
            .filter_map(|ann| project(ann, transform))
            .collect()
    }
}

fn project(annotation: &Annotation, transform: &Transform<R64>) -> Option<Annotation> {
    let mapped = transform * annotation;
    let rect = mapped.rect.clip_to(&NormalizedBox::unit());
    if rect.is_empty() || rect.area() <= MIN_AREA {
        return None;
    }
    Some(mapped.with_rect(rect))
}
