use crate::frame::FrameGeometry;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Build from a centre point and size, as YOLO heads report boxes.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Clip the box to the frame bounds.
    pub fn clamp_to(&self, geometry: FrameGeometry) -> Self {
        let w = geometry.width as f32;
        let h = geometry.height as f32;
        Self::new(
            self.x_min.clamp(0.0, w),
            self.y_min.clamp(0.0, h),
            self.x_max.clamp(0.0, w),
            self.y_max.clamp(0.0, h),
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Object classes the tracker distinguishes. Everything else keeps its raw
/// model class id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectClass {
    Person,
    Other(u32),
}

impl ObjectClass {
    /// Map a COCO class index (as emitted by YOLOv8) to a class.
    pub fn from_coco(id: u32) -> Self {
        match id {
            0 => ObjectClass::Person,
            other => ObjectClass::Other(other),
        }
    }

    pub fn label(&self) -> String {
        match self {
            ObjectClass::Person => "person".to_string(),
            ObjectClass::Other(id) => format!("class-{id}"),
        }
    }
}

/// One detector output for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: ObjectClass,
    /// Model confidence in 0..=1.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: ObjectClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class,
            confidence,
            bbox,
        }
    }

    pub fn person(confidence: f32, bbox: BoundingBox) -> Self {
        Self::new(ObjectClass::Person, confidence, bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_and_area() {
        let b = BoundingBox::new(270.0, 190.0, 370.0, 290.0);
        assert_eq!(b.center(), (320.0, 240.0));
        assert_eq!(b.area(), 10_000.0);
    }

    #[test]
    fn inverted_box_has_zero_area() {
        let b = BoundingBox::new(10.0, 10.0, 5.0, 5.0);
        assert_eq!(b.area(), 0.0);
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn clamp_keeps_box_inside_frame() {
        let b = BoundingBox::new(-5.0, -5.0, 700.0, 500.0).clamp_to(FrameGeometry::new(640, 480));
        assert_eq!(b, BoundingBox::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn coco_person_is_class_zero() {
        assert_eq!(ObjectClass::from_coco(0), ObjectClass::Person);
        assert_eq!(ObjectClass::from_coco(2), ObjectClass::Other(2));
        assert_eq!(ObjectClass::Other(2).label(), "class-2");
    }
}
