//! Axis-aligned boxes in pixel space.

/// Axis-aligned box in pixel units. Coordinates may be negative or exceed the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a box from a center point and a size.
    pub fn from_center(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self::new(center_x - width / 2.0, center_y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Width and height are strictly positive. NaN sizes are degenerate.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn intersection_area(&self, other: &BoxRect) -> f32 {
        let l = self.left.max(other.left);
        let r = self.right().min(other.right());
        let t = self.top.max(other.top);
        let b = self.bottom().min(other.bottom());
        (r - l).max(0.0) * (b - t).max(0.0)
    }

    pub fn union_area(&self, other: &BoxRect) -> f32 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Jaccard index (intersection over union). Zero when the union is empty.
    pub fn overlap_ratio(&self, other: &BoxRect) -> f32 {
        let union = self.union_area(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / union
    }

    /// Clamp to `[0, width) x [0, height)` for drawing. Decoding never clamps.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> BoxRect {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let left = self.left.clamp(0.0, fw);
        let top = self.top.clamp(0.0, fh);
        let right = self.right().clamp(0.0, fw);
        let bottom = self.bottom().clamp(0.0, fh);
        BoxRect::new(left, top, right - left, bottom - top)
    }
}
