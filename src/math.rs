pub use glam::Vec2;

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}

/// One edge of the work area, a line segment tagged vertical/horizontal.
#[derive(Debug, Clone, Copy)]
pub struct Border {
    pub start: Vec2,
    pub end: Vec2,
    pub vertical: bool,
}

impl Border {
    pub fn new(start: Vec2, end: Vec2, vertical: bool) -> Self {
        Self {
            start,
            end,
            vertical,
        }
    }

    /// Proximity test: is `point` within `threshold` of the segment,
    /// measured perpendicular, and within the segment's extent?
    pub fn is_on(&self, point: Vec2, threshold: f32) -> bool {
        if self.vertical {
            (point.x - self.start.x).abs() <= threshold
                && point.y >= self.start.y
                && point.y <= self.end.y
        } else {
            (point.y - self.start.y).abs() <= threshold
                && point.x >= self.start.x
                && point.x <= self.end.x
        }
    }

    /// The fixed coordinate of the segment (x for vertical, y for horizontal).
    pub fn value(&self) -> f32 {
        if self.vertical {
            self.start.x
        } else {
            self.start.y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_accessors() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 70.0);
        assert!(r.contains(Vec2::new(50.0, 40.0)));
        assert!(!r.contains(Vec2::new(5.0, 40.0)));
    }

    #[test]
    fn border_proximity() {
        // Horizontal floor segment at y = 300.
        let floor = Border::new(
            Vec2::new(0.0, 300.0),
            Vec2::new(400.0, 300.0),
            false,
        );
        assert!(floor.is_on(Vec2::new(200.0, 299.5), 1.0));
        assert!(!floor.is_on(Vec2::new(200.0, 290.0), 1.0));
        assert!(!floor.is_on(Vec2::new(500.0, 300.0), 1.0));
        assert_eq!(floor.value(), 300.0);

        let wall = Border::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 300.0), true);
        assert!(wall.is_on(Vec2::new(0.5, 100.0), 1.0));
        assert_eq!(wall.value(), 0.0);
    }
}
