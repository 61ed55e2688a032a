use crate::math::{Border, Rect, Vec2};

/// Default proximity threshold for border tests, in pixels.
pub const BORDER_THRESHOLD: f32 = 2.0;

/// The bounded plane mascots occupy, plus per-tick cursor samples.
///
/// The host driver owns one of these, feeds it the current cursor position
/// each frame, and updates the work area on resize. The engine only reads
/// it during a tick (drag release also writes the cursor delta, see
/// `Mascot::stop_drag`).
#[derive(Debug, Clone)]
pub struct Environment {
    pub work_area: Rect,
    pub cursor: Vec2,
    pub cursor_delta: Vec2,
}

impl Environment {
    pub fn new(work_area: Rect) -> Self {
        Self {
            work_area,
            cursor: Vec2::ZERO,
            cursor_delta: Vec2::ZERO,
        }
    }

    /// Feed a raw cursor sample. Updates the per-tick delta.
    pub fn set_cursor(&mut self, pos: Vec2) {
        self.cursor_delta = pos - self.cursor;
        self.cursor = pos;
    }

    pub fn set_work_area(&mut self, work_area: Rect) {
        self.work_area = work_area;
    }

    /// Screen size exposed to guard expressions. Tracks the work area.
    pub fn screen_size(&self) -> Vec2 {
        Vec2::new(self.work_area.width, self.work_area.height)
    }

    pub fn floor(&self) -> Border {
        let wa = &self.work_area;
        Border::new(
            Vec2::new(wa.left(), wa.bottom()),
            Vec2::new(wa.right(), wa.bottom()),
            false,
        )
    }

    pub fn ceiling(&self) -> Border {
        let wa = &self.work_area;
        Border::new(
            Vec2::new(wa.left(), wa.top()),
            Vec2::new(wa.right(), wa.top()),
            false,
        )
    }

    pub fn left_wall(&self) -> Border {
        let wa = &self.work_area;
        Border::new(
            Vec2::new(wa.left(), wa.top()),
            Vec2::new(wa.left(), wa.bottom()),
            true,
        )
    }

    pub fn right_wall(&self) -> Border {
        let wa = &self.work_area;
        Border::new(
            Vec2::new(wa.right(), wa.top()),
            Vec2::new(wa.right(), wa.bottom()),
            true,
        )
    }

    pub fn is_on_floor(&self, point: Vec2) -> bool {
        self.floor().is_on(point, BORDER_THRESHOLD)
    }

    pub fn is_on_ceiling(&self, point: Vec2) -> bool {
        self.ceiling().is_on(point, BORDER_THRESHOLD)
    }

    pub fn is_on_left_wall(&self, point: Vec2) -> bool {
        self.left_wall().is_on(point, BORDER_THRESHOLD)
    }

    pub fn is_on_right_wall(&self, point: Vec2) -> bool {
        self.right_wall().is_on(point, BORDER_THRESHOLD)
    }

    /// Wall test in the facing direction: the wall ahead of the mascot.
    pub fn is_on_wall(&self, point: Vec2, looking_right: bool) -> bool {
        if looking_right {
            self.is_on_right_wall(point)
        } else {
            self.is_on_left_wall(point)
        }
    }

    /// Clamp a position into the work area.
    pub fn clamp(&self, position: Vec2) -> Vec2 {
        let wa = &self.work_area;
        Vec2::new(
            position.x.clamp(wa.left(), wa.right()),
            position.y.clamp(wa.top(), wa.bottom()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::new(Rect::new(0.0, 0.0, 400.0, 300.0))
    }

    #[test]
    fn cursor_delta_tracks_samples() {
        let mut env = env();
        env.set_cursor(Vec2::new(10.0, 10.0));
        env.set_cursor(Vec2::new(13.0, 8.0));
        assert_eq!(env.cursor_delta, Vec2::new(3.0, -2.0));
    }

    #[test]
    fn border_predicates() {
        let env = env();
        assert!(env.is_on_floor(Vec2::new(100.0, 299.0)));
        assert!(!env.is_on_floor(Vec2::new(100.0, 200.0)));
        // Past the segment's horizontal extent does not count as floor.
        assert!(!env.is_on_floor(Vec2::new(500.0, 300.0)));
        assert!(env.is_on_ceiling(Vec2::new(100.0, 1.0)));
        assert!(env.is_on_left_wall(Vec2::new(1.0, 100.0)));
        assert!(env.is_on_right_wall(Vec2::new(399.0, 100.0)));
        assert!(env.is_on_wall(Vec2::new(399.0, 100.0), true));
        assert!(!env.is_on_wall(Vec2::new(399.0, 100.0), false));
    }

    #[test]
    fn clamp_stays_in_bounds() {
        let env = env();
        assert_eq!(
            env.clamp(Vec2::new(-50.0, 500.0)),
            Vec2::new(0.0, 300.0)
        );
        assert_eq!(
            env.clamp(Vec2::new(200.0, 150.0)),
            Vec2::new(200.0, 150.0)
        );
    }
}
