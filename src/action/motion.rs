//! Moving action variants: Move (pose-velocity travel), Fall (physics
//! integrator), Jump (constant-velocity parabola shot), Dragged (cursor
//! control surface).

use super::{on_border, ActionCtx, ActionEvent, Playback};
use crate::behavior::FALL_BEHAVIOR;
use crate::catalogue::ActionDef;
use crate::math::Vec2;
use crate::util::RingBuffer;
use std::rc::Rc;

/// Snap-to-target tolerance for Jump, in pixels. Legacy tunable.
pub const JUMP_EPSILON: f32 = 5.0;

/// Jump speed used when the definition leaves the velocity parameter at 0.
pub const DEFAULT_JUMP_SPEED: f32 = 20.0;

/// Cursor-delta samples kept for throw velocity averaging.
pub const DRAG_SAMPLE_CAPACITY: usize = 5;

/// Cursor-delta magnitude below which facing is left unchanged.
const FACING_DEADBAND: f32 = 1.0;

/// Walks by the current pose's velocity (X negated when facing left) until
/// the configured targets are reached or crossed.
pub struct Move {
    pub(super) base: Playback,
    target_x: Option<f32>,
    target_y: Option<f32>,
}

impl Move {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            target_x: None,
            target_y: None,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        let params = &self.base.def.params;
        self.target_x = params.target_x.as_ref().map(|s| s.eval_num(&eval));
        self.target_y = params.target_y.as_ref().map(|s| s.eval_num(&eval));
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;

        let eval = ctx.eval();
        let Some(velocity) = self.base.current_pose(&eval).map(|p| p.velocity) else {
            self.base.finished = true;
            return false;
        };

        let vx = if *ctx.looking_right {
            velocity.x
        } else {
            -velocity.x
        };
        ctx.anchor.x += vx;
        ctx.anchor.y += velocity.y;

        // Sign-of-velocity comparison, so an overshoot still counts as
        // reaching the target.
        if self.target_x.is_some() || self.target_y.is_some() {
            let reached_x = self.target_x.map_or(true, |t| {
                if vx >= 0.0 {
                    ctx.anchor.x >= t
                } else {
                    ctx.anchor.x <= t
                }
            });
            let reached_y = self.target_y.map_or(true, |t| {
                if velocity.y >= 0.0 {
                    ctx.anchor.y >= t
                } else {
                    ctx.anchor.y <= t
                }
            });
            if reached_x && reached_y {
                self.base.finished = true;
            }
        }

        if let Some(border) = self.base.def.border {
            if !on_border(border, *ctx.anchor, *ctx.looking_right, ctx.env) {
                self.base.finished = true;
                ctx.events
                    .push(ActionEvent::QueueBehavior(FALL_BEHAVIOR.to_owned()));
            }
        }

        !self.base.finished
    }
}

/// Free fall with drag: X decays by its resistance fraction, Y gains
/// gravity and decays by its own. Owns exact per-tick physics, so no
/// interpolation.
pub struct Fall {
    pub(super) base: Playback,
    velocity: Vec2,
    gravity: f32,
    resistance: Vec2,
}

impl Fall {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            velocity: Vec2::ZERO,
            gravity: 0.0,
            resistance: Vec2::ZERO,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        let params = &self.base.def.params;
        self.velocity = Vec2::new(
            params.initial_vx.eval_num(&eval),
            params.initial_vy.eval_num(&eval),
        );
        self.gravity = params.gravity.eval_num(&eval);
        self.resistance = Vec2::new(
            params.resistance_x.eval_num(&eval),
            params.resistance_y.eval_num(&eval),
        );
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;

        self.velocity.x -= self.velocity.x * self.resistance.x;
        self.velocity.y += self.gravity - self.velocity.y * self.resistance.y;
        *ctx.anchor += self.velocity;

        let wa = &ctx.env.work_area;

        // Floor contact lands the fall.
        if ctx.anchor.y >= wa.bottom() {
            ctx.anchor.y = wa.bottom();
            self.velocity.y = 0.0;
            self.base.finished = true;
            return false;
        }

        // Ceiling reflects downward at half magnitude.
        if ctx.anchor.y <= wa.top() {
            ctx.anchor.y = wa.top();
            self.velocity.y = self.velocity.y.abs() * 0.5;
        }

        // Walls reflect inward at half magnitude and face away.
        if ctx.anchor.x <= wa.left() {
            ctx.anchor.x = wa.left();
            self.velocity.x = self.velocity.x.abs() * 0.5;
            *ctx.looking_right = true;
        } else if ctx.anchor.x >= wa.right() {
            ctx.anchor.x = wa.right();
            self.velocity.x = -self.velocity.x.abs() * 0.5;
            *ctx.looking_right = false;
        }

        true
    }
}

/// Constant-velocity shot along a parabola-biased direction, snapping onto
/// the target once both axes have crossed it or come within
/// `JUMP_EPSILON`.
pub struct Jump {
    pub(super) base: Playback,
    target: Vec2,
    velocity: Vec2,
}

impl Jump {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            target: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        let params = &self.base.def.params;
        self.target = Vec2::new(
            params
                .target_x
                .as_ref()
                .map_or(ctx.anchor.x, |s| s.eval_num(&eval)),
            params
                .target_y
                .as_ref()
                .map_or(ctx.anchor.y, |s| s.eval_num(&eval)),
        );
        let mut speed = params.velocity.eval_num(&eval);
        if speed == 0.0 {
            speed = DEFAULT_JUMP_SPEED;
        }

        // Bias the aim upward in proportion to the horizontal distance.
        let delta = self.target - *ctx.anchor;
        let biased = Vec2::new(delta.x, delta.y - delta.x.abs());
        self.velocity = if biased.length() > 0.0 {
            biased.normalize() * speed
        } else {
            Vec2::new(0.0, -speed)
        };
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;
        *ctx.anchor += self.velocity;

        let dx = self.target.x - ctx.anchor.x;
        let dy = self.target.y - ctx.anchor.y;
        let reached_x = (self.velocity.x >= 0.0 && dx <= 0.0)
            || (self.velocity.x < 0.0 && dx >= 0.0)
            || dx.abs() < JUMP_EPSILON;
        let reached_y = (self.velocity.y >= 0.0 && dy <= 0.0)
            || (self.velocity.y < 0.0 && dy >= 0.0)
            || dy.abs() < JUMP_EPSILON;

        if reached_x && reached_y {
            *ctx.anchor = self.target;
            self.base.finished = true;
        }

        !self.base.finished
    }
}

/// Control-surface action with no natural finish: snaps the anchor to the
/// cursor plus the offset captured at drag start, faces the cursor's
/// travel direction, and records delta samples for the release throw.
pub struct Dragged {
    pub(super) base: Playback,
    offset: Vec2,
    samples: RingBuffer<Vec2>,
}

impl Dragged {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            offset: Vec2::ZERO,
            samples: RingBuffer::new(DRAG_SAMPLE_CAPACITY),
        }
    }

    /// Anchor-to-cursor offset captured at drag start. Survives `init`.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    pub(super) fn init(&mut self, _ctx: &mut ActionCtx) {
        self.base.init();
        self.samples.clear();
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;

        *ctx.anchor = ctx.env.cursor + self.offset;
        self.samples.push(ctx.env.cursor_delta);

        if ctx.env.cursor_delta.x > FACING_DEADBAND {
            *ctx.looking_right = true;
        } else if ctx.env.cursor_delta.x < -FACING_DEADBAND {
            *ctx.looking_right = false;
        }

        true
    }

    /// Mean of the recorded cursor deltas, for the release throw handoff.
    pub fn average_velocity(&self) -> Vec2 {
        if self.samples.is_empty() {
            return Vec2::ZERO;
        }
        let sum: Vec2 = self.samples.iter().copied().sum();
        sum / self.samples.len() as f32
    }
}
