//! In-place action variants: Stay (also Animate/Resist), Look, Turn,
//! Offset.

use super::{on_border, ActionCtx, ActionEvent, Playback};
use crate::behavior::FALL_BEHAVIOR;
use crate::catalogue::ActionDef;
use std::rc::Rc;

/// Plays its animation in place. Finishes when the explicit duration
/// elapses, or without one, when the animation's own duration does. Leaving
/// the configured border finishes early with a queued fall.
pub struct Stay {
    pub(super) base: Playback,
    duration: u32,
}

impl Stay {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            duration: 0,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        self.duration = self.base.def.params.duration.eval_num(&eval).max(0.0) as u32;
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;

        if let Some(border) = self.base.def.border {
            if !on_border(border, *ctx.anchor, *ctx.looking_right, ctx.env) {
                self.base.finished = true;
                ctx.events
                    .push(ActionEvent::QueueBehavior(FALL_BEHAVIOR.to_owned()));
                return false;
            }
        }

        if self.duration > 0 {
            if self.base.time >= self.duration {
                self.base.finished = true;
            }
        } else if !self.base.def.animations.is_empty() {
            let eval = ctx.eval();
            let total = self.base.animation(&eval).map(|a| a.total_duration);
            if let Some(total) = total {
                if self.base.time >= total {
                    self.base.finished = true;
                }
            }
        }

        !self.base.finished
    }
}

/// Instantaneous facing change toward a target X.
pub struct Look {
    pub(super) base: Playback,
}

impl Look {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        if let Some(target_x) = &self.base.def.params.target_x {
            *ctx.looking_right = target_x.eval_num(&eval) > ctx.anchor.x;
        }
        self.base.finished = true;
    }

    pub(super) fn tick(&mut self, _ctx: &mut ActionCtx) -> bool {
        false
    }
}

/// Waits for the active animation to complete, then flips facing.
pub struct Turn {
    pub(super) base: Playback,
}

impl Turn {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
        }
    }

    pub(super) fn init(&mut self, _ctx: &mut ActionCtx) {
        self.base.init();
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;
        let eval = ctx.eval();
        let total = self.base.animation(&eval).map(|a| a.total_duration);
        // Without an animation there is nothing to wait for.
        if total.map_or(true, |t| self.base.time >= t) {
            *ctx.looking_right = !*ctx.looking_right;
            self.base.finished = true;
        }
        !self.base.finished
    }
}

/// Instantaneous positional nudge: the X offset is applied in the facing
/// direction, Y as-is.
pub struct Offset {
    pub(super) base: Playback,
}

impl Offset {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        let eval = ctx.eval();
        let params = &self.base.def.params;
        let dx = params.target_x.as_ref().map_or(0.0, |s| s.eval_num(&eval));
        let dy = params.target_y.as_ref().map_or(0.0, |s| s.eval_num(&eval));
        if *ctx.looking_right {
            ctx.anchor.x += dx;
        } else {
            ctx.anchor.x -= dx;
        }
        ctx.anchor.y += dy;
        self.base.finished = true;
    }

    pub(super) fn tick(&mut self, _ctx: &mut ActionCtx) -> bool {
        false
    }
}
