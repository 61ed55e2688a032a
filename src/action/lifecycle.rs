//! Lifecycle action variants: SelfDestruct and Breed.

use super::{ActionCtx, ActionEvent, BreedRequest, Playback};
use crate::behavior::FALL_BEHAVIOR;
use crate::catalogue::ActionDef;
use crate::math::Vec2;
use std::rc::Rc;

/// Plays its animation to completion, then requests destruction of the
/// owning mascot.
pub struct SelfDestruct {
    pub(super) base: Playback,
}

impl SelfDestruct {
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
        if total.map_or(true, |t| self.base.time >= t) {
            ctx.events.push(ActionEvent::Destroy);
            self.base.finished = true;
        }
        !self.base.finished
    }
}

/// Requests a spawn at the animation's half-duration point, exactly once,
/// and finishes when the animation completes whether or not the spawn was
/// granted.
pub struct Breed {
    pub(super) base: Playback,
    bred: bool,
}

impl Breed {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            bred: false,
        }
    }

    pub(super) fn init(&mut self, _ctx: &mut ActionCtx) {
        self.base.init();
        self.bred = false;
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        self.base.time += 1;
        let eval = ctx.eval();
        let total = self.base.animation(&eval).map(|a| a.total_duration);

        match total {
            Some(total) => {
                if !self.bred && self.base.time as f32 >= total as f32 / 2.0 {
                    self.bred = true;
                    let params = &self.base.def.params;
                    let position = *ctx.anchor
                        + Vec2::new(
                            params.born_x.eval_num(&eval),
                            params.born_y.eval_num(&eval),
                        );
                    ctx.events.push(ActionEvent::Breed(BreedRequest {
                        position,
                        behavior: params
                            .born_behavior
                            .clone()
                            .unwrap_or_else(|| FALL_BEHAVIOR.to_owned()),
                        mascot: params.born_mascot.clone(),
                        transient: params.born_transient,
                    }));
                }
                if self.base.time >= total {
                    self.base.finished = true;
                }
            }
            None => self.base.finished = true,
        }

        !self.base.finished
    }
}
