//! Composite action variants: Sequence (ordered children) and Select
//! (first child whose guard holds).

use super::{Action, ActionCtx, Playback};
use crate::catalogue::{ActionChild, ActionDef, Pose};
use crate::script::EvalContext;
use std::rc::Rc;

/// Runs child actions one at a time, advancing on each finish; named
/// references are resolved against the catalogue with local overrides
/// merged in.
pub struct Sequence {
    pub(super) base: Playback,
    index: usize,
    child: Option<Box<Action>>,
}

impl Sequence {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            index: 0,
            child: None,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        self.index = 0;
        self.child = None;
        self.advance(ctx);
    }

    /// Instantiate the child at the current index, skipping unresolvable
    /// references; past the end, the sequence is finished.
    fn advance(&mut self, ctx: &mut ActionCtx) {
        let def = self.base.def.clone();
        loop {
            let Some(entry) = def.children.get(self.index) else {
                self.base.finished = true;
                self.child = None;
                return;
            };
            let child_def = match entry {
                ActionChild::Inline(inline) => Some(inline.clone()),
                ActionChild::Reference(reference) => {
                    match ctx.catalogue.action(&reference.name) {
                        Some(found) => {
                            Some(Rc::new(found.with_overrides(&reference.overrides)))
                        }
                        None => {
                            log::warn!(
                                "sequence {:?}: unknown child action {:?}",
                                def.name,
                                reference.name
                            );
                            None
                        }
                    }
                }
            };
            match child_def {
                Some(child_def) => {
                    let mut child = Box::new(Action::instantiate(child_def));
                    child.init(ctx);
                    self.child = Some(child);
                    return;
                }
                None => self.index += 1,
            }
        }
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        if self.base.finished {
            return false;
        }
        if let Some(child) = self.child.as_mut() {
            let continuing = child.tick(ctx);
            if !continuing || child.finished() {
                self.index += 1;
                self.advance(ctx);
            }
        } else {
            self.base.finished = true;
        }
        !self.base.finished
    }

    pub(super) fn subtick(&mut self, index: usize, ctx: &mut ActionCtx) -> bool {
        if let Some(child) = self.child.as_mut() {
            if child.needs_interpolation() {
                let continuing = child.subtick(index, ctx);
                // Same advance rule as tick: a finished child hands off to
                // the next one instead of ending the whole sequence.
                if !continuing || child.finished() {
                    self.index += 1;
                    self.advance(ctx);
                }
                return !self.base.finished;
            }
        }
        if index == 0 {
            self.tick(ctx)
        } else {
            true
        }
    }

    pub(super) fn current_pose(&mut self, ctx: &EvalContext) -> Option<&Pose> {
        match self.child.as_mut() {
            Some(child) => child.current_pose(ctx),
            None => self.base.current_pose(ctx),
        }
    }

    pub(super) fn needs_interpolation(&self) -> bool {
        self.child
            .as_ref()
            .map_or(false, |child| child.needs_interpolation())
    }
}

/// Commits at init to the first child whose guard holds and runs it to
/// completion; with no eligible child it is trivially finished.
pub struct Select {
    pub(super) base: Playback,
    child: Option<Box<Action>>,
}

impl Select {
    pub(super) fn new(def: Rc<ActionDef>) -> Self {
        Self {
            base: Playback::new(def),
            child: None,
        }
    }

    pub(super) fn init(&mut self, ctx: &mut ActionCtx) {
        self.base.init();
        self.child = None;

        let def = self.base.def.clone();
        for entry in &def.children {
            let eval = ctx.eval();
            let chosen = match entry {
                ActionChild::Inline(inline) => {
                    if inline.condition.eval_bool(&eval) {
                        Some(inline.clone())
                    } else {
                        None
                    }
                }
                ActionChild::Reference(reference) => {
                    let Some(found) = ctx.catalogue.action(&reference.name) else {
                        continue;
                    };
                    // An explicit guard on the reference shadows the
                    // referenced action's own guard.
                    let guard = if reference.condition.is_default_true() {
                        &found.condition
                    } else {
                        &reference.condition
                    };
                    if guard.eval_bool(&eval) {
                        Some(Rc::new(found.with_overrides(&reference.overrides)))
                    } else {
                        None
                    }
                }
            };
            if let Some(child_def) = chosen {
                let mut child = Box::new(Action::instantiate(child_def));
                child.init(ctx);
                self.child = Some(child);
                break;
            }
        }

        if self.child.is_none() {
            self.base.finished = true;
        }
    }

    pub(super) fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        if let Some(child) = self.child.as_mut() {
            let continuing = child.tick(ctx);
            if !continuing || child.finished() {
                self.base.finished = true;
            }
        }
        !self.base.finished
    }

    pub(super) fn subtick(&mut self, index: usize, ctx: &mut ActionCtx) -> bool {
        if let Some(child) = self.child.as_mut() {
            let continuing = child.subtick(index, ctx);
            if !continuing || child.finished() {
                self.base.finished = true;
            }
            return !self.base.finished;
        }
        if index == 0 {
            self.tick(ctx)
        } else {
            true
        }
    }

    pub(super) fn current_pose(&mut self, ctx: &EvalContext) -> Option<&Pose> {
        match self.child.as_mut() {
            Some(child) => child.current_pose(ctx),
            None => self.base.current_pose(ctx),
        }
    }

    pub(super) fn needs_interpolation(&self) -> bool {
        self.child
            .as_ref()
            .map_or(false, |child| child.needs_interpolation())
    }
}
