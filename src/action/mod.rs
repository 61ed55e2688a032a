//! Tick-driven action instances: the closed set of motion/animation
//! programs a mascot can run, instantiated from catalogue `ActionDef`s.
//!
//! Actions mutate the mascot through an `ActionCtx` of disjoint borrows and
//! report side requests (queued fallback behavior, breed, destroy) through
//! an event list the orchestrator drains after each tick.

mod basic;
mod composite;
mod lifecycle;
mod motion;

pub use motion::{Dragged, DRAG_SAMPLE_CAPACITY, DEFAULT_JUMP_SPEED, JUMP_EPSILON};

use crate::catalogue::{ActionDef, ActionKind, Animation, BorderKind, Catalogue, Pose};
use crate::environment::Environment;
use crate::math::Vec2;
use crate::script::EvalContext;
use std::rc::Rc;

/// Sub-frame interpolation steps per tick offered to hosts that render
/// faster than the tick cadence.
pub const SUBTICK_COUNT: usize = 4;

/// Side requests an action hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEvent {
    /// Switch to this behavior instead of running the selector.
    QueueBehavior(String),
    Breed(BreedRequest),
    /// Irrevocable removal of the owning mascot.
    Destroy,
}

/// A request to spawn a new mascot, serviced by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct BreedRequest {
    pub position: Vec2,
    pub behavior: String,
    /// Optional different mascot source for the child.
    pub mascot: Option<String>,
    pub transient: bool,
}

/// Mutable view of the owning mascot plus read-only collaborators,
/// valid for one tick.
pub struct ActionCtx<'a> {
    pub anchor: &'a mut Vec2,
    pub looking_right: &'a mut bool,
    pub dragging: bool,
    pub time: u32,
    pub total_count: usize,
    pub env: &'a Environment,
    pub catalogue: &'a Catalogue,
    pub events: &'a mut Vec<ActionEvent>,
}

impl<'a> ActionCtx<'a> {
    /// Snapshot for guard/parameter evaluation. Not tied to the mutable
    /// borrows, so it can outlive further context use.
    pub fn eval(&self) -> EvalContext<'a> {
        EvalContext {
            anchor: *self.anchor,
            looking_right: *self.looking_right,
            dragging: self.dragging,
            time: self.time,
            total_count: self.total_count,
            env: self.env,
        }
    }
}

/// Border-affinity check shared by Stay and Move.
pub(crate) fn on_border(
    border: BorderKind,
    anchor: Vec2,
    looking_right: bool,
    env: &Environment,
) -> bool {
    match border {
        BorderKind::Floor => env.is_on_floor(anchor),
        BorderKind::Ceiling => env.is_on_ceiling(anchor),
        BorderKind::Wall => env.is_on_wall(anchor, looking_right),
    }
}

/// Animation playback state shared by every action variant: elapsed ticks,
/// guard-selected animation index, finished flag.
pub(crate) struct Playback {
    pub def: Rc<ActionDef>,
    pub time: u32,
    pub anim_index: usize,
    pub finished: bool,
}

impl Playback {
    fn new(def: Rc<ActionDef>) -> Self {
        Self {
            def,
            time: 0,
            anim_index: 0,
            finished: false,
        }
    }

    pub fn init(&mut self) {
        self.time = 0;
        self.anim_index = 0;
        self.finished = false;
    }

    /// Index of the first animation whose guard holds. Commits the
    /// selection (resetting the clock on change); with no match, falls
    /// back to the first animation without committing.
    fn select_animation(&mut self, ctx: &EvalContext) -> Option<usize> {
        let mut matched = None;
        for (i, anim) in self.def.animations.iter().enumerate() {
            if anim.condition.eval_bool(ctx) {
                matched = Some(i);
                break;
            }
        }
        match matched {
            Some(i) => {
                if self.anim_index != i {
                    self.anim_index = i;
                    self.time = 0;
                }
                Some(i)
            }
            None if self.def.animations.is_empty() => None,
            None => Some(0),
        }
    }

    pub fn animation(&mut self, ctx: &EvalContext) -> Option<&Animation> {
        let index = self.select_animation(ctx)?;
        self.def.animations.get(index)
    }

    pub fn current_pose(&mut self, ctx: &EvalContext) -> Option<&Pose> {
        let index = self.select_animation(ctx)?;
        let time = self.time;
        self.def.animations.get(index)?.pose_at(time)
    }
}

/// A live action instance. One variant per kind; composite variants own
/// their active child.
pub enum Action {
    Stay(basic::Stay),
    Look(basic::Look),
    Turn(basic::Turn),
    Offset(basic::Offset),
    Move(motion::Move),
    Fall(motion::Fall),
    Jump(motion::Jump),
    Dragged(motion::Dragged),
    Sequence(composite::Sequence),
    Select(composite::Select),
    SelfDestruct(lifecycle::SelfDestruct),
    Breed(lifecycle::Breed),
}

impl Action {
    /// Build an instance for the definition's resolved kind.
    /// Stay also covers the Animate and Resist kinds.
    pub fn instantiate(def: Rc<ActionDef>) -> Action {
        match def.resolved_kind() {
            ActionKind::Move => Action::Move(motion::Move::new(def)),
            ActionKind::Fall => Action::Fall(motion::Fall::new(def)),
            ActionKind::Jump => Action::Jump(motion::Jump::new(def)),
            ActionKind::Dragged => Action::Dragged(motion::Dragged::new(def)),
            ActionKind::Look => Action::Look(basic::Look::new(def)),
            ActionKind::Turn => Action::Turn(basic::Turn::new(def)),
            ActionKind::Offset => Action::Offset(basic::Offset::new(def)),
            ActionKind::Sequence => Action::Sequence(composite::Sequence::new(def)),
            ActionKind::Select => Action::Select(composite::Select::new(def)),
            ActionKind::SelfDestruct => {
                Action::SelfDestruct(lifecycle::SelfDestruct::new(def))
            }
            ActionKind::Breed => Action::Breed(lifecycle::Breed::new(def)),
            ActionKind::Stay
            | ActionKind::Animate
            | ActionKind::Resist
            | ActionKind::Embedded => Action::Stay(basic::Stay::new(def)),
        }
    }

    /// Idempotent setup from the definition and current mascot state.
    pub fn init(&mut self, ctx: &mut ActionCtx) {
        match self {
            Action::Stay(a) => a.init(ctx),
            Action::Look(a) => a.init(ctx),
            Action::Turn(a) => a.init(ctx),
            Action::Offset(a) => a.init(ctx),
            Action::Move(a) => a.init(ctx),
            Action::Fall(a) => a.init(ctx),
            Action::Jump(a) => a.init(ctx),
            Action::Dragged(a) => a.init(ctx),
            Action::Sequence(a) => a.init(ctx),
            Action::Select(a) => a.init(ctx),
            Action::SelfDestruct(a) => a.init(ctx),
            Action::Breed(a) => a.init(ctx),
        }
    }

    /// Advance one tick. Returns whether the action should continue.
    pub fn tick(&mut self, ctx: &mut ActionCtx) -> bool {
        match self {
            Action::Stay(a) => a.tick(ctx),
            Action::Look(a) => a.tick(ctx),
            Action::Turn(a) => a.tick(ctx),
            Action::Offset(a) => a.tick(ctx),
            Action::Move(a) => a.tick(ctx),
            Action::Fall(a) => a.tick(ctx),
            Action::Jump(a) => a.tick(ctx),
            Action::Dragged(a) => a.tick(ctx),
            Action::Sequence(a) => a.tick(ctx),
            Action::Select(a) => a.tick(ctx),
            Action::SelfDestruct(a) => a.tick(ctx),
            Action::Breed(a) => a.tick(ctx),
        }
    }

    /// Sub-frame update. Index 0 is the real tick; composite variants
    /// forward to an interpolating child, everything else is a no-op for
    /// indices past 0.
    pub fn subtick(&mut self, index: usize, ctx: &mut ActionCtx) -> bool {
        match self {
            Action::Sequence(a) => a.subtick(index, ctx),
            Action::Select(a) => a.subtick(index, ctx),
            _ => {
                if index == 0 {
                    self.tick(ctx)
                } else {
                    true
                }
            }
        }
    }

    /// Current pose under the guard-selected animation.
    pub fn current_pose(&mut self, ctx: &EvalContext) -> Option<&Pose> {
        match self {
            Action::Sequence(a) => a.current_pose(ctx),
            Action::Select(a) => a.current_pose(ctx),
            other => other.playback_mut().current_pose(ctx),
        }
    }

    pub fn needs_interpolation(&self) -> bool {
        match self {
            Action::Move(_) | Action::Jump(_) => true,
            Action::Sequence(a) => a.needs_interpolation(),
            Action::Select(a) => a.needs_interpolation(),
            _ => false,
        }
    }

    pub fn finished(&self) -> bool {
        self.playback().finished
    }

    pub fn def(&self) -> &Rc<ActionDef> {
        &self.playback().def
    }

    fn playback(&self) -> &Playback {
        match self {
            Action::Stay(a) => &a.base,
            Action::Look(a) => &a.base,
            Action::Turn(a) => &a.base,
            Action::Offset(a) => &a.base,
            Action::Move(a) => &a.base,
            Action::Fall(a) => &a.base,
            Action::Jump(a) => &a.base,
            Action::Dragged(a) => &a.base,
            Action::Sequence(a) => &a.base,
            Action::Select(a) => &a.base,
            Action::SelfDestruct(a) => &a.base,
            Action::Breed(a) => &a.base,
        }
    }

    fn playback_mut(&mut self) -> &mut Playback {
        match self {
            Action::Stay(a) => &mut a.base,
            Action::Look(a) => &mut a.base,
            Action::Turn(a) => &mut a.base,
            Action::Offset(a) => &mut a.base,
            Action::Move(a) => &mut a.base,
            Action::Fall(a) => &mut a.base,
            Action::Jump(a) => &mut a.base,
            Action::Dragged(a) => &mut a.base,
            Action::Sequence(a) => &mut a.base,
            Action::Select(a) => &mut a.base,
            Action::SelfDestruct(a) => &mut a.base,
            Action::Breed(a) => &mut a.base,
        }
    }
}
