//! A single mascot instance: owns position, facing, the live action, and
//! the behavior bookkeeping that decides what runs next.

use crate::action::{Action, ActionCtx, ActionEvent, BreedRequest, SUBTICK_COUNT};
use crate::behavior::{
    self, BehaviorHistory, Candidate, FALL_BEHAVIOR,
};
use crate::catalogue::{ActionDef, ActionKind, ActionParams, Catalogue};
use crate::environment::Environment;
use crate::math::Vec2;
use crate::script::{EvalContext, Script};
use std::collections::HashSet;
use std::rc::Rc;

/// Behavior entered while the cursor holds the mascot.
pub const DRAGGED_BEHAVIOR: &str = "Dragged";

/// Behavior entered on release when the drag carried enough speed.
pub const THROWN_BEHAVIOR: &str = "Thrown";

/// Release velocity is scaled by this before the throw handoff.
pub const THROW_MULTIPLIER: f32 = 5.0;

/// Per-axis release speed below which a drop is not a throw.
pub const THROW_DEADBAND: f32 = 0.5;

/// Half-side of the top-corner detection box, in pixels.
const CORNER_BOX: f32 = 15.0;

/// Ticks spent inside a top corner before the escape teleport fires.
const CORNER_STUCK_TICKS: u32 = 10;

/// Distance from a border that still counts as edge-pinned for the
/// oscillation nudge.
const EDGE_NEAR: f32 = 30.0;

/// Where the oscillation nudge and corner escape place the mascot,
/// relative to the offending border.
const EDGE_CLEARANCE: f32 = 50.0;

/// Vertical band under the ceiling in which corner preference applies.
const CORNER_PREFERENCE_BAND: f32 = 100.0;

/// One renderable frame resolved from the current pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: String,
    /// Hot point of the image, in image coordinates.
    pub anchor: Vec2,
    /// True when the host should flip the image horizontally.
    pub mirrored: bool,
}

pub struct Mascot {
    catalogue: Rc<Catalogue>,
    anchor: Vec2,
    looking_right: bool,
    time: u32,
    dragging: bool,
    destroyed: bool,
    behavior: Option<String>,
    action: Option<Action>,
    queued: Option<String>,
    history: BehaviorHistory,
    corner_ticks: u32,
    pending_breeds: Vec<BreedRequest>,
    warned_behaviors: HashSet<String>,
    warned_actions: HashSet<String>,
    rng: fastrand::Rng,
}

impl Mascot {
    pub fn new(catalogue: Rc<Catalogue>, position: Vec2) -> Self {
        Self::with_seed(catalogue, position, fastrand::u64(..))
    }

    /// Deterministic construction for reproducible runs.
    pub fn with_seed(catalogue: Rc<Catalogue>, position: Vec2, seed: u64) -> Self {
        Self {
            catalogue,
            anchor: position,
            looking_right: false,
            time: 0,
            dragging: false,
            destroyed: false,
            behavior: None,
            action: None,
            queued: Some(FALL_BEHAVIOR.to_owned()),
            history: BehaviorHistory::new(),
            corner_ticks: 0,
            pending_breeds: Vec::new(),
            warned_behaviors: HashSet::new(),
            warned_actions: HashSet::new(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn catalogue(&self) -> &Rc<Catalogue> {
        &self.catalogue
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn set_anchor(&mut self, position: Vec2) {
        self.anchor = position;
    }

    pub fn looking_right(&self) -> bool {
        self.looking_right
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Name of the behavior currently driving the action, if any.
    pub fn behavior_name(&self) -> Option<&str> {
        self.behavior.as_deref()
    }

    /// Ask for a behavior switch at the next opportunity. Pending
    /// requests override the selector.
    pub fn queue_behavior(&mut self, name: impl Into<String>) {
        self.queued = Some(name.into());
    }

    /// Advance one tick. Returns spawn requests for the manager to
    /// service.
    pub fn tick(&mut self, env: &Environment, total_count: usize) -> Vec<BreedRequest> {
        if self.destroyed {
            return Vec::new();
        }
        self.time += 1;

        if let Some(name) = self.queued.take() {
            self.apply_behavior(&name, env, total_count);
        } else if self.action.is_none() {
            self.select_next_behavior(env, total_count);
        }

        let catalogue = self.catalogue.clone();
        let mut events = Vec::new();
        let mut continuing = true;
        if let Some(action) = self.action.as_mut() {
            let mut ctx = ActionCtx {
                anchor: &mut self.anchor,
                looking_right: &mut self.looking_right,
                dragging: self.dragging,
                time: self.time,
                total_count,
                env,
                catalogue: &catalogue,
                events: &mut events,
            };
            if action.needs_interpolation() {
                for index in 0..SUBTICK_COUNT {
                    continuing = action.subtick(index, &mut ctx);
                    if !continuing {
                        break;
                    }
                }
            } else {
                continuing = action.tick(&mut ctx);
            }
        }
        let finished =
            !continuing || self.action.as_ref().map_or(false, |a| a.finished());

        self.drain(events);
        if self.destroyed {
            self.action = None;
            return std::mem::take(&mut self.pending_breeds);
        }

        if finished {
            if let Some(name) = self.queued.take() {
                self.apply_behavior(&name, env, total_count);
            } else {
                self.select_next_behavior(env, total_count);
            }
        }

        self.anchor = env.clamp(self.anchor);
        self.escape_corner(env, total_count);

        std::mem::take(&mut self.pending_breeds)
    }

    fn drain(&mut self, events: Vec<ActionEvent>) {
        for event in events {
            match event {
                ActionEvent::QueueBehavior(name) => self.queued = Some(name),
                ActionEvent::Breed(request) => self.pending_breeds.push(request),
                ActionEvent::Destroy => self.destroyed = true,
            }
        }
    }

    /// Switch to a named behavior now, interrupting the running action.
    pub fn set_behavior(&mut self, name: &str, env: &Environment, total_count: usize) {
        self.queued = None;
        self.apply_behavior(name, env, total_count);
    }

    fn apply_behavior(&mut self, name: &str, env: &Environment, total_count: usize) {
        let catalogue = self.catalogue.clone();
        let Some(def) = catalogue.behavior(name) else {
            if self.warned_behaviors.insert(name.to_owned()) {
                log::warn!("unknown behavior {name:?}");
            }
            if name != FALL_BEHAVIOR {
                self.apply_behavior(FALL_BEHAVIOR, env, total_count);
            } else {
                self.behavior = None;
                self.action = None;
            }
            return;
        };

        let Some(action_def) = catalogue.action(&def.action) else {
            if self.warned_actions.insert(def.action.clone()) {
                log::warn!("behavior {name:?}: unknown action {:?}", def.action);
            }
            if name != FALL_BEHAVIOR {
                self.apply_behavior(FALL_BEHAVIOR, env, total_count);
            } else {
                self.behavior = None;
                self.action = None;
            }
            return;
        };

        self.history.record(name, self.time);
        self.behavior = Some(name.to_owned());
        let mut action = Action::instantiate(action_def.clone());
        self.init_action(&mut action, env, total_count);
        self.action = Some(action);
    }

    fn init_action(&mut self, action: &mut Action, env: &Environment, total_count: usize) {
        let catalogue = self.catalogue.clone();
        let mut events = Vec::new();
        let mut ctx = ActionCtx {
            anchor: &mut self.anchor,
            looking_right: &mut self.looking_right,
            dragging: self.dragging,
            time: self.time,
            total_count,
            env,
            catalogue: &catalogue,
            events: &mut events,
        };
        action.init(&mut ctx);
        self.drain(events);
    }

    fn eval_context<'a>(&self, env: &'a Environment, total_count: usize) -> EvalContext<'a> {
        EvalContext {
            anchor: self.anchor,
            looking_right: self.looking_right,
            dragging: self.dragging,
            time: self.time,
            total_count,
            env,
        }
    }

    fn select_next_behavior(&mut self, env: &Environment, total_count: usize) {
        if self.history.is_oscillating() {
            self.nudge_off_edges(env);
            self.history.clear();
            self.apply_behavior(FALL_BEHAVIOR, env, total_count);
            return;
        }

        let catalogue = self.catalogue.clone();
        let ctx = self.eval_context(env, total_count);
        let mut candidates: Vec<Candidate> = match self
            .behavior
            .as_ref()
            .and_then(|name| catalogue.behavior(name))
        {
            Some(current) => behavior::collect_candidates(current, &catalogue, &ctx),
            None => behavior::generic_candidates(&catalogue, &ctx),
        };

        if self.near_top_corner(env) {
            behavior::prefer_ceiling_over_wall(&mut candidates);
        }

        let picked = behavior::pick_weighted(&candidates, &mut self.rng)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| FALL_BEHAVIOR.to_owned());
        self.apply_behavior(&picked, env, total_count);
    }

    fn near_top_corner(&self, env: &Environment) -> bool {
        let wa = &env.work_area;
        let near_side = self.anchor.x < wa.left() + EDGE_NEAR
            || self.anchor.x > wa.right() - EDGE_NEAR;
        let on_side = env.is_on_left_wall(self.anchor) || env.is_on_right_wall(self.anchor);
        let on_horizontal =
            env.is_on_floor(self.anchor) || env.is_on_ceiling(self.anchor);
        (self.anchor.y < wa.top() + CORNER_PREFERENCE_BAND && near_side)
            || (on_horizontal && on_side)
    }

    /// Move away from any border the mascot is pinned against, so the
    /// next selection sees open space.
    fn nudge_off_edges(&mut self, env: &Environment) {
        let wa = &env.work_area;
        if self.anchor.x < wa.left() + EDGE_NEAR {
            self.anchor.x = wa.left() + EDGE_CLEARANCE;
        } else if self.anchor.x > wa.right() - EDGE_NEAR {
            self.anchor.x = wa.right() - EDGE_CLEARANCE;
        }
        if self.anchor.y < wa.top() + EDGE_NEAR {
            self.anchor.y = wa.top() + EDGE_CLEARANCE;
        }
    }

    /// Teleport out of a top corner after lingering there too long.
    fn escape_corner(&mut self, env: &Environment, total_count: usize) {
        if self.dragging {
            self.corner_ticks = 0;
            return;
        }
        let wa = &env.work_area;
        let near_left = self.anchor.x <= wa.left() + CORNER_BOX;
        let near_right = self.anchor.x >= wa.right() - CORNER_BOX;
        let near_top = self.anchor.y <= wa.top() + CORNER_BOX;
        if near_top && (near_left || near_right) {
            self.corner_ticks += 1;
        } else {
            self.corner_ticks = 0;
            return;
        }
        if self.corner_ticks <= CORNER_STUCK_TICKS {
            return;
        }
        self.corner_ticks = 0;
        self.anchor.y = wa.top() + CORNER_PREFERENCE_BAND;
        self.anchor.x = if near_left {
            wa.left() + EDGE_CLEARANCE
        } else {
            wa.right() - EDGE_CLEARANCE
        };
        self.history.clear();
        self.apply_behavior(FALL_BEHAVIOR, env, total_count);
    }

    /// Put the mascot under cursor control. The anchor-to-cursor offset
    /// captured here is preserved for the whole drag.
    pub fn start_drag(&mut self, env: &Environment, total_count: usize) {
        self.dragging = true;
        self.queued = None;
        let offset = self.anchor - env.cursor;

        let catalogue = self.catalogue.clone();
        let def = catalogue
            .behavior(DRAGGED_BEHAVIOR)
            .and_then(|b| catalogue.action(&b.action))
            .cloned()
            .unwrap_or_else(|| self.synthetic_drag_def());

        if catalogue.behavior(DRAGGED_BEHAVIOR).is_some() {
            self.behavior = Some(DRAGGED_BEHAVIOR.to_owned());
        }

        let mut action = Action::instantiate(def);
        if let Action::Dragged(dragged) = &mut action {
            dragged.set_offset(offset);
        }
        self.init_action(&mut action, env, total_count);
        self.action = Some(action);
    }

    /// Drag stand-in when the catalogue ships no Dragged behavior:
    /// reuses the interrupted action's animations so the mascot keeps
    /// its look while held.
    fn synthetic_drag_def(&self) -> Rc<ActionDef> {
        let animations = self
            .action
            .as_ref()
            .map(|a| a.def().animations.clone())
            .unwrap_or_default();
        Rc::new(ActionDef {
            name: DRAGGED_BEHAVIOR.to_owned(),
            kind: ActionKind::Dragged,
            class_name: String::new(),
            border: None,
            condition: Script::literal_true(),
            animations,
            children: Vec::new(),
            params: ActionParams::default(),
        })
    }

    /// Release the mascot. A fast release hands the averaged cursor
    /// velocity to the Thrown behavior through the environment's cursor
    /// delta; a slow one just falls.
    pub fn stop_drag(&mut self, env: &mut Environment, total_count: usize) {
        self.dragging = false;
        let throw = match &self.action {
            Some(Action::Dragged(dragged)) => dragged.average_velocity(),
            _ => Vec2::ZERO,
        };

        let thrown_exists = self.catalogue.behavior(THROWN_BEHAVIOR).is_some();
        if thrown_exists
            && (throw.x.abs() > THROW_DEADBAND || throw.y.abs() > THROW_DEADBAND)
        {
            env.cursor_delta = throw * THROW_MULTIPLIER;
            self.set_behavior(THROWN_BEHAVIOR, env, total_count);
        } else {
            self.set_behavior(FALL_BEHAVIOR, env, total_count);
        }
    }

    /// Resolve the current pose into a drawable frame.
    pub fn current_frame(&mut self, env: &Environment, total_count: usize) -> Option<Frame> {
        let ctx = self.eval_context(env, total_count);
        let looking_right = self.looking_right;
        let pose = self.action.as_mut()?.current_pose(&ctx)?;
        let (image, mirrored) = if looking_right {
            (pose.image.clone(), false)
        } else if !pose.image_right.is_empty() {
            (pose.image_right.clone(), false)
        } else {
            (pose.image.clone(), true)
        };
        Some(Frame {
            image,
            anchor: pose.anchor,
            mirrored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;

    const ACTIONS: &str = r#"
        <Mascot>
          <ActionList>
            <Action Name="Fall" Type="Embedded" Class="action.FallAction"
                    InitialVX="0" InitialVY="0" Gravity="2"
                    RegistanceX="0.05" RegistanceY="0.1">
              <Animation>
                <Pose Image="/fall.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
              </Animation>
            </Action>
            <Action Name="Sit" Type="Stay" BorderType="Floor" Duration="20">
              <Animation>
                <Pose Image="/sit.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
              </Animation>
            </Action>
          </ActionList>
        </Mascot>
    "#;

    const BEHAVIORS: &str = r##"
        <Mascot>
          <BehaviorList>
            <Behavior Name="Fall" Frequency="0" Hidden="true">
              <NextBehaviorList Add="false">
                <BehaviorReference Name="Sit" Frequency="1"/>
              </NextBehaviorList>
            </Behavior>
            <Behavior Name="Sit" Frequency="1" Condition="#{mascot.environment.floor.isOn(mascot.anchor)}"/>
          </BehaviorList>
        </Mascot>
    "##;

    fn catalogue() -> Rc<Catalogue> {
        Rc::new(Catalogue::load(ACTIONS, BEHAVIORS).unwrap())
    }

    fn environment() -> Environment {
        Environment::new(Rect {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 300.0,
        })
    }

    #[test]
    fn spawns_into_fall_and_lands_on_floor() {
        let env = environment();
        let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 0.0), 3);

        mascot.tick(&env, 1);
        assert_eq!(mascot.behavior_name(), Some("Fall"));

        for _ in 0..400 {
            mascot.tick(&env, 1);
            if mascot.behavior_name() == Some("Sit") {
                break;
            }
        }
        assert_eq!(mascot.behavior_name(), Some("Sit"));
        assert_eq!(mascot.anchor().y, 300.0);
    }

    #[test]
    fn unknown_behavior_falls_back_to_fall() {
        let env = environment();
        let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 50.0), 3);
        mascot.set_behavior("NoSuchBehavior", &env, 1);
        assert_eq!(mascot.behavior_name(), Some("Fall"));
    }

    #[test]
    fn drag_pins_anchor_to_cursor_with_offset() {
        let mut env = environment();
        let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 100.0), 3);
        env.set_cursor(Vec2::new(90.0, 95.0));

        mascot.start_drag(&env, 1);
        assert!(mascot.is_dragging());

        env.set_cursor(Vec2::new(150.0, 120.0));
        mascot.tick(&env, 1);
        // Offset at grab was (10, 5).
        assert_eq!(mascot.anchor(), Vec2::new(160.0, 125.0));
        assert!(mascot.looking_right());
    }

    #[test]
    fn slow_release_falls() {
        let mut env = environment();
        let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 100.0), 3);
        env.set_cursor(Vec2::new(100.0, 100.0));
        mascot.start_drag(&env, 1);
        mascot.tick(&env, 1);
        mascot.stop_drag(&mut env, 1);
        assert!(!mascot.is_dragging());
        assert_eq!(mascot.behavior_name(), Some("Fall"));
    }

    #[test]
    fn frame_mirrors_when_facing_left_without_right_image() {
        let env = environment();
        let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 50.0), 3);
        mascot.tick(&env, 1);
        let frame = mascot.current_frame(&env, 1).unwrap();
        assert_eq!(frame.image, "fall.png");
        assert!(frame.mirrored);
    }
}
