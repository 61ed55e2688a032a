//! Parsed mascot catalogues: action templates and the behavior graph.
//!
//! A `Catalogue` is built once per distinct source location and shared
//! read-only by every mascot instantiated from it.

mod parse;

pub use parse::ParseError;

use crate::math::Vec2;
use crate::script::Script;
use std::collections::HashMap;
use std::rc::Rc;

/// Closed set of action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Stay,
    Animate,
    Move,
    Fall,
    Jump,
    Dragged,
    Look,
    Turn,
    Offset,
    Sequence,
    Select,
    SelfDestruct,
    Breed,
    Resist,
    /// Legacy marker, resolved to a concrete kind via the `Class`
    /// attribute or name heuristics, see `ActionDef::resolved_kind`.
    Embedded,
}

impl ActionKind {
    pub fn from_name(name: &str) -> Option<ActionKind> {
        let kind = match name {
            "Stay" => ActionKind::Stay,
            "Animate" => ActionKind::Animate,
            "Move" => ActionKind::Move,
            "Fall" => ActionKind::Fall,
            "Jump" => ActionKind::Jump,
            "Dragged" => ActionKind::Dragged,
            "Look" => ActionKind::Look,
            "Turn" => ActionKind::Turn,
            "Offset" => ActionKind::Offset,
            "Sequence" => ActionKind::Sequence,
            "Select" => ActionKind::Select,
            "SelfDestruct" => ActionKind::SelfDestruct,
            "Breed" => ActionKind::Breed,
            "Resist" => ActionKind::Resist,
            "Embedded" => ActionKind::Embedded,
            _ => return None,
        };
        Some(kind)
    }
}

/// Border affinity of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    Floor,
    Ceiling,
    Wall,
}

impl BorderKind {
    pub fn from_name(name: &str) -> Option<BorderKind> {
        match name {
            "Floor" => Some(BorderKind::Floor),
            "Ceiling" => Some(BorderKind::Ceiling),
            "Wall" => Some(BorderKind::Wall),
            _ => None,
        }
    }
}

/// One animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub image: String,
    /// Optional pre-mirrored sprite used when facing left.
    pub image_right: String,
    /// The sprite pixel that maps to the mascot's world anchor.
    pub anchor: Vec2,
    pub velocity: Vec2,
    /// Duration in ticks. 0 means instantaneous (does not block timing).
    pub duration: u32,
    pub sound: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotShape {
    Rectangle,
    Ellipse,
}

/// Pointer-interactive region of an animation. Hit-testing is a host
/// concern; the engine only carries the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub shape: HotspotShape,
    pub origin: Vec2,
    pub size: Vec2,
    pub behavior: String,
}

/// A guarded, ordered sequence of poses.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub condition: Script,
    pub poses: Vec<Pose>,
    pub hotspots: Vec<Hotspot>,
    pub total_duration: u32,
}

impl Animation {
    /// Pose under the looped animation clock. A zero-duration animation
    /// pins the first pose.
    pub fn pose_at(&self, time: u32) -> Option<&Pose> {
        if self.poses.is_empty() {
            return None;
        }
        if self.total_duration == 0 {
            return self.poses.first();
        }
        let mut remaining = (time % self.total_duration) as i64;
        for pose in &self.poses {
            remaining -= pose.duration as i64;
            if remaining < 0 {
                return Some(pose);
            }
        }
        self.poses.last()
    }
}

/// Kind-specific parameters, stored as compiled scripts so literal numbers
/// and `${...}` expressions share one representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionParams {
    pub target_x: Option<Script>,
    pub target_y: Option<Script>,
    pub initial_vx: Script,
    pub initial_vy: Script,
    pub gravity: Script,
    pub resistance_x: Script,
    pub resistance_y: Script,
    pub duration: Script,
    pub velocity: Script,
    pub born_x: Script,
    pub born_y: Script,
    pub born_behavior: Option<String>,
    pub born_mascot: Option<String>,
    pub born_transient: bool,
}

impl Default for ActionParams {
    fn default() -> Self {
        Self {
            target_x: None,
            target_y: None,
            initial_vx: Script::literal_num(0.0),
            initial_vy: Script::literal_num(0.0),
            gravity: Script::literal_num(2.0),
            resistance_x: Script::literal_num(0.05),
            resistance_y: Script::literal_num(0.1),
            duration: Script::literal_num(0.0),
            velocity: Script::literal_num(0.0),
            born_x: Script::literal_num(0.0),
            born_y: Script::literal_num(0.0),
            born_behavior: None,
            born_mascot: None,
            born_transient: true,
        }
    }
}

/// Parameter overrides carried by an `ActionReference`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    pub duration: Option<Script>,
    pub target_x: Option<Script>,
    pub target_y: Option<Script>,
    pub initial_vx: Option<Script>,
    pub initial_vy: Option<Script>,
}

/// Child of a composite action: inline definition or named reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionChild {
    Inline(Rc<ActionDef>),
    Reference(ActionRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRef {
    pub name: String,
    pub condition: Script,
    pub overrides: ParamOverrides,
}

/// A named action template.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDef {
    pub name: String,
    pub kind: ActionKind,
    /// Legacy dotted class name carried by `Embedded` actions.
    pub class_name: String,
    pub border: Option<BorderKind>,
    pub condition: Script,
    pub animations: Vec<Animation>,
    pub children: Vec<ActionChild>,
    pub params: ActionParams,
}

impl ActionDef {
    /// Resolve `Embedded` to a concrete kind: last segment of the class
    /// name if it names a known kind, else name heuristics, else Stay.
    pub fn resolved_kind(&self) -> ActionKind {
        if self.kind != ActionKind::Embedded {
            return self.kind;
        }
        if let Some(segment) = self.class_name.rsplit('.').next() {
            if let Some(kind) = ActionKind::from_name(segment) {
                if kind != ActionKind::Embedded {
                    return kind;
                }
            }
        }
        if self.name.contains("Fall") || self.name == "Falling" {
            ActionKind::Fall
        } else if self.name.contains("Drag") || self.name == "Pinched" {
            ActionKind::Dragged
        } else if self.name.contains("Breed") || self.name.contains("Divide") {
            ActionKind::Breed
        } else {
            ActionKind::Stay
        }
    }

    /// Clone with reference overrides merged over the template.
    pub fn with_overrides(&self, overrides: &ParamOverrides) -> ActionDef {
        let mut def = self.clone();
        if let Some(duration) = &overrides.duration {
            def.params.duration = duration.clone();
        }
        if let Some(target_x) = &overrides.target_x {
            def.params.target_x = Some(target_x.clone());
        }
        if let Some(target_y) = &overrides.target_y {
            def.params.target_y = Some(target_y.clone());
        }
        if let Some(initial_vx) = &overrides.initial_vx {
            def.params.initial_vx = initial_vx.clone();
        }
        if let Some(initial_vy) = &overrides.initial_vy {
            def.params.initial_vy = initial_vy.clone();
        }
        def
    }
}

/// Reference node of an explicit next-behavior list.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorRef {
    pub name: String,
    pub frequency: f32,
    pub condition: Script,
}

/// Entry of a next-behavior list: a reference or a guarded group.
#[derive(Debug, Clone, PartialEq)]
pub enum NextEntry {
    Reference(BehaviorRef),
    Group {
        condition: Script,
        entries: Vec<NextEntry>,
    },
}

/// Explicit successor list of a behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct NextBehaviors {
    /// Whether globally eligible behaviors are appended to the explicit
    /// candidates.
    pub add: bool,
    pub entries: Vec<NextEntry>,
}

/// A named node of the behavior graph.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorDef {
    pub name: String,
    /// Relative selection weight.
    pub frequency: f32,
    pub condition: Script,
    /// Excluded from generic candidate pools.
    pub hidden: bool,
    /// Name of the action this behavior runs.
    pub action: String,
    pub next: Option<NextBehaviors>,
}

/// Immutable result of parsing one mascot source.
#[derive(Debug, Default)]
pub struct Catalogue {
    actions: HashMap<String, Rc<ActionDef>>,
    /// Document order, so zero-weight selection is deterministic.
    behaviors: Vec<BehaviorDef>,
    behavior_index: HashMap<String, usize>,
    constants: HashMap<String, String>,
}

impl Catalogue {
    /// Parse the action and behavior documents into a catalogue.
    /// Individual malformed entries are skipped with a diagnostic; only an
    /// unreadable document fails the load.
    pub fn load(actions_xml: &str, behaviors_xml: &str) -> Result<Catalogue, ParseError> {
        parse::load(actions_xml, behaviors_xml)
    }

    pub(crate) fn insert_action(&mut self, def: ActionDef) {
        self.actions.insert(def.name.clone(), Rc::new(def));
    }

    pub(crate) fn insert_behavior(&mut self, def: BehaviorDef) {
        match self.behavior_index.get(&def.name) {
            Some(&index) => self.behaviors[index] = def,
            None => {
                self.behavior_index
                    .insert(def.name.clone(), self.behaviors.len());
                self.behaviors.push(def);
            }
        }
    }

    pub(crate) fn insert_constant(&mut self, name: String, value: String) {
        self.constants.insert(name, value);
    }

    pub fn action(&self, name: &str) -> Option<&Rc<ActionDef>> {
        self.actions.get(name)
    }

    pub fn behavior(&self, name: &str) -> Option<&BehaviorDef> {
        self.behavior_index.get(name).map(|&i| &self.behaviors[i])
    }

    /// Behaviors in document order.
    pub fn behaviors(&self) -> impl Iterator<Item = &BehaviorDef> {
        self.behaviors.iter()
    }

    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(String::as_str)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }
}
