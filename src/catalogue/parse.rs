//! Markup parsing for the two catalogue documents (actions, behaviors).
//!
//! The documents may be namespaced (matched by local tag name only) and may
//! use the legacy bilingual attribute/value vocabulary, mapped through a
//! fixed translation table before interpretation. Unparseable entries are
//! skipped with a diagnostic; only an unreadable document fails the load.

use super::{
    ActionChild, ActionDef, ActionKind, ActionRef, Animation, BehaviorDef, BehaviorRef,
    BorderKind, Catalogue, Hotspot, HotspotShape, NextBehaviors, NextEntry, ParamOverrides,
    Pose,
};
use crate::math::Vec2;
use crate::script::Script;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("truncated document")]
    Truncated,
}

/// Legacy attribute-name and enumerated-value translations.
const TRANSLATIONS: &[(&str, &str)] = &[
    // Action attributes
    ("種類", "Type"),
    ("名前", "Name"),
    ("条件", "Condition"),
    ("枠", "BorderType"),
    ("対象X", "TargetX"),
    ("対象Y", "TargetY"),
    ("初速X", "InitialVX"),
    ("初速Y", "InitialVY"),
    ("重力", "Gravity"),
    ("空気抵抗X", "RegistanceX"),
    ("空気抵抗Y", "RegistanceY"),
    ("長さ", "Duration"),
    ("目的地X", "TargetX"),
    ("目的地Y", "TargetY"),
    ("速度", "Velocity"),
    // Pose attributes
    ("画像", "Image"),
    ("右向き画像", "ImageRight"),
    ("基準座標", "ImageAnchor"),
    ("移動速度", "Velocity"),
    ("音声", "Sound"),
    // Behavior attributes
    ("頻度", "Frequency"),
    ("隠れる", "Hidden"),
    // Enumerated values
    ("床", "Floor"),
    ("天井", "Ceiling"),
    ("壁", "Wall"),
    ("静止", "Stay"),
    ("移動", "Move"),
    ("組み込み", "Embedded"),
    ("複合", "Sequence"),
    ("選択", "Select"),
];

fn translate(token: &str) -> &str {
    TRANSLATIONS
        .iter()
        .find(|(from, _)| *from == token)
        .map(|(_, to)| *to)
        .unwrap_or(token)
}

/// Minimal element tree keyed by local names, so namespaced documents and
/// repeated sections can be walked uniformly.
struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Attribute lookup through the translation table: both the attribute
    /// name and its value are normalized to the English vocabulary.
    fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(key, _)| translate(key) == name)
            .map(|(_, value)| translate(value).to_owned())
    }

    fn attr_or(&self, name: &str, default: &str) -> String {
        self.attr(name).unwrap_or_else(|| default.to_owned())
    }

    fn num_attr(&self, name: &str, default: f32) -> f32 {
        self.attr(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn bool_attr(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Attribute compiled as a script, if present.
    fn script_attr(&self, name: &str) -> Option<Script> {
        self.attr(name).map(|v| Script::parse(&v))
    }

    fn condition_attr(&self) -> Script {
        self.script_attr("Condition")
            .unwrap_or_else(Script::literal_true)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn read_document(xml: &str) -> Result<XmlNode, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(node_from_start(&start)?);
            }
            Event::Empty(start) => {
                let node = node_from_start(&start)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack.pop().ok_or(ParseError::Truncated)?;
                attach(&mut stack, &mut root, node);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Truncated);
    }
    root.ok_or(ParseError::NoRoot)
}

fn node_from_start(start: &quick_xml::events::BytesStart) -> Result<XmlNode, ParseError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Attribute(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::Attribute(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(XmlNode {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn parse_vec2(value: Option<String>, default: Vec2) -> Vec2 {
    let Some(value) = value else {
        return default;
    };
    let mut parts = value.split(',').map(|s| s.trim().parse::<f32>());
    let x = parts.next().and_then(Result::ok);
    let y = parts.next().and_then(Result::ok);
    match (x, y) {
        (Some(x), Some(y)) => Vec2::new(x, y),
        _ => default,
    }
}

fn parse_pose(node: &XmlNode) -> Pose {
    let strip = |s: String| s.strip_prefix('/').map(str::to_owned).unwrap_or(s);
    Pose {
        image: strip(node.attr_or("Image", "")),
        image_right: strip(node.attr_or("ImageRight", "")),
        anchor: parse_vec2(node.attr("ImageAnchor"), Vec2::new(64.0, 128.0)),
        velocity: parse_vec2(node.attr("Velocity"), Vec2::ZERO),
        duration: node.num_attr("Duration", 1.0).max(0.0) as u32,
        sound: node.attr("Sound"),
    }
}

fn parse_hotspot(node: &XmlNode) -> Hotspot {
    let shape = if node.attr_or("Shape", "Rectangle").eq_ignore_ascii_case("ellipse") {
        HotspotShape::Ellipse
    } else {
        HotspotShape::Rectangle
    };
    Hotspot {
        shape,
        origin: parse_vec2(node.attr("Origin"), Vec2::ZERO),
        size: parse_vec2(node.attr("Size"), Vec2::ZERO),
        behavior: node.attr_or("Behavior", ""),
    }
}

fn parse_animation(node: &XmlNode) -> Animation {
    let poses: Vec<Pose> = node.children_named("Pose").map(parse_pose).collect();
    let hotspots = node.children_named("Hotspot").map(parse_hotspot).collect();
    let total_duration = poses.iter().map(|p| p.duration).sum();
    Animation {
        condition: node.condition_attr(),
        poses,
        hotspots,
        total_duration,
    }
}

fn parse_overrides(node: &XmlNode) -> ParamOverrides {
    ParamOverrides {
        duration: node.script_attr("Duration"),
        target_x: node.script_attr("TargetX"),
        target_y: node.script_attr("TargetY"),
        initial_vx: node.script_attr("InitialVX"),
        initial_vy: node.script_attr("InitialVY"),
    }
}

fn parse_action(node: &XmlNode) -> ActionDef {
    let name = node.attr_or("Name", "");
    let kind_name = node.attr_or("Type", "Stay");
    let kind = ActionKind::from_name(&kind_name).unwrap_or_else(|| {
        log::warn!("action {name:?}: unknown kind {kind_name:?}, treating as Stay");
        ActionKind::Stay
    });

    let mut def = ActionDef {
        name,
        kind,
        class_name: node.attr_or("Class", ""),
        border: node.attr("BorderType").and_then(|b| BorderKind::from_name(&b)),
        condition: node.condition_attr(),
        animations: Vec::new(),
        children: Vec::new(),
        params: super::ActionParams {
            target_x: node.script_attr("TargetX"),
            target_y: node.script_attr("TargetY"),
            initial_vx: node
                .script_attr("InitialVX")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            initial_vy: node
                .script_attr("InitialVY")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            gravity: node
                .script_attr("Gravity")
                .unwrap_or_else(|| Script::literal_num(2.0)),
            resistance_x: node
                .script_attr("RegistanceX")
                .unwrap_or_else(|| Script::literal_num(0.05)),
            resistance_y: node
                .script_attr("RegistanceY")
                .unwrap_or_else(|| Script::literal_num(0.1)),
            duration: node
                .script_attr("Duration")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            velocity: node
                .script_attr("Velocity")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            born_x: node
                .script_attr("BornX")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            born_y: node
                .script_attr("BornY")
                .unwrap_or_else(|| Script::literal_num(0.0)),
            born_behavior: node.attr("BornBehavior").filter(|s| !s.is_empty()),
            born_mascot: node.attr("BornMascot").filter(|s| !s.is_empty()),
            born_transient: node.bool_attr("BornTransient", true),
        },
    };

    for child in &node.children {
        match child.name.as_str() {
            "Animation" => def.animations.push(parse_animation(child)),
            "ActionReference" => def.children.push(ActionChild::Reference(ActionRef {
                name: child.attr_or("Name", ""),
                condition: child.condition_attr(),
                overrides: parse_overrides(child),
            })),
            "Action" => def
                .children
                .push(ActionChild::Inline(std::rc::Rc::new(parse_action(child)))),
            _ => {}
        }
    }

    def
}

fn parse_next_list(node: &XmlNode) -> Vec<NextEntry> {
    let mut entries = Vec::new();
    for child in &node.children {
        match child.name.as_str() {
            "BehaviorReference" => entries.push(NextEntry::Reference(BehaviorRef {
                name: child.attr_or("Name", ""),
                frequency: child.num_attr("Frequency", 1.0),
                condition: child.condition_attr(),
            })),
            "Condition" => entries.push(NextEntry::Group {
                condition: child.condition_attr(),
                entries: parse_next_list(child),
            }),
            _ => {}
        }
    }
    entries
}

fn parse_behavior(node: &XmlNode) -> BehaviorDef {
    let name = node.attr_or("Name", "");
    let mut behavior = BehaviorDef {
        frequency: node.num_attr("Frequency", 1.0),
        condition: node.condition_attr(),
        hidden: node.bool_attr("Hidden", false),
        action: name.clone(),
        name,
        next: None,
    };

    for child in &node.children {
        match child.name.as_str() {
            "ActionReference" | "Action" => {
                let action = child.attr_or("Name", "");
                if !action.is_empty() {
                    behavior.action = action;
                }
            }
            "NextBehaviorList" | "NextBehavior" => {
                behavior.next = Some(NextBehaviors {
                    add: child.bool_attr("Add", true),
                    entries: parse_next_list(child),
                });
            }
            _ => {}
        }
    }

    behavior
}

pub(super) fn load(actions_xml: &str, behaviors_xml: &str) -> Result<Catalogue, ParseError> {
    let mut catalogue = Catalogue::default();

    let actions_root = read_document(actions_xml)?;
    let mut list_count = 0;
    for action_list in actions_root.children_named("ActionList") {
        list_count += 1;
        for node in action_list.children_named("Action") {
            let def = parse_action(node);
            if def.name.is_empty() {
                log::warn!("skipping action without a name");
                continue;
            }
            catalogue.insert_action(def);
        }
    }
    if list_count == 0 {
        log::warn!("no ActionList found in actions document");
    }

    let behaviors_root = read_document(behaviors_xml)?;
    match behaviors_root.children_named("BehaviorList").next() {
        Some(behavior_list) => {
            for child in &behavior_list.children {
                match child.name.as_str() {
                    "Constant" => {
                        let name = child.attr_or("Name", "");
                        let value = child.attr_or("Value", "");
                        if !name.is_empty() {
                            catalogue.insert_constant(name, value);
                        }
                    }
                    "Behavior" => insert_behavior(&mut catalogue, parse_behavior(child), None),
                    "Condition" => {
                        // Top-level condition groups wrap nested behaviors.
                        let group = child.condition_attr();
                        for node in child.children_named("Behavior") {
                            insert_behavior(&mut catalogue, parse_behavior(node), Some(&group));
                        }
                    }
                    _ => {}
                }
            }
        }
        None => log::warn!("no BehaviorList found in behaviors document"),
    }

    log::debug!(
        "catalogue loaded: {} actions, {} behaviors",
        catalogue.action_count(),
        catalogue.behavior_count()
    );
    Ok(catalogue)
}

fn insert_behavior(catalogue: &mut Catalogue, mut behavior: BehaviorDef, group: Option<&Script>) {
    if behavior.name.is_empty() {
        log::warn!("skipping behavior without a name");
        return;
    }
    if let Some(group) = group {
        behavior.condition = if behavior.condition.is_default_true() {
            group.clone()
        } else {
            Script::and(group, &behavior.condition)
        };
    }
    catalogue.insert_behavior(behavior);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: &str = r#"
        <Mascot xmlns="http://example.org/mascot">
          <ActionList>
            <Action Name="Stand" Type="Stay" BorderType="Floor">
              <Animation>
                <Pose Image="/stand1.png" ImageAnchor="64,128" Velocity="0,0" Duration="10"/>
                <Pose Image="/stand2.png" ImageAnchor="64,128" Velocity="0,0" Duration="10"/>
              </Animation>
            </Action>
            <Action Name="Fall" Type="Fall" InitialVX="${mascot.environment.cursor.dx}"/>
          </ActionList>
          <ActionList>
            <Action Name="Walk" Type="Move" BorderType="Floor" TargetX="${mascot.environment.workArea.right}">
              <Animation>
                <Pose Image="walk1.png" Velocity="-2,0" Duration="4"/>
              </Animation>
            </Action>
            <Action Name="WalkAndStand" Type="Sequence">
              <ActionReference Name="Walk" TargetX="100"/>
              <ActionReference Name="Stand" Duration="50"/>
            </Action>
          </ActionList>
        </Mascot>
    "#;

    const BEHAVIORS: &str = r#"
        <Mascot>
          <BehaviorList>
            <Constant Name="WalkChance" Value="0.4"/>
            <Behavior Name="Fall" Frequency="0" Hidden="true"/>
            <Behavior Name="Stand" Frequency="10">
              <NextBehaviorList Add="false">
                <BehaviorReference Name="Walk" Frequency="2"/>
              </NextBehaviorList>
            </Behavior>
            <Condition Condition="${mascot.environment.floor.isOn(mascot.anchor)}">
              <Behavior Name="Walk" Frequency="5"/>
            </Condition>
          </BehaviorList>
        </Mascot>
    "#;

    #[test]
    fn loads_namespaced_and_merged_lists() {
        let catalogue = load(ACTIONS, BEHAVIORS).unwrap();
        assert_eq!(catalogue.action_count(), 4);
        assert_eq!(catalogue.behavior_count(), 3);

        let stand = catalogue.action("Stand").unwrap();
        assert_eq!(stand.kind, ActionKind::Stay);
        assert_eq!(stand.border, Some(BorderKind::Floor));
        assert_eq!(stand.animations[0].total_duration, 20);
        assert_eq!(stand.animations[0].poses[0].image, "stand1.png");

        let seq = catalogue.action("WalkAndStand").unwrap();
        assert_eq!(seq.children.len(), 2);
        match &seq.children[1] {
            ActionChild::Reference(r) => {
                assert_eq!(r.name, "Stand");
                assert!(r.overrides.duration.is_some());
            }
            other => panic!("unexpected child: {other:?}"),
        }
    }

    #[test]
    fn behavior_graph_and_constants() {
        let catalogue = load(ACTIONS, BEHAVIORS).unwrap();
        assert_eq!(catalogue.constant("WalkChance"), Some("0.4"));

        let fall = catalogue.behavior("Fall").unwrap();
        assert!(fall.hidden);
        assert_eq!(fall.frequency, 0.0);
        assert_eq!(fall.action, "Fall");

        let stand = catalogue.behavior("Stand").unwrap();
        let next = stand.next.as_ref().unwrap();
        assert!(!next.add);
        assert_eq!(next.entries.len(), 1);

        // The wrapping condition group became the behavior's own guard.
        let walk = catalogue.behavior("Walk").unwrap();
        assert!(!walk.condition.is_default_true());
    }

    #[test]
    fn bilingual_attributes_translate() {
        let actions = r#"
            <マスコット>
              <ActionList>
                <Action 名前="Tatsu" 種類="静止" 枠="床" 長さ="5"/>
              </ActionList>
            </マスコット>
        "#;
        let behaviors = "<Mascot><BehaviorList/></Mascot>";
        let catalogue = load(actions, behaviors).unwrap();
        let action = catalogue.action("Tatsu").unwrap();
        assert_eq!(action.kind, ActionKind::Stay);
        assert_eq!(action.border, Some(BorderKind::Floor));
    }

    #[test]
    fn missing_containers_yield_empty_catalogue() {
        let catalogue = load("<Empty/>", "<Empty/>").unwrap();
        assert_eq!(catalogue.action_count(), 0);
        assert_eq!(catalogue.behavior_count(), 0);
    }

    #[test]
    fn unreadable_document_fails() {
        assert!(load("<Mascot><ActionList></Mascot>", "<Mascot/>").is_err());
    }
}
