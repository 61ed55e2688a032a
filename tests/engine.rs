//! End-to-end scenarios through the public API: XML in, ticked mascots
//! out.

use deskpet::{Catalogue, Environment, Manager, Mascot, Rect, Vec2};
use std::rc::Rc;

const ACTIONS: &str = r#"
    <Mascot>
      <ActionList>
        <Action Name="Fall" Type="Embedded" Class="shimeji.action.FallAction"
                InitialVX="0" InitialVY="0" Gravity="2"
                RegistanceX="0.05" RegistanceY="0.1">
          <Animation>
            <Pose Image="fall.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
          </Animation>
        </Action>
        <Action Name="Sit" Type="Stay" BorderType="Floor" Duration="30">
          <Animation>
            <Pose Image="sit.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
          </Animation>
        </Action>
        <Action Name="SitLong" Type="Stay" BorderType="Floor" Duration="30">
          <Animation>
            <Pose Image="sit2.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
          </Animation>
        </Action>
        <Action Name="Nod" Type="Stay" Duration="3">
          <Animation>
            <Pose Image="nod.png" ImageAnchor="64,128" Velocity="0,0" Duration="3"/>
          </Animation>
        </Action>
        <Action Name="Bow" Type="Stay" Duration="4">
          <Animation>
            <Pose Image="bow.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
          </Animation>
        </Action>
        <Action Name="Greet" Type="Sequence">
          <ActionReference Name="Nod"/>
          <ActionReference Name="Bow"/>
        </Action>
        <Action Name="Walk" Type="Move" BorderType="Floor">
          <Animation>
            <Pose Image="walk.png" ImageAnchor="64,128" Velocity="2,0" Duration="4"/>
          </Animation>
        </Action>
        <Action Name="WalkHome" Type="Sequence">
          <ActionReference Name="Walk" TargetX="40"/>
          <ActionReference Name="Nod"/>
        </Action>
        <Action Name="Split" Type="Breed" BornBehavior="Fall" BornX="10" BornY="0">
          <Animation>
            <Pose Image="split.png" ImageAnchor="64,128" Velocity="0,0" Duration="10"/>
          </Animation>
        </Action>
      </ActionList>
    </Mascot>
"#;

const BEHAVIORS: &str = r##"
    <Mascot>
      <BehaviorList>
        <Behavior Name="Fall" Frequency="0" Hidden="true"/>
        <Behavior Name="Sit" Frequency="1"
                  Condition="#{mascot.environment.floor.isOn(mascot.anchor) &amp;&amp; mascot.anchor.x &lt; mascot.environment.screen.width / 2}"/>
        <Behavior Name="SitLong" Frequency="1"
                  Condition="#{mascot.environment.floor.isOn(mascot.anchor) &amp;&amp; mascot.anchor.x &gt;= mascot.environment.screen.width / 2}"/>
        <Behavior Name="Greet" Frequency="0" Hidden="true"/>
        <Behavior Name="Split" Frequency="0" Hidden="true"/>
        <Behavior Name="WalkHome" Frequency="0" Hidden="true"/>
      </BehaviorList>
    </Mascot>
"##;

fn catalogue() -> Rc<Catalogue> {
    let _ = env_logger::builder().is_test(true).try_init();
    Rc::new(Catalogue::load(ACTIONS, BEHAVIORS).unwrap())
}

fn work_area(width: f32, height: f32) -> Rect {
    Rect {
        x: 0.0,
        y: 0.0,
        width,
        height,
    }
}

#[test]
fn fall_lands_exactly_on_floor_and_transitions() {
    let env = Environment::new(work_area(400.0, 300.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 0.0), 11);

    let mut landed_at = None;
    for tick in 1..=400 {
        mascot.tick(&env, 1);
        if mascot.anchor().y >= 300.0 {
            landed_at = Some(tick);
            break;
        }
    }
    let landed_at = landed_at.expect("never reached the floor");
    assert_eq!(mascot.anchor().y, 300.0);

    // The floor-bound behavior takes over right after landing.
    mascot.tick(&env, 1);
    assert_eq!(mascot.behavior_name(), Some("Sit"));
    assert!(landed_at < 100, "landing took {landed_at} ticks");
}

#[test]
fn fall_velocity_follows_the_drag_recurrence() {
    // v(n+1) = v(n) * (1 - r) + g, so v(n) = (g/r) * (1 - (1-r)^n).
    let env = Environment::new(work_area(400.0, 100_000.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(200.0, 0.0), 11);

    let mut previous = mascot.anchor().y;
    for n in 1..=120u32 {
        mascot.tick(&env, 1);
        let delta = mascot.anchor().y - previous;
        previous = mascot.anchor().y;
        let expected = 20.0 * (1.0 - 0.9f32.powi(n as i32));
        assert!(
            (delta - expected).abs() < 1e-2,
            "tick {n}: delta {delta}, expected {expected}"
        );
    }
    // Terminal velocity is gravity over resistance.
    let delta = {
        let before = mascot.anchor().y;
        mascot.tick(&env, 1);
        mascot.anchor().y - before
    };
    assert!((delta - 20.0).abs() < 0.1);
}

#[test]
fn anchor_stays_inside_the_work_area() {
    let env = Environment::new(work_area(400.0, 300.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(-50.0, -50.0), 11);

    for _ in 0..500 {
        mascot.tick(&env, 1);
        let a = mascot.anchor();
        assert!(a.x >= 0.0 && a.x <= 400.0, "x out of bounds: {a:?}");
        assert!(a.y >= 0.0 && a.y <= 300.0, "y out of bounds: {a:?}");
    }
}

#[test]
fn sequence_runs_for_the_sum_of_child_durations() {
    let env = Environment::new(work_area(400.0, 300.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 300.0), 11);
    mascot.queue_behavior("Greet");

    mascot.tick(&env, 1);
    assert_eq!(mascot.behavior_name(), Some("Greet"));

    // Nod takes 3 ticks, Bow 4; the switch happens on tick 7.
    for _ in 0..5 {
        mascot.tick(&env, 1);
        assert_eq!(mascot.behavior_name(), Some("Greet"));
    }
    mascot.tick(&env, 1);
    assert_ne!(mascot.behavior_name(), Some("Greet"));
}

#[test]
fn sequence_outlives_an_interpolating_child() {
    let env = Environment::new(work_area(400.0, 300.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 300.0), 11);
    mascot.queue_behavior("WalkHome");

    // Facing left, the walk covers 60 px at 2 px/tick, then Nod runs
    // for its 3 ticks before the selector takes over.
    let mut ticks = 0;
    while mascot.behavior_name() != Some("Sit") {
        mascot.tick(&env, 1);
        ticks += 1;
        assert!(ticks <= 50, "sequence never handed off to the selector");
        if ticks <= 32 {
            assert_eq!(mascot.behavior_name(), Some("WalkHome"));
        }
    }
    assert_eq!(mascot.anchor().x, 40.0);
    assert_eq!(ticks, 33);
}

#[test]
fn breed_fires_once_at_half_duration() {
    let env = Environment::new(work_area(400.0, 300.0));
    let mut mascot = Mascot::with_seed(catalogue(), Vec2::new(100.0, 300.0), 11);
    mascot.queue_behavior("Split");

    let mut requests = Vec::new();
    let mut fired_on = None;
    for tick in 1..=10 {
        let mut out = mascot.tick(&env, 1);
        if !out.is_empty() && fired_on.is_none() {
            fired_on = Some(tick);
        }
        requests.append(&mut out);
    }
    assert_eq!(requests.len(), 1);
    // Animation lasts 10 ticks, so the spawn lands on tick 5.
    assert_eq!(fired_on, Some(5));
    assert_eq!(requests[0].behavior, "Fall");
    assert_eq!(requests[0].position, Vec2::new(110.0, 300.0));
}

#[test]
fn behavior_guards_see_the_environment() {
    let env = Environment::new(work_area(400.0, 300.0));

    // Left half of the floor selects Sit, right half SitLong.
    let mut left = Mascot::with_seed(catalogue(), Vec2::new(50.0, 299.0), 11);
    for _ in 0..20 {
        left.tick(&env, 1);
    }
    assert_eq!(left.behavior_name(), Some("Sit"));

    let mut right = Mascot::with_seed(catalogue(), Vec2::new(350.0, 299.0), 11);
    for _ in 0..20 {
        right.tick(&env, 1);
    }
    assert_eq!(right.behavior_name(), Some("SitLong"));
}

#[test]
fn manager_services_breeding_through_the_roster() {
    let mut manager = Manager::new(work_area(400.0, 300.0));
    let catalogue = manager.load_catalogue("pack", ACTIONS, BEHAVIORS).unwrap();
    manager.spawn(catalogue, Vec2::new(100.0, 300.0));
    manager.mascots_mut()[0].queue_behavior("Split");

    for _ in 0..12 {
        manager.tick();
    }
    assert_eq!(manager.count(), 2);
}
