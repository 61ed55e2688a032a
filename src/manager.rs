//! Population management: owns the shared environment, a cache of loaded
//! catalogues, and the mascot roster; services breed requests with the
//! configured limits.

use crate::action::BreedRequest;
use crate::catalogue::{Catalogue, ParseError};
use crate::environment::Environment;
use crate::mascot::Mascot;
use crate::math::{Rect, Vec2};
use std::collections::HashMap;
use std::rc::Rc;

/// Default cap on the mascot population.
pub const DEFAULT_MAX_MASCOTS: usize = 50;

pub struct Manager {
    env: Environment,
    catalogues: HashMap<String, Rc<Catalogue>>,
    mascots: Vec<Mascot>,
    pub allow_breeding: bool,
    pub max_mascots: usize,
}

impl Manager {
    pub fn new(work_area: Rect) -> Self {
        Self {
            env: Environment::new(work_area),
            catalogues: HashMap::new(),
            mascots: Vec::new(),
            allow_breeding: true,
            max_mascots: DEFAULT_MAX_MASCOTS,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Parse and cache a catalogue under a key. Loading the same key
    /// again returns the cached copy without re-parsing.
    pub fn load_catalogue(
        &mut self,
        key: &str,
        actions_xml: &str,
        behaviors_xml: &str,
    ) -> Result<Rc<Catalogue>, ParseError> {
        if let Some(found) = self.catalogues.get(key) {
            return Ok(found.clone());
        }
        let catalogue = Rc::new(Catalogue::load(actions_xml, behaviors_xml)?);
        self.catalogues.insert(key.to_owned(), catalogue.clone());
        Ok(catalogue)
    }

    pub fn catalogue(&self, key: &str) -> Option<&Rc<Catalogue>> {
        self.catalogues.get(key)
    }

    /// Add a mascot at a position. Respects the population cap.
    pub fn spawn(&mut self, catalogue: Rc<Catalogue>, position: Vec2) -> Option<&mut Mascot> {
        if self.mascots.len() >= self.max_mascots {
            log::info!("mascot cap {} reached, spawn ignored", self.max_mascots);
            return None;
        }
        self.mascots.push(Mascot::new(catalogue, position));
        self.mascots.last_mut()
    }

    pub fn mascots(&self) -> &[Mascot] {
        &self.mascots
    }

    pub fn mascots_mut(&mut self) -> &mut [Mascot] {
        &mut self.mascots
    }

    pub fn count(&self) -> usize {
        self.mascots.len()
    }

    /// Tick every mascot once, then service breed requests and drop
    /// destroyed mascots.
    pub fn tick(&mut self) {
        let total = self.mascots.len();
        let mut births: Vec<(Rc<Catalogue>, BreedRequest)> = Vec::new();

        for mascot in &mut self.mascots {
            let catalogue = mascot.catalogue().clone();
            for request in mascot.tick(&self.env, total) {
                births.push((catalogue.clone(), request));
            }
        }

        self.mascots.retain(|m| !m.is_destroyed());

        if !self.allow_breeding {
            return;
        }
        for (catalogue, request) in births {
            if self.mascots.len() >= self.max_mascots {
                break;
            }
            // Cross-catalogue children need their source loaded already.
            let source = match &request.mascot {
                Some(key) => match self.catalogues.get(key) {
                    Some(found) => found.clone(),
                    None => {
                        log::warn!("breed: unknown mascot source {key:?}");
                        continue;
                    }
                },
                None => catalogue,
            };
            let mut child = Mascot::new(source, request.position);
            child.queue_behavior(request.behavior);
            self.mascots.push(child);
        }
    }

    /// Remove one mascot by index.
    pub fn dismiss(&mut self, index: usize) {
        if index < self.mascots.len() {
            self.mascots.remove(index);
        }
    }

    pub fn dismiss_all(&mut self) {
        self.mascots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: &str = r#"
        <Mascot>
          <ActionList>
            <Action Name="Fall" Type="Embedded" Class="action.FallAction" Gravity="2">
              <Animation>
                <Pose Image="fall.png" ImageAnchor="64,128" Velocity="0,0" Duration="4"/>
              </Animation>
            </Action>
            <Action Name="Split" Type="Breed" Duration="8" BornBehavior="Fall">
              <Animation>
                <Pose Image="split.png" ImageAnchor="64,128" Velocity="0,0" Duration="8"/>
              </Animation>
            </Action>
          </ActionList>
        </Mascot>
    "#;

    const BEHAVIORS: &str = r#"
        <Mascot>
          <BehaviorList>
            <Behavior Name="Fall" Frequency="1"/>
            <Behavior Name="Split" Frequency="0" Hidden="true"/>
          </BehaviorList>
        </Mascot>
    "#;

    fn work_area() -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 300.0,
        }
    }

    fn manager_with_catalogue() -> (Manager, Rc<Catalogue>) {
        let mut manager = Manager::new(work_area());
        let catalogue = manager
            .load_catalogue("shimeji", ACTIONS, BEHAVIORS)
            .unwrap();
        (manager, catalogue)
    }

    #[test]
    fn catalogue_cache_returns_same_instance() {
        let (mut manager, first) = manager_with_catalogue();
        let second = manager
            .load_catalogue("shimeji", "<Mascot/>", "<Mascot/>")
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn breeding_spawns_a_child() {
        let (mut manager, catalogue) = manager_with_catalogue();
        manager.spawn(catalogue, Vec2::new(100.0, 300.0));
        manager.mascots_mut()[0].queue_behavior("Split");

        for _ in 0..10 {
            manager.tick();
        }
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn breeding_disabled_suppresses_children() {
        let (mut manager, catalogue) = manager_with_catalogue();
        manager.allow_breeding = false;
        manager.spawn(catalogue, Vec2::new(100.0, 300.0));
        manager.mascots_mut()[0].queue_behavior("Split");

        for _ in 0..10 {
            manager.tick();
        }
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn population_cap_blocks_spawn() {
        let (mut manager, catalogue) = manager_with_catalogue();
        manager.max_mascots = 1;
        assert!(manager.spawn(catalogue.clone(), Vec2::ZERO).is_some());
        assert!(manager.spawn(catalogue, Vec2::ZERO).is_none());
    }
}
