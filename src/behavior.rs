//! Behavior-transition selection: weighted candidate collection over the
//! behavior graph, oscillation detection, corner preference filtering, and
//! weighted random pick.

use crate::catalogue::{BehaviorDef, Catalogue, NextEntry};
use crate::script::EvalContext;
use crate::util::RingBuffer;

/// The fallback behavior every degenerate path converges on.
pub const FALL_BEHAVIOR: &str = "Fall";

/// Entries of behavior history kept for oscillation detection.
pub const HISTORY_CAPACITY: usize = 10;

/// How many recent entries the oscillation test inspects.
pub const OSCILLATION_WINDOW: usize = 6;

/// Oscillation: at most this many distinct names in the window...
pub const OSCILLATION_DISTINCT: usize = 3;

/// ...spanning fewer than this many ticks.
pub const OSCILLATION_SPAN: u32 = 30;

/// A selectable `{name, weight}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub frequency: f32,
}

#[derive(Debug, Clone, Default)]
struct HistoryEntry {
    name: String,
    time: u32,
}

/// Bounded ring of recently entered behaviors, per mascot.
pub struct BehaviorHistory {
    ring: RingBuffer<HistoryEntry>,
}

impl BehaviorHistory {
    pub fn new() -> Self {
        Self {
            ring: RingBuffer::new(HISTORY_CAPACITY),
        }
    }

    pub fn record(&mut self, name: &str, time: u32) {
        self.ring.push(HistoryEntry {
            name: name.to_owned(),
            time,
        });
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// True when the recent window collapses to a few names in a short
    /// span, i.e. the mascot is ping-ponging between behaviors.
    pub fn is_oscillating(&self) -> bool {
        if self.ring.len() < OSCILLATION_DISTINCT {
            return false;
        }
        let skip = self.ring.len().saturating_sub(OSCILLATION_WINDOW);
        let recent: Vec<&HistoryEntry> = self.ring.iter().skip(skip).collect();
        let mut names: Vec<&str> = recent.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() > OSCILLATION_DISTINCT {
            return false;
        }
        let span = recent[recent.len() - 1].time - recent[0].time;
        span < OSCILLATION_SPAN
    }
}

impl Default for BehaviorHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Every non-hidden, positive-weight behavior whose guard holds.
pub fn generic_candidates(catalogue: &Catalogue, ctx: &EvalContext) -> Vec<Candidate> {
    catalogue
        .behaviors()
        .filter(|b| !b.hidden && b.frequency > 0.0 && b.condition.eval_bool(ctx))
        .map(|b| Candidate {
            name: b.name.clone(),
            frequency: b.frequency,
        })
        .collect()
}

/// Candidate set for the behavior that just finished: its explicit
/// next-behavior tree when present (plus the generic pool if the list
/// allows), otherwise the generic pool.
pub fn collect_candidates(
    behavior: &BehaviorDef,
    catalogue: &Catalogue,
    ctx: &EvalContext,
) -> Vec<Candidate> {
    let Some(next) = &behavior.next else {
        return generic_candidates(catalogue, ctx);
    };

    let mut candidates = Vec::new();
    walk_entries(&next.entries, catalogue, ctx, &mut candidates);

    if next.add && !candidates.is_empty() {
        for generic in generic_candidates(catalogue, ctx) {
            // The merge must not duplicate an explicit entry.
            if !candidates.iter().any(|c| c.name == generic.name) {
                candidates.push(generic);
            }
        }
    }

    candidates
}

fn walk_entries(
    entries: &[NextEntry],
    catalogue: &Catalogue,
    ctx: &EvalContext,
    out: &mut Vec<Candidate>,
) {
    for entry in entries {
        match entry {
            NextEntry::Reference(reference) => {
                if !reference.condition.eval_bool(ctx) {
                    continue;
                }
                // Both the reference's guard and the target's own guard
                // must hold.
                let Some(target) = catalogue.behavior(&reference.name) else {
                    continue;
                };
                if target.condition.eval_bool(ctx) {
                    out.push(Candidate {
                        name: reference.name.clone(),
                        frequency: reference.frequency,
                    });
                }
            }
            NextEntry::Group { condition, entries } => {
                if condition.eval_bool(ctx) {
                    walk_entries(entries, catalogue, ctx, out);
                }
            }
        }
    }
}

/// Near top corners, ceiling-affinity candidates win over wall-affinity
/// ones when both are present.
pub fn prefer_ceiling_over_wall(candidates: &mut Vec<Candidate>) {
    let has_ceiling = candidates
        .iter()
        .any(|c| c.name.to_lowercase().contains("ceiling"));
    let has_wall = candidates
        .iter()
        .any(|c| c.name.to_lowercase().contains("wall"));
    if has_ceiling && has_wall {
        candidates.retain(|c| !c.name.to_lowercase().contains("wall"));
    }
}

/// Weighted random selection. A zero total weight selects the first
/// candidate deterministically.
pub fn pick_weighted<'a>(
    candidates: &'a [Candidate],
    rng: &mut fastrand::Rng,
) -> Option<&'a Candidate> {
    if candidates.is_empty() {
        return None;
    }
    let total: f32 = candidates.iter().map(|c| c.frequency).sum();
    if total <= 0.0 {
        return candidates.first();
    }
    let mut roll = rng.f32() * total;
    for candidate in candidates {
        roll -= candidate.frequency;
        if roll <= 0.0 {
            return Some(candidate);
        }
    }
    candidates.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn candidates(weights: &[(&str, f32)]) -> Vec<Candidate> {
        weights
            .iter()
            .map(|(name, frequency)| Candidate {
                name: (*name).to_owned(),
                frequency: *frequency,
            })
            .collect()
    }

    #[test]
    fn weighted_pick_converges_to_weight_shares() {
        let set = candidates(&[("a", 1.0), ("b", 3.0)]);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut counts: HashMap<String, u32> = HashMap::new();
        const TRIALS: u32 = 20_000;
        for _ in 0..TRIALS {
            let picked = pick_weighted(&set, &mut rng).unwrap();
            *counts.entry(picked.name.clone()).or_default() += 1;
        }
        let share_b = counts["b"] as f32 / TRIALS as f32;
        assert!((share_b - 0.75).abs() < 0.02, "share_b = {share_b}");
    }

    #[test]
    fn zero_total_weight_selects_first() {
        let set = candidates(&[("a", 0.0), ("b", 0.0)]);
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..10 {
            assert_eq!(pick_weighted(&set, &mut rng).unwrap().name, "a");
        }
    }

    #[test]
    fn empty_set_picks_nothing() {
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(pick_weighted(&[], &mut rng).is_none());
    }

    #[test]
    fn oscillation_requires_short_span() {
        let names = ["ClimbWall", "ClimbCeiling"];
        let mut history = BehaviorHistory::new();
        for (i, name) in names.iter().cycle().copied().take(6).enumerate() {
            history.record(name, i as u32 * 4);
        }
        // 6 entries, 2 distinct names, 20-tick span: oscillating.
        assert!(history.is_oscillating());

        let mut slow = BehaviorHistory::new();
        for (i, name) in names.iter().cycle().copied().take(6).enumerate() {
            slow.record(name, i as u32 * 8);
        }
        // Same alternation over 40 ticks: not oscillating.
        assert!(!slow.is_oscillating());
    }

    #[test]
    fn oscillation_needs_enough_history() {
        let mut history = BehaviorHistory::new();
        history.record("A", 0);
        history.record("B", 1);
        assert!(!history.is_oscillating());
    }

    #[test]
    fn corner_filter_prefers_ceiling() {
        let mut set = candidates(&[("GrabWall", 1.0), ("ClimbCeiling", 1.0), ("Sit", 1.0)]);
        prefer_ceiling_over_wall(&mut set);
        assert!(set.iter().all(|c| !c.name.contains("Wall")));
        assert_eq!(set.len(), 2);

        // Without a ceiling alternative, wall candidates survive.
        let mut walls_only = candidates(&[("GrabWall", 1.0), ("Sit", 1.0)]);
        prefer_ceiling_over_wall(&mut walls_only);
        assert_eq!(walls_only.len(), 2);
    }
}
