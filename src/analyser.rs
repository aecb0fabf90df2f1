use crate::deadlocks::DeadlockDetector;
use crate::grid::{Grid, MAX_BOXES, Point};
use crate::movement::{FeatureId, TickResult};

/// Semantic happenings of one tick, for the layers above the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisEvent {
    HeroMoved { from: Point, to: Point },
    BoxMoved { id: FeatureId, from: Point, to: Point },
    BoxLandedOnTarget { id: FeatureId, pos: Point },
    BoxLeftTarget { id: FeatureId, pos: Point },
    PuzzleSolved,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub events: Vec<AnalysisEvent>,
    /// Greedy sum of each box's Manhattan distance to its nearest still
    /// unclaimed target. The solver's heuristic cost.
    pub distance_sum: u32,
    pub deadlocked: bool,
}

/// Turns a tick result into events, a heuristic cost, and a deadlock
/// judgment.
pub struct MovementAnalyser<'a> {
    grid: &'a Grid,
    detector: DeadlockDetector<'a>,
}

impl<'a> MovementAnalyser<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        MovementAnalyser {
            grid,
            detector: DeadlockDetector::new(grid),
        }
    }

    pub fn analyse(&self, tick: &TickResult) -> Analysis {
        let mut events = Vec::new();

        if tick.hero.moved() {
            events.push(AnalysisEvent::HeroMoved {
                from: tick.hero.current,
                to: tick.hero.next,
            });
        }
        for m in &tick.boxes {
            if !m.moved() {
                continue;
            }
            events.push(AnalysisEvent::BoxMoved {
                id: m.id,
                from: m.current,
                to: m.next,
            });
            if self.grid.is_target(m.next) {
                events.push(AnalysisEvent::BoxLandedOnTarget {
                    id: m.id,
                    pos: m.next,
                });
            }
            if self.grid.is_target(m.current) && !self.grid.is_target(m.next) {
                events.push(AnalysisEvent::BoxLeftTarget {
                    id: m.id,
                    pos: m.current,
                });
            }
        }

        let positions = tick.box_positions();
        if self.solved(&positions) {
            events.push(AnalysisEvent::PuzzleSolved);
        }

        Analysis {
            events,
            distance_sum: self.push_distance_sum(&positions),
            // Detectors only run on ticks that moved something.
            deadlocked: tick.map_changed && self.detector.deadlocked(tick),
        }
    }

    pub fn solved(&self, boxes: &[Point]) -> bool {
        boxes.iter().all(|&b| self.grid.is_target(b))
    }

    /// Greedy matching: boxes in index order each claim the nearest target
    /// not yet claimed (ties go to the earlier target in scan order). Not an
    /// optimal assignment, and deliberately so.
    pub fn push_distance_sum(&self, boxes: &[Point]) -> u32 {
        let targets = self.grid.targets();
        assert!(
            targets.len() <= MAX_BOXES,
            "target count {} exceeds maximum of {}",
            targets.len(),
            MAX_BOXES
        );

        let mut claimed = [false; MAX_BOXES];
        let mut total = 0u32;

        for &box_pos in boxes {
            let mut min_index = usize::MAX;
            let mut min_distance = u32::MAX;
            for (i, &target) in targets.iter().enumerate() {
                if claimed[i] {
                    continue;
                }
                let distance = box_pos.manhattan(target);
                if distance < min_distance {
                    min_distance = distance;
                    min_index = i;
                }
            }
            if min_index != usize::MAX {
                claimed[min_index] = true;
                total += min_distance;
            }
        }

        total
    }
}
