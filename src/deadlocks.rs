use crate::grid::{Direction, Feature, Grid, Point};
use crate::movement::TickResult;

/// Heuristic detectors flagging states the puzzle can provably (or very
/// probably) no longer be solved from. Intentionally incomplete: they catch
/// the common stuck patterns, not every unsolvable configuration, and a
/// missed deadlock is never an error.
pub struct DeadlockDetector<'a> {
    grid: &'a Grid,
}

impl<'a> DeadlockDetector<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        DeadlockDetector { grid }
    }

    /// Judge one tick's result. Pure: identical inputs always yield the
    /// same answer.
    pub fn deadlocked(&self, tick: &TickResult) -> bool {
        tick.boxes.iter().any(|m| {
            if !m.moved() {
                return false;
            }
            let Some(dir) = m.direction else {
                return false;
            };
            // Both detectors only consider a box that just landed against
            // a wall.
            if !self.grid.is_wall(m.next.offset(dir)) {
                return false;
            }
            self.glued_to_wall(tick, m.next, dir) || self.corner_trap(m.next, dir)
        })
    }

    /// A box pinned against a wall is stuck if the line it now lives on
    /// holds more boxes than targets and the blocking line offers fewer
    /// than two traversable cells to escape through.
    fn glued_to_wall(&self, tick: &TickResult, pos: Point, dir: Direction) -> bool {
        let ahead = pos.offset(dir);
        let across = matches!(dir, Direction::Up | Direction::Down);
        let span = if across {
            self.grid.width()
        } else {
            self.grid.height()
        };

        let mut boxes_on_line = 0usize;
        let mut targets_on_line = 0usize;
        let mut open_on_blocking_line = 0usize;

        for i in 0..span {
            let (line_p, blocking_p) = if across {
                (Point::new(i, pos.y), Point::new(i, ahead.y))
            } else {
                (Point::new(pos.x, i), Point::new(ahead.x, i))
            };
            if tick.boxes.iter().any(|m| m.next == line_p) {
                boxes_on_line += 1;
            }
            if self.grid.is_target(line_p) {
                targets_on_line += 1;
            }
            if self.grid.is_traversable(blocking_p) {
                open_on_blocking_line += 1;
            }
        }

        boxes_on_line > targets_on_line && open_on_blocking_line < 2
    }

    /// A box shoved into a pocket walled on both perpendicular sides can
    /// never be pushed again, unless it sits where that is harmless (a
    /// target) or where the terrain itself will move it (spring/treadmill).
    fn corner_trap(&self, pos: Point, dir: Direction) -> bool {
        if self.grid.is_target(pos) {
            return false;
        }
        if matches!(
            self.grid.feature_at(pos),
            Some(Feature::Spring(_) | Feature::Treadmill(_))
        ) {
            return false;
        }
        let side = dir.clockwise();
        self.grid.is_wall(pos.offset(side)) && self.grid.is_wall(pos.offset(side.opposite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::movement::{Action, FeatureState, MovementOrchestrator};

    fn push_up(level: &Level) -> TickResult {
        let orch = MovementOrchestrator::new(&level.grid);
        let boxes: Vec<FeatureState> = level
            .boxes
            .iter()
            .copied()
            .map(FeatureState::resting)
            .collect();
        let tick = orch.update(Action::Up, level.hero, &boxes);
        assert!(tick.map_changed, "fixture must actually move a box");
        tick
    }

    #[test]
    fn test_glued_to_wall_deadlock() {
        // Pushing the second box against the top wall leaves two boxes on a
        // line with no targets, and the wall line has no gaps.
        let level = Level::from_text(
            "#####\n\
             #$  #\n\
             # $.#\n\
             #.@ #\n\
             #####",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        assert!(detector.deadlocked(&tick));
    }

    #[test]
    fn test_glued_line_with_enough_targets_is_fine() {
        // Same shove, but the wall line now carries as many targets as
        // boxes.
        let level = Level::from_text(
            "#####\n\
             #$..#\n\
             # $ #\n\
             # @ #\n\
             #####",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        assert!(!detector.deadlocked(&tick));
    }

    #[test]
    fn test_corner_trap_deadlock() {
        // An interior pocket: wall ahead and on both sides, but the blocking
        // line has two open cells so the glued-to-wall census passes.
        let level = Level::from_text(
            "#######\n\
             #  .  #\n\
             # ### #\n\
             ## # ##\n\
             # $   #\n\
             # @   #\n\
             #######",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        assert!(detector.deadlocked(&tick));
    }

    #[test]
    fn test_corner_pocket_on_target_is_fine() {
        // The same pocket, but it is the target cell.
        let level = Level::from_text(
            "#######\n\
             #     #\n\
             # ### #\n\
             ##.# ##\n\
             # $   #\n\
             # @   #\n\
             #######",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        assert!(!detector.deadlocked(&tick));
    }

    #[test]
    fn test_open_push_is_not_deadlocked() {
        let level = Level::from_text(
            "#####\n\
             # . #\n\
             #   #\n\
             # $ #\n\
             # @ #\n\
             #####",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        assert!(!detector.deadlocked(&tick));
    }

    #[test]
    fn test_judgment_is_deterministic() {
        let level = Level::from_text(
            "#####\n\
             #$  #\n\
             # $.#\n\
             #.@ #\n\
             #####",
        )
        .unwrap();
        let tick = push_up(&level);
        let detector = DeadlockDetector::new(&level.grid);
        let first = detector.deadlocked(&tick);
        for _ in 0..10 {
            assert_eq!(detector.deadlocked(&tick), first);
        }
    }
}
