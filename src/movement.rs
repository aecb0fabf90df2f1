use crate::grid::{Direction, Feature, Grid, MAX_BOXES, Point};
use arrayvec::ArrayVec;
use std::fmt;

/// One discrete input per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stand,
    Up,
    Down,
    Left,
    Right,
}

pub const ALL_ACTIONS: [Action; 5] = [
    Action::Stand,
    Action::Up,
    Action::Down,
    Action::Left,
    Action::Right,
];

impl Action {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::Stand => None,
            Action::Up => Some(Direction::Up),
            Action::Down => Some(Direction::Down),
            Action::Left => Some(Direction::Left),
            Action::Right => Some(Direction::Right),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Stand => write!(f, "Stand"),
            Action::Up => write!(f, "Up"),
            Action::Down => write!(f, "Down"),
            Action::Left => write!(f, "Left"),
            Action::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureId {
    Hero,
    Box(u8),
}

/// One dynamic feature's transition across a single tick.
///
/// Created with `current == next` ("not moved this tick"); mutated only
/// through [`Movement::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub id: FeatureId,
    pub current: Point,
    pub next: Point,
    pub direction: Option<Direction>,
}

impl Movement {
    fn resting(id: FeatureId, pos: Point) -> Self {
        Movement {
            id,
            current: pos,
            next: pos,
            direction: None,
        }
    }

    /// The single mutation primitive: record the direction, commit the
    /// previous destination, and aim one cell further.
    pub fn advance(&mut self, dir: Direction) {
        self.direction = Some(dir);
        self.current = self.next;
        self.next = self.current.offset(dir);
    }

    pub fn moved(&self) -> bool {
        self.current != self.next
    }
}

/// The per-box residue of the previous tick that the next tick's handlers
/// may consume: where the box sits now, and the direction it moved last tick
/// (`None` if it rested). Oily floors read `entered` to continue a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureState {
    pub pos: Point,
    pub entered: Option<Direction>,
}

impl FeatureState {
    pub fn resting(pos: Point) -> Self {
        FeatureState { pos, entered: None }
    }
}

/// The outcome of one orchestrator tick.
#[derive(Debug, Clone)]
pub struct TickResult {
    pub hero: Movement,
    pub boxes: ArrayVec<Movement, MAX_BOXES>,
    pub map_changed: bool,
}

impl TickResult {
    /// Derive the box seeds for the following tick.
    pub fn box_states(&self) -> ArrayVec<FeatureState, MAX_BOXES> {
        self.boxes
            .iter()
            .map(|m| FeatureState {
                pos: m.next,
                entered: if m.moved() { m.direction } else { None },
            })
            .collect()
    }

    pub fn box_positions(&self) -> ArrayVec<Point, MAX_BOXES> {
        self.boxes.iter().map(|m| m.next).collect()
    }
}

/// One handler per special-terrain occurrence, plus one for the hero.
/// A closed set dispatched by match; the list order is fixed at construction
/// (hero first, then terrain in grid scan order) and never changes.
#[derive(Debug, Clone, Copy)]
enum TileHandler {
    Hero,
    Spring { pos: Point, orientation: Direction },
    Treadmill { pos: Point, orientation: Direction },
    OneWayDoor { pos: Point },
    OilyFloor { pos: Point },
}

struct TickState {
    hero: Movement,
    boxes: ArrayVec<Movement, MAX_BOXES>,
    entered: ArrayVec<Option<Direction>, MAX_BOXES>,
}

struct EntryBlockers {
    /// Wall or empty base, out of bounds, or a static handler refusing entry.
    terrain: bool,
    /// Dynamic features occupying or about to occupy the cell.
    features: ArrayVec<FeatureId, { MAX_BOXES + 1 }>,
}

impl EntryBlockers {
    fn clear(&self) -> bool {
        !self.terrain && self.features.is_empty()
    }
}

/// Resolves one tick of movement: every handler acts once, in fixed order,
/// over a shared view of all movements. One pass per tick — multi-step
/// cascades (a box crossing two oily floors) resolve over consecutive ticks
/// through the carried [`FeatureState::entered`] residue.
pub struct MovementOrchestrator<'a> {
    grid: &'a Grid,
    handlers: Vec<TileHandler>,
}

impl<'a> MovementOrchestrator<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        let mut handlers = vec![TileHandler::Hero];
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let pos = Point::new(x, y);
                match grid.feature_at(pos) {
                    Some(Feature::Spring(orientation)) => {
                        handlers.push(TileHandler::Spring { pos, orientation });
                    }
                    Some(Feature::Treadmill(orientation)) => {
                        handlers.push(TileHandler::Treadmill { pos, orientation });
                    }
                    Some(Feature::OneWayDoor(_)) => {
                        handlers.push(TileHandler::OneWayDoor { pos });
                    }
                    Some(Feature::OilyFloor) => {
                        handlers.push(TileHandler::OilyFloor { pos });
                    }
                    None => {}
                }
            }
        }
        MovementOrchestrator { grid, handlers }
    }

    /// Advance the world one tick.
    pub fn update(&self, action: Action, hero: Point, boxes: &[FeatureState]) -> TickResult {
        assert!(
            boxes.len() <= MAX_BOXES,
            "box count {} exceeds maximum of {}",
            boxes.len(),
            MAX_BOXES
        );

        let mut tick = TickState {
            hero: Movement::resting(FeatureId::Hero, hero),
            boxes: boxes
                .iter()
                .enumerate()
                .map(|(i, b)| Movement::resting(FeatureId::Box(i as u8), b.pos))
                .collect(),
            entered: boxes.iter().map(|b| b.entered).collect(),
        };

        let mut map_changed = false;
        for handler in &self.handlers {
            map_changed |= self.act(handler, action, &mut tick);
        }

        TickResult {
            hero: tick.hero,
            boxes: tick.boxes,
            map_changed,
        }
    }

    fn act(&self, handler: &TileHandler, action: Action, tick: &mut TickState) -> bool {
        match *handler {
            TileHandler::Hero => self.act_hero(action, tick),
            TileHandler::Spring { pos, orientation }
            | TileHandler::Treadmill { pos, orientation } => {
                self.act_pusher(pos, orientation, tick)
            }
            TileHandler::OneWayDoor { .. } => false,
            TileHandler::OilyFloor { pos } => self.act_oily(pos, tick),
        }
    }

    /// True unless a static handler at `pos` forbids leaving toward `dir`.
    fn can_leave(&self, pos: Point, dir: Direction) -> bool {
        self.grid
            .feature_at(pos)
            .is_none_or(|f| f.allows_leaving(dir))
    }

    /// Everything that blocks a feature from moving into `pos` toward `dir`.
    fn entry_blockers(&self, tick: &TickState, pos: Point, dir: Direction) -> EntryBlockers {
        let terrain = !self.grid.is_traversable(pos)
            || self
                .grid
                .feature_at(pos)
                .is_some_and(|f| !f.allows_entering(dir));

        let mut features = ArrayVec::new();
        if tick.hero.next == pos {
            features.push(FeatureId::Hero);
        }
        for m in &tick.boxes {
            if m.next == pos {
                features.push(m.id);
            }
        }

        EntryBlockers { terrain, features }
    }

    fn act_hero(&self, action: Action, tick: &mut TickState) -> bool {
        let Some(dir) = action.direction() else {
            return false;
        };
        if !self.can_leave(tick.hero.next, dir) {
            return false;
        }

        let aimed = tick.hero.next.offset(dir);
        let blockers = self.entry_blockers(tick, aimed, dir);
        if blockers.terrain {
            return false;
        }

        match blockers.features.as_slice() {
            [] => {
                tick.hero.advance(dir);
                true
            }
            [FeatureId::Box(i)] => {
                // Pushing: the box must be free to leave its cell toward the
                // push, and the cell beyond it must be fully unblocked.
                let i = *i as usize;
                if !self.can_leave(aimed, dir) {
                    return false;
                }
                let beyond = aimed.offset(dir);
                if !self.entry_blockers(tick, beyond, dir).clear() {
                    return false;
                }
                tick.boxes[i].advance(dir);
                tick.hero.advance(dir);
                true
            }
            _ => false,
        }
    }

    /// Spring and treadmill auto-push: launch every box still resting on the
    /// cell one step along the orientation.
    fn act_pusher(&self, pos: Point, orientation: Direction, tick: &mut TickState) -> bool {
        let mut changed = false;
        for i in 0..tick.boxes.len() {
            if tick.boxes[i].moved() || tick.boxes[i].next != pos {
                continue;
            }
            if !self.can_leave(pos, orientation) {
                continue;
            }
            let dest = pos.offset(orientation);
            let blockers = self.entry_blockers(tick, dest, orientation);
            if blockers.terrain {
                continue;
            }
            let clears = match blockers.features.as_slice() {
                [] => true,
                [id] => self.chained_pusher_clears(tick, *id, orientation),
                _ => false,
            };
            if !clears {
                continue;
            }
            tick.boxes[i].advance(orientation);
            changed = true;
        }
        changed
    }

    /// A blocked auto-push still fires when the blocking box rests on a
    /// pusher terrain that will carry it away this same tick. A head-on
    /// counter-oriented pusher never clears the cell. The hero's movement is
    /// final by the time pushers run (hero handler goes first), so a hero
    /// blocker is never cleared.
    fn chained_pusher_clears(&self, tick: &TickState, id: FeatureId, dir: Direction) -> bool {
        let FeatureId::Box(i) = id else {
            return false;
        };
        let blocker = &tick.boxes[i as usize];
        if blocker.moved() {
            return false;
        }
        match self.grid.feature_at(blocker.next).and_then(Feature::push_orientation) {
            Some(o) => o != dir.opposite(),
            None => false,
        }
    }

    /// Oily floor: a box that slid onto this cell last tick keeps sliding one
    /// more cell in the same direction, unless blocked or aimed at the hero's
    /// new position.
    fn act_oily(&self, pos: Point, tick: &mut TickState) -> bool {
        let mut changed = false;
        for i in 0..tick.boxes.len() {
            if tick.boxes[i].moved() || tick.boxes[i].next != pos {
                continue;
            }
            let Some(dir) = tick.entered[i] else {
                continue;
            };
            if !self.can_leave(pos, dir) {
                continue;
            }
            let dest = pos.offset(dir);
            if dest == tick.hero.next {
                continue;
            }
            if !self.entry_blockers(tick, dest, dir).clear() {
                continue;
            }
            tick.boxes[i].advance(dir);
            changed = true;
        }
        changed
    }
}
