use crate::analyser::MovementAnalyser;
use crate::grid::{Direction, Feature, Grid, MAX_BOXES, Point};
use crate::level::Level;
use crate::movement::{ALL_ACTIONS, Action, FeatureState, MovementOrchestrator};
use crate::pqueue::PriorityQueue;
use crate::zobrist::Zobrist;
use arrayvec::ArrayVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Accumulated cost of a directional action.
    pub move_cost: u32,
    /// Accumulated cost of standing still for a tick.
    pub stand_cost: u32,
    /// Yield to the host scheduler every this many expansions.
    pub yield_cycle: usize,
    /// Give up after this many expansions.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            move_cost: 1,
            stand_cost: 2,
            yield_cycle: 1024,
            max_iterations: 1_000_000,
        }
    }
}

/// The result of one solve run. An absent action sequence with
/// `aborted == false` means the frontier was exhausted (or the iteration
/// budget ran out): no solution was found. With `aborted == true` it only
/// means the search was cancelled, never that no solution exists.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub actions: Option<Vec<Action>>,
    pub iterations: usize,
    pub total_time: Duration,
    pub aborted: bool,
}

/// Shared cancellation flag for an in-flight solve. Safe to call from any
/// thread, any number of times, at any moment.
#[derive(Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        AbortHandle {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Observer hook for expansions, in the spirit of a verbose trace mode.
pub trait Tracer {
    fn trace(&self, iterations: usize, cost: u32, frontier_len: usize, actions: &[Action]);
}

/// The do-nothing tracer the solver defaults to.
pub struct NullTracer;

impl Tracer for NullTracer {
    fn trace(&self, _iterations: usize, _cost: u32, _frontier_len: usize, _actions: &[Action]) {}
}

/// One partial solution in the frontier. Immutable once pushed.
struct Candidate {
    actions: Vec<Action>,
    hero: Point,
    boxes: ArrayVec<FeatureState, MAX_BOXES>,
    cost: u32,
}

/// Canonical identity of a search state: hero position plus the sorted box
/// (position, pending slide) pairs. Sorting makes the key independent of
/// box enumeration order; the slide component is kept only for boxes on an
/// oily floor, where it changes what the next tick can do.
#[derive(Debug, PartialEq, Eq)]
struct StateKey {
    hero: Point,
    boxes: ArrayVec<(Point, Option<Direction>), MAX_BOXES>,
}

/// Heuristic best-first search over orchestrator ticks.
///
/// The frontier is ordered by accumulated action cost plus the greedy
/// box-to-target distance sum, which is not admissible: the search is a
/// weighted greedy best-first search, fast on typical layouts but with no
/// shortest-solution guarantee.
pub struct Solver<'a, T: Tracer = NullTracer> {
    grid: &'a Grid,
    orchestrator: MovementOrchestrator<'a>,
    analyser: MovementAnalyser<'a>,
    zobrist: Zobrist,
    config: SolverConfig,
    frontier: PriorityQueue<Candidate>,
    /// Visited states keyed by Zobrist hash. A hash hit is confirmed
    /// against the full canonical key, so a collision can never drop a
    /// state from the search.
    visited: HashMap<u64, Vec<StateKey>>,
    abort: Arc<AtomicBool>,
    iterations: usize,
    tracer: Option<T>,
}

impl<'a> Solver<'a, NullTracer> {
    pub fn new(grid: &'a Grid, config: SolverConfig) -> Self {
        Self::with_tracer_slot(grid, config, None)
    }
}

impl<'a, T: Tracer> Solver<'a, T> {
    pub fn with_tracer(grid: &'a Grid, config: SolverConfig, tracer: T) -> Self {
        Self::with_tracer_slot(grid, config, Some(tracer))
    }

    fn with_tracer_slot(grid: &'a Grid, config: SolverConfig, tracer: Option<T>) -> Self {
        Solver {
            grid,
            orchestrator: MovementOrchestrator::new(grid),
            analyser: MovementAnalyser::new(grid),
            zobrist: Zobrist::new(),
            config,
            frontier: PriorityQueue::new(),
            visited: HashMap::new(),
            abort: Arc::new(AtomicBool::new(false)),
            iterations: 0,
            tracer,
        }
    }

    /// A handle cancelling whatever this solver is (or will next be)
    /// running.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            flag: Arc::clone(&self.abort),
        }
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Search for an action sequence solving the layout. Rearms the abort
    /// flag, so a cancellation aimed at a previous run does not leak into
    /// this one.
    pub fn solve(&mut self, hero: Point, boxes: &[Point]) -> SolveOutcome {
        self.abort.store(false, Ordering::Relaxed);
        self.search(hero, boxes)
    }

    /// Like [`Solver::solve`], but adopts an externally owned cancellation
    /// handle without rearming it: an abort issued before the search even
    /// started still takes effect on the first loop pass.
    pub fn solve_cancellable(
        &mut self,
        handle: &AbortHandle,
        hero: Point,
        boxes: &[Point],
    ) -> SolveOutcome {
        self.abort = Arc::clone(&handle.flag);
        self.search(hero, boxes)
    }

    fn search(&mut self, hero: Point, boxes: &[Point]) -> SolveOutcome {
        let start = Instant::now();
        self.frontier.clear();
        self.visited.clear();
        self.iterations = 0;

        let seeds: ArrayVec<FeatureState, MAX_BOXES> =
            boxes.iter().copied().map(FeatureState::resting).collect();
        let root_priority = self.analyser.push_distance_sum(boxes);
        let root = Candidate {
            actions: Vec::new(),
            hero,
            boxes: seeds,
            cost: 0,
        };
        self.mark_visited(root.hero, &root.boxes);
        self.frontier.push(root_priority as usize, root);

        let mut actions = None;
        let mut aborted = false;

        loop {
            // Cancellation wins over everything else, and empties the
            // frontier so the memory goes away with it.
            if self.abort.load(Ordering::Relaxed) {
                self.frontier.clear();
                aborted = true;
                break;
            }

            let Some(candidate) = self.frontier.pop_min() else {
                break;
            };
            self.iterations += 1;

            if self.all_on_targets(&candidate.boxes) {
                actions = Some(candidate.actions);
                break;
            }

            if let Some(tracer) = &self.tracer {
                tracer.trace(
                    self.iterations,
                    candidate.cost,
                    self.frontier.len(),
                    &candidate.actions,
                );
            }

            if self.iterations >= self.config.max_iterations {
                break;
            }
            if self.iterations % self.config.yield_cycle == 0 {
                thread::yield_now();
            }

            self.expand(candidate);
        }

        SolveOutcome {
            actions,
            iterations: self.iterations,
            total_time: start.elapsed(),
            aborted,
        }
    }

    fn expand(&mut self, candidate: Candidate) {
        for action in ALL_ACTIONS {
            let tick = self
                .orchestrator
                .update(action, candidate.hero, &candidate.boxes);
            if !tick.map_changed {
                continue;
            }

            let analysis = self.analyser.analyse(&tick);
            if analysis.deadlocked {
                continue;
            }

            let hero = tick.hero.next;
            let boxes = tick.box_states();
            if !self.mark_visited(hero, &boxes) {
                continue;
            }

            let step_cost = match action {
                Action::Stand => self.config.stand_cost,
                _ => self.config.move_cost,
            };
            let cost = candidate.cost + step_cost;
            let priority = (cost + analysis.distance_sum) as usize;

            let mut actions = candidate.actions.clone();
            actions.push(action);
            self.frontier.push(
                priority,
                Candidate {
                    actions,
                    hero,
                    boxes,
                    cost,
                },
            );
        }
    }

    fn all_on_targets(&self, boxes: &[FeatureState]) -> bool {
        boxes.iter().all(|b| self.grid.is_target(b.pos))
    }

    /// Record the state as visited. Returns false if it already was.
    fn mark_visited(&mut self, hero: Point, boxes: &[FeatureState]) -> bool {
        let key = self.state_key(hero, boxes);
        let hash = self.zobrist.state_hash(key.hero, &key.boxes);
        let known = self.visited.entry(hash).or_default();
        if known.iter().any(|k| *k == key) {
            return false;
        }
        known.push(key);
        true
    }

    fn state_key(&self, hero: Point, boxes: &[FeatureState]) -> StateKey {
        let mut keys: ArrayVec<(Point, Option<Direction>), MAX_BOXES> = boxes
            .iter()
            .map(|b| {
                let slide = match self.grid.feature_at(b.pos) {
                    Some(Feature::OilyFloor) => b.entered,
                    _ => None,
                };
                (b.pos, slide)
            })
            .collect();
        keys.sort_unstable();
        StateKey { hero, boxes: keys }
    }
}

/// A solve running on its own worker thread.
pub struct SolveJob {
    handle: JoinHandle<SolveOutcome>,
    abort: AbortHandle,
}

impl SolveJob {
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the outcome: a solution, exhaustion, or the echo of an
    /// abort.
    pub fn join(self) -> SolveOutcome {
        self.handle.join().expect("solver thread panicked")
    }
}

/// Run a solve on a dedicated worker thread so the caller stays
/// interactive. Cancellation goes through the returned job's handle.
pub fn spawn_solve(level: Level, config: SolverConfig) -> SolveJob {
    let abort = AbortHandle::new();
    let thread_abort = abort.clone();
    let handle = thread::spawn(move || {
        let mut solver = Solver::new(&level.grid, config);
        solver.solve_cancellable(&thread_abort, level.hero, &level.boxes)
    });
    SolveJob { handle, abort }
}
