mod analyser;
mod deadlocks;
mod grid;
mod level;
mod movement;
mod pqueue;
mod solver;
mod zobrist;

use clap::Parser;
use level::{Level, Levels};
use movement::{Action, FeatureState, MovementOrchestrator};
use solver::{SolveOutcome, Solver, SolverConfig, Tracer};

struct VerboseTracer {
    trace_start: usize,
    trace_end: usize,
}

impl VerboseTracer {
    fn new(from_iteration: usize, to_iteration: usize) -> Self {
        Self {
            trace_start: from_iteration,
            trace_end: to_iteration,
        }
    }
}

impl Tracer for VerboseTracer {
    fn trace(&self, iterations: usize, cost: u32, frontier_len: usize, actions: &[Action]) {
        if self.trace_start <= iterations && iterations <= self.trace_end {
            let sequence = actions
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "iteration={}, cost={}, frontier={}, actions=[{}]",
                iterations, cost, frontier_len, sequence
            );
        }
    }
}

fn print_solution(level: &Level, actions: &[Action]) {
    println!("\nStarting position:\n{}", level);
    let orchestrator = MovementOrchestrator::new(&level.grid);
    let mut hero = level.hero;
    let mut boxes: Vec<FeatureState> = level
        .boxes
        .iter()
        .copied()
        .map(FeatureState::resting)
        .collect();

    let total = actions.len();
    for (count, &action) in actions.iter().enumerate() {
        let tick = orchestrator.update(action, hero, &boxes);
        hero = tick.hero.next;
        boxes = tick.box_states().to_vec();
        let positions: Vec<_> = boxes.iter().map(|b| b.pos).collect();
        println!(
            "{} ({}/{}):\n{}",
            action,
            count + 1,
            total,
            level.render(hero, &positions)
        );
    }
}

struct LevelStats {
    solved: bool,
    steps: usize,
    iterations: usize,
    elapsed_ms: u128,
}

struct SolveOpts {
    level_num: usize,
    config: SolverConfig,
    print_solution: bool,
    trace_range: Option<(usize, usize)>,
}

fn report(level: &Level, opts: &SolveOpts, outcome: SolveOutcome) -> LevelStats {
    let elapsed_ms = outcome.total_time.as_millis();

    let (solved_char, steps, solved) = match &outcome.actions {
        Some(actions) => ('Y', actions.len(), true),
        None if outcome.iterations >= opts.config.max_iterations => ('N', 0, false),
        None => ('X', 0, false),
    };

    println!(
        "level: {:<3}  solved: {}  steps: {:<5}  iterations: {:<12}  elapsed: {} ms",
        opts.level_num, solved_char, steps, outcome.iterations, elapsed_ms
    );

    if opts.print_solution {
        if let Some(actions) = &outcome.actions {
            print_solution(level, actions);
        }
    }

    LevelStats {
        solved,
        steps,
        iterations: outcome.iterations,
        elapsed_ms,
    }
}

fn solve_level(level: &Level, opts: SolveOpts) -> LevelStats {
    let outcome = match opts.trace_range {
        Some((trace_start, trace_end)) => {
            let tracer = VerboseTracer::new(trace_start, trace_end);
            let mut solver = Solver::with_tracer(&level.grid, opts.config, tracer);
            solver.solve(level.hero, &level.boxes)
        }
        None => {
            let mut solver = Solver::new(&level.grid, opts.config);
            solver.solve(level.hero, &level.boxes)
        }
    };
    report(level, &opts, outcome)
}

#[derive(Parser)]
#[command(name = "slipway")]
#[command(about = "A solver for box-pushing puzzles with springs, treadmills, one-way doors and oily floors", long_about = None)]
struct Args {
    /// Path to the levels file
    #[arg(value_name = "FILE")]
    levels_file: String,

    /// Level number to solve (1-indexed), or start of range
    #[arg(value_name = "LEVEL")]
    level_start: usize,

    /// Optional end of level range (inclusive, 1-indexed)
    #[arg(value_name = "LEVEL_END")]
    level_end: Option<usize>,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,

    /// Maximum number of expansions before giving up
    #[arg(short = 'n', long, default_value = "1000000")]
    max_iterations: usize,

    /// Accumulated cost of a directional action
    #[arg(long, default_value = "1")]
    move_cost: u32,

    /// Accumulated cost of standing still for a tick
    #[arg(long, default_value = "2")]
    stand_cost: u32,

    /// Yield to the scheduler every this many expansions
    #[arg(long, default_value = "1024")]
    yield_cycle: usize,

    /// Range of iteration numbers to trace (start, end)
    #[arg(long, num_args = 2)]
    trace_range: Option<Vec<usize>>,
}

fn main() {
    let args = Args::parse();

    // Load levels from file
    let levels = match Levels::from_file(&args.levels_file) {
        Ok(levels) => levels,
        Err(e) => {
            eprintln!("Error loading levels: {}", e);
            std::process::exit(1);
        }
    };

    // Determine the range of levels to solve
    let level_end = args.level_end.unwrap_or(args.level_start);
    let num_levels = level_end - args.level_start + 1;

    // Validate range
    if args.level_start == 0 {
        eprintln!("Error: level numbers must be at least 1");
        std::process::exit(1);
    }

    if level_end < args.level_start {
        eprintln!("Error: level end must be >= level start");
        std::process::exit(1);
    }

    if level_end > levels.len() {
        eprintln!(
            "Error: level {} not found (file contains {} levels)",
            level_end,
            levels.len()
        );
        std::process::exit(1);
    }

    if args.print_solution && num_levels > 1 {
        eprintln!("Error: solution printing only supported when solving a single level");
        std::process::exit(1);
    }

    // Validate trace_range
    if let Some(ref range) = args.trace_range {
        if range[0] > range[1] {
            eprintln!("Error: trace range start must be <= end");
            std::process::exit(1);
        }
    }

    let trace_range = args.trace_range.as_ref().map(|v| (v[0], v[1]));
    let config = SolverConfig {
        move_cost: args.move_cost,
        stand_cost: args.stand_cost,
        yield_cycle: args.yield_cycle,
        max_iterations: args.max_iterations,
    };

    // Solve each level in the range
    let mut total_solved = 0;
    let mut total_steps = 0;
    let mut total_iterations = 0;
    let mut total_time_ms = 0;

    for level_num in args.level_start..=level_end {
        let level = levels.get(level_num - 1).unwrap();
        let opts = SolveOpts {
            level_num,
            config,
            print_solution: args.print_solution,
            trace_range,
        };
        let stats = solve_level(level, opts);

        if stats.solved {
            total_solved += 1;
        }
        total_steps += stats.steps;
        total_iterations += stats.iterations;
        total_time_ms += stats.elapsed_ms;
    }

    // Print summary statistics if multiple levels were solved
    if num_levels > 1 {
        println!("---");
        println!(
            "solved: {:>3}/{:<3}        steps: {:<5}  iterations: {:<12}  elapsed: {} ms",
            total_solved, num_levels, total_steps, total_iterations, total_time_ms
        );
    }
}
