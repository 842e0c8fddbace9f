use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;
use tracing::Level;
use truck_packer::guillotine::SplitRule;
use truck_packer::input::parse_problem;
use truck_packer::score::ScoreStrategy;
use truck_packer::solver::{BinPolicy, PackerConfig, Solver, StrategyRun, best_run};
use truck_packer::types::{Placement, Solution};

#[derive(Parser)]
#[command(
    name = "truck_packer",
    about = "Cost-weighted 2D bin packing with guillotine cuts"
)]
struct Cli {
    /// Problem file: "N M", then N lines "w h", then M lines "w h cost"
    input: PathBuf,

    /// Scoring strategy: baf, bssf, blsf, waf, wssf or wlsf
    #[arg(long, default_value = "baf")]
    strategy: ScoreStrategy,

    /// Guillotine split rule (horizontal, vertical, shorter-leftover-axis, ...)
    #[arg(long, default_value = "horizontal")]
    split: SplitRule,

    /// Which opened bins may receive an item: latest or all-open
    #[arg(long, default_value = "latest")]
    policy: BinPolicy,

    /// Do not merge adjacent free rectangles
    #[arg(long)]
    no_merge: bool,

    /// Disable item rotation
    #[arg(long)]
    no_rotate: bool,

    /// Run all six strategies and report each
    #[arg(long)]
    compare: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

#[derive(Serialize)]
struct Report<'a> {
    strategy: ScoreStrategy,
    bins_opened: usize,
    total_cost: u64,
    elapsed_ms: f64,
    placements: Vec<Placement>,
    solution: &'a Solution,
}

#[derive(Serialize)]
struct CompareRow {
    strategy: ScoreStrategy,
    elapsed_ms: f64,
    bins_opened: Option<usize>,
    total_cost: Option<u64>,
    error: Option<String>,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn print_solution(solution: &Solution) {
    for result in &solution.bins {
        println!("Bin {} {}:", result.bin, result.stock);
        for p in &result.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  item {}: {} @ ({}, {}){}", p.item, p.rect, p.x, p.y, rot);
        }
        println!();
    }
}

fn compare_rows(runs: &[StrategyRun]) -> Vec<CompareRow> {
    runs.iter()
        .map(|run| CompareRow {
            strategy: run.strategy,
            elapsed_ms: run.elapsed.as_secs_f64() * 1000.0,
            bins_opened: run.outcome.as_ref().ok().map(|s| s.bins_opened()),
            total_cost: run.outcome.as_ref().ok().map(|s| s.total_cost),
            error: run.outcome.as_ref().err().map(|e| e.to_string()),
        })
        .collect()
}

fn run_compare(solver: &Solver, json: bool) {
    let runs = solver.compare();
    let rows = compare_rows(&runs);
    let failures = rows.iter().filter(|r| r.error.is_some()).count();

    if json {
        let out = serde_json::json!({
            "runs": rows,
            "failures": failures,
            "best": best_run(&runs).map(|r| r.strategy),
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        return;
    }

    for row in &rows {
        match (&row.total_cost, &row.error) {
            (Some(cost), _) => println!(
                "{:<5} cost {:>8}  bins {:>4}  {:>9.3} ms",
                row.strategy.code(),
                cost,
                row.bins_opened.unwrap_or_default(),
                row.elapsed_ms
            ),
            (None, Some(e)) => println!(
                "{:<5} failed: {}  {:>9.3} ms",
                row.strategy.code(),
                e,
                row.elapsed_ms
            ),
            (None, None) => {}
        }
    }
    match best_run(&runs) {
        Some(best) => println!("Best: {}", best.strategy),
        None => println!("Best: none ({failures} failures)"),
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(cli.log_level)
        .init();

    let text = std::fs::read_to_string(&cli.input)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {e}", cli.input.display())));
    let problem = parse_problem(&text).unwrap_or_else(|e| fail(e));

    let config = PackerConfig {
        strategy: cli.strategy,
        split_rule: cli.split,
        merge: !cli.no_merge,
        allow_rotate: !cli.no_rotate,
        bin_policy: cli.policy,
    };
    tracing::info!(
        items = problem.items.len(),
        bins = problem.bins.len(),
        ?config,
        "loaded {}",
        cli.input.display()
    );
    let solver = Solver::new(problem.items, problem.bins, config);

    if cli.compare {
        run_compare(&solver, cli.json);
        return;
    }

    let start = Instant::now();
    let solution = solver.solve().unwrap_or_else(|e| {
        tracing::warn!(item = ?e.item(), "packing failed");
        fail(e)
    });
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if cli.json {
        let report = Report {
            strategy: cli.strategy,
            bins_opened: solution.bins_opened(),
            total_cost: solution.total_cost,
            elapsed_ms,
            placements: solution.item_placements(),
            solution: &solution,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|e| fail(e))
        );
        return;
    }

    print_solution(&solution);
    println!(
        "Summary: {} bin{} used, total cost {}, {:.1}% waste, {:.3} ms",
        solution.bins_opened(),
        if solution.bins_opened() == 1 { "" } else { "s" },
        solution.total_cost,
        solution.total_waste_percent(),
        elapsed_ms,
    );
}
