//! Waypoint Simulator CLI
//!
//! Run deterministic record/playback scenarios against the waypoint engine.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use waypoint_env::SledStore;
use waypoint_sim::{ScenarioId, ScenarioResult, ScenarioRunner};

/// Waypoint Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "waypoint-sim")]
#[command(about = "Run deterministic waypoint record/playback scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,
    
    /// Scenario to run (record_replay, relocalize, force_move_interrupt, corrupt_store, legacy_import, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,
    
    /// Waypoints recorded per scenario
    #[arg(short, long, default_value = "5")]
    waypoints: usize,
    
    /// Tick budget for each playback
    #[arg(short, long, default_value = "10000")]
    ticks: u64,
    
    /// Player tick rate in Hz
    #[arg(long, default_value = "30")]
    tick_rate: u32,
    
    /// Persist paths as files in this directory instead of memory
    #[arg(long)]
    store_dir: Option<PathBuf>,
    
    /// With --store-dir, keep paths in a sled database there instead of files
    #[arg(long, requires = "store_dir")]
    sled: bool,
    
    /// Number of consecutive seeds to run (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    
    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
    
    /// Export per-tick frames of a single scenario to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    
    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
    
    if !args.json {
        info!("Waypoint Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
    
    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };
    
    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };
    
    let sled = match &args.store_dir {
        Some(dir) if args.sled => match SledStore::open(dir.join("waypoints.db")) {
            Ok(db) => Some(db),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        _ => None,
    };
    
    let runner_for = |seed: u64| {
        let runner = ScenarioRunner::new(seed)
            .with_waypoints(args.waypoints)
            .with_max_ticks(args.ticks)
            .with_tick_rate(args.tick_rate);
        match (&args.store_dir, &sled) {
            (_, Some(db)) => runner.with_sled(db.clone()),
            (Some(dir), None) => runner.with_store_dir(dir),
            (None, None) => runner,
        }
    };
    
    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        
        let (result, export) = runner_for(base_seed).run_with_export(scenarios[0]);
        
        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path.display()),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
        
        report(&result, args.json);
        if !result.passed {
            std::process::exit(1);
        }
        return;
    }
    
    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);
        
        for scenario in &scenarios {
            let result = runner.run(*scenario);
            if !args.json {
                report(&result, false);
            }
            all_results.push(result);
        }
    }
    
    // Summary
    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let passed = total - failed_count;
    
    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(result_json).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            
            for result in all_results.iter().filter(|r| !r.passed) {
                error!("  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    
    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(&result_json(result)) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render result: {}", e),
        }
    } else if result.passed {
        info!("✓ {} (seed={}) PASSED in {} ticks", result.scenario.name(), result.seed, result.total_ticks);
    } else {
        error!("✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn result_json(r: &ScenarioResult) -> serde_json::Value {
    serde_json::json!({
        "scenario": r.scenario.name(),
        "seed": r.seed,
        "passed": r.passed,
        "ticks": r.total_ticks,
        "time_secs": r.final_time_secs,
        "waypoints_recorded": r.metrics.waypoints_recorded,
        "waypoints_visited": r.metrics.waypoints_visited,
        "saves": r.metrics.saves,
        "failure_reason": r.failure_reason,
    })
}
