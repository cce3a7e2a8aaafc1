use std::process;

use bakeao_bench::args::{parse_args, usage, BenchArgs, Command};
use bakeao_bench::report;
use bakeao_bench::runner::BenchmarkRunner;
use bakeao_bench::scenes;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let BenchArgs {
        baseline: baseline_path,
        output: output_path,
        regression_threshold,
        repeats,
        preset: preset_name,
    } = match parse_args(&args) {
        Ok(Command::Run(parsed)) => parsed,
        Ok(Command::Help) => {
            eprintln!("{}", usage());
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{e}\n{}", usage());
            process::exit(1);
        }
    };

    let quality = match bakeao_config::preset(&preset_name) {
        Ok(quality) => quality,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    log::info!("Baking standard scenes at preset '{preset_name}', {repeats} repeats");

    let runner = BenchmarkRunner::new(repeats);
    let mut results = Vec::new();

    for config in &scenes::standard_scenes(quality) {
        for advisory in bakeao_config::advisories(&config.setup) {
            log::info!("  {}: {advisory}", config.name);
        }
        match runner.run_scene(config) {
            Ok(result) => results.push(result),
            Err(e) => {
                log::error!("Scene '{}' failed: {e}", config.name);
                process::exit(1);
            }
        }
    }

    // Print markdown summary
    println!("\n## Bake Benchmark Results ({preset_name})\n");
    println!("{}", report::format_markdown(&results));

    // Save output baseline
    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: run_timestamp(),
            preset: preset_name.clone(),
            results: results.clone(),
        };
        if let Err(e) = report::save_baseline(path, &baseline) {
            log::error!("Could not save baseline to {}: {e}", path.display());
            process::exit(1);
        }
        log::info!("Saved baseline to {}", path.display());
    }

    // Compare against baseline
    if let Some(ref path) = baseline_path {
        match report::load_baseline(path) {
            Ok(Some(baseline)) => {
                if baseline.preset != preset_name {
                    log::warn!(
                        "Baseline was recorded at preset '{}', comparing timings only",
                        baseline.preset
                    );
                }
                let regressions =
                    report::compare(&results, &preset_name, &baseline, regression_threshold);
                println!(
                    "{}",
                    report::format_comparison(&regressions, regression_threshold)
                );
                if !regressions.is_empty() {
                    process::exit(1);
                }
            }
            Ok(None) => log::warn!("Baseline file not found: {}", path.display()),
            Err(e) => {
                log::error!("Could not read baseline {}: {e}", path.display());
                process::exit(1);
            }
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the Unix epoch; enough to tell baselines apart.
fn run_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("bake-{secs}")
}
