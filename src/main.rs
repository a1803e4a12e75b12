// src/main.rs
mod cli;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use stimsync::analysis::SessionPipeline;
use stimsync::{simulate_session, SimulationParams};
use cli::{BatchArgs, Cli, Command, SessionArgs, SimulateArgs};
const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PARTIAL: i32 = 2;
fn main() {
    let cli = Cli::parse();
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    let outcome = match cli.command {
        Command::Batch(args) => run_batch(args),
        Command::Session(args) => run_session(args),
        Command::Simulate(args) => run_simulate(args),
    };
    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(exit_code);
}
fn run_batch(args: BatchArgs) -> Result<i32> {
    let config = args.analysis.to_config().context("invalid analysis parameters")?;
    let pipeline = SessionPipeline::new(config, &args.analysis.out)?;
    let report = pipeline
        .process_multiple_sessions_from_directory(&args.dir)
        .with_context(|| format!("batch over {} failed", args.dir.display()))?;
    for session in &report.sessions {
        println!(
            "{}\t{}\tevents={}\tskipped={}\tsync={}",
            session.path.display(),
            session.label.text,
            session.events,
            session.skipped_events,
            session
                .session_sync
                .map(|v| format!("{v:.4}"))
                .unwrap_or_else(|| "n/a".into())
        );
    }
    for failure in &report.failures {
        println!("{}\tFAILED\t{}", failure.path.display(), failure.error);
    }
    if let Some(chart) = &report.comparison_plot {
        println!("comparison chart: {}", chart.display());
    }
    if report.failures.is_empty() {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_PARTIAL)
    }
}
fn run_session(args: SessionArgs) -> Result<i32> {
    let config = args.analysis.to_config().context("invalid analysis parameters")?;
    let pipeline = SessionPipeline::new(config, &args.analysis.out)?;
    let report = pipeline
        .process_session_file(&args.file)
        .with_context(|| format!("failed to analyse {}", args.file.display()))?;
    println!(
        "{}: {} events, {} profiles, {} skipped",
        report.label.text, report.events, report.profiles, report.skipped_events
    );
    if let Some(v) = report.session_sync {
        println!("whole-session synchrony: {v:.4}");
    }
    for path in &report.written {
        println!("wrote {}", path.display());
    }
    Ok(EXIT_OK)
}
fn run_simulate(args: SimulateArgs) -> Result<i32> {
    let params = SimulationParams {
        units: args.units,
        events: args.events,
        baseline_rate_hz: args.rate,
        response_probability: args.response_probability,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let session = simulate_session(&params, &mut rng).map_err(|reason| anyhow!(reason))?;
    session
        .save_json(&args.file)
        .with_context(|| format!("failed to write {}", args.file.display()))?;
    log::info!(
        "simulated {} units, {} events -> {}",
        session.num_units(),
        session.stim_times().len(),
        args.file.display()
    );
    Ok(EXIT_OK)
}
