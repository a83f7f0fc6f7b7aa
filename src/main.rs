use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taskclock::category::{BlockReason, TaskTimeRecord};
use taskclock::cli::{Cli, Command, LiveDemoArgs, OutputFormat, ReplayArgs, SimulateArgs};
use taskclock::clock::MonotonicClock;
use taskclock::config::{self, StatsConfig};
use taskclock::json_output::JsonOutput;
use taskclock::live::{self, LiveAccumulator, LiveRegistry};
use taskclock::replay::{self, ReplayAccumulator, ReplayReport};
use taskclock::simulate::{simulate, SimulationConfig};
use taskclock::time_attribution::{calculate_time_attribution, identify_hotspots};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print one line per task plus the optional category summary
fn print_text_report(report: &ReplayReport, hotspots: bool) {
    for record in report.records.values() {
        let state = if record.is_finalized() { "" } else { " (open)" };
        println!("task {}{}: {}", record.id, state, record);
    }
    println!(
        "{} tasks, {} events applied, {} dropped",
        report.len(),
        report.events_applied,
        report.dropped
    );

    if hotspots {
        let attributions = calculate_time_attribution(report.records.values());
        println!();
        println!("=== Time Attribution ===");
        for attribution in &attributions {
            println!("{}", attribution);
        }

        let hotspots = identify_hotspots(&attributions);
        if !hotspots.is_empty() {
            println!();
            println!("=== Hotspots ===");
            for hotspot in &hotspots {
                println!("{}", hotspot.to_report_string());
            }
        }
    }
}

fn run_replay(args: ReplayArgs, debug: bool) -> Result<()> {
    let mut stats = match &args.config {
        Some(path) => StatsConfig::from_file(path)?,
        None => StatsConfig::default(),
    };
    if let Some(workers) = args.workers {
        stats.workers = workers;
    }
    stats.validate().map_err(anyhow::Error::msg)?;
    if stats.debug && !debug {
        // Config asked for transition lines the --debug flag did not set up
        init_tracing(true);
    }
    stats.debug |= debug;
    if !stats.enabled {
        eprintln!("note: enabled = false only disables live accounting; replaying anyway");
    }
    stats.install();

    let events = replay::read_jsonl_file(&args.trace)?;
    let mut acc = ReplayAccumulator::with_workers(stats.workers);
    acc.feed(&events);
    let report = acc.finish();

    match args.format {
        OutputFormat::Text => print_text_report(&report, args.hotspots),
        OutputFormat::Json => {
            let mut output = JsonOutput::from_report(&report);
            if args.hotspots {
                let attributions = calculate_time_attribution(report.records.values());
                output.set_attribution(&attributions);
                output.set_hotspots(&identify_hotspots(&attributions));
            }
            println!("{}", output.to_json()?);
        }
    }
    Ok(())
}

fn run_simulate(args: SimulateArgs) -> Result<()> {
    let config = SimulationConfig {
        tasks: args.tasks,
        workers: args.workers,
        seed: args.seed,
        gc_interval_ns: args.gc_interval,
    };
    config.validate().map_err(anyhow::Error::msg)?;

    let events = simulate(&config);
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            replay::write_jsonl(BufWriter::new(file), &events)?;
        }
        None => replay::write_jsonl(io::stdout().lock(), &events)?,
    }
    Ok(())
}

/// Spin for `unit` without yielding the thread
fn busy(unit: Duration) {
    let started = Instant::now();
    let mut sum = 0u64;
    while started.elapsed() < unit {
        sum = std::hint::black_box(sum.wrapping_add(1));
    }
}

/// Compute, sleep, write, fetch, then hand a value over a rendezvous channel
fn demo_task(task: &mut LiveAccumulator, unit: Duration) -> Result<()> {
    task.on_create()?;
    task.on_start()?;
    busy(unit);

    task.on_block(BlockReason::Sleep)?;
    thread::sleep(unit);
    task.on_unblock()?;
    task.on_start()?;

    task.on_syscall_enter()?;
    let mut sink = io::sink();
    sink.write_all(&vec![b'a'; 1 << 20])?;
    thread::sleep(unit / 2);
    task.on_syscall_exit()?;
    task.on_start()?;

    task.on_block(BlockReason::Net)?;
    thread::sleep(unit * 2);
    task.on_unblock()?;
    task.on_start()?;

    let (tx, rx) = crossbeam::channel::bounded::<u64>(0);
    let receiver = thread::spawn(move || {
        thread::sleep(unit);
        rx.recv().ok()
    });
    task.on_block(BlockReason::Send)?;
    tx.send(task.id()).context("receiver hung up")?;
    task.on_unblock()?;
    task.on_start()?;
    receiver
        .join()
        .map_err(|_| anyhow::anyhow!("receiver thread panicked"))?;

    busy(unit / 2);
    Ok(())
}

fn run_live_demo(args: LiveDemoArgs) -> Result<()> {
    let unit = Duration::from_millis(args.unit_ms);
    let registry = Arc::new(LiveRegistry::new(Arc::new(MonotonicClock::new())));

    let workers: Vec<_> = (1..=args.tasks)
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || -> Result<Option<TaskTimeRecord>> {
                let Some(mut task) = registry.attach(id)? else {
                    return Ok(None);
                };
                let _current = live::enter(task.handle());
                demo_task(&mut task, unit)?;
                let seen = live::query_current();
                task.on_end()?;
                tracing::debug!(task = id, ?seen, "task body finished");
                Ok(registry.evict(id))
            })
        })
        .collect();

    for worker in workers {
        let record = worker
            .join()
            .map_err(|_| anyhow::anyhow!("demo task panicked"))??;
        match record {
            Some(record) => println!("task {}: {}", record.id, record),
            None => println!("stats disabled"),
        }
    }
    println!("sched ticks: {}", registry.default_group().sched_ticks());
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);
    config::set_debug(args.debug);

    match args.command {
        Command::Replay(replay_args) => run_replay(replay_args, args.debug),
        Command::Simulate(simulate_args) => run_simulate(simulate_args),
        Command::LiveDemo(demo_args) => run_live_demo(demo_args),
    }
}
