//! vespa-guard - hornet detection and deterrent control for hive entrances.
//!
//! Frames flow through motion detection, multi-object tracking and
//! behavior classification; a decision step turns the best target into an
//! actuation request, and the [`safety::SafetyGate`] decides whether the
//! actuator may act on it.

#![warn(missing_docs)]

pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod frame;
pub mod output;
pub mod pipeline;
pub mod safety;
pub mod targeting;
pub mod tracking;

use clap::Parser;
use classify::ConfidenceTier;
use cli::{Cli, Command, ConfigAction, SimulateArgs};
use config::{
    Config, config_file_path, load_config, load_config_file, save_config, save_default_config,
};
use frame::{FrameDims, SyntheticScene};
use pipeline::ControlLoop;
use safety::{Clock, ManualClock, SafetyGate, SimulatedActuator, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the vespa-guard CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Simulate(args) => {
            let config = load_config(cli.config.as_deref())?;
            simulate(&args, &config, cli.quiet)
        }
        Command::Config { action } => handle_config_command(action, cli.config.as_deref()),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[derive(Debug, Default)]
struct SimulationSummary {
    frames: u64,
    degraded: u64,
    detections: u64,
    medium: u64,
    high: u64,
    engaged_frames: u64,
}

/// Replay a synthetic scene through the control loop.
fn simulate(args: &SimulateArgs, config: &Config, quiet: bool) -> Result<()> {
    let dims = FrameDims::from(config.frame);
    let scene = SyntheticScene::new(args.scenario, dims, args.fps);

    let manual_clock = ManualClock::new(0);
    let clock: Arc<dyn Clock> = if args.realtime {
        Arc::new(SystemClock::new())
    } else {
        Arc::new(manual_clock.clone())
    };

    let gate = Arc::new(SafetyGate::new(&config.safety, clock));
    gate.set_voltage(args.voltage_mv);
    let _monitor = safety::start_watchdog_monitor(
        Arc::clone(&gate),
        Duration::from_millis(config.safety.monitor_interval_ms),
    )?;

    let mut control = ControlLoop::from_config(config, Arc::clone(&gate), SimulatedActuator::new())?;

    // Arming may be refused (kill switch, latched safe mode); run disarmed then.
    if args.arm
        && let Err(e) = gate.arm()
    {
        warn!("{e}");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let mut writer = match &args.events {
        Some(path) => Some(output::create_event_writer(args.format, path)?),
        None => None,
    };

    info!(
        "Simulating {} frames of '{}' at {} fps ({}x{}, gate {})",
        args.frames,
        args.scenario,
        args.fps,
        dims.width,
        dims.height,
        gate.state()
    );

    let progress = output::create_frame_progress(
        u64::from(args.frames),
        &args.scenario.to_string(),
        !quiet && !args.no_progress,
    );

    let mut summary = SimulationSummary::default();
    for index in 0..u64::from(args.frames) {
        if stop.load(Ordering::SeqCst) {
            warn!("Interrupted, stopping after {index} frames");
            break;
        }

        let frame = scene.frame(index);
        if args.realtime {
            if index > 0 {
                std::thread::sleep(Duration::from_millis(scene.interval_ms()));
            }
        } else {
            manual_clock.set(frame.timestamp_ms());
        }

        let tick = control.tick(&frame);

        summary.frames += 1;
        summary.degraded += u64::from(tick.frame.degraded);
        summary.detections += tick.frame.detections.len() as u64;
        match tick.frame.best_confidence() {
            Some(ConfidenceTier::High) => summary.high += 1,
            Some(ConfidenceTier::Medium) => summary.medium += 1,
            _ => {}
        }
        summary.engaged_frames += u64::from(tick.actuator_on);

        if let Some(writer) = writer.as_mut() {
            for record in output::EventRecord::from_tick(&tick, chrono::Utc::now()) {
                writer.write_event(&record)?;
            }
        }

        output::inc_progress(progress.as_ref());
    }

    control.shutdown();
    output::finish_progress(progress, "done");

    if let Some(mut writer) = writer {
        writer.finalize()?;
    }

    print_summary(args, &summary, &control);
    Ok(())
}

fn print_summary(
    args: &SimulateArgs,
    summary: &SimulationSummary,
    control: &ControlLoop<SimulatedActuator>,
) {
    let stats = control.gate().stats();
    println!("Scenario:            {}", args.scenario);
    println!("Frames processed:    {}", summary.frames);
    println!("Degraded frames:     {}", summary.degraded);
    println!("Detections:          {}", summary.detections);
    println!("Medium-confidence:   {} frames", summary.medium);
    println!("High-confidence:     {} frames", summary.high);
    println!("Actuator on:         {} frames", summary.engaged_frames);
    println!("Activations:         {}", control.actuator().activations());
    println!(
        "Gate checks:         {} passed, {} denied",
        stats.checks_passed, stats.checks_failed
    );
    println!("Safe-mode entries:   {}", stats.safe_mode_entries);
    println!("Final gate state:    {}", control.gate().state());
    if let Some(path) = &args.events {
        println!("Events written to:   {}", path.display());
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => config_file_path(),
    }
}

fn handle_config_command(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = resolve_config_path(explicit)?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = match explicit {
                    Some(path) => {
                        save_config(&Config::default(), path)?;
                        path.to_path_buf()
                    }
                    None => save_default_config(&Config::default())?,
                };
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            let text =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = resolve_config_path(explicit)?;
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Check => {
            let path = resolve_config_path(explicit)?;
            let config = load_config_file(&path)?;
            config::validate_config(&config)?;
            if path.exists() {
                println!("Configuration OK: {}", path.display());
            } else {
                println!("No configuration file at {}; defaults are valid", path.display());
            }
            Ok(())
        }
    }
}
