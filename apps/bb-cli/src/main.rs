use bb_app::{
    AppError, AppResult, ControlLoop, LoopConfig, RunOptions, SimulatedBlower, StopHandle,
    SystemClock, load_config, run_loop, save_config,
};
use bb_flow::FlowModel;
use bb_results::CsvLogSink;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bb-cli")]
#[command(about = "Blower box flow controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample/control/log loop
    Run {
        /// Loop configuration YAML (defaults used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Drive a simulated blower instead of hardware
        #[arg(long)]
        simulate: bool,
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Override the configured flow setpoint (L/min)
        #[arg(long)]
        setpoint: Option<f64>,
        /// Force PID feedback on
        #[arg(long)]
        feedback: bool,
    },
    /// Convert a transducer voltage to flow
    Flow {
        /// Transducer output in volts
        volts: f64,
    },
    /// Print or write the default loop configuration
    DefaultConfig {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            simulate,
            duration,
            setpoint,
            feedback,
        } => cmd_run(config.as_deref(), simulate, duration, setpoint, feedback),
        Commands::Flow { volts } => cmd_flow(volts),
        Commands::DefaultConfig { output } => cmd_default_config(output.as_deref()),
    }
}

fn cmd_run(
    config_path: Option<&Path>,
    simulate: bool,
    duration: Option<f64>,
    setpoint: Option<f64>,
    feedback: bool,
) -> AppResult<()> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => LoopConfig::default(),
    };
    if let Some(setpoint) = setpoint {
        config.setpoint_lpm = setpoint;
    }
    config.feedback_enabled |= feedback;
    config.validate()?;

    if !simulate {
        return Err(AppError::Config(
            "no hardware driver is linked into this build; pass --simulate".to_string(),
        ));
    }

    let device = SimulatedBlower::realtime(config.sensor_channel)?;
    let sink = CsvLogSink::new(config.data_dir.clone())?;
    let mut clock = SystemClock::new();
    let opts = RunOptions {
        tick_resolution_s: config.tick_resolution_s,
        max_runtime_s: duration,
    };

    let stop = install_stop_handler()?;
    info!(data_dir = %config.data_dir.display(), "starting simulated run (Ctrl-C to stop)");
    let mut control = ControlLoop::new(config, device, sink, 0.0)?;
    let summary = run_loop(&mut control, &mut clock, &stop, opts);

    let status = control.status();
    println!("✓ Run finished after {} ticks", summary.ticks);
    println!(
        "  Tasks: {} completed, {} skipped, {} failed",
        summary.completed, summary.skipped, summary.failed
    );
    println!("  Setpoint: {:.1} L/min", status.setpoint_lpm);
    if let Some(flow) = status.avg_flow_lpm {
        println!("  Averaged flow: {:.1} L/min", flow);
    }
    if let Some(volts) = status.commanded_voltage {
        println!("  Last command: {:.3} V", volts);
    }
    Ok(())
}

/// Stop handle raised by Ctrl-C / SIGINT, letting the loop finish its tick.
fn install_stop_handler() -> AppResult<StopHandle> {
    let stop = StopHandle::new();
    let on_signal = stop.clone();
    ctrlc::set_handler(move || {
        info!("stop requested");
        on_signal.stop();
    })
    .map_err(|e| std::io::Error::other(format!("failed to install Ctrl-C handler: {e}")))?;
    Ok(stop)
}

fn cmd_flow(volts: f64) -> AppResult<()> {
    let model = FlowModel::default();
    let flow = model.flow_rate_lpm(volts)?;
    println!("{:.3} V → {:.3} L/min", volts, flow);
    Ok(())
}

fn cmd_default_config(output: Option<&Path>) -> AppResult<()> {
    let config = LoopConfig::default();
    match output {
        Some(path) => {
            save_config(path, &config)?;
            println!("✓ Wrote default config to {}", path.display());
        }
        None => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handler_starts_lowered() {
        let stop = install_stop_handler().unwrap();
        assert!(!stop.is_stopped());
    }

    #[test]
    fn run_requires_simulate() {
        let err = cmd_run(None, false, Some(0.0), None, false).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
