use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use protogonos_cortex::{run_tick, Actuator, ComponentRegistry, CortexError, FixedMorphology, Sensor};
use protogonos_sim::{Config, ValidatedConfig};
use protogonos_substrate::{SimpleRuntime, SubstrateMetrics};
use prometheus_client::registry::Registry;
use tracing::info;

const SENSOR_NAME: &str = "signal";
const ACTUATOR_NAME: &str = "weights";

/// Cycles deterministically through a fixed sequence of values, one per
/// tick, wrapping back to the start once exhausted.
struct CyclingSensor {
    sequence: Vec<f64>,
    cursor: AtomicUsize,
}

impl CyclingSensor {
    fn new(sequence: Vec<f64>) -> Self {
        Self {
            sequence,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Sensor for CyclingSensor {
    fn name(&self) -> &str {
        SENSOR_NAME
    }

    fn read(&self) -> Result<Vec<f64>, CortexError> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.sequence.len();
        Ok(vec![self.sequence[index]])
    }
}

struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn name(&self) -> &str {
        ACTUATOR_NAME
    }

    fn write(&self, values: &[f64]) -> Result<(), CortexError> {
        info!(?values, "weights");
        Ok(())
    }
}

fn print_dry_run_report(config: &ValidatedConfig) {
    println!("dry-run report");
    println!("  cpp: {}", config.spec.cpp_name);
    println!("  cep_chain: {:?}", config.spec.cep_chain());
    println!("  fanin_pids: {:?}", config.spec.fanin_pids());
    println!("  weight_count: {}", config.weight_count);
    println!("  ticks: {}", config.ticks);
    println!("  log_level: {}", config.log_level);
    println!("  sensor_sequence: {:?}", config.sensor_sequence);
}

fn main() -> Result<()> {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
    Ok(())
}

fn main_result() -> Result<()> {
    let matches = Command::new("protogonos-sim")
        .about("Runs a plasticity substrate spec for a fixed number of ticks against a synthetic scape.")
        .arg(Arg::new("config").long("config").required(true))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate the config and print a report without running any ticks")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").context("missing --config")?;
    let dry_run = matches.get_flag("dry-run");

    let config_contents =
        std::fs::read_to_string(config_path).with_context(|| format!("could not read config file {config_path}"))?;
    let config: Config = serde_yaml::from_str(&config_contents).context("could not parse config file")?;
    let config = config.validate().context("invalid config")?;

    if dry_run {
        print_dry_run_report(&config);
        println!("config ok");
        return Ok(());
    }

    tracing_subscriber::fmt().with_max_level(config.log_level).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: ValidatedConfig) -> Result<()> {
    let metrics = Arc::new(SubstrateMetrics::new());
    let mut registry = Registry::default();
    metrics.register(&mut registry);

    let mut runtime = SimpleRuntime::new(config.spec, config.weight_count)
        .await
        .context("failed to construct substrate runtime")?
        .with_metrics(metrics);

    let morphology = FixedMorphology::new(
        "sim",
        "synthetic",
        vec![SENSOR_NAME.to_string()],
        vec![ACTUATOR_NAME.to_string()],
    );
    let sensors: ComponentRegistry<dyn Sensor> = ComponentRegistry::new();
    sensors
        .register(SENSOR_NAME, Arc::new(CyclingSensor::new(config.sensor_sequence)))
        .expect("sensor registers exactly once");
    let actuators: ComponentRegistry<dyn Actuator> = ComponentRegistry::new();
    actuators
        .register(ACTUATOR_NAME, Arc::new(LoggingActuator))
        .expect("actuator registers exactly once");

    for tick in 0..config.ticks {
        let weights = run_tick(&mut runtime, &morphology, &sensors, &actuators)
            .await
            .with_context(|| format!("tick {tick} failed"))?;
        info!(tick, ?weights, "completed tick");
    }

    runtime.terminate().await;

    let mut buffer = String::new();
    prometheus_client::encoding::text::encode(&mut buffer, &registry)
        .context("failed to encode metrics")?;
    info!("{buffer}");

    Ok(())
}
