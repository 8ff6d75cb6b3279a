#[macro_use]
extern crate failure;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate slog;

use std::env;
use std::process;
use std::time;

use slog::Drain;
use structopt::StructOpt;

pub mod actuator;
pub mod backend;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod pump;
pub mod scheduler;
pub mod sensors;

#[derive(Debug, StructOpt)]
#[structopt(name = "drizzle", about = "Moisture-driven irrigation pump controller")]
struct Options {
    /// Configuration file; `DRIZZLE_*` environment variables override it.
    #[structopt(short, long, default_value = "drizzle.toml")]
    config: String,
    /// Run a single poll cycle and exit.
    #[structopt(long)]
    once: bool,
}

fn main() {
    let options = Options::from_args();

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    let drain = slog_envlogger::LogBuilder::new(drain)
        .parse(&filters)
        .build();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")));

    let scope_guard = slog_scope::set_global_logger(log.clone());
    if let Err(e) = slog_stdlog::init() {
        warn!(log, "Could not forward library logs"; "error" => %e);
    }

    if let Err(e) = run(log.clone(), options) {
        crit!(log, "Fatal error: {}", e);
        for cause in e.iter_causes() {
            crit!(log, "  caused by: {}", cause);
        }
        // The async drain only flushes on drop.
        drop(scope_guard);
        drop(log);
        process::exit(1);
    }
}

fn run(log: slog::Logger, options: Options) -> Result<(), failure::Error> {
    let config = config::Config::load(&options.config)?;
    info!(log, "Loaded configuration";
          "path" => &options.config, "device_id" => &config.device_id,
          "backend" => &config.backend.base_url);

    let sensor = sensors::Ads1115::open(&config.sensor.i2c_bus, &config.sensor.channel)?;
    let probe = sensors::Probe::new(sensor, config.calibration()?, config.sensor.samples);

    let transport = backend::HttpTransport::new(&config.backend)?;
    let client = backend::Client::new(
        log.new(o!("component" => "backend")),
        transport,
        config.device_id.clone(),
    );

    let relay = actuator::GpioOutput::new(config.relay.pin, config.relay.active_low)?;
    let actuator = actuator::Actuator::new(relay)?;

    let indicator = match config.indicator.pin {
        Some(pin) => Some(diagnostics::Led::new(
            actuator::GpioOutput::new(pin, false)?,
            time::Duration::from_millis(config.indicator.pulse_millis),
        )),
        None => None,
    };

    let mut controller = controller::Controller::new(
        log.new(o!("component" => "controller")),
        probe,
        client,
        config.hysteresis()?,
        actuator,
        indicator,
    )
    .sync_pump_status(config.backend.sync_pump_status);

    if options.once {
        match controller.run_cycle() {
            controller::Outcome::Skipped(e) => Err(e.into()),
            _ => Ok(()),
        }
    } else {
        let scheduler =
            scheduler::Scheduler::new(time::Duration::from_secs(config.schedule.interval_secs));
        controller.run(scheduler)
    }
}
