use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clock::SystemClock;
use config::{GAS_CHANNEL, InterlockConfig, SENSORS};
use controller::Controller;
use distance::DistanceTable;
use feedback::Feedback;
use gas::GasClassifier;
use hardware::Hardware;
use log::LevelFilter;
use occupancy::Peripherals;
use pressure::PressureAggregator;
use range_sampler::RangeSampler;
use relay::Relay;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use telemetry::{TelemetryReporter, TelemetryWorker};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod ads1115;
mod clock;
mod config;
mod controller;
mod distance;
mod error;
mod feedback;
mod gas;
mod geolocation;
mod hardware;
mod lcd;
mod network;
mod occupancy;
mod pressure;
mod range_sampler;
mod relay;
mod telemetry;
#[cfg(test)]
mod testing;

const TELEMETRY_FLUSH_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    TermLogger::init(
        LevelFilter::Info,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .set_time_offset_to_local()
            .map_err(|_| anyhow::anyhow!("Failed to set time offset to local"))?
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;

    if let Err(e) = run().await {
        log::error!("{e:#}");
    }

    Ok(())
}

pub async fn run() -> Result<(), anyhow::Error> {
    let config = InterlockConfig::from_env();

    let hardware = tokio::task::spawn_blocking(Hardware::open)
        .await
        .context("Hardware bring-up panicked")?
        .context("Failed to initialize hardware")?;

    let (reporter, events) = TelemetryReporter::channel(config.telemetry.queue_capacity);
    let worker = TelemetryWorker::new(config.telemetry.clone())
        .context("Failed to initialize telemetry")?;

    let shutdown = CancellationToken::new();
    // Early returns below must still stop the blocking tasks.
    let _cancel_on_exit = shutdown.clone().drop_guard();
    let table = Arc::new(DistanceTable::new(&SENSORS));

    let mut samplers = Vec::with_capacity(hardware.rangers.len());
    for pins in hardware.rangers {
        let writer = table
            .writer(pins.sensor)
            .context("Failed to assign distance writer")?;
        let sampler = RangeSampler::new(pins.trigger, pins.echo, writer, config.sampler);
        let token = shutdown.clone();
        samplers.push(tokio::task::spawn_blocking(move || sampler.run(&token)));
    }

    let mut telemetry = tokio::spawn(worker.run(events));

    let clock = Arc::new(SystemClock);
    let [bank_a, bank_b] = hardware.pressure_adcs;
    let io = Peripherals {
        distances: table,
        pressure: PressureAggregator::new([Box::new(bank_a), Box::new(bank_b)]),
        relay: Box::new(Relay::new(hardware.relay)),
        feedback: Feedback::new(Box::new(hardware.display)),
        telemetry: reporter,
        clock: clock.clone(),
    };
    let gas = GasClassifier::new(Box::new(hardware.gas_adc), GAS_CHANNEL, config.gas, clock);
    let controller = Controller::new(gas, io, config.occupancy);

    let control = spawn_control(controller, shutdown.clone());
    log::info!("Interlock running");

    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Interrupt received, shutting down"),
        Err(e) => log::error!("Failed to wait for Ctrl+C signal, shutting down: {e}"),
    }
    shutdown.cancel();

    if let Err(e) = control.await {
        log::error!("Control loop ended abnormally: {e}");
    }
    for sampler in samplers {
        if let Err(e) = sampler.await {
            log::error!("Range sampler ended abnormally: {e}");
        }
    }

    // The controller owned the last reporter, so the queue is closed by now.
    if tokio::time::timeout(TELEMETRY_FLUSH_GRACE, &mut telemetry)
        .await
        .is_err()
    {
        log::warn!("Dropping undelivered telemetry");
        telemetry.abort();
    }

    Ok(())
}

fn spawn_control(mut controller: Controller, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        controller.run(&shutdown);
        controller.shutdown();
    })
}
