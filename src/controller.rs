use tokio_util::sync::CancellationToken;

use crate::config::OccupancyConfig;
use crate::feedback::Status;
use crate::gas::{Classification, GasClassifier};
use crate::occupancy::{CycleEnd, OccupancyStateMachine, Peripherals};
use crate::relay::RelayCommand;
use crate::telemetry::Anomaly;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    AlcoholDetected,
    NoBreath,
    Occupancy(CycleEnd),
}

pub struct Controller {
    gas: GasClassifier,
    machine: OccupancyStateMachine,
    io: Peripherals,
    config: OccupancyConfig,
}

impl Controller {
    pub fn new(gas: GasClassifier, io: Peripherals, config: OccupancyConfig) -> Self {
        Self {
            gas,
            machine: OccupancyStateMachine::new(config),
            io,
            config,
        }
    }

    pub fn run(&mut self, shutdown: &CancellationToken) {
        while !shutdown.is_cancelled() {
            let outcome = self.run_cycle(shutdown);
            log::debug!("Cycle finished: {outcome:?}");
        }
    }

    pub fn run_cycle(&mut self, shutdown: &CancellationToken) -> CycleOutcome {
        self.io.relay.set(RelayCommand::Disable);
        self.io.feedback.show(Status::Blow);
        self.io.clock.sleep(self.config.prompt_pause);

        match self.gas.classify() {
            Classification::BreathDetected => {
                self.io.feedback.show(Status::Breath);
                log::info!("Breath detected");
            }
            Classification::AlcoholDetected => {
                self.io.feedback.show(Status::Alcohol);
                self.io.relay.set(RelayCommand::Disable);
                self.io.telemetry.report(Anomaly::AlcoholDetected);
                log::warn!("Alcohol detected, restarting breath test");
                return CycleOutcome::AlcoholDetected;
            }
            Classification::NoDetection => {
                self.io.feedback.show(Status::TryAgain);
                self.io.relay.set(RelayCommand::Disable);
                log::info!("No breath detected, restarting breath test");
                return CycleOutcome::NoBreath;
            }
        }

        CycleOutcome::Occupancy(self.machine.run(&mut self.io, shutdown))
    }

    pub fn shutdown(&mut self) {
        self.io.relay.set(RelayCommand::Disable);
        self.io.feedback.blank();
        log::info!("Relay disabled for shutdown");
    }
}
