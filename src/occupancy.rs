//! Entry and departure tracking after a passed breath test.
//!
//! ```text
//!  WaitingApproach ──[sum <= 90 cm held 0.5 s]──▶ EntryCaptured(a)      relay on
//!  EntryCaptured(a) ──[sum <= a]──▶ OccupantSeated(b = pressure)
//!  OccupantSeated(b) ──[p >= b + 15000]──▶ Overstaffed                relay off
//!  OccupantSeated(b) ──[0 <= p, sum in band for 15 s]──▶ Departed     relay off
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::{DepartureBand, OccupancyConfig};
use crate::distance::DistanceSource;
use crate::feedback::{Feedback, Status};
use crate::pressure::PressureAggregator;
use crate::relay::{ActuatorGate, RelayCommand};
use crate::telemetry::{Anomaly, TelemetryReporter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OccupancyState {
    /// `near_since` is when the current run of in-range ticks began.
    WaitingApproach { near_since: Option<Instant> },
    EntryCaptured { baseline_distance: f64 },
    OccupantSeated { baseline_pressure: i64 },
}

impl Default for OccupancyState {
    fn default() -> Self {
        OccupancyState::WaitingApproach { near_since: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Stay(OccupancyState),
    Approached { baseline_distance: f64 },
    Entered,
}

impl OccupancyState {
    pub fn on_distance(self, total_cm: f64, now: Instant, config: &OccupancyConfig) -> Transition {
        match self {
            OccupancyState::WaitingApproach { near_since } => {
                if total_cm > config.approach_threshold_cm {
                    return Transition::Stay(OccupancyState::WaitingApproach { near_since: None });
                }
                let since = near_since.unwrap_or(now);
                if now.duration_since(since) >= config.approach_hold {
                    Transition::Approached {
                        baseline_distance: total_cm,
                    }
                } else {
                    Transition::Stay(OccupancyState::WaitingApproach {
                        near_since: Some(since),
                    })
                }
            }
            OccupancyState::EntryCaptured { baseline_distance } if total_cm <= baseline_distance => {
                Transition::Entered
            }
            other => Transition::Stay(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureVerdict {
    Overstaffed,
    WithinLimit,
    Implausible,
}

/// At exactly `baseline + threshold` the overstaffing branch wins.
pub fn assess_pressure(baseline: i64, pressure: i64, threshold: i64) -> PressureVerdict {
    let limit = baseline.saturating_add(threshold);
    if pressure >= limit {
        PressureVerdict::Overstaffed
    } else if pressure >= 0 {
        PressureVerdict::WithinLimit
    } else {
        PressureVerdict::Implausible
    }
}

pub fn monitor_distance_for_duration(
    distances: &dyn DistanceSource,
    clock: &dyn Clock,
    config: &OccupancyConfig,
    shutdown: &CancellationToken,
) -> bool {
    let started = clock.now();
    while clock.now().duration_since(started) < config.monitor_duration {
        if shutdown.is_cancelled() {
            return false;
        }
        let total = distances.total_distance();
        if !in_band(&config.departure_band, total) {
            log::info!("Distance {total:.2} cm left the departure band");
            return false;
        }
        clock.sleep(config.monitor_interval);
    }
    true
}

fn in_band(band: &DepartureBand, total_cm: f64) -> bool {
    band.contains(total_cm)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    Overstaffed,
    Departed,
    Shutdown,
}

pub struct Peripherals {
    pub distances: Arc<dyn DistanceSource>,
    pub pressure: PressureAggregator,
    pub relay: Box<dyn ActuatorGate>,
    pub feedback: Feedback,
    pub telemetry: TelemetryReporter,
    pub clock: Arc<dyn Clock>,
}

pub struct OccupancyStateMachine {
    state: OccupancyState,
    config: OccupancyConfig,
}

impl OccupancyStateMachine {
    pub fn new(config: OccupancyConfig) -> Self {
        Self {
            state: OccupancyState::default(),
            config,
        }
    }

    pub fn run(&mut self, io: &mut Peripherals, shutdown: &CancellationToken) -> CycleEnd {
        self.state = OccupancyState::default();
        loop {
            if shutdown.is_cancelled() {
                return CycleEnd::Shutdown;
            }
            if let Some(end) = self.tick(io, shutdown) {
                self.state = OccupancyState::default();
                return end;
            }
        }
    }

    pub fn tick(&mut self, io: &mut Peripherals, shutdown: &CancellationToken) -> Option<CycleEnd> {
        let total = io.distances.total_distance();
        log::debug!("Total distance: {total:.2} cm");

        match self.state.on_distance(total, io.clock.now(), &self.config) {
            Transition::Stay(state) => self.state = state,
            Transition::Approached { baseline_distance } => {
                io.relay.set(RelayCommand::Enable);
                log::info!("Approach held, entry baseline a = {baseline_distance:.2} cm");
                self.state = OccupancyState::EntryCaptured { baseline_distance };
            }
            Transition::Entered => match io.pressure.measure() {
                Ok(baseline_pressure) => {
                    log::info!("Occupant entered, seated baseline b = {baseline_pressure}");
                    self.state = OccupancyState::OccupantSeated { baseline_pressure };
                }
                Err(e) => log::warn!("Seated baseline not captured: {e}"),
            },
        }

        io.clock.sleep(self.config.control_tick);

        let OccupancyState::OccupantSeated { baseline_pressure } = self.state else {
            return None;
        };

        let pressure = match io.pressure.measure() {
            Ok(pressure) => pressure,
            Err(e) => {
                log::warn!("Skipping pressure check: {e}");
                return None;
            }
        };
        log::debug!("Pressure: {pressure}");

        match assess_pressure(baseline_pressure, pressure, self.config.overstaff_threshold) {
            PressureVerdict::Overstaffed => {
                io.feedback.show(Status::Overstaffing);
                io.relay.set(RelayCommand::Disable);
                io.telemetry.report(Anomaly::Overstaffing);
                log::warn!("Overstaffing: pressure {pressure} against baseline {baseline_pressure}");
                Some(CycleEnd::Overstaffed)
            }
            PressureVerdict::WithinLimit => {
                io.feedback.show(Status::Go);
                io.relay.set(RelayCommand::Enable);
                log::info!("Pressure within limit, watching departure band");
                if monitor_distance_for_duration(
                    io.distances.as_ref(),
                    io.clock.as_ref(),
                    &self.config,
                    shutdown,
                ) {
                    io.feedback.show(Status::Wait);
                    io.relay.set(RelayCommand::Disable);
                    log::info!("Departure band held, restarting breath test");
                    Some(CycleEnd::Departed)
                } else {
                    None
                }
            }
            PressureVerdict::Implausible => {
                log::warn!("Ignoring negative pressure sum {pressure}");
                None
            }
        }
    }
}
