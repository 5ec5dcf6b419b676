use std::sync::Arc;

use crate::clock::Clock;
use crate::config::GasConfig;
use crate::hardware::AnalogInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    BreathDetected,
    AlcoholDetected,
    NoDetection,
}

pub struct GasClassifier {
    input: Box<dyn AnalogInput>,
    channel: u8,
    config: GasConfig,
    clock: Arc<dyn Clock>,
}

impl GasClassifier {
    pub fn new(
        input: Box<dyn AnalogInput>,
        channel: u8,
        config: GasConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            input,
            channel,
            config,
            clock,
        }
    }

    pub fn classify(&mut self) -> Classification {
        let baseline = match self.input.read(self.channel) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Gas baseline unavailable: {e}");
                return Classification::NoDetection;
            }
        };
        log::info!("Gas baseline: {baseline}");

        let started = self.clock.now();
        loop {
            match self.input.read(self.channel) {
                Ok(value) => {
                    log::debug!("Gas reading: {value}");
                    if let Some(result) = judge(baseline, value, &self.config) {
                        return result;
                    }
                }
                Err(e) => log::warn!("Skipping gas reading: {e}"),
            }

            if self.clock.now().duration_since(started) > self.config.window {
                return Classification::NoDetection;
            }

            self.clock.sleep(self.config.poll_interval);
        }
    }
}

pub fn judge(baseline: i32, value: i32, config: &GasConfig) -> Option<Classification> {
    if value > baseline.saturating_add(config.alcohol_threshold) {
        Some(Classification::AlcoholDetected)
    } else if value < baseline.saturating_sub(config.breath_threshold) {
        Some(Classification::BreathDetected)
    } else {
        None
    }
}
