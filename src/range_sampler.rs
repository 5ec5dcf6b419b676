use std::time::{Duration, Instant};

use rppal::gpio::Level;
use tokio_util::sync::CancellationToken;

use crate::config::SamplerConfig;
use crate::distance::DistanceWriter;
use crate::error::{EchoEdge, InterlockError};
use crate::hardware::{DigitalInput, DigitalOutput};

// Half the speed of sound, since the echo covers the distance twice.
pub const HALF_SPEED_OF_SOUND_CM_PER_S: f64 = 17150.0;

pub fn distance_from_echo(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * HALF_SPEED_OF_SOUND_CM_PER_S
}

pub struct RangeSampler<T, E> {
    trigger: T,
    echo: E,
    writer: DistanceWriter,
    config: SamplerConfig,
}

impl<T: DigitalOutput, E: DigitalInput> RangeSampler<T, E> {
    pub fn new(trigger: T, echo: E, writer: DistanceWriter, config: SamplerConfig) -> Self {
        Self {
            trigger,
            echo,
            writer,
            config,
        }
    }

    pub fn measure_once(&mut self) -> Result<f64, InterlockError> {
        self.echo.discard_pending()?;

        self.trigger.set(Level::High);
        std::thread::sleep(self.config.trigger_pulse);
        self.trigger.set(Level::Low);

        let start = self.wait_for(Level::High, EchoEdge::Rising)?;
        let end = self.wait_for(Level::Low, EchoEdge::Falling)?;

        let distance = distance_from_echo(end.saturating_sub(start));
        self.writer.publish(distance, Instant::now());
        Ok(distance)
    }

    fn wait_for(&mut self, level: Level, edge: EchoEdge) -> Result<Duration, InterlockError> {
        let timeout = self.config.echo_timeout;
        self.echo
            .wait_for_edge(level, timeout)?
            .ok_or(InterlockError::SensorTimeout {
                sensor: self.writer.sensor().name,
                edge,
                waited: timeout,
            })
    }

    pub fn run(mut self, shutdown: &CancellationToken) {
        let name = self.writer.sensor().name;
        let mut stalled = false;

        while !shutdown.is_cancelled() {
            match self.measure_once() {
                Ok(distance) => {
                    if stalled {
                        log::info!("{name}: echo recovered");
                        stalled = false;
                    }
                    log::debug!("{name}: {distance:.2} cm");
                }
                Err(e) if stalled => log::debug!("{e}"),
                Err(e) => {
                    log::warn!("{e}, keeping last distance");
                    stalled = true;
                }
            }

            std::thread::sleep(self.config.interval);
        }

        self.trigger.set(Level::Low);
        log::info!("{name}: sampler stopped");
    }
}
