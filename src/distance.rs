use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::InterlockError;

/// A sample older than this is reported as stale (it still counts toward the sum).
pub const STALE_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorId {
    pub name: &'static str,
    pub trigger_pin: u8,
    pub echo_pin: u8,
}

impl SensorId {
    pub const fn new(name: &'static str, trigger_pin: u8, echo_pin: u8) -> Self {
        Self {
            name,
            trigger_pin,
            echo_pin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub sensor: SensorId,
    pub distance_cm: f64,
    pub measured_at: Instant,
}

pub trait DistanceSource: Send + Sync {
    fn total_distance(&self) -> f64;
}

#[derive(Debug)]
pub struct DistanceTable {
    samples: Mutex<BTreeMap<SensorId, DistanceSample>>,
    claimed: Mutex<Vec<SensorId>>,
}

impl DistanceTable {
    pub fn new(sensors: &[SensorId]) -> Self {
        let created = Instant::now();
        let samples = sensors
            .iter()
            .map(|&sensor| {
                (
                    sensor,
                    DistanceSample {
                        sensor,
                        distance_cm: 0.0,
                        measured_at: created,
                    },
                )
            })
            .collect();

        Self {
            samples: Mutex::new(samples),
            claimed: Mutex::new(Vec::new()),
        }
    }

    pub fn writer(self: &Arc<Self>, sensor: SensorId) -> Result<DistanceWriter, InterlockError> {
        if !self.samples.lock().contains_key(&sensor) {
            return Err(InterlockError::UnknownSensor(sensor.name));
        }

        let mut claimed = self.claimed.lock();
        if claimed.contains(&sensor) {
            return Err(InterlockError::WriterClaimed(sensor.name));
        }
        claimed.push(sensor);

        Ok(DistanceWriter {
            table: Arc::clone(self),
            sensor,
        })
    }

    pub fn snapshot(&self) -> DistanceSnapshot {
        let samples = self.samples.lock();
        DistanceSnapshot {
            samples: samples.values().copied().collect(),
        }
    }

    fn publish(&self, sample: DistanceSample) {
        if let Some(slot) = self.samples.lock().get_mut(&sample.sensor) {
            *slot = sample;
        }
    }
}

impl DistanceSource for DistanceTable {
    fn total_distance(&self) -> f64 {
        let snapshot = self.snapshot();
        if let Some(age) = snapshot.oldest_age(Instant::now()) {
            if age > STALE_AFTER {
                log::debug!("Distance sum includes a sample {:?} old", age);
            }
        }
        snapshot.total_cm()
    }
}

#[derive(Debug)]
pub struct DistanceWriter {
    table: Arc<DistanceTable>,
    sensor: SensorId,
}

impl DistanceWriter {
    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    pub fn publish(&self, distance_cm: f64, measured_at: Instant) {
        self.table.publish(DistanceSample {
            sensor: self.sensor,
            distance_cm,
            measured_at,
        });
    }
}

#[derive(Debug, Clone)]
pub struct DistanceSnapshot {
    samples: Vec<DistanceSample>,
}

impl DistanceSnapshot {
    pub fn samples(&self) -> &[DistanceSample] {
        &self.samples
    }

    pub fn total_cm(&self) -> f64 {
        self.samples().iter().map(|s| s.distance_cm).sum()
    }

    pub fn oldest_age(&self, now: Instant) -> Option<Duration> {
        self.samples
            .iter()
            .map(|s| now.saturating_duration_since(s.measured_at))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SENSORS;

    #[test]
    fn test_new_table_has_zeroed_entry_per_sensor() {
        let table = DistanceTable::new(&SENSORS);
        let snapshot = table.snapshot();
        assert_eq!(snapshot.samples().len(), SENSORS.len());
        assert_eq!(snapshot.total_cm(), 0.0);
    }

    #[test]
    fn test_writer_is_claimed_once() {
        let table = Arc::new(DistanceTable::new(&SENSORS));
        let first = table.writer(SENSORS[0]);
        assert!(first.is_ok());
        assert!(matches!(
            table.writer(SENSORS[0]),
            Err(InterlockError::WriterClaimed("Left Front"))
        ));
        assert!(table.writer(SENSORS[1]).is_ok());
    }

    #[test]
    fn test_writer_for_unknown_sensor_is_rejected() {
        let table = Arc::new(DistanceTable::new(&SENSORS[..2]));
        assert!(matches!(
            table.writer(SENSORS[5]),
            Err(InterlockError::UnknownSensor("Right Rear"))
        ));
    }

    #[test]
    fn test_publish_replaces_only_own_entry() {
        let table = Arc::new(DistanceTable::new(&SENSORS));
        let writer = table.writer(SENSORS[2]).unwrap();
        writer.publish(42.5, Instant::now());
        writer.publish(17.0, Instant::now());

        let snapshot = table.snapshot();
        assert_eq!(snapshot.total_cm(), 17.0);
        let entry = snapshot
            .samples()
            .iter()
            .find(|s| s.sensor == SENSORS[2])
            .unwrap();
        assert_eq!(entry.distance_cm, 17.0);
    }

    #[test]
    fn test_snapshots_are_never_torn() {
        let table = Arc::new(DistanceTable::new(&SENSORS));
        let writers: Vec<_> = SENSORS.iter().map(|&s| table.writer(s).unwrap()).collect();

        std::thread::scope(|scope| {
            for (index, writer) in writers.iter().enumerate() {
                scope.spawn(move || {
                    for round in 0..1000 {
                        // Integer part encodes the writer, fraction the round.
                        let value = index as f64 * 1000.0 + round as f64 / 1000.0;
                        writer.publish(value, Instant::now());
                    }
                });
            }

            for _ in 0..1000 {
                let snapshot = table.snapshot();
                assert_eq!(snapshot.samples().len(), SENSORS.len());
                for sample in snapshot.samples() {
                    let index = SENSORS.iter().position(|&s| s == sample.sensor).unwrap();
                    if sample.distance_cm != 0.0 {
                        assert_eq!((sample.distance_cm / 1000.0).floor() as usize, index);
                    }
                }
            }
        });
    }

    #[test]
    fn test_oldest_age_reports_stalest_sample() {
        let table = Arc::new(DistanceTable::new(&SENSORS[..2]));
        let now = Instant::now();
        table.writer(SENSORS[0]).unwrap().publish(10.0, now);
        let snapshot = table.snapshot();
        let later = now + Duration::from_secs(5);
        assert!(snapshot.oldest_age(later).unwrap() >= Duration::from_secs(5));
    }
}
