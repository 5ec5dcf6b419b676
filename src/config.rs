use std::time::Duration;

use crate::distance::SensorId;

pub const RELAY_PIN: u8 = 16;

pub const GAS_ADC_ADDRESS: u16 = 0x4a;
pub const GAS_CHANNEL: u8 = 0;
pub const PRESSURE_ADC_ADDRESSES: [u16; 2] = [0x48, 0x49];
pub const PRESSURE_CHANNELS: [u8; 4] = [0, 1, 2, 3];

pub const LCD_ADDRESS: u16 = 0x27;
pub const LCD_COLUMNS: usize = 16;

pub const SENSORS: [SensorId; 6] = [
    SensorId::new("Left Front", 22, 10),
    SensorId::new("Left Middle", 17, 27),
    SensorId::new("Left Rear", 23, 24),
    SensorId::new("Right Front", 5, 6),
    SensorId::new("Right Middle", 13, 19),
    SensorId::new("Right Rear", 26, 21),
];

/// Time the ultrasonic units need after their trigger lines are pulled low.
pub const SENSOR_SETTLE: Duration = Duration::from_secs(3);

pub const BREATH_THRESHOLD: i32 = 150;
pub const ALCOHOL_THRESHOLD: i32 = 150;
pub const DETECTION_WINDOW: Duration = Duration::from_secs(5);
pub const GAS_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const CONTROL_TICK: Duration = Duration::from_millis(300);
pub const APPROACH_THRESHOLD_CM: f64 = 90.0;
pub const APPROACH_HOLD: Duration = Duration::from_millis(500);
pub const OVERSTAFF_THRESHOLD: i64 = 15000;
pub const DEPARTURE_BAND_CM: DepartureBand = DepartureBand {
    min_cm: 125.0,
    max_cm: 145.0,
};
pub const MONITOR_DURATION: Duration = Duration::from_secs(15);
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(1);
pub const PROMPT_PAUSE: Duration = Duration::from_millis(500);

pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(100);
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

pub const TELEMETRY_ENDPOINT: &str = "http://127.0.0.1:8080/api/sensor";
pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(20);
pub const TELEMETRY_QUEUE: usize = 16;
pub const GPSD_ADDRESS: &str = "127.0.0.1:2947";
pub const GPSD_TIMEOUT: Duration = Duration::from_secs(3);
pub const NETWORK_INTERFACE: &str = "wlan0";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepartureBand {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl DepartureBand {
    pub fn contains(&self, total_cm: f64) -> bool {
        (self.min_cm..=self.max_cm).contains(&total_cm)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GasConfig {
    pub breath_threshold: i32,
    pub alcohol_threshold: i32,
    pub window: Duration,
    pub poll_interval: Duration,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            breath_threshold: BREATH_THRESHOLD,
            alcohol_threshold: ALCOHOL_THRESHOLD,
            window: DETECTION_WINDOW,
            poll_interval: GAS_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OccupancyConfig {
    pub control_tick: Duration,
    pub approach_threshold_cm: f64,
    pub approach_hold: Duration,
    pub overstaff_threshold: i64,
    pub departure_band: DepartureBand,
    pub monitor_duration: Duration,
    pub monitor_interval: Duration,
    pub prompt_pause: Duration,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            control_tick: CONTROL_TICK,
            approach_threshold_cm: APPROACH_THRESHOLD_CM,
            approach_hold: APPROACH_HOLD,
            overstaff_threshold: OVERSTAFF_THRESHOLD,
            departure_band: DEPARTURE_BAND_CM,
            monitor_duration: MONITOR_DURATION,
            monitor_interval: MONITOR_INTERVAL,
            prompt_pause: PROMPT_PAUSE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub trigger_pulse: Duration,
    pub echo_timeout: Duration,
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            trigger_pulse: TRIGGER_PULSE,
            echo_timeout: ECHO_TIMEOUT,
            interval: SAMPLE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub gpsd_addr: String,
    pub gpsd_timeout: Duration,
    pub interface: String,
    pub queue_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: TELEMETRY_ENDPOINT.to_string(),
            request_timeout: TELEMETRY_TIMEOUT,
            gpsd_addr: GPSD_ADDRESS.to_string(),
            gpsd_timeout: GPSD_TIMEOUT,
            interface: NETWORK_INTERFACE.to_string(),
            queue_capacity: TELEMETRY_QUEUE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterlockConfig {
    pub gas: GasConfig,
    pub occupancy: OccupancyConfig,
    pub sampler: SamplerConfig,
    pub telemetry: TelemetryConfig,
}

impl InterlockConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(endpoint) = lookup("INTERLOCK_TELEMETRY_URL") {
            config.telemetry.endpoint = endpoint;
        }
        if let Some(addr) = lookup("INTERLOCK_GPSD_ADDR") {
            config.telemetry.gpsd_addr = addr;
        }
        if let Some(interface) = lookup("INTERLOCK_INTERFACE") {
            config.telemetry.interface = interface;
        }
        config
    }
}
