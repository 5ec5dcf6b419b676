use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    Rising,
    Falling,
}

impl std::fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EchoEdge::Rising => f.write_str("echo start"),
            EchoEdge::Falling => f.write_str("echo end"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InterlockError {
    #[error("{sensor}: no {edge} within {waited:?}")]
    SensorTimeout {
        sensor: &'static str,
        edge: EchoEdge,
        waited: Duration,
    },

    #[error("echo edge wait failed: {0}")]
    EchoWait(String),

    #[error("geolocation unavailable: {0}")]
    GeoLocationUnavailable(String),

    #[error("telemetry delivery failed: {0}")]
    TelemetryDeliveryFailure(String),

    #[error("failed to initialize {component}: {reason}")]
    HardwareInitFailure {
        component: &'static str,
        reason: String,
    },

    #[error("ADC read failed on channel {channel}: {reason}")]
    AdcRead { channel: u8, reason: String },

    #[error("display write failed: {0}")]
    DisplayWrite(String),

    #[error("distance writer for {0} already claimed")]
    WriterClaimed(&'static str),

    #[error("{0} is not in the distance table")]
    UnknownSensor(&'static str),
}

impl InterlockError {
    pub fn init(component: &'static str, err: impl std::fmt::Display) -> Self {
        InterlockError::HardwareInitFailure {
            component,
            reason: err.to_string(),
        }
    }
}
