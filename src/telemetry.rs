use std::net::IpAddr;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::TelemetryConfig;
use crate::error::InterlockError;
use crate::geolocation::GpsdClient;
use crate::network;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    AlcoholDetected,
    Overstaffing,
}

impl Anomaly {
    pub fn event_name(self) -> &'static str {
        match self {
            Anomaly::AlcoholDetected => "alcohol_detected",
            Anomaly::Overstaffing => "overstaffing",
        }
    }

    pub fn value(self) -> i64 {
        1
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub anomaly: Anomaly,
    pub occurred_at: DateTime<Local>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TelemetryPayload {
    pub event: &'static str,
    pub value: i64,
    pub timestamp: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip: Option<String>,
    pub mac: Option<String>,
}

impl TelemetryPayload {
    pub fn new(
        event: &TelemetryEvent,
        location: Option<(f64, f64)>,
        ip: Option<IpAddr>,
        mac: Option<String>,
    ) -> Self {
        Self {
            event: event.anomaly.event_name(),
            value: event.anomaly.value(),
            timestamp: event.occurred_at.format(TIMESTAMP_FORMAT).to_string(),
            latitude: location.map(|(lat, _)| lat),
            longitude: location.map(|(_, lon)| lon),
            ip: ip.map(|ip| ip.to_string()),
            mac,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryReporter {
    sender: mpsc::Sender<TelemetryEvent>,
}

impl TelemetryReporter {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TelemetryEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Never blocks. Drops the event when the queue is full or closed.
    pub fn report(&self, anomaly: Anomaly) {
        let event = TelemetryEvent {
            anomaly,
            occurred_at: Local::now(),
        };
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::warn!("Telemetry queue full, dropping {}", event.anomaly.event_name());
            }
            Err(TrySendError::Closed(event)) => {
                log::warn!("Telemetry stopped, dropping {}", event.anomaly.event_name());
            }
        }
    }
}

pub struct TelemetryWorker {
    client: reqwest::Client,
    gps: GpsdClient,
    config: TelemetryConfig,
}

impl TelemetryWorker {
    pub fn new(config: TelemetryConfig) -> Result<Self, InterlockError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| InterlockError::init("HTTP client", e))?;
        let gps = GpsdClient::new(config.gpsd_addr.clone(), config.gpsd_timeout);

        Ok(Self {
            client,
            gps,
            config,
        })
    }

    pub async fn run(self, mut events: mpsc::Receiver<TelemetryEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.deliver(&event).await {
                log::error!("{e}");
            }
        }
        log::info!("Telemetry worker stopped");
    }

    pub async fn deliver(&self, event: &TelemetryEvent) -> Result<(), InterlockError> {
        let location = match self.gps.current().await {
            Ok(location) => Some(location),
            Err(e) => {
                log::warn!("{e}, reporting without location");
                None
            }
        };
        let payload = TelemetryPayload::new(
            event,
            location,
            network::local_ip(),
            network::mac_address(&self.config.interface),
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| InterlockError::TelemetryDeliveryFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InterlockError::TelemetryDeliveryFailure(format!(
                "{} answered {status}",
                self.config.endpoint
            )));
        }

        log::info!("Reported {} to {}", payload.event, self.config.endpoint);
        Ok(())
    }
}
