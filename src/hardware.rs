use std::time::{Duration, Instant};

use backon::BlockingRetryable;
use backon::ConstantBuilder;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};

use crate::ads1115::Ads1115;
use crate::config::{
    GAS_ADC_ADDRESS, LCD_ADDRESS, PRESSURE_ADC_ADDRESSES, RELAY_PIN, SENSOR_SETTLE, SENSORS,
};
use crate::distance::SensorId;
use crate::error::InterlockError;
use crate::lcd::Lcd;

pub trait AnalogInput: Send {
    fn read(&mut self, channel: u8) -> Result<i32, InterlockError>;
}

pub trait DigitalOutput: Send {
    fn set(&mut self, level: Level);
}

pub trait DigitalInput: Send {
    fn discard_pending(&mut self) -> Result<(), InterlockError>;
    /// Kernel timestamp of the next edge to `level`, or `None` once `timeout` passes.
    fn wait_for_edge(
        &mut self,
        level: Level,
        timeout: Duration,
    ) -> Result<Option<Duration>, InterlockError>;
}

pub trait TextDisplay: Send {
    fn clear(&mut self) -> Result<(), InterlockError>;
    fn write(&mut self, text: &str) -> Result<(), InterlockError>;
}

impl DigitalOutput for OutputPin {
    fn set(&mut self, level: Level) {
        self.write(level);
    }
}

impl DigitalInput for InputPin {
    fn discard_pending(&mut self) -> Result<(), InterlockError> {
        self.poll_interrupt(true, Some(Duration::ZERO))
            .map(|_| ())
            .map_err(|e| InterlockError::EchoWait(e.to_string()))
    }

    fn wait_for_edge(
        &mut self,
        level: Level,
        timeout: Duration,
    ) -> Result<Option<Duration>, InterlockError> {
        let wanted = match level {
            Level::High => Trigger::RisingEdge,
            Level::Low => Trigger::FallingEdge,
        };
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.poll_interrupt(false, Some(remaining)) {
                Ok(Some(event)) if event.trigger == wanted => return Ok(Some(event.timestamp)),
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(None),
                Err(e) => return Err(InterlockError::EchoWait(e.to_string())),
            }
        }
    }
}

#[derive(Debug)]
pub struct RangerPins {
    pub sensor: SensorId,
    pub trigger: OutputPin,
    pub echo: InputPin,
}

#[derive(Debug)]
pub struct Hardware {
    pub relay: OutputPin,
    pub rangers: Vec<RangerPins>,
    pub gas_adc: Ads1115,
    pub pressure_adcs: [Ads1115; 2],
    pub display: Lcd,
}

impl Hardware {
    pub fn open() -> Result<Self, InterlockError> {
        let retry_builder = ConstantBuilder::default()
            .with_delay(Duration::from_millis(100))
            .with_max_times(20);

        let gpio = Gpio::new().map_err(|e| InterlockError::init("GPIO", e))?;
        let relay = gpio
            .get(RELAY_PIN)
            .map_err(|e| InterlockError::init("relay pin", e))?
            .into_output_low();

        let mut rangers = Vec::with_capacity(SENSORS.len());
        for sensor in SENSORS {
            let trigger = gpio
                .get(sensor.trigger_pin)
                .map_err(|e| InterlockError::init("trigger pin", e))?
                .into_output_low();
            let mut echo = gpio
                .get(sensor.echo_pin)
                .map_err(|e| InterlockError::init("echo pin", e))?
                .into_input();
            echo.set_interrupt(Trigger::Both, None)
                .map_err(|e| InterlockError::init("echo interrupt", e))?;
            rangers.push(RangerPins {
                sensor,
                trigger,
                echo,
            });
        }
        log::info!("Ultrasonic sensors initialized");

        let open_adc = |address: u16| -> Result<Ads1115, InterlockError> {
            let mut adc = Ads1115::new(address)?;
            (|| adc.init())
                .retry(retry_builder)
                .notify(|e, dur| {
                    log::error!("{e}");
                    log::info!("Retrying in {:?}", dur);
                })
                .call()?;
            Ok(adc)
        };
        let gas_adc = open_adc(GAS_ADC_ADDRESS)?;
        let pressure_adcs = [
            open_adc(PRESSURE_ADC_ADDRESSES[0])?,
            open_adc(PRESSURE_ADC_ADDRESSES[1])?,
        ];

        let mut display = Lcd::new(LCD_ADDRESS)?;
        (|| display.init())
            .retry(retry_builder)
            .notify(|e, dur| {
                log::error!("{e}");
                log::info!("Retrying in {:?}", dur);
            })
            .call()?;

        std::thread::sleep(SENSOR_SETTLE);

        Ok(Self {
            relay,
            rangers,
            gas_adc,
            pressure_adcs,
            display,
        })
    }
}
