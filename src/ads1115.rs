use std::time::Duration;

use rppal::i2c::I2c;

use crate::error::InterlockError;
use crate::hardware::AnalogInput;

pub const CONVERSION_REGISTER: u8 = 0x00;
pub const CONFIG_REGISTER: u8 = 0x01;

pub const MAX_CHANNEL: u8 = 3;

// OS=1 starts a single conversion.
const CONFIG_OS_SINGLE: u16 = 0x8000;
// MUX=1xx selects AINx against GND.
const CONFIG_MUX_SINGLE_ENDED: u16 = 0x4000;
// PGA gain 1, +/-4.096 V.
const CONFIG_GAIN_ONE: u16 = 0x0200;
const CONFIG_MODE_SINGLE_SHOT: u16 = 0x0100;
const CONFIG_DATA_RATE_128: u16 = 0x0080;
const CONFIG_COMPARATOR_DISABLED: u16 = 0x0003;

pub const DATA_RATE_SPS: u64 = 128;
pub const CONVERSION_DELAY: Duration = Duration::from_micros(1_000_000 / DATA_RATE_SPS + 100);

#[derive(Debug)]
pub struct Ads1115 {
    i2c: I2c,
    address: u16,
}

impl Ads1115 {
    pub fn new(address: u16) -> Result<Ads1115, InterlockError> {
        let mut i2c = I2c::new().map_err(|e| InterlockError::init("I2C", e))?;
        i2c.set_slave_address(address)
            .map_err(|e| InterlockError::init("ADS1115 address", e))?;

        Ok(Ads1115 { i2c, address })
    }

    pub fn init(&mut self) -> Result<(), InterlockError> {
        let mut response = [0u8; 2];
        self.i2c
            .write_read(&[CONFIG_REGISTER], &mut response)
            .map_err(|e| {
                InterlockError::init("ADS1115", format!("no answer at {:#04x}: {e}", self.address))
            })?;

        Ok(())
    }

    pub fn read_channel(&mut self, channel: u8) -> Result<i16, InterlockError> {
        let config = config_word(channel).ok_or_else(|| InterlockError::AdcRead {
            channel,
            reason: format!("channel must be 0..={MAX_CHANNEL}"),
        })?;

        let [high, low] = config.to_be_bytes();
        self.i2c
            .write(&[CONFIG_REGISTER, high, low])
            .map_err(|e| InterlockError::AdcRead {
                channel,
                reason: format!("failed to write config: {e}"),
            })?;

        std::thread::sleep(CONVERSION_DELAY);

        let mut response = [0u8; 2];
        self.i2c
            .write_read(&[CONVERSION_REGISTER], &mut response)
            .map_err(|e| InterlockError::AdcRead {
                channel,
                reason: format!("failed to read conversion: {e}"),
            })?;

        Ok(i16::from_be_bytes(response))
    }
}

impl AnalogInput for Ads1115 {
    fn read(&mut self, channel: u8) -> Result<i32, InterlockError> {
        self.read_channel(channel).map(i32::from)
    }
}

pub fn config_word(channel: u8) -> Option<u16> {
    if channel > MAX_CHANNEL {
        return None;
    }

    Some(
        CONFIG_OS_SINGLE
            | CONFIG_MUX_SINGLE_ENDED
            | (u16::from(channel) << 12)
            | CONFIG_GAIN_ONE
            | CONFIG_MODE_SINGLE_SHOT
            | CONFIG_DATA_RATE_128
            | CONFIG_COMPARATOR_DISABLED,
    )
}
