use std::time::Duration;

use rppal::i2c::I2c;

use crate::config::LCD_COLUMNS;
use crate::error::InterlockError;
use crate::hardware::TextDisplay;

const BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0x04;
const REGISTER_SELECT: u8 = 0x01;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_LEFT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0c;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;

const CLEAR_DELAY: Duration = Duration::from_millis(2);
const WAKE_DELAY: Duration = Duration::from_micros(4500);

#[derive(Debug)]
pub struct Lcd {
    i2c: I2c,
}

impl Lcd {
    pub fn new(address: u16) -> Result<Lcd, InterlockError> {
        let mut i2c = I2c::new().map_err(|e| InterlockError::init("I2C", e))?;
        i2c.set_slave_address(address)
            .map_err(|e| InterlockError::init("LCD address", e))?;

        Ok(Lcd { i2c })
    }

    pub fn init(&mut self) -> Result<(), InterlockError> {
        // Three 8-bit wake-ups, then switch the controller to 4-bit transfers.
        for _ in 0..3 {
            self.pulse(0x30)
                .map_err(|e| InterlockError::init("LCD", e))?;
            std::thread::sleep(WAKE_DELAY);
        }
        self.pulse(0x20).map_err(|e| InterlockError::init("LCD", e))?;

        for command in [CMD_FUNCTION_4BIT_2LINE, CMD_DISPLAY_ON, CMD_ENTRY_LEFT] {
            self.send(command, 0)
                .map_err(|e| InterlockError::init("LCD", e))?;
        }
        self.clear().map_err(|e| InterlockError::init("LCD", e))?;

        Ok(())
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), InterlockError> {
        for byte in frame(value, mode) {
            self.i2c
                .write(&[byte])
                .map_err(|e| InterlockError::DisplayWrite(e.to_string()))?;
        }
        std::thread::sleep(Duration::from_micros(50));
        Ok(())
    }

    fn pulse(&mut self, nibble: u8) -> Result<(), InterlockError> {
        let data = (nibble & 0xf0) | BACKLIGHT;
        for byte in [data | ENABLE, data] {
            self.i2c
                .write(&[byte])
                .map_err(|e| InterlockError::DisplayWrite(e.to_string()))?;
        }
        Ok(())
    }
}

impl TextDisplay for Lcd {
    fn clear(&mut self) -> Result<(), InterlockError> {
        self.send(CMD_CLEAR, 0)?;
        std::thread::sleep(CLEAR_DELAY);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), InterlockError> {
        for byte in line_bytes(text) {
            self.send(byte, REGISTER_SELECT)?;
        }
        Ok(())
    }
}

/// Expander bytes for one 8-bit transfer: high nibble then low nibble, each
/// latched by raising and dropping the enable line.
pub fn frame(value: u8, mode: u8) -> [u8; 4] {
    let high = (value & 0xf0) | mode | BACKLIGHT;
    let low = ((value << 4) & 0xf0) | mode | BACKLIGHT;
    [high | ENABLE, high, low | ENABLE, low]
}

pub fn line_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .take(LCD_COLUMNS)
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect()
}
