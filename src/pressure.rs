use crate::config::PRESSURE_CHANNELS;
use crate::error::InterlockError;
use crate::hardware::AnalogInput;

pub struct PressureAggregator {
    banks: [Box<dyn AnalogInput>; 2],
}

impl PressureAggregator {
    pub fn new(banks: [Box<dyn AnalogInput>; 2]) -> Self {
        Self { banks }
    }

    pub fn measure(&mut self) -> Result<i64, InterlockError> {
        let mut total = 0i64;
        for bank in self.banks.iter_mut() {
            for channel in PRESSURE_CHANNELS {
                total += i64::from(bank.read(channel)?);
            }
        }
        log::debug!("Pressure sum: {total}");
        Ok(total)
    }
}
