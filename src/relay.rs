use rppal::gpio::Level;

use crate::hardware::DigitalOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    Enable,
    Disable,
}

impl RelayCommand {
    pub fn level(self) -> Level {
        match self {
            RelayCommand::Enable => Level::High,
            RelayCommand::Disable => Level::Low,
        }
    }
}

pub trait ActuatorGate: Send {
    fn set(&mut self, command: RelayCommand);
}

#[derive(Debug)]
pub struct Relay<P> {
    pin: P,
    last: Option<RelayCommand>,
}

impl<P: DigitalOutput> Relay<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, last: None }
    }
}

impl<P: DigitalOutput> ActuatorGate for Relay<P> {
    fn set(&mut self, command: RelayCommand) {
        self.pin.set(command.level());
        if self.last != Some(command) {
            log::info!("Relay -> {command:?}");
            self.last = Some(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPin;

    #[test]
    fn test_relay_drives_pin_every_time() {
        let pin = RecordingPin::default();
        let levels = pin.levels();
        let mut relay = Relay::new(pin);

        relay.set(RelayCommand::Enable);
        relay.set(RelayCommand::Enable);
        relay.set(RelayCommand::Disable);

        assert_eq!(*levels.lock(), vec![Level::High, Level::High, Level::Low]);
    }
}
