use crate::hardware::TextDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Blow,
    Breath,
    Alcohol,
    TryAgain,
    Overstaffing,
    Go,
    Wait,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Status::Blow => "blow",
            Status::Breath => "Breath detected!",
            Status::Alcohol => "Alcohol detected",
            Status::TryAgain => "Please try again",
            Status::Overstaffing => "overstaffing",
            Status::Go => "Lets move !",
            Status::Wait => "Please wait. . .",
        }
    }
}

pub struct Feedback {
    display: Box<dyn TextDisplay>,
}

impl Feedback {
    pub fn new(display: Box<dyn TextDisplay>) -> Self {
        Self { display }
    }

    pub fn show(&mut self, status: Status) {
        let result = self
            .display
            .clear()
            .and_then(|()| self.display.write(status.text()));
        if let Err(e) = result {
            log::warn!("Failed to show {status:?}: {e}");
        }
    }

    pub fn blank(&mut self) {
        if let Err(e) = self.display.clear() {
            log::warn!("Failed to clear display: {e}");
        }
    }
}
