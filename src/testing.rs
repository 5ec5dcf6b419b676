use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rppal::gpio::Level;

use crate::clock::Clock;
use crate::distance::DistanceSource;
use crate::error::InterlockError;
use crate::hardware::{AnalogInput, DigitalInput, DigitalOutput, TextDisplay};
use crate::relay::{ActuatorGate, RelayCommand};

#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }
}

/// Replays one 4-channel frame per read of channel 0, repeating the last frame.
#[derive(Debug)]
pub struct ScriptedInput {
    frames: VecDeque<[i32; 4]>,
    current: [i32; 4],
}

impl ScriptedInput {
    pub fn per_channel(values: [i32; 4]) -> Self {
        Self::frames(vec![values])
    }

    pub fn sequence(values: Vec<i32>) -> Self {
        Self::frames(values.into_iter().map(|v| [v, 0, 0, 0]).collect())
    }

    pub fn frames(frames: Vec<[i32; 4]>) -> Self {
        Self {
            frames: frames.into(),
            current: [0; 4],
        }
    }
}

impl AnalogInput for ScriptedInput {
    fn read(&mut self, channel: u8) -> Result<i32, InterlockError> {
        if channel == 0 {
            if let Some(frame) = self.frames.pop_front() {
                self.current = frame;
            }
        }
        Ok(self.current[usize::from(channel)])
    }
}

#[derive(Debug)]
pub struct FailingInput;

impl AnalogInput for FailingInput {
    fn read(&mut self, channel: u8) -> Result<i32, InterlockError> {
        Err(InterlockError::AdcRead {
            channel,
            reason: "bus error".to_string(),
        })
    }
}

/// Fails the listed read calls, counted across all channels, without consuming a frame.
#[derive(Debug)]
pub struct FlakyInput {
    inner: ScriptedInput,
    failing: Vec<usize>,
    reads: usize,
}

impl FlakyInput {
    pub fn new(inner: ScriptedInput, failing: &[usize]) -> Self {
        Self {
            inner,
            failing: failing.to_vec(),
            reads: 0,
        }
    }
}

impl AnalogInput for FlakyInput {
    fn read(&mut self, channel: u8) -> Result<i32, InterlockError> {
        let call = self.reads;
        self.reads += 1;
        if self.failing.contains(&call) {
            return Err(InterlockError::AdcRead {
                channel,
                reason: "scripted failure".to_string(),
            });
        }
        self.inner.read(channel)
    }
}

#[derive(Debug, Default)]
pub struct RecordingPin {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl RecordingPin {
    pub fn levels(&self) -> Arc<Mutex<Vec<Level>>> {
        Arc::clone(&self.levels)
    }
}

impl DigitalOutput for RecordingPin {
    fn set(&mut self, level: Level) {
        self.levels.lock().push(level);
    }
}

/// Echo edges as `(level, kernel timestamp)`. Stale edges sit in front and
/// go away on `discard_pending`; an exhausted script behaves like a timeout.
#[derive(Debug, Default)]
pub struct ScriptedEcho {
    edges: VecDeque<(Level, Duration)>,
    stale: usize,
}

impl ScriptedEcho {
    pub fn pulse(rise_at: Duration, width: Duration) -> Self {
        Self {
            edges: VecDeque::from([(Level::High, rise_at), (Level::Low, rise_at + width)]),
            stale: 0,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn stuck_high() -> Self {
        Self {
            edges: VecDeque::from([(Level::High, Duration::ZERO)]),
            stale: 0,
        }
    }

    pub fn with_stale(mut self, edges: &[(Level, Duration)]) -> Self {
        for &edge in edges.iter().rev() {
            self.edges.push_front(edge);
        }
        self.stale += edges.len();
        self
    }
}

impl DigitalInput for ScriptedEcho {
    fn discard_pending(&mut self) -> Result<(), InterlockError> {
        for _ in 0..self.stale {
            self.edges.pop_front();
        }
        self.stale = 0;
        Ok(())
    }

    fn wait_for_edge(
        &mut self,
        level: Level,
        _timeout: Duration,
    ) -> Result<Option<Duration>, InterlockError> {
        while let Some((edge, at)) = self.edges.pop_front() {
            if edge == level {
                return Ok(Some(at));
            }
        }
        Ok(None)
    }
}

#[derive(Debug)]
pub struct ScriptedDistances {
    values: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
    reads: Mutex<usize>,
}

impl ScriptedDistances {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values: Mutex::new(values.into()),
            last: Mutex::new(0.0),
            reads: Mutex::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock()
    }
}

impl DistanceSource for ScriptedDistances {
    fn total_distance(&self) -> f64 {
        *self.reads.lock() += 1;
        let mut last = self.last.lock();
        if let Some(value) = self.values.lock().pop_front() {
            *last = value;
        }
        *last
    }
}

#[derive(Debug, Default)]
pub struct RecordingRelay {
    commands: Arc<Mutex<Vec<RelayCommand>>>,
}

impl RecordingRelay {
    pub fn commands(&self) -> Arc<Mutex<Vec<RelayCommand>>> {
        Arc::clone(&self.commands)
    }
}

impl ActuatorGate for RecordingRelay {
    fn set(&mut self, command: RelayCommand) {
        self.commands.lock().push(command);
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn lines(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.lines)
    }
}

impl TextDisplay for RecordingDisplay {
    fn clear(&mut self) -> Result<(), InterlockError> {
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), InterlockError> {
        self.lines.lock().push(text.to_string());
        Ok(())
    }
}
