use crate::corpus::Difficulty;
use crate::scorer::{self, CharFeedback, LiveStats, TIME_LIMIT_SECS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Source of time for a session
pub trait Clock {
    /// Monotonic instant used for elapsed time.
    fn now(&self) -> Instant;
    /// Wall-clock time stamped onto results.
    fn wall(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn wall(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.offset.get())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Finished,
}

/// Handle for the periodic tick of one running session.
///
/// Tags one armed timer: the owning session's nonce plus an arm count, so a
/// handle kept past a reset, a finish or a replaced session never matches again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    session: u64,
    epoch: u64,
}

impl TimerHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Outcome of a completed test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub wpm: u32,
    pub accuracy: u8,
    #[serde(rename = "time")]
    pub time_used: f64,
    #[serde(deserialize_with = "lenient_difficulty")]
    pub difficulty: Difficulty,
}

fn lenient_difficulty<'de, D: Deserializer<'de>>(de: D) -> Result<Difficulty, D::Error> {
    let raw = String::deserialize(de)?;
    Ok(Difficulty::parse_or_default(&raw))
}

/// One typing test: a target paragraph and what has been typed against it
#[derive(Debug)]
pub struct Session<C: Clock = SystemClock> {
    target: String,
    typed: String,
    difficulty: Difficulty,
    state: SessionState,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    timer: Option<TimerHandle>,
    nonce: u64,
    arms: u64,
    seconds_remaining: f64,
    clock: C,
}

impl<C: Clock> Session<C> {
    pub fn new(target: impl Into<String>, difficulty: Difficulty, clock: C) -> Self {
        Self {
            target: target.into(),
            typed: String::new(),
            difficulty,
            state: SessionState::Idle,
            started_at: None,
            finished_at: None,
            timer: None,
            nonce: rand::random(),
            arms: 0,
            seconds_remaining: TIME_LIMIT_SECS,
            clock,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Live tick handle, present only while running.
    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Seconds since the first keystroke, frozen once finished.
    pub fn elapsed_secs(&self) -> Option<f64> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(|| self.clock.now());
        Some(end.saturating_duration_since(start).as_secs_f64())
    }

    pub fn time_left(&self) -> f64 {
        match self.elapsed_secs() {
            Some(elapsed) => (TIME_LIMIT_SECS - elapsed).max(0.0),
            None => TIME_LIMIT_SECS,
        }
    }

    /// Value last computed by `tick`, for display between ticks.
    pub fn seconds_remaining(&self) -> f64 {
        self.seconds_remaining
    }

    pub fn feedback(&self) -> Vec<CharFeedback> {
        scorer::char_feedback(&self.target, &self.typed)
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats::compute(&self.target, &self.typed)
    }

    fn start(&mut self) {
        self.arms += 1;
        let handle = TimerHandle {
            session: self.nonce,
            epoch: self.arms,
        };
        self.started_at = Some(self.clock.now());
        self.timer = Some(handle);
        self.state = SessionState::Running;
        info!(
            difficulty = %self.difficulty,
            epoch = handle.epoch(),
            "typing session started"
        );
    }

    fn timed_out(&self) -> bool {
        self.time_left() <= 0.0
    }

    /// Replace the typed text with the current input value.
    ///
    /// Returns the result when this input completes the test.
    pub fn record_input(&mut self, value: &str) -> Option<TestResult> {
        match self.state {
            SessionState::Finished => {
                debug!("input ignored, session already finished");
                return None;
            }
            SessionState::Idle => self.start(),
            SessionState::Running => {
                if self.timed_out() {
                    return self.finish();
                }
            }
        }

        if self.typed != value {
            self.typed.clear();
            self.typed.push_str(value);
        }

        if self.typed.chars().count() >= self.target.chars().count() {
            debug!("typed text covers the target");
            return self.finish();
        }
        None
    }

    /// Explicit confirm; finishes only when the trimmed texts are equal.
    pub fn submit(&mut self) -> Option<TestResult> {
        if self.state != SessionState::Running {
            return None;
        }
        if self.typed.trim() == self.target.trim() {
            return self.finish();
        }
        debug!("submit ignored, typed text does not match the target");
        None
    }

    /// Recompute the remaining time from the clock.
    ///
    /// Stale or cancelled handles are ignored, so only the timer armed for
    /// the current run can end it.
    pub fn tick(&mut self, handle: TimerHandle) -> Option<TestResult> {
        if self.timer != Some(handle) {
            trace!(epoch = handle.epoch(), "stale tick ignored");
            return None;
        }
        self.seconds_remaining = self.time_left();
        if self.seconds_remaining <= 0.0 {
            info!("time limit reached");
            return self.finish();
        }
        None
    }

    /// Freeze the session and score it. Yields a result exactly once.
    pub fn finish(&mut self) -> Option<TestResult> {
        if self.state == SessionState::Finished {
            return None;
        }
        let now = self.clock.now();
        if self.started_at.is_some() {
            self.finished_at = Some(now);
        }
        self.timer = None;
        self.state = SessionState::Finished;
        self.seconds_remaining = self.time_left();

        let elapsed = self.elapsed_secs();
        let result = TestResult {
            timestamp: self.clock.wall(),
            wpm: scorer::wpm(&self.typed, elapsed),
            accuracy: scorer::accuracy(&self.target, &self.typed),
            time_used: scorer::time_used(elapsed),
            difficulty: self.difficulty,
        };
        info!(
            wpm = result.wpm,
            accuracy = result.accuracy,
            time_used = result.time_used,
            "typing session finished"
        );
        Some(result)
    }

    /// Abandon the current attempt and go back to idle on the same target.
    /// Finished sessions stay finished.
    pub fn reset(&mut self) -> bool {
        if self.state == SessionState::Finished {
            return false;
        }
        self.typed.clear();
        self.started_at = None;
        self.finished_at = None;
        self.timer = None;
        self.seconds_remaining = TIME_LIMIT_SECS;
        self.state = SessionState::Idle;
        debug!("typing session reset");
        true
    }
}
