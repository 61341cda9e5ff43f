use rand::Rng;
use std::time::SystemTime;

/// Fixed drill length. The baseline is seconds per correct entry over the
/// whole window, so a longer window just smooths the estimate.
pub const WARMUP_SECS: u64 = 15;

const TARGET_MIN: i64 = 1;
const TARGET_MAX: i64 = 20;

/// Pre-round digit-entry drill. The player copies random small numbers as
/// fast as possible; the result is the typing-speed baseline subtracted
/// from per-problem answer times at the end of a round.
#[derive(Debug)]
pub struct TypingWarmup {
    started_at: SystemTime,
    target: i64,
    input: String,
    correct: u32,
}

impl TypingWarmup {
    pub fn new<R: Rng>(rng: &mut R, now: SystemTime) -> Self {
        Self {
            started_at: now,
            target: rng.gen_range(TARGET_MIN..=TARGET_MAX),
            input: String::new(),
            correct: 0,
        }
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    /// Feed one typed character. Matching the target scores it, clears the
    /// buffer and rolls the next number.
    pub fn push_digit<R: Rng>(&mut self, rng: &mut R, c: char) {
        if !c.is_ascii_digit() || self.input.len() >= 3 {
            return;
        }
        self.input.push(c);
        if self.input.parse::<i64>() == Ok(self.target) {
            self.correct += 1;
            self.input.clear();
            self.target = rng.gen_range(TARGET_MIN..=TARGET_MAX);
        }
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn seconds_left(&self, now: SystemTime) -> u64 {
        let elapsed = now
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs();
        WARMUP_SECS.saturating_sub(elapsed)
    }

    pub fn is_finished(&self, now: SystemTime) -> bool {
        self.seconds_left(now) == 0
    }

    /// Seconds per correct entry, 0.0 when nothing was entered correctly.
    pub fn typing_speed(&self) -> f64 {
        if self.correct == 0 {
            0.0
        } else {
            WARMUP_SECS as f64 / self.correct as f64
        }
    }
}
