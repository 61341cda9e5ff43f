use chrono::Local;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::metrics::{round_metrics, RoundMetrics};
use crate::problem::{self, Operation, Problem, ProblemRange};
use crate::scores::{Round, ScoreStore};
use crate::warmup::TypingWarmup;

/// Get-ready countdown before the round timer starts.
pub const COUNTDOWN_SECS: u64 = 3;
/// Learner mode: how long a problem may sit unanswered before the answer is
/// shown, and how long the shown answer is held before clearing.
pub const LEARNER_REVEAL_AFTER: Duration = Duration::from_secs(6);
pub const LEARNER_REVEAL_HOLD: Duration = Duration::from_secs(2);

const MAX_ANSWER_DIGITS: usize = 9;

const ENCOURAGEMENTS: [&str; 5] = [
    "You've got this!",
    "Keep going!",
    "Almost there, try the next one!",
    "Nice and steady.",
    "That one was tough. Onwards!",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Selection,
    WarmupCountdown,
    Warmup,
    Countdown,
    Playing,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Timeout,
    Manual,
    Error,
}

/// What happened to the round's score at the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// The store refused the row (plausibility bound). Not an error.
    Rejected,
    /// The store failed; the round itself is still shown to the player.
    Failed,
    /// No store attached, or the round did not time out.
    NotAttempted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub operation: Operation,
    pub range: ProblemRange,
    pub timer_secs: u64,
    pub allow_negatives: bool,
    pub focus_number: Option<i64>,
    pub learner_mode: bool,
    pub custom_number_pad: bool,
    pub typing_speed_adjustment: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            operation: Operation::Addition,
            range: ProblemRange::new(1, 10, 1, 10),
            timer_secs: 60,
            allow_negatives: false,
            focus_number: None,
            learner_mode: false,
            custom_number_pad: false,
            typing_speed_adjustment: false,
        }
    }
}

/// Snapshot taken at the moment the round ends. Score and typing speed are
/// captured together so nothing arriving later can skew the metrics.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub score: u32,
    pub metrics: RoundMetrics,
    pub save_status: SaveStatus,
    pub is_high_score: bool,
}

/// One practice session. Owns every piece of round-mutable state; the UI and
/// stores only read it or call the methods below.
#[derive(Debug)]
pub struct Game {
    pub settings: GameSettings,
    pub phase: Phase,
    pub score: u32,
    pub user_answer: String,
    pub negative: bool,
    pub current_problem: Option<Problem>,
    pub typing_speed: Option<f64>,
    pub warmup: Option<TypingWarmup>,
    pub outcome: Option<RoundOutcome>,
    pub encouragement: Option<&'static str>,
    started_at: Option<SystemTime>,
    countdown_started_at: Option<SystemTime>,
    problem_shown_at: Option<SystemTime>,
    reveal_since: Option<SystemTime>,
    ending: bool,
    scores: Option<Box<dyn ScoreStore>>,
    rng: StdRng,
}

impl Game {
    pub fn new(settings: GameSettings, scores: Option<Box<dyn ScoreStore>>) -> Self {
        Self::with_rng(settings, scores, StdRng::from_entropy())
    }

    pub fn with_rng(
        settings: GameSettings,
        scores: Option<Box<dyn ScoreStore>>,
        rng: StdRng,
    ) -> Self {
        Self {
            settings,
            phase: Phase::Selection,
            score: 0,
            user_answer: String::new(),
            negative: false,
            current_problem: None,
            typing_speed: None,
            warmup: None,
            outcome: None,
            encouragement: None,
            started_at: None,
            countdown_started_at: None,
            problem_shown_at: None,
            reveal_since: None,
            ending: false,
            scores,
            rng,
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn is_ending(&self) -> bool {
        self.ending
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Settings are frozen from here until the round ends.
    pub fn start_round(&mut self, now: SystemTime) {
        self.reset_round_state();
        self.countdown_started_at = Some(now);
        self.phase = if self.settings.typing_speed_adjustment {
            Phase::WarmupCountdown
        } else {
            Phase::Countdown
        };
    }

    /// Restore a round that was interrupted mid-play. The original start
    /// timestamp is kept so the remaining time is recomputed, not reset.
    /// Returns false when the saved round has already run out.
    pub fn resume_round(
        &mut self,
        started_at: SystemTime,
        score: u32,
        typing_speed: Option<f64>,
        now: SystemTime,
    ) -> bool {
        let deadline = started_at + Duration::from_secs(self.settings.timer_secs);
        if now >= deadline {
            return false;
        }
        self.reset_round_state();
        self.started_at = Some(started_at);
        self.score = score;
        self.typing_speed = typing_speed;
        self.phase = Phase::Playing;
        self.next_problem(now);
        true
    }

    fn reset_round_state(&mut self) {
        self.score = 0;
        self.user_answer.clear();
        self.negative = false;
        self.current_problem = None;
        self.warmup = None;
        self.outcome = None;
        self.encouragement = None;
        self.started_at = None;
        self.countdown_started_at = None;
        self.problem_shown_at = None;
        self.reveal_since = None;
        self.ending = false;
    }

    /// Remaining round seconds, recomputed from the start timestamp on every
    /// call. Ticks lost to a suspended terminal cannot skew this.
    pub fn time_left(&self, now: SystemTime) -> u64 {
        match self.started_at {
            Some(started) => {
                let elapsed = now.duration_since(started).unwrap_or_default().as_secs();
                self.settings.timer_secs.saturating_sub(elapsed)
            }
            None => self.settings.timer_secs,
        }
    }

    pub fn countdown_left(&self, now: SystemTime) -> u64 {
        match self.countdown_started_at {
            Some(started) => {
                let elapsed = now.duration_since(started).unwrap_or_default().as_secs();
                COUNTDOWN_SECS.saturating_sub(elapsed)
            }
            None => COUNTDOWN_SECS,
        }
    }

    /// Advance time-driven transitions. Called once per tick; the amount of
    /// real time between ticks does not matter.
    pub fn on_tick(&mut self, now: SystemTime) {
        match self.phase {
            Phase::WarmupCountdown => {
                if self.countdown_left(now) == 0 {
                    self.warmup = Some(TypingWarmup::new(&mut self.rng, now));
                    self.phase = Phase::Warmup;
                }
            }
            Phase::Warmup => {
                if let Some(warmup) = &self.warmup {
                    if warmup.is_finished(now) {
                        self.typing_speed = Some(warmup.typing_speed());
                        self.warmup = None;
                        self.countdown_started_at = Some(now);
                        self.phase = Phase::Countdown;
                    }
                }
            }
            Phase::Countdown => {
                if self.countdown_left(now) == 0 {
                    self.started_at = Some(now);
                    self.phase = Phase::Playing;
                    self.next_problem(now);
                }
            }
            Phase::Playing => {
                self.learner_tick(now);
                if self.time_left(now) == 0 {
                    self.end_game(EndReason::Timeout, now);
                }
            }
            Phase::Selection | Phase::Ended => {}
        }
    }

    pub fn next_problem(&mut self, now: SystemTime) {
        let previous = self.current_problem;
        self.current_problem = Some(problem::generate(
            &mut self.rng,
            self.settings.operation,
            &self.settings.range,
            self.settings.allow_negatives,
            self.settings.focus_number,
            previous.as_ref(),
        ));
        self.problem_shown_at = Some(now);
        self.reveal_since = None;
    }

    /// True while learner mode is holding the revealed answer on screen.
    pub fn is_revealing(&self) -> bool {
        self.reveal_since.is_some()
    }

    fn learner_tick(&mut self, now: SystemTime) {
        if !self.settings.learner_mode || self.ending {
            return;
        }
        match self.reveal_since {
            None => {
                let stuck = self
                    .problem_shown_at
                    .map(|shown| now.duration_since(shown).unwrap_or_default())
                    .map(|idle| idle >= LEARNER_REVEAL_AFTER)
                    .unwrap_or(false);
                if stuck {
                    if let Some(p) = self.current_problem {
                        self.user_answer = p.answer.abs().to_string();
                        self.negative = p.answer < 0;
                        self.reveal_since = Some(now);
                    }
                }
            }
            Some(since) => {
                if now.duration_since(since).unwrap_or_default() >= LEARNER_REVEAL_HOLD {
                    // The reveal never scores; the player still has to type
                    // the answer themselves once the buffer clears.
                    self.user_answer.clear();
                    self.negative = false;
                    self.reveal_since = None;
                    self.problem_shown_at = Some(now);
                    self.encouragement = ENCOURAGEMENTS.choose(&mut self.rng).copied();
                }
            }
        }
    }

    pub fn push_digit(&mut self, c: char, now: SystemTime) {
        if !c.is_ascii_digit() {
            return;
        }
        match self.phase {
            Phase::Warmup => {
                if let Some(warmup) = &mut self.warmup {
                    warmup.push_digit(&mut self.rng, c);
                }
            }
            Phase::Playing => {
                if self.ending || self.is_revealing() {
                    return;
                }
                if self.user_answer.len() < MAX_ANSWER_DIGITS {
                    self.user_answer.push(c);
                    self.try_score(now);
                }
            }
            _ => {}
        }
    }

    pub fn toggle_negative(&mut self, now: SystemTime) {
        if self.phase != Phase::Playing || self.ending || self.is_revealing() {
            return;
        }
        self.negative = !self.negative;
        self.try_score(now);
    }

    pub fn backspace(&mut self) {
        match self.phase {
            Phase::Warmup => {
                if let Some(warmup) = &mut self.warmup {
                    warmup.backspace();
                }
            }
            Phase::Playing => {
                if !self.ending && !self.is_revealing() {
                    self.user_answer.pop();
                }
            }
            _ => {}
        }
    }

    /// Numeric value of the input buffer, sign applied. Comparison against
    /// the answer is numeric, never textual.
    pub fn parsed_answer(&self) -> Option<i64> {
        if self.user_answer.is_empty() {
            return None;
        }
        let value = self.user_answer.parse::<i64>().ok()?;
        Some(if self.negative { -value } else { value })
    }

    fn try_score(&mut self, now: SystemTime) {
        if self.ending || self.is_revealing() {
            return;
        }
        let (Some(problem), Some(value)) = (self.current_problem, self.parsed_answer()) else {
            return;
        };
        if value == problem.answer {
            self.score += 1;
            self.user_answer.clear();
            self.negative = false;
            self.encouragement = None;
            self.next_problem(now);
        }
    }

    /// No-op once the round has begun ending; a keystroke racing the final
    /// tick must not be able to bump the persisted score.
    pub fn increment_score(&mut self) {
        if self.ending {
            return;
        }
        self.score += 1;
    }

    pub fn reset_score(&mut self) {
        if self.ending {
            return;
        }
        self.score = 0;
    }

    /// Idempotent; only the first call per round does anything. The timeout
    /// path is the only one that touches the score store.
    pub fn end_game(&mut self, reason: EndReason, now: SystemTime) {
        if self.ending {
            return;
        }
        self.ending = true;
        self.reveal_since = None;
        self.problem_shown_at = None;

        if reason == EndReason::Manual {
            // Restart mid-round: the score is discarded, never persisted.
            self.reset_round_state();
            self.phase = Phase::Selection;
            return;
        }

        let score = self.score;
        let typing_speed = self.typing_speed;
        let metrics = round_metrics(score, self.settings.timer_secs, typing_speed);

        let mut save_status = SaveStatus::NotAttempted;
        let mut is_high_score = false;
        if reason == EndReason::Timeout {
            if let Some(store) = self.scores.as_mut() {
                is_high_score = store
                    .is_high_score(score, self.settings.operation, &self.settings.range)
                    .unwrap_or(false);
                let round = Round {
                    score,
                    operation: self.settings.operation,
                    range: self.settings.range,
                    timer_secs: self.settings.timer_secs,
                    focus_number: self.settings.focus_number,
                    allow_negatives: self.settings.allow_negatives,
                    typing_speed,
                    metrics,
                    played_at: chrono::DateTime::<Local>::from(now),
                };
                save_status = match store.save_score(&round) {
                    Ok(true) => SaveStatus::Saved,
                    Ok(false) => SaveStatus::Rejected,
                    Err(_) => SaveStatus::Failed,
                };
            }
        }

        self.outcome = Some(RoundOutcome {
            score,
            metrics,
            save_status,
            is_high_score,
        });
        self.set_phase(Phase::Ended);
    }

    pub fn play_again(&mut self, now: SystemTime) {
        if self.phase == Phase::Ended {
            self.start_round(now);
        }
    }

    pub fn back_to_menu(&mut self) {
        if self.phase == Phase::Ended {
            self.reset_round_state();
            self.phase = Phase::Selection;
        }
    }

    pub fn best_so_far(&self) -> Option<(u32, chrono::DateTime<Local>)> {
        self.scores.as_ref().and_then(|store| {
            store
                .best_round(self.settings.operation, &self.settings.range)
                .ok()
                .flatten()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::MemoryScoreStore;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn game(settings: GameSettings) -> Game {
        Game::with_rng(settings, None, StdRng::seed_from_u64(42))
    }

    fn playing_game(settings: GameSettings) -> (Game, SystemTime) {
        let mut g = game(settings);
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        assert_eq!(g.phase, Phase::Playing);
        (g, at(COUNTDOWN_SECS))
    }

    fn answer_current(g: &mut Game, now: SystemTime) {
        let answer = g.current_problem.unwrap().answer;
        if answer < 0 {
            g.toggle_negative(now);
        }
        for c in answer.abs().to_string().chars() {
            g.push_digit(c, now);
        }
    }

    #[test]
    fn starts_in_selection() {
        let g = game(GameSettings::default());
        assert_eq!(g.phase, Phase::Selection);
        assert_eq!(g.score, 0);
        assert!(g.current_problem.is_none());
    }

    #[test]
    fn start_goes_through_countdown() {
        let mut g = game(GameSettings::default());
        g.start_round(at(0));
        assert_eq!(g.phase, Phase::Countdown);
        assert_eq!(g.countdown_left(at(0)), COUNTDOWN_SECS);

        g.on_tick(at(1));
        assert_eq!(g.phase, Phase::Countdown);

        g.on_tick(at(COUNTDOWN_SECS));
        assert_eq!(g.phase, Phase::Playing);
        assert!(g.current_problem.is_some());
        assert_eq!(g.time_left(at(COUNTDOWN_SECS)), 60);
    }

    #[test]
    fn typing_adjustment_routes_through_warmup() {
        let settings = GameSettings {
            typing_speed_adjustment: true,
            ..GameSettings::default()
        };
        let mut g = game(settings);
        g.start_round(at(0));
        assert_eq!(g.phase, Phase::WarmupCountdown);

        g.on_tick(at(COUNTDOWN_SECS));
        assert_eq!(g.phase, Phase::Warmup);
        assert!(g.warmup.is_some());

        // Answer three warmup numbers, then let the drill expire.
        let mut now = at(COUNTDOWN_SECS);
        for _ in 0..3 {
            let target = g.warmup.as_ref().unwrap().target();
            for c in target.to_string().chars() {
                g.push_digit(c, now);
            }
            now += Duration::from_secs(1);
        }
        let warmup_end = at(COUNTDOWN_SECS + crate::warmup::WARMUP_SECS);
        g.on_tick(warmup_end);
        assert_eq!(g.phase, Phase::Countdown);
        assert_eq!(
            g.typing_speed,
            Some(crate::warmup::WARMUP_SECS as f64 / 3.0)
        );

        g.on_tick(warmup_end + Duration::from_secs(COUNTDOWN_SECS));
        assert_eq!(g.phase, Phase::Playing);
    }

    #[test]
    fn correct_answer_scores_and_advances() {
        let (mut g, now) = playing_game(GameSettings::default());
        let first = g.current_problem.unwrap();

        answer_current(&mut g, now);

        assert_eq!(g.score, 1);
        assert!(g.user_answer.is_empty());
        assert!(!g.current_problem.unwrap().same_face(&first));
    }

    #[test]
    fn wrong_answer_does_not_score() {
        let (mut g, now) = playing_game(GameSettings::default());
        let answer = g.current_problem.unwrap().answer;
        let wrong = answer + 1;
        assert!(wrong >= 0, "seeded problem keeps this test simple");

        for c in wrong.to_string().chars() {
            g.push_digit(c, now);
        }
        assert_eq!(g.score, 0);
        assert!(!g.user_answer.is_empty());
    }

    #[test]
    fn comparison_is_numeric_not_textual() {
        let (mut g, now) = playing_game(GameSettings::default());
        let answer = g.current_problem.unwrap().answer;
        assert!(answer >= 0);

        // Leading zero: "042" parses to the same number and must score.
        g.push_digit('0', now);
        for c in answer.to_string().chars() {
            g.push_digit(c, now);
        }
        assert_eq!(g.score, 1);
    }

    #[test]
    fn negative_toggle_applies_sign() {
        let settings = GameSettings {
            operation: Operation::Subtraction,
            allow_negatives: true,
            range: ProblemRange::new(1, 5, 1, 5),
            ..GameSettings::default()
        };
        let (mut g, mut now) = playing_game(settings);

        // Walk until a problem with a negative answer shows up.
        for _ in 0..100 {
            if g.current_problem.unwrap().answer < 0 {
                break;
            }
            answer_current(&mut g, now);
            now += Duration::from_millis(100);
        }
        let p = g.current_problem.unwrap();
        assert!(p.answer < 0, "range guarantees negatives appear");

        let before = g.score;
        for c in p.answer.abs().to_string().chars() {
            g.push_digit(c, now);
        }
        assert_eq!(g.score, before, "unsigned digits alone must not score");
        g.toggle_negative(now);
        assert_eq!(g.score, before + 1);
    }

    #[test]
    fn time_left_is_recomputed_from_timestamp() {
        let (g, start) = playing_game(GameSettings::default());

        // A multi-second jump with no intervening ticks: the value reflects
        // wall-clock elapsed time, not how many ticks we observed.
        assert_eq!(g.time_left(start + Duration::from_secs(17)), 43);
        assert_eq!(g.time_left(start + Duration::from_millis(500)), 60);
        assert_eq!(g.time_left(start + Duration::from_secs(60)), 0);
        assert_eq!(g.time_left(start + Duration::from_secs(600)), 0);
    }

    #[test]
    fn round_ends_when_timer_runs_out() {
        let (mut g, start) = playing_game(GameSettings::default());
        g.on_tick(start + Duration::from_secs(59));
        assert_eq!(g.phase, Phase::Playing);

        g.on_tick(start + Duration::from_secs(60));
        assert_eq!(g.phase, Phase::Ended);
        assert!(g.outcome.is_some());
    }

    #[test]
    fn score_increment_is_dropped_after_end() {
        let (mut g, start) = playing_game(GameSettings::default());
        answer_current(&mut g, start);
        assert_eq!(g.score, 1);

        g.end_game(EndReason::Timeout, start + Duration::from_secs(60));
        let snapshot = g.outcome.as_ref().unwrap().score;

        // A keystroke in flight when the timer fired.
        g.increment_score();
        answer_current(&mut g, start + Duration::from_secs(61));

        assert_eq!(g.score, snapshot);
        assert_eq!(g.outcome.as_ref().unwrap().score, snapshot);
    }

    #[test]
    fn end_game_is_idempotent() {
        let store = MemoryScoreStore::default();
        let mut g = Game::with_rng(
            GameSettings::default(),
            Some(Box::new(store)),
            StdRng::seed_from_u64(1),
        );
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));

        g.end_game(EndReason::Timeout, at(63));
        g.end_game(EndReason::Timeout, at(64));
        assert_eq!(g.phase, Phase::Ended);
        // One round persisted, not two: the second call was a no-op.
        assert_eq!(g.outcome.as_ref().unwrap().save_status, SaveStatus::Saved);
    }

    #[test]
    fn manual_restart_discards_the_round() {
        let store = MemoryScoreStore::default();
        let mut g = Game::with_rng(
            GameSettings::default(),
            Some(Box::new(store)),
            StdRng::seed_from_u64(1),
        );
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        answer_current(&mut g, at(4));

        g.end_game(EndReason::Manual, at(5));
        assert_eq!(g.phase, Phase::Selection);
        assert_eq!(g.score, 0);
        assert!(g.outcome.is_none());
    }

    #[test]
    fn timeout_outcome_carries_metrics() {
        let (mut g, start) = playing_game(GameSettings::default());
        let mut now = start;
        for _ in 0..6 {
            answer_current(&mut g, now);
            now += Duration::from_secs(1);
        }
        g.typing_speed = Some(2.0);

        g.on_tick(start + Duration::from_secs(60));
        let outcome = g.outcome.as_ref().unwrap();
        assert_eq!(outcome.score, 6);
        assert_eq!(outcome.metrics.answer_time_per_problem, 10.0);
        assert_eq!(outcome.metrics.math_time_per_problem, 8.0);
    }

    #[test]
    fn save_statuses_are_surfaced() {
        // Transient store failure.
        let store = MemoryScoreStore {
            fail_next_save: true,
            ..Default::default()
        };
        let mut g = Game::with_rng(
            GameSettings::default(),
            Some(Box::new(store)),
            StdRng::seed_from_u64(1),
        );
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        g.end_game(EndReason::Timeout, at(63));
        assert_eq!(g.outcome.as_ref().unwrap().save_status, SaveStatus::Failed);
        assert_eq!(g.phase, Phase::Ended);

        // No store attached.
        let mut g = game(GameSettings::default());
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        g.end_game(EndReason::Timeout, at(63));
        assert_eq!(
            g.outcome.as_ref().unwrap().save_status,
            SaveStatus::NotAttempted
        );
    }

    #[test]
    fn first_round_on_empty_history_is_a_high_score() {
        let store = MemoryScoreStore::default();
        let mut g = Game::with_rng(
            GameSettings::default(),
            Some(Box::new(store)),
            StdRng::seed_from_u64(1),
        );
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        answer_current(&mut g, at(4));
        g.end_game(EndReason::Timeout, at(63));

        let outcome = g.outcome.as_ref().unwrap();
        assert!(outcome.is_high_score);
        assert_eq!(outcome.save_status, SaveStatus::Saved);
    }

    #[test]
    fn error_end_does_not_persist() {
        let store = MemoryScoreStore::default();
        let mut g = Game::with_rng(
            GameSettings::default(),
            Some(Box::new(store)),
            StdRng::seed_from_u64(1),
        );
        g.start_round(at(0));
        g.on_tick(at(COUNTDOWN_SECS));
        answer_current(&mut g, at(4));
        g.end_game(EndReason::Error, at(5));

        assert_eq!(g.phase, Phase::Ended);
        assert_eq!(
            g.outcome.as_ref().unwrap().save_status,
            SaveStatus::NotAttempted
        );
    }

    #[test]
    fn learner_mode_reveals_then_clears() {
        let settings = GameSettings {
            learner_mode: true,
            ..GameSettings::default()
        };
        let (mut g, start) = playing_game(settings);
        let answer = g.current_problem.unwrap().answer;

        // Unanswered for the reveal window: answer appears in the buffer.
        let reveal_time = start + LEARNER_REVEAL_AFTER;
        g.on_tick(reveal_time);
        assert!(g.is_revealing());
        assert_eq!(g.parsed_answer(), Some(answer));
        assert_eq!(g.score, 0, "the reveal itself never scores");

        // Input is ignored while the reveal is held.
        g.push_digit('1', reveal_time);
        assert_eq!(g.parsed_answer(), Some(answer));

        // Hold expires: buffer clears, encouragement shows, clock restarts.
        let clear_time = reveal_time + LEARNER_REVEAL_HOLD;
        g.on_tick(clear_time);
        assert!(!g.is_revealing());
        assert!(g.user_answer.is_empty());
        assert!(g.encouragement.is_some());

        // Typing the answer manually still earns the point.
        answer_current(&mut g, clear_time);
        assert_eq!(g.score, 1);
        assert!(g.encouragement.is_none());
    }

    #[test]
    fn resume_restores_a_live_round() {
        let mut g = game(GameSettings::default());
        let resumed = g.resume_round(at(100), 7, Some(1.5), at(130));
        assert!(resumed);
        assert_eq!(g.phase, Phase::Playing);
        assert_eq!(g.score, 7);
        assert_eq!(g.time_left(at(130)), 30);
        assert!(g.current_problem.is_some());
    }

    #[test]
    fn resume_rejects_an_expired_round() {
        let mut g = game(GameSettings::default());
        let resumed = g.resume_round(at(100), 7, None, at(161));
        assert!(!resumed);
        assert_eq!(g.phase, Phase::Selection);
    }

    #[test]
    fn play_again_resets_the_score() {
        let (mut g, start) = playing_game(GameSettings::default());
        answer_current(&mut g, start);
        g.on_tick(start + Duration::from_secs(60));
        assert_eq!(g.phase, Phase::Ended);

        g.play_again(start + Duration::from_secs(65));
        assert_eq!(g.phase, Phase::Countdown);
        assert_eq!(g.score, 0);
        assert!(g.outcome.is_none());
        assert!(!g.is_ending());
    }

    #[test]
    fn back_to_menu_returns_to_selection() {
        let (mut g, start) = playing_game(GameSettings::default());
        g.on_tick(start + Duration::from_secs(60));
        g.back_to_menu();
        assert_eq!(g.phase, Phase::Selection);
        assert_eq!(g.score, 0);
        assert!(g.outcome.is_none());
    }
}
