use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::metrics::RoundMetrics;
use crate::problem::{Operation, ProblemRange};

/// Server-style plausibility bound: two answers per second is the ceiling
/// for a human round. Rows above it are rejected, not stored.
pub fn theoretical_max_score(timer_secs: u64) -> u32 {
    (timer_secs * 2) as u32
}

/// One completed round, as handed to the store at game end.
#[derive(Debug, Clone)]
pub struct Round {
    pub score: u32,
    pub operation: Operation,
    pub range: ProblemRange,
    pub timer_secs: u64,
    pub focus_number: Option<i64>,
    pub allow_negatives: bool,
    pub typing_speed: Option<f64>,
    pub metrics: RoundMetrics,
    pub played_at: DateTime<Local>,
}

/// Persistence surface the game calls exactly once per timed-out round.
/// `Ok(false)` means the round was rejected (implausible score); errors are
/// transient store failures. Neither aborts the session.
pub trait ScoreStore: std::fmt::Debug {
    fn save_score(&mut self, round: &Round) -> Result<bool>;

    /// True when `score` beats every stored round with the same operation
    /// and exact range, vacuously true with no matching history.
    fn is_high_score(&self, score: u32, operation: Operation, range: &ProblemRange)
        -> Result<bool>;

    /// Best stored score for this operation/range and when it was played.
    fn best_round(
        &self,
        operation: Operation,
        range: &ProblemRange,
    ) -> Result<Option<(u32, DateTime<Local>)>>;
}

fn op_key(operation: Operation) -> String {
    operation.to_string().to_lowercase()
}

/// Sqlite-backed history plus an append-only CSV results log.
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
    log_path: Option<PathBuf>,
}

impl SqliteScoreStore {
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("mathdash_scores.db"));
        Self::with_paths(db_path, AppDirs::results_log_path())
    }

    pub fn with_paths<P: AsRef<Path>>(db_path: P, log_path: Option<PathBuf>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS rounds (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                score INTEGER NOT NULL,
                operation TEXT NOT NULL,
                min1 INTEGER NOT NULL,
                max1 INTEGER NOT NULL,
                min2 INTEGER NOT NULL,
                max2 INTEGER NOT NULL,
                timer_secs INTEGER NOT NULL,
                focus_number INTEGER,
                allow_negatives BOOLEAN NOT NULL,
                typing_speed REAL,
                answer_time REAL NOT NULL,
                math_time REAL NOT NULL,
                played_at TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rounds_drill
             ON rounds(operation, min1, max1, min2, max2)",
            [],
        )?;

        Ok(SqliteScoreStore {
            conn,
            log_path,
        })
    }

    /// Append one line to the CSV results log, emitting a header for a fresh
    /// file. Log failures are ignored; the log is a convenience export.
    fn log_round(&self, round: &Round) -> csv::Result<()> {
        let Some(ref log_path) = self.log_path else {
            return Ok(());
        };
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !log_path.exists();
        let file = OpenOptions::new().append(true).create(true).open(log_path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            wtr.write_record([
                "date",
                "operation",
                "range",
                "timer_secs",
                "score",
                "answer_time",
                "math_time",
            ])?;
        }
        wtr.write_record([
            round.played_at.format("%c").to_string(),
            op_key(round.operation),
            format!(
                "{}-{}:{}-{}",
                round.range.min1, round.range.max1, round.range.min2, round.range.max2
            ),
            round.timer_secs.to_string(),
            round.score.to_string(),
            format!("{:.2}", round.metrics.answer_time_per_problem),
            format!("{:.2}", round.metrics.math_time_per_problem),
        ])?;
        wtr.flush()?;
        Ok(())
    }
}

impl ScoreStore for SqliteScoreStore {
    fn save_score(&mut self, round: &Round) -> Result<bool> {
        let _ = self.log_round(round);

        if round.score > theoretical_max_score(round.timer_secs) {
            return Ok(false);
        }

        self.conn.execute(
            r#"
            INSERT INTO rounds (
                score, operation, min1, max1, min2, max2, timer_secs,
                focus_number, allow_negatives, typing_speed,
                answer_time, math_time, played_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                round.score,
                op_key(round.operation),
                round.range.min1,
                round.range.max1,
                round.range.min2,
                round.range.max2,
                round.timer_secs,
                round.focus_number,
                round.allow_negatives,
                round.typing_speed,
                round.metrics.answer_time_per_problem,
                round.metrics.math_time_per_problem,
                round.played_at.to_rfc3339(),
            ],
        )?;
        Ok(true)
    }

    fn is_high_score(
        &self,
        score: u32,
        operation: Operation,
        range: &ProblemRange,
    ) -> Result<bool> {
        let best: Option<u32> = self
            .conn
            .query_row(
                "SELECT MAX(score) FROM rounds
                 WHERE operation = ?1 AND min1 = ?2 AND max1 = ?3 AND min2 = ?4 AND max2 = ?5",
                params![op_key(operation), range.min1, range.max1, range.min2, range.max2],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        Ok(match best {
            Some(best) => score > best,
            None => true,
        })
    }

    fn best_round(
        &self,
        operation: Operation,
        range: &ProblemRange,
    ) -> Result<Option<(u32, DateTime<Local>)>> {
        let row: Option<(u32, String)> = self
            .conn
            .query_row(
                "SELECT score, played_at FROM rounds
                 WHERE operation = ?1 AND min1 = ?2 AND max1 = ?3 AND min2 = ?4 AND max2 = ?5
                 ORDER BY score DESC, played_at DESC LIMIT 1",
                params![op_key(operation), range.min1, range.max1, range.min2, range.max2],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(score, played_at)| {
            DateTime::parse_from_rfc3339(&played_at)
                .ok()
                .map(|dt| (score, dt.with_timezone(&Local)))
        }))
    }
}

/// In-memory store for headless tests and the unit suite.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    pub rounds: Vec<Round>,
    pub fail_next_save: bool,
}

impl ScoreStore for MemoryScoreStore {
    fn save_score(&mut self, round: &Round) -> Result<bool> {
        if self.fail_next_save {
            self.fail_next_save = false;
            return Err(rusqlite::Error::InvalidQuery);
        }
        if round.score > theoretical_max_score(round.timer_secs) {
            return Ok(false);
        }
        self.rounds.push(round.clone());
        Ok(true)
    }

    fn is_high_score(
        &self,
        score: u32,
        operation: Operation,
        range: &ProblemRange,
    ) -> Result<bool> {
        let best = self
            .rounds
            .iter()
            .filter(|r| r.operation == operation && r.range == *range)
            .map(|r| r.score)
            .max();
        Ok(best.map_or(true, |best| score > best))
    }

    fn best_round(
        &self,
        operation: Operation,
        range: &ProblemRange,
    ) -> Result<Option<(u32, DateTime<Local>)>> {
        Ok(self
            .rounds
            .iter()
            .filter(|r| r.operation == operation && r.range == *range)
            .max_by_key(|r| r.score)
            .map(|r| (r.score, r.played_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::round_metrics;
    use tempfile::tempdir;

    fn round(score: u32, operation: Operation, range: ProblemRange) -> Round {
        Round {
            score,
            operation,
            range,
            timer_secs: 60,
            focus_number: None,
            allow_negatives: false,
            typing_speed: None,
            metrics: round_metrics(score, 60, None),
            played_at: Local::now(),
        }
    }

    #[test]
    fn save_and_query_high_score() {
        let dir = tempdir().unwrap();
        let mut store =
            SqliteScoreStore::with_paths(dir.path().join("scores.db"), None).unwrap();
        let range = ProblemRange::new(1, 10, 1, 10);

        // Empty history: everything is a high score.
        assert!(store.is_high_score(0, Operation::Addition, &range).unwrap());

        assert!(store.save_score(&round(12, Operation::Addition, range)).unwrap());
        assert!(store.save_score(&round(20, Operation::Addition, range)).unwrap());

        assert!(store.is_high_score(21, Operation::Addition, &range).unwrap());
        assert!(!store.is_high_score(20, Operation::Addition, &range).unwrap());
        assert!(!store.is_high_score(5, Operation::Addition, &range).unwrap());
    }

    #[test]
    fn history_is_keyed_by_operation_and_exact_range() {
        let dir = tempdir().unwrap();
        let mut store =
            SqliteScoreStore::with_paths(dir.path().join("scores.db"), None).unwrap();
        let range = ProblemRange::new(1, 10, 1, 10);
        let other_range = ProblemRange::new(1, 12, 1, 10);

        store.save_score(&round(30, Operation::Addition, range)).unwrap();

        // A different operation or range tuple does not count against us.
        assert!(store
            .is_high_score(1, Operation::Multiplication, &range)
            .unwrap());
        assert!(store.is_high_score(1, Operation::Addition, &other_range).unwrap());
    }

    #[test]
    fn implausible_scores_are_rejected() {
        let dir = tempdir().unwrap();
        let mut store =
            SqliteScoreStore::with_paths(dir.path().join("scores.db"), None).unwrap();
        let range = ProblemRange::new(1, 10, 1, 10);

        let saved = store
            .save_score(&round(theoretical_max_score(60) + 1, Operation::Addition, range))
            .unwrap();
        assert!(!saved);
        assert!(store.is_high_score(1, Operation::Addition, &range).unwrap());
    }

    #[test]
    fn best_round_returns_top_score() {
        let dir = tempdir().unwrap();
        let mut store =
            SqliteScoreStore::with_paths(dir.path().join("scores.db"), None).unwrap();
        let range = ProblemRange::new(2, 9, 2, 9);

        assert!(store.best_round(Operation::Division, &range).unwrap().is_none());

        store.save_score(&round(8, Operation::Division, range)).unwrap();
        store.save_score(&round(14, Operation::Division, range)).unwrap();
        store.save_score(&round(11, Operation::Division, range)).unwrap();

        let (best, _) = store.best_round(Operation::Division, &range).unwrap().unwrap();
        assert_eq!(best, 14);
    }

    #[test]
    fn results_log_gets_header_and_rows() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rounds.csv");
        let mut store = SqliteScoreStore::with_paths(
            dir.path().join("scores.db"),
            Some(log_path.clone()),
        )
        .unwrap();
        let range = ProblemRange::new(1, 10, 1, 10);

        store.save_score(&round(10, Operation::Addition, range)).unwrap();
        store.save_score(&round(11, Operation::Addition, range)).unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,operation,range"));
        assert!(lines[1].contains("addition"));
        assert!(lines[1].contains("1-10:1-10"));
    }

    #[test]
    fn memory_store_matches_sqlite_semantics() {
        let mut store = MemoryScoreStore::default();
        let range = ProblemRange::new(1, 10, 1, 10);

        assert!(store.is_high_score(0, Operation::Subtraction, &range).unwrap());
        assert!(store.save_score(&round(9, Operation::Subtraction, range)).unwrap());
        assert!(!store.is_high_score(9, Operation::Subtraction, &range).unwrap());
        assert!(store.is_high_score(10, Operation::Subtraction, &range).unwrap());

        let rejected = store
            .save_score(&round(1000, Operation::Subtraction, range))
            .unwrap();
        assert!(!rejected);
        assert_eq!(store.rounds.len(), 1);
    }
}
