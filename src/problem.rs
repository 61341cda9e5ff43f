use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How many times a freshly rolled problem is re-rolled before a repeat of
/// the previous problem is accepted.
pub const MAX_REGEN_ATTEMPTS: usize = 5;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub fn symbol(&self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '-',
            Operation::Multiplication => '×',
            Operation::Division => '÷',
        }
    }

    pub fn apply(&self, a: i64, b: i64) -> i64 {
        match self {
            Operation::Addition => a + b,
            Operation::Subtraction => a - b,
            Operation::Multiplication => a * b,
            Operation::Division => a / b,
        }
    }
}

/// Inclusive draw bounds for both operands. `max1 >= min1` and `max2 >= min2`
/// are the caller's contract; the generator only debug-asserts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRange {
    pub min1: i64,
    pub max1: i64,
    pub min2: i64,
    pub max2: i64,
}

impl ProblemRange {
    pub fn new(min1: i64, max1: i64, min2: i64, max2: i64) -> Self {
        Self {
            min1,
            max1,
            min2,
            max2,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.max1 >= self.min1 && self.max2 >= self.min2
    }
}

/// A single arithmetic problem. `answer` is exact by construction and is
/// never recomputed after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Problem {
    pub operand1: i64,
    pub operand2: i64,
    pub operation: Operation,
    pub answer: i64,
}

impl Problem {
    pub fn display(&self) -> String {
        format!(
            "{} {} {} = ?",
            self.operand1,
            self.operation.symbol(),
            self.operand2
        )
    }

    /// Same face = same operands and operation, i.e. what the player sees.
    pub fn same_face(&self, other: &Problem) -> bool {
        self.operand1 == other.operand1
            && self.operand2 == other.operand2
            && self.operation == other.operation
    }
}

/// Generate a new problem, avoiding an immediate repeat of `previous`.
///
/// A repeat triggers up to [`MAX_REGEN_ATTEMPTS`] re-rolls; after that the
/// repeat is accepted so generation always terminates, even for degenerate
/// single-value ranges.
pub fn generate<R: Rng>(
    rng: &mut R,
    operation: Operation,
    range: &ProblemRange,
    allow_negatives: bool,
    focus_number: Option<i64>,
    previous: Option<&Problem>,
) -> Problem {
    debug_assert!(range.is_valid(), "malformed range: {:?}", range);

    let mut problem = roll(rng, operation, range, allow_negatives, focus_number);
    if let Some(prev) = previous {
        for _ in 0..MAX_REGEN_ATTEMPTS {
            if !problem.same_face(prev) {
                break;
            }
            problem = roll(rng, operation, range, allow_negatives, focus_number);
        }
    }
    problem
}

fn roll<R: Rng>(
    rng: &mut R,
    operation: Operation,
    range: &ProblemRange,
    allow_negatives: bool,
    focus_number: Option<i64>,
) -> Problem {
    if operation == Operation::Division {
        // Construct divisor and quotient first so the dividend divides
        // cleanly and the answer equals the intended quotient.
        debug_assert!(range.max2 >= 1, "division needs a divisor bound >= 1");
        let divisor = rng.gen_range(range.min2.max(1)..=range.max2);
        let quotient =
            focus_number.unwrap_or_else(|| rng.gen_range(range.min1..=range.max1));
        return Problem {
            operand1: quotient * divisor,
            operand2: divisor,
            operation,
            answer: quotient,
        };
    }

    let mut operand1 =
        focus_number.unwrap_or_else(|| rng.gen_range(range.min1..=range.max1));
    let mut operand2 = rng.gen_range(range.min2..=range.max2);

    // One swap rule everywhere: with negatives disallowed the larger operand
    // comes first, which can move a focus number into the second slot.
    if operation == Operation::Subtraction && !allow_negatives && operand2 > operand1 {
        std::mem::swap(&mut operand1, &mut operand2);
    }

    Problem {
        operand1,
        operand2,
        operation,
        answer: operation.apply(operand1, operand2),
    }
}
