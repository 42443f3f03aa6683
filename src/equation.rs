use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    pub fn apply(&self, left: i64, right: i64) -> i64 {
        match self {
            Op::Add => left + right,
            Op::Sub => left - right,
            Op::Mul => left * right,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '×',
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single true/false statement shown to a player.
///
/// `shown_result` equals the real result exactly when `is_correct` is true;
/// otherwise it has been perturbed away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    pub left: i64,
    pub op: Op,
    pub right: i64,
    pub shown_result: i64,
    pub is_correct: bool,
}

impl Equation {
    pub fn true_result(&self) -> i64 {
        self.op.apply(self.left, self.right)
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} = {}",
            self.left, self.op, self.right, self.shown_result
        )
    }
}

/// How statements are produced.
///
/// `Scaled` is the difficulty-driven policy: addition only, operand ranges
/// widening with the player's score. `Mixed` is the fixed-range policy from
/// the earliest game mode: all three operators over [1, 20], no difficulty
/// input. Which policy backs which play mode is session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenPolicy {
    Scaled,
    Mixed,
}

/// Operand range for a given score under the `Scaled` policy.
fn difficulty_range(difficulty: u32) -> (i64, i64) {
    if difficulty < 5 {
        (1, 5)
    } else if difficulty < 10 {
        (1, 10)
    } else if difficulty < 15 {
        (5, 15)
    } else if difficulty < 25 {
        (5, 25)
    } else {
        (10, 49)
    }
}

/// Largest offset applied to the result of a wrong statement.
fn offset_cap(policy: GenPolicy, difficulty: u32) -> i64 {
    match policy {
        GenPolicy::Mixed => 5,
        GenPolicy::Scaled => {
            if difficulty < 10 {
                3
            } else if difficulty < 25 {
                5
            } else {
                10
            }
        }
    }
}

/// Generate a statement. A fair coin decides whether the shown result is the
/// real one; wrong results are nudged by a small signed offset and are never
/// allowed to collide with the truth. Under `Scaled` the shown result also
/// stays non-negative.
pub fn generate<R: Rng>(rng: &mut R, policy: GenPolicy, difficulty: u32) -> Equation {
    let (min, max) = match policy {
        GenPolicy::Scaled => difficulty_range(difficulty),
        GenPolicy::Mixed => (1, 20),
    };

    let left = rng.gen_range(min..=max);
    let right = rng.gen_range(min..=max);

    let op = match policy {
        GenPolicy::Scaled => Op::Add,
        GenPolicy::Mixed => match rng.gen_range(0..3) {
            0 => Op::Add,
            1 => Op::Sub,
            _ => Op::Mul,
        },
    };

    let truth = op.apply(left, right);
    let is_correct = rng.gen_bool(0.5);

    let shown_result = if is_correct {
        truth
    } else {
        let magnitude = rng.gen_range(1..=offset_cap(policy, difficulty));
        let offset = if rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        };
        let mut shown = truth + offset;
        if policy == GenPolicy::Scaled && shown < 0 {
            // flip to the positive side; still off by the same magnitude
            shown = truth + magnitude;
        }
        debug_assert_ne!(shown, truth);
        shown
    };

    Equation {
        left,
        op,
        right,
        shown_result,
        is_correct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xdecafbad)
    }

    #[test]
    fn scaled_operands_follow_difficulty_ranges() {
        let mut rng = rng();
        for &(difficulty, min, max) in &[
            (0u32, 1i64, 5i64),
            (4, 1, 5),
            (5, 1, 10),
            (9, 1, 10),
            (10, 5, 15),
            (14, 5, 15),
            (15, 5, 25),
            (24, 5, 25),
            (25, 10, 49),
            (100, 10, 49),
        ] {
            for _ in 0..200 {
                let eq = generate(&mut rng, GenPolicy::Scaled, difficulty);
                assert!(eq.left >= min && eq.left <= max, "left {} at {}", eq.left, difficulty);
                assert!(eq.right >= min && eq.right <= max);
                assert_eq!(eq.op, Op::Add);
            }
        }
    }

    #[test]
    fn shown_matches_truth_iff_correct() {
        let mut rng = rng();
        for difficulty in [0, 7, 12, 20, 30] {
            for _ in 0..500 {
                let eq = generate(&mut rng, GenPolicy::Scaled, difficulty);
                if eq.is_correct {
                    assert_eq!(eq.shown_result, eq.true_result());
                } else {
                    assert_ne!(eq.shown_result, eq.true_result());
                }
            }
        }
    }

    #[test]
    fn scaled_wrong_results_stay_non_negative() {
        let mut rng = rng();
        for _ in 0..2000 {
            let eq = generate(&mut rng, GenPolicy::Scaled, 0);
            assert!(eq.shown_result >= 0, "negative shown result: {}", eq);
        }
    }

    #[test]
    fn mixed_uses_fixed_range_and_every_operator() {
        let mut rng = rng();
        let ops = (0..3000)
            .map(|_| {
                let eq = generate(&mut rng, GenPolicy::Mixed, 99);
                assert!(eq.left >= 1 && eq.left <= 20);
                assert!(eq.right >= 1 && eq.right <= 20);
                eq.op
            })
            .counts();
        assert_eq!(ops.len(), 3, "all three operators should appear: {:?}", ops);
    }

    #[test]
    fn mixed_wrong_results_never_collide_with_truth() {
        let mut rng = rng();
        for _ in 0..3000 {
            let eq = generate(&mut rng, GenPolicy::Mixed, 0);
            if !eq.is_correct {
                assert_ne!(eq.shown_result, eq.true_result());
                let gap = (eq.shown_result - eq.true_result()).abs();
                assert!(gap >= 1 && gap <= 5);
            }
        }
    }

    #[test]
    fn both_outcomes_occur() {
        let mut rng = rng();
        let (mut correct, mut wrong) = (0, 0);
        for _ in 0..1000 {
            if generate(&mut rng, GenPolicy::Scaled, 5).is_correct {
                correct += 1;
            } else {
                wrong += 1;
            }
        }
        assert!(correct > 300 && wrong > 300, "{} / {}", correct, wrong);
    }

    #[test]
    fn display_reads_like_a_statement() {
        let eq = Equation {
            left: 7,
            op: Op::Add,
            right: 8,
            shown_result: 16,
            is_correct: false,
        };
        assert_eq!(eq.to_string(), "7 + 8 = 16");
    }
}
