//! Two-level `hard/soft` score, compared hard first.

use std::{
    fmt, iter,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard/soft score. Any hard difference outweighs any soft difference.
///
/// Field order makes the derived ordering lexicographic.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Score {
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0, soft: 0 };

    pub const fn new(hard: i64, soft: i64) -> Self {
        Score { hard, soft }
    }

    pub const fn of_hard(hard: i64) -> Self {
        Score { hard, soft: 0 }
    }

    pub const fn of_soft(soft: i64) -> Self {
        Score { hard: 0, soft }
    }

    pub fn is_feasible(&self) -> bool {
        self.hard >= 0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid score '{0}', expected '<hard>hard/<soft>soft'")]
pub struct ParseScoreError(String);

impl FromStr for Score {
    type Err = ParseScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseScoreError(s.to_string());
        let (hard, soft) = s.trim().split_once('/').ok_or_else(invalid)?;
        let hard = hard.strip_suffix("hard").ok_or_else(invalid)?;
        let soft = soft.strip_suffix("soft").ok_or_else(invalid)?;

        Ok(Score {
            hard: hard.parse().map_err(|_| invalid())?,
            soft: soft.parse().map_err(|_| invalid())?,
        })
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Score::ZERO, Add::add)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            hard: self.hard + other.hard,
            soft: self.soft + other.soft,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.hard += other.hard;
        self.soft += other.soft;
    }
}

impl Sub<Score> for Score {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Score {
            hard: self.hard - other.hard,
            soft: self.soft - other.soft,
        }
    }
}

impl SubAssign<Score> for Score {
    fn sub_assign(&mut self, other: Score) {
        self.hard -= other.hard;
        self.soft -= other.soft;
    }
}

impl Mul<i64> for Score {
    type Output = Self;

    fn mul(self, factor: i64) -> Self::Output {
        Score {
            hard: self.hard * factor,
            soft: self.soft * factor,
        }
    }
}

impl Neg for Score {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Score {
            hard: -self.hard,
            soft: -self.soft,
        }
    }
}
