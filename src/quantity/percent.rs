use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Whole percent, used for the state-of-charge bounds.
///
/// Integer on purpose: bounds are compared and hashed exactly.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Deserialize,
    Serialize,
    derive_more::From,
    derive_more::FromStr,
)]
#[serde(transparent)]
pub struct Percent(pub u16);

impl Percent {
    pub const HUNDRED: Self = Self(100);

    pub fn to_proportion(self) -> f64 {
        0.01 * f64::from(self.0)
    }

    /// Round a `0..=1` proportion to the nearest whole percent.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_proportion(proportion: f64) -> Self {
        Self((proportion.clamp(0.0, 1.0) * 100.0).round() as u16)
    }

    /// Iterate `self..=last` with the given step.
    pub fn step_to(self, last: Self, step: Self) -> impl Iterator<Item = Self> + Clone {
        (self.0..=last.0).step_by(usize::from(step.0.max(1))).map(Self)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
