use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Money in the tariff currency unit, for example pence.
pub type Cost = Quantity<0, 0, 1>;

impl Cost {
    /// Round to two decimals.
    ///
    /// Scores are always compared rounded, otherwise floating-point noise would make one schedule
    /// «better» than an equivalent one.
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }

    /// Check whether `self` beats `other` by at least the margin.
    ///
    /// Differences strictly below the margin are not an improvement. With the zero margin,
    /// this is a plain `>` and ties favour the incumbent.
    pub fn is_better_than(self, other: Self, margin: Self) -> bool {
        if (self - other).abs() < margin {
            return false;
        }
        self > other
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.2}", self.0)
    }
}

impl Debug for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
