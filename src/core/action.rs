use std::fmt::{Display, Formatter};

use comfy_table::Color;
use serde::{Deserialize, Serialize};

use crate::quantity::percent::Percent;

#[derive(Debug, Hash, Ord, PartialOrd, Deserialize, Serialize, clap::ValueEnum, enumset::EnumSetType)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Solar covers the load first, the battery absorbs the surplus or compensates the deficit.
    SelfUse,

    /// Forced charging from solar, and from the grid when solar is not enough.
    Charge,

    /// Forced discharging at the inverter's rated power, no matter the actual load.
    Discharge,
}

impl Display for ActionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfUse => write!(f, "Self-use"),
            Self::Charge => write!(f, "Charge"),
            Self::Discharge => write!(f, "Discharge"),
        }
    }
}

impl ActionType {
    pub const fn color(self) -> Color {
        match self {
            Self::Charge => Color::Green,
            Self::Discharge => Color::Blue,
            Self::SelfUse => Color::DarkYellow,
        }
    }
}

/// Battery directive, active from its slot until superseded.
///
/// How the bounds are used depends on the type:
///
/// - [`ActionType::SelfUse`]: the battery is not discharged below `min_soc`, and not charged above `max_soc`.
/// - [`ActionType::Charge`]: the battery is charged up to `max_soc`, `min_soc` is ignored.
/// - [`ActionType::Discharge`]: the battery is discharged down to `min_soc`,
///   excess solar may charge it up to `max_soc`.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Action {
    #[serde(rename = "action")]
    pub kind: ActionType,

    pub min_soc: Percent,
    pub max_soc: Percent,
}

impl Action {
    pub const fn new(kind: ActionType, min_soc: Percent, max_soc: Percent) -> Self {
        Self { kind, min_soc, max_soc }
    }

    pub const fn self_use(min_soc: Percent, max_soc: Percent) -> Self {
        Self::new(ActionType::SelfUse, min_soc, max_soc)
    }

    pub const fn charge(min_soc: Percent, max_soc: Percent) -> Self {
        Self::new(ActionType::Charge, min_soc, max_soc)
    }

    pub const fn discharge(min_soc: Percent, max_soc: Percent) -> Self {
        Self::new(ActionType::Discharge, min_soc, max_soc)
    }

    /// Copy with the floor replaced.
    pub const fn with_min_soc(mut self, min_soc: Percent) -> Self {
        self.min_soc = min_soc;
        self
    }

    pub const fn with_max_soc(mut self, max_soc: Percent) -> Self {
        self.max_soc = max_soc;
        self
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (min {}, max {})", self.kind, self.min_soc, self.max_soc)
    }
}
