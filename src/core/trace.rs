use crate::{
    core::action::Action,
    quantity::{cost::Cost, energy::KilowattHours, percent::Percent},
};

/// Simulated state and flows of a single slot.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Step {
    /// Action in effect during the slot, after resolving the inherited ones.
    pub action: Action,

    /// Residual energy at the end of the slot.
    pub residual_energy: KilowattHours,

    pub state_of_charge: Percent,
    pub feed_in: KilowattHours,
    pub import: KilowattHours,
    pub feed_in_revenue: Cost,
    pub cumulative_feed_in_revenue: Cost,
    pub import_cost: Cost,
    pub cumulative_import_cost: Cost,

    /// Rounded revenue minus rounded cost so far.
    pub cumulative_score: Cost,
}

/// Full simulation trace.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    pub steps: Vec<Step>,
}

impl Trace {
    pub fn score(&self) -> Cost {
        self.steps.last().map_or(Cost::ZERO, |step| step.cumulative_score)
    }

    pub fn total_feed_in(&self) -> KilowattHours {
        self.steps.iter().map(|step| step.feed_in).sum()
    }

    pub fn total_import(&self) -> KilowattHours {
        self.steps.iter().map(|step| step.import).sum()
    }
}
