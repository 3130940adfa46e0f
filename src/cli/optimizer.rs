use clap::Parser;

use crate::{
    core::{action::ActionType, optimizer::OptimizerSettings},
    prelude::*,
    quantity::cost::Cost,
};

#[derive(Parser)]
pub struct OptimizerArgs {
    /// Number of random restarts.
    #[clap(long = "restarts", default_value = "10", env = "N_RESTARTS")]
    pub n_restarts: usize,

    /// Seeding strides, cycled through by the restarts.
    #[clap(
        long = "fill-factors",
        env = "FILL_FACTORS",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "1,4,8",
    )]
    pub fill_factors: Vec<usize>,

    #[clap(
        long = "action-types",
        env = "ACTION_TYPES",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "self-use,charge,discharge",
    )]
    pub action_types: Vec<ActionType>,

    /// Minimal improvement to justify a more complex schedule.
    #[clap(long = "margin", default_value = "1", env = "MARGIN")]
    pub margin: Cost,

    #[clap(long = "max-refinement-passes", default_value = "10", env = "MAX_REFINEMENT_PASSES")]
    pub max_refinement_passes: usize,

    /// Number of leading slots to print as the plan.
    #[clap(long = "actionable-slots", default_value = "24", env = "N_ACTIONABLE_SLOTS")]
    pub n_actionable_slots: usize,

    /// Do not probe the bounds with the synthetic extremes.
    #[clap(long = "no-shock")]
    pub no_shock: bool,

    /// Random seed, random by default.
    #[clap(long = "seed", env = "SEED")]
    pub seed: Option<u64>,
}

impl OptimizerArgs {
    pub fn settings(&self) -> Result<OptimizerSettings> {
        ensure!(!self.action_types.is_empty(), "at least one action type must be allowed");
        ensure!(
            self.fill_factors.iter().all(|fill_factor| *fill_factor != 0),
            "fill factors must be positive",
        );
        ensure!(
            self.margin.is_finite() && self.margin >= Cost::ZERO,
            "invalid margin: {}",
            self.margin,
        );
        Ok(OptimizerSettings {
            n_restarts: self.n_restarts,
            fill_factors: self.fill_factors.clone(),
            margin: self.margin,
            max_refinement_passes: self.max_refinement_passes,
            n_actionable_slots: self.n_actionable_slots,
            action_types: self.action_types.iter().copied().collect(),
            shock: !self.no_shock,
            seed: self.seed.unwrap_or_else(|| fastrand::u64(..)),
            ..OptimizerSettings::default()
        })
    }
}
