mod bounds;
mod refine;
mod search;

use bon::bon;
use enumset::EnumSet;

use crate::{
    core::{
        action::{Action, ActionType},
        schedule::{Schedule, ScheduleSlot},
        segment::TimeSegment,
        simulator::Simulator,
        trace::Trace,
    },
    prelude::*,
    quantity::{cost::Cost, percent::Percent},
};

/// Search and refinement knobs.
#[must_use]
#[derive(Clone, Debug)]
pub struct OptimizerSettings {
    /// Number of random restarts of the hill-climbing.
    pub n_restarts: usize,

    /// Seeding strides, cycled through by the restarts.
    ///
    /// Long strides leave more inherited slots, which suits schedules that must hold
    /// the same action for long. Short strides converge faster on simple scenarios.
    pub fill_factors: Vec<usize>,

    /// Step of the maximum SoC grid for charging.
    pub soc_step: Percent,

    /// Step of the minimum SoC grid for discharging, which is more sensitive to the exact bound.
    pub discharge_soc_step: Percent,

    /// Lowest minimum SoC the refinement may settle on.
    ///
    /// This is below the battery's permitted minimum on purpose: the search keeps a reserve,
    /// and the refinement spends it only where that pays off.
    pub tuning_min_soc: Percent,

    pub tuning_soc_step: Percent,

    /// Minimal improvement for the refinement to prefer a more complex schedule.
    pub margin: Cost,

    /// Cap on the refinement passes in case the bounds never settle.
    pub max_refinement_passes: usize,

    /// Number of leading slots returned as the actionable plan.
    pub n_actionable_slots: usize,

    /// Action types the search may use.
    pub action_types: EnumSet<ActionType>,

    /// Probe the bounds with synthetic consumption and generation extremes.
    pub shock: bool,

    pub seed: u64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            n_restarts: 10,
            fill_factors: vec![1, 4, 8],
            soc_step: Percent(20),
            discharge_soc_step: Percent(10),
            tuning_min_soc: Percent(10),
            tuning_soc_step: Percent(10),
            margin: Cost::from(1.0),
            max_refinement_passes: 10,
            n_actionable_slots: 24,
            action_types: EnumSet::all(),
            shock: true,
            seed: 0,
        }
    }
}

impl OptimizerSettings {
    fn fill_factor(&self, restart: usize) -> usize {
        if self.fill_factors.is_empty() {
            return 1;
        }
        self.fill_factors[restart % self.fill_factors.len()].max(1)
    }
}

/// Optimized schedule.
#[must_use]
pub struct Plan {
    /// Leading actions to carry out, the first one applies right now.
    pub actions: Vec<Action>,

    /// Refined actions for the whole horizon.
    pub schedule: Vec<Action>,

    /// Simulation of [`Plan::schedule`].
    pub trace: Trace,

    /// Score of the best search result, before the refinement.
    pub search_score: Cost,

    pub n_simulations: usize,
}

impl Plan {
    pub fn score(&self) -> Cost {
        self.trace.score()
    }

    pub fn current_action(&self) -> Option<Action> {
        self.actions.first().copied()
    }
}

/// Schedule optimizer: random-restart hill-climbing followed by the deterministic refinement.
///
/// The optimizer is single-use: [`Optimizer::optimize`] consumes it, so that a given seed
/// always produces the same plan.
pub struct Optimizer<'a> {
    simulator: &'a Simulator,
    settings: &'a OptimizerSettings,
    rng: fastrand::Rng,
    n_simulations: usize,
}

#[bon]
impl<'a> Optimizer<'a> {
    #[builder]
    pub fn new(simulator: &'a Simulator, settings: &'a OptimizerSettings) -> Self {
        Self { simulator, settings, rng: fastrand::Rng::with_seed(settings.seed), n_simulations: 0 }
    }
}

impl Optimizer<'_> {
    /// Find the best schedule for the segments.
    ///
    /// # Panics
    ///
    /// When the simulation detects an impossible battery state, which means a bug or inconsistent parameters.
    pub fn optimize(self, segments: &[TimeSegment]) -> Plan {
        self.optimize_from(segments, Schedule::inherit_all(segments.len()))
    }

    /// Same as [`Optimizer::optimize`], but starts from the given schedule as the incumbent.
    ///
    /// # Panics
    ///
    /// When the seed schedule length differs from the number of segments.
    #[instrument(skip_all, fields(n_slots = segments.len(), seed = self.settings.seed))]
    pub fn optimize_from(mut self, segments: &[TimeSegment], seed: Schedule) -> Plan {
        assert_eq!(seed.len(), segments.len(), "the seed must have exactly one slot per segment");
        let initial_action = self.simulator.battery().initial_action();

        // Doing nothing is always an option, and a safe fallback:
        let trivial = Schedule::inherit_all(segments.len());
        let trivial_score = self.evaluate(segments, trivial.as_slice());
        let seed_score = self.evaluate(segments, seed.as_slice());
        info!(%trivial_score, %seed_score, "starting…");
        let incumbent = if seed_score.is_better_than(trivial_score, Cost::ZERO) {
            (seed_score, seed)
        } else {
            (trivial_score, trivial.clone())
        };

        let (search_score, best) = self.search(segments, incumbent);
        let refined = self.refine(segments, &best);
        let refined_score = self.evaluate(segments, &refined);

        let schedule = if trivial_score.is_better_than(refined_score, Cost::ZERO) {
            warn!(%refined_score, %trivial_score, "refinement fell below the trivial schedule, falling back");
            trivial.resolve(initial_action)
        } else {
            refined
        };

        let trace = self.simulator.trace(segments, &schedule);
        info!(
            %search_score,
            score = %trace.score(),
            n_simulations = self.n_simulations,
            "optimized",
        );
        Plan {
            actions: schedule.iter().copied().take(self.settings.n_actionable_slots).collect(),
            schedule,
            trace,
            search_score,
            n_simulations: self.n_simulations,
        }
    }

    fn evaluate<S: ScheduleSlot>(&mut self, segments: &[TimeSegment], schedule: &[S]) -> Cost {
        self.n_simulations += 1;
        self.simulator.simulate(segments, schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{flat_segments, reference_segments, reference_simulator};

    fn optimize(segments: &[TimeSegment], seed: u64) -> Plan {
        let simulator = reference_simulator();
        let settings = OptimizerSettings { seed, ..OptimizerSettings::default() };
        Optimizer::builder().simulator(&simulator).settings(&settings).build().optimize(segments)
    }

    #[test]
    fn test_optimize_is_deterministic() {
        let segments = reference_segments();
        let first = optimize(&segments, 7);
        let second = optimize(&segments, 7);
        assert_eq!(first.schedule, second.schedule);
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.n_simulations, second.n_simulations);
    }

    #[test]
    fn test_plan_is_not_worse_than_doing_nothing() {
        let simulator = reference_simulator();
        for segments in [reference_segments(), flat_segments(24)] {
            let trivial = simulator.simulate(&segments, Schedule::inherit_all(segments.len()).as_slice());
            let plan = optimize(&segments, 1);
            assert!(plan.score() >= trivial, "{:?} < {trivial:?}", plan.score());
        }
    }

    #[test]
    fn test_plan_covers_the_actionable_slots() {
        let segments = reference_segments();
        let plan = optimize(&segments, 3);
        assert_eq!(plan.actions.len(), 24);
        assert_eq!(plan.schedule.len(), segments.len());
        assert_eq!(plan.trace.steps.len(), segments.len());
        assert_eq!(plan.current_action(), Some(plan.schedule[0]));
        assert_eq!(plan.actions[..], plan.schedule[..24]);
    }

    #[test]
    fn test_short_horizon_returns_every_slot() {
        let plan = optimize(&flat_segments(6), 0);
        assert_eq!(plan.actions.len(), 6);
    }

    #[test]
    fn test_plan_charges_in_the_cheap_window() {
        let plan = optimize(&reference_segments(), 11);
        assert!(
            plan.actions[2..=4]
                .iter()
                .any(|action| action.kind == ActionType::Charge && action.max_soc <= Percent(60)),
            "{:?}",
            &plan.actions[2..=4],
        );
        for (slot, action) in plan.actions.iter().enumerate() {
            if !(2..=4).contains(&slot) && !(16..=18).contains(&slot) {
                assert_eq!(action.kind, ActionType::SelfUse, "slot #{slot}: {action:?}");
            }
        }
    }

    #[test]
    fn test_plan_keeps_battery_in_range() {
        let simulator = reference_simulator();
        let capacity = simulator.battery().capacity.0;
        let plan = optimize(&reference_segments(), 5);
        for step in &plan.trace.steps {
            assert!((-1e-9..=capacity + 1e-9).contains(&step.residual_energy.0));
        }
    }

    #[test]
    fn test_reoptimizing_own_output_does_not_improve_beyond_margin() {
        let simulator = reference_simulator();
        let segments = reference_segments();
        for seed in [0, 1, 2] {
            let settings = OptimizerSettings { seed, ..OptimizerSettings::default() };
            let first =
                Optimizer::builder().simulator(&simulator).settings(&settings).build().optimize(&segments);
            let second = Optimizer::builder()
                .simulator(&simulator)
                .settings(&settings)
                .build()
                .optimize_from(&segments, Schedule::from(first.schedule.as_slice()));
            assert!(
                second.score() <= first.score() + settings.margin,
                "seed {seed}: {:?} > {:?}",
                second.score(),
                first.score(),
            );
        }
    }

    #[test]
    fn test_refinement_keeps_search_score_within_margin() {
        let settings = OptimizerSettings::default();
        for seed in [0, 4, 11] {
            let plan = optimize(&reference_segments(), seed);
            assert!(
                plan.score() > plan.search_score - settings.margin,
                "seed {seed}: {:?} vs {:?}",
                plan.score(),
                plan.search_score,
            );
        }
    }

    #[test]
    fn test_disabled_action_types_are_not_used() {
        let simulator = reference_simulator();
        let settings = OptimizerSettings {
            action_types: ActionType::SelfUse | ActionType::Charge,
            ..OptimizerSettings::default()
        };
        let plan = Optimizer::builder()
            .simulator(&simulator)
            .settings(&settings)
            .build()
            .optimize(&reference_segments());
        assert!(plan.schedule.iter().all(|action| action.kind != ActionType::Discharge));
    }

    #[test]
    #[should_panic(expected = "one slot per segment")]
    fn test_seed_length_mismatch_panics() {
        let simulator = reference_simulator();
        let settings = OptimizerSettings::default();
        let _ = Optimizer::builder()
            .simulator(&simulator)
            .settings(&settings)
            .build()
            .optimize_from(&flat_segments(4), Schedule::inherit_all(3));
    }
}
