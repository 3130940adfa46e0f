use crate::{
    core::{
        action::{Action, ActionType},
        battery::BatteryParameters,
        optimizer::{Optimizer, OptimizerSettings},
        schedule::Schedule,
        segment::TimeSegment,
    },
    prelude::*,
    quantity::{cost::Cost, percent::Percent},
};

/// Actions the hill-climbing tries in a slot.
///
/// Surplus slots and deficit slots get different self-use bounds: with a surplus, only
/// the ceiling matters, and with a deficit, only the floor does.
pub struct Candidates {
    action_types: Vec<ActionType>,
    charge_max_socs: Vec<Percent>,
    on_surplus: Vec<Action>,
    on_deficit: Vec<Action>,
    discharging_efficiency: f64,
}

impl Candidates {
    pub fn new(battery: &BatteryParameters, settings: &OptimizerSettings) -> Self {
        let min_soc = battery.min_soc;
        let for_surplus = |has_surplus: bool| -> Vec<Action> {
            settings
                .action_types
                .iter()
                .flat_map(|kind| match kind {
                    ActionType::Charge => min_soc
                        .step_to(Percent::HUNDRED, settings.soc_step)
                        .map(|max_soc| Action::charge(min_soc, max_soc))
                        .collect::<Vec<_>>(),
                    ActionType::SelfUse if has_surplus => vec![
                        Action::self_use(min_soc, min_soc),
                        Action::self_use(min_soc, Percent::HUNDRED),
                    ],
                    ActionType::SelfUse => vec![
                        Action::self_use(min_soc, Percent::HUNDRED),
                        Action::self_use(Percent::HUNDRED, Percent::HUNDRED),
                    ],
                    // Discharging «down to» a full battery would be a plain hold:
                    ActionType::Discharge => min_soc
                        .step_to(Percent(98), settings.discharge_soc_step)
                        .map(|min_soc| Action::discharge(min_soc, Percent::HUNDRED))
                        .collect(),
                })
                .collect()
        };
        Self {
            action_types: settings.action_types.iter().collect(),
            charge_max_socs: min_soc.step_to(Percent::HUNDRED, settings.soc_step).collect(),
            on_surplus: for_surplus(true),
            on_deficit: for_surplus(false),
            discharging_efficiency: battery.efficiency.discharging,
        }
    }

    pub fn for_segment(&self, segment: &TimeSegment) -> &[Action] {
        if segment.has_solar_surplus(self.discharging_efficiency) {
            &self.on_surplus
        } else {
            &self.on_deficit
        }
    }
}

impl Optimizer<'_> {
    /// Random-restart hill-climbing over the sparse schedules.
    ///
    /// Returns the best schedule found, or the incumbent if no restart beats it.
    #[instrument(skip_all, fields(n_restarts = self.settings.n_restarts))]
    pub(super) fn search(
        &mut self,
        segments: &[TimeSegment],
        incumbent: (Cost, Schedule),
    ) -> (Cost, Schedule) {
        let candidates = Candidates::new(self.simulator.battery(), self.settings);
        let (mut best_score, mut best_schedule) = incumbent;

        for restart in 0..self.settings.n_restarts {
            let fill_factor = self.settings.fill_factor(restart);
            let seeded = self.seed_schedule(segments.len(), fill_factor, &candidates);
            let (score, schedule) = self.hill_climb(segments, &candidates, seeded);
            let n_actionable = self.settings.n_actionable_slots.min(segments.len());
            let actionable_score =
                self.evaluate(&segments[..n_actionable], &schedule.as_slice()[..n_actionable]);

            if score.is_better_than(best_score, Cost::ZERO) {
                info!(
                    restart,
                    fill_factor,
                    %score,
                    %actionable_score,
                    n_explicit = schedule.n_explicit(),
                    "improved",
                );
                best_score = score;
                best_schedule = schedule;
            } else {
                debug!(restart, fill_factor, %score, %actionable_score, "no improvement");
            }
        }

        (best_score, best_schedule)
    }

    /// Random sparse schedule: every `fill_factor`-th slot gets a random action.
    fn seed_schedule(&mut self, n_slots: usize, fill_factor: usize, candidates: &Candidates) -> Schedule {
        let mut schedule = Schedule::inherit_all(n_slots);
        for slot in (0..n_slots).step_by(fill_factor) {
            schedule[slot] = Some(self.random_action(candidates));
        }
        schedule
    }

    fn random_action(&mut self, candidates: &Candidates) -> Action {
        let min_permitted = self.simulator.battery().min_soc;
        let kind = self.rng.choice(&candidates.action_types).copied().unwrap_or(ActionType::SelfUse);
        match kind {
            ActionType::Charge => {
                let max_soc =
                    self.rng.choice(&candidates.charge_max_socs).copied().unwrap_or(Percent::HUNDRED);
                Action::charge(min_permitted, max_soc)
            }
            ActionType::SelfUse | ActionType::Discharge => {
                let min_soc = if self.rng.bool() { min_permitted } else { Percent::HUNDRED };
                let max_soc = if self.rng.bool() { min_soc } else { Percent::HUNDRED };
                Action::new(kind, min_soc, max_soc)
            }
        }
    }

    /// Steepest-ascent over single-slot changes, until no change improves the score.
    fn hill_climb(
        &mut self,
        segments: &[TimeSegment],
        candidates: &Candidates,
        mut schedule: Schedule,
    ) -> (Cost, Schedule) {
        let mut score = self.evaluate(segments, schedule.as_slice());
        let mut slots: Vec<usize> = (0..schedule.len()).collect();
        let mut n_sweeps = 0_usize;

        loop {
            n_sweeps += 1;

            // Shuffled, so that the ties are broken randomly:
            self.rng.shuffle(&mut slots);
            let mut best_change = None;
            let mut best_change_score = score;
            for &slot in &slots {
                let original = schedule[slot];
                for &candidate in candidates.for_segment(&segments[slot]) {
                    schedule[slot] = Some(candidate);
                    let candidate_score = self.evaluate(segments, schedule.as_slice());
                    if candidate_score.is_better_than(best_change_score, Cost::ZERO) {
                        best_change_score = candidate_score;
                        best_change = Some((slot, candidate));
                    }
                }
                schedule[slot] = original;
            }

            if let Some((slot, action)) = best_change {
                schedule[slot] = Some(action);
                score = best_change_score;
            }
            score = self.collapse(segments, &mut schedule, score);
            if best_change.is_none() {
                break;
            }
        }

        trace!(n_sweeps, %score, n_explicit = schedule.n_explicit(), "reached a local maximum");
        (score, schedule)
    }

    /// Turn explicit slots into inherited ones where that does not hurt.
    fn collapse(&mut self, segments: &[TimeSegment], schedule: &mut Schedule, mut score: Cost) -> Cost {
        for slot in 0..schedule.len() {
            let Some(action) = schedule[slot] else {
                continue;
            };
            schedule[slot] = None;
            let collapsed_score = self.evaluate(segments, schedule.as_slice());
            if score.is_better_than(collapsed_score, Cost::ZERO) {
                schedule[slot] = Some(action);
            } else {
                score = collapsed_score;
            }
        }
        score
    }
}
