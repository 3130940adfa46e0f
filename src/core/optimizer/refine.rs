use crate::{
    core::{
        action::{Action, ActionType},
        optimizer::Optimizer,
        schedule::Schedule,
        segment::TimeSegment,
    },
    prelude::*,
    quantity::{cost::Cost, percent::Percent},
};

/// Best score the refinement has reached so far.
///
/// A change is accepted unless it falls short of the reference by the margin or more,
/// which lets simpler schedules win over marginally better ones. The reference only ever goes up,
/// so that a long chain of tiny losses cannot drift the schedule away.
#[derive(Copy, Clone, Debug)]
pub struct Reference {
    pub score: Cost,
    pub margin: Cost,
}

impl Reference {
    pub fn accepts(&mut self, score: Cost) -> bool {
        if self.score.is_better_than(score, self.margin) {
            return false;
        }
        self.score = self.score.max(score);
        true
    }
}

impl Optimizer<'_> {
    /// Simplify the schedule and tune its bounds.
    ///
    /// Returns the dense schedule, every slot holding its own action.
    #[instrument(skip_all)]
    pub(super) fn refine(&mut self, segments: &[TimeSegment], schedule: &Schedule) -> Vec<Action> {
        let mut actions = schedule.resolve(self.simulator.battery().initial_action());
        let initial_score = self.evaluate(segments, &actions);
        let mut reference = Reference { score: initial_score, margin: self.settings.margin };

        // Working copy for the shocks, every shock is undone before the validation:
        let mut segments = segments.to_vec();

        let mut n_passes = 0;
        while n_passes < self.settings.max_refinement_passes {
            n_passes += 1;
            let mut changed = self.simplify(&segments, &mut actions, &mut reference);
            if n_passes == 1 {
                changed |= self.extend_charge_periods(&segments, &mut actions, &mut reference);
                changed |= self.postpone_discharge_periods(&segments, &mut actions, &mut reference);
            }
            changed |= self.tune_bounds(&mut segments, &mut actions, &mut reference);
            if !changed {
                break;
            }
            debug!(n_passes, score = %reference.score, "refinement pass changed the schedule");
        }

        info!(%initial_score, reference = %reference.score, n_passes, "refined");
        actions
    }

    /// Copy the previous action where it does no harm, and replace unnecessary charging.
    fn simplify(
        &mut self,
        segments: &[TimeSegment],
        actions: &mut [Action],
        reference: &mut Reference,
    ) -> bool {
        let min_permitted = self.simulator.battery().min_soc;
        let no_discharge = Action::self_use(Percent::HUNDRED, Percent::HUNDRED);
        let no_charge = Action::self_use(min_permitted, min_permitted);
        let mut changed = false;

        for slot in 0..actions.len() {
            let original = actions[slot];

            if slot != 0 {
                let previous = actions[slot - 1];
                // Stretching a discharge tends to eat into the following export window:
                if previous != original && previous.kind != ActionType::Discharge {
                    actions[slot] = previous;
                    let score = self.evaluate(segments, actions);
                    if reference.accepts(score) {
                        changed = true;
                        continue;
                    }
                    actions[slot] = original;
                }
            }

            if original.kind == ActionType::Charge {
                // A charge is often only there to stop the battery from discharging, or from charging:
                actions[slot] = no_discharge;
                let no_discharge_score = self.evaluate(segments, actions);
                actions[slot] = no_charge;
                let no_charge_score = self.evaluate(segments, actions);
                let (replacement, score) = if no_charge_score.is_better_than(no_discharge_score, Cost::ZERO) {
                    (no_charge, no_charge_score)
                } else {
                    (no_discharge, no_discharge_score)
                };
                if reference.accepts(score) {
                    actions[slot] = replacement;
                    changed = true;
                } else {
                    actions[slot] = original;
                }
            }
        }

        changed
    }

    /// Start the charge periods earlier, where the price allows.
    fn extend_charge_periods(
        &mut self,
        segments: &[TimeSegment],
        actions: &mut [Action],
        reference: &mut Reference,
    ) -> bool {
        let ends: Vec<usize> = (1..actions.len())
            .filter(|&slot| {
                actions[slot].kind == ActionType::Charge
                    && actions.get(slot + 1).is_none_or(|next| next.kind != ActionType::Charge)
            })
            .collect();
        let mut changed = false;

        for end in ends {
            let charge = actions[end];
            for slot in (0..end).rev() {
                if actions[slot].kind == ActionType::Charge {
                    continue;
                }
                let original = actions[slot];
                actions[slot] = charge;
                let score = self.evaluate(segments, actions);
                if !reference.accepts(score) {
                    actions[slot] = original;
                    break;
                }
                changed = true;
            }
        }

        changed
    }

    /// Start the discharge periods later, holding the charge instead.
    fn postpone_discharge_periods(
        &mut self,
        segments: &[TimeSegment],
        actions: &mut [Action],
        reference: &mut Reference,
    ) -> bool {
        let min_permitted = self.simulator.battery().min_soc;
        let hold = Action::self_use(min_permitted, min_permitted);
        let starts: Vec<usize> = (0..actions.len())
            .filter(|&slot| {
                actions[slot].kind == ActionType::Discharge
                    && (slot == 0 || actions[slot - 1].kind != ActionType::Discharge)
            })
            .collect();
        let mut changed = false;

        for start in starts {
            for slot in start..actions.len() {
                let original = actions[slot];
                if original.kind != ActionType::Discharge {
                    break;
                }
                actions[slot] = hold;
                let score = self.evaluate(segments, actions);
                if !reference.accepts(score) {
                    actions[slot] = original;
                    break;
                }
                changed = true;
            }
        }

        changed
    }
}
