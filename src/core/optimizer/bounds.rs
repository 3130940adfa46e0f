use crate::{
    core::{
        action::{Action, ActionType},
        optimizer::{Optimizer, refine::Reference},
        segment::TimeSegment,
    },
    quantity::{energy::KilowattHours, percent::Percent},
};

/// Synthetic extreme applied to a single slot while probing its bounds.
///
/// Under a shock, the score becomes sensitive to the bound being tuned, so that the bound settles
/// on what the rest of the schedule actually needs, rather than on whatever the flat score allows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Shock {
    /// No solar and the whole battery capacity of consumption.
    Drain,

    /// Enough solar to fill the whole battery on top of the consumption.
    Flood,
}

impl Shock {
    fn apply(self, segment: TimeSegment, capacity: KilowattHours) -> TimeSegment {
        match self {
            Self::Drain => TimeSegment { generation: KilowattHours::ZERO, consumption: capacity, ..segment },
            Self::Flood => TimeSegment { generation: capacity + segment.consumption, ..segment },
        }
    }
}

impl Optimizer<'_> {
    /// Tune the minimum and maximum SoC of every slot.
    ///
    /// The segments are only modified temporarily, and are intact when this returns.
    pub(super) fn tune_bounds(
        &mut self,
        segments: &mut [TimeSegment],
        actions: &mut [Action],
        reference: &mut Reference,
    ) -> bool {
        let mut changed = false;
        for slot in 0..actions.len() {
            changed |= self.tune_min_soc(segments, actions, slot, reference);
            changed |= self.tune_max_soc(segments, actions, slot, reference);
        }
        for slot in 0..actions.len() {
            if actions[slot].kind == ActionType::Charge {
                changed |= self.raise_charge_ceiling(segments, actions, slot, reference);
            }
        }
        changed
    }

    fn tune_min_soc(
        &mut self,
        segments: &mut [TimeSegment],
        actions: &mut [Action],
        slot: usize,
        reference: &mut Reference,
    ) -> bool {
        let original = actions[slot];
        let tuning_min_soc = self.settings.tuning_min_soc;

        let first = match original.kind {
            ActionType::Charge => {
                // The floor is irrelevant while charging:
                actions[slot].min_soc = tuning_min_soc;
                return original.min_soc != tuning_min_soc;
            }
            // Never discharge deeper than the search decided:
            ActionType::Discharge => original.min_soc,
            ActionType::SelfUse => tuning_min_soc,
        };
        let shock = (self.settings.shock && original.kind == ActionType::SelfUse).then_some(Shock::Drain);

        let best_min_soc = self.probe(segments, slot, shock, |this, segments| {
            let mut best_score = this.evaluate(segments, actions);
            let mut best_min_soc = original.min_soc;
            for min_soc in first.step_to(Percent::HUNDRED, this.settings.tuning_soc_step) {
                actions[slot].min_soc = min_soc;
                let score = this.evaluate(segments, actions);
                if score.is_better_than(best_score, this.settings.margin) {
                    best_score = score;
                    best_min_soc = min_soc;
                }
            }
            best_min_soc
        });

        self.commit(segments, actions, slot, original, original.with_min_soc(best_min_soc), reference)
    }

    fn tune_max_soc(
        &mut self,
        segments: &mut [TimeSegment],
        actions: &mut [Action],
        slot: usize,
        reference: &mut Reference,
    ) -> bool {
        let original = actions[slot];
        match original.kind {
            // Raised separately, once all the other bounds are settled:
            ActionType::Charge => false,

            // Let the excess solar in while discharging:
            ActionType::Discharge => {
                self.commit(segments, actions, slot, original, original.with_max_soc(Percent::HUNDRED), reference)
            }

            ActionType::SelfUse => {
                // Flooding makes no sense at night, there the ceiling never matters anyway:
                let shock = (self.settings.shock && segments[slot].generation > KilowattHours::ZERO)
                    .then_some(Shock::Flood);
                let best_max_soc = self.probe(segments, slot, shock, |this, segments| {
                    let step = this.settings.tuning_soc_step;
                    let min_soc = original.min_soc;

                    // Intermediate values first, so that «no charging» and «normal operation» win the near-ties:
                    let candidates = Percent(min_soc.0.saturating_add(step.0))
                        .step_to(Percent(99), step)
                        .chain([min_soc, Percent::HUNDRED]);

                    let mut best_score = this.evaluate(segments, actions);
                    let mut best_max_soc = original.max_soc;
                    for max_soc in candidates {
                        actions[slot].max_soc = max_soc;
                        let score = this.evaluate(segments, actions);
                        if !best_score.is_better_than(score, this.settings.margin) {
                            best_score = score;
                            best_max_soc = max_soc;
                        }
                    }
                    best_max_soc
                });
                self.commit(segments, actions, slot, original, original.with_max_soc(best_max_soc), reference)
            }
        }
    }

    /// Charge as high as the margin allows.
    fn raise_charge_ceiling(
        &mut self,
        segments: &[TimeSegment],
        actions: &mut [Action],
        slot: usize,
        reference: &mut Reference,
    ) -> bool {
        let original = actions[slot];
        let step = usize::from(self.settings.soc_step.0.max(1));
        for max_soc in (original.max_soc.0 + 1..=Percent::HUNDRED.0).rev().step_by(step) {
            actions[slot].max_soc = Percent(max_soc);
            let score = self.evaluate(segments, actions);
            if reference.accepts(score) {
                return true;
            }
        }
        actions[slot] = original;
        false
    }

    /// Run the probe with the slot shocked, and restore the slot afterwards.
    fn probe<T>(
        &mut self,
        segments: &mut [TimeSegment],
        slot: usize,
        shock: Option<Shock>,
        probe: impl FnOnce(&mut Self, &[TimeSegment]) -> T,
    ) -> T {
        let unshocked = segments[slot];
        if let Some(shock) = shock {
            segments[slot] = shock.apply(unshocked, self.simulator.battery().capacity);
        }
        let result = probe(self, segments);
        segments[slot] = unshocked;
        result
    }

    /// Validate the tuned action against the real data, and revert it if it falls short of the reference.
    fn commit(
        &mut self,
        segments: &[TimeSegment],
        actions: &mut [Action],
        slot: usize,
        original: Action,
        tuned: Action,
        reference: &mut Reference,
    ) -> bool {
        if tuned == original {
            actions[slot] = original;
            return false;
        }
        actions[slot] = tuned;
        let score = self.evaluate(segments, actions);
        if reference.accepts(score) {
            true
        } else {
            actions[slot] = original;
            false
        }
    }
}
