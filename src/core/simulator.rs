use bon::Builder;

use crate::{
    core::{
        action::{Action, ActionType},
        battery::BatteryParameters,
        schedule::ScheduleSlot,
        segment::TimeSegment,
        trace::{Step, Trace},
    },
    quantity::{
        Quantity,
        cost::Cost,
        energy::KilowattHours,
        percent::Percent,
        rate::KilowattHourRate,
        time::Hours,
    },
};

/// Slack for the floating-point noise in the battery bounds check.
const TOLERANCE: KilowattHours = Quantity(1e-9);

/// Deterministic energy-flow simulation of a whole schedule.
///
/// Simulation is pure: it never mutates its inputs and keeps no state between the runs.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct Simulator {
    battery: BatteryParameters,

    /// Residual energy before the first slot.
    initial_residual_energy: KilowattHours,

    #[builder(default = Hours::ONE)]
    segment_duration: Hours,

    /// Export rate penalty while force-discharging, so that the planner does not game the feed-in tariff.
    #[builder(default = KilowattHourRate::from(2.0))]
    discharge_disincentive: KilowattHourRate,
}

/// Battery and inverter flows within a slot.
struct Flow {
    /// Energy taken from the battery (DC), negative while charging.
    battery_discharge: KilowattHours,

    /// Inverter AC output, negative while charging from the grid.
    inverter_output: KilowattHours,
}

impl Simulator {
    pub const fn battery(&self) -> &BatteryParameters {
        &self.battery
    }

    /// Simulate the schedule and return the rounded net score.
    ///
    /// # Panics
    ///
    /// On the schedule length mismatch, or when the battery leaves `0..=capacity`.
    pub fn simulate<S: ScheduleSlot>(&self, segments: &[TimeSegment], schedule: &[S]) -> Cost {
        self.run(segments, schedule, None)
    }

    /// Simulate the schedule and record every step.
    ///
    /// # Panics
    ///
    /// Same as [`Simulator::simulate`].
    pub fn trace<S: ScheduleSlot>(&self, segments: &[TimeSegment], schedule: &[S]) -> Trace {
        let mut steps = Vec::with_capacity(segments.len());
        self.run(segments, schedule, Some(&mut steps));
        Trace { steps }
    }

    fn run<S: ScheduleSlot>(
        &self,
        segments: &[TimeSegment],
        schedule: &[S],
        mut steps: Option<&mut Vec<Step>>,
    ) -> Cost {
        assert_eq!(
            segments.len(),
            schedule.len(),
            "the schedule must have exactly one slot per segment",
        );

        let mut residual_energy = self.initial_residual_energy;
        let mut action = self.battery.initial_action();
        let mut feed_in_revenue = Cost::ZERO;
        let mut import_cost = Cost::ZERO;

        for (segment, slot) in segments.iter().zip(schedule) {
            if let Some(explicit) = slot.explicit() {
                action = explicit;
            }

            let flow = self.flow(segment, action, residual_energy);
            residual_energy -= flow.battery_discharge;
            assert!(
                residual_energy >= -TOLERANCE && residual_energy <= self.battery.capacity + TOLERANCE,
                "battery level left the physical range: {residual_energy:?} ({action:?})",
            );

            let (feed_in, import) = if flow.inverter_output > segment.consumption {
                (flow.inverter_output - segment.consumption, KilowattHours::ZERO)
            } else {
                (KilowattHours::ZERO, segment.consumption - flow.inverter_output)
            };
            let feed_in_rate = match action.kind {
                ActionType::Discharge => segment.feed_in_tariff - self.discharge_disincentive,
                ActionType::SelfUse | ActionType::Charge => segment.feed_in_tariff,
            };
            // Exporting never costs money – we would rather curtail:
            let slot_feed_in_revenue = (feed_in * feed_in_rate).max(Cost::ZERO);
            let slot_import_cost = import * segment.import_tariff;
            feed_in_revenue += slot_feed_in_revenue;
            import_cost += slot_import_cost;

            if let Some(steps) = steps.as_deref_mut() {
                steps.push(Step {
                    action,
                    residual_energy,
                    state_of_charge: Percent::from_proportion(self.battery.soc_of(residual_energy)),
                    feed_in,
                    import,
                    feed_in_revenue: slot_feed_in_revenue,
                    cumulative_feed_in_revenue: feed_in_revenue,
                    import_cost: slot_import_cost,
                    cumulative_import_cost: import_cost,
                    cumulative_score: Self::score(feed_in_revenue, import_cost),
                });
            }
        }

        Self::score(feed_in_revenue, import_cost)
    }

    fn score(feed_in_revenue: Cost, import_cost: Cost) -> Cost {
        feed_in_revenue.round_to_cents() - import_cost.round_to_cents()
    }

    fn flow(&self, segment: &TimeSegment, action: Action, residual_energy: KilowattHours) -> Flow {
        let efficiency = self.battery.efficiency;
        let floor = self.battery.energy_at(action.min_soc);
        let ceiling = self.battery.energy_at(action.max_soc);
        let inverter_energy = self.battery.inverter_power * self.segment_duration;

        match action.kind {
            ActionType::SelfUse => {
                let consumption_dc = segment.consumption_dc(efficiency.discharging);
                if segment.generation > consumption_dc {
                    // Solar covers the load, the surplus charges the battery and the rest is exported:
                    let surplus = segment.generation - consumption_dc;
                    let charged = (ceiling - residual_energy).clamp(KilowattHours::ZERO, surplus);
                    Flow {
                        battery_discharge: -charged,
                        inverter_output: segment.consumption
                            + (surplus - charged) * efficiency.discharging,
                    }
                } else {
                    // The battery compensates the deficit as far as the floor allows:
                    let deficit = consumption_dc - segment.generation;
                    let discharged = (residual_energy - floor).clamp(KilowattHours::ZERO, deficit);
                    Flow {
                        battery_discharge: discharged,
                        inverter_output: (segment.generation + discharged) * efficiency.discharging,
                    }
                }
            }

            ActionType::Charge => {
                let headroom = (ceiling - residual_energy).max(KilowattHours::ZERO);
                let from_solar = headroom.min(segment.generation);
                if from_solar < segment.generation {
                    // Headroom is exhausted by solar alone, the excess goes through the inverter:
                    Flow {
                        battery_discharge: -from_solar,
                        inverter_output: (segment.generation - from_solar) * efficiency.discharging,
                    }
                } else {
                    // Top up from the grid, the inverter rating is counted on the DC side:
                    let from_grid =
                        (headroom - from_solar).min(inverter_energy / efficiency.charging);
                    Flow {
                        battery_discharge: -(from_solar + from_grid),
                        inverter_output: -(from_grid * efficiency.charging),
                    }
                }
            }

            ActionType::Discharge => {
                // The inverter runs at its rated output, solar first, then the battery:
                let inverter_input = inverter_energy / efficiency.discharging;
                let from_solar = segment.generation.min(inverter_input);
                let battery_discharge = if from_solar < inverter_input {
                    (residual_energy - floor).clamp(KilowattHours::ZERO, inverter_input - from_solar)
                } else {
                    // Solar beyond the inverter rating can only go into the battery:
                    -(ceiling - residual_energy)
                        .clamp(KilowattHours::ZERO, segment.generation - inverter_input)
                };
                Flow {
                    battery_discharge,
                    inverter_output: (from_solar + battery_discharge.max(KilowattHours::ZERO))
                        * efficiency.discharging,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::{
            battery::BatteryEfficiency,
            fixtures::{reference_segments, reference_simulator, segment},
            schedule::Schedule,
        },
        quantity::power::Kilowatts,
    };

    /// Lossless 4 kWh battery behind a 3 kW inverter.
    fn ideal_simulator(initial_residual_energy: f64) -> Simulator {
        Simulator::builder()
            .battery(BatteryParameters {
                capacity: KilowattHours::from(4.0),
                efficiency: BatteryEfficiency::IDEAL,
                inverter_power: Kilowatts::from(3.0),
                min_soc: Percent(0),
            })
            .initial_residual_energy(KilowattHours::from(initial_residual_energy))
            .build()
    }

    fn single_step(simulator: &Simulator, segment: TimeSegment, action: Action) -> Step {
        simulator.trace(&[segment], &[action]).steps[0]
    }

    #[test]
    fn test_self_use_surplus_charges_battery() {
        let step = single_step(
            &ideal_simulator(1.0),
            segment(2.0, 0.5, 10.0, 30.0),
            Action::self_use(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 2.5);
        assert_abs_diff_eq!(step.feed_in.0, 0.0);
        assert_abs_diff_eq!(step.import.0, 0.0);
    }

    #[test]
    fn test_self_use_exports_above_max_soc() {
        let step = single_step(
            &ideal_simulator(1.0),
            segment(3.0, 0.0, 10.0, 30.0),
            Action::self_use(Percent(0), Percent(50)),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 2.0);
        assert_abs_diff_eq!(step.feed_in.0, 2.0);
        assert_abs_diff_eq!(step.cumulative_score.0, 20.0);
    }

    #[test]
    fn test_self_use_deficit_discharges_down_to_min_soc() {
        let step = single_step(
            &ideal_simulator(2.0),
            segment(0.0, 1.5, 10.0, 30.0),
            Action::self_use(Percent(25), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 1.0);
        assert_abs_diff_eq!(step.import.0, 0.5);
        assert_abs_diff_eq!(step.cumulative_score.0, -15.0);
    }

    #[test]
    fn test_self_use_holds_below_min_soc() {
        let step = single_step(
            &ideal_simulator(0.5),
            segment(0.0, 1.0, 10.0, 30.0),
            Action::self_use(Percent(25), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 0.5);
        assert_abs_diff_eq!(step.import.0, 1.0);
    }

    #[test]
    fn test_charge_from_grid_is_limited_by_inverter() {
        let step = single_step(
            &ideal_simulator(0.0),
            segment(0.0, 0.5, 10.0, 10.0),
            Action::charge(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 3.0);
        assert_abs_diff_eq!(step.import.0, 3.5);
        assert_abs_diff_eq!(step.cumulative_score.0, -35.0);
    }

    #[test]
    fn test_charge_stops_at_max_soc() {
        let step = single_step(
            &ideal_simulator(1.0),
            segment(0.5, 0.0, 10.0, 10.0),
            Action::charge(Percent(0), Percent(50)),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 2.0);
        assert_abs_diff_eq!(step.import.0, 0.5);
    }

    #[test]
    fn test_charge_exports_excess_solar() {
        let step = single_step(
            &ideal_simulator(3.5),
            segment(2.0, 0.0, 10.0, 10.0),
            Action::charge(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 4.0);
        assert_abs_diff_eq!(step.feed_in.0, 1.5);
    }

    #[test]
    fn test_grid_charge_scales_with_charging_efficiency() {
        let mut simulator = ideal_simulator(0.0);
        simulator.battery.efficiency = BatteryEfficiency { charging: 0.8, discharging: 1.0 };
        let step = single_step(
            &simulator,
            segment(0.0, 0.0, 10.0, 10.0),
            Action::charge(Percent(0), Percent::HUNDRED),
        );
        // 3 kWh / 0.8 = 3.75 kWh into the battery, billed as 3.75 × 0.8 = 3 kWh:
        assert_abs_diff_eq!(step.residual_energy.0, 3.75);
        assert_abs_diff_eq!(step.import.0, 3.0);
        assert_abs_diff_eq!(step.cumulative_score.0, -30.0);
    }

    #[test]
    fn test_discharge_runs_at_rated_power_with_disincentive() {
        let step = single_step(
            &ideal_simulator(4.0),
            segment(0.0, 1.0, 20.0, 30.0),
            Action::discharge(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 1.0);
        assert_abs_diff_eq!(step.feed_in.0, 2.0);
        assert_abs_diff_eq!(step.cumulative_score.0, 36.0);
    }

    #[test]
    fn test_discharge_stops_at_min_soc() {
        let step = single_step(
            &ideal_simulator(2.0),
            segment(0.0, 0.0, 20.0, 30.0),
            Action::discharge(Percent(25), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 1.0);
        assert_abs_diff_eq!(step.feed_in.0, 1.0);
    }

    #[test]
    fn test_discharge_stores_solar_above_inverter_rating() {
        let step = single_step(
            &ideal_simulator(1.0),
            segment(5.0, 0.0, 20.0, 30.0),
            Action::discharge(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.residual_energy.0, 3.0);
        assert_abs_diff_eq!(step.feed_in.0, 3.0);
    }

    #[test]
    fn test_negative_feed_in_tariff_never_costs_money() {
        let step = single_step(
            &ideal_simulator(4.0),
            segment(3.0, 0.0, -5.0, 30.0),
            Action::self_use(Percent(0), Percent::HUNDRED),
        );
        assert_abs_diff_eq!(step.feed_in.0, 3.0);
        assert_abs_diff_eq!(step.feed_in_revenue.0, 0.0);
    }

    #[test]
    fn test_inherited_slots_repeat_the_previous_action() {
        let simulator = reference_simulator();
        let segments = &reference_segments()[..4];
        let charge = Action::charge(Percent(20), Percent(60));
        let sparse = Schedule::from(vec![None, Some(charge), None, None]);
        let initial = simulator.battery().initial_action();
        assert_eq!(
            simulator.simulate(segments, sparse.as_slice()),
            simulator.simulate(segments, &[initial, charge, charge, charge]),
        );
    }

    #[test]
    fn test_score_matches_trace() {
        let simulator = reference_simulator();
        let segments = reference_segments();
        let schedule = Schedule::inherit_all(segments.len());
        let trace = simulator.trace(&segments, schedule.as_slice());
        assert_eq!(trace.steps.len(), segments.len());
        assert_eq!(trace.score(), simulator.simulate(&segments, schedule.as_slice()));
    }

    #[test]
    fn test_simulation_is_pure() {
        let simulator = reference_simulator();
        let segments = reference_segments();
        let original_segments = segments.clone();
        let schedule = Schedule::from(vec![Some(Action::charge(Percent(20), Percent(80))); segments.len()]);
        let first = simulator.trace(&segments, schedule.as_slice());
        let second = simulator.trace(&segments, schedule.as_slice());
        assert_eq!(first, second);
        assert_eq!(segments, original_segments);
    }

    #[test]
    fn test_random_schedules_keep_battery_in_range() {
        let simulator = reference_simulator();
        let segments = reference_segments();
        let capacity = simulator.battery().capacity;
        let kinds = [ActionType::SelfUse, ActionType::Charge, ActionType::Discharge];
        let mut rng = fastrand::Rng::with_seed(42);

        for _ in 0..200 {
            let schedule: Vec<Option<Action>> = (0..segments.len())
                .map(|_| {
                    rng.bool().then(|| {
                        let min_soc = Percent(rng.u16(0..=100));
                        let max_soc = Percent(rng.u16(0..=100));
                        Action::new(kinds[rng.usize(..kinds.len())], min_soc, max_soc)
                    })
                })
                .collect();
            for step in simulator.trace(&segments, &schedule).steps {
                assert!(step.residual_energy >= KilowattHours::ZERO - TOLERANCE);
                assert!(step.residual_energy <= capacity + TOLERANCE);
            }
        }
    }

    #[test]
    #[should_panic(expected = "one slot per segment")]
    fn test_mismatched_lengths_panic() {
        let simulator = reference_simulator();
        let segments = reference_segments();
        let _ = simulator.simulate(&segments, Schedule::inherit_all(3).as_slice());
    }

    #[test]
    #[should_panic(expected = "physical range")]
    fn test_overfull_battery_panics() {
        let simulator = ideal_simulator(5.0);
        let _ = simulator.simulate(
            &[segment(1.0, 0.0, 0.0, 0.0)],
            &[Action::self_use(Percent(0), Percent::HUNDRED)],
        );
    }
}
