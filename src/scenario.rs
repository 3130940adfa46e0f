//! Scenario file: hourly forecasts, tariffs, and the battery state.

use std::{fs, path::Path};

use itertools::{Itertools, izip};
use serde::Deserialize;

use crate::{
    core::{action::Action, battery::BatteryParameters, schedule::Schedule, segment::TimeSegment},
    prelude::*,
    quantity::{energy::KilowattHours, percent::Percent, rate::KilowattHourRate},
};

#[must_use]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub generation: Vec<KilowattHours>,
    pub consumption: Vec<KilowattHours>,
    pub feed_in_tariff: Vec<KilowattHourRate>,
    pub import_tariff: Vec<KilowattHourRate>,

    /// Current state of charge, `0..=1`.
    pub state_of_charge: f64,

    /// Repeat the columns to extend the horizon, for example a typical day to two days.
    #[serde(default = "Scenario::default_repeat")]
    pub repeat: usize,

    /// Sparse schedule to replay, everything else inherits.
    #[serde(default)]
    pub schedule: Vec<ScheduledAction>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct ScheduledAction {
    pub slot: usize,

    #[serde(flatten)]
    pub action: Action,
}

impl Scenario {
    const fn default_repeat() -> usize {
        1
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let scenario =
            Self::parse(&text).with_context(|| format!("invalid scenario `{}`", path.display()))?;
        info!(
            n_slots = scenario.n_slots(),
            state_of_charge = scenario.state_of_charge,
            n_scheduled = scenario.schedule.len(),
            "loaded the scenario",
        );
        Ok(scenario)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result {
        let n_hours = self.generation.len();
        ensure!(n_hours != 0, "the horizon is empty");
        ensure!(
            self.consumption.len() == n_hours
                && self.feed_in_tariff.len() == n_hours
                && self.import_tariff.len() == n_hours,
            "column lengths differ: generation {n_hours}, consumption {}, feed-in tariff {}, import tariff {}",
            self.consumption.len(),
            self.feed_in_tariff.len(),
            self.import_tariff.len(),
        );
        ensure!(self.repeat != 0, "`repeat` must be positive");

        for (hour, (generation, consumption)) in self.generation.iter().zip(&self.consumption).enumerate() {
            ensure!(
                generation.is_finite() && *generation >= KilowattHours::ZERO,
                "invalid generation at slot #{hour}: {generation}",
            );
            ensure!(
                consumption.is_finite() && *consumption >= KilowattHours::ZERO,
                "invalid consumption at slot #{hour}: {consumption}",
            );
        }
        ensure!(
            self.feed_in_tariff.iter().chain(&self.import_tariff).all(|rate| rate.is_finite()),
            "tariffs must be finite",
        );
        ensure!(
            (0.0..=1.0).contains(&self.state_of_charge),
            "state of charge must be within `0..=1`, got {}",
            self.state_of_charge,
        );

        let n_slots = self.n_slots();
        for scheduled in &self.schedule {
            ensure!(
                scheduled.slot < n_slots,
                "scheduled slot #{} is beyond the horizon of {n_slots} slots",
                scheduled.slot,
            );
            ensure!(
                scheduled.action.min_soc <= Percent::HUNDRED
                    && scheduled.action.max_soc <= Percent::HUNDRED,
                "invalid state of charge bounds at slot #{}",
                scheduled.slot,
            );
        }
        if let Some(slot) = self.schedule.iter().map(|scheduled| scheduled.slot).duplicates().next() {
            bail!("slot #{slot} is scheduled more than once");
        }

        Ok(())
    }

    pub const fn n_slots(&self) -> usize {
        self.generation.len() * self.repeat
    }

    pub fn segments(&self) -> Vec<TimeSegment> {
        let day = izip!(&self.generation, &self.consumption, &self.feed_in_tariff, &self.import_tariff)
            .map(|(generation, consumption, feed_in_tariff, import_tariff)| TimeSegment {
                generation: *generation,
                consumption: *consumption,
                feed_in_tariff: *feed_in_tariff,
                import_tariff: *import_tariff,
            })
            .collect_vec();
        day.iter().copied().cycle().take(self.n_slots()).collect()
    }

    pub fn schedule(&self) -> Schedule {
        let mut schedule = Schedule::inherit_all(self.n_slots());
        for scheduled in &self.schedule {
            schedule[scheduled.slot] = Some(scheduled.action);
        }
        schedule
    }

    pub fn residual_energy(&self, battery: &BatteryParameters) -> KilowattHours {
        battery.capacity * self.state_of_charge
    }
}
