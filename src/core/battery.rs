use bon::bon;

use crate::{
    core::action::Action,
    prelude::*,
    quantity::{energy::KilowattHours, percent::Percent, power::Kilowatts},
};

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct BatteryEfficiency {
    /// AC to DC conversion efficiency while charging from the grid, `0..=1`.
    pub charging: f64,

    /// DC to AC conversion efficiency of the inverter output, `0..=1`.
    pub discharging: f64,
}

impl BatteryEfficiency {
    #[cfg(test)]
    pub const IDEAL: Self = Self { charging: 1.0, discharging: 1.0 };
}

/// Physical battery and inverter model.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct BatteryParameters {
    pub capacity: KilowattHours,
    pub efficiency: BatteryEfficiency,

    /// Rated inverter power, limits both the forced discharging and the grid charging.
    pub inverter_power: Kilowatts,

    /// Lowest state of charge the planner may choose to discharge to.
    pub min_soc: Percent,
}

#[bon]
impl BatteryParameters {
    #[builder]
    pub fn new(
        capacity: KilowattHours,
        efficiency: BatteryEfficiency,
        inverter_power: Kilowatts,
        min_soc: Percent,
    ) -> Result<Self> {
        ensure!(
            capacity.is_finite() && capacity > KilowattHours::ZERO,
            "invalid battery capacity: {capacity}",
        );
        for (name, value) in [("charging", efficiency.charging), ("discharging", efficiency.discharging)] {
            ensure!(
                value.is_finite() && value > 0.0 && value <= 1.0,
                "invalid {name} efficiency: {value}",
            );
        }
        ensure!(
            inverter_power.is_finite() && inverter_power > Kilowatts::ZERO,
            "invalid inverter power: {inverter_power}",
        );
        ensure!(min_soc <= Percent::HUNDRED, "invalid minimum state of charge: {min_soc}");
        Ok(Self { capacity, efficiency, inverter_power, min_soc })
    }
}

impl BatteryParameters {
    /// Action the battery is assumed to follow before the first explicit one.
    pub const fn initial_action(&self) -> Action {
        Action::self_use(self.min_soc, Percent::HUNDRED)
    }

    /// Residual energy at the given state of charge.
    pub fn energy_at(&self, soc: Percent) -> KilowattHours {
        self.capacity * soc
    }

    /// State of charge as a `0..=1` proportion.
    pub fn soc_of(&self, residual_energy: KilowattHours) -> f64 {
        residual_energy / self.capacity
    }
}

impl Default for BatteryParameters {
    /// 4.2 kWh battery behind a 3 kW hybrid inverter.
    fn default() -> Self {
        Self {
            capacity: KilowattHours::from(4.2),
            efficiency: BatteryEfficiency { charging: 0.95, discharging: 0.95 },
            inverter_power: Kilowatts::from(3.0),
            min_soc: Percent(20),
        }
    }
}
