//! Battery and simulation CLI arguments.

use clap::Parser;

use crate::{
    core::{
        battery::{BatteryEfficiency, BatteryParameters},
        simulator::Simulator,
    },
    prelude::*,
    quantity::{
        energy::KilowattHours,
        percent::Percent,
        power::Kilowatts,
        rate::KilowattHourRate,
        time::Hours,
    },
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct BatteryArgs {
    /// Usable battery capacity in kilowatt-hours.
    #[clap(long = "battery-capacity-kwh", default_value = "4.2", env = "BATTERY_CAPACITY_KWH")]
    pub capacity: KilowattHours,

    #[clap(
        long = "battery-charging-efficiency",
        default_value = "0.95",
        env = "BATTERY_CHARGING_EFFICIENCY"
    )]
    pub charging_efficiency: f64,

    #[clap(
        long = "battery-discharging-efficiency",
        default_value = "0.95",
        env = "BATTERY_DISCHARGING_EFFICIENCY"
    )]
    pub discharging_efficiency: f64,

    /// Rated inverter power in kilowatts.
    #[clap(long = "inverter-power-kilowatts", default_value = "3", env = "INVERTER_POWER_KILOWATTS")]
    pub inverter_power: Kilowatts,

    /// Minimal state-of-charge percent the plan may discharge to.
    #[clap(long = "min-soc-percent", default_value = "20", env = "MIN_SOC_PERCENT")]
    pub min_soc: Percent,
}

impl BatteryArgs {
    pub fn parameters(&self) -> Result<BatteryParameters> {
        BatteryParameters::builder()
            .capacity(self.capacity)
            .efficiency(BatteryEfficiency {
                charging: self.charging_efficiency,
                discharging: self.discharging_efficiency,
            })
            .inverter_power(self.inverter_power)
            .min_soc(self.min_soc)
            .build()
            .context("invalid battery parameters")
    }
}

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct SimulatorArgs {
    /// Slot duration in hours.
    #[clap(long = "slot-duration-hours", default_value = "1", env = "SLOT_DURATION_HOURS")]
    pub segment_duration: Hours,

    /// Export rate penalty while force-discharging.
    #[clap(long = "discharge-disincentive", default_value = "2", env = "DISCHARGE_DISINCENTIVE")]
    pub discharge_disincentive: KilowattHourRate,
}

impl SimulatorArgs {
    pub fn simulator(
        &self,
        battery: BatteryParameters,
        initial_residual_energy: KilowattHours,
    ) -> Result<Simulator> {
        ensure!(
            self.segment_duration.is_finite() && self.segment_duration > Hours::ZERO,
            "invalid slot duration: {}",
            self.segment_duration,
        );
        ensure!(
            self.discharge_disincentive.is_finite(),
            "invalid discharge disincentive: {}",
            self.discharge_disincentive,
        );
        Ok(Simulator::builder()
            .battery(battery)
            .initial_residual_energy(initial_residual_energy)
            .segment_duration(self.segment_duration)
            .discharge_disincentive(self.discharge_disincentive)
            .build())
    }
}
