use crate::quantity::{energy::KilowattHours, rate::KilowattHourRate};

/// Forecast for a single time slot.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSegment {
    /// DC solar energy produced during the slot.
    pub generation: KilowattHours,

    /// AC household load during the slot.
    pub consumption: KilowattHours,

    /// Paid per exported kilowatt-hour, may be zero or negative.
    pub feed_in_tariff: KilowattHourRate,

    /// Charged per imported kilowatt-hour, may be zero or negative.
    pub import_tariff: KilowattHourRate,
}

impl TimeSegment {
    /// Load expressed at the DC side of the inverter.
    pub fn consumption_dc(&self, discharging_efficiency: f64) -> KilowattHours {
        self.consumption / discharging_efficiency
    }

    /// Whether the solar generation alone covers the load.
    pub fn has_solar_surplus(&self, discharging_efficiency: f64) -> bool {
        self.generation > self.consumption_dc(discharging_efficiency)
    }
}
