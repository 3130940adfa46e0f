//! Shared test data: a typical autumn day with a cheap night window and an expensive early evening.

use crate::{
    core::{battery::BatteryParameters, segment::TimeSegment, simulator::Simulator},
    quantity::{energy::KilowattHours, rate::KilowattHourRate},
};

pub const GENERATION: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.05, 0.15, 0.72, 2.04, 2.33, 2.27, 2.35, 2.1, 1.94, 1.26, 0.75,
    1.26, 0.11, 0.06, 0.0, 0.0, 0.0, 0.0,
];

pub const CONSUMPTION: [f64; 24] = [
    0.2, 0.4, 0.2, 0.2, 0.2, 0.31, 0.25, 0.41, 0.32, 0.32, 0.29, 0.4, 0.57, 0.53, 0.82, 0.32, 0.32,
    0.22, 0.11, 0.45, 0.2, 0.1, 0.2, 0.2,
];

/// Cheap at 02:00–05:00, expensive at 16:00–19:00.
pub fn import_tariff(hour: usize) -> f64 {
    match hour {
        2..=4 => 18.43,
        16..=18 => 43.01,
        _ => 30.72,
    }
}

pub fn feed_in_tariff(hour: usize) -> f64 {
    match hour {
        2..=4 => 7.43,
        16..=18 => 32.01,
        _ => 19.72,
    }
}

pub fn segment(
    generation: f64,
    consumption: f64,
    feed_in_tariff: f64,
    import_tariff: f64,
) -> TimeSegment {
    TimeSegment {
        generation: KilowattHours::from(generation),
        consumption: KilowattHours::from(consumption),
        feed_in_tariff: KilowattHourRate::from(feed_in_tariff),
        import_tariff: KilowattHourRate::from(import_tariff),
    }
}

/// Two days of the same pattern.
pub fn reference_segments() -> Vec<TimeSegment> {
    (0..48)
        .map(|slot| {
            let hour = slot % 24;
            segment(GENERATION[hour], CONSUMPTION[hour], feed_in_tariff(hour), import_tariff(hour))
        })
        .collect()
}

/// Default battery with 2 kWh stored.
pub fn reference_simulator() -> Simulator {
    Simulator::builder()
        .battery(BatteryParameters::default())
        .initial_residual_energy(KilowattHours::from(2.0))
        .build()
}

/// No solar, no price differences: there is nothing to gain from the battery.
pub fn flat_segments(n_slots: usize) -> Vec<TimeSegment> {
    (0..n_slots).map(|_| segment(0.0, 0.3, 10.0, 25.0)).collect()
}
