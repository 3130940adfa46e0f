use average::Mean;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::{action::Action, segment::TimeSegment, trace::Trace},
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn mean_rate(rates: impl Iterator<Item = KilowattHourRate>) -> KilowattHourRate {
    let estimate: Mean = rates.map(|rate| rate.0).collect();
    if estimate.is_empty() { KilowattHourRate::ZERO } else { estimate.mean().into() }
}

fn rate_cell(rate: KilowattHourRate, mean: KilowattHourRate) -> Cell {
    Cell::new(rate)
        .set_alignment(CellAlignment::Right)
        .fg(if rate >= mean { Color::Red } else { Color::Green })
}

/// Actionable plan, consecutive equal actions are merged into periods.
pub fn build_plan_table(actions: &[Action]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Start", "End", "Action", "Min SoC", "Max SoC"]);
    let periods = actions.iter().enumerate().chunk_by(|(_, action)| **action);
    for (action, period) in &periods {
        let slots = period.map(|(slot, _)| slot).collect_vec();
        let (Some(start), Some(end)) = (slots.first(), slots.last()) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(format!("#{start}")),
            Cell::new(format!("#{end}")).add_attribute(Attribute::Dim),
            Cell::new(action.kind).fg(action.kind.color()),
            Cell::new(action.min_soc).set_alignment(CellAlignment::Right),
            Cell::new(action.max_soc).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Slot-by-slot simulation.
pub fn build_trace_table(segments: &[TimeSegment], trace: &Trace) -> Table {
    let mean_feed_in_rate = mean_rate(segments.iter().map(|segment| segment.feed_in_tariff));
    let mean_import_rate = mean_rate(segments.iter().map(|segment| segment.import_tariff));

    let mut table = new_table();
    table.set_header(vec![
        "Slot", "Solar", "Load", "Feed-in", "Import", "Action", "Residual", "SoC", "Export",
        "Import", "Score",
    ]);
    for (slot, (segment, step)) in segments.iter().zip(&trace.steps).enumerate() {
        table.add_row(vec![
            Cell::new(format!("#{slot}")).add_attribute(Attribute::Dim),
            Cell::new(segment.generation).set_alignment(CellAlignment::Right),
            Cell::new(segment.consumption).set_alignment(CellAlignment::Right),
            rate_cell(segment.feed_in_tariff, mean_feed_in_rate),
            rate_cell(segment.import_tariff, mean_import_rate),
            Cell::new(step.action).fg(step.action.kind.color()),
            Cell::new(step.residual_energy).set_alignment(CellAlignment::Right),
            Cell::new(step.state_of_charge).set_alignment(CellAlignment::Right),
            Cell::new(step.feed_in).set_alignment(CellAlignment::Right).fg(
                if step.feed_in > KilowattHours::ZERO { Color::Green } else { Color::Reset },
            ),
            Cell::new(step.import).set_alignment(CellAlignment::Right).fg(
                if step.import > KilowattHours::ZERO { Color::Red } else { Color::Reset },
            ),
            Cell::new(step.cumulative_score).set_alignment(CellAlignment::Right).fg(
                if step.cumulative_score >= Cost::ZERO { Color::Green } else { Color::Red },
            ),
        ]);
    }
    table
}
