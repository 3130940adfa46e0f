mod battery;
mod optimizer;
mod plan;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use self::{plan::plan, simulate::simulate};
use crate::cli::{
    battery::{BatteryArgs, SimulatorArgs},
    optimizer::OptimizerArgs,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: optimize the battery schedule for the scenario and print the plan.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Replay the scenario's own schedule through the simulator.
    #[clap(name = "simulate")]
    Simulate(Box<SimulateArgs>),
}

#[derive(Parser)]
pub struct ScenarioArgs {
    /// Scenario TOML file with the hourly forecasts and tariffs.
    #[clap(env = "SCENARIO_PATH")]
    pub path: PathBuf,
}

#[derive(Parser)]
pub struct PlanArgs {
    #[clap(flatten)]
    pub scenario: ScenarioArgs,

    /// Also print the simulation of the whole horizon.
    #[clap(long)]
    pub trace: bool,

    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub simulator: SimulatorArgs,

    #[clap(flatten)]
    pub optimizer: OptimizerArgs,
}

#[derive(Parser)]
pub struct SimulateArgs {
    #[clap(flatten)]
    pub scenario: ScenarioArgs,

    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub simulator: SimulatorArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::core::action::ActionType;

    #[test]
    fn test_verify_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_plan_defaults() {
        let args = Args::try_parse_from(["suncharge", "plan", "scenario.toml"]).unwrap();
        let Command::Plan(args) = args.command else {
            panic!("expected the plan command");
        };
        let settings = args.optimizer.settings().unwrap();
        assert_eq!(settings.n_restarts, 10);
        assert_eq!(settings.fill_factors, [1, 4, 8]);
        assert_eq!(settings.action_types.len(), 3);
        assert!(settings.shock);

        let battery = args.battery.parameters().unwrap();
        assert_eq!(battery.min_soc.0, 20);
    }

    #[test]
    fn test_plan_overrides() {
        let args = Args::try_parse_from([
            "suncharge",
            "plan",
            "scenario.toml",
            "--action-types",
            "self-use,charge",
            "--no-shock",
            "--seed",
            "42",
        ])
        .unwrap();
        let Command::Plan(args) = args.command else {
            panic!("expected the plan command");
        };
        let settings = args.optimizer.settings().unwrap();
        assert!(!settings.action_types.contains(ActionType::Discharge));
        assert!(!settings.shock);
        assert_eq!(settings.seed, 42);
    }
}
