use crate::{
    cli::SimulateArgs,
    core::schedule::Schedule,
    prelude::*,
    scenario::Scenario,
    tables::build_trace_table,
};

#[instrument(skip_all)]
pub fn simulate(args: &SimulateArgs) -> Result {
    let scenario = Scenario::read_from(&args.scenario.path)?;
    let battery = args.battery.parameters()?;
    let simulator = args.simulator.simulator(battery, scenario.residual_energy(&battery))?;
    let segments = scenario.segments();

    let trace = simulator.trace(&segments, scenario.schedule().as_slice());
    let trivial_score = simulator.simulate(&segments, Schedule::inherit_all(segments.len()).as_slice());
    info!(
        score = %trace.score(),
        %trivial_score,
        feed_in = %trace.total_feed_in(),
        import = %trace.total_import(),
        "simulated",
    );

    println!("{}", build_trace_table(&segments, &trace));
    println!("Score: {} (self-use only: {trivial_score})", trace.score());
    Ok(())
}
