use crate::{
    cli::PlanArgs,
    core::optimizer::Optimizer,
    prelude::*,
    scenario::Scenario,
    tables::{build_plan_table, build_trace_table},
};

#[instrument(skip_all)]
pub fn plan(args: &PlanArgs) -> Result {
    let scenario = Scenario::read_from(&args.scenario.path)?;
    let battery = args.battery.parameters()?;
    let simulator = args.simulator.simulator(battery, scenario.residual_energy(&battery))?;
    let settings = args.optimizer.settings()?;
    let segments = scenario.segments();

    let plan = Optimizer::builder().simulator(&simulator).settings(&settings).build().optimize(&segments);
    let current_action = plan.current_action().context("the plan is empty")?;
    info!(
        score = %plan.score(),
        search_score = %plan.search_score,
        feed_in = %plan.trace.total_feed_in(),
        import = %plan.trace.total_import(),
        n_simulations = plan.n_simulations,
        seed = settings.seed,
        "planned",
    );

    if args.trace {
        println!("{}", build_trace_table(&segments, &plan.trace));
    }
    println!("{}", build_plan_table(&plan.actions));
    println!("Current action: {current_action}");
    Ok(())
}
