use crate::cli::VelocityArgs;
use epicflow::progress::calculate_velocity;
use epicflow::state::load_history;

pub fn execute(args: VelocityArgs) -> anyhow::Result<()> {
    if !args.history.exists() {
        anyhow::bail!("History file not found: {:?}", args.history);
    }
    let history = load_history(&args.history)?;
    let velocity = calculate_velocity(&history);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&velocity)?);
        return Ok(());
    }

    println!("Samples:   {}", velocity.samples);
    println!("Rate:      {:.2}%/hour", velocity.rate_per_hour);
    println!("Trend:     {}", velocity.trend);
    match velocity.estimated_completion {
        Some(eta) => println!("Estimated: {}", eta.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Estimated: n/a (no forward progress)"),
    }
    Ok(())
}
