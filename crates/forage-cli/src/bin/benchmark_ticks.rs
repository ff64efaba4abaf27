use anyhow::Result;
use forage_core::policy::NeuralPolicy;
use forage_core::{SimConfig, Simulation};
use std::time::Instant;

fn build(config: &SimConfig, hidden: usize) -> Result<Simulation<NeuralPolicy>> {
    let policy = NeuralPolicy::random(config.vision_size, hidden, 0.1, config.seed);
    Ok(Simulation::new(config.clone(), policy)?)
}

fn main() -> Result<()> {
    let config = SimConfig {
        world_size: 1000,
        vision_size: 15,
        reward_count: 40_000,
        tick_rate_hz: 0,
        seed: 42,
        ..SimConfig::default()
    };
    let hidden = 64;
    println!(
        "Benchmarking a {}x{} world, {} reward draws, vision {}, {} hidden units",
        config.world_size, config.world_size, config.reward_count, config.vision_size, hidden
    );

    let mut plain = build(&config, hidden)?;
    let mut sampled = build(&config, hidden)?;
    let net = plain.policy().net();
    println!(
        "Network: {} inputs, {} hidden, {} weights",
        net.input_size(),
        net.hidden_size(),
        net.to_weight_vec().len()
    );
    let steps = 20_000;

    // Run WITHOUT metrics
    let start = Instant::now();
    for _ in 0..steps {
        plain.step()?;
    }
    let duration_plain = start.elapsed();
    println!("Time for {} ticks WITHOUT metrics: {:?}", steps, duration_plain);
    println!("Avg time per tick (no metrics): {:?}", duration_plain / steps as u32);

    // Run WITH metrics (every tick)
    let start = Instant::now();
    let summary = sampled.run_experiment(steps, 1)?;
    let duration_metrics = start.elapsed();
    println!("Time for {} ticks WITH metrics: {:?}", steps, duration_metrics);
    println!("Avg time per tick (with metrics): {:?}", duration_metrics / steps as u32);
    println!(
        "Collected {} rewards, {} left on the grid",
        summary.total_collected, summary.final_reward_count
    );

    let diff = duration_metrics.saturating_sub(duration_plain);
    println!("Total metrics overhead: {:?}", diff);
    println!("Avg metrics overhead per tick: {:?}", diff / steps as u32);
    Ok(())
}
