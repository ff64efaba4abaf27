use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use forage_core::policy::{NeuralPolicy, Policy, RandomPolicy, SeekerPolicy};
use forage_core::render::{FrameSink, JsonLinesSink, NullSink, TextRenderer};
use forage_core::simulation::RunOutcome;
use forage_core::{SimConfig, Simulation};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    Neural,
    Seeker,
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DisplayKind {
    Text,
    Json,
    Off,
}

/// Run a single agent foraging on a wrap-around grid.
#[derive(Parser, Debug)]
#[command(name = "forage", version)]
struct Args {
    /// JSON file with runtime parameters; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    world_size: Option<usize>,
    #[arg(long)]
    vision_size: Option<usize>,
    /// Reward draws scattered at startup.
    #[arg(long)]
    rewards: Option<usize>,
    /// Ticks per second; 0 runs as fast as possible.
    #[arg(long)]
    tick_rate: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Place exactly the requested number of rewards at distinct cells.
    #[arg(long)]
    exact_rewards: bool,
    #[arg(long, value_enum, default_value_t = PolicyKind::Neural)]
    policy: PolicyKind,
    /// Hidden units of the neural policy.
    #[arg(long, default_value_t = 16)]
    hidden: usize,
    /// Exploration rate of the neural policy.
    #[arg(long, default_value_t = 0.1)]
    epsilon: f32,
    /// Stop after this many ticks instead of waiting for Ctrl-C.
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long, value_enum, default_value_t = DisplayKind::Text)]
    display: DisplayKind,
    /// Side of the text viewport around the agent.
    #[arg(long, default_value_t = 40)]
    view: usize,
    /// Write a JSON report of the session here on exit.
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SessionReport {
    config: SimConfig,
    outcome: RunOutcome,
    final_reward_count: usize,
    final_position: [usize; 2],
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(world_size) = args.world_size {
        config.world_size = world_size;
    }
    if let Some(vision_size) = args.vision_size {
        config.vision_size = vision_size;
    }
    if let Some(rewards) = args.rewards {
        config.reward_count = rewards;
    }
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate_hz = tick_rate;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.exact_rewards {
        config.exact_reward_count = true;
    }
    config.validate().context("invalid runtime parameters")?;
    Ok(config)
}

fn build_policy(args: &Args, config: &SimConfig) -> Box<dyn Policy> {
    // Policies draw from their own streams so swapping one does not shift the world's.
    let seed = config.seed.wrapping_add(0x5EED);
    match args.policy {
        PolicyKind::Neural => Box::new(NeuralPolicy::random(
            config.vision_size,
            args.hidden,
            args.epsilon,
            seed,
        )),
        PolicyKind::Seeker => Box::new(SeekerPolicy::new(seed)),
        PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
    }
}

fn build_sink(args: &Args) -> Box<dyn FrameSink> {
    match args.display {
        DisplayKind::Text => Box::new(
            TextRenderer::new(io::stdout())
                .with_view(args.view)
                .with_clear_screen(true),
        ),
        DisplayKind::Json => Box::new(JsonLinesSink::new(io::stdout())),
        DisplayKind::Off => Box::new(NullSink),
    }
}

fn write_report(path: &Path, report: &SessionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))
}

fn run_session(args: &Args, config: SimConfig, stop: &AtomicBool) -> Result<SessionReport> {
    let policy = build_policy(args, &config);
    let mut sink = build_sink(args);
    let mut sim = Simulation::new(config, policy)?;
    let outcome = sim.run(stop, sink.as_mut(), args.ticks)?;
    Ok(SessionReport {
        config: sim.config().clone(),
        outcome,
        final_reward_count: sim.world().reward_count(),
        final_position: sim.agent().position,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        world_size = config.world_size,
        vision_size = config.vision_size,
        rewards = config.reward_count,
        tick_rate = config.tick_rate_hz,
        seed = config.seed,
        policy = ?args.policy,
        "starting forage session"
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C: stopping after the current tick");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let summary_path = args.summary.clone();
    let report = tokio::task::spawn_blocking(move || run_session(&args, config, &stop))
        .await
        .context("simulation thread panicked")??;

    info!(
        ticks = report.outcome.ticks,
        collected = report.outcome.total_collected,
        "session finished"
    );
    if let Some(path) = summary_path {
        write_report(&path, &report)?;
    }
    Ok(())
}
