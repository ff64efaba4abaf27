pub mod metrics;
#[cfg(test)]
mod tests;

pub use metrics::*;

use crate::agent::{Action, Agent, InvalidAction};
use crate::config::{SimConfig, SimConfigError};
use crate::grid::{Collection, WorldGrid};
use crate::policy::{Policy, PolicyDisplay, PolicyError};
use crate::render::{FrameSink, RenderError};
use crate::vision::{self, Observation, VisionBounds};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Where the current tick is. A failed tick stays at the last phase it reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TickPhase {
    TickStart,
    VisionComputed,
    RewardResolved,
    ActionChosen,
    PositionUpdated,
    Rendered,
}

/// Render-ready snapshot of one completed tick.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub world_size: usize,
    pub reward_cells: Vec<[usize; 2]>,
    /// Cell where the reward was resolved this tick (the pre-move position).
    pub resolved_at: [usize; 2],
    /// Agent position after the move.
    pub agent: [usize; 2],
    /// Vision window around the post-move position.
    pub vision: VisionBounds,
    /// Observation the policy acted on this tick.
    pub observation: Observation,
    pub reward: u8,
    pub action: Action,
    pub policy_display: Option<PolicyDisplay>,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    InvalidAction(#[from] InvalidAction),
    #[error(transparent)]
    PolicyUnavailable(#[from] PolicyError),
    #[error("frame sink failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error("world grid is {actual} cells wide, config expects {expected}")]
    WorldSizeMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Signal,
    TickLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub ticks: u64,
    pub total_collected: u64,
    pub stopped_by: StopReason,
}

/// Sleeps until the next tick deadline. Falls back to "now" when a tick
/// overruns instead of trying to catch up.
#[derive(Debug)]
pub struct Pacer {
    interval: Option<Duration>,
    next: Instant,
}

impl Pacer {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    pub fn wait(&mut self) {
        let Some(interval) = self.interval else {
            return;
        };
        self.next += interval;
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
        } else {
            self.next = now;
        }
    }
}

pub struct Simulation<P: Policy> {
    config: SimConfig,
    world: WorldGrid,
    agent: Agent,
    policy: P,
    rng: ChaCha12Rng,
    tick: u64,
    phase: TickPhase,
    total_collected: u64,
    respawns_exhausted: u64,
}

impl<P: Policy> Simulation<P> {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    /// Build a simulation with rewards scattered from `config.seed`.
    pub fn new(config: SimConfig, policy: P) -> Result<Self, SimInitError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let world = if config.exact_reward_count {
            WorldGrid::scatter_exact(config.world_size, config.reward_count, &mut rng)
        } else {
            WorldGrid::scatter(config.world_size, config.reward_count, &mut rng)
        };
        info!(
            world_size = config.world_size,
            draws = config.reward_count,
            placed = world.reward_count(),
            "scattered rewards"
        );
        Ok(Self::assemble(config, world, policy, rng))
    }

    /// Build a simulation over a prepared grid. The RNG used for respawns is
    /// still seeded from `config.seed`.
    pub fn with_world(config: SimConfig, world: WorldGrid, policy: P) -> Result<Self, SimInitError> {
        config.validate()?;
        if world.size() != config.world_size {
            return Err(SimInitError::WorldSizeMismatch {
                expected: config.world_size,
                actual: world.size(),
            });
        }
        let rng = ChaCha12Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(config, world, policy, rng))
    }

    fn assemble(config: SimConfig, world: WorldGrid, policy: P, rng: ChaCha12Rng) -> Self {
        Self {
            agent: Agent::new(config.start),
            config,
            world,
            policy,
            rng,
            tick: 0,
            phase: TickPhase::TickStart,
            total_collected: 0,
            respawns_exhausted: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldGrid {
        &self.world
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Index of the next tick to run.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn total_collected(&self) -> u64 {
        self.total_collected
    }

    /// Run one tick: observe, resolve reward, query the policy, move.
    ///
    /// The reward is resolved at the position the agent occupies at the start
    /// of the tick, before it moves. If the policy fails or answers with an
    /// unknown code the tick stops there; the agent does not move and the tick
    /// counter does not advance.
    pub fn step(&mut self) -> Result<Frame, SimError> {
        self.phase = TickPhase::TickStart;
        let position = self.agent.position;
        let world_size = self.config.world_size;

        let observation = vision::extract(&self.world, position, self.config.vision_size);
        self.phase = TickPhase::VisionComputed;

        let collection =
            self.world
                .collect_and_respawn(position[0] as i64, position[1] as i64, &mut self.rng);
        if let Collection::Collected { respawned_at } = collection {
            self.total_collected += 1;
            match respawned_at {
                Some(at) => debug!(tick = self.tick, ?position, respawn = ?at, "collected reward"),
                None => {
                    self.respawns_exhausted += 1;
                    warn!(tick = self.tick, ?position, "no empty cell left to respawn into");
                }
            }
        }
        self.phase = TickPhase::RewardResolved;

        let reward = collection.signal();
        let code = self.policy.choose_action(&observation.flatten(), reward)?;
        self.phase = TickPhase::ActionChosen;

        let action = Action::try_from(code)?;
        self.agent.apply_move(action, world_size);
        self.phase = TickPhase::PositionUpdated;

        let frame = Frame {
            tick: self.tick,
            world_size,
            reward_cells: self.world.reward_cells().collect(),
            resolved_at: position,
            agent: self.agent.position,
            vision: VisionBounds::around(self.agent.position, self.config.vision_size, world_size),
            policy_display: self.policy.display_state(&observation),
            observation,
            reward,
            action,
        };
        self.tick += 1;
        Ok(frame)
    }

    /// Run one tick and hand its frame to `sink`.
    pub fn step_into<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SimError> {
        let frame = self.step()?;
        sink.present(&frame)?;
        self.phase = TickPhase::Rendered;
        Ok(())
    }

    /// Tick until `stop` is raised (checked between ticks) or `max_ticks`
    /// ticks have run, pacing to the configured tick rate.
    pub fn run<S: FrameSink + ?Sized>(
        &mut self,
        stop: &AtomicBool,
        sink: &mut S,
        max_ticks: Option<u64>,
    ) -> Result<RunOutcome, SimError> {
        let span = info_span!("run", seed = self.config.seed, tick_rate = self.config.tick_rate_hz);
        let _guard = span.enter();
        info!(start_tick = self.tick, ?max_ticks, "simulation started");

        let mut pacer = Pacer::new(self.config.tick_interval());
        let collected_before = self.total_collected;
        let mut ticks = 0u64;
        let stopped_by = loop {
            if stop.load(Ordering::Relaxed) {
                break StopReason::Signal;
            }
            if max_ticks.is_some_and(|limit| ticks >= limit) {
                break StopReason::TickLimit;
            }
            self.step_into(sink)?;
            ticks += 1;
            pacer.wait();
        };

        let outcome = RunOutcome {
            ticks,
            total_collected: self.total_collected - collected_before,
            stopped_by,
        };
        info!(
            ticks = outcome.ticks,
            collected = outcome.total_collected,
            ?stopped_by,
            "simulation stopped"
        );
        Ok(outcome)
    }

    /// Run `steps` unpaced ticks, sampling metrics every `sample_every` ticks
    /// and after the last one. Collection ticks are recorded for these steps
    /// only.
    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let collected_before = self.total_collected;
        let exhausted_before = self.respawns_exhausted;
        let initial_reward_count = self.world.reward_count();
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut collection_ticks = Vec::new();
        for step in 1..=steps {
            let frame = self.step()?;
            if frame.reward > 0 {
                collection_ticks.push(frame.tick);
            }
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step, &frame));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            steps,
            sample_every,
            initial_reward_count,
            final_reward_count: self.world.reward_count(),
            total_collected: self.total_collected - collected_before,
            respawns_exhausted: self.respawns_exhausted - exhausted_before,
            final_position: self.agent.position,
            samples,
            collection_ticks,
        })
    }
}
