use super::{Frame, SimError, Simulation};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub tick: u64,
    pub reward_count: usize,
    pub total_collected: u64,
    /// Collections per tick since the start of the simulation.
    pub collection_rate: f32,
    pub agent_x: usize,
    pub agent_y: usize,
    pub visible_rewards: usize,
    pub respawns_exhausted: u64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub initial_reward_count: usize,
    pub final_reward_count: usize,
    pub total_collected: u64,
    #[serde(default)]
    pub respawns_exhausted: u64,
    pub final_position: [usize; 2],
    pub samples: Vec<StepMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_ticks: Vec<u64>,
}

impl RunSummary {
    /// Mean ticks between consecutive collections, if at least two happened.
    pub fn mean_collection_interval(&self) -> Option<f64> {
        if self.collection_ticks.len() < 2 {
            return None;
        }
        let first = self.collection_ticks[0];
        let last = self.collection_ticks[self.collection_ticks.len() - 1];
        Some((last - first) as f64 / (self.collection_ticks.len() - 1) as f64)
    }
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
    #[error("tick failed: {0}")]
    Tick(#[from] SimError),
}

impl<P: Policy> Simulation<P> {
    pub(crate) fn collect_step_metrics(&self, step: usize, frame: &Frame) -> StepMetrics {
        let ticks_run = self.tick.max(1);
        StepMetrics {
            step,
            tick: frame.tick,
            reward_count: self.world.reward_count(),
            total_collected: self.total_collected,
            collection_rate: self.total_collected as f32 / ticks_run as f32,
            agent_x: frame.agent[0],
            agent_y: frame.agent[1],
            visible_rewards: frame.observation.reward_count(),
            respawns_exhausted: self.respawns_exhausted,
        }
    }
}
