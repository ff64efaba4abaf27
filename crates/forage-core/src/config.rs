use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime parameters, fixed for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the square toroidal grid, in cells.
    pub world_size: usize,
    /// Pixels per cell for pixel renderers. The text renderer ignores it.
    pub cell_scale: u32,
    /// Side length of the agent's vision window. Must be odd.
    pub vision_size: usize,
    /// Number of reward draws made when the grid is initialized.
    pub reward_count: usize,
    /// Target ticks per second; 0 runs unpaced.
    pub tick_rate_hz: u32,
    /// Agent start position, in cells.
    pub start: [usize; 2],
    pub seed: u64,
    /// Place exactly `min(reward_count, world_size²)` rewards at distinct
    /// cells instead of scattering `reward_count` independent draws.
    pub exact_reward_count: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_size: 100,
            cell_scale: 5,
            vision_size: 7,
            reward_count: 400,
            tick_rate_hz: 10,
            start: [1, 1],
            seed: 42,
            exact_reward_count: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimConfigError {
    #[error("world_size must be positive")]
    InvalidWorldSize,
    #[error("world_size ({actual}) exceeds supported maximum ({max})")]
    WorldSizeTooLarge { max: usize, actual: usize },
    #[error("cell_scale must be positive")]
    InvalidCellScale,
    #[error("vision_size must be a positive odd number, got {0}")]
    InvalidVisionSize(usize),
    #[error("start position ({x}, {y}) lies outside a {world_size}x{world_size} grid")]
    StartOutOfBounds { x: usize, y: usize, world_size: usize },
}

impl SimConfig {
    pub const MAX_WORLD_SIZE: usize = 4096;

    /// Seconds between ticks, or `None` when pacing is disabled.
    pub fn tick_interval(&self) -> Option<std::time::Duration> {
        (self.tick_rate_hz > 0)
            .then(|| std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64))
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        if self.world_size == 0 {
            return Err(SimConfigError::InvalidWorldSize);
        }
        if self.world_size > Self::MAX_WORLD_SIZE {
            return Err(SimConfigError::WorldSizeTooLarge {
                max: Self::MAX_WORLD_SIZE,
                actual: self.world_size,
            });
        }
        if self.cell_scale == 0 {
            return Err(SimConfigError::InvalidCellScale);
        }
        if self.vision_size == 0 || self.vision_size % 2 == 0 {
            return Err(SimConfigError::InvalidVisionSize(self.vision_size));
        }
        let [x, y] = self.start;
        if x >= self.world_size || y >= self.world_size {
            return Err(SimConfigError::StartOutOfBounds {
                x,
                y,
                world_size: self.world_size,
            });
        }
        Ok(())
    }
}
