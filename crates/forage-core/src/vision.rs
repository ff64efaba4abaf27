use crate::grid::{Cell, WorldGrid};
use serde::{Deserialize, Serialize};

/// Square window of cells centered on the agent, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    size: usize,
    cells: Vec<Cell>,
}

/// World-space placement of a vision window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionBounds {
    /// Wrapped world coordinate of the window's top-left cell.
    pub origin: [usize; 2],
    pub size: usize,
    pub world_size: usize,
}

impl VisionBounds {
    pub fn around(center: [usize; 2], size: usize, world_size: usize) -> Self {
        let half = (size / 2) as i64;
        let n = world_size as i64;
        let origin = [
            (center[0] as i64 - half).rem_euclid(n) as usize,
            (center[1] as i64 - half).rem_euclid(n) as usize,
        ];
        Self {
            origin,
            size,
            world_size,
        }
    }

    /// Wrapped world coordinates covered by the window, row by row.
    pub fn cells(&self) -> impl Iterator<Item = [usize; 2]> + '_ {
        (0..self.size).flat_map(move |i| {
            (0..self.size).map(move |j| {
                [
                    (self.origin[0] + j) % self.world_size,
                    (self.origin[1] + i) % self.world_size,
                ]
            })
        })
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        let dx = (x + self.world_size - self.origin[0] % self.world_size) % self.world_size;
        let dy = (y + self.world_size - self.origin[1] % self.world_size) % self.world_size;
        dx < self.size && dy < self.size
    }
}

/// Extract the `size × size` window centered on `center`.
///
/// Cell `(i, j)` is `world.read(center.x - half + j, center.y - half + i)`
/// with `half = size / 2`. For even sizes the agent sits at `(half, half)`,
/// which is the bottom-right of the four central cells.
pub fn extract(world: &WorldGrid, center: [usize; 2], size: usize) -> Observation {
    let half = (size / 2) as i64;
    let (cx, cy) = (center[0] as i64, center[1] as i64);
    let mut cells = Vec::with_capacity(size * size);
    for i in 0..size as i64 {
        for j in 0..size as i64 {
            cells.push(world.read(cx - half + j, cy - half + i));
        }
    }
    Observation { size, cells }
}

impl Observation {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        assert!(row < self.size && col < self.size, "observation index out of range");
        self.cells[row * self.size + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.size.max(1))
    }

    /// Row-major `0/1` sequence handed to policies.
    pub fn flatten(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.as_u8()).collect()
    }

    pub fn reward_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Reward).count()
    }

    /// Cell under the agent.
    pub fn center(&self) -> Option<Cell> {
        (self.size > 0).then(|| self.get(self.size / 2, self.size / 2))
    }
}
