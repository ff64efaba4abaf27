//! Toroidal reward grid.
//!
//! Every coordinate passed in is reduced with Euclidean modulo before lookup,
//! so negative and out-of-range values address the wrapped cell.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Reward,
}

impl Cell {
    /// Wire value handed to policies: 0 empty, 1 reward.
    pub fn as_u8(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Reward => 1,
        }
    }
}

/// Outcome of resolving a reward at a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Nothing,
    /// `respawned_at` is `None` only when no empty cell was left to respawn into.
    Collected { respawned_at: Option<[usize; 2]> },
}

impl Collection {
    pub fn collected(&self) -> bool {
        matches!(self, Collection::Collected { .. })
    }

    /// Reward signal for the policy.
    pub fn signal(&self) -> u8 {
        u8::from(self.collected())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldGrid {
    size: usize,
    cells: Vec<Cell>,
    rewards: usize,
}

impl WorldGrid {
    /// Empty `size × size` grid.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero. `SimConfig::validate` rejects that before a
    /// simulation builds its grid; [`WorldGrid::scatter`] and
    /// [`WorldGrid::scatter_exact`] panic the same way.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "grid size must be positive");
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
            rewards: 0,
        }
    }

    /// Scatter `draws` rewards over independently drawn cells. Draws that land
    /// on an already rewarded cell collapse, so the final count can be lower
    /// than `draws`.
    pub fn scatter<R: Rng + ?Sized>(size: usize, draws: usize, rng: &mut R) -> Self {
        let mut grid = Self::new(size);
        for _ in 0..draws {
            let x = rng.random_range(0..size);
            let y = rng.random_range(0..size);
            grid.set(x, y, Cell::Reward);
        }
        grid
    }

    /// Place exactly `min(count, size²)` rewards at distinct cells.
    pub fn scatter_exact<R: Rng + ?Sized>(size: usize, count: usize, rng: &mut R) -> Self {
        let mut grid = Self::new(size);
        let target = count.min(size * size);
        while grid.rewards < target {
            if grid.spawn_reward(rng).is_none() {
                break;
            }
        }
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn reward_count(&self) -> usize {
        self.rewards
    }

    pub fn is_full(&self) -> bool {
        self.rewards == self.cells.len()
    }

    /// Reduce any integer coordinate pair onto the grid.
    pub fn wrap(&self, x: i64, y: i64) -> [usize; 2] {
        let n = self.size as i64;
        [x.rem_euclid(n) as usize, y.rem_euclid(n) as usize]
    }

    pub fn read(&self, x: i64, y: i64) -> Cell {
        let [cx, cy] = self.wrap(x, y);
        self.cells[self.index(cx, cy)]
    }

    /// Reward cells as `[x, y]`, in row-major order.
    pub fn reward_cells(&self) -> impl Iterator<Item = [usize; 2]> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Cell::Reward)
            .map(|(idx, _)| [idx % self.size, idx / self.size])
    }

    /// Put a reward on the wrapped cell. Used to set up a world before a run.
    pub fn place_reward(&mut self, x: i64, y: i64) {
        let [cx, cy] = self.wrap(x, y);
        self.set(cx, cy, Cell::Reward);
    }

    /// Clear the reward at the wrapped cell, if any, and respawn one at a
    /// random empty cell in the same call.
    pub fn collect_and_respawn<R: Rng + ?Sized>(
        &mut self,
        x: i64,
        y: i64,
        rng: &mut R,
    ) -> Collection {
        let [cx, cy] = self.wrap(x, y);
        if self.cells[self.index(cx, cy)] != Cell::Reward {
            return Collection::Nothing;
        }
        self.set(cx, cy, Cell::Empty);
        Collection::Collected {
            respawned_at: self.spawn_reward(rng),
        }
    }

    /// Set a reward on a uniformly random empty cell.
    ///
    /// Draws cells and rejects occupied ones. After `4 × size²` rejections the
    /// empty cells are enumerated and one is picked directly, so a nearly full
    /// grid still terminates. Returns `None` and leaves the grid alone when
    /// every cell already holds a reward.
    pub fn spawn_reward<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<[usize; 2]> {
        if self.is_full() {
            return None;
        }
        let max_rejections = self.cells.len().saturating_mul(4);
        for _ in 0..max_rejections {
            let x = rng.random_range(0..self.size);
            let y = rng.random_range(0..self.size);
            if self.cells[self.index(x, y)] == Cell::Empty {
                self.set(x, y, Cell::Reward);
                return Some([x, y]);
            }
        }

        let empty: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Cell::Empty)
            .map(|(idx, _)| idx)
            .collect();
        let idx = empty[rng.random_range(0..empty.len())];
        let (x, y) = (idx % self.size, idx / self.size);
        self.set(x, y, Cell::Reward);
        Some([x, y])
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    fn set(&mut self, x: usize, y: usize, value: Cell) {
        let idx = self.index(x, y);
        let old = self.cells[idx];
        if old == value {
            return;
        }
        self.cells[idx] = value;
        match value {
            Cell::Reward => self.rewards += 1,
            Cell::Empty => self.rewards -= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha12Rng;

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(7)
    }

    /// Always draws the lowest value, so every sampled cell is (0, 0).
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn full_except(size: usize, empty: &[[usize; 2]]) -> WorldGrid {
        let mut grid = WorldGrid::new(size);
        for y in 0..size {
            for x in 0..size {
                if !empty.contains(&[x, y]) {
                    grid.place_reward(x as i64, y as i64);
                }
            }
        }
        grid
    }

    #[test]
    fn wraps_coordinates_toroidally() {
        let mut grid = WorldGrid::new(10);
        grid.place_reward(9, 9);
        assert_eq!(grid.read(-1, -1), Cell::Reward);
        assert_eq!(grid.read(19, 19), Cell::Reward);
        assert_eq!(grid.read(9, -11), Cell::Reward);
        assert_eq!(grid.read(8, 9), Cell::Empty);
    }

    #[test]
    fn read_is_periodic_in_both_axes() {
        let grid = WorldGrid::scatter(7, 15, &mut rng());
        for x in 0..7i64 {
            for y in 0..7i64 {
                let base = grid.read(x, y);
                for k in -3..=3i64 {
                    assert_eq!(grid.read(x + k * 7, y), base);
                    assert_eq!(grid.read(x, y + k * 7), base);
                }
            }
        }
    }

    #[test]
    fn scatter_never_exceeds_draws() {
        let grid = WorldGrid::scatter(4, 40, &mut rng());
        assert!(grid.reward_count() <= 16);
        assert_eq!(grid.reward_cells().count(), grid.reward_count());
    }

    #[test]
    fn scatter_exact_places_distinct_rewards() {
        let grid = WorldGrid::scatter_exact(10, 30, &mut rng());
        assert_eq!(grid.reward_count(), 30);
        let full = WorldGrid::scatter_exact(3, 50, &mut rng());
        assert!(full.is_full());
    }

    #[test]
    fn collect_clears_and_respawns_elsewhere() {
        let mut grid = WorldGrid::new(10);
        grid.place_reward(3, 3);
        let outcome = grid.collect_and_respawn(13, -7, &mut rng());
        let Collection::Collected {
            respawned_at: Some(at),
        } = outcome
        else {
            panic!("expected a collection with respawn, got {outcome:?}");
        };
        assert_eq!(grid.reward_count(), 1);
        assert_eq!(grid.read(at[0] as i64, at[1] as i64), Cell::Reward);
        assert_eq!(outcome.signal(), 1);
    }

    #[test]
    fn empty_cell_collection_is_a_no_op() {
        let mut grid = WorldGrid::scatter(10, 20, &mut rng());
        let (x, y) = (0..100)
            .map(|i| (i % 10, i / 10))
            .find(|&(x, y)| grid.read(x, y) == Cell::Empty)
            .unwrap();
        let before = grid.clone();
        let outcome = grid.collect_and_respawn(x, y, &mut rng());
        assert_eq!(outcome, Collection::Nothing);
        assert_eq!(outcome.signal(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn full_grid_respawns_into_the_cleared_cell() {
        let mut grid = WorldGrid::scatter_exact(3, 9, &mut rng());
        assert!(grid.is_full());
        let outcome = grid.collect_and_respawn(1, 1, &mut rng());
        assert_eq!(
            outcome,
            Collection::Collected {
                respawned_at: Some([1, 1])
            }
        );
        assert!(grid.is_full());
    }

    #[test]
    fn spawn_falls_back_to_enumerating_empty_cells() {
        let mut grid = full_except(4, &[[2, 1]]);
        assert_eq!(grid.reward_count(), 15);
        assert_eq!(grid.spawn_reward(&mut ZeroRng), Some([2, 1]));
        assert!(grid.is_full());
        assert_eq!(grid.reward_count(), 16);

        // Only candidates are drawn from once the rejections run out.
        let mut grid = full_except(4, &[[1, 2], [3, 0]]);
        assert_eq!(grid.spawn_reward(&mut ZeroRng), Some([3, 0]));
        assert_eq!(grid.read(1, 2), Cell::Empty);
        assert_eq!(grid.reward_count(), 15);
    }

    #[test]
    fn collection_respawns_through_the_fallback() {
        let mut grid = full_except(5, &[]);
        let outcome = grid.collect_and_respawn(3, 2, &mut ZeroRng);
        assert_eq!(
            outcome,
            Collection::Collected {
                respawned_at: Some([3, 2])
            }
        );
        assert!(grid.is_full());
    }

    #[test]
    #[should_panic(expected = "grid size must be positive")]
    fn zero_sized_grid_panics() {
        WorldGrid::new(0);
    }

    #[test]
    fn spawn_on_full_grid_is_exhausted() {
        let mut grid = WorldGrid::scatter_exact(2, 4, &mut rng());
        let before = grid.clone();
        assert_eq!(grid.spawn_reward(&mut rng()), None);
        assert_eq!(grid, before);
    }

    #[test]
    fn repeated_collection_conserves_count() {
        let mut r = rng();
        let mut grid = WorldGrid::scatter(20, 60, &mut r);
        let initial = grid.reward_count();
        for _ in 0..500 {
            let x = r.random_range(0..20);
            let y = r.random_range(0..20);
            grid.collect_and_respawn(x, y, &mut r);
            assert_eq!(grid.reward_count(), initial);
        }
    }
}
