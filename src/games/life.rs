//! Cellular-automaton tick simulation (Conway's rules)
//!
//! No wager and no payout; the session exists so the grid can auto-advance
//! on a timer, accept edits between ticks, and free its scope on quit or
//! expiry.

use super::{GamePayload, PayoutRule, ResultDetail, ResultTag, RuleOutcome};
use crate::session::ResolveTrigger;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: usize = 20;
pub const DEFAULT_HEIGHT: usize = 10;
const RANDOM_DENSITY: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeGrid {
    pub width: usize,
    pub height: usize,
    cells: Vec<bool>,
    pub generation: u64,
}

impl LifeGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
            generation: 0,
        }
    }

    pub fn randomized(width: usize, height: usize, rng: &mut impl Rng) -> Self {
        let mut grid = Self::new(width, height);
        grid.randomize(rng);
        grid
    }

    pub fn randomize(&mut self, rng: &mut impl Rng) {
        for cell in self.cells.iter_mut() {
            *cell = rng.gen_bool(RANDOM_DENSITY);
        }
    }

    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = alive;
        }
    }

    /// Toggle a cell; out-of-range coordinates are ignored
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            self.cells[idx] = !self.cells[idx];
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
        self.generation = 0;
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    fn live_neighbors(&self, x: usize, y: usize) -> usize {
        let mut count = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx >= 0
                    && ny >= 0
                    && self.is_alive(nx as usize, ny as usize)
                {
                    count += 1;
                }
            }
        }
        count
    }

    /// Advance one generation
    pub fn step(&mut self) {
        let mut next = vec![false; self.width * self.height];
        for y in 0..self.height {
            for x in 0..self.width {
                let neighbors = self.live_neighbors(x, y);
                let alive = self.is_alive(x, y);
                next[y * self.width + x] = if alive {
                    neighbors == 2 || neighbors == 3
                } else {
                    neighbors == 3
                };
            }
        }
        self.cells = next;
        self.generation += 1;
    }
}

pub struct LifeRule;

impl PayoutRule for LifeRule {
    fn settle(&self, payload: &mut GamePayload, trigger: ResolveTrigger, _wager: u64) -> RuleOutcome {
        let (generations, population) = match payload {
            GamePayload::Life(grid) => (grid.generation, grid.population()),
            _ => (0, 0),
        };
        let tag = match trigger {
            ResolveTrigger::Cancel => ResultTag::Cancelled,
            _ => ResultTag::Ended,
        };
        RuleOutcome {
            tag,
            payout: 0,
            detail: ResultDetail::Life {
                generations,
                population,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_is_a_still_life() {
        let mut grid = LifeGrid::new(5, 5);
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            grid.set(x, y, true);
        }
        grid.step();
        assert_eq!(grid.population(), 4);
        assert!(grid.is_alive(1, 1) && grid.is_alive(2, 2));
        assert_eq!(grid.generation, 1);
    }

    #[test]
    fn test_blinker_oscillates() {
        let mut grid = LifeGrid::new(5, 5);
        for x in 1..=3 {
            grid.set(x, 2, true);
        }
        grid.step();
        // horizontal bar becomes vertical
        assert!(grid.is_alive(2, 1) && grid.is_alive(2, 2) && grid.is_alive(2, 3));
        assert!(!grid.is_alive(1, 2) && !grid.is_alive(3, 2));
        grid.step();
        assert!(grid.is_alive(1, 2) && grid.is_alive(3, 2));
    }

    #[test]
    fn test_lone_cell_dies() {
        let mut grid = LifeGrid::new(3, 3);
        grid.set(1, 1, true);
        grid.step();
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn test_toggle_and_clear() {
        let mut grid = LifeGrid::new(3, 3);
        grid.toggle(0, 0);
        assert!(grid.is_alive(0, 0));
        grid.toggle(0, 0);
        assert!(!grid.is_alive(0, 0));
        // out of range is ignored
        grid.toggle(10, 10);

        grid.set(1, 1, true);
        grid.step();
        grid.clear();
        assert_eq!(grid.population(), 0);
        assert_eq!(grid.generation, 0);
    }

    #[test]
    fn test_settle_reports_generations() {
        let mut grid = LifeGrid::new(4, 4);
        grid.set(1, 1, true);
        grid.set(1, 2, true);
        grid.set(2, 1, true);
        grid.set(2, 2, true);
        grid.step();
        grid.step();

        let mut payload = GamePayload::Life(grid);
        let outcome = LifeRule.settle(&mut payload, ResolveTrigger::Action, 0);
        assert_eq!(outcome.tag, ResultTag::Ended);
        assert_eq!(outcome.payout, 0);
        match outcome.detail {
            ResultDetail::Life {
                generations,
                population,
            } => {
                assert_eq!(generations, 2);
                assert_eq!(population, 4);
            }
            _ => panic!("expected life detail"),
        }
    }
}
