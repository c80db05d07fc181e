//! Greedy river tracing: descending primary rivers and climbing tributaries.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::directions::{is_diagonal, random_diagonal, Step, CARDINALS};
use super::{CarveStats, Hydrology, DRAIN_EROSION, SOURCE_DENSITY};
use crate::normalize::{code_height, FOREST, GRASS, LAND, SNOW};
use crate::region::{van_der_corput, Region};

/// Tributaries stop climbing when a cell's height beats a draw from
/// `[0, TRIBUTARY_STOP_RANGE)`.
const TRIBUTARY_STOP_RANGE: f64 = 280.0;

/// Drain attempts made each time a river pools into a lake.
const DRAIN_ATTEMPTS: usize = 2;

/// Outcome of trying to drain a freshly stamped lake.
enum Drain {
    /// Still on land; keep tracing
    Open,
    /// Reached water; the river is complete
    Sea,
    /// Eroded below sea level; the river may or may not survive
    Dried,
}

impl Hydrology {
    fn step_cap(&self) -> usize {
        self.wrap.width * self.wrap.height
    }

    pub(super) fn add_primary_rivers(
        &mut self,
        rng: &mut ChaCha8Rng,
        rivers: &mut Region,
        lakes: &mut Region,
        stats: &mut CarveStats,
    ) {
        self.scratch
            .refill_codes(&self.relief_codes, FOREST..=FOREST)
            .quasi_random_region(SOURCE_DENSITY);
        let sources: Vec<(usize, usize)> = self.scratch.cells().collect();
        stats.sources = sources.len();

        for source in sources {
            if self.trace_primary(source, rng, rivers, lakes, stats) {
                rivers.or(&self.path);
                stats.committed += 1;
            }
        }
    }

    /// Follow the terrain downhill from `source`. Returns whether the traced
    /// path should be committed to `rivers`.
    fn trace_primary(
        &mut self,
        source: (usize, usize),
        rng: &mut ChaCha8Rng,
        rivers: &Region,
        lakes: &mut Region,
        stats: &mut CarveStats,
    ) -> bool {
        self.path.clear();
        self.path.insert(source.0, source.1);
        let (mut x, mut y) = source;
        let mut lowest = *self.relief.get(x, y);

        for _ in 0..self.step_cap() {
            self.directions.reshuffle(rng);
            let mut best = f64::INFINITY;
            let mut choice: Option<(usize, usize, Step)> = None;
            for &step in self.directions.primary() {
                let (nx, ny) = self.wrap.step(x, y, step.0, step.1);
                let h = *self.relief.get(nx, ny);
                if h < best && !self.path.contains(nx, ny) {
                    best = h;
                    choice = Some((nx, ny, step));
                }
            }
            let Some((nx, ny, step)) = choice else {
                return true;
            };
            (x, y) = (nx, ny);

            if best >= lowest {
                stats.lakes += 1;
                self.stamp_lake(x, y, lakes);
                match self.drain(x, y, rng) {
                    Drain::Open => {}
                    Drain::Sea => return true,
                    Drain::Dried => return rng.gen_range(0..8) == 0,
                }
            } else {
                lowest = best;
            }

            if is_diagonal(step) {
                if let Some((gx, gy)) = self.gap_cell(x, y, step) {
                    if self.is_water(gx, gy) || rivers.contains(gx, gy) {
                        return true;
                    }
                    self.path.insert(gx, gy);
                }
            }
            if self.is_water(x, y) || rivers.contains(x, y) {
                return true;
            }
            self.path.insert(x, y);
        }
        true
    }

    /// Lake at `(x, y)` and its four orthogonal neighbours.
    fn stamp_lake(&self, x: usize, y: usize, lakes: &mut Region) {
        lakes.insert(x, y);
        for (dx, dy) in CARDINALS {
            let (lx, ly) = self.wrap.step(x, y, dx, dy);
            lakes.insert(lx, ly);
        }
    }

    fn drain(&mut self, x: usize, y: usize, rng: &mut ChaCha8Rng) -> Drain {
        for _ in 0..DRAIN_ATTEMPTS {
            let (dx, dy) = random_diagonal(rng);
            let (ox, oy) = self.wrap.step(x, y, dx, dy);
            if self.is_water(ox, oy) {
                return Drain::Sea;
            }
            let h = self.relief.get_mut(ox, oy);
            *h -= DRAIN_EROSION;
            let h = *h;
            self.relief_codes.set(ox, oy, code_height(h));
            if h < 0.0 {
                return Drain::Dried;
            }
        }
        Drain::Open
    }

    /// The orthogonal cell bridging a diagonal move that just arrived at
    /// `(x, y)`: the lower of the two, skipping cells already on the path.
    fn gap_cell(&self, x: usize, y: usize, (dx, dy): Step) -> Option<(usize, usize)> {
        let beside = self.wrap.step(x, y, -dx, 0);
        let behind = self.wrap.step(x, y, 0, -dy);
        let beside_h = *self.relief.get(beside.0, beside.1);
        let behind_h = *self.relief.get(behind.0, behind.1);
        if beside_h <= behind_h && !self.path.contains(beside.0, beside.1) {
            Some(beside)
        } else if !self.path.contains(behind.0, behind.1) {
            Some(behind)
        } else {
            None
        }
    }

    pub(super) fn add_tributaries(
        &mut self,
        rng: &mut ChaCha8Rng,
        rivers: &mut Region,
        lakes: &mut Region,
        stats: &mut CarveStats,
    ) {
        let river_count = rivers.len() >> 4;
        let per_band = river_count >> 3;
        let mut index = 0u64;

        for band in GRASS..=SNOW {
            self.scratch.refill_codes(&self.relief_codes, band..=band).and(rivers);
            let mut placed = 0;
            while placed < per_band && (index as usize) < river_count {
                let Some(start) = self.scratch.at_fraction(van_der_corput(index)) else {
                    break;
                };
                index += 1;
                placed += 1;
                stats.tributaries += 1;
                self.trace_tributary(start, rng, rivers, lakes);
            }
        }
    }

    /// Climb away from an existing river at `start` and commit the branch.
    fn trace_tributary(
        &mut self,
        start: (usize, usize),
        rng: &mut ChaCha8Rng,
        rivers: &mut Region,
        lakes: &mut Region,
    ) {
        self.path.clear();
        let (mut x, mut y) = start;
        let start_height = *self.relief.get(x, y);

        // Branch off through the runner-up uphill neighbour so the tributary
        // does not simply retrace the main channel.
        self.directions.reshuffle(rng);
        let mut ranked: Vec<(f64, Step)> = self
            .directions
            .primary()
            .iter()
            .map(|&(dx, dy)| {
                let (nx, ny) = self.wrap.step(x, y, dx, dy);
                (*self.relief.get(nx, ny), (dx, dy))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        if let Some(&(_, step)) = ranked.get(1) {
            let (nx, ny) = self.wrap.step(x, y, step.0, step.1);
            if *self.relief_codes.get(nx, ny) >= LAND {
                (x, y) = (nx, ny);
                if is_diagonal(step) {
                    if let Some((gx, gy)) = self.gap_cell(x, y, step) {
                        if self.is_water(gx, gy) {
                            rivers.or(&self.path);
                            return;
                        }
                        self.path.insert(gx, gy);
                    }
                }
                self.path.insert(x, y);
            }
        }

        for _ in 0..self.step_cap() {
            self.directions.reshuffle(rng);
            let mut best = f64::NEG_INFINITY;
            let mut choice: Option<(usize, usize, Step)> = None;
            for &step in self.directions.all() {
                let (nx, ny) = self.wrap.step(x, y, step.0, step.1);
                let h = *self.relief.get(nx, ny);
                if h > best && !rivers.contains(nx, ny) && !self.path.contains(nx, ny) {
                    best = h;
                    choice = Some((nx, ny, step));
                }
            }
            let Some((nx, ny, step)) = choice else {
                break;
            };
            (x, y) = (nx, ny);

            if is_diagonal(step) {
                if let Some((gx, gy)) = self.gap_cell(x, y, step) {
                    if self.is_water(gx, gy) {
                        break;
                    }
                    self.path.insert(gx, gy);
                }
            }
            if self.is_water(x, y) {
                break;
            }
            self.path.insert(x, y);

            if best <= start_height || best > rng.gen_range(0.0..TRIBUTARY_STOP_RANGE) {
                rivers.or(&self.path);
                self.stamp_spring(x, y, rng, lakes);
                return;
            }
        }
        rivers.or(&self.path);
    }

    /// Small irregular lake where a tributary rises: the cell itself, a random
    /// subset of its orthogonal neighbours, and one diagonal corner.
    fn stamp_spring(&self, x: usize, y: usize, rng: &mut ChaCha8Rng, lakes: &mut Region) {
        lakes.insert(x, y);
        let mut mask: u8 = rng.gen();
        mask &= mask >> 4;
        for (bit, (dx, dy)) in [(1, 0), (-1, 0), (0, 1), (0, -1)].into_iter().enumerate() {
            if mask & (1 << bit) == 0 {
                let (lx, ly) = self.wrap.step(x, y, dx, dy);
                lakes.insert(lx, ly);
            }
        }
        let (dx, dy) = random_diagonal(rng);
        for (sx, sy) in [(dx, dy), (0, dy), (dx, 0)] {
            let (lx, ly) = self.wrap.step(x, y, sx, sy);
            lakes.insert(lx, ly);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::tests::slope;
    use crate::normalize::COASTAL_WATER;
    use crate::tilemap::Tilemap;
    use rand::SeedableRng;

    fn engine(heights: &Tilemap<f64>, codes: &Tilemap<u8>, wrap_y: bool) -> Hydrology {
        let mut hydrology = Hydrology::new(heights.width, heights.height, wrap_y);
        hydrology.relief.copy_from(heights);
        hydrology.relief_codes.copy_from(codes);
        hydrology
    }

    #[test]
    fn test_primary_river_runs_to_the_sea() {
        let (heights, codes, _) = slope(32, 32);
        let mut hydrology = engine(&heights, &codes, false);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rivers = Region::new(32, 32);
        let mut lakes = Region::new(32, 32);
        let mut stats = CarveStats::default();

        let commit = hydrology.trace_primary((16, 6), &mut rng, &rivers, &mut lakes, &mut stats);

        assert!(commit);
        assert!(lakes.is_empty());
        assert_eq!(stats.lakes, 0);
        let rows: Vec<usize> = hydrology.path.cells().map(|(_, y)| y).collect();
        assert!(rows.contains(&6));
        // every row from the source down to the last land row is crossed
        let last_land = (0..32).rev().find(|&y| *codes.get(0, y) >= LAND).unwrap();
        for y in 6..=last_land {
            assert!(rows.contains(&y), "row {y} missing");
        }
        for (x, y) in hydrology.path.cells() {
            assert!(*codes.get(x, y) >= LAND);
        }
    }

    #[test]
    fn test_pit_forms_lake() {
        let mut heights = Tilemap::new_with(16, 16, 0.5);
        heights.set(8, 8, 0.3);
        let codes = Tilemap::new_with(16, 16, FOREST);
        let mut hydrology = engine(&heights, &codes, true);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let rivers = Region::new(16, 16);
        let mut lakes = Region::new(16, 16);
        let mut stats = CarveStats::default();

        hydrology.trace_primary((8, 7), &mut rng, &rivers, &mut lakes, &mut stats);

        assert!(stats.lakes > 0);
        assert!(!lakes.is_empty());
        assert!(hydrology.relief.iter().any(|(_, _, &h)| h < 0.5 && h != 0.3), "drains erode");
        assert_eq!(*heights.get(0, 0), 0.5);
    }

    #[test]
    fn test_drain_into_water_commits_river() {
        // the source is the only land cell; every drain lands in the sea
        let mut heights = Tilemap::new_with(16, 16, 0.5);
        heights.set(8, 8, 0.3);
        let mut codes = Tilemap::new_with(16, 16, COASTAL_WATER);
        codes.set(8, 8, FOREST);

        for seed in 0..32 {
            let mut hydrology = engine(&heights, &codes, true);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rivers = Region::new(16, 16);
            let mut lakes = Region::new(16, 16);
            let mut stats = CarveStats::default();

            let commit = hydrology.trace_primary((8, 8), &mut rng, &rivers, &mut lakes, &mut stats);

            assert!(commit, "seed {seed}");
            assert_eq!(stats.lakes, 1);
            assert_eq!(lakes.len(), 5);
            assert_eq!(hydrology.path.cells().collect::<Vec<_>>(), vec![(8, 8)]);
            assert_eq!(hydrology.relief, heights, "no cell is eroded");
        }
    }

    #[test]
    fn test_dried_drain_rarely_commits() {
        // land barely above sea level: the first drain erodes below zero
        let mut heights = Tilemap::new_with(16, 16, 0.0001);
        heights.set(8, 8, 0.00005);
        let codes = Tilemap::new_with(16, 16, FOREST);

        let mut committed = 0;
        for seed in 0..400 {
            let mut hydrology = engine(&heights, &codes, true);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rivers = Region::new(16, 16);
            let mut lakes = Region::new(16, 16);
            let mut stats = CarveStats::default();

            if hydrology.trace_primary((8, 8), &mut rng, &rivers, &mut lakes, &mut stats) {
                committed += 1;
            }
            assert_eq!(stats.lakes, 1, "the trace ends at the first lake");
            let eroded: Vec<_> = hydrology.relief.iter().filter(|&(_, _, h)| *h < 0.0).collect();
            assert_eq!(eroded.len(), 1);
            let (x, y, _) = eroded[0];
            assert!(*hydrology.relief_codes.get(x, y) <= COASTAL_WATER);
        }
        assert!((20..=85).contains(&committed), "{committed} of 400 committed");
    }

    #[test]
    fn test_tributary_climbs_and_springs() {
        let (heights, codes, _) = slope(32, 32);
        let mut hydrology = engine(&heights, &codes, false);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut rivers = Region::new(32, 32);
        for y in 4..14 {
            rivers.insert(16, y);
        }
        let before = rivers.clone();
        let mut lakes = Region::new(32, 32);

        hydrology.trace_tributary((16, 10), &mut rng, &mut rivers, &mut lakes);

        assert!(rivers.len() > before.len());
        assert!(before.is_subset_of(&rivers));
    }

    #[test]
    fn test_spring_lake_shape() {
        let (heights, codes, _) = slope(16, 16);
        let hydrology = engine(&heights, &codes, true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            let mut lakes = Region::new(16, 16);
            hydrology.stamp_spring(8, 8, &mut rng, &mut lakes);
            assert!(lakes.contains(8, 8));
            assert!((4..=8).contains(&lakes.len()), "{} cells", lakes.len());
            for (x, y) in lakes.cells() {
                assert!(x.abs_diff(8) <= 1 && y.abs_diff(8) <= 1);
            }
        }
    }
}
