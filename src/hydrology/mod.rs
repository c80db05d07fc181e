//! River and lake carving
//!
//! Rivers are traced greedily over a working copy of the normalized terrain:
//! - **Primary rivers** descend from sparse forest-band sources toward the
//!   sea, pooling into lakes where they get stuck and eroding their way out
//! - **Tributaries** climb away from existing rivers in the upper bands and
//!   end in small spring lakes
//! - **Cleanup** bridges gaps, thins the result to single-cell lines and
//!   keeps only cells on land
//!
//! Zoomed windows do not re-trace anything; the full-map rivers and lakes are
//! scaled into the window level by level instead.

pub mod directions;
mod rivers;

use log::debug;
use rand_chacha::ChaCha8Rng;

use crate::normalize::COASTAL_WATER;
use crate::region::{Region, Seams};
use crate::tilemap::{Tilemap, Wrap};
use directions::DirectionBuffer;

/// Height lost by a cell each time a stuck river tries to drain through it.
pub const DRAIN_EROSION: f64 = 0.0002;

/// Density of river sources among forest-band cells.
pub const SOURCE_DENSITY: f64 = 0.0036;

/// Counts reported by one carving run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CarveStats {
    pub sources: usize,
    pub committed: usize,
    pub lakes: usize,
    pub tributaries: usize,
}

/// Owns the hydrology working set: eroded terrain copies and the scratch
/// regions reused by every trace. One trace runs at a time.
pub struct Hydrology {
    wrap: Wrap,
    relief: Tilemap<f64>,
    relief_codes: Tilemap<u8>,
    directions: DirectionBuffer,
    path: Region,
    scratch: Region,
}

impl Hydrology {
    pub fn new(width: usize, height: usize, wrap_y: bool) -> Self {
        Self {
            wrap: Wrap::new(width, height, wrap_y),
            relief: Tilemap::new(width, height),
            relief_codes: Tilemap::new(width, height),
            directions: DirectionBuffer::default(),
            path: Region::new(width, height),
            scratch: Region::new(width, height),
        }
    }

    /// Carve rivers and lakes over normalized `heights`. The terrain itself is
    /// left untouched; erosion only affects the engine's own copy.
    pub fn carve(
        &mut self,
        heights: &Tilemap<f64>,
        codes: &Tilemap<u8>,
        land: &Region,
        rng: &mut ChaCha8Rng,
        rivers: &mut Region,
        lakes: &mut Region,
    ) -> CarveStats {
        self.relief.copy_from(heights);
        self.relief_codes.copy_from(codes);
        rivers.clear();
        lakes.clear();

        let mut stats = CarveStats::default();
        self.add_primary_rivers(rng, rivers, lakes, &mut stats);
        self.add_tributaries(rng, rivers, lakes, &mut stats);

        let seams = Seams::of(&self.wrap);
        rivers.connect_8way(seams).thin(seams).thin(seams);
        lakes.connect_8way(seams).thin(seams);
        rivers.and(land);
        lakes.and(land);

        debug!(
            "Hydrology: {} sources, {} rivers committed, {} lakes, {} tributaries; {} river cells, {} lake cells",
            stats.sources,
            stats.committed,
            stats.lakes,
            stats.tributaries,
            rivers.len(),
            lakes.len()
        );
        stats
    }

    /// Scale full-map rivers and lakes into the window at the top of
    /// `origins`, one doubling per zoom level, and keep them on `land`.
    ///
    /// `origins[i]` is the full-resolution origin of zoom level `i`; every
    /// level's window must lie inside its parent's.
    pub fn approximate_window(
        &mut self,
        rivers: &Region,
        lakes: &Region,
        origins: &[(usize, usize)],
        land: &Region,
        partial_rivers: &mut Region,
        partial_lakes: &mut Region,
    ) {
        partial_rivers.copy_from(rivers);
        partial_lakes.copy_from(lakes);

        for level in 1..origins.len() {
            let (px, py) = origins[level - 1];
            let (ox, oy) = origins[level];
            let stx = (ox - px) << (level - 1);
            let sty = (oy - py) << (level - 1);
            let (thin, river_fringe, lake_fringe) = if level & 3 == 3 {
                (false, 0.4, 0.55)
            } else {
                (true, 0.5, 0.7)
            };
            self.grow_level(partial_rivers, stx, sty, thin, river_fringe);
            self.grow_level(partial_lakes, stx, sty, thin, lake_fringe);
        }

        if origins.len() > 1 {
            partial_rivers.and(land);
            partial_lakes.and(land);
        }
    }

    fn grow_level(&mut self, region: &mut Region, stx: usize, sty: usize, thin: bool, fringe: f64) {
        region.zoom(stx, sty).connect_8way(Seams::NONE);
        if thin {
            region.thin(Seams::NONE);
        }
        self.scratch
            .copy_from(region)
            .fringe(Seams::NONE)
            .quasi_random_region(fringe);
        region.or(&self.scratch);
    }

    #[inline]
    fn is_water(&self, x: usize, y: usize) -> bool {
        *self.relief_codes.get(x, y) <= COASTAL_WATER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::code_height;
    use rand::SeedableRng;

    /// Terrain falling from snow in the north to deep water in the south.
    pub(super) fn slope(width: usize, height: usize) -> (Tilemap<f64>, Tilemap<u8>, Region) {
        let mut heights = Tilemap::new(width, height);
        let mut codes = Tilemap::new(width, height);
        for (x, y, h) in heights.iter_mut() {
            *h = 0.9 - 1.8 * y as f64 / height as f64;
            codes.set(x, y, code_height(*h));
        }
        let mut land = Region::new(width, height);
        land.refill_codes(&codes, 4..=8);
        (heights, codes, land)
    }

    #[test]
    fn test_carve_keeps_water_on_land() {
        let (heights, codes, land) = slope(128, 128);
        let mut hydrology = Hydrology::new(128, 128, false);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut rivers = Region::new(128, 128);
        let mut lakes = Region::new(128, 128);

        let stats = hydrology.carve(&heights, &codes, &land, &mut rng, &mut rivers, &mut lakes);

        assert!(stats.sources > 0);
        assert!(!rivers.is_empty());
        assert!(rivers.is_subset_of(&land));
        assert!(lakes.is_subset_of(&land));
    }

    #[test]
    fn test_carve_is_deterministic() {
        let (heights, codes, land) = slope(64, 96);
        let run = || {
            let mut hydrology = Hydrology::new(64, 96, true);
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let mut rivers = Region::new(64, 96);
            let mut lakes = Region::new(64, 96);
            hydrology.carve(&heights, &codes, &land, &mut rng, &mut rivers, &mut lakes);
            (rivers, lakes)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_approximate_window_scales_rivers() {
        let mut rivers = Region::new(32, 32);
        for y in 0..32 {
            rivers.insert(16, y);
        }
        let lakes = Region::new(32, 32);
        let mut land = Region::new(32, 32);
        land.refill_codes(&Tilemap::new_with(32, 32, 5u8), 4..=8);

        let mut hydrology = Hydrology::new(32, 32, true);
        let mut partial_rivers = Region::new(32, 32);
        let mut partial_lakes = Region::new(32, 32);

        hydrology.approximate_window(
            &rivers,
            &lakes,
            &[(0, 0)],
            &land,
            &mut partial_rivers,
            &mut partial_lakes,
        );
        assert_eq!(partial_rivers, rivers);

        hydrology.approximate_window(
            &rivers,
            &lakes,
            &[(0, 0), (8, 8)],
            &land,
            &mut partial_rivers,
            &mut partial_lakes,
        );
        assert!(partial_rivers.contains(16, 10));
        assert!(partial_rivers.contains(16, 11), "zoom gaps are bridged");
        assert!(!partial_rivers.contains(2, 10));
        assert!(partial_lakes.is_empty());

        let sea = Region::new(32, 32);
        hydrology.approximate_window(
            &rivers,
            &lakes,
            &[(0, 0), (8, 8)],
            &sea,
            &mut partial_rivers,
            &mut partial_lakes,
        );
        assert!(partial_rivers.is_empty());
    }
}
