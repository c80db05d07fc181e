//! World map generation and the zoom cache.
//!
//! A [`WorldMap`] owns every grid of one world and regenerates them in place.
//! `generate*` starts a world at full resolution; `zoom_in*`/`zoom_out*`
//! resample a smaller window of the same world at doubled or halved detail
//! while keeping the output grids at their constructed size.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::hydrology::Hydrology;
use crate::noise_field::{synthesize, FieldNoise, OctaveCounts, RawFields};
use crate::normalize::{
    finish_heat, finish_moisture, normalize_heights, taper_heat, Extent, FieldStats, LAND, SNOW,
};
use crate::projection::{NoisePoint, PolarDistorted, Projection, Toroidal, Window};
use crate::region::Region;
use crate::seeds::{FieldSeeds, DEFAULT_SEED};
use crate::tilemap::Tilemap;

pub use crate::normalize::code_height;

/// A world that tiles seamlessly in both directions.
pub type TilingMap = WorldMap<Toroidal>;

/// A world for wrapping around a sphere; wraps east/west only.
pub type SphereMap = WorldMap<PolarDistorted>;

/// Modifier value requesting a random default.
pub const RANDOM_MODIFIER: f64 = -1.0;

/// Seed and modifiers of the last fresh generation.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Request {
    state: u64,
    water: f64,
    cooling: f64,
}

/// Terrain, climate and hydrology of one world, plus its zoom state.
pub struct WorldMap<P: Projection> {
    projection: P,
    width: usize,
    height: usize,
    octaves: OctaveCounts,
    generate_rivers: bool,

    rng: ChaCha8Rng,
    /// Seed of the current world
    seed: u64,
    /// Request the cached statistics were computed for; `None` until the
    /// first generation
    cached: Option<Request>,
    water_modifier: f64,
    cooling_modifier: f64,

    zoom: usize,
    origins: Vec<(usize, usize)>,

    heights: Tilemap<f64>,
    heat: Tilemap<f64>,
    moisture: Tilemap<f64>,
    height_codes: Tilemap<u8>,
    points: Tilemap<NoisePoint>,

    land: Region,
    rivers: Region,
    lakes: Region,
    partial_rivers: Region,
    partial_lakes: Region,

    stats: FieldStats,
    hydrology: Hydrology,
}

impl TilingMap {
    pub fn tiling(width: usize, height: usize) -> Self {
        Self::new(Toroidal, width, height)
    }
}

impl SphereMap {
    pub fn sphere(width: usize, height: usize) -> Self {
        Self::new(PolarDistorted, width, height)
    }
}

impl<P: Projection> WorldMap<P> {
    /// A generator with the default initial seed and detail.
    ///
    /// # Panics
    /// If either dimension is below 2.
    pub fn new(projection: P, width: usize, height: usize) -> Self {
        Self::with_settings(projection, width, height, DEFAULT_SEED, 1.0)
    }

    /// A generator whose RNG starts from `initial_seed` and whose octave
    /// counts are scaled by `octave_multiplier`. Nothing is generated yet.
    ///
    /// # Panics
    /// If either dimension is below 2.
    pub fn with_settings(
        projection: P,
        width: usize,
        height: usize,
        initial_seed: u64,
        octave_multiplier: f64,
    ) -> Self {
        assert!(width >= 2 && height >= 2, "world must be at least 2x2, got {width}x{height}");
        let wraps_y = projection.wraps_y();
        Self {
            projection,
            width,
            height,
            octaves: OctaveCounts::scaled(octave_multiplier),
            generate_rivers: true,
            rng: ChaCha8Rng::seed_from_u64(initial_seed),
            seed: initial_seed,
            cached: None,
            water_modifier: RANDOM_MODIFIER,
            cooling_modifier: 1.0,
            zoom: 0,
            origins: vec![(0, 0)],
            heights: Tilemap::new(width, height),
            heat: Tilemap::new(width, height),
            moisture: Tilemap::new(width, height),
            height_codes: Tilemap::new(width, height),
            points: Tilemap::new_with(width, height, [0.0; 4]),
            land: Region::new(width, height),
            rivers: Region::new(width, height),
            lakes: Region::new(width, height),
            partial_rivers: Region::new(width, height),
            partial_lakes: Region::new(width, height),
            stats: FieldStats::default(),
            hydrology: Hydrology::new(width, height, wraps_y),
        }
    }

    /// Whether generation carves rivers and lakes. Takes effect on the next
    /// fresh generation.
    pub fn set_generate_rivers(&mut self, enabled: bool) {
        self.generate_rivers = enabled;
    }

    // =========================================================================
    // GENERATION
    // =========================================================================

    /// Generate a new world from a random seed with random modifiers.
    pub fn generate(&mut self) {
        let state = self.rng.gen();
        self.generate_with_seed(state);
    }

    /// Generate the world for `state` with random modifiers drawn from it.
    pub fn generate_with_seed(&mut self, state: u64) {
        self.generate_with(RANDOM_MODIFIER, RANDOM_MODIFIER, state);
    }

    /// Generate the world for `state`. A modifier of zero or less is replaced
    /// by a random default: water in [0.91, 1.20), cooling around 1.1.
    ///
    /// Changing the seed or either modifier resets zoom to the full map;
    /// repeating the last call regenerates the current zoom window.
    pub fn generate_with(&mut self, water: f64, cooling: f64, state: u64) {
        if self.is_changed(water, cooling, state) {
            self.seed = state;
            self.zoom = 0;
            self.origins.clear();
            self.origins.push((0, 0));
        }
        self.regenerate(water, cooling, state);
    }

    fn is_changed(&self, water: f64, cooling: f64, state: u64) -> bool {
        self.cached != Some(Request { state, water, cooling })
    }

    fn window(&self) -> Window {
        let (start_x, start_y) = self.window_origin();
        Window {
            width: self.width,
            height: self.height,
            start_x,
            start_y,
            used_width: self.width >> self.zoom,
            used_height: self.height >> self.zoom,
        }
    }

    /// Rebuild every grid for the current zoom window.
    fn regenerate(&mut self, water: f64, cooling: f64, state: u64) {
        let fresh = self.is_changed(water, cooling, state);
        if fresh {
            self.stats = FieldStats::default();
            self.cached = Some(Request { state, water, cooling });
        }

        self.rng = ChaCha8Rng::seed_from_u64(state);
        let seeds = FieldSeeds::draw(&mut self.rng);
        self.water_modifier = if water <= 0.0 {
            self.rng.gen_range(0.0..0.29) + 0.91
        } else {
            water
        };
        self.cooling_modifier = if cooling <= 0.0 {
            self.rng.gen_range(0.0..0.45) * (self.rng.gen::<f64>() - 0.5) + 1.1
        } else {
            cooling
        };

        let window = self.window();
        if fresh {
            info!(
                "Generating {} world {}x{} with seed {:#018x} (water {:.3}, cooling {:.3})",
                self.projection.topology(),
                self.width,
                self.height,
                state,
                self.water_modifier,
                self.cooling_modifier
            );
        } else {
            debug!(
                "Regenerating zoom level {} at origin ({}, {})",
                self.zoom, window.start_x, window.start_y
            );
        }

        let noise = FieldNoise::new(&self.projection, &seeds, &self.octaves);
        let raw = synthesize(
            &self.projection,
            &window,
            &noise,
            self.water_modifier,
            RawFields {
                heights: &mut self.heights,
                heat: &mut self.heat,
                moisture: &mut self.moisture,
                points: &mut self.points,
            },
        );

        self.stats.height_window = raw.height;
        if fresh {
            self.stats.height_raw = raw.height;
            self.stats.heat_raw = raw.heat;
            self.stats.moisture_raw = raw.moisture;
        }

        normalize_heights(&mut self.heights, &mut self.height_codes, &self.stats.height_raw);
        taper_heat(
            &mut self.heat,
            &self.heights,
            &self.height_codes,
            &self.stats.heat_raw,
            &window,
        );
        if fresh {
            self.stats.heat_tapered = Extent::of(&self.heat);
        }
        finish_heat(&mut self.heat, &self.stats.heat_tapered, self.cooling_modifier);
        finish_moisture(&mut self.moisture, &self.stats.moisture_raw);
        if fresh {
            self.stats.heat = Extent::of(&self.heat);
            self.stats.moisture = Extent::of(&self.moisture);
        }
        debug!("Field statistics: {:?}", self.stats);

        self.land.refill_codes(&self.height_codes, LAND..=SNOW);
        self.update_hydrology(fresh);
    }

    fn update_hydrology(&mut self, fresh: bool) {
        if !self.generate_rivers {
            self.rivers.clear();
            self.lakes.clear();
            self.partial_rivers.clear();
            self.partial_lakes.clear();
            return;
        }
        if fresh {
            self.hydrology.carve(
                &self.heights,
                &self.height_codes,
                &self.land,
                &mut self.rng,
                &mut self.rivers,
                &mut self.lakes,
            );
        }
        self.hydrology.approximate_window(
            &self.rivers,
            &self.lakes,
            &self.origins,
            &self.land,
            &mut self.partial_rivers,
            &mut self.partial_lakes,
        );
    }

    // =========================================================================
    // ZOOM
    // =========================================================================

    /// Deepest zoom at which the window still covers at least one cell.
    pub fn max_zoom(&self) -> usize {
        (self.width.min(self.height).ilog2()) as usize
    }

    /// Zoom in one level on the centre of the current window.
    pub fn zoom_in(&mut self) {
        self.zoom_in_at(1, self.width >> 1, self.height >> 1);
    }

    /// Zoom out one level about the centre of the current window.
    pub fn zoom_out(&mut self) {
        self.zoom_out_at(1, self.width >> 1, self.height >> 1);
    }

    /// Double the resolution `amount` times, centring each new window on the
    /// world point shown at output cell `(cx, cy)`. Windows are kept inside
    /// the map; levels past [`max_zoom`](Self::max_zoom) are ignored.
    pub fn zoom_in_at(&mut self, amount: usize, cx: usize, cy: usize) {
        if amount == 0 {
            return;
        }
        self.ensure_generated();

        let levels = amount.min(self.max_zoom() - self.zoom);
        if levels < amount {
            warn!(
                "Ignoring {} zoom level(s) beyond the maximum of {}",
                amount - levels,
                self.max_zoom()
            );
        }
        if levels == 0 {
            return;
        }

        let focus = self.world_point(cx, cy);
        for _ in 0..levels {
            self.zoom += 1;
            let origin = self.centred_origin(self.zoom, focus);
            self.origins.push(origin);
        }
        info!("Zoomed in to level {} at {:?}", self.zoom, self.origins.last());
        self.refresh_window();
    }

    /// Halve the resolution `amount` times (never past the full map),
    /// re-centring the remaining window on the world point at `(cx, cy)`.
    pub fn zoom_out_at(&mut self, amount: usize, cx: usize, cy: usize) {
        if amount == 0 || self.zoom == 0 {
            return;
        }
        self.ensure_generated();

        let focus = self.world_point(cx, cy);
        let levels = amount.min(self.zoom);
        self.origins.truncate(self.origins.len() - levels);
        self.zoom -= levels;
        if self.zoom > 0 {
            self.origins.pop();
            let origin = self.centred_origin(self.zoom, focus);
            self.origins.push(origin);
        }
        info!("Zoomed out to level {}", self.zoom);
        self.refresh_window();
    }

    fn ensure_generated(&mut self) {
        if self.cached.is_none() {
            let state = self.rng.gen();
            self.generate_with_seed(state);
        }
    }

    fn refresh_window(&mut self) {
        let Some(request) = self.cached else {
            return;
        };
        self.regenerate(request.water, request.cooling, request.state);
        self.rng = ChaCha8Rng::seed_from_u64(request.state);
    }

    /// Full-resolution cell under output cell `(cx, cy)` of the current window.
    fn world_point(&self, cx: usize, cy: usize) -> (usize, usize) {
        let (ox, oy) = self.window_origin();
        let cx = cx.min(self.width - 1);
        let cy = cy.min(self.height - 1);
        (ox + (cx >> self.zoom), oy + (cy >> self.zoom))
    }

    /// Origin of a level-`level` window centred on `focus`, kept inside the
    /// window of the level above it.
    fn centred_origin(&self, level: usize, focus: (usize, usize)) -> (usize, usize) {
        let (px, py) = self.origins[level - 1];
        let axis = |focus: usize, parent: usize, full: usize| {
            let size = full >> level;
            let parent_size = full >> (level - 1);
            let wanted = focus as isize - (size >> 1) as isize;
            wanted.clamp(parent as isize, (parent + parent_size - size) as isize) as usize
        };
        (axis(focus.0, px, self.width), axis(focus.1, py, self.height))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Seed of the current world.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resolved `(water, cooling)` modifiers of the current world.
    pub fn modifiers(&self) -> (f64, f64) {
        (self.water_modifier, self.cooling_modifier)
    }

    /// Normalized elevation in [-1, 1] (zoom windows may slightly exceed it).
    pub fn heights(&self) -> &Tilemap<f64> {
        &self.heights
    }

    pub fn heat(&self) -> &Tilemap<f64> {
        &self.heat
    }

    pub fn moisture(&self) -> &Tilemap<f64> {
        &self.moisture
    }

    /// Height band 0..=8 of every cell.
    pub fn height_codes(&self) -> &Tilemap<u8> {
        &self.height_codes
    }

    pub fn land(&self) -> &Region {
        &self.land
    }

    /// Full-map rivers as carved at zoom level 0.
    pub fn rivers(&self) -> &Region {
        &self.rivers
    }

    /// Full-map lakes as carved at zoom level 0.
    pub fn lakes(&self) -> &Region {
        &self.lakes
    }

    /// Rivers as seen in the current zoom window.
    pub fn partial_rivers(&self) -> &Region {
        &self.partial_rivers
    }

    /// Lakes as seen in the current zoom window.
    pub fn partial_lakes(&self) -> &Region {
        &self.partial_lakes
    }

    pub fn stats(&self) -> &FieldStats {
        &self.stats
    }

    pub fn zoom(&self) -> usize {
        self.zoom
    }

    /// Full-resolution window origin of every zoom level, level 0 first.
    pub fn window_origins(&self) -> &[(usize, usize)] {
        &self.origins
    }

    fn window_origin(&self) -> (usize, usize) {
        self.origins.last().copied().unwrap_or((0, 0))
    }

    /// Noise-space point sampled for output cell `(x, y)`.
    pub fn sample_point(&self, x: usize, y: usize) -> NoisePoint {
        *self.points.get(x, y)
    }
}
