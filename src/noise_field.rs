//! Multi-octave noise synthesis of the raw height, heat and moisture fields.

use noise::{NoiseFn, Perlin, Seedable};

use crate::normalize::Extent;
use crate::projection::{NoisePoint, Projection, Window};
use crate::seeds::{octave_seed, FieldSeeds};
use crate::tilemap::Tilemap;

// =============================================================================
// OCTAVE COUNTS
// =============================================================================

/// Maximum octaves per generator; keeps the `2^octaves` normalizers finite.
const MAX_OCTAVES: usize = 63;

/// Ridged octave weights fall off as `2^(-0.9 i)`.
const RIDGED_FALLOFF: f64 = -0.9;

/// Ridged sums are rescaled to span roughly [-1, 0.41].
const RIDGED_SPAN: f64 = 1.41;

/// Number of octaves in each field generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctaveCounts {
    pub terrain: usize,
    pub terrain_ridged: usize,
    pub heat: usize,
    pub moisture: usize,
    pub warp: usize,
}

impl Default for OctaveCounts {
    fn default() -> Self {
        Self {
            terrain: 8,
            terrain_ridged: 10,
            heat: 3,
            moisture: 4,
            warp: 6,
        }
    }
}

impl OctaveCounts {
    /// Default counts scaled by a detail multiplier, rounded and kept in 1..=63.
    pub fn scaled(multiplier: f64) -> Self {
        let scale = |n: usize| ((0.5 + multiplier * n as f64) as usize).clamp(1, MAX_OCTAVES);
        let base = Self::default();
        Self {
            terrain: scale(base.terrain),
            terrain_ridged: scale(base.terrain_ridged),
            heat: scale(base.heat),
            moisture: scale(base.moisture),
            warp: scale(base.warp),
        }
    }
}

fn octave_generators(seed: u32, octaves: usize) -> Vec<Perlin> {
    (0..octaves.clamp(1, MAX_OCTAVES))
        .map(|o| Perlin::new(1).set_seed(octave_seed(seed, o)))
        .collect()
}

#[inline]
fn scaled(point: NoisePoint, factor: f64) -> NoisePoint {
    [point[0] * factor, point[1] * factor, point[2] * factor, point[3] * factor]
}

// =============================================================================
// LAYERED NOISE
// =============================================================================

/// Smooth fractal noise. Octave `o` samples at `frequency / 2^o` with weight
/// `2^(octaves - 1 - o)`, so the low-frequency octaves dominate; the sum is
/// divided by the total weight to stay within the basis range.
pub struct LayeredNoise {
    octaves: Vec<Perlin>,
    frequency: f64,
    inverse_total: f64,
}

impl LayeredNoise {
    pub fn new(seed: u32, octaves: usize, frequency: f64) -> Self {
        let octaves = octave_generators(seed, octaves);
        let inverse_total = 1.0 / (2f64.powi(octaves.len() as i32) - 1.0);
        Self { octaves, frequency, inverse_total }
    }

    pub fn get(&self, point: NoisePoint) -> f64 {
        let count = self.octaves.len() as i32;
        let mut sum = 0.0;
        let mut factor = self.frequency;
        for (o, basis) in self.octaves.iter().enumerate() {
            let weight = 2f64.powi(count - 1 - o as i32);
            sum += basis.get(scaled(point, factor)) * weight;
            factor *= 0.5;
        }
        sum * self.inverse_total
    }
}

// =============================================================================
// RIDGED NOISE
// =============================================================================

/// Creased fractal noise used as a domain warp. Each octave folds the basis
/// into `(1 - |n|)^2`, producing sharp ridges where the basis crosses zero.
pub struct RidgedNoise {
    octaves: Vec<Perlin>,
    frequency: f64,
    correction: f64,
}

impl RidgedNoise {
    pub fn new(seed: u32, octaves: usize, frequency: f64) -> Self {
        let octaves = octave_generators(seed, octaves);
        let total: f64 = (0..octaves.len()).map(|i| 2f64.powf(RIDGED_FALLOFF * i as f64)).sum();
        Self {
            octaves,
            frequency,
            correction: RIDGED_SPAN / total,
        }
    }

    pub fn get(&self, point: NoisePoint) -> f64 {
        let mut sum = 0.0;
        let mut factor = self.frequency;
        for (i, basis) in self.octaves.iter().enumerate() {
            let n = 1.0 - basis.get(scaled(point, factor)).abs();
            sum += n * n * 2f64.powf(RIDGED_FALLOFF * i as f64);
            factor *= 2.0;
        }
        sum * self.correction - 1.0
    }
}

// =============================================================================
// FIELD SYNTHESIS
// =============================================================================

/// Raw, un-normalized values of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawSample {
    pub height: f64,
    pub heat: f64,
    pub moisture: f64,
}

/// All noise generators of one generation pass.
pub struct FieldNoise {
    terrain: LayeredNoise,
    terrain_ridged: RidgedNoise,
    heat: LayeredNoise,
    heat_warp: RidgedNoise,
    moisture: LayeredNoise,
    moisture_warp: RidgedNoise,
}

impl FieldNoise {
    pub fn new<P: Projection>(projection: &P, seeds: &FieldSeeds, octaves: &OctaveCounts) -> Self {
        let freq = projection.frequencies();
        Self {
            terrain: LayeredNoise::new(seeds.terrain(), octaves.terrain, freq.terrain),
            terrain_ridged: RidgedNoise::new(seeds.terrain_warp(), octaves.terrain_ridged, freq.terrain_ridged),
            heat: LayeredNoise::new(seeds.heat(), octaves.heat, freq.heat),
            heat_warp: RidgedNoise::new(seeds.heat_warp(), octaves.warp, freq.warp),
            moisture: LayeredNoise::new(seeds.moisture(), octaves.moisture, freq.moisture),
            moisture_warp: RidgedNoise::new(seeds.moisture_warp(), octaves.warp, freq.warp),
        }
    }

    /// Sample all three fields at one point. Each field perturbs a single
    /// axis of the point by its own ridged warp before sampling.
    pub fn sample<P: Projection>(&self, projection: &P, point: NoisePoint, water: f64) -> RawSample {
        let axes = projection.warp_axes();

        let mut warped = point;
        warped[axes.height] += self.terrain_ridged.get(point);
        let height = self.terrain.get(warped) * water;

        let mut warped = point;
        warped[axes.heat] += self.heat_warp.get(point);
        let heat = self.heat.get(warped);

        let mut warped = point;
        warped[axes.moisture] += self.moisture_warp.get(point);
        let moisture = self.moisture.get(warped);

        RawSample { height, heat, moisture }
    }
}

/// Output grids of one synthesis pass.
pub struct RawFields<'a> {
    pub heights: &'a mut Tilemap<f64>,
    pub heat: &'a mut Tilemap<f64>,
    pub moisture: &'a mut Tilemap<f64>,
    pub points: &'a mut Tilemap<NoisePoint>,
}

/// Extents of the raw values written by [`synthesize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawExtents {
    pub height: Extent,
    pub heat: Extent,
    pub moisture: Extent,
}

/// Fill the raw fields for every cell of `window`, recording each cell's
/// projected point alongside.
pub fn synthesize<P: Projection>(
    projection: &P,
    window: &Window,
    noise: &FieldNoise,
    water: f64,
    out: RawFields<'_>,
) -> RawExtents {
    let columns = projection.column_table(window);
    let mut extents = RawExtents {
        height: Extent::EMPTY,
        heat: Extent::EMPTY,
        moisture: Extent::EMPTY,
    };

    for y in 0..window.height {
        let row = projection.row_angle(window.row_position(y), window.height).sin_cos();
        for (x, &column) in columns.iter().enumerate() {
            let point = projection.project(column, row);
            let sample = noise.sample(projection, point, water);

            out.points.set(x, y, point);
            out.heights.set(x, y, sample.height);
            out.heat.set(x, y, sample.heat);
            out.moisture.set(x, y, sample.moisture);

            extents.height.include(sample.height);
            extents.heat.include(sample.heat);
            extents.moisture.include(sample.moisture);
        }
    }
    extents
}
