//! Biome classification over a finished world.
//!
//! Both mappers band heat and moisture into six levels each and look the
//! pair up in a 6x6 table, with extra rows for coasts, rivers and lakes:
//! - [`SimpleBiomeMapper`] gives one biome id per cell
//! - [`DetailedBiomeMapper`] gives two ids per cell (a centre-weighted and
//!   an edge-weighted guess) plus how far to blend from the first to the
//!   second, for smooth transitions when rendering

use serde::Serialize;

use crate::normalize::{COASTAL_WATER, SAND};
use crate::projection::Projection;
use crate::tilemap::Tilemap;
use crate::world::WorldMap;

/// Biome types named by the lookup tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Biome {
    Ice,
    Tundra,
    Grassland,
    Desert,
    Woodland,
    Savanna,
    SeasonalForest,
    BorealForest,
    TemperateRainforest,
    TropicalRainforest,
    Rocky,
    Beach,
    River,
    Ocean,
}

impl Biome {
    pub fn display_name(&self) -> &'static str {
        match self {
            Biome::Ice => "Ice",
            Biome::Tundra => "Tundra",
            Biome::Grassland => "Grassland",
            Biome::Desert => "Desert",
            Biome::Woodland => "Woodland",
            Biome::Savanna => "Savanna",
            Biome::SeasonalForest => "Seasonal Forest",
            Biome::BorealForest => "Boreal Forest",
            Biome::TemperateRainforest => "Temperate Rainforest",
            Biome::TropicalRainforest => "Tropical Rainforest",
            Biome::Rocky => "Rocky",
            Biome::Beach => "Beach",
            Biome::River => "River",
            Biome::Ocean => "Ocean",
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

use Biome::*;

/// Groups of six, coldest first. Rows 0-5 run driest to wettest; then
/// coasts, rivers and lakes.
#[rustfmt::skip]
pub const BIOME_TABLE: [Biome; 54] = [
    Ice, Ice, Grassland, Desert, Desert, Desert,
    Ice, Tundra, Grassland, Grassland, Desert, Desert,
    Ice, Tundra, Woodland, Woodland, Savanna, Desert,
    Ice, Tundra, SeasonalForest, SeasonalForest, Savanna, Savanna,
    Ice, Tundra, BorealForest, TemperateRainforest, TropicalRainforest, Savanna,
    Ice, BorealForest, BorealForest, TemperateRainforest, TropicalRainforest, TropicalRainforest,
    Rocky, Rocky, Beach, Beach, Beach, Beach,
    Ice, River, River, River, River, River,
    Ice, River, River, River, River, River,
];

/// First id of the coast, river, lake and ocean rows.
pub const COAST_BASE: u16 = 36;
pub const RIVER_BASE: u16 = 42;
pub const LAKE_BASE: u16 = 48;
pub const OCEAN_BASE: u16 = 54;

/// Name of a biome id; ids past the land table are ocean.
pub fn biome_for(id: u16) -> Biome {
    BIOME_TABLE.get(id as usize).copied().unwrap_or(Ocean)
}

/// Band of `value` against ascending lower bounds: the number of bounds it
/// reaches, where `reaches` decides inclusivity.
fn band(value: f64, bounds: &[f64; 5], reaches: impl Fn(f64, f64) -> bool) -> u16 {
    bounds.iter().take_while(|&&b| reaches(value, b)).count() as u16
}

fn above(value: f64, bound: f64) -> bool {
    value > bound
}

fn at_least(value: f64, bound: f64) -> bool {
    value >= bound
}

/// Reallocate `map` if its size differs from the world's.
fn fit<T: Clone + Default>(map: &mut Tilemap<T>, width: usize, height: usize) {
    if map.width != width || map.height != height {
        *map = Tilemap::new(width, height);
    }
}

// =============================================================================
// SIMPLE MAPPER
// =============================================================================

/// Upper bounds of heat bands 0-4.
pub const HEAT_UPPERS: [f64; 5] = [0.15, 0.31, 0.5, 0.69, 0.85];
/// Upper bounds of moisture bands 0-4.
pub const MOISTURE_UPPERS: [f64; 5] = [0.27, 0.4, 0.6, 0.8, 0.9];

/// One biome id (0..=53) per cell.
#[derive(Clone, Debug, Default)]
pub struct SimpleBiomeMapper {
    pub heat_codes: Tilemap<u8>,
    pub moisture_codes: Tilemap<u8>,
    pub biome_codes: Tilemap<u16>,
}

/// Biome id from heat and moisture in [0, 1] and the cell's surroundings.
pub fn simple_biome_code(hot: f64, moist: f64, height_code: u8, lake: bool, river: bool) -> u16 {
    let hc = band(hot, &HEAT_UPPERS, above);
    let mc = band(moist, &MOISTURE_UPPERS, above);
    if lake {
        LAKE_BASE + hc
    } else if river {
        RIVER_BASE + hc
    } else if height_code == SAND {
        COAST_BASE + hc
    } else {
        hc + mc * 6
    }
}

impl SimpleBiomeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify every cell of the world's current window.
    pub fn make_biomes<P: Projection>(&mut self, world: &WorldMap<P>) {
        let (width, height) = (world.width(), world.height());
        fit(&mut self.heat_codes, width, height);
        fit(&mut self.moisture_codes, width, height);
        fit(&mut self.biome_codes, width, height);

        let heat_extent = world.stats().heat;
        for (x, y, &heat) in world.heat().iter() {
            let hot = heat_extent.unit(heat);
            let moist = *world.moisture().get(x, y);
            let code = *world.height_codes().get(x, y);
            let wet_land = code > COASTAL_WATER;
            let lake = wet_land && world.partial_lakes().contains(x, y);
            let river = wet_land && world.partial_rivers().contains(x, y);

            self.heat_codes.set(x, y, band(hot, &HEAT_UPPERS, above) as u8);
            self.moisture_codes.set(x, y, band(moist, &MOISTURE_UPPERS, above) as u8);
            self.biome_codes.set(x, y, simple_biome_code(hot, moist, code, lake, river));
        }
    }

    pub fn biome(&self, x: usize, y: usize) -> Biome {
        biome_for(*self.biome_codes.get(x, y))
    }
}

// =============================================================================
// DETAILED MAPPER
// =============================================================================

/// Band bounds shifted toward the lower band by a fifth of its width, so
/// only cells well inside a band pick it.
pub const CENTRE_HEAT: [f64; 5] = [0.28, 0.468, 0.652, 0.812, 0.968];
pub const CENTRE_MOISTURE: [f64; 5] = [0.346, 0.574, 0.76, 0.86, 0.98];

/// Band bounds shifted toward the upper band, so cells near an edge pick the
/// neighbouring band.
pub const EDGE_HEAT: [f64; 5] = [0.032, 0.188, 0.348, 0.532, 0.72];
pub const EDGE_MOISTURE: [f64; 5] = [0.026, 0.31, 0.44, 0.62, 0.82];

/// Moisture band given to ocean cells so their edge biome lands in the ocean row.
const OCEAN_MOISTURE_BAND: u16 = 9;

const PART_MASK: u32 = 1023;

/// Two biome ids and a blend amount packed as `a | b << 10 | mix << 20`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BlendedBiome(pub u32);

impl BlendedBiome {
    pub fn pack(a: u16, b: u16, mix: u32) -> Self {
        Self((a as u32 & PART_MASK) | (b as u32 & PART_MASK) << 10 | mix.min(PART_MASK) << 20)
    }

    /// Centre-weighted biome id.
    pub fn part_a(self) -> u16 {
        (self.0 & PART_MASK) as u16
    }

    /// Edge-weighted biome id.
    pub fn part_b(self) -> u16 {
        (self.0 >> 10 & PART_MASK) as u16
    }

    /// How far to blend from `a` toward `b`, in [0, 1).
    pub fn mix_amount(self) -> f64 {
        (self.0 >> 20) as f64 / 1024.0
    }

    pub fn biome_a(self) -> Biome {
        biome_for(self.part_a())
    }

    pub fn biome_b(self) -> Biome {
        biome_for(self.part_b())
    }
}

/// Triangle wave through -1 at even inputs and 1 at odd inputs.
pub fn bounce(value: f64) -> f64 {
    let t = value.rem_euclid(2.0);
    if t < 1.0 {
        t * 2.0 - 1.0
    } else {
        3.0 - t * 2.0
    }
}

/// Blended biome of one cell. `hot` and `moist` are in [0, 1]; `high` is the
/// normalized height.
pub fn detailed_biome(hot: f64, moist: f64, high: f64, height_code: u8, lake: bool, river: bool) -> BlendedBiome {
    let ocean = height_code <= COASTAL_WATER;
    let hc = band(hot, &CENTRE_HEAT, at_least);
    let mc = band(moist, &CENTRE_MOISTURE, at_least);
    let a = if ocean {
        OCEAN_BASE + hc
    } else if lake {
        LAKE_BASE + hc
    } else if river {
        RIVER_BASE + hc
    } else if height_code == SAND {
        COAST_BASE + hc
    } else {
        hc + mc * 6
    };

    let edge_hc = band(hot, &EDGE_HEAT, at_least);
    let edge_mc = if ocean {
        OCEAN_MOISTURE_BAND
    } else {
        band(moist, &EDGE_MOISTURE, at_least)
    };
    let b = edge_hc + edge_mc * 6;

    let mix = if ocean {
        (high + 1.0) / 1.1 * 1024.0
    } else if river || lake {
        moist * 358.4 + 665.0
    } else if height_code == SAND {
        (0.18 - high) * 12800.0
    } else {
        bounce((high + moist) * (4.1 + high - hot)) * 512.0 + 512.0
    };
    BlendedBiome::pack(a, b, mix.clamp(0.0, PART_MASK as f64) as u32)
}

/// Two biome ids and a blend amount per cell.
#[derive(Clone, Debug, Default)]
pub struct DetailedBiomeMapper {
    /// Centre-weighted heat band of each cell
    pub heat_codes: Tilemap<u8>,
    /// Centre-weighted moisture band of each cell
    pub moisture_codes: Tilemap<u8>,
    pub biome_codes: Tilemap<BlendedBiome>,
}

impl DetailedBiomeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_biomes<P: Projection>(&mut self, world: &WorldMap<P>) {
        let (width, height) = (world.width(), world.height());
        fit(&mut self.heat_codes, width, height);
        fit(&mut self.moisture_codes, width, height);
        fit(&mut self.biome_codes, width, height);

        let heat_extent = world.stats().heat;
        for (x, y, &heat) in world.heat().iter() {
            let hot = heat_extent.unit(heat);
            let moist = *world.moisture().get(x, y);
            let high = *world.heights().get(x, y);
            let code = *world.height_codes().get(x, y);
            let wet_land = code > COASTAL_WATER;
            let lake = wet_land && world.partial_lakes().contains(x, y);
            let river = wet_land && world.partial_rivers().contains(x, y);

            self.heat_codes.set(x, y, band(hot, &CENTRE_HEAT, at_least) as u8);
            self.moisture_codes.set(x, y, band(moist, &CENTRE_MOISTURE, at_least) as u8);
            self.biome_codes.set(x, y, detailed_biome(hot, moist, high, code, lake, river));
        }
    }

    pub fn biome(&self, x: usize, y: usize) -> BlendedBiome {
        *self.biome_codes.get(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{DEEP_WATER, FOREST, GRASS, SHALLOW_WATER};
    use crate::world::TilingMap;

    #[test]
    fn test_simple_codes() {
        assert_eq!(simple_biome_code(0.9, 0.95, FOREST, false, false), 35);
        assert_eq!(biome_for(35), TropicalRainforest);
        assert_eq!(simple_biome_code(0.9, 0.95, SAND, false, false), 41);
        assert_eq!(biome_for(41), Beach);
        assert_eq!(simple_biome_code(0.0, 0.5, GRASS, true, true), 48);
        assert_eq!(biome_for(48), Ice);
        assert_eq!(simple_biome_code(0.6, 0.5, GRASS, false, true), 45);
        assert_eq!(biome_for(45), River);
        // bands use strict comparisons
        assert_eq!(simple_biome_code(0.15, 0.27, GRASS, false, false), 0);
    }

    #[test]
    fn test_detailed_ocean_cell() {
        let biome = detailed_biome(0.5, 0.5, -0.5, SHALLOW_WATER, false, false);
        assert_eq!(biome.part_a(), 56);
        assert_eq!(biome.part_b(), 3 + 9 * 6);
        assert_eq!(biome.biome_a(), Ocean);
        assert_eq!(biome.0 >> 20, 465);
        assert!((biome.mix_amount() - 465.0 / 1024.0).abs() < 1e-12);
    }

    #[test]
    fn test_detailed_land_bands() {
        // just below a centre bound and just above an edge bound
        let biome = detailed_biome(0.46, 0.56, 0.4, FOREST, false, false);
        assert_eq!(biome.part_a(), 1 + 6);
        assert_eq!(biome.part_b(), 3 + 3 * 6);
        let coast = detailed_biome(0.46, 0.56, 0.15, SAND, false, false);
        assert_eq!(coast.part_a(), COAST_BASE + 1);
        assert_eq!(coast.0 >> 20, ((0.18 - 0.15) * 12800.0) as u32);
        let deep = detailed_biome(1.0, 1.0, -1.2, DEEP_WATER, false, false);
        assert_eq!(deep.0 >> 20, 0);
    }

    #[test]
    fn test_pack_clamps_parts() {
        let biome = BlendedBiome::pack(59, 12, 5000);
        assert_eq!(biome.part_a(), 59);
        assert_eq!(biome.part_b(), 12);
        assert_eq!(biome.0 >> 20, 1023);
    }

    #[test]
    fn test_bounce() {
        assert_eq!(bounce(0.0), -1.0);
        assert_eq!(bounce(0.5), 0.0);
        assert_eq!(bounce(1.0), 1.0);
        assert_eq!(bounce(1.5), 0.0);
        assert_eq!(bounce(-1.0), 1.0);
        for i in -40..40 {
            let v = bounce(i as f64 * 0.137);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_mappers_cover_world() {
        let mut world = TilingMap::tiling(64, 64);
        world.generate_with(1.0, 1.0, 42);

        let mut simple = SimpleBiomeMapper::new();
        simple.make_biomes(&world);
        let mut detailed = DetailedBiomeMapper::new();
        detailed.make_biomes(&world);

        for (x, y, &code) in simple.biome_codes.iter() {
            assert!(code <= 53);
            assert!(*simple.heat_codes.get(x, y) <= 5);
            let blended = detailed.biome(x, y);
            assert!(blended.part_a() <= 59 && blended.part_b() <= 59);
            let mix = blended.mix_amount();
            assert!((0.0..1.0).contains(&mix));
            if *world.height_codes().get(x, y) <= COASTAL_WATER {
                assert_eq!(blended.biome_a(), Ocean);
            }
        }

        world.zoom_in();
        simple.make_biomes(&world);
        assert!(simple.biome_codes.iter().all(|(_, _, &c)| c <= 53));
    }
}
