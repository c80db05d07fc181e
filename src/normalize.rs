//! Global rescaling of the raw fields, latitude heat taper and height banding.

use serde::Serialize;

use crate::projection::Window;
use crate::tilemap::Tilemap;

// =============================================================================
// HEIGHT BANDS
// =============================================================================

pub const DEEP_WATER: u8 = 0;
pub const MEDIUM_WATER: u8 = 1;
pub const SHALLOW_WATER: u8 = 2;
pub const COASTAL_WATER: u8 = 3;
pub const SAND: u8 = 4;
pub const GRASS: u8 = 5;
pub const FOREST: u8 = 6;
pub const ROCK: u8 = 7;
pub const SNOW: u8 = 8;

/// Lowest code counted as land.
pub const LAND: u8 = SAND;

/// Upper bounds (exclusive) of bands 0 through 7; band 8 is everything above.
pub const BAND_UPPERS: [f64; 8] = [-0.7, -0.3, -0.1, 0.1, 0.18, 0.35, 0.6, 0.8];

/// Lower bound of the forest band.
const FOREST_LOWER: f64 = BAND_UPPERS[GRASS as usize];

/// Height code (0..=8) of a normalized height in [-1, 1].
pub fn code_height(h: f64) -> u8 {
    BAND_UPPERS.iter().take_while(|&&upper| h >= upper).count() as u8
}

// =============================================================================
// EXTENTS AND STATISTICS
// =============================================================================

/// Running minimum and maximum of a field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Extent {
    /// Extent of no samples; including any value replaces both bounds.
    pub const EMPTY: Self = Self {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub fn of(map: &Tilemap<f64>) -> Self {
        map.min_max().map_or(Self::EMPTY, |(min, max)| Self { min, max })
    }

    #[inline]
    pub fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// True when the extent cannot be divided by: no samples or all equal.
    pub fn is_degenerate(&self) -> bool {
        let span = self.span();
        !span.is_finite() || span <= f64::EPSILON
    }

    /// Position of `value` within the extent, 0 at `min` and 1 at `max`.
    /// Degenerate extents place everything at the middle.
    #[inline]
    pub fn unit(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.5
        } else {
            (value - self.min) / self.span()
        }
    }
}

/// Extents that drive the rescales. Recomputed on fresh passes only; zoom
/// passes reuse them so a window samples the same normalized surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FieldStats {
    /// Raw height over the full map
    pub height_raw: Extent,
    /// Raw height over the most recent window
    pub height_window: Extent,
    pub heat_raw: Extent,
    /// Heat after banding and latitude taper, before cooling
    pub heat_tapered: Extent,
    /// Final heat
    pub heat: Extent,
    pub moisture_raw: Extent,
    /// Final moisture
    pub moisture: Extent,
}

// =============================================================================
// NORMALIZATION PASSES
// =============================================================================

/// Heat multiplier for a full-resolution row: 2.2 on the centre row, falling
/// to 0.8 at the top and bottom edges.
pub fn latitude_taper(row: f64, height: usize) -> f64 {
    let half = (height as f64 - 1.0) * 0.5;
    let t = if half > 0.0 { (row - half).abs() / half } else { 0.0 };
    2.2 - t * (2.4 - t)
}

/// `(offset, variance)` applied to a cell's heat according to its height band.
pub fn heat_band_modifier(code: u8, h: f64) -> (f64, f64) {
    match code {
        DEEP_WATER..=COASTAL_WATER => (0.4, 0.2),
        FOREST => (-0.1 * (h - FOREST_LOWER - 0.08), 1.0),
        ROCK => (-0.25 * h, 1.0),
        SNOW => (-0.4 * h, 1.0),
        _ => (0.05 * h, 1.0),
    }
}

/// Rescale raw heights into [-1, 1] and band them.
pub fn normalize_heights(heights: &mut Tilemap<f64>, codes: &mut Tilemap<u8>, raw: &Extent) {
    for (x, y, h) in heights.iter_mut() {
        *h = raw.unit(*h) * 2.0 - 1.0;
        codes.set(x, y, code_height(*h));
    }
}

/// First heat pass: rescale raw heat, shift it by height band and scale it by
/// the latitude of each row within the full map.
pub fn taper_heat(
    heat: &mut Tilemap<f64>,
    heights: &Tilemap<f64>,
    codes: &Tilemap<u8>,
    raw: &Extent,
    window: &Window,
) {
    for y in 0..heat.height {
        let taper = latitude_taper(window.row_position(y), window.height);
        for x in 0..heat.width {
            let (offset, variance) = heat_band_modifier(*codes.get(x, y), *heights.get(x, y));
            let cell = heat.get_mut(x, y);
            *cell = (raw.unit(*cell) * 0.8 * variance + offset + 0.6) * taper;
        }
    }
}

/// Second heat pass: stretch the tapered heat over `[0, cooling]`.
pub fn finish_heat(heat: &mut Tilemap<f64>, tapered: &Extent, cooling: f64) {
    for (_, _, h) in heat.iter_mut() {
        *h = tapered.unit(*h) * cooling;
    }
}

/// Rescale raw moisture into [0, 1].
pub fn finish_moisture(moisture: &mut Tilemap<f64>, raw: &Extent) {
    for (_, _, m) in moisture.iter_mut() {
        *m = raw.unit(*m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_height_boundaries() {
        assert_eq!(code_height(-1.0), DEEP_WATER);
        assert_eq!(code_height(-0.7), MEDIUM_WATER);
        assert_eq!(code_height(-0.100_001), SHALLOW_WATER);
        assert_eq!(code_height(0.0), COASTAL_WATER);
        assert_eq!(code_height(0.1), SAND);
        assert_eq!(code_height(0.2), GRASS);
        assert_eq!(code_height(0.5), FOREST);
        assert_eq!(code_height(0.7), ROCK);
        assert_eq!(code_height(0.8), SNOW);
        assert_eq!(code_height(1.0), SNOW);
    }

    #[test]
    fn test_latitude_taper_profile() {
        assert!((latitude_taper(4.5, 10) - 2.2).abs() < 1e-12);
        assert!((latitude_taper(0.0, 10) - 0.8).abs() < 1e-12);
        assert!((latitude_taper(9.0, 10) - 0.8).abs() < 1e-12);
        assert!(latitude_taper(2.0, 10) < latitude_taper(3.0, 10));
        assert_eq!(latitude_taper(0.0, 1), 2.2);
    }

    #[test]
    fn test_heat_band_modifier() {
        assert_eq!(heat_band_modifier(COASTAL_WATER, -0.05), (0.4, 0.2));
        let (offset, variance) = heat_band_modifier(FOREST, 0.43);
        assert!(offset.abs() < 1e-12);
        assert_eq!(variance, 1.0);
        assert_eq!(heat_band_modifier(SNOW, 1.0), (-0.4, 1.0));
        assert_eq!(heat_band_modifier(SAND, 0.1), (0.05 * 0.1, 1.0));
    }

    #[test]
    fn test_degenerate_extent_maps_to_middle() {
        let mut flat = Tilemap::new_with(3, 3, 0.25);
        let mut codes = Tilemap::new(3, 3);
        let raw = Extent::of(&flat);
        assert!(raw.is_degenerate());
        normalize_heights(&mut flat, &mut codes, &raw);
        assert!(flat.iter().all(|(_, _, &h)| h == 0.0));
        assert!(codes.iter().all(|(_, _, &c)| c == COASTAL_WATER));

        assert_eq!(Extent::EMPTY.unit(5.0), 0.5);
    }

    #[test]
    fn test_normalize_heights_spans_unit_range() {
        let mut heights = Tilemap::new(4, 1);
        for (x, v) in [-0.3, 0.1, 0.2, 0.5].into_iter().enumerate() {
            heights.set(x, 0, v);
        }
        let mut codes = Tilemap::new(4, 1);
        let raw = Extent::of(&heights);
        normalize_heights(&mut heights, &mut codes, &raw);
        assert_eq!(heights.min_max(), Some((-1.0, 1.0)));
        for (x, y, &h) in heights.iter() {
            assert_eq!(*codes.get(x, y), code_height(h));
        }
    }

    #[test]
    fn test_finish_heat_scales_to_cooling() {
        let mut heat = Tilemap::new(2, 1);
        heat.set(0, 0, 1.0);
        heat.set(1, 0, 3.0);
        let tapered = Extent::of(&heat);
        finish_heat(&mut heat, &tapered, 1.2);
        assert_eq!(*heat.get(0, 0), 0.0);
        assert!((*heat.get(1, 0) - 1.2).abs() < 1e-12);
    }
}
