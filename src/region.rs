//! Packed boolean regions over the world grid.
//!
//! Land, river and lake masks are all `Region`s: one bit per cell, row-major,
//! with set algebra and the few morphological operations the hydrology needs
//! (8-way gap bridging, skeleton thinning, fringe extraction, 2x zoom and
//! low-discrepancy subsampling). Neighbourhood operations take the map's
//! [`Seams`]: across a seam they see the opposite edge, elsewhere cells beyond
//! the map edge count as unset.

use std::ops::RangeInclusive;

use crate::tilemap::{Tilemap, Wrap};

/// R2 sequence constants (inverse powers of the plastic number) used as a
/// 2D dither threshold for subsampling.
const R2_A: f64 = 0.754_877_666_246_692_7;
const R2_B: f64 = 0.569_840_290_998_053_2;

/// Base-2 radical inverse of `index`, a van der Corput sequence in [0, 1).
pub fn van_der_corput(index: u64) -> f64 {
    (index.reverse_bits() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Which map edges meet for neighbourhood operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Seams {
    /// West edge meets east edge
    pub x: bool,
    /// North edge meets south edge
    pub y: bool,
}

impl Seams {
    /// No edges meet, as in a zoomed window.
    pub const NONE: Self = Self { x: false, y: false };

    pub fn of(wrap: &Wrap) -> Self {
        Self { x: true, y: wrap.wrap_y }
    }
}

#[inline]
fn seam_axis(v: isize, size: usize, wraps: bool) -> Option<usize> {
    if wraps {
        Some(v.rem_euclid(size as isize) as usize)
    } else if v >= 0 && (v as usize) < size {
        Some(v as usize)
    } else {
        None
    }
}

/// A fixed-size set of grid cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    width: usize,
    height: usize,
    bits: Vec<u64>,
}

impl Region {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![0; (width * height).div_ceil(64)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        y * self.width + x
    }

    #[inline]
    fn test(&self, idx: usize) -> bool {
        self.bits[idx >> 6] & (1u64 << (idx & 63)) != 0
    }

    #[inline]
    fn set_index(bits: &mut [u64], idx: usize) {
        bits[idx >> 6] |= 1u64 << (idx & 63);
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.test(self.index(x, y))
    }

    /// Index of a possibly out-of-range neighbour, resolved across seams.
    #[inline]
    fn neighbour(&self, x: isize, y: isize, seams: Seams) -> Option<usize> {
        let x = seam_axis(x, self.width, seams.x)?;
        let y = seam_axis(y, self.height, seams.y)?;
        Some(y * self.width + x)
    }

    #[inline]
    fn on(&self, x: isize, y: isize, seams: Seams) -> bool {
        self.neighbour(x, y, seams).is_some_and(|idx| self.test(idx))
    }

    #[inline]
    pub fn insert(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        Self::set_index(&mut self.bits, idx);
    }

    #[inline]
    pub fn remove(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.bits[idx >> 6] &= !(1u64 << (idx & 63));
    }

    pub fn clear(&mut self) -> &mut Self {
        self.bits.fill(0);
        self
    }

    /// Number of cells in the region.
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Replace this region's contents with another region of the same size.
    pub fn copy_from(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        self.bits.copy_from_slice(&other.bits);
        self
    }

    pub fn or(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= b;
        }
        self
    }

    pub fn and(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a &= b;
        }
        self
    }

    pub fn and_not(&mut self, other: &Region) -> &mut Self {
        self.assert_same_size(other);
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a &= !b;
        }
        self
    }

    /// True when every cell of this region is also in `other`.
    pub fn is_subset_of(&self, other: &Region) -> bool {
        self.assert_same_size(other);
        self.bits.iter().zip(&other.bits).all(|(a, b)| a & !b == 0)
    }

    fn assert_same_size(&self, other: &Region) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "region sizes differ"
        );
    }

    /// Reset to exactly the cells whose code lies in `codes`.
    pub fn refill_codes(&mut self, grid: &Tilemap<u8>, codes: RangeInclusive<u8>) -> &mut Self {
        assert_eq!((self.width, self.height), (grid.width, grid.height));
        self.bits.fill(0);
        for (idx, code) in grid.as_slice().iter().enumerate() {
            if codes.contains(code) {
                Self::set_index(&mut self.bits, idx);
            }
        }
        self
    }

    /// Iterate over the region's cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.bits
            .iter()
            .enumerate()
            .flat_map(|(wi, &word)| SetBits { word, base: wi << 6 })
            .map(move |idx| (idx % width, idx / width))
    }

    /// The cell at `fraction` of the way through the row-major cell order.
    pub fn at_fraction(&self, fraction: f64) -> Option<(usize, usize)> {
        let count = self.len();
        if count == 0 {
            return None;
        }
        let nth = ((fraction.clamp(0.0, 1.0) * count as f64) as usize).min(count - 1);
        self.cells().nth(nth)
    }

    /// Keep roughly `fraction` of the cells, chosen by a deterministic 2D
    /// low-discrepancy threshold so survivors are evenly spread.
    pub fn quasi_random_region(&mut self, fraction: f64) -> &mut Self {
        if fraction >= 1.0 {
            return self;
        }
        if fraction <= 0.0 {
            return self.clear();
        }
        let width = self.width;
        for (wi, word) in self.bits.iter_mut().enumerate() {
            let mut keep = 0u64;
            for idx in (SetBits { word: *word, base: wi << 6 }) {
                let (x, y) = (idx % width, idx / width);
                if (x as f64 * R2_A + y as f64 * R2_B).fract() < fraction {
                    keep |= 1u64 << (idx & 63);
                }
            }
            *word = keep;
        }
        self
    }

    /// Replace the region with the cells orthogonally adjacent to it but not in it.
    pub fn fringe(&mut self, seams: Seams) -> &mut Self {
        let mut grown = vec![0u64; self.bits.len()];
        for (x, y) in self.cells() {
            let (x, y) = (x as isize, y as isize);
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if let Some(idx) = self.neighbour(nx, ny, seams) {
                    Self::set_index(&mut grown, idx);
                }
            }
        }
        for (g, own) in grown.iter_mut().zip(&self.bits) {
            *g &= !own;
        }
        self.bits = grown;
        self
    }

    /// Bridge one-cell gaps: an unset cell becomes set when any pair of its
    /// opposite 8-way neighbours is set.
    pub fn connect_8way(&mut self, seams: Seams) -> &mut Self {
        let mut next = self.bits.clone();
        let on = |x, y| self.on(x, y, seams);
        for y in 0..self.height as isize {
            for x in 0..self.width as isize {
                if on(x, y) {
                    continue;
                }
                let bridged = (on(x - 1, y) && on(x + 1, y))
                    || (on(x, y - 1) && on(x, y + 1))
                    || (on(x - 1, y - 1) && on(x + 1, y + 1))
                    || (on(x + 1, y - 1) && on(x - 1, y + 1));
                if bridged {
                    Self::set_index(&mut next, y as usize * self.width + x as usize);
                }
            }
        }
        self.bits = next;
        self
    }

    /// One Zhang-Suen thinning iteration (both sub-passes). Peels boundary
    /// cells that are not needed for 8-way connectivity, so repeated calls
    /// converge toward a one-cell-wide skeleton.
    pub fn thin(&mut self, seams: Seams) -> &mut Self {
        self.thin_pass(true, seams);
        self.thin_pass(false, seams);
        self
    }

    fn thin_pass(&mut self, first: bool, seams: Seams) {
        let on = |x, y| self.on(x, y, seams);
        let mut doomed = Vec::new();
        for (x, y) in self.cells() {
            let (x, y) = (x as isize, y as isize);
            // P2..P9, clockwise from north
            let p = [
                on(x, y - 1),
                on(x + 1, y - 1),
                on(x + 1, y),
                on(x + 1, y + 1),
                on(x, y + 1),
                on(x - 1, y + 1),
                on(x - 1, y),
                on(x - 1, y - 1),
            ];
            let neighbours = p.iter().filter(|&&b| b).count();
            if !(2..=6).contains(&neighbours) {
                continue;
            }
            let transitions = (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count();
            if transitions != 1 {
                continue;
            }
            let (n, e, s, w) = (p[0], p[2], p[4], p[6]);
            let removable = if first {
                !(n && e && s) && !(e && s && w)
            } else {
                !(n && e && w) && !(n && s && w)
            };
            if removable {
                doomed.push((x as usize, y as usize));
            }
        }
        for (x, y) in doomed {
            self.remove(x, y);
        }
    }

    /// Double the region's scale about `(x, y)`: each cell `(a, b)` moves to
    /// `(2(a - x), 2(b - y))`; cells that land outside the map are dropped.
    pub fn zoom(&mut self, x: usize, y: usize) -> &mut Self {
        let mut next = vec![0u64; self.bits.len()];
        for (a, b) in self.cells() {
            if a < x || b < y {
                continue;
            }
            let (nx, ny) = ((a - x) * 2, (b - y) * 2);
            if nx < self.width && ny < self.height {
                Self::set_index(&mut next, ny * self.width + nx);
            }
        }
        self.bits = next;
        self
    }
}

/// Iterator over the set bit positions of one word.
struct SetBits {
    word: u64,
    base: usize,
}

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.word == 0 {
            return None;
        }
        let bit = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.base + bit)
    }
}
