/// A fixed-size 2D grid stored row-major. Coordinates are expected in range;
/// wrapping is decided by the caller's projection, not by the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrite this map with the contents of another map of the same size.
    pub fn copy_from(&mut self, other: &Tilemap<T>) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "tilemap sizes differ"
        );
        self.data.clone_from_slice(&other.data);
    }

    /// Row-major view of the cells.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }
}

impl Tilemap<f64> {
    /// Smallest and largest cell values, or `None` for an empty map.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Neighbour stepping for a grid of fixed size. X always wraps (east/west is
/// continuous in every supported topology); Y wraps only on a torus and is
/// clamped to the map otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wrap {
    pub width: usize,
    pub height: usize,
    pub wrap_y: bool,
}

impl Wrap {
    pub fn new(width: usize, height: usize, wrap_y: bool) -> Self {
        Self { width, height, wrap_y }
    }

    #[inline]
    pub fn x(&self, x: isize) -> usize {
        x.rem_euclid(self.width as isize) as usize
    }

    #[inline]
    pub fn y(&self, y: isize) -> usize {
        if self.wrap_y {
            y.rem_euclid(self.height as isize) as usize
        } else {
            y.clamp(0, self.height as isize - 1) as usize
        }
    }

    /// The cell reached by moving `(dx, dy)` from `(x, y)`.
    #[inline]
    pub fn step(&self, x: usize, y: usize, dx: isize, dy: isize) -> (usize, usize) {
        (self.x(x as isize + dx), self.y(y as isize + dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_reports_coordinates() {
        let mut map = Tilemap::new_with(3, 2, 0u8);
        map.set(2, 1, 7);
        let hit: Vec<_> = map.iter().filter(|(_, _, v)| **v == 7).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(hit, vec![(2, 1)]);
    }

    #[test]
    fn test_min_max() {
        let mut map = Tilemap::new_with(4, 4, 0.5f64);
        map.set(1, 2, -3.0);
        map.set(3, 3, 9.0);
        assert_eq!(map.min_max(), Some((-3.0, 9.0)));
    }

    #[test]
    fn test_wrap_torus_and_clamped() {
        let torus = Wrap::new(8, 4, true);
        assert_eq!(torus.step(0, 0, -1, -1), (7, 3));
        assert_eq!(torus.step(7, 3, 1, 1), (0, 0));

        let sphere = Wrap::new(8, 4, false);
        assert_eq!(sphere.step(0, 0, -1, -1), (7, 0));
        assert_eq!(sphere.step(7, 3, 1, 1), (0, 3));
    }
}
