use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A grid step `(dx, dy)`; y grows southward.
pub type Step = (isize, isize);

pub const CARDINALS: [Step; 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
pub const DIAGONALS: [Step; 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
pub const OUTWARDS: [Step; 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

#[inline]
pub fn is_diagonal((dx, dy): Step) -> bool {
    dx != 0 && dy != 0
}

/// A diagonal step chosen from two random bits.
pub fn random_diagonal(rng: &mut ChaCha8Rng) -> Step {
    let k: isize = rng.gen_range(0..4);
    ((k & 1) * 2 - 1, (k & 2) - 1)
}

/// Candidate steps for one move of a river trace, reshuffled before each move:
/// the four cardinals in random order, one random diagonal, and one random
/// direction of all eight.
#[derive(Clone, Debug)]
pub struct DirectionBuffer {
    steps: [Step; 6],
}

impl Default for DirectionBuffer {
    fn default() -> Self {
        Self {
            steps: [CARDINALS[0], CARDINALS[1], CARDINALS[2], CARDINALS[3], DIAGONALS[0], OUTWARDS[0]],
        }
    }
}

impl DirectionBuffer {
    pub fn reshuffle(&mut self, rng: &mut ChaCha8Rng) {
        let mut cardinals = CARDINALS;
        cardinals.shuffle(rng);
        self.steps[..4].copy_from_slice(&cardinals);
        self.steps[4] = DIAGONALS[rng.gen_range(0..DIAGONALS.len())];
        self.steps[5] = OUTWARDS[rng.gen_range(0..OUTWARDS.len())];
    }

    /// Steps considered by descending traces.
    pub fn primary(&self) -> &[Step] {
        &self.steps[..5]
    }

    /// Steps considered by climbing tributaries.
    pub fn all(&self) -> &[Step] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_reshuffle_keeps_cardinals() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut buffer = DirectionBuffer::default();
        for _ in 0..20 {
            buffer.reshuffle(&mut rng);
            let mut head: Vec<Step> = buffer.primary()[..4].to_vec();
            head.sort();
            let mut expected = CARDINALS.to_vec();
            expected.sort();
            assert_eq!(head, expected);
            assert!(is_diagonal(buffer.primary()[4]));
            assert_eq!(buffer.all().len(), 6);
        }
    }

    #[test]
    fn test_random_diagonal_covers_all_corners() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let step = random_diagonal(&mut rng);
            assert!(DIAGONALS.contains(&step));
            seen.insert(step);
        }
        assert_eq!(seen.len(), 4);
    }
}
