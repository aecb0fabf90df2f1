use crate::grid::{Direction, MAX_SIZE, Point};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Zobrist hash for search states.
///
/// XOR composition makes the box contribution order-independent, so two
/// states with the same multiset of box positions and the same hero position
/// hash identically with no sorting required.
pub struct Zobrist {
    hero_hashes: [[u64; MAX_SIZE]; MAX_SIZE],
    box_hashes: [[u64; MAX_SIZE]; MAX_SIZE],
    /// One table per direction, mixed in for a box with a pending
    /// oily-floor slide. Distinguishes otherwise identical positions whose
    /// next tick diverges.
    slide_hashes: [[[u64; MAX_SIZE]; MAX_SIZE]; 4],
}

impl Zobrist {
    pub fn new() -> Self {
        // Use a seeded PRNG for reproducible hashes
        let mut rng = ChaCha8Rng::seed_from_u64(0x51195f0c8ed60cf1);

        let mut hero_hashes = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in hero_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        let mut box_hashes = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in box_hashes.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        let mut slide_hashes = [[[0u64; MAX_SIZE]; MAX_SIZE]; 4];
        for table in slide_hashes.iter_mut() {
            for row in table.iter_mut() {
                for cell in row.iter_mut() {
                    *cell = rng.next_u64();
                }
            }
        }

        Zobrist {
            hero_hashes,
            box_hashes,
            slide_hashes,
        }
    }

    pub fn hero_hash(&self, pos: Point) -> u64 {
        self.hero_hashes[pos.y as usize][pos.x as usize]
    }

    pub fn box_hash(&self, pos: Point) -> u64 {
        self.box_hashes[pos.y as usize][pos.x as usize]
    }

    pub fn slide_hash(&self, pos: Point, dir: Direction) -> u64 {
        self.slide_hashes[dir.index()][pos.y as usize][pos.x as usize]
    }

    /// Compute the hash for a full state: hero position plus every box as a
    /// (position, pending slide) pair.
    pub fn state_hash(&self, hero: Point, boxes: &[(Point, Option<Direction>)]) -> u64 {
        let mut hash = self.hero_hash(hero);
        for &(pos, slide) in boxes {
            hash ^= self.box_hash(pos);
            if let Some(dir) = slide {
                hash ^= self.slide_hash(pos, dir);
            }
        }
        hash
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_order_does_not_matter() {
        let zobrist = Zobrist::new();
        let hero = Point::new(1, 1);
        let a = (Point::new(2, 3), None);
        let b = (Point::new(5, 4), Some(Direction::Right));
        let c = (Point::new(7, 7), None);

        let forward = zobrist.state_hash(hero, &[a, b, c]);
        let shuffled = zobrist.state_hash(hero, &[c, a, b]);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_pending_slide_distinguishes_states() {
        let zobrist = Zobrist::new();
        let hero = Point::new(1, 1);
        let pos = Point::new(4, 2);

        let resting = zobrist.state_hash(hero, &[(pos, None)]);
        let sliding = zobrist.state_hash(hero, &[(pos, Some(Direction::Left))]);
        let sliding_other = zobrist.state_hash(hero, &[(pos, Some(Direction::Up))]);
        assert_ne!(resting, sliding);
        assert_ne!(sliding, sliding_other);
    }

    #[test]
    fn test_hero_position_distinguishes_states() {
        let zobrist = Zobrist::new();
        let boxes = [(Point::new(2, 2), None)];
        assert_ne!(
            zobrist.state_hash(Point::new(1, 1), &boxes),
            zobrist.state_hash(Point::new(1, 2), &boxes)
        );
    }

    #[test]
    fn test_tables_are_reproducible() {
        let a = Zobrist::new();
        let b = Zobrist::new();
        let hero = Point::new(3, 3);
        let boxes = [(Point::new(1, 2), Some(Direction::Down))];
        assert_eq!(a.state_hash(hero, &boxes), b.state_hash(hero, &boxes));
    }
}
