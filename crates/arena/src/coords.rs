use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoords {
    pub x: i32,
    pub y: i32,
}

impl TileCoords {
    pub const INVALID: TileCoords = TileCoords { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    pub fn taxicab_distance(self, other: TileCoords) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    pub fn step(self, direction: Direction) -> TileCoords {
        self + direction.offset()
    }

    /// Whether the coordinate lies on a square map of `map_width` tiles per side.
    pub fn is_in_bounds(self, map_width: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < map_width && self.y < map_width
    }

    pub fn tile_index(self, map_width: i32) -> Option<usize> {
        if !self.is_in_bounds(map_width) {
            return None;
        }
        Some(self.y as usize * map_width as usize + self.x as usize)
    }

    pub fn from_tile_index(index: usize, map_width: i32) -> TileCoords {
        let width = map_width.max(1) as usize;
        TileCoords {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }
}

impl Add for TileCoords {
    type Output = TileCoords;

    fn add(self, rhs: TileCoords) -> TileCoords {
        TileCoords::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for TileCoords {
    fn add_assign(&mut self, rhs: TileCoords) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for TileCoords {
    type Output = TileCoords;

    fn sub(self, rhs: TileCoords) -> TileCoords {
        TileCoords::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for TileCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal step directions. North is toward increasing `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    East,
    West,
    North,
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    pub fn offset(self) -> TileCoords {
        match self {
            Self::East => TileCoords::new(1, 0),
            Self::West => TileCoords::new(-1, 0),
            Self::North => TileCoords::new(0, 1),
            Self::South => TileCoords::new(0, -1),
        }
    }

    /// Direction of a single cardinal step from `from` to `to`, if they are adjacent.
    pub fn between(from: TileCoords, to: TileCoords) -> Option<Direction> {
        let delta = to - from;
        Self::ALL
            .into_iter()
            .find(|direction| direction.offset() == delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxicab_distance_is_symmetric_and_axis_summed() {
        let a = TileCoords::new(2, -3);
        let b = TileCoords::new(-1, 4);
        assert_eq!(a.taxicab_distance(b), 10);
        assert_eq!(b.taxicab_distance(a), 10);
        assert_eq!(a.taxicab_distance(a), 0);
    }

    #[test]
    fn tile_index_round_trips_inside_bounds_only() {
        let coords = TileCoords::new(3, 5);
        let index = coords.tile_index(8).expect("in bounds");
        assert_eq!(index, 43);
        assert_eq!(TileCoords::from_tile_index(index, 8), coords);

        assert_eq!(TileCoords::new(8, 0).tile_index(8), None);
        assert_eq!(TileCoords::new(0, -1).tile_index(8), None);
        assert_eq!(TileCoords::INVALID.tile_index(8), None);
    }

    #[test]
    fn direction_between_only_matches_adjacent_tiles() {
        let origin = TileCoords::new(4, 4);
        for direction in Direction::ALL {
            assert_eq!(Direction::between(origin, origin.step(direction)), Some(direction));
        }
        assert_eq!(Direction::between(origin, TileCoords::new(6, 4)), None);
        assert_eq!(Direction::between(origin, origin), None);
    }

    #[test]
    fn invalid_sentinel_is_not_valid() {
        assert!(!TileCoords::INVALID.is_valid());
        assert!(TileCoords::new(0, 0).is_valid());
    }
}
