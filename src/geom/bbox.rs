use std::{fmt, str::FromStr};

use geo::{Coord, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// A lon/lat rectangle (west, south, east, north). Does not wrap the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Build a box from two corners in any order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// The whole projectable world.
    pub fn world() -> Self { Self::new(-180.0, -85.051_129, 180.0, 85.051_129) }

    #[inline] pub fn width(&self) -> f64 { self.east - self.west }

    #[inline] pub fn height(&self) -> f64 { self.north - self.south }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        ((self.west + self.east) * 0.5, (self.south + self.north) * 0.5)
    }

    #[inline]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        lng >= self.west && lng <= self.east && lat >= self.south && lat <= self.north
    }

    /// Grow the box by `fraction` of its size on every side.
    pub fn padded(&self, fraction: f64) -> Self {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Self::new(self.west - dx, self.south - dy, self.east + dx, self.north + dy)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }

    /// rstar envelope in (lng, lat) space.
    #[inline]
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.west, self.south], [self.east, self.north])
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl From<BoundingBox> for Rect<f64> {
    fn from(bbox: BoundingBox) -> Self {
        Rect::new(
            Coord { x: bbox.west, y: bbox.south },
            Coord { x: bbox.east, y: bbox.north },
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    /// Parse "west,south,east,north".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(',')
            .map(|part| part.trim().parse::<f64>().map_err(|e| format!("invalid bbox component {part:?}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            &[west, south, east, north] => Ok(Self::new(west, south, east, north)),
            _ => Err(format!("expected 4 comma-separated values, got {}", parts.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized() {
        let bbox = BoundingBox::new(5.0, 46.0, 2.0, 43.0);
        assert_eq!(bbox, BoundingBox { west: 2.0, south: 43.0, east: 5.0, north: 46.0 });
        assert_eq!(bbox.center(), (3.5, 44.5));
    }

    #[test]
    fn parse_and_display() {
        let bbox: BoundingBox = "2.2, 48.8, 2.5, 48.9".parse().unwrap();
        assert!(bbox.contains(2.35, 48.85));
        assert!(!bbox.contains(2.6, 48.85));
        assert_eq!(bbox.to_string().parse::<BoundingBox>().unwrap(), bbox);
        assert!("1,2,3".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn padding_grows_every_side() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 4.0).padded(0.1);
        assert_eq!(bbox, BoundingBox::new(-1.0, -0.4, 11.0, 4.4));
    }
}
