//! Fixed color scale for zone classes.

use std::fmt;

use serde::{Serialize, Serializer};

use super::ZoneClass;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS hex: #rrggbb
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fill for sub-regions without density data.
pub const NO_DATA: Rgb = Rgb { r: 150, g: 150, b: 150 };

// Green (most opportunity) to red (least), indexed by rank.
const SCALE: [Rgb; 5] = [
    Rgb { r:  26, g: 150, b:  65 },
    Rgb { r: 166, g: 217, b: 106 },
    Rgb { r: 255, g: 255, b: 191 },
    Rgb { r: 253, g: 174, b:  97 },
    Rgb { r: 215, g:  25, b:  28 },
];

#[inline]
pub fn color_for(zone: ZoneClass) -> Rgb { SCALE[zone.rank() as usize] }

/// Fill for an optional classification; a miss gets the neutral color.
#[inline]
pub fn fill_for(zone: Option<ZoneClass>) -> Rgb { zone.map_or(NO_DATA, color_for) }
