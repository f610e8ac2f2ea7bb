use std::fmt;

use serde::{Deserialize, Serialize};

/// Five ordinal levels of professional density for a profession in a sub-region,
/// from most opportunity (rank 0) to least (rank 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ZoneClass {
    VeryUnderServed,
    UnderServed,
    Intermediate,
    WellServed,
    OverServed,
}

impl ZoneClass {
    pub const ALL: [ZoneClass; 5] = [
        ZoneClass::VeryUnderServed,
        ZoneClass::UnderServed,
        ZoneClass::Intermediate,
        ZoneClass::WellServed,
        ZoneClass::OverServed,
    ];

    /// Highest rank, used to normalize weights.
    pub const MAX_RANK: u8 = 4;

    #[inline] pub fn rank(self) -> u8 { self as u8 }

    pub fn from_rank(rank: u8) -> Option<Self> { Self::ALL.get(rank as usize).copied() }

    pub fn to_str(self) -> &'static str {
        match self {
            ZoneClass::VeryUnderServed => "very-under-served",
            ZoneClass::UnderServed => "under-served",
            ZoneClass::Intermediate => "intermediate",
            ZoneClass::WellServed => "well-served",
            ZoneClass::OverServed => "over-served",
        }
    }
}

impl TryFrom<u8> for ZoneClass {
    type Error = String;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        Self::from_rank(rank).ok_or_else(|| format!("zone rank {rank} out of range 0..={}", Self::MAX_RANK))
    }
}

impl From<ZoneClass> for u8 {
    fn from(zone: ZoneClass) -> u8 { zone.rank() }
}

impl fmt::Display for ZoneClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(self.to_str()) }
}
