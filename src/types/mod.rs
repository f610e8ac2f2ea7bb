mod code;
mod listing;
mod region;

pub use code::{level_of, parent_code_of, RegionLevel};
pub use listing::{markers_from_listings, Listing, ListingPayload, MarkerKind, MarkerPoint};
pub use region::{Bounded, Region, SubRegion};
