mod bbox;
mod index;
pub mod projection;

pub use bbox::BoundingBox;
pub use index::PolygonIndex;
