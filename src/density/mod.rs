//! Density classification of sub-regions and the overlays drawn from it.

mod color;
mod heat;
mod overlay;
mod table;
mod zone;

pub use color::{color_for, fill_for, Rgb, NO_DATA};
pub use heat::{heat_points, heat_weight, HeatPoint};
pub use overlay::{Legend, Overlay, OverlayMode, OverlayRenderer, StyledFeature, ZoneFilter};
pub use table::{DensityRecord, DensityTable};
pub use zone::ZoneClass;
