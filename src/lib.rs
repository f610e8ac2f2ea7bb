#![doc = "Hierarchical map navigation: region drill-down, boundary loading, marker clustering and density overlays"]
pub mod cluster;
pub mod config;
pub mod density;
pub mod error;
pub mod geom;
mod io;
pub mod loader;
pub mod nav;
pub mod registry;
pub mod session;
pub mod types;

#[doc(inline)]
pub use cluster::{ClusterIndex, ClusterNode, MarkerLayer};

#[doc(inline)]
pub use config::NavConfig;

#[doc(inline)]
pub use density::{DensityTable, OverlayMode, OverlayRenderer, ZoneClass, ZoneFilter};

#[doc(inline)]
pub use error::{ConfigError, DensityError, LoadCause, NavError, RegionLoadError, SessionError};

#[doc(inline)]
pub use loader::{BoundarySource, DiskSource, LoadOutcome, MemSource, RegionLoader, SubRegionSet};

#[cfg(feature = "download")]
#[doc(inline)]
pub use loader::HttpSource;

#[doc(inline)]
pub use nav::{Level, MapViewport, NavigationState, Navigator, RecordingViewport};

#[doc(inline)]
pub use registry::{DatasetLocator, OverrideSpec, RegionRegistry};

#[doc(inline)]
pub use session::{MapSession, Place, PlaceResolver, SearchHit, SessionSnapshot, StaticPlaces};

#[doc(inline)]
pub use types::{Listing, MarkerPoint, Region, SubRegion};
