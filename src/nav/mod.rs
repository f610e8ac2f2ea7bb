//! Drill-down navigation: country, region, sub-region.
//!
//! [`Navigator`] owns the [`NavigationState`] and only changes it through its
//! transition methods. Transitions return [`NavEffect`]s (camera moves, load
//! requests) that the caller carries out against a [`MapViewport`] and the loader.

mod dispatch;
mod state;
mod viewport;

pub use dispatch::{FeatureDispatch, FeatureEvent, FeatureTarget};
pub use state::{ErrorNotice, LayerHint, Level, NavEffect, NavigationState, Navigator, VisibleLayer};
pub use viewport::{apply_camera, CameraCommand, MapViewport, RecordingViewport, ViewportEvent, ViewportListener};
