use crate::geom::{projection, BoundingBox};
use super::NavEffect;

/// Current camera position as reported by the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportEvent {
    pub bounds: BoundingBox,
    pub zoom: f64,
}

pub type ViewportListener = Box<dyn FnMut(&ViewportEvent) + Send>;

/// Explicit handle to the map camera, passed to whoever needs to move it.
pub trait MapViewport {
    fn fly_to(&mut self, lng: f64, lat: f64, zoom: f64);
    fn fit_bounds(&mut self, bbox: BoundingBox);
    fn zoom(&self) -> f64;
    fn on_viewport_change(&mut self, listener: ViewportListener);
}

/// Perform the camera part of `effects`. Load requests are left to the caller.
pub fn apply_camera<V: MapViewport + ?Sized>(viewport: &mut V, effects: &[NavEffect]) {
    for effect in effects {
        match *effect {
            NavEffect::FitBounds { bbox } => viewport.fit_bounds(bbox),
            NavEffect::FlyTo { lng, lat, zoom } => viewport.fly_to(lng, lat, zoom),
            NavEffect::LoadSubRegions { .. } | NavEffect::CancelLoad => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraCommand {
    FlyTo { lng: f64, lat: f64, zoom: f64 },
    FitBounds(BoundingBox),
}

/// Headless viewport of a fixed pixel size. Keeps a log of the commands it received
/// and notifies listeners after every move. Used by the CLI and tests.
pub struct RecordingViewport {
    width_px: f64,
    height_px: f64,
    extent_px: f64,
    max_zoom: f64,
    view: ViewportEvent,
    commands: Vec<CameraCommand>,
    listeners: Vec<ViewportListener>,
}

impl RecordingViewport {
    pub fn new(width_px: f64, height_px: f64, extent_px: f64) -> Self {
        Self {
            width_px,
            height_px,
            extent_px,
            max_zoom: 22.0,
            view: ViewportEvent { bounds: BoundingBox::world(), zoom: 0.0 },
            commands: Vec::new(),
            listeners: Vec::new(),
        }
    }

    #[inline] pub fn bounds(&self) -> BoundingBox { self.view.bounds }

    #[inline] pub fn commands(&self) -> &[CameraCommand] { &self.commands }

    pub fn take_commands(&mut self) -> Vec<CameraCommand> { std::mem::take(&mut self.commands) }

    /// Move the camera as a user pan/zoom would, without logging a command.
    pub fn set_view(&mut self, lng: f64, lat: f64, zoom: f64) {
        self.view = ViewportEvent { bounds: self.bounds_around(lng, lat, zoom), zoom };
        self.notify();
    }

    /// Lon/lat box visible when centered on (lng, lat) at `zoom`.
    fn bounds_around(&self, lng: f64, lat: f64, zoom: f64) -> BoundingBox {
        let px = projection::pixel_size(zoom, self.extent_px);
        let [x, y] = projection::project(lng, lat);
        let (hw, hh) = (self.width_px * px * 0.5, self.height_px * px * 0.5);
        BoundingBox::new(
            projection::x_lng((x - hw).max(0.0)),
            projection::y_lat((y + hh).min(1.0)),
            projection::x_lng((x + hw).min(1.0)),
            projection::y_lat((y - hh).max(0.0)),
        )
    }

    fn notify(&mut self) {
        let view = self.view;
        for listener in &mut self.listeners { listener(&view) }
    }
}

impl MapViewport for RecordingViewport {
    fn fly_to(&mut self, lng: f64, lat: f64, zoom: f64) {
        let zoom = zoom.clamp(0.0, self.max_zoom);
        self.commands.push(CameraCommand::FlyTo { lng, lat, zoom });
        self.view = ViewportEvent { bounds: self.bounds_around(lng, lat, zoom), zoom };
        self.notify();
    }

    fn fit_bounds(&mut self, bbox: BoundingBox) {
        self.commands.push(CameraCommand::FitBounds(bbox));
        let zoom = projection::zoom_for_span(bbox.west, bbox.south, bbox.east, bbox.north, self.width_px, self.height_px, self.extent_px)
            .clamp(0.0, self.max_zoom);
        self.view = ViewportEvent { bounds: bbox, zoom };
        self.notify();
    }

    #[inline] fn zoom(&self) -> f64 { self.view.zoom }

    fn on_viewport_change(&mut self, listener: ViewportListener) { self.listeners.push(listener) }
}
