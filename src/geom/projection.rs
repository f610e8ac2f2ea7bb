//! Spherical Web-Mercator helpers.
//!
//! Points are projected into the unit square: x in [0, 1] from west to east,
//! y in [0, 1] from north to south. At zoom `z` the world is `extent * 2^z`
//! pixels wide, so a distance of `d` pixels is `d / (extent * 2^z)` units.

use std::f64::consts::PI;

/// Project a longitude to x in [0, 1].
#[inline]
pub fn lng_x(lng: f64) -> f64 { lng / 360.0 + 0.5 }

/// Project a latitude to y in [0, 1], clamped at the poles.
#[inline]
pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Inverse of [`lng_x`].
#[inline]
pub fn x_lng(x: f64) -> f64 { (x - 0.5) * 360.0 }

/// Inverse of [`lat_y`].
#[inline]
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Project (lng, lat) into the unit square.
#[inline]
pub fn project(lng: f64, lat: f64) -> [f64; 2] { [lng_x(lng), lat_y(lat)] }

/// Size of one screen pixel in projected units at `zoom`.
#[inline]
pub fn pixel_size(zoom: f64, extent: f64) -> f64 { 1.0 / (extent * 2f64.powf(zoom)) }

/// Zoom at which the given lon/lat span fits in a viewport of `width_px` x `height_px`.
pub fn zoom_for_span(west: f64, south: f64, east: f64, north: f64, width_px: f64, height_px: f64, extent: f64) -> f64 {
    let dx = (lng_x(east) - lng_x(west)).abs().max(f64::EPSILON);
    let dy = (lat_y(south) - lat_y(north)).abs().max(f64::EPSILON);
    let zx = (width_px / (extent * dx)).log2();
    let zy = (height_px / (extent * dy)).log2();
    zx.min(zy)
}
