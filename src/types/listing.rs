use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Read-only listing record as delivered by listing storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub premium_flag: bool,
    #[serde(default)]
    pub view_count: u64,
}

/// Display data carried by a listing marker. Opaque to the clustering engine
/// except for its kind, which feeds `childTypes` of cluster nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    pub title: Option<String>,
    pub kind: String,
    pub specialty: Option<String>,
    pub price: Option<f64>,
    pub premium: bool,
    pub view_count: u64,
}

/// A point to cluster: an id, a lon/lat position and an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerPoint<T> {
    pub id: Arc<str>,
    pub lng: f64,
    pub lat: f64,
    pub payload: T,
}

/// Category of a marker payload, aggregated into cluster nodes.
pub trait MarkerKind {
    fn kind(&self) -> &str;
}

impl MarkerKind for ListingPayload {
    #[inline] fn kind(&self) -> &str { &self.kind }
}

impl MarkerKind for String {
    #[inline] fn kind(&self) -> &str { self }
}

impl MarkerKind for &'static str {
    #[inline] fn kind(&self) -> &str { self }
}

impl<T> MarkerPoint<T> {
    pub fn new(id: &str, lng: f64, lat: f64, payload: T) -> Self {
        Self { id: Arc::from(id), lng, lat, payload }
    }
}

impl From<Listing> for MarkerPoint<ListingPayload> {
    fn from(listing: Listing) -> Self {
        MarkerPoint {
            id: Arc::from(listing.id),
            lng: listing.lng,
            lat: listing.lat,
            payload: ListingPayload {
                title: listing.title,
                kind: listing.kind,
                specialty: listing.specialty,
                price: listing.price,
                premium: listing.premium_flag,
                view_count: listing.view_count,
            },
        }
    }
}

/// Project listings to markers, skipping records without a usable coordinate.
pub fn markers_from_listings<I>(listings: I) -> Vec<MarkerPoint<ListingPayload>>
where I: IntoIterator<Item = Listing> {
    listings.into_iter()
        .filter(|listing| {
            let valid = listing.lat.is_finite() && listing.lng.is_finite()
                && (-90.0..=90.0).contains(&listing.lat)
                && (-180.0..=180.0).contains(&listing.lng);
            if !valid { warn!(id = %listing.id, lat = listing.lat, lng = listing.lng, "skipping listing with invalid coordinates") }
            valid
        })
        .map(MarkerPoint::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_json_maps_to_marker() {
        let json = r#"[
            {"id": "a", "lat": 48.85, "lng": 2.35, "type": "cabinet", "premiumFlag": true, "viewCount": 12},
            {"id": "b", "lat": 45.76, "lng": 4.83, "type": "local", "specialty": "kine", "price": 1200.0}
        ]"#;
        let listings: Vec<Listing> = serde_json::from_str(json).unwrap();
        let markers = markers_from_listings(listings);

        assert_eq!(markers.len(), 2);
        assert_eq!(&*markers[0].id, "a");
        assert!(markers[0].payload.premium);
        assert_eq!(markers[0].payload.view_count, 12);
        assert_eq!(markers[1].payload.kind(), "local");
        assert_eq!(markers[1].payload.specialty.as_deref(), Some("kine"));
    }

    #[test]
    fn invalid_coordinates_are_skipped() {
        let listing = |id: &str, lat: f64, lng: f64| Listing {
            id: id.into(), lat, lng, kind: "local".into(),
            title: None, specialty: None, price: None, premium_flag: false, view_count: 0,
        };
        let markers = markers_from_listings(vec![
            listing("ok", 43.3, 5.4),
            listing("nan", f64::NAN, 5.4),
            listing("far", 120.0, 5.4),
        ]);
        assert_eq!(markers.len(), 1);
        assert_eq!(&*markers[0].id, "ok");
    }
}
