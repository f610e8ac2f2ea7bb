// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::{collections::HashMap, sync::Mutex};

use geonav::{BoundarySource, DatasetLocator, LoadCause, MemSource};
use tokio::sync::oneshot;

/// Axis-aligned square feature as GeoJSON text.
pub fn square(code: &str, name: &str, x: f64, y: f64, size: f64) -> String {
    let (x1, y1) = (x + size, y + size);
    format!(
        r#"{{"type":"Feature","properties":{{"code":"{code}","nom":"{name}"}},
            "geometry":{{"type":"Polygon","coordinates":[[[{x},{y}],[{x1},{y}],[{x1},{y1}],[{x},{y1}],[{x},{y}]]]}}}}"#
    )
}

pub fn collection(features: &[String]) -> Vec<u8> {
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(",")).into_bytes()
}

/// A row of `codes` as adjacent squares starting at (x, y).
pub fn row(codes: &[&str], x: f64, y: f64, size: f64) -> Vec<u8> {
    let features: Vec<String> = codes.iter().enumerate()
        .map(|(i, code)| square(code, &format!("Commune {code}"), x + i as f64 * size, y, size))
        .collect();
    collection(&features)
}

/// Memory source whose fetches can be held back until a gate is opened.
#[derive(Default)]
pub struct GatedSource {
    inner: MemSource,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
}

impl GatedSource {
    pub fn new(inner: MemSource) -> Self { Self { inner, gates: Mutex::default() } }

    /// Hold the next fetch of `key` until the returned sender fires or is dropped.
    pub fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }
}

impl BoundarySource for GatedSource {
    async fn fetch(&self, locator: &DatasetLocator) -> Result<Vec<u8>, LoadCause> {
        let key = match locator {
            DatasetLocator::Key(key) => key.clone(),
            other => other.to_string(),
        };
        let gate = self.gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate { let _ = gate.await; }
        self.inner.fetch(locator).await
    }
}
