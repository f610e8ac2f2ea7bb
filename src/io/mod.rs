//! IO module for format-specific reading and writing operations.
//!
//! - `geojson` - boundary datasets in, styled overlay feature collections out

pub(crate) mod geojson;
