use thiserror::Error;

/// Why a boundary dataset could not be turned into regions.
#[derive(Debug, Error)]
pub enum LoadCause {
    #[error("no dataset locator registered for region {0}")]
    UnknownRegion(String),

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "download")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("dataset missing: {0}")]
    Missing(String),

    #[error("malformed GeoJSON: {0}")]
    Parse(String),
}

/// A failed sub-region (or top-level) boundary load.
/// The caller keeps whatever was visible before the request.
#[derive(Debug, Error)]
#[error("failed to load boundaries for region {parent_code}: {cause}")]
pub struct RegionLoadError {
    pub parent_code: String,
    #[source]
    pub cause: LoadCause,
}

impl RegionLoadError {
    pub fn new(parent_code: impl Into<String>, cause: LoadCause) -> Self {
        Self { parent_code: parent_code.into(), cause }
    }
}

#[derive(Debug, Error)]
pub enum DensityError {
    #[error("invalid density table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zone rank {rank} out of range for {code}/{profession}")]
    InvalidRank { code: String, profession: String, rank: u8 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// A navigation transition that is not allowed from the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("cannot select sub-region {code} with no region selected")]
    NoRegionSelected { code: String },

    #[error("sub-region {code} belongs to region {parent}, not the selected region {selected}")]
    ForeignSubRegion { code: String, parent: String, selected: String },

    #[error("sub-region {code} is not in the visible set")]
    UnknownSubRegion { code: String },
}

/// Failure of a session operation that may both navigate and load.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Nav(#[from] NavError),

    #[error(transparent)]
    Load(#[from] RegionLoadError),
}
