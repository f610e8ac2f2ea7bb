use std::path::PathBuf;

/// Map navigation CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "geonav", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file; defaults apply when absent
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding the boundary datasets (overrides the config)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the boundary datasets (overrides the config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List registered regions and their dataset locators
    Regions(RegionsArgs),

    /// Load the merged sub-regions of a region
    Load(LoadArgs),

    /// Cluster listing markers for a viewport
    Cluster(ClusterArgs),

    /// Classify the sub-regions of a region and render the density overlay
    Overlay(OverlayArgs),

    /// Search a region, sub-region or place and print the resulting state
    Search(SearchArgs),
}

#[derive(clap::Args, Debug)]
pub struct RegionsArgs {
    /// Also list the large-city overrides
    #[arg(long)]
    pub overrides: bool,
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Region code, e.g. 75, 2A, 971
    pub region: String,

    /// Write the sub-regions as GeoJSON to this file instead of listing them
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ClusterArgs {
    /// Listings JSON file (array of {id, lat, lng, type, ...})
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub listings: PathBuf,

    /// Viewport as west,south,east,north; the whole world when absent
    #[arg(short, long)]
    pub bbox: Option<String>,

    /// Zoom level
    #[arg(short, long, default_value_t = 6.0)]
    pub zoom: f64,

    /// Print the expansion zoom and leaves of this cluster instead
    #[arg(long)]
    pub expand: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct OverlayArgs {
    /// Region code
    pub region: String,

    /// Density table JSON file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub density: PathBuf,

    /// Profession code to classify for
    #[arg(short, long)]
    pub profession: String,

    /// Emit heat points instead of the choropleth
    #[arg(long)]
    pub heatmap: bool,

    /// Only render these zone ranks (0-4), comma separated
    #[arg(long, value_delimiter = ',')]
    pub zones: Vec<u8>,

    /// Write the styled choropleth as GeoJSON to this file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Free text: a region or sub-region name or code, or a place
    pub query: String,

    /// Region to drill into before searching its sub-regions
    #[arg(short, long)]
    pub region: Option<String>,

    /// Gazetteer JSON file (array of {label, lng, lat, zoom?})
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub places: Option<PathBuf>,
}
