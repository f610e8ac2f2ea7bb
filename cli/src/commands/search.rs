use std::sync::Arc;

use anyhow::{Context, Result};
use geonav::{DensityTable, HttpSource, MapSession, RecordingViewport, StaticPlaces};
use serde_json::json;

use super::{config, print_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::SearchArgs) -> Result<()> {
    let config = config(cli)?;
    let viewport = RecordingViewport::new(1024.0, 768.0, config.cluster.extent_px);
    let mut session = MapSession::new(config, HttpSource::default(), viewport, Arc::new(DensityTable::default()));

    if let Some(path) = &args.places {
        let bytes = std::fs::read(path).with_context(|| format!("failed to read places {}", path.display()))?;
        session = session.with_resolver(StaticPlaces::from_json(&bytes).with_context(|| format!("invalid places {}", path.display()))?);
    }

    session.start().await?;
    if let Some(region) = &args.region {
        session.navigate_to_region(region).await?;
    }

    let hit = session.search(&args.query).await?;
    let camera = session.viewport().commands().last().copied().map(|command| format!("{command:?}"));
    print_json(&json!({
        "hit": hit,
        "camera": camera,
        "state": session.snapshot(),
    }))
}
