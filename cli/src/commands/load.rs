use std::sync::Arc;

use anyhow::{bail, Context, Result};
use geonav::{HttpSource, LoadOutcome, RegionLoader, RegionRegistry};
use tracing::info;

use super::config;

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::LoadArgs) -> Result<()> {
    let config = config(cli)?;
    let registry = Arc::new(RegionRegistry::from_options(&config.data, &config.overrides));
    let loader = RegionLoader::new(HttpSource::default(), registry);

    let overrides = loader.preload_overrides().await;
    info!(region = %args.region, overrides, "loading sub-regions");
    let set = match loader.load_sub_regions(&args.region).await? {
        LoadOutcome::Applied(set) => set,
        LoadOutcome::Superseded { parent_code, .. } => bail!("load of region {parent_code} was superseded"),
    };

    if let Some(path) = &args.output {
        let bytes = serde_json::to_vec(&set.to_geojson())?;
        std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Wrote {} sub-regions of {} to {}", set.len(), set.parent_code, path.display());
        return Ok(());
    }

    if let Some(city) = &set.overridden { eprintln!("{city} replaced by its arrondissements") }
    for sub in set.sub_regions.iter() {
        println!("{}\t{}", sub.code, sub.display_name());
    }
    Ok(())
}
