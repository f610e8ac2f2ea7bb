use std::sync::Arc;

use anyhow::{bail, Context, Result};
use geonav::{
    density::Overlay, DensityTable, HttpSource, LoadOutcome, OverlayMode, OverlayRenderer, RegionLoader,
    RegionRegistry, ZoneClass, ZoneFilter,
};
use serde_json::json;
use tracing::info;

use super::{config, print_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::OverlayArgs) -> Result<()> {
    let config = config(cli)?;
    let table = DensityTable::from_path(&args.density)?;
    if !table.professions().contains(&args.profession.as_str()) {
        eprintln!("warning: profession {} has no density data", args.profession);
    }

    let registry = Arc::new(RegionRegistry::from_options(&config.data, &config.overrides));
    let loader = RegionLoader::new(HttpSource::default(), registry);
    let overrides = loader.preload_overrides().await;
    info!(region = %args.region, overrides, "loading sub-regions");
    let set = match loader.load_sub_regions(&args.region).await? {
        LoadOutcome::Applied(set) => set,
        LoadOutcome::Superseded { parent_code, .. } => bail!("load of region {parent_code} was superseded"),
    };

    let mut renderer = OverlayRenderer::new(Arc::new(table), config.heatmap);
    renderer.set_profession(Some(args.profession.clone()));
    if !args.zones.is_empty() {
        let zones = args.zones.iter()
            .map(|&rank| ZoneClass::from_rank(rank).with_context(|| format!("zone rank {rank} out of range 0..=4")))
            .collect::<Result<Vec<_>>>()?;
        *renderer.filter_mut() = ZoneFilter::only(&zones);
    }
    renderer.set_mode(if args.heatmap { OverlayMode::Heatmap } else { OverlayMode::Choropleth });

    let legend = renderer.legend(&set.sub_regions);
    for (zone, color, count) in legend.rows() {
        eprintln!("{color}  {zone:<18} {count}");
    }
    eprintln!("{:7}  {:<18} {}", "", "no data", legend.no_data);

    if let Some(path) = &args.output {
        let bytes = serde_json::to_vec(&renderer.to_geojson(&set.sub_regions))?;
        std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Wrote overlay of {} to {}", set.parent_code, path.display());
        return Ok(());
    }

    match renderer.render(&set.sub_regions) {
        Overlay::Heatmap(points) => print_json(&json!(points)),
        overlay @ Overlay::Choropleth(_) => print_json(&serde_json::to_value(&overlay)?),
    }
}
