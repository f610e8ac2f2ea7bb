use anyhow::{anyhow, Context, Result};
use geonav::{geom::BoundingBox, types::markers_from_listings, ClusterIndex, Listing};
use serde_json::json;

use super::{config, print_json};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ClusterArgs) -> Result<()> {
    let config = config(cli)?;
    let bytes = std::fs::read(&args.listings)
        .with_context(|| format!("failed to read listings {}", args.listings.display()))?;
    let listings: Vec<Listing> = serde_json::from_slice(&bytes)
        .with_context(|| format!("invalid listings {}", args.listings.display()))?;

    let index = ClusterIndex::build(markers_from_listings(listings), &config.cluster);

    if let Some(id) = args.expand {
        let zoom = index.expansion_zoom(id).with_context(|| format!("{id} is not a cluster id"))?;
        let leaves: Vec<&str> = index.leaves(id, usize::MAX, 0).into_iter().map(|m| &*m.id).collect();
        return print_json(&json!({ "cluster": id, "expansionZoom": zoom, "leaves": leaves }));
    }

    let bbox = match &args.bbox {
        Some(text) => text.parse::<BoundingBox>().map_err(|e| anyhow!("invalid bbox {text:?}: {e}"))?,
        None => BoundingBox::world(),
    };
    let nodes = index.query(&bbox, args.zoom);
    eprintln!("{} markers -> {} nodes at zoom {}", index.len(), nodes.len(), args.zoom);
    print_json(&serde_json::to_value(&nodes)?)
}
