use anyhow::Result;
use geonav::RegionRegistry;
use serde_json::json;

use super::{config, print_json};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::RegionsArgs) -> Result<()> {
    let config = config(cli)?;
    let registry = RegionRegistry::from_options(&config.data, &config.overrides);

    if args.overrides {
        let overrides: Vec<_> = registry.overrides().iter().map(|spec| json!({
            "region": spec.parent_code,
            "commune": spec.commune_code,
            "city": spec.city,
            "partitions": spec.partitions.len(),
            "locator": registry.override_locator(spec).to_string(),
        })).collect();
        return print_json(&json!(overrides));
    }

    for entry in registry.regions() {
        println!("{}\t{}\t{}", entry.code, entry.name, entry.locator);
    }
    Ok(())
}
