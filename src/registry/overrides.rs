use serde::{Deserialize, Serialize};

/// A region whose principal-city commune is replaced by finer partitions (arrondissements).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSpec {
    pub parent_code: String,
    pub commune_code: String,
    pub city: String,
    /// Partition codes the override dataset is expected to contain. Empty means unchecked.
    #[serde(default)]
    pub partitions: Vec<String>,
}

impl OverrideSpec {
    /// Spec whose partitions are numbered `first..=last`.
    fn numbered(parent_code: &str, commune_code: &str, city: &str, first: u32, last: u32) -> Self {
        Self {
            parent_code: parent_code.to_string(),
            commune_code: commune_code.to_string(),
            city: city.to_string(),
            partitions: (first..=last).map(|code| code.to_string()).collect(),
        }
    }
}

/// The built-in large-city overrides: Paris, Lyon and Marseille.
pub fn default_overrides() -> Vec<OverrideSpec> {
    vec![
        OverrideSpec::numbered("75", "75056", "Paris", 75101, 75120),
        OverrideSpec::numbered("69", "69123", "Lyon", 69381, 69389),
        OverrideSpec::numbered("13", "13055", "Marseille", 13201, 13216),
    ]
}
