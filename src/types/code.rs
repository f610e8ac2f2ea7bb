/// Two levels of the administrative hierarchy below the country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionLevel {
    Region,     // Top-level entity, e.g. "75", "2A", "971"
    SubRegion,  // SubRegion -> Region, e.g. "75056", "2A004", "97105"
}

impl RegionLevel {
    pub fn to_str(&self) -> &'static str {
        match self {
            RegionLevel::Region => "region",
            RegionLevel::SubRegion => "subregion",
        }
    }
}

/// Length of the region prefix inside a sub-region code.
/// Overseas regions use three characters ("971"), everything else two ("01", "2A").
#[inline]
fn region_prefix_len(code: &str) -> usize {
    if code.starts_with("97") || code.starts_with("98") { 3 } else { 2 }
}

/// Returns the parent region code of a sub-region code by truncating it to the region prefix.
/// Returns `None` when the code is too short to be a sub-region code.
pub fn parent_code_of(code: &str) -> Option<&str> {
    let code = code.trim();
    let len = region_prefix_len(code);
    if code.len() <= len || !code.is_char_boundary(len) { return None }
    Some(&code[..len])
}

/// Guess the level of a code from its shape.
pub fn level_of(code: &str) -> RegionLevel {
    let code = code.trim();
    if code.len() > region_prefix_len(code) { RegionLevel::SubRegion } else { RegionLevel::Region }
}
