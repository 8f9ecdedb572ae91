use serde::{Deserialize, Serialize};

/// Measurement-unit alias row: a canonical `standard_name` plus the free-text
/// spellings providers submit for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub standard_name: String,
    pub aliases: Vec<String>,
}

impl Unit {
    pub fn new(standard_name: impl Into<String>, aliases: Vec<&str>) -> Self {
        Self {
            standard_name: standard_name.into(),
            aliases: aliases.into_iter().map(str::to_owned).collect(),
        }
    }
}

/// Maps a free-text unit name to the `standard_name` of the first Unit whose
/// alias set (or standard name) matches, case-insensitively. `None` means the
/// name is unmapped; callers treat that as a not-found failure for the one
/// item being mapped, never for a whole batch.
pub fn normalize_unit(raw: &str, units: &[Unit]) -> Option<String> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    units
        .iter()
        .find(|unit| {
            unit.standard_name.to_lowercase() == needle
                || unit.aliases.iter().any(|alias| alias.to_lowercase() == needle)
        })
        .map(|unit| unit.standard_name.clone())
}
