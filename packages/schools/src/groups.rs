//! Sector/stage grouping of schools into map layers.

use std::collections::BTreeMap;
use std::sync::Arc;

use suburb_explorer_layer_models::{Collection, Stage, property_text};

use crate::{SECTOR_KEY, STAGE_KEY};

/// Sector key used for schools with a blank or missing sector.
pub const UNKNOWN_SECTOR: &str = "other";

/// Schools sharing a sector and stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolGroup {
    /// Lower-cased sector, or [`UNKNOWN_SECTOR`].
    pub sector: String,
    /// Stage of every school in the group.
    pub stage: Stage,
    /// The schools, in collection order.
    pub schools: Collection,
}

/// Splits schools into (sector, stage) groups, ordered by the first
/// school seen in each group.
#[must_use]
pub fn sector_stage_groups(schools: &Collection) -> Vec<SchoolGroup> {
    let mut index: BTreeMap<(String, Stage), usize> = BTreeMap::new();
    let mut groups: Vec<(String, Stage, Vec<Arc<geojson::Feature>>)> = Vec::new();

    for school in schools.shared() {
        let sector = property_text(school, SECTOR_KEY)
            .map_or_else(|| UNKNOWN_SECTOR.to_string(), |s| s.to_lowercase());
        let stage = property_text(school, STAGE_KEY)
            .map_or(Stage::Other, |label| Stage::from_label(&label));

        let slot = *index.entry((sector.clone(), stage)).or_insert_with(|| {
            groups.push((sector, stage, Vec::new()));
            groups.len() - 1
        });
        groups[slot].2.push(Arc::clone(school));
    }

    groups
        .into_iter()
        .map(|(sector, stage, members)| SchoolGroup {
            sector,
            stage,
            schools: Collection::from_shared(members),
        })
        .collect()
}
