//! Summary histograms over the school collection.

use std::collections::BTreeMap;

use suburb_explorer_layer_models::{Collection, SchoolSummary, Stage, property_text};

use crate::{RANKING_RANK_KEY, REMOTE_AREA_KEY, SECTOR_KEY, STAGE_KEY};

/// Counts schools per sector, remoteness and stage in one pass.
///
/// Blank or missing values are left out of their histogram. Stage labels
/// that are present but unrecognized are counted as [`Stage::Other`].
#[must_use]
pub fn summarize(schools: &Collection) -> SchoolSummary {
    let mut sector_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut remote_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut stage_counts: BTreeMap<Stage, usize> = Stage::ALL.iter().map(|s| (*s, 0)).collect();
    let mut has_rankings = false;

    for school in schools.iter() {
        if let Some(sector) = property_text(school, SECTOR_KEY) {
            *sector_counts.entry(sector).or_default() += 1;
        }
        if let Some(remote) = property_text(school, REMOTE_AREA_KEY) {
            *remote_counts.entry(remote).or_default() += 1;
        }
        if let Some(stage) = property_text(school, STAGE_KEY) {
            *stage_counts.entry(Stage::from_label(&stage)).or_default() += 1;
        }
        has_rankings |= school
            .property(RANKING_RANK_KEY)
            .is_some_and(|rank| !rank.is_null());
    }

    SchoolSummary {
        count: schools.len(),
        sector_counts,
        remote_counts,
        stage_counts,
        has_rankings,
    }
}
