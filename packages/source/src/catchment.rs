//! Splits the school catchment feed into primary, high and other layers.

use std::collections::BTreeMap;
use std::sync::Arc;

use geojson::Feature;
use suburb_explorer_layer_models::{CatchmentLevel, CatchmentSummary, Collection, property_str};

/// Property holding the catchment level. Matched exactly (case-sensitive,
/// untrimmed) against the lower-case level names.
pub const CATCHMENT_LEVEL_KEY: &str = "catchment_level";

/// Reads a feature's catchment level. Anything other than an exact level
/// name is `None`.
#[must_use]
pub fn catchment_level(feature: &Feature) -> Option<CatchmentLevel> {
    let label = property_str(feature, CATCHMENT_LEVEL_KEY)?;
    CatchmentLevel::ALL
        .into_iter()
        .find(|level| level.as_ref() == label)
}

/// Partitions a catchment feed by level.
///
/// Empty groups are absent from the map; features without a recognized
/// level are left out.
#[must_use]
pub fn group_catchments(feed: &Collection) -> BTreeMap<CatchmentLevel, Collection> {
    let mut groups: BTreeMap<CatchmentLevel, Vec<Arc<Feature>>> = BTreeMap::new();

    for feature in feed.shared() {
        if let Some(level) = catchment_level(feature) {
            groups.entry(level).or_default().push(Arc::clone(feature));
        }
    }

    groups
        .into_iter()
        .map(|(level, features)| (level, Collection::from_shared(features)))
        .collect()
}

/// Counts the whole feed and each present group.
#[must_use]
pub fn summarize_catchments(
    feed: &Collection,
    groups: &BTreeMap<CatchmentLevel, Collection>,
) -> CatchmentSummary {
    CatchmentSummary {
        count: feed.len(),
        levels: groups
            .iter()
            .map(|(level, layer)| (*level, layer.len()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn area(level: serde_json::Value) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[115.0, -32.0], [115.1, -32.0], [115.1, -31.9], [115.0, -32.0]]],
            },
            "properties": { "schoolname": "Test", "catchment_level": level },
        }))
        .unwrap()
    }

    #[test]
    fn primary_only_feed_has_only_primary_key() {
        let feed: Collection = vec![area(json!("primary")), area(json!("primary"))]
            .into_iter()
            .collect();
        let groups = group_catchments(&feed);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&CatchmentLevel::Primary].len(), 2);
        assert!(!groups.contains_key(&CatchmentLevel::High));
        assert!(!groups.contains_key(&CatchmentLevel::Other));
    }

    #[test]
    fn level_match_is_exact() {
        let feed: Collection = vec![
            area(json!("high")),
            area(json!("High")),
            area(json!(" high")),
            area(json!("other")),
            area(json!("secondary")),
            area(json!(null)),
        ]
        .into_iter()
        .collect();
        let groups = group_catchments(&feed);

        assert_eq!(groups[&CatchmentLevel::High].len(), 1);
        assert_eq!(groups[&CatchmentLevel::Other].len(), 1);
        assert!(!groups.contains_key(&CatchmentLevel::Primary));
    }

    #[test]
    fn summary_counts_feed_and_present_levels() {
        let feed: Collection = vec![
            area(json!("primary")),
            area(json!("high")),
            area(json!("high")),
            area(json!("unknown")),
        ]
        .into_iter()
        .collect();
        let groups = group_catchments(&feed);
        let summary = summarize_catchments(&feed, &groups);

        assert_eq!(summary.count, 4);
        assert_eq!(
            summary.levels,
            BTreeMap::from([(CatchmentLevel::Primary, 1), (CatchmentLevel::High, 2)])
        );
    }

    #[test]
    fn feed_without_levels_has_no_groups() {
        let feed: Collection = std::iter::once(area(json!(null))).collect();
        assert!(group_catchments(&feed).is_empty());
    }
}
