//! Splits a single transit feed into train, bus and other layers.
//!
//! Feed vintages disagree on the spelling of the route-type attribute, so
//! all of [`ROUTE_TYPE_KEYS`] are consulted and the first non-null one
//! wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use geojson::{Feature, JsonValue};
use suburb_explorer_layer_models::{Collection, TransitGroup};

/// Route-type attribute spellings, in lookup order.
pub const ROUTE_TYPE_KEYS: &[&str] = &["ROUTETYPE", "RouteType", "route_type"];

/// Route types (lower-cased) that belong to the bus layer.
pub const BUS_ROUTE_TYPES: &[&str] = &["standard", "cat", "school"];

/// Reads a feature's route type, trimmed and lower-cased.
///
/// Returns `None` when none of the keys carries a non-null value. A blank
/// value is returned as an empty string.
#[must_use]
pub fn route_type(feature: &Feature) -> Option<String> {
    let value = ROUTE_TYPE_KEYS
        .iter()
        .filter_map(|key| feature.property(key))
        .find(|value| !value.is_null())?;

    let text = match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(text.trim().to_lowercase())
}

/// Classifies one route type.
#[must_use]
pub fn classify(route_type: &str) -> TransitGroup {
    if route_type == "train" {
        TransitGroup::Train
    } else if BUS_ROUTE_TYPES.contains(&route_type) {
        TransitGroup::Bus
    } else {
        TransitGroup::Other
    }
}

/// Groups a transit feed by route type.
///
/// Only non-empty groups are present. Features without a route type join
/// [`TransitGroup::Other`]. When no feature carries a route type at all the
/// whole feed is exposed under [`TransitGroup::All`] instead. An empty feed
/// yields an empty map.
#[must_use]
pub fn group_transit(feed: &Collection) -> BTreeMap<TransitGroup, Collection> {
    let mut groups: BTreeMap<TransitGroup, Vec<Arc<Feature>>> = BTreeMap::new();
    let mut labelled = false;

    for feature in feed.shared() {
        let group = route_type(feature).map_or(TransitGroup::Other, |kind| {
            labelled = true;
            classify(&kind)
        });
        groups.entry(group).or_default().push(Arc::clone(feature));
    }

    if !labelled && !feed.is_empty() {
        log::debug!(
            "Transit: no route type on any of {} features, exposing the whole feed",
            feed.len()
        );
        return BTreeMap::from([(TransitGroup::All, feed.clone())]);
    }

    groups
        .into_iter()
        .map(|(group, features)| (group, Collection::from_shared(features)))
        .collect()
}
