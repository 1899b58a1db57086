//! Initial map centre and zoom.

use suburb_explorer_layer_models::{LatLng, Metadata};

/// Centre of the continent, used when nothing better is known.
pub const AUSTRALIA_CENTER: LatLng = LatLng {
    lat: -25.2744,
    lon: 133.7751,
};

/// Capital cities keyed by state name as it appears in `STE_NAME21`.
pub const STATE_CAPITALS: &[(&str, LatLng)] = &[
    (
        "Australian Capital Territory",
        LatLng {
            lat: -35.2931,
            lon: 149.1269,
        },
    ),
    (
        "New South Wales",
        LatLng {
            lat: -33.8678,
            lon: 151.2100,
        },
    ),
    (
        "Northern Territory",
        LatLng {
            lat: -12.4381,
            lon: 130.8411,
        },
    ),
    (
        "Queensland",
        LatLng {
            lat: -27.4678,
            lon: 153.0281,
        },
    ),
    (
        "South Australia",
        LatLng {
            lat: -34.9275,
            lon: 138.6000,
        },
    ),
    (
        "Tasmania",
        LatLng {
            lat: -42.8806,
            lon: 147.3250,
        },
    ),
    (
        "Victoria",
        LatLng {
            lat: -37.8142,
            lon: 144.9631,
        },
    ),
    (
        "Western Australia",
        LatLng {
            lat: -31.9559,
            lon: 115.8606,
        },
    ),
];

const PREFERRED_STATE: &str = "Western Australia";

/// Chooses where the map opens.
///
/// With a state selected: its capital if the name is listed in
/// [`STATE_CAPITALS`], else its bounding-box centre from `metadata`.
/// Otherwise, or if neither is known, the centre of all data, then
/// [`AUSTRALIA_CENTER`].
#[must_use]
pub fn map_center(metadata: &Metadata, state: Option<&str>) -> LatLng {
    if let Some(state) = state {
        if let Some((_, capital)) = STATE_CAPITALS.iter().find(|(name, _)| *name == state) {
            return *capital;
        }
        if let Some(center) = metadata.state_centers.get(state) {
            return *center;
        }
    }

    metadata
        .total_bounds
        .map_or(AUSTRALIA_CENTER, |bounds| bounds.center())
}

/// Zoom level for the initial view.
#[must_use]
pub const fn zoom_level(state_selected: bool) -> u8 {
    if state_selected { 10 } else { 4 }
}

/// State selected on first render: Western Australia when the data has
/// it, else the first state listed.
#[must_use]
pub fn default_state(states: &[String]) -> Option<&str> {
    states
        .iter()
        .find(|s| s.as_str() == PREFERRED_STATE)
        .or_else(|| states.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use suburb_explorer_layer_models::Bbox;

    fn metadata() -> Metadata {
        let mut metadata = Metadata {
            total_bounds: Some(Bbox {
                min_lon: 110.0,
                min_lat: -40.0,
                max_lon: 120.0,
                max_lat: -30.0,
            }),
            ..Metadata::default()
        };
        metadata
            .state_centers
            .insert("Other Territories".to_string(), LatLng { lat: -10.5, lon: 105.6 });
        metadata
    }

    #[test]
    fn state_name_uses_capital() {
        let perth = LatLng {
            lat: -31.9559,
            lon: 115.8606,
        };
        assert_eq!(map_center(&metadata(), Some("Western Australia")), perth);
        assert_eq!(
            map_center(&Metadata::default(), Some("Western Australia")),
            perth
        );
        assert_eq!(map_center(&metadata(), Some("WA")), LatLng { lat: -35.0, lon: 115.0 });
    }

    #[test]
    fn state_without_capital_uses_metadata_center() {
        assert_eq!(
            map_center(&metadata(), Some("Other Territories")),
            LatLng { lat: -10.5, lon: 105.6 }
        );
    }

    #[test]
    fn unknown_state_uses_total_bounds() {
        assert_eq!(
            map_center(&metadata(), Some("Atlantis")),
            LatLng { lat: -35.0, lon: 115.0 }
        );
        assert_eq!(map_center(&metadata(), None), LatLng { lat: -35.0, lon: 115.0 });
    }

    #[test]
    fn empty_metadata_uses_continent_center() {
        assert_eq!(map_center(&Metadata::default(), None), AUSTRALIA_CENTER);
    }

    #[test]
    fn zoom_depends_on_selection() {
        assert_eq!(zoom_level(true), 10);
        assert_eq!(zoom_level(false), 4);
    }

    #[test]
    fn default_state_prefers_western_australia() {
        let states = vec!["New South Wales".to_string(), "Western Australia".to_string()];
        assert_eq!(default_state(&states), Some("Western Australia"));

        let states = vec!["Tasmania".to_string(), "Victoria".to_string()];
        assert_eq!(default_state(&states), Some("Tasmania"));
        assert_eq!(default_state(&[]), None);
    }
}
