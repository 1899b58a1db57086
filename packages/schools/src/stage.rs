//! Stage inference from enrolment-year codes.

use std::sync::Arc;

use geojson::Feature;
use suburb_explorer_layer_models::{Collection, Stage, property_text};

use crate::{HIGH_YEAR_KEY, LOW_YEAR_KEY, STAGE_KEY};

/// Year codes that mean kindergarten or pre-primary.
const PRE_PRIMARY_CODES: &[&str] = &["KIN", "PP", "P"];

/// Last year number that counts as primary.
const LAST_PRIMARY_YEAR: u8 = 6;

/// Classifies a school by its lowest and highest year codes.
///
/// Codes are either a pre-primary marker (`KIN`, `PP`, `P`) or `Y`
/// followed by a two-digit year (`Y06`, `Y12`). Each bound is examined on
/// its own: a bound in pre-primary or year ≤ 6 makes the school primary, a
/// bound at year ≥ 7 makes it secondary, both make it combined.
#[must_use]
pub fn compute_stage(low_year: Option<&str>, high_year: Option<&str>) -> Stage {
    let mut has_primary = false;
    let mut has_secondary = false;

    for code in [low_year, high_year].into_iter().flatten() {
        let code = code.trim().to_ascii_uppercase();
        if PRE_PRIMARY_CODES.contains(&code.as_str()) {
            has_primary = true;
        } else if let Some(year) = year_number(&code) {
            if year <= LAST_PRIMARY_YEAR {
                has_primary = true;
            } else {
                has_secondary = true;
            }
        }
    }

    match (has_primary, has_secondary) {
        (true, true) => Stage::Combined,
        (true, false) => Stage::Primary,
        (false, true) => Stage::Secondary,
        (false, false) => Stage::Other,
    }
}

/// `Y07` -> 7. Needs the `Y` and two digits; trailing characters are
/// ignored.
fn year_number(code: &str) -> Option<u8> {
    code.strip_prefix('Y')?.get(..2)?.parse().ok()
}

/// Returns a collection in which every school has a `stage` property.
///
/// Schools that already carry `stage` are upstream overrides and are
/// shared untouched. The rest are copied with a computed stage. Order and
/// count are preserved.
#[must_use]
pub fn ensure_stages(schools: &Collection) -> Collection {
    let mut computed = 0usize;

    let staged: Collection = schools
        .shared()
        .iter()
        .map(|school| {
            if school.contains_property(STAGE_KEY) {
                return Arc::clone(school);
            }
            computed += 1;
            let stage = compute_stage(
                property_text(school, LOW_YEAR_KEY).as_deref(),
                property_text(school, HIGH_YEAR_KEY).as_deref(),
            );
            let mut feature = Feature::clone(school);
            feature.set_property(STAGE_KEY, stage.as_ref());
            Arc::new(feature)
        })
        .collect();

    if computed > 0 {
        log::debug!("Computed stage for {computed} of {} schools", schools.len());
    }

    staged
}
