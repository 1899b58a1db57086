#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! School classification and aggregation.
//!
//! Schools arrive as points whose properties carry the year range they
//! teach (`lowyear`/`highyear`), their sector, remoteness and an optional
//! ranking. This crate derives the [`Stage`](suburb_explorer_layer_models::Stage)
//! label, summary histograms and the percentile filter used by the school
//! layer.

pub mod groups;
pub mod percentile;
pub mod stage;
pub mod summary;

pub use groups::{SchoolGroup, sector_stage_groups};
pub use percentile::{filter_by_percentile, parse_numeric_percentage, percentile_ceiling};
pub use stage::{compute_stage, ensure_stages};
pub use summary::summarize;

/// Property holding the lowest year taught (e.g. `"PP"`, `"Y07"`).
pub const LOW_YEAR_KEY: &str = "lowyear";

/// Property holding the highest year taught.
pub const HIGH_YEAR_KEY: &str = "highyear";

/// Property holding the derived or upstream-supplied stage label.
pub const STAGE_KEY: &str = "stage";

/// Property holding the school sector (e.g. `"Government"`).
pub const SECTOR_KEY: &str = "sector";

/// Property holding the remoteness classification.
pub const REMOTE_AREA_KEY: &str = "remotearea";

/// Property holding the school's ranking position.
pub const RANKING_RANK_KEY: &str = "ranking_rank";

/// Property holding the ranking percentile (number or `"87.5%"`).
pub const RANKING_PERCENTILE_KEY: &str = "ranking_percentile";
