#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the suburb explorer.
//!
//! Loads the configured datasets the same way the map front end does and
//! prints what it would render, and wraps the live adapters (`ArcGIS`,
//! KML/KMZ, Nominatim) for one-off use.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use suburb_explorer_layer_models::{Collection, LatLng};
use suburb_explorer_loader::{ExplorerConfig, Loader, Session, Snapshot, manifest};
use suburb_explorer_schools::sector_stage_groups;
use suburb_explorer_source::arcgis::{ArcGisQuery, fetch_arcgis_geojson};
use suburb_explorer_source::{kml, nominatim};
use suburb_explorer_view::{self as view, Click, Selection};

const DEFAULT_CONFIG_PATH: &str = "suburb_explorer.toml";
const DEFAULT_ARCGIS_NAME: &str = "ArcGIS layer";

#[derive(Parser)]
#[command(name = "suburb_explorer", about = "Suburb explorer data tool")]
struct Cli {
    /// Config file. Defaults to `suburb_explorer.toml` when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured data root (directory or `http(s)://` URL)
    #[arg(long, global = true)]
    data_root: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every dataset and print what the map would show
    Load {
        /// Write the full snapshot as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resolve a map click and print the detail panel
    Select {
        /// Click latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Click longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// State filter (`STE_NAME21`). Defaults to the map's initial state.
        #[arg(long)]
        state: Option<String>,
    },
    /// Load one overlay from the manifest
    Overlay {
        /// Overlay name as listed in the manifest
        name: String,
        /// Write the overlay as `GeoJSON` to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Query a live `ArcGIS` layer and add it to the overlays
    Arcgis {
        /// `FeatureServer` or `MapServer` layer URL
        url: String,
        /// SQL-like filter (default `1=1`)
        #[arg(long = "where")]
        where_clause: Option<String>,
        /// Comma-separated attribute list (default `*`)
        #[arg(long)]
        out_fields: Option<String>,
        /// Overlay name (default `ArcGIS layer`)
        #[arg(long)]
        name: Option<String>,
        /// Write the result as `GeoJSON` to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert a `.kml` or `.kmz` file and add it to the overlays
    Kml {
        /// Input file
        path: PathBuf,
        /// Overlay name (default the file stem)
        #[arg(long)]
        name: Option<String>,
        /// Write the result to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write `index.json` for a directory of precomputed overlays
    Manifest {
        /// Overlay directory (e.g. `assets/arcgis_layers`)
        dir: PathBuf,
    },
    /// Look up an address with Nominatim
    Geocode {
        /// Free-form address
        #[arg(required = true)]
        query: Vec<String>,
    },
}

fn load_config(cli: &Cli) -> Result<ExplorerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ExplorerConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
            ExplorerConfig::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => ExplorerConfig::default(),
    };
    if let Some(root) = &cli.data_root {
        config.data_root.clone_from(root);
    }
    Ok(config)
}

async fn write_json(
    value: &impl Serialize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec_pretty(value)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}

/// Cancels `session`'s work on Ctrl-C.
fn cancel_on_interrupt(session: &Session) {
    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling outstanding loads");
            token.cancel();
        }
    });
}

async fn load_session(config: &ExplorerConfig) -> Result<Session, Box<dyn std::error::Error>> {
    let mut session = Session::new(Loader::from_config(config)?);
    cancel_on_interrupt(&session);
    session.reload().await?;
    Ok(session)
}

/// Adds `layer` to the session's overlays under `name` and lists the
/// resulting overlay map.
async fn add_overlay(
    config: &ExplorerConfig,
    name: String,
    layer: Collection,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = load_session(config).await?;
    let Some(overlays) = session.overlays_mut() else {
        return Err("load finished without an overlay loader".into());
    };
    log::info!("Overlay {name} has {} features", layer.len());
    let layer = overlays.insert(name, layer);

    let layers = overlays.layers();
    for (listed, features) in layers.iter() {
        let (label, style) = if overlays.manifest().find(listed).is_some() {
            (
                view::tables::processed_overlay_name(listed),
                view::tables::processed_overlay_style(),
            )
        } else {
            (listed.clone(), view::tables::live_overlay_style())
        };
        println!("  {label:<40} {:>5}  {}", features.len(), style.color);
    }

    write_json(&layer.to_feature_collection(), output).await
}

fn print_report(snapshot: &Snapshot) {
    let metadata = &snapshot.metadata;
    let state = view::default_state(&metadata.states);
    let center = view::map_center(metadata, state);

    println!("Regions:    {}", snapshot.regions.len());
    println!("States:     {}", metadata.states.join(", "));
    println!(
        "Opening at: {} ({:.4}, {:.4}) zoom {}",
        state.unwrap_or("all states"),
        center.lat,
        center.lon,
        view::zoom_level(state.is_some())
    );
    match metadata.irad_range {
        Some((min, max)) => println!("IRAD range: {min} - {max}"),
        None => println!("IRAD range: none, regions use {}", view::FALLBACK_COLOR),
    }

    let tooltip = view::build_tooltip_fields(&metadata.property_names, &metadata.seifa_columns);
    let aliases: Vec<&str> = tooltip.iter().map(|f| f.alias.as_str()).collect();
    println!("Tooltip:    {}", aliases.join(" "));

    if let Some(summary) = &snapshot.school_summary {
        println!("Schools:    {} (rankings: {})", summary.count, summary.has_rankings);
        for group in sector_stage_groups(&snapshot.schools) {
            println!(
                "  {:<40} {:>5}  {}",
                view::tables::school_layer_name(&group),
                group.schools.len(),
                view::school_color(&group.sector)
            );
        }
    }

    for (level, layer) in &snapshot.catchments {
        println!(
            "  {:<40} {:>5}  {}",
            view::catchment_label(level.as_ref()),
            layer.len(),
            view::catchment_color(level.as_ref())
        );
    }

    for (group, layer) in &snapshot.transit {
        let style = view::transit_style(*group);
        println!(
            "  {:<40} {:>5}  {}",
            view::tables::transit_layer_name(*group),
            layer.len(),
            style.color
        );
    }

    for name in snapshot.manifest.names() {
        println!("  {}", view::tables::processed_overlay_name(name));
    }

    for warning in &snapshot.warnings {
        println!("warning: {warning}");
    }
}

fn print_selection(selection: &Selection) {
    if let Some(school) = &selection.school {
        println!("{}", view::detail::school_heading(school));
        for (label, value) in view::detail_lines(school, view::SCHOOL_DETAIL_FIELDS) {
            println!("  {label}: {value}");
        }
    }
    if let Some(region) = &selection.region {
        println!(
            "{}",
            view::detail::region_heading(region).unwrap_or_else(|| "SA1".to_string())
        );
        for (label, value) in view::detail_lines(region, view::SA1_DETAIL_FIELDS) {
            println!("  {label}: {value}");
        }
        let highlight = view::selected_region_style();
        println!(
            "  highlight: {} outline, {} fill",
            highlight.color,
            highlight.fill_color.as_deref().unwrap_or("none")
        );
    }
    if selection.school.is_none() && selection.region.is_none() {
        println!("Nothing at that location.");
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Load { output } => {
            let session = load_session(&config).await?;
            let Some(snapshot) = session.snapshot() else {
                return Err("load finished without a snapshot".into());
            };
            print_report(snapshot);
            if let Some(path) = output {
                write_json(snapshot.as_ref(), Some(&path)).await?;
            }
        }
        Commands::Select { lat, lon, state } => {
            let session = load_session(&config).await?;
            let Some(snapshot) = session.snapshot() else {
                return Err("load finished without a snapshot".into());
            };
            let state = state.or_else(|| {
                view::default_state(&snapshot.metadata.states).map(ToString::to_string)
            });
            let regions = view::filter_by_state(&snapshot.regions, state.as_deref());
            let schools = view::filter_by_state(&snapshot.schools, state.as_deref());

            let click = Click {
                at: Some(LatLng { lat, lon }),
                properties: None,
            };
            let selection =
                view::select::resolve_click(&click, &schools, &regions, &Selection::default());
            print_selection(&selection);
        }
        Commands::Overlay { name, output } => {
            let mut session = load_session(&config).await?;
            let Some(overlays) = session.overlays_mut() else {
                return Err("load finished without an overlay loader".into());
            };
            overlays.request(&name)?;
            for settled in overlays.settle_all().await {
                let layer = settled.result?;
                log::info!("Overlay {} has {} features", settled.name, layer.len());
                write_json(&layer.to_feature_collection(), output.as_deref()).await?;
            }
        }
        Commands::Arcgis {
            url,
            where_clause,
            out_fields,
            name,
            output,
        } => {
            let client = config.http_client()?;
            let mut query = ArcGisQuery::new(url);
            if let Some(where_clause) = where_clause {
                query = query.with_where(where_clause);
            }
            if let Some(out_fields) = out_fields {
                query = query.with_out_fields(out_fields);
            }
            let layer = fetch_arcgis_geojson(&client, &query).await?;
            let name = name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_ARCGIS_NAME.to_string());
            add_overlay(&config, name, layer, output.as_deref()).await?;
        }
        Commands::Kml { path, name, output } => {
            let layer = kml::load_kml_file(&path).await?;
            log::info!("Converted {} placemarks from {}", layer.len(), path.display());
            let name = name.unwrap_or_else(|| {
                path.file_stem()
                    .map_or_else(|| "KML layer".to_string(), |s| s.to_string_lossy().into_owned())
            });
            add_overlay(&config, name, layer, output.as_deref()).await?;
        }
        Commands::Manifest { dir } => {
            let (path, manifest) = manifest::write_manifest(&dir).await?;
            println!("{} overlays listed in {}", manifest.layers.len(), path.display());
        }
        Commands::Geocode { query } => {
            let client = config.http_client()?;
            let query = query.join(" ");
            match nominatim::geocode_address(&client, &config.nominatim_url, &query).await? {
                Some(pin) => write_json(&pin, None).await?,
                None => println!("No match for {query:?}"),
            }
        }
    }

    Ok(())
}
