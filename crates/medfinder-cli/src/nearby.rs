//! `nearby` command: locate, load, rank and print.

use std::path::PathBuf;

use anyhow::Context;
use medfinder_catalog::{AmenityQuery, CatalogClient};
use medfinder_core::{
    rank_facilities, AppConfig, Coordinate, DistanceOption, FacilityCategory, FacilityRecord,
    FilterSpec, RankedFacility,
};
use medfinder_locator::{
    LocationConfig, LocationProvider, LocationResult, Remediation, UnsupportedHost,
};
use serde::Serialize;

pub(crate) struct NearbyArgs {
    pub manual: Option<(f64, f64)>,
    pub search: String,
    pub categories: Vec<FacilityCategory>,
    pub within: DistanceOption,
    pub catalog: Option<PathBuf>,
    pub api: Option<String>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct NearbyOutput<'a> {
    location: &'a LocationResult,
    facilities: &'a [RankedFacility],
}

/// Where facility records are read from.
#[derive(Debug, PartialEq)]
enum CatalogSource {
    File(PathBuf),
    Api(String),
}

impl CatalogSource {
    /// Explicit flags win over configuration; a configured URL wins over the
    /// default catalog file.
    fn resolve(catalog: Option<PathBuf>, api: Option<String>, config: &AppConfig) -> Self {
        match (catalog, api) {
            (Some(path), _) => Self::File(path),
            (None, Some(url)) => Self::Api(url),
            (None, None) => match &config.catalog_url {
                Some(url) => Self::Api(url.clone()),
                None => Self::File(config.catalog_path.clone()),
            },
        }
    }
}

/// Runs the `nearby` command.
///
/// # Errors
///
/// Returns an error if a manual coordinate is out of range, no location could
/// be resolved under the configured policy, or the catalog cannot be loaded.
pub(crate) async fn run_nearby(config: &AppConfig, args: NearbyArgs) -> anyhow::Result<()> {
    let location = resolve_location(config, args.manual).await?;

    if !location.is_granted() {
        print_location_notice(&location);
    }
    let Some(reference) = location.coordinate else {
        anyhow::bail!("no location available; pass --lat and --lon to search from a fixed point");
    };

    let source = CatalogSource::resolve(args.catalog, args.api, config);
    let query = AmenityQuery {
        // Only one category can be narrowed server-side.
        category: match args.categories.as_slice() {
            [single] => Some(*single),
            _ => None,
        },
        near: Some(reference),
    };
    let records = load_records(config, &source, &query).await?;

    let filter = FilterSpec::new()
        .with_search_text(args.search)
        .with_categories(args.categories)
        .with_distance_option(args.within);
    let ranked = rank_facilities(reference, &records, &filter)?;

    if args.json {
        let output = NearbyOutput {
            location: &location,
            facilities: &ranked,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(reference, &location, &ranked);
    }

    Ok(())
}

async fn resolve_location(
    config: &AppConfig,
    manual: Option<(f64, f64)>,
) -> anyhow::Result<LocationResult> {
    // This host has no positioning capability; manual entry is the only way
    // to a granted location.
    let provider =
        LocationProvider::start(UnsupportedHost, LocationConfig::from_app_config(config));

    if let Some((latitude, longitude)) = manual {
        provider
            .set_manual(Coordinate {
                latitude,
                longitude,
            })
            .context("invalid --lat/--lon")?;
    }

    Ok(provider.wait_resolved().await)
}

async fn load_records(
    config: &AppConfig,
    source: &CatalogSource,
    query: &AmenityQuery,
) -> anyhow::Result<Vec<FacilityRecord>> {
    match source {
        CatalogSource::File(path) => {
            tracing::debug!(path = %path.display(), "loading catalog file");
            medfinder_core::load_catalog(path)
                .map(|catalog| catalog.amenities)
                .with_context(|| format!("failed to load catalog {}", path.display()))
        }
        CatalogSource::Api(url) => {
            let client = CatalogClient::from_app_config(config)
                .context("failed to build catalog client")?;
            client
                .fetch_amenities(url, query)
                .await
                .with_context(|| format!("failed to fetch amenities from {url}"))
        }
    }
}

fn print_location_notice(location: &LocationResult) {
    let reason = location.error.as_deref().unwrap_or("location not resolved");
    eprintln!("location: {} ({reason})", location.permission_state);

    match location.remediation() {
        Remediation::EnableAccessAndRetry => {
            eprintln!("hint: enable location access and try again");
        }
        Remediation::RetryOrEnterManually => {
            eprintln!("hint: try again, or pass --lat and --lon");
        }
        Remediation::Wait | Remediation::None => {}
    }

    if location.is_default_location {
        if let Some(fallback) = location.coordinate {
            eprintln!("using default location {fallback}");
        }
    }
}

fn print_table(reference: Coordinate, location: &LocationResult, ranked: &[RankedFacility]) {
    if ranked.is_empty() {
        println!("no facilities match near {reference}");
        return;
    }

    let origin = if location.is_default_location {
        "default location"
    } else {
        "your location"
    };
    println!("{} facilities near {origin} ({reference})", ranked.len());
    println!();
    println!(
        "{:<9}{:<14}{:<6}{:<32}ADDRESS",
        "DISTANCE", "CATEGORY", "OPEN", "NAME"
    );
    for item in ranked {
        let facility = &item.facility;
        let name = match &facility.special_tag {
            Some(tag) => format!("{} [{tag}]", facility.name),
            None => facility.name.clone(),
        };
        println!(
            "{:<9}{:<14}{:<6}{:<32}{}",
            item.distance_label(),
            facility.category.label(),
            if facility.is_open_now { "yes" } else { "no" },
            truncate(&name, 30),
            facility.address
        );
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars - 3).collect::<String>())
    } else {
        text.to_string()
    }
}
