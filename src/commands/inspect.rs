use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::analysis::publish::{PublishedSnapshot, SNAPSHOT_VERSION};
use crate::cli::InspectArgs;
use crate::model::Priority;
use crate::util::read_json;

pub fn run(args: InspectArgs) -> Result<()> {
    info!(path = %args.snapshot.display(), "inspect requested");

    if !args.snapshot.exists() {
        bail!("snapshot not found: {}", args.snapshot.display());
    }
    let snapshot: PublishedSnapshot = read_json(&args.snapshot)?;

    let metadata = &snapshot.metadata;
    info!(
        version = metadata.version,
        published_at = %metadata.published_at,
        semester = %metadata.semester,
        start = %metadata.semester_range.start.map(|date| date.to_string()).unwrap_or_default(),
        end = %metadata.semester_range.end.map(|date| date.to_string()).unwrap_or_default(),
        "loaded snapshot metadata"
    );
    if metadata.version > SNAPSHOT_VERSION {
        warn!(
            version = metadata.version,
            supported = SNAPSHOT_VERSION,
            "snapshot is newer than this tool"
        );
    }

    let summary = &snapshot.summary;
    info!(
        total_inads = summary.total_inads,
        total_pax = summary.total_pax,
        airlines = summary.airlines_analyzed,
        airlines_above_threshold = summary.airlines_above_threshold,
        routes = summary.routes_analyzed,
        routes_above_threshold = summary.routes_above_threshold,
        threshold = summary.median_density,
        "snapshot summary"
    );

    let priority_count = |priority: Priority| {
        snapshot
            .routes
            .iter()
            .filter(|route| route.priority == Some(priority))
            .count()
    };
    info!(
        high_priority = priority_count(Priority::HighPriority),
        watch_list = priority_count(Priority::WatchList),
        unreliable = priority_count(Priority::Unreliable),
        clear = priority_count(Priority::Clear),
        trend_points = snapshot.trends.len(),
        top_last_stops = snapshot.top10.last_stops.len(),
        top_airlines = snapshot.top10.airlines.len(),
        "snapshot routes"
    );

    match &snapshot.classification_config {
        Some(config) => info!(
            min_inad = config.min_inad,
            min_pax = config.min_pax,
            min_density = config.min_density,
            threshold_method = config.threshold_method.as_str(),
            "snapshot classification config"
        ),
        None => warn!("snapshot predates recorded classification config"),
    }

    Ok(())
}
