use super::*;
use crate::analysis::density::PartnerMap;
use crate::analysis::session::run_pipeline;
use crate::semester::{Half, available_semesters};

const PUBLISHED_AT: &str = "2025-01-15T08:00:00Z";

fn refusals() -> Vec<RefusalRecord> {
    let mut records = Vec::new();
    for _ in 0..12 {
        records.push(
            RefusalRecord::new("TK", "IST", 2024, 9, "A1").with_airline_name("Turkish Airlines"),
        );
    }
    for _ in 0..3 {
        records.push(RefusalRecord::new("TK", "SAW", 2024, 10, "C1"));
    }
    for _ in 0..4 {
        records.push(RefusalRecord::new("LX", "PRN", 2024, 11, "B2").with_airline_name("Swiss"));
    }
    records.push(RefusalRecord::new("LX", "PRN", 2024, 11, "C8"));
    for _ in 0..5 {
        records.push(RefusalRecord::new("EK", "DXB", 2024, 3, "A3"));
    }
    records
}

fn passengers() -> Vec<PassengerRecord> {
    vec![
        PassengerRecord::new("TK", "IST", 4_000, 2024, 9),
        PassengerRecord::new("TK", "IST", 4_000, 2024, 10),
        PassengerRecord::new("LX", "PRN", 20_000, 2024, 11),
        PassengerRecord::new("EK", "DXB", 50_000, 2024, 3),
        PassengerRecord::new("EK", "DXB", 0, 2023, 2),
    ]
}

fn snapshot() -> PublishedSnapshot {
    let refusals = refusals();
    let passengers = passengers();
    let config = ClassificationConfig::default();
    let semester = Semester::new(2024, Half::H2);
    let results = run_pipeline(&refusals, &passengers, &PartnerMap::default(), semester, &config)
        .expect("pipeline should run");
    let semesters = available_semesters(&refusals, &passengers);

    build_snapshot(
        &PublishInput {
            refusals: &refusals,
            passengers: &passengers,
            results: &results,
            semesters: &semesters,
            config: &config,
        },
        PUBLISHED_AT,
    )
}

#[test]
fn summary_reflects_current_semester() {
    let snapshot = snapshot();
    assert_eq!(snapshot.metadata.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.metadata.semester.label(), "2024 H2");
    assert_eq!(
        snapshot.metadata.semester_range.start,
        NaiveDate::from_ymd_opt(2024, 7, 1)
    );

    let summary = &snapshot.summary;
    assert_eq!(summary.total_inads, 19);
    assert_eq!(summary.total_pax, 28_000);
    assert_eq!(summary.airlines_analyzed, 2);
    assert_eq!(summary.airlines_above_threshold, 1);
    assert_eq!(summary.routes_analyzed, 2);
    assert_eq!(summary.routes_above_threshold, 1);
    assert!((summary.median_density - 1.5).abs() < 1e-9);
}

#[test]
fn routes_carry_density_only_after_stage_three() {
    let snapshot = snapshot();

    let ist = snapshot
        .routes
        .iter()
        .find(|route| route.last_stop == "IST")
        .expect("IST route published");
    assert_eq!(ist.airline_name, "Turkish Airlines");
    assert_eq!(ist.pax, Some(8_000));
    assert_eq!(ist.priority, Some(Priority::WatchList));

    let saw = snapshot
        .routes
        .iter()
        .find(|route| route.last_stop == "SAW")
        .expect("SAW route published");
    assert!(!saw.passes_threshold);
    assert_eq!(saw.airline_name, "Turkish Airlines");
    assert_eq!(saw.pax, None);
    assert_eq!(saw.priority, None);
}

#[test]
fn names_fall_back_to_airline_code() {
    let snapshot = snapshot();
    let airlines = snapshot
        .top10
        .airlines
        .iter()
        .map(|entry| (entry.airline.as_str(), entry.airline_name.as_str(), entry.inad_count))
        .collect::<Vec<_>>();
    assert_eq!(
        airlines,
        vec![("TK", "Turkish Airlines", 15), ("LX", "Swiss", 4)]
    );

    let names = airline_names(&[
        RefusalRecord::new("EK", "DXB", 2024, 1, "A1"),
        RefusalRecord::new("EK", "DXB", 2024, 1, "A1").with_airline_name("Emirates"),
        RefusalRecord::new("EK", "DXB", 2024, 1, "A1").with_airline_name("Emirates Airline"),
    ]);
    assert_eq!(names.get("EK").map(String::as_str), Some("Emirates"));
}

#[test]
fn top_lists_count_included_refusals_of_current_semester_only() {
    let snapshot = snapshot();
    let stops = snapshot
        .top10
        .last_stops
        .iter()
        .map(|entry| (entry.last_stop.as_str(), entry.inad_count))
        .collect::<Vec<_>>();
    assert_eq!(stops, vec![("IST", 12), ("PRN", 4), ("SAW", 3)]);
}

#[test]
fn top_lists_are_capped_at_ten() {
    let refusals = (0..15)
        .map(|index| {
            RefusalRecord::new(format!("A{index:02}"), format!("S{index:02}"), 2024, 1, "A1")
        })
        .collect::<Vec<_>>();
    let lists = top_lists(&refusals, Semester::new(2024, Half::H1), &HashMap::new());
    assert_eq!(lists.last_stops.len(), 10);
    assert_eq!(lists.airlines.len(), 10);
    assert_eq!(lists.airlines[0].airline, "A00");
}

#[test]
fn trends_cover_every_available_semester() {
    let snapshot = snapshot();
    let labels = snapshot
        .trends
        .iter()
        .map(|point| point.semester.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["2023 H1", "2024 H1", "2024 H2"]);

    let empty = &snapshot.trends[0];
    assert_eq!(empty.inad_count, 0);
    assert_eq!(empty.pax, 0);
    assert_eq!(empty.density, None);

    let first_half = &snapshot.trends[1];
    assert_eq!(first_half.inad_count, 5);
    assert_eq!(first_half.pax, 50_000);
    assert!((first_half.density.unwrap_or_default() - 0.1).abs() < 1e-9);
}

#[test]
fn snapshot_round_trips_through_json() {
    let snapshot = snapshot();
    let raw = serde_json::to_string_pretty(&snapshot).expect("serialize snapshot");
    let back: PublishedSnapshot = serde_json::from_str(&raw).expect("deserialize snapshot");
    assert_eq!(back, snapshot);

    let value = serde_json::to_value(&snapshot).expect("snapshot to value");
    assert!(value["summary"]["totalInads"].is_number());
    assert!(value["top10"]["lastStops"].is_array());
    assert_eq!(value["classificationConfig"]["minPax"], 5000);
    assert_eq!(value["metadata"]["semesterRange"]["end"], "2024-12-31");
}

#[test]
fn snapshot_without_classification_config_still_loads() {
    let mut value = serde_json::to_value(snapshot()).expect("snapshot to value");
    value
        .as_object_mut()
        .expect("snapshot is an object")
        .remove("classificationConfig");
    value["metadata"]["version"] = serde_json::json!(1);

    let legacy: PublishedSnapshot = serde_json::from_value(value).expect("legacy snapshot loads");
    assert!(legacy.classification_config.is_none());
    assert_eq!(legacy.metadata.version, 1);
}

#[test]
fn snapshot_contains_no_refusal_codes() {
    let raw = serde_json::to_string(&snapshot()).expect("serialize snapshot");
    assert!(!raw.contains("refusalCode"));
    assert!(!raw.contains("\"A1\""));
}
