use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use tracing::debug;

use crate::model::{AirlineKey, AirlineScreening, RefusalRecord, RouteScreening, ScreeningResult};

/// Counts per key in first-seen order.
fn count_by_key<'a, K, I, F>(records: I, key_of: F) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a RefusalRecord>,
    F: Fn(&RefusalRecord) -> K,
{
    let mut index = HashMap::<K, usize>::new();
    let mut counts = Vec::<(K, usize)>::new();

    for record in records {
        let key = key_of(record);
        match index.get(&key) {
            Some(&position) => counts[position].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts
}

fn into_screening<K>(counts: Vec<(K, usize)>, min_inad: usize) -> Vec<ScreeningResult<K>> {
    let mut results = counts
        .into_iter()
        .map(|(key, inad_count)| ScreeningResult {
            key,
            inad_count,
            passes_threshold: inad_count >= min_inad,
        })
        .collect::<Vec<_>>();

    // Stable: ties keep first-seen order.
    results.sort_by(|a, b| b.inad_count.cmp(&a.inad_count));
    results
}

/// Stage 1: included refusals per airline.
pub fn screen_airlines(records: &[RefusalRecord], min_inad: usize) -> Vec<AirlineScreening> {
    let counts = count_by_key(
        records.iter().filter(|record| record.included()),
        |record| AirlineKey(record.airline.clone()),
    );
    let results = into_screening(counts, min_inad);

    debug!(
        airlines = results.len(),
        passing = results.iter().filter(|r| r.passes_threshold).count(),
        min_inad,
        "airline screening complete"
    );
    results
}

/// Stage 2: included refusals per route, only for airlines that passed stage 1.
pub fn screen_routes(
    records: &[RefusalRecord],
    airlines: &[AirlineScreening],
    min_inad: usize,
) -> Vec<RouteScreening> {
    let passing = airlines
        .iter()
        .filter(|result| result.passes_threshold)
        .map(|result| result.key.0.as_str())
        .collect::<HashSet<_>>();

    let counts = count_by_key(
        records
            .iter()
            .filter(|record| record.included() && passing.contains(record.airline.as_str())),
        RefusalRecord::route,
    );
    let results = into_screening(counts, min_inad);

    debug!(
        routes = results.len(),
        passing = results.iter().filter(|r| r.passes_threshold).count(),
        min_inad,
        "route screening complete"
    );
    results
}

pub fn passing_routes(routes: &[RouteScreening]) -> impl Iterator<Item = &RouteScreening> {
    routes.iter().filter(|route| route.passes_threshold)
}
