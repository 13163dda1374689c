use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::threshold::derive_threshold;
use crate::codes::RefusalCategory;
use crate::model::{
    ClassificationConfig, DensityReport, DensityResult, PassengerRecord, Priority,
    RefusalRecord, RouteKey, RouteScreening,
};

const SEMESTER_MONTHS: usize = 6;
const HIGH_VARIANCE_RATIO: f64 = 10.0;

/// Code-share partners whose passengers count towards a carrier's route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerMap {
    partners: HashMap<RouteKey, Vec<String>>,
}

impl PartnerMap {
    pub fn insert(&mut self, route: RouteKey, partner: impl Into<String>) {
        self.partners.entry(route).or_default().push(partner.into());
    }

    pub fn partners_for(&self, route: &RouteKey) -> &[String] {
        self.partners.get(route).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.partners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaxQuality {
    pub months_with_data: usize,
    pub is_complete: bool,
    pub high_variance: bool,
}

/// Summed passengers per (airline, airport), plus the monthly series behind each sum.
#[derive(Debug, Default)]
pub struct PaxLookup {
    totals: HashMap<RouteKey, u64>,
    monthly: HashMap<RouteKey, BTreeMap<(i32, u32), u64>>,
}

impl PaxLookup {
    pub fn build(passengers: &[PassengerRecord]) -> Self {
        let mut lookup = Self::default();
        for record in passengers {
            let route = record.route();
            let total = lookup.totals.entry(route.clone()).or_default();
            *total = total.saturating_add(record.pax);
            let month = lookup
                .monthly
                .entry(route)
                .or_default()
                .entry((record.year, record.month))
                .or_default();
            *month = month.saturating_add(record.pax);
        }
        lookup
    }

    pub fn pax(&self, route: &RouteKey) -> u64 {
        self.totals.get(route).copied().unwrap_or(0)
    }

    /// The route's own passengers plus those of every listed partner on the same last stop.
    pub fn pooled_pax(&self, route: &RouteKey, partners: &PartnerMap) -> u64 {
        partners
            .partners_for(route)
            .iter()
            .map(|partner| self.pax(&RouteKey::new(partner, &route.last_stop)))
            .fold(self.pax(route), u64::saturating_add)
    }

    pub fn quality(&self, route: &RouteKey, completeness_months: usize) -> PaxQuality {
        let Some(months) = self.monthly.get(route) else {
            return PaxQuality {
                months_with_data: 0,
                is_complete: completeness_months == 0,
                high_variance: false,
            };
        };

        let max = months.values().copied().max().unwrap_or(0);
        let min = months.values().copied().min().unwrap_or(0);
        let high_variance = if min == 0 {
            !months.is_empty()
        } else {
            max as f64 / min as f64 > HIGH_VARIANCE_RATIO
        };

        PaxQuality {
            months_with_data: months.len(),
            is_complete: months.len() >= completeness_months,
            high_variance,
        }
    }
}

/// 0-100; zero below the reliability bar, saturating at 20 refusals and 100k passengers.
pub fn confidence_score(inad_count: usize, pax: u64, min_pax: u64) -> u8 {
    if pax < min_pax {
        return 0;
    }

    let inad_score = (inad_count as f64 / 20.0 * 100.0).min(100.0);
    let pax_score = (pax as f64 / 100_000.0 * 100.0).min(100.0);
    (0.6 * inad_score + 0.4 * pax_score) as u8
}

pub fn density_per_mille(inad_count: usize, pax: u64) -> Option<f64> {
    (pax > 0).then(|| inad_count as f64 / pax as f64 * 1000.0)
}

/// First matching rule wins.
pub fn classify(
    density: Option<f64>,
    reliable: bool,
    inad_count: usize,
    threshold: f64,
    config: &ClassificationConfig,
) -> Priority {
    let Some(density) = density else {
        return Priority::Unreliable;
    };
    if !reliable {
        return Priority::Unreliable;
    }

    if density >= threshold * config.high_priority_multiplier
        && density >= config.min_density
        && inad_count >= config.high_priority_min_inad
    {
        Priority::HighPriority
    } else if density >= threshold {
        Priority::WatchList
    } else {
        Priority::Clear
    }
}

fn quality_warning(
    quality: &PaxQuality,
    pax: u64,
    config: &ClassificationConfig,
) -> Option<String> {
    if !quality.is_complete {
        Some(format!(
            "Incomplete PAX data ({}/{} months)",
            quality.months_with_data, SEMESTER_MONTHS
        ))
    } else if quality.high_variance {
        Some("High variance in monthly PAX data".to_string())
    } else if pax < config.min_pax {
        Some(format!("Low PAX volume (<{})", config.min_pax))
    } else {
        None
    }
}

fn category_breakdowns(
    refusals: &[RefusalRecord],
) -> HashMap<RouteKey, BTreeMap<RefusalCategory, usize>> {
    let mut breakdowns = HashMap::<RouteKey, BTreeMap<RefusalCategory, usize>>::new();
    for record in refusals.iter().filter(|record| record.included()) {
        *breakdowns
            .entry(record.route())
            .or_default()
            .entry(record.category())
            .or_default() += 1;
    }
    breakdowns
}

/// Stage 3. Every density is computed before the threshold is derived; only then are
/// routes classified.
pub fn classify_routes(
    routes: &[RouteScreening],
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
    partners: &PartnerMap,
    config: &ClassificationConfig,
) -> DensityReport {
    let lookup = PaxLookup::build(passengers);
    let mut breakdowns = category_breakdowns(refusals);

    let mut results = routes
        .iter()
        .filter(|route| route.passes_threshold)
        .map(|route| {
            let key = &route.key;
            let pax = lookup.pooled_pax(key, partners);
            let quality = lookup.quality(key, config.pax_completeness_months);

            DensityResult {
                airline: key.airline.clone(),
                last_stop: key.last_stop.clone(),
                inad_count: route.inad_count,
                pax,
                density: density_per_mille(route.inad_count, pax),
                reliable: pax >= config.min_pax,
                // Placeholder until the threshold is known.
                priority: Priority::Unreliable,
                confidence: confidence_score(route.inad_count, pax, config.min_pax),
                months_with_data: quality.months_with_data,
                quality_warning: quality_warning(&quality, pax, config),
                category_breakdown: breakdowns.remove(key).unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    let reliable_densities = results
        .iter()
        .filter(|result| result.reliable)
        .filter_map(|result| result.density)
        .collect::<Vec<_>>();
    let threshold = derive_threshold(
        &reliable_densities,
        config.threshold_method,
        config.trimmed_percent,
    );

    for result in &mut results {
        result.priority = classify(
            result.density,
            result.reliable,
            result.inad_count,
            threshold,
            config,
        );
    }

    results.sort_by(|a, b| {
        a.priority.rank().cmp(&b.priority.rank()).then_with(|| {
            b.density
                .unwrap_or(0.0)
                .total_cmp(&a.density.unwrap_or(0.0))
        })
    });

    debug!(
        routes = results.len(),
        reliable = reliable_densities.len(),
        threshold,
        method = config.threshold_method.as_str(),
        "density classification complete"
    );

    DensityReport {
        threshold,
        threshold_method: config.threshold_method,
        routes: results,
    }
}
