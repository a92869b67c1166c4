use crate::config::DiscoveryConfig;
use crate::constants::SAMPLE_BEARINGS_DEG;
use crate::models::{Budget, Coordinates};

/// Straight-line reach to sample for a budget, in kilometers.
///
/// Distance budgets use their own value. Time budgets are converted with
/// `time_to_radius_factor` km per minute, rounded and clamped to the
/// configured search radius range.
pub fn search_radius_km(budget: &Budget, config: &DiscoveryConfig) -> f64 {
    match *budget {
        Budget::Distance { km } => km,
        Budget::Time { minutes } => (minutes * config.time_to_radius_factor)
            .round()
            .clamp(config.min_search_radius_km, config.max_search_radius_km),
    }
}

/// Probe points for municipality discovery: the origin, then 8 bearings on
/// each ring outward. Order matters, earlier samples win name collisions.
pub fn sample_points(
    origin: Coordinates,
    radius_km: f64,
    config: &DiscoveryConfig,
) -> Vec<Coordinates> {
    let mut samples = vec![origin];
    if radius_km <= config.single_sample_radius_km {
        return samples;
    }

    let rings = ((radius_km / config.ring_spacing_km).ceil() as usize).max(1);
    let ring_step = radius_km / rings as f64;

    samples.reserve(rings * SAMPLE_BEARINGS_DEG.len());
    for ring in 1..=rings {
        let distance = ring as f64 * ring_step;
        for bearing in SAMPLE_BEARINGS_DEG {
            samples.push(origin.destination(distance, bearing));
        }
    }

    samples
}
