use crate::models::{CandidateMunicipality, PointOfInterest, RankedMunicipality};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Accepted candidates, ascending by metric (stable), unique by name, at
/// most `max_groups`.
pub fn rank_municipalities(
    candidates: &[CandidateMunicipality],
    accepted: Vec<(usize, f64)>,
    max_groups: usize,
) -> Vec<RankedMunicipality> {
    let mut accepted = accepted;
    accepted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut seen_names = HashSet::new();
    accepted
        .into_iter()
        .filter_map(|(idx, metric)| {
            let municipality = candidates.get(idx)?;
            seen_names
                .insert(municipality.name.clone())
                .then(|| RankedMunicipality {
                    municipality: municipality.clone(),
                    metric,
                })
        })
        .take(max_groups)
        .collect()
}

fn by_rating_desc(a: &PointOfInterest, b: &PointOfInterest) -> Ordering {
    let rating_a = a.rating.unwrap_or(0.0);
    let rating_b = b.rating.unwrap_or(0.0);
    rating_b
        .total_cmp(&rating_a)
        .then_with(|| b.rating_count.unwrap_or(0).cmp(&a.rating_count.unwrap_or(0)))
}

/// Rating descending, ties by rating count descending. Missing values count as 0.
pub fn sort_by_rating(spots: &mut [PointOfInterest]) {
    spots.sort_by(by_rating_desc);
}

/// Spots whose address mentions `city_name` first, then by rating.
pub fn sort_by_city_preference(spots: &mut [PointOfInterest], city_name: &str) {
    let in_city = |spot: &PointOfInterest| {
        spot.address
            .as_deref()
            .is_some_and(|address| address.contains(city_name))
    };

    spots.sort_by(|a, b| {
        in_city(b)
            .cmp(&in_city(a))
            .then_with(|| by_rating_desc(a, b))
    });
}
