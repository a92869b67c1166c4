pub mod anchor;
pub mod dedup;
pub mod ranking;
pub mod reachability;
pub mod sampling;

use crate::config::DiscoveryConfig;
use crate::constants::{ATTRACTION_PLACE_TYPE, MUNICIPALITY_PLACE_TYPES};
use crate::error::{AppError, Result};
use crate::models::{
    Budget, CandidateMunicipality, CityGroup, Coordinates, MunicipalitySummary, PlaceCandidate,
    PointOfInterest, RankedMunicipality,
};
use crate::services::distance_matrix::{Destination, RoutingClient};
use crate::services::places::{NearbySearch, PlaceFields, PlacesClient, TextSearch};
use crate::services::upstream::{with_deadline, RetryPolicy};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

pub use anchor::resolve_anchor;
pub use dedup::dedup_across_groups;
pub use ranking::{rank_municipalities, sort_by_city_preference, sort_by_rating};
pub use reachability::{accept_within_band, route_in_chunks};
pub use sampling::{sample_points, search_radius_km};

#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub origin: Option<Coordinates>,
    pub budget: Budget,
    /// When set, search attractions inside this municipality instead of grouping.
    pub municipality: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DiscoveryResult {
    Groups { groups: Vec<CityGroup> },
    Spots { spots: Vec<PointOfInterest> },
}

/// Turns a travel budget into points of interest, grouped by the
/// municipalities reachable within it.
pub struct SpotDiscovery {
    places: Arc<dyn PlacesClient>,
    routing: Arc<dyn RoutingClient>,
    config: DiscoveryConfig,
}

impl SpotDiscovery {
    pub fn new(
        places: Arc<dyn PlacesClient>,
        routing: Arc<dyn RoutingClient>,
        config: DiscoveryConfig,
    ) -> Self {
        SpotDiscovery {
            places,
            routing,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.upstream_timeout_secs)
    }

    fn concurrency(&self) -> usize {
        self.config.upstream_concurrency.max(1)
    }

    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult> {
        let municipality = request
            .municipality
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match (municipality, request.origin) {
            (Some(name), origin) => {
                let spots = self
                    .discover_in_municipality(name, origin, &request.budget)
                    .await?;
                Ok(DiscoveryResult::Spots { spots })
            }
            (None, Some(origin)) => {
                let groups = self.discover_groups(origin, &request.budget).await?;
                Ok(DiscoveryResult::Groups { groups })
            }
            (None, None) => Err(AppError::InvalidRequest(
                "Either origin or municipality is required".to_string(),
            )),
        }
    }

    /// Sample around `origin`, keep the municipalities whose driving cost
    /// lands in the budget's tolerance band, and collect attractions around
    /// each one's civic anchor.
    pub async fn discover_groups(
        &self,
        origin: Coordinates,
        budget: &Budget,
    ) -> Result<Vec<CityGroup>> {
        let radius_km = search_radius_km(budget, &self.config);
        let samples = sample_points(origin, radius_km, &self.config);

        tracing::info!(
            radius_km,
            samples = samples.len(),
            "Discovering municipalities within {:.0} km of ({:.4}, {:.4}) using {} samples",
            radius_km,
            origin.lat,
            origin.lng,
            samples.len()
        );

        let candidates = self.collect_candidates(&samples).await?;
        if candidates.is_empty() {
            tracing::info!("No candidate municipalities found");
            return Ok(Vec::new());
        }

        let destinations: Vec<Destination> = candidates
            .iter()
            .map(|c| Destination::Coordinates(c.location))
            .collect();
        let elements = route_in_chunks(
            self.routing.as_ref(),
            &origin,
            &destinations,
            self.concurrency(),
            self.timeout(),
        )
        .await?;

        let accepted = accept_within_band(&elements, budget);
        let ranked = rank_municipalities(&candidates, accepted, self.config.max_groups);

        tracing::debug!(
            candidates = candidates.len(),
            ranked = ranked.len(),
            "{} of {} candidates within the {} budget band",
            ranked.len(),
            candidates.len(),
            budget.kind()
        );

        let mut groups: Vec<CityGroup> = stream::iter(ranked)
            .map(|ranked| async move { self.build_group(&ranked).await })
            .buffered(self.concurrency())
            .collect()
            .await;

        dedup_across_groups(&mut groups);

        tracing::info!(
            groups = groups.len(),
            spots = groups.iter().map(|g| g.spots.len()).sum::<usize>(),
            "Built {} city groups",
            groups.len()
        );

        Ok(groups)
    }

    /// Attractions inside a named municipality. With an origin the results
    /// are filtered by driving cost and sorted by rating.
    pub async fn discover_in_municipality(
        &self,
        municipality: &str,
        origin: Option<Coordinates>,
        budget: &Budget,
    ) -> Result<Vec<PointOfInterest>> {
        let request = TextSearch {
            query: format!("{} {}", municipality, self.config.attraction_query_suffix),
            included_type: Some(ATTRACTION_PLACE_TYPE.to_string()),
            page_size: Some(self.config.municipality_text_page_size),
            fields: PlaceFields::Full,
        };
        let found = with_deadline(
            "Places",
            self.timeout(),
            self.places.search_text(&request),
        )
        .await?;
        let spots = unique_points_of_interest(found);

        let Some(origin) = origin else {
            tracing::debug!(
                "{} attractions in {} (no origin, unfiltered)",
                spots.len(),
                municipality
            );
            return Ok(spots);
        };

        let destinations: Vec<Destination> = spots
            .iter()
            .map(|spot| Destination::PlaceId(spot.id.clone()))
            .collect();
        let elements = route_in_chunks(
            self.routing.as_ref(),
            &origin,
            &destinations,
            self.concurrency(),
            self.timeout(),
        )
        .await?;

        let keep: HashSet<usize> = accept_within_band(&elements, budget)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        let mut reachable: Vec<PointOfInterest> = spots
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| keep.contains(idx))
            .map(|(_, spot)| spot)
            .collect();
        sort_by_rating(&mut reachable);

        tracing::debug!(
            "{} reachable attractions in {}",
            reachable.len(),
            municipality
        );

        Ok(reachable)
    }

    /// Attractions around one city center, retried once on failure.
    pub async fn nearby_spots(
        &self,
        center: Coordinates,
        types: &[String],
        city_name: Option<&str>,
    ) -> Result<Vec<PointOfInterest>> {
        let mut spots = self.fetch_spots(center, types, RetryPolicy::ONCE).await?;
        if let Some(city_name) = city_name.filter(|name| !name.is_empty()) {
            sort_by_city_preference(&mut spots, city_name);
        }
        Ok(spots)
    }

    /// Nearby `locality` searches at every sample, merged by name in sample
    /// order until enough distinct municipalities are known.
    async fn collect_candidates(
        &self,
        samples: &[Coordinates],
    ) -> Result<Vec<CandidateMunicipality>> {
        let places = self.places.as_ref();
        let config = &self.config;
        let timeout = self.timeout();

        let mut searches = std::pin::pin!(stream::iter(samples.iter().copied())
            .map(move |center| async move {
                let request = NearbySearch {
                    center,
                    radius_meters: config.municipality_search_radius_m,
                    included_types: MUNICIPALITY_PLACE_TYPES
                        .iter()
                        .map(|t| t.to_string())
                        .collect(),
                    max_results: config.municipality_results_per_sample,
                    fields: PlaceFields::Basic,
                };
                let request = &request;
                RetryPolicy::ONCE
                    .run("Municipality search", move || {
                        with_deadline("Places", timeout, places.search_nearby(request))
                    })
                    .await
            })
            .buffered(self.concurrency()));

        let mut candidates = Vec::new();
        let mut seen_names = HashSet::new();
        let mut attempted = 0;
        let mut failed = 0;
        let mut last_error = None;

        while let Some(result) = searches.next().await {
            attempted += 1;
            let found = match result {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(
                        sample = attempted - 1,
                        "Municipality search at sample #{} failed, skipping: {}",
                        attempted - 1,
                        e
                    );
                    failed += 1;
                    last_error = Some(e);
                    continue;
                }
            };

            for place in found {
                let Some(location) = place.location else {
                    continue;
                };
                if !place.has_display_name() || !seen_names.insert(place.name.clone()) {
                    continue;
                }
                candidates.push(CandidateMunicipality {
                    id: place.id,
                    name: place.name,
                    location,
                });
            }

            if candidates.len() >= config.max_candidate_municipalities {
                tracing::debug!(
                    "Collected {} municipalities after {} of {} samples",
                    candidates.len(),
                    attempted,
                    samples.len()
                );
                break;
            }
        }

        if attempted > 0 && failed == attempted {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(candidates)
    }

    async fn build_group(&self, ranked: &RankedMunicipality) -> CityGroup {
        let anchor = resolve_anchor(
            self.places.as_ref(),
            &ranked.municipality,
            &self.config,
            self.timeout(),
        )
        .await;

        let types = [ATTRACTION_PLACE_TYPE.to_string()];
        let spots = match self
            .fetch_spots(anchor.location, &types, RetryPolicy::NONE)
            .await
        {
            Ok(spots) => spots,
            Err(e) => {
                tracing::warn!(
                    municipality = %ranked.municipality.name,
                    "Attraction search for {} failed, group left empty: {}",
                    ranked.municipality.name,
                    e
                );
                Vec::new()
            }
        };

        CityGroup {
            municipality: MunicipalitySummary::from(ranked),
            anchor,
            spots,
        }
    }

    async fn fetch_spots(
        &self,
        center: Coordinates,
        types: &[String],
        retry: RetryPolicy,
    ) -> Result<Vec<PointOfInterest>> {
        let request = NearbySearch {
            center,
            radius_meters: self.config.spot_search_radius_m,
            included_types: types.to_vec(),
            max_results: self.config.spot_max_results,
            fields: PlaceFields::Full,
        };
        let request = &request;
        let places = self.places.as_ref();
        let timeout = self.timeout();

        let found = retry
            .run("Attraction search", move || {
                with_deadline("Places", timeout, places.search_nearby(request))
            })
            .await?;

        Ok(unique_points_of_interest(found))
    }
}

/// Displayable places, first occurrence per id.
fn unique_points_of_interest(found: Vec<PlaceCandidate>) -> Vec<PointOfInterest> {
    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(PlaceCandidate::into_point_of_interest)
        .filter(|spot| seen.insert(spot.id.clone()))
        .collect()
}
