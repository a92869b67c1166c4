use crate::config::DiscoveryConfig;
use crate::constants::{CIVIC_NEARBY_PLACE_TYPES, CIVIC_TEXT_SEARCH_TYPE};
use crate::error::Result;
use crate::models::{AnchorSource, CandidateMunicipality, CivicAnchor, Coordinates};
use crate::services::places::{NearbySearch, PlaceFields, PlacesClient, TextSearch};
use crate::services::upstream::with_deadline;
use std::time::Duration;

/// Locate the seat of government of a municipality.
///
/// Tries a city hall text search, then a nearby search for civic buildings
/// around the municipality location. Never fails: any upstream error, or
/// no usable result, anchors the group at the municipality location.
pub async fn resolve_anchor(
    places: &dyn PlacesClient,
    municipality: &CandidateMunicipality,
    config: &DiscoveryConfig,
    timeout: Duration,
) -> CivicAnchor {
    match lookup_civic_building(places, municipality, config, timeout).await {
        Ok(Some(anchor)) => anchor,
        Ok(None) => {
            tracing::debug!(
                "No civic building found for {}, using municipality location",
                municipality.name
            );
            CivicAnchor::fallback(municipality.location)
        }
        Err(e) => {
            tracing::warn!(
                municipality = %municipality.name,
                "Anchor lookup for {} failed, using municipality location: {}",
                municipality.name,
                e
            );
            CivicAnchor::fallback(municipality.location)
        }
    }
}

async fn lookup_civic_building(
    places: &dyn PlacesClient,
    municipality: &CandidateMunicipality,
    config: &DiscoveryConfig,
    timeout: Duration,
) -> Result<Option<CivicAnchor>> {
    let text = TextSearch {
        query: format!("{} {}", municipality.name, config.civic_query_suffix),
        included_type: Some(CIVIC_TEXT_SEARCH_TYPE.to_string()),
        page_size: Some(1),
        fields: PlaceFields::Basic,
    };
    let found = with_deadline("Places", timeout, places.search_text(&text)).await?;
    if let Some(location) = first_location(found.into_iter().map(|p| p.location)) {
        return Ok(Some(CivicAnchor {
            location,
            source: AnchorSource::TextSearch,
        }));
    }

    let nearby = NearbySearch {
        center: municipality.location,
        radius_meters: config.anchor_search_radius_m,
        included_types: CIVIC_NEARBY_PLACE_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect(),
        max_results: config.anchor_max_results,
        fields: PlaceFields::Basic,
    };
    let found = with_deadline("Places", timeout, places.search_nearby(&nearby)).await?;

    Ok(
        first_location(found.into_iter().map(|p| p.location)).map(|location| CivicAnchor {
            location,
            source: AnchorSource::NearbySearch,
        }),
    )
}

fn first_location(locations: impl Iterator<Item = Option<Coordinates>>) -> Option<Coordinates> {
    locations.flatten().next()
}
