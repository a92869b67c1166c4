use async_trait::async_trait;
use axum::Router;
use reachspot::cache::TtlCache;
use reachspot::config::{DiscoveryConfig, QuotaConfig};
use reachspot::error::{AppError, Result};
use reachspot::models::{Coordinates, PlaceCandidate, PlaceDetails, PlaceReview};
use reachspot::quota::QuotaLimiter;
use reachspot::services::boundaries::{BoundaryStore, GeoJsonBoundaryStore};
use reachspot::services::discovery::SpotDiscovery;
use reachspot::services::distance_matrix::{Destination, RouteElement, RoutingClient};
use reachspot::services::isochrone::IsochroneService;
use reachspot::services::isoline::{IsolineClient, IsolineRange};
use reachspot::services::places::{NearbySearch, PlacesClient, TextSearch};
use reachspot::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Driving speed assumed by the fake router: 40 km/h.
pub const MINUTES_PER_KM: f64 = 1.5;

pub fn sapporo() -> Coordinates {
    Coordinates::new(43.06, 141.35).unwrap()
}

#[allow(dead_code)]
pub fn boundary_fixture_path() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/municipalities.geojson").to_string()
}

pub fn place(id: &str, name: &str, lat: f64, lng: f64, address: Option<&str>) -> PlaceCandidate {
    PlaceCandidate {
        id: id.to_string(),
        name: name.to_string(),
        location: Some(Coordinates::new(lat, lng).unwrap()),
        address: address.map(str::to_string),
        ..PlaceCandidate::default()
    }
}

/// In-process stand-in for the places service, answering from fixed data.
///
/// Locality and attraction searches return the records inside the request
/// circle. City hall text searches hit `city_halls` by municipality name,
/// civic nearby searches never find anything.
#[derive(Default)]
pub struct FakePlaces {
    pub localities: Vec<PlaceCandidate>,
    pub city_halls: HashMap<String, Coordinates>,
    pub spots: Vec<PlaceCandidate>,
    pub details: Vec<PlaceDetails>,
    pub fail_all: bool,
    pub nearby_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    pub nearby_types: Mutex<Vec<Vec<String>>>,
}

impl FakePlaces {
    #[allow(dead_code)]
    pub fn upstream_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
            + self.text_calls.load(Ordering::SeqCst)
            + self.details_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_all {
            return Err(AppError::upstream_status("Places", 503, "unavailable"));
        }
        Ok(())
    }
}

fn within(
    candidates: &[PlaceCandidate],
    center: &Coordinates,
    radius_m: f64,
    max: u32,
) -> Vec<PlaceCandidate> {
    candidates
        .iter()
        .filter(|p| {
            p.location
                .map(|loc| center.distance_to(&loc) * 1000.0 <= radius_m)
                .unwrap_or(false)
        })
        .take(max as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl PlacesClient for FakePlaces {
    async fn search_nearby(&self, request: &NearbySearch) -> Result<Vec<PlaceCandidate>> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        self.nearby_types
            .lock()
            .unwrap()
            .push(request.included_types.clone());
        self.check_available()?;

        let types = &request.included_types;
        if types.iter().any(|t| t == "locality") {
            return Ok(within(
                &self.localities,
                &request.center,
                request.radius_meters,
                request.max_results,
            ));
        }
        if types.iter().any(|t| t == "city_hall") {
            return Ok(Vec::new());
        }
        Ok(within(
            &self.spots,
            &request.center,
            request.radius_meters,
            request.max_results,
        ))
    }

    async fn search_text(&self, request: &TextSearch) -> Result<Vec<PlaceCandidate>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let municipality = request.query.split_whitespace().next().unwrap_or("");
        if request.included_type.as_deref() == Some("city_hall") {
            return Ok(self
                .city_halls
                .get(municipality)
                .map(|hall| {
                    vec![place(
                        &format!("hall-{}", municipality),
                        &format!("{}役所", municipality),
                        hall.lat,
                        hall.lng,
                        None,
                    )]
                })
                .unwrap_or_default());
        }

        Ok(self
            .spots
            .iter()
            .filter(|p| {
                p.address
                    .as_deref()
                    .is_some_and(|a| a.contains(municipality))
            })
            .take(request.page_size.unwrap_or(20) as usize)
            .cloned()
            .collect())
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.details
            .iter()
            .find(|d| d.id == place_id)
            .cloned()
            .ok_or_else(|| AppError::upstream_status("Places", 404, "NOT_FOUND"))
    }
}

/// Straight-line router: every destination costs its haversine distance at
/// [`MINUTES_PER_KM`]. Place ids resolve through `place_locations`.
#[derive(Default)]
pub struct FakeRouting {
    pub place_locations: HashMap<String, Coordinates>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl RoutingClient for FakeRouting {
    async fn distance_matrix(
        &self,
        origin: &Coordinates,
        destinations: &[Destination],
    ) -> Result<Vec<RouteElement>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if destinations.len() > 25 {
            return Err(AppError::InvalidRequest("too many destinations".to_string()));
        }

        Ok(destinations
            .iter()
            .map(|destination| {
                let target = match destination {
                    Destination::Coordinates(c) => Some(*c),
                    Destination::PlaceId(id) => self.place_locations.get(id).copied(),
                };
                match target {
                    Some(target) => {
                        let km = origin.distance_to(&target);
                        RouteElement::ok(km * MINUTES_PER_KM * 60.0, km * 1000.0)
                    }
                    None => RouteElement::failed("NOT_FOUND"),
                }
            })
            .collect())
    }
}

pub struct FakeIsoline {
    pub payload: serde_json::Value,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub ranges: Mutex<Vec<IsolineRange>>,
}

impl FakeIsoline {
    pub fn new(payload: serde_json::Value) -> Self {
        FakeIsoline {
            payload,
            fail: false,
            calls: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IsolineClient for FakeIsoline {
    async fn isoline(
        &self,
        _origin: &Coordinates,
        range: IsolineRange,
    ) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(range);
        if self.fail {
            return Err(AppError::upstream_status("Isoline", 500, "boom"));
        }
        Ok(self.payload.clone())
    }
}

/// HERE-shaped payload around Sapporo reaching Otaru, with open rings.
pub fn sapporo_isoline_payload() -> serde_json::Value {
    json!({
        "departure": {"place": {"location": {"lat": 43.06, "lng": 141.35}}},
        "isolines": [{
            "range": {"type": "time", "value": 1800},
            "polygons": [{
                "outer": [[140.9, 42.9], [141.6, 42.9], [141.6, 43.3], [140.9, 43.3]]
            }]
        }]
    })
}

/// Municipalities around Sapporo with their city halls and two attractions
/// each. One attraction between Iwamizawa and Kuriyama is visible from both.
pub fn hokkaido_places() -> FakePlaces {
    let municipalities = [
        ("01100", "札幌市", 43.0621, 141.3544),
        ("01203", "小樽市", 43.1907, 140.9947),
        ("01217", "江別市", 43.1036, 141.5361),
        ("01235", "石狩市", 43.1713, 141.3156),
        ("01224", "千歳市", 42.8210, 141.6520),
        ("01210", "岩見沢市", 43.1961, 141.7759),
        ("01231", "恵庭市", 42.8826, 141.5779),
        ("01234", "北広島市", 42.9855, 141.5631),
        ("01303", "当別町", 43.2238, 141.5167),
        ("01213", "苫小牧市", 42.6342, 141.6055),
        ("01408", "余市町", 43.1962, 140.7909),
        ("01209", "夕張市", 43.0568, 141.9739),
        ("01427", "長沼町", 43.0105, 141.6950),
        ("01423", "南幌町", 43.0636, 141.6508),
        ("01429", "栗山町", 43.0565, 141.7844),
    ];

    let mut places = FakePlaces::default();
    for (id, name, lat, lng) in municipalities {
        places.localities.push(place(id, name, lat, lng, None));
        if name != "余市町" {
            places
                .city_halls
                .insert(name.to_string(), Coordinates::new(lat, lng).unwrap());
        }
        places.spots.push(spot(&format!("{}-a", id), lat + 0.01, lng, name, 4.6, 120));
        places.spots.push(spot(&format!("{}-b", id), lat - 0.01, lng, name, 4.1, 30));
    }

    places.spots.push(spot("shared-kuriyama", 43.126, 141.78, "栗山町", 4.3, 80));
    places
}

fn spot(
    id: &str,
    lat: f64,
    lng: f64,
    municipality: &str,
    rating: f64,
    count: u32,
) -> PlaceCandidate {
    let mut spot = place(
        id,
        &format!("Spot {}", id),
        lat,
        lng,
        Some(&format!("日本、〒000-0000 北海道{}1-1", municipality)),
    );
    spot.rating = Some(rating);
    spot.rating_count = Some(count);
    spot.types = vec!["tourist_attraction".to_string()];
    spot
}

#[allow(dead_code)]
pub fn routing_for(places: &FakePlaces) -> FakeRouting {
    FakeRouting {
        place_locations: places
            .spots
            .iter()
            .filter_map(|p| Some((p.id.clone(), p.location?)))
            .collect(),
        calls: AtomicUsize::new(0),
    }
}

#[allow(dead_code)]
pub fn sample_details() -> PlaceDetails {
    PlaceDetails {
        id: "01100-a".to_string(),
        name: Some("時計台".to_string()),
        address: Some("北海道札幌市中央区北1条西2丁目".to_string()),
        rating: Some(4.1),
        rating_count: Some(19_000),
        reviews: vec![PlaceReview {
            author: Some("旅人".to_string()),
            rating: Some(4.0),
            text: Some("Small but charming".to_string()),
            published_at: Some("2024-07-01T00:00:00Z".to_string()),
        }],
        photo_ref: Some("places/01100-a/photos/1".to_string()),
        maps_url: Some("https://maps.google.com/?cid=1".to_string()),
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub places: Arc<FakePlaces>,
    pub routing: Arc<FakeRouting>,
    pub isoline: Arc<FakeIsoline>,
}

/// Router over fake upstreams and the boundary fixture, mounted without the
/// `/api/v1` prefix.
#[allow(dead_code)]
pub fn test_app(places: FakePlaces, quota: QuotaConfig) -> TestApp {
    let routing = Arc::new(routing_for(&places));
    let places = Arc::new(places);
    let isoline = Arc::new(FakeIsoline::new(sapporo_isoline_payload()));
    let boundaries: Arc<dyn BoundaryStore> =
        Arc::new(GeoJsonBoundaryStore::new(boundary_fixture_path()));

    let state = Arc::new(AppState {
        discovery: SpotDiscovery::new(places.clone(), routing.clone(), DiscoveryConfig::default()),
        isochrone: IsochroneService::new(
            isoline.clone(),
            boundaries.clone(),
            Duration::from_secs(5),
        ),
        places: places.clone(),
        boundaries,
        search_cache: TtlCache::new(60, 100),
        isochrone_cache: TtlCache::new(60, 100),
        nearby_cache: TtlCache::new(60, 100),
        quota: QuotaLimiter::new(&quota),
    });

    TestApp {
        router: reachspot::routes::create_router(state),
        places,
        routing,
        isoline,
    }
}
