use axum::Router;
use reachspot::cache::TtlCache;
use reachspot::config::Config;
use reachspot::quota::QuotaLimiter;
use reachspot::services::boundaries::{BoundaryStore, GeoJsonBoundaryStore};
use reachspot::services::discovery::SpotDiscovery;
use reachspot::services::distance_matrix::{GoogleDistanceMatrixClient, DISTANCE_MATRIX_BASE_URL};
use reachspot::services::isochrone::IsochroneService;
use reachspot::services::isoline::{HereIsolineClient, HERE_ISOLINE_BASE_URL};
use reachspot::services::places::{GooglePlacesClient, PlacesClient, PLACES_BASE_URL};
use reachspot::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reachspot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting reachspot API server");
    tracing::info!(
        places_hourly = config.quota.places_hourly_limit,
        isoline_hourly = config.quota.isoline_hourly_limit,
        "Configuration loaded successfully"
    );

    // Upstream clients
    let timeout = Duration::from_secs(config.discovery.upstream_timeout_secs);
    let places: Arc<dyn PlacesClient> = Arc::new(
        GooglePlacesClient::with_config(
            config.google_maps_api_key.clone(),
            config
                .places_base_url
                .clone()
                .unwrap_or_else(|| PLACES_BASE_URL.to_string()),
            config.places_language_code.clone(),
            config.places_region_code.clone(),
        )
        .with_timeout(timeout),
    );
    let routing = Arc::new(
        GoogleDistanceMatrixClient::with_config(
            config.google_maps_api_key.clone(),
            config
                .distance_matrix_base_url
                .clone()
                .unwrap_or_else(|| DISTANCE_MATRIX_BASE_URL.to_string()),
            config.places_language_code.clone(),
        )
        .with_timeout(timeout),
    );
    let isoline = Arc::new(
        HereIsolineClient::with_config(
            config.here_api_key.clone(),
            config
                .isoline_base_url
                .clone()
                .unwrap_or_else(|| HERE_ISOLINE_BASE_URL.to_string()),
        )
        .with_timeout(timeout),
    );

    // Boundaries load lazily on the first isochrone or health request
    let boundaries: Arc<dyn BoundaryStore> =
        Arc::new(GeoJsonBoundaryStore::new(&config.boundary_data_path));
    tracing::info!("Municipality boundaries: {}", config.boundary_data_path);

    // Create application state
    let state = Arc::new(AppState {
        discovery: SpotDiscovery::new(places.clone(), routing, config.discovery.clone()),
        isochrone: IsochroneService::new(isoline, boundaries.clone(), timeout),
        places,
        boundaries,
        search_cache: TtlCache::new(config.search_cache_ttl, config.cache_max_entries),
        isochrone_cache: TtlCache::new(config.isochrone_cache_ttl, config.cache_max_entries),
        nearby_cache: TtlCache::new(config.nearby_cache_ttl, config.cache_max_entries),
        quota: QuotaLimiter::new(&config.quota),
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", reachspot::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
