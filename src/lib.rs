// Library exports for testing and reusability

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod quota;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};

use cache::TtlCache;
use models::IsochroneResult;
use quota::QuotaLimiter;
use routes::nearby::NearbyResponse;
use services::boundaries::BoundaryStore;
use services::discovery::{DiscoveryResult, SpotDiscovery};
use services::isochrone::IsochroneService;
use services::places::PlacesClient;
use std::sync::Arc;

// App state for sharing across the application
pub struct AppState {
    pub discovery: SpotDiscovery,
    pub isochrone: IsochroneService,
    pub places: Arc<dyn PlacesClient>,
    pub boundaries: Arc<dyn BoundaryStore>,
    pub search_cache: TtlCache<DiscoveryResult>,
    pub isochrone_cache: TtlCache<IsochroneResult>,
    pub nearby_cache: TtlCache<NearbyResponse>,
    pub quota: QuotaLimiter,
}
