//! Stable application-wide constants.
//!
//! Values here are upstream contract limits, algorithm coefficients, and
//! default fallbacks for env-var-based configuration. Tuning knobs that are
//! worth experimenting with at runtime live in
//! [`DiscoveryConfig`](crate::config::DiscoveryConfig) instead.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Cache TTL defaults (seconds, used when env vars are absent) ---

/// Discovery (`/places/search`) responses: 30 minutes. Overridden by `SEARCH_CACHE_TTL_SEC`.
pub const DEFAULT_SEARCH_CACHE_TTL_SECONDS: u64 = 1_800;
/// Isochrone responses: 30 minutes. Overridden by `ISO_CACHE_TTL_SEC`.
pub const DEFAULT_ISO_CACHE_TTL_SECONDS: u64 = 1_800;
/// Per-city nearby responses: 20 minutes. Overridden by `NEARBY_CACHE_TTL_SEC`.
pub const DEFAULT_NEARBY_CACHE_TTL_SECONDS: u64 = 1_200;
/// Upper bound on entries per in-memory response cache.
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 2_000;
/// Decimal places kept when rounding request coordinates into cache keys (~11 m).
pub const CACHE_KEY_COORD_DECIMALS: u32 = 4;

// --- Quota defaults (requests per identity) ---

pub const DEFAULT_PLACES_HOURLY_LIMIT: u32 = 500;
pub const DEFAULT_PLACES_DAILY_LIMIT: u32 = 5_000;
pub const DEFAULT_ISOLINE_HOURLY_LIMIT: u32 = 300;
pub const DEFAULT_ISOLINE_DAILY_LIMIT: u32 = 2_500;
/// Identity used when the request carries no `x-forwarded-for` header.
pub const DEFAULT_QUOTA_IDENTITY: &str = "local";

// --- Budget limits ---

pub const MIN_BUDGET_VALUE: f64 = 1.0;
/// Longest accepted time budget, in minutes.
pub const MAX_TIME_BUDGET_MINUTES: f64 = 300.0;
/// Longest accepted distance budget, in kilometers.
pub const MAX_DISTANCE_BUDGET_KM: f64 = 500.0;

// --- Tolerance band (symmetric, lower edge clamped at zero) ---

pub const TIME_TOLERANCE_MINUTES: f64 = 15.0;
pub const DISTANCE_TOLERANCE_KM: f64 = 10.0;

// --- Geometry ---

/// Mean Earth radius used by the haversine and destination-point formulas.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Compass bearings probed on every sampling ring.
pub const SAMPLE_BEARINGS_DEG: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

// --- Upstream contract limits ---

/// The distance matrix accepts at most this many destinations per call.
pub const DISTANCE_MATRIX_MAX_DESTINATIONS: usize = 25;
/// Attempts for call sites that retry (first call + one retry), no backoff.
pub const RETRY_ONCE_MAX_ATTEMPTS: usize = 2;

// --- Places types ---

pub const MUNICIPALITY_PLACE_TYPES: &[&str] = &["locality"];
pub const CIVIC_TEXT_SEARCH_TYPE: &str = "city_hall";
pub const CIVIC_NEARBY_PLACE_TYPES: &[&str] = &["city_hall", "local_government_office"];
pub const ATTRACTION_PLACE_TYPE: &str = "tourist_attraction";
/// Types searched by `/nearby` when the caller does not pass any.
pub const DEFAULT_NEARBY_PLACE_TYPES: &[&str] = &[
    "tourist_attraction",
    "museum",
    "park",
    "art_gallery",
    "zoo",
    "aquarium",
];

// --- Request sanitization ---

pub const MAX_MUNICIPALITY_NAME_CHARS: usize = 60;
pub const MAX_CITY_ID_CHARS: usize = 80;
pub const MAX_CITY_NAME_CHARS: usize = 50;
pub const MAX_PLACE_ID_CHARS: usize = 120;
/// Reviews kept in a details response.
pub const MAX_DETAIL_REVIEWS: usize = 5;
