use crate::constants::*;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub google_maps_api_key: String,
    pub here_api_key: String,
    /// Optional overrides, e.g. for a local proxy or a test double.
    pub places_base_url: Option<String>,
    pub distance_matrix_base_url: Option<String>,
    pub isoline_base_url: Option<String>,
    pub places_language_code: String,
    pub places_region_code: String,
    /// GeoJSON FeatureCollection of municipality polygons (`id`, `name` properties).
    pub boundary_data_path: String,
    pub search_cache_ttl: u64,
    pub isochrone_cache_ttl: u64,
    pub nearby_cache_ttl: u64,
    pub cache_max_entries: u64,
    pub quota: QuotaConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub places_hourly_limit: u32,
    pub places_daily_limit: u32,
    pub isoline_hourly_limit: u32,
    pub isoline_daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            places_hourly_limit: DEFAULT_PLACES_HOURLY_LIMIT,
            places_daily_limit: DEFAULT_PLACES_DAILY_LIMIT,
            isoline_hourly_limit: DEFAULT_ISOLINE_HOURLY_LIMIT,
            isoline_daily_limit: DEFAULT_ISOLINE_DAILY_LIMIT,
        }
    }
}

impl QuotaConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        Ok(Self {
            places_hourly_limit: env_or("PLACES_HOURLY_LIMIT", defaults.places_hourly_limit)?,
            places_daily_limit: env_or("PLACES_DAILY_LIMIT", defaults.places_daily_limit)?,
            isoline_hourly_limit: env_or("HERE_HOURLY_LIMIT", defaults.isoline_hourly_limit)?,
            isoline_daily_limit: env_or("HERE_DAILY_LIMIT", defaults.isoline_daily_limit)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Kilometers of straight-line reach assumed per minute of driving.
    /// A 60 minute budget with factor 0.7 samples out to 42 km.
    pub time_to_radius_factor: f64,

    /// Clamp applied to the radius derived from a time budget
    pub min_search_radius_km: f64,
    pub max_search_radius_km: f64,

    /// At or below this radius only the origin itself is sampled
    pub single_sample_radius_km: f64,

    /// Approximate spacing between concentric sampling rings
    pub ring_spacing_km: f64,

    /// Radius of the municipality nearby search around each sample point
    pub municipality_search_radius_m: f64,
    pub municipality_results_per_sample: u32,

    /// Sampling stops once this many distinct municipality names are known
    pub max_candidate_municipalities: usize,

    /// Maximum number of city groups returned
    pub max_groups: usize,

    /// Fallback civic-building nearby search around the municipality location
    pub anchor_search_radius_m: f64,
    pub anchor_max_results: u32,

    /// Attraction search around each civic anchor
    pub spot_search_radius_m: f64,
    pub spot_max_results: u32,

    /// Page size of the municipality-scoped attraction text search
    pub municipality_text_page_size: u32,

    /// Appended to the municipality name for the attraction text search
    pub attraction_query_suffix: String,

    /// Appended to the municipality name for the city hall text search
    pub civic_query_suffix: String,

    /// In-flight upstream calls per pipeline step
    pub upstream_concurrency: usize,

    /// Deadline for every individual upstream call
    pub upstream_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            time_to_radius_factor: 0.7,
            min_search_radius_km: 5.0,
            max_search_radius_km: 500.0,
            single_sample_radius_km: 50.0,
            ring_spacing_km: 125.0,
            municipality_search_radius_m: 50_000.0,
            municipality_results_per_sample: 20,
            max_candidate_municipalities: 80,
            max_groups: 8,
            anchor_search_radius_m: 15_000.0,
            anchor_max_results: 5,
            spot_search_radius_m: 10_000.0,
            spot_max_results: 20,
            municipality_text_page_size: 20,
            attraction_query_suffix: "北海道 日本 観光名所".to_string(),
            civic_query_suffix: "市役所".to_string(),
            upstream_concurrency: 4,
            upstream_timeout_secs: 15,
        }
    }
}

impl DiscoveryConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            time_to_radius_factor: env_or(
                "DISCOVERY_TIME_TO_RADIUS_FACTOR",
                defaults.time_to_radius_factor,
            )?,
            min_search_radius_km: env_or(
                "DISCOVERY_MIN_SEARCH_RADIUS_KM",
                defaults.min_search_radius_km,
            )?,
            max_search_radius_km: env_or(
                "DISCOVERY_MAX_SEARCH_RADIUS_KM",
                defaults.max_search_radius_km,
            )?,
            single_sample_radius_km: env_or(
                "DISCOVERY_SINGLE_SAMPLE_RADIUS_KM",
                defaults.single_sample_radius_km,
            )?,
            ring_spacing_km: env_or("DISCOVERY_RING_SPACING_KM", defaults.ring_spacing_km)?,
            municipality_search_radius_m: env_or(
                "DISCOVERY_MUNICIPALITY_SEARCH_RADIUS_M",
                defaults.municipality_search_radius_m,
            )?,
            municipality_results_per_sample: env_or(
                "DISCOVERY_MUNICIPALITY_RESULTS_PER_SAMPLE",
                defaults.municipality_results_per_sample,
            )?,
            max_candidate_municipalities: env_or(
                "DISCOVERY_MAX_CANDIDATE_MUNICIPALITIES",
                defaults.max_candidate_municipalities,
            )?,
            max_groups: env_or("DISCOVERY_MAX_GROUPS", defaults.max_groups)?,
            anchor_search_radius_m: env_or(
                "DISCOVERY_ANCHOR_SEARCH_RADIUS_M",
                defaults.anchor_search_radius_m,
            )?,
            anchor_max_results: env_or(
                "DISCOVERY_ANCHOR_MAX_RESULTS",
                defaults.anchor_max_results,
            )?,
            spot_search_radius_m: env_or(
                "DISCOVERY_SPOT_SEARCH_RADIUS_M",
                defaults.spot_search_radius_m,
            )?,
            spot_max_results: env_or("DISCOVERY_SPOT_MAX_RESULTS", defaults.spot_max_results)?,
            municipality_text_page_size: env_or(
                "DISCOVERY_MUNICIPALITY_TEXT_PAGE_SIZE",
                defaults.municipality_text_page_size,
            )?,
            attraction_query_suffix: env::var("DISCOVERY_ATTRACTION_QUERY_SUFFIX")
                .unwrap_or(defaults.attraction_query_suffix),
            civic_query_suffix: env::var("DISCOVERY_CIVIC_QUERY_SUFFIX")
                .unwrap_or(defaults.civic_query_suffix),
            upstream_concurrency: env_or(
                "DISCOVERY_UPSTREAM_CONCURRENCY",
                defaults.upstream_concurrency,
            )?,
            upstream_timeout_secs: env_or(
                "DISCOVERY_UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        require_positive("DISCOVERY_TIME_TO_RADIUS_FACTOR", self.time_to_radius_factor)?;
        require_positive("DISCOVERY_MIN_SEARCH_RADIUS_KM", self.min_search_radius_km)?;
        require_positive("DISCOVERY_MAX_SEARCH_RADIUS_KM", self.max_search_radius_km)?;
        require_positive("DISCOVERY_SINGLE_SAMPLE_RADIUS_KM", self.single_sample_radius_km)?;
        require_positive("DISCOVERY_RING_SPACING_KM", self.ring_spacing_km)?;
        require_positive(
            "DISCOVERY_MUNICIPALITY_SEARCH_RADIUS_M",
            self.municipality_search_radius_m,
        )?;
        require_positive("DISCOVERY_ANCHOR_SEARCH_RADIUS_M", self.anchor_search_radius_m)?;
        require_positive("DISCOVERY_SPOT_SEARCH_RADIUS_M", self.spot_search_radius_m)?;
        if self.min_search_radius_km > self.max_search_radius_km {
            return Err(
                "DISCOVERY_MIN_SEARCH_RADIUS_KM must not exceed DISCOVERY_MAX_SEARCH_RADIUS_KM"
                    .to_string(),
            );
        }
        if self.upstream_concurrency == 0 {
            return Err("DISCOVERY_UPSTREAM_CONCURRENCY must be at least 1".to_string());
        }
        if self.upstream_timeout_secs == 0 {
            return Err("DISCOVERY_UPSTREAM_TIMEOUT_SECS must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")
                .map_err(|_| "GOOGLE_MAPS_API_KEY must be set")?,
            here_api_key: env::var("HERE_API_KEY").map_err(|_| "HERE_API_KEY must be set")?,
            places_base_url: env::var("PLACES_BASE_URL").ok(),
            distance_matrix_base_url: env::var("DISTANCE_MATRIX_BASE_URL").ok(),
            isoline_base_url: env::var("ISOLINE_BASE_URL").ok(),
            places_language_code: env::var("PLACES_LANGUAGE_CODE")
                .unwrap_or_else(|_| "ja".to_string()),
            places_region_code: env::var("PLACES_REGION_CODE")
                .unwrap_or_else(|_| "JP".to_string()),
            boundary_data_path: env::var("BOUNDARY_DATA_PATH")
                .unwrap_or_else(|_| "data/admin/hokkaido.geojson".to_string()),
            search_cache_ttl: env_or("SEARCH_CACHE_TTL_SEC", DEFAULT_SEARCH_CACHE_TTL_SECONDS)?,
            isochrone_cache_ttl: env_or("ISO_CACHE_TTL_SEC", DEFAULT_ISO_CACHE_TTL_SECONDS)?,
            nearby_cache_ttl: env_or("NEARBY_CACHE_TTL_SEC", DEFAULT_NEARBY_CACHE_TTL_SECONDS)?,
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?,
            quota: QuotaConfig::from_env()?,
            discovery: DiscoveryConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `name` from the environment, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T, String>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

/// Finite and strictly positive; NaN and infinities are rejected.
fn require_positive(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a positive number", name))
    }
}
