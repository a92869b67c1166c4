mod memory;

pub use memory::TtlCache;

use crate::constants::CACHE_KEY_COORD_DECIMALS;
use crate::models::{Budget, Coordinates};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Coordinates rounded to 4 decimal places (~11m), as integers so they hash.
fn hash_coordinates(coords: &Coordinates, hasher: &mut DefaultHasher) {
    let multiplier = 10_f64.powi(CACHE_KEY_COORD_DECIMALS as i32);
    ((coords.lat * multiplier).round() as i64).hash(hasher);
    ((coords.lng * multiplier).round() as i64).hash(hasher);
}

fn hash_budget(budget: &Budget, hasher: &mut DefaultHasher) {
    budget.kind().hash(hasher);
    budget.value().to_bits().hash(hasher);
}

/// Key for a discovery response.
/// Includes: origin (if any), budget (if any), municipality name (if any)
pub fn search_cache_key(
    origin: Option<&Coordinates>,
    budget: Option<&Budget>,
    municipality: Option<&str>,
) -> String {
    let mut hasher = DefaultHasher::new();

    if let Some(origin) = origin {
        hash_coordinates(origin, &mut hasher);
    }
    if let Some(budget) = budget {
        hash_budget(budget, &mut hasher);
    }
    municipality.hash(&mut hasher);

    format!("search:{:x}", hasher.finish())
}

pub fn isochrone_cache_key(origin: &Coordinates, budget: &Budget) -> String {
    let mut hasher = DefaultHasher::new();
    hash_coordinates(origin, &mut hasher);
    hash_budget(budget, &mut hasher);

    format!("iso:{:x}", hasher.finish())
}

/// Key for a per-city nearby response. Place types are sorted first so
/// request order does not matter. The preferred city name changes the
/// result order, so it is part of the key.
pub fn nearby_cache_key(
    city_id: &str,
    center: &Coordinates,
    types: &[String],
    city_name: Option<&str>,
) -> String {
    let mut hasher = DefaultHasher::new();
    city_id.hash(&mut hasher);
    hash_coordinates(center, &mut hasher);

    let mut sorted: Vec<&str> = types.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.hash(&mut hasher);

    city_name.filter(|name| !name.is_empty()).hash(&mut hasher);

    format!("nearby:{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_cache_key_coordinate_precision() {
        // Differences below the 4th decimal share a key
        let a = Coordinates::new(43.06211, 141.35441).unwrap();
        let b = Coordinates::new(43.06209, 141.35439).unwrap();
        let c = Coordinates::new(43.0625, 141.3544).unwrap();
        let budget = Budget::time(60.0).unwrap();

        let key_a = search_cache_key(Some(&a), Some(&budget), None);
        assert_eq!(key_a, search_cache_key(Some(&b), Some(&budget), None));
        assert_ne!(key_a, search_cache_key(Some(&c), Some(&budget), None));
    }

    #[test]
    fn test_search_cache_key_budget_kind_matters() {
        let origin = Coordinates::new(43.06, 141.35).unwrap();
        let time = Budget::time(60.0).unwrap();
        let distance = Budget::distance(60.0).unwrap();

        assert_ne!(
            search_cache_key(Some(&origin), Some(&time), None),
            search_cache_key(Some(&origin), Some(&distance), None)
        );
    }

    #[test]
    fn test_search_cache_key_municipality() {
        let with_name = search_cache_key(None, None, Some("小樽市"));
        assert_ne!(with_name, search_cache_key(None, None, Some("旭川市")));
        assert!(with_name.starts_with("search:"));
    }

    #[test]
    fn test_isochrone_cache_key_prefix_and_budget() {
        let origin = Coordinates::new(43.06, 141.35).unwrap();
        let key = isochrone_cache_key(&origin, &Budget::time(30.0).unwrap());

        assert!(key.starts_with("iso:"));
        assert_ne!(key, isochrone_cache_key(&origin, &Budget::time(45.0).unwrap()));
    }

    #[test]
    fn test_nearby_cache_key_type_order_independence() {
        let center = Coordinates::new(43.77, 142.36).unwrap();
        let key1 = nearby_cache_key(
            "asahikawa",
            &center,
            &["museum".to_string(), "park".to_string()],
            None,
        );
        let key2 = nearby_cache_key(
            "asahikawa",
            &center,
            &["park".to_string(), "museum".to_string()],
            None,
        );

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_nearby_cache_key_city_name() {
        let center = Coordinates::new(43.06, 141.78).unwrap();
        let types = ["tourist_attraction".to_string()];

        let naganuma = nearby_cache_key("01429", &center, &types, Some("長沼町"));
        let kuriyama = nearby_cache_key("01429", &center, &types, Some("栗山町"));
        let unnamed = nearby_cache_key("01429", &center, &types, None);

        assert_ne!(naganuma, kuriyama);
        assert_ne!(naganuma, unnamed);
        assert_eq!(unnamed, nearby_cache_key("01429", &center, &types, Some("")));
    }
}
