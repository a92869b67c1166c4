use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use reachspot::config::QuotaConfig;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use tower::ServiceExt;

mod common;

use common::{hokkaido_places, sample_details, test_app};

fn generous_quota() -> QuotaConfig {
    QuotaConfig::default()
}

fn places_quota(hourly: u32) -> QuotaConfig {
    QuotaConfig {
        places_hourly_limit: hourly,
        ..QuotaConfig::default()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_from(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = test_app(hokkaido_places(), generous_quota());

    let response = app.router.oneshot(get("/debug/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["municipalities"], 3);
    assert_eq!(json["checks"]["cache"]["search"]["entries"], 0);
}

#[tokio::test]
async fn test_search_groups() {
    let app = test_app(hokkaido_places(), generous_quota());

    let response = app
        .router
        .oneshot(get("/places/search?origin=43.06,141.35&mode=time&value=60"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[0]["municipality"]["name"], "小樽市");
    assert_eq!(groups[0]["anchor"]["source"], "text_search");
    assert!(groups[0]["spots"][0]["id"].is_string());
    assert!(json.get("spots").is_none());
}

#[tokio::test]
async fn test_search_by_municipality_returns_flat_spots() {
    let app = test_app(hokkaido_places(), generous_quota());

    let response = app
        .router
        .oneshot(get("/places/search?municipality=%E6%A0%97%E5%B1%B1%E7%94%BA&value=60"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["spots"].as_array().unwrap().len(), 3);
    assert!(json.get("groups").is_none());
}

#[tokio::test]
async fn test_search_validation_errors() {
    let app = test_app(hokkaido_places(), generous_quota());

    let bad_requests = [
        "/places/search?mode=time&value=60",
        "/places/search?origin=43.06,141.35&mode=time&value=301",
        "/places/search?origin=43.06,141.35&mode=distance&value=0",
        "/places/search?origin=43.06,141.35&mode=walk&value=60",
        "/places/search?origin=north&value=60",
        "/places/search?origin=43.06,141.35",
    ];

    for uri in bad_requests {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    assert_eq!(app.places.upstream_calls(), 0);
}

#[tokio::test]
async fn test_search_cache_hit_skips_upstream_and_quota() {
    let app = test_app(hokkaido_places(), places_quota(1));
    let uri = "/places/search?origin=43.06,141.35&mode=time&value=60";

    let first = app.router.clone().oneshot(get(uri)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = json_body(first).await;
    let calls_after_first = app.places.upstream_calls();

    // Same origin within the rounding precision
    let second = app
        .router
        .clone()
        .oneshot(get("/places/search?origin=43.06001,141.35001&mode=time&value=60"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await, first_body);
    assert_eq!(app.places.upstream_calls(), calls_after_first);

    // A different request needs quota, which the first one used up
    let third = app
        .router
        .clone()
        .oneshot(get("/places/search?origin=43.06,141.35&mode=time&value=90"))
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.places.upstream_calls(), calls_after_first);

    let json = json_body(third).await;
    assert_eq!(json["message"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_quota_is_per_client() {
    let mut places = hokkaido_places();
    places.details.push(sample_details());
    let app = test_app(places, places_quota(1));

    let a = app
        .router
        .clone()
        .oneshot(get_from("/places/details?id=01100-a", "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(a.status(), StatusCode::OK);

    let a_again = app
        .router
        .clone()
        .oneshot(get_from("/places/details?id=01100-a", "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(a_again.status(), StatusCode::TOO_MANY_REQUESTS);

    let b = app
        .router
        .clone()
        .oneshot(get_from("/places/details?id=01100-a", "198.51.100.2"))
        .await
        .unwrap();
    assert_eq!(b.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let mut places = hokkaido_places();
    places.fail_all = true;
    let app = test_app(places, generous_quota());

    let response = app
        .router
        .oneshot(get("/places/search?origin=43.06,141.35&value=60"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["message"], "Upstream service error");
}

#[tokio::test]
async fn test_isochrone_endpoint() {
    let app = test_app(hokkaido_places(), generous_quota());

    let response = app
        .router
        .clone()
        .oneshot(get("/isochrone?lat=43.06&lon=141.35&time=30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["region"]["type"], "FeatureCollection");
    let ids: Vec<&str> = json["municipalities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["01100", "01203"]);
    assert_eq!(json["municipalities"][0]["bbox"], json!([141.2, 42.95, 141.5, 43.15]));

    // Cached: a nearby origin that rounds to the same key
    let again = app
        .router
        .oneshot(get("/isochrone?lat=43.06002&lon=141.34998&time=30"))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(app.isoline.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_isochrone_validation() {
    let app = test_app(hokkaido_places(), generous_quota());

    let bad_requests = [
        "/isochrone?lat=43.06&lon=141.35",
        "/isochrone?lat=43.06&lon=141.35&time=30&distance=20",
        "/isochrone?lat=43.06&lon=141.35&time=400",
        "/isochrone?lat=43.06&lon=141.35&distance=501",
        "/isochrone?lat=93&lon=141.35&time=30",
        "/isochrone?lon=141.35&time=30",
    ];

    for uri in bad_requests {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }

    assert_eq!(app.isoline.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_isochrone_quota() {
    let quota = QuotaConfig {
        isoline_hourly_limit: 1,
        ..QuotaConfig::default()
    };
    let app = test_app(hokkaido_places(), quota);

    let first = app
        .router
        .clone()
        .oneshot(get("/isochrone?lat=43.06&lon=141.35&time=30"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .clone()
        .oneshot(get("/isochrone?lat=43.06&lon=141.35&distance=30"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.isoline.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_nearby_endpoint_prefers_city_name() {
    let app = test_app(hokkaido_places(), generous_quota());

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/nearby",
            json!({
                "cityId": "01429",
                "center": {"lat": 43.0565, "lon": 141.7844},
                "types": ["tourist_attraction"],
                "cityName": "長沼町"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["city_id"], "01429");
    let results = json["results"].as_array().unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r["id"].as_str().unwrap()).collect();

    // Naganuma spots first, each half ordered by rating
    assert_eq!(
        ids,
        vec!["01427-a", "01427-b", "01429-a", "shared-kuriyama", "01429-b"]
    );

    let types = app.places.nearby_types.lock().unwrap().clone();
    assert_eq!(types, vec![vec!["tourist_attraction".to_string()]]);
}

#[tokio::test]
async fn test_nearby_cache_is_keyed_by_city_name() {
    let app = test_app(hokkaido_places(), generous_quota());
    let body = |city_name: &str| {
        json!({
            "cityId": "01429",
            "center": {"lat": 43.0565, "lng": 141.7844},
            "types": ["tourist_attraction"],
            "cityName": city_name
        })
    };

    let naganuma = app
        .router
        .clone()
        .oneshot(post_json("/nearby", body("長沼町")))
        .await
        .unwrap();
    assert_eq!(naganuma.status(), StatusCode::OK);
    json_body(naganuma).await;

    let kuriyama = app
        .router
        .clone()
        .oneshot(post_json("/nearby", body("栗山町")))
        .await
        .unwrap();
    assert_eq!(kuriyama.status(), StatusCode::OK);

    let json = json_body(kuriyama).await;
    let ids: Vec<&str> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["01429-a", "shared-kuriyama", "01429-b", "01427-a", "01427-b"]
    );
    assert_eq!(app.places.nearby_calls.load(Ordering::SeqCst), 2);

    // Same city name again is served from cache
    let again = app
        .router
        .oneshot(post_json("/nearby", body("栗山町")))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(app.places.nearby_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_nearby_endpoint_validation() {
    let app = test_app(hokkaido_places(), generous_quota());

    let bad_bodies = [
        json!({"city_id": "", "center": {"lat": 43.0, "lng": 141.0}}),
        json!({"city_id": "x", "center": {"lat": 91.0, "lng": 141.0}}),
        json!({"city_id": "x", "center": {"lat": 43.0, "lng": 141.0}, "types": ["DROP TABLE"]}),
    ];

    for body in bad_bodies {
        let response = app
            .router
            .clone()
            .oneshot(post_json("/nearby", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }

    assert_eq!(app.places.upstream_calls(), 0);
}

#[tokio::test]
async fn test_details_endpoint() {
    let mut places = hokkaido_places();
    places.details.push(sample_details());
    let app = test_app(places, generous_quota());

    let response = app
        .router
        .clone()
        .oneshot(get("/places/details?id=01100-a"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["name"], "時計台");
    assert_eq!(json["reviews"].as_array().unwrap().len(), 1);

    let missing = app
        .router
        .clone()
        .oneshot(get("/places/details?id="))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .router
        .oneshot(get("/places/details?id=nope"))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_GATEWAY);
}
