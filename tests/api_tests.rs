use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::Value;

use film_recommender::api::{create_router, AppState};
use film_recommender::services::providers::InMemoryCatalog;
use film_recommender::services::{EngineSettings, RecommendationEngine};

const CATALOG: &str = include_str!("../fixtures/catalog.json");

fn create_test_server() -> TestServer {
    let catalog = InMemoryCatalog::from_json(CATALOG).unwrap();
    let engine = RecommendationEngine::with_provider(Arc::new(catalog), EngineSettings::default());
    let app = create_router(AppState::new(Arc::new(engine)));
    TestServer::new(app).unwrap()
}

fn titles(recommendations: &Value) -> Vec<String> {
    recommendations
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(!response.header("x-request-id").is_empty());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let request_id = "3f1b3a9e-5c1d-4d5e-9a34-1c2b3d4e5f60";

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(request_id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), request_id);
}

#[tokio::test]
async fn test_status_reports_model_after_rebuild() {
    let server = create_test_server();

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["status"], "ok");
    assert_eq!(status["model_built"], false);
    assert_eq!(status["catalog_size"], 0);
    assert!(status["date"].as_str().is_some());

    let response = server.post("/admin/model/rebuild").await;
    response.assert_status_ok();
    let rebuilt: Value = response.json();
    assert_eq!(rebuilt["built"], true);
    assert_eq!(rebuilt["documents"], 12);

    let status: Value = server.get("/status").await.json();
    assert_eq!(status["model_built"], true);
    assert_eq!(status["catalog_size"], 12);
}

#[tokio::test]
async fn test_category_recommendations() {
    let server = create_test_server();

    let response = server
        .get("/recommendations?user_id=1&focus=category")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["focus"], "category");
    assert_eq!(body["outcome"], "ranked");
    assert_eq!(body["watched_films"].as_array().unwrap().len(), 3);
    assert_eq!(
        titles(&body["recommendations"]),
        vec!["ALABAMA DEVIL", "AIRPORT POLLOCK", "ACE GOLDFINGER"]
    );
    assert_eq!(
        body["recommendations"][0]["explanation"],
        "Popular in genres you have watched: Documentary, Horror"
    );
}

#[tokio::test]
async fn test_invalid_focus_is_not_an_error() {
    let server = create_test_server();

    let response = server
        .get("/recommendations?user_id=1&focus=unknown_value")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["outcome"], "invalid_focus");
    assert_eq!(body["focus"], "unknown_value");
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["title"], "");
    let explanation = recommendations[0]["explanation"].as_str().unwrap();
    for focus in ["category", "actor", "language", "rating", "popularity", "fulltext", "ml"] {
        assert!(explanation.contains(focus), "missing {}", focus);
    }
}

#[tokio::test]
async fn test_non_positive_user_id_is_rejected() {
    let server = create_test_server();

    let response = server
        .get("/recommendations?user_id=0&focus=category")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("user_id"));

    let response = server.get("/ml/recommendations/-4").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ml_falls_back_to_popularity_for_short_history() {
    let server = create_test_server();

    let response = server.get("/ml/recommendations/2").await;
    response.assert_status_ok();

    let recommendations: Value = response.json();
    let list = recommendations.as_array().unwrap();
    assert_eq!(list.len(), 10);
    assert_eq!(list[0]["title"], "ALABAMA DEVIL");
    assert!(!titles(&recommendations).contains(&"AIRPLANE SIERRA".to_string()));
    for rec in list {
        assert_eq!(rec["score"], 0.0);
        assert_eq!(
            rec["explanation"],
            "Popularity fallback: insufficient watch history"
        );
    }
}

#[tokio::test]
async fn test_ml_ranks_by_similarity() {
    let server = create_test_server();

    let response = server.get("/ml/recommendations/1").await;
    response.assert_status_ok();

    let recommendations: Value = response.json();
    let list = recommendations.as_array().unwrap();
    assert_eq!(list.len(), 9);
    for rec in list {
        let film_id = rec["film_id"].as_i64().unwrap();
        assert!(![1, 3, 4].contains(&film_id));
        let score = rec["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert!(rec["explanation"].as_str().unwrap().contains("confidence:"));
    }
    let scores: Vec<f64> = list.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_fulltext_recommendations_are_diversified() {
    let server = create_test_server();

    let response = server.get("/fulltext-recommendations?user_id=1").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["focus"], "fulltext");
    assert_eq!(body["outcome"], "ranked");
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 7);
    assert_eq!(recommendations[0]["title"], "ALABAMA DEVIL");
    assert_eq!(
        recommendations[0]["explanation"],
        "Affinity with the theme 'drama' (score: 2)"
    );
    let drama = recommendations
        .iter()
        .filter(|r| r["explanation"].as_str().unwrap().contains("'drama'"))
        .count();
    assert_eq!(drama, 3);
}

#[tokio::test]
async fn test_fulltext_without_history() {
    let server = create_test_server();

    let body: Value = server
        .get("/fulltext-recommendations?user_id=99")
        .await
        .json();

    assert_eq!(body["outcome"], "insufficient_signal");
    assert_eq!(
        body["recommendations"][0]["explanation"],
        "User not found or has no watch history"
    );
    assert!(body["watched_films"].as_array().unwrap().is_empty());
}
