//! REST API for the Soil-Feature Predictor
//!
//! Serves crop recommendations from seven soil and climate measurements,
//! plus the static market price listing.

use crate::cors::{preflight, AllowedOrigins, ALLOWED_METHODS};
use crate::market::market_prices;
use crate::rejection::{classify, json_error};
use cropsight_model::{BundleHandle, SoilBundle, SoilReading};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

pub type SharedSoilBundle = BundleHandle<SoilBundle>;

pub const BUNDLE_NOT_LOADED: &str = "Soil model bundle not loaded. Please check server logs.";

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommended_crop: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailError {
    pub detail: String,
}

// =============================================================================
// Route tree
// =============================================================================

/// Build the soil service route tree, CORS and rejection handling included.
///
/// `cors_origins` must already have passed [`crate::config::Config::validate`].
pub fn soil_routes(
    bundle: SharedSoilBundle,
    cors_origins: &[String],
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let welcome = warp::path::end().and(warp::get()).and_then(handle_welcome);

    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_bundle(bundle))
        .and(warp::body::bytes())
        .and_then(handle_predict);

    let prices = warp::path("market-prices")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handle_market_prices);

    let cors = warp::cors()
        .allow_origins(cors_origins.iter().map(String::as_str))
        .allow_credentials(true)
        .allow_methods(ALLOWED_METHODS);

    // Inner recover so error replies still carry CORS headers; the outer one
    // turns a forbidden origin into a JSON 403.
    let routes = welcome
        .or(predict)
        .or(prices)
        .recover(handle_rejection)
        .with(cors)
        .recover(handle_rejection);

    preflight(AllowedOrigins::list(cors_origins), true).or(routes)
}

// =============================================================================
// Filters
// =============================================================================

fn with_bundle(
    bundle: SharedSoilBundle,
) -> impl Filter<Extract = (SharedSoilBundle,), Error = Infallible> + Clone {
    warp::any().map(move || bundle.clone())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_welcome() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&WelcomeResponse {
        message: "Welcome to Crop Recommendation System API".into(),
    }))
}

async fn handle_predict(bundle: SharedSoilBundle, body: Bytes) -> Result<impl Reply, Infallible> {
    let Some(bundle) = bundle.get() else {
        return Ok(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            BUNDLE_NOT_LOADED,
        ));
    };

    let reading: SoilReading = match serde_json::from_slice(&body) {
        Ok(reading) => reading,
        Err(e) => {
            return Ok(error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &e.to_string(),
            ))
        }
    };

    match bundle.recommend(&reading) {
        Ok(crop) => {
            tracing::debug!(?reading, %crop, "Crop recommended");
            let resp = RecommendationResponse {
                recommended_crop: crop,
            };
            Ok(warp::reply::json(&resp).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Crop recommendation failed");
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
            ))
        }
    }
}

async fn handle_market_prices() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&market_prices()))
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, message) = classify(&err);
    Ok(error_response(status, &message))
}

fn error_response(status: StatusCode, message: &str) -> warp::reply::Response {
    json_error(status, "detail", message)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_cors_origins;
    use crate::market::MarketPrice;
    use cropsight_model::{Classifier, Scaler};

    fn canonical_json() -> serde_json::Value {
        serde_json::json!({
            "N": 90, "P": 42, "K": 43,
            "temperature": 20.8, "humidity": 82, "ph": 6.5, "rainfall": 202.9
        })
    }

    /// Rainfall alone decides: wet means rice, dry means chickpea.
    fn rainfall_bundle(scaler_width: usize) -> SharedSoilBundle {
        let mut mean = vec![0.0; scaler_width];
        let mut scale = vec![1.0; scaler_width];
        if let Some(last) = mean.last_mut() {
            *last = 150.0;
        }
        if let Some(last) = scale.last_mut() {
            *last = 50.0;
        }
        let scaler = Scaler::standard(mean, scale).unwrap();
        let classifier = Classifier::Linear {
            classes: vec!["chickpea".into(), "rice".into()],
            coef: vec![vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]],
            intercept: vec![0.0],
        };
        BundleHandle::ready(SoilBundle::new(scaler, classifier))
    }

    fn routes(
        bundle: SharedSoilBundle,
    ) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        soil_routes(bundle, &default_cors_origins())
    }

    fn detail(resp: &warp::http::Response<Bytes>) -> String {
        let body: DetailError = serde_json::from_slice(resp.body()).unwrap();
        body.detail
    }

    #[tokio::test]
    async fn test_welcome() {
        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: WelcomeResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.message, "Welcome to Crop Recommendation System API");
    }

    #[tokio::test]
    async fn test_predict_returns_label_from_class_set() {
        let resp = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&canonical_json())
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: RecommendationResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.recommended_crop, "rice");
    }

    #[tokio::test]
    async fn test_predict_is_deterministic() {
        let routes = routes(rainfall_bundle(7));
        let mut seen = Vec::new();
        for _ in 0..5 {
            let resp = warp::test::request()
                .method("POST")
                .path("/predict")
                .json(&canonical_json())
                .reply(&routes)
                .await;
            let body: RecommendationResponse = serde_json::from_slice(resp.body()).unwrap();
            seen.push(body.recommended_crop);
        }
        assert!(seen.iter().all(|c| c == &seen[0]));
    }

    #[tokio::test]
    async fn test_predict_accepts_numeric_strings() {
        let mut body = canonical_json();
        body["rainfall"] = serde_json::json!("60");
        let resp = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&body)
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: RecommendationResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.recommended_crop, "chickpea");
    }

    #[tokio::test]
    async fn test_predict_missing_field_is_client_error() {
        let mut body = canonical_json();
        body.as_object_mut().unwrap().remove("ph");
        let resp = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&body)
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(detail(&resp).contains("ph"));
    }

    #[tokio::test]
    async fn test_unloaded_bundle_fails_regardless_of_input() {
        let routes = routes(BundleHandle::unavailable("scaler.json not found"));

        for body in [
            canonical_json().to_string(),
            "{}".to_string(),
            "not json at all".to_string(),
        ] {
            let resp = warp::test::request()
                .method("POST")
                .path("/predict")
                .header("content-type", "application/json")
                .body(body)
                .reply(&routes)
                .await;

            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(detail(&resp), BUNDLE_NOT_LOADED);
        }
    }

    #[tokio::test]
    async fn test_feature_mismatch_surfaces_raw_message() {
        let resp = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&canonical_json())
            .reply(&routes(rainfall_bundle(5)))
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            detail(&resp),
            "X has 7 features, but StandardScaler is expecting 5 features as input."
        );
    }

    #[tokio::test]
    async fn test_market_prices_fixed_listing() {
        let routes = routes(BundleHandle::unavailable("not needed"));
        let resp = warp::test::request()
            .method("GET")
            .path("/market-prices")
            .reply(&routes)
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Vec<MarketPrice> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.len(), 5);
        assert_eq!(body, market_prices());
    }

    #[tokio::test]
    async fn test_market_prices_unaffected_by_predictions() {
        let routes = routes(rainfall_bundle(7));
        let _ = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&canonical_json())
            .reply(&routes)
            .await;

        let resp = warp::test::request()
            .method("GET")
            .path("/market-prices")
            .reply(&routes)
            .await;
        let body: Vec<MarketPrice> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body, market_prices());
    }

    #[tokio::test]
    async fn test_unknown_route_and_wrong_method() {
        let routes = routes(rainfall_bundle(7));

        let resp = warp::test::request()
            .method("GET")
            .path("/nope")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(detail(&resp), "Not Found");

        let resp = warp::test::request()
            .method("GET")
            .path("/predict")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_allow_list() {
        let routes = routes(rainfall_bundle(7));

        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .header("origin", "http://localhost:5173")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(resp.headers()["access-control-allow-credentials"], "true");

        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .header("origin", "http://evil.example.com")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/predict")
            .header("origin", "http://127.0.0.1:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://127.0.0.1:3000"
        );
    }

    #[tokio::test]
    async fn test_preflight_allows_custom_headers() {
        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/predict")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, x-client-version")
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let allowed = resp.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_string();
        assert!(allowed.contains("x-client-version"), "{}", allowed);
        assert_eq!(resp.headers()["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn test_preflight_from_unlisted_origin_is_forbidden() {
        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/predict")
            .header("origin", "http://evil.example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "x-client-version")
            .reply(&routes(rainfall_bundle(7)))
            .await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(detail(&resp).starts_with("CORS request forbidden"));
    }
}
