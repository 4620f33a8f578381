//! REST API for the Symptom Predictor
//!
//! Identifies a plant disease from a free-text symptom description and
//! returns the matching treatment advice.

use crate::cors::{preflight, AllowedOrigins, ALLOWED_METHODS};
use crate::rejection::{classify, json_error};
use cropsight_model::{BundleHandle, SymptomBundle};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

pub type SharedSymptomBundle = BundleHandle<SymptomBundle>;

pub const BUNDLE_NOT_LOADED: &str = "Model files not loaded. Please check server logs.";
pub const NO_SYMPTOMS: &str = "No symptoms provided";

// =============================================================================
// Request/Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnoseRequest {
    pub symptoms: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnoseResponse {
    pub disease: String,
    pub treatment: String,
    pub symptoms: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

// =============================================================================
// Route tree
// =============================================================================

/// Build the symptom service route tree. Any origin may call it.
pub fn symptom_routes(
    bundle: SharedSymptomBundle,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let welcome = warp::path::end().and(warp::get()).and_then(handle_welcome);

    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_bundle(bundle))
        .and(warp::body::bytes())
        .and_then(handle_predict);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(ALLOWED_METHODS);

    let routes = welcome
        .or(predict)
        .recover(handle_rejection)
        .with(cors)
        .recover(handle_rejection);

    preflight(AllowedOrigins::Any, false).or(routes)
}

// =============================================================================
// Filters
// =============================================================================

fn with_bundle(
    bundle: SharedSymptomBundle,
) -> impl Filter<Extract = (SharedSymptomBundle,), Error = Infallible> + Clone {
    warp::any().map(move || bundle.clone())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_welcome() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&WelcomeResponse {
        message: "Crop Disease Detection API".into(),
    }))
}

async fn handle_predict(
    bundle: SharedSymptomBundle,
    body: Bytes,
) -> Result<impl Reply, Infallible> {
    let Some(bundle) = bundle.get() else {
        return Ok(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            BUNDLE_NOT_LOADED,
        ));
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {}", e),
            ))
        }
    };

    // Only a non-empty string counts; whitespace is kept as sent.
    let symptoms = match payload.get("symptoms").and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(error_response(StatusCode::BAD_REQUEST, NO_SYMPTOMS)),
    };

    match bundle.diagnose(symptoms) {
        Ok(diagnosis) => {
            tracing::debug!(disease = %diagnosis.disease, "Disease identified");
            let resp = DiagnoseResponse {
                disease: diagnosis.disease,
                treatment: diagnosis.treatment,
                symptoms: symptoms.to_string(),
            };
            Ok(warp::reply::json(&resp).into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Error during prediction");
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
            ))
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (status, message) = classify(&err);
    Ok(error_response(status, &message))
}

fn error_response(status: StatusCode, message: &str) -> warp::reply::Response {
    json_error(status, "error", message)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cropsight_model::{Classifier, DecisionTree, TextVectorizerBuilder, TreeNode};
    use cropsight_model::NO_TREATMENT_FOUND;

    /// "rust" or "orange" → Leaf Rust, "mildew" → Powdery Mildew,
    /// anything else → Mosaic Virus (no treatment on file).
    fn bundle() -> SharedSymptomBundle {
        let vectorizer = TextVectorizerBuilder::new(["orange", "rust", "mildew"])
            .build()
            .unwrap();
        let classifier = Classifier::Linear {
            classes: vec!["Leaf Rust".into(), "Powdery Mildew".into(), "Mosaic Virus".into()],
            coef: vec![
                vec![1.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.0, 0.0],
            ],
            intercept: vec![0.0, 0.0, 0.1],
        };
        let treatments = [
            ("Leaf Rust", "Apply a triazole fungicide"),
            ("Powdery Mildew", "Spray potassium bicarbonate"),
        ]
        .into_iter()
        .collect();
        BundleHandle::ready(SymptomBundle::new(vectorizer, classifier, treatments))
    }

    /// Tree whose only split points at a missing node.
    fn corrupt_bundle() -> SharedSymptomBundle {
        let vectorizer = TextVectorizerBuilder::new(["rust"]).build().unwrap();
        let classifier = Classifier::RandomForest {
            classes: vec!["Leaf Rust".into()],
            n_features: 1,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::split(0, 0.5, 7, 8)],
            }],
        };
        BundleHandle::ready(SymptomBundle::new(
            vectorizer,
            classifier,
            Default::default(),
        ))
    }

    async fn post(
        bundle: SharedSymptomBundle,
        body: &str,
    ) -> warp::http::Response<Bytes> {
        warp::test::request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/json")
            .body(body.to_string())
            .reply(&symptom_routes(bundle))
            .await
    }

    fn error_of(resp: &warp::http::Response<Bytes>) -> String {
        let body: ApiError = serde_json::from_slice(resp.body()).unwrap();
        body.error
    }

    #[tokio::test]
    async fn test_welcome() {
        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .reply(&symptom_routes(bundle()))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: WelcomeResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.message, "Crop Disease Detection API");
    }

    #[tokio::test]
    async fn test_predict_with_treatment() {
        let resp = post(bundle(), r#"{"symptoms": "Orange rust pustules"}"#).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: DiagnoseResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.disease, "Leaf Rust");
        assert_eq!(body.treatment, "Apply a triazole fungicide");
    }

    #[tokio::test]
    async fn test_unmapped_label_uses_placeholder() {
        let resp = post(bundle(), r#"{"symptoms": "mottled leaves"}"#).await;

        let body: DiagnoseResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.disease, "Mosaic Virus");
        assert_eq!(body.treatment, NO_TREATMENT_FOUND);
    }

    #[tokio::test]
    async fn test_echo_is_byte_identical() {
        let symptoms = "  white mildew\ton leaves \n";
        let body = serde_json::json!({ "symptoms": symptoms }).to_string();
        let resp = post(bundle(), &body).await;

        let body: DiagnoseResponse = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body.symptoms, symptoms);
        assert_eq!(body.disease, "Powdery Mildew");
    }

    #[tokio::test]
    async fn test_missing_or_empty_symptoms_are_client_errors() {
        // A corrupt model proves the request never reaches inference.
        for body in [
            r#"{"symptoms": ""}"#,
            r#"{}"#,
            r#"{"symptoms": null}"#,
            r#"{"symptoms": 42}"#,
            r#"["symptoms"]"#,
        ] {
            let resp = post(corrupt_bundle(), body).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(error_of(&resp), NO_SYMPTOMS);
        }
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let resp = post(bundle(), "symptoms=yellow").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_of(&resp).starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_unloaded_bundle_checked_first() {
        let unloaded = BundleHandle::unavailable("vectorizer.json missing");
        for body in [r#"{"symptoms": "yellow leaves"}"#, r#"{}"#] {
            let resp = post(unloaded.clone(), body).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(error_of(&resp), BUNDLE_NOT_LOADED);
        }
    }

    #[tokio::test]
    async fn test_inference_error_is_500_with_raw_message() {
        let resp = post(corrupt_bundle(), r#"{"symptoms": "rust"}"#).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&resp), "Tree 0 references missing node 8");
    }

    #[tokio::test]
    async fn test_cors_open_to_any_origin() {
        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .header("origin", "https://anywhere.example.org")
            .reply(&symptom_routes(bundle()))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_preflight_allows_any_requested_header() {
        let resp = warp::test::request()
            .method("OPTIONS")
            .path("/predict")
            .header("origin", "https://anywhere.example.org")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, authorization")
            .reply(&symptom_routes(bundle()))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "https://anywhere.example.org"
        );
        assert_eq!(
            resp.headers()["access-control-allow-headers"],
            "content-type, authorization"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_uses_error_shape() {
        let resp = warp::test::request()
            .method("GET")
            .path("/diseases")
            .reply(&symptom_routes(bundle()))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_of(&resp), "Not Found");
    }
}
