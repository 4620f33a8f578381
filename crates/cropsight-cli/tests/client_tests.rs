//! End-to-end tests: real servers on ephemeral ports, called through
//! `PredictionClient`.

use cropsight_cli::client::{ClientError, PredictionClient};
use cropsight_cli::config::default_cors_origins;
use cropsight_cli::market::market_prices;
use cropsight_cli::soil_api::{soil_routes, SharedSoilBundle};
use cropsight_cli::symptom_api::{symptom_routes, SharedSymptomBundle};
use cropsight_model::*;

fn soil_bundle() -> SharedSoilBundle {
    // Wet soils get rice, dry soils get chickpea.
    let scaler = Scaler::min_max(vec![0.0; 7], vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.01]).unwrap();
    let classifier = Classifier::Linear {
        classes: vec!["chickpea".into(), "rice".into()],
        coef: vec![vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]],
        intercept: vec![-1.5],
    };
    BundleHandle::ready(SoilBundle::new(scaler, classifier))
}

fn symptom_bundle() -> SharedSymptomBundle {
    let vectorizer = TextVectorizerBuilder::new(["yellow", "wilting"]).build().unwrap();
    let classifier = Classifier::Linear {
        classes: vec!["Nitrogen Deficiency".into(), "Fusarium Wilt".into()],
        coef: vec![vec![-1.0, 1.0]],
        intercept: vec![0.0],
    };
    let treatments = [("Nitrogen Deficiency", "Apply a nitrogen-rich fertiliser")]
        .into_iter()
        .collect();
    BundleHandle::ready(SymptomBundle::new(vectorizer, classifier, treatments))
}

fn reading(rainfall: f64) -> SoilReading {
    SoilReading {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        temperature: 20.8,
        humidity: 82.0,
        ph: 6.5,
        rainfall,
    }
}

fn start_soil(bundle: SharedSoilBundle) -> String {
    let routes = soil_routes(bundle, &default_cors_origins());
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

fn start_symptom(bundle: SharedSymptomBundle) -> String {
    let routes = symptom_routes(bundle);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

#[tokio::test]
async fn client_recommends_crop() {
    let client = PredictionClient::new(&start_soil(soil_bundle()));

    assert_eq!(client.recommend_crop(&reading(202.9)).await.unwrap(), "rice");
    assert_eq!(client.recommend_crop(&reading(80.0)).await.unwrap(), "chickpea");
}

#[tokio::test]
async fn client_surfaces_unloaded_soil_bundle() {
    let base = start_soil(BundleHandle::unavailable("scaler.json missing"));
    let client = PredictionClient::new(&base);

    match client.recommend_crop(&reading(202.9)).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Soil model bundle not loaded. Please check server logs.");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn client_fetches_market_prices() {
    let client = PredictionClient::new(&start_soil(soil_bundle()));
    assert_eq!(client.market_prices().await.unwrap(), market_prices());
}

#[tokio::test]
async fn client_diagnoses_and_echoes() {
    let client = PredictionClient::new(&start_symptom(symptom_bundle()));

    let d = client.diagnose(" Yellow older leaves ").await.unwrap();
    assert_eq!(d.disease, "Nitrogen Deficiency");
    assert_eq!(d.treatment, "Apply a nitrogen-rich fertiliser");
    assert_eq!(d.symptoms, " Yellow older leaves ");

    let d = client.diagnose("sudden wilting").await.unwrap();
    assert_eq!(d.disease, "Fusarium Wilt");
    assert_eq!(d.treatment, NO_TREATMENT_FOUND);
}

#[tokio::test]
async fn client_reports_empty_symptoms() {
    let client = PredictionClient::new(&start_symptom(symptom_bundle()));

    match client.diagnose("").await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "No symptoms provided");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn client_connection_refused_is_http_error() {
    // Bind then drop a listener to get a port nobody is serving.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = PredictionClient::new(&format!("http://127.0.0.1:{}", port));
    assert!(matches!(
        client.market_prices().await,
        Err(ClientError::Http(_))
    ));
}
