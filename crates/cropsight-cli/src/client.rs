//! HTTP client for calling remote cropsight services.

use crate::market::MarketPrice;
use crate::soil_api::RecommendationResponse;
use crate::symptom_api::{DiagnoseRequest, DiagnoseResponse};
use cropsight_model::SoilReading;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Client for either prediction service.
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ask a soil service for a crop recommendation.
    pub async fn recommend_crop(&self, reading: &SoilReading) -> Result<String, ClientError> {
        let url = format!("{}/predict", self.base_url);
        let resp = self.client.post(&url).json(reading).send().await?;
        let body: RecommendationResponse = Self::decode(resp).await?;
        Ok(body.recommended_crop)
    }

    /// Ask a symptom service for a diagnosis.
    pub async fn diagnose(&self, symptoms: &str) -> Result<DiagnoseResponse, ClientError> {
        let url = format!("{}/predict", self.base_url);
        let body = DiagnoseRequest {
            symptoms: symptoms.to_string(),
        };
        let resp = self.client.post(&url).json(&body).send().await?;
        Self::decode(resp).await
    }

    /// Fetch the market price listing from a soil service.
    pub async fn market_prices(&self) -> Result<Vec<MarketPrice>, ClientError> {
        let url = format!("{}/market-prices", self.base_url);
        let resp = self.client.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status,
                message: error_message(&text),
            });
        }
        Ok(resp.json().await?)
    }
}

/// Pull `detail` (soil) or `error` (symptom) out of an error body, falling
/// back to the raw text.
fn error_message(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string())
}
