//! Typed wrappers over the analytics API.
//!
//! `Backend` is the seam the session talks through; `HttpBackend` is the
//! real implementation, tests substitute their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::{Config, TimeRange};
use crate::transport::{ApiClient, ApiRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub initialized: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub models_loaded: u32,
    #[serde(default)]
    pub data_points: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recommendation {
    pub recommended_model: String,
    pub reason: String,
    /// Confidence score in [0, 100].
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub model_insights: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickInsight {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KpiResponse {
    pub next_week_prediction: f64,
    pub model_accuracy: f64,
    pub last_change: f64,
    pub change_from_previous: f64,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub market_status: Option<String>,
    #[serde(default)]
    pub quick_insights: Vec<QuickInsight>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoricalPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub date: String,
    pub prediction: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub name: String,
    pub mae: f64,
    #[serde(default)]
    pub next_week_prediction: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InsightEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InsightBundle {
    #[serde(default)]
    pub model_insights: Vec<InsightEntry>,
    #[serde(default)]
    pub market_insights: Vec<InsightEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub historical: Vec<HistoricalPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub model_info: ModelInfo,
    /// Absent is a distinct condition from present-but-empty; the
    /// normalizer relies on this `Option` surviving deserialization.
    #[serde(default)]
    pub insights: Option<InsightBundle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonResponse {
    #[serde(default)]
    pub model_comparisons: HashMap<String, Value>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatIfRequest {
    pub current_iph: f64,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatIfResponse {
    pub scenario: String,
    pub prediction: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub model_used: String,
    #[serde(default)]
    pub comparison_with_normal: Option<Value>,
    #[serde(default)]
    pub insights: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadResponse {
    pub csv_data: String,
    pub filename: String,
    #[serde(default)]
    pub total_records: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub models_loaded: u32,
    #[serde(default)]
    pub data_points: u64,
    #[serde(default)]
    pub insight_analyzer: Option<String>,
}

/// The session's view of the analytics API. One method per endpoint.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn status(&self) -> Result<StatusResponse, ApiError>;
    async fn models(&self) -> Result<ModelsResponse, ApiError>;
    async fn kpi(&self) -> Result<KpiResponse, ApiError>;
    async fn forecast(&self, model: &str, range: TimeRange) -> Result<ForecastResponse, ApiError>;
    async fn comparison(&self) -> Result<ComparisonResponse, ApiError>;
    async fn what_if(&self, req: &WhatIfRequest) -> Result<WhatIfResponse, ApiError>;
    async fn download_data(&self) -> Result<DownloadResponse, ApiError>;
    async fn health(&self) -> Result<HealthResponse, ApiError>;
}

pub struct HttpBackend {
    client: ApiClient,
    request_timeout: Duration,
    probe_timeout: Duration,
    health_timeout: Duration,
}

impl HttpBackend {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: ApiClient::new(&cfg.api_base)?,
            request_timeout: cfg.request_timeout,
            probe_timeout: cfg.probe_timeout,
            health_timeout: cfg.health_timeout,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: String,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let body = self.client.request(ApiRequest::get(path.clone(), timeout)).await?;
        parse(&path, body)
    }
}

fn parse<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Malformed {
        endpoint: endpoint.to_string(),
        detail: e.to_string(),
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn status(&self) -> Result<StatusResponse, ApiError> {
        self.get("/api/status".to_string(), self.probe_timeout).await
    }

    async fn models(&self) -> Result<ModelsResponse, ApiError> {
        self.get("/api/models".to_string(), self.request_timeout).await
    }

    async fn kpi(&self) -> Result<KpiResponse, ApiError> {
        self.get("/api/kpi".to_string(), self.request_timeout).await
    }

    async fn forecast(&self, model: &str, range: TimeRange) -> Result<ForecastResponse, ApiError> {
        let path = match range.months_param() {
            Some(months) => format!("/api/forecast/{}?months={}", model, months),
            None => format!("/api/forecast/{}", model),
        };
        self.get(path, self.request_timeout).await
    }

    async fn comparison(&self) -> Result<ComparisonResponse, ApiError> {
        self.get("/api/insights/comparison".to_string(), self.request_timeout)
            .await
    }

    async fn what_if(&self, req: &WhatIfRequest) -> Result<WhatIfResponse, ApiError> {
        let path = "/api/what-if".to_string();
        let body = serde_json::to_value(req).map_err(|e| ApiError::Malformed {
            endpoint: path.clone(),
            detail: format!("unencodable request: {}", e),
        })?;
        let resp = self
            .client
            .request(ApiRequest::post(path.clone(), body, self.request_timeout))
            .await?;
        parse(&path, resp)
    }

    async fn download_data(&self) -> Result<DownloadResponse, ApiError> {
        self.get("/api/download-data".to_string(), self.request_timeout)
            .await
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get("/api/health".to_string(), self.health_timeout).await
    }
}
