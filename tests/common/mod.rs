//! Shared test doubles: a scriptable backend and a capturing render.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use iphdash::api::{
    Backend, ComparisonResponse, DownloadResponse, ForecastPoint, ForecastResponse,
    HealthResponse, HistoricalPoint, InsightBundle, KpiResponse, ModelInfo, ModelsResponse,
    Recommendation, StatusResponse, WhatIfRequest, WhatIfResponse,
};
use iphdash::bootstrap::Phase;
use iphdash::error::ApiError;
use iphdash::insights::{ForecastView, KpiView};
use iphdash::render::{Render, Severity};
use iphdash::state::{Config, TimeRange};

pub fn fast_config() -> Config {
    Config {
        api_base: "http://127.0.0.1:5001".to_string(),
        request_timeout: Duration::from_millis(500),
        probe_timeout: Duration::from_millis(100),
        health_timeout: Duration::from_millis(100),
        probe_max_attempts: 10,
        probe_delay: Duration::from_millis(5),
        bootstrap_deadline: Duration::from_secs(2),
        refresh_interval: Duration::from_secs(60),
    }
}

/// Backend double. Counters record call volume; the knobs script delays
/// and failures per endpoint.
pub struct MockBackend {
    pub status_calls: AtomicU32,
    pub kpi_calls: AtomicU32,
    pub forecast_calls: AtomicU32,
    /// Number of status calls that report `initialized: false` before the
    /// backend comes up. `u32::MAX` means never.
    pub ready_after: u32,
    /// KPI calls beyond this count fail. `u32::MAX` means never fail.
    pub kpi_fail_after: u32,
    pub kpi_delay: Duration,
    /// Per-call forecast delay and MAE marker, consumed front to back;
    /// both fall back to zero-delay / 0.5 when exhausted.
    pub forecast_delays: Mutex<VecDeque<Duration>>,
    pub forecast_maes: Mutex<VecDeque<f64>>,
    /// Forecast calls beyond this count fail. `u32::MAX` means never.
    pub forecast_fail_after: u32,
    /// Insight payload attached to every forecast response.
    pub insights: Option<InsightBundle>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            status_calls: AtomicU32::new(0),
            kpi_calls: AtomicU32::new(0),
            forecast_calls: AtomicU32::new(0),
            ready_after: 0,
            kpi_fail_after: u32::MAX,
            kpi_delay: Duration::ZERO,
            forecast_delays: Mutex::new(VecDeque::new()),
            forecast_maes: Mutex::new(VecDeque::new()),
            forecast_fail_after: u32::MAX,
            insights: None,
        }
    }
}

impl MockBackend {
    pub fn with_forecast_script(self, delays: &[u64], maes: &[f64]) -> Self {
        *self.forecast_delays.lock().unwrap() =
            delays.iter().map(|ms| Duration::from_millis(*ms)).collect();
        *self.forecast_maes.lock().unwrap() = maes.iter().copied().collect();
        self
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn status(&self) -> Result<StatusResponse, ApiError> {
        let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StatusResponse {
            initialized: self.ready_after != u32::MAX && n > self.ready_after,
            error: if n > self.ready_after {
                None
            } else {
                Some("still loading models".to_string())
            },
            models_loaded: 4,
            data_points: 120,
        })
    }

    async fn models(&self) -> Result<ModelsResponse, ApiError> {
        Ok(ModelsResponse {
            models: vec![
                "LightGBM".to_string(),
                "Random_Forest".to_string(),
                "KNN".to_string(),
            ],
            default: Some("LightGBM".to_string()),
            recommendation: Some(Recommendation {
                recommended_model: "LightGBM".to_string(),
                reason: "lowest MAE over the validation window".to_string(),
                score: 92.0,
            }),
            model_insights: Default::default(),
        })
    }

    async fn kpi(&self) -> Result<KpiResponse, ApiError> {
        let n = self.kpi_calls.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.kpi_delay).await;
        if n > self.kpi_fail_after {
            return Err(ApiError::Http {
                endpoint: "/api/kpi".to_string(),
                status: 503,
                status_text: "Service Unavailable".to_string(),
            });
        }
        Ok(KpiResponse {
            next_week_prediction: 1.8,
            model_accuracy: 0.85,
            last_change: 2.1,
            change_from_previous: -1.5,
            last_update: "14 June 2024".to_string(),
            market_status: Some("normal".to_string()),
            quick_insights: vec![],
        })
    }

    async fn forecast(&self, model: &str, _range: TimeRange) -> Result<ForecastResponse, ApiError> {
        let n = self.forecast_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self
            .forecast_delays
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Duration::ZERO);
        let mae = self.forecast_maes.lock().unwrap().pop_front().unwrap_or(0.5);
        sleep(delay).await;
        if n > self.forecast_fail_after {
            return Err(ApiError::Api {
                endpoint: format!("/api/forecast/{}", model),
                message: "forecast generation failed".to_string(),
            });
        }
        Ok(ForecastResponse {
            historical: vec![
                HistoricalPoint {
                    date: "2024-01-01".to_string(),
                    value: 1.0,
                },
                HistoricalPoint {
                    date: "2024-01-08".to_string(),
                    value: 2.0,
                },
            ],
            forecast: vec![ForecastPoint {
                date: "2024-01-15".to_string(),
                prediction: 2.4,
                lower_bound: 1.9,
                upper_bound: 2.9,
            }],
            model_info: ModelInfo {
                name: model.to_string(),
                mae,
                next_week_prediction: 2.4,
            },
            insights: self.insights.clone(),
        })
    }

    async fn comparison(&self) -> Result<ComparisonResponse, ApiError> {
        Ok(ComparisonResponse {
            model_comparisons: Default::default(),
            recommendation: Some(Recommendation {
                recommended_model: "Random_Forest".to_string(),
                reason: "best recent tracking error".to_string(),
                score: 88.0,
            }),
        })
    }

    async fn what_if(&self, req: &WhatIfRequest) -> Result<WhatIfResponse, ApiError> {
        Ok(WhatIfResponse {
            scenario: format!("If IPH this week is {}%", req.current_iph),
            prediction: req.current_iph * 0.8,
            lower_bound: req.current_iph * 0.8 - 0.5,
            upper_bound: req.current_iph * 0.8 + 0.5,
            model_used: req.model.clone(),
            comparison_with_normal: None,
            insights: None,
        })
    }

    async fn download_data(&self) -> Result<DownloadResponse, ApiError> {
        Ok(DownloadResponse {
            csv_data: "Tanggal,Indikator_Harga\n2024-01-01,1.0\n2024-01-08,2.0\n".to_string(),
            filename: "data_iph_export_20240614.csv".to_string(),
            total_records: 2,
        })
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
            models_loaded: 4,
            data_points: 120,
            insight_analyzer: Some("active".to_string()),
        })
    }
}

/// Records everything the session renders.
#[derive(Default)]
pub struct CaptureRender {
    pub phases: Mutex<Vec<Phase>>,
    pub probe_progress: Mutex<Vec<(u32, u32)>>,
    pub notifications: Mutex<Vec<(Severity, String)>>,
    pub forecast_errors: Mutex<Vec<String>>,
    pub bootstrap_failures: Mutex<Vec<String>>,
    pub recommendations: Mutex<Vec<String>>,
    pub kpi_renders: Mutex<Vec<f64>>,
    pub forecast_renders: Mutex<Vec<f64>>,
}

impl Render for CaptureRender {
    fn phase_changed(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn probe_progress(&self, attempt: u32, max_attempts: u32) {
        self.probe_progress.lock().unwrap().push((attempt, max_attempts));
    }

    fn show_models(&self, _models: &[String], _selected: &str, _rec: Option<&Recommendation>) {}

    fn show_kpi(&self, kpi: &KpiView) {
        self.kpi_renders.lock().unwrap().push(kpi.next_prediction);
    }

    fn show_forecast(&self, view: &ForecastView) {
        self.forecast_renders.lock().unwrap().push(view.model.mae);
    }

    fn show_recommendation(&self, recommendation: &Recommendation) {
        self.recommendations
            .lock()
            .unwrap()
            .push(recommendation.recommended_model.clone());
    }

    fn show_what_if(&self, _outcome: &WhatIfResponse) {}

    fn notify(&self, severity: Severity, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }

    fn forecast_error(&self, message: &str) {
        self.forecast_errors.lock().unwrap().push(message.to_string());
    }

    fn bootstrap_failed(&self, message: &str) {
        self.bootstrap_failures.lock().unwrap().push(message.to_string());
    }
}
