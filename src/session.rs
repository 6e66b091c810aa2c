//! The dashboard session: explicitly constructed, explicitly torn down.
//!
//! Owns the config, the backend seam, the render collaborator, and the
//! in-memory state. Runs the bootstrap sequence once per call, the light
//! forecast-refresh path on every model or range change, and hands the
//! periodic KPI refresh to a background task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::time::timeout;

use crate::api::{
    Backend, ComparisonResponse, DownloadResponse, HealthResponse, WhatIfRequest, WhatIfResponse,
};
use crate::bootstrap::{probe_until_initialized, Phase};
use crate::error::ApiError;
use crate::insights::{forecast_view, kpi_view, ForecastView, KpiView};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::refresh::{spawn_kpi_refresh, RefreshHandle};
use crate::render::{Render, Severity};
use crate::retry::RetryPolicy;
use crate::state::{Config, SessionState, TimeRange};

/// What happened to a forecast fetch once it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot applied and rendered.
    Applied,
    /// A newer fetch was issued while this one was in flight; discarded.
    Stale,
    /// The fetch failed; the forecast section shows the error state.
    Failed,
}

pub struct DashboardSession {
    cfg: Config,
    backend: Arc<dyn Backend>,
    render: Arc<dyn Render>,
    state: Arc<Mutex<SessionState>>,
    refresh: Mutex<Option<RefreshHandle>>,
    /// Monotonic fetch counter: a completed forecast applies only if its
    /// sequence number is still the latest issued. Last-issued wins.
    forecast_seq: AtomicU64,
}

impl DashboardSession {
    pub fn new(cfg: Config, backend: Arc<dyn Backend>, render: Arc<dyn Render>) -> Self {
        Self {
            cfg,
            backend,
            render,
            state: Arc::new(Mutex::new(SessionState::new())),
            refresh: Mutex::new(None),
            forecast_seq: AtomicU64::new(0),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn set_phase(&self, phase: Phase) {
        self.with_state(|s| s.phase = phase);
        log(
            Level::Info,
            Domain::Bootstrap,
            "phase",
            obj(&[("phase", v_str(phase.as_str()))]),
        );
        self.render.phase_changed(phase);
    }

    pub fn phase(&self) -> Phase {
        self.with_state(|s| s.phase)
    }

    pub fn selected_model(&self) -> String {
        self.with_state(|s| s.selected_model.clone())
    }

    pub fn kpi(&self) -> Option<KpiView> {
        self.with_state(|s| s.kpi.clone())
    }

    pub fn forecast(&self) -> Option<ForecastView> {
        self.with_state(|s| s.forecast.clone())
    }

    pub fn in_flight(&self) -> u32 {
        self.with_state(|s| s.in_flight)
    }

    /// Run the full startup sequence under the global wall-clock deadline.
    ///
    /// If the deadline fires first, the in-flight step's future is dropped
    /// and its result can never resurrect the session; the phase is
    /// `Failed` for good until `bootstrap` is called again.
    pub async fn bootstrap(&self) -> Result<()> {
        // Re-running bootstrap (the retry affordance) starts clean.
        self.teardown();
        self.set_phase(Phase::ProbingConnectivity);

        match timeout(self.cfg.bootstrap_deadline, self.run_steps()).await {
            Ok(Ok(())) => {
                self.set_phase(Phase::Ready);
                log(
                    Level::Info,
                    Domain::Bootstrap,
                    "ready",
                    obj(&[("model", v_str(&self.selected_model()))]),
                );
                Ok(())
            }
            Ok(Err(e)) => self.fail_bootstrap(format!("{:#}", e)),
            Err(_) => self.fail_bootstrap(format!(
                "bootstrap did not reach ready within {} ms",
                self.cfg.bootstrap_deadline.as_millis()
            )),
        }
    }

    fn fail_bootstrap(&self, message: String) -> Result<()> {
        // The deadline can fire after the refresh task was scheduled.
        self.teardown();
        self.set_phase(Phase::Failed);
        self.render.bootstrap_failed(&message);
        Err(anyhow!(message))
    }

    async fn run_steps(&self) -> Result<()> {
        // Step 1: connectivity probe, the only individually retried step.
        let policy = RetryPolicy {
            max_attempts: self.cfg.probe_max_attempts,
            delay: self.cfg.probe_delay,
            attempt_timeout: self.cfg.probe_timeout,
        };
        let status =
            probe_until_initialized(self.backend.as_ref(), &policy, self.render.as_ref()).await?;
        log(
            Level::Info,
            Domain::Bootstrap,
            "backend_initialized",
            obj(&[
                ("models_loaded", v_num(status.models_loaded as f64)),
                ("data_points", v_num(status.data_points as f64)),
            ]),
        );

        // Step 2: model list, which also picks the active model.
        self.set_phase(Phase::LoadingModels);
        let models = self.backend.models().await?;
        let selected = models
            .default
            .clone()
            .or_else(|| models.models.first().cloned())
            .ok_or_else(|| anyhow!("backend returned an empty model list"))?;
        self.with_state(|s| {
            s.models = models.models.clone();
            s.selected_model = selected.clone();
            s.recommendation = models.recommendation.clone();
            s.model_insights = models.model_insights.clone();
        });
        self.render
            .show_models(&models.models, &selected, models.recommendation.as_ref());

        // Step 3: KPI snapshot.
        self.set_phase(Phase::LoadingKpi);
        self.fetch_kpi().await?;

        // Step 4: forecast snapshot for the active model.
        self.set_phase(Phase::LoadingForecast);
        self.fetch_forecast().await?;

        // Step 5: interaction wiring lives in the render collaborator; the
        // phase exists so progress reporting covers it.
        self.set_phase(Phase::AttachingListeners);

        // Step 6: periodic KPI refresh for the rest of the session.
        self.set_phase(Phase::SchedulingRefresh);
        let handle = spawn_kpi_refresh(
            self.cfg.refresh_interval,
            self.backend.clone(),
            self.state.clone(),
            self.render.clone(),
        );
        self.with_refresh(|slot| *slot = Some(handle));

        Ok(())
    }

    fn with_refresh<T>(&self, f: impl FnOnce(&mut Option<RefreshHandle>) -> T) -> T {
        let mut guard = match self.refresh.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    async fn fetch_kpi(&self) -> Result<(), ApiError> {
        let resp = self.backend.kpi().await?;
        let view = kpi_view(&resp);
        self.with_state(|s| s.kpi = Some(view.clone()));
        self.render.show_kpi(&view);
        Ok(())
    }

    /// The guarded forecast fetch. Issues a sequence number before the
    /// request goes out; a response that is no longer the latest issued is
    /// discarded instead of overwriting newer data.
    async fn fetch_forecast(&self) -> Result<FetchOutcome, ApiError> {
        let (model, range) = self.with_state(|s| (s.selected_model.clone(), s.range));
        let seq = self.forecast_seq.fetch_add(1, Ordering::SeqCst) + 1;

        // Guard, not a manual decrement: the bootstrap deadline can drop
        // this future mid-await.
        self.with_state(|s| s.in_flight += 1);
        let _in_flight = InFlightGuard(self);
        let resp = self.backend.forecast(&model, range).await?;

        if seq != self.forecast_seq.load(Ordering::SeqCst) {
            log(
                Level::Info,
                Domain::Session,
                "stale_forecast_discarded",
                obj(&[
                    ("seq", v_num(seq as f64)),
                    (
                        "latest",
                        v_num(self.forecast_seq.load(Ordering::SeqCst) as f64),
                    ),
                    ("model", v_str(&model)),
                ]),
            );
            return Ok(FetchOutcome::Stale);
        }

        let view = forecast_view(&resp, &model);
        self.with_state(|s| s.forecast = Some(view.clone()));
        self.render.show_forecast(&view);
        Ok(FetchOutcome::Applied)
    }

    /// Light refresh path: re-fetch and re-render the forecast without
    /// touching the bootstrap sequence. Failures replace the forecast
    /// section, never the whole page.
    pub async fn refresh_forecast(&self) -> FetchOutcome {
        match self.fetch_forecast().await {
            Ok(outcome) => outcome,
            Err(e) => {
                log(
                    Level::Error,
                    Domain::Session,
                    "forecast_fetch_failed",
                    obj(&[("error", v_str(&e.to_string()))]),
                );
                self.render.forecast_error(&e.user_message());
                FetchOutcome::Failed
            }
        }
    }

    pub async fn select_model(&self, model: &str) -> FetchOutcome {
        let known = self.with_state(|s| s.models.iter().any(|m| m == model));
        if !known {
            self.render
                .notify(Severity::Warning, &format!("unknown model: {}", model));
            return FetchOutcome::Failed;
        }
        self.with_state(|s| s.selected_model = model.to_string());
        log(
            Level::Info,
            Domain::Session,
            "model_selected",
            obj(&[("model", v_str(model))]),
        );
        self.refresh_forecast().await
    }

    pub async fn select_range(&self, range: TimeRange) -> FetchOutcome {
        self.with_state(|s| s.range = range);
        log(
            Level::Info,
            Domain::Session,
            "range_selected",
            obj(&[("range", v_str(&range.label()))]),
        );
        self.refresh_forecast().await
    }

    /// What-if scenario against the active model. Errors surface as a
    /// transient notification, not a section replacement.
    pub async fn what_if(&self, current_iph: f64) -> Result<WhatIfResponse, ApiError> {
        let req = WhatIfRequest {
            current_iph,
            model: self.selected_model(),
        };
        match self.backend.what_if(&req).await {
            Ok(outcome) => {
                self.render.show_what_if(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.render.notify(Severity::Error, &e.user_message());
                Err(e)
            }
        }
    }

    /// Fetch the cross-model comparison and refresh the stored
    /// recommendation.
    pub async fn load_comparison(&self) -> Result<ComparisonResponse, ApiError> {
        let resp = self.backend.comparison().await?;
        if let Some(rec) = &resp.recommendation {
            self.with_state(|s| s.recommendation = Some(rec.clone()));
            self.render.show_recommendation(rec);
        }
        Ok(resp)
    }

    /// Fetch the CSV export payload. Writing it out is the caller's job.
    pub async fn export_csv(&self) -> Result<DownloadResponse, ApiError> {
        match self.backend.download_data().await {
            Ok(payload) => {
                self.render.notify(
                    Severity::Info,
                    &format!("export ready: {} ({} records)", payload.filename, payload.total_records),
                );
                Ok(payload)
            }
            Err(e) => {
                self.render.notify(Severity::Error, &e.user_message());
                Err(e)
            }
        }
    }

    /// Diagnostic health check, offered next to the retry affordance after
    /// a bootstrap failure.
    pub async fn connectivity_test(&self) -> Result<HealthResponse, ApiError> {
        match self.backend.health().await {
            Ok(health) => {
                self.render.notify(
                    Severity::Info,
                    &format!(
                        "backend {}: {} models, {} data points",
                        health.status, health.models_loaded, health.data_points
                    ),
                );
                Ok(health)
            }
            Err(e) => {
                self.render
                    .notify(Severity::Error, &format!("connectivity test failed: {}", e));
                Err(e)
            }
        }
    }

    /// Stop the periodic refresh. Safe to call repeatedly; `bootstrap`
    /// calls it before starting over.
    pub fn teardown(&self) {
        if let Some(handle) = self.with_refresh(|slot| slot.take()) {
            handle.stop();
            log(
                Level::Info,
                Domain::System,
                "refresh_stopped",
                obj(&[]),
            );
        }
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct InFlightGuard<'a>(&'a DashboardSession);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0
            .with_state(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }
}
