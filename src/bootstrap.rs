//! Bootstrap phases and the retry-wrapped connectivity probe.

use crate::api::{Backend, StatusResponse};
use crate::error::ApiError;
use crate::render::Render;
use crate::retry::{retry_fixed, RetryExhausted, RetryPolicy};

/// Startup sequence states. Strictly sequential; `Failed` is reachable
/// from any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ProbingConnectivity,
    LoadingModels,
    LoadingKpi,
    LoadingForecast,
    AttachingListeners,
    SchedulingRefresh,
    Ready,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::ProbingConnectivity => "probing_connectivity",
            Phase::LoadingModels => "loading_models",
            Phase::LoadingKpi => "loading_kpi",
            Phase::LoadingForecast => "loading_forecast",
            Phase::AttachingListeners => "attaching_listeners",
            Phase::SchedulingRefresh => "scheduling_refresh",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }
}

/// Probe `/api/status` until the backend reports itself initialized.
///
/// A well-formed response with `initialized: false` counts as a failed
/// attempt, not a success; the backend may still be loading models.
/// Progress is reported to the render collaborator per attempt.
pub async fn probe_until_initialized(
    backend: &dyn Backend,
    policy: &RetryPolicy,
    render: &dyn Render,
) -> Result<StatusResponse, RetryExhausted> {
    retry_fixed(
        policy,
        "/api/status",
        |attempt, max| render.probe_progress(attempt, max),
        || async move {
            let status = backend.status().await?;
            if !status.initialized {
                return Err(ApiError::NotInitialized {
                    detail: status.error.clone(),
                });
            }
            Ok(status)
        },
    )
    .await
}
