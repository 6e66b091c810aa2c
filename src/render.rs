//! The render collaborator seam.
//!
//! The session never touches a widget: it hands immutable view snapshots
//! to whatever implements `Render`. The binary wires in `LogRender`;
//! tests use `NullRender`.

use crate::api::{Recommendation, WhatIfResponse};
use crate::bootstrap::Phase;
use crate::insights::{ForecastView, InsightOrigin, KpiView};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

pub trait Render: Send + Sync {
    fn phase_changed(&self, phase: Phase);
    fn probe_progress(&self, attempt: u32, max_attempts: u32);
    fn show_models(&self, models: &[String], selected: &str, recommendation: Option<&Recommendation>);
    fn show_kpi(&self, kpi: &KpiView);
    fn show_forecast(&self, view: &ForecastView);
    fn show_recommendation(&self, recommendation: &Recommendation);
    fn show_what_if(&self, outcome: &WhatIfResponse);
    /// Transient, auto-dismissing notification.
    fn notify(&self, severity: Severity, message: &str);
    /// Replace the forecast section with an error state and retry affordance.
    fn forecast_error(&self, message: &str);
    /// Full-page retry screen; the bootstrap sequence is dead.
    fn bootstrap_failed(&self, message: &str);
}

/// Renders by emitting structured log records. Stands in for a chart/DOM
/// layer when the session runs headless.
pub struct LogRender;

impl Render for LogRender {
    fn phase_changed(&self, phase: Phase) {
        log(
            Level::Info,
            Domain::Session,
            "phase",
            obj(&[("phase", v_str(phase.as_str()))]),
        );
    }

    fn probe_progress(&self, attempt: u32, max_attempts: u32) {
        log(
            Level::Info,
            Domain::Bootstrap,
            "probe_progress",
            obj(&[
                ("attempt", v_num(attempt as f64)),
                ("max_attempts", v_num(max_attempts as f64)),
            ]),
        );
    }

    fn show_models(&self, models: &[String], selected: &str, recommendation: Option<&Recommendation>) {
        log(
            Level::Info,
            Domain::Session,
            "models",
            obj(&[
                ("count", v_num(models.len() as f64)),
                ("selected", v_str(selected)),
                (
                    "recommended",
                    recommendation
                        .map(|r| v_str(&r.recommended_model))
                        .unwrap_or(serde_json::Value::Null),
                ),
            ]),
        );
    }

    fn show_kpi(&self, kpi: &KpiView) {
        log(
            Level::Info,
            Domain::Session,
            "kpi",
            obj(&[
                ("next_prediction", v_num(kpi.next_prediction)),
                ("status", v_str(kpi.status.label)),
                ("change", v_str(&kpi.change.formatted)),
                ("last_update", v_str(&kpi.last_update)),
            ]),
        );
    }

    fn show_forecast(&self, view: &ForecastView) {
        let origin = match view.insights.origin {
            InsightOrigin::Reported => "reported",
            InsightOrigin::Synthesized => "synthesized",
        };
        log(
            Level::Info,
            Domain::Session,
            "forecast",
            obj(&[
                ("model", v_str(&view.model.name)),
                ("mae", v_num(view.model.mae)),
                ("points", v_num(view.chart.labels.len() as f64)),
                ("forecast_points", v_num(view.chart.forecast.len() as f64)),
                ("insight_origin", v_str(origin)),
                (
                    "insight_count",
                    v_num((view.insights.model.len() + view.insights.market.len()) as f64),
                ),
            ]),
        );
    }

    fn show_recommendation(&self, recommendation: &Recommendation) {
        log(
            Level::Info,
            Domain::Insight,
            "recommendation",
            obj(&[
                ("model", v_str(&recommendation.recommended_model)),
                ("score", v_num(recommendation.score)),
                ("reason", v_str(&recommendation.reason)),
            ]),
        );
    }

    fn show_what_if(&self, outcome: &WhatIfResponse) {
        log(
            Level::Info,
            Domain::Session,
            "what_if",
            obj(&[
                ("scenario", v_str(&outcome.scenario)),
                ("prediction", v_num(outcome.prediction)),
                ("lower", v_num(outcome.lower_bound)),
                ("upper", v_num(outcome.upper_bound)),
                ("model", v_str(&outcome.model_used)),
            ]),
        );
    }

    fn notify(&self, severity: Severity, message: &str) {
        log(
            Level::Info,
            Domain::Session,
            "notify",
            obj(&[
                ("severity", v_str(severity.as_str())),
                ("message", v_str(message)),
            ]),
        );
    }

    fn forecast_error(&self, message: &str) {
        log(
            Level::Error,
            Domain::Session,
            "forecast_error",
            obj(&[("message", v_str(message))]),
        );
    }

    fn bootstrap_failed(&self, message: &str) {
        log(
            Level::Error,
            Domain::Bootstrap,
            "bootstrap_failed",
            obj(&[("message", v_str(message))]),
        );
    }
}

/// Discards everything. For tests that only care about session state.
pub struct NullRender;

impl Render for NullRender {
    fn phase_changed(&self, _phase: Phase) {}
    fn probe_progress(&self, _attempt: u32, _max_attempts: u32) {}
    fn show_models(&self, _models: &[String], _selected: &str, _rec: Option<&Recommendation>) {}
    fn show_kpi(&self, _kpi: &KpiView) {}
    fn show_forecast(&self, _view: &ForecastView) {}
    fn show_recommendation(&self, _recommendation: &Recommendation) {}
    fn show_what_if(&self, _outcome: &WhatIfResponse) {}
    fn notify(&self, _severity: Severity, _message: &str) {}
    fn forecast_error(&self, _message: &str) {}
    fn bootstrap_failed(&self, _message: &str) {}
}
