//! Turns raw API responses into the canonical shapes the render
//! collaborator consumes: normalized insight bundles, a join-reconciled
//! chart series, and derived KPI indicators.

use crate::api::{
    ForecastPoint, ForecastResponse, HistoricalPoint, InsightEntry, KpiResponse, ModelInfo,
    QuickInsight,
};
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

/// Whether the insight bundle came from the backend or was synthesized
/// because the backend omitted the field entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightOrigin {
    Reported,
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightView {
    pub model: Vec<InsightEntry>,
    pub market: Vec<InsightEntry>,
    pub origin: InsightOrigin,
}

impl InsightView {
    /// The explicit "genuinely nothing to report" state: the backend sent
    /// the field with both lists empty.
    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.market.is_empty()
    }
}

/// Normalize the forecast response's insight field.
///
/// Present (even with empty sub-lists) is used verbatim; emptiness means
/// the backend had nothing to report. Absent means the backend omitted the
/// field, and a one-entry-per-axis fallback is synthesized so the UI is
/// never blank for that reason alone.
pub fn normalize_insights(
    resp: &ForecastResponse,
    active_model: &str,
) -> InsightView {
    match &resp.insights {
        Some(bundle) => InsightView {
            model: bundle.model_insights.clone(),
            market: bundle.market_insights.clone(),
            origin: InsightOrigin::Reported,
        },
        None => {
            log(
                Level::Debug,
                Domain::Insight,
                "insights_synthesized",
                obj(&[
                    ("model", v_str(active_model)),
                    ("historical_points", v_num(resp.historical.len() as f64)),
                ]),
            );
            InsightView {
                model: vec![InsightEntry {
                    kind: "info".to_string(),
                    title: "Active Model".to_string(),
                    message: format!("Model {} is in use for predictions.", active_model),
                    icon: Some("📊".to_string()),
                }],
                market: vec![InsightEntry {
                    kind: "info".to_string(),
                    title: "Data Available".to_string(),
                    message: format!(
                        "Using {} historical data points for analysis.",
                        resp.historical.len()
                    ),
                    icon: Some("📈".to_string()),
                }],
                origin: InsightOrigin::Synthesized,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastChartPoint {
    pub date: String,
    pub prediction: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// The rendered series. `labels` holds one x position per historical and
/// forecast date; the forecast line starts at `forecast_offset` and its
/// first point repeats the last historical value so the drawn line is
/// continuous across the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub labels: Vec<String>,
    pub historical: Vec<f64>,
    pub forecast_offset: usize,
    pub forecast: Vec<ForecastChartPoint>,
}

pub fn reconcile_chart(historical: &[HistoricalPoint], forecast: &[ForecastPoint]) -> ChartView {
    let mut labels: Vec<String> = historical.iter().map(|p| p.date.clone()).collect();
    labels.extend(forecast.iter().map(|p| p.date.clone()));

    let mut series = Vec::with_capacity(forecast.len() + 1);
    let forecast_offset = match historical.last() {
        Some(join) => {
            series.push(ForecastChartPoint {
                date: join.date.clone(),
                prediction: join.value,
                lower_bound: join.value,
                upper_bound: join.value,
            });
            historical.len() - 1
        }
        // Nothing to join onto; the forecast line starts at the origin.
        None => 0,
    };
    series.extend(forecast.iter().map(|p| ForecastChartPoint {
        date: p.date.clone(),
        prediction: p.prediction,
        lower_bound: p.lower_bound,
        upper_bound: p.upper_bound,
    }));

    ChartView {
        labels,
        historical: historical.iter().map(|p| p.value).collect(),
        forecast_offset,
        forecast: series,
    }
}

/// Complete renderable forecast state, replaced atomically per fetch.
#[derive(Debug, Clone)]
pub struct ForecastView {
    pub chart: ChartView,
    pub insights: InsightView,
    pub model: ModelInfo,
}

pub fn forecast_view(resp: &ForecastResponse, active_model: &str) -> ForecastView {
    ForecastView {
        chart: reconcile_chart(&resp.historical, &resp.forecast),
        insights: normalize_insights(resp, active_model),
        model: resp.model_info.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Positive,
    Negative,
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeIndicator {
    pub direction: ChangeDirection,
    /// Absolute magnitude, two decimals, percent sign.
    pub formatted: String,
}

pub fn change_indicator(change_from_previous: f64) -> ChangeIndicator {
    let direction = if change_from_previous > 0.0 {
        ChangeDirection::Positive
    } else if change_from_previous < 0.0 {
        ChangeDirection::Negative
    } else {
        ChangeDirection::Flat
    };
    ChangeIndicator {
        direction,
        formatted: format!("{:.2}%", change_from_previous.abs()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Danger,
    Warning,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusIndicator {
    pub level: StatusLevel,
    pub label: &'static str,
}

/// Resolve the headline status. A predicted swing beyond ±3 forces the
/// danger tier no matter what the backend tags the market as; otherwise
/// the market tag decides.
pub fn status_indicator(next_prediction: f64, market_status: Option<&str>) -> StatusIndicator {
    if next_prediction.abs() > 3.0 {
        return StatusIndicator {
            level: StatusLevel::Danger,
            label: "Siaga",
        };
    }
    match market_status {
        Some("turbulent") | Some("volatile") => StatusIndicator {
            level: StatusLevel::Warning,
            label: "Waspada",
        },
        _ => StatusIndicator {
            level: StatusLevel::Normal,
            label: "Normal",
        },
    }
}

#[derive(Debug, Clone)]
pub struct KpiView {
    pub next_prediction: f64,
    pub accuracy: f64,
    pub last_value: f64,
    pub change: ChangeIndicator,
    pub status: StatusIndicator,
    pub last_update: String,
    pub quick_insights: Vec<QuickInsight>,
}

pub fn kpi_view(resp: &KpiResponse) -> KpiView {
    KpiView {
        next_prediction: resp.next_week_prediction,
        accuracy: resp.model_accuracy,
        last_value: resp.last_change,
        change: change_indicator(resp.change_from_previous),
        status: status_indicator(resp.next_week_prediction, resp.market_status.as_deref()),
        last_update: resp.last_update.clone(),
        quick_insights: resp.quick_insights.clone(),
    }
}
