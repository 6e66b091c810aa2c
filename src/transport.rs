//! HTTP transport with per-request deadlines and uniform error
//! normalization. Everything above this layer sees `ApiError`, never a raw
//! reqwest failure.

use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::logging::{log, obj, v_num, v_str, Domain, Level};

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            body: None,
            timeout,
        }
    }

    pub fn post(path: impl Into<String>, body: Value, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            body: Some(body),
            timeout,
        }
    }
}

pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(api_base: &str) -> anyhow::Result<Self> {
        let base = Url::parse(api_base)?;
        let http = Client::builder().build()?;
        Ok(Self { http, base })
    }

    /// Issue a request and normalize every failure mode into `ApiError`.
    ///
    /// A 2xx body carrying `success: false` is a failure: the backend's
    /// application-level flag beats transport-level success.
    pub async fn request(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let endpoint = req.path.clone();
        let url = self
            .base
            .join(&req.path)
            .map_err(|e| ApiError::Transport {
                endpoint: endpoint.clone(),
                detail: format!("bad endpoint: {}", e),
            })?;

        let started = Instant::now();
        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .timeout(req.timeout);
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    endpoint: endpoint.clone(),
                    waited_ms: req.timeout.as_millis() as u64,
                }
            } else {
                ApiError::Transport {
                    endpoint: endpoint.clone(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                endpoint,
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            });
        }

        let body: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    endpoint: endpoint.clone(),
                    waited_ms: req.timeout.as_millis() as u64,
                }
            } else {
                ApiError::Malformed {
                    endpoint: endpoint.clone(),
                    detail: format!("invalid JSON body: {}", e),
                }
            }
        })?;

        check_application_failure(&endpoint, &body)?;

        log(
            Level::Trace,
            Domain::Transport,
            "request_done",
            obj(&[
                ("endpoint", v_str(&endpoint)),
                ("elapsed_ms", v_num(started.elapsed().as_secs_f64() * 1000.0)),
            ]),
        );

        Ok(body)
    }
}

/// Reject bodies that signal logical failure despite a 2xx status.
pub fn check_application_failure(endpoint: &str, body: &Value) -> Result<(), ApiError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("backend reported failure without detail")
            .to_string();
        return Err(ApiError::Api {
            endpoint: endpoint.to_string(),
            message,
        });
    }
    Ok(())
}
