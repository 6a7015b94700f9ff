//! Alert Transport
//!
//! HTTP client for the response backend. Performs exactly one bounded
//! attempt per `send` call and classifies the result; retry policy lives
//! in the dispatch coordinator, not here.

use std::future::Future;

use crate::errors::{EngineError, EngineResult};
use crate::logic::config::TransportConfig;
use crate::logic::ledger::{ActionKind, AlertRequest};

/// Outcome of one transport attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 2xx from the backend. Terminal success.
    Success,
    /// Connection refused, timeout, or 5xx. Eligible for another attempt.
    RetryableFailure(String),
    /// 4xx (malformed payload, auth rejection). Never retried.
    PermanentFailure(String),
}

/// One network attempt for one alert request.
///
/// Implementations must be safe to call concurrently; the coordinator
/// shares one transport across all dispatch flows.
pub trait AlertTransport: Send + Sync + 'static {
    fn send(&self, request: &AlertRequest) -> impl Future<Output = SendOutcome> + Send;
}

/// Production transport backed by `reqwest`.
pub struct HttpAlertTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAlertTransport {
    pub fn new(config: &TransportConfig) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint_for(&self, action: ActionKind) -> String {
        match action {
            ActionKind::JamDeactivate => format!("{}/api/jammer/deactivate", self.base_url),
            _ => format!("{}/api/trigger", self.base_url),
        }
    }

    /// Backend-reported system status (`GET /api/status`). Used as a
    /// startup health probe; not part of the dispatch path.
    pub async fn status(&self) -> EngineResult<serde_json::Value> {
        let url = format!("{}/api/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Transport(format!(
                "status probe returned HTTP {}",
                response.status().as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| EngineError::Transport(format!("status parse: {}", e)))
    }
}

impl AlertTransport for HttpAlertTransport {
    async fn send(&self, request: &AlertRequest) -> SendOutcome {
        let url = self.endpoint_for(request.action);

        let response = match self.http.post(&url).json(&request.payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                // Connection refused, DNS failure, timeout: all transient.
                return SendOutcome::RetryableFailure(format!("network error: {}", e));
            }
        };

        let status = response.status();
        if status.is_success() {
            log::debug!(
                "Backend accepted {} for detection {} (HTTP {})",
                request.action,
                request.detection_id,
                status.as_u16()
            );
            SendOutcome::Success
        } else if status.is_server_error() {
            SendOutcome::RetryableFailure(format!("HTTP {}", status.as_u16()))
        } else {
            // 4xx and anything else the backend should not return: the
            // payload will not get better on a retry.
            let body = response.text().await.unwrap_or_default();
            SendOutcome::PermanentFailure(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ))
        }
    }
}
