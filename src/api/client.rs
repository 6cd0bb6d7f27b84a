/// Blocking HTTP implementation of [`DeviceApi`] on top of `ureq`.
///
/// One [`ureq::Agent`] is shared by every request so connections are
/// pooled across refresh ticks. There are no retries: a failed request is
/// reported once and the caller waits for its next tick.
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, DeviceApi};
use crate::config::schema::GeneralConfig;
use crate::model::{
    DashboardStats, Device, DeviceEnvelope, DevicesEnvelope, EventPage, EventsEnvelope, Health,
    StatSample, StatsEnvelope,
};

const DASHBOARD_API: &str = "/dashboard/api";
const API_V1: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Build a client from the `[general]` config section.
    pub fn from_config(config: &GeneralConfig) -> Self {
        Self::new(
            &config.api_base_url,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn device_url(&self, device_id: &str, suffix: &str) -> String {
        format!(
            "{}{API_V1}/devices/{}{suffix}",
            self.base_url,
            urlencoding::encode(device_id)
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, limit: Option<u32>) -> Result<T, ApiError> {
        let mut req = self.agent.get(url);
        if let Some(limit) = limit {
            req = req.query("limit", &limit.to_string());
        }
        debug!(url, ?limit, "GET");

        let resp = match req.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(404, _)) => {
                debug!(url, "404");
                return Err(ApiError::NotFound(url.to_string()));
            }
            Err(ureq::Error::Status(status, _)) => {
                warn!(url, status, "backend returned an error status");
                return Err(ApiError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            Err(ureq::Error::Transport(t)) => {
                warn!(url, error = %t, "backend unreachable");
                return Err(ApiError::Transport {
                    url: url.to_string(),
                    reason: t.to_string(),
                });
            }
        };

        resp.into_json::<T>().map_err(|e| {
            warn!(url, error = %e, "failed to decode backend JSON");
            ApiError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

impl DeviceApi for HttpClient {
    fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let url = format!("{}{DASHBOARD_API}/stats", self.base_url);
        self.get_json(&url, None)
    }

    fn devices(&self) -> Result<Vec<Device>, ApiError> {
        let url = format!("{}{API_V1}/devices", self.base_url);
        let env: DevicesEnvelope = self.get_json(&url, None)?;
        Ok(env.devices)
    }

    fn device(&self, device_id: &str) -> Result<Device, ApiError> {
        let url = self.device_url(device_id, "");
        let env: DeviceEnvelope = self.get_json(&url, None)?;
        Ok(env.device)
    }

    fn stats(&self, device_id: &str, limit: u32) -> Result<Vec<StatSample>, ApiError> {
        let url = self.device_url(device_id, "/stats");
        let env: StatsEnvelope = self.get_json(&url, Some(limit))?;
        Ok(env.stats)
    }

    fn power_events(&self, device_id: &str, limit: u32) -> Result<EventPage, ApiError> {
        let url = self.device_url(device_id, "/power_events");
        let env: EventsEnvelope = self.get_json(&url, Some(limit))?;
        Ok(env.into())
    }

    fn health(&self) -> Result<Health, ApiError> {
        let url = format!("{}{API_V1}/health", self.base_url);
        self.get_json(&url, None)
    }
}
