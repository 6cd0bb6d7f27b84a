//! In-memory [`DeviceApi`] with canned responses.
//!
//! Used by the unit and integration tests, and handy for rendering pages
//! without a backend. Failures can be injected per endpoint.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{ApiError, DeviceApi};
use crate::model::{DashboardStats, Device, EventPage, Health, PowerEvent, StatSample};

#[derive(Debug, Default)]
pub struct MockApi {
    pub dashboard: DashboardStats,
    pub devices: Vec<Device>,
    /// Newest-first samples per device id.
    pub stats: HashMap<String, Vec<StatSample>>,
    /// Newest-first events per device id.
    pub events: HashMap<String, Vec<PowerEvent>>,
    /// Endpoints that should fail with a transport error.
    pub failing: Vec<&'static str>,
    log: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_stats(mut self, device_id: &str, samples: Vec<StatSample>) -> Self {
        self.stats.insert(device_id.to_string(), samples);
        self
    }

    pub fn with_events(mut self, device_id: &str, events: Vec<PowerEvent>) -> Self {
        self.events.insert(device_id.to_string(), events);
        self
    }

    pub fn with_dashboard(mut self, stats: DashboardStats) -> Self {
        self.dashboard = stats;
        self
    }

    /// Make `endpoint` (`"dashboard"`, `"devices"`, `"device"`, `"stats"`,
    /// `"events"`, `"health"`) fail.
    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.push(endpoint);
        self
    }

    /// Request log, e.g. `stats dev-1 limit=20`.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, endpoint: &'static str, entry: String) -> Result<(), ApiError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
        if self.failing.contains(&endpoint) {
            return Err(ApiError::Transport {
                url: format!("mock://{endpoint}"),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn known(&self, device_id: &str) -> Result<&Device, ApiError> {
        self.devices
            .iter()
            .find(|d| d.device_id == device_id)
            .ok_or_else(|| ApiError::NotFound(format!("mock://devices/{device_id}")))
    }
}

impl DeviceApi for MockApi {
    fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.record("dashboard", "dashboard".to_string())?;
        Ok(self.dashboard.clone())
    }

    fn devices(&self) -> Result<Vec<Device>, ApiError> {
        self.record("devices", "devices".to_string())?;
        Ok(self.devices.clone())
    }

    fn device(&self, device_id: &str) -> Result<Device, ApiError> {
        self.record("device", format!("device {device_id}"))?;
        self.known(device_id).cloned()
    }

    fn stats(&self, device_id: &str, limit: u32) -> Result<Vec<StatSample>, ApiError> {
        self.record("stats", format!("stats {device_id} limit={limit}"))?;
        self.known(device_id)?;
        Ok(self
            .stats
            .get(device_id)
            .map(|s| s.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    fn power_events(&self, device_id: &str, limit: u32) -> Result<EventPage, ApiError> {
        self.record("events", format!("events {device_id} limit={limit}"))?;
        self.known(device_id)?;
        let events: Vec<PowerEvent> = self
            .events
            .get(device_id)
            .map(|e| e.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default();
        Ok(EventPage {
            total: events.len() as u64,
            events,
        })
    }

    fn health(&self) -> Result<Health, ApiError> {
        self.record("health", "health".to_string())?;
        Ok(Health {
            status: "healthy".to_string(),
            timestamp: None,
        })
    }
}
