//! Client side of the device-monitoring REST API.
//!
//! [`DeviceApi`] is the seam every page, report and CLI command talks to.
//! [`HttpClient`] is the real implementation; [`mock::MockApi`] serves
//! canned data for tests and offline rendering.

mod client;
mod error;
pub mod mock;

pub use client::HttpClient;
pub use error::ApiError;

use crate::model::{DashboardStats, Device, EventPage, Health, StatSample};

/// Read-only operations against the monitoring backend.
///
/// Collections come back newest-first, exactly as the backend orders them.
pub trait DeviceApi: Send + Sync {
    /// `GET /dashboard/api/stats`
    fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;

    /// `GET /api/v1/devices`
    fn devices(&self) -> Result<Vec<Device>, ApiError>;

    /// `GET /api/v1/devices/{id}`; unknown ids yield [`ApiError::NotFound`].
    fn device(&self, device_id: &str) -> Result<Device, ApiError>;

    /// `GET /api/v1/devices/{id}/stats?limit=N`
    fn stats(&self, device_id: &str, limit: u32) -> Result<Vec<StatSample>, ApiError>;

    /// `GET /api/v1/devices/{id}/power_events?limit=N`
    fn power_events(&self, device_id: &str, limit: u32) -> Result<EventPage, ApiError>;

    /// `GET /api/v1/health`
    fn health(&self) -> Result<Health, ApiError>;
}
