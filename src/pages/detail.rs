//! Single-device page (`/devices/{id}`).

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use super::PageState;
use crate::api::{ApiError, DeviceApi};
use crate::config::schema::ChartsConfig;
use crate::format::{self, NO_DATA};
use crate::model::{Device, PowerEvent, StatSample};
use crate::view::chart::ChartSet;
use crate::view::{self, Node, StatusWording};

/// Error text for an id the backend does not know.
pub const DEVICE_NOT_FOUND: &str = "Device not found";

/// Everything shown once the device has loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDetail {
    pub device: Device,
    /// Newest sample, if the device has reported any.
    pub latest: Option<StatSample>,
    pub events: Vec<PowerEvent>,
    pub history: Vec<StatSample>,
}

#[derive(Debug, Clone)]
pub struct DeviceDetailPage {
    pub device_id: String,
    pub state: PageState<DeviceDetail>,
    pub charts: ChartSet,
    /// The last refresh failed because the backend does not know the id.
    pub not_found: bool,
    limits: ChartsConfig,
}

impl DeviceDetailPage {
    pub fn new(device_id: impl Into<String>, limits: ChartsConfig) -> Self {
        Self {
            device_id: device_id.into(),
            state: PageState::Loading,
            charts: ChartSet::with_disk(),
            not_found: false,
            limits,
        }
    }

    /// Reload the device. Any failure, including an unknown id, switches the
    /// page to its error view; chart failures are only logged.
    pub fn refresh(&mut self, api: &dyn DeviceApi) {
        let result = self.load(api);
        self.not_found = matches!(
            &result,
            Err(e) if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_not_found)
        );
        self.state = if self.not_found {
            debug!(device_id = %self.device_id, "unknown device");
            PageState::Error(DEVICE_NOT_FOUND.to_string())
        } else {
            PageState::from_anyhow(result, "device detail")
        };
        if self.state.loaded().is_some()
            && let Err(e) = self
                .charts
                .refresh(api, &self.device_id, self.limits.detail_points)
        {
            warn!(device_id = %self.device_id, error = %e, "chart update failed");
        }
    }

    fn load(&self, api: &dyn DeviceApi) -> Result<DeviceDetail> {
        let id = self.device_id.as_str();
        let device = api.device(id)?;
        let latest = api.stats(id, 1)?.into_iter().next();
        let events = api.power_events(id, self.limits.event_rows)?.events;
        let history = api.stats(id, self.limits.history_rows)?;
        Ok(DeviceDetail {
            device,
            latest,
            events,
            history,
        })
    }

    /// Browser tab title.
    pub fn title(&self) -> String {
        match self.state.loaded() {
            Some(d) => format!("{} - Device Monitor", d.device.hostname),
            None => "Device Details - Device Monitor".to_string(),
        }
    }

    pub fn render(&self) -> Node {
        let content = match &self.state {
            PageState::Loading => super::loading_placeholder("Loading device details..."),
            PageState::Error(msg) => error_state(msg),
            PageState::Loaded(detail) => Node::el("div")
                .id("device-content")
                .child(header(&detail.device))
                .child(
                    Node::el("div")
                        .class("detail-grid")
                        .child(info_card(&detail.device))
                        .child(current_stats(detail.latest.as_ref())),
                )
                .child(self.charts.render("device-"))
                .child(events_table(&detail.events))
                .child(history_table(&detail.history)),
        };
        Node::el("div").id("device-page").child(content)
    }
}

fn error_state(message: &str) -> Node {
    Node::el("div")
        .class("error-state")
        .id("error-state")
        .child(Node::el("h2").push_text(format!("❌ {message}")))
        .child(
            Node::el("p")
                .push_text("The device could not be loaded. It may not exist or the server may be unreachable."),
        )
        .child(
            Node::el("a")
                .class("btn btn-primary")
                .attr("href", "/devices")
                .push_text("Back to Devices"),
        )
}

fn header(device: &Device) -> Node {
    Node::el("div")
        .class("page-header")
        .child(
            Node::el("h1")
                .id("device-hostname")
                .push_text(device.hostname.clone()),
        )
        .child(view::status_badge(device.is_active, StatusWording::OnlineOffline).id("device-status-badge"))
}

fn info_card(device: &Device) -> Node {
    let status = if device.is_active { "Active" } else { "Inactive" };
    Node::el("div")
        .class("card info-card")
        .child(Node::el("h3").push_text("ℹ️ Device Information"))
        .child(view::labelled("Device ID", device.device_id.clone()))
        .child(view::labelled("Hostname", device.hostname.clone()))
        .child(view::labelled("Platform", device.platform_or_unknown()))
        .child(view::labelled("Platform Version", device.platform_version_or_unknown()))
        .child(view::labelled(
            "Last Seen",
            format::format_datetime(device.last_seen.as_deref()),
        ))
        .child(view::labelled(
            "Registered",
            format::format_datetime(device.created_at.as_deref()),
        ))
        .child(view::labelled("Status", status))
}

fn current_stats(latest: Option<&StatSample>) -> Node {
    let (cpu, mem, disk, uptime, ts) = match latest {
        Some(s) => (
            format::format_percent(s.cpu_percent),
            format::format_percent(s.memory_percent),
            format::format_percent(s.disk_percent),
            format::format_uptime(s.uptime.unwrap_or(0.0)),
            format::format_datetime(s.timestamp.as_deref()),
        ),
        None => (
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
        ),
    };
    Node::el("div")
        .class("card current-stats")
        .child(Node::el("h3").push_text("📊 Current Stats"))
        .child(
            Node::el("div")
                .class("stats-grid")
                .child(view::stat_card("current-cpu", "CPU", cpu))
                .child(view::stat_card("current-memory", "Memory", mem))
                .child(view::stat_card("current-disk", "Disk", disk))
                .child(view::stat_card("uptime", "Uptime", uptime)),
        )
        .child(
            Node::el("p")
                .class("text-muted")
                .push_text("Updated: ")
                .child(Node::el("span").id("stats-timestamp").push_text(ts)),
        )
}

fn events_table(events: &[PowerEvent]) -> Node {
    let headers = ["Event", "Time", "Details"];
    let rows = if events.is_empty() {
        vec![view::empty_row(headers.len(), "No events recorded")]
    } else {
        events
            .iter()
            .map(|e| {
                view::row(vec![
                    view::event_badge(&e.event_type),
                    Node::text(format::format_datetime(e.timestamp.as_deref())),
                    Node::text(e.details.as_deref().filter(|d| !d.is_empty()).unwrap_or("-")),
                ])
            })
            .collect()
    };
    Node::el("section")
        .class("card")
        .child(Node::el("h3").push_text("⚡ Power Events"))
        .child(view::table("data-table", &headers, rows).id("events-table"))
}

fn history_table(history: &[StatSample]) -> Node {
    let headers = ["Time", "CPU", "Memory", "Disk", "Uptime"];
    let rows = if history.is_empty() {
        vec![view::empty_row(headers.len(), "No statistics recorded")]
    } else {
        history
            .iter()
            .map(|s| {
                view::row(vec![
                    Node::text(format::format_datetime(s.timestamp.as_deref())),
                    Node::text(format::format_percent(s.cpu_percent)),
                    Node::text(format::format_percent(s.memory_percent)),
                    Node::text(format::format_percent(s.disk_percent)),
                    Node::text(format::format_uptime(s.uptime.unwrap_or(0.0))),
                ])
            })
            .collect()
    };
    Node::el("section")
        .class("card")
        .child(Node::el("h3").push_text("📈 Stats History"))
        .child(view::table("data-table", &headers, rows).id("stats-table"))
}
