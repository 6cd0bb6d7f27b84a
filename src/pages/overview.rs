//! Summary dashboard (`/`).

use tracing::warn;

use super::PageState;
use crate::api::DeviceApi;
use crate::format;
use crate::model::{DashboardStats, Device};
use crate::view::chart::ChartSet;
use crate::view::{self, Node, StatusWording};

/// Stat cards, device table and the first device's CPU/memory charts.
///
/// The three regions load independently: a failed stats call leaves the
/// device table intact and vice versa.
#[derive(Debug, Clone)]
pub struct OverviewPage {
    pub stats: PageState<DashboardStats>,
    pub devices: PageState<Vec<Device>>,
    pub charts: ChartSet,
    chart_points: u32,
}

impl OverviewPage {
    pub fn new(chart_points: u32) -> Self {
        Self {
            stats: PageState::Loading,
            devices: PageState::Loading,
            charts: ChartSet::cpu_memory(),
            chart_points,
        }
    }

    pub fn refresh(&mut self, api: &dyn DeviceApi) {
        self.stats = PageState::from_api(api.dashboard_stats(), "dashboard stats");
        self.devices = PageState::from_api(api.devices(), "devices");

        if let Some(first) = self.devices.loaded().and_then(|d| d.first())
            && let Err(e) = self.charts.refresh(api, &first.device_id, self.chart_points)
        {
            warn!(device_id = %first.device_id, error = %e, "chart update failed");
        }
    }

    pub fn render(&self) -> Node {
        Node::el("div")
            .id("overview-content")
            .child(self.render_stats())
            .child(
                Node::el("section")
                    .class("card")
                    .child(Node::el("h2").push_text("📱 Devices"))
                    .child(self.render_devices()),
            )
            .child(self.charts.render(""))
    }

    fn render_stats(&self) -> Node {
        self.stats.render_with("Loading statistics...", |s| {
            Node::el("div")
                .class("stats-grid")
                .child(view::stat_card("total-devices", "Total Devices", s.total_devices.to_string()))
                .child(view::stat_card("active-devices", "Active Devices", s.active_devices.to_string()))
                .child(view::stat_card("total-events", "Total Events", s.total_events.to_string()))
                .child(view::stat_card("avg-cpu", "Avg CPU", format!("{}%", s.avg_cpu)))
        })
    }

    fn render_devices(&self) -> Node {
        let headers = ["Device ID", "Hostname", "Platform", "Status", "Last Seen"];
        self.devices.render_with("Loading devices...", |devices| {
            let rows = if devices.is_empty() {
                vec![view::empty_row(headers.len(), "No devices found")]
            } else {
                devices.iter().map(device_row).collect()
            };
            view::table("data-table", &headers, rows).id("devices-table")
        })
    }
}

fn device_row(device: &Device) -> Node {
    view::row(vec![
        Node::el("strong").push_text(device.device_id.clone()),
        Node::text(device.hostname.clone()),
        view::platform_badge(device),
        view::status_badge(device.is_active, StatusWording::ActiveInactive),
        Node::text(format::format_datetime(device.last_seen.as_deref())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::model::StatSample;

    fn device(id: &str, host: &str, active: bool) -> Device {
        Device {
            device_id: id.into(),
            hostname: host.into(),
            is_active: active,
            ..Default::default()
        }
    }

    fn cpu(v: f64) -> StatSample {
        StatSample {
            cpu_percent: v,
            ..Default::default()
        }
    }

    #[test]
    fn renders_stat_cards_and_table() {
        let api = MockApi::new()
            .with_dashboard(DashboardStats {
                total_devices: 2,
                active_devices: 1,
                total_events: 9,
                avg_cpu: 12.5,
                ..Default::default()
            })
            .with_device(device("d1", "alpha", true))
            .with_device(device("d2", "beta", false));
        let mut page = OverviewPage::new(20);
        page.refresh(&api);
        let tree = page.render();

        assert_eq!(tree.find_by_id("total-devices").unwrap().text_content(), "2");
        assert_eq!(tree.find_by_id("avg-cpu").unwrap().text_content(), "12.5%");
        let html = tree.render();
        assert!(html.contains("● Active"));
        assert!(html.contains("○ Inactive"));
        assert!(html.contains("Unknown"));
    }

    #[test]
    fn charts_follow_first_device_chronologically() {
        let api = MockApi::new()
            .with_device(device("d1", "alpha", true))
            .with_stats("d1", vec![cpu(10.0), cpu(20.0), cpu(30.0)]);
        let mut page = OverviewPage::new(20);
        page.refresh(&api);
        assert_eq!(page.charts.cpu.data, vec![30.0, 20.0, 10.0]);
        assert!(api.requests().contains(&"stats d1 limit=20".to_string()));
    }

    #[test]
    fn stats_failure_does_not_hide_devices() {
        let api = MockApi::new()
            .with_device(device("d1", "alpha", true))
            .failing("dashboard");
        let mut page = OverviewPage::new(20);
        page.refresh(&api);
        let html = page.render().render();
        assert!(html.contains("error-card"));
        assert!(html.contains("alpha"));
    }

    #[test]
    fn empty_fleet_shows_placeholder_row() {
        let mut page = OverviewPage::new(20);
        page.refresh(&MockApi::new());
        let html = page.render().render();
        assert!(html.contains("No devices found"));
        assert!(html.contains("colspan=\"5\""));
    }

    #[test]
    fn hostile_hostname_is_escaped() {
        let api = MockApi::new().with_device(device("x", "<script>alert(1)</script>", true));
        let mut page = OverviewPage::new(20);
        page.refresh(&api);
        let html = page.render().render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }
}
