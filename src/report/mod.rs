//! Fleet reports: usage, uptime, events and performance.
//!
//! A report is built in two steps:
//! 1. fetch each device's recent samples/events ([`generate`], [`quick_stats`]),
//!    sequentially by default or in bounded parallel batches;
//! 2. reduce them with the pure functions in [`aggregate`].
//!
//! Rows always follow the device list order returned by the backend, no
//! matter how the fetches were scheduled.

pub mod aggregate;

use std::str::FromStr;
use std::thread;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info};

use crate::api::DeviceApi;
use crate::config::schema::ReportsConfig;
use crate::format::{self, NO_DATA, NOT_AVAILABLE};
use crate::model::{Device, PowerEvent, StatSample};
use crate::view::{self, Node, StatusWording};

pub use aggregate::{DeviceActivity, EventCounts, QuickStats, SampleSummary};

/// Events fetched per device for the events report and quick stats.
const EVENTS_LIMIT: u32 = 1000;

// ---------------------------------------------------------------------------
// Report selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Usage,
    Uptime,
    Events,
    Performance,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [Self::Usage, Self::Uptime, Self::Events, Self::Performance];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Uptime => "uptime",
            Self::Events => "events",
            Self::Performance => "performance",
        }
    }

    /// Option label in the report form.
    pub fn label(self) -> &'static str {
        match self {
            Self::Usage => "Usage Summary",
            Self::Uptime => "Uptime",
            Self::Events => "Power Events",
            Self::Performance => "Performance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Usage => "📊 Usage Summary Report",
            Self::Uptime => "⏱️ Uptime Report",
            Self::Events => "⚡ Power Events Report",
            Self::Performance => "📈 Performance Report",
        }
    }

    /// Samples requested per device; `None` for the events report.
    pub fn stats_limit(self) -> Option<u32> {
        match self {
            Self::Usage => Some(50),
            Self::Uptime => Some(1),
            Self::Events => None,
            Self::Performance => Some(100),
        }
    }
}

impl FromStr for ReportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "usage" => Ok(Self::Usage),
            "uptime" => Ok(Self::Uptime),
            "events" => Ok(Self::Events),
            "performance" => Ok(Self::Performance),
            other => Err(anyhow!(
                "unknown report type '{other}' (expected usage, uptime, events or performance)"
            )),
        }
    }
}

/// The date range selector on the reports page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    Today,
    #[default]
    Week,
    Month,
    All,
    Custom,
}

impl DateRange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "Last 7 Days",
            Self::Month => "Last 30 Days",
            Self::All => "All Time",
            Self::Custom => "Custom",
        }
    }

    /// Lower bound for a record to fall inside the range; `None` for no bound.
    ///
    /// "Today" starts at midnight IST.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => {
                let local = now.with_timezone(&format::ist());
                let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
                format::ist()
                    .from_local_datetime(&midnight)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::All | Self::Custom => None,
        }
    }
}

impl FromStr for DateRange {
    type Err = std::convert::Infallible;

    /// Unrecognised values map to `Custom`, like the selector's fallback label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "today" => Self::Today,
            "week" => Self::Week,
            "month" => Self::Month,
            "all" => Self::All,
            _ => Self::Custom,
        })
    }
}

fn within(ts: Option<&str>, cutoff: Option<DateTime<Utc>>) -> bool {
    let Some(cutoff) = cutoff else { return true };
    match ts.and_then(format::parse_timestamp) {
        Some(t) => t >= cutoff,
        None => false,
    }
}

fn filter_samples(samples: Vec<StatSample>, cutoff: Option<DateTime<Utc>>) -> Vec<StatSample> {
    samples
        .into_iter()
        .filter(|s| within(s.timestamp.as_deref(), cutoff))
        .collect()
}

fn filter_events(events: Vec<PowerEvent>, cutoff: Option<DateTime<Utc>>) -> Vec<PowerEvent> {
    events
        .into_iter()
        .filter(|e| within(e.timestamp.as_deref(), cutoff))
        .collect()
}

// ---------------------------------------------------------------------------
// Report data
// ---------------------------------------------------------------------------

/// One device with its sample summary (usage, uptime, performance).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub device: Device,
    pub summary: Option<SampleSummary>,
}

/// One device with its event counts.
#[derive(Debug, Clone, PartialEq)]
pub struct EventsRow {
    pub device: Device,
    pub counts: EventCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportRows {
    Usage(Vec<SummaryRow>),
    Uptime(Vec<SummaryRow>),
    Events(Vec<EventsRow>),
    Performance(Vec<SummaryRow>),
}

impl ReportRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Usage(r) | Self::Uptime(r) | Self::Performance(r) => r.len(),
            Self::Events(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub range: DateRange,
    /// Whether `range` actually filtered the data.
    pub range_applied: bool,
    pub generated_at: String,
    pub rows: ReportRows,
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Run `fetch` for every device, at most `concurrency` at a time.
///
/// Results come back in device order. The first error aborts the report.
pub fn per_device<T, F>(devices: &[Device], concurrency: usize, fetch: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Device) -> Result<T> + Sync,
{
    if concurrency <= 1 {
        return devices.iter().map(&fetch).collect();
    }

    let fetch = &fetch;
    let mut out = Vec::with_capacity(devices.len());
    for batch in devices.chunks(concurrency) {
        let results: Vec<Result<T>> = thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|device| scope.spawn(move || fetch(device)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(anyhow!("report worker panicked")))
                })
                .collect()
        });
        for r in results {
            out.push(r?);
        }
    }
    Ok(out)
}

/// Fetch and aggregate a report over every known device.
pub fn generate(
    api: &dyn DeviceApi,
    kind: ReportKind,
    range: DateRange,
    options: &ReportsConfig,
) -> Result<Report> {
    let devices = api.devices()?;
    let cutoff = if options.apply_date_range {
        range.cutoff(Utc::now())
    } else {
        None
    };
    info!(
        kind = kind.as_str(),
        range = range.as_str(),
        devices = devices.len(),
        "generating report"
    );

    let summary_rows = || {
        let limit = kind.stats_limit().unwrap_or(1);
        per_device(&devices, options.concurrency, |device| {
            let samples = filter_samples(api.stats(&device.device_id, limit)?, cutoff);
            Ok(SummaryRow {
                device: device.clone(),
                summary: SampleSummary::from_samples(&samples),
            })
        })
    };

    let rows = match kind {
        ReportKind::Usage => ReportRows::Usage(summary_rows()?),
        ReportKind::Uptime => ReportRows::Uptime(summary_rows()?),
        ReportKind::Performance => ReportRows::Performance(summary_rows()?),
        ReportKind::Events => {
            ReportRows::Events(per_device(&devices, options.concurrency, |device| {
                let page = api.power_events(&device.device_id, EVENTS_LIMIT)?;
                let events = filter_events(page.events, cutoff);
                Ok(EventsRow {
                    device: device.clone(),
                    counts: EventCounts::tally(&events),
                })
            })?)
        }
    };
    debug!(rows = rows.len(), "report ready");

    Ok(Report {
        kind,
        range,
        range_applied: options.apply_date_range,
        generated_at: format::now_ist(),
        rows,
    })
}

/// Fetch the reports page headline numbers.
pub fn quick_stats(api: &dyn DeviceApi, concurrency: usize) -> Result<QuickStats> {
    let devices = api.devices()?;
    let activity = per_device(&devices, concurrency, |device| {
        let samples = api.stats(&device.device_id, 1)?;
        let events = api.power_events(&device.device_id, EVENTS_LIMIT)?;
        Ok(DeviceActivity::new(device, &samples, events.total))
    })?;
    Ok(QuickStats::compute(&activity))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn hostname_cell(device: &Device) -> Node {
    Node::el("strong").push_text(device.hostname.clone())
}

fn pct(value: Option<f64>) -> Node {
    Node::text(format::format_percent_opt(value))
}

impl Report {
    pub fn render(&self) -> Node {
        let mut header = Node::el("div")
            .class("report-header")
            .child(Node::el("h2").push_text(self.kind.title()))
            .child(Node::el("p").push_text(format!("Date Range: {}", self.range.label())));
        if !self.range_applied {
            header = header.child(
                Node::el("p")
                    .class("range-note text-muted")
                    .push_text("The date range is a label only; figures cover the most recent samples."),
            );
        }
        header = header.child(Node::el("p").push_text(format!("Generated: {}", self.generated_at)));

        let body = if self.rows.is_empty() {
            view::empty_card("📭 No devices found. Cannot generate report.")
        } else {
            self.render_table()
        };

        let mut content = Node::el("div")
            .class("report-content")
            .child(header)
            .child(body);
        if self.kind == ReportKind::Events && !self.rows.is_empty() {
            content = content.child(event_legend());
        }
        content
    }

    fn render_table(&self) -> Node {
        match &self.rows {
            ReportRows::Usage(rows) => view::table(
                "report-table",
                &["Device", "Platform", "Status", "Avg CPU", "Avg Memory", "Last Seen"],
                rows.iter()
                    .map(|r| {
                        view::row(vec![
                            hostname_cell(&r.device),
                            Node::text(r.device.platform_or_unknown()),
                            view::status_badge(r.device.is_active, StatusWording::Plain),
                            pct(r.summary.as_ref().map(|s| s.avg_cpu)),
                            pct(r.summary.as_ref().map(|s| s.avg_memory)),
                            Node::text(format::format_datetime(r.device.last_seen.as_deref())),
                        ])
                    })
                    .collect(),
            ),
            ReportRows::Uptime(rows) => view::table(
                "report-table",
                &["Device", "Current Uptime", "Status", "Registered"],
                rows.iter()
                    .map(|r| {
                        let uptime = r
                            .summary
                            .as_ref()
                            .map_or_else(|| NO_DATA.to_string(), |s| format::format_uptime(s.latest_uptime));
                        view::row(vec![
                            hostname_cell(&r.device),
                            Node::text(uptime),
                            view::status_badge(r.device.is_active, StatusWording::OnlineOffline),
                            Node::text(format::format_datetime(r.device.created_at.as_deref())),
                        ])
                    })
                    .collect(),
            ),
            ReportRows::Events(rows) => view::table(
                "report-table",
                &[
                    "Device",
                    "Total Events",
                    "🟢 Startups",
                    "🔴 Shutdowns",
                    "😴 Sleep",
                    "⏰ Wake",
                    "🔋 Battery",
                    "Last Event",
                ],
                rows.iter()
                    .map(|r| {
                        let c = &r.counts;
                        let last = match &c.last {
                            Some(e) => Node::el("span")
                                .push_text(format::format_datetime(e.timestamp.as_deref()))
                                .child(Node::el("br"))
                                .child(view::event_badge(&e.event_type)),
                            None => Node::text(NOT_AVAILABLE),
                        };
                        view::row(vec![
                            hostname_cell(&r.device),
                            Node::text(c.total.to_string()),
                            Node::text(c.startup.to_string()),
                            Node::text(c.shutdown.to_string()),
                            Node::text(c.sleep.to_string()),
                            Node::text(c.wake.to_string()),
                            Node::text(c.battery.to_string()),
                            last,
                        ])
                    })
                    .collect(),
            ),
            ReportRows::Performance(rows) => view::table(
                "report-table",
                &["Device", "Avg CPU", "Max CPU", "Avg Memory", "Max Memory", "Disk Usage"],
                rows.iter()
                    .map(|r| {
                        let s = r.summary.as_ref();
                        view::row(vec![
                            hostname_cell(&r.device),
                            pct(s.map(|s| s.avg_cpu)),
                            pct(s.map(|s| s.max_cpu)),
                            pct(s.map(|s| s.avg_memory)),
                            pct(s.map(|s| s.max_memory)),
                            pct(s.map(|s| s.latest_disk)),
                        ])
                    })
                    .collect(),
            ),
        }
    }
}

fn event_legend() -> Node {
    let entries = [
        ("🟢 Startup:", "Device powered on or booted up"),
        ("🔴 Shutdown:", "Device powered off gracefully"),
        ("😴 Sleep:", "Device entered sleep/hibernate mode"),
        ("⏰ Wake:", "Device woke from sleep/hibernate"),
        ("🔋 Battery:", "Battery-related events (low, charging, full, critical)"),
    ];
    Node::el("div")
        .class("event-legend")
        .child(Node::el("h4").push_text("Event Types:"))
        .children(entries.iter().map(|(name, desc)| {
            Node::el("p")
                .child(Node::el("strong").push_text(*name))
                .push_text(format!(" {desc}"))
        }))
}

impl QuickStats {
    pub fn render(&self) -> Node {
        let (total, avg, most, events) = self.display_values();
        Node::el("div")
            .class("stats-grid")
            .id("quick-stats")
            .child(view::stat_card("total-uptime", "Total Uptime", total))
            .child(view::stat_card("avg-session", "Avg Session", avg))
            .child(view::stat_card("most-active", "Most Active", most))
            .child(view::stat_card("power-events", "Power Events", events))
    }

    /// `(total uptime, average session, most active, power events)` as text.
    pub fn display_values(&self) -> (String, String, String, String) {
        match self {
            Self::NoDevices => (
                NO_DATA.to_string(),
                NO_DATA.to_string(),
                "No devices".to_string(),
                "0".to_string(),
            ),
            Self::Computed {
                total_uptime,
                avg_session,
                most_active,
                power_events,
            } => (
                format::format_uptime(*total_uptime),
                format::format_uptime(*avg_session),
                most_active.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                power_events.to_string(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::model::EventType;

    fn device(id: &str, host: &str, active: bool) -> Device {
        Device {
            device_id: id.into(),
            hostname: host.into(),
            platform: Some("Linux".into()),
            is_active: active,
            ..Default::default()
        }
    }

    fn sample(ts: &str, cpu: f64, uptime: f64) -> StatSample {
        StatSample {
            timestamp: Some(ts.into()),
            cpu_percent: cpu,
            memory_percent: 50.0,
            disk_percent: 25.0,
            uptime: Some(uptime),
        }
    }

    fn api() -> MockApi {
        MockApi::new()
            .with_device(device("d1", "alpha", true))
            .with_device(device("d2", "beta", false))
            .with_stats(
                "d1",
                vec![
                    sample("2025-01-15T10:01:00", 10.0, 100.0),
                    sample("2025-01-15T10:00:00", 30.0, 40.0),
                ],
            )
            .with_stats("d2", vec![sample("2025-01-15T10:00:00", 50.0, 300.0)])
    }

    #[test]
    fn parse_report_kind() {
        assert_eq!("Usage".parse::<ReportKind>().unwrap(), ReportKind::Usage);
        assert!("bogus".parse::<ReportKind>().is_err());
    }

    #[test]
    fn date_range_labels_and_fallback() {
        assert_eq!("week".parse::<DateRange>().unwrap().label(), "Last 7 Days");
        assert_eq!("whenever".parse::<DateRange>().unwrap(), DateRange::Custom);
        assert_eq!(DateRange::Custom.label(), "Custom");
    }

    #[test]
    fn today_cutoff_is_ist_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap(); // 01:30 IST on the 16th
        let cutoff = DateRange::Today.cutoff(now).unwrap();
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0).unwrap());
        assert_eq!(DateRange::All.cutoff(now), None);
    }

    #[test]
    fn usage_report_uses_fifty_samples_in_device_order() {
        let api = api();
        let report =
            generate(&api, ReportKind::Usage, DateRange::Week, &ReportsConfig::default()).unwrap();
        let ReportRows::Usage(rows) = &report.rows else {
            panic!("wrong rows");
        };
        assert_eq!(rows[0].device.hostname, "alpha");
        assert_eq!(rows[0].summary.as_ref().unwrap().avg_cpu, 20.0);
        assert!(api.requests().contains(&"stats d1 limit=50".to_string()));
        assert!(!report.range_applied);
    }

    #[test]
    fn device_without_samples_renders_no_data() {
        let api = MockApi::new().with_device(device("d9", "empty", true));
        let report = generate(
            &api,
            ReportKind::Performance,
            DateRange::All,
            &ReportsConfig::default(),
        )
        .unwrap();
        let html = report.render().render();
        assert!(html.contains("No data"));
        assert!(!html.contains("NaN"));
    }

    #[test]
    fn no_devices_renders_empty_state() {
        let report = generate(
            &MockApi::new(),
            ReportKind::Usage,
            DateRange::Week,
            &ReportsConfig::default(),
        )
        .unwrap();
        assert!(report.rows.is_empty());
        assert!(report.render().render().contains("No devices found"));
    }

    #[test]
    fn events_report_counts_and_legend() {
        let events = vec![
            PowerEvent {
                timestamp: Some("2025-01-15T10:00:00".into()),
                event_type: EventType::Sleep,
                details: None,
            },
            PowerEvent {
                timestamp: Some("2025-01-15T09:00:00".into()),
                event_type: EventType::BatteryLow,
                details: None,
            },
        ];
        let api = api().with_events("d1", events);
        let report =
            generate(&api, ReportKind::Events, DateRange::All, &ReportsConfig::default()).unwrap();
        let ReportRows::Events(rows) = &report.rows else {
            panic!("wrong rows");
        };
        assert_eq!(rows[0].counts.sleep, 1);
        assert_eq!(rows[0].counts.battery, 1);
        assert_eq!(rows[1].counts.total, 0);
        let html = report.render().render();
        assert!(html.contains("event-legend"));
        assert!(html.contains("SLEEP"));
    }

    #[test]
    fn applied_range_filters_old_samples() {
        let api = api();
        let options = ReportsConfig {
            concurrency: 1,
            apply_date_range: true,
        };
        // All fixture samples are from January 2025, far outside "today".
        let report = generate(&api, ReportKind::Usage, DateRange::Today, &options).unwrap();
        let ReportRows::Usage(rows) = &report.rows else {
            panic!("wrong rows");
        };
        assert!(rows.iter().all(|r| r.summary.is_none()));
        assert!(report.range_applied);
        assert!(!report.render().render().contains("range-note"));
    }

    #[test]
    fn failing_fetch_fails_report() {
        let api = api().failing("stats");
        assert!(generate(&api, ReportKind::Uptime, DateRange::Week, &ReportsConfig::default()).is_err());
    }

    #[test]
    fn parallel_fetch_keeps_device_order() {
        let devices: Vec<Device> = (0..7)
            .map(|i| device(&format!("d{i}"), &format!("host{i}"), true))
            .collect();
        let ids = per_device(&devices, 3, |d| {
            // later devices finish first
            let n: u64 = d.device_id[1..].parse().unwrap();
            thread::sleep(std::time::Duration::from_millis(10 * (7 - n)));
            Ok(d.device_id.clone())
        })
        .unwrap();
        let expected: Vec<String> = (0..7).map(|i| format!("d{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn parallel_fetch_propagates_errors() {
        let devices = vec![device("a", "a", true), device("b", "b", true)];
        let result: Result<Vec<()>> = per_device(&devices, 2, |d| {
            if d.device_id == "b" {
                Err(anyhow!("boom"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn quick_stats_picks_most_active() {
        let api = api();
        let stats = quick_stats(&api, 1).unwrap();
        let (total, avg, most, events) = stats.display_values();
        assert_eq!(total, "6m"); // 100 + 300 seconds
        assert_eq!(avg, "3m"); // 200 seconds
        assert_eq!(most, "beta");
        assert_eq!(events, "0");
    }

    #[test]
    fn quick_stats_no_devices() {
        let stats = quick_stats(&MockApi::new(), 1).unwrap();
        assert_eq!(stats, QuickStats::NoDevices);
        let html = stats.render().render();
        assert!(html.contains("No devices"));
        assert!(!html.contains("NaN"));
    }

    #[test]
    fn hostnames_are_escaped_in_reports() {
        let api = MockApi::new().with_device(device("x", "<script>alert(1)</script>", true));
        let report =
            generate(&api, ReportKind::Uptime, DateRange::Week, &ReportsConfig::default()).unwrap();
        let html = report.render().render();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
