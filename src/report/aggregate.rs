//! Pure reductions over fetched samples and events.
//!
//! Nothing here touches the network, so every "No data" edge case is
//! decided in one place: an empty input gives `None`, never a NaN average.

use crate::model::{Device, EventType, PowerEvent, StatSample};

// ---------------------------------------------------------------------------
// Stat samples
// ---------------------------------------------------------------------------

/// Summary of one device's newest-first samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSummary {
    pub count: usize,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub avg_memory: f64,
    pub max_memory: f64,
    /// Disk usage of the newest sample.
    pub latest_disk: f64,
    /// Uptime of the newest sample; `0.0` when it was not reported.
    pub latest_uptime: f64,
}

impl SampleSummary {
    /// `None` when there are no samples.
    pub fn from_samples(newest_first: &[StatSample]) -> Option<Self> {
        let latest = newest_first.first()?;
        let n = newest_first.len() as f64;

        let (mut sum_cpu, mut sum_mem) = (0.0, 0.0);
        let (mut max_cpu, mut max_mem) = (f64::MIN, f64::MIN);
        for s in newest_first {
            sum_cpu += s.cpu_percent;
            sum_mem += s.memory_percent;
            max_cpu = max_cpu.max(s.cpu_percent);
            max_mem = max_mem.max(s.memory_percent);
        }

        Some(Self {
            count: newest_first.len(),
            avg_cpu: sum_cpu / n,
            max_cpu,
            avg_memory: sum_mem / n,
            max_memory: max_mem,
            latest_disk: latest.disk_percent,
            latest_uptime: latest.uptime.unwrap_or(0.0),
        })
    }
}

// ---------------------------------------------------------------------------
// Power events
// ---------------------------------------------------------------------------

/// Per-type counts for the events report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCounts {
    pub total: usize,
    pub startup: usize,
    pub shutdown: usize,
    pub sleep: usize,
    pub wake: usize,
    /// Low, critical, charging and full.
    pub battery: usize,
    /// The newest event, if any.
    pub last: Option<PowerEvent>,
}

impl EventCounts {
    pub fn tally(newest_first: &[PowerEvent]) -> Self {
        let mut counts = Self {
            total: newest_first.len(),
            last: newest_first.first().cloned(),
            ..Self::default()
        };
        for e in newest_first {
            match e.event_type {
                EventType::Startup => counts.startup += 1,
                EventType::Shutdown => counts.shutdown += 1,
                EventType::Sleep => counts.sleep += 1,
                EventType::Wake => counts.wake += 1,
                ref t if t.is_battery() => counts.battery += 1,
                _ => {}
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Quick stats
// ---------------------------------------------------------------------------

/// Inputs for one device in the quick-stats pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceActivity {
    pub hostname: String,
    /// Uptime of the newest sample, `None` when the device has no samples.
    pub uptime: Option<f64>,
    /// Server-side power event count.
    pub events_total: u64,
}

/// Reports page headline numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum QuickStats {
    /// No devices registered; averages are undefined.
    NoDevices,
    Computed {
        total_uptime: f64,
        /// Total uptime divided by the number of devices (including those
        /// without samples).
        avg_session: f64,
        /// Hostname of the device with the strictly greatest positive
        /// uptime; the first one wins a tie.
        most_active: Option<String>,
        power_events: u64,
    },
}

impl QuickStats {
    pub fn compute(devices: &[DeviceActivity]) -> Self {
        if devices.is_empty() {
            return Self::NoDevices;
        }

        let mut total_uptime = 0.0;
        let mut power_events = 0;
        let mut best: Option<(&str, f64)> = None;

        for d in devices {
            power_events += d.events_total;
            let Some(uptime) = d.uptime else { continue };
            total_uptime += uptime;
            let current_max = best.map_or(0.0, |(_, u)| u);
            if uptime > current_max {
                best = Some((d.hostname.as_str(), uptime));
            }
        }

        Self::Computed {
            total_uptime,
            avg_session: total_uptime / devices.len() as f64,
            most_active: best.map(|(h, _)| h.to_string()),
            power_events,
        }
    }
}

impl DeviceActivity {
    pub fn new(device: &Device, newest_first: &[StatSample], events_total: u64) -> Self {
        Self {
            hostname: device.hostname.clone(),
            uptime: newest_first.first().map(|s| s.uptime.unwrap_or(0.0)),
            events_total,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
