//! Wire types for the device-monitoring API.
//!
//! Everything here is owned by the backend; devwatch only decodes it.
//! Decoding is lenient: missing or `null` collections become empty vectors,
//! `null` metrics and flags take their default, and unknown event types are
//! preserved verbatim so they can still be shown (escaped) in the UI.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A monitored endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    #[serde(deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub hostname: String,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_active: bool,
    pub last_seen: Option<String>,
    pub created_at: Option<String>,
}

impl Device {
    /// Platform name or `"Unknown"`.
    pub fn platform_or_unknown(&self) -> &str {
        match self.platform.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => "Unknown",
        }
    }

    /// Platform version or `"Unknown"`.
    pub fn platform_version_or_unknown(&self) -> &str {
        match self.platform_version.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => "Unknown",
        }
    }

    /// Case-insensitive match against hostname, device id and platform.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.hostname.to_lowercase().contains(&q)
            || self.device_id.to_lowercase().contains(&q)
            || self
                .platform
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&q))
    }
}

/// One timestamped utilization reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSample {
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub cpu_percent: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub memory_percent: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub disk_percent: f64,
    /// Seconds since boot.
    pub uptime: Option<f64>,
}

/// Power-state transition kinds reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Startup,
    Shutdown,
    Sleep,
    Wake,
    BatteryCharging,
    BatteryUnplugged,
    BatteryFull,
    BatteryLow,
    BatteryCritical,
    /// Anything the backend sends that we don't know about.
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Startup => "STARTUP",
            Self::Shutdown => "SHUTDOWN",
            Self::Sleep => "SLEEP",
            Self::Wake => "WAKE",
            Self::BatteryCharging => "BATTERY_CHARGING",
            Self::BatteryUnplugged => "BATTERY_UNPLUGGED",
            Self::BatteryFull => "BATTERY_FULL",
            Self::BatteryLow => "BATTERY_LOW",
            Self::BatteryCritical => "BATTERY_CRITICAL",
            Self::Other(s) => s,
        }
    }

    /// Low, critical, charging and full. Unplugged is deliberately not
    /// counted, matching the events report columns.
    pub fn is_battery(&self) -> bool {
        matches!(
            self,
            Self::BatteryLow | Self::BatteryCritical | Self::BatteryCharging | Self::BatteryFull
        )
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "STARTUP" => Self::Startup,
            "SHUTDOWN" => Self::Shutdown,
            "SLEEP" => Self::Sleep,
            "WAKE" => Self::Wake,
            "BATTERY_CHARGING" => Self::BatteryCharging,
            "BATTERY_UNPLUGGED" => Self::BatteryUnplugged,
            "BATTERY_FULL" => Self::BatteryFull,
            "BATTERY_LOW" => Self::BatteryLow,
            "BATTERY_CRITICAL" => Self::BatteryCritical,
            _ => Self::Other(s),
        }
    }
}

impl From<EventType> for String {
    fn from(e: EventType) -> Self {
        e.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete power/lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerEvent {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    pub details: Option<String>,
}

/// Fleet-wide counters from `/dashboard/api/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_devices: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub active_devices: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_events: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_cpu: f64,
    pub avg_memory: Option<f64>,
    pub avg_disk: Option<f64>,
}

/// Backend liveness from `/api/v1/health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Health {
    pub status: String,
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DevicesEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceEnvelope {
    pub device: Device,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub stats: Vec<StatSample>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventsEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub events: Vec<PowerEvent>,
    pub total: Option<u64>,
}

/// A page of power events plus the server-side count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<PowerEvent>,
    pub total: u64,
}

impl From<EventsEnvelope> for EventPage {
    fn from(env: EventsEnvelope) -> Self {
        let total = env.total.unwrap_or(env.events.len() as u64);
        Self {
            events: env.events,
            total,
        }
    }
}

/// Decode an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_decodes_backend_dict() {
        let json = r#"{
            "id": 3,
            "device_id": "dev-001",
            "hostname": "alpha",
            "platform": "Linux",
            "platform_version": "6.1",
            "last_seen": "2025-01-15T10:00:00",
            "is_active": true,
            "created_at": null
        }"#;
        let d: Device = serde_json::from_str(json).unwrap();
        assert_eq!(d.device_id, "dev-001");
        assert!(d.is_active);
        assert_eq!(d.created_at, None);
    }

    #[test]
    fn null_metrics_decode_as_zero() {
        let json = r#"{"timestamp": null, "cpu_percent": null, "memory_percent": 12.5, "disk_percent": 3, "uptime": null}"#;
        let s: StatSample = serde_json::from_str(json).unwrap();
        assert_eq!(s.cpu_percent, 0.0);
        assert_eq!(s.memory_percent, 12.5);
        assert_eq!(s.disk_percent, 3.0);
        assert_eq!(s.uptime, None);
    }

    #[test]
    fn unknown_event_type_is_preserved() {
        let json = r#"{"timestamp": "2025-01-15T10:00:00", "event_type": "LID_CLOSED"}"#;
        let e: PowerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(e.event_type, EventType::Other("LID_CLOSED".to_string()));
        assert_eq!(e.event_type.as_str(), "LID_CLOSED");
    }

    #[test]
    fn battery_union_excludes_unplugged() {
        assert!(EventType::BatteryLow.is_battery());
        assert!(EventType::BatteryCritical.is_battery());
        assert!(EventType::BatteryCharging.is_battery());
        assert!(EventType::BatteryFull.is_battery());
        assert!(!EventType::BatteryUnplugged.is_battery());
        assert!(!EventType::Startup.is_battery());
    }

    #[test]
    fn missing_collection_is_empty() {
        let env: DevicesEnvelope = serde_json::from_str("{}").unwrap();
        assert!(env.devices.is_empty());
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let env: DevicesEnvelope = serde_json::from_str(r#"{"devices": null}"#).unwrap();
        assert!(env.devices.is_empty());
        let env: StatsEnvelope = serde_json::from_str(r#"{"stats": null}"#).unwrap();
        assert!(env.stats.is_empty());
        let env: EventsEnvelope =
            serde_json::from_str(r#"{"events": null, "total": null}"#).unwrap();
        assert_eq!(EventPage::from(env).total, 0);
    }

    #[test]
    fn null_device_flags_and_counters_decode_as_default() {
        let d: Device = serde_json::from_str(
            r#"{"device_id": "dev-1", "hostname": null, "is_active": null}"#,
        )
        .unwrap();
        assert!(!d.is_active);
        assert_eq!(d.hostname, "");

        let s: DashboardStats =
            serde_json::from_str(r#"{"total_devices": null, "avg_cpu": null}"#).unwrap();
        assert_eq!(s.total_devices, 0);
        assert_eq!(s.avg_cpu, 0.0);
    }

    #[test]
    fn event_page_total_defaults_to_len() {
        let env: EventsEnvelope =
            serde_json::from_str(r#"{"events": [{"event_type": "WAKE"}]}"#).unwrap();
        let page = EventPage::from(env);
        assert_eq!(page.total, 1);
    }

    #[test]
    fn search_matches_platform_case_insensitively() {
        let d = Device {
            device_id: "dev-9".into(),
            hostname: "Beta".into(),
            platform: Some("Windows".into()),
            ..Default::default()
        };
        assert!(d.matches_query("WIN"));
        assert!(d.matches_query("beta"));
        assert!(!d.matches_query("mac"));
    }
}
