/// Configuration schema and defaults for devwatch.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[general]`, `[server]`, `[refresh]`, `[charts]`, `[reports]` and
/// `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level devwatch configuration.
///
/// Maps directly to `~/.devwatch/config.toml` and `.devwatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevwatchConfig {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    pub refresh: RefreshConfig,
    pub charts: ChartsConfig,
    pub reports: ReportsConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

/// Where the monitoring backend lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base URL of the monitoring server; `/api/v1` and `/dashboard/api`
    /// are appended to it.
    pub api_base_url: String,
    /// Per-request timeout (milliseconds).
    pub request_timeout_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// The dashboard's own HTTP listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            open_browser: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [refresh]
// ---------------------------------------------------------------------------

/// Refresh periods per page (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub dashboard_secs: u64,
    pub devices_secs: u64,
    pub device_secs: u64,
    pub reports_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            dashboard_secs: 30,
            devices_secs: 30,
            device_secs: 30,
            reports_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// [charts]
// ---------------------------------------------------------------------------

/// How many samples/rows each view asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Points on the overview charts.
    pub dashboard_points: u32,
    /// Points on the device detail charts.
    pub detail_points: u32,
    /// Rows in the detail page's stats history table.
    pub history_rows: u32,
    /// Rows in the detail page's power events table.
    pub event_rows: u32,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            dashboard_points: 20,
            detail_points: 50,
            history_rows: 20,
            event_rows: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// [reports]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Devices fetched in parallel while building a report. `1` keeps the
    /// fetches strictly sequential.
    pub concurrency: usize,
    /// Filter samples/events by the selected date range on the client.
    /// When `false` the range is only a label and the report says so.
    pub apply_date_range: bool,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            apply_date_range: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
    /// Colored log output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl DevwatchConfig {
    /// The commented default config written by `devwatch config init`.
    pub fn default_toml() -> &'static str {
        r#"# devwatch configuration
# Layers: built-in defaults < ~/.devwatch/config.toml < ./.devwatch.toml < DEVWATCH_* env

[general]
# Monitoring server base URL (DEVWATCH_API_URL)
api_base_url = "http://localhost:5000"
# Per-request timeout in milliseconds (DEVWATCH_TIMEOUT_MS)
request_timeout_ms = 10000

[server]
# Dashboard listen address (DEVWATCH_BIND)
bind_addr = "127.0.0.1:8080"
open_browser = false

[refresh]
dashboard_secs = 30
devices_secs = 30
device_secs = 30
reports_secs = 60

[charts]
dashboard_points = 20
detail_points = 50
history_rows = 20
event_rows = 20

[reports]
# Devices fetched in parallel per report (DEVWATCH_REPORT_CONCURRENCY)
concurrency = 1
# Apply the date range to fetched data instead of only labelling the report
# (DEVWATCH_APPLY_DATE_RANGE)
apply_date_range = false

[logging]
# tracing filter, overridden by RUST_LOG (DEVWATCH_LOG_LEVEL)
level = "info"
ansi = true
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_matches_defaults() {
        let parsed: DevwatchConfig = toml::from_str(DevwatchConfig::default_toml()).unwrap();
        assert_eq!(parsed, DevwatchConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: DevwatchConfig = toml::from_str(
            r#"
[general]
api_base_url = "http://monitor:5000"
"#,
        )
        .unwrap();
        assert_eq!(parsed.general.api_base_url, "http://monitor:5000");
        assert_eq!(parsed.general.request_timeout_ms, 10_000);
        assert_eq!(parsed.refresh.reports_secs, 60);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let cfg = DevwatchConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: DevwatchConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
