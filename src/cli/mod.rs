//! CLI command implementations for devwatch.
//!
//! Provides subcommand handlers for:
//! - `devwatch devices`: device list with search and status filter
//! - `devwatch device <ID>`: one device's info, current stats, events and history
//! - `devwatch report <KIND>`: usage / uptime / events / performance reports
//! - `devwatch quick-stats`: fleet uptime and event headline numbers
//! - `devwatch watch`: live fleet summary until Enter is pressed
//! - `devwatch health`: config files and backend reachability
//! - `devwatch config show|init|set|reset`: configuration management

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;
use tracing::warn;

use crate::api::DeviceApi;
use crate::config::{self, DevwatchConfig};
use crate::format::{self, NO_DATA, NOT_AVAILABLE};
use crate::model::Device;
use crate::pages::devices::visible;
use crate::pages::{DeviceDetailPage, PageState, StatusFilter};
use crate::poll::Poller;
use crate::report::{self, DateRange, EventsRow, QuickStats, Report, ReportKind, ReportRows, SummaryRow};

/// Output format for listing and report commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// devwatch devices
// ---------------------------------------------------------------------------

/// List devices, optionally narrowed by search text and status.
pub fn run_devices(
    api: &dyn DeviceApi,
    search: Option<&str>,
    filter: StatusFilter,
    format: OutputFormat,
) -> Result<()> {
    let all = api.devices()?;
    let devices = visible(&all, search.unwrap_or(""), filter);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
        OutputFormat::Csv => print!("{}", devices_csv(&devices)),
        OutputFormat::Table => {
            if devices.is_empty() {
                println!("{}", "No devices found.".yellow());
                return Ok(());
            }
            println!("{}", "Devices".bold().cyan());
            println!(
                "  {:<20} {:<24} {:<10} {:<10} Last Seen",
                "Device ID", "Hostname", "Platform", "Status"
            );
            println!("  {}", "-".repeat(90));
            for (i, d) in devices.iter().enumerate() {
                let line = format!(
                    "  {:<20} {:<24} {:<10} {:<10} {}",
                    truncate(&d.device_id, 20),
                    truncate(&d.hostname, 24),
                    truncate(d.platform_or_unknown(), 10),
                    status_label(d.is_active),
                    format::format_datetime(d.last_seen.as_deref()),
                );
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }
            println!();
            println!("  {} of {} devices shown", devices.len(), all.len());
        }
    }
    Ok(())
}

fn devices_csv(devices: &[Device]) -> String {
    let mut out = String::from("device_id,hostname,platform,is_active,last_seen\n");
    for d in devices {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&d.device_id),
            csv_field(&d.hostname),
            csv_field(d.platform_or_unknown()),
            d.is_active,
            csv_field(d.last_seen.as_deref().unwrap_or("")),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// devwatch device <ID>
// ---------------------------------------------------------------------------

/// Show one device in detail.
pub fn run_device(api: &dyn DeviceApi, id: &str, cfg: &DevwatchConfig, format: OutputFormat) -> Result<()> {
    let mut page = DeviceDetailPage::new(id, cfg.charts.clone());
    page.refresh(api);
    let detail = match &page.state {
        PageState::Loaded(d) => d,
        PageState::Error(msg) => bail!("{msg}: {id}"),
        PageState::Loading => bail!("device {id} did not load"),
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(detail)?);
        return Ok(());
    }

    let d = &detail.device;
    println!("{} {}", d.hostname.bold().cyan(), colored_status(d.is_active));
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Device ID:       ".bold(), d.device_id);
    println!("  {} {}", "Platform:        ".bold(), d.platform_or_unknown());
    println!("  {} {}", "Platform version:".bold(), d.platform_version_or_unknown());
    println!("  {} {}", "Last seen:       ".bold(), format::format_datetime(d.last_seen.as_deref()));
    println!("  {} {}", "Registered:      ".bold(), format::format_datetime(d.created_at.as_deref()));
    println!();

    println!("{}", "Current Stats".bold().cyan());
    match &detail.latest {
        Some(s) => {
            println!(
                "  CPU {}  Memory {}  Disk {}  Uptime {}",
                format::format_percent(s.cpu_percent),
                format::format_percent(s.memory_percent),
                format::format_percent(s.disk_percent),
                format::format_uptime(s.uptime.unwrap_or(0.0)),
            );
            println!("  {}", format!("at {}", format::format_datetime(s.timestamp.as_deref())).dimmed());
        }
        None => println!("  {}", NO_DATA.yellow()),
    }
    println!();

    println!("{}", "Power Events".bold().cyan());
    if detail.events.is_empty() {
        println!("  {}", "No events recorded".dimmed());
    }
    for e in &detail.events {
        println!(
            "  {:<24} {:<20} {}",
            format::format_datetime(e.timestamp.as_deref()),
            e.event_type,
            e.details.as_deref().unwrap_or("-"),
        );
    }
    println!();

    println!("{}", "Stats History".bold().cyan());
    if detail.history.is_empty() {
        println!("  {}", "No statistics recorded".dimmed());
    } else {
        println!(
            "  {:<24} {:>8} {:>8} {:>8} Uptime",
            "Time", "CPU", "Memory", "Disk"
        );
        for s in &detail.history {
            println!(
                "  {:<24} {:>8} {:>8} {:>8} {}",
                format::format_datetime(s.timestamp.as_deref()),
                format::format_percent(s.cpu_percent),
                format::format_percent(s.memory_percent),
                format::format_percent(s.disk_percent),
                format::format_uptime(s.uptime.unwrap_or(0.0)),
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// devwatch report
// ---------------------------------------------------------------------------

/// Generate and print a report.
pub fn run_report(
    api: &dyn DeviceApi,
    kind: ReportKind,
    range: DateRange,
    cfg: &DevwatchConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = report::generate(api, kind, range, &cfg.reports)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report_json(&report))?),
        OutputFormat::Csv => print!("{}", report_csv(&report)),
        OutputFormat::Table => print_report_table(&report),
    }
    Ok(())
}

fn print_report_table(report: &Report) {
    println!("{}", report.kind.title().bold().cyan());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Date range:".bold(), report.range.label());
    if !report.range_applied {
        println!(
            "  {}",
            "(label only; figures cover the most recent samples)".dimmed()
        );
    }
    println!("  {} {}", "Generated: ".bold(), report.generated_at);
    println!();

    if report.rows.is_empty() {
        println!("{}", "No devices found. Cannot generate report.".yellow());
        return;
    }

    let (header, lines) = report_lines(report);
    println!("  {header}");
    println!("  {}", "-".repeat(header.chars().count()));
    for (i, line) in lines.iter().enumerate() {
        if i % 2 == 0 {
            println!("  {line}");
        } else {
            println!("  {}", line.dimmed());
        }
    }
}

/// Header and body lines of the terminal report table.
fn report_lines(report: &Report) -> (String, Vec<String>) {
    fn pct(v: Option<f64>) -> String {
        format::format_percent_opt(v)
    }
    match &report.rows {
        ReportRows::Usage(rows) => (
            format!(
                "{:<24} {:<10} {:<9} {:>8} {:>10}  Last Seen",
                "Device", "Platform", "Status", "Avg CPU", "Avg Memory"
            ),
            rows.iter()
                .map(|r| {
                    let s = r.summary.as_ref();
                    format!(
                        "{:<24} {:<10} {:<9} {:>8} {:>10}  {}",
                        truncate(&r.device.hostname, 24),
                        truncate(r.device.platform_or_unknown(), 10),
                        if r.device.is_active { "Active" } else { "Inactive" },
                        pct(s.map(|s| s.avg_cpu)),
                        pct(s.map(|s| s.avg_memory)),
                        format::format_datetime(r.device.last_seen.as_deref()),
                    )
                })
                .collect(),
        ),
        ReportRows::Uptime(rows) => (
            format!("{:<24} {:<16} {:<8}  Registered", "Device", "Current Uptime", "Status"),
            rows.iter()
                .map(|r| {
                    format!(
                        "{:<24} {:<16} {:<8}  {}",
                        truncate(&r.device.hostname, 24),
                        uptime_text(r),
                        if r.device.is_active { "Online" } else { "Offline" },
                        format::format_datetime(r.device.created_at.as_deref()),
                    )
                })
                .collect(),
        ),
        ReportRows::Events(rows) => (
            format!(
                "{:<24} {:>6} {:>8} {:>9} {:>6} {:>6} {:>8}  Last Event",
                "Device", "Total", "Startups", "Shutdowns", "Sleep", "Wake", "Battery"
            ),
            rows.iter()
                .map(|r| {
                    let c = &r.counts;
                    format!(
                        "{:<24} {:>6} {:>8} {:>9} {:>6} {:>6} {:>8}  {}",
                        truncate(&r.device.hostname, 24),
                        c.total,
                        c.startup,
                        c.shutdown,
                        c.sleep,
                        c.wake,
                        c.battery,
                        last_event_text(r),
                    )
                })
                .collect(),
        ),
        ReportRows::Performance(rows) => (
            format!(
                "{:<24} {:>8} {:>8} {:>10} {:>10} {:>8}",
                "Device", "Avg CPU", "Max CPU", "Avg Memory", "Max Memory", "Disk"
            ),
            rows.iter()
                .map(|r| {
                    let s = r.summary.as_ref();
                    format!(
                        "{:<24} {:>8} {:>8} {:>10} {:>10} {:>8}",
                        truncate(&r.device.hostname, 24),
                        pct(s.map(|s| s.avg_cpu)),
                        pct(s.map(|s| s.max_cpu)),
                        pct(s.map(|s| s.avg_memory)),
                        pct(s.map(|s| s.max_memory)),
                        pct(s.map(|s| s.latest_disk)),
                    )
                })
                .collect(),
        ),
    }
}

fn uptime_text(row: &SummaryRow) -> String {
    row.summary
        .as_ref()
        .map_or_else(|| NO_DATA.to_string(), |s| format::format_uptime(s.latest_uptime))
}

fn last_event_text(row: &EventsRow) -> String {
    match &row.counts.last {
        Some(e) => format!(
            "{} ({})",
            format::format_datetime(e.timestamp.as_deref()),
            e.event_type
        ),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn report_json(report: &Report) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = match &report.rows {
        ReportRows::Usage(rows) | ReportRows::Uptime(rows) | ReportRows::Performance(rows) => rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "device_id": r.device.device_id,
                    "hostname": r.device.hostname,
                    "platform": r.device.platform_or_unknown(),
                    "is_active": r.device.is_active,
                    "samples": r.summary.as_ref().map_or(0, |s| s.count),
                    "avg_cpu": r.summary.as_ref().map(|s| s.avg_cpu),
                    "max_cpu": r.summary.as_ref().map(|s| s.max_cpu),
                    "avg_memory": r.summary.as_ref().map(|s| s.avg_memory),
                    "max_memory": r.summary.as_ref().map(|s| s.max_memory),
                    "disk": r.summary.as_ref().map(|s| s.latest_disk),
                    "uptime": r.summary.as_ref().map(|s| s.latest_uptime),
                })
            })
            .collect(),
        ReportRows::Events(rows) => rows
            .iter()
            .map(|r| {
                let c = &r.counts;
                serde_json::json!({
                    "device_id": r.device.device_id,
                    "hostname": r.device.hostname,
                    "total": c.total,
                    "startup": c.startup,
                    "shutdown": c.shutdown,
                    "sleep": c.sleep,
                    "wake": c.wake,
                    "battery": c.battery,
                    "last_event": c.last,
                })
            })
            .collect(),
    };
    serde_json::json!({
        "type": report.kind.as_str(),
        "date_range": report.range.as_str(),
        "date_range_applied": report.range_applied,
        "generated_at": report.generated_at,
        "rows": rows,
    })
}

fn report_csv(report: &Report) -> String {
    let (header, lines): (&str, Vec<String>) = match &report.rows {
        ReportRows::Usage(rows) | ReportRows::Uptime(rows) | ReportRows::Performance(rows) => (
            "device_id,hostname,is_active,samples,avg_cpu,max_cpu,avg_memory,max_memory,disk,uptime",
            rows.iter()
                .map(|r| {
                    let num = |f: fn(&report::SampleSummary) -> f64| {
                        r.summary
                            .as_ref()
                            .map(|s| format!("{:.1}", f(s)))
                            .unwrap_or_default()
                    };
                    format!(
                        "{},{},{},{},{},{},{},{},{},{}",
                        csv_field(&r.device.device_id),
                        csv_field(&r.device.hostname),
                        r.device.is_active,
                        r.summary.as_ref().map_or(0, |s| s.count),
                        num(|s| s.avg_cpu),
                        num(|s| s.max_cpu),
                        num(|s| s.avg_memory),
                        num(|s| s.max_memory),
                        num(|s| s.latest_disk),
                        num(|s| s.latest_uptime),
                    )
                })
                .collect(),
        ),
        ReportRows::Events(rows) => (
            "device_id,hostname,total,startup,shutdown,sleep,wake,battery,last_event",
            rows.iter()
                .map(|r| {
                    let c = &r.counts;
                    format!(
                        "{},{},{},{},{},{},{},{},{}",
                        csv_field(&r.device.device_id),
                        csv_field(&r.device.hostname),
                        c.total,
                        c.startup,
                        c.shutdown,
                        c.sleep,
                        c.wake,
                        c.battery,
                        c.last.as_ref().map_or("", |e| e.event_type.as_str()),
                    )
                })
                .collect(),
        ),
    };
    let mut out = format!("{header}\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// devwatch quick-stats
// ---------------------------------------------------------------------------

pub fn run_quick_stats(api: &dyn DeviceApi, cfg: &DevwatchConfig, format: OutputFormat) -> Result<()> {
    let stats = report::quick_stats(api, cfg.reports.concurrency)?;
    let (total, avg, most, events) = stats.display_values();

    match format {
        OutputFormat::Json => {
            let value = match &stats {
                QuickStats::NoDevices => serde_json::json!({ "devices": 0 }),
                QuickStats::Computed {
                    total_uptime,
                    avg_session,
                    most_active,
                    power_events,
                } => serde_json::json!({
                    "total_uptime_secs": total_uptime,
                    "avg_session_secs": avg_session,
                    "most_active": most_active,
                    "power_events": power_events,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("total_uptime,avg_session,most_active,power_events");
            println!("{},{},{},{}", csv_field(&total), csv_field(&avg), csv_field(&most), events);
        }
        OutputFormat::Table => {
            println!("{}", "Quick Stats".bold().cyan());
            println!("{}", "=".repeat(40));
            println!("  {} {}", "Total uptime:".bold(), total);
            println!("  {} {}", "Avg session: ".bold(), avg);
            println!("  {} {}", "Most active: ".bold(), most);
            println!("  {} {}", "Power events:".bold(), events);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// devwatch watch
// ---------------------------------------------------------------------------

/// Print a fleet summary every `interval` until Enter (or EOF) on stdin.
pub fn run_watch(api: Arc<dyn DeviceApi>, interval: Duration) -> Result<()> {
    println!(
        "{} refreshing every {}s. Press Enter to stop.",
        "Watching fleet:".bold().cyan(),
        interval.as_secs()
    );

    let handle = Poller::start("watch", interval, move || {
        println!("{}", watch_line(api.as_ref())?);
        Ok(())
    })?;

    wait_for_enter(std::io::stdin().lock());
    handle.stop();
    println!("{}", "Stopped.".dimmed());
    Ok(())
}

/// Block until a line (or EOF) arrives. Returns false if reading failed.
fn wait_for_enter(mut input: impl BufRead) -> bool {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "could not read stdin; stopping watch");
            false
        }
    }
}

fn watch_line(api: &dyn DeviceApi) -> Result<String> {
    let stats = api.dashboard_stats()?;
    Ok(format!(
        "[{}] devices {}/{} active  events {}  avg cpu {}%",
        format::now_ist(),
        stats.active_devices,
        stats.total_devices,
        stats.total_events,
        stats.avg_cpu,
    ))
}

// ---------------------------------------------------------------------------
// devwatch health
// ---------------------------------------------------------------------------

/// Check config files and backend reachability.
pub fn run_health(api: &dyn DeviceApi, cfg: &DevwatchConfig) -> Result<()> {
    println!("{}", "devwatch Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.devwatch/config.toml found"
        } else {
            "not found (run `devwatch config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".devwatch.toml found"
        } else {
            "none (optional)"
        },
    );
    print_health_item("API base URL", true, &cfg.general.api_base_url);

    match api.health() {
        Ok(h) => print_health_item(
            "Monitoring server",
            h.status == "healthy" || h.status == "ok",
            &format!("status: {}", h.status),
        ),
        Err(e) => print_health_item("Monitoring server", false, &e.user_message()),
    }

    match api.devices() {
        Ok(devices) => {
            let active = devices.iter().filter(|d| d.is_active).count();
            print_health_item(
                "Devices",
                !devices.is_empty(),
                &format!("{} registered, {} active", devices.len(), active),
            );
        }
        Err(e) => print_health_item("Devices", false, &e.user_message()),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// devwatch config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective devwatch Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.devwatch/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.devwatch/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".devwatch.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".devwatch.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "DEVWATCH_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.devwatch/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point devwatch at your monitoring server.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn status_label(active: bool) -> &'static str {
    if active { "Active" } else { "Inactive" }
}

fn colored_status(active: bool) -> colored::ColoredString {
    if active {
        "● Online".green()
    } else {
        "○ Offline".red()
    }
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
