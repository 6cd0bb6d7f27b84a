//! Page and fragment handlers for the web dashboard.
//!
//! Full pages wrap a freshly refreshed controller in the shell from
//! [`frontend`](super::frontend); fragments return only the controller's
//! content region, which the page script swaps in on every refresh tick.

use super::{App, Reply, frontend};
use crate::pages::{DeviceDetailPage, DevicesPage, OverviewPage, PageState, ReportsPage, StatusFilter};
use crate::report::{DateRange, ReportKind};

// ---------------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------------

/// Look up a query parameter, form-decoded (`+` is a space).
pub(super) fn query_param(url: &str, key: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn overview(app: &App) -> OverviewPage {
    let mut page = OverviewPage::new(app.config.charts.dashboard_points);
    page.refresh(app.api.as_ref());
    page
}

/// `GET /`
pub fn overview_page(app: &App) -> Reply {
    let page = overview(app);
    Reply::html(frontend::shell(
        "Dashboard - Device Monitor",
        "/",
        None,
        frontend::Region {
            fragment_url: "/fragments/overview".to_string(),
            refresh_secs: app.config.refresh.dashboard_secs,
            content: page.render(),
        },
        None,
    ))
}

/// `GET /fragments/overview`
pub fn overview_fragment(app: &App) -> Reply {
    Reply::html(overview(app).render().render())
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

fn devices(app: &App) -> DevicesPage {
    let page = DevicesPage::new(app.devices.clone());
    // The background refresher fills the cache; only block on the very first view.
    if page.cache.snapshot().is_loading() {
        page.refresh(app.api.as_ref());
    }
    page
}

fn search_params(url: &str) -> Result<(String, StatusFilter), Reply> {
    let query = query_param(url, "q").unwrap_or_default();
    let filter = query_param(url, "filter")
        .unwrap_or_default()
        .parse::<StatusFilter>()
        .map_err(|e| Reply::error(400, &e.to_string()))?;
    Ok((query, filter))
}

/// `GET /devices`
pub fn devices_page(app: &App, url: &str) -> anyhow::Result<Reply> {
    let (query, filter) = match search_params(url) {
        Ok(p) => p,
        Err(reply) => return Ok(reply),
    };
    let page = devices(app);
    Ok(Reply::html(frontend::shell(
        "Devices - Device Monitor",
        "/devices",
        Some(frontend::device_controls(&query, filter)),
        frontend::Region {
            fragment_url: "/fragments/devices".to_string(),
            refresh_secs: app.config.refresh.devices_secs,
            content: page.render(&query, filter),
        },
        None,
    )))
}

/// `GET /fragments/devices?q=&filter=`
pub fn devices_fragment(app: &App, url: &str) -> anyhow::Result<Reply> {
    let (query, filter) = match search_params(url) {
        Ok(p) => p,
        Err(reply) => return Ok(reply),
    };
    Ok(Reply::html(devices(app).render(&query, filter).render()))
}

// ---------------------------------------------------------------------------
// Device detail
// ---------------------------------------------------------------------------

fn detail(app: &App, id: &str) -> DeviceDetailPage {
    let mut page = DeviceDetailPage::new(id, app.config.charts.clone());
    page.refresh(app.api.as_ref());
    page
}

/// `GET /devices/{id}`
pub fn device_page(app: &App, id: &str) -> Reply {
    let page = detail(app, id);
    let mut reply = Reply::html(frontend::shell(
        &page.title(),
        "/devices",
        None,
        frontend::Region {
            fragment_url: format!("/fragments/devices/{}", urlencoding::encode(id)),
            refresh_secs: app.config.refresh.device_secs,
            content: page.render(),
        },
        None,
    ));
    if page.not_found {
        reply.status = 404;
    }
    reply
}

/// `GET /fragments/devices/{id}`
pub fn device_fragment(app: &App, id: &str) -> Reply {
    Reply::html(detail(app, id).render().render())
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn reports(app: &App) -> ReportsPage {
    let mut page = ReportsPage::new(app.config.reports.clone());
    page.refresh(app.api.as_ref());
    page
}

/// `GET /reports`
pub fn reports_page(app: &App) -> Reply {
    let page = reports(app);
    Reply::html(frontend::shell(
        "Reports - Device Monitor",
        "/reports",
        None,
        frontend::Region {
            fragment_url: "/fragments/reports/quick".to_string(),
            refresh_secs: app.config.refresh.reports_secs,
            content: page.render_quick(),
        },
        Some(frontend::report_form()),
    ))
}

/// `GET /fragments/reports/quick`
pub fn quick_stats_fragment(app: &App) -> Reply {
    Reply::html(reports(app).render_quick().render())
}

/// `GET /fragments/reports/generate?type=&range=`
pub fn report_fragment(app: &App, url: &str) -> anyhow::Result<Reply> {
    let kind = match query_param(url, "type")
        .unwrap_or_else(|| "usage".to_string())
        .parse::<ReportKind>()
    {
        Ok(kind) => kind,
        Err(e) => return Ok(Reply::error(400, &e.to_string())),
    };
    let range = query_param(url, "range")
        .unwrap_or_else(|| "week".to_string())
        .parse::<DateRange>()
        .unwrap_or_default();

    let mut page = ReportsPage::new(app.config.reports.clone());
    page.generate(app.api.as_ref(), kind, range);
    Ok(Reply::html(page.render_report().render()))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// `GET /healthz`: liveness of the dashboard itself, not the backend.
pub fn healthz(app: &App) -> Reply {
    let cached = match app.devices.snapshot() {
        PageState::Loaded(d) => Some(d.len()),
        _ => None,
    };
    Reply::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "api_base_url": app.config.general.api_base_url,
            "cached_devices": cached,
        }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
