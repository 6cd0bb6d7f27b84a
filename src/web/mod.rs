//! Embedded web dashboard for devwatch.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - Four server-rendered pages: overview, device grid, device detail, reports
//! - HTML fragment endpoints the pages poll to refresh themselves
//! - A JSON liveness check at `/healthz`
//!
//! Launched via `devwatch serve` (default: `http://127.0.0.1:8080`).

mod api;
mod frontend;

use std::io::Cursor;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use regex::Regex;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{info, warn};

use crate::api::{DeviceApi, HttpClient};
use crate::config::schema::DevwatchConfig;
use crate::pages::DeviceCache;
use crate::poll::Poller;

/// `/devices/{id}` and `/fragments/devices/{id}`.
static DEVICE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/fragments)?/devices/([^/]+)$").expect("device path regex must compile")
});

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything a request handler needs.
#[derive(Clone)]
pub struct App {
    pub api: Arc<dyn DeviceApi>,
    pub config: DevwatchConfig,
    /// Device list shared with the background refresher.
    pub devices: DeviceCache,
}

impl App {
    pub fn new(api: Arc<dyn DeviceApi>, config: DevwatchConfig) -> Self {
        Self {
            api,
            config,
            devices: DeviceCache::new(),
        }
    }
}

/// A rendered response, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            body: value.to_string(),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        Response::from_data(self.body.into_bytes())
            .with_header(content_type(self.content_type))
            .with_status_code(StatusCode(self.status))
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local dashboard). Gracefully handles errors per-request without
/// crashing the server. The device list is refreshed in the background for
/// as long as the server runs.
pub fn serve(config: &DevwatchConfig, addr: Option<&str>) -> Result<()> {
    let addr = addr.unwrap_or(&config.server.bind_addr).to_string();
    let server = bind(&addr)?;

    let api: Arc<dyn DeviceApi> = Arc::new(HttpClient::from_config(&config.general));
    let app = App::new(api, config.clone());

    let refresher = {
        let cache = app.devices.clone();
        let api = Arc::clone(&app.api);
        Poller::start(
            "device-list",
            Duration::from_secs(config.refresh.devices_secs.max(1)),
            move || {
                cache.refresh(api.as_ref());
                Ok(())
            },
        )?
    };

    let url = format!("http://{addr}");
    println!("devwatch dashboard running at {url}");
    println!("Monitoring server: {}", config.general.api_base_url);
    println!("Press Ctrl+C to stop.\n");

    if config.server.open_browser
        && let Err(e) = open_browser(&url)
    {
        warn!(error = %e, "could not open browser");
    }

    run(&server, &app);
    refresher.stop();
    Ok(())
}

/// Bind the listener without starting the request loop.
pub fn bind(addr: &str) -> Result<Server> {
    Server::http(addr).map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))
}

/// Serve requests until the listener shuts down.
pub fn run(server: &Server, app: &App) {
    for request in server.incoming_requests() {
        let started = Instant::now();
        let method = request.method().clone();
        let url = request.url().to_string();

        let reply = match dispatch(app, &method, &url) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%method, %url, error = %e, "request failed");
                Reply::error(500, &e.to_string())
            }
        };
        let status = reply.status;

        if let Err(e) = request.respond(reply.into_response()) {
            warn!(%url, error = %e, "failed to write response");
        }

        // Brief access log
        info!(
            %method,
            %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch(app: &App, method: &Method, url: &str) -> Result<Reply> {
    if *method != Method::Get {
        return Ok(not_found());
    }

    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match path {
        // Pages
        "/" | "/index.html" => Ok(api::overview_page(app)),
        "/devices" => api::devices_page(app, url),
        "/reports" => Ok(api::reports_page(app)),

        // Fragments
        "/fragments/overview" => Ok(api::overview_fragment(app)),
        "/fragments/devices" => api::devices_fragment(app, url),
        "/fragments/reports/quick" => Ok(api::quick_stats_fragment(app)),
        "/fragments/reports/generate" => api::report_fragment(app, url),

        // Liveness
        "/healthz" => Ok(api::healthz(app)),

        _ => match DEVICE_PATH_RE.captures(path) {
            Some(caps) => {
                // Ids that are not valid UTF-8 once decoded cannot exist upstream.
                let Ok(id) = urlencoding::decode(&caps[2]) else {
                    return Ok(not_found());
                };
                if caps.get(1).is_some() {
                    Ok(api::device_fragment(app, &id))
                } else {
                    Ok(api::device_page(app, &id))
                }
            }
            None => Ok(not_found()),
        },
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// 404 response.
fn not_found() -> Reply {
    Reply::error(404, "not found")
}

fn content_type(value: &str) -> Header {
    Header::from_bytes("Content-Type", value).expect("static content type header is valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::model::Device;

    fn app(api: MockApi) -> App {
        App::new(Arc::new(api), DevwatchConfig::default())
    }

    fn get(app: &App, url: &str) -> Reply {
        dispatch(app, &Method::Get, url).unwrap()
    }

    fn fleet() -> MockApi {
        MockApi::new().with_device(Device {
            device_id: "dev 1".into(),
            hostname: "alpha".into(),
            is_active: true,
            ..Default::default()
        })
    }

    #[test]
    fn unknown_path_is_json_404() {
        let reply = get(&app(MockApi::new()), "/nope");
        assert_eq!(reply.status, 404);
        assert!(reply.content_type.starts_with("application/json"));
        assert!(reply.body.contains("not found"));
    }

    #[test]
    fn non_get_is_rejected() {
        let reply = dispatch(&app(MockApi::new()), &Method::Post, "/").unwrap();
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn device_path_is_percent_decoded() {
        let app = app(fleet());
        let reply = get(&app, "/devices/dev%201");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("device-content"));
        assert!(reply.body.contains("alpha"));
    }

    #[test]
    fn device_path_with_invalid_utf8_is_404() {
        assert_eq!(get(&app(fleet()), "/devices/%FF").status, 404);
    }

    #[test]
    fn device_fragment_for_unknown_id_is_error_state() {
        let reply = get(&app(fleet()), "/fragments/devices/ghost");
        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("error-state"));
        assert!(!reply.body.contains("<html"));
    }

    #[test]
    fn nested_device_paths_do_not_match() {
        assert_eq!(get(&app(fleet()), "/devices/a/b").status, 404);
    }

    #[test]
    fn healthz_reports_ok() {
        let reply = get(&app(MockApi::new()), "/healthz");
        assert_eq!(reply.status, 200);
        let v: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(v["status"], "ok");
    }
}
