/// End-to-end HTTP tests.
///
/// A throwaway `tiny_http` server stands in for the monitoring backend so
/// the `ureq` client is exercised against real sockets, and the dashboard
/// server itself is started on an ephemeral port and queried over HTTP.
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use devwatch::api::{ApiError, DeviceApi, HttpClient};
use devwatch::api::mock::MockApi;
use devwatch::config::schema::DevwatchConfig;
use devwatch::model::{Device, EventType};
use devwatch::web;
use tiny_http::{Header, Response, Server};

// ---------------------------------------------------------------------------
// Fake monitoring backend
// ---------------------------------------------------------------------------

struct Backend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    fn start() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            for request in server.incoming_requests() {
                let url = request.url().to_string();
                log.lock().unwrap().push(url.clone());
                let path = url.split('?').next().unwrap_or("").to_string();
                let (status, body) = route(&path);
                let json = Header::from_bytes("Content-Type", "application/json").unwrap();
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(json);
                let _ = request.respond(response);
            }
        });

        Self { addr, requests }
    }

    fn client(&self) -> HttpClient {
        HttpClient::new(&format!("http://{}", self.addr), Duration::from_secs(2))
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn route(path: &str) -> (u16, &'static str) {
    match path {
        "/api/v1/devices" => (
            200,
            r#"{"devices":[{"device_id":"d1","hostname":"alpha","platform":"Linux","is_active":true},
                           {"device_id":"d 2","hostname":"beta","is_active":false}]}"#,
        ),
        "/api/v1/devices/d1" => (
            200,
            r#"{"device":{"device_id":"d1","hostname":"alpha","is_active":true}}"#,
        ),
        "/api/v1/devices/d%202" => (
            200,
            r#"{"device":{"device_id":"d 2","hostname":"beta","is_active":false}}"#,
        ),
        "/api/v1/devices/d1/stats" => (
            200,
            r#"{"stats":[{"timestamp":"2025-01-15T10:00:00","cpu_percent":null,"memory_percent":40.5,"disk_percent":70,"uptime":3600}]}"#,
        ),
        "/api/v1/devices/d1/power_events" => (
            200,
            r#"{"events":[{"timestamp":"2025-01-15T09:00:00","event_type":"WAKE"},
                          {"timestamp":"2025-01-15T08:00:00","event_type":"LID_CLOSED","details":"x"}],
                "total":7}"#,
        ),
        "/api/v1/health" => (200, "this is not json"),
        "/dashboard/api/stats" => (500, r#"{"error":"boom"}"#),
        _ => (404, r#"{"error":"not found"}"#),
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

#[test]
fn client_decodes_device_envelopes() {
    let backend = Backend::start();
    let devices = backend.client().devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].hostname, "alpha");
    assert_eq!(devices[1].platform, None);
    assert!(!devices[1].is_active);
}

#[test]
fn client_encodes_device_id_in_path() {
    let backend = Backend::start();
    let device = backend.client().device("d 2").unwrap();
    assert_eq!(device.hostname, "beta");
    assert!(backend.requests().contains(&"/api/v1/devices/d%202".to_string()));
}

#[test]
fn client_sends_limit_and_tolerates_null_metrics() {
    let backend = Backend::start();
    let stats = backend.client().stats("d1", 20).unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].cpu_percent, 0.0);
    assert_eq!(stats[0].memory_percent, 40.5);
    assert_eq!(stats[0].uptime, Some(3600.0));
    assert!(
        backend
            .requests()
            .contains(&"/api/v1/devices/d1/stats?limit=20".to_string())
    );
}

#[test]
fn client_keeps_server_total_and_unknown_event_types() {
    let backend = Backend::start();
    let page = backend.client().power_events("d1", 1000).unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.events[0].event_type, EventType::Wake);
    assert_eq!(
        page.events[1].event_type,
        EventType::Other("LID_CLOSED".into())
    );
}

#[test]
fn client_maps_404_to_not_found() {
    let backend = Backend::start();
    let err = backend.client().device("ghost").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.user_message(), "The monitoring server has no such resource");
}

#[test]
fn client_maps_error_status_and_bad_json() {
    let backend = Backend::start();
    let client = backend.client();
    assert!(matches!(
        client.dashboard_stats(),
        Err(ApiError::Status { status: 500, .. })
    ));
    assert!(matches!(client.health(), Err(ApiError::Decode { .. })));
}

#[test]
fn client_reports_unreachable_backend() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpClient::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1));
    let err = client.devices().unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
    assert!(err.user_message().contains("Make sure it is running"));
}

// ---------------------------------------------------------------------------
// Dashboard server
// ---------------------------------------------------------------------------

fn start_dashboard(api: impl DeviceApi + 'static) -> SocketAddr {
    let server = web::bind("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let app = web::App::new(Arc::new(api), DevwatchConfig::default());
    thread::spawn(move || web::run(&server, &app));
    addr
}

fn get(addr: SocketAddr, path: &str) -> (u16, String, String) {
    match ureq::get(&format!("http://{addr}{path}")).call() {
        Ok(resp) => {
            let ct = resp.content_type().to_string();
            (resp.status(), ct, resp.into_string().unwrap())
        }
        Err(ureq::Error::Status(code, resp)) => {
            let ct = resp.content_type().to_string();
            (code, ct, resp.into_string().unwrap())
        }
        Err(e) => panic!("request failed: {e}"),
    }
}

fn fleet() -> MockApi {
    MockApi::new()
        .with_device(Device {
            device_id: "d1".into(),
            hostname: "alpha".into(),
            is_active: true,
            ..Default::default()
        })
        .with_device(Device {
            device_id: "d2".into(),
            hostname: "<b>beta</b>".into(),
            is_active: false,
            ..Default::default()
        })
}

#[test]
fn dashboard_serves_pages_over_http() {
    let addr = start_dashboard(fleet());

    let (status, ct, body) = get(addr, "/");
    assert_eq!(status, 200);
    assert_eq!(ct, "text/html");
    assert!(body.contains("overview-content"));

    let (status, _, body) = get(addr, "/devices");
    assert_eq!(status, 200);
    assert!(body.contains("alpha"));
    assert!(body.contains("&lt;b&gt;beta&lt;/b&gt;"));
    assert!(!body.contains("<b>beta"));
}

#[test]
fn dashboard_fragments_and_errors_over_http() {
    let addr = start_dashboard(fleet());

    let (status, _, body) = get(addr, "/fragments/devices?filter=active&q=ALP");
    assert_eq!(status, 200);
    assert!(body.contains("alpha"));
    assert!(!body.contains("beta"));
    assert!(!body.contains("<html"));

    let (status, _, _) = get(addr, "/devices/ghost");
    assert_eq!(status, 404);

    let (status, ct, body) = get(addr, "/missing");
    assert_eq!(status, 404);
    assert_eq!(ct, "application/json");
    assert!(body.contains("not found"));

    let (status, _, body) = get(addr, "/healthz");
    assert_eq!(status, 200);
    assert!(body.contains("\"status\":\"ok\""));
}
