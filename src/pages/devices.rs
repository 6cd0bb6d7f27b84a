//! Device grid (`/devices`) with search and status filter.

use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use super::PageState;
use crate::api::DeviceApi;
use crate::format;
use crate::model::Device;
use crate::view::{self, Node, StatusWording};

/// Status filter buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn matches(self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::Active => device.is_active,
            Self::Inactive => !device.is_active,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => anyhow::bail!("unknown filter '{other}' (expected all, active or inactive)"),
        }
    }
}

/// The currently known device list.
///
/// Shared between the background refresher and request handlers. Each
/// refresh replaces the whole list; there is no merging.
#[derive(Debug, Clone, Default)]
pub struct DeviceCache {
    inner: Arc<RwLock<PageState<Vec<Device>>>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&self, api: &dyn DeviceApi) {
        let next = PageState::from_api(api.devices(), "device list");
        self.replace(next);
    }

    pub fn replace(&self, state: PageState<Vec<Device>>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn snapshot(&self) -> PageState<Vec<Device>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Devices matching both the search text and the status filter.
///
/// An empty (or all-whitespace) query matches everything.
pub fn visible(devices: &[Device], query: &str, filter: StatusFilter) -> Vec<Device> {
    let query = query.trim();
    devices
        .iter()
        .filter(|d| filter.matches(d))
        .filter(|d| query.is_empty() || d.matches_query(query))
        .cloned()
        .collect()
}

/// Controller for the device grid.
#[derive(Debug, Clone, Default)]
pub struct DevicesPage {
    pub cache: DeviceCache,
}

impl DevicesPage {
    pub fn new(cache: DeviceCache) -> Self {
        Self { cache }
    }

    pub fn refresh(&self, api: &dyn DeviceApi) {
        self.cache.refresh(api);
    }

    pub fn render(&self, query: &str, filter: StatusFilter) -> Node {
        let grid = Node::el("div").class("devices-grid").id("devices-grid");
        match self.cache.snapshot() {
            PageState::Loading => grid.child(super::loading_placeholder("Loading devices...")),
            PageState::Error(_) => grid.child(view::error_card(
                "Failed to load devices. Make sure the server is running!",
            )),
            PageState::Loaded(devices) => {
                let shown = visible(&devices, query, filter);
                if shown.is_empty() {
                    grid.child(view::empty_card(
                        "📭 No devices found. Start the agent to register a device!",
                    ))
                } else {
                    grid.children(shown.iter().map(device_card))
                }
            }
        }
    }
}

fn device_card(device: &Device) -> Node {
    let state = if device.is_active { "active" } else { "inactive" };
    Node::el("div")
        .class(format!("device-card {state}"))
        .child(
            Node::el("div")
                .class("device-header")
                .child(Node::el("h3").push_text(format!("🖥️ {}", device.hostname)))
                .child(view::status_badge(device.is_active, StatusWording::OnlineOffline)),
        )
        .child(
            Node::el("div")
                .class("device-body")
                .child(view::labelled("Device ID", device.device_id.clone()))
                .child(view::labelled("Platform", device.platform_or_unknown()))
                .child(view::labelled(
                    "Last Seen",
                    format::format_datetime(device.last_seen.as_deref()),
                ))
                .child(view::labelled(
                    "Registered",
                    format::format_datetime(device.created_at.as_deref()),
                )),
        )
        .child(
            Node::el("div").class("device-footer").child(
                Node::el("a")
                    .class("btn btn-primary btn-sm")
                    .attr("href", format!("/devices/{}", urlencoding::encode(&device.device_id)))
                    .push_text("View Details"),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;

    fn device(id: &str, host: &str, platform: &str, active: bool) -> Device {
        Device {
            device_id: id.into(),
            hostname: host.into(),
            platform: Some(platform.into()),
            is_active: active,
            ..Default::default()
        }
    }

    fn fleet() -> MockApi {
        MockApi::new()
            .with_device(device("dev-001", "Office-PC", "Windows", true))
            .with_device(device("dev-002", "build-box", "Linux", false))
            .with_device(device("mac-7", "studio", "Darwin", true))
    }

    #[test]
    fn card_links_encode_device_id() {
        let page = DevicesPage::default();
        page.cache
            .replace(PageState::Loaded(vec![device("a b/c", "odd", "Linux", true)]));
        let html = page.render("", StatusFilter::All).render();
        assert!(html.contains("href=\"/devices/a%20b%2Fc\""));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let page = DevicesPage::default();
        page.refresh(&fleet());
        let PageState::Loaded(all) = page.cache.snapshot() else {
            panic!("not loaded");
        };
        assert_eq!(visible(&all, "office", StatusFilter::All).len(), 1);
        assert_eq!(visible(&all, "DEV-00", StatusFilter::All).len(), 2);
        assert_eq!(visible(&all, "linux", StatusFilter::All).len(), 1);
        assert_eq!(visible(&all, "", StatusFilter::All).len(), 3);
    }

    #[test]
    fn filter_combines_with_search() {
        let page = DevicesPage::default();
        page.refresh(&fleet());
        let PageState::Loaded(all) = page.cache.snapshot() else {
            panic!("not loaded");
        };
        assert_eq!(visible(&all, "", StatusFilter::Active).len(), 2);
        assert_eq!(visible(&all, "", StatusFilter::Inactive).len(), 1);
        assert!(visible(&all, "office", StatusFilter::Inactive).is_empty());
    }

    #[test]
    fn no_match_shows_empty_state() {
        let page = DevicesPage::default();
        page.refresh(&fleet());
        let html = page.render("zzz-nothing", StatusFilter::All).render();
        assert!(html.contains("empty-state"));
        assert!(!html.contains("error-card"));
    }

    #[test]
    fn status_badges_follow_activity() {
        let page = DevicesPage::default();
        page.refresh(&fleet());
        let html = page.render("build-box", StatusFilter::All).render();
        assert!(html.contains("badge-danger"));
        assert!(html.contains("○ Offline"));
        assert!(!html.contains("● Online"));
    }

    #[test]
    fn refresh_overwrites_cache_wholesale() {
        let cache = DeviceCache::new();
        cache.refresh(&fleet());
        cache.refresh(&MockApi::new().with_device(device("only", "solo", "Linux", true)));
        let PageState::Loaded(devices) = cache.snapshot() else {
            panic!("not loaded");
        };
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id, "only");
    }

    #[test]
    fn failed_refresh_renders_error_card() {
        let page = DevicesPage::default();
        page.refresh(&fleet().failing("devices"));
        let html = page.render("", StatusFilter::All).render();
        assert!(html.contains("❌ Failed to load devices"));
    }

    #[test]
    fn parse_filter() {
        assert_eq!("Active".parse::<StatusFilter>().unwrap(), StatusFilter::Active);
        assert_eq!("".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert!("maybe".parse::<StatusFilter>().is_err());
    }
}
