//! Page controllers.
//!
//! One controller per dashboard route. Each owns its state explicitly,
//! refreshes it from a [`DeviceApi`](crate::api::DeviceApi) and renders it to
//! a [`Node`] tree. The web layer and the CLI both drive these; neither
//! keeps any page state of its own.

pub mod detail;
pub mod devices;
pub mod overview;
pub mod reports;

use tracing::warn;

use crate::api::ApiError;
use crate::view::{self, Node};

pub use detail::DeviceDetailPage;
pub use devices::{DeviceCache, DevicesPage, StatusFilter};
pub use overview::OverviewPage;
pub use reports::ReportsPage;

/// Observable state of one page region.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageState<T> {
    #[default]
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> PageState<T> {
    /// Turn a fetch result into a state, logging the failure.
    pub fn from_api(result: Result<T, ApiError>, what: &str) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(e) => {
                warn!(region = what, error = %e, "fetch failed");
                Self::Error(e.user_message())
            }
        }
    }

    /// Same as [`from_api`](Self::from_api) for composite fetches.
    pub fn from_anyhow(result: anyhow::Result<T>, what: &str) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(e) => {
                warn!(region = what, error = %e, "fetch failed");
                Self::Error(error_message(&e))
            }
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Render the region: placeholder, inline error, or `content`.
    pub fn render_with(&self, loading: &str, content: impl FnOnce(&T) -> Node) -> Node {
        match self {
            Self::Loading => loading_placeholder(loading),
            Self::Error(msg) => view::error_card(msg),
            Self::Loaded(v) => content(v),
        }
    }
}

/// User-facing text for an error, preferring the API's own wording.
pub fn error_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ApiError>() {
        Some(api) => api.user_message(),
        None => e.to_string(),
    }
}

pub fn loading_placeholder(message: &str) -> Node {
    Node::el("div")
        .class("loading")
        .child(Node::el("p").push_text(message))
}
