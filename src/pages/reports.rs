//! Reports page (`/reports`): quick stats plus on-demand reports.

use super::PageState;
use crate::api::DeviceApi;
use crate::config::schema::ReportsConfig;
use crate::report::{self, DateRange, QuickStats, Report, ReportKind};
use crate::view::{self, Node};

#[derive(Debug, Clone)]
pub struct ReportsPage {
    pub quick: PageState<QuickStats>,
    /// `None` until a report has been requested.
    pub report: Option<PageState<Report>>,
    options: ReportsConfig,
}

impl ReportsPage {
    pub fn new(options: ReportsConfig) -> Self {
        Self {
            quick: PageState::Loading,
            report: None,
            options,
        }
    }

    /// Reload the quick stats cards.
    pub fn refresh(&mut self, api: &dyn DeviceApi) {
        self.quick = PageState::from_anyhow(
            report::quick_stats(api, self.options.concurrency),
            "quick stats",
        );
    }

    pub fn generate(&mut self, api: &dyn DeviceApi, kind: ReportKind, range: DateRange) {
        self.report = Some(PageState::from_anyhow(
            report::generate(api, kind, range, &self.options),
            "report",
        ));
    }

    pub fn render_quick(&self) -> Node {
        self.quick
            .render_with("Loading statistics...", QuickStats::render)
    }

    pub fn render_report(&self) -> Node {
        let body = match &self.report {
            None => view::empty_card("Choose a report type and date range, then generate."),
            Some(PageState::Loading) => super::loading_placeholder("Generating report..."),
            Some(PageState::Error(msg)) => view::error_card(&format!(
                "Failed to generate report: {msg}"
            )),
            Some(PageState::Loaded(report)) => report.render(),
        };
        Node::el("div").id("report-display").child(body)
    }

    pub fn render(&self) -> Node {
        Node::el("div")
            .id("reports-content")
            .child(Node::el("div").id("quick-stats-region").child(self.render_quick()))
            .child(self.render_report())
    }
}
