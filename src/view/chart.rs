//! Line-series chart widgets.
//!
//! A [`LineChart`] owns its label and data arrays and is updated in place on
//! every refresh. Rendering is a plain SVG polyline on a fixed 0–100 % scale:
//! no smoothing, interpolation or gap filling, so a device that reported
//! fewer samples simply gets a shorter line.

use std::fmt::Write as _;

use anyhow::Result;
use tracing::debug;

use super::{Node, empty_card};
use crate::api::DeviceApi;
use crate::format;
use crate::model::StatSample;

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 200.0;
const PAD: f64 = 24.0;

/// Which sample field a chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    Disk,
}

impl Metric {
    pub fn value(self, sample: &StatSample) -> f64 {
        match self {
            Self::Cpu => sample.cpu_percent,
            Self::Memory => sample.memory_percent,
            Self::Disk => sample.disk_percent,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Cpu => "CPU Usage (%)",
            Self::Memory => "Memory Usage (%)",
            Self::Disk => "Disk Usage (%)",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Cpu => "rgb(37, 99, 235)",
            Self::Memory => "rgb(124, 58, 237)",
            Self::Disk => "rgb(16, 185, 129)",
        }
    }
}

/// One line-series widget.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub metric: Metric,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    /// Bumped on every update; the redraw trigger.
    pub revision: u64,
}

impl LineChart {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            labels: Vec::new(),
            data: Vec::new(),
            revision: 0,
        }
    }

    /// Replace labels and data from newest-first samples.
    ///
    /// Samples are reversed so the series runs oldest to newest. An empty
    /// slice leaves the previous series in place.
    pub fn update(&mut self, newest_first: &[StatSample]) {
        if newest_first.is_empty() {
            return;
        }
        self.labels.clear();
        self.data.clear();
        for sample in newest_first.iter().rev() {
            self.labels
                .push(format::format_time(sample.timestamp.as_deref()));
            self.data.push(self.metric.value(sample));
        }
        self.revision += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Polyline `points` attribute, y inverted so 100 % is at the top.
    fn points(&self) -> String {
        let n = self.data.len();
        let plot_w = WIDTH - 2.0 * PAD;
        let plot_h = HEIGHT - 2.0 * PAD;
        let step = if n > 1 { plot_w / (n - 1) as f64 } else { 0.0 };

        let mut out = String::new();
        for (i, v) in self.data.iter().enumerate() {
            let clamped = v.clamp(0.0, 100.0);
            let x = PAD + step * i as f64;
            let y = PAD + plot_h * (1.0 - clamped / 100.0);
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{x:.1},{y:.1}");
        }
        out
    }

    /// Render as a titled card containing an inline SVG.
    pub fn render(&self, dom_id: &str) -> Node {
        let title = Node::el("h3").push_text(self.metric.title());
        let card = Node::el("div")
            .class("chart-card")
            .id(dom_id)
            .attr("data-revision", self.revision.to_string())
            .child(title);

        if self.is_empty() {
            return card.child(empty_card(format::NO_DATA));
        }

        let axis = Node::el("polyline")
            .attr(
                "points",
                format!(
                    "{PAD},{PAD} {PAD},{} {},{}",
                    HEIGHT - PAD,
                    WIDTH - PAD,
                    HEIGHT - PAD
                ),
            )
            .attr("fill", "none")
            .attr("stroke", "#cbd5e1");
        let line = Node::el("polyline")
            .class("series")
            .attr("points", self.points())
            .attr("fill", "none")
            .attr("stroke", self.metric.color())
            .attr("stroke-width", "2");
        let top = Node::el("text")
            .attr("x", "2")
            .attr("y", format!("{}", PAD + 4.0))
            .attr("font-size", "10")
            .push_text("100%");
        let bottom = Node::el("text")
            .attr("x", "2")
            .attr("y", format!("{}", HEIGHT - PAD))
            .attr("font-size", "10")
            .push_text("0%");

        let mut svg = Node::el("svg")
            .attr("viewBox", format!("0 0 {WIDTH} {HEIGHT}"))
            .attr("preserveAspectRatio", "none")
            .attr("role", "img")
            .attr("aria-label", self.metric.title())
            .child(axis)
            .child(line)
            .child(top)
            .child(bottom);

        if let (Some(first), Some(last)) = (self.labels.first(), self.labels.last()) {
            svg = svg
                .child(
                    Node::el("text")
                        .attr("x", format!("{PAD}"))
                        .attr("y", format!("{}", HEIGHT - 6.0))
                        .attr("font-size", "10")
                        .push_text(first.clone()),
                )
                .child(
                    Node::el("text")
                        .attr("x", format!("{}", WIDTH - PAD))
                        .attr("y", format!("{}", HEIGHT - 6.0))
                        .attr("font-size", "10")
                        .attr("text-anchor", "end")
                        .push_text(last.clone()),
                );
        }

        card.child(svg)
    }
}

/// The per-page group of charts fed from one stats fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub cpu: LineChart,
    pub memory: LineChart,
    pub disk: Option<LineChart>,
}

impl ChartSet {
    /// CPU and memory only (overview page).
    pub fn cpu_memory() -> Self {
        Self {
            cpu: LineChart::new(Metric::Cpu),
            memory: LineChart::new(Metric::Memory),
            disk: None,
        }
    }

    /// CPU, memory and disk (device detail page).
    pub fn with_disk() -> Self {
        Self {
            disk: Some(LineChart::new(Metric::Disk)),
            ..Self::cpu_memory()
        }
    }

    pub fn update(&mut self, newest_first: &[StatSample]) {
        self.cpu.update(newest_first);
        self.memory.update(newest_first);
        if let Some(disk) = &mut self.disk {
            disk.update(newest_first);
        }
    }

    /// Fetch the latest `limit` samples for a device and update every widget.
    pub fn refresh(&mut self, api: &dyn DeviceApi, device_id: &str, limit: u32) -> Result<()> {
        let samples = api.stats(device_id, limit)?;
        debug!(device_id, samples = samples.len(), "chart refresh");
        self.update(&samples);
        Ok(())
    }

    pub fn render(&self, id_prefix: &str) -> Node {
        let mut grid = Node::el("div")
            .class("charts-grid")
            .child(self.cpu.render(&format!("{id_prefix}cpu-chart")))
            .child(self.memory.render(&format!("{id_prefix}memory-chart")));
        if let Some(disk) = &self.disk {
            grid = grid.child(disk.render(&format!("{id_prefix}disk-chart")));
        }
        grid
    }
}
