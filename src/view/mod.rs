//! Pure view tree for every dashboard page.
//!
//! Pages build a [`Node`] tree and serialize it with [`Node::render`]. There
//! is no raw-markup node: every string that reaches the output, text or
//! attribute, passes through [`escape`]. That makes it impossible for a
//! hostname such as `<script>` to be emitted as markup.

pub mod chart;

use std::fmt::Write as _;

use crate::model::{Device, EventType};

/// Elements that never carry children.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape text for HTML text and attribute contexts.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node in the rendered view.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<Node>,
    },
    Text(String),
}

impl Node {
    pub fn el(tag: &'static str) -> Self {
        Self::Element {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Add an attribute. No-op on text nodes.
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr("id", value)
    }

    pub fn child(mut self, node: Node) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    /// Convenience: append a text child.
    pub fn push_text(self, s: impl Into<String>) -> Self {
        self.child(Node::text(s))
    }

    /// Serialize to HTML.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Self::Text(s) => out.push_str(&escape(s)),
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                if VOID_TAGS.contains(tag) {
                    out.push_str(">");
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_to(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    /// Concatenated text content, for assertions and terminal output.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Element { children, .. } => children.iter().map(Node::text_content).collect(),
        }
    }

    /// Depth-first search for an element with the given `id` attribute.
    pub fn find_by_id(&self, wanted: &str) -> Option<&Node> {
        match self {
            Self::Text(_) => None,
            Self::Element {
                attrs, children, ..
            } => {
                if attrs.iter().any(|(k, v)| *k == "id" && v == wanted) {
                    return Some(self);
                }
                children.iter().find_map(|c| c.find_by_id(wanted))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared building blocks
// ---------------------------------------------------------------------------

pub fn badge(class: &str, label: impl Into<String>) -> Node {
    Node::el("span")
        .class(format!("badge {class}"))
        .push_text(label)
}

/// Wording used for the status badge on a given page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWording {
    /// `● Active` / `○ Inactive`
    ActiveInactive,
    /// `● Online` / `○ Offline`
    OnlineOffline,
    /// `Active` / `Inactive` without the dot.
    Plain,
}

/// Status badge: success variant for active devices, danger otherwise.
pub fn status_badge(is_active: bool, wording: StatusWording) -> Node {
    let class = if is_active {
        "badge-success"
    } else {
        "badge-danger"
    };
    let label = match (wording, is_active) {
        (StatusWording::ActiveInactive, true) => "● Active",
        (StatusWording::ActiveInactive, false) => "○ Inactive",
        (StatusWording::OnlineOffline, true) => "● Online",
        (StatusWording::OnlineOffline, false) => "○ Offline",
        (StatusWording::Plain, true) => "Active",
        (StatusWording::Plain, false) => "Inactive",
    };
    badge(class, label)
}

/// Badge for a power event type.
pub fn event_badge(event: &EventType) -> Node {
    let (class, label) = match event {
        EventType::Startup => ("badge-success", "🟢 STARTUP"),
        EventType::Shutdown => ("badge-danger", "🔴 SHUTDOWN"),
        EventType::Sleep => ("badge-info", "😴 SLEEP"),
        EventType::Wake => ("badge-warning", "⏰ WAKE"),
        EventType::BatteryCharging => ("badge-success", "🔌 CHARGING"),
        EventType::BatteryUnplugged => ("badge-warning", "🔋 UNPLUGGED"),
        EventType::BatteryFull => ("badge-success", "✅ BATTERY FULL"),
        EventType::BatteryLow => ("badge-warning", "⚠️ BATTERY LOW"),
        EventType::BatteryCritical => ("badge-danger", "🚨 BATTERY CRITICAL"),
        EventType::Other(raw) => return badge("badge-info", raw.clone()),
    };
    badge(class, label)
}

pub fn platform_badge(device: &Device) -> Node {
    badge("badge-info", device.platform_or_unknown())
}

/// A `<table>` with a header row and the given body rows.
pub fn table(class: &str, headers: &[&str], rows: Vec<Node>) -> Node {
    let head = Node::el("thead").child(
        Node::el("tr").children(headers.iter().map(|h| Node::el("th").push_text(*h))),
    );
    Node::el("table")
        .class(class.to_string())
        .child(head)
        .child(Node::el("tbody").children(rows))
}

/// A table row from plain cells.
pub fn row(cells: Vec<Node>) -> Node {
    Node::el("tr").children(cells.into_iter().map(|c| Node::el("td").child(c)))
}

/// The single placeholder row shown for an empty table body.
pub fn empty_row(colspan: usize, message: &str) -> Node {
    Node::el("tr").child(
        Node::el("td")
            .attr("colspan", colspan.to_string())
            .class("text-center text-muted empty-row")
            .push_text(message),
    )
}

/// The placeholder card shown for an empty grid.
pub fn empty_card(message: &str) -> Node {
    Node::el("div")
        .class("empty-state")
        .child(Node::el("p").push_text(message))
}

/// Inline error card.
pub fn error_card(message: &str) -> Node {
    Node::el("div")
        .class("error-card")
        .child(Node::el("p").push_text(format!("❌ {message}")))
}

/// A labelled value: `<p><strong>Label:</strong> value</p>`.
pub fn labelled(label: &str, value: impl Into<String>) -> Node {
    Node::el("p")
        .child(Node::el("strong").push_text(format!("{label}:")))
        .push_text(format!(" {}", value.into()))
}

/// A stat card: large value over a caption.
pub fn stat_card(id: &str, caption: &str, value: impl Into<String>) -> Node {
    Node::el("div")
        .class("stat-card")
        .child(Node::el("div").class("stat-value").id(id).push_text(value))
        .child(Node::el("div").class("stat-label").push_text(caption))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
