//! Embedded HTML/CSS/JS shell for the devwatch dashboard.
//!
//! Everything is compiled into the binary. No external assets, no build
//! tools, no CDN dependencies. Page bodies come from the escaped view tree;
//! only the static style and script constants below are emitted raw.

use crate::pages::StatusFilter;
use crate::report::{DateRange, ReportKind};
use crate::view::{Node, escape};

/// The auto-refreshing part of a page.
pub struct Region {
    /// Fragment endpoint polled to replace `content`.
    pub fragment_url: String,
    pub refresh_secs: u64,
    pub content: Node,
}

const NAV: &[(&str, &str)] = &[
    ("/", "📊 Dashboard"),
    ("/devices", "🖥️ Devices"),
    ("/reports", "📈 Reports"),
];

/// Wrap a page body in the document shell.
///
/// `before` and `after` sit outside the refresh region, so their state
/// (search text, report selection) survives a refresh.
pub fn shell(
    title: &str,
    active: &str,
    before: Option<Node>,
    region: Region,
    after: Option<Node>,
) -> String {
    let nav = Node::el("nav").children(NAV.iter().map(|(href, label)| {
        let link = Node::el("a").attr("href", *href).push_text(*label);
        if *href == active {
            link.class("active")
        } else {
            link
        }
    }));

    let header = Node::el("header")
        .child(
            Node::el("h1")
                .child(Node::el("span").class("logo").push_text("devwatch"))
                .push_text(" Device Monitor"),
        )
        .child(Node::el("span").class("subtitle").id("last-updated"));

    let main = Node::el("main")
        .id("content")
        .attr("data-fragment", region.fragment_url)
        .attr("data-refresh-ms", (region.refresh_secs.max(1) * 1000).to_string())
        .child(region.content);

    let app = Node::el("div")
        .class("app")
        .child(header)
        .child(nav)
        .children(before)
        .child(main)
        .children(after);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{}\n<script>{SCRIPT}</script>\n</body>\n</html>",
        escape(title),
        app.render()
    )
}

/// Search box and status filter buttons for the device grid.
pub fn device_controls(query: &str, filter: StatusFilter) -> Node {
    let search = Node::el("input")
        .id("search-input")
        .attr("type", "search")
        .attr("placeholder", "Search by hostname, ID or platform...")
        .attr("data-param", "q")
        .attr("value", query);
    let hidden = Node::el("input")
        .id("filter-input")
        .attr("type", "hidden")
        .attr("data-param", "filter")
        .attr("value", filter.as_str());

    let buttons = [StatusFilter::All, StatusFilter::Active, StatusFilter::Inactive]
        .into_iter()
        .map(|f| {
            let label = match f {
                StatusFilter::All => "All",
                StatusFilter::Active => "Online",
                StatusFilter::Inactive => "Offline",
            };
            let class = if f == filter { "btn filter-btn active" } else { "btn filter-btn" };
            Node::el("button")
                .class(class)
                .attr("type", "button")
                .attr("data-filter", f.as_str())
                .push_text(label)
        });

    Node::el("div")
        .class("controls")
        .child(search)
        .child(hidden)
        .child(Node::el("div").class("filter-group").children(buttons))
}

/// Report type / date range selectors and the generate button.
pub fn report_form() -> Node {
    let kinds: Vec<(&str, &str)> = ReportKind::ALL.iter().map(|k| (k.as_str(), k.label())).collect();
    let ranges: Vec<(&str, &str)> = [DateRange::Today, DateRange::Week, DateRange::Month, DateRange::All]
        .iter()
        .map(|r| (r.as_str(), r.label()))
        .collect();
    let select = |id: &'static str, options: &[(&'static str, &'static str)], selected: &str| {
        Node::el("select").id(id).children(options.iter().map(|(value, label)| {
            let opt = Node::el("option").attr("value", *value).push_text(*label);
            if *value == selected {
                opt.attr("selected", "selected")
            } else {
                opt
            }
        }))
    };

    Node::el("section")
        .class("card report-form")
        .child(Node::el("h2").push_text("📑 Generate Report"))
        .child(
            Node::el("label")
                .push_text("Report type ")
                .child(select("report-type", &kinds, "usage")),
        )
        .child(
            Node::el("label")
                .push_text("Date range ")
                .child(select("date-range", &ranges, "week")),
        )
        .child(
            Node::el("button")
                .class("btn btn-primary")
                .id("generate-report")
                .attr("type", "button")
                .push_text("Generate"),
        )
        .child(
            Node::el("div")
                .id("report-display")
                .child(
                    Node::el("div")
                        .class("empty-state")
                        .child(Node::el("p").push_text("Choose a report type and date range, then generate.")),
                ),
        )
}

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --purple: #bc8cff;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

/* Layout */
.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); font-weight: 700; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

/* Navigation */
nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav a {
  flex: 1;
  padding: 8px 16px;
  border-radius: 6px;
  color: var(--text-muted);
  text-align: center;
  text-decoration: none;
  font-weight: 500;
}
nav a:hover { color: var(--text); background: rgba(255,255,255,0.04); }
nav a.active { background: var(--accent); color: #fff; }

/* Cards */
.card, .chart-card, .device-card, .stat-card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }
.card h3, .chart-card h3 { font-size: 14px; font-weight: 600; margin-bottom: 12px; color: var(--text-muted); }

.stats-grid, .charts-grid, .devices-grid, .detail-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
  gap: 16px;
  margin-bottom: 24px;
}
.charts-grid { grid-template-columns: repeat(auto-fit, minmax(360px, 1fr)); }
.detail-grid { grid-template-columns: repeat(auto-fit, minmax(360px, 1fr)); }

.stat-card { text-align: center; }
.stat-value { font-size: 28px; font-weight: 700; font-family: var(--mono); color: var(--accent); }
.stat-label { font-size: 12px; color: var(--text-muted); text-transform: uppercase; letter-spacing: 0.5px; }

.device-card.inactive { opacity: 0.75; }
.device-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 12px; }
.device-body p { margin-bottom: 4px; }
.device-footer { margin-top: 12px; }

/* Badges */
.badge {
  display: inline-block;
  padding: 2px 10px;
  border-radius: 12px;
  font-size: 12px;
  font-weight: 500;
  border: 1px solid var(--border);
}
.badge-success { border-color: var(--green); color: var(--green); }
.badge-danger { border-color: var(--red); color: var(--red); }
.badge-warning { border-color: var(--yellow); color: var(--yellow); }
.badge-info { border-color: var(--accent); color: var(--accent); }

/* Tables */
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; letter-spacing: 0.5px; }
tr:hover { background: rgba(255,255,255,0.02); }
.text-center { text-align: center; }
.text-muted { color: var(--text-muted); }

/* Charts */
.chart-card svg { width: 100%; height: 200px; }
.chart-card text { fill: var(--text-muted); }

/* States */
.loading, .empty-state, .error-state { padding: 40px; text-align: center; color: var(--text-muted); }
.error-card, .error-state h2 { color: var(--red); }
.error-card { padding: 12px 16px; border: 1px solid var(--red); border-radius: var(--radius); margin-bottom: 16px; }
.range-note { font-style: italic; }
.event-legend { margin-top: 16px; font-size: 12px; color: var(--text-muted); }

/* Controls */
.controls, .report-form { display: flex; flex-wrap: wrap; gap: 12px; align-items: center; margin-bottom: 16px; }
.report-form h2, .report-form #report-display { flex-basis: 100%; }
input[type=search], select {
  background: var(--surface);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 8px 12px;
}
input[type=search] { flex: 1; min-width: 240px; }
.btn {
  padding: 8px 16px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  cursor: pointer;
  text-decoration: none;
}
.btn.active, .btn-primary { background: var(--accent); border-color: var(--accent); color: #fff; }
.btn-sm { padding: 4px 10px; font-size: 12px; }
"#;

const SCRIPT: &str = r#"
// ---------------------------------------------------------------------------
// Region refresh
// ---------------------------------------------------------------------------
const region = document.getElementById('content');
let timer = null;

function params() {
  const qs = new URLSearchParams();
  document.querySelectorAll('[data-param]').forEach(el => qs.set(el.dataset.param, el.value));
  const s = qs.toString();
  return s ? '?' + s : '';
}

// Error replies are JSON, never markup: show them as text in an error card.
async function errorCard(res) {
  let message = 'Server responded with HTTP ' + res.status;
  try {
    const body = await res.json();
    if (body && body.error) message = body.error;
  } catch (_) {}
  const card = document.createElement('div');
  card.className = 'error-card';
  const p = document.createElement('p');
  p.textContent = '❌ ' + message;
  card.appendChild(p);
  return card;
}

async function swap(target, res) {
  if (res.ok) {
    target.innerHTML = await res.text();
    return true;
  }
  target.replaceChildren(await errorCard(res));
  return false;
}

async function refresh() {
  try {
    const res = await fetch(region.dataset.fragment + params());
    if (await swap(region, res)) {
      document.getElementById('last-updated').textContent =
        'Updated ' + new Date().toLocaleTimeString('en-IN', { timeZone: 'Asia/Kolkata' });
    }
  } catch (e) {
    console.error('refresh failed', e);
  }
}

function schedule() {
  if (timer) clearTimeout(timer);
  timer = setTimeout(async () => { await refresh(); schedule(); },
    parseInt(region.dataset.refreshMs, 10));
}

// ---------------------------------------------------------------------------
// Device grid controls
// ---------------------------------------------------------------------------
const search = document.getElementById('search-input');
if (search) {
  search.addEventListener('input', () => { refresh(); schedule(); });
}
document.querySelectorAll('[data-filter]').forEach(btn => {
  btn.addEventListener('click', () => {
    document.getElementById('filter-input').value = btn.dataset.filter;
    document.querySelectorAll('[data-filter]').forEach(b => b.classList.remove('active'));
    btn.classList.add('active');
    refresh();
    schedule();
  });
});

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------
const generate = document.getElementById('generate-report');
if (generate) {
  generate.addEventListener('click', async () => {
    const display = document.getElementById('report-display');
    display.innerHTML = '<div class="loading"><p>Generating report...</p></div>';
    const qs = new URLSearchParams({
      type: document.getElementById('report-type').value,
      range: document.getElementById('date-range').value,
    });
    try {
      const res = await fetch('/fragments/reports/generate?' + qs.toString());
      await swap(display, res);
    } catch (e) {
      display.innerHTML = '<div class="error-card"><p>Failed to generate report</p></div>';
    }
  });
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
schedule();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region {
            fragment_url: "/fragments/overview".to_string(),
            refresh_secs: 30,
            content: Node::el("p").push_text("hello"),
        }
    }

    #[test]
    fn shell_marks_active_nav_and_refresh_interval() {
        let html = shell("Dashboard", "/devices", None, region(), None);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<a href=\"/devices\" class=\"active\">"));
        assert!(html.contains("data-refresh-ms=\"30000\""));
        assert!(html.contains("<p>hello</p>"));
    }

    #[test]
    fn title_is_escaped() {
        let html = shell("<b>x</b> - Device Monitor", "/", None, region(), None);
        assert!(html.contains("<title>&lt;b&gt;x&lt;/b&gt; - Device Monitor</title>"));
    }

    #[test]
    fn device_controls_preselect_filter() {
        let html = device_controls("a\"b", StatusFilter::Inactive).render();
        assert!(html.contains("value=\"a&quot;b\""));
        assert!(html.contains("data-filter=\"inactive\">Offline"));
        assert!(html.contains("class=\"btn filter-btn active\" type=\"button\" data-filter=\"inactive\""));
    }

    #[test]
    fn report_form_lists_every_kind() {
        let html = report_form().render();
        for kind in ["usage", "uptime", "events", "performance"] {
            assert!(html.contains(&format!("value=\"{kind}\"")));
        }
        assert!(html.contains("id=\"report-display\""));
    }

    #[test]
    fn script_only_swaps_markup_from_successful_replies() {
        assert_eq!(SCRIPT.matches("res.text()").count(), 1);
        let swap = &SCRIPT[SCRIPT.find("async function swap").unwrap()..];
        let ok_check = swap.find("if (res.ok)").unwrap();
        assert!(ok_check < swap.find("res.text()").unwrap());
        assert!(SCRIPT.contains("p.textContent = '❌ ' + message"));
        assert!(!SCRIPT.contains("display.innerHTML = await"));
    }
}
