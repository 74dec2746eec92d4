// SVG map painting and tooltip rendering.
//
// The map is an SVG document whose `<path>` elements carry the area's TERYT
// code as their `id`. Painting rewrites only those path tags (fill style,
// `area` class, `data-teryt`), leaving the rest of the document byte for
// byte. Comments and CDATA sections are never touched. Areas without a
// matching path are skipped; sub-units of a county are usually not drawn.

use crate::color::Rgb;
use crate::record::{tags_to_string, AreaImportRecord};
use crate::reports::{communes_info, counties_info};
use crate::timeutils::format_timestamp;
use crate::types::SummaryStats;
use crate::util::escape_xml;
use crate::visualization::{AreaColor, LegendEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// One line group of a tooltip.
#[derive(Debug, Clone, PartialEq)]
pub enum TooltipItem {
    Line(String),
    Separator,
    /// Expected vs. received tag lists of a failed tag check.
    Tags { expected: String, received: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub title: String,
    pub items: Vec<TooltipItem>,
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Tak"
    } else {
        "Nie"
    }
}

impl Tooltip {
    /// Tooltip for one area. `days_since_update` adds the last-update line.
    pub fn for_record(record: &AreaImportRecord, days_since_update: Option<i64>) -> Tooltip {
        let mut items = vec![TooltipItem::Line(format!(
            "Status: {}",
            record.status_display()
        ))];

        if let Some(days) = days_since_update {
            items.push(TooltipItem::Line(format!(
                "Ostatnia aktualizacja: {} ({} dni temu)",
                format_timestamp(record.end_at()),
                days
            )));
        }

        if record.result_status().has_building_data() {
            items.push(TooltipItem::Line(format!(
                "Liczba budynków: {}",
                record.building_count()
            )));
            items.push(TooltipItem::Separator);
            items.push(TooltipItem::Line(format!(
                "Zawiera typ budynku: {}",
                yes_no(record.has_building_type())
            )));
            items.push(TooltipItem::Line(format!(
                "Zawiera piętra budynku: {}",
                yes_no(record.has_building_levels())
            )));
            items.push(TooltipItem::Line(format!(
                "Zawiera piętra (podziemne) budynku: {}",
                yes_no(record.has_building_levels_underground())
            )));
            if let Some(check) = record.tag_check().filter(|c| !c.has_expected_tags) {
                items.push(TooltipItem::Separator);
                items.push(TooltipItem::Tags {
                    expected: tags_to_string(check.expected_tags.as_ref()),
                    received: tags_to_string(check.result_tags.as_ref()),
                });
            }
        }

        Tooltip {
            title: format!("{} – {}", record.teryt(), record.name()),
            items,
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::from(r#"<div class="tooltip-content">"#);
        out.push_str(&format!("<span>{}</span><hr><ul>", escape_xml(&self.title)));
        for item in &self.items {
            match item {
                TooltipItem::Line(text) => {
                    out.push_str(&format!("<li>{}</li>", escape_xml(text)));
                }
                TooltipItem::Separator => out.push_str("<hr>"),
                TooltipItem::Tags { expected, received } => {
                    out.push_str(&format!(
                        r#"<div><div>Oczekiwane, a otrzymane:</div><div class="tags">{}</div><div class="tags">{}</div></div>"#,
                        escape_xml(expected),
                        escape_xml(received)
                    ));
                }
            }
        }
        out.push_str("</ul></div>");
        out
    }

    /// Plain-text form for SVG `<title>` elements.
    pub fn to_text(&self) -> String {
        let mut lines = vec![self.title.clone()];
        for item in &self.items {
            match item {
                TooltipItem::Line(text) => lines.push(text.clone()),
                TooltipItem::Separator => {}
                TooltipItem::Tags { expected, received } => {
                    lines.push("Oczekiwane, a otrzymane:".to_string());
                    lines.push(expected.clone());
                    lines.push(received.clone());
                }
            }
        }
        lines.join("\n")
    }
}

/// What to paint on one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaPaint {
    pub teryt: String,
    pub color: Rgb,
    pub tooltip: Tooltip,
}

impl AreaPaint {
    pub fn new(area: &AreaColor<'_>, days_since_update: Option<i64>) -> Self {
        AreaPaint {
            teryt: area.record.teryt().to_string(),
            color: area.color,
            tooltip: Tooltip::for_record(area.record, days_since_update),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintedMap {
    pub svg: String,
    pub painted: Vec<String>,
    pub missing: Vec<String>,
}

/// A `<path ...>` tag located in the source document.
struct PathTag {
    start: usize,
    end: usize,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl PathTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    fn render(&self, title: Option<&str>) -> String {
        let mut out = String::from("<path");
        for (k, v) in &self.attrs {
            out.push_str(&format!(" {}=\"{}\"", k, v.replace('"', "&quot;")));
        }
        match (title, self.self_closing) {
            (Some(t), true) => out.push_str(&format!("><title>{}</title></path>", escape_xml(t))),
            (Some(t), false) => out.push_str(&format!("><title>{}</title>", escape_xml(t))),
            (None, true) => out.push_str("/>"),
            (None, false) => out.push('>'),
        }
        out
    }
}

fn find_path_tags(svg: &str) -> Vec<PathTag> {
    let mut tags = Vec::new();
    let mut pos = 0;
    while let Some(offset) = svg[pos..].find('<') {
        let start = pos + offset;
        let rest = &svg[start..];
        if let Some(skip) = skipped_span(rest) {
            match skip {
                Some(len) => {
                    pos = start + len;
                    continue;
                }
                None => break,
            }
        }
        if !rest.starts_with("<path") {
            pos = start + 1;
            continue;
        }
        let after_name = start + "<path".len();
        pos = after_name;
        let boundary = svg[after_name..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '/' || c == '>') {
            continue;
        }
        let Some(close) = find_tag_end(&svg[after_name..]) else {
            break;
        };
        let end = after_name + close + 1;
        let mut inner = &svg[after_name..end - 1];
        let self_closing = inner.trim_end().ends_with('/');
        if self_closing {
            inner = inner.trim_end().trim_end_matches('/');
        }
        tags.push(PathTag {
            start,
            end,
            attrs: parse_attrs(inner),
            self_closing,
        });
        pos = end;
    }
    tags
}

// Length of a comment or CDATA section starting at `s`, `Some(None)` when
// it is never closed, `None` when `s` starts neither.
fn skipped_span(s: &str) -> Option<Option<usize>> {
    let (open, close) = if s.starts_with("<!--") {
        ("<!--", "-->")
    } else if s.starts_with("<![CDATA[") {
        ("<![CDATA[", "]]>")
    } else {
        return None;
    };
    Some(
        s[open.len()..]
            .find(close)
            .map(|i| open.len() + i + close.len()),
    )
}

// Index of the `>` closing a tag, ignoring any inside quoted values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();
        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    value = body[..close].to_string();
                    rest = body.get(close + 1..).unwrap_or("");
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = after_eq[..end].to_string();
                    rest = &after_eq[end..];
                }
            }
        }
        if !name.is_empty() {
            attrs.push((name, value));
        }
        rest = rest.trim_start();
    }
    attrs
}

/// Ids of all `<path>` elements in the document.
pub fn path_ids(svg: &str) -> Vec<String> {
    find_path_tags(svg)
        .iter()
        .filter_map(|t| t.attr("id").map(str::to_string))
        .collect()
}

/// Paint `areas` onto the SVG document.
///
/// With `with_titles`, each painted path also gets a `<title>` child so the
/// SVG shows tooltips on its own; the HTML page uses scripted tooltips
/// instead.
pub fn paint_svg(svg: &str, areas: &[AreaPaint], with_titles: bool) -> PaintedMap {
    let by_id: HashMap<&str, &AreaPaint> = areas.iter().map(|a| (a.teryt.as_str(), a)).collect();
    let mut out = String::with_capacity(svg.len() + areas.len() * 64);
    let mut painted = Vec::new();
    let mut seen = HashSet::new();
    let mut last = 0;

    for mut tag in find_path_tags(svg) {
        let Some(area) = tag.attr("id").and_then(|id| by_id.get(id).copied()) else {
            continue;
        };
        let fill = format!("fill:{}", area.color);
        let style = match tag.attr("style").map(|s| s.trim().trim_end_matches(';')) {
            Some(existing) if !existing.is_empty() => format!("{};{}", existing, fill),
            _ => fill,
        };
        let class = match tag.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} area", existing.trim()),
            _ => "area".to_string(),
        };
        tag.set_attr("style", style);
        tag.set_attr("class", class);
        tag.set_attr("data-teryt", escape_xml(&area.teryt));

        out.push_str(&svg[last..tag.start]);
        let title = with_titles.then(|| area.tooltip.to_text());
        out.push_str(&tag.render(title.as_deref()));
        last = tag.end;
        if seen.insert(area.teryt.as_str()) {
            painted.push(area.teryt.clone());
        }
    }
    out.push_str(&svg[last..]);

    let missing: Vec<String> = areas
        .iter()
        .filter(|a| !painted.contains(&a.teryt))
        .map(|a| a.teryt.clone())
        .collect();
    if !missing.is_empty() {
        debug!(count = missing.len(), "areas without a map path were skipped");
    }

    PaintedMap {
        svg: out,
        painted,
        missing,
    }
}

// Drop the XML prolog and doctype so the SVG can be inlined into HTML.
fn strip_prolog(svg: &str) -> &str {
    match svg.find("<svg") {
        Some(i) => &svg[i..],
        None => svg,
    }
}

const PAGE_CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; padding: 1rem; background: #1e1e1e; color: #eee; }
#summary { display: flex; gap: 2rem; flex-wrap: wrap; margin-bottom: 1rem; }
#summary div span { font-weight: 600; }
#legend { display: flex; gap: 1rem; margin-bottom: 1rem; }
#legend .swatch { display: inline-block; width: 1em; height: 1em; margin-right: .3em; vertical-align: middle; }
#map svg { width: 100%; height: auto; }
#tooltip { position: absolute; visibility: hidden; background: #333; color: #fff; padding: .5rem; border-radius: 4px; max-width: 360px; pointer-events: none; }
#tooltip ul { margin: 0; padding-left: 1.2em; }
#tooltip .tags { font-family: monospace; word-break: break-all; }
"#;

const PAGE_JS: &str = r#"
const tooltip = document.getElementById('tooltip');
const maxTooltipHeight = 360;
const cursorPadding = 10;
document.querySelectorAll('#map path.area').forEach((path) => {
    const content = TOOLTIPS[path.dataset.teryt];
    if (content === undefined) {
        return;
    }
    path.addEventListener('mouseover', () => {
        tooltip.style.visibility = 'visible';
        tooltip.innerHTML = content;
        path.style.stroke = 'white';
        path.style.strokeWidth = '2px';
        path.parentNode.appendChild(path);
    });
    path.addEventListener('mousemove', (event) => {
        const cursorY = event.clientY + window.scrollY;
        const fitsBelow = cursorY + maxTooltipHeight + cursorPadding < window.scrollY + window.innerHeight;
        if (fitsBelow) {
            tooltip.style.top = cursorY + cursorPadding + 'px';
        } else {
            tooltip.style.top = cursorY - tooltip.getBoundingClientRect().height - cursorPadding + 'px';
        }
        tooltip.style.left = event.clientX + window.scrollX + cursorPadding + 'px';
    });
    path.addEventListener('mouseout', () => {
        tooltip.style.visibility = 'hidden';
        path.style.stroke = '';
        path.style.strokeWidth = '';
    });
});
"#;

/// Self-contained dashboard page: summary panel, legend, painted map and
/// hover tooltips.
pub fn render_html_page(
    heading: &str,
    summary: &SummaryStats,
    legend: &[LegendEntry],
    painted_svg: &str,
    areas: &[AreaPaint],
) -> String {
    let tooltips: BTreeMap<&str, String> = areas
        .iter()
        .map(|a| (a.teryt.as_str(), a.tooltip.to_html()))
        .collect();
    let tooltips_json = serde_json::to_string(&tooltips)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    let legend_html: String = legend
        .iter()
        .map(|e| {
            format!(
                r#"<div><span class="swatch" style="background:{}"></span>{}</div>"#,
                e.color,
                escape_xml(&e.label)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{heading}</title>
    <style>{css}</style>
</head>
<body>
    <h1>{heading}</h1>
    <div id="summary">
        <div>Początek: <span id="summary-start-dt">{start}</span></div>
        <div>Koniec: <span id="summary-end-dt">{end}</span></div>
        <div>Czas trwania: <span id="summary-duration">{duration}</span></div>
        <div>Powiaty: <span id="summary-counties-info">{counties}</span></div>
        <div>Gminy: <span id="summary-communes-info">{communes}</span></div>
    </div>
    <div id="legend">{legend}</div>
    <div id="map">{svg}</div>
    <div id="tooltip"></div>
    <script>const TOOLTIPS = {tooltips};</script>
    <script>{js}</script>
</body>
</html>
"#,
        heading = escape_xml(heading),
        css = PAGE_CSS,
        start = summary.start_at.as_deref().unwrap_or("-"),
        end = summary.end_at.as_deref().unwrap_or("-"),
        duration = summary.duration,
        counties = counties_info(summary),
        communes = communes_info(summary),
        legend = legend_html,
        svg = strip_prolog(painted_svg),
        tooltips = tooltips_json,
        js = PAGE_JS,
    )
}
