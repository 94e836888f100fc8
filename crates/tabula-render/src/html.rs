//! HTML table renderer
//!
//! Writes a report table as an HTML fragment: an outer `tabback` table
//! holding the headline, the data table, the caption, the legend and a
//! footer. Calendar columns become nested tables and chart columns a
//! positioned placeholder for a Gantt chart.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use tabula_core::Project;
use tabula_report::{Cell, CellSpecial, Chart, Column, Table};
use tracing::debug;

use crate::{RenderError, TableRenderer};

/// Left padding per indentation level in pixels
const INDENT_WIDTH: usize = 8;

/// Elements written without content or end tag
const VOID_ELEMENTS: [&str; 4] = ["meta", "br", "hr", "img"];

/// Style sheet of standalone documents
const STYLE: &str = "
.tabback { background-color: #9a9a9a; border-spacing: 0; }
.tj_table { border-spacing: 1px; font-family: sans-serif; font-size: 12px; }
.tabhead { background-color: #a5c2e8; font-weight: bold; }
.tabhead_offduty { background-color: #d8d8d8; }
.taskcell1 { background-color: #ebf2ff; }
.taskcell2 { background-color: #d9dfeb; }
.resourcecell1 { background-color: #fcf3e4; }
.resourcecell2 { background-color: #e8dfd0; }
.caltask1, .caltask2 { background-color: #2f57b0; color: #ffffff; }
.calconttask1, .calconttask2 { background-color: #404040; color: #ffffff; }
.busy1, .busy2 { background-color: #ff3b3b; }
.loaded1, .loaded2 { background-color: #ff9b9b; }
.free1, .free2, .free { background-color: #a5e8b4; }
.offduty1, .offduty2, .offduty { background-color: #d8d8d8; }
.gantt { position: relative; background-color: #ffffff; }
.ganttline { position: absolute; left: 0; right: 0; border-bottom: 1px dotted #c0c0c0; }
.caption, .copyright { font-size: 10px; padding: 4px; }
";

// ============================================================================
// Elements
// ============================================================================

/// A node of an HTML tree
#[derive(Clone, Debug, PartialEq)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

impl From<HtmlElement> for HtmlNode {
    fn from(element: HtmlElement) -> Self {
        HtmlNode::Element(element)
    }
}

/// An HTML element with attributes and children
#[derive(Clone, Debug, PartialEq)]
pub struct HtmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<HtmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(HtmlNode::Text(text.into()));
        self
    }

    pub fn push(&mut self, child: impl Into<HtmlNode>) {
        self.children.push(child.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[HtmlNode] {
        &self.children
    }

    /// Serialize with two space indentation
    pub fn to_html(&self) -> Result<String, RenderError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| RenderError::Format(e.to_string()))
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), quick_xml::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if VOID_ELEMENTS.contains(&self.name.as_str()) {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        // HTML has no self-closing table elements
        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                HtmlNode::Element(element) => element.write_to(writer)?,
                HtmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// HTML renderer configuration
#[derive(Clone, Debug)]
pub struct HtmlRenderer<'a> {
    project: &'a Project,
    /// Shown above the table
    pub headline: Option<String>,
    /// Shown below the table
    pub caption: Option<String>,
    /// Add the project and generator footer
    pub footer: bool,
    /// Wrap the fragment into a complete document with a style sheet
    pub standalone: bool,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            headline: None,
            caption: None,
            footer: true,
            standalone: false,
        }
    }

    pub fn headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn footer(mut self, footer: bool) -> Self {
        self.footer = footer;
        self
    }

    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    /// Element tree of the complete report
    pub fn to_element(&self, table: &Table) -> HtmlElement {
        let frame_row = |content: HtmlElement| {
            HtmlElement::new("tr").child(HtmlElement::new("td").child(content))
        };

        let mut back = HtmlElement::new("table")
            .attr("class", "tabback")
            .attr("align", "center");
        if let Some(headline) = &self.headline {
            back.push(frame_row(HtmlElement::new("h2").attr("class", "headline").text(headline)));
        }
        back.push(frame_row(self.data_table(table)));
        if let Some(caption) = &self.caption {
            back.push(frame_row(HtmlElement::new("div").attr("class", "caption").text(caption)));
        }
        if !table.legend.is_empty() {
            back.push(frame_row(legend(table)));
        }
        if self.footer {
            back.push(frame_row(self.footer_element()));
        }
        back
    }

    fn data_table(&self, table: &Table) -> HtmlElement {
        let mut upper = HtmlElement::new("tr").attr("class", "tabhead");
        let mut lower = HtmlElement::new("tr").attr("class", "tabhead");
        for column in &table.columns {
            if !column.upper.hidden {
                upper.push(header_cell(column, &column.upper, table));
            }
            if !column.lower.hidden {
                lower.push(header_cell(column, &column.lower, table));
            }
        }
        let mut head = HtmlElement::new("thead").child(upper);
        if !lower.children().is_empty() {
            head.push(lower);
        }

        let mut body = HtmlElement::new("tbody");
        for (index, row) in table.rows.iter().enumerate() {
            let mut tr = HtmlElement::new("tr").attr("class", "tabline");
            if table.equi_rows {
                tr = tr.attr("style", format!("height:{}px", row.height));
            }
            for (column, cell) in row.cells.iter().enumerate() {
                if !cell.hidden {
                    tr.push(cell_element("td", cell));
                } else if index == 0 {
                    if let Some(chart) = table.charts.iter().find(|c| c.column == column) {
                        tr.push(self.chart_body(chart, table.rows.len()));
                    }
                }
            }
            body.push(tr);
        }

        let mut data = HtmlElement::new("table")
            .attr("class", "tj_table")
            .attr("cellspacing", "1")
            .child(head)
            .child(body);
        if let Some(width) = table.max_width {
            data = data.attr("style", format!("max-width:{}px", width));
        }
        data
    }

    /// The chart column body, one cell spanning all rows
    fn chart_body(&self, chart: &Chart, rows: usize) -> HtmlElement {
        let height = chart
            .lines
            .iter()
            .map(|l| l.y + l.height + 1)
            .max()
            .unwrap_or(0);
        let mut gantt = HtmlElement::new("div")
            .attr("class", "gantt")
            .attr("style", format!("width:{}px;height:{}px", chart.width, height));
        for line in &chart.lines {
            let name = self
                .project
                .get(line.property)
                .and_then(|_| self.project.attribute(line.property, "name", None))
                .map(ToString::to_string)
                .unwrap_or_default();
            gantt.push(
                HtmlElement::new("div")
                    .attr("class", "ganttline")
                    .attr("style", format!("top:{}px;height:{}px", line.y, line.height))
                    .text(name),
            );
        }
        let mut td = HtmlElement::new("td").attr("class", "tabfront").child(gantt);
        if rows > 1 {
            td = td.attr("rowspan", rows.to_string());
        }
        td
    }

    fn footer_element(&self) -> HtmlElement {
        let mut text = String::new();
        if let Some(copyright) = &self.project.copyright {
            text.push_str(&format!("\u{a9} {} - ", copyright));
        }
        text.push_str(&format!(
            "Project: {} Version: {} - Created with {} v{}",
            self.project.name,
            self.project.version,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        HtmlElement::new("div").attr("class", "copyright").text(text)
    }

    fn document(&self, fragment: HtmlElement) -> Result<String, RenderError> {
        let html = HtmlElement::new("html")
            .child(
                HtmlElement::new("head")
                    .child(HtmlElement::new("meta").attr("charset", "utf-8"))
                    .child(HtmlElement::new("title").text(self.headline.as_deref().unwrap_or(&self.project.name)))
                    .child(HtmlElement::new("style").text(STYLE)),
            )
            .child(HtmlElement::new("body").child(fragment));

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
        html.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| RenderError::Format(e.to_string()))
    }
}

impl TableRenderer for HtmlRenderer<'_> {
    type Output = String;

    fn render(&self, table: &Table) -> Result<String, RenderError> {
        debug!(rows = table.rows.len(), columns = table.columns.len(), "rendering HTML");
        let fragment = self.to_element(table);
        if self.standalone {
            self.document(fragment)
        } else {
            fragment.to_html()
        }
    }
}

// ============================================================================
// Cells
// ============================================================================

fn header_cell(column: &Column, cell: &Cell, table: &Table) -> HtmlElement {
    match &cell.special {
        Some(CellSpecial::Chart(index)) => {
            let mut th = cell_element("th", cell);
            if let Some(chart) = table.charts.get(*index) {
                th = th.attr("style", format!("width:{}px", chart.width)).text(format!(
                    "{} {} - {}",
                    chart.scale,
                    chart.start.format("%Y-%m-%d"),
                    chart.end.format("%Y-%m-%d")
                ));
            }
            th
        }
        _ => {
            let mut th = cell_element("th", cell);
            if column.scrollbar {
                th = th.attr("data-scroll", "x");
            }
            th
        }
    }
}

fn cell_element(tag: &str, cell: &Cell) -> HtmlElement {
    let mut element = HtmlElement::new(tag);
    if cell.columns > 1 {
        element = element.attr("colspan", cell.columns.to_string());
    }
    if cell.rows > 1 {
        element = element.attr("rowspan", cell.rows.to_string());
    }
    let class = match (&cell.category, tag) {
        (Some(category), _) => Some(category.as_str()),
        (None, "th") => Some("tabhead"),
        (None, _) => None,
    };
    if let Some(class) = class {
        element = element.attr("class", class);
    }

    let style = cell_style(cell);
    if !style.is_empty() {
        element = element.attr("style", style);
    }

    match &cell.special {
        Some(CellSpecial::Calendar(embedded)) => element.child(calendar_table(embedded)),
        Some(CellSpecial::Chart(_)) => element,
        None => match &cell.url {
            Some(url) => element.child(HtmlElement::new("a").attr("href", url).text(&cell.text)),
            None if cell.text.is_empty() => element,
            None => element.text(&cell.text),
        },
    }
}

fn cell_style(cell: &Cell) -> String {
    let mut style = vec![format!("text-align:{}", cell.alignment.as_css())];
    if cell.indent > 0 {
        style.push(format!("padding-left:{}px", cell.indent * INDENT_WIDTH));
    }
    if cell.bold {
        style.push("font-weight:bold".to_string());
    }
    if let Some(size) = cell.font_size {
        style.push(format!("font-size:{}px", size));
    }
    if let Some(color) = cell.font_color {
        style.push(format!("color:#{:06x}", color));
    }
    if let Some(width) = cell.width {
        style.push(format!("width:{}px", width));
    }
    style.join(";")
}

/// A calendar header or a calendar strip of one row
fn calendar_table(table: &Table) -> HtmlElement {
    let mut nested = HtmlElement::new("table")
        .attr("class", "tj_table")
        .attr("cellspacing", "1");
    if let Some(width) = table.max_width {
        nested = nested.attr("style", format!("max-width:{}px", width));
    }

    if !table.columns.is_empty() {
        let mut upper = HtmlElement::new("tr");
        let mut lower = HtmlElement::new("tr");
        for column in &table.columns {
            if !column.upper.hidden {
                upper.push(cell_element("th", &column.upper));
            }
            if !column.lower.hidden {
                lower.push(cell_element("th", &column.lower));
            }
        }
        nested.push(upper);
        nested.push(lower);
    }
    for row in &table.rows {
        let mut tr = HtmlElement::new("tr");
        for cell in row.cells.iter().filter(|c| !c.hidden) {
            tr.push(cell_element("td", cell));
        }
        nested.push(tr);
    }
    nested
}

fn legend(table: &Table) -> HtmlElement {
    let mut row = HtmlElement::new("tr");
    for item in &table.legend.calendar_items {
        row.push(
            HtmlElement::new("td")
                .attr("class", item.category.as_str())
                .attr("style", "width:20px"),
        );
        row.push(HtmlElement::new("td").text(item.label.as_str()));
    }
    HtmlElement::new("table").attr("class", "legend").child(row)
}
