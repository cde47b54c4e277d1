use std::f64::consts::PI;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::capabilities::{ChartLibrary, DomHandle, ElementId};
use crate::error::DashboardError;
use crate::interval::{format_interval, parse_interval, seconds_since_midnight};
use crate::page::escape_html;
use crate::selection::RenderCallback;

/// Default slice colours, in the order charting tools usually assign them
const PALETTE: [&str; 10] = [
    "#3366cc", "#dc3912", "#ff9900", "#109618", "#990099",
    "#0099c6", "#dd4477", "#66aa00", "#b82e2e", "#316395",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum ChartKind {
    /// Share of presence per weekday
    Pie,
    /// Mean presence time per weekday, value axis in HH:MM:SS
    Column,
    /// Mean start and end of presence per weekday
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    String,
    Number,
    TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub label: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Seconds since midnight, from an `[h, m, s]` or `[h, m]` cell
    Time(u32),
    Null,
}

impl Cell {
    fn label(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Time(secs) => format_interval(*secs as f64),
            Cell::Null => String::new(),
        }
    }

    /// Time of day in seconds for a timeline bound. Plain numbers are seconds
    /// since midnight and must fall inside one day.
    fn time_of_day(&self) -> Result<Option<u32>, DashboardError> {
        match self {
            Cell::Time(secs) => Ok(Some(*secs)),
            Cell::Number(n) if (0.0..86_400.0).contains(n) => {
                Ok(Some(seconds_since_midnight(parse_interval(*n))))
            }
            Cell::Number(n) => Err(DashboardError::render(format!("{} is not a time of day", n))),
            Cell::Null => Ok(None),
            Cell::Text(t) => Err(DashboardError::render(format!("'{}' is not a time of day", t))),
        }
    }
}

fn parse_time_cell(parts: &[Value]) -> Option<Cell> {
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }
    let mut hms = [0u64; 3];
    for (slot, part) in hms.iter_mut().zip(parts) {
        *slot = part.as_u64()?;
    }
    let [h, m, sec] = hms;
    if h >= 24 || m >= 60 || sec >= 60 {
        return None;
    }
    Some(Cell::Time((h * 3600 + m * 60 + sec) as u32))
}

/// Typed table built from JSON rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataTable {
    /// Converts an array of rows. The first row becomes the column labels when
    /// it is all strings and more rows follow it.
    pub fn from_rows(rows: &Value) -> Result<Self, DashboardError> {
        let rows = rows
            .as_array()
            .ok_or_else(|| DashboardError::render("expected an array of rows"))?;
        if rows.is_empty() {
            return Err(DashboardError::render("no rows to draw"));
        }

        let mut cells: Vec<Vec<Cell>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let row = row
                .as_array()
                .ok_or_else(|| DashboardError::render(format!("row {} is not an array", i)))?;
            let mut parsed = Vec::with_capacity(row.len());
            for (j, value) in row.iter().enumerate() {
                parsed.push(match value {
                    Value::String(s) => Cell::Text(s.clone()),
                    Value::Number(n) => Cell::Number(n.as_f64().unwrap_or_default()),
                    Value::Null => Cell::Null,
                    Value::Array(parts) => parse_time_cell(parts).ok_or_else(|| {
                        DashboardError::render(format!("bad time at row {} column {}", i, j))
                    })?,
                    _ => {
                        return Err(DashboardError::render(format!(
                            "unsupported value at row {} column {}",
                            i, j
                        )))
                    }
                });
            }
            cells.push(parsed);
        }

        let width = cells[0].len();
        if width == 0 {
            return Err(DashboardError::render("rows have no columns"));
        }
        if let Some(i) = cells.iter().position(|row| row.len() != width) {
            return Err(DashboardError::render(format!(
                "row {} has {} cells, expected {}",
                i,
                cells[i].len(),
                width
            )));
        }

        let has_header = cells.len() > 1 && cells[0].iter().all(|c| matches!(c, Cell::Text(_)));
        let labels: Vec<String> = if has_header {
            cells.remove(0).iter().map(Cell::label).collect()
        } else {
            (1..=width).map(|n| format!("Column {}", n)).collect()
        };

        let mut columns = Vec::with_capacity(width);
        for (j, label) in labels.into_iter().enumerate() {
            let mut kind = None;
            for (i, row) in cells.iter().enumerate() {
                let cell_kind = match &row[j] {
                    Cell::Text(_) => ColumnKind::String,
                    Cell::Number(_) => ColumnKind::Number,
                    Cell::Time(_) => ColumnKind::TimeOfDay,
                    Cell::Null => continue,
                };
                match kind {
                    None => kind = Some(cell_kind),
                    Some(k) if k != cell_kind => {
                        return Err(DashboardError::render(format!(
                            "column {} mixes value types (row {})",
                            j, i
                        )))
                    }
                    Some(_) => {}
                }
            }
            columns.push(Column {
                label,
                kind: kind.unwrap_or(ColumnKind::Number),
            });
        }

        Ok(Self { columns, rows: cells })
    }

    /// (label, value) pairs from the first two columns; nulls count as zero.
    fn series(&self) -> Result<Vec<(String, f64)>, DashboardError> {
        if self.columns.len() < 2 {
            return Err(DashboardError::render("need a label column and a value column"));
        }
        if self.columns[1].kind != ColumnKind::Number {
            return Err(DashboardError::render(format!(
                "column '{}' must be numeric",
                self.columns[1].label
            )));
        }
        Ok(self
            .rows
            .iter()
            .map(|row| {
                let value = match row[1] {
                    Cell::Number(n) => n,
                    _ => 0.0,
                };
                (row[0].label(), value)
            })
            .collect())
    }

    /// (label, start, end) from the first three columns. Rows with a missing
    /// bound have no span.
    fn spans(&self) -> Result<Vec<(String, Option<(u32, u32)>)>, DashboardError> {
        if self.columns.len() < 3 {
            return Err(DashboardError::render("need label, start and end columns"));
        }
        let mut spans = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let label = row[0].label();
            let span = match (row[1].time_of_day()?, row[2].time_of_day()?) {
                (Some(start), Some(end)) if end < start => {
                    return Err(DashboardError::render(format!(
                        "'{}' ends before it starts",
                        label
                    )))
                }
                (Some(start), Some(end)) => Some((start, end)),
                _ => None,
            };
            spans.push((label, span));
        }
        Ok(spans)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            width: 400,
            height: 300,
        }
    }
}

/// Draws charts as inline SVG.
#[derive(Debug, Default)]
pub struct SvgCharts;

impl SvgCharts {
    pub fn new() -> Self {
        Self
    }

    fn open(options: &ChartOptions, kind: &str) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" class="chart {}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            kind, options.width, options.height, options.width, options.height
        );
        if let Some(title) = &options.title {
            let _ = write!(
                svg,
                r#"<text class="title" x="{}" y="18" text-anchor="middle">{}</text>"#,
                options.width / 2,
                escape_html(title)
            );
        }
        svg
    }
}

impl ChartLibrary for SvgCharts {
    fn build_table(&self, rows: &Value) -> Result<DataTable, DashboardError> {
        DataTable::from_rows(rows)
    }

    fn draw_pie_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        let series = table.series()?;
        if let Some((label, _)) = series.iter().find(|(_, v)| *v < 0.0) {
            return Err(DashboardError::render(format!("negative value for '{}'", label)));
        }
        let total: f64 = series.iter().map(|(_, v)| v).sum();

        let mut svg = Self::open(options, "pie");
        let w = options.width as f64;
        let h = options.height as f64;
        let cx = w * 0.35;
        let cy = h / 2.0 + 10.0;
        let r = (w * 0.3).min(h / 2.0 - 25.0).max(10.0);

        if total <= 0.0 {
            let _ = write!(
                svg,
                r#"<text class="empty" x="{:.2}" y="{:.2}" text-anchor="middle">No data</text></svg>"#,
                w / 2.0,
                h / 2.0
            );
            return Ok(svg);
        }

        let mut angle = -PI / 2.0;
        for (i, (label, value)) in series.iter().enumerate() {
            if *value <= 0.0 {
                continue;
            }
            let share = value / total;
            let color = PALETTE[i % PALETTE.len()];
            let tip = format!("{}: {} ({:.1}%)", escape_html(label), value, share * 100.0);
            if share >= 1.0 {
                let _ = write!(
                    svg,
                    r#"<circle class="slice" cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"><title>{}</title></circle>"#,
                    cx, cy, r, color, tip
                );
                continue;
            }
            let end = angle + share * 2.0 * PI;
            let large = if share > 0.5 { 1 } else { 0 };
            let _ = write!(
                svg,
                r#"<path class="slice" d="M {:.2} {:.2} L {:.2} {:.2} A {:.2} {:.2} 0 {} 1 {:.2} {:.2} Z" fill="{}"><title>{}</title></path>"#,
                cx,
                cy,
                cx + r * angle.cos(),
                cy + r * angle.sin(),
                r,
                r,
                large,
                cx + r * end.cos(),
                cy + r * end.sin(),
                color,
                tip
            );
            angle = end;
        }

        let legend_x = w * 0.7;
        for (i, (label, _)) in series.iter().enumerate() {
            let y = 40.0 + i as f64 * 20.0;
            let _ = write!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="12" height="12" fill="{}"/><text class="legend" x="{:.2}" y="{:.2}">{}</text>"#,
                legend_x,
                y,
                PALETTE[i % PALETTE.len()],
                legend_x + 18.0,
                y + 11.0,
                escape_html(label)
            );
        }
        svg.push_str("</svg>");
        Ok(svg)
    }

    fn draw_column_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        let series = table.series()?;
        let max = series.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max).max(1.0);

        let mut svg = Self::open(options, "column");
        let w = options.width as f64;
        let h = options.height as f64;
        let left = 70.0;
        let top = 30.0;
        let bottom = h - 30.0;
        let plot_h = bottom - top;

        for tick in 0..=4 {
            let value = max * tick as f64 / 4.0;
            let y = bottom - plot_h * tick as f64 / 4.0;
            let _ = write!(
                svg,
                r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#cccccc"/><text class="tick" x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"##,
                left,
                y,
                w - 10.0,
                y,
                left - 5.0,
                y + 4.0,
                format_interval(value)
            );
        }

        let slot = (w - left - 10.0) / series.len().max(1) as f64;
        for (i, (label, value)) in series.iter().enumerate() {
            let bar_h = plot_h * value.max(0.0) / max;
            let x = left + slot * i as f64 + slot * 0.15;
            let _ = write!(
                svg,
                r#"<rect class="bar" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"><title>{}: {}</title></rect><text class="label" x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
                x,
                bottom - bar_h,
                slot * 0.7,
                bar_h,
                PALETTE[0],
                escape_html(label),
                format_interval(*value),
                x + slot * 0.35,
                bottom + 16.0,
                escape_html(label)
            );
        }
        svg.push_str("</svg>");
        Ok(svg)
    }

    fn draw_timeline_chart(&self, table: &DataTable, options: &ChartOptions) -> Result<String, DashboardError> {
        let spans = table.spans()?;
        let mut svg = Self::open(options, "timeline");
        let w = options.width as f64;
        let h = options.height as f64;

        let drawn: Vec<(u32, u32)> = spans.iter().filter_map(|(_, span)| *span).collect();
        if drawn.is_empty() {
            let _ = write!(
                svg,
                r#"<text class="empty" x="{:.2}" y="{:.2}" text-anchor="middle">No data</text></svg>"#,
                w / 2.0,
                h / 2.0
            );
            return Ok(svg);
        }

        // Axis runs over whole hours around the earliest start and latest end
        let lo = drawn.iter().map(|(start, _)| start / 3600 * 3600).min().unwrap_or(0);
        let hi = drawn
            .iter()
            .map(|(_, end)| end.div_ceil(3600) * 3600)
            .max()
            .unwrap_or(86_400)
            .max(lo + 3600);
        let left = 60.0;
        let right = w - 10.0;
        let top = 30.0;
        let bottom = h - 25.0;
        let x_at = |secs: u32| left + (right - left) * (secs - lo) as f64 / (hi - lo) as f64;

        for tick in 0..=4 {
            let secs = lo + (hi - lo) * tick / 4;
            let x = x_at(secs);
            let _ = write!(
                svg,
                r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#cccccc"/><text class="tick" x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"##,
                x,
                top,
                x,
                bottom,
                x,
                bottom + 16.0,
                format_interval(secs as f64)
            );
        }

        let slot = (bottom - top) / spans.len() as f64;
        for (i, (label, span)) in spans.iter().enumerate() {
            let y = top + slot * i as f64;
            let _ = write!(
                svg,
                r#"<text class="label" x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"#,
                left - 5.0,
                y + slot / 2.0 + 4.0,
                escape_html(label)
            );
            let Some((start, end)) = span else {
                continue;
            };
            let _ = write!(
                svg,
                r#"<rect class="span" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"><title>{}: {} - {}</title></rect>"#,
                x_at(*start),
                y + slot * 0.15,
                x_at(*end) - x_at(*start),
                slot * 0.7,
                PALETTE[i % PALETTE.len()],
                escape_html(label),
                format_interval(*start as f64),
                format_interval(*end as f64)
            );
        }
        svg.push_str("</svg>");
        Ok(svg)
    }
}

/// Draws a fetched result into the chart container.
#[derive(Clone)]
pub struct ChartRenderer {
    charts: Arc<dyn ChartLibrary>,
    kind: ChartKind,
    options: ChartOptions,
}

impl ChartRenderer {
    pub fn new(charts: Arc<dyn ChartLibrary>, kind: ChartKind) -> Self {
        Self {
            charts,
            kind,
            options: ChartOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChartOptions) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self, dom: &dyn DomHandle, result: &Value) -> Result<(), DashboardError> {
        let table = self.charts.build_table(result)?;
        let markup = match self.kind {
            ChartKind::Pie => self.charts.draw_pie_chart(&table, &self.options)?,
            ChartKind::Column => self.charts.draw_column_chart(&table, &self.options)?,
            ChartKind::Timeline => self.charts.draw_timeline_chart(&table, &self.options)?,
        };
        dom.set_content(ElementId::ChartContainer, markup);
        dom.show(ElementId::ChartContainer);
        dom.hide(ElementId::Loading);
        Ok(())
    }

    /// Adapts the renderer to the controller's callback shape.
    pub fn into_callback(self) -> RenderCallback {
        Arc::new(move |dom: &dyn DomHandle, result: Value| self.render(dom, &result))
    }
}
