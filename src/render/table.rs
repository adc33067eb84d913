use chrono::{DateTime, NaiveDate};

use super::{Section, escape_xml};
use crate::config::{Config, RenderConfig};
use crate::ir::{JobDescriptor, SystemConfiguration, non_empty, text_or};
use crate::layout::routing::{AC_ACTIVE_COLOR, DC_POSITIVE_COLOR, format_number};
use crate::theme::Theme;

// ── Shared fallbacks ──
pub(crate) const COMPANY_NAME_FALLBACK: &str = "Sun Direct Power";
pub(crate) const DESIGNER_FALLBACK: &str = "Designer Name";
pub(crate) const LICENSE_FALLBACK: &str = "EC-XXXXX";
pub(crate) const CEC_FALLBACK: &str = "CEC-XXXXX";
pub(crate) const DATE_PLACEHOLDER: &str = "__/__/____";
pub(crate) const STANDARDS: [&str; 3] = ["AS/NZS 5033:2021", "AS/NZS 3000:2018", "AS/NZS 4777.2:2020"];

const CELL_PADDING: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CellLine {
    pub text: String,
    pub bold: bool,
}

/// One table cell. A cell spanning rows hides the cells marked
/// [`TableCell::covered`] beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub lines: Vec<CellLine>,
    pub fill: Option<String>,
    pub row_span: usize,
    pub covered: bool,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            fill: None,
            row_span: 1,
            covered: false,
        }
    }
}

impl TableCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().line(text)
    }

    pub fn covered() -> Self {
        Self {
            covered: true,
            ..Self::default()
        }
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(CellLine {
            text: text.into(),
            bold: false,
        });
        self
    }

    pub fn heading(mut self, text: impl Into<String>) -> Self {
        self.lines.push(CellLine {
            text: text.into(),
            bold: true,
        });
        self
    }

    pub fn bold(mut self) -> Self {
        for line in &mut self.lines {
            line.bold = true;
        }
        self
    }

    pub fn fill(mut self, color: impl Into<String>) -> Self {
        self.fill = Some(color.into());
        self
    }

    pub fn span_rows(mut self, rows: usize) -> Self {
        self.row_span = rows.max(1);
        self
    }
}

/// Fixed-column table. Columns share the width evenly and rows grow to fit
/// their tallest cell.
#[derive(Debug, Clone)]
pub struct Table {
    pub x: f32,
    pub width: f32,
    pub columns: usize,
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub header_fill: String,
    pub rows: Vec<Vec<TableCell>>,
    pub row_height: f32,
    pub line_height: f32,
}

impl Table {
    pub fn new(x: f32, width: f32, columns: usize, render: &RenderConfig, theme: &Theme) -> Self {
        Self {
            x,
            width,
            columns: columns.max(1),
            title: None,
            headers: Vec::new(),
            header_fill: theme.table_header_fill.clone(),
            rows: Vec::new(),
            row_height: render.table_row_height,
            line_height: render.table_line_height,
        }
    }

    /// Table spanning the page's working width.
    pub fn full_width(columns: usize, config: &Config) -> Self {
        let scale = config.render.scale;
        Self::new(
            config.layout.margins.left * scale,
            config.layout.working_width() * scale,
            columns,
            &config.render,
            &config.theme,
        )
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn header_fill(mut self, color: impl Into<String>) -> Self {
        self.header_fill = color.into();
        self
    }

    /// Appends a row, padding or cutting it to the column count.
    pub fn row(mut self, mut cells: Vec<TableCell>) -> Self {
        cells.resize(self.columns, TableCell::new());
        self.rows.push(cells);
        self
    }

    pub fn column_width(&self) -> f32 {
        self.width / self.columns as f32
    }

    fn title_height(&self) -> f32 {
        if self.title.is_some() { self.row_height * 0.8 } else { 0.0 }
    }

    fn header_height(&self) -> f32 {
        if self.headers.is_empty() { 0.0 } else { self.row_height }
    }

    fn row_heights(&self) -> Vec<f32> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|cell| !cell.covered && cell.row_span == 1)
                    .map(|cell| cell.lines.len() as f32 * self.line_height + CELL_PADDING * 2.0)
                    .fold(self.row_height, f32::max)
            })
            .collect()
    }

    pub fn height(&self) -> f32 {
        self.title_height() + self.header_height() + self.row_heights().iter().sum::<f32>()
    }

    /// Draws the table with its top edge at `y = 0`.
    pub fn render(&self, name: &'static str, theme: &Theme) -> Section {
        let heights = self.row_heights();
        let col_w = self.column_width();
        let title_h = self.title_height();
        let header_h = self.header_height();
        let grid_top = title_h;
        let body_top = grid_top + header_h;
        let height = self.height();
        let mut svg = String::new();

        if let Some(title) = &self.title {
            svg.push_str(&format!(
                "<text class=\"table-title\" x=\"{:.2}\" y=\"{:.2}\">{}</text>",
                self.x,
                title_h * 0.7,
                escape_xml(title)
            ));
        }

        if header_h > 0.0 {
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{grid_top:.2}\" width=\"{:.2}\" height=\"{header_h:.2}\" fill=\"{}\"/>",
                self.x, self.width, self.header_fill
            ));
            for (col, header) in self.headers.iter().take(self.columns).enumerate() {
                svg.push_str(&format!(
                    "<text class=\"table-header\" x=\"{:.2}\" y=\"{:.2}\">{}</text>",
                    self.x + col as f32 * col_w + CELL_PADDING,
                    grid_top + header_h / 2.0 + self.line_height * 0.3,
                    escape_xml(header)
                ));
            }
        }

        let mut row_tops = Vec::with_capacity(heights.len());
        let mut y = body_top;
        for h in &heights {
            row_tops.push(y);
            y += h;
        }

        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.covered {
                    continue;
                }
                let span_end = (r + cell.row_span).min(heights.len());
                let cell_h: f32 = heights[r..span_end].iter().sum();
                let cell_x = self.x + c as f32 * col_w;
                if let Some(fill) = &cell.fill {
                    svg.push_str(&format!(
                        "<rect x=\"{cell_x:.2}\" y=\"{:.2}\" width=\"{col_w:.2}\" height=\"{cell_h:.2}\" fill=\"{fill}\"/>",
                        row_tops[r]
                    ));
                }
                for (i, line) in cell.lines.iter().enumerate() {
                    let class = if line.bold { "table-strong" } else { "table-text" };
                    svg.push_str(&format!(
                        "<text class=\"{class}\" x=\"{:.2}\" y=\"{:.2}\">{}</text>",
                        cell_x + CELL_PADDING,
                        row_tops[r] + CELL_PADDING + self.line_height * (i as f32 + 0.75),
                        escape_xml(&line.text)
                    ));
                }
            }
        }

        // Grid lines go on top of the fills.
        let stroke = &theme.table_border;
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{grid_top:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2\"/>",
            self.x,
            self.width,
            height - grid_top
        ));
        for col in 1..self.columns {
            let x = self.x + col as f32 * col_w;
            svg.push_str(&format!(
                "<line x1=\"{x:.2}\" y1=\"{grid_top:.2}\" x2=\"{x:.2}\" y2=\"{height:.2}\" stroke=\"{stroke}\" stroke-width=\"1\"/>"
            ));
        }
        if header_h > 0.0 && !self.rows.is_empty() {
            svg.push_str(&format!(
                "<line x1=\"{:.2}\" y1=\"{body_top:.2}\" x2=\"{:.2}\" y2=\"{body_top:.2}\" stroke=\"{stroke}\" stroke-width=\"2\"/>",
                self.x,
                self.x + self.width
            ));
        }
        for r in 1..self.rows.len() {
            let y = row_tops[r];
            for c in 0..self.columns {
                if self.rows[r].get(c).is_some_and(|cell| cell.covered) {
                    continue;
                }
                let x1 = self.x + c as f32 * col_w;
                svg.push_str(&format!(
                    "<line x1=\"{x1:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{stroke}\" stroke-width=\"1\"/>",
                    x1 + col_w
                ));
            }
        }

        Section {
            name,
            height,
            markup: svg,
        }
    }
}

/// Install date as `dd/mm/yyyy`. Unparseable dates pass through as written.
pub(crate) fn display_date(raw: &Option<String>) -> Option<String> {
    let raw = non_empty(raw)?;
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.format("%d/%m/%Y").to_string());
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%d/%m/%Y").to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

pub(crate) fn phase_label(sys: &SystemConfiguration) -> &'static str {
    if sys.is_three_phase() { "3-Phase" } else { "Single Phase" }
}

fn voltage_suffix(sys: &SystemConfiguration) -> &'static str {
    if sys.dc_voltage_estimated { " (est.)" } else { "" }
}

/// System Specifications | Project Details.
pub fn specification_table(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Table {
    let specs = job.specs();
    let dc_v = format_number(sys.dc_voltage);

    let mut system = TableCell::new()
        .heading("Modules and Strings")
        .line(format!(
            "{} Strings: {} × {}W per string ({})",
            sys.string_count(),
            sys.panels_per_string(),
            format_number(sys.panel_wattage),
            text_or(&specs.panel_model, "Solar Panel")
        ))
        .line(format!("String Voc: {dc_v}V DC{}", voltage_suffix(sys)))
        .heading("Inverters")
        .line(format!(
            "{} | {}kW | Efficiency: {}% | Max Input: {dc_v}V DC",
            non_empty(&job.inverter_model)
                .or(non_empty(&specs.inverter_model))
                .unwrap_or("Inverter"),
            format_number(sys.system_size_kw),
            format_number(specs.inverter_efficiency.unwrap_or(97.5)),
        ));
    if sys.has_battery {
        system = system.heading("Battery Storage (ESS)").line(format!(
            "{}kWh | Voltage: {}V DC | Max Charge/Discharge: {:.1}A",
            format_number(sys.battery_capacity_kwh.unwrap_or(0.0)),
            format_number(sys.battery_voltage),
            sys.ac_current
        ));
    }

    let project = TableCell::new()
        .line(format!("System Size: {}kW", format_number(sys.system_size_kw)))
        .line(format!("Phases: {}", phase_label(sys)))
        .line(format!("AC Voltage: {}V", format_number(sys.ac_voltage)))
        .line(format!("Max AC Current: {:.1}A", sys.ac_current));

    Table::full_width(2, config)
        .headers(["SYSTEM SPECIFICATIONS", "PROJECT DETAILS"])
        .row(vec![system, project])
}

/// Notes | Version Control | Company & Certification.
pub fn notes_table(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Table {
    let company = job.company();
    let designer = job.designer();

    let mut notes = TableCell::new()
        .line(format!("• Installation to {}", STANDARDS[0]))
        .line(format!("• Wiring to {}", STANDARDS[1]))
        .line("• DC cables rated 1000V minimum");
    if sys.dc_voltage_estimated {
        notes = notes.line("• Voltages marked (est.) are approximate");
    }

    let mut version = TableCell::new()
        .line(format!("Design: {}", text_or(&designer.name, DESIGNER_FALLBACK)))
        .line(format!(
            "Ver: {} Rev {}",
            text_or(&job.job_number, "V1.0"),
            text_or(&job.revision, "A")
        ))
        .line(format!(
            "Date: {}",
            display_date(&job.install_date).as_deref().unwrap_or(DATE_PLACEHOLDER)
        ));
    if let Some(generated) = non_empty(&job.generated_at) {
        version = version.line(format!("Generated: {generated}"));
    }

    let certification = TableCell::new()
        .heading(text_or(&company.name, COMPANY_NAME_FALLBACK))
        .line(format!(
            "CEC Accredited | Lic: {}",
            text_or(&company.electrical_license, LICENSE_FALLBACK)
        ))
        .line(format!("Customer: {}", text_or(&job.customer_name, "N/A")));

    Table::full_width(3, config)
        .headers(["NOTES", "VERSION CONTROL", "COMPANY & CERTIFICATION"])
        .row(vec![notes, version, certification])
}

/// Conductor colour key for the standard sheet.
pub fn legend_section(config: &Config) -> Section {
    let scale = config.render.scale;
    let x = config.layout.margins.left * scale;
    let height = config.render.table_row_height;
    let mid = height / 2.0;
    let text_y = mid + config.render.table_line_height * 0.3;
    let mut svg = format!("<text class=\"table-strong\" x=\"{x:.2}\" y=\"{text_y:.2}\">Legend:</text>");

    let mut cursor = x + 140.0;
    for (color, label) in [
        (DC_POSITIVE_COLOR, "DC Wiring (Red)"),
        (AC_ACTIVE_COLOR, "AC Wiring (Brown)"),
    ] {
        svg.push_str(&format!(
            "<line x1=\"{cursor:.2}\" y1=\"{mid:.2}\" x2=\"{:.2}\" y2=\"{mid:.2}\" stroke=\"{color}\" stroke-width=\"6\"/><text class=\"table-text\" x=\"{:.2}\" y=\"{text_y:.2}\">{label}</text>",
            cursor + 60.0,
            cursor + 75.0
        ));
        cursor += 420.0;
    }
    for label in [
        "⏚ = Earth Connection",
        "MCB = Miniature Circuit Breaker",
        "RCD = Residual Current Device",
    ] {
        svg.push_str(&format!(
            "<text class=\"table-text\" x=\"{cursor:.2}\" y=\"{text_y:.2}\">{}</text>",
            escape_xml(label)
        ));
        cursor += 520.0;
    }

    Section {
        name: "legend",
        height,
        markup: svg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electrical::*;

    fn system(job: &JobDescriptor) -> SystemConfiguration {
        SystemConfiguration::from_job(job, &Config::default().layout)
    }

    fn job(json: &str) -> JobDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn columns_split_width_evenly() {
        let config = Config::default();
        let table = Table::full_width(3, &config);
        assert_eq!(table.x, 100.0);
        assert!((table.column_width() - 2770.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn rows_grow_with_content() {
        let config = Config::default();
        let table = Table::full_width(2, &config)
            .headers(["A", "B"])
            .row(vec![TableCell::text("one")])
            .row(vec![
                TableCell::new().line("1").line("2").line("3"),
                TableCell::text("x"),
            ]);
        let heights = table.row_heights();
        assert_eq!(heights[0], 60.0);
        assert_eq!(heights[1], 3.0 * 32.0 + 24.0);
        assert_eq!(table.height(), 60.0 + 60.0 + 120.0);
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn header_row_is_filled_and_escaped() {
        let config = Config::default();
        let section = Table::full_width(2, &config)
            .headers(["R&D", "B"])
            .header_fill("#E3F2FD")
            .row(vec![TableCell::text("<x>"), TableCell::text("y")])
            .render("t", &config.theme);
        assert!(section.markup.contains("fill=\"#E3F2FD\""));
        assert!(section.markup.contains(">R&amp;D</text>"));
        assert!(section.markup.contains(">&lt;x&gt;</text>"));
    }

    #[test]
    fn spanning_cell_suppresses_the_divider_below_it() {
        let config = Config::default();
        let spanned = Table::full_width(1, &config)
            .row(vec![TableCell::text("stamp").span_rows(2)])
            .row(vec![TableCell::covered()])
            .render("t", &config.theme);
        let plain = Table::full_width(1, &config)
            .row(vec![TableCell::text("a")])
            .row(vec![TableCell::text("b")])
            .render("t", &config.theme);
        assert_eq!(spanned.markup.matches("<line").count() + 1, plain.markup.matches("<line").count());
    }

    #[test]
    fn dates_render_day_first() {
        assert_eq!(display_date(&Some("2024-03-15".into())).as_deref(), Some("15/03/2024"));
        assert_eq!(
            display_date(&Some("2024-03-15T09:30:00Z".into())).as_deref(),
            Some("15/03/2024")
        );
        assert_eq!(display_date(&Some("next week".into())).as_deref(), Some("next week"));
        assert_eq!(display_date(&None), None);
    }

    #[test]
    fn empty_job_renders_every_fallback() {
        let config = Config::default();
        let job = job("{}");
        let sys = system(&job);
        let spec = specification_table(&job, &sys, &config).render("spec", &config.theme);
        let notes = notes_table(&job, &sys, &config).render("notes", &config.theme);
        for expected in ["SYSTEM SPECIFICATIONS", "PROJECT DETAILS", "Modules and Strings", "Inverters"] {
            assert!(spec.markup.contains(expected), "missing {expected}");
        }
        for expected in [
            "NOTES",
            "VERSION CONTROL",
            "COMPANY &amp; CERTIFICATION",
            DESIGNER_FALLBACK,
            LICENSE_FALLBACK,
            COMPANY_NAME_FALLBACK,
            DATE_PLACEHOLDER,
        ] {
            assert!(notes.markup.contains(expected), "missing {expected}");
        }
        assert!(!notes.markup.contains("Generated:"));
    }

    #[test]
    fn battery_block_only_with_storage() {
        let config = Config::default();
        let with = job(r#"{"systemSize":10,"panelCount":25,"batteryCapacity":13.5}"#);
        let without = job(r#"{"systemSize":6.6,"panelCount":16}"#);
        let render = |job: &JobDescriptor| {
            specification_table(job, &system(job), &config)
                .render("spec", &config.theme)
                .markup
        };
        let markup = render(&with);
        assert!(markup.contains("Battery Storage (ESS)"));
        assert!(markup.contains("13.5kWh"));
        assert!(!render(&without).contains("Battery Storage"));
    }

    #[test]
    fn estimated_voltage_is_marked() {
        let config = Config::default();
        let job = job(r#"{"systemSize":6.6,"panelCount":16}"#);
        let sys = system(&job);
        assert!(sys.dc_voltage_estimated);
        let expected = format_number(estimated_string_voltage(DEFAULT_PANEL_WATTAGE, 8));
        let markup = specification_table(&job, &sys, &config)
            .render("spec", &config.theme)
            .markup;
        assert!(markup.contains(&format!("String Voc: {expected}V DC (est.)")));
    }

    #[test]
    fn legend_names_both_conductor_colours() {
        let section = legend_section(&Config::default());
        assert!(section.markup.contains(DC_POSITIVE_COLOR));
        assert!(section.markup.contains(AC_ACTIVE_COLOR));
        assert!(section.markup.contains("RCD = Residual Current Device"));
    }
}
