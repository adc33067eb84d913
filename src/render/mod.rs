pub mod compliance;
pub mod symbols;
pub mod table;

use anyhow::Result;
use base64::Engine as _;
use std::collections::BTreeSet;
use std::path::Path;

use crate::config::{Config, RenderConfig};
use crate::ir::{ComponentType, JobDescriptor, SystemConfiguration, non_empty};
use crate::layout::routing::format_number;
use crate::layout::{
    DiagramLayout, LabelSettings, LayoutEngine, LayoutError, SPECIFICATIONS, Wire, WireLabel,
    auto_wire_system, resolve_wire_labels,
};
use crate::symbols::SymbolLibrary;
use crate::theme::Theme;

const MAX_CAPTION_SPECS: usize = 3;
const ZONE_LABEL_OFFSET: f32 = 3.0;
const BATTERY_ZONE_LABEL_OFFSET: f32 = 5.0;
const MARKER_RADIUS: f32 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Standard,
    /// Adds the title block, compliance breakdown, earthing schematic and
    /// signature footer for grid-operator submission.
    Compliance,
}

impl Variant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Variant::Standard),
            "compliance" | "wp" => Some(Variant::Compliance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
    pub variant: Variant,
}

impl RenderOptions {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn compliance() -> Self {
        Self {
            variant: Variant::Compliance,
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }
}

/// Drafted block of markup with its top edge at `y = 0`.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: &'static str,
    pub height: f32,
    pub markup: String,
}

/// Everything computed for one job before any markup is written.
#[derive(Debug, Clone)]
pub struct DiagramPlan {
    pub system: SystemConfiguration,
    pub layout: DiagramLayout,
    pub wires: Vec<Wire>,
    pub labels: Vec<WireLabel>,
}

/// Reusable generator. The zone template is built once; every call works
/// on fresh state, so one renderer can serve many jobs and threads.
#[derive(Debug, Clone)]
pub struct SldRenderer {
    config: Config,
    engine: LayoutEngine,
}

impl SldRenderer {
    pub fn new(config: Config) -> Self {
        let engine = LayoutEngine::new(&config.layout);
        Self { config, engine }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Layout, wiring and label resolution, in that order.
    pub fn plan(&self, job: &JobDescriptor) -> Result<DiagramPlan, LayoutError> {
        let system = SystemConfiguration::from_job(job, &self.config.layout);
        let layout = self.engine.auto_layout(&system)?;
        let wires = auto_wire_system(&layout, &system);
        let settings = LabelSettings::new(&self.config.layout, &self.config.render, &self.config.theme);
        let labels = resolve_wire_labels(&wires, &layout.components, &settings);
        Ok(DiagramPlan {
            system,
            layout,
            wires,
            labels,
        })
    }

    pub fn render(&self, job: &JobDescriptor, symbols: &SymbolLibrary, variant: Variant) -> Result<String> {
        let plan = self.plan(job)?;
        Ok(compose_svg(job, &plan, symbols, &self.config, variant))
    }
}

pub fn render_sld(job: &JobDescriptor, symbols: &SymbolLibrary, options: &RenderOptions) -> Result<String> {
    SldRenderer::new(options.config.clone()).render(job, symbols, options.variant)
}

pub fn to_data_url(svg: &str) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
    )
}

/// Writes the document in strict z-order: background, zones, wires,
/// symbols, captions, wire labels, then the trailing tables.
///
/// Trailing sections are drafted first so the canvas height can be summed
/// from the fixed diagram height and each section's drafted height.
pub fn compose_svg(
    job: &JobDescriptor,
    plan: &DiagramPlan,
    symbols: &SymbolLibrary,
    config: &Config,
    variant: Variant,
) -> String {
    let theme = &config.theme;
    let scale = config.render.scale;
    let gap = config.render.section_gap;
    let width = config.layout.page_width * scale;
    let sys = &plan.system;

    let header = match variant {
        Variant::Standard => None,
        Variant::Compliance => Some(compliance::title_block(job, sys, config)),
    };
    let diagram_top = header.as_ref().map_or(0.0, |section| gap + section.height);
    let diagram_height = diagram_height(&plan.layout, config);

    let mut trailing = vec![table::specification_table(job, sys, config).render("specifications", theme)];
    match variant {
        Variant::Standard => {
            trailing.push(table::notes_table(job, sys, config).render("notes", theme));
            trailing.push(table::legend_section(config));
        }
        Variant::Compliance => {
            trailing.push(compliance::breakdown_table(job, sys, config).render("compliance", theme));
            trailing.push(compliance::earthing_and_legend(job, sys, config));
            trailing.push(compliance::signature_footer(job, sys, config).render("signatures", theme));
        }
    }

    let mut cursor = diagram_top + diagram_height;
    let mut offsets = Vec::with_capacity(trailing.len());
    for section in &trailing {
        offsets.push(cursor);
        cursor += section.height + gap;
    }
    let height = cursor + config.layout.margins.bottom * scale;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.2}mm\" height=\"{:.2}mm\" viewBox=\"0 0 {width:.2} {height:.2}\">",
        width / scale,
        height / scale
    ));
    svg.push_str(&style_block(theme, &config.render));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    if config.render.show_grid {
        svg.push_str(&grid_lines(width, diagram_top + diagram_height, &config.render, theme));
    }

    if diagram_top > 0.0 {
        svg.push_str(&format!("<g id=\"diagram\" transform=\"translate(0,{diagram_top:.2})\">"));
    } else {
        svg.push_str("<g id=\"diagram\">");
    }
    if variant == Variant::Standard
        && let Some(title) = non_empty(&config.render.title)
    {
        svg.push_str(&format!(
            "<text class=\"diagram-title\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            width / 2.0,
            config.layout.margins.top * scale * 0.5,
            escape_xml(title)
        ));
    }
    if config.render.show_zones {
        svg.push_str(&zones_svg(&plan.layout, scale));
    }
    svg.push_str(&wires_svg(&plan.wires, config));
    svg.push_str(&components_svg(&plan.layout, symbols, scale, theme));
    svg.push_str(&captions_svg(&plan.layout, job, sys, scale));
    svg.push_str(&labels_svg(&plan.labels, scale, theme));
    svg.push_str("</g>");

    let mut sections = trailing.iter().zip(&offsets);
    if let Some((section, y)) = sections.next() {
        svg.push_str(&section_group(section, *y));
    }
    if let Some(section) = &header {
        svg.push_str(&section_group(section, gap));
    }
    for (section, y) in sections {
        svg.push_str(&section_group(section, *y));
    }

    svg.push_str("</svg>");
    svg
}

/// Height of the zone area. Trailing sections start where the
/// specifications zone begins.
fn diagram_height(layout: &DiagramLayout, config: &Config) -> f32 {
    let page = &config.layout;
    let top_mm = layout.zone(SPECIFICATIONS).map_or_else(
        || page.margins.top + page.working_height() * page.diagram_fraction + page.zone_gap,
        |zone| zone.y,
    );
    top_mm * config.render.scale
}

fn section_group(section: &Section, y: f32) -> String {
    format!(
        "<g id=\"{}\" transform=\"translate(0,{y:.2})\">{}</g>",
        section.name, section.markup
    )
}

fn style_block(theme: &Theme, render: &RenderConfig) -> String {
    format!(
        "<defs><style>\
text {{ font-family: {family}; fill: {text}; }}\
.zone {{ fill: none; stroke: {zone}; stroke-width: 2; stroke-dasharray: 10 5; }}\
.zone-label {{ font-size: 22px; font-weight: bold; fill: {zone_label}; }}\
.wire {{ fill: none; stroke-linecap: round; stroke-linejoin: round; }}\
.component-name {{ font-size: 17px; font-weight: bold; }}\
.component-spec {{ font-size: 14px; fill: {muted}; }}\
.placeholder-label {{ fill: {muted}; }}\
.wire-label {{ font-size: {label_size}px; }}\
.marker {{ font-size: 14px; font-weight: bold; }}\
.diagram-title {{ font-size: 32px; font-weight: bold; }}\
.title {{ font-size: 40px; font-weight: bold; }}\
.badge {{ font-size: 24px; font-weight: bold; fill: {badge}; }}\
.table-title {{ font-size: 24px; font-weight: bold; }}\
.table-header {{ font-size: 20px; font-weight: bold; }}\
.table-strong {{ font-size: 18px; font-weight: bold; }}\
.table-text {{ font-size: 18px; }}\
</style></defs>",
        family = theme.font_family,
        text = theme.text_color,
        zone = theme.zone_stroke,
        zone_label = theme.zone_label_color,
        muted = theme.muted_text_color,
        label_size = render.wire_label_font_size,
        badge = theme.badge_text,
    )
}

fn grid_lines(width: f32, height: f32, render: &RenderConfig, theme: &Theme) -> String {
    let step = render.grid_spacing * render.scale;
    if step <= 0.0 {
        return String::new();
    }
    let mut svg = String::from("<g id=\"grid\">");
    let mut x = step;
    while x < width {
        svg.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"0\" x2=\"{x:.2}\" y2=\"{height:.2}\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            theme.grid_color
        ));
        x += step;
    }
    let mut y = step;
    while y < height {
        svg.push_str(&format!(
            "<line x1=\"0\" y1=\"{y:.2}\" x2=\"{width:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            theme.grid_color
        ));
        y += step;
    }
    svg.push_str("</g>");
    svg
}

fn zones_svg(layout: &DiagramLayout, scale: f32) -> String {
    let mut svg = String::from("<g id=\"zones\">");
    for zone in layout.zones.iter().filter(|zone| zone.id != SPECIFICATIONS) {
        let offset = if zone.id == crate::layout::BATTERY {
            BATTERY_ZONE_LABEL_OFFSET
        } else {
            ZONE_LABEL_OFFSET
        };
        svg.push_str(&format!(
            "<rect class=\"zone\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\"/>",
            zone.x * scale,
            zone.y * scale,
            zone.width * scale,
            zone.height * scale,
            scale * 0.5
        ));
        svg.push_str(&format!(
            "<text class=\"zone-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            (zone.x + zone.width / 2.0) * scale,
            (zone.y - offset) * scale,
            escape_xml(&zone.name)
        ));
    }
    svg.push_str("</g>");
    svg
}

fn wires_svg(wires: &[Wire], config: &Config) -> String {
    let scale = config.render.scale;
    let mut svg = String::from("<g id=\"wires\">");
    for wire in wires {
        let points: Vec<(f32, f32)> = wire
            .path
            .iter()
            .map(|(x, y)| (x * scale, y * scale))
            .collect();
        svg.push_str(&format!(
            "<path id=\"{}\" class=\"wire wire-{}\" d=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            escape_xml(&wire.id),
            wire.kind.to_string().to_ascii_lowercase(),
            points_to_path(&points),
            wire.color,
            wire.stroke_width * config.render.wire_stroke_scale
        ));
    }
    svg.push_str("</g>");
    svg
}

fn components_svg(layout: &DiagramLayout, symbols: &SymbolLibrary, scale: f32, theme: &Theme) -> String {
    let mut missing = BTreeSet::new();
    let mut svg = String::from("<g id=\"components\">");
    for component in &layout.components {
        match symbols.get(component.component_type.as_str()) {
            Some(markup) => svg.push_str(&symbols::embed_symbol(component, markup, scale)),
            None => {
                missing.insert(component.component_type);
                svg.push_str(&symbols::placeholder_symbol(component, scale, theme));
            }
        }
    }
    svg.push_str("</g>");
    for kind in missing {
        tracing::warn!(component = %kind, "symbol not found, drawing placeholder");
    }
    svg
}

fn captions_svg(layout: &DiagramLayout, job: &JobDescriptor, sys: &SystemConfiguration, scale: f32) -> String {
    let mut svg = String::from("<g id=\"captions\">");
    let mut string_idx = 0;
    for component in &layout.components {
        let string_panels = if component.component_type == ComponentType::SolarString {
            string_idx += 1;
            sys.string_sizes.get(string_idx - 1).copied()
        } else {
            None
        };
        let cx = (component.x + component.width / 2.0) * scale;
        let top = (component.y + component.height) * scale;
        svg.push_str(&format!(
            "<text class=\"component-name\" x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
            top + 18.0,
            component.component_type.display_name()
        ));
        for (idx, line) in caption_lines(component.component_type, job, string_panels)
            .iter()
            .enumerate()
        {
            svg.push_str(&format!(
                "<text class=\"component-spec\" x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\">{}</text>",
                top + 34.0 + idx as f32 * 16.0,
                escape_xml(line)
            ));
        }
    }
    svg.push_str("</g>");
    svg
}

/// Spec lines under a symbol. Captured equipment details win; a component
/// with none of its fields captured keeps the generic text.
fn caption_lines(kind: ComponentType, job: &JobDescriptor, string_panels: Option<u32>) -> Vec<String> {
    let specs = job.specs();
    let text = |value: &Option<String>| non_empty(value).map(str::to_string);
    let joined = |parts: [Option<&str>; 2]| {
        let parts: Vec<&str> = parts.into_iter().flatten().collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    };

    let lines: Vec<Option<String>> = match kind {
        ComponentType::SolarString => vec![
            specs.panel_wattage.map(|watts| {
                format!("{} × {}W", string_panels.unwrap_or(0), format_number(watts))
            }),
            text(&specs.panel_model),
            match (specs.panel_voc, specs.panel_isc) {
                (Some(voc), Some(isc)) => Some(format!(
                    "Voc {}V | Isc {}A",
                    format_number(voc),
                    format_number(isc)
                )),
                (Some(voc), None) => Some(format!("Voc {}V", format_number(voc))),
                (None, Some(isc)) => Some(format!("Isc {}A", format_number(isc))),
                (None, None) => None,
            },
        ],
        ComponentType::DcCombiner => vec![
            text(&specs.dc_breaker_rating).map(|rating| format!("DC Breaker {rating}")),
        ],
        ComponentType::DcIsolator => vec![text(&specs.dc_isolator_rating), text(&specs.dc_isolator_ip_rating)],
        ComponentType::StringInverter | ComponentType::HybridInverter => vec![
            joined([
                non_empty(&specs.inverter_manufacturer),
                non_empty(&specs.inverter_model).or(non_empty(&job.inverter_model)),
            ]),
            specs.inverter_efficiency.map(|eff| format!("η {}%", format_number(eff))),
            specs.inverter_phases.map(|phases| format!("{phases}-phase")),
        ],
        ComponentType::Battery => vec![
            joined([
                non_empty(&specs.battery_manufacturer),
                non_empty(&specs.battery_model),
            ]),
            text(&specs.battery_chemistry),
            specs.battery_voltage.map(|volts| format!("{}V DC", format_number(volts))),
        ],
        ComponentType::AcIsolator => vec![text(&specs.ac_isolator_rating), text(&specs.ac_isolator_ip_rating)],
        ComponentType::AcBreaker => vec![
            joined([non_empty(&specs.ac_breaker_rating), non_empty(&specs.ac_breaker_poles)])
                .map(|rating| format!("MCB {rating}")),
            joined([non_empty(&specs.rcd_rating), non_empty(&specs.rcd_type)])
                .map(|rcd| format!("RCD {rcd}")),
        ],
        ComponentType::AcMeter => vec![
            text(&specs.meter_type),
            text(&specs.meter_location),
            specs
                .meter_bidirectional
                .map(|bi| (if bi { "Bi-directional" } else { "Import only" }).to_string()),
        ],
        ComponentType::MainSwitchboard => vec![
            text(&specs.main_switch_rating).map(|rating| format!("Main Switch: {rating}")),
            text(&specs.busbar_rating).map(|rating| format!("Busbar: {rating}")),
        ],
        ComponentType::GridConnection => vec![
            text(&specs.phase_configuration),
            specs
                .export_limit_kw
                .map(|kw| format!("Export limit {}kW", format_number(kw))),
        ],
    };

    let lines: Vec<String> = lines.into_iter().flatten().take(MAX_CAPTION_SPECS).collect();
    if lines.is_empty() {
        kind.generic_specs().iter().map(|line| line.to_string()).collect()
    } else {
        lines
    }
}

fn labels_svg(labels: &[WireLabel], scale: f32, theme: &Theme) -> String {
    let mut svg = String::from("<g id=\"wire-labels\">");
    for label in labels {
        let (cx, cy) = (label.anchor.0 * scale, label.anchor.1 * scale);
        let (w, h) = (label.width * scale, label.height * scale);
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"3\" fill=\"{}\" fill-opacity=\"0.95\" stroke=\"{}\" stroke-width=\"1\"/>",
            cx - w / 2.0,
            cy - h / 2.0,
            theme.label_background,
            theme.label_border
        ));
        svg.push_str(&format!(
            "<text class=\"wire-label\" x=\"{cx:.2}\" y=\"{cy:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
            escape_xml(&label.text)
        ));
        for (idx, marker) in label.markers.iter().enumerate() {
            // Nudge markers off the symbol edge into the wire run.
            let dx = if idx == 0 { MARKER_RADIUS * 1.5 } else { -MARKER_RADIUS * 1.5 };
            let mx = marker.point.0 * scale + dx;
            let my = marker.point.1 * scale - MARKER_RADIUS * 1.5;
            svg.push_str(&format!(
                "<circle cx=\"{mx:.2}\" cy=\"{my:.2}\" r=\"{MARKER_RADIUS:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/><text class=\"marker\" x=\"{mx:.2}\" y=\"{my:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" style=\"fill:{}\">{}</text>",
                theme.label_background, marker.color, marker.color, marker.symbol
            ));
        }
    }
    svg.push_str("</g>");
    svg
}

pub(crate) fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(family) = theme.font_family.split(',').next() {
        opt.font_family = family.trim().trim_matches('"').to_string();
    }
    opt.default_size = usvg::Size::from_wh(render_cfg.png_width, render_cfg.png_height)
        .ok_or_else(|| anyhow::anyhow!("invalid PNG size {}x{}", render_cfg.png_width, render_cfg.png_height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let target_w = render_cfg.png_width.max(1.0);
    let zoom = target_w / size.width().max(1) as f32;
    let out_w = target_w.round() as u32;
    let out_h = (size.height() as f32 * zoom).round().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(out_w, out_h)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(zoom, zoom),
        &mut pixmap_mut,
    );
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}
