use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Spacing {
    pub horizontal: f32,
    pub vertical: f32,
    pub component: f32,
}

/// Page geometry and zone splits, all in logical millimetres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
    pub spacing: Spacing,
    pub zone_gap: f32,
    /// Share of the working height used by the diagram zones; the rest is
    /// reserved for the specifications zone.
    pub diagram_fraction: f32,
    pub roof_fraction: f32,
    pub dc_protection_fraction: f32,
    pub inverter_fraction: f32,
    pub ac_protection_fraction: f32,
    /// Share of the diagram height given to the inverter zone when the
    /// battery zone sits beneath it.
    pub inverter_height_fraction: f32,
    pub min_symbol_width: f32,
    pub min_symbol_height: f32,
    pub max_panels_per_string: u32,
    pub label_component_pad: f32,
    pub label_caption_space: f32,
    pub polarity_marker_min_length: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 297.0,
            page_height: 210.0,
            margins: Margins {
                top: 25.0,
                right: 10.0,
                bottom: 10.0,
                left: 10.0,
            },
            spacing: Spacing {
                horizontal: 40.0,
                vertical: 10.0,
                component: 10.0,
            },
            zone_gap: 8.0,
            diagram_fraction: 0.5,
            roof_fraction: 0.22,
            dc_protection_fraction: 0.14,
            inverter_fraction: 0.20,
            ac_protection_fraction: 0.20,
            inverter_height_fraction: 0.6,
            min_symbol_width: 25.0,
            min_symbol_height: 20.0,
            max_panels_per_string: 11,
            label_component_pad: 1.5,
            label_caption_space: 7.0,
            polarity_marker_min_length: 20.0,
        }
    }
}

impl LayoutConfig {
    pub fn working_width(&self) -> f32 {
        self.page_width - self.margins.left - self.margins.right
    }

    pub fn working_height(&self) -> f32 {
        self.page_height - self.margins.top - self.margins.bottom
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output units per logical millimetre.
    pub scale: f32,
    pub show_zones: bool,
    pub show_grid: bool,
    pub grid_spacing: f32,
    pub title: Option<String>,
    pub wire_label_font_size: f32,
    pub wire_stroke_scale: f32,
    pub table_row_height: f32,
    pub table_line_height: f32,
    pub section_gap: f32,
    /// Measure label text against installed fonts instead of the fixed
    /// per-character estimate. Output then depends on the host's fonts.
    pub measure_text_with_fonts: bool,
    pub png_width: f32,
    pub png_height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 10.0,
            show_zones: true,
            show_grid: false,
            grid_spacing: 10.0,
            title: None,
            wire_label_font_size: 24.0,
            wire_stroke_scale: 2.0,
            table_row_height: 60.0,
            table_line_height: 32.0,
            section_gap: 40.0,
            measure_text_with_fonts: false,
            png_width: 2970.0,
            png_height: 2100.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::standard(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    font_family: Option<String>,
    page: Option<PageConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    margins: Option<Margins>,
    spacing: Option<Spacing>,
    zone_gap: Option<f32>,
    diagram_fraction: Option<f32>,
    max_panels_per_string: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    scale: Option<f32>,
    show_zones: Option<bool>,
    show_grid: Option<bool>,
    title: Option<String>,
    wire_label_font_size: Option<f32>,
    table_row_height: Option<f32>,
    measure_text_with_fonts: Option<bool>,
}

/// Loads a JSON (or JSON5) config file on top of the defaults. Every key is
/// optional; a missing path yields the defaults unchanged.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let parsed: ConfigFile = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "monochrome" | "mono" => config.theme = Theme::monochrome(),
            "standard" | "default" => config.theme = Theme::standard(),
            other => tracing::warn!(theme = other, "unknown theme, keeping default"),
        }
    }
    if let Some(v) = parsed.font_family {
        config.theme.font_family = v;
    }

    if let Some(page) = parsed.page {
        if let Some(v) = page.width {
            config.layout.page_width = v;
        }
        if let Some(v) = page.height {
            config.layout.page_height = v;
        }
        if let Some(v) = page.margins {
            config.layout.margins = v;
        }
        if let Some(v) = page.spacing {
            config.layout.spacing = v;
        }
        if let Some(v) = page.zone_gap {
            config.layout.zone_gap = v;
        }
        if let Some(v) = page.diagram_fraction {
            config.layout.diagram_fraction = v.clamp(0.1, 0.9);
        }
        if let Some(v) = page.max_panels_per_string {
            config.layout.max_panels_per_string = v.max(1);
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.scale {
            config.render.scale = v;
        }
        if let Some(v) = render.show_zones {
            config.render.show_zones = v;
        }
        if let Some(v) = render.show_grid {
            config.render.show_grid = v;
        }
        if render.title.is_some() {
            config.render.title = render.title;
        }
        if let Some(v) = render.wire_label_font_size {
            config.render.wire_label_font_size = v;
        }
        if let Some(v) = render.table_row_height {
            config.render.table_row_height = v;
        }
        if let Some(v) = render.measure_text_with_fonts {
            config.render.measure_text_with_fonts = v;
        }
    }
}
