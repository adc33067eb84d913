use std::collections::BTreeMap;

use serde::Deserialize;
use sld_renderer::{JobDescriptor, RenderOptions, SymbolLibrary, Theme, Variant, render_sld};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SldRenderOptions {
    variant: Option<String>,
    theme: Option<String>,
    font_family: Option<String>,
    show_zones: Option<bool>,
}

fn build_render_options(options: SldRenderOptions) -> RenderOptions {
    let mut render_options = RenderOptions::default();
    if let Some(variant) = options.variant.as_deref().and_then(Variant::parse) {
        render_options.variant = variant;
    }
    if options.theme.as_deref() == Some("monochrome") {
        render_options.config.theme = Theme::monochrome();
    }
    if let Some(font_family) = options.font_family {
        render_options.config.theme.font_family = font_family;
    }
    if let Some(show_zones) = options.show_zones {
        render_options.config.render.show_zones = show_zones;
    }
    render_options
}

fn parse_json<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|error| error.to_string())
}

fn render(
    job_json: &str,
    symbols_json: Option<String>,
    options_json: Option<String>,
) -> Result<String, String> {
    let job: JobDescriptor = parse_json(job_json)?;
    let symbols = match symbols_json {
        Some(raw) => SymbolLibrary::from_map(parse_json::<BTreeMap<String, String>>(&raw)?),
        None => SymbolLibrary::empty(),
    };
    let options = match options_json {
        Some(raw) => parse_json::<SldRenderOptions>(&raw)?,
        None => SldRenderOptions::default(),
    };
    render_sld(&job, &symbols, &build_render_options(options)).map_err(|error| error.to_string())
}

/// Renders a camelCase job descriptor. `symbols_json` maps component type
/// keys to SVG markup.
#[wasm_bindgen]
pub fn render_sld_svg(
    job_json: &str,
    symbols_json: Option<String>,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    render(job_json, symbols_json, options_json).map_err(|error| JsValue::from_str(&error))
}
