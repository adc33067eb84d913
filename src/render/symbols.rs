use once_cell::sync::Lazy;
use regex::Regex;

use super::escape_xml;
use crate::layout::ComponentPosition;
use crate::theme::Theme;

const DEFAULT_VIEW_BOX: &str = "0 0 100 100";

static VIEW_BOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"viewBox\s*=\s*["']([^"']+)["']"#).expect("viewBox regex"));
static XML_PROLOG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->").expect("prolog regex"));
static SVG_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("svg regex"));

/// Symbol markup reduced to what a nested `<svg>` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolArt {
    pub view_box: String,
    pub body: String,
}

/// Pulls the viewBox and inner content out of a standalone symbol file.
/// Markup without an `<svg>` wrapper is treated as bare content.
pub fn parse_symbol(markup: &str) -> SymbolArt {
    let cleaned = XML_PROLOG_RE.replace_all(markup, "");
    let Some(open) = SVG_OPEN_RE.find(&cleaned) else {
        return SymbolArt {
            view_box: DEFAULT_VIEW_BOX.to_string(),
            body: cleaned.trim().to_string(),
        };
    };
    let view_box = VIEW_BOX_RE
        .captures(open.as_str())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_VIEW_BOX.to_string());

    let rest = &cleaned[open.end()..];
    let body = if open.as_str().trim_end().ends_with("/>") {
        ""
    } else {
        rest.rfind("</svg>").map_or(rest, |end| &rest[..end])
    };
    SymbolArt {
        view_box,
        body: body.trim().to_string(),
    }
}

/// Nests a symbol into the component's bounding box, preserving its aspect
/// ratio.
pub fn embed_symbol(component: &ComponentPosition, markup: &str, scale: f32) -> String {
    let art = parse_symbol(markup);
    let (x, y, w, h) = scaled_rect(component, scale);
    let mut svg = format!(
        "<svg id=\"{}\" class=\"symbol\" x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" viewBox=\"{}\" preserveAspectRatio=\"xMidYMid meet\"",
        escape_xml(&component.id),
        escape_xml(&art.view_box),
    );
    if component.rotation != 0.0 {
        svg.push_str(&format!(
            " transform=\"rotate({:.2} {:.2} {:.2})\"",
            component.rotation,
            x + w / 2.0,
            y + h / 2.0
        ));
    }
    svg.push('>');
    svg.push_str(&art.body);
    svg.push_str("</svg>");
    svg
}

/// Box with the type name for components whose symbol is missing.
pub fn placeholder_symbol(component: &ComponentPosition, scale: f32, theme: &Theme) -> String {
    let (x, y, w, h) = scaled_rect(component, scale);
    let font_size = (h * 0.18).clamp(10.0, 20.0);
    format!(
        "<g id=\"{}\" class=\"placeholder\"><rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\" stroke-dasharray=\"6 3\"/><text class=\"placeholder-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-size=\"{font_size:.2}\">{}</text></g>",
        escape_xml(&component.id),
        theme.placeholder_fill,
        theme.placeholder_stroke,
        x + w / 2.0,
        y + h / 2.0,
        component.component_type.as_str(),
    )
}

fn scaled_rect(component: &ComponentPosition, scale: f32) -> (f32, f32, f32, f32) {
    (
        component.x * scale,
        component.y * scale,
        component.width * scale,
        component.height * scale,
    )
}
