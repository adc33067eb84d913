use serde::{Deserialize, Serialize};

/// Chrome colors and typography for the drawing sheet. Conductor colors are
/// fixed by wiring convention and live in `layout::routing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub zone_stroke: String,
    pub zone_label_color: String,
    pub placeholder_fill: String,
    pub placeholder_stroke: String,
    pub label_background: String,
    pub label_border: String,
    pub table_border: String,
    pub table_header_fill: String,
    pub footer_header_fill: String,
    pub approval_highlight: String,
    pub badge_fill: String,
    pub badge_text: String,
    pub grid_color: String,
}

impl Theme {
    pub fn standard() -> Self {
        Self {
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            font_size: 16.0,
            background: "#FFFFFF".to_string(),
            text_color: "#000000".to_string(),
            muted_text_color: "#333333".to_string(),
            zone_stroke: "#999999".to_string(),
            zone_label_color: "#333333".to_string(),
            placeholder_fill: "#F0F0F0".to_string(),
            placeholder_stroke: "#999999".to_string(),
            label_background: "#FFFFFF".to_string(),
            label_border: "#CCCCCC".to_string(),
            table_border: "#000000".to_string(),
            table_header_fill: "#E8E8E8".to_string(),
            footer_header_fill: "#E3F2FD".to_string(),
            approval_highlight: "#FFF9C4".to_string(),
            badge_fill: "#2E7D32".to_string(),
            badge_text: "#FFFFFF".to_string(),
            grid_color: "#EEEEEE".to_string(),
        }
    }

    /// Greyscale chrome for plain laser prints. Wires keep their colors.
    pub fn monochrome() -> Self {
        Self {
            zone_stroke: "#666666".to_string(),
            zone_label_color: "#000000".to_string(),
            table_header_fill: "#DDDDDD".to_string(),
            footer_header_fill: "#EEEEEE".to_string(),
            approval_highlight: "#F5F5F5".to_string(),
            badge_fill: "#000000".to_string(),
            ..Self::standard()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}
