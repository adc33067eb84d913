use crate::text_metrics;

/// Average advance as a share of the font size when no font is measured.
const AVERAGE_CHAR_FACTOR: f32 = 0.56;

pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVERAGE_CHAR_FACTOR
}

/// Rendered width of a single line. Font measurement is opt-in because it
/// ties the output to whatever fonts the host has installed.
pub fn text_width(text: &str, font_size: f32, font_family: &str, use_fonts: bool) -> f32 {
    if use_fonts
        && let Some(width) = text_metrics::measure_text_width(text, font_size, font_family)
    {
        return width;
    }
    estimate_text_width(text, font_size)
}

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_length_and_size() {
        assert_eq!(estimate_text_width("", 24.0), 0.0);
        let short = estimate_text_width("AC Output", 24.0);
        let long = estimate_text_width("AC Output AC Output", 24.0);
        assert!(long > short * 2.0);
        assert!((short - 9.0 * 24.0 * 0.56).abs() < 1e-3);
    }

    #[test]
    fn fonts_off_uses_the_estimate() {
        assert_eq!(
            text_width("Battery DC", 24.0, "Arial", false),
            estimate_text_width("Battery DC", 24.0)
        );
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("2C × 6mm²", 4), "2C ×");
        assert_eq!(truncate_chars("short", 40), "short");
    }
}
