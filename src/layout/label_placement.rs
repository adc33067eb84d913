// Wire label anchoring. A local greedy search over segment midpoints of
// each wire path; pure geometry in logical millimetres, no SVG here.

use serde::Serialize;

use super::routing::{DC_NEGATIVE_COLOR, DC_POSITIVE_COLOR, Wire, WireKind};
use super::text::text_width;
use super::types::{ComponentPosition, Point, Rect};
use crate::config::{LayoutConfig, RenderConfig};
use crate::theme::Theme;

/// Horizontal padding around label text, in output units.
const LABEL_PAD_X: f32 = 4.0;
/// Vertical padding around label text, in output units.
const LABEL_PAD_Y: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolarityMarker {
    pub point: Point,
    pub symbol: char,
    pub color: &'static str,
}

/// Render-time label for one wire; never stored with the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLabel {
    pub wire_id: String,
    pub text: String,
    /// Centre of the label box.
    pub anchor: Point,
    pub width: f32,
    pub height: f32,
    /// False when every candidate sat inside a component's keep-out box
    /// and the best-scoring one was used anyway.
    pub collision_free: bool,
    pub markers: Vec<PolarityMarker>,
}

#[derive(Debug, Clone)]
pub struct LabelSettings {
    /// Keep-out padding around component symbols.
    pub component_pad: f32,
    /// Extra keep-out space below symbols for their captions.
    pub caption_space: f32,
    pub marker_min_length: f32,
    pub font_size: f32,
    pub font_family: String,
    pub scale: f32,
    pub use_fonts: bool,
}

impl LabelSettings {
    pub fn new(layout: &LayoutConfig, render: &RenderConfig, theme: &Theme) -> Self {
        Self {
            component_pad: layout.label_component_pad,
            caption_space: layout.label_caption_space,
            marker_min_length: layout.polarity_marker_min_length,
            font_size: render.wire_label_font_size,
            font_family: theme.font_family.clone(),
            scale: render.scale.max(f32::EPSILON),
            use_fonts: render.measure_text_with_fonts,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    point: Point,
    score: f32,
    clear: bool,
}

/// Picks one anchor per wire.
///
/// Candidates inside any component keep-out box (symbol plus padding plus
/// caption space) are disqualified. Survivors score
/// `segment_length + 2 * distance_to_nearest_keep_out`; the highest wins and
/// ties go to the earlier segment. Candidates whose label box would cover an
/// already placed label only win when nothing else qualifies.
pub fn resolve_wire_labels(
    wires: &[Wire],
    components: &[ComponentPosition],
    settings: &LabelSettings,
) -> Vec<WireLabel> {
    let keep_out: Vec<Rect> = components
        .iter()
        .map(|comp| keep_out_rect(comp.rect(), settings))
        .collect();
    let mut placed: Vec<Rect> = Vec::with_capacity(wires.len());
    let mut labels = Vec::with_capacity(wires.len());

    for wire in wires {
        let (width, height) = label_size(&wire.label, settings);
        let candidates = score_candidates(&wire.path, &keep_out);

        let free = |cand: &Candidate| {
            let rect = centered_rect(cand.point, width, height);
            !placed.iter().any(|other| overlap_area(&rect, other) > 0.0)
        };
        let best = best_of(candidates.iter().filter(|c| c.clear && free(*c)))
            .or_else(|| best_of(candidates.iter().filter(|c| c.clear)));
        let (anchor, collision_free) = match best {
            Some(cand) => (cand.point, true),
            None => {
                let fallback = best_of(candidates.iter())
                    .map(|cand| cand.point)
                    .or_else(|| wire.path.first().copied())
                    .unwrap_or((0.0, 0.0));
                tracing::debug!(wire = %wire.id, "no clear label position, using best effort");
                (fallback, false)
            }
        };

        placed.push(centered_rect(anchor, width, height));
        labels.push(WireLabel {
            wire_id: wire.id.clone(),
            text: wire.label.clone(),
            anchor,
            width,
            height,
            collision_free,
            markers: polarity_markers(wire, settings.marker_min_length),
        });
    }
    labels
}

fn score_candidates(path: &[Point], keep_out: &[Rect]) -> Vec<Candidate> {
    path.windows(2)
        .map(|seg| {
            let point = ((seg[0].0 + seg[1].0) / 2.0, (seg[0].1 + seg[1].1) / 2.0);
            let seg_len = ((seg[1].0 - seg[0].0).powi(2) + (seg[1].1 - seg[0].1).powi(2)).sqrt();
            let clear = !keep_out.iter().any(|rect| point_inside_rect(point, rect));
            let nearest = keep_out
                .iter()
                .map(|rect| point_rect_distance(point, rect))
                .fold(f32::INFINITY, f32::min);
            let nearest = if nearest.is_finite() { nearest } else { 0.0 };
            Candidate {
                point,
                score: seg_len + 2.0 * nearest,
                clear,
            }
        })
        .collect()
}

fn best_of<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<&'a Candidate> {
    let mut best: Option<&Candidate> = None;
    for cand in candidates {
        if best.is_none_or(|current| cand.score > current.score) {
            best = Some(cand);
        }
    }
    best
}

fn polarity_markers(wire: &Wire, min_length: f32) -> Vec<PolarityMarker> {
    if wire.kind != WireKind::Dc {
        return Vec::new();
    }
    let (Some(start), Some(end)) = (wire.path.first(), wire.path.last()) else {
        return Vec::new();
    };
    let span = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();
    if span <= min_length {
        return Vec::new();
    }
    vec![
        PolarityMarker {
            point: *start,
            symbol: '+',
            color: DC_POSITIVE_COLOR,
        },
        PolarityMarker {
            point: *end,
            symbol: '−',
            color: DC_NEGATIVE_COLOR,
        },
    ]
}

fn label_size(text: &str, settings: &LabelSettings) -> (f32, f32) {
    let text_w = text_width(text, settings.font_size, &settings.font_family, settings.use_fonts);
    (
        (text_w + LABEL_PAD_X * 2.0) / settings.scale,
        (settings.font_size + LABEL_PAD_Y * 2.0) / settings.scale,
    )
}

pub(crate) fn keep_out_rect(rect: Rect, settings: &LabelSettings) -> Rect {
    let pad = settings.component_pad;
    (
        rect.0 - pad,
        rect.1 - pad,
        rect.2 + pad * 2.0,
        rect.3 + pad + settings.caption_space,
    )
}

fn centered_rect(center: Point, width: f32, height: f32) -> Rect {
    (center.0 - width / 2.0, center.1 - height / 2.0, width, height)
}

fn point_rect_distance(point: Point, rect: &Rect) -> f32 {
    let dx = (rect.0 - point.0).max(0.0).max(point.0 - (rect.0 + rect.2));
    let dy = (rect.1 - point.1).max(0.0).max(point.1 - (rect.1 + rect.3));
    (dx * dx + dy * dy).sqrt()
}

fn point_inside_rect(point: Point, rect: &Rect) -> bool {
    point.0 >= rect.0
        && point.0 <= rect.0 + rect.2
        && point.1 >= rect.1
        && point.1 <= rect.1 + rect.3
}

fn overlap_area(a: &Rect, b: &Rect) -> f32 {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = (a.0 + a.2).min(b.0 + b.2);
    let y1 = (a.1 + a.3).min(b.1 + b.3);
    (x1 - x0).max(0.0) * (y1 - y0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ComponentType;
    use crate::layout::routing::{WireOptions, create_wire};

    fn settings() -> LabelSettings {
        LabelSettings::new(
            &LayoutConfig::default(),
            &RenderConfig::default(),
            &Theme::standard(),
        )
    }

    fn comp(id: &str, x: f32, y: f32, w: f32, h: f32) -> ComponentPosition {
        ComponentPosition {
            id: id.to_string(),
            component_type: ComponentType::AcBreaker,
            x,
            y,
            width: w,
            height: h,
            rotation: 0.0,
            zone_id: "ac_protection".to_string(),
        }
    }

    #[test]
    fn point_rect_distance_outside_and_inside() {
        let rect: Rect = (0.0, 0.0, 10.0, 10.0);
        assert_eq!(point_rect_distance((5.0, 5.0), &rect), 0.0);
        assert_eq!(point_rect_distance((13.0, 14.0), &rect), 5.0);
    }

    #[test]
    fn overlap_area_partial_overlap() {
        let a: Rect = (0.0, 0.0, 10.0, 10.0);
        let b: Rect = (5.0, 5.0, 10.0, 10.0);
        assert_eq!(overlap_area(&a, &b), 25.0);
        assert_eq!(overlap_area(&a, &(20.0, 20.0, 1.0, 1.0)), 0.0);
    }

    #[test]
    fn keep_out_reaches_below_for_captions() {
        let rect = keep_out_rect((10.0, 10.0, 20.0, 10.0), &settings());
        assert_eq!(rect, (8.5, 8.5, 23.0, 18.5));
    }

    #[test]
    fn picks_a_clear_segment_when_one_exists() {
        let from = comp("a", 0.0, 0.0, 20.0, 20.0);
        let to = comp("b", 100.0, 60.0, 20.0, 20.0);
        let blocker = comp("c", 50.0, 20.0, 20.0, 30.0);
        let components = vec![from.clone(), to.clone(), blocker];
        let wire = create_wire(&from, &to, WireOptions::ac(230.0, 20.0));
        let labels = resolve_wire_labels(&[wire], &components, &settings());
        let label = &labels[0];
        assert!(label.collision_free);
        let s = settings();
        for comp in &components {
            assert!(!point_inside_rect(label.anchor, &keep_out_rect(comp.rect(), &s)));
        }
    }

    #[test]
    fn highest_score_wins_and_ties_go_first() {
        let from = comp("a", 0.0, 0.0, 10.0, 10.0);
        let to = comp("b", 50.0, 0.0, 10.0, 10.0);
        let wire = create_wire(&from, &to, WireOptions::dc(400.0, 10.0));
        // Straight run: segments 0 and 2 have equal length, the jog has none.
        let labels = resolve_wire_labels(&[wire.clone()], &[], &settings());
        assert_eq!(labels[0].anchor, ((10.0 + 30.0) / 2.0, 5.0));
        assert!(labels[0].collision_free);
    }

    #[test]
    fn falls_back_when_every_candidate_is_blocked() {
        let from = comp("a", 0.0, 0.0, 10.0, 10.0);
        let to = comp("b", 12.0, 0.0, 10.0, 10.0);
        let components = vec![from.clone(), to.clone()];
        let wire = create_wire(&from, &to, WireOptions::dc(400.0, 10.0));
        let labels = resolve_wire_labels(&[wire], &components, &settings());
        assert!(!labels[0].collision_free);
        assert_eq!(labels[0].anchor.1, 5.0);
    }

    #[test]
    fn later_labels_avoid_earlier_ones() {
        let a = comp("a", 0.0, 0.0, 10.0, 10.0);
        let b = comp("b", 0.0, 40.0, 10.0, 10.0);
        let target = comp("t", 80.0, 20.0, 10.0, 10.0);
        let w1 = create_wire(&a, &target, WireOptions::dc(400.0, 10.0).label("String 1+"));
        let w2 = create_wire(&b, &target, WireOptions::dc(400.0, 10.0).label("String 2+"));
        let labels = resolve_wire_labels(&[w1, w2], &[], &settings());
        let r1 = centered_rect(labels[0].anchor, labels[0].width, labels[0].height);
        let r2 = centered_rect(labels[1].anchor, labels[1].width, labels[1].height);
        assert_eq!(overlap_area(&r1, &r2), 0.0);
    }

    #[test]
    fn polarity_markers_only_on_long_dc_runs() {
        let a = comp("a", 0.0, 0.0, 10.0, 10.0);
        let near = comp("n", 20.0, 0.0, 10.0, 10.0);
        let far = comp("f", 60.0, 0.0, 10.0, 10.0);
        let s = settings();

        let short = create_wire(&a, &near, WireOptions::dc(400.0, 10.0));
        assert!(resolve_wire_labels(&[short], &[], &s)[0].markers.is_empty());

        let long = create_wire(&a, &far, WireOptions::dc(400.0, 10.0));
        let markers = &resolve_wire_labels(&[long], &[], &s)[0].markers;
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].symbol, '+');
        assert_eq!(markers[0].color, "#FF0000");
        assert_eq!(markers[1].symbol, '−');

        let ac = create_wire(&a, &far, WireOptions::ac(230.0, 10.0));
        assert!(resolve_wire_labels(&[ac], &[], &s)[0].markers.is_empty());
    }
}
