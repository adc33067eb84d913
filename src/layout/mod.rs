mod error;
pub(crate) mod label_placement;
pub(crate) mod routing;
pub(crate) mod text;
pub(crate) mod types;
pub use error::LayoutError;
pub use label_placement::{LabelSettings, PolarityMarker, WireLabel, resolve_wire_labels};
pub use routing::{
    AC_ACTIVE_COLOR, AC_NEUTRAL_COLOR, ConnectionRef, DC_NEGATIVE_COLOR, DC_POSITIVE_COLOR,
    EARTH_COLOR, Polarity, Wire, WireKind, WireOptions, auto_wire_system, create_wire,
    stroke_width_for_current, wire_color,
};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::{ComponentType, SystemConfiguration};

/// Fallback symbol size for a zone the engine does not know.
const UNKNOWN_ZONE_SIZE: SymbolSize = SymbolSize {
    width: 40.0,
    height: 30.0,
};

// Target width/height ratios per symbol role.
const STRING_ASPECT: f32 = 1.8;
const DC_PROTECTION_ASPECT: f32 = 1.2;
const INVERTER_ASPECT: f32 = 1.3;
const BATTERY_ASPECT: f32 = 1.5;
const AC_PROTECTION_ASPECT: f32 = 1.2;
const GRID_ASPECT: f32 = 1.0;

/// Partitions the page into fixed zones and places component symbols.
///
/// The engine only holds the zone template. Each generation call works on
/// a fresh [`DiagramLayout`], so repeated calls with the same input give the
/// same positions.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: LayoutConfig,
    zones: Vec<Zone>,
}

impl LayoutEngine {
    pub fn new(config: &LayoutConfig) -> Self {
        let zones = build_zones(config);
        tracing::debug!(zones = zones.len(), "built zone template");
        Self {
            config: config.clone(),
            zones,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    /// Empty layout over the zone template.
    pub fn new_layout(&self) -> DiagramLayout {
        DiagramLayout {
            zones: self.zones.clone(),
            components: Vec::new(),
        }
    }

    /// Places one symbol in a zone and returns its arena index.
    ///
    /// Alignment is measured from the zone edges inset by the component
    /// spacing, then `placement.offset` is added. The final rectangle is
    /// clamped into the zone so the result is always contained. Stacking is
    /// the caller's job: same-zone components need explicit offsets.
    pub fn position_component(
        &self,
        layout: &mut DiagramLayout,
        component_type: ComponentType,
        zone_id: &str,
        width: f32,
        height: f32,
        placement: Placement,
    ) -> Result<usize, LayoutError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(LayoutError::InvalidSize { width, height });
        }
        let zone_idx = layout
            .zones
            .iter()
            .position(|zone| zone.id == zone_id)
            .ok_or_else(|| LayoutError::UnknownZone {
                zone: zone_id.to_string(),
            })?;
        let zone = &layout.zones[zone_idx];
        let inset = self.config.spacing.component;

        let width = width.min(zone.width);
        let height = height.min(zone.height);
        let x = match placement.align {
            HAlign::Left => zone.x + inset,
            HAlign::Center => zone.x + (zone.width - width) / 2.0,
            HAlign::Right => zone.x + zone.width - width - inset,
        } + placement.offset.0;
        let y = match placement.valign {
            VAlign::Top => zone.y + inset,
            VAlign::Middle => zone.y + (zone.height - height) / 2.0,
            VAlign::Bottom => zone.y + zone.height - height - inset,
        } + placement.offset.1;
        // Slack first: `zone.x + zone.width - width` can round below `zone.x`.
        let max_x = zone.x + (zone.width - width).max(0.0);
        let max_y = zone.y + (zone.height - height).max(0.0);
        let x = x.max(zone.x).min(max_x);
        let y = y.max(zone.y).min(max_y);

        let ordinal = layout
            .components
            .iter()
            .filter(|comp| comp.component_type == component_type)
            .count();
        let idx = layout.components.len();
        layout.components.push(ComponentPosition {
            id: format!("{}_{}", component_type.as_str(), ordinal + 1),
            component_type,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            zone_id: zone_id.to_string(),
        });
        layout.zones[zone_idx].components.push(idx);
        Ok(idx)
    }

    /// Symbol size for `count` components stacked in a zone.
    ///
    /// The height target is one slot of the zone's inner height minus the
    /// vertical gap, the width follows `aspect` and is clipped to the inner
    /// width. The minimum readable size applies, but never beyond one slot,
    /// so a full stack always fits the zone.
    pub fn calculate_optimal_size(&self, zone_id: &str, count: usize, aspect: f32) -> SymbolSize {
        let Some(zone) = self.zone(zone_id) else {
            tracing::warn!(zone = zone_id, "sizing for unknown zone, using default");
            return UNKNOWN_ZONE_SIZE;
        };
        let spacing = self.config.spacing;
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        let count = count.max(1) as f32;
        let avail_w = (zone.width - 2.0 * spacing.component).max(1.0);
        let avail_h = (zone.height - 2.0 * spacing.component).max(1.0);
        let slot = avail_h / count;

        let mut height = (slot - spacing.vertical).min(avail_w / aspect);
        let mut width = height * aspect;
        if width > avail_w {
            width = avail_w;
            height = width / aspect;
        }
        SymbolSize {
            width: width.max(self.config.min_symbol_width).min(avail_w),
            height: height.max(self.config.min_symbol_height).min(slot),
        }
    }

    /// Vertical distance between consecutive items of a top-aligned stack.
    /// Uses the configured gap when it fits, otherwise spreads the items
    /// evenly over the inner height.
    fn stack_stride(&self, zone_id: &str, count: usize, height: f32) -> f32 {
        if count <= 1 {
            return 0.0;
        }
        let Some(zone) = self.zone(zone_id) else {
            return height + self.config.spacing.vertical;
        };
        let avail_h = (zone.height - 2.0 * self.config.spacing.component).max(1.0);
        let spread = (avail_h - height).max(0.0) / (count - 1) as f32;
        (height + self.config.spacing.vertical).min(spread)
    }

    /// Places every symbol the system needs. Optional stages are left out
    /// entirely when their flag is off.
    pub fn auto_layout(&self, sys: &SystemConfiguration) -> Result<DiagramLayout, LayoutError> {
        let mut layout = self.new_layout();

        let strings = sys.string_count();
        if strings > 0 {
            let size = self.calculate_optimal_size(ROOF_ARRAY, strings, STRING_ASPECT);
            let stride = self.stack_stride(ROOF_ARRAY, strings, size.height);
            for idx in 0..strings {
                self.position_component(
                    &mut layout,
                    ComponentType::SolarString,
                    ROOF_ARRAY,
                    size.width,
                    size.height,
                    Placement::new(HAlign::Center, VAlign::Top).with_offset(0.0, idx as f32 * stride),
                )?;
            }
        }

        let size = self.calculate_optimal_size(DC_PROTECTION, 2, DC_PROTECTION_ASPECT);
        self.place(&mut layout, ComponentType::DcCombiner, DC_PROTECTION, size, VAlign::Top)?;
        self.place(&mut layout, ComponentType::DcIsolator, DC_PROTECTION, size, VAlign::Middle)?;

        if sys.has_inverter {
            let size = self.calculate_optimal_size(INVERTER, 1, INVERTER_ASPECT);
            let kind = if sys.has_battery {
                ComponentType::HybridInverter
            } else {
                ComponentType::StringInverter
            };
            self.place(&mut layout, kind, INVERTER, size, VAlign::Middle)?;
        }

        if sys.has_battery {
            let size = self.calculate_optimal_size(BATTERY, 1, BATTERY_ASPECT);
            self.place(&mut layout, ComponentType::Battery, BATTERY, size, VAlign::Middle)?;
        }

        let size = self.calculate_optimal_size(AC_PROTECTION, 3, AC_PROTECTION_ASPECT);
        self.place(&mut layout, ComponentType::AcIsolator, AC_PROTECTION, size, VAlign::Top)?;
        self.place(&mut layout, ComponentType::AcBreaker, AC_PROTECTION, size, VAlign::Middle)?;
        self.place(&mut layout, ComponentType::AcMeter, AC_PROTECTION, size, VAlign::Bottom)?;

        if sys.has_grid {
            let size = self.calculate_optimal_size(GRID, 2, GRID_ASPECT);
            self.place(&mut layout, ComponentType::MainSwitchboard, GRID, size, VAlign::Top)?;
            self.place(&mut layout, ComponentType::GridConnection, GRID, size, VAlign::Bottom)?;
        }

        tracing::debug!(
            strings,
            components = layout.components.len(),
            "auto layout complete"
        );
        Ok(layout)
    }

    fn place(
        &self,
        layout: &mut DiagramLayout,
        kind: ComponentType,
        zone_id: &str,
        size: SymbolSize,
        valign: VAlign,
    ) -> Result<usize, LayoutError> {
        self.position_component(
            layout,
            kind,
            zone_id,
            size.width,
            size.height,
            Placement::new(HAlign::Center, valign),
        )
    }
}

impl DiagramLayout {
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn components_of(
        &self,
        kind: ComponentType,
    ) -> impl Iterator<Item = &ComponentPosition> + '_ {
        self.components
            .iter()
            .filter(move |comp| comp.component_type == kind)
    }

    pub fn first_of(&self, kind: ComponentType) -> Option<&ComponentPosition> {
        self.components_of(kind).next()
    }

    pub fn count_of(&self, kind: ComponentType) -> usize {
        self.components_of(kind).count()
    }

    pub fn inverter(&self) -> Option<&ComponentPosition> {
        self.components
            .iter()
            .find(|comp| comp.component_type.is_inverter())
    }
}

fn build_zones(config: &LayoutConfig) -> Vec<Zone> {
    let m = config.margins;
    let ww = config.working_width();
    let wh = config.working_height();
    let dh = wh * config.diagram_fraction;
    let specs_h = wh - dh;
    let gap = config.zone_gap;

    let roof_w = ww * config.roof_fraction;
    let dc_w = ww * config.dc_protection_fraction;
    let inv_w = ww * config.inverter_fraction;
    let ac_w = ww * config.ac_protection_fraction;

    let dc_x = m.left + roof_w + gap;
    let inv_x = dc_x + dc_w + gap;
    let ac_x = inv_x + inv_w + gap;
    let grid_x = ac_x + ac_w + gap;
    let grid_w = (m.left + ww - grid_x).max(1.0);
    let inv_h = dh * config.inverter_height_fraction;

    let zone = |id: &str, name: &str, x: f32, y: f32, width: f32, height: f32| Zone {
        id: id.to_string(),
        name: name.to_string(),
        x,
        y,
        width,
        height,
        components: Vec::new(),
    };

    vec![
        zone(ROOF_ARRAY, "Roof Array", m.left, m.top, roof_w, dh),
        zone(DC_PROTECTION, "DC Protection", dc_x, m.top, dc_w, dh),
        zone(INVERTER, "Inverter", inv_x, m.top, inv_w, inv_h),
        zone(
            BATTERY,
            "Battery Storage",
            inv_x,
            m.top + inv_h + gap,
            inv_w,
            (dh - inv_h - gap).max(1.0),
        ),
        zone(AC_PROTECTION, "AC Protection", ac_x, m.top, ac_w, dh),
        zone(GRID, "Grid Connection", grid_x, m.top, grid_w, dh),
        zone(
            SPECIFICATIONS,
            "System Specifications",
            m.left,
            m.top + dh + gap,
            ww,
            (specs_h - gap).max(1.0),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::electrical::split_strings;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(&LayoutConfig::default())
    }

    fn system(strings: u32, battery: bool, grid: bool) -> SystemConfiguration {
        SystemConfiguration {
            string_sizes: split_strings(strings * 10, 10),
            has_inverter: true,
            has_battery: battery,
            has_grid: grid,
            ..Default::default()
        }
    }

    fn overlaps(a: Rect, b: Rect) -> bool {
        a.0 < b.0 + b.2 && b.0 < a.0 + a.2 && a.1 < b.1 + b.3 && b.1 < a.1 + a.3
    }

    #[test]
    fn zones_are_disjoint_and_on_the_page() {
        let engine = engine();
        let zones = engine.zones();
        assert_eq!(zones.len(), 7);
        for (i, a) in zones.iter().enumerate() {
            assert!(a.x >= 0.0 && a.x + a.width <= 297.0 + 1e-3, "{}", a.id);
            assert!(a.y >= 0.0 && a.y + a.height <= 210.0 + 1e-3, "{}", a.id);
            for b in &zones[i + 1..] {
                assert!(!overlaps(a.rect(), b.rect()), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn roof_zone_matches_page_split() {
        let engine = engine();
        let roof = engine.zone(ROOF_ARRAY).unwrap();
        assert_eq!((roof.x, roof.y), (10.0, 25.0));
        assert!((roof.width - 277.0 * 0.22).abs() < 1e-3);
        assert!((roof.height - 87.5).abs() < 1e-3);
    }

    #[test]
    fn unknown_zone_is_a_hard_error() {
        let engine = engine();
        let mut layout = engine.new_layout();
        let err = engine
            .position_component(
                &mut layout,
                ComponentType::Battery,
                "garage",
                10.0,
                10.0,
                Placement::default(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Zone garage not found");
        assert!(layout.components.is_empty());
    }

    #[test]
    fn zero_size_is_rejected() {
        let engine = engine();
        let mut layout = engine.new_layout();
        let err = engine
            .position_component(
                &mut layout,
                ComponentType::Battery,
                BATTERY,
                0.0,
                10.0,
                Placement::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidSize { .. }));
    }

    #[test]
    fn alignment_is_measured_from_inset_edges() {
        let engine = engine();
        let mut layout = engine.new_layout();
        let zone = engine.zone(GRID).unwrap().clone();
        let left = engine
            .position_component(
                &mut layout,
                ComponentType::GridConnection,
                GRID,
                10.0,
                10.0,
                Placement::new(HAlign::Left, VAlign::Top),
            )
            .unwrap();
        let right = engine
            .position_component(
                &mut layout,
                ComponentType::GridConnection,
                GRID,
                10.0,
                10.0,
                Placement::new(HAlign::Right, VAlign::Bottom),
            )
            .unwrap();
        let left = &layout.components[left];
        let right = &layout.components[right];
        assert_eq!((left.x, left.y), (zone.x + 10.0, zone.y + 10.0));
        assert!((right.x - (zone.x + zone.width - 20.0)).abs() < 1e-3);
        assert!((right.y - (zone.y + zone.height - 20.0)).abs() < 1e-3);
        assert_eq!(left.id, "GRID_CONNECTION_1");
        assert_eq!(right.id, "GRID_CONNECTION_2");
        assert_eq!(layout.zone(GRID).unwrap().components, vec![0, 1]);
    }

    #[test]
    fn oversized_requests_are_clamped_into_the_zone() {
        let engine = engine();
        let mut layout = engine.new_layout();
        let idx = engine
            .position_component(
                &mut layout,
                ComponentType::Battery,
                BATTERY,
                500.0,
                20.0,
                Placement::new(HAlign::Right, VAlign::Top).with_offset(300.0, 300.0),
            )
            .unwrap();
        let zone = layout.zone(BATTERY).unwrap();
        assert!(zone.contains(layout.components[idx].rect()));
    }

    #[test]
    fn zone_sized_requests_fit_every_default_zone() {
        let engine = engine();
        for zone in engine.zones() {
            let mut layout = engine.new_layout();
            let idx = engine
                .position_component(
                    &mut layout,
                    ComponentType::AcMeter,
                    &zone.id,
                    1e4,
                    1e4,
                    Placement::new(HAlign::Center, VAlign::Middle),
                )
                .unwrap();
            let comp = &layout.components[idx];
            assert!(zone.contains(comp.rect()), "{} escapes {}", comp.id, zone.id);
            assert!(comp.x >= zone.x && comp.y >= zone.y, "{}", zone.id);
        }
    }

    #[test]
    fn any_size_and_offset_stays_contained() {
        let engine = engine();
        let aligns = [HAlign::Left, HAlign::Center, HAlign::Right];
        let valigns = [VAlign::Top, VAlign::Middle, VAlign::Bottom];
        let sizes = [(0.5, 0.5), (30.0, 20.0), (120.0, 15.0), (15.0, 150.0), (1e4, 1e4)];
        let offsets = [(0.0, 0.0), (-500.0, 12.5), (7.3, -0.1), (1e3, 1e3)];
        for zone in engine.zones() {
            for align in aligns {
                for valign in valigns {
                    for (width, height) in sizes {
                        for (dx, dy) in offsets {
                            let mut layout = engine.new_layout();
                            let placement = Placement::new(align, valign).with_offset(dx, dy);
                            let idx = engine
                                .position_component(
                                    &mut layout,
                                    ComponentType::SolarString,
                                    &zone.id,
                                    width,
                                    height,
                                    placement,
                                )
                                .unwrap();
                            let rect = layout.components[idx].rect();
                            assert!(
                                zone.contains(rect),
                                "{} {:?} {:?} {width}x{height} ({dx},{dy}) -> {rect:?}",
                                zone.id,
                                align,
                                valign
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn optimal_size_respects_minimum_and_zone() {
        let engine = engine();
        let one = engine.calculate_optimal_size(INVERTER, 1, 1.3);
        let inverter = engine.zone(INVERTER).unwrap();
        assert!(one.width <= inverter.width - 20.0 + 1e-3);
        assert!(one.width >= 25.0 && one.height >= 20.0);

        let crowded = engine.calculate_optimal_size(ROOF_ARRAY, 12, 1.8);
        let roof = engine.zone(ROOF_ARRAY).unwrap();
        assert!(crowded.height * 12.0 <= roof.height - 20.0 + 1e-3);

        assert_eq!(
            engine.calculate_optimal_size("garage", 1, 1.0),
            SymbolSize {
                width: 40.0,
                height: 30.0
            }
        );
    }

    #[test]
    fn every_position_stays_inside_its_zone() {
        let engine = engine();
        for strings in 0..=24 {
            for battery in [false, true] {
                for grid in [false, true] {
                    let layout = engine.auto_layout(&system(strings, battery, grid)).unwrap();
                    for comp in &layout.components {
                        let zone = layout.zone(&comp.zone_id).unwrap();
                        assert!(zone.contains(comp.rect()), "{} escapes {}", comp.id, zone.id);
                    }
                }
            }
        }
    }

    #[test]
    fn stacked_strings_never_overlap() {
        let engine = engine();
        for strings in 1..=16 {
            let layout = engine.auto_layout(&system(strings, false, true)).unwrap();
            let rects: Vec<Rect> = layout
                .components_of(ComponentType::SolarString)
                .map(|comp| comp.rect())
                .collect();
            assert_eq!(rects.len(), strings as usize);
            for pair in rects.windows(2) {
                assert!(pair[0].1 + pair[0].3 <= pair[1].1 + 1e-3);
            }
        }
    }

    #[test]
    fn optional_stages_follow_flags() {
        let engine = engine();
        let bare = engine.auto_layout(&system(2, false, false)).unwrap();
        assert_eq!(bare.count_of(ComponentType::Battery), 0);
        assert_eq!(bare.count_of(ComponentType::MainSwitchboard), 0);
        assert_eq!(bare.count_of(ComponentType::GridConnection), 0);
        assert_eq!(bare.count_of(ComponentType::StringInverter), 1);

        let full = engine.auto_layout(&system(2, true, true)).unwrap();
        assert_eq!(full.count_of(ComponentType::Battery), 1);
        assert_eq!(full.count_of(ComponentType::HybridInverter), 1);
        assert_eq!(full.count_of(ComponentType::StringInverter), 0);
        assert_eq!(full.count_of(ComponentType::GridConnection), 1);
        assert_eq!(full.components.len(), 2 + 2 + 1 + 1 + 3 + 2);
    }

    #[test]
    fn layout_is_deterministic() {
        let engine = engine();
        let sys = system(3, true, true);
        assert_eq!(engine.auto_layout(&sys).unwrap(), engine.auto_layout(&sys).unwrap());
    }
}
