use serde::Serialize;
use std::fmt;

use super::types::{ComponentPosition, DiagramLayout, Point};
use crate::electrical::{BATTERY_DC_CURRENT, round2};
use crate::ir::{ComponentType, SystemConfiguration};

// ── Conductor colors (AS/NZS 3000 conventions) ──────────────────────
pub const DC_POSITIVE_COLOR: &str = "#FF0000";
pub const DC_NEGATIVE_COLOR: &str = "#000000";
pub const AC_ACTIVE_COLOR: &str = "#8B4513";
pub const AC_NEUTRAL_COLOR: &str = "#0000FF";
pub const EARTH_COLOR: &str = "#00FF00";

// ── Stroke weight steps (amps) ──────────────────────────────────────
const THIN_CURRENT: f32 = 10.0;
const MEDIUM_CURRENT: f32 = 20.0;
const HEAVY_CURRENT: f32 = 40.0;

pub const OUTPUT_POINT: &str = "output";
pub const INPUT_POINT: &str = "input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WireKind {
    #[default]
    #[serde(rename = "DC")]
    Dc,
    #[serde(rename = "AC")]
    Ac,
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireKind::Dc => "DC",
            WireKind::Ac => "AC",
        })
    }
}

/// Conductor role. On AC wires `Positive` is the active conductor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
    Neutral,
    Earth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRef {
    pub component_id: String,
    pub connection_point: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wire {
    pub id: String,
    pub from: ConnectionRef,
    pub to: ConnectionRef,
    pub path: Vec<Point>,
    pub kind: WireKind,
    pub voltage: f32,
    pub current: f32,
    pub polarity: Polarity,
    pub color: &'static str,
    pub stroke_width: f32,
    pub label: String,
}

impl Wire {
    pub fn path_length(&self) -> f32 {
        self.path
            .windows(2)
            .map(|seg| (seg[1].0 - seg[0].0).abs() + (seg[1].1 - seg[0].1).abs())
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireOptions {
    pub kind: WireKind,
    pub voltage: f32,
    pub current: f32,
    pub polarity: Option<Polarity>,
    pub label: Option<String>,
}

impl WireOptions {
    pub fn dc(voltage: f32, current: f32) -> Self {
        Self {
            kind: WireKind::Dc,
            voltage,
            current,
            ..Default::default()
        }
    }

    pub fn ac(voltage: f32, current: f32) -> Self {
        Self {
            kind: WireKind::Ac,
            voltage,
            current,
            ..Default::default()
        }
    }

    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

pub fn wire_color(kind: WireKind, polarity: Polarity) -> &'static str {
    match (kind, polarity) {
        (_, Polarity::Earth) => EARTH_COLOR,
        (WireKind::Dc, Polarity::Positive) => DC_POSITIVE_COLOR,
        (WireKind::Dc, Polarity::Negative | Polarity::Neutral) => DC_NEGATIVE_COLOR,
        (WireKind::Ac, Polarity::Neutral) => AC_NEUTRAL_COLOR,
        (WireKind::Ac, Polarity::Positive | Polarity::Negative) => AC_ACTIVE_COLOR,
    }
}

/// Visual weight only; not a conductor sizing rule.
pub fn stroke_width_for_current(current: f32) -> f32 {
    if current < THIN_CURRENT {
        1.5
    } else if current < MEDIUM_CURRENT {
        2.0
    } else if current < HEAVY_CURRENT {
        2.5
    } else {
        3.0
    }
}

/// Prints whole numbers without decimals and trims trailing zeros.
pub(crate) fn format_number(value: f32) -> String {
    let rounded = round2(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    }
}

/// Orthogonal route from the right-edge midpoint of `from` to the left-edge
/// midpoint of `to`, with one vertical jog halfway between them.
pub fn route_points(from: &ComponentPosition, to: &ComponentPosition) -> Vec<Point> {
    let start = from.output_point();
    let end = to.input_point();
    let mid_x = (start.0 + end.0) / 2.0;
    vec![start, (mid_x, start.1), (mid_x, end.1), end]
}

pub fn create_wire(from: &ComponentPosition, to: &ComponentPosition, options: WireOptions) -> Wire {
    let polarity = options.polarity.unwrap_or_default();
    let label = options.label.unwrap_or_else(|| {
        format!(
            "{}V {} {}A",
            format_number(options.voltage),
            options.kind,
            format_number(options.current)
        )
    });
    Wire {
        id: format!("{}->{}", from.id, to.id),
        from: ConnectionRef {
            component_id: from.id.clone(),
            connection_point: OUTPUT_POINT.to_string(),
        },
        to: ConnectionRef {
            component_id: to.id.clone(),
            connection_point: INPUT_POINT.to_string(),
        },
        path: route_points(from, to),
        kind: options.kind,
        voltage: options.voltage,
        current: options.current,
        polarity,
        color: wire_color(options.kind, polarity),
        stroke_width: stroke_width_for_current(options.current),
        label,
    }
}

fn is_dc_stage(kind: ComponentType) -> bool {
    matches!(
        kind,
        ComponentType::SolarString
            | ComponentType::DcCombiner
            | ComponentType::DcIsolator
            | ComponentType::Battery
    )
}

/// Options for a leg of the main chain. A DC stage only keeps its DC cable
/// when the leg still ends on the DC side or at the inverter.
fn leg_options(from: ComponentType, to: ComponentType, sys: &SystemConfiguration) -> WireOptions {
    let dc_v = format_number(sys.dc_voltage);
    let ac_v = format_number(sys.ac_voltage);
    let dc_leg = is_dc_stage(to) || to.is_inverter();
    match from {
        ComponentType::DcCombiner if dc_leg => WireOptions::dc(sys.dc_voltage, sys.dc_current)
            .label(format!("2C × 6mm² + 1 × 6mm² E Cu V-90 {dc_v}V DC (Conduit)")),
        ComponentType::DcIsolator if dc_leg => WireOptions::dc(sys.dc_voltage, sys.dc_current)
            .label("2C × 6mm² + 1 × 6mm² E Cu V-90 1000V DC (Conduit)"),
        ComponentType::StringInverter | ComponentType::HybridInverter => {
            WireOptions::ac(sys.ac_voltage, sys.ac_current)
                .label(format!("3C × 4mm² + E Cu TPS {ac_v}V AC (Trunking)"))
        }
        ComponentType::AcIsolator => {
            WireOptions::ac(sys.ac_voltage, sys.ac_current).label("AC Output")
        }
        ComponentType::AcMeter => WireOptions::ac(sys.ac_voltage, sys.ac_current).label("To MSB"),
        ComponentType::MainSwitchboard => {
            WireOptions::ac(sys.ac_voltage, sys.ac_current).label("Grid Connection")
        }
        _ => WireOptions::ac(sys.ac_voltage, sys.ac_current),
    }
}

/// Wires the fixed residential topology over a positioned component set.
///
/// Each PV string feeds the combiner with an even share of the DC current.
/// The main chain connects every pair of adjacent present stages, so a
/// missing stage is bridged rather than breaking the chain.
pub fn auto_wire_system(layout: &DiagramLayout, sys: &SystemConfiguration) -> Vec<Wire> {
    let mut wires = Vec::new();
    let combiner = layout.first_of(ComponentType::DcCombiner);
    let inverter = layout.inverter();

    if let Some(combiner) = combiner {
        let per_string = sys.per_string_current();
        for (idx, string) in layout.components_of(ComponentType::SolarString).enumerate() {
            wires.push(create_wire(
                string,
                combiner,
                WireOptions::dc(sys.dc_voltage, per_string)
                    .polarity(Polarity::Positive)
                    .label(format!("String {}+", idx + 1)),
            ));
        }
    }

    let chain: Vec<&ComponentPosition> = [
        combiner,
        layout.first_of(ComponentType::DcIsolator),
        inverter,
        layout.first_of(ComponentType::AcIsolator),
        layout.first_of(ComponentType::AcBreaker),
        layout.first_of(ComponentType::AcMeter),
        layout.first_of(ComponentType::MainSwitchboard),
        layout.first_of(ComponentType::GridConnection),
    ]
    .into_iter()
    .flatten()
    .collect();

    for pair in chain.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        wires.push(create_wire(
            from,
            to,
            leg_options(from.component_type, to.component_type, sys),
        ));
    }

    if let (Some(battery), Some(inverter)) = (layout.first_of(ComponentType::Battery), inverter)
        && inverter.component_type == ComponentType::HybridInverter
    {
        wires.push(create_wire(
            battery,
            inverter,
            WireOptions::dc(sys.battery_voltage, BATTERY_DC_CURRENT).label("Battery DC"),
        ));
    }

    tracing::debug!(wires = wires.len(), "auto wiring complete");
    wires
}
