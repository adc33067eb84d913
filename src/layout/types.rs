use serde::Serialize;

use crate::ir::ComponentType;

pub type Point = (f32, f32);
/// `(x, y, width, height)` in logical millimetres.
pub type Rect = (f32, f32, f32, f32);

pub const ROOF_ARRAY: &str = "roof_array";
pub const DC_PROTECTION: &str = "dc_protection";
pub const INVERTER: &str = "inverter";
pub const BATTERY: &str = "battery";
pub const AC_PROTECTION: &str = "ac_protection";
pub const GRID: &str = "grid";
pub const SPECIFICATIONS: &str = "specifications";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Indices into `DiagramLayout::components`, in placement order.
    pub components: Vec<usize>,
}

impl Zone {
    pub fn rect(&self) -> Rect {
        (self.x, self.y, self.width, self.height)
    }

    pub fn contains(&self, rect: Rect) -> bool {
        const EPS: f32 = 1e-3;
        rect.0 >= self.x - EPS
            && rect.1 >= self.y - EPS
            && rect.0 + rect.2 <= self.x + self.width + EPS
            && rect.1 + rect.3 <= self.y + self.height + EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub align: HAlign,
    pub valign: VAlign,
    pub offset: Point,
}

impl Placement {
    pub fn new(align: HAlign, valign: VAlign) -> Self {
        Self {
            align,
            valign,
            offset: (0.0, 0.0),
        }
    }

    pub fn with_offset(mut self, dx: f32, dy: f32) -> Self {
        self.offset = (dx, dy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPosition {
    pub id: String,
    pub component_type: ComponentType,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub zone_id: String,
}

impl ComponentPosition {
    pub fn rect(&self) -> Rect {
        (self.x, self.y, self.width, self.height)
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Midpoint of the right edge, where outgoing conductors leave.
    pub fn output_point(&self) -> Point {
        (self.x + self.width, self.center_y())
    }

    /// Midpoint of the left edge, where incoming conductors land.
    pub fn input_point(&self) -> Point {
        (self.x, self.center_y())
    }
}

/// Symbol size chosen for a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolSize {
    pub width: f32,
    pub height: f32,
}

/// Zones plus the component arena for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramLayout {
    pub zones: Vec<Zone>,
    pub components: Vec<ComponentPosition>,
}
