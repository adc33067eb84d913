use crate::ir::ComponentType;
use crate::layout::{DiagramLayout, Wire};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub zones: Vec<ZoneDump>,
    pub components: Vec<ComponentDump>,
    pub wires: Vec<WireDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDump {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub components: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDump {
    pub id: String,
    pub component_type: ComponentType,
    pub zone: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub voltage: f32,
    pub current: f32,
    pub color: String,
    pub stroke_width: f32,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &DiagramLayout, wires: &[Wire]) -> Self {
        let zones = layout
            .zones
            .iter()
            .map(|zone| ZoneDump {
                id: zone.id.clone(),
                name: zone.name.clone(),
                x: zone.x,
                y: zone.y,
                width: zone.width,
                height: zone.height,
                components: zone
                    .components
                    .iter()
                    .filter_map(|idx| layout.components.get(*idx))
                    .map(|comp| comp.id.clone())
                    .collect(),
            })
            .collect();

        let components = layout
            .components
            .iter()
            .map(|comp| ComponentDump {
                id: comp.id.clone(),
                component_type: comp.component_type,
                zone: comp.zone_id.clone(),
                x: comp.x,
                y: comp.y,
                width: comp.width,
                height: comp.height,
            })
            .collect();

        let wires = wires
            .iter()
            .map(|wire| WireDump {
                id: wire.id.clone(),
                kind: wire.kind.to_string(),
                label: wire.label.clone(),
                voltage: wire.voltage,
                current: wire.current,
                color: wire.color.to_string(),
                stroke_width: wire.stroke_width,
                points: wire.path.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            zones,
            components,
            wires,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &DiagramLayout, wires: &[Wire]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, wires);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ir::JobDescriptor;
    use crate::render::SldRenderer;

    #[test]
    fn dump_lists_zone_members_by_id() {
        let job: JobDescriptor = serde_json::from_str(r#"{"systemSize":6.6,"panelCount":16}"#).unwrap();
        let plan = SldRenderer::new(Config::default()).plan(&job).unwrap();
        let dump = LayoutDump::from_layout(&plan.layout, &plan.wires);
        let roof = dump.zones.iter().find(|zone| zone.id == "roof_array").unwrap();
        assert_eq!(roof.components, vec!["SOLAR_STRING_1", "SOLAR_STRING_2"]);
        assert_eq!(dump.wires.len(), plan.wires.len());
        assert!(dump.wires.iter().all(|wire| wire.points.len() == 4));
    }

    #[test]
    fn writes_pretty_json() {
        let job: JobDescriptor = serde_json::from_str(r#"{"systemSize":10,"panelCount":25,"batteryCapacity":13.5}"#).unwrap();
        let plan = SldRenderer::new(Config::default()).plan(&job).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        write_layout_dump(&path, &plan.layout, &plan.wires).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["components"].as_array().unwrap().iter().filter(|c| c["componentType"] == "BATTERY").count(), 1);
        assert!(value["wires"].as_array().unwrap().iter().any(|w| w["id"] == "BATTERY_1->HYBRID_INVERTER_1"));
    }
}
