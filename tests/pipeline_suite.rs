use std::path::{Path, PathBuf};

use base64::Engine as _;
use sld_renderer::config::LayoutConfig;
use sld_renderer::layout::{DC_POSITIVE_COLOR, HAlign, LayoutEngine, Placement, VAlign, WireKind};
use sld_renderer::render::DiagramPlan;
use sld_renderer::{
    ComponentType, Config, JobDescriptor, RenderOptions, SldRenderer, SymbolLibrary, Variant,
    render_sld, render_sld_data_url,
};

const FIXTURES: [&str; 7] = [
    "scenario_a",
    "scenario_b",
    "empty_specs",
    "three_phase",
    "no_grid",
    "many_strings",
    "full_specs",
];

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load_job(name: &str) -> JobDescriptor {
    let path = fixtures_dir().join("jobs").join(format!("{name}.json"));
    let raw = std::fs::read_to_string(&path).expect("fixture read failed");
    serde_json::from_str(&raw).expect("fixture parse failed")
}

fn plan(name: &str) -> DiagramPlan {
    SldRenderer::new(Config::default())
        .plan(&load_job(name))
        .expect("layout failed")
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.starts_with("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.ends_with("</svg>"), "{fixture}: missing </svg tag");
    assert!(svg.contains("viewBox=\"0 0 2970.00 "), "{fixture}: unexpected viewBox width");
}

#[test]
fn render_all_fixtures() {
    let renderer = SldRenderer::new(Config::default());
    let symbols = SymbolLibrary::empty();
    for name in FIXTURES {
        let job = load_job(name);
        for variant in [Variant::Standard, Variant::Compliance] {
            let svg = renderer
                .render(&job, &symbols, variant)
                .unwrap_or_else(|err| panic!("{name}: render failed: {err}"));
            assert_valid_svg(&svg, name);
        }
    }
}

#[test]
fn every_component_stays_inside_its_zone() {
    for name in FIXTURES {
        let plan = plan(name);
        for comp in &plan.layout.components {
            let zone = plan
                .layout
                .zone(&comp.zone_id)
                .unwrap_or_else(|| panic!("{name}: {} has no zone", comp.id));
            assert!(
                zone.contains(comp.rect()),
                "{name}: {} {:?} escapes {} {:?}",
                comp.id,
                comp.rect(),
                zone.id,
                zone.rect()
            );
        }
    }
}

#[test]
fn scenario_a_has_two_strings_and_no_battery() {
    let plan = plan("scenario_a");
    assert_eq!(plan.layout.count_of(ComponentType::SolarString), 2);
    assert_eq!(plan.layout.count_of(ComponentType::Battery), 0);
    assert_eq!(plan.layout.count_of(ComponentType::StringInverter), 1);
    assert!(plan.wires.iter().all(|wire| !wire.id.contains("BATTERY")));
}

#[test]
fn scenario_b_wires_the_battery_to_the_hybrid_inverter() {
    let plan = plan("scenario_b");
    assert_eq!(plan.layout.count_of(ComponentType::Battery), 1);
    assert_eq!(plan.layout.count_of(ComponentType::HybridInverter), 1);
    assert_eq!(plan.layout.count_of(ComponentType::SolarString), 3);
    let battery = plan
        .wires
        .iter()
        .find(|wire| wire.id == "BATTERY_1->HYBRID_INVERTER_1")
        .expect("battery wire");
    assert_eq!(battery.kind, WireKind::Dc);
    assert!((battery.voltage - 400.0).abs() < 1.0);
}

#[test]
fn scenario_c_renders_every_fallback_without_specs() {
    let job = load_job("empty_specs");
    let svg = render_sld(&job, &SymbolLibrary::empty(), &RenderOptions::compliance()).unwrap();
    for expected in [
        "SYSTEM SPECIFICATIONS",
        "SOLAR PANELS &amp; INVERTER",
        "CABLES &amp; PROTECTION",
        "EARTHING &amp; METERING",
        "PROJECT DETAILS",
        "DESIGNER &amp; APPROVER",
        "COMPANY DETAILS",
        "Designer Name",
        "EC-XXXXX",
        "JOB-XXX",
        "SLD-XXX Rev A",
        "Customer Name",
        "Installation Address",
        "CEC-XXXXX",
        "XX XXX XXX XXX",
        "Panel Manufacturer",
        "Inverter Manufacturer",
        "WESTERN POWER APPROVAL",
    ] {
        assert!(svg.contains(expected), "missing {expected}");
    }
}

#[test]
fn wires_are_orthogonal_and_meet_component_midlines() {
    for name in FIXTURES {
        let plan = plan(name);
        let find = |id: &str| {
            plan.layout
                .components
                .iter()
                .find(|comp| comp.id == id)
                .unwrap_or_else(|| panic!("{name}: unknown component {id}"))
        };
        for wire in &plan.wires {
            let from = find(&wire.from.component_id);
            let to = find(&wire.to.component_id);
            let first = wire.path.first().expect("empty path");
            let last = wire.path.last().expect("empty path");
            assert!((first.1 - from.center_y()).abs() < 1e-3, "{name}: {}", wire.id);
            assert!((last.1 - to.center_y()).abs() < 1e-3, "{name}: {}", wire.id);
            assert!(
                wire.path
                    .windows(2)
                    .all(|seg| seg[0].0 == seg[1].0 || seg[0].1 == seg[1].1),
                "{name}: {} is not orthogonal",
                wire.id
            );
        }
    }
}

#[test]
fn dc_positive_wires_are_always_red() {
    for _ in 0..3 {
        let plan = plan("scenario_a");
        let strings: Vec<_> = plan
            .wires
            .iter()
            .filter(|wire| wire.from.component_id.starts_with("SOLAR_STRING"))
            .collect();
        assert_eq!(strings.len(), 2);
        assert!(strings.iter().all(|wire| wire.color == DC_POSITIVE_COLOR));
    }
}

#[test]
fn clear_labels_avoid_component_keep_out_boxes() {
    let config = Config::default();
    let pad = config.layout.label_component_pad;
    let caption = config.layout.label_caption_space;
    for name in FIXTURES {
        let plan = plan(name);
        assert_eq!(plan.labels.len(), plan.wires.len());
        for label in plan.labels.iter().filter(|label| label.collision_free) {
            let (ax, ay) = label.anchor;
            for comp in &plan.layout.components {
                let inside = ax > comp.x - pad
                    && ax < comp.x + comp.width + pad
                    && ay > comp.y - pad
                    && ay < comp.y + comp.height + caption;
                assert!(!inside, "{name}: label for {} sits on {}", label.wire_id, comp.id);
            }
        }
    }
}

#[test]
fn rendering_is_idempotent() {
    let renderer = SldRenderer::new(Config::default());
    let symbols = SymbolLibrary::from_dir(fixtures_dir().join("symbols"));
    for name in FIXTURES {
        let job = load_job(name);
        let first = renderer.render(&job, &symbols, Variant::Compliance).unwrap();
        let second = renderer.render(&job, &symbols, Variant::Compliance).unwrap();
        assert_eq!(first, second, "{name}: output differs between runs");
    }
}

#[test]
fn generation_timestamp_only_when_injected() {
    let mut job = load_job("scenario_a");
    let options = RenderOptions::standard();
    let plain = render_sld(&job, &SymbolLibrary::empty(), &options).unwrap();
    assert!(!plain.contains("Generated:"));
    assert!(plain.contains("Date: 15/03/2024"));

    job.generated_at = Some("2024-03-20T10:00:00Z".to_string());
    let stamped = render_sld(&job, &SymbolLibrary::empty(), &options).unwrap();
    assert!(stamped.contains("Generated: 2024-03-20T10:00:00Z"));
}

#[test]
fn data_url_decodes_to_the_same_document() {
    let job = load_job("scenario_b");
    let options = RenderOptions::standard();
    let symbols = SymbolLibrary::empty();
    let svg = render_sld(&job, &symbols, &options).unwrap();
    let url = render_sld_data_url(&job, &symbols, &options).unwrap();
    let payload = url
        .strip_prefix("data:image/svg+xml;base64,")
        .expect("data url prefix");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), svg);
}

#[test]
fn directory_symbols_replace_placeholders() {
    let symbols = SymbolLibrary::from_dir(fixtures_dir().join("symbols"));
    assert_eq!(symbols.preload().unwrap(), 4);
    let svg = render_sld(&load_job("scenario_b"), &symbols, &RenderOptions::standard()).unwrap();
    assert!(svg.contains("id=\"sym-solar-string\""));
    assert!(svg.contains("id=\"sym-battery\""));
    assert!(svg.contains("viewBox=\"0 0 180 100\""));
    // No hybrid inverter art in the fixture set.
    assert!(svg.contains(">HYBRID_INVERTER</text>"));
    assert!(!svg.contains(">BATTERY</text>"));
}

#[test]
fn concurrent_renders_share_one_library() {
    let renderer = SldRenderer::new(Config::default());
    let symbols = SymbolLibrary::from_dir(fixtures_dir().join("symbols"));
    let expected: Vec<String> = FIXTURES
        .iter()
        .map(|name| renderer.render(&load_job(name), &symbols, Variant::Standard).unwrap())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = FIXTURES
            .iter()
            .map(|name| {
                let renderer = &renderer;
                let symbols = &symbols;
                scope.spawn(move || {
                    renderer
                        .render(&load_job(name), symbols, Variant::Standard)
                        .unwrap()
                })
            })
            .collect();
        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn three_phase_jobs_use_400v() {
    let plan = plan("three_phase");
    assert!(plan.system.is_three_phase());
    assert!(!plan.system.dc_voltage_estimated);
    let svg = render_sld(&load_job("three_phase"), &SymbolLibrary::empty(), &RenderOptions::standard()).unwrap();
    assert!(svg.contains("AC Voltage: 400V"));
    assert!(svg.contains("Phases: 3-Phase"));
}

#[test]
fn off_grid_jobs_stop_at_the_meter() {
    let plan = plan("no_grid");
    assert_eq!(plan.layout.count_of(ComponentType::MainSwitchboard), 0);
    assert_eq!(plan.layout.count_of(ComponentType::GridConnection), 0);
    assert_eq!(plan.layout.count_of(ComponentType::AcMeter), 1);
    assert!(plan.wires.iter().all(|wire| !wire.to.component_id.starts_with("MAIN_SWITCHBOARD")));
}

#[test]
fn many_strings_still_fit() {
    let plan = plan("many_strings");
    assert_eq!(plan.layout.count_of(ComponentType::SolarString), 22);
    let roof = plan.layout.zone("roof_array").unwrap();
    assert_eq!(roof.components.len(), 22);
}

#[test]
fn full_specs_flow_into_captions_and_tables() {
    let svg = render_sld(&load_job("full_specs"), &SymbolLibrary::empty(), &RenderOptions::compliance()).unwrap();
    for expected in [
        "Manufacturer: Trina",
        "Vertex S+ 440",
        "Manufacturer: Sungrow",
        "Model: SG5.0RS",
        "Synergy VPP",
        "Dana Designer",
        "ABN: 12 345 678 901",
        "System: TN-C-S",
        "Battery Storage (ESS)",
    ] {
        assert!(svg.contains(expected), "missing {expected}");
    }
    assert!(!svg.contains("(est.)"));
}

fn layout_configs() -> Vec<LayoutConfig> {
    let mut configs = vec![LayoutConfig::default()];
    for (margin, fraction, split) in [
        (3.7_f32, 0.31_f32, 0.17_f32),
        (12.25, 0.47, 0.23),
        (0.0, 0.63, 0.11),
        (25.0, 0.55, 0.29),
    ] {
        let mut config = LayoutConfig::default();
        config.margins.left = margin;
        config.margins.top = margin * 1.7;
        config.margins.right = margin / 3.0;
        config.diagram_fraction = fraction;
        config.roof_fraction = split;
        config.inverter_fraction = split * 1.3;
        config.inverter_height_fraction = fraction;
        config.zone_gap = margin / 2.0;
        configs.push(config);
    }
    configs
}

#[test]
fn caller_placements_stay_inside_any_zone_configuration() {
    let sizes = [(0.25, 0.25), (25.0, 20.0), (90.0, 12.0), (12.0, 140.0), (1e4, 1e4)];
    let offsets = [(0.0, 0.0), (-80.0, 4.5), (33.3, -7.1), (2e3, 2e3)];
    for config in layout_configs() {
        let engine = LayoutEngine::new(&config);
        for zone in engine.zones() {
            for align in [HAlign::Left, HAlign::Center, HAlign::Right] {
                for valign in [VAlign::Top, VAlign::Middle, VAlign::Bottom] {
                    for (width, height) in sizes {
                        for (dx, dy) in offsets {
                            let mut layout = engine.new_layout();
                            let idx = engine
                                .position_component(
                                    &mut layout,
                                    ComponentType::DcIsolator,
                                    &zone.id,
                                    width,
                                    height,
                                    Placement::new(align, valign).with_offset(dx, dy),
                                )
                                .unwrap_or_else(|err| panic!("{}: {err}", zone.id));
                            let rect = layout.components[idx].rect();
                            assert!(
                                zone.contains(rect),
                                "{} {:?}/{:?} {width}x{height} +({dx},{dy}) -> {rect:?}",
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
}

#[test]
fn compliance_export_limit_follows_system_size() {
    let job: JobDescriptor = serde_json::from_str(r#"{"systemSize":10,"panelCount":25}"#).unwrap();
    let svg = render_sld(&job, &SymbolLibrary::empty(), &RenderOptions::compliance()).unwrap();
    assert!(svg.contains("Export Limit: 1.5kW | Single Phase"));

    let small: JobDescriptor = serde_json::from_str(r#"{"systemSize":4.4,"panelCount":10}"#).unwrap();
    let svg = render_sld(&small, &SymbolLibrary::empty(), &RenderOptions::compliance()).unwrap();
    assert!(svg.contains("Export Limit: 5kW | Single Phase"));
}
