//! Extra sheets for the grid-operator submission: title block, component
//! breakdown, earthing schematic with legend, and the signature footer.

use super::table::{
    CEC_FALLBACK, COMPANY_NAME_FALLBACK, DATE_PLACEHOLDER, DESIGNER_FALLBACK, LICENSE_FALLBACK,
    STANDARDS, Table, TableCell, display_date, phase_label,
};
use super::{Section, escape_xml};
use crate::config::Config;
use crate::electrical::export_limit_kw;
use crate::ir::{JobDescriptor, SystemConfiguration, non_empty, text_or};
use crate::layout::routing::{
    AC_ACTIVE_COLOR, DC_NEGATIVE_COLOR, DC_POSITIVE_COLOR, EARTH_COLOR, format_number,
};
use crate::layout::text::truncate_chars;

// ── Footer fallbacks ──
pub(crate) const CUSTOMER_FALLBACK: &str = "Customer Name";
pub(crate) const ADDRESS_FALLBACK: &str = "Installation Address";
pub(crate) const JOB_FALLBACK: &str = "JOB-XXX";
pub(crate) const DRAWING_FALLBACK: &str = "SLD-XXX";
pub(crate) const REVISION_FALLBACK: &str = "A";
pub(crate) const ABN_FALLBACK: &str = "XX XXX XXX XXX";
pub(crate) const PHONE_FALLBACK: &str = "1300 XXX XXX";
pub(crate) const EMAIL_FALLBACK: &str = "info@sundirectpower.com.au";
pub(crate) const WEBSITE_FALLBACK: &str = "www.sundirectpower.com.au";
pub(crate) const APPROVAL_TITLE: &str = "WESTERN POWER APPROVAL";
const ADDRESS_MAX_CHARS: usize = 40;

const TITLE_BLOCK_HEIGHT: f32 = 160.0;
const EARTHING_SECTION_HEIGHT: f32 = 520.0;

/// Heading, standards line, job summary and the compliance badge.
pub fn title_block(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Section {
    let theme = &config.theme;
    let scale = config.render.scale;
    let x = config.layout.margins.left * scale;
    let width = config.layout.working_width() * scale;
    let center = x + width / 2.0;

    let mut summary = format!(
        "Job: {} | {} | {}kW Solar PV",
        text_or(&job.job_number, JOB_FALLBACK),
        text_or(&job.installation_address, ADDRESS_FALLBACK),
        format_number(sys.system_size_kw)
    );
    if let Some(kwh) = sys.battery_capacity_kwh.filter(|_| sys.has_battery) {
        summary.push_str(&format!(" + {}kWh Battery", format_number(kwh)));
    }

    let badge_w = 260.0;
    let badge_h = 56.0;
    let badge_x = x + width - badge_w - 20.0;
    let badge_y = (TITLE_BLOCK_HEIGHT - badge_h) / 2.0;

    let mut svg = format!(
        "<rect x=\"{x:.2}\" y=\"0\" width=\"{width:.2}\" height=\"{TITLE_BLOCK_HEIGHT:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"3\"/>",
        theme.table_border
    );
    svg.push_str(&format!(
        "<text class=\"title\" x=\"{center:.2}\" y=\"55\" text-anchor=\"middle\">SINGLE LINE DIAGRAM</text>"
    ));
    svg.push_str(&format!(
        "<text class=\"table-strong\" x=\"{center:.2}\" y=\"95\" text-anchor=\"middle\">{}</text>",
        STANDARDS.join(" | ")
    ));
    svg.push_str(&format!(
        "<text class=\"table-text\" x=\"{center:.2}\" y=\"135\" text-anchor=\"middle\">{}</text>",
        escape_xml(&summary)
    ));
    svg.push_str(&format!(
        "<rect x=\"{badge_x:.2}\" y=\"{badge_y:.2}\" width=\"{badge_w:.2}\" height=\"{badge_h:.2}\" rx=\"8\" fill=\"{}\"/><text class=\"badge\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\">WP COMPLIANT</text>",
        theme.badge_fill,
        badge_x + badge_w / 2.0,
        badge_y + badge_h / 2.0 + 8.0,
    ));

    Section {
        name: "title-block",
        height: TITLE_BLOCK_HEIGHT,
        markup: svg,
    }
}

/// Solar Panels & Inverter | Cables & Protection | Earthing & Metering.
/// Every field falls back to a placeholder on its own.
pub fn breakdown_table(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Table {
    let specs = job.specs();

    let mut equipment = TableCell::new()
        .heading("SOLAR PANELS")
        .line(format!(
            "Manufacturer: {}",
            text_or(&specs.panel_manufacturer, "Panel Manufacturer")
        ))
        .line(format!("Model: {}", text_or(&specs.panel_model, "Model")))
        .line(format!(
            "CEC Approval: {}",
            text_or(&specs.panel_cec_approval, CEC_FALLBACK)
        ))
        .line(format!(
            "Rating: {}W | Voc: {}V | Isc: {}A",
            format_number(sys.panel_wattage),
            format_number(specs.panel_voc.unwrap_or(40.0)),
            format_number(specs.panel_isc.unwrap_or(11.5))
        ))
        .line(format!(
            "Quantity: {} panels in {} strings",
            sys.panel_count,
            sys.string_count()
        ))
        .heading("INVERTER")
        .line(format!(
            "Manufacturer: {}",
            text_or(&specs.inverter_manufacturer, "Inverter Manufacturer")
        ))
        .line(format!(
            "Model: {}",
            non_empty(&job.inverter_model)
                .or(non_empty(&specs.inverter_model))
                .unwrap_or("Model")
        ))
        .line(format!(
            "CEC Approval: {}",
            text_or(&specs.inverter_cec_approval, CEC_FALLBACK)
        ))
        .line(format!(
            "Capacity: {}kW | Efficiency: {}%",
            format_number(sys.system_size_kw),
            format_number(specs.inverter_efficiency.unwrap_or(97.5))
        ));
    if sys.has_battery {
        equipment = equipment
            .heading("BATTERY")
            .line(format!(
                "Manufacturer: {}",
                text_or(&specs.battery_manufacturer, "Battery Manufacturer")
            ))
            .line(format!("Model: {}", text_or(&specs.battery_model, "Model")))
            .line(format!(
                "Capacity: {}kWh | Chemistry: {}",
                format_number(sys.battery_capacity_kwh.unwrap_or(0.0)),
                text_or(&specs.battery_chemistry, "LFP")
            ))
            .line(format!(
                "VPP: {}",
                text_or(&specs.battery_vpp_enrollment, "Not enrolled")
            ));
    }

    let cabling = TableCell::new()
        .heading("DC CABLES")
        .line(format!(
            "Size: {} {} {}",
            text_or(&specs.dc_cable_size, "6mm²"),
            text_or(&specs.dc_cable_material, "Cu"),
            text_or(&specs.dc_cable_insulation, "V-90")
        ))
        .line(format!(
            "Voltage Rating: {}",
            text_or(&specs.dc_cable_voltage_rating, "1000V DC")
        ))
        .line(format!(
            "Length: {}m | Install: {}",
            format_number(specs.dc_cable_length.unwrap_or(20.0)),
            text_or(&specs.dc_cable_install_method, "Conduit")
        ))
        .line(format!(
            "DC Breaker: {}",
            text_or(&specs.dc_breaker_rating, "32A")
        ))
        .heading("AC CABLES")
        .line(format!(
            "Size: {} {} {}",
            text_or(&specs.ac_cable_size, "6mm²"),
            text_or(&specs.ac_cable_material, "Cu"),
            text_or(&specs.ac_cable_type, "TPS")
        ))
        .line(format!(
            "Length: {}m | Install: {}",
            format_number(specs.ac_cable_length.unwrap_or(15.0)),
            text_or(&specs.ac_cable_install_method, "Conduit")
        ))
        .line(format!(
            "AC Breaker: {} {}",
            text_or(&specs.ac_breaker_rating, "40A"),
            text_or(&specs.ac_breaker_poles, "2P")
        ))
        .line(format!(
            "RCD: {} {}",
            text_or(&specs.rcd_type, "Type B"),
            text_or(&specs.rcd_rating, "30mA")
        ))
        .heading("ISOLATORS")
        .line(format!(
            "DC Isolator: {} {}",
            text_or(&specs.dc_isolator_rating, "1000V, 32A"),
            text_or(&specs.dc_isolator_ip_rating, "IP65")
        ))
        .line(format!(
            "AC Isolator: {} {}",
            text_or(&specs.ac_isolator_rating, "250V, 40A"),
            text_or(&specs.ac_isolator_ip_rating, "IP65")
        ));

    let phase = non_empty(&specs.phase_configuration).unwrap_or(if sys.is_three_phase() {
        "Three Phase"
    } else {
        "Single Phase"
    });
    let earthing = TableCell::new()
        .heading("EARTHING")
        .line(format!(
            "System: {}",
            text_or(&specs.earthing_system, "TN-S")
        ))
        .line(format!(
            "Electrode: {} at {}",
            text_or(&specs.earth_electrode_type, "Rod"),
            text_or(&specs.earth_electrode_location, "Front yard")
        ))
        .line(format!(
            "Conductor: {}",
            text_or(&specs.earth_conductor_size, "6mm² Cu")
        ))
        .line(format!("MEN Link: {}", men_link_text(specs.men_link)))
        .heading("METERING")
        .line(format!(
            "Type: {}",
            text_or(&specs.meter_type, "Smart Meter")
        ))
        .line(format!(
            "Location: {}",
            text_or(&specs.meter_location, "External wall")
        ))
        .line(format!(
            "Bi-directional: {}",
            if specs.meter_bidirectional.unwrap_or(true) { "Yes" } else { "No" }
        ))
        .heading("MAIN SWITCHBOARD")
        .line(format!(
            "Main Switch: {}",
            text_or(&specs.main_switch_rating, "63A")
        ))
        .line(format!("Busbar: {}", text_or(&specs.busbar_rating, "100A")))
        .line(format!(
            "Export Limit: {}kW | {phase}",
            format_number(
                specs
                    .export_limit_kw
                    .unwrap_or_else(|| export_limit_kw(sys.system_size_kw))
            )
        ));

    Table::full_width(3, config)
        .title("COMPLIANCE SPECIFICATIONS")
        .headers([
            "SOLAR PANELS & INVERTER",
            "CABLES & PROTECTION",
            "EARTHING & METERING",
        ])
        .row(vec![equipment, cabling, earthing])
}

fn men_link_text(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Verify on site",
    }
}

/// Earth electrode schematic on the left, symbol legend on the right.
pub fn earthing_and_legend(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Section {
    let specs = job.specs();
    let scale = config.render.scale;
    let left = config.layout.margins.left * scale;
    let width = config.layout.working_width() * scale;
    let half = width / 2.0;
    let stroke = &config.theme.table_border;

    let mut svg = format!(
        "<text class=\"table-title\" x=\"{left:.2}\" y=\"30\">EARTHING ARRANGEMENT</text>"
    );

    let line_x = left + half / 3.0;
    let top = 60.0;
    let bottom = 360.0;
    svg.push_str(&format!(
        "<line x1=\"{line_x:.2}\" y1=\"{top:.2}\" x2=\"{line_x:.2}\" y2=\"{bottom:.2}\" stroke=\"{EARTH_COLOR}\" stroke-width=\"6\"/>"
    ));
    for (idx, half_width) in [200.0f32, 150.0, 100.0].into_iter().enumerate() {
        let y = bottom + idx as f32 * 50.0;
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{stroke}\" stroke-width=\"6\"/>",
            line_x - half_width / 2.0,
            line_x + half_width / 2.0
        ));
    }
    let note_x = line_x + 140.0;
    let notes = [
        format!(
            "Earth conductor: {}",
            text_or(&specs.earth_conductor_size, "6mm² Cu")
        ),
        format!(
            "Electrode: {}",
            text_or(&specs.earth_electrode_type, "Rod")
        ),
        format!(
            "Earthing system: {}",
            text_or(&specs.earthing_system, "TN-S")
        ),
        format!(
            "Location: {}",
            text_or(&specs.earth_electrode_location, "Front yard")
        ),
        format!("MEN Link: {}", men_link_text(specs.men_link)),
    ];
    for (idx, note) in notes.iter().enumerate() {
        svg.push_str(&format!(
            "<text class=\"table-text\" x=\"{note_x:.2}\" y=\"{:.2}\">{}</text>",
            top + 60.0 + idx as f32 * 50.0,
            escape_xml(note)
        ));
    }

    let legend_x = left + half + 40.0;
    svg.push_str(&format!(
        "<text class=\"table-title\" x=\"{legend_x:.2}\" y=\"30\">LEGEND</text>"
    ));
    let dc_label = format!(
        "DC cabling ({}V DC, + red / − black)",
        format_number(sys.dc_voltage)
    );
    let ac_label = format!(
        "AC active ({}V AC, {})",
        format_number(sys.ac_voltage),
        phase_label(sys)
    );
    let swatches = [
        (Some(DC_POSITIVE_COLOR), dc_label.as_str()),
        (Some(DC_NEGATIVE_COLOR), "DC negative"),
        (Some(AC_ACTIVE_COLOR), ac_label.as_str()),
        (Some(EARTH_COLOR), "⏚ Earth conductor"),
        (None, "MCB = Miniature Circuit Breaker"),
        (None, "RCD = Residual Current Device"),
        (None, "MSB = Main Switchboard"),
    ];
    for (idx, (color, label)) in swatches.into_iter().enumerate() {
        let y = top + 40.0 + idx as f32 * 55.0;
        if let Some(color) = color {
            svg.push_str(&format!(
                "<line x1=\"{legend_x:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{color}\" stroke-width=\"6\"/>",
                legend_x + 80.0
            ));
        }
        svg.push_str(&format!(
            "<text class=\"table-text\" x=\"{:.2}\" y=\"{:.2}\">{}</text>",
            legend_x + 100.0,
            y + 8.0,
            escape_xml(label)
        ));
    }

    Section {
        name: "earthing-legend",
        height: EARTHING_SECTION_HEIGHT,
        markup: svg,
    }
}

/// Project details | designer & approver | company details, with the
/// grid-operator stamp cell highlighted across two rows.
pub fn signature_footer(job: &JobDescriptor, sys: &SystemConfiguration, config: &Config) -> Table {
    let theme = &config.theme;
    let company = job.company();
    let designer = job.designer();
    let address = truncate_chars(
        text_or(&job.installation_address, ADDRESS_FALLBACK),
        ADDRESS_MAX_CHARS,
    );
    let date = display_date(&job.install_date);

    Table::full_width(3, config)
        .headers(["PROJECT DETAILS", "DESIGNER & APPROVER", "COMPANY DETAILS"])
        .header_fill(theme.footer_header_fill.clone())
        .row(vec![
            TableCell::text(format!(
                "Customer: {}",
                text_or(&job.customer_name, CUSTOMER_FALLBACK)
            )),
            TableCell::text(format!(
                "Designer: {}",
                text_or(&designer.name, DESIGNER_FALLBACK)
            )),
            TableCell::text(text_or(&company.name, COMPANY_NAME_FALLBACK)).bold(),
        ])
        .row(vec![
            TableCell::text(format!("Address: {address}")),
            TableCell::text(format!(
                "CEC: {}",
                text_or(&designer.cec_accreditation, CEC_FALLBACK)
            )),
            TableCell::text(format!("ABN: {}", text_or(&company.abn, ABN_FALLBACK))),
        ])
        .row(vec![
            TableCell::text(format!(
                "Job: {} | System: {}kW",
                text_or(&job.job_number, JOB_FALLBACK),
                format_number(sys.system_size_kw)
            )),
            TableCell::text(format!(
                "License: {}",
                text_or(&designer.license, LICENSE_FALLBACK)
            )),
            TableCell::text(format!(
                "Lic: {}",
                text_or(&company.electrical_license, LICENSE_FALLBACK)
            )),
        ])
        .row(vec![
            TableCell::text(format!(
                "Drawing: {} Rev {}",
                text_or(&job.drawing_number, DRAWING_FALLBACK),
                text_or(&job.revision, REVISION_FALLBACK)
            )),
            TableCell::text("Signature: _______________"),
            TableCell::text(format!(
                "CEC: {}",
                text_or(&company.cec_accreditation, CEC_FALLBACK)
            )),
        ])
        .row(vec![
            TableCell::text(format!(
                "Date: {}",
                date.as_deref().unwrap_or(DATE_PLACEHOLDER)
            )),
            TableCell::text("Date: _______________"),
            TableCell::text(format!(
                "Phone: {}",
                text_or(&company.phone, PHONE_FALLBACK)
            )),
        ])
        .row(vec![
            TableCell::text(format!("Standards: {}", STANDARDS[0])),
            TableCell::new()
                .heading(APPROVAL_TITLE)
                .line("Stamp / Date:")
                .fill(theme.approval_highlight.clone())
                .span_rows(2),
            TableCell::text(format!(
                "Email: {}",
                text_or(&company.email, EMAIL_FALLBACK)
            )),
        ])
        .row(vec![
            TableCell::text(format!("{} | {}", STANDARDS[1], STANDARDS[2])),
            TableCell::covered(),
            TableCell::text(text_or(&company.website, WEBSITE_FALLBACK)),
        ])
}
