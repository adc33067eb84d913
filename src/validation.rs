//! Completeness and compliance checks run before a drawing is submitted.
//! Rendering never depends on these; a job that fails validation still
//! renders with placeholders.

use serde::Serialize;
use std::fmt::Write as _;

use crate::config::LayoutConfig;
use crate::electrical::{export_limit_kw, recommend_breaker_rating};
use crate::ir::{JobDescriptor, SystemConfiguration, non_empty};

const REQUIRED_RCD_TYPE: &str = "Type B";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatus {
    pub section: &'static str,
    pub complete: bool,
    pub completion_percentage: u32,
    pub field_count: usize,
    pub missing_fields: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub completion_percentage: u32,
    /// `section.field` paths.
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub sections: Vec<SectionStatus>,
}

impl ValidationReport {
    pub fn ready_for_submission(&self) -> bool {
        self.is_valid && self.completion_percentage == 100
    }

    /// Why the job is not ready, or `None` when it is.
    pub fn blocking_reason(&self) -> Option<String> {
        if !self.errors.is_empty() {
            return Some(self.errors.join("; "));
        }
        if !self.missing_fields.is_empty() {
            return Some(format!(
                "Missing required fields: {}",
                self.missing_fields.join(", ")
            ));
        }
        None
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("=== SLD VALIDATION REPORT ===\n\n");
        let _ = writeln!(out, "Overall Completion: {}%", self.completion_percentage);
        let _ = writeln!(
            out,
            "Status: {}\n",
            if self.is_valid { "VALID" } else { "INVALID" }
        );
        for (title, items) in [
            ("ERRORS", &self.errors),
            ("WARNINGS", &self.warnings),
            ("MISSING FIELDS", &self.missing_fields),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{title}:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
            out.push('\n');
        }
        out.push_str("SECTION STATUS:\n");
        for status in &self.sections {
            let mark = if status.complete { "[x]" } else { "[ ]" };
            let _ = writeln!(
                out,
                "  {mark} {}: {}%",
                status.section, status.completion_percentage
            );
            if !status.missing_fields.is_empty() {
                let _ = writeln!(out, "      Missing: {}", status.missing_fields.join(", "));
            }
        }
        out
    }
}

/// Checks a job against the submission checklist.
pub fn validate_job(job: &JobDescriptor) -> ValidationReport {
    let sys = SystemConfiguration::from_job(job, &LayoutConfig::default());
    let sections = section_statuses(job, &sys);

    let missing_fields: Vec<String> = sections
        .iter()
        .flat_map(|status| {
            status
                .missing_fields
                .iter()
                .map(move |field| format!("{}.{field}", status.section))
        })
        .collect();
    let total: usize = sections.iter().map(|status| status.field_count).sum();
    let completion_percentage = if total == 0 {
        100
    } else {
        (((total - missing_fields.len()) as f32 / total as f32) * 100.0).round() as u32
    };

    let specs = job.specs();
    let mut errors = Vec::new();
    if job.panel_count == 0 {
        errors.push("At least one string configuration is required".to_string());
    }
    if sys.has_battery && non_empty(&specs.battery_vpp_enrollment).is_none() {
        errors.push("VPP enrollment is mandatory for battery systems in WA".to_string());
    }

    let mut warnings = Vec::new();
    if let Some(limit) = specs.export_limit_kw {
        let expected = export_limit_kw(job.system_size);
        if (limit - expected).abs() > 1e-3 {
            warnings.push(format!(
                "Export limit {limit}kW may not comply with WA regulations (expected {expected}kW for {}kW inverter)",
                job.system_size
            ));
        }
    }
    if non_empty(&specs.rcd_type) != Some(REQUIRED_RCD_TYPE) {
        warnings.push("Type B RCD is recommended for inverter installations".to_string());
    }
    if specs.men_link == Some(false) {
        warnings.push("MEN link should typically be present in TN-S/TN-C-S systems".to_string());
    }
    if let Some(rating) = non_empty(&specs.ac_breaker_rating).and_then(leading_amps) {
        let recommended = recommend_breaker_rating(sys.ac_current);
        if rating < recommended {
            warnings.push(format!(
                "AC breaker {rating}A is below the recommended {recommended}A for {:.1}A output",
                sys.ac_current
            ));
        }
    }

    tracing::debug!(
        missing = missing_fields.len(),
        errors = errors.len(),
        warnings = warnings.len(),
        "validated job"
    );

    ValidationReport {
        is_valid: missing_fields.is_empty() && errors.is_empty(),
        completion_percentage,
        missing_fields,
        warnings,
        errors,
        sections,
    }
}

/// Suggested follow-ups for an incomplete job.
pub fn next_steps(job: &JobDescriptor) -> Vec<&'static str> {
    let specs = job.specs();
    let mut steps = Vec::new();
    if job.equipment_specs.is_none() {
        steps.push("Complete equipment specifications form");
    }
    if non_empty(&specs.earthing_system).is_none() {
        steps.push("Complete site visit checklist (earthing system)");
    }
    if non_empty(&specs.main_switch_rating).is_none() {
        steps.push("Verify main switch rating during site visit");
    }
    if job.has_battery() && non_empty(&specs.battery_vpp_enrollment).is_none() {
        steps.push("Select VPP enrollment");
    }
    if non_empty(&job.designer().cec_accreditation).is_none() {
        steps.push("Assign CEC accredited designer");
    }
    let critical_missing = [
        &specs.panel_manufacturer,
        &specs.panel_model,
        &specs.panel_cec_approval,
        &specs.inverter_manufacturer,
        &specs.inverter_cec_approval,
    ]
    .into_iter()
    .any(|value| non_empty(value).is_none());
    if critical_missing {
        steps.push("Complete critical equipment details (CEC approvals, manufacturers, models)");
    }
    steps
}

fn section_statuses(job: &JobDescriptor, sys: &SystemConfiguration) -> Vec<SectionStatus> {
    let specs = job.specs();
    let company = job.company();
    let designer = job.designer();
    let text = |value: &Option<String>| non_empty(value).is_some();
    let positive = |value: Option<f32>| value.is_some_and(|v| v > 0.0);

    let mut sections = vec![
        status(
            "project",
            &[
                ("jobNumber", text(&job.job_number)),
                ("customerName", text(&job.customer_name)),
                ("installationAddress", text(&job.installation_address)),
                ("installDate", text(&job.install_date)),
                ("drawingNumber", text(&job.drawing_number)),
                ("revision", text(&job.revision)),
                ("systemSize", job.system_size > 0.0),
                ("panelCount", job.panel_count > 0),
            ],
        ),
        status(
            "company",
            &[
                ("name", text(&company.name)),
                ("abn", text(&company.abn)),
                ("electricalLicense", text(&company.electrical_license)),
                ("cecAccreditation", text(&company.cec_accreditation)),
                ("phone", text(&company.phone)),
                ("email", text(&company.email)),
            ],
        ),
        status(
            "designer",
            &[
                ("name", text(&designer.name)),
                ("cecAccreditation", text(&designer.cec_accreditation)),
            ],
        ),
        status(
            "panels",
            &[
                ("manufacturer", text(&specs.panel_manufacturer)),
                ("model", text(&specs.panel_model)),
                ("cecApproval", text(&specs.panel_cec_approval)),
                ("wattage", positive(specs.panel_wattage)),
                ("voc", positive(specs.panel_voc)),
                ("isc", positive(specs.panel_isc)),
            ],
        ),
        status(
            "inverter",
            &[
                ("manufacturer", text(&specs.inverter_manufacturer)),
                (
                    "model",
                    text(&specs.inverter_model) || text(&job.inverter_model),
                ),
                ("cecApproval", text(&specs.inverter_cec_approval)),
                ("efficiency", positive(specs.inverter_efficiency)),
            ],
        ),
        status(
            "cabling",
            &[
                ("dcCableSize", text(&specs.dc_cable_size)),
                ("dcCableMaterial", text(&specs.dc_cable_material)),
                ("dcCableVoltageRating", text(&specs.dc_cable_voltage_rating)),
                ("dcCableLength", positive(specs.dc_cable_length)),
                ("dcCableInstallMethod", text(&specs.dc_cable_install_method)),
                ("acCableSize", text(&specs.ac_cable_size)),
                ("acCableMaterial", text(&specs.ac_cable_material)),
                ("acCableType", text(&specs.ac_cable_type)),
                ("acCableLength", positive(specs.ac_cable_length)),
                ("acCableInstallMethod", text(&specs.ac_cable_install_method)),
            ],
        ),
        status(
            "protection",
            &[
                ("dcBreakerRating", text(&specs.dc_breaker_rating)),
                ("acBreakerRating", text(&specs.ac_breaker_rating)),
                ("acBreakerPoles", text(&specs.ac_breaker_poles)),
                ("rcdRating", text(&specs.rcd_rating)),
                ("rcdType", text(&specs.rcd_type)),
            ],
        ),
        status(
            "isolators",
            &[
                ("dc", text(&specs.dc_isolator_rating)),
                ("ac", text(&specs.ac_isolator_rating)),
            ],
        ),
        status(
            "earthing",
            &[
                ("system", text(&specs.earthing_system)),
                ("electrodeType", text(&specs.earth_electrode_type)),
                ("electrodeLocation", text(&specs.earth_electrode_location)),
                ("conductorSize", text(&specs.earth_conductor_size)),
                ("menLink", specs.men_link.is_some()),
            ],
        ),
        status(
            "metering",
            &[
                ("type", text(&specs.meter_type)),
                ("location", text(&specs.meter_location)),
                ("bidirectional", specs.meter_bidirectional.is_some()),
            ],
        ),
        status(
            "switchboard",
            &[
                ("mainSwitchRating", text(&specs.main_switch_rating)),
                ("busbarRating", text(&specs.busbar_rating)),
                ("exportLimitKw", specs.export_limit_kw.is_some()),
                ("phaseConfiguration", text(&specs.phase_configuration)),
            ],
        ),
    ];

    if sys.has_battery {
        sections.push(status(
            "battery",
            &[
                ("manufacturer", text(&specs.battery_manufacturer)),
                ("model", text(&specs.battery_model)),
                ("chemistry", text(&specs.battery_chemistry)),
                ("voltage", positive(specs.battery_voltage)),
                ("vppEnrollment", text(&specs.battery_vpp_enrollment)),
            ],
        ));
    }
    sections
}

fn status(section: &'static str, fields: &[(&'static str, bool)]) -> SectionStatus {
    let missing_fields: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    let completion_percentage = if fields.is_empty() {
        100
    } else {
        (((fields.len() - missing_fields.len()) as f32 / fields.len() as f32) * 100.0).round() as u32
    };
    SectionStatus {
        section,
        complete: missing_fields.is_empty(),
        completion_percentage,
        field_count: fields.len(),
        missing_fields,
    }
}

/// Leading whole-amp figure of a rating such as `32A` or `40A 2P`.
fn leading_amps(rating: &str) -> Option<u32> {
    let digits: String = rating
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
