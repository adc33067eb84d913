use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol role placed on the diagram. The serialized form doubles as the
/// symbol-library key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    SolarString,
    DcCombiner,
    DcIsolator,
    StringInverter,
    HybridInverter,
    Battery,
    AcIsolator,
    AcBreaker,
    AcMeter,
    MainSwitchboard,
    GridConnection,
}

impl ComponentType {
    pub const ALL: [ComponentType; 11] = [
        ComponentType::SolarString,
        ComponentType::DcCombiner,
        ComponentType::DcIsolator,
        ComponentType::StringInverter,
        ComponentType::HybridInverter,
        ComponentType::Battery,
        ComponentType::AcIsolator,
        ComponentType::AcBreaker,
        ComponentType::AcMeter,
        ComponentType::MainSwitchboard,
        ComponentType::GridConnection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::SolarString => "SOLAR_STRING",
            ComponentType::DcCombiner => "DC_COMBINER",
            ComponentType::DcIsolator => "DC_ISOLATOR",
            ComponentType::StringInverter => "STRING_INVERTER",
            ComponentType::HybridInverter => "HYBRID_INVERTER",
            ComponentType::Battery => "BATTERY",
            ComponentType::AcIsolator => "AC_ISOLATOR",
            ComponentType::AcBreaker => "AC_BREAKER",
            ComponentType::AcMeter => "AC_METER",
            ComponentType::MainSwitchboard => "MAIN_SWITCHBOARD",
            ComponentType::GridConnection => "GRID_CONNECTION",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ComponentType::SolarString => "Solar Array",
            ComponentType::DcCombiner => "DC Combiner",
            ComponentType::DcIsolator => "DC Isolator",
            ComponentType::StringInverter => "Inverter",
            ComponentType::HybridInverter => "Hybrid Inverter",
            ComponentType::Battery => "Battery",
            ComponentType::AcIsolator => "AC Isolator",
            ComponentType::AcBreaker => "AC Breaker",
            ComponentType::AcMeter => "AC Meter",
            ComponentType::MainSwitchboard => "Main Switchboard",
            ComponentType::GridConnection => "Grid",
        }
    }

    /// Caption lines used when no equipment details were captured.
    pub fn generic_specs(self) -> &'static [&'static str] {
        match self {
            ComponentType::SolarString => &["600V DC | 10A"],
            ComponentType::DcCombiner => &["600V DC | 40A"],
            ComponentType::DcIsolator => &["600V DC | 32A | IP65"],
            ComponentType::StringInverter | ComponentType::HybridInverter => {
                &["5kW | 230V AC"]
            }
            ComponentType::AcIsolator => &["250V | 32A"],
            ComponentType::AcBreaker => &["MCB 25A | RCD 30mA Type B"],
            ComponentType::AcMeter => &["230V | 100A | Bi-directional"],
            ComponentType::MainSwitchboard => &["Main Switch: 63A"],
            ComponentType::GridConnection => &["230V AC Single Phase"],
            ComponentType::Battery => &["51.2V | 100Ah"],
        }
    }

    pub fn is_inverter(self) -> bool {
        matches!(
            self,
            ComponentType::StringInverter | ComponentType::HybridInverter
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as handed over by the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobDescriptor {
    pub job_id: Option<String>,
    pub job_number: Option<String>,
    /// System size in kW.
    pub system_size: f32,
    pub panel_count: u32,
    pub inverter_model: Option<String>,
    /// Battery capacity in kWh.
    pub battery_capacity: Option<f32>,
    pub installation_address: Option<String>,
    /// ISO date or timestamp.
    pub install_date: Option<String>,
    pub customer_name: Option<String>,
    pub drawing_number: Option<String>,
    pub revision: Option<String>,
    pub grid_connected: Option<bool>,
    /// Host-injected generation timestamp; rendered verbatim when present.
    pub generated_at: Option<String>,
    pub equipment_specs: Option<EquipmentSpecs>,
    pub company: Option<CompanyInfo>,
    pub designer: Option<DesignerInfo>,
}

impl JobDescriptor {
    pub fn is_grid_connected(&self) -> bool {
        self.grid_connected.unwrap_or(true)
    }

    pub fn has_battery(&self) -> bool {
        self.battery_capacity.is_some_and(|kwh| kwh > 0.0)
    }

    pub fn specs(&self) -> &EquipmentSpecs {
        static EMPTY: EquipmentSpecs = EquipmentSpecs::EMPTY;
        self.equipment_specs.as_ref().unwrap_or(&EMPTY)
    }

    pub fn company(&self) -> &CompanyInfo {
        static EMPTY: CompanyInfo = CompanyInfo::EMPTY;
        self.company.as_ref().unwrap_or(&EMPTY)
    }

    pub fn designer(&self) -> &DesignerInfo {
        static EMPTY: DesignerInfo = DesignerInfo::EMPTY;
        self.designer.as_ref().unwrap_or(&EMPTY)
    }
}

/// Manufacturer, model and rating details captured per equipment category.
/// Every field is optional; renderers substitute a literal placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EquipmentSpecs {
    pub panel_manufacturer: Option<String>,
    pub panel_model: Option<String>,
    pub panel_cec_approval: Option<String>,
    pub panel_wattage: Option<f32>,
    pub panel_voc: Option<f32>,
    pub panel_isc: Option<f32>,

    pub inverter_manufacturer: Option<String>,
    pub inverter_model: Option<String>,
    pub inverter_cec_approval: Option<String>,
    pub inverter_efficiency: Option<f32>,
    pub inverter_phases: Option<u8>,
    pub inverter_max_dc_voltage: Option<f32>,

    pub battery_manufacturer: Option<String>,
    pub battery_model: Option<String>,
    pub battery_chemistry: Option<String>,
    pub battery_voltage: Option<f32>,
    pub battery_usable_capacity: Option<f32>,
    pub battery_vpp_enrollment: Option<String>,

    pub dc_cable_size: Option<String>,
    pub dc_cable_material: Option<String>,
    pub dc_cable_insulation: Option<String>,
    pub dc_cable_voltage_rating: Option<String>,
    pub dc_cable_length: Option<f32>,
    pub dc_cable_install_method: Option<String>,

    pub ac_cable_size: Option<String>,
    pub ac_cable_material: Option<String>,
    pub ac_cable_type: Option<String>,
    pub ac_cable_length: Option<f32>,
    pub ac_cable_install_method: Option<String>,

    pub dc_breaker_rating: Option<String>,
    pub ac_breaker_rating: Option<String>,
    pub ac_breaker_poles: Option<String>,
    pub rcd_rating: Option<String>,
    pub rcd_type: Option<String>,

    pub dc_isolator_rating: Option<String>,
    pub dc_isolator_ip_rating: Option<String>,
    pub ac_isolator_rating: Option<String>,
    pub ac_isolator_ip_rating: Option<String>,

    pub main_switch_rating: Option<String>,
    pub busbar_rating: Option<String>,

    pub meter_type: Option<String>,
    pub meter_location: Option<String>,
    pub meter_bidirectional: Option<bool>,

    pub earthing_system: Option<String>,
    pub earth_electrode_type: Option<String>,
    pub earth_electrode_location: Option<String>,
    pub earth_conductor_size: Option<String>,
    pub men_link: Option<bool>,

    pub export_limit_kw: Option<f32>,
    pub phase_configuration: Option<String>,
}

impl EquipmentSpecs {
    pub const EMPTY: EquipmentSpecs = EquipmentSpecs {
        panel_manufacturer: None,
        panel_model: None,
        panel_cec_approval: None,
        panel_wattage: None,
        panel_voc: None,
        panel_isc: None,
        inverter_manufacturer: None,
        inverter_model: None,
        inverter_cec_approval: None,
        inverter_efficiency: None,
        inverter_phases: None,
        inverter_max_dc_voltage: None,
        battery_manufacturer: None,
        battery_model: None,
        battery_chemistry: None,
        battery_voltage: None,
        battery_usable_capacity: None,
        battery_vpp_enrollment: None,
        dc_cable_size: None,
        dc_cable_material: None,
        dc_cable_insulation: None,
        dc_cable_voltage_rating: None,
        dc_cable_length: None,
        dc_cable_install_method: None,
        ac_cable_size: None,
        ac_cable_material: None,
        ac_cable_type: None,
        ac_cable_length: None,
        ac_cable_install_method: None,
        dc_breaker_rating: None,
        ac_breaker_rating: None,
        ac_breaker_poles: None,
        rcd_rating: None,
        rcd_type: None,
        dc_isolator_rating: None,
        dc_isolator_ip_rating: None,
        ac_isolator_rating: None,
        ac_isolator_ip_rating: None,
        main_switch_rating: None,
        busbar_rating: None,
        meter_type: None,
        meter_location: None,
        meter_bidirectional: None,
        earthing_system: None,
        earth_electrode_type: None,
        earth_electrode_location: None,
        earth_conductor_size: None,
        men_link: None,
        export_limit_kw: None,
        phase_configuration: None,
    };

    pub fn is_empty(&self) -> bool {
        self == &Self::EMPTY
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub abn: Option<String>,
    pub electrical_license: Option<String>,
    pub cec_accreditation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

impl CompanyInfo {
    pub const EMPTY: CompanyInfo = CompanyInfo {
        name: None,
        abn: None,
        electrical_license: None,
        cec_accreditation: None,
        phone: None,
        email: None,
        website: None,
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignerInfo {
    pub name: Option<String>,
    pub cec_accreditation: Option<String>,
    pub license: Option<String>,
}

impl DesignerInfo {
    pub const EMPTY: DesignerInfo = DesignerInfo {
        name: None,
        cec_accreditation: None,
        license: None,
    };
}

/// Topology flags and display ratings derived from a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfiguration {
    pub system_size_kw: f32,
    pub panel_count: u32,
    pub panel_wattage: f32,
    /// Panels per string, longest strings first.
    pub string_sizes: Vec<u32>,
    pub has_inverter: bool,
    pub has_battery: bool,
    pub has_grid: bool,
    pub battery_capacity_kwh: Option<f32>,
    pub battery_voltage: f32,
    pub dc_voltage: f32,
    /// True when `dc_voltage` is the wattage-based approximation rather
    /// than a Voc-based figure.
    pub dc_voltage_estimated: bool,
    pub dc_current: f32,
    pub ac_voltage: f32,
    pub ac_current: f32,
}

impl SystemConfiguration {
    pub fn string_count(&self) -> usize {
        self.string_sizes.len()
    }

    pub fn panels_per_string(&self) -> u32 {
        self.string_sizes.first().copied().unwrap_or(0)
    }

    pub fn is_three_phase(&self) -> bool {
        self.ac_voltage >= 400.0
    }
}

/// Returns the value unless it is missing or blank.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

pub fn text_or<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    non_empty(value).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_keys_round_trip_through_library_names() {
        assert_eq!(
            ComponentType::from_key("dc-isolator"),
            Some(ComponentType::DcIsolator)
        );
        assert_eq!(
            ComponentType::from_key("HYBRID_INVERTER"),
            Some(ComponentType::HybridInverter)
        );
        assert_eq!(ComponentType::from_key("transformer"), None);
    }

    #[test]
    fn job_descriptor_defaults_are_lenient() {
        let job: JobDescriptor =
            serde_json::from_str(r#"{"systemSize":6.6,"panelCount":16}"#).unwrap();
        assert!(job.is_grid_connected());
        assert!(!job.has_battery());
        assert!(job.specs().is_empty());
        assert_eq!(text_or(&job.company().name, "Company"), "Company");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        assert_eq!(non_empty(&Some("   ".to_string())), None);
        assert_eq!(non_empty(&Some(" EC-1 ".to_string())), Some("EC-1"));
    }
}
