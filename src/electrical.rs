//! Display ratings derived from a job. These are drawing annotations, not
//! engineering calculations, and must not be relied on for sign-off.

use crate::config::LayoutConfig;
use crate::ir::{JobDescriptor, SystemConfiguration};

pub const DEFAULT_PANEL_WATTAGE: f32 = 400.0;
pub const DEFAULT_STRING_CURRENT: f32 = 10.0;
/// Wattage-to-Voc ratio used when the panel Voc is unknown.
pub const VOC_ESTIMATE_FACTOR: f32 = 0.85;
pub const SINGLE_PHASE_VOLTAGE: f32 = 230.0;
pub const THREE_PHASE_VOLTAGE: f32 = 400.0;
pub const BATTERY_DC_BUS_VOLTAGE: f32 = 400.0;
pub const BATTERY_DC_CURRENT: f32 = 25.0;

const STANDARD_BREAKER_SIZES: [u32; 9] = [16, 20, 25, 32, 40, 50, 63, 80, 100];

pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Splits panels into strings of at most `max_per_string`, handing the
/// remainder to the first strings.
pub fn split_strings(panel_count: u32, max_per_string: u32) -> Vec<u32> {
    if panel_count == 0 {
        return Vec::new();
    }
    let max_per_string = max_per_string.max(1);
    let strings = panel_count.div_ceil(max_per_string);
    let base = panel_count / strings;
    let remainder = panel_count % strings;
    (0..strings)
        .map(|idx| if idx < remainder { base + 1 } else { base })
        .collect()
}

pub fn string_voc(panel_voc: f32, panels: u32) -> f32 {
    round2(panel_voc * panels as f32)
}

pub fn estimated_string_voltage(panel_wattage: f32, panels: u32) -> f32 {
    round2(panel_wattage * panels as f32 * VOC_ESTIMATE_FACTOR)
}

pub fn dc_current(panel_isc: f32, strings: usize) -> f32 {
    round2(panel_isc * strings as f32)
}

pub fn ac_current(system_size_kw: f32, ac_voltage: f32) -> f32 {
    if ac_voltage <= 0.0 {
        return 0.0;
    }
    round2(system_size_kw * 1000.0 / ac_voltage)
}

/// Export limit in kW for the grid operator's small-system rule.
pub fn export_limit_kw(inverter_capacity_kw: f32) -> f32 {
    if inverter_capacity_kw <= 5.0 { 5.0 } else { 1.5 }
}

/// Smallest standard breaker at or above 125% of the given current.
pub fn recommend_breaker_rating(current: f32) -> u32 {
    let rating = (current * 1.25).ceil().max(0.0) as u32;
    STANDARD_BREAKER_SIZES
        .into_iter()
        .find(|size| *size >= rating)
        .unwrap_or(100)
}

impl SystemConfiguration {
    pub fn from_job(job: &JobDescriptor, config: &LayoutConfig) -> Self {
        let specs = job.specs();
        let string_sizes = split_strings(job.panel_count, config.max_panels_per_string);
        let panels_per_string = string_sizes.first().copied().unwrap_or(0);
        let panel_wattage = specs.panel_wattage.unwrap_or(DEFAULT_PANEL_WATTAGE);

        let (dc_voltage, dc_voltage_estimated) = match specs.panel_voc {
            Some(voc) if voc > 0.0 => (string_voc(voc, panels_per_string), false),
            _ => (
                estimated_string_voltage(panel_wattage, panels_per_string),
                true,
            ),
        };
        let isc = specs
            .panel_isc
            .filter(|isc| *isc > 0.0)
            .unwrap_or(DEFAULT_STRING_CURRENT);

        let three_phase = specs.inverter_phases == Some(3)
            || specs
                .phase_configuration
                .as_deref()
                .is_some_and(|phase| phase.to_ascii_lowercase().contains("three"));
        let ac_voltage = if three_phase {
            THREE_PHASE_VOLTAGE
        } else {
            SINGLE_PHASE_VOLTAGE
        };

        Self {
            system_size_kw: job.system_size,
            panel_count: job.panel_count,
            panel_wattage,
            dc_current: dc_current(isc, string_sizes.len()),
            string_sizes,
            has_inverter: true,
            has_battery: job.has_battery(),
            has_grid: job.is_grid_connected(),
            battery_capacity_kwh: job.battery_capacity.filter(|kwh| *kwh > 0.0),
            battery_voltage: specs.battery_voltage.unwrap_or(BATTERY_DC_BUS_VOLTAGE),
            dc_voltage,
            dc_voltage_estimated,
            ac_voltage,
            ac_current: ac_current(job.system_size, ac_voltage),
        }
    }

    /// Current carried by each string into a shared combiner.
    pub fn per_string_current(&self) -> f32 {
        match self.string_count() {
            0 => 0.0,
            count => round2(self.dc_current / count as f32),
        }
    }
}
