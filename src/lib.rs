#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod electrical;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod symbols;
mod text_metrics;
pub mod theme;
pub mod validation;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use ir::{CompanyInfo, ComponentType, DesignerInfo, EquipmentSpecs, JobDescriptor, SystemConfiguration};
pub use layout::{DiagramLayout, LayoutEngine, LayoutError, Wire};
pub use render::{RenderOptions, SldRenderer, Variant, render_sld, to_data_url};
pub use symbols::{DirectorySource, SymbolLibrary, SymbolSource};
pub use theme::Theme;
pub use validation::{ValidationReport, validate_job};

/// Renders a job and returns it as a `data:image/svg+xml;base64,` URL.
pub fn render_sld_data_url(
    job: &JobDescriptor,
    symbols: &SymbolLibrary,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    Ok(to_data_url(&render_sld(job, symbols, options)?))
}

/// Parses a camelCase job descriptor and renders it.
pub fn render_job_json(
    job_json: &str,
    symbols: &SymbolLibrary,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    let job: JobDescriptor = serde_json::from_str(job_json)?;
    render_sld(&job, symbols, options)
}
