use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Zone {zone} not found")]
    UnknownZone { zone: String },
    #[error("component size must be positive, got {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
}
