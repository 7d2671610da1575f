pub mod config;
pub mod constants;
pub mod geo;
pub mod style;
pub mod viewport;

pub use config::{DriverConfig, SchedulerProfile, SourcesConfig, UnsupportedSourcePolicy};
pub use style::{SourceDescriptor, SourceKind, Style, StyleLayer};
