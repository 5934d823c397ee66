pub mod exporter;

pub use exporter::{DigestExporter, ExportError};
