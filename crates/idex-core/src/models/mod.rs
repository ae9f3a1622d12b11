//! Data models shared by the extraction pipelines.

pub mod config;
pub mod fields;

pub use config::{IdexConfig, OcrConfig, OutputConfig, PassportConfig};
pub use fields::{FieldMapping, FieldValue};
