//! Core library for identity and vehicle document field extraction.
//!
//! This crate provides:
//! - An OCR result model (positioned text lines) and the OCR service boundary
//! - Positional key-value matching with fuzzy label search
//! - Driving licence, passport (MRZ), and vehicle registration book extractors
//! - A pipeline wiring an OCR service and an MRZ parser to the extractors

pub mod document;
pub mod error;
pub mod models;
pub mod ocr;

pub use document::{
    DocumentExtractor, DocumentKind, DocumentPipeline, ExtractionResult, JsonMrzReader,
    LicenceExtractor, MrzReader, MrzRecord, PassportFields, VehicleExtractor,
};
pub use error::{IdexError, MrzError, OcrError, Result};
pub use models::config::IdexConfig;
pub use models::fields::{FieldMapping, FieldValue};
pub use ocr::{pages_from_paddle_json, LineDetection, OcrPage, OcrService, Point};

#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
