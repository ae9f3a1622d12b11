//! Document field extraction.
//!
//! Three pipelines share one shape: run OCR on an image, then turn the text
//! lines into a [`FieldMapping`]. Driving licences are classified line by
//! line with regex rules, vehicle books are read by locating printed labels
//! and looking below them, and passports are read from the MRZ by an external
//! parser.

pub mod license;
pub mod passport;
pub mod rules;
pub mod vehicle;

pub use license::{LicenceExtractor, LicenceField, LicenceFields};
pub use passport::{
    mentions_keyword, rename_mrz_fields, JsonMrzReader, MrzReader, MrzRecord, PassportFields,
    PASSPORT_DISPLAY_FIELDS,
};
pub use vehicle::{VehicleExtractor, VEHICLE_FIELDS};

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::config::PassportConfig;
use crate::models::fields::FieldMapping;
use crate::ocr::{OcrPage, OcrService};

/// Supported document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    DrivingLicence,
    Passport,
    VehicleBook,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::DrivingLicence => write!(f, "driving_licence"),
            DocumentKind::Passport => write!(f, "passport"),
            DocumentKind::VehicleBook => write!(f, "vehicle_book"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "driving_licence" | "licence" | "license" => Ok(DocumentKind::DrivingLicence),
            "passport" => Ok(DocumentKind::Passport),
            "vehicle_book" | "vehicle" => Ok(DocumentKind::VehicleBook),
            other => Err(format!("unknown document kind: '{other}'")),
        }
    }
}

/// Extractors that work from OCR lines alone.
pub trait DocumentExtractor {
    /// Document type this extractor reads.
    fn kind(&self) -> DocumentKind;

    /// Extract the field mapping from one page of OCR output.
    fn extract(&self, page: &OcrPage) -> FieldMapping;
}

/// Result of one extraction call.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub kind: DocumentKind,
    /// Extracted fields, in the document type's label order.
    pub fields: FieldMapping,
    /// Passport only: whether the OCR text mentions the passport keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_found: Option<bool>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Runs the extractors against an OCR service and an MRZ parser.
///
/// Each call owns the OCR output it requested and keeps nothing afterwards.
pub struct DocumentPipeline<O, M> {
    ocr: O,
    mrz: M,
    licence: LicenceExtractor,
    vehicle: VehicleExtractor,
    passport: PassportConfig,
}

impl<O: OcrService, M: passport::MrzReader> DocumentPipeline<O, M> {
    pub fn new(ocr: O, mrz: M) -> Self {
        Self {
            ocr,
            mrz,
            licence: LicenceExtractor::new(),
            vehicle: VehicleExtractor::new(),
            passport: PassportConfig::default(),
        }
    }

    /// Set passport options.
    pub fn with_passport_config(mut self, config: PassportConfig) -> Self {
        self.passport = config;
        self
    }

    /// Extract a driving licence from a decoded image.
    pub fn licence(&self, image: &DynamicImage) -> Result<ExtractionResult> {
        self.run_lines(&self.licence, image)
    }

    /// Extract a vehicle registration book from a decoded image.
    pub fn vehicle(&self, image: &DynamicImage) -> Result<ExtractionResult> {
        self.run_lines(&self.vehicle, image)
    }

    /// Extract a passport from the encoded image bytes.
    ///
    /// The MRZ parser gets the raw bytes; the OCR service gets the decoded
    /// image for the keyword check.
    pub fn passport(&self, bytes: &[u8]) -> Result<(ExtractionResult, PassportFields)> {
        let start = Instant::now();

        let record = self.mrz.read_mrz(bytes)?;
        let image = image::load_from_memory(bytes)?;
        let page = self.ocr.recognize(&image)?;
        let fields = PassportFields::new(record, &page, &self.passport.keyword);

        let result = ExtractionResult {
            kind: DocumentKind::Passport,
            fields: fields.to_mapping(),
            keyword_found: Some(fields.keyword_found),
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            kind = %result.kind,
            found = result.fields.found_count(),
            keyword_found = fields.keyword_found,
            "extraction finished in {}ms",
            result.processing_time_ms
        );
        Ok((result, fields))
    }

    /// Extract any supported document from encoded image bytes.
    pub fn extract(&self, kind: DocumentKind, bytes: &[u8]) -> Result<ExtractionResult> {
        match kind {
            DocumentKind::Passport => self.passport(bytes).map(|(result, _)| result),
            DocumentKind::DrivingLicence => self.licence(&image::load_from_memory(bytes)?),
            DocumentKind::VehicleBook => self.vehicle(&image::load_from_memory(bytes)?),
        }
    }

    fn run_lines(
        &self,
        extractor: &dyn DocumentExtractor,
        image: &DynamicImage,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();
        let page = self.ocr.recognize(image)?;
        let fields = extractor.extract(&page);

        let result = ExtractionResult {
            kind: extractor.kind(),
            fields,
            keyword_found: None,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            kind = %result.kind,
            lines = page.len(),
            found = result.fields.found_count(),
            "extraction finished in {}ms",
            result.processing_time_ms
        );
        Ok(result)
    }
}
