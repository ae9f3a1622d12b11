//! Passport field extraction from the machine-readable zone.
//!
//! Reading the MRZ is left to an external parser behind [`MrzReader`]. This
//! module only renames the parser's fields to the names used elsewhere in
//! the crate, and runs a keyword check on the general OCR text.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::MrzError;
use crate::models::fields::{FieldMapping, FieldValue};
use crate::ocr::OcrPage;

/// Field dictionary reported by an MRZ parser.
pub type MrzRecord = Map<String, Value>;

/// Parser field → crate field.
pub const MRZ_RENAMES: [(&str, &str); 3] = [
    ("personal_number", "nic_number"),
    ("number", "passport_number"),
    ("raw_text", "mrz_code"),
];

/// Fields shown for a passport, in display order.
pub const PASSPORT_DISPLAY_FIELDS: [&str; 10] = [
    "names",
    "surname",
    "nationality",
    "nic_number",
    "passport_number",
    "date_of_birth",
    "expiration_date",
    "sex",
    "type",
    "mrz_code",
];

/// An external MRZ parser.
pub trait MrzReader {
    /// Parse the MRZ of an encoded image. `Ok(None)` means no MRZ was found.
    fn read_mrz(&self, image: &[u8]) -> Result<Option<MrzRecord>, MrzError>;
}

impl<T: MrzReader + ?Sized> MrzReader for Box<T> {
    fn read_mrz(&self, image: &[u8]) -> Result<Option<MrzRecord>, MrzError> {
        (**self).read_mrz(image)
    }
}

/// A result parsed earlier answers every request with itself.
impl MrzReader for Option<MrzRecord> {
    fn read_mrz(&self, _image: &[u8]) -> Result<Option<MrzRecord>, MrzError> {
        Ok(self.clone())
    }
}

/// Reads a parser result that was saved as JSON: an object of fields, or
/// `null` when the parser found no MRZ.
#[derive(Debug, Clone)]
pub struct JsonMrzReader {
    path: PathBuf,
}

impl JsonMrzReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse a saved parser result.
    pub fn parse(json: &str) -> Result<Option<MrzRecord>, MrzError> {
        match serde_json::from_str::<Value>(json).map_err(|e| MrzError::Parse(e.to_string()))? {
            Value::Null => Ok(None),
            Value::Object(record) => Ok(Some(record)),
            other => Err(MrzError::Parse(format!(
                "expected an object or null, got {}",
                other
            ))),
        }
    }
}

impl MrzReader for JsonMrzReader {
    fn read_mrz(&self, _image: &[u8]) -> Result<Option<MrzRecord>, MrzError> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            MrzError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Self::parse(&json)
    }
}

/// Rename the parser's fields; everything else passes through.
///
/// A renamed field missing from the parser output is set to an empty string.
pub fn rename_mrz_fields(mut record: MrzRecord) -> MrzRecord {
    for (from, to) in MRZ_RENAMES {
        let value = record
            .remove(from)
            .unwrap_or_else(|| Value::String(String::new()));
        record.insert(to.to_string(), value);
    }
    record
}

/// Whether `keyword` appears, ignoring case, anywhere in the page text.
pub fn mentions_keyword(page: &OcrPage, keyword: &str) -> bool {
    page.text().to_lowercase().contains(&keyword.to_lowercase())
}

/// Extracted passport.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassportFields {
    /// Renamed MRZ fields; empty when no MRZ was found.
    pub mrz: MrzRecord,
    /// Whether the general OCR text mentions the passport keyword.
    pub keyword_found: bool,
}

impl PassportFields {
    /// Build from a parser result and the OCR text of the same image.
    pub fn new(record: Option<MrzRecord>, page: &OcrPage, keyword: &str) -> Self {
        let mrz = match record {
            Some(record) => rename_mrz_fields(record),
            None => {
                debug!("no MRZ found");
                MrzRecord::new()
            }
        };
        let keyword_found = mentions_keyword(page, keyword);
        debug!(fields = mrz.len(), keyword_found, "passport extraction complete");
        Self { mrz, keyword_found }
    }

    pub fn mrz_found(&self) -> bool {
        !self.mrz.is_empty()
    }

    /// Every MRZ field, rendered as text.
    pub fn to_mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::new();
        for (label, value) in &self.mrz {
            mapping.insert(label.as_str(), value_text(value));
        }
        mapping
    }

    /// The display fields only; absent when the MRZ did not provide them.
    pub fn display_mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::new();
        for label in PASSPORT_DISPLAY_FIELDS {
            mapping.insert(label, self.mrz.get(label).and_then(value_text));
        }
        mapping
    }
}

fn value_text(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        other => Some(FieldValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::LineDetection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> MrzRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn parsed() -> MrzRecord {
        record(json!({
            "type": "P<",
            "country": "LKA",
            "number": "N1234567",
            "personal_number": "991234567V",
            "raw_text": "P<LKAPERERA<<AMAL<<<<\nN1234567<0LKA9901011M3001011991234567V<<<06",
            "names": "AMAL",
            "surname": "PERERA",
            "valid_score": 100,
        }))
    }

    #[test]
    fn test_rename_leaves_no_old_keys() {
        let renamed = rename_mrz_fields(parsed());

        assert_eq!(renamed["nic_number"], json!("991234567V"));
        assert_eq!(renamed["passport_number"], json!("N1234567"));
        assert!(renamed["mrz_code"].as_str().unwrap().starts_with("P<LKA"));
        for (old, _) in MRZ_RENAMES {
            assert!(!renamed.contains_key(old), "{old} left behind");
        }
        assert_eq!(renamed["surname"], json!("PERERA"));
        assert_eq!(renamed["valid_score"], json!(100));
    }

    #[test]
    fn test_rename_fills_missing_with_empty() {
        let renamed = rename_mrz_fields(record(json!({"surname": "PERERA"})));
        assert_eq!(renamed["nic_number"], json!(""));
        assert_eq!(renamed["passport_number"], json!(""));
        assert_eq!(renamed["mrz_code"], json!(""));
    }

    #[test]
    fn test_no_mrz_gives_empty_mapping() {
        let fields = PassportFields::new(None, &OcrPage::empty(), "passport");
        assert!(!fields.mrz_found());
        assert!(fields.to_mapping().is_empty());
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let page = OcrPage::new(vec![
            LineDetection::from_rect(0.0, 0.0, 100.0, 20.0, "DEMOCRATIC SOCIALIST REPUBLIC"),
            LineDetection::from_rect(0.0, 30.0, 100.0, 50.0, "PASSPORT"),
        ]);
        assert!(mentions_keyword(&page, "passport"));
        assert!(!mentions_keyword(&OcrPage::empty(), "passport"));
    }

    #[test]
    fn test_keyword_does_not_gate_extraction() {
        let fields = PassportFields::new(Some(parsed()), &OcrPage::empty(), "passport");
        assert!(!fields.keyword_found);
        assert!(fields.mrz_found());
    }

    #[test]
    fn test_display_mapping() {
        let fields = PassportFields::new(Some(parsed()), &OcrPage::empty(), "passport");
        let display = fields.display_mapping();

        assert_eq!(display.len(), PASSPORT_DISPLAY_FIELDS.len());
        assert_eq!(display.get("passport_number"), Some(&"N1234567".into()));
        assert_eq!(display.get("nationality"), None);

        let all = fields.to_mapping();
        assert_eq!(all.get("valid_score"), Some(&"100".into()));
        assert_eq!(all.get("country"), Some(&"LKA".into()));
    }

    #[test]
    fn test_parse_saved_result() {
        assert_eq!(JsonMrzReader::parse("null").unwrap(), None);
        let parsed = JsonMrzReader::parse(r#"{"number": "N1"}"#).unwrap().unwrap();
        assert_eq!(parsed["number"], json!("N1"));
        assert!(matches!(JsonMrzReader::parse("[1, 2]"), Err(MrzError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let reader = JsonMrzReader::new("/nonexistent/mrz.json");
        assert!(matches!(reader.read_mrz(&[]), Err(MrzError::Unavailable(_))));
    }
}
