//! Driving licence field extraction.
//!
//! Each OCR line is classified on its own, by the first rule whose pattern
//! matches it. Position on the card plays no part.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::models::fields::{FieldMapping, FieldValue};
use crate::ocr::OcrPage;

use super::rules::patterns::{
    ADDRESS, BLOOD_GROUP, DATE_OF_BIRTH, DATE_OF_EXPIRY, DATE_OF_ISSUE, LICENCE_NUMBER, NAME,
    NIC_NUMBER,
};
use super::{DocumentExtractor, DocumentKind};

/// Fields printed on a driving licence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenceField {
    LicenceNumber,
    NicNumber,
    Name,
    Address,
    DateOfBirth,
    DateOfIssue,
    DateOfExpiry,
    BloodGroup,
}

impl LicenceField {
    /// All fields in output order.
    pub const ALL: [LicenceField; 8] = [
        LicenceField::LicenceNumber,
        LicenceField::NicNumber,
        LicenceField::Name,
        LicenceField::Address,
        LicenceField::DateOfBirth,
        LicenceField::DateOfIssue,
        LicenceField::DateOfExpiry,
        LicenceField::BloodGroup,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LicenceField::LicenceNumber => "Driving Licence No",
            LicenceField::NicNumber => "National Identification Card No",
            LicenceField::Name => "Name",
            LicenceField::Address => "Address",
            LicenceField::DateOfBirth => "Date Of Birth",
            LicenceField::DateOfIssue => "Date Of Issue",
            LicenceField::DateOfExpiry => "Date Of Expiry",
            LicenceField::BloodGroup => "Blood Group",
        }
    }
}

/// How the value is cut out of a matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// Drop a fixed leading prefix.
    StripPrefix(&'static str),
    /// Keep the line as it is.
    WholeLine,
    /// Everything after the first `.`, trimmed.
    AfterFirstDot,
    /// Last piece of a whitespace split with at most this many splits.
    LastToken(usize),
}

impl Capture {
    fn apply(self, line: &str) -> String {
        match self {
            Capture::StripPrefix(prefix) => line.strip_prefix(prefix).unwrap_or(line).to_string(),
            Capture::WholeLine => line.to_string(),
            Capture::AfterFirstDot => line
                .split_once('.')
                .map(|(_, rest)| rest.trim())
                .unwrap_or(line)
                .to_string(),
            Capture::LastToken(max_splits) => last_split_piece(line, max_splits).to_string(),
        }
    }
}

struct Rule {
    field: LicenceField,
    pattern: &'static Regex,
    capture: Capture,
}

/// Classification rules in priority order.
fn rules() -> [Rule; 8] {
    [
        Rule {
            field: LicenceField::LicenceNumber,
            pattern: &LICENCE_NUMBER,
            capture: Capture::StripPrefix("5."),
        },
        Rule {
            field: LicenceField::NicNumber,
            pattern: &NIC_NUMBER,
            capture: Capture::WholeLine,
        },
        // Keeps the numeric prefix along with the name.
        Rule {
            field: LicenceField::Name,
            pattern: &NAME,
            capture: Capture::WholeLine,
        },
        Rule {
            field: LicenceField::Address,
            pattern: &ADDRESS,
            capture: Capture::AfterFirstDot,
        },
        Rule {
            field: LicenceField::DateOfBirth,
            pattern: &DATE_OF_BIRTH,
            capture: Capture::AfterFirstDot,
        },
        Rule {
            field: LicenceField::DateOfIssue,
            pattern: &DATE_OF_ISSUE,
            capture: Capture::AfterFirstDot,
        },
        Rule {
            field: LicenceField::DateOfExpiry,
            pattern: &DATE_OF_EXPIRY,
            capture: Capture::AfterFirstDot,
        },
        Rule {
            field: LicenceField::BloodGroup,
            pattern: &BLOOD_GROUP,
            capture: Capture::LastToken(2),
        },
    ]
}

/// Split on runs of whitespace at most `max_splits` times and return the
/// last piece. The final piece keeps its inner whitespace.
fn last_split_piece(text: &str, max_splits: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..max_splits {
        let Some(end) = rest.find(char::is_whitespace) else {
            return rest;
        };
        let next = rest[end..].trim_start();
        if next.is_empty() {
            return &rest[..end];
        }
        rest = next;
    }
    rest
}

/// Extracted driving licence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LicenceFields {
    pub licence_number: Option<String>,
    pub nic_number: Option<String>,
    pub name: Option<String>,
    /// Address lines in the order they were read.
    pub address: Vec<String>,
    pub date_of_birth: Option<String>,
    pub date_of_issue: Option<String>,
    pub date_of_expiry: Option<String>,
    pub blood_group: Option<String>,
}

impl LicenceFields {
    fn set(&mut self, field: LicenceField, value: String) {
        let slot = match field {
            LicenceField::Address => {
                self.address.push(value);
                return;
            }
            LicenceField::LicenceNumber => &mut self.licence_number,
            LicenceField::NicNumber => &mut self.nic_number,
            LicenceField::Name => &mut self.name,
            LicenceField::DateOfBirth => &mut self.date_of_birth,
            LicenceField::DateOfIssue => &mut self.date_of_issue,
            LicenceField::DateOfExpiry => &mut self.date_of_expiry,
            LicenceField::BloodGroup => &mut self.blood_group,
        };
        *slot = Some(value);
    }

    /// Value of one field; the address is always present, possibly empty.
    pub fn get(&self, field: LicenceField) -> Option<FieldValue> {
        let scalar = match field {
            LicenceField::Address => return Some(FieldValue::List(self.address.clone())),
            LicenceField::LicenceNumber => &self.licence_number,
            LicenceField::NicNumber => &self.nic_number,
            LicenceField::Name => &self.name,
            LicenceField::DateOfBirth => &self.date_of_birth,
            LicenceField::DateOfIssue => &self.date_of_issue,
            LicenceField::DateOfExpiry => &self.date_of_expiry,
            LicenceField::BloodGroup => &self.blood_group,
        };
        scalar.clone().map(FieldValue::Text)
    }

    /// All eight labels, in card order.
    pub fn to_mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::new();
        for field in LicenceField::ALL {
            mapping.insert(field.label(), self.get(field));
        }
        mapping
    }
}

/// Rule-based driving licence extractor.
pub struct LicenceExtractor {
    rules: [Rule; 8],
}

impl LicenceExtractor {
    pub fn new() -> Self {
        Self { rules: rules() }
    }

    /// Field a single line belongs to, with the captured value.
    pub fn classify(&self, line: &str) -> Option<(LicenceField, String)> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(line))
            .map(|rule| (rule.field, rule.capture.apply(line)))
    }

    /// Classify every line of one page.
    pub fn extract_fields(&self, page: &OcrPage) -> LicenceFields {
        self.extract_pages(std::slice::from_ref(page))
    }

    /// Classify every line of every page, in order. Later matches of a
    /// single-valued field replace earlier ones.
    pub fn extract_pages(&self, pages: &[OcrPage]) -> LicenceFields {
        let mut fields = LicenceFields::default();
        let mut matched = 0usize;

        for line in pages.iter().flat_map(|p| p.iter()) {
            match self.classify(&line.text) {
                Some((field, value)) => {
                    trace!(field = field.label(), value = %value, "classified line");
                    fields.set(field, value);
                    matched += 1;
                }
                None => trace!(line = %line.text, "unclassified line"),
            }
        }

        debug!(pages = pages.len(), matched, "licence extraction complete");
        fields
    }
}

impl Default for LicenceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for LicenceExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::DrivingLicence
    }

    fn extract(&self, page: &OcrPage) -> FieldMapping {
        self.extract_fields(page).to_mapping()
    }
}
