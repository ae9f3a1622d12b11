//! Vehicle registration book ("CR book") field extraction.

use tracing::debug;

use crate::models::fields::FieldMapping;
use crate::ocr::OcrPage;

use super::rules::{
    sort_by_anchor, KeyValueMatcher, KeyValueSpec, LineRelation::NextLine, ValueSelector::*,
};
use super::{DocumentExtractor, DocumentKind};

/// Printed labels of a registration book and where their values sit.
pub const VEHICLE_FIELDS: &[KeyValueSpec<'static>] = &[
    KeyValueSpec::new("Registration No.", NextLine, Index(0), 80, 30),
    KeyValueSpec::new("Chassis No.", NextLine, Index(1), 80, 30),
    KeyValueSpec::new("Current Owner/Address/ID.No.", NextLine, Indices(&[0, 1]), 80, 60),
    KeyValueSpec::new("Conditions/Special Notes", NextLine, Index(0), 80, 10),
    KeyValueSpec::new("Absolute Owner", NextLine, Indices(&[0, 1, 2]), 80, 20),
    KeyValueSpec::new("Engine No", NextLine, Index(0), 80, 20),
    KeyValueSpec::new("Cylinder Capacity (cc)", NextLine, Index(1), 80, 20),
    KeyValueSpec::new("Class of Vehicle", NextLine, Index(0), 80, 20),
    KeyValueSpec::new("Taxation Class", NextLine, Index(1), 80, 20),
    KeyValueSpec::new("Status when Registered", NextLine, Index(0), 80, 10),
    KeyValueSpec::new("Make", NextLine, Index(0), 80, 10),
    KeyValueSpec::new("Model", NextLine, Index(1), 80, 20),
    KeyValueSpec::new("Wheel Base", NextLine, Index(0), 80, 10),
    KeyValueSpec::new("Type of Body", NextLine, Index(0), 80, 20),
];

/// Runs the key-value matcher once per entry of a field table.
pub struct VehicleExtractor {
    matcher: KeyValueMatcher,
    fields: &'static [KeyValueSpec<'static>],
}

impl VehicleExtractor {
    pub fn new() -> Self {
        Self {
            matcher: KeyValueMatcher::new(),
            fields: VEHICLE_FIELDS,
        }
    }
}

impl Default for VehicleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for VehicleExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::VehicleBook
    }

    /// One label per table entry, in table order; unmatched fields are absent.
    fn extract(&self, page: &OcrPage) -> FieldMapping {
        let sorted = sort_by_anchor(page);
        let mut mapping = FieldMapping::new();

        for spec in self.fields {
            let value = self.matcher.find_in_sorted(&sorted, spec);
            mapping.insert(spec.key, value);
        }

        debug!(
            found = mapping.found_count(),
            total = mapping.len(),
            "vehicle extraction complete"
        );
        mapping
    }
}
