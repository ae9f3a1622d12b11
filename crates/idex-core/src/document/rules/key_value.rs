//! Positional key-value matching.
//!
//! Labels on printed forms sit either beside their value or directly above
//! it. The matcher finds the label ("key") among the OCR lines with a fuzzy
//! comparison, then reads off the lines whose vertical position relates to
//! the key in the configured way.

use tracing::{debug, trace};

use crate::models::fields::FieldValue;
use crate::ocr::{LineDetection, OcrPage};

use super::similarity::{PartialRatio, Similarity};

/// Where the value sits relative to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRelation {
    /// Within the key's vertical band, above or below.
    SameLine,
    /// Strictly below the key's vertical band.
    NextLine,
}

/// Which candidate lines make up the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSelector<'a> {
    /// One candidate; absent when out of range.
    Index(usize),
    /// Several candidates; out-of-range positions are skipped.
    Indices(&'a [usize]),
}

/// How to find one field on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValueSpec<'a> {
    /// Printed label to look for.
    pub key: &'a str,
    pub relation: LineRelation,
    pub selector: ValueSelector<'a>,
    /// Minimum similarity (0-100) for a line to count as the key.
    pub fuzzy_threshold: u8,
    /// Vertical distance in pixels that separates "same line" from "next line".
    pub vertical_threshold: u32,
}

impl<'a> KeyValueSpec<'a> {
    pub const fn new(
        key: &'a str,
        relation: LineRelation,
        selector: ValueSelector<'a>,
        fuzzy_threshold: u8,
        vertical_threshold: u32,
    ) -> Self {
        Self {
            key,
            relation,
            selector,
            fuzzy_threshold,
            vertical_threshold,
        }
    }
}

/// A line paired with its vertical anchor.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredLine<'p> {
    pub line: &'p LineDetection,
    pub anchor: f32,
}

/// Lines of `page` in top-to-bottom order of their vertical anchor.
///
/// The sort is stable, so lines sharing an anchor keep detection order.
/// Non-finite anchors sort after every finite one.
pub fn sort_by_anchor(page: &OcrPage) -> Vec<AnchoredLine<'_>> {
    let mut lines: Vec<AnchoredLine<'_>> = page
        .iter()
        .map(|line| AnchoredLine {
            line,
            anchor: line.vertical_anchor(),
        })
        .collect();
    lines.sort_by(|a, b| sort_key(a.anchor).total_cmp(&sort_key(b.anchor)));
    lines
}

fn sort_key(anchor: f32) -> f32 {
    if anchor.is_finite() { anchor } else { f32::INFINITY }
}

/// Fuzzy key-value matcher over OCR lines.
#[derive(Debug, Clone, Default)]
pub struct KeyValueMatcher<S = PartialRatio> {
    similarity: S,
}

impl KeyValueMatcher<PartialRatio> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Similarity> KeyValueMatcher<S> {
    /// Use a different similarity function.
    pub fn with_similarity(similarity: S) -> Self {
        Self { similarity }
    }

    /// Find the field described by `spec` on `page`.
    ///
    /// Returns `None` when no line matches the key, or when a single-index
    /// selector points past the candidates.
    pub fn find(&self, page: &OcrPage, spec: &KeyValueSpec<'_>) -> Option<FieldValue> {
        let sorted = sort_by_anchor(page);
        self.find_in_sorted(&sorted, spec)
    }

    /// Same as [`find`](Self::find) on lines already sorted by
    /// [`sort_by_anchor`], so several fields can share one sort.
    pub fn find_in_sorted(
        &self,
        sorted: &[AnchoredLine<'_>],
        spec: &KeyValueSpec<'_>,
    ) -> Option<FieldValue> {
        let (key_pos, key_anchor) = self.locate_key(sorted, spec)?;
        let candidates = candidates(sorted, key_pos, key_anchor, spec);

        trace!(
            key = spec.key,
            candidates = candidates.len(),
            "collected value candidates"
        );

        select(&candidates, spec.selector)
    }

    /// Position and anchor of the topmost line that matches the key.
    fn locate_key(
        &self,
        sorted: &[AnchoredLine<'_>],
        spec: &KeyValueSpec<'_>,
    ) -> Option<(usize, f32)> {
        let found = sorted.iter().enumerate().find(|(_, l)| {
            self.similarity.score(spec.key, &l.line.text) >= spec.fuzzy_threshold
        });

        match found {
            Some((pos, l)) => {
                debug!(key = spec.key, line = %l.line.text, anchor = l.anchor, "matched key");
                Some((pos, l.anchor))
            }
            None => {
                debug!(key = spec.key, "key not found");
                None
            }
        }
    }
}

fn candidates<'p>(
    sorted: &[AnchoredLine<'p>],
    key_pos: usize,
    key_anchor: f32,
    spec: &KeyValueSpec<'_>,
) -> Vec<&'p str> {
    let threshold = spec.vertical_threshold as f32;

    sorted
        .iter()
        .enumerate()
        .filter(|(pos, l)| match spec.relation {
            LineRelation::SameLine => *pos != key_pos && (l.anchor - key_anchor).abs() <= threshold,
            LineRelation::NextLine => l.anchor > key_anchor + threshold,
        })
        .map(|(_, l)| l.line.text.as_str())
        .collect()
}

fn select(candidates: &[&str], selector: ValueSelector<'_>) -> Option<FieldValue> {
    match selector {
        ValueSelector::Index(i) => candidates.get(i).map(|t| FieldValue::Text(t.to_string())),
        ValueSelector::Indices(indices) => Some(FieldValue::List(
            indices
                .iter()
                .filter_map(|&i| candidates.get(i))
                .map(|t| t.to_string())
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A 20px-high line centred on `anchor`.
    fn line(anchor: f32, text: &str) -> LineDetection {
        LineDetection::from_rect(10.0, anchor - 10.0, 200.0, anchor + 10.0, text)
    }

    fn next_line(key: &str, index: usize, vertical: u32) -> KeyValueSpec<'_> {
        KeyValueSpec::new(key, LineRelation::NextLine, ValueSelector::Index(index), 80, vertical)
    }

    fn text(value: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(value.to_string()))
    }

    #[test]
    fn test_no_match_is_absent() {
        let page = OcrPage::new(vec![line(10.0, "Colombo"), line(40.0, "Kandy")]);
        let matcher = KeyValueMatcher::new();
        assert_eq!(matcher.find(&page, &next_line("Engine No", 0, 10)), None);
    }

    #[test]
    fn test_empty_page_is_absent() {
        let matcher = KeyValueMatcher::new();
        let spec = KeyValueSpec::new(
            "Absolute Owner",
            LineRelation::NextLine,
            ValueSelector::Indices(&[0, 1]),
            80,
            20,
        );
        assert_eq!(matcher.find(&OcrPage::empty(), &spec), None);
    }

    #[test]
    fn test_unordered_input_is_read_top_to_bottom() {
        let page = OcrPage::new(vec![
            line(160.0, "second"),
            line(100.0, "Make"),
            line(130.0, "first"),
        ]);
        let matcher = KeyValueMatcher::new();

        assert_eq!(matcher.find(&page, &next_line("Make", 0, 10)), text("first"));
        assert_eq!(matcher.find(&page, &next_line("Make", 1, 10)), text("second"));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let page = OcrPage::new(vec![
            line(300.0, "TOYOTA"),
            line(250.0, "Make"),
            line(300.0, "PREMIO"),
            line(90.0, "Model"),
        ]);
        let matcher = KeyValueMatcher::new();
        let spec = KeyValueSpec::new(
            "Make",
            LineRelation::NextLine,
            ValueSelector::Indices(&[0, 1]),
            80,
            10,
        );

        let first = matcher.find(&page, &spec);
        let second = matcher.find(&page, &spec);
        assert_eq!(first, second);
        // Equal anchors keep detection order.
        assert_eq!(
            first,
            Some(FieldValue::List(vec!["TOYOTA".to_string(), "PREMIO".to_string()]))
        );
    }

    #[test]
    fn test_topmost_key_wins() {
        let page = OcrPage::new(vec![
            line(400.0, "Engine No"),
            line(430.0, "LOWER"),
            line(100.0, "Engine No"),
            line(130.0, "UPPER"),
        ]);
        let matcher = KeyValueMatcher::new();
        assert_eq!(matcher.find(&page, &next_line("Engine No", 0, 20)), text("UPPER"));
    }

    #[test]
    fn test_same_line_is_symmetric_and_excludes_key() {
        let page = OcrPage::new(vec![
            line(85.0, "above-out"),
            line(90.0, "above-edge"),
            line(100.0, "Wheel Base"),
            line(110.0, "below-edge"),
            line(115.0, "below-out"),
        ]);
        let matcher = KeyValueMatcher::new();
        let spec = KeyValueSpec::new(
            "Wheel Base",
            LineRelation::SameLine,
            ValueSelector::Indices(&[0, 1, 2]),
            80,
            10,
        );

        assert_eq!(
            matcher.find(&page, &spec),
            Some(FieldValue::List(vec![
                "above-edge".to_string(),
                "below-edge".to_string()
            ]))
        );
    }

    #[test]
    fn test_next_line_boundary_is_strict() {
        let matcher = KeyValueMatcher::new();
        let spec = next_line("Engine No", 0, 20);

        // 125 > 100 + 20: below the key's band.
        let page = OcrPage::new(vec![line(100.0, "Engine No"), line(125.0, "EN4521")]);
        assert_eq!(matcher.find(&page, &spec), text("EN4521"));

        // Exactly at the threshold: excluded.
        let page = OcrPage::new(vec![line(100.0, "Engine No"), line(120.0, "EN4521")]);
        assert_eq!(matcher.find(&page, &spec), None);

        // One pixel past the threshold: included.
        let page = OcrPage::new(vec![line(100.0, "Engine No"), line(121.0, "EN4521")]);
        assert_eq!(matcher.find(&page, &spec), text("EN4521"));
    }

    #[test]
    fn test_next_line_excludes_lines_above() {
        let page = OcrPage::new(vec![
            line(50.0, "header"),
            line(100.0, "Class of Vehicle"),
            line(150.0, "MOTOR CAR"),
        ]);
        let matcher = KeyValueMatcher::new();
        assert_eq!(
            matcher.find(&page, &next_line("Class of Vehicle", 0, 20)),
            text("MOTOR CAR")
        );
    }

    #[test]
    fn test_list_selector_skips_out_of_range() {
        let page = OcrPage::new(vec![
            line(100.0, "Absolute Owner"),
            line(130.0, "PEOPLES LEASING"),
            line(160.0, "COLOMBO 02"),
        ]);
        let matcher = KeyValueMatcher::new();
        let spec = KeyValueSpec::new(
            "Absolute Owner",
            LineRelation::NextLine,
            ValueSelector::Indices(&[0, 1, 2]),
            80,
            20,
        );

        assert_eq!(
            matcher.find(&page, &spec),
            Some(FieldValue::List(vec![
                "PEOPLES LEASING".to_string(),
                "COLOMBO 02".to_string()
            ]))
        );
    }

    #[test]
    fn test_key_without_candidates() {
        let page = OcrPage::new(vec![line(100.0, "Type of Body")]);
        let matcher = KeyValueMatcher::new();

        assert_eq!(matcher.find(&page, &next_line("Type of Body", 0, 20)), None);

        let spec = KeyValueSpec::new(
            "Type of Body",
            LineRelation::NextLine,
            ValueSelector::Indices(&[0]),
            80,
            20,
        );
        assert_eq!(matcher.find(&page, &spec), Some(FieldValue::List(Vec::new())));
    }

    #[test]
    fn test_non_finite_boxes_sort_last() {
        let json = (0..40)
            .map(|i| {
                if i % 3 == 0 {
                    format!(r#"[[[0, 1e39], [1, 1e39], [1, -1e39], [0, -1e39]], ["junk{i}", 0.5]]"#)
                } else {
                    let y = 1000.0 - i as f32 * 20.0;
                    format!(r#"[[[0, {y}], [1, {y}], [1, {}], [0, {}]], ["line{i}", 0.9]]"#, y + 10.0, y + 10.0)
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        let page = OcrPage::from_paddle_json(&format!("[{json}]")).unwrap();
        assert!(page.lines[0].vertical_anchor().is_nan());

        let sorted = sort_by_anchor(&page);
        assert_eq!(sorted.len(), 40);

        let finite: Vec<f32> = sorted
            .iter()
            .map(|l| l.anchor)
            .take_while(|a| a.is_finite())
            .collect();
        assert_eq!(finite.len(), 26);
        assert!(finite.windows(2).all(|w| w[0] <= w[1]));
        assert!(sorted[26..].iter().all(|l| l.line.text.starts_with("junk")));
    }

    #[test]
    fn test_non_finite_box_is_never_a_candidate() {
        let mut page = OcrPage::new(vec![line(100.0, "Engine No"), line(150.0, "EN4521")]);
        page.lines.push(LineDetection::from_rect(0.0, f32::INFINITY, 10.0, f32::NEG_INFINITY, "junk"));
        let matcher = KeyValueMatcher::new();

        assert_eq!(matcher.find(&page, &next_line("Engine No", 0, 20)), text("EN4521"));
        assert_eq!(matcher.find(&page, &next_line("Engine No", 1, 20)), None);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let page = OcrPage::new(vec![line(100.0, "anything"), line(150.0, "value")]);
        let exact = KeyValueMatcher::with_similarity(|_: &str, _: &str| 80u8);
        let below = KeyValueMatcher::with_similarity(|_: &str, _: &str| 79u8);
        let spec = next_line("Make", 0, 10);

        assert_eq!(exact.find(&page, &spec), text("value"));
        assert_eq!(below.find(&page, &spec), None);
    }
}
