//! OCR result model and the OCR service boundary.
//!
//! The OCR engine itself is external. Whatever produces the text lines, the
//! extractors only ever see an [`OcrPage`]: the line detections of one image
//! in the order the engine returned them.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// A corner of a bounding box, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected line of text.
///
/// Corners are stored as the engine reported them: top-left, top-right,
/// bottom-right, bottom-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetection {
    /// Quadrilateral around the text.
    pub bounding_box: [Point; 4],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0). Not used by the extractors.
    pub confidence: f32,
}

impl LineDetection {
    pub fn new(bounding_box: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bounding_box,
            text: text.into(),
            confidence,
        }
    }

    /// Build a detection from an axis-aligned rectangle.
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32, text: impl Into<String>) -> Self {
        Self::new(
            [
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
            text,
            1.0,
        )
    }

    /// Representative y-coordinate used to approximate reading order: the
    /// midpoint of the top-left and bottom-right corners.
    pub fn vertical_anchor(&self) -> f32 {
        (self.bounding_box[0].y + self.bounding_box[2].y) / 2.0
    }
}

/// Line detections for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub lines: Vec<LineDetection>,
}

impl OcrPage {
    pub fn new(lines: Vec<LineDetection>) -> Self {
        Self { lines }
    }

    /// A page with no detections.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineDetection> {
        self.lines.iter()
    }

    /// All line texts joined with single spaces, in detection order.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse one page of PaddleOCR output:
    /// `[[[x, y], [x, y], [x, y], [x, y]], [text, confidence]], ...]`.
    ///
    /// PaddleOCR reports a page without detections as `null`; that parses to
    /// an empty page.
    pub fn from_paddle_json(json: &str) -> Result<Self, OcrError> {
        let raw: Option<Vec<RawPaddleLine>> =
            serde_json::from_str(json).map_err(|e| OcrError::Parse(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: Option<Vec<RawPaddleLine>>) -> Self {
        Self::new(
            raw.unwrap_or_default()
                .into_iter()
                .map(RawPaddleLine::into_detection)
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a OcrPage {
    type Item = &'a LineDetection;
    type IntoIter = std::slice::Iter<'a, LineDetection>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Parse PaddleOCR output that is either a single page or the per-image list
/// of pages the engine returns from `ocr()`.
pub fn pages_from_paddle_json(json: &str) -> Result<Vec<OcrPage>, OcrError> {
    let output: PaddleOutput =
        serde_json::from_str(json).map_err(|e| OcrError::Parse(e.to_string()))?;
    Ok(match output {
        PaddleOutput::Page(page) => vec![OcrPage::from_raw(page)],
        PaddleOutput::Pages(pages) => pages.into_iter().map(OcrPage::from_raw).collect(),
    })
}

#[derive(Deserialize)]
struct RawPaddleLine([[f32; 2]; 4], (String, f32));

impl RawPaddleLine {
    fn into_detection(self) -> LineDetection {
        let RawPaddleLine(corners, (text, confidence)) = self;
        LineDetection::new(corners.map(|[x, y]| Point::new(x, y)), text, confidence)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PaddleOutput {
    Page(Option<Vec<RawPaddleLine>>),
    Pages(Vec<Option<Vec<RawPaddleLine>>>),
}

/// An OCR engine that turns an image into positioned text lines.
pub trait OcrService {
    /// Run OCR on one image.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrPage, OcrError>;
}

impl<T: OcrService + ?Sized> OcrService for &T {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrPage, OcrError> {
        (**self).recognize(image)
    }
}

/// A page captured earlier answers every request with its own lines.
impl OcrService for OcrPage {
    fn recognize(&self, _image: &DynamicImage) -> Result<OcrPage, OcrError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PADDLE_PAGE: &str = r#"[
        [[[10.0, 100.0], [200.0, 100.0], [200.0, 120.0], [10.0, 120.0]], ["Engine No", 0.98]],
        [[[10.0, 140.0], [120.0, 140.0], [120.0, 160.0], [10.0, 160.0]], ["EN4521", 0.91]]
    ]"#;

    #[test]
    fn test_vertical_anchor_uses_top_left_and_bottom_right() {
        let line = LineDetection::new(
            [
                Point::new(0.0, 10.0),
                Point::new(50.0, 12.0),
                Point::new(50.0, 30.0),
                Point::new(0.0, 28.0),
            ],
            "x",
            0.9,
        );
        assert_eq!(line.vertical_anchor(), 20.0);
    }

    #[test]
    fn test_parse_paddle_page() {
        let page = OcrPage::from_paddle_json(PADDLE_PAGE).unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.lines[0].text, "Engine No");
        assert_eq!(page.lines[0].bounding_box[2], Point::new(200.0, 120.0));
        assert!((page.lines[1].confidence - 0.91).abs() < 1e-6);
        assert_eq!(page.lines[1].vertical_anchor(), 150.0);
    }

    #[test]
    fn test_parse_null_page_is_empty() {
        let page = OcrPage::from_paddle_json("null").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_pages_accepts_both_shapes() {
        let single = pages_from_paddle_json(PADDLE_PAGE).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].len(), 2);

        let wrapped = format!("[{PADDLE_PAGE}, null]");
        let pages = pages_from_paddle_json(&wrapped).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 2);
        assert!(pages[1].is_empty());

        let none = pages_from_paddle_json("null").unwrap();
        assert_eq!(none, vec![OcrPage::empty()]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            OcrPage::from_paddle_json(r#"{"text": "x"}"#),
            Err(OcrError::Parse(_))
        ));
    }

    #[test]
    fn test_page_text_joins_with_spaces() {
        let page = OcrPage::from_paddle_json(PADDLE_PAGE).unwrap();
        assert_eq!(page.text(), "Engine No EN4521");
    }
}
