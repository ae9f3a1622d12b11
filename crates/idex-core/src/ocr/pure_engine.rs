//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{LineDetection, OcrPage, OcrService, Point};

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Load the detection model, recognition model, and dictionary named in
    /// `config` from its model directory.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let (det_path, rec_path, dict_path) = config.model_paths();

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine,
            keep_unk: config.keep_unk,
        })
    }
}

impl OcrService for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrPage, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{}", width, height)));
        }

        debug!("Running OCR on {}x{} image", width, height);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        // Detection order is preserved; the extractors do their own ordering.
        let lines: Vec<LineDetection> = results
            .iter()
            .map(|r| {
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                LineDetection::new(polygon_to_corners(&r.bounding_box), text, r.confidence)
            })
            .collect();

        info!(
            "OCR complete: {} lines in {}ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(OcrPage::new(lines))
    }
}

/// Convert a `Polygon<f64>` to the four corners of a line detection.
///
/// Polygons with fewer than four exterior points repeat their last point.
fn polygon_to_corners(polygon: &pure_onnx_ocr::Polygon<f64>) -> [Point; 4] {
    let mut corners = [Point::new(0.0, 0.0); 4];
    let mut last = None;
    let mut coords = polygon.exterior().coords();
    for corner in corners.iter_mut() {
        if let Some(coord) = coords.next() {
            last = Some(Point::new(coord.x as f32, coord.y as f32));
        }
        if let Some(point) = last {
            *corner = point;
        }
    }
    corners
}
