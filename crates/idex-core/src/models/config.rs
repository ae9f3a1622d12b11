//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IdexError, Result};

/// Main configuration for the idex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdexConfig {
    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Passport pipeline configuration.
    pub passport: PassportConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "en_rec.onnx".to_string(),
            dictionary: "en_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Full paths of the detection model, recognition model, and dictionary.
    pub fn model_paths(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(&self.recognition_model),
            self.model_dir.join(&self.dictionary),
        )
    }

    /// Whether all model files are present on disk.
    pub fn models_present(&self) -> bool {
        let (det, rec, dict) = self.model_paths();
        det.exists() && rec.exists() && dict.exists()
    }
}

/// Passport pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportConfig {
    /// Word looked for (case-insensitively) in the general OCR text.
    pub keyword: String,
}

impl Default for PassportConfig {
    fn default() -> Self {
        Self {
            keyword: "passport".to_string(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl IdexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject settings no pipeline can run with.
    pub fn validate(&self) -> Result<()> {
        if self.passport.keyword.trim().is_empty() {
            return Err(IdexError::Config("passport.keyword must not be empty".to_string()));
        }
        for (key, name) in [
            ("ocr.detection_model", &self.ocr.detection_model),
            ("ocr.recognition_model", &self.ocr.recognition_model),
            ("ocr.dictionary", &self.ocr.dictionary),
        ] {
            if name.is_empty() {
                return Err(IdexError::Config(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}
