//! Extract command - read the fields of a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use idex_core::document::{
    DocumentExtractor, DocumentKind, DocumentPipeline, ExtractionResult, JsonMrzReader,
    LicenceExtractor, MrzReader, MrzRecord, PassportFields, VehicleExtractor,
};
use idex_core::models::config::IdexConfig;
use idex_core::{pages_from_paddle_json, PureOcrEngine};

use super::config::default_config_path;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Document type
    #[arg(value_enum)]
    kind: Kind,

    /// Input file (image, or PaddleOCR output saved as .json)
    #[arg(required = true)]
    input: PathBuf,

    /// Saved MRZ parser result for a passport (JSON object, or null)
    #[arg(long)]
    mrz: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Show how many fields were found and how long it took
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Kind {
    /// Driving licence
    License,
    /// Passport (MRZ)
    Passport,
    /// Vehicle registration book
    Vehicle,
}

impl From<Kind> for DocumentKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::License => DocumentKind::DrivingLicence,
            Kind::Passport => DocumentKind::Passport,
            Kind::Vehicle => DocumentKind::VehicleBook,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output (label,value)
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// One extracted document.
pub struct Extracted {
    pub result: ExtractionResult,
    /// Set for passports.
    pub passport: Option<PassportFields>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    let mut engine = None;
    let extracted = extract_file(
        &args.input,
        args.kind.into(),
        args.mrz.as_deref(),
        &config,
        &mut engine,
        args.model_dir.as_deref(),
        &pb,
    )?;

    pb.finish_and_clear();

    let output = format_output(&extracted, args.format, config.output.pretty)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.stats {
        let fields = &extracted.result.fields;
        eprintln!(
            "{} Fields found: {}/{}",
            style("ℹ").blue(),
            fields.found_count(),
            fields.len()
        );
        eprintln!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            extracted.result.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Load the config named on the command line, else the default config file
/// if it exists, else built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<IdexConfig> {
    if let Some(path) = config_path {
        return Ok(IdexConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(IdexConfig::from_file(&default_path)?)
    } else {
        Ok(IdexConfig::default())
    }
}

/// Extract one document from an image or a saved OCR result.
///
/// The OCR engine is loaded into `engine` on first use so batch runs load
/// the models once.
pub fn extract_file(
    path: &Path,
    kind: DocumentKind,
    mrz: Option<&Path>,
    config: &IdexConfig,
    engine: &mut Option<PureOcrEngine>,
    model_dir: Option<&Path>,
    pb: &ProgressBar,
) -> anyhow::Result<Extracted> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if kind == DocumentKind::Passport && mrz.is_none() {
        warn!("No MRZ result given for {}; passport fields will be empty", path.display());
    }

    match extension.as_str() {
        "json" => {
            pb.set_message("Reading OCR output...");
            from_ocr_json(path, kind, mrz, config)
        }
        "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp" => {
            if engine.is_none() {
                pb.set_message("Loading OCR models...");
                *engine = Some(create_engine(config, model_dir)?);
            }
            let ocr = engine
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("OCR engine unavailable"))?;

            pb.set_message("Running OCR...");
            from_image(path, kind, mrz, config, ocr)
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}

fn from_ocr_json(
    path: &Path,
    kind: DocumentKind,
    mrz: Option<&Path>,
    config: &IdexConfig,
) -> anyhow::Result<Extracted> {
    let start = Instant::now();
    let pages = pages_from_paddle_json(&fs::read_to_string(path)?)?;
    let first = pages.first().cloned().unwrap_or_default();

    debug!("Loaded {} OCR page(s) from {}", pages.len(), path.display());

    let (fields, passport) = match kind {
        DocumentKind::DrivingLicence => {
            (LicenceExtractor::new().extract_pages(&pages).to_mapping(), None)
        }
        DocumentKind::VehicleBook => (VehicleExtractor::new().extract(&first), None),
        DocumentKind::Passport => {
            let record = match mrz {
                Some(mrz_path) => JsonMrzReader::new(mrz_path).read_mrz(&[])?,
                None => None,
            };
            let passport = PassportFields::new(record, &first, &config.passport.keyword);
            (passport.to_mapping(), Some(passport))
        }
    };

    Ok(Extracted {
        result: ExtractionResult {
            kind,
            fields,
            keyword_found: passport.as_ref().map(|p| p.keyword_found),
            processing_time_ms: start.elapsed().as_millis() as u64,
        },
        passport,
    })
}

fn from_image(
    path: &Path,
    kind: DocumentKind,
    mrz: Option<&Path>,
    config: &IdexConfig,
    ocr: &PureOcrEngine,
) -> anyhow::Result<Extracted> {
    let bytes = fs::read(path)?;

    let reader: Box<dyn MrzReader> = match mrz {
        Some(mrz_path) => Box::new(JsonMrzReader::new(mrz_path)),
        None => Box::new(None::<MrzRecord>),
    };
    let pipeline =
        DocumentPipeline::new(ocr, reader).with_passport_config(config.passport.clone());

    match kind {
        DocumentKind::Passport => {
            let (result, passport) = pipeline.passport(&bytes)?;
            Ok(Extracted {
                result,
                passport: Some(passport),
            })
        }
        other => Ok(Extracted {
            result: pipeline.extract(other, &bytes)?,
            passport: None,
        }),
    }
}

fn create_engine(config: &IdexConfig, model_dir: Option<&Path>) -> anyhow::Result<PureOcrEngine> {
    let mut ocr = config.ocr.clone();
    if let Some(dir) = model_dir {
        ocr.model_dir = dir.to_path_buf();
    }

    if !ocr.models_present() {
        anyhow::bail!(
            "OCR models not found in {}.\n\n\
             Place {}, {} and {} there, or pass --model-dir.",
            ocr.model_dir.display(),
            ocr.detection_model,
            ocr.recognition_model,
            ocr.dictionary
        );
    }

    PureOcrEngine::from_config(&ocr)
        .map_err(|e| anyhow::anyhow!("Failed to load OCR models: {}", e))
}

pub fn format_output(
    extracted: &Extracted,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if pretty => Ok(serde_json::to_string_pretty(&extracted.result)?),
        OutputFormat::Json => Ok(serde_json::to_string(&extracted.result)?),
        OutputFormat::Csv => format_csv(extracted),
        OutputFormat::Text => Ok(format_text(extracted)),
    }
}

fn format_csv(extracted: &Extracted) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["label", "value"])?;
    for (label, value) in extracted.result.fields.iter() {
        let value = value.map(|v| v.display()).unwrap_or_default();
        wtr.write_record([label, value.as_str()])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(extracted: &Extracted) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", extracted.result.kind));

    let fields = match &extracted.passport {
        Some(passport) => {
            let found = if passport.keyword_found { "found" } else { "not found" };
            output.push_str(&format!("Passport keyword: {}\n", found));
            if !passport.mrz_found() {
                output.push_str("No MRZ found\n");
            }
            passport.display_mapping()
        }
        None => extracted.result.fields.clone(),
    };

    output.push('\n');
    for (label, value) in fields.iter() {
        let value = value.map(|v| v.display()).unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("  {}: {}\n", label, value));
    }

    output
}
