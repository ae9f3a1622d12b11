//! Batch command - extract fields from many documents of one type.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use idex_core::document::DocumentKind;

use super::extract::{extract_file, format_output, load_config, Extracted, Kind, OutputFormat};

/// Suffix of the saved MRZ result that accompanies a passport input.
const MRZ_SIDECAR_SUFFIX: &str = ".mrz.json";

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Document type shared by all inputs
    #[arg(short, long, value_enum)]
    kind: Kind,

    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

/// Outcome for one input file.
struct FileOutcome {
    path: PathBuf,
    extracted: Option<Extracted>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let kind = DocumentKind::from(args.kind);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_document_input(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    // Loaded on the first image, then shared by every file.
    let mut engine = None;
    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let mrz = (kind == DocumentKind::Passport)
            .then(|| mrz_sidecar(&path))
            .filter(|p| p.exists());

        let result = extract_file(
            &path,
            kind,
            mrz.as_deref(),
            &config,
            &mut engine,
            args.model_dir.as_deref(),
            &pb,
        );
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(extracted) => outcomes.push(FileOutcome {
                path,
                extracted: Some(extracted),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                outcomes.push(FileOutcome {
                    path,
                    extracted: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        let paths: Vec<&Path> = outcomes.iter().map(|o| o.path.as_path()).collect();
        let names = output_names(&paths);

        for (outcome, name) in outcomes.iter().zip(&names) {
            let Some(extracted) = &outcome.extracted else {
                continue;
            };
            let output_path = output_dir.join(format!("{}.{}", name, args.format.extension()));
            fs::write(
                &output_path,
                format_output(extracted, args.format, config.output.pretty)?,
            )?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Images and saved OCR output; MRZ sidecars are read alongside their
/// passport, not on their own.
fn is_document_input(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();
    if name.ends_with(MRZ_SIDECAR_SUFFIX) {
        return false;
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(
        ext.to_lowercase().as_str(),
        "json" | "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp"
    )
}

fn document_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
}

/// Output name (without extension) for each input: its stem, or its whole
/// file name when another input shares the stem.
fn output_names(paths: &[&Path]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for path in paths {
        *seen.entry(document_stem(path)).or_default() += 1;
    }

    paths
        .iter()
        .map(|path| {
            let stem = document_stem(path);
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if seen[stem] > 1 => name.to_string(),
                _ => stem.to_string(),
            }
        })
        .collect()
}

/// `scans/p1.png` → `scans/p1.mrz.json`.
fn mrz_sidecar(path: &Path) -> PathBuf {
    path.with_file_name(format!("{}{}", document_stem(path), MRZ_SIDECAR_SUFFIX))
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "fields_found",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = outcome.processing_time_ms.to_string();

        match &outcome.extracted {
            Some(extracted) => {
                let found = extracted.result.fields.found_count().to_string();
                wtr.write_record([filename, "success", found.as_str(), time.as_str(), ""])?;
            }
            None => wtr.write_record([
                filename,
                "error",
                "",
                time.as_str(),
                outcome.error.as_deref().unwrap_or(""),
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecars_are_not_inputs() {
        assert!(is_document_input(Path::new("scans/p1.png")));
        assert!(is_document_input(Path::new("scans/p1.JSON")));
        assert!(!is_document_input(Path::new("scans/p1.mrz.json")));
        assert!(!is_document_input(Path::new("scans/notes.txt")));
    }

    #[test]
    fn test_output_names_keep_shared_stems_apart() {
        let names = output_names(&[
            Path::new("scans/p1.png"),
            Path::new("scans/p1.json"),
            Path::new("scans/p2.png"),
        ]);
        assert_eq!(names, vec!["p1.png", "p1.json", "p2"]);
    }

    #[test]
    fn test_mrz_sidecar_path() {
        assert_eq!(
            mrz_sidecar(Path::new("scans/p1.png")),
            PathBuf::from("scans/p1.mrz.json")
        );
        assert_eq!(
            mrz_sidecar(Path::new("p1.json")),
            PathBuf::from("p1.mrz.json")
        );
    }
}
