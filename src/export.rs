//! Writing a finished batch to disk.
//!
//! Only completed jobs produce files. Images are numbered by their position
//! among completed jobs, so a batch with failures still yields a gapless
//! `image-1`, `image-2`, ... sequence in prompt order. The same names are
//! used for loose files and for entries of a ZIP archive.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::image_data::EncodedImage;
use crate::state::{BatchOutcome, BatchReport, BatchStatus, JobStatus};

pub const RESULTS_FILE_NAME: &str = "batch_results.json";

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub images: Vec<PathBuf>,
    pub results_file: Option<PathBuf>,
    /// Jobs that were not written because they did not complete
    pub skipped: usize,
}

/// What an archive export wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    /// Entry names in the archive, in prompt order
    pub entries: Vec<String>,
    pub skipped: usize,
}

/// One job as recorded in `batch_results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: String,
    pub prompt: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Contents of `batch_results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub outcome: BatchOutcome,
    pub status: BatchStatus,
    pub jobs: Vec<ExportRecord>,
}

/// Write every completed job's image to `dir` and, optionally, a
/// `batch_results.json` describing the whole batch
pub async fn export_completed(
    report: &BatchReport,
    dir: impl AsRef<Path>,
    write_results_json: bool,
) -> Result<ExportSummary> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let (exports, records) = collect_exports(report)?;

    let mut images = Vec::with_capacity(exports.len());
    for (file_name, image) in &exports {
        let path = dir.join(file_name);
        tokio::fs::write(&path, &image.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        images.push(path);
    }

    let skipped = report.jobs.len() - images.len();
    if skipped > 0 {
        warn!("⚠️ {} jobs did not complete and were not exported", skipped);
    }

    let results_file = if write_results_json {
        let manifest = ExportManifest {
            exported_at: chrono::Utc::now().to_rfc3339(),
            outcome: report.outcome,
            status: report.status.clone(),
            jobs: records,
        };
        let path = dir.join(RESULTS_FILE_NAME);
        let json_data = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(&path, json_data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    info!("💾 Exported {} images to {}", images.len(), dir.display());

    Ok(ExportSummary {
        output_dir: dir.to_path_buf(),
        images,
        results_file,
        skipped,
    })
}

/// Archive name used when exporting into a directory, `generated-images-{ms}.zip`
pub fn archive_file_name() -> String {
    format!("generated-images-{}.zip", chrono::Utc::now().timestamp_millis())
}

/// Pack every completed job's image into a ZIP archive at `path`.
///
/// Entries are stored uncompressed since the images are already compressed.
/// Parent directories are created as needed.
pub async fn export_archive(report: &BatchReport, path: impl AsRef<Path>) -> Result<ArchiveSummary> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let (exports, _) = collect_exports(report)?;
    let skipped = report.jobs.len() - exports.len();
    if skipped > 0 {
        warn!("⚠️ {} jobs did not complete and were left out of the archive", skipped);
    }

    let archive = path.clone();
    let entries = tokio::task::spawn_blocking(move || write_archive(&archive, exports))
        .await
        .context("Archive task panicked")??;

    info!("🗜️ Packed {} images into {}", entries.len(), path.display());

    Ok(ArchiveSummary {
        archive: path,
        entries,
        skipped,
    })
}

fn write_archive(path: &Path, exports: Vec<(String, EncodedImage)>) -> Result<Vec<String>> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create archive {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let mut entries = Vec::with_capacity(exports.len());
    for (name, image) in exports {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", name))?;
        zip.write_all(&image.data)
            .with_context(|| format!("Failed to write {} to archive", name))?;
        entries.push(name);
    }

    zip.finish()
        .with_context(|| format!("Failed to finish archive {}", path.display()))?;
    Ok(entries)
}

/// Completed images with their export names, plus a record for every job
fn collect_exports(report: &BatchReport) -> Result<(Vec<(String, EncodedImage)>, Vec<ExportRecord>)> {
    let mut exports = Vec::new();
    let mut records = Vec::with_capacity(report.jobs.len());

    for job in &report.jobs {
        let mut record = ExportRecord {
            id: job.id.clone(),
            prompt: job.prompt.clone(),
            status: job.status,
            file: None,
            error: job.error.clone(),
        };

        if let Some(url) = job.image_url.as_deref().filter(|_| job.is_exportable()) {
            let image = EncodedImage::from_data_uri(url)
                .with_context(|| format!("Job {} has an invalid image data URI", job.id))?;

            let file_name = format!("image-{}.{}", exports.len() + 1, image.file_extension());
            record.file = Some(file_name.clone());
            exports.push((file_name, image));
        }

        records.push(record);
    }

    Ok((exports, records))
}
