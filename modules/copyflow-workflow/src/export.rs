//! Tab-separated export of result records.
//!
//! Every cell goes through [`sanitize_cell`], so no cell can contain a tab or
//! a line break and the file needs no quoting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use copyflow_common::text::collapse_whitespace;
use copyflow_common::ResultRecord;
use tracing::info;

use crate::error::ExportError;

pub const COLUMNS: [&str; 20] = [
    "created_at",
    "user_input",
    "persona",
    "scenario",
    "scenario_validation_result",
    "scenario_validation_reason",
    "content",
    "content_validation_result",
    "content_validation_reason",
    "rewritten_content",
    "product_code",
    "product_name",
    "product_description",
    "product_price",
    "recommendation_reason",
    "recommendation_success",
    "recommendation_error",
    "processing_stage",
    "final_status",
    "error",
];

/// Control characters become spaces, then whitespace runs collapse to one space.
pub fn sanitize_cell(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    collapse_whitespace(&spaced)
}

fn bool_cell(value: Option<bool>) -> String {
    value.map(|b| b.to_string()).unwrap_or_default()
}

/// Flatten one record into cells, in [`COLUMNS`] order, already sanitized.
pub fn row(record: &ResultRecord) -> Vec<String> {
    let draft = record.draft.as_ref();
    let product = record.product();
    let recommendation = &record.recommendation;

    let cells = [
        record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        record.user_input.clone(),
        record.persona.clone(),
        record.scenario.to_string(),
        bool_cell(record.scenario_validation.as_ref().map(|v| v.passed)),
        record
            .scenario_validation
            .as_ref()
            .map(|v| v.reason.clone())
            .unwrap_or_default(),
        draft.map(|d| d.pre_rewrite_text().to_string()).unwrap_or_default(),
        bool_cell(record.content_validation.as_ref().map(|v| v.passed)),
        record
            .content_validation
            .as_ref()
            .map(|v| v.reason.clone())
            .unwrap_or_default(),
        draft
            .and_then(|d| d.rewritten_text())
            .unwrap_or_default()
            .to_string(),
        product.map(|p| p.code.clone()).unwrap_or_default(),
        product.map(|p| p.name.clone()).unwrap_or_default(),
        product.map(|p| p.description.clone()).unwrap_or_default(),
        product.map(|p| p.price.clone()).unwrap_or_default(),
        recommendation.reason.clone(),
        recommendation.success.to_string(),
        recommendation.error.clone().unwrap_or_default(),
        record.stage_reached.to_string(),
        record.final_status.to_string(),
        record.error.clone().unwrap_or_default(),
    ];

    cells.iter().map(|cell| sanitize_cell(cell)).collect()
}

/// Write `records` to `path`. Returns `Ok(None)` without touching the
/// filesystem when there is nothing to export.
pub fn export(records: &[ResultRecord], path: &Path) -> Result<Option<PathBuf>, ExportError> {
    if records.is_empty() {
        info!("No records to export");
        return Ok(None);
    }

    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(out, "{}", COLUMNS.join("\t")).map_err(io_err)?;
    for record in records {
        writeln!(out, "{}", row(record).join("\t")).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;

    info!(path = %path.display(), rows = records.len(), "Exported records");
    Ok(Some(path.to_path_buf()))
}

/// Write to `dir/content_<YYYYmmdd_HHMMSS>.tsv`.
pub fn export_to_dir(records: &[ResultRecord], dir: &Path) -> Result<Option<PathBuf>, ExportError> {
    let file_name = format!("content_{}.tsv", Utc::now().format("%Y%m%d_%H%M%S"));
    export(records, &dir.join(file_name))
}
