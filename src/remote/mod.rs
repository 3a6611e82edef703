//! Barcode generation service
//!
//! [`GenerationService`] is the seam between the workflow and the service that
//! renders labels. [`http::HttpClient`] talks to the real service and
//! [`local::LocalService`] keeps everything in memory.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ingest::RawFile, record::Record};

pub mod http;
pub mod local;

pub const MAX_GRID_COLS: u32 = 10;
pub const MAX_GRID_ROWS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("request timed out")]
    Timeout,
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("service responded with status {status}: {message}")]
    BadStatus { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RemoteError::Timeout
        } else if error.is_decode() {
            RemoteError::MalformedResponse(error.to_string())
        } else if let Some(status) = error.status() {
            RemoteError::BadStatus {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            RemoteError::Unreachable(error.to_string())
        }
    }
}

/// Options sent along with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Also lay the labels out on a PDF sheet.
    #[serde(rename = "create_pdf")]
    pub produce_archive: bool,
    pub grid_cols: u32,
    pub grid_rows: u32,
    /// Let the service fill in the second IMEI when the sheet lacks one.
    #[serde(rename = "auto_generate_second_imei")]
    pub derive_secondary: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            produce_archive: true,
            grid_cols: 5,
            grid_rows: 12,
            derive_secondary: true,
        }
    }
}

impl GenerationOptions {
    /// Clamp the grid to what the PDF layout supports: 1..=10 columns and
    /// 1..=20 rows.
    pub fn clamped(self) -> Self {
        Self {
            grid_cols: self.grid_cols.clamp(1, MAX_GRID_COLS),
            grid_rows: self.grid_rows.clamp(1, MAX_GRID_ROWS),
            ..self
        }
    }

    pub fn labels_per_page(&self) -> u64 {
        u64::from(self.grid_cols) * u64::from(self.grid_rows)
    }
}

/// Manifest returned by a generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// One identifier per submitted record, in submission order.
    #[serde(rename = "generated_files")]
    pub artifacts: Vec<String>,
    #[serde(rename = "pdf_file", default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable(String),
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Png,
    Pdf,
    #[serde(other)]
    Other,
}

/// An entry of the service's file archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedFile {
    #[serde(alias = "filename")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveStats {
    pub total_files: u64,
    pub png_files: u64,
    pub pdf_files: u64,
    pub total_size: u64,
    #[serde(alias = "session_count")]
    pub sessions: u64,
}

pub trait GenerationService {
    /// Upload a workbook as-is and generate labels for every row in it.
    fn submit_file(
        &self,
        file: &RawFile,
        options: &GenerationOptions,
    ) -> impl Future<Output = Result<GenerationResult, RemoteError>> + Send;

    /// Generate labels for rows that were already decoded and selected.
    fn submit_records(
        &self,
        records: &[Record],
        options: &GenerationOptions,
    ) -> impl Future<Output = Result<GenerationResult, RemoteError>> + Send;

    fn download_artifact(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Bytes, RemoteError>> + Send;

    fn download_archive(&self, id: &str)
    -> impl Future<Output = Result<Bytes, RemoteError>> + Send;

    fn health(&self) -> impl Future<Output = Reachability> + Send;

    fn list_files(&self) -> impl Future<Output = Result<Vec<ArchivedFile>, RemoteError>> + Send;

    fn archive_stats(&self) -> impl Future<Output = Result<ArchiveStats, RemoteError>> + Send;
}
