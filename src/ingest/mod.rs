//! Spreadsheet ingestion
//!
//! Turns an uploaded workbook into a [`RecordSet`]. Only the first sheet is
//! read; its first row provides the field names.

use std::{io::Cursor, path::Path};

use bytes::Bytes;
use calamine::{Data, Range, Reader as _};
use tracing::{debug, info};

use crate::record::{FieldMapping, RecordSet};

mod cell;

/// Media type of `.xlsx` workbooks.
pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// Media type of legacy `.xls` workbooks.
pub const XLS: &str = "application/vnd.ms-excel";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("file is not a valid spreadsheet: {0}")]
    CorruptFile(String),
    #[error("workbook contains no sheets")]
    EmptyWorkbook,
    #[error("first sheet has no header row")]
    MissingHeader,
    #[error("unsupported file type: {0}")]
    UnsupportedMediaType(String),
    #[error("failed to read file: {0}")]
    Io(String),
}

/// An uploaded file before it is decoded or submitted.
#[derive(Clone, derive_debug::Dbg)]
pub struct RawFile {
    pub name: String,
    pub content_type: Option<mime::Mime>,
    #[dbg(skip)]
    pub body: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name).first();
        Self {
            name,
            content_type,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: mime::Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let body = tokio::fs::read(path)
            .await
            .map_err(|error| DecodeError::Io(format!("{}: {error}", path.display())))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, body))
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Accept the file if either its declared type or the type implied by its
    /// name is one of the spreadsheet formats.
    pub fn ensure_spreadsheet(&self) -> Result<(), DecodeError> {
        let declared = self.content_type.iter().cloned();
        let guessed = mime_guess::from_path(&self.name).iter();
        if declared.chain(guessed).any(|mime| is_spreadsheet(&mime)) {
            Ok(())
        } else {
            let described = self
                .content_type
                .as_ref()
                .map(|mime| mime.essence_str().to_owned())
                .unwrap_or_else(|| self.name.clone());
            Err(DecodeError::UnsupportedMediaType(described))
        }
    }
}

pub fn is_spreadsheet(mime: &mime::Mime) -> bool {
    matches!(mime.essence_str(), XLSX | XLS)
}

/// Decode the first sheet of a workbook into records.
pub fn decode(file: &RawFile) -> Result<RecordSet, DecodeError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(file.body.clone()))
        .map_err(|error| DecodeError::CorruptFile(error.to_string()))?;
    first_sheet(&file.name, workbook.worksheet_range_at(0))
}

fn first_sheet(
    name: &str,
    sheet: Option<Result<Range<Data>, calamine::Error>>,
) -> Result<RecordSet, DecodeError> {
    let range = sheet
        .ok_or(DecodeError::EmptyWorkbook)?
        .map_err(|error| DecodeError::CorruptFile(error.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(DecodeError::MissingHeader)?;
    let mapping = FieldMapping::from_header(header.iter().map(cell::render))
        .ok_or(DecodeError::MissingHeader)?;
    debug!(file = name, columns = ?mapping.names(), "decoded header");

    let mut data_rows = 0;
    let records = RecordSet::from_rows(
        mapping,
        rows.inspect(|_| data_rows += 1)
            .map(|row| row.iter().map(cell::render).collect()),
    );
    info!(
        file = name,
        rows = data_rows,
        records = records.len(),
        "decoded spreadsheet"
    );
    Ok(records)
}

/// [`decode`] on a blocking worker, so callers on the runtime stay responsive.
pub async fn decode_async(file: &RawFile) -> Result<RecordSet, DecodeError> {
    let file = file.clone();
    match tokio::task::spawn_blocking(move || decode(&file)).await {
        Ok(result) => result,
        Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
        Err(error) => Err(DecodeError::CorruptFile(error.to_string())),
    }
}
