//! Sample workbook for operators
//!
//! Writes an `.xlsx` with the columns the label layout understands and a few
//! example rows to fill in.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build workbook: {0}")]
    Build(#[from] XlsxError),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub const SHEET_NAME: &str = "Barcode Data";
pub const COLUMNS: [&str; 5] = ["imei", "box_id", "model", "product", "dn"];

const SAMPLE_ROWS: [[&str; 5]; 3] = [
    [
        "359827134443046",
        "355760833587361",
        "X6525D",
        "SMART 8 64+3 SHINY GOLD",
        "M8N7",
    ],
    [
        "359827134448540",
        "355760834629202",
        "X6525D",
        "HOT 60 Pro+ 256+8 SLEEK BLACK",
        "M8N7",
    ],
    [
        "359827134450389",
        "355760835671043",
        "X6525D",
        "SMART 10 64+3 MISTY VIOLET",
        "M8N7",
    ],
];

/// Build a single-sheet workbook. Empty cells are left unwritten.
pub fn workbook<H, R, C>(header: H, rows: R) -> Result<Vec<u8>, XlsxError>
where
    H: IntoIterator,
    H::Item: AsRef<str>,
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    let lines = std::iter::once(owned(header)).chain(rows.into_iter().map(owned));
    for (row, cells) in lines.enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if !cell.is_empty() {
                sheet.write_string(row as u32, col as u16, cell)?;
            }
        }
    }
    workbook.save_to_buffer()
}

fn owned<C>(cells: C) -> Vec<String>
where
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    cells.into_iter().map(|c| c.as_ref().to_owned()).collect()
}

pub fn sample() -> Result<Vec<u8>, XlsxError> {
    workbook(COLUMNS, SAMPLE_ROWS)
}

pub async fn write_sample(path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    tokio::fs::write(path, sample()?)
        .await
        .map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })?;
    info!(path = %path.display(), "wrote sample workbook");
    Ok(())
}
