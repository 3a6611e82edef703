use crate::{
    ingest::{self, DecodeError, RawFile},
    template,
};

mod workflow;

pub(crate) fn xlsx(name: &str, header: &[&str], rows: &[&[&str]]) -> RawFile {
    let body = template::workbook(header, rows.iter().copied()).unwrap();
    RawFile::new(name, body)
}

/// `count` rows of `imei, model, product` with distinct IMEIs.
pub(crate) fn handsets(count: usize) -> RawFile {
    let rows = (0..count)
        .map(|i| {
            vec![
                format!("3598271344{i:05}"),
                "X6525D".to_owned(),
                "SMART 8 64+3 SHINY GOLD".to_owned(),
            ]
        })
        .collect::<Vec<_>>();
    let body = template::workbook(["imei", "model", "product"], rows).unwrap();
    RawFile::new("handsets.xlsx", body)
}

#[test]
fn test_blank_row_is_dropped() {
    let file = xlsx(
        "labels.xlsx",
        &["imei", "model"],
        &[&["123", "A"], &["", ""], &["456", "B"]],
    );
    let records = ingest::decode(&file).unwrap();
    assert_eq!(records.len(), 2);
    let ids = records.iter().map(|r| r.id).collect::<Vec<_>>();
    assert_eq!(ids, [1, 2]);
    assert_eq!(records.get(2).unwrap().get("model"), Some("B"));
    assert_eq!(records.get(2).unwrap().get("imei"), Some("456"));
}

#[test]
fn test_decode_is_idempotent() {
    let file = handsets(7);
    let first = ingest::decode(&file).unwrap();
    let second = ingest::decode(&file).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 7);
    assert!(first.iter().map(|r| r.id).eq(1..=7));
}

#[test]
fn test_length_only_shrinks_for_blank_rows() {
    let full = xlsx(
        "full.xlsx",
        &["imei", "model"],
        &[&["1", "A"], &["", "B"], &["3", ""]],
    );
    assert_eq!(ingest::decode(&full).unwrap().len(), 3);

    let gappy = xlsx(
        "gappy.xlsx",
        &["imei", "model"],
        &[&["1", "A"], &["", ""], &["", ""], &["4", "D"]],
    );
    assert_eq!(ingest::decode(&gappy).unwrap().len(), 2);
}

#[test]
fn test_short_rows_are_padded() {
    let file = xlsx(
        "short.xlsx",
        &["imei", "box_id", "model"],
        &[&["111"], &["222", "", "Y"]],
    );
    let records = ingest::decode(&file).unwrap();
    assert_eq!(records.get(1).unwrap().get("model"), Some(""));
    assert_eq!(records.get(2).unwrap().get("model"), Some("Y"));
}

#[test]
fn test_header_only_sheet_has_no_records() {
    let file = xlsx("empty.xlsx", &["imei", "model"], &[]);
    let records = ingest::decode(&file).unwrap();
    assert!(records.is_empty());
    assert_eq!(records.mapping().names(), ["imei", "model"]);
}

#[test]
fn test_blank_sheet_has_no_header() {
    let file = xlsx("blank.xlsx", &[], &[]);
    assert_eq!(ingest::decode(&file), Err(DecodeError::MissingHeader));
}
