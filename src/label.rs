//! Label fields printed on a barcode sticker
//!
//! Column names in operator spreadsheets vary (`imei`, `IMEI/SN`, `Box ID`, ...),
//! so each field is looked up through a list of aliases, case-insensitively.

use serde::Serialize;

use crate::record::Record;

const IMEI: &[&str] = &["imei", "imei/sn"];
const BOX_ID: &[&str] = &["box_id", "box id", "boxid"];
const MODEL: &[&str] = &["model"];
const PRODUCT: &[&str] = &["product"];
const COLOR: &[&str] = &["color"];
const DN: &[&str] = &["dn"];

pub const UNKNOWN_MODEL: &str = "Unknown";
pub const UNKNOWN_COLOR: &str = "Unknown Color";
pub const DEFAULT_DN: &str = "M8N7";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelFields {
    pub imei: Option<String>,
    pub box_id: Option<String>,
    pub model: String,
    pub color: String,
    pub dn: String,
}

impl LabelFields {
    pub fn from_record(record: &Record) -> Self {
        let color = match lookup(record, PRODUCT) {
            Some(product) => extract_color(product),
            None => lookup(record, COLOR)
                .map(str::to_owned)
                .unwrap_or_else(|| UNKNOWN_COLOR.to_owned()),
        };
        Self {
            imei: lookup(record, IMEI).map(str::to_owned),
            box_id: lookup(record, BOX_ID).map(str::to_owned),
            model: lookup(record, MODEL)
                .unwrap_or(UNKNOWN_MODEL)
                .to_owned(),
            color,
            dn: lookup(record, DN).unwrap_or(DEFAULT_DN).to_owned(),
        }
    }
}

fn lookup<'r>(record: &'r Record, aliases: &[&str]) -> Option<&'r str> {
    aliases.iter().find_map(|alias| {
        record
            .fields
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(alias))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    })
}

/// Extract the colour from a product string such as `SMART 8 64+3 SHINY GOLD`.
///
/// The colour is everything after the storage size (the first word holding a
/// `+` and a digit). Without a storage size the last two words are used.
pub fn extract_color(product: &str) -> String {
    let parts = product.split_whitespace().collect::<Vec<_>>();
    if parts.len() < 2 {
        return UNKNOWN_COLOR.to_owned();
    }
    let storage = parts
        .iter()
        .position(|part| part.contains('+') && part.chars().any(|c| c.is_ascii_digit()));
    match storage {
        Some(index) if index + 1 < parts.len() => parts[index + 1..].join(" ").to_uppercase(),
        _ => parts[parts.len() - 2..].join(" ").to_uppercase(),
    }
}
