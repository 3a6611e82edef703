//! Row records decoded from a spreadsheet
//!
//! A [`RecordSet`] is always built against a [`FieldMapping`] taken from the
//! header row, so every [`Record`] in it shares the same ordered key set.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;

/// Ordered column names taken from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping(Vec<String>);

impl FieldMapping {
    /// Build a mapping from raw header cells.
    ///
    /// Blank cells are named after their 1-based position (`column_3`), and a
    /// repeated name gets a `.k` suffix so that keys stay unique. Returns `None`
    /// when every header cell is blank.
    pub fn from_header<I, S>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| cell.as_ref().trim().to_owned())
            .collect::<Vec<_>>();
        if cells.iter().all(String::is_empty) {
            return None;
        }
        let mut seen = IndexMap::<String, usize>::new();
        let names = cells
            .into_iter()
            .enumerate()
            .map(|(index, cell)| {
                let base = if cell.is_empty() {
                    format!("column_{}", index + 1)
                } else {
                    cell
                };
                let count = seen.entry(base.clone()).or_insert(0);
                let name = if *count == 0 {
                    base
                } else {
                    format!("{base}.{count}")
                };
                *count += 1;
                name
            })
            .collect();
        Some(Self(names))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One spreadsheet row keyed by the header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based position among the surviving rows.
    pub id: usize,
    pub fields: IndexMap<String, String>,
}

impl Record {
    /// Align a row of cells with the mapping by position. Extra cells are
    /// dropped and missing cells become empty strings.
    pub fn align(id: usize, mapping: &FieldMapping, cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        let fields = mapping
            .names()
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or_default()))
            .collect();
        Self { id, fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|value| value.trim().is_empty())
    }
}

// The wire shape carries the fields only; ids are local to one ingestion.
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.fields.serialize(serializer)
    }
}

/// Records of one ingestion, in spreadsheet row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    mapping: FieldMapping,
    records: Vec<Record>,
}

impl RecordSet {
    /// Build a set from data rows, skipping blank rows and numbering the rest
    /// from 1.
    pub fn from_rows(mapping: FieldMapping, rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut records = Vec::new();
        for cells in rows {
            let record = Record::align(records.len() + 1, &mapping, cells);
            if !record.is_blank() {
                records.push(record);
            }
        }
        Self { mapping, records }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Record> {
        id.checked_sub(1).and_then(|index| self.records.get(index))
    }

    pub fn contains(&self, id: usize) -> bool {
        self.get(id).is_some()
    }

    /// The selected records, in row order.
    pub fn selected(&self, selection: &SelectionSet) -> Vec<Record> {
        selection
            .ids()
            .filter_map(|id| self.get(id))
            .cloned()
            .collect()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Record ids picked for generation.
///
/// Ids are kept sorted, which matches row order since ids are assigned
/// sequentially.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(BTreeSet<usize>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(records: &RecordSet) -> Self {
        Self(records.iter().map(|record| record.id).collect())
    }

    pub fn insert(&mut self, id: usize) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: usize) -> bool {
        self.0.remove(&id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn contains(&self, id: usize) -> bool {
        self.0.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
