//! Input adapters and normalization.
//!
//! Anything that can yield `{length, quantity}` pairs implements
//! [`RecordSource`]. The planner only ever sees the normalized
//! [`PieceDemand`] and [`StockUnit`] collections built here.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, InputKind, SkipReason, SkippedRecord};
use crate::types::{PieceDemand, StockUnit};

/// A record as delivered by a source, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawRecord {
    pub length: i64,
    pub quantity: i64,
}

impl RawRecord {
    pub fn new(length: i64, quantity: i64) -> Self {
        Self { length, quantity }
    }
}

/// Records in source order; entries that could not be read are kept as
/// `Err` so their position is preserved for diagnostics.
pub type RecordEntries = Vec<Result<RawRecord, SkipReason>>;

pub trait RecordSource {
    fn read_records(self) -> Result<RecordEntries, Error>;
}

impl RecordSource for Vec<RawRecord> {
    fn read_records(self) -> Result<RecordEntries, Error> {
        Ok(self.into_iter().map(Ok).collect())
    }
}

impl RecordSource for &[RawRecord] {
    fn read_records(self) -> Result<RecordEntries, Error> {
        Ok(self.iter().copied().map(Ok).collect())
    }
}

/// Free text of `length,quantity` entries separated by `;` or newlines,
/// e.g. `"5000,3; 8000,2"`.
#[derive(Debug, Clone, Copy)]
pub struct TextList<'a>(pub &'a str);

impl RecordSource for TextList<'_> {
    fn read_records(self) -> Result<RecordEntries, Error> {
        Ok(self
            .0
            .split([';', '\n'])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_text_entry)
            .collect())
    }
}

fn parse_text_entry(entry: &str) -> Result<RawRecord, SkipReason> {
    let unparsable = || SkipReason::Unparsable {
        input: entry.to_string(),
    };
    let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [length] => {
            parse_whole(length).ok_or_else(unparsable)?;
            Err(SkipReason::MissingField { field: "quantity" })
        }
        [length, quantity] => {
            let length = parse_whole(length).ok_or_else(unparsable)?;
            if quantity.is_empty() {
                return Err(SkipReason::MissingField { field: "quantity" });
            }
            let quantity = parse_whole(quantity).ok_or_else(unparsable)?;
            Ok(RawRecord { length, quantity })
        }
        _ => Err(unparsable()),
    }
}

/// Tabular input with `Length` and `Quantity` header columns.
pub struct CsvSource<R> {
    reader: R,
}

impl<R: Read> CsvSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl CsvSource<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    fn read_records(self) -> Result<RecordEntries, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(self.reader);

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or(Error::MissingColumn { column: name })
        };
        let length_col = column("length")?;
        let quantity_col = column("quantity")?;

        let mut entries = Vec::new();
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    entries.push(Err(SkipReason::Unparsable {
                        input: e.to_string(),
                    }));
                    continue;
                }
            };
            if row.iter().all(str::is_empty) {
                continue;
            }
            let field = |idx: usize, name: &'static str| match row.get(idx) {
                None | Some("") => Err(SkipReason::MissingField { field: name }),
                Some(text) => parse_whole(text).ok_or_else(|| SkipReason::Unparsable {
                    input: text.to_string(),
                }),
            };
            entries.push(
                field(length_col, "length").and_then(|length| {
                    Ok(RawRecord {
                        length,
                        quantity: field(quantity_col, "quantity")?,
                    })
                }),
            );
        }
        Ok(entries)
    }
}

/// JSON objects keyed by `length`/`quantity` (any letter case), the row shape a
/// spreadsheet-to-JSON export produces.
#[derive(Debug, Clone, Copy)]
pub struct JsonRows<'a>(pub &'a [Value]);

impl RecordSource for JsonRows<'_> {
    fn read_records(self) -> Result<RecordEntries, Error> {
        Ok(self.0.iter().map(parse_json_row).collect())
    }
}

fn parse_json_row(row: &Value) -> Result<RawRecord, SkipReason> {
    let Value::Object(map) = row else {
        return Err(SkipReason::Unparsable {
            input: row.to_string(),
        });
    };
    let field = |name: &'static str| {
        let value = map
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value);
        match value {
            None | Some(Value::Null) => Err(SkipReason::MissingField { field: name }),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(whole_from_f64))
                .ok_or_else(|| SkipReason::Unparsable {
                    input: n.to_string(),
                }),
            Some(Value::String(s)) => parse_whole(s).ok_or_else(|| SkipReason::Unparsable {
                input: s.clone(),
            }),
            Some(other) => Err(SkipReason::Unparsable {
                input: other.to_string(),
            }),
        }
    };
    Ok(RawRecord {
        length: field("length")?,
        quantity: field("quantity")?,
    })
}

/// Parses integers and whole-valued decimals such as `"1200"` or `"1200.0"`.
fn parse_whole(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(whole_from_f64))
}

fn whole_from_f64(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Output of normalizing one input set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub skipped: Vec<SkippedRecord>,
    /// Number of entries the source delivered, valid or not.
    pub supplied: usize,
}

impl<T> Normalized<T> {
    /// Fails when no records survived. An empty piece list is only rejected
    /// when the source delivered records; stock is always required.
    pub fn ensure_usable(&self, kind: InputKind) -> Result<(), Error> {
        let required = kind == InputKind::Stock || self.supplied > 0;
        if self.items.is_empty() && required {
            return Err(Error::EmptyInput {
                kind,
                skipped: self.skipped.len(),
            });
        }
        Ok(())
    }
}

/// Validates piece records and merges equal lengths, keeping first-seen order.
pub fn normalize_pieces(entries: RecordEntries) -> Normalized<PieceDemand> {
    let (counts, skipped, supplied) = normalize_counts(InputKind::Pieces, entries);
    Normalized {
        items: counts
            .into_iter()
            .map(|(length, quantity)| PieceDemand::new(length, quantity))
            .collect(),
        skipped,
        supplied,
    }
}

/// Validates stock records, merges equal lengths and sorts ascending by length.
pub fn normalize_stock(entries: RecordEntries) -> Normalized<StockUnit> {
    let (mut counts, skipped, supplied) = normalize_counts(InputKind::Stock, entries);
    counts.sort_by_key(|&(length, _)| length);
    Normalized {
        items: counts
            .into_iter()
            .map(|(length, quantity)| StockUnit::new(length, quantity))
            .collect(),
        skipped,
        supplied,
    }
}

fn normalize_counts(
    kind: InputKind,
    entries: RecordEntries,
) -> (Vec<(u32, u32)>, Vec<SkippedRecord>, usize) {
    let supplied = entries.len();
    let mut counts: Vec<(u32, u32)> = Vec::new();
    let mut index_by_length: HashMap<u32, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for (i, entry) in entries.into_iter().enumerate() {
        let merged = entry.and_then(validate).and_then(|(length, quantity)| {
            match index_by_length.get(&length) {
                Some(&idx) => {
                    counts[idx].1 = counts[idx].1.checked_add(quantity).ok_or(
                        SkipReason::InvalidQuantity {
                            value: quantity as i64,
                        },
                    )?;
                }
                None => {
                    index_by_length.insert(length, counts.len());
                    counts.push((length, quantity));
                }
            }
            Ok(())
        });
        if let Err(reason) = merged {
            let record = SkippedRecord {
                kind,
                position: i + 1,
                reason,
            };
            tracing::warn!(%record, "skipping input record");
            skipped.push(record);
        }
    }

    (counts, skipped, supplied)
}

fn validate(record: RawRecord) -> Result<(u32, u32), SkipReason> {
    let length = u32::try_from(record.length)
        .ok()
        .filter(|&l| l > 0)
        .ok_or(SkipReason::InvalidLength {
            value: record.length,
        })?;
    let quantity = u32::try_from(record.quantity).map_err(|_| SkipReason::InvalidQuantity {
        value: record.quantity,
    })?;
    if quantity == 0 {
        return Err(SkipReason::ZeroQuantity);
    }
    Ok((length, quantity))
}
