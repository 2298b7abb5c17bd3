//! Reading the rows of an uploaded CSV file.
//!
//! The first line names the columns, in any order and any case. `date`,
//! `amount` and `category` are required, `description` and `type` are optional.
//! Values are kept as text here; [crate::csv_import::reconcile] decides what
//! they mean.

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::Error;

const DATE_COLUMN: &str = "date";
const AMOUNT_COLUMN: &str = "amount";
const DESCRIPTION_COLUMN: &str = "description";
const CATEGORY_COLUMN: &str = "category";
const TYPE_COLUMN: &str = "type";

/// One data row of a CSV file before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    /// The 1-based position of the row among the data rows, excluding the header.
    pub row: usize,
    /// The raw date text.
    pub date: String,
    /// The raw amount text, possibly negative.
    pub amount: String,
    /// The description, if the column exists and the cell is not blank.
    pub description: Option<String>,
    /// The raw category name.
    pub category: String,
    /// The type hint, if the column exists and the cell is not blank.
    pub type_hint: Option<String>,
}

struct ColumnIndexes {
    date: usize,
    amount: usize,
    description: Option<usize>,
    category: usize,
    type_hint: Option<usize>,
}

impl ColumnIndexes {
    fn from_header(header: &StringRecord) -> Result<Self, Error> {
        let find = |name: &str| {
            header
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(name))
        };

        let missing: Vec<&str> = [DATE_COLUMN, AMOUNT_COLUMN, CATEGORY_COLUMN]
            .into_iter()
            .filter(|column| find(column).is_none())
            .collect();

        match (find(DATE_COLUMN), find(AMOUNT_COLUMN), find(CATEGORY_COLUMN)) {
            (Some(date), Some(amount), Some(category)) => Ok(Self {
                date,
                amount,
                description: find(DESCRIPTION_COLUMN),
                category,
                type_hint: find(TYPE_COLUMN),
            }),
            _ => Err(Error::InvalidCSV(format!(
                "missing required column(s): {}",
                missing.join(", ")
            ))),
        }
    }
}

fn cell(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or_default().to_owned()
}

fn optional_cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|index| record.get(index))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Read the data rows of `text`.
///
/// An empty file has no rows. Short rows are read with blank cells for the
/// missing columns so that they fail validation individually.
///
/// # Errors
/// Returns [Error::InvalidCSV] if the header is missing a required column or
/// the text cannot be read as CSV.
pub fn parse_rows(text: &str) -> Result<Vec<CsvRow>, Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let header = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?;
    let columns = ColumnIndexes::from_header(header)?;

    reader
        .records()
        .enumerate()
        .map(|(index, record)| {
            let record = record.map_err(|error| {
                tracing::debug!("could not read CSV record {}: {error}", index + 1);
                Error::InvalidCSV(error.to_string())
            })?;

            Ok(CsvRow {
                row: index + 1,
                date: cell(&record, columns.date),
                amount: cell(&record, columns.amount),
                description: optional_cell(&record, columns.description),
                category: cell(&record, columns.category),
                type_hint: optional_cell(&record, columns.type_hint),
            })
        })
        .collect()
}
