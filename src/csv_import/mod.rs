//! Importing transactions from CSV files.

mod csv;
mod import_endpoint;
mod reconcile;

pub use self::csv::{CsvRow, parse_rows};
pub use import_endpoint::{
    CsvUpload, IMPORT_FILE_FIELD, ImportState, has_csv_extension, import_transactions_endpoint,
    read_csv_upload,
};
pub use reconcile::{
    ImportResult, RowFailure, import_rows, parse_import_date, resolve_type,
};

/// The largest CSV file that may be imported, in bytes.
pub const MAX_IMPORT_FILE_SIZE: usize = 5 * 1024 * 1024;

/// The largest request body accepted by the import routes, leaving room for
/// the multipart framing around a file of [MAX_IMPORT_FILE_SIZE] bytes.
pub const MAX_IMPORT_BODY_SIZE: usize = MAX_IMPORT_FILE_SIZE + 1024 * 1024;
