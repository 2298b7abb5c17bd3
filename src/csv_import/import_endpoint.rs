//! The endpoint for importing transactions from an uploaded CSV file.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::CurrentUser,
    csv_import::{ImportResult, MAX_IMPORT_FILE_SIZE, import_rows, parse_rows},
};

/// The name of the multipart field that holds the file.
pub const IMPORT_FILE_FIELD: &str = "file";

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for storing transactions and categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whether `file_name` has a `.csv` extension, ignoring case.
pub fn has_csv_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, extension)| {
            !stem.is_empty() && extension.eq_ignore_ascii_case("csv")
        })
}

fn map_multipart_error(error: MultipartError) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::FileTooLarge(MAX_IMPORT_FILE_SIZE)
    } else {
        tracing::debug!("could not read multipart form: {error}");
        Error::MultipartError(error.body_text())
    }
}

/// A file read from the `file` field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    /// The file name given by the client.
    pub file_name: String,
    /// The file contents.
    pub data: Vec<u8>,
}

/// Read the `file` field of `multipart`. Other fields are ignored.
///
/// # Errors
/// Returns [Error::MissingFile], [Error::NotCSV] or [Error::FileTooLarge] if
/// the upload breaks a rule, or [Error::MultipartError] if the form cannot
/// be read.
pub async fn read_csv_upload(multipart: &mut Multipart) -> Result<CsvUpload, Error> {
    while let Some(mut field) = multipart.next_field().await.map_err(map_multipart_error)? {
        if field.name() != Some(IMPORT_FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_owned();
        if !has_csv_extension(&file_name) {
            tracing::warn!("rejected upload with file name {file_name:?}");
            return Err(Error::NotCSV);
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(map_multipart_error)? {
            if data.len() + chunk.len() > MAX_IMPORT_FILE_SIZE {
                tracing::warn!(
                    "rejected upload {file_name:?} larger than {MAX_IMPORT_FILE_SIZE} bytes"
                );
                return Err(Error::FileTooLarge(MAX_IMPORT_FILE_SIZE));
            }
            data.extend_from_slice(&chunk);
        }

        tracing::debug!("received file {file_name:?} that is {} bytes", data.len());

        return Ok(CsvUpload { file_name, data });
    }

    Err(Error::MissingFile)
}

/// Import the transactions in an uploaded CSV file for the logged in user.
///
/// Rows that fail validation are reported in the result and do not stop the
/// import. Every row that is imported, and every category created for them,
/// is written in one database transaction.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, Error> {
    let start_time = std::time::Instant::now();
    let upload = read_csv_upload(&mut multipart).await?;
    let text = String::from_utf8(upload.data)
        .map_err(|_| Error::InvalidCSV("the file is not UTF-8 text".to_owned()))?;
    let rows = parse_rows(&text)?;
    let row_count = rows.len();

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let transaction = connection.unchecked_transaction()?;
    let result = import_rows(user_id, rows, &transaction)?;
    transaction.commit()?;

    tracing::info!(
        "imported {} of {row_count} rows with {} new categories in {}ms",
        result.success_count,
        result.auto_created_categories.len(),
        start_time.elapsed().as_millis()
    );

    Ok(Json(result))
}
