//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    EntryType, Error, amount::Amount, category::CategoryId, database_id::DatabaseId,
    user::UserID,
};

/// The database ID of a transaction.
pub type TransactionId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The amount of money spent or earned, always positive.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub transaction_type: EntryType,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the transaction happened.
    pub date: Date,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: Amount,
        transaction_type: EntryType,
        date: Date,
        category_id: CategoryId,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            transaction_type,
            date,
            category_id,
            description: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The amount of money spent or earned, always positive.
    pub amount: Amount,
    /// Whether the money was earned or spent.
    pub transaction_type: EntryType,
    /// When the transaction happened.
    pub date: Date,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// An optional description, e.g. the payee.
    pub description: Option<String>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// A partial update to a transaction. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    /// The new amount.
    pub amount: Option<Amount>,
    /// The new type.
    pub transaction_type: Option<EntryType>,
    /// The new category.
    pub category_id: Option<CategoryId>,
    /// The new description. `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// The new date.
    pub date: Option<Date>,
}

/// Which transactions to list. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions on or after this date.
    pub from: Option<Date>,
    /// Only transactions on or before this date.
    pub to: Option<Date>,
    /// Only transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only transactions of this type.
    pub transaction_type: Option<EntryType>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// Categories that transactions refer to cannot be deleted.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                type TEXT NOT NULL,
                description TEXT,
                date TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category_id);",
    )?;

    Ok(())
}

/// Create a new transaction for `user_id` in the database from a builder.
///
/// The caller should check that the category belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, category_id, amount, type, description, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, category_id, amount, type, description, date",
        )?
        .query_row(
            (
                user_id.as_i64(),
                builder.category_id,
                builder.amount,
                builder.transaction_type,
                builder.description,
                builder.date,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(builder.category_id),
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to one of the user's transactions,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, category_id, amount, type, description, date FROM \"transaction\"
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the user's transactions that match `filter`, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, amount, type, description, date FROM \"transaction\"
            WHERE user_id = ?1
                AND (?2 IS NULL OR date >= ?2)
                AND (?3 IS NULL OR date <= ?3)
                AND (?4 IS NULL OR category_id = ?4)
                AND (?5 IS NULL OR type = ?5)
            ORDER BY date DESC, id DESC",
        )?
        .query_map(
            (
                user_id.as_i64(),
                filter.from,
                filter.to,
                filter.category_id,
                filter.transaction_type,
            ),
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Apply `patch` to the transaction and return the updated transaction.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such transaction, or
/// [Error::InvalidCategory] if the new category does not exist.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    patch: TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let (set_description, description) = match patch.description {
        Some(description) => (true, description),
        None => (false, None),
    };

    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\" SET
                amount = COALESCE(?1, amount),
                type = COALESCE(?2, type),
                category_id = COALESCE(?3, category_id),
                description = CASE WHEN ?4 THEN ?5 ELSE description END,
                date = COALESCE(?6, date)
            WHERE id = ?7 AND user_id = ?8",
            (
                patch.amount,
                patch.transaction_type,
                patch.category_id,
                set_description,
                description,
                patch.date,
                id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidCategory(patch.category_id.unwrap_or_default())
            }
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_transaction(id, user_id, connection)
}

/// Delete the transaction `id` owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no such transaction.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total number of transactions the user has.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(user_id: UserID, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: row.get(2)?,
        transaction_type: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
