//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    auth::create_password_reset_token_table, budget::create_budget_table,
    category::create_category_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create all the tables used by the application.
///
/// Foreign key enforcement is turned on for `connection` first, since SQLite
/// ignores that pragma inside a transaction.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_password_reset_token_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
